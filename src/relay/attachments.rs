//! Attachment fetching: download each referenced file for re-upload.
//!
//! Downloads are sequential and independent. A failed download is logged and
//! skipped without affecting the rest of the message.

use chrono::Utc;
use tracing::{debug, warn};

use super::{AttachmentRef, FetchedAttachment, RelayPlatform};

/// Download every attachment, skipping the ones that fail.
///
/// The returned list keeps the relative order of the successful downloads and
/// may be shorter than the input.
pub async fn fetch_all<P>(platform: &P, attachments: &[AttachmentRef]) -> Vec<FetchedAttachment>
where
    P: RelayPlatform,
{
    let mut fetched = Vec::with_capacity(attachments.len());

    for (index, attachment) in attachments.iter().enumerate() {
        match platform.download(attachment).await {
            Ok(data) => {
                debug!(
                    index,
                    filename = %attachment.filename,
                    bytes = data.len(),
                    "attachment downloaded"
                );
                fetched.push(FetchedAttachment {
                    filename: sanitize_filename(&attachment.filename),
                    data,
                });
            }
            Err(e) => {
                warn!(
                    index,
                    filename = %attachment.filename,
                    error = %e,
                    "attachment download failed, skipping"
                );
            }
        }
    }

    fetched
}

/// Sanitize a filename so it cannot smuggle path components.
///
/// Replaces path separators (`/`, `\`) with underscores and strips leading
/// dots. Returns a timestamp-based fallback name if the result would be empty.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .replace(['/', '\\'], "_")
        .trim_start_matches('.')
        .to_owned();

    if sanitized.is_empty() {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        format!("attachment_{timestamp}")
    } else {
        sanitized
    }
}
