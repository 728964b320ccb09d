//! channel-relay — mirrors one Discord channel into another.
//!
//! Messages posted in the source channel are re-posted in the target channel
//! through a webhook that carries the author's name and avatar. Without
//! webhook access the relay posts under its own identity with the author's
//! name as a prefix. Attachments are carried along.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod discord;
pub mod logging;
pub mod relay;
pub mod supervisor;
