//! Core session aggregation for vodhound.
//!
//! This crate holds the pieces with actual algorithmic content:
//!
//! - [`merge`] - collapse noisy category-change records into chapter text
//! - [`sessions`] - in-memory registry of active broadcast sessions
//! - [`subscription`] - one live category-change subscription per channel
//! - [`parts`] - ordinal part numbers for recordings of a split broadcast
//! - [`title`] - bounded-length display titles
//!
//! Everything here is I/O-free except the [`subscription`] module, which
//! talks to an external provider through the [`EventSubProvider`] trait.

pub mod merge;
pub mod parts;
pub mod record;
pub mod sessions;
pub mod subscription;
pub mod title;

pub use merge::generate_chapter_text;
pub use parts::PartSequencer;
pub use record::CategoryRecord;
pub use sessions::{Session, SessionStore};
pub use subscription::{EventSubProvider, ProviderError, SubscriptionCoordinator};
pub use title::render_title;
