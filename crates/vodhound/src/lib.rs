//! vodhound - Twitch VOD archiving daemon.
//!
//! Receives went-live / went-offline / channel-update signals over HTTP,
//! accumulates category changes per session through the [`chapters`]
//! crate, and writes chapter-marker text files next to the recordings.
//! Also resolves part numbers and display titles for recordings of a
//! broadcast split across files.

pub mod archiver;
pub mod intake;
pub mod telemetry;
pub mod twitch;
pub mod writer;

pub use archiver::{Archiver, LiveSignal, RecordedSignal};
pub use twitch::{HelixClient, StreamInfo, StreamInfoSource};
pub use writer::{ChapterWriter, FsChapterWriter};
