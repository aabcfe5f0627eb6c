//! Orchestration of the archiving flow.
//!
//! Wires the intake signals to the core: went-live ensures a category
//! subscription and opens a session, channel updates fan out to the
//! session store, went-offline drains the session through the merger and
//! hands the text to the chapter writer. Recording-finalized resolves a
//! part number and renders the display title for the upload step.

use std::path::PathBuf;
use std::sync::Arc;

use chapters::{
    CategoryRecord, EventSubProvider, PartSequencer, Session, SessionStore,
    SubscriptionCoordinator,
};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use uuid::Uuid;

use crate::twitch::StreamInfoSource;
use crate::writer::ChapterWriter;

/// "Went live" intake signal.
#[derive(Debug, Clone)]
pub struct LiveSignal {
    pub queue_id: Uuid,
    pub channel_id: String,
    /// Channel login, lowercased; names the directory under the vods root.
    pub channel: String,
    /// Recording id; doubles as the part-sequencer broadcast id.
    pub id: Uuid,
}

/// "Recording finalized" intake signal.
#[derive(Debug, Clone)]
pub struct RecordedSignal {
    pub channel_id: String,
    pub channel: String,
    pub id: Uuid,
    pub title: String,
    pub started_at: DateTime<Utc>,
}

/// Part number and display title for a finalized recording.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTitle {
    pub part_number: usize,
    pub title: String,
}

pub struct Archiver {
    sessions: SessionStore,
    subscriptions: SubscriptionCoordinator,
    parts: PartSequencer,
    streams: Arc<dyn StreamInfoSource>,
    writer: Arc<dyn ChapterWriter>,
    vods_dir: PathBuf,
    max_title_length: usize,
    /// Timezone the title date is rendered in.
    title_offset: FixedOffset,
}

impl Archiver {
    pub fn new(
        provider: Arc<dyn EventSubProvider>,
        streams: Arc<dyn StreamInfoSource>,
        writer: Arc<dyn ChapterWriter>,
        vods_dir: PathBuf,
        max_title_length: usize,
        utc_offset_hours: i32,
    ) -> Self {
        Self {
            sessions: SessionStore::new(),
            subscriptions: SubscriptionCoordinator::new(provider),
            parts: PartSequencer::new(),
            streams,
            writer,
            vods_dir,
            max_title_length,
            title_offset: FixedOffset::east_opt(utc_offset_hours * 3600)
                .unwrap_or_else(|| Utc.fix()),
        }
    }

    /// Handle a "went live" signal.
    pub async fn handle_live(&self, signal: LiveSignal) {
        self.handle_live_at(signal, Utc::now()).await;
    }

    /// [`Self::handle_live`] with an explicit clock.
    pub async fn handle_live_at(&self, signal: LiveSignal, now: DateTime<Utc>) {
        if self.sessions.contains(signal.queue_id) {
            tracing::warn!(
                session_id = %signal.queue_id,
                "session already tracked, ignoring duplicate live signal"
            );
            return;
        }

        // Subscription failures are not fatal to the session: the next
        // live signal retries, and the initial record still stands.
        if let Err(err) = self.subscriptions.ensure(&signal.channel_id).await {
            tracing::error!(
                channel_id = %signal.channel_id,
                error = %err,
                "failed to ensure category subscription"
            );
        }

        let stream = match self.streams.current_stream(&signal.channel_id).await {
            Ok(Some(stream)) => stream,
            Ok(None) => {
                tracing::warn!(
                    channel_id = %signal.channel_id,
                    channel = %signal.channel,
                    session_id = %signal.queue_id,
                    "channel is not live, not starting session"
                );
                return;
            }
            Err(err) => {
                tracing::error!(
                    channel_id = %signal.channel_id,
                    error = %err,
                    "failed to fetch current stream state"
                );
                return;
            }
        };

        self.parts
            .record_start(&signal.channel_id, &signal.id.to_string(), now);

        let initial = CategoryRecord::new(stream.game_name, stream.title, now);
        let output_path = self
            .vods_dir
            .join(&signal.channel)
            .join(signal.id.to_string())
            .join(format!("{}-timestamps.txt", signal.id));

        self.sessions.start_session(
            signal.queue_id,
            signal.channel_id,
            signal.channel,
            initial,
            output_path,
        );
    }

    /// Handle a category-change delivery for a channel.
    pub fn handle_update(&self, channel_id: &str, game: &str, title: &str, timestamp: &str) {
        let record = CategoryRecord::from_wire(game, title, timestamp);
        self.sessions
            .append_category_change(channel_id, game, title, record.start_timestamp);
    }

    /// Handle a "went offline" signal: flush the session's chapter text.
    pub async fn handle_offline(&self, queue_id: Uuid) {
        let Some(session) = self.sessions.end_session(queue_id) else {
            tracing::warn!(
                session_id = %queue_id,
                "offline signal for untracked session"
            );
            return;
        };
        self.flush_session(session).await;
    }

    /// Resolve the part number and render the display title for a
    /// finalized recording.
    pub fn finalize_recording(&self, signal: &RecordedSignal) -> RenderedTitle {
        self.finalize_recording_at(signal, Utc::now())
    }

    /// [`Self::finalize_recording`] with an explicit clock.
    pub fn finalize_recording_at(&self, signal: &RecordedSignal, now: DateTime<Utc>) -> RenderedTitle {
        let part_number = self.parts.resolve_part_number_at(
            &signal.channel_id,
            &signal.id.to_string(),
            now,
        );
        let date = signal
            .started_at
            .with_timezone(&self.title_offset)
            .date_naive()
            .to_string();
        let sanitized = chapters::title::sanitize_angle_brackets(&signal.title);
        let title = chapters::render_title(
            &date,
            &signal.channel,
            &sanitized,
            Some(part_number as u32),
            self.max_title_length,
        );
        tracing::info!(
            channel = %signal.channel,
            broadcast_id = %signal.id,
            part_number,
            title = %title,
            "recording finalized"
        );
        RenderedTitle { part_number, title }
    }

    /// Drain every session through the merger and writer, then delete
    /// all subscriptions. Called once at process shutdown; the two
    /// drains run concurrently.
    pub async fn shutdown(&self) {
        let drained = self.sessions.drain_all();
        tracing::info!(sessions = drained.len(), "draining sessions before exit");
        let flushes =
            futures::future::join_all(drained.into_iter().map(|session| self.flush_session(session)));
        tokio::join!(flushes, self.subscriptions.stop_all());
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn active_subscriptions(&self) -> usize {
        self.subscriptions.active_count()
    }

    async fn flush_session(&self, session: Session) {
        if session.records.is_empty() {
            tracing::info!(
                session_id = %session.session_id,
                "no categories recorded, skipping chapter file"
            );
            return;
        }

        let Some(text) = chapters::generate_chapter_text(&session.records) else {
            tracing::error!(
                session_id = %session.session_id,
                path = %session.output_path.display(),
                "failed to generate chapter text"
            );
            return;
        };

        match self.writer.write(&session.output_path, &text).await {
            Ok(()) => {
                tracing::info!(
                    session_id = %session.session_id,
                    path = %session.output_path.display(),
                    "chapter file written"
                );
            }
            Err(err) => {
                tracing::error!(
                    session_id = %session.session_id,
                    path = %session.output_path.display(),
                    error = %err,
                    "failed to write chapter file"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twitch::StreamInfo;
    use async_trait::async_trait;
    use chapters::ProviderError;
    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeProvider {
        creates: AtomicUsize,
        deletes: AtomicUsize,
    }

    #[async_trait]
    impl EventSubProvider for FakeProvider {
        async fn create_category_subscription(
            &self,
            channel_id: &str,
        ) -> Result<String, ProviderError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(format!("sub-{channel_id}"))
        }

        async fn list_enabled_subscriptions(&self) -> Result<Vec<String>, ProviderError> {
            Ok(vec![])
        }

        async fn delete_subscription(&self, _id: &str) -> Result<(), ProviderError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeStreams {
        offline: AtomicBool,
    }

    #[async_trait]
    impl StreamInfoSource for FakeStreams {
        async fn current_stream(
            &self,
            _channel_id: &str,
        ) -> Result<Option<StreamInfo>, ProviderError> {
            if self.offline.load(Ordering::SeqCst) {
                return Ok(None);
            }
            Ok(Some(StreamInfo {
                game_name: "Factorio".to_string(),
                title: "launch day".to_string(),
            }))
        }
    }

    #[derive(Default)]
    struct CapturingWriter {
        writes: Mutex<Vec<(PathBuf, String)>>,
    }

    #[async_trait]
    impl ChapterWriter for CapturingWriter {
        async fn write(&self, path: &Path, text: &str) -> std::io::Result<()> {
            self.writes
                .lock()
                .unwrap()
                .push((path.to_path_buf(), text.to_string()));
            Ok(())
        }
    }

    struct Harness {
        archiver: Archiver,
        provider: Arc<FakeProvider>,
        streams: Arc<FakeStreams>,
        writer: Arc<CapturingWriter>,
    }

    fn harness() -> Harness {
        let provider = Arc::new(FakeProvider::default());
        let streams = Arc::new(FakeStreams::default());
        let writer = Arc::new(CapturingWriter::default());
        let archiver = Archiver::new(
            provider.clone(),
            streams.clone(),
            writer.clone(),
            PathBuf::from("/vods"),
            100,
            0,
        );
        Harness {
            archiver,
            provider,
            streams,
            writer,
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 18, 0, 0).unwrap()
    }

    fn live(channel_id: &str) -> LiveSignal {
        LiveSignal {
            queue_id: Uuid::new_v4(),
            channel_id: channel_id.to_string(),
            channel: "somestreamer".to_string(),
            id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn live_signal_opens_session_and_subscription() {
        let h = harness();
        h.archiver.handle_live_at(live("123"), t0()).await;

        assert_eq!(h.archiver.active_sessions(), 1);
        assert_eq!(h.provider.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn duplicate_live_signal_is_ignored() {
        let h = harness();
        let signal = live("123");
        h.archiver.handle_live_at(signal.clone(), t0()).await;
        h.archiver.handle_live_at(signal, t0()).await;

        assert_eq!(h.archiver.active_sessions(), 1);
        // The duplicate never reaches the subscription coordinator.
        assert_eq!(h.provider.creates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn offline_channel_does_not_open_a_session() {
        let h = harness();
        h.streams.offline.store(true, Ordering::SeqCst);
        h.archiver.handle_live_at(live("123"), t0()).await;

        assert_eq!(h.archiver.active_sessions(), 0);
    }

    #[tokio::test]
    async fn offline_signal_writes_merged_chapter_text() {
        let h = harness();
        let signal = live("123");
        let queue_id = signal.queue_id;
        let id = signal.id;
        h.archiver.handle_live_at(signal, t0()).await;

        let at = (t0() + Duration::seconds(90)).to_rfc3339();
        h.archiver.handle_update("123", "Celeste", "next game", &at);
        h.archiver.handle_offline(queue_id).await;

        let writes = h.writer.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        let (path, text) = &writes[0];
        assert_eq!(
            *path,
            PathBuf::from(format!("/vods/somestreamer/{id}/{id}-timestamps.txt"))
        );
        assert_eq!(
            *text,
            "00:00:00 Factorio - launch day\n00:01:30 Celeste - next game\n"
        );
        assert_eq!(h.archiver.active_sessions(), 0);
    }

    #[tokio::test]
    async fn offline_for_untracked_session_writes_nothing() {
        let h = harness();
        h.archiver.handle_offline(Uuid::new_v4()).await;
        assert!(h.writer.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_with_bad_timestamp_still_lands_in_the_session() {
        let h = harness();
        let signal = live("123");
        let queue_id = signal.queue_id;
        h.archiver.handle_live_at(signal, t0()).await;

        h.archiver.handle_update("123", "Celeste", "next game", "garbage");
        let at = (t0() + Duration::seconds(180)).to_rfc3339();
        h.archiver.handle_update("123", "Hades", "last game", &at);
        h.archiver.handle_offline(queue_id).await;

        let writes = h.writer.writes.lock().unwrap();
        // The invalid-timestamp record was dropped by the merger; the
        // valid ones render.
        assert_eq!(
            writes[0].1,
            "00:00:00 Factorio - launch day\n00:03:00 Hades - last game\n"
        );
    }

    #[tokio::test]
    async fn recordings_of_a_split_broadcast_get_sequential_parts() {
        let h = harness();
        let first = live("123");
        let second = live("123");
        h.archiver.handle_live_at(first, t0()).await;
        h.archiver
            .handle_live_at(second.clone(), t0() + Duration::minutes(30))
            .await;

        let rendered = h.archiver.finalize_recording_at(
            &RecordedSignal {
                channel_id: "123".to_string(),
                channel: "somestreamer".to_string(),
                id: second.id,
                title: "marathon <day 2>".to_string(),
                started_at: t0() + Duration::minutes(30),
            },
            t0() + Duration::hours(1),
        );

        assert_eq!(rendered.part_number, 2);
        assert_eq!(
            rendered.title,
            "[2026-01-05] PART 2 - marathon ＜day 2＞ [SOMESTREAMER TWITCH VOD]"
        );
    }

    #[tokio::test]
    async fn first_part_title_has_no_part_prefix() {
        let h = harness();
        let signal = live("123");
        h.archiver.handle_live_at(signal.clone(), t0()).await;

        let rendered = h.archiver.finalize_recording_at(
            &RecordedSignal {
                channel_id: "123".to_string(),
                channel: "somestreamer".to_string(),
                id: signal.id,
                title: "chill run".to_string(),
                started_at: t0(),
            },
            t0() + Duration::hours(1),
        );

        assert_eq!(rendered.part_number, 1);
        assert!(!rendered.title.contains("PART"));
    }

    #[tokio::test]
    async fn title_date_follows_the_configured_timezone() {
        // 02:00 UTC on Jan 6 is still the evening of Jan 5 in Pacific.
        let archiver = Archiver::new(
            Arc::new(FakeProvider::default()),
            Arc::new(FakeStreams::default()),
            Arc::new(CapturingWriter::default()),
            PathBuf::from("/vods"),
            100,
            -8,
        );
        let started_at = Utc.with_ymd_and_hms(2026, 1, 6, 2, 0, 0).unwrap();

        let rendered = archiver.finalize_recording_at(
            &RecordedSignal {
                channel_id: "123".to_string(),
                channel: "somestreamer".to_string(),
                id: Uuid::new_v4(),
                title: "late night".to_string(),
                started_at,
            },
            started_at,
        );

        assert!(rendered.title.starts_with("[2026-01-05] "), "{}", rendered.title);
    }

    #[tokio::test]
    async fn shutdown_drains_sessions_and_subscriptions() {
        let h = harness();
        h.archiver.handle_live_at(live("123"), t0()).await;
        h.archiver.handle_live_at(live("456"), t0()).await;

        h.archiver.shutdown().await;

        assert_eq!(h.archiver.active_sessions(), 0);
        assert_eq!(h.archiver.active_subscriptions(), 0);
        assert_eq!(h.writer.writes.lock().unwrap().len(), 2);
        assert_eq!(h.provider.deletes.load(Ordering::SeqCst), 2);
    }
}
