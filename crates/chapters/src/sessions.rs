//! In-memory registry of active broadcast sessions.
//!
//! A session tracks one instance of a channel being live, scoped between
//! the "went live" and "went offline" signals for its externally supplied
//! id. `append_category_change` is the sole mutator of a session's record
//! sequence; `end_session` and `drain_all` are the sole removers.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::record::CategoryRecord;

/// One tracked live session.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: Uuid,
    pub channel_id: String,
    pub channel_name: String,
    /// Category-change sequence, in provider delivery order.
    pub records: Vec<CategoryRecord>,
    /// Where the rendered chapter text should land.
    pub output_path: PathBuf,
}

/// In-memory session registry keyed by session id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<Uuid, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Begin tracking a session.
    ///
    /// A duplicate "went live" signal for an already tracked id must not
    /// create a second session; it is logged and ignored. Returns whether
    /// a session was created.
    pub fn start_session(
        &self,
        session_id: Uuid,
        channel_id: impl Into<String>,
        channel_name: impl Into<String>,
        initial: CategoryRecord,
        output_path: PathBuf,
    ) -> bool {
        match self.sessions.entry(session_id) {
            Entry::Occupied(_) => {
                tracing::warn!(
                    session_id = %session_id,
                    "session already tracked, ignoring duplicate start"
                );
                false
            }
            Entry::Vacant(slot) => {
                let channel_id = channel_id.into();
                let channel_name = channel_name.into();
                tracing::info!(
                    session_id = %session_id,
                    channel_id = %channel_id,
                    channel = %channel_name,
                    game = %initial.game,
                    title = %initial.title,
                    "session started"
                );
                slot.insert(Session {
                    session_id,
                    channel_id,
                    channel_name,
                    records: vec![initial],
                    output_path,
                });
                true
            }
        }
    }

    /// Fan a category change out to every session on `channel_id`.
    ///
    /// A session only gets a new record when the incoming labels differ
    /// from its last record; redelivered identical updates are absorbed.
    /// An empty record sequence takes the update unconditionally -
    /// defensive recovery, the initial record should have been there.
    pub fn append_category_change(
        &self,
        channel_id: &str,
        game: &str,
        title: &str,
        at: Option<DateTime<Utc>>,
    ) {
        for mut entry in self.sessions.iter_mut() {
            let session = entry.value_mut();
            if session.channel_id != channel_id {
                continue;
            }
            match session.records.last() {
                Some(last) if !last.labels_differ(game, title) => {}
                Some(_) => {
                    tracing::info!(
                        session_id = %session.session_id,
                        game, title,
                        "category changed"
                    );
                    session.records.push(CategoryRecord {
                        game: game.to_string(),
                        title: title.to_string(),
                        start_timestamp: at,
                    });
                }
                None => {
                    tracing::warn!(
                        session_id = %session.session_id,
                        "record sequence was empty, recovering from update event"
                    );
                    session.records.push(CategoryRecord {
                        game: game.to_string(),
                        title: title.to_string(),
                        start_timestamp: at,
                    });
                }
            }
        }
    }

    /// Remove and return a session. `None` if the id is untracked.
    pub fn end_session(&self, session_id: Uuid) -> Option<Session> {
        self.sessions.remove(&session_id).map(|(_, session)| session)
    }

    /// Remove and return every tracked session, for the shutdown flush.
    pub fn drain_all(&self) -> Vec<Session> {
        let ids: Vec<Uuid> = self.sessions.iter().map(|entry| *entry.key()).collect();
        let mut drained = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some((_, session)) = self.sessions.remove(&id) {
                drained.push(session);
            }
        }
        drained
    }

    pub fn contains(&self, session_id: Uuid) -> bool {
        self.sessions.contains_key(&session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
