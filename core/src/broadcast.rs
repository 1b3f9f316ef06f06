//! Event sinks: the narrow seam to the external fan-out layer.
//!
//! RULE: Publishing is best-effort. A sink failure is logged and dropped;
//! it never unwinds state that has already been committed.

use crate::{
    error::GameResult,
    event::{EventLogEntry, GameEvent},
    store::{to_millis, GameStore},
};
use chrono::Utc;
use std::sync::mpsc::Sender;

pub trait EventSink: Send {
    fn publish(&self, event: &GameEvent) -> GameResult<()>;
}

/// Publish and swallow failures. Used after every commit.
pub fn publish_best_effort(sink: &dyn EventSink, event: GameEvent) {
    if let Err(e) = sink.publish(&event) {
        log::warn!("round={} dropped {} event: {e}", event.round(), event.name());
    }
}

/// Discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: &GameEvent) -> GameResult<()> {
        Ok(())
    }
}

/// Forwards to an in-process channel (the runner's stdout writer, tests).
impl EventSink for Sender<GameEvent> {
    fn publish(&self, event: &GameEvent) -> GameResult<()> {
        self.send(event.clone())
            .map_err(|e| anyhow::anyhow!("event channel closed: {e}"))?;
        Ok(())
    }
}

/// Appends every event to the event_log table on its own connection,
/// so a publish never joins the caller's transaction.
pub struct EventLogSink {
    store: GameStore,
}

impl EventLogSink {
    pub fn new(store: GameStore) -> Self {
        Self { store }
    }
}

impl EventSink for EventLogSink {
    fn publish(&self, event: &GameEvent) -> GameResult<()> {
        let entry = EventLogEntry {
            id:         None,
            round:      event.round(),
            event_type: event.name().to_string(),
            payload:    serde_json::to_string(event)?,
            created_at: to_millis(Utc::now()),
        };
        self.store.append_event(&entry)
    }
}
