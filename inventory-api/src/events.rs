//! Mutation events.
//!
//! Every repository create/update/delete reports a [`ChangeEvent`] to a
//! [`ChangeSink`] once its transaction has committed. Production uses
//! [`TracingSink`]; tests assert against a [`RecordingSink`].

use std::fmt;
use std::sync::Mutex;

use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    pub fn verb(&self) -> &'static str {
        match self {
            ChangeKind::Created => "CREATE",
            ChangeKind::Updated => "UPDATE",
            ChangeKind::Deleted => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub model: &'static str,
    pub id: i32,
}

impl ChangeEvent {
    pub fn created(model: &'static str, id: i32) -> Self {
        ChangeEvent { kind: ChangeKind::Created, model, id }
    }

    pub fn updated(model: &'static str, id: i32) -> Self {
        ChangeEvent { kind: ChangeKind::Updated, model, id }
    }

    pub fn deleted(model: &'static str, id: i32) -> Self {
        ChangeEvent { kind: ChangeKind::Deleted, model, id }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Model {} - {} (ID: {})", self.kind.verb(), self.model, self.id)
    }
}

pub trait ChangeSink: Send + Sync {
    fn emit(&self, event: ChangeEvent);

    fn emit_all(&self, events: Vec<ChangeEvent>) {
        for event in events {
            self.emit(event);
        }
    }
}

/// Writes each event as a structured log line on the `inventory_api::events`
/// target, which the logging setup routes to `database.log`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ChangeSink for TracingSink {
    fn emit(&self, event: ChangeEvent) {
        info!(
            target: "inventory_api::events",
            model = event.model,
            id = event.id,
            action = event.kind.verb(),
            "{}",
            event
        );
    }
}

#[derive(Debug, Default)]
pub struct NullSink;

impl ChangeSink for NullSink {
    fn emit(&self, _event: ChangeEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ChangeEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ChangeEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn clear(&self) {
        match self.events.lock() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}

impl ChangeSink for RecordingSink {
    fn emit(&self, event: ChangeEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
