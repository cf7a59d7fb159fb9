//! Orchestrates classification, diffing, persistence, and notification for
//! one student per poll.

use anyhow::Result;
use chrono::NaiveDateTime;
use tracing::{info, warn};

use super::classify::classify;
use super::diff::changed;
use super::types::{AssignmentRecord, ClassificationSnapshot, ReminderThresholds};
use crate::mailer::ReminderSink;
use crate::store::SnapshotStore;

/// Stateless per-poll decision pipeline: classify, diff against the
/// persisted snapshot, persist unconditionally, notify conditionally.
pub struct DecisionEngine<'a, S> {
    store: &'a SnapshotStore,
    sink: &'a S,
    report_dropped: bool,
}

impl<'a, S: ReminderSink> DecisionEngine<'a, S> {
    pub fn new(store: &'a SnapshotStore, sink: &'a S, report_dropped: bool) -> Self {
        Self {
            store,
            sink,
            report_dropped,
        }
    }

    /// Runs one detection cycle for one student. Returns the fresh snapshot
    /// when a notification was attempted, `None` otherwise.
    pub async fn process(
        &self,
        student_id: &str,
        email: &str,
        records: &[AssignmentRecord],
        thresholds: ReminderThresholds,
        now: NaiveDateTime,
    ) -> Result<Option<ClassificationSnapshot>> {
        let current = classify(records, thresholds, now, self.report_dropped);
        let previous = self.store.load(student_id)?;
        let is_changed = changed(&current, &previous);

        // The next poll must diff against exactly this cycle's state, so
        // the save happens before the notification decision.
        self.store.save(student_id, &current)?;

        if !is_changed || !current.has_actionable() {
            info!(
                student_id,
                changed = is_changed,
                pending = current.len(),
                "No notification warranted"
            );
            return Ok(None);
        }

        info!(
            student_id,
            urgent = current.urgent.len(),
            normal = current.normal.len(),
            "Deadline state changed; sending reminder"
        );
        if let Err(err) = self.sink.send_reminder(&current, email).await {
            // A lost email must not re-trigger itself forever; the saved
            // snapshot stands either way.
            warn!(student_id, email, error = %err, "Reminder delivery failed");
        }
        Ok(Some(current))
    }
}
