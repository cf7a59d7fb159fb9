//! Deadline classification and change detection.
//!
//! Raw portal rows become [`AssignmentRecord`]s, get bucketed by time
//! remaining against per-student thresholds, and are diffed against the
//! previous poll's snapshot to decide whether a reminder goes out.

mod classify;
mod diff;
mod engine;
mod normalize;
mod types;

pub use classify::{bucket_for, classify};
pub use diff::{changed, diff_keys};
pub use engine::DecisionEngine;
pub use normalize::{normalize_end_time, MalformedTimestamp};
pub use types::{
    AssignmentRecord, ClassificationSnapshot, ClassifiedAssignment, DiffKey, InvalidThresholds,
    PersistedSnapshot, ReminderThresholds, SubmissionStatus, UrgencyBucket, CANONICAL_TIME_FORMAT,
};
