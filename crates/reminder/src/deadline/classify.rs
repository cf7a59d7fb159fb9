//! Urgency bucketing for raw assignment records.

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use super::normalize::normalize_end_time;
use super::types::{
    AssignmentRecord, ClassificationSnapshot, ClassifiedAssignment, ReminderThresholds,
    SubmissionStatus, UrgencyBucket,
};

/// Classifies one student's raw records into a frozen snapshot.
///
/// Submitted records are dropped entirely. A record whose deadline is
/// absent or malformed is skipped in isolation; one bad record never aborts
/// the batch. `report_dropped` controls whether skips surface at WARN or
/// stay at DEBUG.
pub fn classify(
    records: &[AssignmentRecord],
    thresholds: ReminderThresholds,
    now: NaiveDateTime,
    report_dropped: bool,
) -> ClassificationSnapshot {
    let mut snapshot = ClassificationSnapshot::default();

    for record in records {
        if record.submission_status != SubmissionStatus::NotSubmitted {
            continue;
        }

        let end_time = match normalize_end_time(record.end_time.as_deref().unwrap_or("")) {
            Ok(Some(end_time)) => end_time,
            Ok(None) => {
                log_dropped(record, "no deadline", report_dropped);
                continue;
            }
            Err(err) => {
                log_dropped(record, &err.to_string(), report_dropped);
                continue;
            }
        };

        let remaining = (end_time - now).num_seconds();
        snapshot.push(
            bucket_for(remaining, thresholds),
            ClassifiedAssignment {
                course_name: record.course_name.clone(),
                assignment_id: record.id.clone(),
                title: record.title.clone(),
                end_time,
                submission_status: record.submission_status,
                score: record.score,
            },
        );
    }

    snapshot.sort_buckets();
    snapshot
}

/// Pure bucketing rule over remaining seconds until the deadline.
pub fn bucket_for(remaining_secs: i64, thresholds: ReminderThresholds) -> UrgencyBucket {
    if remaining_secs < 0 {
        UrgencyBucket::Late
    } else if remaining_secs < thresholds.urgent_secs() {
        UrgencyBucket::Urgent
    } else if remaining_secs < thresholds.normal_secs() {
        UrgencyBucket::Normal
    } else {
        UrgencyBucket::OutOfThreshold
    }
}

fn log_dropped(record: &AssignmentRecord, reason: &str, report: bool) {
    if report {
        warn!(
            course = %record.course_name,
            title = %record.title,
            raw_end_time = ?record.end_time,
            reason,
            "Dropping assignment from classification"
        );
    } else {
        debug!(
            course = %record.course_name,
            title = %record.title,
            reason,
            "Dropping assignment from classification"
        );
    }
}
