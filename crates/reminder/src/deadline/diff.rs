//! Snapshot change detection over the actionable buckets.
//!
//! Only `urgent` and `normal` participate: movement confined to
//! `out_of_threshold`/`late` is not actionable and must never trigger a
//! notification. Comparison is by the reduced key (course, id, title,
//! normalized deadline, submission status) so metadata drift like a score
//! update stays invisible.

use std::collections::HashSet;

use super::types::{ClassificationSnapshot, ClassifiedAssignment, DiffKey, UrgencyBucket};

const COMPARED_BUCKETS: [UrgencyBucket; 2] = [UrgencyBucket::Urgent, UrgencyBucket::Normal];

/// True iff the urgent or normal bucket differs between the snapshots,
/// order- and duplicate-independent.
pub fn changed(current: &ClassificationSnapshot, previous: &ClassificationSnapshot) -> bool {
    COMPARED_BUCKETS
        .iter()
        .any(|&bucket| diff_keys(current.bucket(bucket)) != diff_keys(previous.bucket(bucket)))
}

/// The comparison-key set for one bucket's entries.
pub fn diff_keys(entries: &[ClassifiedAssignment]) -> HashSet<DiffKey> {
    entries.iter().map(ClassifiedAssignment::diff_key).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::types::SubmissionStatus;
    use chrono::NaiveDateTime;

    fn entry(course: &str, id: &str, ts: &str) -> ClassifiedAssignment {
        ClassifiedAssignment {
            course_name: course.to_string(),
            assignment_id: id.to_string(),
            title: format!("assignment {id}"),
            end_time: NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S").unwrap(),
            submission_status: SubmissionStatus::NotSubmitted,
            score: None,
        }
    }

    #[test]
    fn identical_snapshots_are_unchanged() {
        let mut a = ClassificationSnapshot::default();
        a.urgent.push(entry("Signals", "1", "2024-05-01 18:00:00"));
        a.normal.push(entry("Circuits", "2", "2024-05-03 18:00:00"));
        assert!(!changed(&a, &a.clone()));
    }

    #[test]
    fn order_within_a_bucket_is_irrelevant() {
        let mut a = ClassificationSnapshot::default();
        a.urgent.push(entry("Signals", "1", "2024-05-01 18:00:00"));
        a.urgent.push(entry("Circuits", "2", "2024-05-01 20:00:00"));
        let mut b = ClassificationSnapshot::default();
        b.urgent.push(entry("Circuits", "2", "2024-05-01 20:00:00"));
        b.urgent.push(entry("Signals", "1", "2024-05-01 18:00:00"));
        assert!(!changed(&a, &b));
    }

    #[test]
    fn duplicates_are_irrelevant() {
        let mut a = ClassificationSnapshot::default();
        a.normal.push(entry("Signals", "1", "2024-05-03 18:00:00"));
        a.normal.push(entry("Signals", "1", "2024-05-03 18:00:00"));
        let mut b = ClassificationSnapshot::default();
        b.normal.push(entry("Signals", "1", "2024-05-03 18:00:00"));
        assert!(!changed(&a, &b));
    }

    #[test]
    fn score_drift_is_invisible() {
        let mut a = ClassificationSnapshot::default();
        a.urgent.push(entry("Signals", "1", "2024-05-01 18:00:00"));
        let mut b = a.clone();
        b.urgent[0].score = Some(85.0);
        assert!(!changed(&a, &b));
    }

    #[test]
    fn out_of_threshold_to_late_is_not_a_change() {
        let mut previous = ClassificationSnapshot::default();
        previous
            .out_of_threshold
            .push(entry("Signals", "1", "2024-05-20 18:00:00"));
        let mut current = ClassificationSnapshot::default();
        current.late.push(entry("Signals", "1", "2024-05-20 18:00:00"));
        assert!(!changed(&current, &previous));
    }

    #[test]
    fn new_urgent_entry_is_a_change() {
        let previous = ClassificationSnapshot::default();
        let mut current = ClassificationSnapshot::default();
        current.urgent.push(entry("Signals", "1", "2024-05-01 18:00:00"));
        assert!(changed(&current, &previous));
    }

    #[test]
    fn moving_between_normal_and_urgent_is_a_change() {
        let mut previous = ClassificationSnapshot::default();
        previous.normal.push(entry("Signals", "1", "2024-05-03 18:00:00"));
        let mut current = ClassificationSnapshot::default();
        current.urgent.push(entry("Signals", "1", "2024-05-03 18:00:00"));
        assert!(changed(&current, &previous));
    }

    #[test]
    fn deadline_shift_within_a_bucket_is_a_change() {
        let mut previous = ClassificationSnapshot::default();
        previous.urgent.push(entry("Signals", "1", "2024-05-01 18:00:00"));
        let mut current = ClassificationSnapshot::default();
        current.urgent.push(entry("Signals", "1", "2024-05-01 20:00:00"));
        assert!(changed(&current, &previous));
    }
}
