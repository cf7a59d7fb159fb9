/// Types for the deadline classification core
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The single timestamp layout everything downstream of the normalizer
/// agrees on: second precision, no timezone (the portal is wall-clock).
pub const CANONICAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Submission state as reported by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionStatus {
    Submitted,
    NotSubmitted,
    /// Anything the portal reports that we don't recognize (returned,
    /// graded offline, ...). Never a classification candidate.
    Other,
}

impl SubmissionStatus {
    /// Maps the portal's status strings onto the canonical enum.
    pub fn from_portal(raw: &str) -> Self {
        match raw.trim() {
            "未提交" => SubmissionStatus::NotSubmitted,
            "已提交" => SubmissionStatus::Submitted,
            _ => SubmissionStatus::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::NotSubmitted => "not-submitted",
            SubmissionStatus::Other => "other",
        }
    }
}

/// One unit of work for one course, as handed to the classifier.
///
/// `end_time` is the raw string the portal reported; normalization happens
/// during classification so a malformed value can be isolated per record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub id: String,
    pub title: String,
    pub course_name: String,
    pub end_time: Option<String>,
    pub submission_status: SubmissionStatus,
    pub score: Option<f64>,
}

/// Urgency class for a not-submitted assignment with a resolvable deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyBucket {
    Urgent,
    Normal,
    OutOfThreshold,
    Late,
}

impl UrgencyBucket {
    /// Fixed presentation and persistence order.
    pub const ORDERED: [UrgencyBucket; 4] = [
        UrgencyBucket::Urgent,
        UrgencyBucket::Normal,
        UrgencyBucket::OutOfThreshold,
        UrgencyBucket::Late,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyBucket::Urgent => "urgent",
            UrgencyBucket::Normal => "normal",
            UrgencyBucket::OutOfThreshold => "out_of_threshold",
            UrgencyBucket::Late => "late",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid reminder thresholds: urgent {urgent_hours}h exceeds normal {normal_hours}h")]
pub struct InvalidThresholds {
    pub normal_hours: i64,
    pub urgent_hours: i64,
}

/// The `(normal_hours, urgent_hours)` pair separating the buckets.
///
/// Invariant: `0 <= urgent_hours <= normal_hours`, enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderThresholds {
    normal_hours: i64,
    urgent_hours: i64,
}

impl ReminderThresholds {
    pub fn new(normal_hours: i64, urgent_hours: i64) -> Result<Self, InvalidThresholds> {
        if urgent_hours < 0 || urgent_hours > normal_hours {
            return Err(InvalidThresholds {
                normal_hours,
                urgent_hours,
            });
        }
        Ok(Self {
            normal_hours,
            urgent_hours,
        })
    }

    pub fn normal_secs(&self) -> i64 {
        self.normal_hours * 3600
    }

    pub fn urgent_secs(&self) -> i64 {
        self.urgent_hours * 3600
    }
}

/// A not-submitted assignment with its normalized deadline, ready for
/// diffing, persistence, and presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedAssignment {
    pub course_name: String,
    pub assignment_id: String,
    pub title: String,
    pub end_time: NaiveDateTime,
    pub submission_status: SubmissionStatus,
    /// Passed through for presentation; never part of the comparison key.
    pub score: Option<f64>,
}

/// The reduced key the change detector compares on. Excludes score and any
/// other metadata that would cause spurious notifications on drift.
pub type DiffKey = (String, String, String, NaiveDateTime, SubmissionStatus);

impl ClassifiedAssignment {
    pub fn diff_key(&self) -> DiffKey {
        (
            self.course_name.clone(),
            self.assignment_id.clone(),
            self.title.clone(),
            self.end_time,
            self.submission_status,
        )
    }
}

/// The complete bucketed view of one student's pending work at one instant.
///
/// Built once per poll, then frozen; the engine never mutates a snapshot
/// after classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationSnapshot {
    pub urgent: Vec<ClassifiedAssignment>,
    pub normal: Vec<ClassifiedAssignment>,
    pub out_of_threshold: Vec<ClassifiedAssignment>,
    pub late: Vec<ClassifiedAssignment>,
}

/// The durable counterpart of a [`ClassificationSnapshot`], as loaded from
/// the per-student store. Structurally identical.
pub type PersistedSnapshot = ClassificationSnapshot;

impl ClassificationSnapshot {
    pub fn bucket(&self, bucket: UrgencyBucket) -> &[ClassifiedAssignment] {
        match bucket {
            UrgencyBucket::Urgent => &self.urgent,
            UrgencyBucket::Normal => &self.normal,
            UrgencyBucket::OutOfThreshold => &self.out_of_threshold,
            UrgencyBucket::Late => &self.late,
        }
    }

    pub(crate) fn push(&mut self, bucket: UrgencyBucket, entry: ClassifiedAssignment) {
        let target = match bucket {
            UrgencyBucket::Urgent => &mut self.urgent,
            UrgencyBucket::Normal => &mut self.normal,
            UrgencyBucket::OutOfThreshold => &mut self.out_of_threshold,
            UrgencyBucket::Late => &mut self.late,
        };
        target.push(entry);
    }

    /// Sorts every bucket ascending by normalized deadline.
    pub(crate) fn sort_buckets(&mut self) {
        self.urgent.sort_by_key(|a| a.end_time);
        self.normal.sort_by_key(|a| a.end_time);
        self.out_of_threshold.sort_by_key(|a| a.end_time);
        self.late.sort_by_key(|a| a.end_time);
    }

    /// Iterates all entries in the fixed bucket order, ascending deadline
    /// within each bucket.
    pub fn iter_ordered(&self) -> impl Iterator<Item = (UrgencyBucket, &ClassifiedAssignment)> {
        UrgencyBucket::ORDERED
            .into_iter()
            .flat_map(move |bucket| self.bucket(bucket).iter().map(move |entry| (bucket, entry)))
    }

    /// True when the urgent or normal bucket holds at least one entry.
    pub fn has_actionable(&self) -> bool {
        !self.urgent.is_empty() || !self.normal.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.urgent.is_empty()
            && self.normal.is_empty()
            && self.out_of_threshold.is_empty()
            && self.late.is_empty()
    }

    pub fn len(&self) -> usize {
        self.urgent.len() + self.normal.len() + self.out_of_threshold.len() + self.late.len()
    }
}
