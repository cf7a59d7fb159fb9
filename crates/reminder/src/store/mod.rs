/// Durable state: per-student snapshot files and the user roster.
mod roster;

pub use roster::{RosterStore, UserRecord};

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::deadline::{
    ClassificationSnapshot, ClassifiedAssignment, PersistedSnapshot, SubmissionStatus,
    UrgencyBucket, CANONICAL_TIME_FORMAT,
};

/// One row of a persisted snapshot file.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotRow {
    course_name: String,
    assignment_title: String,
    assignment_id: String,
    end_time: String,
    submission_status: SubmissionStatus,
    bucket: UrgencyBucket,
}

/// Stores the last-computed classification per student, one UTF-8 CSV file
/// per student id under a fixed directory. Absence of a file reads as an
/// all-empty snapshot.
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create snapshot directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, student_id: &str) -> PathBuf {
        self.dir.join(format!("{student_id}.csv"))
    }

    /// Loads the persisted snapshot for one student; a missing file is an
    /// empty snapshot, never an error.
    pub fn load(&self, student_id: &str) -> Result<PersistedSnapshot> {
        let path = self.path_for(student_id);
        if !path.exists() {
            return Ok(PersistedSnapshot::default());
        }

        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("failed to open snapshot {}", path.display()))?;
        let mut snapshot = PersistedSnapshot::default();
        for row in reader.deserialize::<SnapshotRow>() {
            let row = row.with_context(|| format!("corrupt snapshot row in {}", path.display()))?;
            let end_time = NaiveDateTime::parse_from_str(&row.end_time, CANONICAL_TIME_FORMAT)
                .with_context(|| {
                    format!("bad end_time {:?} in {}", row.end_time, path.display())
                })?;
            snapshot.push(
                row.bucket,
                ClassifiedAssignment {
                    course_name: row.course_name,
                    assignment_id: row.assignment_id,
                    title: row.assignment_title,
                    end_time,
                    submission_status: row.submission_status,
                    score: None,
                },
            );
        }
        Ok(snapshot)
    }

    /// Fully replaces the student's persisted snapshot. Rows are written in
    /// the fixed bucket order, ascending deadline within each bucket, and
    /// the file is swapped in as a unit (write-temp-then-rename).
    pub fn save(&self, student_id: &str, snapshot: &ClassificationSnapshot) -> Result<()> {
        let path = self.path_for(student_id);
        let tmp = self.dir.join(format!(".{student_id}.csv.tmp"));

        {
            let mut writer = csv::Writer::from_path(&tmp)
                .with_context(|| format!("failed to create {}", tmp.display()))?;
            for (bucket, entry) in snapshot.iter_ordered() {
                writer
                    .serialize(SnapshotRow {
                        course_name: entry.course_name.clone(),
                        assignment_title: entry.title.clone(),
                        assignment_id: entry.assignment_id.clone(),
                        end_time: entry.end_time.format(CANONICAL_TIME_FORMAT).to_string(),
                        submission_status: entry.submission_status,
                        bucket,
                    })
                    .with_context(|| format!("failed to write snapshot row for {student_id}"))?;
            }
            writer
                .flush()
                .with_context(|| format!("failed to flush snapshot for {student_id}"))?;
        }

        fs::rename(&tmp, &path).with_context(|| {
            format!("failed to replace snapshot {} atomically", path.display())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::diff_keys;
    use chrono::NaiveDateTime;
    use tempfile::TempDir;

    fn entry(course: &str, id: &str, ts: &str) -> ClassifiedAssignment {
        ClassifiedAssignment {
            course_name: course.to_string(),
            assignment_id: id.to_string(),
            title: format!("assignment {id}"),
            end_time: NaiveDateTime::parse_from_str(ts, CANONICAL_TIME_FORMAT).unwrap(),
            submission_status: SubmissionStatus::NotSubmitted,
            score: None,
        }
    }

    fn sample_snapshot() -> ClassificationSnapshot {
        let mut snapshot = ClassificationSnapshot::default();
        snapshot.urgent.push(entry("Signals", "u1", "2024-05-01 18:00:00"));
        snapshot.normal.push(entry("Circuits", "n1", "2024-05-03 18:00:00"));
        snapshot
            .out_of_threshold
            .push(entry("Algebra", "o1", "2024-06-01 18:00:00"));
        snapshot.late.push(entry("History", "l1", "2024-04-01 18:00:00"));
        snapshot
    }

    #[test]
    fn missing_file_loads_as_empty_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        let loaded = store.load("nobody").unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn round_trip_preserves_every_bucket_under_the_diff_key() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        let snapshot = sample_snapshot();
        store.save("20230001", &snapshot).unwrap();
        let loaded = store.load("20230001").unwrap();

        for bucket in UrgencyBucket::ORDERED {
            assert_eq!(
                diff_keys(snapshot.bucket(bucket)),
                diff_keys(loaded.bucket(bucket)),
                "bucket {bucket:?} did not round-trip"
            );
        }
    }

    #[test]
    fn save_fully_replaces_the_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        store.save("20230001", &sample_snapshot()).unwrap();

        let mut second = ClassificationSnapshot::default();
        second.normal.push(entry("Optics", "n9", "2024-05-05 10:00:00"));
        store.save("20230001", &second).unwrap();

        let loaded = store.load("20230001").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.normal[0].assignment_id, "n9");
        assert!(loaded.urgent.is_empty());
    }

    #[test]
    fn students_never_collide() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        store.save("alice", &sample_snapshot()).unwrap();
        store.save("bob", &ClassificationSnapshot::default()).unwrap();

        assert_eq!(store.load("alice").unwrap().len(), 4);
        assert!(store.load("bob").unwrap().is_empty());
    }

    #[test]
    fn rows_are_written_in_fixed_bucket_order() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path()).unwrap();
        store.save("20230001", &sample_snapshot()).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("20230001.csv")).unwrap();
        let buckets: Vec<&str> = raw
            .lines()
            .skip(1)
            .map(|line| line.rsplit(',').next().unwrap())
            .collect();
        assert_eq!(buckets, vec!["urgent", "normal", "out_of_threshold", "late"]);
    }
}
