//! Operator-maintained user roster, stored as a flat CSV file.
//!
//! The file is shared ground: operators append rows by hand while the
//! service is running. Write-back therefore re-reads the file and merges,
//! keyed by `(student_id, email)`, instead of blindly overwriting.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::deadline::{ReminderThresholds, CANONICAL_TIME_FORMAT};

/// One roster row. A student may appear once per destination address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub student_id: String,
    pub email: String,
    #[serde(with = "roster_timestamp", default)]
    pub last_notified: Option<NaiveDateTime>,
    pub normal_threshold_hours: i64,
    pub urgent_threshold_hours: i64,
    /// Empty means "derive the portal default for this student id".
    #[serde(default)]
    pub stored_password: String,
    /// 1 while the stored credential is known to work.
    #[serde(default)]
    pub password_confirmed: u8,
    /// 1 once the one-shot recovery email has gone out; cleared when the
    /// credential is confirmed again.
    #[serde(default)]
    pub password_notified: u8,
}

impl UserRecord {
    pub fn thresholds(&self) -> Result<ReminderThresholds> {
        ReminderThresholds::new(self.normal_threshold_hours, self.urgent_threshold_hours)
            .with_context(|| format!("invalid thresholds for student {}", self.student_id))
    }

    /// The credential to present to the portal.
    pub fn portal_password(&self) -> String {
        if self.stored_password.is_empty() {
            format!("Bjtu@{}", self.student_id)
        } else {
            self.stored_password.clone()
        }
    }

    fn key(&self) -> (String, String) {
        (self.student_id.clone(), self.email.clone())
    }
}

mod roster_timestamp {
    use super::CANONICAL_TIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&ts.format(CANONICAL_TIME_FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        NaiveDateTime::parse_from_str(raw.trim(), CANONICAL_TIME_FORMAT)
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}

pub struct RosterStore {
    path: PathBuf,
}

impl RosterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads every roster row. The roster is operator-provided, so a
    /// missing file is an error. Rows with invalid thresholds are skipped
    /// with a warning rather than poisoning the cycle.
    pub fn load_all(&self) -> Result<Vec<UserRecord>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("failed to open roster {}", self.path.display()))?;

        let mut users = Vec::new();
        for row in reader.deserialize::<UserRecord>() {
            let user = row.with_context(|| format!("corrupt roster row in {}", self.path.display()))?;
            if let Err(err) = user.thresholds() {
                warn!(student_id = %user.student_id, error = %err, "Skipping roster row");
                continue;
            }
            users.push(user);
        }
        Ok(users)
    }

    /// Read-then-merge-then-write. Our rows are upserted; rows added to the
    /// file since we last read it are preserved untouched.
    pub fn write_back(&self, users: &[UserRecord]) -> Result<()> {
        let ours: HashSet<(String, String)> = users.iter().map(UserRecord::key).collect();

        let mut merged: Vec<UserRecord> = users.to_vec();
        if let Ok(mut reader) = csv::Reader::from_path(&self.path) {
            for row in reader.deserialize::<UserRecord>().flatten() {
                if !ours.contains(&row.key()) {
                    merged.push(row);
                }
            }
        }

        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp)
                .with_context(|| format!("failed to create {}", tmp.display()))?;
            for user in &merged {
                writer
                    .serialize(user)
                    .with_context(|| format!("failed to write roster row for {}", user.student_id))?;
            }
            writer.flush().context("failed to flush roster")?;
        }
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace roster {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn user(student_id: &str, email: &str) -> UserRecord {
        UserRecord {
            student_id: student_id.to_string(),
            email: email.to_string(),
            last_notified: None,
            normal_threshold_hours: 96,
            urgent_threshold_hours: 24,
            stored_password: String::new(),
            password_confirmed: 1,
            password_notified: 0,
        }
    }

    #[test]
    fn round_trips_all_fields() {
        let dir = TempDir::new().unwrap();
        let store = RosterStore::new(dir.path().join("users.csv"));
        let mut original = user("20230001", "a@example.edu");
        original.last_notified = Some(
            NaiveDateTime::parse_from_str("2024-05-01 12:00:00", CANONICAL_TIME_FORMAT).unwrap(),
        );
        original.stored_password = "hunter2".to_string();
        store.write_back(&[original.clone()]).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, vec![original]);
    }

    #[test]
    fn write_back_preserves_externally_appended_rows() {
        let dir = TempDir::new().unwrap();
        let store = RosterStore::new(dir.path().join("users.csv"));
        store.write_back(&[user("20230001", "a@example.edu")]).unwrap();

        // Someone appends a new student while our cycle is running.
        let appended = user("20239999", "new@example.edu");
        let mut on_disk = store.load_all().unwrap();
        on_disk.push(appended.clone());
        store.write_back(&on_disk).unwrap();

        // Our cycle finishes with only the original row in memory.
        let mut processed = user("20230001", "a@example.edu");
        processed.password_notified = 1;
        store.write_back(&[processed.clone()]).unwrap();

        let merged = store.load_all().unwrap();
        assert_eq!(merged.len(), 2);
        assert!(merged.contains(&processed));
        assert!(merged.contains(&appended));
    }

    #[test]
    fn write_back_upserts_by_student_and_email() {
        let dir = TempDir::new().unwrap();
        let store = RosterStore::new(dir.path().join("users.csv"));
        store
            .write_back(&[user("20230001", "a@example.edu"), user("20230001", "b@example.edu")])
            .unwrap();

        let mut updated = user("20230001", "a@example.edu");
        updated.password_confirmed = 0;
        store.write_back(&[updated.clone()]).unwrap();

        let merged = store.load_all().unwrap();
        assert_eq!(merged.len(), 2);
        assert!(merged.contains(&updated));
        assert!(merged.contains(&user("20230001", "b@example.edu")));
    }

    #[test]
    fn rows_with_inverted_thresholds_are_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.csv");
        std::fs::write(
            &path,
            "student_id,email,last_notified,normal_threshold_hours,urgent_threshold_hours,stored_password,password_confirmed,password_notified\n\
             20230001,a@example.edu,,24,96,,1,0\n\
             20230002,b@example.edu,,96,24,,1,0\n",
        )
        .unwrap();

        let loaded = RosterStore::new(path).load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].student_id, "20230002");
    }

    #[test]
    fn default_password_is_derived_from_student_id() {
        let u = user("20230001", "a@example.edu");
        assert_eq!(u.portal_password(), "Bjtu@20230001");

        let mut with_password = u;
        with_password.stored_password = "secret".to_string();
        assert_eq!(with_password.portal_password(), "secret");
    }

    #[test]
    fn missing_roster_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = RosterStore::new(dir.path().join("absent.csv"));
        assert!(store.load_all().is_err());
    }
}
