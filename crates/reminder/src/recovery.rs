//! One-time password-recovery links.

use anyhow::{Context, Result};
use chrono::Utc;
use rand::RngCore;
use sha2::{Digest, Sha256};
use url::Url;

/// Derives an opaque per-request token from the student id, fresh random
/// bytes, and the current time. Not a session credential; the receiving
/// page does its own verification.
pub fn recovery_token(student_id: &str) -> String {
    let mut nonce = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut nonce);

    let mut hasher = Sha256::new();
    hasher.update(student_id.as_bytes());
    hasher.update(nonce);
    hasher.update(
        Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .to_le_bytes(),
    );
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Builds the recovery URL embedded in the notification email.
pub fn recovery_link(base: &str, student_id: &str) -> Result<String> {
    let mut url = Url::parse(base).with_context(|| format!("invalid recovery link base {base}"))?;
    url.query_pairs_mut()
        .append_pair("student_id", student_id)
        .append_pair("token", &recovery_token(student_id));
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_hex_sha256_digests() {
        let token = recovery_token("20230001");
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_differ_between_calls() {
        assert_ne!(recovery_token("20230001"), recovery_token("20230001"));
    }

    #[test]
    fn link_carries_student_id_and_token() {
        let link = recovery_link("https://example.com/reset", "20230001").unwrap();
        let url = Url::parse(&link).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs[0].0, "student_id");
        assert_eq!(pairs[0].1, "20230001");
        assert_eq!(pairs[1].0, "token");
        assert_eq!(pairs[1].1.len(), 64);
    }

    #[test]
    fn invalid_base_is_rejected() {
        assert!(recovery_link("not a url", "20230001").is_err());
    }
}
