//! Cache keys for gating schedule recomputation.
//!
//! The admin app skips fetching a fresh server preview when the list of rule
//! ids is unchanged. That key ignores edits to a rule's content, so an edited
//! rule keeps showing its old preview until the id list changes. The key is
//! reproduced here as [`rule_id_key`] for compatibility; callers that need
//! correct invalidation should compare [`content_fingerprint`] instead.

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::rule::RuleRecord;

/// The admin app's coarse cache key: rule ids in order, comma-separated.
///
/// Stale-prone: two rule sets with the same ids but different content share
/// this key.
pub fn rule_id_key(rules: &[RuleRecord]) -> String {
    rules
        .iter()
        .map(|rule| rule.id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// SHA-256 over the canonical JSON of the rules, hex-encoded.
///
/// Any change to any field of any rule, or to their order, changes the
/// fingerprint.
pub fn content_fingerprint(rules: &[RuleRecord]) -> Result<String> {
    let canonical = serde_json::to_vec(rules)?;
    let digest = Sha256::digest(&canonical);
    Ok(format!("{digest:x}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(work_time: &str) -> Vec<RuleRecord> {
        let json = format!(
            r#"[{{"id": 1, "duty_time": [{{"work_type": "daily", "work_time": "{work_time}"}}],
                 "duty_users": [[{{"id": "alice"}}]]}},
                {{"id": 2, "duty_time": [{{"work_type": "daily", "work_time": "09:00--18:00"}}],
                 "duty_users": [[{{"id": "bob"}}]]}}]"#
        );
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn id_key_ignores_content_changes() {
        assert_eq!(rule_id_key(&rules("09:00--18:00")), "1,2");
        assert_eq!(
            rule_id_key(&rules("09:00--18:00")),
            rule_id_key(&rules("10:00--18:00"))
        );
    }

    #[test]
    fn fingerprint_detects_content_changes() {
        let a = content_fingerprint(&rules("09:00--18:00")).unwrap();
        let b = content_fingerprint(&rules("10:00--18:00")).unwrap();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert_eq!(a, content_fingerprint(&rules("09:00--18:00")).unwrap());
    }

    #[test]
    fn fingerprint_is_lowercase_hex_of_the_digest() {
        let input = rules("09:00--18:00");
        let expected = Sha256::digest(serde_json::to_vec(&input).unwrap());
        let fingerprint = content_fingerprint(&input).unwrap();
        assert_eq!(fingerprint, format!("{expected:x}"));
        assert!(fingerprint
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }
}
