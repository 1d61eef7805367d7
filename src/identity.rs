//! Content fingerprints used as the per-run deduplication key.
//!
//! The fingerprint covers only `source`, `title` and `link`: the same headline
//! re-served with freshly extracted text or a different timestamp is still the
//! same article.

use sha2::{Digest, Sha256};

use crate::models::Candidate;

const DELIMITER: &str = "|";

/// Compute the fingerprint of an article identified by source, title and link.
///
/// # Returns
///
/// A 64-character lowercase hex SHA-256 digest.
pub fn fingerprint(source: &str, title: &str, link: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update(DELIMITER.as_bytes());
    hasher.update(title.as_bytes());
    hasher.update(DELIMITER.as_bytes());
    hasher.update(link.as_bytes());
    hex::encode(hasher.finalize())
}

/// Identity of a candidate yielded by `source`.
///
/// Known before the article body is fetched, so duplicates can be dropped early.
pub fn compute_id(source: &str, candidate: &Candidate) -> String {
    fingerprint(source, &candidate.title, &candidate.link)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_fixed_length_hex() {
        let id = fingerprint("Kyiv Wire", "Headline", "https://news.example/a");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = fingerprint("Kyiv Wire", "Headline", "https://news.example/a");
        let b = fingerprint("Kyiv Wire", "Headline", "https://news.example/a");
        assert_eq!(a, b);
    }

    #[test]
    fn test_each_field_participates() {
        let base = fingerprint("Kyiv Wire", "Headline", "https://news.example/a");
        assert_ne!(base, fingerprint("Other Wire", "Headline", "https://news.example/a"));
        assert_ne!(base, fingerprint("Kyiv Wire", "Other", "https://news.example/a"));
        assert_ne!(base, fingerprint("Kyiv Wire", "Headline", "https://news.example/b"));
    }

    #[test]
    fn test_compute_id_ignores_description_and_dates() {
        let make = |description: &str, pub_date: Option<&str>| Candidate {
            title: "Headline".to_string(),
            link: "https://news.example/a".to_string(),
            pub_date: pub_date.map(str::to_string),
            description: description.to_string(),
        };

        let first = make("", None);
        let second = make("A longer summary", Some("Mon, 13 Oct 2025 09:30:00 GMT"));
        assert_eq!(compute_id("Kyiv Wire", &first), compute_id("Kyiv Wire", &second));
        assert_eq!(
            compute_id("Kyiv Wire", &first),
            fingerprint("Kyiv Wire", "Headline", "https://news.example/a")
        );
        assert_ne!(compute_id("Kyiv Wire", &first), compute_id("Other Wire", &first));
    }
}
