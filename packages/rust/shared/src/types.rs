//! Core domain types for devread posts.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Post
// ---------------------------------------------------------------------------

/// A canonical article record extracted from one listing entry.
///
/// Construction goes through [`Post::new`], which rejects an empty name or
/// link and derives the identity. Fields are read-only afterwards; updates
/// happen to the persisted copy, never to this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    post_id: String,
    name: String,
    link: String,
    #[serde(default)]
    tags: Vec<String>,
}

impl Post {
    /// Build a post from raw extracted fields.
    ///
    /// Name and link are trimmed; tags are normalized and empty ones dropped.
    /// Returns `None` when either required field is empty.
    pub fn new(name: &str, link: &str, tags: impl IntoIterator<Item = String>) -> Option<Self> {
        let name = name.trim();
        let link = link.trim();
        if name.is_empty() || link.is_empty() {
            return None;
        }

        let mut normalized: Vec<String> = Vec::new();
        for tag in tags {
            let tag = normalize_tag(&tag);
            if !tag.is_empty() && !normalized.contains(&tag) {
                normalized.push(tag);
            }
        }

        Some(Self {
            post_id: post_identity(name, link),
            name: name.to_string(),
            link: link.to_string(),
            tags: normalized,
        })
    }

    /// Rehydrate a persisted post exactly as stored (no recomputation).
    pub fn from_stored(post_id: String, name: String, link: String, tags: Vec<String>) -> Self {
        Self {
            post_id,
            name,
            link,
            tags,
        }
    }

    /// Content-addressed identity derived from name and link.
    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    /// Display title.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute article URL.
    pub fn link(&self) -> &str {
        &self.link
    }

    /// Normalized topic tags.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

/// Compute the identity of a post: SHA-256 over `name`, a unit separator, and `link`.
///
/// The separator keeps `("ab", "c")` and `("a", "bc")` apart.
pub fn post_identity(name: &str, link: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0x1f]);
    hasher.update(link.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Lower-case a tag and strip separator characters (newlines, `/`, `-`).
pub fn normalize_tag(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '\n' | '\r' | '/' | '-'))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// IdentityStrategy
// ---------------------------------------------------------------------------

/// How a source's posts are keyed when reconciling against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityStrategy {
    /// Look up by content hash; a differing hash triggers an update.
    Hash,
    /// Look up by title; only a differing name triggers an update.
    Name,
}

impl std::fmt::Display for IdentityStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hash => f.write_str("hash"),
            Self::Name => f.write_str("name"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_deterministic() {
        let a = post_identity("Intro to X", "https://example.com/intro");
        let b = post_identity("Intro to X", "https://example.com/intro");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn identity_depends_on_both_fields() {
        let base = post_identity("Intro to X", "https://example.com/intro");
        assert_ne!(base, post_identity("Intro to Y", "https://example.com/intro"));
        assert_ne!(base, post_identity("Intro to X", "https://example.com/other"));
        assert_ne!(post_identity("ab", "c"), post_identity("a", "bc"));
    }

    #[test]
    fn new_rejects_missing_fields() {
        assert!(Post::new("", "https://example.com", Vec::new()).is_none());
        assert!(Post::new("Title", "   ", Vec::new()).is_none());
    }

    #[test]
    fn new_trims_and_hashes_trimmed_fields() {
        let post = Post::new("  Intro to X \n", " https://example.com/intro ", Vec::new()).unwrap();
        assert_eq!(post.name(), "Intro to X");
        assert_eq!(post.link(), "https://example.com/intro");
        assert_eq!(
            post.post_id(),
            post_identity("Intro to X", "https://example.com/intro")
        );
    }

    #[test]
    fn tags_are_normalized_and_deduplicated() {
        let post = Post::new(
            "Guide to Y",
            "https://example.com/y",
            vec![
                "Java/Android".to_string(),
                "react-native\n".to_string(),
                "javaandroid".to_string(),
                " ".to_string(),
            ],
        )
        .unwrap();
        assert_eq!(post.tags(), &["javaandroid", "reactnative"]);
    }

    #[test]
    fn normalize_tag_collapses_whitespace() {
        assert_eq!(normalize_tag("Lập Trình\n Android"), "lập trình android");
    }

    #[test]
    fn post_serialization() {
        let post = Post::new("Intro to X", "https://example.com/x", vec!["rust".into()]).unwrap();
        let json = serde_json::to_string(&post).expect("serialize");
        let parsed: Post = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, post);
    }

    #[test]
    fn strategy_display() {
        assert_eq!(IdentityStrategy::Hash.to_string(), "hash");
        assert_eq!(IdentityStrategy::Name.to_string(), "name");
    }
}
