//! Source adapter trait and the built-in site adapters.
//!
//! An adapter knows which documents to visit for one site and how to turn a
//! parsed document into [`PostDraft`]s. Adapters never fetch anything
//! themselves; the [`Collector`](crate::Collector) drives them.

mod thefullsnack;
mod toidicodedao;
mod yellowcode;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use devread_shared::{DevreadError, IdentityStrategy, Post, Result};

pub use thefullsnack::{ThefullsnackAdapter, split_tag_phrase};
pub use toidicodedao::ToidicodedaoAdapter;
pub use yellowcode::YellowcodeAdapter;

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

/// A post under construction.
///
/// Drafts that name a `detail_url` are held open until the detail document has
/// been visited and [`SourceAdapter::amend`] has filled in the rest, so one
/// listing entry always yields at most one post.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostDraft {
    pub name: String,
    pub link: String,
    pub tags: Vec<String>,
    /// Child document to visit before the draft is complete.
    pub detail_url: Option<Url>,
}

impl PostDraft {
    /// Close the draft. Returns `None` when name or link is still empty.
    pub fn finish(self) -> Option<Post> {
        Post::new(&self.name, &self.link, self.tags)
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Site-specific extraction rules for one content source.
pub trait SourceAdapter: Send + Sync {
    /// Stable source name used in config and logs.
    fn name(&self) -> &str;

    /// How this source's posts are keyed in the store.
    fn strategy(&self) -> IdentityStrategy;

    /// Listing documents to visit, in order.
    fn locations(&self) -> Vec<Url>;

    /// Extract drafts from one listing document.
    fn extract(&self, doc: &Html, page: &Url) -> Vec<PostDraft>;

    /// Fill in a draft from its detail document. Listing-only sources keep the default.
    fn amend(&self, _doc: &Html, _draft: &mut PostDraft) {}
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds the built-in adapters in a fixed order.
pub struct SourceRegistry {
    adapters: Vec<Box<dyn SourceAdapter>>,
}

impl SourceRegistry {
    /// Create a registry with every built-in source pointed at its live site.
    pub fn new() -> Self {
        Self {
            adapters: vec![
                Box::new(YellowcodeAdapter::default()),
                Box::new(ThefullsnackAdapter::default()),
                Box::new(ToidicodedaoAdapter::default()),
            ],
        }
    }

    /// Look up an adapter by name.
    pub fn get(&self, name: &str) -> Option<&dyn SourceAdapter> {
        self.adapters
            .iter()
            .find(|a| a.name() == name)
            .map(|a| a.as_ref())
    }

    /// All registered adapters, in registration order.
    pub fn all(&self) -> impl Iterator<Item = &dyn SourceAdapter> {
        self.adapters.iter().map(|a| a.as_ref())
    }

    /// Resolve a list of names. Unknown names are a config error.
    pub fn select(&self, names: &[String]) -> Result<Vec<&dyn SourceAdapter>> {
        names
            .iter()
            .map(|name| {
                self.get(name).ok_or_else(|| {
                    DevreadError::config(format!(
                        "unknown source '{name}' (known: {})",
                        self.all().map(|a| a.name()).collect::<Vec<_>>().join(", ")
                    ))
                })
            })
            .collect()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Helpers shared by the adapters
// ---------------------------------------------------------------------------

/// Parse a selector known at compile time.
pub(crate) fn parse_selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

/// Whitespace-trimmed text content of an element.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Text of the first match of `sel` under `el`, or empty.
pub(crate) fn child_text(el: ElementRef<'_>, sel: &Selector) -> String {
    el.select(sel).next().map(element_text).unwrap_or_default()
}

/// `href` of the first match of `sel` under `el`, resolved against `base`.
pub(crate) fn child_link(el: ElementRef<'_>, sel: &Selector, base: &Url) -> Option<Url> {
    let href = el.select(sel).next()?.value().attr("href")?.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok()
}

/// Join `path` onto a site base, skipping paths that do not form a URL.
pub(crate) fn page_urls(base: &Url, paths: impl IntoIterator<Item = String>) -> Vec<Url> {
    paths
        .into_iter()
        .filter_map(|path| base.join(&path).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_without_link_is_dropped() {
        let draft = PostDraft {
            name: "Intro to X".into(),
            ..Default::default()
        };
        assert!(draft.finish().is_none());
    }

    #[test]
    fn draft_finishes_into_post() {
        let draft = PostDraft {
            name: "Intro to X".into(),
            link: "https://example.com/x".into(),
            tags: vec!["Rust".into()],
            detail_url: None,
        };
        let post = draft.finish().unwrap();
        assert_eq!(post.tags(), &["rust"]);
    }

    #[test]
    fn registry_lists_builtins_in_order() {
        let registry = SourceRegistry::new();
        let names: Vec<&str> = registry.all().map(|a| a.name()).collect();
        assert_eq!(names, vec!["yellowcode", "thefullsnack", "toidicodedao"]);
    }

    #[test]
    fn registry_select_rejects_unknown() {
        let registry = SourceRegistry::new();
        let picked = registry
            .select(&["toidicodedao".to_string(), "yellowcode".to_string()])
            .unwrap();
        assert_eq!(picked[0].name(), "toidicodedao");

        let err = registry.select(&["medium".to_string()]).err().unwrap();
        assert!(err.to_string().contains("unknown source 'medium'"));
    }

    #[test]
    fn strategies_match_sources() {
        let registry = SourceRegistry::new();
        assert_eq!(
            registry.get("yellowcode").unwrap().strategy(),
            IdentityStrategy::Hash
        );
        assert_eq!(
            registry.get("thefullsnack").unwrap().strategy(),
            IdentityStrategy::Name
        );
        assert_eq!(
            registry.get("toidicodedao").unwrap().strategy(),
            IdentityStrategy::Name
        );
    }

    #[test]
    fn child_link_resolves_relative_href() {
        let doc = Html::parse_fragment(r#"<div><a href="/posts/a">A</a></div>"#);
        let anchor = Selector::parse("a").unwrap();
        let root = doc.root_element();
        let base = Url::parse("https://example.com/page/2").unwrap();
        assert_eq!(
            child_link(root, &anchor, &base).unwrap().as_str(),
            "https://example.com/posts/a"
        );
    }
}
