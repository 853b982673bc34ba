//! The Full Snack adapter.
//!
//! The home page lists every post as a `div.home-list-item` whose text runs
//! title, date and tags together with no separators, e.g.
//! `Intro to X12-03-2021python, rust`. Tags are recovered lexically.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use devread_shared::IdentityStrategy;

use super::{PostDraft, SourceAdapter, child_link, child_text, parse_selector};

static ITEM: LazyLock<Selector> = LazyLock::new(|| parse_selector("div.home-list-item"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| parse_selector("a[href]"));

/// A date token glued to the first tag, or a `, tag` continuation.
static TAG_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[0-9]{2}-[0-9]{2}-[0-9]{4}([a-z]{1,60}-[a-z]{1,60}|[a-z]{1,60}|)|,\s([a-z]{1,60}-[a-z]{1,60}|[a-z]{1,60}|)",
    )
    .expect("static regex must compile")
});
static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]{2}-[0-9]{2}-[0-9]{4}").expect("static regex must compile"));

/// Split the run-together text of a listing entry into its tags.
///
/// Tags are the word glued to the first `DD-DD-DDDD` date plus every
/// `, word` continuation after it; the date itself and list punctuation are
/// removed. Anything before the date is title text and never yields tags.
pub fn split_tag_phrase(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let Some(date) = DATE.find(&lowered) else {
        return Vec::new();
    };
    let phrase = TAG_PHRASE
        .find_iter(&lowered[date.start()..])
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let without_dates = DATE.replace_all(&phrase, " ");

    without_dates
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Single-page home listing, keyed by post title.
pub struct ThefullsnackAdapter {
    base: Url,
}

impl ThefullsnackAdapter {
    /// Point the adapter at a different host (mirrors, tests).
    pub fn with_base(base: Url) -> Self {
        Self { base }
    }
}

impl Default for ThefullsnackAdapter {
    fn default() -> Self {
        Self::with_base(Url::parse("https://thefullsnack.com/").expect("static base url"))
    }
}

impl SourceAdapter for ThefullsnackAdapter {
    fn name(&self) -> &str {
        "thefullsnack"
    }

    fn strategy(&self) -> IdentityStrategy {
        IdentityStrategy::Name
    }

    fn locations(&self) -> Vec<Url> {
        vec![self.base.clone()]
    }

    fn extract(&self, doc: &Html, _page: &Url) -> Vec<PostDraft> {
        doc.select(&ITEM)
            .map(|item| PostDraft {
                name: child_text(item, &ANCHOR),
                link: child_link(item, &ANCHOR, &self.base)
                    .map(String::from)
                    .unwrap_or_default(),
                tags: split_tag_phrase(&item.text().collect::<String>()),
                detail_url: None,
            })
            .collect()
    }
}
