//! Yellow Code Books adapter.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use devread_shared::IdentityStrategy;

use super::{PostDraft, SourceAdapter, child_link, child_text, element_text, page_urls, parse_selector};

static ENTRY: LazyLock<Selector> = LazyLock::new(|| parse_selector("header.entry-header"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| parse_selector("h2.entry-title > a"));
static CATEGORY: LazyLock<Selector> = LazyLock::new(|| parse_selector("span.meta-category > a"));

/// Number of Android and Java listing pages crawled per cycle.
const ANDROID_PAGES: u32 = 6;
const JAVA_PAGES: u32 = 5;

/// Paginated Android/Java category listings, keyed by content hash.
pub struct YellowcodeAdapter {
    base: Url,
}

impl YellowcodeAdapter {
    /// Point the adapter at a different host (mirrors, tests).
    pub fn with_base(base: Url) -> Self {
        Self { base }
    }
}

impl Default for YellowcodeAdapter {
    fn default() -> Self {
        Self::with_base(Url::parse("https://yellowcodebooks.com/").expect("static base url"))
    }
}

impl SourceAdapter for YellowcodeAdapter {
    fn name(&self) -> &str {
        "yellowcode"
    }

    fn strategy(&self) -> IdentityStrategy {
        IdentityStrategy::Hash
    }

    fn locations(&self) -> Vec<Url> {
        let android =
            (1..=ANDROID_PAGES).map(|n| format!("category/lap-trinh-android/page/{n}"));
        let java = (1..=JAVA_PAGES).map(|n| format!("category/lap-trinh-java/page/{n}"));
        page_urls(&self.base, android.chain(java))
    }

    fn extract(&self, doc: &Html, page: &Url) -> Vec<PostDraft> {
        doc.select(&ENTRY)
            .map(|entry| PostDraft {
                name: child_text(entry, &TITLE),
                link: child_link(entry, &TITLE, page)
                    .map(String::from)
                    .unwrap_or_default(),
                tags: entry.select(&CATEGORY).map(element_text).collect(),
                detail_url: None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> Html {
        let path = format!("../../../fixtures/html/{name}");
        let content =
            std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"));
        Html::parse_document(&content)
    }

    #[test]
    fn locations_cover_both_categories() {
        let adapter = YellowcodeAdapter::default();
        let urls = adapter.locations();
        assert_eq!(urls.len(), 11);
        assert_eq!(
            urls[0].as_str(),
            "https://yellowcodebooks.com/category/lap-trinh-android/page/1"
        );
        assert_eq!(
            urls[10].as_str(),
            "https://yellowcodebooks.com/category/lap-trinh-java/page/5"
        );
    }

    #[test]
    fn extracts_entries_from_listing() {
        let doc = load_fixture("yellowcode.html");
        let page = Url::parse("https://yellowcodebooks.com/category/lap-trinh-java/page/1").unwrap();
        let drafts = YellowcodeAdapter::default().extract(&doc, &page);

        assert_eq!(drafts.len(), 3);
        assert_eq!(drafts[0].name, "Java Bài 1: Giới Thiệu");
        assert_eq!(drafts[0].link, "https://yellowcodebooks.com/java-bai-1/");
        assert_eq!(drafts[0].tags, vec!["Lập Trình Java".to_string()]);
        assert!(drafts[0].detail_url.is_none());

        let post = drafts[0].clone().finish().unwrap();
        assert_eq!(post.tags(), &["lập trình java"]);
    }

    #[test]
    fn entry_without_title_link_is_dropped_on_finish() {
        let doc = load_fixture("yellowcode.html");
        let page = Url::parse("https://yellowcodebooks.com/").unwrap();
        let drafts = YellowcodeAdapter::default().extract(&doc, &page);

        let finished: Vec<_> = drafts.into_iter().filter_map(PostDraft::finish).collect();
        assert_eq!(finished.len(), 2);
    }
}
