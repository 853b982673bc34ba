//! Tôi Đi Code Dạo adapter.
//!
//! Listing pages only carry titles and links; tags live on each post's own
//! page, so every draft names its link as the detail document.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use devread_shared::IdentityStrategy;

use super::{PostDraft, SourceAdapter, child_link, element_text, page_urls, parse_selector};

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| parse_selector(".site-content .entry-title"));
static TITLE_LINK: LazyLock<Selector> = LazyLock::new(|| parse_selector("a[href]"));
static TAG_LINKS: LazyLock<Selector> =
    LazyLock::new(|| parse_selector("footer.entry-meta span.tag-links a"));

/// Listing pages in the "chuyen-coding" category.
const LISTING_PAGES: u32 = 31;

/// Two-pass source: titles from listings, tags from detail pages. Keyed by title.
pub struct ToidicodedaoAdapter {
    base: Url,
}

impl ToidicodedaoAdapter {
    /// Point the adapter at a different host (mirrors, tests).
    pub fn with_base(base: Url) -> Self {
        Self { base }
    }
}

impl Default for ToidicodedaoAdapter {
    fn default() -> Self {
        Self::with_base(Url::parse("https://toidicodedao.com/").expect("static base url"))
    }
}

impl SourceAdapter for ToidicodedaoAdapter {
    fn name(&self) -> &str {
        "toidicodedao"
    }

    fn strategy(&self) -> IdentityStrategy {
        IdentityStrategy::Name
    }

    fn locations(&self) -> Vec<Url> {
        page_urls(
            &self.base,
            (1..=LISTING_PAGES).map(|n| format!("category/chuyen-coding/page/{n}")),
        )
    }

    fn extract(&self, doc: &Html, page: &Url) -> Vec<PostDraft> {
        doc.select(&TITLE)
            .map(|title| {
                let link = child_link(title, &TITLE_LINK, page);
                PostDraft {
                    name: element_text(title),
                    link: link.as_ref().map(Url::to_string).unwrap_or_default(),
                    tags: Vec::new(),
                    detail_url: link,
                }
            })
            .collect()
    }

    fn amend(&self, doc: &Html, draft: &mut PostDraft) {
        draft
            .tags
            .extend(doc.select(&TAG_LINKS).map(element_text));
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
    fn locations_cover_all_listing_pages() {
        let urls = ToidicodedaoAdapter::default().locations();
        assert_eq!(urls.len(), 31);
        assert_eq!(
            urls[30].as_str(),
            "https://toidicodedao.com/category/chuyen-coding/page/31"
        );
    }

    #[test]
    fn listing_drafts_point_at_detail_pages() {
        let doc = load_fixture("toidicodedao_listing.html");
        let page =
            Url::parse("https://toidicodedao.com/category/chuyen-coding/page/1").unwrap();
        let drafts = ToidicodedaoAdapter::default().extract(&doc, &page);

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].name, "Intro to X");
        assert_eq!(drafts[0].link, "https://toidicodedao.com/2021/03/12/intro-to-x/");
        assert_eq!(
            drafts[0].detail_url.as_ref().map(Url::as_str),
            Some("https://toidicodedao.com/2021/03/12/intro-to-x/")
        );
        assert!(drafts[0].tags.is_empty());
    }

    #[test]
    fn amend_fills_tags_on_the_same_draft() {
        let listing = load_fixture("toidicodedao_listing.html");
        let detail = load_fixture("toidicodedao_post.html");
        let page = Url::parse("https://toidicodedao.com/").unwrap();
        let adapter = ToidicodedaoAdapter::default();

        let mut draft = adapter.extract(&listing, &page).remove(0);
        adapter.amend(&detail, &mut draft);

        let post = draft.finish().unwrap();
        assert_eq!(post.name(), "Intro to X");
        assert_eq!(post.tags(), &["code dạo", "javascript"]);
    }
}
