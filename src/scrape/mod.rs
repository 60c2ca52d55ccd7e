// Work ids, pagination and blurb stats from archive listing markup.
// Only the heading link of an entry identifies its work; tag, author and
// co-listed links in a blurb are ignored.

mod entries;
mod pagination;

pub use entries::{ListingEntry, parse_listing_entries, work_page_chapters};
pub use pagination::total_pages;

use std::{collections::BTreeSet, sync::LazyLock};

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::domain::{ListingKind, WorkId};

static ENTRY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li.work.blurb, li.bookmark").expect("entry selector"));
static HEADING_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h4.heading a").expect("heading link selector"));
static ANY_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("link selector"));

static WORK_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/works/(\d+)(?:[/?#]|$)").expect("work reference regex"));
static USER_LISTING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://[^/]+)?/users/[^/?#]+(?:/pseuds/[^/?#]+)?/(readings|bookmarks)(?:[?#]|$)")
        .expect("user listing regex")
});

/// Work id referenced by an href, if its path carries a `/works/<digits>` segment.
pub fn work_id_from_href(href: &str) -> Option<WorkId> {
    let caps = WORK_REF.captures(href)?;
    WorkId::parse(caps.get(1)?.as_str()).ok()
}

/// Work id of one listing entry, taken from the first link of its heading.
fn entry_work_id(entry: ElementRef<'_>) -> Option<WorkId> {
    let link = entry.select(&HEADING_LINK).next()?;
    work_id_from_href(link.value().attr("href")?)
}

/// All work ids reachable through the primary heading link of a listing entry.
/// Entries without a resolvable id are skipped silently.
pub fn scrape_work_ids(html: &str) -> BTreeSet<WorkId> {
    let doc = Html::parse_document(html);
    doc.select(&ENTRY).filter_map(entry_work_id).collect()
}

/// First visible link to the user's own listing of `kind`, as written in the markup.
pub fn discover_listing_link(html: &str, kind: ListingKind) -> Option<String> {
    let doc = Html::parse_document(html);
    doc.select(&ANY_LINK)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| {
            USER_LISTING
                .captures(href.trim())
                .and_then(|c| c.get(1))
                .is_some_and(|m| m.as_str() == kind.path_segment())
        })
        .map(|href| href.trim().to_string())
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Listing page markup with one blurb per id and a pagination control.
    pub fn listing_page(ids: &[u64], pages: &[&str]) -> String {
        let blurbs: String = ids
            .iter()
            .map(|id| {
                format!(
                    r#"<li class="work blurb group" id="work_{id}" role="article">
  <div class="header module">
    <h4 class="heading">
      <a href="/works/{id}">Title {id}</a> by <a rel="author" href="/users/someone/pseuds/someone">someone</a>
    </h4>
  </div>
  <ul class="tags commas"><li><a class="tag" href="/tags/Fluff/works">Fluff</a></li></ul>
  <blockquote class="userstuff summary"><p>Sequel to <a href="/works/999{id}">another work</a>.</p></blockquote>
  <dl class="stats"><dt>Hits:</dt><dd class="hits">100</dd></dl>
</li>"#
                )
            })
            .collect();
        let pagination = if pages.is_empty() {
            String::new()
        } else {
            let items: String = pages
                .iter()
                .map(|p| format!(r#"<li><a href="/users/alice/readings?page={p}">{p}</a></li>"#))
                .collect();
            format!(r#"<ol class="pagination actions" role="navigation">{items}</ol>"#)
        };
        format!(
            r#"<html><body><div id="main"><ol class="reading work index group">{blurbs}</ol>{pagination}</div></body></html>"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[u64]) -> BTreeSet<WorkId> {
        list.iter().copied().map(WorkId::from).collect()
    }

    #[test]
    fn extracts_only_primary_heading_links() {
        let html = fixtures::listing_page(&[101, 102], &[]);
        assert_eq!(scrape_work_ids(&html), ids(&[101, 102]));
    }

    #[test]
    fn ignores_work_links_outside_listing_entries() {
        let html = r#"<html><body>
            <div class="recommendations"><h4 class="heading"><a href="/works/555">Rec</a></h4></div>
            <li class="bookmark blurb group"><h4 class="heading"><a href="/works/7">Kept</a></h4></li>
            <li class="work"><h4 class="heading"><a href="/works/8">not a blurb</a></h4></li>
        </body></html>"#;
        assert_eq!(scrape_work_ids(html), ids(&[7]));
    }

    #[test]
    fn skips_entries_without_work_reference() {
        let html = r#"<ol>
            <li class="bookmark blurb group"><h4 class="heading"><a href="/series/12">A series</a></h4></li>
            <li class="bookmark blurb group"><h4 class="heading"><a href="/external_works/44">External</a></h4></li>
            <li class="work blurb group"><h4 class="heading"><a href="/works/12abc">Broken</a></h4></li>
            <li class="work blurb group"><h4 class="heading">No link</h4></li>
            <li class="work blurb group"><h4 class="heading"><a href="https://archiveofourown.org/works/31/chapters/9">Full</a></h4></li>
        </ol>"#;
        assert_eq!(scrape_work_ids(html), ids(&[31]));
    }

    #[test]
    fn duplicate_entries_collapse() {
        let html = fixtures::listing_page(&[5, 5, 6], &[]);
        assert_eq!(scrape_work_ids(&html), ids(&[5, 6]));
    }

    #[test]
    fn work_reference_pattern() {
        assert_eq!(work_id_from_href("/works/123"), Some(WorkId::from(123)));
        assert_eq!(work_id_from_href("/works/123?view_adult=true"), Some(WorkId::from(123)));
        assert_eq!(work_id_from_href("/collections/x/works/77#main"), Some(WorkId::from(77)));
        assert_eq!(work_id_from_href("/works/search?work_search=1"), None);
        assert_eq!(work_id_from_href("/users/bob/works"), None);
    }

    #[test]
    fn discovers_user_listing_links() {
        let html = r#"<ul class="menu">
            <li><a href="/works/1/bookmarks">Bookmarks of a work</a></li>
            <li><a href="/users/alice/bookmarks">My Bookmarks</a></li>
            <li><a href="/users/alice/readings">My History</a></li>
        </ul>"#;
        assert_eq!(
            discover_listing_link(html, ListingKind::History).as_deref(),
            Some("/users/alice/readings")
        );
        assert_eq!(
            discover_listing_link(html, ListingKind::Bookmarks).as_deref(),
            Some("/users/alice/bookmarks")
        );
        assert_eq!(discover_listing_link("<p>nothing</p>", ListingKind::History), None);
    }
}
