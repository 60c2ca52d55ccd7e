// Classification of archive URLs into the page kinds the tracker reacts to

use reqwest::Url;

use super::models::{ListingKind, WorkId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    /// `/users/<name>/readings` or `/users/<name>/bookmarks`
    Listing { kind: ListingKind, page: u32 },
    /// `/users/<name>/works`
    UserWorks,
    /// `/works/<id>` and its chapter sub-pages
    Work(WorkId),
    Other,
}

impl PageKind {
    pub fn classify(url: &Url) -> Self {
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            ["works", id] | ["works", id, "chapters", _] => {
                WorkId::parse(id).map(PageKind::Work).unwrap_or(PageKind::Other)
            }
            ["users", _, rest @ ..] => {
                let tail = match rest {
                    ["pseuds", _, tail @ ..] => tail,
                    tail => tail,
                };
                match tail {
                    ["readings"] => PageKind::Listing {
                        kind: ListingKind::History,
                        page: page_number(url),
                    },
                    ["bookmarks"] => PageKind::Listing {
                        kind: ListingKind::Bookmarks,
                        page: page_number(url),
                    },
                    ["works"] => PageKind::UserWorks,
                    _ => PageKind::Other,
                }
            }
            _ => PageKind::Other,
        }
    }
}

/// `page` query parameter, defaulting to 1.
pub fn page_number(url: &Url) -> u32 {
    url.query_pairs()
        .find(|(k, _)| k == "page")
        .and_then(|(_, v)| v.parse::<u32>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

/// Canonical listing URL: `page` removed, other query parameters and the path kept.
pub fn listing_base_url(url: &Url) -> Url {
    let mut base = url.clone();
    base.set_fragment(None);
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "page")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        base.set_query(None);
    } else {
        base.query_pairs_mut().clear().extend_pairs(kept);
    }
    base
}

/// URL of page `n` of a canonical listing.
pub fn page_url(base: &Url, page: u32) -> Url {
    let mut url = listing_base_url(base);
    url.query_pairs_mut().append_pair("page", &page.to_string());
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn classifies_listing_pages() {
        assert_eq!(
            PageKind::classify(&url("https://archiveofourown.org/users/alice/readings?page=3")),
            PageKind::Listing { kind: ListingKind::History, page: 3 }
        );
        assert_eq!(
            PageKind::classify(&url("https://archiveofourown.org/users/alice/pseuds/al/bookmarks")),
            PageKind::Listing { kind: ListingKind::Bookmarks, page: 1 }
        );
        assert_eq!(
            PageKind::classify(&url("https://archiveofourown.org/users/alice/works")),
            PageKind::UserWorks
        );
        assert_eq!(
            PageKind::classify(&url("https://archiveofourown.org/works/123/chapters/456")),
            PageKind::Work(WorkId::from(123))
        );
        assert_eq!(
            PageKind::classify(&url("https://archiveofourown.org/works/abc")),
            PageKind::Other
        );
        for sub in ["bookmarks", "kudos", "comments", "navigate"] {
            assert_eq!(
                PageKind::classify(&url(&format!("https://archiveofourown.org/works/123/{sub}"))),
                PageKind::Other,
                "{sub}"
            );
        }
        assert_eq!(
            PageKind::classify(&url("https://archiveofourown.org/tags/Foo/works")),
            PageKind::Other
        );
    }

    #[test]
    fn base_url_strips_only_page() {
        let u = url("https://archiveofourown.org/users/alice/readings?show=to-read&page=4#main");
        assert_eq!(
            listing_base_url(&u).as_str(),
            "https://archiveofourown.org/users/alice/readings?show=to-read"
        );
        let plain = url("https://archiveofourown.org/users/alice/readings?page=2");
        assert_eq!(
            listing_base_url(&plain).as_str(),
            "https://archiveofourown.org/users/alice/readings"
        );
        assert_eq!(
            page_url(&plain, 7).as_str(),
            "https://archiveofourown.org/users/alice/readings?page=7"
        );
    }
}
