use std::sync::LazyLock;

use scraper::{Html, Selector};

static PAGINATION_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("ol.pagination a").expect("pagination selector"));

/// Total page count of a listing: the largest numeric link text inside its
/// pagination control. Trailing "Next"/"Previous" links are ignored, and a
/// page without pagination (or without numeric links) has one page.
pub fn total_pages(html: &str) -> u32 {
    let doc = Html::parse_document(html);
    doc.select(&PAGINATION_LINK)
        .filter_map(|a| {
            let text: String = a.text().collect();
            text.trim().replace(',', "").parse::<u32>().ok()
        })
        .max()
        .unwrap_or(1)
        .max(1)
}
