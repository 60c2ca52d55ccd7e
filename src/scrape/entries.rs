use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};

use super::{ENTRY, entry_work_id};
use crate::domain::{ChapterProgress, WorkId, dates::parse_listing_date, models::parse_count};

static HITS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("dl.stats dd.hits").expect("hits selector"));
static KUDOS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("dl.stats dd.kudos").expect("kudos selector"));
static CHAPTERS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("dl.stats dd.chapters").expect("chapters selector"));
static DATETIME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".datetime").expect("datetime selector"));
static WORK_META_CHAPTERS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("dl.work.meta dd.chapters").expect("work chapters selector"));

/// Statistics block of one listing entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingEntry {
    pub work_id: WorkId,
    pub hits: Option<u32>,
    pub kudos: Option<u32>,
    pub chapters: Option<ChapterProgress>,
    pub updated: Option<DateTime<Utc>>,
}

fn text_of(entry: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let el = entry.select(selector).next()?;
    Some(el.text().collect::<String>().trim().to_string())
}

fn updated_of(entry: ElementRef<'_>) -> Option<DateTime<Utc>> {
    let el = entry.select(&DATETIME).next()?;
    el.value()
        .attr("title")
        .and_then(parse_listing_date)
        .or_else(|| parse_listing_date(&el.text().collect::<String>()))
}

/// Entries of a listing page in document order. Entries without a resolvable
/// work id are dropped.
pub fn parse_listing_entries(html: &str) -> Vec<ListingEntry> {
    let doc = Html::parse_document(html);
    doc.select(&ENTRY)
        .filter_map(|entry| {
            let work_id = entry_work_id(entry)?;
            Some(ListingEntry {
                work_id,
                hits: text_of(entry, &HITS).as_deref().and_then(parse_count),
                kudos: text_of(entry, &KUDOS).as_deref().and_then(parse_count),
                chapters: text_of(entry, &CHAPTERS)
                    .as_deref()
                    .and_then(ChapterProgress::parse),
                updated: updated_of(entry),
            })
        })
        .collect()
}

/// Chapters published so far, as shown in a work page's meta block.
pub fn work_page_chapters(html: &str) -> Option<u32> {
    let doc = Html::parse_document(html);
    let el = doc.select(&WORK_META_CHAPTERS).next()?;
    ChapterProgress::parse(&el.text().collect::<String>()).map(|c| c.current)
}
