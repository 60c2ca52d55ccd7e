// Per-entry annotations shown on a listing page

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::{
    domain::{Rating, WorkId, dates::format_relative},
    scrape::ListingEntry,
    storage::TrackerSnapshot,
};

/// Ratio thresholds in percent.
const MID_RATIO: f64 = 4.0;
const HIGH_RATIO: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatioBand {
    Low,
    Mid,
    High,
}

impl RatioBand {
    pub fn of(percent: f64) -> Self {
        if percent >= HIGH_RATIO {
            RatioBand::High
        } else if percent >= MID_RATIO {
            RatioBand::Mid
        } else {
            RatioBand::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RatioBand::Low => "low",
            RatioBand::Mid => "mid",
            RatioBand::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateBadge {
    NewChapters(u32),
    Updated,
}

impl UpdateBadge {
    pub fn label(&self) -> String {
        match self {
            UpdateBadge::NewChapters(1) => "+1 new chapter".to_string(),
            UpdateBadge::NewChapters(n) => format!("+{n} new chapters"),
            UpdateBadge::Updated => "new update".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub work_id: WorkId,
    /// Kudos per hit in percent; `None` without a non-zero hit count.
    pub ratio: Option<f64>,
    pub band: Option<RatioBand>,
    pub hide_hits: bool,
    pub read: bool,
    pub bookmarked: bool,
    pub highlight: bool,
    pub rating: Option<Rating>,
    pub last_read: Option<String>,
    pub chapters_left: Option<u32>,
    pub complete: bool,
    pub update: Option<UpdateBadge>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Ratio,
    Rating,
}

fn kudos_ratio(entry: &ListingEntry) -> Option<f64> {
    let hits = entry.hits.filter(|h| *h > 0)?;
    let kudos = entry.kudos?;
    Some(100.0 * f64::from(kudos) / f64::from(hits))
}

pub fn annotate(
    entries: &[ListingEntry],
    snapshot: &TrackerSnapshot,
    now: DateTime<Utc>,
) -> Vec<Annotation> {
    let prefs = snapshot.preferences;
    entries
        .iter()
        .map(|entry| {
            let ratio = kudos_ratio(entry);
            let read = snapshot.read.contains(&entry.work_id);
            let meta = snapshot.metadata.get(&entry.work_id);

            let mut chapters_left = None;
            let mut complete = false;
            if let (Some(read_ch), Some(total)) = (
                meta.and_then(|m| m.last_read_chapters),
                entry.chapters.and_then(|c| c.total),
            ) {
                if total > read_ch {
                    chapters_left = Some(total - read_ch);
                } else {
                    complete = true;
                }
            }

            let update = match (meta, entry.updated) {
                (Some(m), Some(updated)) => match (m.last_read_date, m.last_read_chapters) {
                    (Some(last_read), Some(read_ch)) if updated > last_read => {
                        let current = entry.chapters.map(|c| c.current).unwrap_or(read_ch);
                        Some(match current.saturating_sub(read_ch) {
                            0 => UpdateBadge::Updated,
                            n => UpdateBadge::NewChapters(n),
                        })
                    }
                    _ => None,
                },
                _ => None,
            };

            Annotation {
                work_id: entry.work_id.clone(),
                ratio,
                band: ratio.map(RatioBand::of),
                hide_hits: prefs.hide_hitcount && ratio.is_some(),
                read,
                bookmarked: snapshot.bookmarked.contains(&entry.work_id),
                highlight: read && prefs.highlight_read,
                rating: meta.and_then(|m| m.rating),
                last_read: meta
                    .and_then(|m| m.last_read_date)
                    .map(|d| format_relative(d, now)),
                chapters_left,
                complete,
                update,
            }
        })
        .collect()
}

/// Stable sort; descending unless `ascending`. Missing ratios count as 0, unrated works as -1.
pub fn sort_annotations(items: &mut [Annotation], key: SortKey, ascending: bool) {
    let value = |a: &Annotation| match key {
        SortKey::Ratio => a.ratio.unwrap_or(0.0),
        SortKey::Rating => a.rating.map_or(-1.0, |r| f64::from(r.value())),
    };
    items.sort_by(|a, b| {
        let ord: Ordering = value(a).total_cmp(&value(b));
        if ascending { ord } else { ord.reverse() }
    });
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::domain::{ChapterProgress, WorkMetadata};

    fn entry(id: u64, hits: Option<u32>, kudos: Option<u32>) -> ListingEntry {
        ListingEntry {
            work_id: WorkId::from(id),
            hits,
            kudos,
            chapters: None,
            updated: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn ratio_and_bands() {
        let entries = vec![
            entry(1, Some(1000), Some(80)),
            entry(2, Some(1000), Some(40)),
            entry(3, Some(1000), Some(39)),
            entry(4, Some(0), Some(5)),
            entry(5, None, Some(5)),
            entry(6, Some(10), None),
        ];
        let out = annotate(&entries, &TrackerSnapshot::default(), now());

        assert_eq!(out[0].ratio, Some(8.0));
        assert_eq!(out[0].band, Some(RatioBand::High));
        assert_eq!(out[1].band, Some(RatioBand::Mid));
        assert_eq!(out[2].band, Some(RatioBand::Low));
        assert!(out[3..].iter().all(|a| a.ratio.is_none() && a.band.is_none()));
        // hit counts are hidden only where a ratio replaces them
        assert!(out[0].hide_hits);
        assert!(!out[4].hide_hits);
    }

    #[test]
    fn read_state_rating_and_progress() {
        let id = WorkId::from(7);
        let last_read = now() - Duration::days(3);
        let mut snap = TrackerSnapshot::default();
        snap.read.insert(id.clone());
        snap.metadata.insert(
            id.clone(),
            WorkMetadata {
                rating: Some(Rating::new(8).unwrap()),
                last_read_date: Some(last_read),
                last_read_chapters: Some(4),
            },
        );
        let mut e = entry(7, Some(100), Some(5));
        e.chapters = Some(ChapterProgress { current: 6, total: Some(10) });
        e.updated = Some(now() - Duration::days(1));

        let a = &annotate(&[e.clone()], &snap, now())[0];
        assert!(a.read && a.highlight && !a.bookmarked);
        assert_eq!(a.rating, Some(Rating::new(8).unwrap()));
        assert_eq!(a.last_read.as_deref(), Some("3 days ago"));
        assert_eq!(a.chapters_left, Some(6));
        assert!(!a.complete);
        assert_eq!(a.update, Some(UpdateBadge::NewChapters(2)));
        assert_eq!(a.update.unwrap().label(), "+2 new chapters");

        // updated before the last read: no badge
        e.updated = Some(last_read - Duration::days(1));
        assert_eq!(annotate(&[e.clone()], &snap, now())[0].update, None);

        // same chapter count but newer date
        e.updated = Some(now());
        e.chapters = Some(ChapterProgress { current: 4, total: Some(4) });
        let a = &annotate(&[e], &snap, now())[0];
        assert_eq!(a.update, Some(UpdateBadge::Updated));
        assert!(a.complete);
        assert_eq!(a.chapters_left, None);

        snap.preferences.highlight_read = false;
        let a = &annotate(&[entry(7, None, None)], &snap, now())[0];
        assert!(a.read && !a.highlight);
    }

    #[test]
    fn sorting_is_stable_with_defaults_for_missing_values() {
        let mut snap = TrackerSnapshot::default();
        for (id, r) in [(2u64, 5i64), (3, 0)] {
            snap.metadata.insert(
                WorkId::from(id),
                WorkMetadata {
                    rating: Some(Rating::new(r).unwrap()),
                    ..WorkMetadata::default()
                },
            );
        }
        let entries = vec![
            entry(1, Some(100), Some(3)),
            entry(2, None, None),
            entry(3, Some(100), Some(9)),
            entry(4, Some(100), Some(3)),
        ];
        let mut items = annotate(&entries, &snap, now());
        let order = |items: &[Annotation]| -> Vec<String> {
            items.iter().map(|a| a.work_id.to_string()).collect()
        };

        sort_annotations(&mut items, SortKey::Ratio, false);
        assert_eq!(order(&items), ["3", "1", "4", "2"]);
        sort_annotations(&mut items, SortKey::Ratio, true);
        assert_eq!(order(&items), ["2", "1", "4", "3"]);

        sort_annotations(&mut items, SortKey::Rating, false);
        assert_eq!(order(&items), ["2", "3", "1", "4"]);
    }
}
