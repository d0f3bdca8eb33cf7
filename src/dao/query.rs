//! Filters, time buckets and cursor pages shared by every storage backend.
//!
//! Backends that cannot push filtering down to the database (CouchDB, the
//! in-memory store) run [`paginate_users`] and [`paginate_game_jams`] over the
//! full record set; MongoDB translates the same predicates into queries.

use std::cmp::{Ordering, Reverse};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dao::models::{GameJamEntity, UserEntity};

/// Position of a game jam relative to a reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeBucket {
    /// Running right now (`start <= now <= end`).
    Current,
    /// Already over (`end < now`).
    Previous,
    /// Not started yet (`start > now`).
    Upcoming,
}

impl TimeBucket {
    /// Classify a jam window against `now`.
    ///
    /// Both ends of the window are inclusive for [`TimeBucket::Current`]. The
    /// checks are ordered so that every window, including inverted ones, lands
    /// in exactly one bucket.
    pub fn classify(start: OffsetDateTime, end: OffsetDateTime, now: OffsetDateTime) -> Self {
        if start > now {
            TimeBucket::Upcoming
        } else if end < now {
            TimeBucket::Previous
        } else {
            TimeBucket::Current
        }
    }
}

/// Time window requested when listing game jams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TimeFrame {
    /// No time restriction.
    #[default]
    All,
    /// Jams running now.
    Current,
    /// Jams already over.
    Previous,
    /// Jams not started yet.
    Upcoming,
}

impl TimeFrame {
    /// Whether a jam window belongs to this frame at `now`.
    pub fn contains(self, start: OffsetDateTime, end: OffsetDateTime, now: OffsetDateTime) -> bool {
        let bucket = TimeBucket::classify(start, end, now);
        match self {
            TimeFrame::All => true,
            TimeFrame::Current => bucket == TimeBucket::Current,
            TimeFrame::Previous => bucket == TimeBucket::Previous,
            TimeFrame::Upcoming => bucket == TimeBucket::Upcoming,
        }
    }
}

/// Predicate applied when listing users. Users without a profile never match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    /// Case-insensitive substring the user's name must contain.
    pub name_contains: Option<String>,
}

impl UserFilter {
    /// Build a filter from the raw search string; blank searches match every name.
    pub fn new(q: Option<String>) -> Self {
        Self {
            name_contains: normalize_search(q),
        }
    }

    /// Evaluate the filter in process.
    pub fn matches(&self, user: &UserEntity) -> bool {
        user.profile.is_some() && name_matches(user.name.as_deref(), self.name_contains.as_deref())
    }
}

/// Predicate applied when listing game jams.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameJamFilter {
    /// Case-insensitive substring the jam name must contain.
    pub name_contains: Option<String>,
    /// Time window the jam must fall into.
    pub time_frame: TimeFrame,
}

impl GameJamFilter {
    /// Build a filter from the raw search string and time frame.
    pub fn new(q: Option<String>, time_frame: TimeFrame) -> Self {
        Self {
            name_contains: normalize_search(q),
            time_frame,
        }
    }

    /// Evaluate the filter in process against the given clock reading.
    pub fn matches(&self, jam: &GameJamEntity, now: OffsetDateTime) -> bool {
        name_matches(Some(&jam.name), self.name_contains.as_deref())
            && self.time_frame.contains(jam.start_date, jam.end_date, now)
    }
}

/// Cursor page request. The cursor is inclusive: it names the first record of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum number of records to return.
    pub limit: usize,
    /// Identifier of the first record to return.
    pub cursor: Option<Uuid>,
}

/// One page of records plus the information needed to fetch the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Records of this page, in listing order.
    pub items: Vec<T>,
    /// Identifier of the first record of the next page, absent on the last page.
    pub next_cursor: Option<Uuid>,
    /// Total number of records matching the filter, across all pages.
    pub count: u64,
}

impl<T> Page<T> {
    /// Build a page from a query that fetched up to `limit + 1` records.
    ///
    /// The extra record, when present, is removed and becomes the next cursor.
    pub fn from_overfetch(
        mut items: Vec<T>,
        limit: usize,
        count: u64,
        id_of: impl Fn(&T) -> Uuid,
    ) -> Self {
        let next_cursor = if items.len() > limit {
            items.truncate(limit + 1);
            items.pop().map(|extra| id_of(&extra))
        } else {
            None
        };

        Self {
            items,
            next_cursor,
            count,
        }
    }

    /// Transform the records while keeping cursor and count.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            count: self.count,
        }
    }
}

/// Filter, order by id ascending and paginate users in process.
pub fn paginate_users(
    users: Vec<UserEntity>,
    filter: &UserFilter,
    page: PageRequest,
) -> Page<UserEntity> {
    paginate(users, page, |user| filter.matches(user), |user| user.id, |user| user.id)
}

/// Filter, order by start date descending then id ascending and paginate game jams in process.
pub fn paginate_game_jams(
    jams: Vec<GameJamEntity>,
    filter: &GameJamFilter,
    page: PageRequest,
    now: OffsetDateTime,
) -> Page<GameJamEntity> {
    paginate(
        jams,
        page,
        |jam| filter.matches(jam, now),
        |jam| (Reverse(jam.start_date), jam.id),
        |jam| jam.id,
    )
}

/// Keyset pagination over an in-memory record set.
///
/// The cursor record is looked up among all records, matching or not, so a page
/// keeps its position even when the cursor record left the filter in between.
/// An unknown cursor yields an empty page.
fn paginate<T, K: Ord>(
    records: Vec<T>,
    page: PageRequest,
    matches: impl Fn(&T) -> bool,
    key_of: impl Fn(&T) -> K,
    id_of: impl Fn(&T) -> Uuid,
) -> Page<T> {
    let start_key = match page.cursor {
        Some(cursor) => match records.iter().find(|record| id_of(record) == cursor) {
            Some(record) => Some(key_of(record)),
            None => {
                let count = records.iter().filter(|record| matches(record)).count();
                return Page {
                    items: Vec::new(),
                    next_cursor: None,
                    count: count as u64,
                };
            }
        },
        None => None,
    };

    let mut matching: Vec<T> = records.into_iter().filter(|record| matches(record)).collect();
    matching.sort_by(|a, b| key_of(a).cmp(&key_of(b)));
    let count = matching.len() as u64;

    let window = matching
        .into_iter()
        .filter(|record| match &start_key {
            Some(start) => key_of(record).cmp(start) != Ordering::Less,
            None => true,
        })
        .take(page.limit.saturating_add(1))
        .collect();

    Page::from_overfetch(window, page.limit, count, id_of)
}

fn normalize_search(q: Option<String>) -> Option<String> {
    q.map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn name_matches(name: Option<&str>, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(needle) => name
            .map(|name| name.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false),
    }
}
