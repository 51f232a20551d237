//! Catalog domain model and the filter/sort/paginate query engine.
//!
//! Everything here is a pure function of `(collection, FilterState)`. The
//! caller owns the state and rebuilds it from a flat string map (usually URL
//! query parameters) with [`FilterState::from_query_map`].

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CRATE_NAME: &str = "safari-core";

pub const PARAM_COUNTRY: &str = "country";
pub const PARAM_DIFFICULTY: &str = "difficulty";
pub const PARAM_TAGS: &str = "tags";
pub const PARAM_QUERY: &str = "q";
pub const PARAM_SORT: &str = "sort";
pub const PARAM_PAGE: &str = "page";

pub const DEFAULT_PAGE_SIZE: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("page size must be at least 1, got {0}")]
    InvalidPageSize(usize),
    #[error("unknown sort key `{0}`")]
    UnknownSortKey(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Tour,
    Destination,
}

impl CatalogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogKind::Tour => "tour",
            CatalogKind::Destination => "destination",
        }
    }

    /// Route prefix used by the web layer (`/tours`, `/destinations`).
    pub fn path_segment(&self) -> &'static str {
        match self {
            CatalogKind::Tour => "tours",
            CatalogKind::Destination => "destinations",
        }
    }
}

/// A tour or destination as seen by the query engine.
///
/// Loaded once from static fixtures and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub slug: String,
    pub kind: CatalogKind,
    pub title: String,
    pub summary: String,
    pub country: String,
    pub difficulty: Option<String>,
    pub price: f64,
    pub rating: Option<f64>,
    pub duration_label: String,
    pub duration_days: Option<u32>,
    pub searchable_text: String,
    pub tags: BTreeSet<String>,
    pub image: Option<String>,
}

impl CatalogItem {
    pub fn rating_or_zero(&self) -> f64 {
        self.rating.unwrap_or(0.0)
    }
}

/// Leading integer of a free-text duration ("7 Days", "10-12 days").
pub fn parse_duration_days(label: &str) -> Option<u32> {
    let trimmed = label.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

/// Joins the non-empty parts with single spaces for substring search.
pub fn build_searchable_text<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[serde(rename = "price-asc")]
    PriceAsc,
    #[serde(rename = "price-desc")]
    PriceDesc,
    #[default]
    #[serde(rename = "rating-desc")]
    RatingDesc,
    #[serde(rename = "duration-asc")]
    DurationAsc,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [
        SortKey::RatingDesc,
        SortKey::PriceAsc,
        SortKey::PriceDesc,
        SortKey::DurationAsc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::PriceAsc => "price-asc",
            SortKey::PriceDesc => "price-desc",
            SortKey::RatingDesc => "rating-desc",
            SortKey::DurationAsc => "duration-asc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::PriceAsc => "Price: low to high",
            SortKey::PriceDesc => "Price: high to low",
            SortKey::RatingDesc => "Top rated",
            SortKey::DurationAsc => "Shortest first",
        }
    }

    /// Unrecognized input falls back to the default key.
    pub fn parse_or_default(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| QueryError::UnknownSortKey(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Country,
    Difficulty,
    Tags,
}

impl Facet {
    pub fn param(&self) -> &'static str {
        match self {
            Facet::Country => PARAM_COUNTRY,
            Facet::Difficulty => PARAM_DIFFICULTY,
            Facet::Tags => PARAM_TAGS,
        }
    }
}

/// User-chosen filter, sort and page selections.
///
/// Every mutator that changes what matches or how it is ordered resets the
/// page to 1; [`FilterState::set_page`] is the only way to move between pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub country: Option<String>,
    pub difficulty: Option<String>,
    pub tags: BTreeSet<String>,
    pub query: String,
    pub sort: SortKey,
    pub page: usize,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            country: None,
            difficulty: None,
            tags: BTreeSet::new(),
            query: String::new(),
            sort: SortKey::default(),
            page: 1,
        }
    }
}

impl FilterState {
    pub fn set_country(&mut self, country: Option<String>) {
        self.country = non_empty(country);
        self.page = 1;
    }

    pub fn set_difficulty(&mut self, difficulty: Option<String>) {
        self.difficulty = non_empty(difficulty);
        self.page = 1;
    }

    /// Toggles each comma-separated tag in `tag`, the same split the
    /// query string uses.
    pub fn toggle_tag(&mut self, tag: &str) {
        let mut changed = false;
        for tag in split_tags(tag) {
            if !self.tags.remove(tag) {
                self.tags.insert(tag.to_string());
            }
            changed = true;
        }
        if changed {
            self.page = 1;
        }
    }

    pub fn set_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags
            .into_iter()
            .flat_map(|t| split_tags(t.as_ref()).map(ToString::to_string).collect::<Vec<_>>())
            .collect();
        self.page = 1;
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into().trim().to_string();
        self.page = 1;
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
        self.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    /// Drops every facet selection and the search query, keeping the sort.
    pub fn clear_filters(&mut self) {
        *self = Self {
            sort: self.sort,
            ..Self::default()
        };
    }

    pub fn is_filtered(&self) -> bool {
        self.country.is_some()
            || self.difficulty.is_some()
            || !self.tags.is_empty()
            || !self.query.is_empty()
    }

    pub fn selection(&self, facet: Facet) -> Vec<&str> {
        match facet {
            Facet::Country => self.country.as_deref().into_iter().collect(),
            Facet::Difficulty => self.difficulty.as_deref().into_iter().collect(),
            Facet::Tags => self.tags.iter().map(String::as_str).collect(),
        }
    }

    /// Flat map of the non-default fields, suitable for a query string.
    pub fn to_query_map(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        if let Some(country) = &self.country {
            out.insert(PARAM_COUNTRY.to_string(), country.clone());
        }
        if let Some(difficulty) = &self.difficulty {
            out.insert(PARAM_DIFFICULTY.to_string(), difficulty.clone());
        }
        if !self.tags.is_empty() {
            let joined = self.tags.iter().cloned().collect::<Vec<_>>().join(",");
            out.insert(PARAM_TAGS.to_string(), joined);
        }
        if !self.query.is_empty() {
            out.insert(PARAM_QUERY.to_string(), self.query.clone());
        }
        if self.sort != SortKey::default() {
            out.insert(PARAM_SORT.to_string(), self.sort.as_str().to_string());
        }
        if self.page != 1 {
            out.insert(PARAM_PAGE.to_string(), self.page.to_string());
        }
        out
    }

    /// Total inverse of [`FilterState::to_query_map`]: unknown keys are
    /// ignored and malformed values fall back to their defaults.
    pub fn from_query_map(map: &BTreeMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        let tags = get(PARAM_TAGS)
            .map(|raw| split_tags(raw).map(ToString::to_string).collect())
            .unwrap_or_default();

        Self {
            country: get(PARAM_COUNTRY).map(ToString::to_string),
            difficulty: get(PARAM_DIFFICULTY).map(ToString::to_string),
            tags,
            query: get(PARAM_QUERY).unwrap_or_default().to_string(),
            sort: get(PARAM_SORT)
                .map(SortKey::parse_or_default)
                .unwrap_or_default(),
            page: get(PARAM_PAGE)
                .and_then(|p| p.parse::<usize>().ok())
                .filter(|p| *p >= 1)
                .unwrap_or(1),
        }
    }
}

// Tags travel comma-joined, so a comma can never be part of a stored tag.
fn split_tags(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|t| !t.is_empty())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Validated page size; zero is a caller bug and rejected up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageSize(NonZeroUsize);

impl PageSize {
    pub fn new(size: usize) -> Result<Self, QueryError> {
        NonZeroUsize::new(size)
            .map(Self)
            .ok_or(QueryError::InvalidPageSize(size))
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self(NonZeroUsize::MIN.saturating_add(DEFAULT_PAGE_SIZE - 1))
    }
}

/// One window of a longer sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Paged<'s, T> {
    pub items: &'s [T],
    pub page: usize,
    pub total_pages: usize,
}

pub fn total_pages(len: usize, page_size: PageSize) -> usize {
    len.div_ceil(page_size.get()).max(1)
}

fn page_range(len: usize, page: usize, page_size: PageSize) -> (usize, Range<usize>) {
    let pages = total_pages(len, page_size);
    let page = page.clamp(1, pages);
    let start = ((page - 1) * page_size.get()).min(len);
    let end = (start + page_size.get()).min(len);
    (page, start..end)
}

/// Slices out the requested page, clamping out-of-range pages into bounds.
pub fn paginate<T>(items: &[T], page: usize, page_size: PageSize) -> Paged<'_, T> {
    let (page, range) = page_range(items.len(), page, page_size);
    Paged {
        items: &items[range],
        page,
        total_pages: total_pages(items.len(), page_size),
    }
}

/// Keeps the items satisfying every active facet, in input order.
pub fn apply_filters<'a>(collection: &'a [CatalogItem], state: &FilterState) -> Vec<&'a CatalogItem> {
    let needle = state.query.trim().to_lowercase();
    collection
        .iter()
        .filter(|item| matches_state(item, state, &needle))
        .collect()
}

fn matches_state(item: &CatalogItem, state: &FilterState, needle: &str) -> bool {
    if let Some(country) = &state.country {
        if &item.country != country {
            return false;
        }
    }
    if let Some(difficulty) = &state.difficulty {
        if item.difficulty.as_ref() != Some(difficulty) {
            return false;
        }
    }
    if !needle.is_empty() && !item.searchable_text.to_lowercase().contains(needle) {
        return false;
    }
    state.tags.iter().all(|tag| item.tags.contains(tag))
}

/// Stable sort: equal keys keep their relative input order.
pub fn apply_sort(mut items: Vec<&CatalogItem>, key: SortKey) -> Vec<&CatalogItem> {
    match key {
        SortKey::PriceAsc => items.sort_by(|a, b| a.price.total_cmp(&b.price)),
        SortKey::PriceDesc => items.sort_by(|a, b| b.price.total_cmp(&a.price)),
        SortKey::RatingDesc => {
            items.sort_by(|a, b| b.rating_or_zero().total_cmp(&a.rating_or_zero()))
        }
        SortKey::DurationAsc => {
            items.sort_by(|a, b| duration_cmp(a.duration_days, b.duration_days))
        }
    }
    items
}

// Unknown durations sort last.
fn duration_cmp(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Derived output of one query; rebuilt on every state change.
#[derive(Debug, Clone)]
pub struct ResultView<'a> {
    pub matched: Vec<&'a CatalogItem>,
    pub page: usize,
    pub total_pages: usize,
    pub page_size: PageSize,
    page_range: Range<usize>,
}

impl<'a> ResultView<'a> {
    pub fn total_matched(&self) -> usize {
        self.matched.len()
    }

    pub fn page_items(&self) -> &[&'a CatalogItem] {
        &self.matched[self.page_range.clone()]
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Page numbers within `radius` of the current page, for pager links.
    pub fn page_window(&self, radius: usize) -> Vec<usize> {
        let first = self.page.saturating_sub(radius).max(1);
        let last = self.page.saturating_add(radius).min(self.total_pages);
        (first..=last).collect()
    }
}

pub fn run_query<'a>(
    collection: &'a [CatalogItem],
    state: &FilterState,
    page_size: PageSize,
) -> ResultView<'a> {
    let matched = apply_sort(apply_filters(collection, state), state.sort);
    let (page, page_range) = page_range(matched.len(), state.page, page_size);
    ResultView {
        total_pages: total_pages(matched.len(), page_size),
        matched,
        page,
        page_size,
        page_range,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetCount {
    pub value: String,
    pub count: usize,
}

/// Value counts for one facet over the whole collection, ordered by value.
pub fn facet_counts(collection: &[CatalogItem], facet: Facet) -> Vec<FacetCount> {
    let mut counts = BTreeMap::<&str, usize>::new();
    for item in collection {
        match facet {
            Facet::Country => *counts.entry(item.country.as_str()).or_default() += 1,
            Facet::Difficulty => {
                if let Some(d) = &item.difficulty {
                    *counts.entry(d.as_str()).or_default() += 1;
                }
            }
            Facet::Tags => {
                for tag in &item.tags {
                    *counts.entry(tag.as_str()).or_default() += 1;
                }
            }
        }
    }
    counts
        .into_iter()
        .map(|(value, count)| FacetCount {
            value: value.to_string(),
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_item(id: &str, country: &str, price: f64, tags: &[&str]) -> CatalogItem {
        CatalogItem {
            id: id.to_string(),
            slug: id.to_ascii_lowercase(),
            kind: CatalogKind::Tour,
            title: format!("Tour {id}"),
            summary: String::new(),
            country: country.to_string(),
            difficulty: None,
            price,
            rating: None,
            duration_label: String::new(),
            duration_days: None,
            searchable_text: format!("Tour {id} {}", tags.join(" ")),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            image: None,
        }
    }

    fn ids(items: &[&CatalogItem]) -> Vec<String> {
        items.iter().map(|i| i.id.clone()).collect()
    }

    fn abc() -> Vec<CatalogItem> {
        vec![
            mk_item("A", "Kenya", 500.0, &["Gorillas"]),
            mk_item("B", "Kenya", 300.0, &["BigFive"]),
            mk_item("C", "Uganda", 400.0, &["Gorillas"]),
        ]
    }

    fn page_size(n: usize) -> PageSize {
        PageSize::new(n).unwrap()
    }

    #[test]
    fn country_filter_then_price_sort() {
        let items = abc();
        let mut state = FilterState::default();
        state.set_country(Some("Kenya".into()));
        state.set_sort(SortKey::PriceAsc);
        let view = run_query(&items, &state, page_size(10));
        assert_eq!(ids(&view.matched), vec!["B", "A"]);
    }

    #[test]
    fn tag_filter_keeps_input_order_until_sorted() {
        let items = abc();
        let mut state = FilterState::default();
        state.set_tags(["Gorillas"]);
        assert_eq!(ids(&apply_filters(&items, &state)), vec!["A", "C"]);

        state.set_sort(SortKey::PriceAsc);
        let view = run_query(&items, &state, page_size(10));
        assert_eq!(ids(&view.matched), vec!["C", "A"]);
    }

    #[test]
    fn tag_selection_requires_every_tag() {
        let items = vec![
            mk_item("1", "Kenya", 1.0, &["Gorillas"]),
            mk_item("2", "Kenya", 1.0, &["Gorillas", "Hiking"]),
            mk_item("3", "Kenya", 1.0, &["Hiking"]),
            mk_item("4", "Kenya", 1.0, &["Hiking", "Birding", "Gorillas"]),
        ];
        let mut state = FilterState::default();
        state.set_tags(["Gorillas", "Hiking"]);
        assert_eq!(ids(&apply_filters(&items, &state)), vec!["2", "4"]);
    }

    #[test]
    fn country_match_is_case_sensitive() {
        let items = abc();
        let mut state = FilterState::default();
        state.set_country(Some("kenya".into()));
        assert!(apply_filters(&items, &state).is_empty());
    }

    #[test]
    fn difficulty_filter_skips_items_without_tier() {
        let mut items = abc();
        items[0].difficulty = Some("Moderate".into());
        items[1].difficulty = Some("Easy".into());
        let mut state = FilterState::default();
        state.set_difficulty(Some("Moderate".into()));
        assert_eq!(ids(&apply_filters(&items, &state)), vec!["A"]);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let items = abc();
        let mut state = FilterState::default();
        state.set_query("  gORILL ");
        assert_eq!(ids(&apply_filters(&items, &state)), vec!["A", "C"]);
    }

    #[test]
    fn price_sort_is_stable_across_runs() {
        let items = vec![
            mk_item("x", "Kenya", 200.0, &[]),
            mk_item("y", "Kenya", 100.0, &[]),
            mk_item("z", "Kenya", 200.0, &[]),
        ];
        for _ in 0..5 {
            let sorted = apply_sort(items.iter().collect(), SortKey::PriceAsc);
            assert_eq!(ids(&sorted), vec!["y", "x", "z"]);
            let sorted = apply_sort(items.iter().collect(), SortKey::PriceDesc);
            assert_eq!(ids(&sorted), vec!["x", "z", "y"]);
        }
    }

    #[test]
    fn rating_sort_treats_missing_as_zero() {
        let mut items = abc();
        items[0].rating = Some(4.5);
        items[2].rating = Some(0.0);
        let sorted = apply_sort(items.iter().collect(), SortKey::RatingDesc);
        assert_eq!(ids(&sorted), vec!["A", "B", "C"]);
    }

    #[test]
    fn unparseable_duration_sorts_last() {
        let mut items = abc();
        items[0].duration_days = parse_duration_days("Half day");
        items[1].duration_days = parse_duration_days("10-12 days");
        items[2].duration_days = parse_duration_days(" 3 Days");
        let sorted = apply_sort(items.iter().collect(), SortKey::DurationAsc);
        assert_eq!(ids(&sorted), vec!["C", "B", "A"]);
    }

    #[test]
    fn duration_parsing_reads_leading_integer() {
        assert_eq!(parse_duration_days("7 Days"), Some(7));
        assert_eq!(parse_duration_days("10-12 days"), Some(10));
        assert_eq!(parse_duration_days("Half day"), None);
        assert_eq!(parse_duration_days(""), None);
    }

    #[test]
    fn out_of_range_page_clamps_to_last() {
        let items: Vec<u32> = (1..=7).collect();
        let last = paginate(&items, 3, page_size(3));
        let beyond = paginate(&items, 99, page_size(3));
        assert_eq!(last.total_pages, 3);
        assert_eq!(beyond.items, last.items);
        assert_eq!(beyond.items, &[7]);
        assert_eq!(beyond.page, 3);
        assert_eq!(paginate(&items, 0, page_size(3)).items, &[1, 2, 3]);
    }

    #[test]
    fn empty_search_yields_single_empty_page() {
        let items = abc();
        let mut state = FilterState::default();
        state.set_query("zebra migration");
        let view = run_query(&items, &state, page_size(3));
        assert_eq!(view.total_matched(), 0);
        assert_eq!(view.total_pages, 1);
        assert!(view.page_items().is_empty());
        assert_eq!(view.page, 1);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert_eq!(PageSize::new(0), Err(QueryError::InvalidPageSize(0)));
        assert_eq!(PageSize::default().get(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn round_trip_reproduces_result_view() {
        let items: Vec<CatalogItem> = (0..12)
            .map(|i| {
                let country = if i % 3 == 0 { "Uganda" } else { "Kenya" };
                mk_item(&format!("t{i}"), country, f64::from(i * 7 % 5), &[])
            })
            .collect();
        let mut state = FilterState::default();
        state.set_country(Some("Kenya".into()));
        state.set_sort(SortKey::PriceAsc);
        state.set_page(2);

        let map = state.to_query_map();
        let restored = FilterState::from_query_map(&map);
        assert_eq!(restored, state);

        let a = run_query(&items, &state, page_size(3));
        let b = run_query(&items, &restored, page_size(3));
        assert_eq!(ids(a.page_items()), ids(b.page_items()));
        assert_eq!(a.page, 2);
    }

    #[test]
    fn serialization_omits_defaults() {
        assert!(FilterState::default().to_query_map().is_empty());

        let mut state = FilterState::default();
        state.set_tags(["Hiking", "Birding"]);
        state.set_query("lake");
        let map = state.to_query_map();
        assert_eq!(map.get(PARAM_TAGS).map(String::as_str), Some("Birding,Hiking"));
        assert_eq!(map.get(PARAM_QUERY).map(String::as_str), Some("lake"));
        assert!(!map.contains_key(PARAM_SORT));
        assert!(!map.contains_key(PARAM_PAGE));
        assert_eq!(FilterState::from_query_map(&map).to_query_map(), map);
    }

    #[test]
    fn comma_in_tag_is_split_like_the_query_string() {
        let items = vec![
            mk_item("X", "Kenya", 100.0, &["Hiking, Birding"]),
            mk_item("Y", "Kenya", 100.0, &["Hiking", "Birding"]),
        ];
        let mut state = FilterState::default();
        state.toggle_tag("Hiking, Birding");
        assert_eq!(state.selection(Facet::Tags), vec!["Birding", "Hiking"]);

        let restored = FilterState::from_query_map(&state.to_query_map());
        assert_eq!(restored, state);
        let before = run_query(&items, &state, page_size(5));
        let after = run_query(&items, &restored, page_size(5));
        assert_eq!(ids(before.page_items()), vec!["Y"]);
        assert_eq!(ids(after.page_items()), ids(before.page_items()));

        state.set_tags(["Lakes,Canoeing"]);
        assert_eq!(state.selection(Facet::Tags), vec!["Canoeing", "Lakes"]);
        assert_eq!(FilterState::from_query_map(&state.to_query_map()), state);
    }

    #[test]
    fn malformed_params_fall_back_to_defaults() {
        let map: BTreeMap<String, String> = [
            ("sort".to_string(), "bogus-value".to_string()),
            ("page".to_string(), "abc".to_string()),
        ]
        .into_iter()
        .collect();
        let state = FilterState::from_query_map(&map);
        assert_eq!(state.sort, SortKey::RatingDesc);
        assert_eq!(state.page, 1);
        assert!(state.to_query_map().is_empty());

        let zero: BTreeMap<String, String> =
            [("page".to_string(), "0".to_string())].into_iter().collect();
        assert_eq!(FilterState::from_query_map(&zero).page, 1);
    }

    #[test]
    fn filter_changes_reset_page_but_paging_does_not() {
        let mut state = FilterState::default();
        state.set_page(4);
        assert_eq!(state.page, 4);
        state.toggle_tag("Birding");
        assert_eq!(state.page, 1);

        state.set_page(3);
        state.set_sort(SortKey::DurationAsc);
        assert_eq!(state.page, 1);

        state.set_page(2);
        state.clear_filters();
        assert_eq!(state.page, 1);
        assert!(!state.is_filtered());
        assert_eq!(state.sort, SortKey::DurationAsc);
    }

    #[test]
    fn sort_keys_parse_and_serialize_consistently() {
        for key in SortKey::ALL {
            assert_eq!(key.as_str().parse::<SortKey>(), Ok(key));
            let json = serde_json::to_string(&key).unwrap();
            assert_eq!(json, format!("\"{}\"", key.as_str()));
        }
        assert!("popular".parse::<SortKey>().is_err());
    }

    #[test]
    fn facet_counts_cover_whole_collection() {
        let items = abc();
        let countries = facet_counts(&items, Facet::Country);
        assert_eq!(
            countries,
            vec![
                FacetCount { value: "Kenya".into(), count: 2 },
                FacetCount { value: "Uganda".into(), count: 1 },
            ]
        );
        let tags = facet_counts(&items, Facet::Tags);
        assert_eq!(tags[1], FacetCount { value: "Gorillas".into(), count: 2 });
        assert!(facet_counts(&items, Facet::Difficulty).is_empty());
    }

    #[test]
    fn page_window_stays_in_bounds() {
        let items: Vec<CatalogItem> = (0..20)
            .map(|i| mk_item(&format!("w{i}"), "Kenya", 1.0, &[]))
            .collect();
        let mut state = FilterState::default();
        state.set_page(1);
        let view = run_query(&items, &state, page_size(3));
        assert_eq!(view.total_pages, 7);
        assert_eq!(view.page_window(2), vec![1, 2, 3]);
        assert!(!view.has_prev());

        state.set_page(7);
        let view = run_query(&items, &state, page_size(3));
        assert_eq!(view.page_window(2), vec![5, 6, 7]);
        assert!(!view.has_next());
        assert_eq!(ids(view.page_items()), vec!["w18", "w19"]);
        assert_eq!(view.page_window(usize::MAX), vec![1, 2, 3, 4, 5, 6, 7]);
    }
}
