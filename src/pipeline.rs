//! Derived list pipeline: text filter → tag filter → stable sort → page slice.
//!
//! Pure and deterministic; re-run on every input change. Errors never reach
//! this layer: callers pass an empty slice while a collection is unavailable.

use crate::models::{ChampionSummary, GameMap, Item, RuneTree};
use std::cmp::Ordering;
use std::collections::BTreeSet;

pub const CHAMPIONS_PAGE_SIZE: usize = 21;
pub const CATALOG_PAGE_SIZE: usize = 12;

/// Anything the pipeline can list.
pub trait Listable {
    /// Sort key and primary label.
    fn display_name(&self) -> &str;
    /// Fields matched by the search text.
    fn search_fields(&self) -> Vec<&str>;
    /// Labels matched by the tag filter.
    fn tags(&self) -> &[String] {
        &[]
    }
}

impl Listable for ChampionSummary {
    fn display_name(&self) -> &str {
        &self.name
    }
    fn search_fields(&self) -> Vec<&str> {
        vec![&self.name, &self.title]
    }
    fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl Listable for Item {
    fn display_name(&self) -> &str {
        &self.name
    }
    fn search_fields(&self) -> Vec<&str> {
        vec![&self.name, &self.plaintext]
    }
    fn tags(&self) -> &[String] {
        &self.tags
    }
}

impl Listable for GameMap {
    fn display_name(&self) -> &str {
        &self.map_name
    }
    fn search_fields(&self) -> Vec<&str> {
        vec![&self.map_name]
    }
}

impl Listable for RuneTree {
    fn display_name(&self) -> &str {
        &self.name
    }
    fn search_fields(&self) -> Vec<&str> {
        vec![&self.name, &self.key]
    }
}

/// Search/filter/page state of one list view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListQuery {
    pub search_text: String,
    pub selected_tags: BTreeSet<String>,
    /// 1-based.
    pub page_index: usize,
    pub page_size: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::with_page_size(CHAMPIONS_PAGE_SIZE)
    }
}

impl ListQuery {
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            search_text: String::new(),
            selected_tags: BTreeSet::new(),
            page_index: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn set_search(&mut self, text: &str) {
        self.search_text = text.to_string();
        self.page_index = 1;
    }

    pub fn clear_search(&mut self) {
        self.set_search("");
    }

    /// Add the tag if absent, remove it if present.
    pub fn toggle_tag(&mut self, tag: &str) {
        if !self.selected_tags.remove(tag) {
            self.selected_tags.insert(tag.to_string());
        }
        self.page_index = 1;
    }

    pub fn clear_filters(&mut self) {
        self.search_text.clear();
        self.selected_tags.clear();
        self.page_index = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page_index = page.max(1);
    }

    /// Back to defaults, keeping the page size.
    pub fn reset(&mut self) {
        *self = Self::with_page_size(self.page_size);
    }

    pub fn has_active_filters(&self) -> bool {
        !self.search_text.trim().is_empty() || !self.selected_tags.is_empty()
    }
}

/// One page of pipeline output.
#[derive(Debug)]
pub struct Page<'a, T> {
    pub items: Vec<&'a T>,
    pub total_filtered: usize,
    pub total_pages: usize,
    pub page_index: usize,
    pub page_size: usize,
}

impl<T> Page<'_, T> {
    pub fn is_last(&self) -> bool {
        self.page_index >= self.total_pages
    }
}

pub fn matches_text<T: Listable>(item: &T, needle_lower: &str) -> bool {
    needle_lower.is_empty()
        || item
            .search_fields()
            .iter()
            .any(|f| f.to_lowercase().contains(needle_lower))
}

/// OR across the selected tags; empty selection matches everything.
pub fn matches_tags<T: Listable>(item: &T, selected: &BTreeSet<String>) -> bool {
    selected.is_empty() || item.tags().iter().any(|t| selected.contains(t))
}

fn by_display_name<T: Listable>(a: &&T, b: &&T) -> Ordering {
    a.display_name()
        .to_lowercase()
        .cmp(&b.display_name().to_lowercase())
}

/// Filter and sort without paginating.
pub fn filter_sorted<'a, T: Listable>(items: &'a [T], query: &ListQuery) -> Vec<&'a T> {
    let needle = query.search_text.trim().to_lowercase();
    let mut out: Vec<&T> = items
        .iter()
        .filter(|it| matches_text(*it, &needle))
        .filter(|it| matches_tags(*it, &query.selected_tags))
        .collect();
    // sort_by is stable: equal names keep source order
    out.sort_by(by_display_name);
    out
}

/// Run the full pipeline. A page past the end is empty, never an error.
pub fn run<'a, T: Listable>(items: &'a [T], query: &ListQuery) -> Page<'a, T> {
    let sorted = filter_sorted(items, query);
    let page_size = query.page_size.max(1);
    let total_filtered = sorted.len();
    let total_pages = total_filtered.div_ceil(page_size);
    let page_index = query.page_index.max(1);
    let start = (page_index - 1).saturating_mul(page_size);
    let items = sorted.into_iter().skip(start).take(page_size).collect();
    Page {
        items,
        total_filtered,
        total_pages,
        page_index,
        page_size,
    }
}

/// Every distinct tag in a collection, sorted. Drives the filter chips.
pub fn all_tags<T: Listable>(items: &[T]) -> Vec<String> {
    let set: BTreeSet<&String> = items.iter().flat_map(|i| i.tags().iter()).collect();
    set.into_iter().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn champ(name: &str, title: &str, tags: &[&str]) -> ChampionSummary {
        ChampionSummary {
            id: name.to_string(),
            name: name.to_string(),
            title: title.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    fn roster() -> Vec<ChampionSummary> {
        vec![
            champ("Zed", "the Master of Shadows", &["Assassin"]),
            champ("Ahri", "the Nine-Tailed Fox", &["Mage", "Assassin"]),
            champ("Malphite", "Shard of the Monolith", &["Tank", "Fighter"]),
            champ("Lux", "the Lady of Luminosity", &["Mage", "Support"]),
            champ("Garen", "The Might of Demacia", &["Fighter", "Tank"]),
        ]
    }

    fn names<T: Listable>(p: &Page<'_, T>) -> Vec<String> {
        p.items.iter().map(|c| c.display_name().to_string()).collect()
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let list = roster();
        let mut q = ListQuery::default();
        q.set_search("AHR");
        assert_eq!(names(&run(&list, &q)), vec!["Ahri"]);
    }

    #[test]
    fn test_search_matches_title() {
        let list = roster();
        let mut q = ListQuery::default();
        q.set_search("demacia");
        assert_eq!(names(&run(&list, &q)), vec!["Garen"]);
    }

    #[test]
    fn test_whitespace_query_matches_all() {
        let list = roster();
        let mut q = ListQuery::default();
        q.set_search("   ");
        assert_eq!(run(&list, &q).total_filtered, 5);
        assert!(!q.has_active_filters());
    }

    #[test]
    fn test_tags_use_or() {
        let list = roster();
        let mut q = ListQuery::default();
        q.toggle_tag("Tank");
        q.toggle_tag("Mage");
        assert_eq!(names(&run(&list, &q)), vec!["Ahri", "Garen", "Lux", "Malphite"]);

        q.toggle_tag("Mage");
        assert_eq!(names(&run(&list, &q)), vec!["Garen", "Malphite"]);
    }

    #[test]
    fn test_text_and_tags_combine_with_and() {
        let list = roster();
        let mut q = ListQuery::default();
        q.toggle_tag("Assassin");
        q.set_search("the");
        assert_eq!(names(&run(&list, &q)), vec!["Ahri", "Zed"]);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let list = vec![
            champ("Nunu", "first", &[]),
            champ("Annie", "", &[]),
            champ("nunu", "second", &[]),
        ];
        let p = run(&list, &ListQuery::default());
        let titles: Vec<_> = p.items.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["", "first", "second"]);
    }

    #[test]
    fn test_filter_changes_reset_page() {
        let mut q = ListQuery::default();
        q.set_page(3);
        q.set_search("a");
        assert_eq!(q.page_index, 1);
        q.set_page(2);
        q.toggle_tag("Mage");
        assert_eq!(q.page_index, 1);
        q.set_page(0);
        assert_eq!(q.page_index, 1);
    }

    #[test]
    fn test_all_tags_sorted_unique() {
        assert_eq!(
            all_tags(&roster()),
            vec!["Assassin", "Fighter", "Mage", "Support", "Tank"]
        );
    }
}
