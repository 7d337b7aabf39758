//! View state: section, selection, version and list query, driven by
//! [`Action`]s. Network work is described as [`Command`]s; results come back
//! as [`AppEvent`]s and are dropped if the view has moved on since.

use crate::assets;
use crate::error::QueryError;
use crate::keys::{ResourceKey, ResourceKind};
use crate::models::{ChampionDetail, ChampionSummary, GameMap, Item, RuneTree, Version};
use crate::pipeline::{self, ListQuery, Listable, Page, CATALOG_PAGE_SIZE, CHAMPIONS_PAGE_SIZE};
use crate::service::Resource;
use std::collections::HashMap;
use std::fmt;

/// Rows per page of the version list.
pub const VERSIONS_PER_PAGE: usize = 14;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Section {
    #[default]
    Champions,
    Maps,
    Items,
    Runes,
}

impl Section {
    pub const ALL: [Section; 4] = [Section::Champions, Section::Maps, Section::Items, Section::Runes];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Champions => "champions",
            Section::Maps => "maps",
            Section::Items => "items",
            Section::Runes => "runes",
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Section::Champions => ResourceKind::Champions,
            Section::Maps => ResourceKind::Maps,
            Section::Items => ResourceKind::Items,
            Section::Runes => ResourceKind::Runes,
        }
    }

    pub fn default_page_size(&self) -> usize {
        match self {
            Section::Champions => CHAMPIONS_PAGE_SIZE,
            _ => CATALOG_PAGE_SIZE,
        }
    }
}

impl std::str::FromStr for Section {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        Section::ALL
            .into_iter()
            .find(|sec| sec.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("Invalid section '{s}' (expected champions, maps, items or runes)"))
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    SelectSection(Section),
    /// Open the detail overlay. Champions only.
    SelectEntity(String),
    Back,
    ChangeVersion(Version),
    SetSearch(String),
    ToggleTag(String),
    ClearSearch,
    ClearFilters,
    SetPage(usize),
    ToggleFilters,
    /// Expand a rune path, or collapse it if it is the expanded one. Runes only.
    ToggleRunePath(u32),
    /// Open the map overlay on its first picture. Maps only.
    OpenMap(String),
    CloseMap,
    NextMapImage,
    PrevMapImage,
    /// 1-based page of the version list, clamped to the loaded list.
    VersionsPage(usize),
    /// Invalidate and refetch every wanted key that failed.
    Retry,
}

/// Open map overlay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapView {
    pub map_id: String,
    pub image_index: usize,
}

/// A fetch request stamped with the transition that issued it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub key: ResourceKey,
    pub transition: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Fetch(Ticket),
    Invalidate(ResourceKey),
}

#[derive(Debug)]
pub enum AppEvent {
    Loaded {
        ticket: Ticket,
        result: Result<Resource, QueryError>,
    },
    Quit,
}

/// Load state of one wanted key, as seen by the view.
#[derive(Clone, Debug, Default)]
pub enum Slot<T> {
    #[default]
    Idle,
    Pending,
    Ready(T),
    Failed(QueryError),
}

impl<T> Slot<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending)
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Slot::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&QueryError> {
        match self {
            Slot::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// What the active list should render. `Unavailable` is never shown as an
/// empty list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListState {
    Loading,
    Unavailable(QueryError),
    /// The feed returned no entities at all.
    Empty,
    /// Entities exist but the current search/tags exclude all of them.
    NoMatches,
    Rows,
}

pub struct App {
    section: Section,
    selected_entity: Option<String>,
    version: Option<Version>,
    query: ListQuery,
    page_size_override: Option<usize>,
    show_filters: bool,
    expanded_rune_path: Option<u32>,
    map_view: Option<MapView>,
    versions_page: usize,
    transition: u64,
    slots: HashMap<ResourceKey, Slot<Resource>>,
    quit: bool,
}

impl App {
    /// `version` pins the feed snapshot; without it the newest published
    /// version is adopted once the version list arrives.
    pub fn new(version: Option<Version>, page_size_override: Option<usize>) -> Self {
        let section = Section::default();
        Self {
            section,
            selected_entity: None,
            version,
            query: ListQuery::with_page_size(page_size_override.unwrap_or(section.default_page_size())),
            page_size_override,
            show_filters: false,
            expanded_rune_path: None,
            map_view: None,
            versions_page: 1,
            transition: 0,
            slots: HashMap::new(),
            quit: false,
        }
    }

    pub fn section(&self) -> Section { self.section }
    pub fn selected_entity(&self) -> Option<&str> { self.selected_entity.as_deref() }
    pub fn version(&self) -> Option<&Version> { self.version.as_ref() }
    pub fn query(&self) -> &ListQuery { &self.query }
    pub fn show_filters(&self) -> bool { self.show_filters }
    pub fn expanded_rune_path(&self) -> Option<u32> { self.expanded_rune_path }
    pub fn map_view(&self) -> Option<&MapView> { self.map_view.as_ref() }
    pub fn versions_page(&self) -> usize { self.versions_page }
    pub fn transition(&self) -> u64 { self.transition }
    pub fn quit_flag(&self) -> bool { self.quit }

    /// Fetches needed for the initial view.
    pub fn start(&mut self) -> Vec<Command> {
        self.request_missing()
    }

    /// Keys the current view depends on.
    pub fn wanted_keys(&self) -> Vec<ResourceKey> {
        let mut keys = vec![ResourceKey::versions()];
        if let Ok(k) = ResourceKey::catalog(self.section.kind(), self.version.as_ref()) {
            keys.push(k);
        }
        if let Some(id) = &self.selected_entity {
            if let Ok(k) = ResourceKey::champion(self.version.as_ref(), Some(id.as_str())) {
                keys.push(k);
            }
        }
        keys
    }

    pub fn slot(&self, key: &ResourceKey) -> &Slot<Resource> {
        const IDLE: &Slot<Resource> = &Slot::Idle;
        self.slots.get(key).unwrap_or(IDLE)
    }

    /// Whether anything the current view depends on is still loading.
    pub fn is_loading(&self) -> bool {
        self.wanted_keys().iter().any(|k| self.slot(k).is_pending())
    }

    pub fn apply(&mut self, action: Action) -> Result<Vec<Command>, QueryError> {
        match action {
            Action::SelectSection(section) => {
                self.section = section;
                self.selected_entity = None;
                self.reset_query();
                self.close_overlays();
                Ok(self.transition_to())
            }
            Action::SelectEntity(id) => {
                if self.section != Section::Champions {
                    log::warn!("[app] ignoring entity selection '{id}' in {} section", self.section);
                    return Ok(Vec::new());
                }
                // Validates version and id before any state changes.
                ResourceKey::champion(self.version.as_ref(), Some(id.as_str()))?;
                self.selected_entity = Some(id);
                Ok(self.transition_to())
            }
            Action::Back => {
                if self.selected_entity.take().is_some() {
                    return Ok(self.transition_to());
                }
                self.map_view = None;
                Ok(Vec::new())
            }
            Action::ChangeVersion(v) => {
                log::info!("[app] version {} -> {v}", self.version_label());
                self.version = Some(v);
                self.selected_entity = None;
                self.reset_query();
                self.close_overlays();
                Ok(self.transition_to())
            }
            Action::SetSearch(text) => {
                self.query.set_search(&text);
                Ok(Vec::new())
            }
            Action::ToggleTag(tag) => {
                self.query.toggle_tag(&tag);
                Ok(Vec::new())
            }
            Action::ClearSearch => {
                self.query.clear_search();
                Ok(Vec::new())
            }
            Action::ClearFilters => {
                self.query.clear_filters();
                Ok(Vec::new())
            }
            Action::SetPage(page) => {
                self.query.set_page(page);
                Ok(Vec::new())
            }
            Action::ToggleFilters => {
                self.show_filters = !self.show_filters;
                Ok(Vec::new())
            }
            Action::ToggleRunePath(id) => {
                if self.section != Section::Runes {
                    log::warn!("[app] ignoring rune path {id} in {} section", self.section);
                    return Ok(Vec::new());
                }
                self.expanded_rune_path = match self.expanded_rune_path {
                    Some(open) if open == id => None,
                    _ => Some(id),
                };
                Ok(Vec::new())
            }
            Action::OpenMap(map_id) => {
                if self.section != Section::Maps {
                    log::warn!("[app] ignoring map '{map_id}' in {} section", self.section);
                    return Ok(Vec::new());
                }
                self.map_view = Some(MapView {
                    map_id,
                    image_index: 0,
                });
                Ok(Vec::new())
            }
            Action::CloseMap => {
                self.map_view = None;
                Ok(Vec::new())
            }
            Action::NextMapImage => {
                self.step_map_image(true);
                Ok(Vec::new())
            }
            Action::PrevMapImage => {
                self.step_map_image(false);
                Ok(Vec::new())
            }
            Action::VersionsPage(page) => {
                self.versions_page = page.clamp(1, self.versions_page_count().max(1));
                Ok(Vec::new())
            }
            Action::Retry => Ok(self.retry_failed()),
        }
    }

    pub fn on_event(&mut self, ev: AppEvent) -> Vec<Command> {
        match ev {
            AppEvent::Quit => {
                self.quit = true;
                Vec::new()
            }
            AppEvent::Loaded { ticket, result } => {
                if ticket.transition != self.transition {
                    log::debug!(
                        "[app] discarding {} from transition {} (now {})",
                        ticket.key,
                        ticket.transition,
                        self.transition
                    );
                    return Vec::new();
                }
                if !self.wanted_keys().contains(&ticket.key) {
                    log::debug!("[app] discarding {}: no longer wanted", ticket.key);
                    return Vec::new();
                }
                let adopt = match (&result, &self.version) {
                    (Ok(Resource::Versions(list)), None) => list.first().cloned(),
                    _ => None,
                };
                let slot = match result {
                    Ok(Resource::Versions(list)) if list.is_empty() && self.version.is_none() => {
                        log::warn!("[app] feed published no versions");
                        Slot::Failed(QueryError::MissingParameter("version"))
                    }
                    Ok(v) => Slot::Ready(v),
                    Err(e) => {
                        log::warn!("[app] {} unavailable: {e}", ticket.key);
                        Slot::Failed(e)
                    }
                };
                self.slots.insert(ticket.key, slot);

                match adopt {
                    Some(latest) => {
                        log::info!("[app] using latest version {latest}");
                        self.version = Some(latest);
                        self.transition_to()
                    }
                    None => Vec::new(),
                }
            }
        }
    }

    fn version_label(&self) -> String {
        self.version
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".into())
    }

    fn reset_query(&mut self) {
        let size = self
            .page_size_override
            .unwrap_or(self.section.default_page_size());
        self.query = ListQuery::with_page_size(size);
    }

    fn close_overlays(&mut self) {
        self.expanded_rune_path = None;
        self.map_view = None;
    }

    fn step_map_image(&mut self, forward: bool) {
        let len = self.open_map().map(assets::map_gallery_len).unwrap_or(0);
        let Some(view) = self.map_view.as_mut() else {
            return;
        };
        if len == 0 {
            return;
        }
        view.image_index = if forward {
            (view.image_index + 1) % len
        } else {
            (view.image_index + len - 1) % len
        };
    }

    /// Bump the transition counter, drop slots nobody wants any more and
    /// request whatever the new view is missing.
    fn transition_to(&mut self) -> Vec<Command> {
        self.transition += 1;
        let wanted = self.wanted_keys();
        self.slots.retain(|k, _| wanted.contains(k));
        self.request_missing()
    }

    fn request_missing(&mut self) -> Vec<Command> {
        let mut out = Vec::new();
        for key in self.wanted_keys() {
            if matches!(self.slot(&key), Slot::Ready(_) | Slot::Failed(_)) {
                continue;
            }
            self.slots.insert(key.clone(), Slot::Pending);
            out.push(Command::Fetch(Ticket {
                key,
                transition: self.transition,
            }));
        }
        out
    }

    fn retry_failed(&mut self) -> Vec<Command> {
        let mut out = Vec::new();
        for key in self.wanted_keys() {
            if self.slot(&key).error().is_none() {
                continue;
            }
            log::info!("[app] retrying {key}");
            self.slots.insert(key.clone(), Slot::Pending);
            out.push(Command::Invalidate(key.clone()));
            out.push(Command::Fetch(Ticket {
                key,
                transition: self.transition,
            }));
        }
        out
    }

    fn ready(&self, kind: ResourceKind) -> Option<&Resource> {
        let key = ResourceKey::catalog(kind, self.version.as_ref()).ok()?;
        self.slot(&key).ready()
    }

    pub fn versions(&self) -> &[Version] {
        match self.slot(&ResourceKey::versions()).ready() {
            Some(Resource::Versions(v)) => v,
            _ => &[],
        }
    }

    /// Loaded champion list, or empty while unavailable.
    pub fn champions(&self) -> &[ChampionSummary] {
        match self.ready(ResourceKind::Champions) {
            Some(Resource::Champions(v)) => v,
            _ => &[],
        }
    }

    pub fn items(&self) -> &[Item] {
        match self.ready(ResourceKind::Items) {
            Some(Resource::Items(v)) => v,
            _ => &[],
        }
    }

    pub fn maps(&self) -> &[GameMap] {
        match self.ready(ResourceKind::Maps) {
            Some(Resource::Maps(v)) => v,
            _ => &[],
        }
    }

    pub fn runes(&self) -> &[RuneTree] {
        match self.ready(ResourceKind::Runes) {
            Some(Resource::Runes(v)) => v,
            _ => &[],
        }
    }

    pub fn versions_page_count(&self) -> usize {
        self.versions().len().div_ceil(VERSIONS_PER_PAGE)
    }

    /// The slice of the version list on the current versions page.
    pub fn version_window(&self) -> &[Version] {
        let all = self.versions();
        let start = (self.versions_page - 1) * VERSIONS_PER_PAGE;
        let end = (start + VERSIONS_PER_PAGE).min(all.len());
        all.get(start..end).unwrap_or(&[])
    }

    /// The map behind the overlay, once the map list has it.
    pub fn open_map(&self) -> Option<&GameMap> {
        let view = self.map_view.as_ref()?;
        self.maps().iter().find(|m| m.map_id == view.map_id)
    }

    pub fn expanded_rune_tree(&self) -> Option<&RuneTree> {
        let id = self.expanded_rune_path?;
        self.runes().iter().find(|t| t.id == id)
    }

    fn detail_key(&self) -> Option<ResourceKey> {
        let id = self.selected_entity.as_deref()?;
        ResourceKey::champion(self.version.as_ref(), Some(id)).ok()
    }

    pub fn detail_slot(&self) -> Option<&Slot<Resource>> {
        self.detail_key().map(|k| self.slot(&k))
    }

    pub fn champion_detail(&self) -> Option<&ChampionDetail> {
        match self.detail_slot()?.ready()? {
            Resource::Champion(c) => Some(c),
            _ => None,
        }
    }

    fn page_of<'a, T: Listable>(&self, items: &'a [T]) -> Page<'a, T> {
        pipeline::run(items, &self.query)
    }

    pub fn champion_page(&self) -> Page<'_, ChampionSummary> {
        self.page_of(self.champions())
    }

    pub fn item_page(&self) -> Page<'_, Item> {
        self.page_of(self.items())
    }

    pub fn map_page(&self) -> Page<'_, GameMap> {
        self.page_of(self.maps())
    }

    pub fn rune_page(&self) -> Page<'_, RuneTree> {
        self.page_of(self.runes())
    }

    /// Filter chips for the active section.
    pub fn available_tags(&self) -> Vec<String> {
        match self.section {
            Section::Champions => pipeline::all_tags(self.champions()),
            Section::Items => pipeline::all_tags(self.items()),
            Section::Maps | Section::Runes => Vec::new(),
        }
    }

    fn section_counts(&self) -> (usize, usize) {
        match self.section {
            Section::Champions => (self.champions().len(), self.champion_page().total_filtered),
            Section::Items => (self.items().len(), self.item_page().total_filtered),
            Section::Maps => (self.maps().len(), self.map_page().total_filtered),
            Section::Runes => (self.runes().len(), self.rune_page().total_filtered),
        }
    }

    pub fn list_state(&self) -> ListState {
        let Some(version) = self.version.as_ref() else {
            return match self.slot(&ResourceKey::versions()) {
                Slot::Failed(e) => ListState::Unavailable(e.clone()),
                _ => ListState::Loading,
            };
        };
        let key = ResourceKey {
            kind: self.section.kind(),
            version: Some(version.clone()),
            id: None,
        };
        match self.slot(&key) {
            Slot::Idle | Slot::Pending => ListState::Loading,
            Slot::Failed(e) => ListState::Unavailable(e.clone()),
            Slot::Ready(_) => match self.section_counts() {
                (0, _) => ListState::Empty,
                (_, 0) => ListState::NoMatches,
                _ => ListState::Rows,
            },
        }
    }
}
