//! Typed access to the feed through the query cache.

use crate::cache::{CachePolicy, QueryCache};
use crate::endpoints::{self, DEFAULT_LOCALE};
use crate::error::QueryError;
use crate::http::HttpClient;
use crate::keys::{ResourceKey, ResourceKind};
use crate::models::{ChampionDetail, ChampionSummary, GameMap, Item, RuneTree, Version};
use serde_json::Value;
use std::sync::Arc;

/// Decoded payload of one cache entry. The variant always matches the key's kind.
#[derive(Clone, Debug)]
pub enum Resource {
    Versions(Arc<Vec<Version>>),
    Champions(Arc<Vec<ChampionSummary>>),
    Champion(Arc<ChampionDetail>),
    Items(Arc<Vec<Item>>),
    Maps(Arc<Vec<GameMap>>),
    Runes(Arc<Vec<RuneTree>>),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Versions(_) => ResourceKind::Versions,
            Resource::Champions(_) => ResourceKind::Champions,
            Resource::Champion(_) => ResourceKind::Champion,
            Resource::Items(_) => ResourceKind::Items,
            Resource::Maps(_) => ResourceKind::Maps,
            Resource::Runes(_) => ResourceKind::Runes,
        }
    }

    /// Number of entities in a collection payload (1 for a detail).
    pub fn len(&self) -> usize {
        match self {
            Resource::Versions(v) => v.len(),
            Resource::Champions(v) => v.len(),
            Resource::Champion(_) => 1,
            Resource::Items(v) => v.len(),
            Resource::Maps(v) => v.len(),
            Resource::Runes(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decode a raw feed body for `key` into its typed payload.
pub fn decode(key: &ResourceKey, body: Value) -> Result<Resource, QueryError> {
    Ok(match key.kind {
        ResourceKind::Versions => {
            let versions = endpoints::decode::<Vec<Version>>(body)?;
            // Nothing else can be addressed without a version, so an empty
            // list is stored as an error and cleared by invalidate.
            if versions.is_empty() {
                return Err(QueryError::MissingParameter("version"));
            }
            Resource::Versions(Arc::new(versions))
        }
        ResourceKind::Champions => {
            let entries = endpoints::decode_entries::<ChampionSummary>(endpoints::data_map(body)?)?;
            Resource::Champions(Arc::new(
                entries
                    .into_iter()
                    .map(|(id, mut c)| {
                        if c.id.is_empty() {
                            c.id = id;
                        }
                        c
                    })
                    .collect(),
            ))
        }
        ResourceKind::Champion => {
            let id = key
                .id
                .as_deref()
                .ok_or(QueryError::MissingParameter("champion id"))?;
            let mut data = endpoints::data_map(body)?;
            let raw = data
                .remove(id)
                .ok_or_else(|| QueryError::Decode(format!("champion {id} missing from payload")))?;
            Resource::Champion(Arc::new(endpoints::decode::<ChampionDetail>(raw)?))
        }
        ResourceKind::Items => {
            let entries = endpoints::decode_entries::<Item>(endpoints::data_map(body)?)?;
            Resource::Items(Arc::new(
                entries
                    .into_iter()
                    .map(|(id, mut item)| {
                        item.id = id;
                        item
                    })
                    .collect(),
            ))
        }
        ResourceKind::Maps => {
            let entries = endpoints::decode_entries::<GameMap>(endpoints::data_map(body)?)?;
            Resource::Maps(Arc::new(
                entries
                    .into_iter()
                    .map(|(id, mut m)| {
                        if m.map_id.is_empty() {
                            m.map_id = id;
                        }
                        m
                    })
                    .collect(),
            ))
        }
        ResourceKind::Runes => Resource::Runes(Arc::new(endpoints::decode::<Vec<RuneTree>>(body)?)),
    })
}

fn unexpected(key: &ResourceKey, got: &Resource) -> QueryError {
    QueryError::Decode(format!("{key}: cached payload is {}", got.kind()))
}

/// Feed client: keys → provider paths → HTTP → decode, all through one cache.
#[derive(Clone)]
pub struct DataService {
    http: Arc<dyn HttpClient>,
    cache: QueryCache<Resource>,
    locale: String,
}

impl DataService {
    pub fn new(http: Arc<dyn HttpClient>, policy: CachePolicy) -> Self {
        Self::with_locale(http, policy, DEFAULT_LOCALE)
    }

    pub fn with_locale(http: Arc<dyn HttpClient>, policy: CachePolicy, locale: &str) -> Self {
        Self {
            http,
            cache: QueryCache::new(policy),
            locale: locale.to_string(),
        }
    }

    pub fn cache(&self) -> &QueryCache<Resource> {
        &self.cache
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Resolve any key through the cache.
    pub async fn resolve(&self, key: &ResourceKey) -> Result<Resource, QueryError> {
        let path = endpoints::path_for(key, &self.locale)?;
        let http = Arc::clone(&self.http);
        let fetch_key = key.clone();
        self.cache
            .resolve(key.clone(), move || {
                let http = Arc::clone(&http);
                let path = path.clone();
                let key = fetch_key.clone();
                async move {
                    let body = http.get_json(&path).await?;
                    decode(&key, body)
                }
            })
            .await
    }

    /// Peek at whatever is cached for `key`, fresh or stale.
    pub fn cached(&self, key: &ResourceKey) -> Option<Resource> {
        self.cache.cached(key)
    }

    /// All published versions, newest first.
    pub async fn versions(&self) -> Result<Arc<Vec<Version>>, QueryError> {
        let key = ResourceKey::versions();
        match self.resolve(&key).await? {
            Resource::Versions(v) => Ok(v),
            other => Err(unexpected(&key, &other)),
        }
    }

    pub async fn latest_version(&self) -> Result<Version, QueryError> {
        self.versions()
            .await?
            .first()
            .cloned()
            .ok_or(QueryError::MissingParameter("version"))
    }

    pub async fn champions(&self, version: &Version) -> Result<Arc<Vec<ChampionSummary>>, QueryError> {
        let key = ResourceKey::champions(Some(version))?;
        match self.resolve(&key).await? {
            Resource::Champions(v) => Ok(v),
            other => Err(unexpected(&key, &other)),
        }
    }

    pub async fn champion(&self, version: &Version, id: &str) -> Result<Arc<ChampionDetail>, QueryError> {
        let key = ResourceKey::champion(Some(version), Some(id))?;
        match self.resolve(&key).await? {
            Resource::Champion(c) => Ok(c),
            other => Err(unexpected(&key, &other)),
        }
    }

    pub async fn items(&self, version: &Version) -> Result<Arc<Vec<Item>>, QueryError> {
        let key = ResourceKey::items(Some(version))?;
        match self.resolve(&key).await? {
            Resource::Items(v) => Ok(v),
            other => Err(unexpected(&key, &other)),
        }
    }

    pub async fn maps(&self, version: &Version) -> Result<Arc<Vec<GameMap>>, QueryError> {
        let key = ResourceKey::maps(Some(version))?;
        match self.resolve(&key).await? {
            Resource::Maps(v) => Ok(v),
            other => Err(unexpected(&key, &other)),
        }
    }

    pub async fn runes(&self, version: &Version) -> Result<Arc<Vec<RuneTree>>, QueryError> {
        let key = ResourceKey::runes(Some(version))?;
        match self.resolve(&key).await? {
            Resource::Runes(v) => Ok(v),
            other => Err(unexpected(&key, &other)),
        }
    }

    /// Invalidate every cached key belonging to `version`.
    pub fn invalidate_version(&self, version: &Version) -> usize {
        self.cache.invalidate_matching(|k| k.is_for_version(version))
    }
}
