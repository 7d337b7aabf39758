//! Cache keys: (resource kind, version, optional entity id).

use crate::error::QueryError;
use crate::models::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Versions,
    Champions,
    Champion,
    Items,
    Maps,
    Runes,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        ResourceKind::Versions,
        ResourceKind::Champions,
        ResourceKind::Champion,
        ResourceKind::Items,
        ResourceKind::Maps,
        ResourceKind::Runes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Versions => "versions",
            ResourceKind::Champions => "champions",
            ResourceKind::Champion => "champion",
            ResourceKind::Items => "items",
            ResourceKind::Maps => "maps",
            ResourceKind::Runes => "runes",
        }
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow::anyhow!("Invalid resource kind '{s}'"))
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one cached resource.
///
/// Only `Versions` has no version part; only `Champion` carries an id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub kind: ResourceKind,
    pub version: Option<Version>,
    pub id: Option<String>,
}

impl ResourceKey {
    pub fn versions() -> Self {
        ResourceKey {
            kind: ResourceKind::Versions,
            version: None,
            id: None,
        }
    }

    /// Key for a whole per-version catalog (champions, items, maps, runes).
    pub fn catalog(kind: ResourceKind, version: Option<&Version>) -> Result<Self, QueryError> {
        let version = version.ok_or(QueryError::MissingParameter("version"))?;
        Ok(ResourceKey {
            kind,
            version: Some(version.clone()),
            id: None,
        })
    }

    pub fn champions(version: Option<&Version>) -> Result<Self, QueryError> {
        Self::catalog(ResourceKind::Champions, version)
    }

    pub fn items(version: Option<&Version>) -> Result<Self, QueryError> {
        Self::catalog(ResourceKind::Items, version)
    }

    pub fn maps(version: Option<&Version>) -> Result<Self, QueryError> {
        Self::catalog(ResourceKind::Maps, version)
    }

    pub fn runes(version: Option<&Version>) -> Result<Self, QueryError> {
        Self::catalog(ResourceKind::Runes, version)
    }

    pub fn champion(version: Option<&Version>, id: Option<&str>) -> Result<Self, QueryError> {
        let version = version.ok_or(QueryError::MissingParameter("version"))?;
        let id = id
            .filter(|s| !s.trim().is_empty())
            .ok_or(QueryError::MissingParameter("champion id"))?;
        Ok(ResourceKey {
            kind: ResourceKind::Champion,
            version: Some(version.clone()),
            id: Some(id.to_string()),
        })
    }

    pub fn is_for_version(&self, v: &Version) -> bool {
        self.version.as_ref() == Some(v)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(v) = &self.version {
            write!(f, "@{v}")?;
        }
        if let Some(id) = &self.id {
            write!(f, "/{id}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_version() {
        assert_eq!(
            ResourceKey::champions(None),
            Err(QueryError::MissingParameter("version"))
        );
        let v = Version::from("14.1.1");
        assert_eq!(
            ResourceKey::champion(Some(&v), Some("  ")),
            Err(QueryError::MissingParameter("champion id"))
        );
    }

    #[test]
    fn test_display() {
        let v = Version::from("14.1.1");
        assert_eq!(ResourceKey::versions().to_string(), "versions");
        assert_eq!(ResourceKey::items(Some(&v)).unwrap().to_string(), "items@14.1.1");
        assert_eq!(
            ResourceKey::champion(Some(&v), Some("Ahri")).unwrap().to_string(),
            "champion@14.1.1/Ahri"
        );
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Items".parse::<ResourceKind>().unwrap(), ResourceKind::Items);
        assert!("monsters".parse::<ResourceKind>().is_err());
    }
}
