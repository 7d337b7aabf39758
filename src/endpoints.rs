//! Maps logical resource keys onto the feed provider's URL layout and unwraps
//! its response envelopes.
//!
//! Logical contract:
//!
//! | Key                  | Provider path                                      |
//! |----------------------|----------------------------------------------------|
//! | `versions`           | `/api/versions.json`                               |
//! | `champions@v`        | `/cdn/{v}/data/{locale}/champion.json`             |
//! | `champion@v/{id}`    | `/cdn/{v}/data/{locale}/champion/{id}.json`        |
//! | `items@v`            | `/cdn/{v}/data/{locale}/item.json`                 |
//! | `maps@v`             | `/cdn/{v}/data/{locale}/map.json`                  |
//! | `runes@v`            | `/cdn/{v}/data/{locale}/runesReforged.json`        |
//!
//! Catalog files wrap an id→entity map in a `data` field; the rune file is a
//! bare array.

use crate::error::QueryError;
use crate::keys::{ResourceKey, ResourceKind};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub const DEFAULT_LOCALE: &str = "en_US";

/// Provider path for a key.
pub fn path_for(key: &ResourceKey, locale: &str) -> Result<String, QueryError> {
    let file = match key.kind {
        ResourceKind::Versions => return Ok("/api/versions.json".to_string()),
        ResourceKind::Champions => "champion.json".to_string(),
        ResourceKind::Champion => {
            let id = key
                .id
                .as_deref()
                .ok_or(QueryError::MissingParameter("champion id"))?;
            format!("champion/{}.json", urlencoding::encode(id))
        }
        ResourceKind::Items => "item.json".to_string(),
        ResourceKind::Maps => "map.json".to_string(),
        ResourceKind::Runes => "runesReforged.json".to_string(),
    };
    let version = key
        .version
        .as_ref()
        .ok_or(QueryError::MissingParameter("version"))?;
    let v = urlencoding::encode(version.as_str());
    Ok(format!("/cdn/{v}/data/{locale}/{file}"))
}

/// The `data` object of a catalog envelope.
pub fn data_map(mut body: Value) -> Result<Map<String, Value>, QueryError> {
    match body.get_mut("data").map(Value::take) {
        Some(Value::Object(m)) => Ok(m),
        Some(other) => Err(QueryError::Decode(format!(
            "expected object under \"data\", got {}",
            kind_name(&other)
        ))),
        None => Err(QueryError::Decode("missing \"data\" envelope".into())),
    }
}

/// Decode every value of an id→entity map, keeping the feed's key order.
pub fn decode_entries<T: DeserializeOwned>(
    map: Map<String, Value>,
) -> Result<Vec<(String, T)>, QueryError> {
    map.into_iter()
        .map(|(id, v)| {
            serde_json::from_value::<T>(v)
                .map(|t| (id.clone(), t))
                .map_err(|e| QueryError::Decode(format!("entry {id}: {e}")))
        })
        .collect()
}

pub fn decode<T: DeserializeOwned>(body: Value) -> Result<T, QueryError> {
    serde_json::from_value(body).map_err(|e| QueryError::Decode(e.to_string()))
}

fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Version;
    use serde_json::json;

    #[test]
    fn test_paths() {
        let v = Version::from("14.1.1");
        assert_eq!(
            path_for(&ResourceKey::versions(), DEFAULT_LOCALE).unwrap(),
            "/api/versions.json"
        );
        assert_eq!(
            path_for(&ResourceKey::champions(Some(&v)).unwrap(), DEFAULT_LOCALE).unwrap(),
            "/cdn/14.1.1/data/en_US/champion.json"
        );
        assert_eq!(
            path_for(&ResourceKey::champion(Some(&v), Some("Ahri")).unwrap(), "ko_KR").unwrap(),
            "/cdn/14.1.1/data/ko_KR/champion/Ahri.json"
        );
        assert_eq!(
            path_for(&ResourceKey::runes(Some(&v)).unwrap(), DEFAULT_LOCALE).unwrap(),
            "/cdn/14.1.1/data/en_US/runesReforged.json"
        );
    }

    #[test]
    fn test_hand_built_key_without_version() {
        let key = ResourceKey {
            kind: ResourceKind::Items,
            version: None,
            id: None,
        };
        assert_eq!(
            path_for(&key, DEFAULT_LOCALE),
            Err(QueryError::MissingParameter("version"))
        );
    }

    #[test]
    fn test_data_envelope() {
        let m = data_map(json!({"type": "champion", "data": {"B": 1, "A": 2}})).unwrap();
        // feed order is preserved
        assert_eq!(m.keys().collect::<Vec<_>>(), vec!["B", "A"]);

        assert!(matches!(data_map(json!({"x": 1})), Err(QueryError::Decode(_))));
        assert!(matches!(data_map(json!({"data": []})), Err(QueryError::Decode(_))));
    }
}
