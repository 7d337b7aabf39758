//! Scripted in-memory feed shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use ddx::{HttpClient, QueryError};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

pub const VERSION: &str = "14.1.1";

#[derive(Default)]
pub struct FakeFeed {
    bodies: Mutex<HashMap<String, Value>>,
    failures: Mutex<HashMap<String, u16>>,
    calls: Mutex<HashMap<String, u32>>,
    delay: Mutex<Duration>,
}

impl FakeFeed {
    /// Feed serving versions and a small champion roster for [`VERSION`].
    pub fn new() -> Self {
        let feed = FakeFeed::default();
        feed.set_body("/api/versions.json", json!([VERSION, "13.24.1"]));
        feed.set_body(
            &format!("/cdn/{VERSION}/data/en_US/champion.json"),
            champions(&["Ahri", "Garen", "Lux"]),
        );
        feed
    }

    pub fn set_body(&self, path: &str, body: Value) {
        self.bodies.lock().unwrap().insert(path.to_string(), body);
    }

    pub fn fail(&self, path: &str, status: u16) {
        self.failures.lock().unwrap().insert(path.to_string(), status);
    }

    pub fn heal(&self, path: &str) {
        self.failures.lock().unwrap().remove(path);
    }

    pub fn set_delay(&self, d: Duration) {
        *self.delay.lock().unwrap() = d;
    }

    pub fn calls(&self, path: &str) -> u32 {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl HttpClient for FakeFeed {
    async fn get_json(&self, path: &str) -> Result<Value, QueryError> {
        *self.calls.lock().unwrap().entry(path.to_string()).or_default() += 1;
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(status) = self.failures.lock().unwrap().get(path) {
            return Err(QueryError::HttpStatus { status: *status, path: path.to_string() });
        }
        self.bodies
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| QueryError::HttpStatus { status: 404, path: path.to_string() })
    }
}

pub fn champions_path(version: &str) -> String {
    format!("/cdn/{version}/data/en_US/champion.json")
}

/// Champion list payload in feed shape.
pub fn champions(names: &[&str]) -> Value {
    let data: serde_json::Map<String, Value> = names
        .iter()
        .map(|n| {
            (
                n.to_string(),
                json!({"id": n, "name": n, "title": format!("the {n}"), "tags": ["Mage"]}),
            )
        })
        .collect();
    json!({"type": "champion", "version": VERSION, "data": data})
}
