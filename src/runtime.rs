//! Executes [`Command`]s against the data service.

use crate::app::{AppEvent, Command};
use crate::cache::Observer;
use crate::keys::ResourceKey;
use crate::service::{DataService, Resource};
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Apply invalidations immediately and spawn one task per fetch. Each task
/// reports back through `tx` as [`AppEvent::Loaded`].
pub fn execute(
    service: &DataService,
    commands: Vec<Command>,
    tx: &UnboundedSender<AppEvent>,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();
    for cmd in commands {
        match cmd {
            Command::Invalidate(key) => service.cache().invalidate(&key),
            Command::Fetch(ticket) => {
                let service = service.clone();
                let tx = tx.clone();
                handles.push(tokio::spawn(async move {
                    let result = service.resolve(&ticket.key).await;
                    if tx.send(AppEvent::Loaded { ticket, result }).is_err() {
                        log::debug!("[runtime] event channel closed, dropping result");
                    }
                }));
            }
        }
    }
    handles
}

/// Keeps one cache observer per key the view currently depends on.
#[derive(Default)]
pub struct Observers {
    held: HashMap<ResourceKey, Observer<Resource>>,
}

impl Observers {
    /// Observe every key in `wanted` and release the rest.
    pub fn sync(&mut self, service: &DataService, wanted: &[ResourceKey]) {
        self.held.retain(|k, _| wanted.contains(k));
        for key in wanted {
            if !self.held.contains_key(key) {
                let obs = service.cache().observe(key.clone());
                self.held.insert(key.clone(), obs);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}
