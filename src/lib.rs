//! ddx - Data Dragon explorer
//!
//! Data access and view-state core for browsing the League of Legends data
//! feed: champions, items, maps and rune trees for any published version.
//!
//! ## Architecture
//!
//! - **Data access**: [`http`] GETs JSON, [`cache`] de-duplicates, retries and
//!   serves stale-while-revalidate, [`service`] maps typed requests to keys.
//! - **Derived state**: [`pipeline`] filters, sorts and pages loaded
//!   collections; [`pager`] builds the page strip.
//! - **View state**: [`app`] is a reducer over [`app::Action`]s emitting
//!   [`app::Command`]s that [`runtime`] executes on tokio.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -- champions --tag Mage --page 2
//! cargo run -- browse
//! ```

// Data access
pub mod cache;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod keys;
pub mod models;
pub mod retry;
pub mod service;

// Derived list state
pub mod assets;
pub mod pager;
pub mod pipeline;

// View state and execution
pub mod app;
pub mod runtime;

pub mod config;

pub use app::{Action, App, AppEvent, Command, ListState, Section, Slot, Ticket};
pub use cache::{CachePolicy, CacheStats, EntrySnapshot, FetchStatus, QueryCache};
pub use error::{QueryError, QueryResult};
pub use http::{HttpClient, ReqwestClient};
pub use keys::{ResourceKey, ResourceKind};
pub use models::Version;
pub use pipeline::{ListQuery, Listable, Page};
pub use service::{DataService, Resource};
