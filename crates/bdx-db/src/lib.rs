//! # bdx-db
//!
//! Storage layer for bdx: the point store abstraction and its backends.
//!
//! The indexing core in `bdx-core` only talks to the [`PointStore`] trait. A
//! store knows about collections, points (id + vector + JSON payload) and
//! payload filters; it has no notion of branches or content addressing.
//!
//! ## Architecture
//!
//! ```text
//! bdx-cli → bdx-core → (PointStore trait)
//!                          ↑
//!                       bdx-db (SimplePointStore, factory)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use bdx_db::{open_point_store, PointFilter, PointStoreConfig};
//!
//! let store = open_point_store(&PointStoreConfig::persistent("/tmp/bdx"))?;
//! store.ensure_collection("my-repo", 256)?;
//!
//! let filter = PointFilter::new().must_match("type", "content");
//! let hits = store.search(&query, Some(&filter), 10, "my-repo")?;
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod filter;
pub mod point;
pub mod traits;

pub use backend::{available_backends, open_point_store, validate_collection_name, SimplePointStore};
pub use config::{PointStoreConfig, DEFAULT_BACKEND};
pub use error::{DbError, DbResult};
pub use filter::{FieldCondition, PointFilter};
pub use point::{Payload, Point, PointId, ScoredPoint, VectorMetric};
pub use traits::{PointStore, EMBEDDING_MODEL_FIELD};
