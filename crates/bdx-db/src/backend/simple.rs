//! Simple point store backend.
//!
//! Keeps every collection in memory and, when opened on a directory, mirrors
//! each collection to a JSONL file after every mutation. Search is a linear
//! scan. It is intended for tests, the CLI and small repositories where a
//! full vector database is not justified.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{DbError, DbResult};
use crate::filter::PointFilter;
use crate::point::{Payload, Point, PointId, ScoredPoint, VectorMetric};
use crate::traits::PointStore;

/// Extension of the per-collection data file.
const DATA_EXTENSION: &str = "jsonl";

/// Extension of the per-collection metadata file.
const META_SUFFIX: &str = ".meta.json";

/// On-disk metadata for one collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionMeta {
    dimension: usize,
    metric: VectorMetric,
}

/// In-memory state of one collection.
#[derive(Debug, Default)]
struct CollectionData {
    dimension: usize,
    points: BTreeMap<PointId, Point>,
}

/// In-memory point store with optional JSONL persistence.
pub struct SimplePointStore {
    /// Directory holding collection files, `None` for a purely in-memory store.
    root: Option<PathBuf>,

    /// Distance metric used for search.
    metric: VectorMetric,

    /// Collections keyed by name.
    collections: RwLock<HashMap<String, CollectionData>>,
}

impl SimplePointStore {
    /// Create an empty store that never touches the filesystem.
    pub fn in_memory(metric: VectorMetric) -> Self {
        Self {
            root: None,
            metric,
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Open (or create) a store persisted under `root`.
    pub fn open(root: &Path, metric: VectorMetric) -> DbResult<Self> {
        debug!("Opening SimplePointStore at {:?}", root);
        fs::create_dir_all(root).map_err(|e| DbError::store_io(root, e.to_string()))?;

        let store = Self {
            root: Some(root.to_path_buf()),
            metric,
            collections: RwLock::new(HashMap::new()),
        };
        store.load_all(root)?;
        Ok(store)
    }

    /// Load every collection found under `root`.
    fn load_all(&self, root: &Path) -> DbResult<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;

        for entry in fs::read_dir(root)? {
            let path = entry?.path();
            let Some(name) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(META_SUFFIX))
            else {
                continue;
            };

            let data = load_collection(root, name)?;
            debug!("Loaded collection '{}' with {} points", name, data.points.len());
            collections.insert(name.to_string(), data);
        }

        Ok(())
    }

    /// Persist a single collection, if this store is backed by a directory.
    fn persist(&self, name: &str, data: &CollectionData) -> DbResult<()> {
        let Some(root) = &self.root else {
            return Ok(());
        };

        let meta = CollectionMeta {
            dimension: data.dimension,
            metric: self.metric,
        };
        write_atomic(
            &root.join(format!("{}{}", name, META_SUFFIX)),
            &serde_json::to_vec_pretty(&meta)?,
        )?;

        let mut buf = Vec::new();
        {
            let mut writer = BufWriter::new(&mut buf);
            for point in data.points.values() {
                serde_json::to_writer(&mut writer, point)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        write_atomic(&root.join(format!("{}.{}", name, DATA_EXTENSION)), &buf)?;

        trace!("Persisted collection '{}' ({} points)", name, data.points.len());
        Ok(())
    }

    /// Compute similarity between two vectors; higher is always better.
    fn compute_similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        match self.metric {
            VectorMetric::Cosine => cosine_similarity(a, b),
            VectorMetric::Dot => dot_product(a, b),
            VectorMetric::L2 => -euclidean_distance(a, b),
        }
    }
}

fn matches(filter: Option<&PointFilter>, point: &Point) -> bool {
    filter.map(|f| f.matches(&point.payload)).unwrap_or(true)
}

/// Check that `name` is usable as a collection (and file) name.
pub fn validate_collection_name(name: &str) -> DbResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !name.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(DbError::InvalidCollectionName {
            collection: name.to_string(),
        })
    }
}

impl PointStore for SimplePointStore {
    fn ensure_collection(&self, collection: &str, dimension: usize) -> DbResult<()> {
        validate_collection_name(collection)?;

        let mut collections = self
            .collections
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;

        if let Some(existing) = collections.get(collection) {
            if existing.dimension != dimension {
                return Err(DbError::DimensionMismatch {
                    collection: collection.to_string(),
                    expected: existing.dimension,
                    actual: dimension,
                });
            }
            return Ok(());
        }

        debug!("Creating collection '{}' (dimension {})", collection, dimension);
        let data = CollectionData {
            dimension,
            points: BTreeMap::new(),
        };
        self.persist(collection, &data)?;
        collections.insert(collection.to_string(), data);
        Ok(())
    }

    fn refresh(&self, collection: &str) -> DbResult<()> {
        let Some(root) = &self.root else {
            return Ok(());
        };
        validate_collection_name(collection)?;
        if !root.join(format!("{}{}", collection, META_SUFFIX)).exists() {
            return Ok(());
        }

        let data = load_collection(root, collection)?;
        trace!("Reloaded collection '{}' ({} points)", collection, data.points.len());
        self.collections
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?
            .insert(collection.to_string(), data);
        Ok(())
    }

    fn get_point(&self, id: &PointId, collection: &str) -> DbResult<Option<Point>> {
        let collections = self
            .collections
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;
        let data = collections
            .get(collection)
            .ok_or_else(|| DbError::collection_not_found(collection))?;
        Ok(data.points.get(id).cloned())
    }

    fn upsert_points(&self, points: &[Point], collection: &str) -> DbResult<()> {
        debug!("Upserting {} points into '{}'", points.len(), collection);

        let mut collections = self
            .collections
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;
        let data = collections
            .get_mut(collection)
            .ok_or_else(|| DbError::collection_not_found(collection))?;

        // Validate the whole batch before touching anything.
        for point in points {
            if point.vector.len() != data.dimension {
                return Err(DbError::DimensionMismatch {
                    collection: collection.to_string(),
                    expected: data.dimension,
                    actual: point.vector.len(),
                });
            }
        }

        for point in points {
            data.points.insert(point.id, point.clone());
        }

        self.persist(collection, data)
    }

    fn search(
        &self,
        query: &[f32],
        filter: Option<&PointFilter>,
        limit: usize,
        collection: &str,
    ) -> DbResult<Vec<ScoredPoint>> {
        trace!("Searching '{}', limit={}", collection, limit);

        let collections = self
            .collections
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;
        let data = collections
            .get(collection)
            .ok_or_else(|| DbError::collection_not_found(collection))?;

        if query.len() != data.dimension {
            return Err(DbError::DimensionMismatch {
                collection: collection.to_string(),
                expected: data.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(f32, &Point)> = data
            .points
            .values()
            .filter(|p| matches(filter, p))
            .map(|p| (self.compute_similarity(query, &p.vector), p))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(score, p)| ScoredPoint::new(p.id, score, p.payload.clone()))
            .collect())
    }

    fn scroll_points(
        &self,
        filter: Option<&PointFilter>,
        collection: &str,
        limit: usize,
        offset: Option<PointId>,
    ) -> DbResult<(Vec<Point>, Option<PointId>)> {
        let collections = self
            .collections
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;
        let data = collections
            .get(collection)
            .ok_or_else(|| DbError::collection_not_found(collection))?;

        let iter: Box<dyn Iterator<Item = &Point>> = match offset {
            Some(start) => Box::new(data.points.range(start..).map(|(_, p)| p)),
            None => Box::new(data.points.values()),
        };

        // Fetch one extra point so its id can serve as the next cursor.
        let mut page: Vec<Point> = iter
            .filter(|p| matches(filter, p))
            .take(limit.saturating_add(1))
            .cloned()
            .collect();

        let next = if page.len() > limit {
            page.pop().map(|p| p.id)
        } else {
            None
        };

        Ok((page, next))
    }

    fn batch_update_points(
        &self,
        filter: &PointFilter,
        updates: &Payload,
        collection: &str,
    ) -> DbResult<usize> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;
        let data = collections
            .get_mut(collection)
            .ok_or_else(|| DbError::collection_not_found(collection))?;

        let mut updated = 0usize;
        for point in data.points.values_mut() {
            if filter.matches(&point.payload) {
                for (key, value) in updates {
                    point.payload.insert(key.clone(), value.clone());
                }
                updated += 1;
            }
        }

        debug!("Updated {} points in '{}'", updated, collection);
        if updated > 0 {
            self.persist(collection, data)?;
        }
        Ok(updated)
    }

    fn delete_points(&self, ids: &[PointId], collection: &str) -> DbResult<usize> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| DbError::internal(format!("Failed to acquire write lock: {}", e)))?;
        let data = collections
            .get_mut(collection)
            .ok_or_else(|| DbError::collection_not_found(collection))?;

        let deleted = ids
            .iter()
            .filter(|id| data.points.remove(id).is_some())
            .count();

        debug!("Deleted {} points from '{}'", deleted, collection);
        if deleted > 0 {
            self.persist(collection, data)?;
        }
        Ok(deleted)
    }

    fn count(&self, filter: Option<&PointFilter>, collection: &str) -> DbResult<usize> {
        let collections = self
            .collections
            .read()
            .map_err(|e| DbError::internal(format!("Failed to acquire read lock: {}", e)))?;
        let data = collections
            .get(collection)
            .ok_or_else(|| DbError::collection_not_found(collection))?;
        Ok(data.points.values().filter(|p| matches(filter, p)).count())
    }
}

// ============================================================================
// File helpers
// ============================================================================

/// Load points from a JSONL file, skipping unreadable lines.
/// Read the metadata and points of collection `name` under `root`.
fn load_collection(root: &Path, name: &str) -> DbResult<CollectionData> {
    let meta_path = root.join(format!("{}{}", name, META_SUFFIX));
    let meta: CollectionMeta = serde_json::from_slice(&fs::read(&meta_path)?)?;
    let points = load_points(&root.join(format!("{}.{}", name, DATA_EXTENSION)))?;
    Ok(CollectionData {
        dimension: meta.dimension,
        points,
    })
}

fn load_points(path: &Path) -> DbResult<BTreeMap<PointId, Point>> {
    let mut points = BTreeMap::new();
    if !path.exists() {
        return Ok(points);
    }

    let reader = BufReader::new(File::open(path)?);
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Point>(&line) {
            Ok(point) => {
                points.insert(point.id, point);
            }
            Err(e) => {
                debug!("Skipping invalid line {} in {:?}: {}", line_num + 1, path, e);
            }
        }
    }
    Ok(points)
}

/// Write a file via a temporary sibling and rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> DbResult<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(|e| DbError::store_io(&tmp, e.to_string()))?;
    fs::rename(&tmp, path).map_err(|e| DbError::store_io(path, e.to_string()))?;
    Ok(())
}

// ============================================================================
// Similarity Functions
// ============================================================================

/// Compute cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Compute dot product between two vectors.
fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Compute Euclidean (L2) distance between two vectors.
fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

// ============================================================================
// Tests
// ============================================================================
