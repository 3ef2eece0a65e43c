//! Bedrock TINs of one glacier, triangulated on first use.

use crate::{BedrockTin, DemError, Result};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Default number of triangulated basins kept in memory.
const DEFAULT_CACHE_SIZE: usize = 8;

/// Parse the basin number from a filename like `tin_12.csv`.
fn sink_nr_from_filename(filename: &str) -> Option<u32> {
    let stem = filename.strip_suffix(".csv")?;
    let digits = stem.strip_prefix("tin_").or_else(|| stem.strip_prefix("TIN"))?;
    digits.parse().ok()
}

/// TINs of a glacier's basins, keyed by `sinkNr`.
///
/// A glacier directory is indexed once; each TIN is triangulated the first
/// time a lake forms in its basin. Every scenario of every climate model
/// revisits the same few frontal basins, so the most recently used
/// triangulations are kept.
///
/// ```no_run
/// use glake_dem::TinStore;
///
/// let mut store = TinStore::new();
/// store.add_directory("RGI60-14.00005/tins")?;
///
/// let triangles = store.with_tin(3, |tin| tin.num_triangles())?;
/// println!("Basin 3 TIN has {} triangles", triangles);
/// # Ok::<(), glake_dem::DemError>(())
/// ```
#[derive(Debug)]
pub struct TinStore {
    tin_paths: BTreeMap<u32, PathBuf>,
    cache: RwLock<TinCache>,
}

/// Triangulated basins, least recently used first in `recent`.
#[derive(Debug)]
struct TinCache {
    tins: HashMap<u32, BedrockTin>,
    recent: VecDeque<u32>,
    capacity: usize,
}

impl TinCache {
    fn new(capacity: usize) -> Self {
        Self {
            tins: HashMap::new(),
            recent: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn promote(&mut self, sink_nr: u32) {
        if let Some(pos) = self.recent.iter().position(|&k| k == sink_nr) {
            self.recent.remove(pos);
        }
        self.recent.push_back(sink_nr);
    }

    fn insert(&mut self, sink_nr: u32, tin: BedrockTin) {
        if self.tins.insert(sink_nr, tin).is_none() {
            while self.tins.len() > self.capacity {
                let Some(oldest) = self.recent.pop_front() else {
                    break;
                };
                self.tins.remove(&oldest);
            }
        }
        self.promote(sink_nr);
    }
}

impl Default for TinStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TinStore {
    pub fn new() -> Self {
        Self::with_cache_size(DEFAULT_CACHE_SIZE)
    }

    /// Store keeping at most `cache_size` triangulations in memory.
    pub fn with_cache_size(cache_size: usize) -> Self {
        Self {
            tin_paths: BTreeMap::new(),
            cache: RwLock::new(TinCache::new(cache_size)),
        }
    }

    /// Index all `tin_<sinkNr>.csv` files in a directory.
    ///
    /// Returns the number of TINs indexed. A missing directory indexes
    /// nothing; volume requests for its basins then fail with
    /// [`DemError::NoTinFound`].
    pub fn add_directory<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            tracing::warn!("TIN directory {} does not exist", dir.display());
            return Ok(0);
        }

        let mut count = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            match path.file_name().and_then(|s| s.to_str()).and_then(sink_nr_from_filename) {
                Some(sink_nr) => {
                    self.tin_paths.insert(sink_nr, path);
                    count += 1;
                }
                None => tracing::debug!("Ignoring {} in TIN directory", path.display()),
            }
        }

        Ok(count)
    }

    /// Use an already triangulated surface for a basin.
    pub fn insert(&self, sink_nr: u32, tin: BedrockTin) -> Result<()> {
        self.cache
            .write()
            .map_err(|_| DemError::CacheLockPoisoned)?
            .insert(sink_nr, tin);
        Ok(())
    }

    /// Run `f` against the TIN of a basin, triangulating it on first use.
    pub fn with_tin<R>(&self, sink_nr: u32, f: impl FnOnce(&BedrockTin) -> R) -> Result<R> {
        let mut cache = self.cache.write().map_err(|_| DemError::CacheLockPoisoned)?;

        if cache.tins.contains_key(&sink_nr) {
            cache.promote(sink_nr);
        } else {
            let path = self.tin_paths.get(&sink_nr).ok_or(DemError::NoTinFound(sink_nr))?;
            let tin = BedrockTin::from_csv(path)?;
            tracing::debug!(
                "Triangulated basin {}: {} vertices, {} triangles",
                sink_nr,
                tin.num_vertices(),
                tin.num_triangles()
            );
            cache.insert(sink_nr, tin);
        }

        let tin = cache.tins.get(&sink_nr).ok_or(DemError::NoTinFound(sink_nr))?;
        Ok(f(tin))
    }

    /// Whether the basin's TIN is currently triangulated in memory.
    pub fn is_loaded(&self, sink_nr: u32) -> bool {
        self.cache
            .read()
            .map(|c| c.tins.contains_key(&sink_nr))
            .unwrap_or(false)
    }
}
