//! Route registry with priority resolution and a path-keyed match cache
//!
//! The registry owns every live route entry. Resolution linearly scans
//! registered patterns, keeps exact matches only, and picks the winner by
//! score, then segment count, then registration order. Winning resolutions
//! are cached by request path; the cache is invalidated eagerly on every
//! mutation since a stale entry would misroute requests.

use crate::pattern::{PatternError, RoutePattern};
use std::collections::HashMap;
use thiserror::Error;

/// Errors from registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Pattern failed to parse
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] PatternError),
    /// Same literal structure already registered for the module (strict policy only)
    #[error("duplicate pattern for module {module}: {pattern}")]
    DuplicatePattern { module: String, pattern: String },
}

/// What to do when a module registers the same literal pattern twice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationPolicy {
    /// Last write wins, silently
    #[default]
    Replace,
    /// Fail with `DuplicatePattern`
    Strict,
}

/// A registered route: pattern + destination descriptor + owning module
#[derive(Debug, Clone)]
pub struct RouteEntry<D> {
    pub pattern: RoutePattern,
    pub destination: D,
    pub module: String,
    /// Registration order, used as the final resolution tie-break
    seq: u64,
}

/// A winning resolution for one request path
#[derive(Debug, Clone)]
pub struct Resolved<D> {
    pub destination: D,
    pub module: String,
    pub pattern: RoutePattern,
    pub params: Vec<(String, String)>,
    /// Cache eviction stamp
    stamp: u64,
}

/// Resolution cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Route registry, generic over the destination descriptor type
pub struct Registry<D> {
    entries: Vec<RouteEntry<D>>,
    policy: RegistrationPolicy,
    cache: HashMap<String, Resolved<D>>,
    cache_capacity: usize,
    stats: CacheStats,
    next_seq: u64,
    next_stamp: u64,
}

const DEFAULT_CACHE_CAPACITY: usize = 256;

impl<D: Clone> Registry<D> {
    /// Create a registry with the default (Replace) policy
    pub fn new() -> Self {
        Self::with_policy(RegistrationPolicy::Replace, DEFAULT_CACHE_CAPACITY)
    }

    /// Create a registry with an explicit policy and cache capacity
    pub fn with_policy(policy: RegistrationPolicy, cache_capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            policy,
            cache: HashMap::new(),
            cache_capacity: cache_capacity.max(1),
            stats: CacheStats::default(),
            next_seq: 0,
            next_stamp: 0,
        }
    }

    /// Register a route owned by `module`
    ///
    /// Under the default policy a pattern with the same literal structure
    /// as an existing entry of the same module replaces it. Any successful
    /// registration clears the cache, since a new entry can shadow any
    /// cached path.
    pub fn register(
        &mut self,
        pattern: &str,
        module: &str,
        destination: D,
    ) -> Result<(), RegistryError> {
        let pattern = RoutePattern::parse(pattern)?;
        let seq = self.next_seq;
        self.next_seq += 1;

        let existing = self
            .entries
            .iter()
            .position(|e| e.module == module && e.pattern.literal_eq(&pattern));

        if let Some(idx) = existing {
            if self.policy == RegistrationPolicy::Strict {
                return Err(RegistryError::DuplicatePattern {
                    module: module.to_string(),
                    pattern: pattern.raw().to_string(),
                });
            }
            self.entries[idx] = RouteEntry {
                pattern,
                destination,
                module: module.to_string(),
                seq,
            };
        } else {
            self.entries.push(RouteEntry {
                pattern,
                destination,
                module: module.to_string(),
                seq,
            });
        }

        self.cache.clear();
        Ok(())
    }

    /// Remove every entry owned by `module`; returns how many were removed
    ///
    /// Cached resolutions whose winning pattern belongs to the module are
    /// purged with them.
    pub fn unregister_module(&mut self, module: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.module != module);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.cache.retain(|_, r| r.module != module);
        }
        removed
    }

    /// All live entries, in registration order
    pub fn entries(&self) -> &[RouteEntry<D>] {
        &self.entries
    }

    /// Entries owned by one module
    pub fn entries_for_module(&self, module: &str) -> Vec<&RouteEntry<D>> {
        self.entries.iter().filter(|e| e.module == module).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cache hit/miss counters
    pub fn cache_stats(&self) -> CacheStats {
        self.stats
    }

    /// Resolve a request path to its highest-priority exact match
    pub fn resolve(&mut self, path: &str) -> Option<Resolved<D>> {
        if let Some(hit) = self.cache.get(path) {
            self.stats.hits += 1;
            return Some(hit.clone());
        }
        self.stats.misses += 1;

        let mut best: Option<(&RouteEntry<D>, Vec<(String, String)>, u32)> = None;
        for entry in &self.entries {
            let m = entry.pattern.match_path(path);
            if !m.exact {
                continue;
            }
            let score = entry.pattern.score();
            let wins = match &best {
                None => true,
                Some((current, _, current_score)) => {
                    score > *current_score
                        || (score == *current_score
                            && entry.pattern.segment_count() > current.pattern.segment_count())
                        || (score == *current_score
                            && entry.pattern.segment_count() == current.pattern.segment_count()
                            && entry.seq < current.seq)
                }
            };
            if wins {
                best = Some((entry, m.params, score));
            }
        }

        let (entry, params, _) = best?;
        let resolved = Resolved {
            destination: entry.destination.clone(),
            module: entry.module.clone(),
            pattern: entry.pattern.clone(),
            params,
            stamp: self.next_stamp,
        };
        self.next_stamp += 1;

        if self.cache.len() >= self.cache_capacity {
            // Evict the oldest cached resolution
            if let Some(oldest) = self
                .cache
                .iter()
                .min_by_key(|(_, r)| r.stamp)
                .map(|(k, _)| k.clone())
            {
                self.cache.remove(&oldest);
            }
        }
        self.cache.insert(path.to_string(), resolved.clone());
        Some(resolved)
    }
}

impl<D: Clone> Default for Registry<D> {
    fn default() -> Self {
        Self::new()
    }
}
