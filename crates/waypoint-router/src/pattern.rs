//! Route pattern parsing and matching
//!
//! A pattern is an ordered list of `/`-delimited segments. Matching walks
//! pattern and path segments pairwise; a match is exact only when the
//! pattern is fully consumed and either the path is too or the pattern
//! ended in a recursive wildcard.

use std::collections::HashMap;
use thiserror::Error;

/// Errors from pattern parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// `**` somewhere other than the final segment
    #[error("recursive wildcard must be the final segment: {0}")]
    TailNotLast(String),
    /// `:` with no parameter name
    #[error("empty parameter name in pattern: {0}")]
    EmptyParamName(String),
}

/// One `/`-delimited unit of a route pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal segment, compared case-sensitively
    Static(String),
    /// Named parameter (`:id`) - captures exactly one segment
    Param(String),
    /// Single wildcard (`*`) - matches exactly one segment, no capture
    Wildcard,
    /// Recursive wildcard (`**`) - matches zero or more remaining segments
    Tail,
}

impl Segment {
    /// Score contribution for priority ranking
    fn score(&self) -> u32 {
        match self {
            Segment::Static(_) => 10,
            Segment::Param(_) => 1,
            Segment::Wildcard | Segment::Tail => 0,
        }
    }

    /// Structural equality: parameter names don't make patterns distinct
    fn same_shape(&self, other: &Segment) -> bool {
        match (self, other) {
            (Segment::Static(a), Segment::Static(b)) => a == b,
            (Segment::Param(_), Segment::Param(_)) => true,
            (Segment::Wildcard, Segment::Wildcard) => true,
            (Segment::Tail, Segment::Tail) => true,
            _ => false,
        }
    }
}

/// Result of matching a path against a pattern
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// True when every non-wildcard segment aligned and both sides were consumed
    pub exact: bool,
    /// Captured parameters as (name, value) pairs
    pub params: Vec<(String, String)>,
}

impl MatchResult {
    fn failed() -> Self {
        Self {
            exact: false,
            params: Vec::new(),
        }
    }

    /// Get params as HashMap for convenient access
    pub fn params_map(&self) -> HashMap<String, String> {
        self.params.iter().cloned().collect()
    }
}

/// Immutable parsed route pattern
#[derive(Debug, Clone)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Parse a raw pattern string
    ///
    /// Empty segments from leading/trailing/doubled slashes are ignored,
    /// so `/user/:id` and `user/:id/` parse identically.
    pub fn parse(raw: &str) -> Result<Self, PatternError> {
        let parts: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(parts.len());

        for (i, part) in parts.iter().enumerate() {
            let segment = if *part == "**" {
                if i + 1 != parts.len() {
                    return Err(PatternError::TailNotLast(raw.to_string()));
                }
                Segment::Tail
            } else if *part == "*" {
                Segment::Wildcard
            } else if let Some(name) = part.strip_prefix(':') {
                if name.is_empty() {
                    return Err(PatternError::EmptyParamName(raw.to_string()));
                }
                Segment::Param(name.to_string())
            } else {
                Segment::Static(part.to_string())
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The pattern string as given at registration
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Number of parsed segments
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Priority score: static segments 10, parameters 1, wildcards 0
    pub fn score(&self) -> u32 {
        self.segments.iter().map(Segment::score).sum()
    }

    /// Whether two patterns have the same literal structure
    ///
    /// `/user/:id` and `/user/:uid` are the same shape; registering both
    /// is a duplicate, not two routes.
    pub fn literal_eq(&self, other: &RoutePattern) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.same_shape(b))
    }

    /// Match a request path against this pattern
    pub fn match_path(&self, path: &str) -> MatchResult {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Vec::new();

        let mut i = 0;
        for segment in &self.segments {
            if let Segment::Tail = segment {
                // Consumes the rest of the path, zero segments included
                return MatchResult {
                    exact: true,
                    params,
                };
            }

            let Some(part) = parts.get(i) else {
                // Pattern longer than path
                return MatchResult::failed();
            };

            match segment {
                Segment::Static(lit) => {
                    if lit != part {
                        return MatchResult::failed();
                    }
                }
                Segment::Param(name) => {
                    params.push((name.clone(), (*part).to_string()));
                }
                Segment::Wildcard => {}
                Segment::Tail => unreachable!("handled above"),
            }
            i += 1;
        }

        if i == parts.len() {
            MatchResult {
                exact: true,
                params,
            }
        } else {
            // Path has segments the pattern never consumed
            MatchResult::failed()
        }
    }
}
