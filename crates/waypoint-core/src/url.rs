//! Navigation URL parsing
//!
//! Accepts `scheme://path/segments?query#fragment` as well as bare paths
//! (`/user/42?tab=posts`). Query pairs and well-formed fragment pairs are
//! folded into one parameter list; for custom schemes the authority
//! component is treated as the first path segment, so `app://user/42`
//! routes on `/user/42`.

use crate::error::{Result, RouterError};
use smallvec::SmallVec;
use url::Url;

/// A parsed navigation request URL
#[derive(Debug, Clone)]
pub struct NavigationUrl {
    /// The input string, untouched
    pub raw: String,
    /// Path used for route matching
    pub path: String,
    /// Query and fragment pairs, in source order
    pub params: SmallVec<[(String, String); 8]>,
}

impl NavigationUrl {
    /// Parse a navigation URL
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RouterError::InvalidUrl(input.to_string()));
        }

        match Url::parse(trimmed) {
            Ok(parsed) => {
                let mut path = String::new();
                if let Some(host) = parsed.host_str() {
                    // app://user/42 - "user" sits in the authority position
                    path.push('/');
                    path.push_str(host);
                }
                path.push_str(parsed.path());

                let mut params = SmallVec::new();
                if let Some(query) = parsed.query() {
                    fold_query_pairs(query, &mut params);
                }
                fold_fragment_pairs(parsed.fragment(), &mut params);

                Ok(Self {
                    raw: input.to_string(),
                    path,
                    params,
                })
            }
            Err(_) if !trimmed.contains("://") => Self::parse_bare(input, trimmed),
            Err(_) => Err(RouterError::InvalidUrl(input.to_string())),
        }
    }

    /// Schemeless input: split path / query / fragment by hand
    fn parse_bare(input: &str, trimmed: &str) -> Result<Self> {
        let (rest, fragment) = match trimmed.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (trimmed, None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };
        if path.is_empty() {
            return Err(RouterError::InvalidUrl(input.to_string()));
        }

        let mut params = SmallVec::new();
        if let Some(query) = query {
            fold_query_pairs(query, &mut params);
        }
        fold_fragment_pairs(fragment, &mut params);

        Ok(Self {
            raw: input.to_string(),
            path: path.to_string(),
            params,
        })
    }
}

fn fold_query_pairs(query: &str, params: &mut SmallVec<[(String, String); 8]>) {
    for (k, v) in url::form_urlencoded::parse(query.as_bytes()) {
        if !k.is_empty() {
            params.push((k.into_owned(), v.into_owned()));
        }
    }
}

/// Fragment pairs count only when formatted as `key=value` joined by `&`;
/// anything else is skipped without error.
fn fold_fragment_pairs(fragment: Option<&str>, params: &mut SmallVec<[(String, String); 8]>) {
    let Some(fragment) = fragment else { return };
    for pair in fragment.split('&') {
        match pair.split_once('=') {
            Some((k, v)) if !k.is_empty() => {
                params.push((k.to_string(), v.to_string()));
            }
            _ => {}
        }
    }
}
