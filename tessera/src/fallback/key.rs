//! Cache keys and cached range results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tessera_core::{ColumnConditions, EntityInfo, FieldValue, Page, Raw, Row, canonicalize};
use tessera_format::{Format, FormatError, FormatExt};

/// Derives the cache key of a single row.
///
/// Only primary key fields present in `values` contribute. They are taken in
/// lexicographic order of their names and encoded as a sequence of
/// single-entry maps, so the key does not depend on map iteration order or on
/// non-key fields.
pub fn cache_key<E>(encoder: &E, entity: &EntityInfo, values: &Row) -> Result<Raw, FormatError>
where
    E: Format + ?Sized,
{
    // key_set iterates in sorted order
    let parts: Vec<BTreeMap<&str, &FieldValue>> = entity
        .def
        .key_set()
        .into_iter()
        .filter_map(|name| values.get(name).map(|value| BTreeMap::from([(name, value)])))
        .collect();
    encoder.encode(&parts)
}

/// Descriptor of a range query, encoded to form its cache key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeQuery<'a> {
    conditions: ColumnConditions,
    token: Option<&'a str>,
    limit: usize,
}

impl<'a> RangeQuery<'a> {
    /// Builds a descriptor; conditions are canonicalized first.
    pub fn new(conditions: &ColumnConditions, token: Option<&'a str>, limit: usize) -> Self {
        Self {
            conditions: canonicalize(conditions),
            token,
            limit,
        }
    }

    /// Encodes the descriptor into a cache key.
    pub fn cache_key<E>(&self, encoder: &E) -> Result<Raw, FormatError>
    where
        E: Format + ?Sized,
    {
        encoder.encode(self)
    }
}

/// Cached outcome of a range query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeResults {
    /// Rows of the page.
    pub rows: Vec<Row>,
    /// Token of the following page, if any.
    pub token_next: Option<String>,
}

impl From<Page> for RangeResults {
    fn from(page: Page) -> Self {
        Self {
            rows: page.rows,
            token_next: page.next_token,
        }
    }
}

impl From<RangeResults> for Page {
    fn from(results: RangeResults) -> Self {
        Page::new(results.rows, results.token_next)
    }
}
