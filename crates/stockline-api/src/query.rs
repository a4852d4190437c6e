// Sparse query-string builder
//
// Filters are mostly optional. Absent values are omitted entirely and
// list-valued filters repeat the key once per element
// (`?productIds=a&productIds=b`).

use std::fmt::Display;

/// Ordered list of query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter unconditionally.
    pub fn push(&mut self, key: &str, value: impl Display) -> &mut Self {
        self.pairs.push((key.to_owned(), value.to_string()));
        self
    }

    /// Append a parameter only when a value is present.
    pub fn push_opt<V: Display>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.push(key, value);
        }
        self
    }

    /// Append one `key=value` pair per element.
    pub fn push_all<V: Display>(&mut self, key: &str, values: &[V]) -> &mut Self {
        for value in values {
            self.push(key, value);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Borrow the pairs in a shape `reqwest::RequestBuilder::query` accepts.
    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}
