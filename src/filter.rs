//! Caller-supplied table predicate.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Predicate signature: `(schema, table) -> keep`.
pub type FilterFn = dyn Fn(&str, &str) -> bool + Send + Sync;

fn accept_all(_schema: &str, _table: &str) -> bool {
    true
}

/// Decides which tables are visible to the scanner.
///
/// Evaluated once per row per cycle; must be side-effect free.
#[derive(Clone)]
pub struct TableFilter {
    predicate: Arc<FilterFn>,
}

impl TableFilter {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&str, &str) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Keeps every table.
    pub fn accept_all() -> Self {
        Self::new(accept_all)
    }

    /// Drops the listed tables, given as `schema.table`.
    pub fn excluding<I, S>(qualified_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let excluded: HashSet<String> = qualified_names.into_iter().map(Into::into).collect();
        Self::new(move |schema, table| !excluded.contains(&format!("{}.{}", schema, table)))
    }

    pub fn allows(&self, schema: &str, table: &str) -> bool {
        (self.predicate)(schema, table)
    }
}

impl Default for TableFilter {
    fn default() -> Self {
        Self::accept_all()
    }
}

impl fmt::Debug for TableFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableFilter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_accepts_everything() {
        let filter = TableFilter::default();
        assert!(filter.allows("public", "orders"));
        assert!(filter.allows("", ""));
    }

    #[test]
    fn excluding_matches_qualified_names_only() {
        let filter = TableFilter::excluding(["public.ignore_me", "audit.ignore_me_too"]);
        assert!(!filter.allows("public", "ignore_me"));
        assert!(!filter.allows("audit", "ignore_me_too"));
        assert!(filter.allows("audit", "ignore_me"));
        assert!(filter.allows("public", "orders"));
    }

    #[test]
    fn custom_predicate_sees_schema_and_table() {
        let filter = TableFilter::new(|schema, table| schema == "public" && table != "exclude_table");
        assert!(filter.allows("public", "include_table"));
        assert!(!filter.allows("public", "exclude_table"));
        assert!(!filter.allows("sales", "include_table"));
    }
}
