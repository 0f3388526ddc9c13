use crate::queries::QueryId;
use anyhow::{anyhow, bail, Result};
use tracing::{debug, info};

/// Resolves which queries to run based on include/exclude filters
pub fn resolve_queries(
    include: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
) -> Result<Vec<QueryId>> {
    match (include, exclude) {
        (Some(_), Some(_)) => {
            bail!("Cannot name queries and use --exclude at the same time");
        }
        (Some(include_list), None) => {
            let queries = parse_ids(&include_list)?;
            debug!(queries = ?include_list, "Including queries");
            Ok(dedup(queries))
        }
        (None, Some(exclude_list)) => {
            let excluded = parse_ids(&exclude_list)?;
            let queries: Vec<QueryId> = QueryId::CATALOG
                .into_iter()
                .filter(|id| !excluded.contains(id))
                .collect();
            info!(
                excluded = excluded.len(),
                remaining = queries.len(),
                "Excluding queries"
            );
            Ok(queries)
        }
        (None, None) => Ok(QueryId::CATALOG.to_vec()),
    }
}

fn parse_ids(names: &[String]) -> Result<Vec<QueryId>> {
    names
        .iter()
        .map(|name| name.parse::<QueryId>().map_err(|e| anyhow!(e)))
        .collect()
}

fn dedup(ids: Vec<QueryId>) -> Vec<QueryId> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Option<Vec<String>> {
        Some(list.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_default_is_full_catalog() {
        let queries = resolve_queries(None, None).unwrap();
        assert_eq!(queries, QueryId::CATALOG.to_vec());
    }

    #[test]
    fn test_include_keeps_order_and_drops_repeats() {
        let queries = resolve_queries(names(&["q3", "on-time-ranking", "Q3"]), None).unwrap();
        assert_eq!(queries, vec![QueryId::Q3, QueryId::OnTimeRanking]);
    }

    #[test]
    fn test_exclude_removes_from_catalog() {
        let queries = resolve_queries(None, names(&["Q1", "Q10"])).unwrap();
        assert_eq!(queries.len(), 8);
        assert!(!queries.contains(&QueryId::Q1));
        assert!(!queries.contains(&QueryId::Q10));
    }

    #[test]
    fn test_unknown_query_is_an_error() {
        assert!(resolve_queries(names(&["Q42"]), None).is_err());
    }

    #[test]
    fn test_include_and_exclude_conflict() {
        assert!(resolve_queries(names(&["Q1"]), names(&["Q2"])).is_err());
    }
}
