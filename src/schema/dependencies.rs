use super::tables::{get_table, ALL_TABLES};
use super::types::{OnDelete, TableSchema};
use std::collections::{HashMap, HashSet};

/// One statement of a delete plan: `table` rows matching `predicate`.
///
/// The predicate binds the deleted row's key as `?1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteStep {
    pub table: &'static str,
    pub predicate: String,
}

impl DeleteStep {
    pub fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE {}", self.table, self.predicate)
    }

    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {} WHERE {}", self.table, self.predicate)
    }
}

/// Explicit form of the foreign-key delete rules for one table
#[derive(Debug, Clone)]
pub struct DeletePlan {
    pub table: &'static str,
    /// Rows that block the delete; every count must be zero
    pub restrictions: Vec<DeleteStep>,
    /// Deletes in execution order, children first; the last step removes the row itself
    pub deletes: Vec<DeleteStep>,
}

/// Resolves table dependencies from foreign keys
pub struct DependencyResolver {
    /// Map of table name -> tables it depends on
    deps: HashMap<&'static str, HashSet<&'static str>>,
    /// Map of table name -> tables that reference it, in registry order
    reverse_deps: HashMap<&'static str, Vec<&'static TableSchema>>,
}

impl DependencyResolver {
    pub fn new() -> Self {
        let mut deps: HashMap<&'static str, HashSet<&'static str>> = HashMap::new();
        let mut reverse_deps: HashMap<&'static str, Vec<&'static TableSchema>> = HashMap::new();

        for &table in ALL_TABLES {
            let table_deps = table.dependencies();
            deps.insert(table.name, table_deps.clone());

            for dep in table_deps {
                reverse_deps.entry(dep).or_default().push(table);
            }
        }

        Self { deps, reverse_deps }
    }

    /// All tables in creation order (parents before children)
    pub fn load_order(&self) -> Result<Vec<&'static TableSchema>, String> {
        let included: Vec<&str> = ALL_TABLES.iter().map(|t| t.name).collect();
        self.topological_sort(&included)
    }

    /// Derive restrict checks and ordered cascade deletes for removing one
    /// row of `table`
    pub fn delete_plan(&self, table: &str) -> Result<DeletePlan, String> {
        let schema = get_table(table).ok_or_else(|| format!("Unknown table: {}", table))?;
        let key = schema
            .key_column()
            .ok_or_else(|| format!("Table {} has no single-column key", table))?;

        let mut plan = DeletePlan {
            table: schema.name,
            restrictions: Vec::new(),
            deletes: Vec::new(),
        };
        let root_predicate = format!("{} = ?1", key);
        let mut path = vec![schema.name];
        self.expand(schema, &root_predicate, Some(key), &mut plan, &mut path)?;

        plan.deletes.push(DeleteStep {
            table: schema.name,
            predicate: root_predicate,
        });
        Ok(plan)
    }

    fn expand(
        &self,
        parent: &'static TableSchema,
        parent_predicate: &str,
        root_key: Option<&str>,
        plan: &mut DeletePlan,
        path: &mut Vec<&'static str>,
    ) -> Result<(), String> {
        let Some(children) = self.reverse_deps.get(parent.name) else {
            return Ok(());
        };

        for &child in children {
            for fk in child
                .foreign_keys
                .iter()
                .filter(|fk| fk.references_table == parent.name)
            {
                let predicate = if root_key == Some(fk.references_column) {
                    format!("{} = ?1", fk.column)
                } else {
                    format!(
                        "{} IN (SELECT {} FROM {} WHERE {})",
                        fk.column, fk.references_column, parent.name, parent_predicate
                    )
                };

                match fk.on_delete {
                    OnDelete::Restrict => plan.restrictions.push(DeleteStep {
                        table: child.name,
                        predicate,
                    }),
                    OnDelete::Cascade => {
                        if path.contains(&child.name) {
                            return Err(format!("Circular cascade detected at: {}", child.name));
                        }
                        path.push(child.name);
                        self.expand(child, &predicate, None, plan, path)?;
                        path.pop();
                        plan.deletes.push(DeleteStep {
                            table: child.name,
                            predicate,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Topological sort of tables by dependencies
    fn topological_sort(&self, included: &[&str]) -> Result<Vec<&'static TableSchema>, String> {
        let mut result = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut temp_visited: HashSet<&str> = HashSet::new();

        for &table_name in included {
            if !visited.contains(table_name) {
                self.visit(
                    table_name,
                    included,
                    &mut visited,
                    &mut temp_visited,
                    &mut result,
                )?;
            }
        }

        Ok(result)
    }

    fn visit<'a>(
        &self,
        name: &'a str,
        included: &[&'a str],
        visited: &mut HashSet<&'a str>,
        temp_visited: &mut HashSet<&'a str>,
        result: &mut Vec<&'static TableSchema>,
    ) -> Result<(), String> {
        if temp_visited.contains(name) {
            return Err(format!("Circular dependency detected at: {}", name));
        }
        if visited.contains(name) {
            return Ok(());
        }

        temp_visited.insert(name);

        if let Some(deps) = self.deps.get(name) {
            let mut deps: Vec<&str> = deps.iter().copied().collect();
            deps.sort_unstable();
            for dep in deps {
                if dep != name && included.contains(&dep) {
                    self.visit(dep, included, visited, temp_visited, result)?;
                }
            }
        }

        temp_visited.remove(name);
        visited.insert(name);

        if let Some(table) = get_table(name) {
            result.push(table);
        }

        Ok(())
    }
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables(steps: &[DeleteStep]) -> Vec<&'static str> {
        steps.iter().map(|s| s.table).collect()
    }

    #[test]
    fn test_load_order_puts_parents_first() {
        let resolver = DependencyResolver::new();
        let names: Vec<_> = resolver
            .load_order()
            .unwrap()
            .iter()
            .map(|t| t.name)
            .collect();

        let pos = |n: &str| names.iter().position(|&x| x == n).unwrap();
        assert!(pos("lines") < pos("line_stops"));
        assert!(pos("stops") < pos("line_stops"));
        assert!(pos("lines") < pos("trips"));
        assert!(pos("trips") < pos("stop_events"));
        assert_eq!(names.len(), ALL_TABLES.len());
    }

    #[test]
    fn test_line_delete_is_restricted_by_trips() {
        let plan = DependencyResolver::new().delete_plan("lines").unwrap();

        assert_eq!(tables(&plan.restrictions), vec!["trips"]);
        assert_eq!(plan.restrictions[0].predicate, "line_id = ?1");
        assert_eq!(tables(&plan.deletes), vec!["line_stops", "lines"]);
    }

    #[test]
    fn test_stop_delete_cascades_topology_and_events() {
        let plan = DependencyResolver::new().delete_plan("stops").unwrap();

        assert!(plan.restrictions.is_empty());
        assert_eq!(
            tables(&plan.deletes),
            vec!["line_stops", "stop_events", "stops"]
        );
        assert_eq!(plan.deletes[1].delete_sql(), "DELETE FROM stop_events WHERE stop_id = ?1");
    }

    #[test]
    fn test_trip_delete_cascades_events() {
        let plan = DependencyResolver::new().delete_plan("trips").unwrap();
        assert_eq!(tables(&plan.deletes), vec!["stop_events", "trips"]);
    }

    #[test]
    fn test_composite_key_table_has_no_plan() {
        let resolver = DependencyResolver::new();
        assert!(resolver.delete_plan("line_stops").is_err());
        assert!(resolver.delete_plan("nonexistent").is_err());
    }
}
