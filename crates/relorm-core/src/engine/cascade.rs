//! Save, update and delete with relationship cascades.

use super::{on_path, with_node, Database, Node};
use crate::catalog::Relationship;
use crate::error::{Error, Result};
use crate::query::{delete, insert_bind, update_bind, Aggregate, Where};
use crate::value::Value;
use std::any::Any;
use tracing::debug;

fn push_unique(values: &mut Vec<(String, Value)>, column: String, value: Value) {
    if !values.iter().any(|(c, _)| *c == column) {
        values.push((column, value));
    }
}

fn key_condition(keys: &[(String, Value)]) -> String {
    keys.iter()
        .map(|(column, value)| value.equality(column))
        .collect::<Vec<_>>()
        .join(" AND ")
}

impl Database {
    /// Insert an object, cascading relationships declared with `load`.
    pub fn save<T: Any>(&self, object: &T) -> Result<()> {
        let node = self.node(object)?;
        self.save_node(&node, &[])
    }

    /// Update the row matching an object's key, cascading like [`save`](Self::save).
    ///
    /// A table without primary keys or owners has no key predicate, so
    /// every row is updated.
    pub fn update<T: Any>(&self, object: &T) -> Result<()> {
        let node = self.node(object)?;
        self.update_node(&node, &[])
    }

    /// Update when a row with the object's key exists, insert otherwise.
    ///
    /// Not atomic; wrap in a transaction when that matters.
    pub fn save_or_update<T: Any>(&self, object: &T) -> Result<()> {
        let node = self.node(object)?;
        self.save_or_update_node(&node, &[])
    }

    /// Delete the row matching an object's key, or the rows matching `where_override`.
    ///
    /// Dependent rows are left to storage foreign keys or triggers.
    pub fn delete<T: Any>(&self, object: &T, where_override: Option<&Where>) -> Result<()> {
        let node = self.node(object)?;
        let condition = match where_override.and_then(Where::condition) {
            Some(condition) => condition,
            None => key_condition(&self.key_values(&node, &[])?),
        };
        self.run_bound(&delete(node.table(), &condition), &[])
    }

    /// Delete every row of `T` matching `query`.
    pub fn delete_where<T: Any>(&self, query: &Where) -> Result<()> {
        let schema = self.schema_of::<T>()?;
        let condition = query.condition().unwrap_or_default();
        self.run_bound(&delete(&schema.table_name, &condition), &[])
    }

    fn run_bound(&self, sql: &str, values: &[Value]) -> Result<()> {
        debug!(sql = %sql, params = values.len(), "executing");
        self.executor.execute_bound(sql, values)
    }

    fn save_node<'a>(&self, node: &Node<'a>, lineage: &[Node<'a>]) -> Result<()> {
        let scope = with_node(lineage, node);
        self.cascade(node, &scope, node.schema.ownership_relationships())?;

        let (columns, values): (Vec<String>, Vec<Value>) =
            self.row_values(node, lineage)?.into_iter().unzip();
        let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
        self.run_bound(&insert_bind(node.table(), &columns), &values)?;

        self.cascade(node, &scope, node.schema.dependent_relationships())
    }

    fn update_node<'a>(&self, node: &Node<'a>, lineage: &[Node<'a>]) -> Result<()> {
        let condition = key_condition(&self.key_values(node, lineage)?);
        self.update_where(node, lineage, &condition)
    }

    fn update_where<'a>(&self, node: &Node<'a>, lineage: &[Node<'a>], condition: &str) -> Result<()> {
        let scope = with_node(lineage, node);
        self.cascade(node, &scope, node.schema.ownership_relationships())?;

        let (columns, values): (Vec<String>, Vec<Value>) =
            self.row_values(node, lineage)?.into_iter().unzip();
        let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
        self.run_bound(&update_bind(node.table(), &columns, condition), &values)?;

        self.cascade(node, &scope, node.schema.dependent_relationships())
    }

    fn save_or_update_node<'a>(&self, node: &Node<'a>, lineage: &[Node<'a>]) -> Result<()> {
        let condition = key_condition(&self.key_values(node, lineage)?);
        if condition.is_empty() {
            return self.save_node(node, lineage);
        }
        let existing = self.count_rows(&Aggregate::count(node.table()).with_where(&condition))?;
        if existing == 0 {
            self.save_node(node, lineage)
        } else {
            self.update_where(node, lineage, &condition)
        }
    }

    /// `save_or_update` every related object of the given relationships that
    /// are declared with `load` and lead to a type not yet on the path.
    fn cascade<'a, 'r>(
        &self,
        node: &Node<'a>,
        scope: &[Node<'a>],
        relationships: impl Iterator<Item = &'r Relationship>,
    ) -> Result<()> {
        for relationship in relationships.filter(|r| r.load) {
            let (schema, binding) = self.target(&node.schema, relationship)?;
            if on_path(scope, &schema.table_name) {
                continue;
            }
            for object in node.binding.related(node.object, &relationship.refer)? {
                debug!(
                    from = %node.table(),
                    to = %schema.table_name,
                    refer = %relationship.refer,
                    "cascading"
                );
                let related = Node {
                    schema: schema.clone(),
                    binding: binding.clone(),
                    object,
                };
                self.save_or_update_node(&related, scope)?;
            }
        }
        Ok(())
    }

    /// Declared column values followed by inherited owner keys not declared locally.
    fn row_values<'a>(&self, node: &Node<'a>, lineage: &[Node<'a>]) -> Result<Vec<(String, Value)>> {
        let mut values = Vec::with_capacity(node.schema.columns().len());
        for column in node.schema.columns() {
            values.push((
                column.column_name.clone(),
                node.binding.get(node.object, &column.variable_name)?,
            ));
        }
        let scope = with_node(lineage, node);
        let mut path = vec![node.table().to_string()];
        for relationship in node.schema.ownership_relationships() {
            let owner = self.owner(node, relationship, &scope)?;
            for (column, value) in self.collect_key_values(&owner, &scope, &mut path)? {
                push_unique(&mut values, column, value);
            }
        }
        Ok(values)
    }

    /// Own primary-key values, then owners' key values depth first.
    ///
    /// Column order matches [`SchemaRegistry::transitive_keys`](crate::catalog::SchemaRegistry::transitive_keys).
    fn key_values<'a>(&self, node: &Node<'a>, lineage: &[Node<'a>]) -> Result<Vec<(String, Value)>> {
        self.collect_key_values(node, lineage, &mut Vec::new())
    }

    fn collect_key_values<'a>(
        &self,
        node: &Node<'a>,
        lineage: &[Node<'a>],
        path: &mut Vec<String>,
    ) -> Result<Vec<(String, Value)>> {
        if path.iter().any(|t| t == node.table()) {
            return Err(Error::CyclicOwnership {
                table: node.table().to_string(),
            });
        }
        path.push(node.table().to_string());

        let mut values = Vec::new();
        for column in node.schema.primary_keys() {
            values.push((
                column.column_name.clone(),
                node.binding.get(node.object, &column.variable_name)?,
            ));
        }
        let scope = with_node(lineage, node);
        for relationship in node.schema.ownership_relationships() {
            let owner = self.owner(node, relationship, &scope)?;
            for (column, value) in self.collect_key_values(&owner, &scope, path)? {
                push_unique(&mut values, column, value);
            }
        }

        path.pop();
        Ok(values)
    }

    /// The object an ownership relationship points at: the field's value,
    /// else the nearest object of the target type in `scope`.
    fn owner<'a>(
        &self,
        node: &Node<'a>,
        relationship: &Relationship,
        scope: &[Node<'a>],
    ) -> Result<Node<'a>> {
        let (schema, binding) = self.target(&node.schema, relationship)?;
        if let Some(object) = node
            .binding
            .related(node.object, &relationship.refer)?
            .into_iter()
            .next()
        {
            return Ok(Node {
                schema,
                binding,
                object,
            });
        }
        scope
            .iter()
            .rev()
            .find(|n| n.table() == schema.table_name)
            .cloned()
            .ok_or_else(|| Error::RelationshipNotSet {
                mapped_type: node.schema.mapped_type_name.clone(),
                refer: relationship.refer.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use crate::error::Error;
    use crate::executor::Row;
    use crate::query::Clause;
    use crate::value::Value;

    #[test]
    fn test_save_inherits_owner_keys() {
        let (executor, database) = database(false);
        database.save(&beer()).unwrap();
        assert_eq!(
            executor.bound(),
            vec![(
                "INSERT INTO LIQUOR(ID, NAME, BRAND_ID, COMPANY_ID) VALUES(?, ?, ?, ?)".to_string(),
                vec![
                    Value::Integer(1),
                    Value::Text("Beer".into()),
                    Value::Integer(9),
                    Value::Integer(7)
                ]
            )]
        );
    }

    #[test]
    fn test_save_cascades_owner_first() {
        let (executor, database) = database(true);
        database.save(&beer()).unwrap();
        let statements = executor.statements();
        assert_eq!(
            statements,
            vec![
                "SELECT COUNT(*) FROM BRAND WHERE BRAND_ID = 9 AND COMPANY_ID = 7",
                "INSERT INTO BRAND(BRAND_ID, NAME, COMPANY_ID) VALUES(?, ?, ?)",
                "INSERT INTO LIQUOR(ID, NAME, BRAND_ID, COMPANY_ID) VALUES(?, ?, ?, ?)",
            ]
        );
    }

    #[test]
    fn test_cascade_existing_owner_updates() {
        let (executor, database) = database(true);
        executor.respond(
            "SELECT COUNT(*) FROM BRAND WHERE BRAND_ID = 9 AND COMPANY_ID = 7",
            vec![Row::new().with_column("COUNT(*)", 1)],
        );
        database.save(&beer()).unwrap();
        assert_eq!(
            executor.statements()[1],
            "UPDATE BRAND SET BRAND_ID = ?, NAME = ?, COMPANY_ID = ? \
             WHERE BRAND_ID = 9 AND COMPANY_ID = 7"
        );
    }

    #[test]
    fn test_dependents_take_owner_from_cascade() {
        let (executor, database) = database(false);
        let mut brand = brand();
        brand.liquors = vec![
            Liquor {
                id: 1,
                name: "Beer".into(),
                brand: None,
            },
            Liquor {
                id: 2,
                name: "Ale".into(),
                brand: None,
            },
        ];
        database.save(&brand).unwrap();

        let bound = executor.bound();
        assert_eq!(bound.len(), 3);
        assert!(bound[0].0.starts_with("INSERT INTO BRAND"));
        assert_eq!(
            bound[2].1,
            vec![
                Value::Integer(2),
                Value::Text("Ale".into()),
                Value::Integer(9),
                Value::Integer(7)
            ]
        );
    }

    #[test]
    fn test_missing_owner() {
        let (_, database) = database(false);
        let orphan = Liquor {
            id: 3,
            name: "Gin".into(),
            brand: None,
        };
        let err = database.save(&orphan).unwrap_err();
        assert!(matches!(err, Error::RelationshipNotSet { ref refer, .. } if refer == "brand"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_update_uses_transitive_key() {
        let (executor, database) = database(false);
        database.update(&beer()).unwrap();
        assert_eq!(
            executor.bound()[0].0,
            "UPDATE LIQUOR SET ID = ?, NAME = ?, BRAND_ID = ?, COMPANY_ID = ? \
             WHERE ID = 1 AND BRAND_ID = 9 AND COMPANY_ID = 7"
        );
    }

    #[test]
    fn test_update_without_key_touches_every_row() {
        let (executor, database) = database(false);
        database
            .update(&Log {
                line: "rotated".into(),
            })
            .unwrap();
        assert_eq!(executor.bound()[0].0, "UPDATE LOG SET LINE = ?");
    }

    #[test]
    fn test_save_or_update_without_key_inserts() {
        let (executor, database) = database(false);
        database
            .save_or_update(&Log {
                line: "boot".into(),
            })
            .unwrap();
        assert_eq!(executor.statements(), vec!["INSERT INTO LOG(LINE) VALUES(?)"]);
    }

    #[test]
    fn test_save_or_update_counts_first() {
        let (executor, database) = database(false);
        let company = acme();
        database.save_or_update(&company).unwrap();
        executor.respond(
            "SELECT COUNT(*) FROM COMPANY WHERE COMPANY_ID = 7",
            vec![Row::new().with_column("COUNT(*)", 1)],
        );
        database.save_or_update(&company).unwrap();
        assert_eq!(
            executor.statements(),
            vec![
                "SELECT COUNT(*) FROM COMPANY WHERE COMPANY_ID = 7",
                "INSERT INTO COMPANY(COMPANY_ID, NAME) VALUES(?, ?)",
                "SELECT COUNT(*) FROM COMPANY WHERE COMPANY_ID = 7",
                "UPDATE COMPANY SET COMPANY_ID = ?, NAME = ? WHERE COMPANY_ID = 7",
            ]
        );
    }

    #[test]
    fn test_delete_forms() {
        let (executor, database) = database(false);
        database.delete(&beer(), None).unwrap();
        database
            .delete(&beer(), Some(&Clause::like("NAME", "B%").into()))
            .unwrap();
        database
            .delete_where::<Liquor>(&Clause::eq("BRAND_ID", 9).into())
            .unwrap();
        database.delete_where::<Log>(&Default::default()).unwrap();
        assert_eq!(
            executor.statements(),
            vec![
                "DELETE FROM LIQUOR WHERE ID = 1 AND BRAND_ID = 9 AND COMPANY_ID = 7",
                "DELETE FROM LIQUOR WHERE NAME LIKE 'B%'",
                "DELETE FROM LIQUOR WHERE BRAND_ID = 9",
                "DELETE FROM LOG",
            ]
        );
    }
}
