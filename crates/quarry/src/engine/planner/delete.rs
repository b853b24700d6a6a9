use super::{column_tuple, Plan, Planner, SqlStep, Step};
use crate::engine::{graph, rewrite::Rewriter};

use quarry_core::{schema::Entity, stmt, Error, Result};
use quarry_sql::stmt as sql;

impl<'a> Planner<'a> {
    pub(super) fn plan_delete(&mut self, delete: &stmt::Delete) -> Result<Plan> {
        let entity = self.schema.entity(&delete.from)?;

        if entity.persistence_skip() {
            return Err(Error::unsupported_construct(format!(
                "entity `{}` is not persisted",
                entity.name
            )));
        }

        // Nothing is planned for a cyclic composition graph, so nothing runs
        graph::check_acyclic(self.schema, entity)?;

        let mut rewriter = Rewriter::new(self.schema, false);
        let filter = delete
            .filter
            .as_ref()
            .map(|filter| rewriter.write_filter(entity, filter))
            .transpose()?;

        let mut steps = vec![];
        self.delete_children(entity, filter.as_ref(), &mut steps)?;

        steps.push(Step::Sql(SqlStep {
            stmt: sql::Delete {
                table: entity.table.clone(),
                filter,
            }
            .into(),
            args: vec![],
            counts: true,
        }));

        Ok(Plan {
            entity: entity.name.clone(),
            steps,
            roots: vec![],
        })
    }

    /// Deletes the composition children of the `entity` rows matching
    /// `filter`, deepest first. Each level selects its rows through the key
    /// columns of the level above, which is still intact when it runs.
    fn delete_children(&self, entity: &Entity, filter: Option<&sql::Expr>, steps: &mut Vec<Step>) -> Result<()> {
        for (element, association) in entity.compositions() {
            let target = self.schema.target_of(association)?;

            let Some(pairs) = association.key_pairs() else {
                return Err(Error::unsupported_construct(format!(
                    "cascading a delete through `{}.{}`, an association with a custom condition",
                    entity.name, element.name
                )));
            };

            let mut parents = sql::Select::from_table(&entity.table, None);
            for pair in pairs {
                parents.items.push(sql::SelectItem {
                    expr: sql::Expr::column(&entity.table, &pair.source),
                    alias: None,
                });
            }
            parents.filter = filter.cloned();

            let children = sql::Expr::in_subquery(column_tuple(pairs.iter().map(|pair| &pair.target)), parents);

            tracing::trace!(parent = %entity.name, child = %target.name, "cascading delete");

            self.delete_children(target, Some(&children), steps)?;

            steps.push(Step::Sql(SqlStep {
                stmt: sql::Delete {
                    table: target.table.clone(),
                    filter: Some(children),
                }
                .into(),
                args: vec![],
                counts: false,
            }));
        }

        Ok(())
    }
}
