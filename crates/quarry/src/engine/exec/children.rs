use super::Exec;
use crate::engine::planner::{ChildrenStep, Planner};
use crate::Result;

use quarry_core::Error;
use quarry_sql::stmt as sql;

impl Exec<'_> {
    /// Reads the parent rows and their stored children, then plans and runs
    /// the diff for each parent.
    pub(super) async fn exec_children(&mut self, step: &ChildrenStep) -> Result<()> {
        let schema = self.schema;
        let entity = schema.entity(&step.entity)?;
        let association = entity
            .association(&step.element)
            .ok_or_else(|| Error::unknown_column(&entity.name, &step.element))?;
        let target = schema.target_of(association)?;

        let Some(pairs) = association.key_pairs() else {
            return Err(Error::unsupported_construct(format!(
                "writing through `{}.{}`, an association with a custom condition",
                entity.name, step.element
            )));
        };

        let sources: Vec<String> = pairs.iter().map(|pair| pair.source.clone()).collect();

        let mut parents = sql::Select::from_table(&entity.table, None);
        for column in &sources {
            parents = parents.item(sql::Expr::column(&entity.table, column), None);
        }
        parents.filter = step.filter.clone();

        let compiled = self.engine.serializer().serialize(&parents.into());
        let parents = self.read(compiled, &[], &sources).await?;

        if step.counts {
            self.affected += parents.len() as u64;
        }

        for parent in parents {
            let mut children = sql::Select::from_table(&target.table, None);
            for key in &target.keys {
                children = children.item(sql::Expr::column(&target.table, key), None);
            }

            let mut args = Vec::with_capacity(pairs.len());
            children.filter = Some(sql::Expr::and_all(pairs.iter().enumerate().map(|(i, pair)| {
                args.push(parent.get(&pair.source).cloned().unwrap_or_default());
                sql::Expr::eq(sql::Expr::column(&target.table, &pair.target), sql::Expr::arg(i))
            })));

            let compiled = self.engine.serializer().serialize(&children.into());
            let existing = self.read(compiled, &args, &target.keys).await?;

            let next_row = self.rows.keys().max().map_or(0, |max| max + 1);
            let steps = Planner::new(
                schema,
                &self.engine.registry,
                self.engine.serializer(),
                self.engine.config.strict,
            )
                .starting_at(next_row)
                .plan_children(step, &parent, existing)?;

            self.exec_steps(&steps).await?;
        }

        Ok(())
    }
}
