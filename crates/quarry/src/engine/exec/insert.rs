use super::{Args, Exec};
use crate::engine::planner::{Cell, InsertStep};
use crate::Result;

use quarry_core::{
    driver::operation::QuerySql,
    stmt::{Value, ValueRecord},
    Error,
};
use quarry_sql::stmt as sql;

impl Exec<'_> {
    pub(super) async fn exec_insert(&mut self, step: &InsertStep) -> Result<()> {
        let columns = step.insert.columns.len();
        let returning = !step.insert.returning.is_empty();

        if returning && !self.engine.capability.returning {
            return Err(Error::unsupported_construct(format!(
                "reading generated columns of `{}` back on {}",
                step.entity,
                self.engine.dialect()
            )));
        }

        // Generated columns come back in no guaranteed row order, so rows
        // that return them are sent one at a time
        let chunk_size = if returning {
            1
        } else {
            (self.engine.capability.max_params / columns.max(1)).max(1)
        };

        for chunk in step.rows.chunks(chunk_size) {
            let mut params = Vec::with_capacity(chunk.len() * columns);
            let mut records = Vec::with_capacity(chunk.len());

            for row in chunk {
                let mut record = ValueRecord::with_capacity(columns);

                for (column, cell) in step.insert.columns.iter().zip(&row.cells) {
                    let value = self.resolve(cell)?;
                    params.push(value.clone());
                    record.insert(column, value);
                }

                records.push(record);
            }

            if step.replace {
                for record in &records {
                    self.delete_existing(step, record).await?;
                }
            }

            let compiled = self.engine.serializer().serialize_batch(&step.insert, chunk.len());
            let params = self.engine.bind(&compiled.binds, Args::Storage(&params), None)?;

            tracing::debug!(
                sql = %compiled.sql,
                rows = chunk.len(),
                params = params.len(),
                "executing insert"
            );

            let response = self
                .connection
                .exec(QuerySql::new(compiled.sql, params, returning).into())
                .await?;

            if returning {
                let rows = response.rows.into_values()?.collect().await?;

                for (record, row) in records.iter_mut().zip(rows) {
                    let generated = super::row_record(row, &step.insert.returning)?;
                    for (column, value) in generated {
                        record.insert(column, value);
                    }
                }
            } else {
                response.rows.into_count().await?;
            }

            for (row, record) in chunk.iter().zip(records) {
                self.rows.insert(row.id, record);
            }
        }

        Ok(())
    }

    /// Value of a cell, reading columns of rows inserted by earlier steps.
    fn resolve(&self, cell: &Cell) -> Result<Value> {
        match cell {
            Cell::Value(value) => Ok(value.clone()),
            Cell::KeyOf { row, column } => self
                .rows
                .get(row)
                .and_then(|record| record.get(column))
                .cloned()
                .ok_or_else(|| quarry_core::err!("column `{column}` of row {row} is not known yet")),
        }
    }

    /// Removes the stored row with the key of `record`, so the insert that
    /// follows replaces it.
    async fn delete_existing(&mut self, step: &InsertStep, record: &ValueRecord) -> Result<()> {
        let entity = self.schema.entity(&step.entity)?;

        let mut args = Vec::with_capacity(entity.keys.len());
        let filter = sql::Expr::and_all(entity.keys.iter().enumerate().map(|(i, key)| {
            args.push(record.get(key).cloned().unwrap_or_default());
            sql::Expr::eq(sql::Expr::bare_column(key), sql::Expr::arg(i))
        }));

        let delete = sql::Delete {
            table: entity.table.clone(),
            filter: Some(filter),
        };

        let compiled = self.engine.serializer().serialize(&delete.into());
        self.run(compiled, Args::Storage(&args)).await?;

        Ok(())
    }
}
