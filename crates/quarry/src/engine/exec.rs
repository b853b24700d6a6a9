mod children;
mod insert;
mod select;

use super::{
    planner::{Plan, RowId, SqlStep, Step},
    Engine, Outcome,
};
use crate::Result;

use quarry_core::{
    driver::{operation::QuerySql, operation::Transaction, Connection},
    schema::BuiltinType,
    stmt::{Value, ValueRecord},
    Error, Schema,
};
use quarry_sql::{Bind, Compiled, Serializer};
use std::{collections::HashMap, future::Future, pin::Pin};

/// State of one write while its plan runs.
struct Exec<'a> {
    engine: &'a Engine,

    schema: &'a Schema,

    connection: &'a mut dyn Connection,

    /// Storage values of every row inserted so far, by planned row
    rows: HashMap<RowId, ValueRecord>,

    affected: u64,
}

/// Where `Bind::Arg` slots take their values from.
#[derive(Debug, Clone, Copy)]
enum Args<'b> {
    /// Already in storage form
    Storage(&'b [Value]),

    /// Application values, converted with the type inferred for each slot
    Typed {
        values: &'b [Value],
        types: &'b [Option<BuiltinType>],
    },
}

impl Engine {
    /// Runs a planned write in its own transaction, or in a savepoint when
    /// `connection` already has one open.
    pub(super) async fn exec_plan(
        &self,
        connection: &mut dyn Connection,
        schema: &Schema,
        plan: Plan,
    ) -> Result<Outcome> {
        connection.exec(Transaction::Start.into()).await?;

        let mut exec = Exec {
            engine: self,
            schema,
            connection,
            rows: HashMap::new(),
            affected: 0,
        };

        let outcome = match exec.exec_steps(&plan.steps).await {
            Ok(()) => exec.outcome(&plan),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(outcome) => {
                exec.connection.exec(Transaction::Commit.into()).await?;

                tracing::debug!(
                    entity = %plan.entity,
                    affected = outcome.affected_rows,
                    "write committed"
                );

                Ok(outcome)
            }
            Err(err) => {
                if let Err(rollback) = exec.connection.exec(Transaction::Rollback.into()).await {
                    tracing::warn!(error = %rollback, "rollback failed");
                }

                Err(err)
            }
        }
    }

    /// Parameter values for the placeholders of `binds`, in storage form.
    fn bind(&self, binds: &[Bind], args: Args<'_>, locale: Option<&str>) -> Result<Vec<Value>> {
        binds
            .iter()
            .map(|bind| match bind {
                Bind::Value(typed) => match &typed.ty {
                    Some(ty) => self.registry.to_storage(typed.value.clone(), ty),
                    None => self.untyped(typed.value.clone()),
                },
                Bind::Arg(arg) => args.get(self, arg.index),
                Bind::Locale => Ok(locale.map_or(Value::Null, Value::from)),
            })
            .collect()
    }

    /// Storage form of a value whose column type is unknown, chosen from the
    /// value itself.
    fn untyped(&self, value: Value) -> Result<Value> {
        let ty = match &value {
            Value::Bool(_) => BuiltinType::Boolean,
            Value::Uuid(_) => BuiltinType::Uuid,
            Value::Date(_) => BuiltinType::Date,
            Value::Time(_) => BuiltinType::Time,
            Value::Timestamp(_) => BuiltinType::timestamp(),
            Value::Stream(_) => BuiltinType::LargeBinary,
            _ => return Ok(value),
        };

        self.registry.to_storage(value, &ty)
    }

    pub(crate) fn serializer(&self) -> Serializer<'static> {
        Serializer::for_dialect(self.dialect())
    }
}

impl Args<'_> {
    fn get(self, engine: &Engine, index: usize) -> Result<Value> {
        let value = match self {
            Args::Storage(values) => values.get(index),
            Args::Typed { values, .. } => values.get(index),
        };

        let Some(value) = value.cloned() else {
            return Err(quarry_core::err!("no value for argument slot {index}"));
        };

        match self {
            Args::Storage(_) => Ok(value),
            Args::Typed { types, .. } => match types.get(index).and_then(Option::as_ref) {
                Some(ty) => engine.registry.to_storage(value, ty),
                None => engine.untyped(value),
            },
        }
    }
}

impl<'a> Exec<'a> {
    fn exec_steps<'b>(&'b mut self, steps: &'b [Step]) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'b>> {
        Box::pin(async move {
            for step in steps {
                match step {
                    Step::Insert(step) => self.exec_insert(step).await?,
                    Step::Sql(step) => self.exec_sql(step).await?,
                    Step::Children(step) => self.exec_children(step).await?,
                }
            }

            Ok(())
        })
    }

    async fn exec_sql(&mut self, step: &SqlStep) -> Result<()> {
        let compiled = self.engine.serializer().serialize(&step.stmt);
        let count = self.run(compiled, Args::Storage(&step.args)).await?;

        if step.counts {
            self.affected += count;
        }

        Ok(())
    }

    /// Sends a statement that returns no rows and reads its affected count.
    async fn run(&mut self, compiled: Compiled, args: Args<'_>) -> Result<u64> {
        let params = self.engine.bind(&compiled.binds, args, None)?;

        tracing::debug!(sql = %compiled.sql, params = params.len(), "executing write");

        let response = self
            .connection
            .exec(QuerySql::new(compiled.sql, params, false).into())
            .await?;

        response.rows.into_count().await
    }

    /// Sends a query and reads its rows as storage records named by
    /// `columns`, in select item order.
    async fn read(&mut self, compiled: Compiled, args: &[Value], columns: &[String]) -> Result<Vec<ValueRecord>> {
        let params = self.engine.bind(&compiled.binds, Args::Storage(args), None)?;

        tracing::debug!(sql = %compiled.sql, params = params.len(), "executing read");

        let response = self
            .connection
            .exec(QuerySql::new(compiled.sql, params, true).into())
            .await?;

        response
            .rows
            .into_values()?
            .collect()
            .await?
            .into_iter()
            .map(|row| row_record(row, columns))
            .collect()
    }

    fn outcome(&self, plan: &Plan) -> Result<Outcome> {
        let mut outcome = Outcome {
            affected_rows: self.affected + plan.roots.len() as u64,
            ..Outcome::default()
        };

        if plan.roots.is_empty() {
            return Ok(outcome);
        }

        let entity = self.schema.entity(&plan.entity)?;

        for root in &plan.roots {
            let Some(row) = self.rows.get(root) else {
                return Err(quarry_core::err!("row {root} of `{}` was not written", entity.name));
            };

            let mut key = ValueRecord::with_capacity(entity.keys.len());
            for element in entity.key_elements() {
                let value = row.get(&element.name).cloned().unwrap_or_default();
                let value = match element.builtin() {
                    Some(ty) => self.engine.registry.from_storage(value, ty)?,
                    None => value,
                };
                key.insert(&element.name, value);
            }

            outcome.keys.push(key);
        }

        Ok(outcome)
    }
}

/// Names the items of one returned row.
fn row_record(row: Value, columns: &[String]) -> Result<ValueRecord> {
    let Value::List(items) = row else {
        return Err(Error::invalid_type(format!("{row:?}"), "a row of column values"));
    };

    if items.len() != columns.len() {
        return Err(quarry_core::err!(
            "expected {} columns in a returned row, got {}",
            columns.len(),
            items.len()
        ));
    }

    Ok(columns.iter().cloned().zip(items).collect())
}
