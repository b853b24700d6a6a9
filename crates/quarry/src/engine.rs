mod cache;
use cache::PlanCache;

mod decode;
mod exec;
mod graph;

mod planner;
use planner::Planner;

mod resolve;
mod rewrite;

use crate::{Config, Context, Result};

use arc_swap::ArcSwap;
use quarry_core::{
    convert::Registry,
    driver::{Capability, Connection},
    stmt::{self, ValueRecord, ValueStream},
    Dialect, Schema,
};
use quarry_sql::Compiled;
use std::sync::Arc;

/// Result of executing a statement.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Outcome {
    /// Rows written, or rows returned by a select
    pub affected_rows: u64,

    /// Key of every top-level row of an insert, in payload order, including
    /// keys generated while planning or by the backend
    pub keys: Vec<ValueRecord>,

    /// Decoded rows of a select
    pub rows: Vec<ValueRecord>,
}

/// Compiles and runs statements. Cheap to clone; clones share the model and
/// the plan cache.
#[derive(Debug, Clone)]
pub(crate) struct Engine {
    /// Current model, replaced as a whole on reload
    model: Arc<ArcSwap<Schema>>,

    cache: Arc<PlanCache>,

    pub(crate) config: Arc<Config>,

    pub(crate) registry: Arc<Registry>,

    pub(crate) capability: &'static Capability,
}

impl Engine {
    pub(crate) fn new(
        schema: Schema,
        config: Config,
        dialect: Dialect,
        capability: &'static Capability,
    ) -> Result<Engine> {
        let registry = Registry::new(dialect).with_timestamp_precision(config.timestamp_precision)?;

        let schema = Arc::new(schema);

        Ok(Engine {
            model: Arc::new(ArcSwap::new(schema.clone())),
            cache: Arc::new(PlanCache::new(config.plan_cache, schema)),
            config: Arc::new(config),
            registry: Arc::new(registry),
            capability,
        })
    }

    pub(crate) fn dialect(&self) -> Dialect {
        self.registry.dialect()
    }

    /// Snapshot of the model. Statements compiled against it stay consistent
    /// even if the model is reloaded meanwhile.
    pub(crate) fn schema(&self) -> Arc<Schema> {
        self.model.load_full()
    }

    /// Replaces the model and drops every compiled plan.
    pub(crate) fn reload(&self, schema: Schema) {
        let schema = Arc::new(schema);
        self.model.store(schema.clone());
        self.cache.reset(schema);
        tracing::info!("model reloaded");
    }

    /// Runs one logical operation on `connection`.
    ///
    /// A select returns its rows fully read. Writes are planned before any
    /// SQL is sent and run inside one transaction (a savepoint when the
    /// connection already has one open), rolled back on the first failure.
    pub(crate) async fn exec(
        &self,
        connection: &mut dyn Connection,
        cx: &Context,
        stmt: stmt::Statement,
    ) -> Result<Outcome> {
        let schema = self.schema();

        let stmt = match stmt {
            stmt::Statement::Select(select) => {
                let rows = self.query(connection, cx, &schema, select).await?.collect_records().await?;

                return Ok(Outcome {
                    affected_rows: rows.len() as u64,
                    rows,
                    ..Outcome::default()
                });
            }
            stmt => stmt,
        };

        let plan = Planner::new(&schema, &self.registry, self.serializer(), self.config.strict).plan(&stmt)?;
        self.exec_plan(connection, &schema, plan).await
    }

    /// Compiles a select to the SQL text sent for it.
    pub(crate) fn to_sql(&self, cx: &Context, select: &stmt::Select) -> Result<Compiled> {
        let locale = cx.effective_locale(self.config.default_locale.as_deref());
        let compiled = cache::compile(&self.schema(), self.dialect(), locale.is_some(), select)?;

        Ok(compiled.compiled)
    }

    /// Reads a select as a lazy stream of decoded records.
    pub(crate) async fn query(
        &self,
        connection: &mut dyn Connection,
        cx: &Context,
        schema: &Schema,
        select: stmt::Select,
    ) -> Result<ValueStream> {
        self.exec_select(connection, cx, schema, select).await
    }
}
