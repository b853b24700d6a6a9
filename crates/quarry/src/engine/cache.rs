use super::{decode::Shape, rewrite::Rewriter};

use arc_swap::ArcSwap;
use quarry_core::{
    schema::BuiltinType,
    stmt::{self, visit_mut, Expr, Value, VisitMut},
    Dialect, Result, Schema,
};
use quarry_sql::{Compiled, Serializer};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::OnceCell;

/// A select compiled down to dialect SQL, independent of the literal values
/// it was first built with.
#[derive(Debug)]
pub(crate) struct CompiledSelect {
    pub(crate) compiled: Compiled,

    /// Type of each argument slot, inferred from what it was compared with
    pub(crate) arg_types: Vec<Option<BuiltinType>>,

    pub(crate) shape: Shape,
}

type Entry = Arc<OnceCell<Arc<CompiledSelect>>>;

/// Compiled selects keyed by their normalized shape. Readers load a snapshot
/// of the map and never block; a miss inserts an empty cell that the first
/// caller fills while later callers for the same key wait on it.
#[derive(Debug)]
pub(crate) struct PlanCache {
    enabled: bool,
    plans: ArcSwap<Plans>,
}

/// Entries compiled against one model. A reload swaps in a fresh `Plans`, so
/// a compile still running against the old model fills a cell nobody can
/// reach anymore.
#[derive(Debug)]
struct Plans {
    schema: Arc<Schema>,
    entries: HashMap<String, Entry>,
}

impl Plans {
    fn empty(schema: Arc<Schema>) -> Arc<Plans> {
        Arc::new(Plans {
            schema,
            entries: HashMap::new(),
        })
    }

    /// `self.schema` keeps its allocation alive, so address equality is
    /// identity.
    fn is_for(&self, schema: &Schema) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.schema), schema)
    }
}

/// A statement with its literals lifted out.
#[derive(Debug)]
pub(crate) struct Normalized {
    pub(crate) select: stmt::Select,

    /// Values for the argument slots, in slot order
    pub(crate) args: Vec<Value>,
}

impl PlanCache {
    pub(crate) fn new(enabled: bool, schema: Arc<Schema>) -> PlanCache {
        PlanCache {
            enabled,
            plans: ArcSwap::new(Plans::empty(schema)),
        }
    }

    /// Returns the compiled form of `normalized`, compiling on a miss.
    pub(crate) async fn get_or_compile(
        &self,
        schema: &Schema,
        dialect: Dialect,
        locale: bool,
        normalized: &Normalized,
    ) -> Result<Arc<CompiledSelect>> {
        // Search terms are not lifted; caching them would grow without bound
        if !self.enabled || !normalized.select.search.is_empty() {
            return compile(schema, dialect, locale, &normalized.select).map(Arc::new);
        }

        let key = format!("{dialect:?}|{locale}|{:?}", normalized.select);

        let cached = {
            let plans = self.plans.load();
            match plans.entries.get(&key) {
                Some(cell) if plans.is_for(schema) => {
                    tracing::debug!(key_len = key.len(), "plan cache hit");
                    Some(cell.clone())
                }
                _ => None,
            }
        };

        let Some(cell) = cached.or_else(|| self.insert(schema, &key)) else {
            tracing::debug!("model reloaded while the statement was in flight; compiling uncached");
            return compile(schema, dialect, locale, &normalized.select).map(Arc::new);
        };

        let compiled = cell
            .get_or_try_init(|| async {
                tracing::debug!(key_len = key.len(), "plan cache miss; compiling");
                compile(schema, dialect, locale, &normalized.select).map(Arc::new)
            })
            .await?;

        Ok(compiled.clone())
    }

    /// Drops every entry and accepts new ones only for `schema`. Called when
    /// the model is reloaded.
    pub(crate) fn reset(&self, schema: Arc<Schema>) {
        let dropped = self.plans.swap(Plans::empty(schema)).entries.len();
        tracing::debug!(dropped, "plan cache invalidated");
    }

    pub(crate) fn len(&self) -> usize {
        self.plans.load().entries.len()
    }

    /// Adds an empty cell for `key`, or returns `None` if the cache already
    /// belongs to a newer model than `schema`.
    fn insert(&self, schema: &Schema, key: &str) -> Option<Entry> {
        let mut inserted = None;

        self.plans.rcu(|plans| {
            if !plans.is_for(schema) {
                inserted = None;
                return Arc::clone(plans);
            }

            let mut entries = plans.entries.clone();
            let cell = entries
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone();
            inserted = Some(cell);

            Arc::new(Plans {
                schema: plans.schema.clone(),
                entries,
            })
        });

        inserted
    }
}

/// Resolves, rewrites and serializes a select.
pub(crate) fn compile(schema: &Schema, dialect: Dialect, locale: bool, select: &stmt::Select) -> Result<CompiledSelect> {
    let rewritten = Rewriter::new(schema, locale).rewrite(select)?;
    let compiled = Serializer::for_dialect(dialect).serialize(&rewritten.select.into());

    Ok(CompiledSelect {
        compiled,
        arg_types: rewritten.arg_types,
        shape: rewritten.shape,
    })
}

/// Lifts every non-null literal of `select` into an argument slot, so two
/// selects that differ only in their values share a cache key.
pub(crate) fn normalize(mut select: stmt::Select) -> Normalized {
    let mut lift = Lift { args: vec![] };
    lift.visit_select_mut(&mut select);

    Normalized {
        select,
        args: lift.args,
    }
}

struct Lift {
    args: Vec<Value>,
}

impl VisitMut for Lift {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        match expr {
            // `= null` compiles to `is null`, so null stays in the shape
            Expr::Value(Value::Null) => {}
            Expr::Value(Value::List(items)) => {
                let items = std::mem::take(items);
                *expr = Expr::List(items.into_iter().map(Expr::Value).collect());
                visit_mut::visit_expr_mut(self, expr);
            }
            Expr::Value(value) => {
                let value = std::mem::replace(value, Value::Null);
                *expr = Expr::Arg(self.args.len());
                self.args.push(value);
            }
            _ => visit_mut::visit_expr_mut(self, expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quarry_core::schema::ElementDef;

    fn schema() -> Arc<Schema> {
        let schema = Schema::builder()
            .entity("Books", |e| {
                e.key(ElementDef::new("ID", BuiltinType::Int32))
                    .element(ElementDef::new("title", BuiltinType::string()))
            })
            .build()
            .unwrap();
        Arc::new(schema)
    }

    fn by_title(title: &str) -> stmt::Select {
        stmt::Select::from("Books")
            .columns(["ID"])
            .filter(Expr::eq(stmt::Path::from("title"), title))
            .limit(10)
    }

    #[test]
    fn literals_become_arguments() {
        let normalized = normalize(by_title("Emma"));

        assert_eq!(normalized.args, [Value::from("Emma"), Value::I64(10)]);
        assert_eq!(
            normalized.select.filter,
            Some(Expr::eq(stmt::Path::from("title"), Expr::arg(0)))
        );
    }

    #[test]
    fn null_stays_literal() {
        let select = stmt::Select::from("Books").filter(Expr::eq(stmt::Path::from("title"), Expr::null()));
        let normalized = normalize(select);

        assert!(normalized.args.is_empty());
    }

    #[test]
    fn value_list_lifts_each_item() {
        let select = stmt::Select::from("Books").filter(Expr::in_list(
            stmt::Path::from("ID"),
            Value::List(vec![Value::I32(1), Value::I32(2)]),
        ));
        let normalized = normalize(select);

        assert_eq!(normalized.args, [Value::I32(1), Value::I32(2)]);
    }

    #[tokio::test]
    async fn different_values_share_one_plan() {
        let schema = schema();
        let cache = PlanCache::new(true, schema.clone());

        let first = cache
            .get_or_compile(&schema, Dialect::Sqlite, false, &normalize(by_title("Emma")))
            .await
            .unwrap();
        let second = cache
            .get_or_compile(&schema, Dialect::Sqlite, false, &normalize(by_title("Persuasion")))
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(first.arg_types[0], Some(BuiltinType::string()));
        assert_eq!(first.arg_types[1], Some(BuiltinType::Int64));
    }

    #[tokio::test]
    async fn locale_and_dialect_are_part_of_the_key() {
        let schema = schema();
        let cache = PlanCache::new(true, schema.clone());
        let normalized = normalize(by_title("Emma"));

        cache.get_or_compile(&schema, Dialect::Sqlite, false, &normalized).await.unwrap();
        cache.get_or_compile(&schema, Dialect::Sqlite, true, &normalized).await.unwrap();
        cache.get_or_compile(&schema, Dialect::Postgresql, false, &normalized).await.unwrap();

        assert_eq!(cache.len(), 3);

        cache.reset(self::schema());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn failed_compile_is_not_cached() {
        let schema = schema();
        let cache = PlanCache::new(true, schema.clone());
        let normalized = normalize(stmt::Select::from("Books").columns(["nope"]));

        let err = cache
            .get_or_compile(&schema, Dialect::Sqlite, false, &normalized)
            .await
            .unwrap_err();
        assert!(err.is_unknown_reference());

        let cell = cache.plans.load().entries.values().next().cloned().unwrap();
        assert!(cell.get().is_none());
    }

    #[tokio::test]
    async fn compile_against_replaced_model_is_not_cached() {
        let old = schema();
        let cache = PlanCache::new(true, old.clone());

        // A statement that took its model snapshot before the reload
        let reloaded = schema();
        cache.reset(reloaded.clone());

        let stale = cache
            .get_or_compile(&old, Dialect::Sqlite, false, &normalize(by_title("Emma")))
            .await
            .unwrap();
        assert_eq!(cache.len(), 0);

        let fresh = cache
            .get_or_compile(&reloaded, Dialect::Sqlite, false, &normalize(by_title("Emma")))
            .await
            .unwrap();
        assert_eq!(cache.len(), 1);
        assert!(!Arc::ptr_eq(&stale, &fresh));

        let again = cache
            .get_or_compile(&reloaded, Dialect::Sqlite, false, &normalize(by_title("Persuasion")))
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&fresh, &again));
    }

    #[tokio::test]
    async fn disabled_cache_stores_nothing() {
        let schema = schema();
        let cache = PlanCache::new(false, schema.clone());

        cache
            .get_or_compile(&schema, Dialect::Sqlite, false, &normalize(by_title("Emma")))
            .await
            .unwrap();

        assert_eq!(cache.len(), 0);
    }
}
