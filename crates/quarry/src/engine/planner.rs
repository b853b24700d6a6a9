mod delete;
mod insert;
mod update;

use quarry_core::{
    convert::Registry,
    schema::{Element, Entity},
    stmt::{self, Entry, Value},
    Error, Result, Schema,
};
use quarry_sql::{stmt as sql, Serializer};

/// Identifies one row planned for insertion within a [`Plan`].
pub(crate) type RowId = usize;

/// Flat statements for one logical write, in execution order.
#[derive(Debug)]
pub(crate) struct Plan {
    /// Entity the write was issued against
    pub(crate) entity: String,

    pub(crate) steps: Vec<Step>,

    /// Rows planned for the payload's top-level entries, in payload order
    pub(crate) roots: Vec<RowId>,
}

#[derive(Debug)]
pub(crate) enum Step {
    /// Rows sharing a table and column list, bound in chunks
    Insert(InsertStep),

    /// A single statement with its argument slots already filled
    Sql(SqlStep),

    /// Diff the composition children of every parent row matching a filter
    /// against a new list of children. Needs a read, so the statements for
    /// the children are planned while executing.
    Children(ChildrenStep),
}

#[derive(Debug)]
pub(crate) struct InsertStep {
    pub(crate) entity: String,

    /// Single-row template whose argument slots are the row's cells
    pub(crate) insert: sql::Insert,

    pub(crate) rows: Vec<PlannedRow>,

    /// Delete rows with the same key before inserting. Set for upserts on a
    /// backend without a native form.
    pub(crate) replace: bool,
}

#[derive(Debug)]
pub(crate) struct PlannedRow {
    pub(crate) id: RowId,

    /// One cell per column of the step's template
    pub(crate) cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cell {
    /// Storage value known while planning
    Value(Value),

    /// Column of a row inserted by an earlier step, known once that step ran
    KeyOf { row: RowId, column: String },
}

#[derive(Debug)]
pub(crate) struct SqlStep {
    pub(crate) stmt: sql::Statement,

    /// Storage values for the statement's argument slots
    pub(crate) args: Vec<Value>,

    /// Affected rows count toward the operation's result
    pub(crate) counts: bool,
}

#[derive(Debug)]
pub(crate) struct ChildrenStep {
    /// Parent entity
    pub(crate) entity: String,

    /// Parent rows, qualified by the parent's table name
    pub(crate) filter: Option<sql::Expr>,

    /// Composition element on the parent
    pub(crate) element: String,

    pub(crate) children: Vec<Entry>,

    /// Matched parent rows count toward the operation's result
    pub(crate) counts: bool,
}

/// Turns one write statement into ordered flat statements.
///
/// Payload problems (unknown columns in strict mode, values that do not
/// convert) are collected while walking the whole payload and reported
/// together before any step is returned.
#[derive(Debug)]
pub(crate) struct Planner<'a> {
    pub(crate) schema: &'a Schema,

    registry: &'a Registry,

    serializer: Serializer<'static>,

    strict: bool,

    errors: Vec<Error>,

    next_row: RowId,
}

impl Step {
    /// Keeps the step from counting toward the operation's affected rows.
    fn uncount(&mut self) {
        match self {
            Step::Sql(step) => step.counts = false,
            Step::Children(step) => step.counts = false,
            Step::Insert(_) => {}
        }
    }
}

impl<'a> Planner<'a> {
    /// `serializer` decides which dialect features the plan may rely on,
    /// such as native upsert.
    pub(crate) fn new(
        schema: &'a Schema,
        registry: &'a Registry,
        serializer: Serializer<'static>,
        strict: bool,
    ) -> Planner<'a> {
        Planner {
            schema,
            registry,
            serializer,
            strict,
            errors: vec![],
            next_row: 0,
        }
    }

    /// Numbers planned rows from `row` on, so a plan built while another
    /// runs never reuses its row ids.
    pub(crate) fn starting_at(mut self, row: RowId) -> Planner<'a> {
        self.next_row = row;
        self
    }

    pub(crate) fn plan(&mut self, stmt: &stmt::Statement) -> Result<Plan> {
        match stmt {
            stmt::Statement::Insert(insert) => self.plan_insert(insert, false),
            stmt::Statement::Upsert(insert) => self.plan_insert(insert, true),
            stmt::Statement::Update(update) => self.plan_update(update),
            stmt::Statement::Delete(delete) => self.plan_delete(delete),
            stmt::Statement::Select(_) => Err(Error::unsupported_construct(
                "a select is not a write",
            )),
        }
    }

    /// Fails with everything collected so far.
    fn finish(&mut self) -> Result<()> {
        if self.errors.is_empty() {
            return Ok(());
        }

        let errors = std::mem::take(&mut self.errors);
        tracing::debug!(errors = errors.len(), "write payload rejected");
        Err(Error::multiple(errors))
    }

    /// A payload field names no element of `entity`.
    fn unknown(&mut self, entity: &Entity, name: &str) {
        if self.strict {
            self.errors.push(Error::unknown_column(&entity.name, name));
        } else {
            tracing::trace!(entity = %entity.name, field = name, "dropping unknown payload field");
        }
    }

    /// Converts a payload value to its storage form, collecting a failure
    /// instead of returning it.
    fn storage(&mut self, entity: &Entity, element: &Element, value: &Value) -> Option<Value> {
        let ty = element.builtin()?;

        match self.registry.to_storage(value.clone(), ty) {
            Ok(value) => Some(value),
            Err(err) => {
                let name = &element.name;
                self.errors
                    .push(err.context(quarry_core::err!("element `{}.{name}`", entity.name)));
                None
            }
        }
    }

    /// Walks a payload for strict mode, through nested compositions.
    fn check_entry(&mut self, entity: &'a Entity, entry: &Entry) {
        for (name, value) in entry.iter() {
            let Some(element) = entity.element(name) else {
                self.unknown(entity, name);
                continue;
            };

            let Some(association) = element.association().filter(|a| a.composition) else {
                continue;
            };

            let Ok(target) = self.schema.target_of(association) else {
                continue;
            };

            match value {
                stmt::EntryValue::One(child) => self.check_entry(target, child),
                stmt::EntryValue::Many(children) => {
                    for child in children {
                        self.check_entry(target, child);
                    }
                }
                stmt::EntryValue::Value(_) => {}
            }
        }
    }
}

/// Elements accepted in a payload but never written.
fn is_dropped(element: &Element) -> bool {
    element.persistence_skip() || element.is_virtual || element.calculated().is_some()
}

/// Unqualified columns as one operand.
fn column_tuple<'b>(columns: impl IntoIterator<Item = &'b String>) -> sql::Expr {
    let mut columns: Vec<_> = columns.into_iter().map(sql::Expr::bare_column).collect();

    if columns.len() == 1 {
        columns.remove(0)
    } else {
        sql::Expr::Tuple(columns)
    }
}

#[cfg(test)]
mod tests;
