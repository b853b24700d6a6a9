use super::{is_dropped, Cell, InsertStep, Plan, PlannedRow, Planner, RowId, SqlStep, Step};
use crate::engine::rewrite::Rewriter;

use indexmap::IndexMap;
use quarry_core::{
    schema::{AssociationOn, AutoStrategy, ElementTy, Entity},
    stmt::{self, Entry, EntryValue, InsertSource, Value},
    Error, Result,
};
use quarry_sql::stmt as sql;
use std::collections::HashSet;

/// A row whose cells are complete, waiting to be batched.
#[derive(Debug)]
struct Draft<'a> {
    id: RowId,
    entity: &'a Entity,
    cells: IndexMap<String, Cell>,

    /// Columns generated by the backend
    returning: Vec<String>,
}

/// An entity instance on the current composition path.
#[derive(Debug)]
struct Ancestor {
    entity: String,

    /// Storage key values, when all of them are known while planning
    key: Option<Vec<Value>>,
}

impl<'a> Planner<'a> {
    pub(super) fn plan_insert(&mut self, insert: &stmt::Insert, upsert: bool) -> Result<Plan> {
        let entity = self.schema.entity(&insert.into)?;

        if entity.persistence_skip() {
            return Err(Error::unsupported_construct(format!(
                "entity `{}` is not persisted",
                entity.name
            )));
        }

        match &insert.source {
            InsertSource::Entries(entries) => {
                self.plan_entries(entity, entries.iter().map(|entry| (entry, IndexMap::new())), upsert)
            }
            InsertSource::Rows { columns, rows } => {
                let entries = rows
                    .iter()
                    .map(|row| row_entry(columns, row))
                    .collect::<Result<Vec<_>>>()?;

                self.plan_entries(entity, entries.iter().map(|entry| (entry, IndexMap::new())), upsert)
            }
            InsertSource::Select(select) => self.plan_insert_select(entity, select, upsert),
        }
    }

    /// Plans one row per entry, each with cells already known for it, plus
    /// the rows of its nested compositions.
    pub(super) fn plan_entries<'e>(
        &mut self,
        entity: &'a Entity,
        entries: impl IntoIterator<Item = (&'e Entry, IndexMap<String, Cell>)>,
        upsert: bool,
    ) -> Result<Plan> {
        let mut drafts = vec![];
        let mut roots = vec![];

        for (entry, inherited) in entries {
            let mut ancestors = vec![];
            roots.push(self.plan_row(entity, entry, inherited, &mut drafts, &mut ancestors)?);
        }

        self.finish()?;

        tracing::trace!(entity = %entity.name, rows = drafts.len(), "planned deep insert");

        Ok(Plan {
            entity: entity.name.clone(),
            steps: self.batch(drafts, upsert)?,
            roots,
        })
    }

    /// Plans `entry` as a row of `entity`. Rows of to-one compositions held
    /// by foreign key are planned first; backlinked children after, each
    /// inheriting the parent's key.
    fn plan_row(
        &mut self,
        entity: &'a Entity,
        entry: &Entry,
        inherited: IndexMap<String, Cell>,
        drafts: &mut Vec<Draft<'a>>,
        ancestors: &mut Vec<Ancestor>,
    ) -> Result<RowId> {
        let id = self.next_row;
        self.next_row += 1;

        let mut cells = inherited;
        let mut children = vec![];

        for (name, value) in entry.iter() {
            let Some(element) = entity.element(name) else {
                self.unknown(entity, name);
                continue;
            };

            if is_dropped(element) {
                tracing::trace!(entity = %entity.name, element = name, "element not persisted");
                continue;
            }

            match &element.ty {
                ElementTy::Primitive(ty) => match value {
                    EntryValue::Value(value) => {
                        if let Some(value) = self.storage(entity, element, value) {
                            self.set_cell(entity, name, &mut cells, Cell::Value(value), drafts);
                        }
                    }
                    _ => self.errors.push(Error::invalid_type(
                        format!("nested data for `{}.{name}`", entity.name),
                        ty.name(),
                    )),
                },
                ElementTy::Association(association) => {
                    let target = self.schema.target_of(association)?;

                    match (value, &association.on) {
                        (EntryValue::Value(Value::Null), AssociationOn::ForeignKey(pairs)) => {
                            for pair in pairs {
                                self.set_cell(entity, &pair.source, &mut cells, Cell::Value(Value::Null), drafts);
                            }
                        }
                        (EntryValue::Value(Value::Null), _) => {}
                        (EntryValue::One(child), AssociationOn::ForeignKey(pairs)) if association.composition => {
                            ancestors.push(Ancestor {
                                entity: entity.name.clone(),
                                key: None,
                            });
                            let child_id = self.plan_row(target, child, IndexMap::new(), drafts, ancestors)?;
                            ancestors.pop();

                            for pair in pairs {
                                let cell = Cell::KeyOf {
                                    row: child_id,
                                    column: pair.target.clone(),
                                };
                                self.set_cell(entity, &pair.source, &mut cells, cell, drafts);
                            }
                        }
                        (EntryValue::One(child), AssociationOn::ForeignKey(pairs)) => {
                            // A reference to an existing row: copy its key
                            for pair in pairs {
                                let foreign_key = entity.expect_element(&pair.source)?;

                                match child.value(&pair.target) {
                                    Some(value) => {
                                        if let Some(value) = self.storage(entity, foreign_key, value) {
                                            self.set_cell(entity, &pair.source, &mut cells, Cell::Value(value), drafts);
                                        }
                                    }
                                    None => self.errors.push(Error::invalid_type(
                                        format!("`{}.{name}` without `{}`", entity.name, pair.target),
                                        format!("a reference carrying the key of `{}`", target.name),
                                    )),
                                }
                            }
                        }
                        (EntryValue::One(child), AssociationOn::Backlink { .. }) if association.composition => {
                            children.push((element, vec![child]));
                        }
                        (EntryValue::Many(items), AssociationOn::Backlink { .. }) if association.composition => {
                            children.push((element, items.iter().collect()));
                        }
                        (EntryValue::One(_) | EntryValue::Many(_), AssociationOn::Backlink { .. }) => {
                            tracing::debug!(
                                entity = %entity.name,
                                element = name,
                                "nested data for a non-composition association is not written"
                            );
                        }
                        (_, AssociationOn::Condition(_)) => {
                            return Err(Error::unsupported_construct(format!(
                                "writing through `{}.{name}`, an association with a custom condition",
                                entity.name
                            )));
                        }
                        (value, _) => self.errors.push(Error::invalid_type(
                            format!("{value:?} for `{}.{name}`", entity.name),
                            "an object, a list of objects or null",
                        )),
                    }
                }
                ElementTy::Calculated(_) => {}
            }
        }

        let mut returning = vec![];

        for column in entity.columns() {
            if cells.contains_key(&column.name) {
                continue;
            }

            match (column.auto, column.builtin()) {
                (Some(AutoStrategy::Uuid), Some(ty)) => {
                    let value = self.registry.to_storage(Value::Uuid(uuid::Uuid::new_v4()), ty)?;
                    cells.insert(column.name.clone(), Cell::Value(value));
                }
                (Some(AutoStrategy::Increment), _) => returning.push(column.name.clone()),
                _ => {}
            }
        }

        let key = entity
            .keys
            .iter()
            .map(|key| match cells.get(key) {
                Some(Cell::Value(value)) => Some(value.clone()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>();

        if let Some(key) = &key {
            let repeated = ancestors
                .iter()
                .position(|ancestor| ancestor.entity == entity.name && ancestor.key.as_ref() == Some(key));

            if let Some(start) = repeated {
                let mut path: Vec<String> = ancestors[start..]
                    .iter()
                    .map(|ancestor| ancestor.entity.clone())
                    .collect();
                path.push(entity.name.clone());

                return Err(Error::circular_composition(path));
            }
        }

        drafts.push(Draft {
            id,
            entity,
            cells,
            returning,
        });

        ancestors.push(Ancestor {
            entity: entity.name.clone(),
            key,
        });

        for (element, items) in children {
            let Some(association) = element.association() else {
                continue;
            };
            let target = self.schema.target_of(association)?;
            let pairs = association.key_pairs().unwrap_or_default();

            for item in items {
                let inherited = pairs
                    .iter()
                    .map(|pair| {
                        let cell = Cell::KeyOf {
                            row: id,
                            column: pair.source.clone(),
                        };
                        (pair.target.clone(), cell)
                    })
                    .collect();

                self.plan_row(target, item, inherited, drafts, ancestors)?;
            }
        }

        ancestors.pop();

        Ok(id)
    }

    /// Sets a cell, rejecting a payload value that contradicts one inherited
    /// from the parent.
    fn set_cell(
        &mut self,
        entity: &Entity,
        column: &str,
        cells: &mut IndexMap<String, Cell>,
        cell: Cell,
        drafts: &[Draft<'a>],
    ) {
        let Some(existing) = cells.get(column) else {
            cells.insert(column.to_string(), cell);
            return;
        };

        let known = match existing {
            Cell::Value(value) => Some(value),
            Cell::KeyOf { row, column } => drafts
                .iter()
                .find(|draft| draft.id == *row)
                .and_then(|draft| match draft.cells.get(column) {
                    Some(Cell::Value(value)) => Some(value),
                    _ => None,
                }),
        };

        match (known, &cell) {
            (Some(known), Cell::Value(value)) if known != value => {
                self.errors.push(Error::invalid_type(
                    format!("`{}.{column}` = {value:?}", entity.name),
                    format!("{known:?}, the key of its parent"),
                ));
            }
            // The inherited cell wins; it tracks keys generated by the backend
            _ => {}
        }
    }

    /// Groups rows into insert steps. A row becomes ready once every row it
    /// takes a key from is in an earlier step; ready rows sharing a table
    /// and column list share a step.
    fn batch(&mut self, drafts: Vec<Draft<'a>>, upsert: bool) -> Result<Vec<Step>> {
        let native_upsert = self.serializer.flavor().native_upsert().is_some();

        let mut done = HashSet::new();
        let mut pending = drafts;
        let mut steps = vec![];

        while !pending.is_empty() {
            let (ready, rest): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|draft| draft.dependencies().all(|row| done.contains(&row)));

            if ready.is_empty() {
                quarry_core::bail!("rows of a deep insert depend on each other");
            }

            let mut wave: Vec<InsertStep> = vec![];

            for mut draft in ready {
                done.insert(draft.id);

                let mut columns = vec![];
                let mut cells = vec![];

                for column in draft.entity.columns() {
                    if let Some(cell) = draft.cells.swap_remove(&column.name) {
                        columns.push(column.name.clone());
                        cells.push(cell);
                    }
                }

                if columns.is_empty() {
                    return Err(Error::unsupported_construct(format!(
                        "insert into `{}` without any column value",
                        draft.entity.name
                    )));
                }

                let row = PlannedRow { id: draft.id, cells };

                let step = wave.iter_mut().find(|step| {
                    step.insert.table == draft.entity.table
                        && step.insert.columns == columns
                        && step.insert.returning == draft.returning
                });

                match step {
                    Some(step) => step.rows.push(row),
                    None => {
                        let mut insert = sql::Insert::template(&draft.entity.table, columns);
                        insert.returning = draft.returning;

                        if upsert && native_upsert {
                            insert.upsert = Some(upsert_of(draft.entity, &insert.columns));
                        }

                        wave.push(InsertStep {
                            entity: draft.entity.name.clone(),
                            insert,
                            rows: vec![row],
                            replace: upsert && !native_upsert,
                        });
                    }
                }
            }

            steps.extend(wave.into_iter().map(Step::Insert));
            pending = rest;
        }

        Ok(steps)
    }

    fn plan_insert_select(&mut self, entity: &'a Entity, select: &stmt::Select, upsert: bool) -> Result<Plan> {
        let mut rewriter = Rewriter::new(self.schema, false);
        let (mut query, shape) = rewriter.insert_source(select)?;

        let mut columns = vec![];
        let mut positions = vec![];

        for field in &shape.fields {
            match entity.element(&field.name).filter(|element| element.is_column()) {
                Some(element) => {
                    columns.push(element.name.clone());
                    positions.push(field.position);
                }
                None => self.unknown(entity, &field.name),
            }
        }

        self.finish()?;

        let mut items: Vec<_> = query.items.into_iter().map(Some).collect();
        query.items = positions
            .iter()
            .filter_map(|&position| items.get_mut(position).and_then(Option::take))
            .collect();

        let mut insert = sql::Insert {
            table: entity.table.clone(),
            columns,
            source: sql::InsertSource::Select(Box::new(query)),
            returning: vec![],
            upsert: None,
        };

        if upsert {
            if self.serializer.flavor().native_upsert().is_none() {
                return Err(Error::unsupported_construct(format!(
                    "upsert from a select into `{}` on {}",
                    entity.name,
                    self.serializer.dialect()
                )));
            }

            insert.upsert = Some(upsert_of(entity, &insert.columns));
        }

        Ok(Plan {
            entity: entity.name.clone(),
            steps: vec![Step::Sql(SqlStep {
                stmt: insert.into(),
                args: vec![],
                counts: true,
            })],
            roots: vec![],
        })
    }
}

impl Draft<'_> {
    fn dependencies(&self) -> impl Iterator<Item = RowId> + '_ {
        self.cells.values().filter_map(|cell| match cell {
            Cell::KeyOf { row, .. } => Some(*row),
            Cell::Value(_) => None,
        })
    }
}

/// Conflict target and overwritten columns for an upsert into `entity`.
fn upsert_of(entity: &Entity, columns: &[String]) -> sql::Upsert {
    sql::Upsert {
        keys: entity.keys.clone(),
        update_columns: columns
            .iter()
            .filter(|column| !entity.keys.contains(column))
            .cloned()
            .collect(),
    }
}

fn row_entry(columns: &[String], row: &[Value]) -> Result<Entry> {
    if row.len() != columns.len() {
        return Err(Error::invalid_type(
            format!("a row of {} values", row.len()),
            format!("{} values, one per column", columns.len()),
        ));
    }

    let mut entry = Entry::new();
    for (column, value) in columns.iter().zip(row) {
        entry.insert(column, value.clone());
    }

    Ok(entry)
}
