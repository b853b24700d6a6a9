use super::{is_dropped, Cell, ChildrenStep, Plan, Planner, SqlStep, Step};
use crate::engine::rewrite::Rewriter;

use indexmap::IndexMap;
use quarry_core::{
    schema::{AssociationOn, ElementTy, Entity},
    stmt::{self, Entry, EntryValue, Path, Value, ValueRecord},
    Error, Result,
};
use quarry_sql::stmt as sql;

impl<'a> Planner<'a> {
    pub(super) fn plan_update(&mut self, update: &stmt::Update) -> Result<Plan> {
        let entity = self.schema.entity(&update.entity)?;

        if entity.persistence_skip() {
            return Err(Error::unsupported_construct(format!(
                "entity `{}` is not persisted",
                entity.name
            )));
        }

        let mut rewriter = Rewriter::new(self.schema, false);
        let filter = update
            .filter
            .as_ref()
            .map(|filter| rewriter.write_filter(entity, filter))
            .transpose()?;

        let mut assignments = vec![];
        let mut args = vec![];
        let mut children = vec![];

        let mut assign = |column: &str, value: Value| {
            assignments.push(sql::Assignment {
                column: column.to_string(),
                expr: sql::Expr::arg(args.len()),
            });
            args.push(value);
        };

        for (name, value) in update.data.iter() {
            let Some(element) = entity.element(name) else {
                self.unknown(entity, name);
                continue;
            };

            if is_dropped(element) {
                continue;
            }

            match &element.ty {
                ElementTy::Primitive(ty) => match value {
                    EntryValue::Value(value) => {
                        if let Some(value) = self.storage(entity, element, value) {
                            assign(name, value);
                        }
                    }
                    _ => self.errors.push(Error::invalid_type(
                        format!("nested data for `{}.{name}`", entity.name),
                        ty.name(),
                    )),
                },
                ElementTy::Association(association) => match (&association.on, value) {
                    (AssociationOn::ForeignKey(pairs), EntryValue::Value(Value::Null)) => {
                        for pair in pairs {
                            assign(&pair.source, Value::Null);
                        }
                    }
                    (AssociationOn::ForeignKey(_), EntryValue::One(_)) if association.composition => {
                        return Err(Error::unsupported_construct(format!(
                            "updating the to-one composition `{}.{name}` in place",
                            entity.name
                        )));
                    }
                    (AssociationOn::ForeignKey(pairs), EntryValue::One(target)) => {
                        for pair in pairs {
                            let foreign_key = entity.expect_element(&pair.source)?;

                            match target.value(&pair.target) {
                                Some(value) => {
                                    if let Some(value) = self.storage(entity, foreign_key, value) {
                                        assign(&pair.source, value);
                                    }
                                }
                                None => self.errors.push(Error::invalid_type(
                                    format!("`{}.{name}` without `{}`", entity.name, pair.target),
                                    "a reference carrying the target key",
                                )),
                            }
                        }
                    }
                    (AssociationOn::Backlink { .. }, value) if association.composition => {
                        let items = match value {
                            EntryValue::Many(items) => items.clone(),
                            EntryValue::One(item) => vec![item.clone()],
                            EntryValue::Value(Value::Null) => vec![],
                            EntryValue::Value(value) => {
                                self.errors.push(Error::invalid_type(
                                    format!("{value:?} for `{}.{name}`", entity.name),
                                    "a list of objects or null",
                                ));
                                continue;
                            }
                        };

                        if self.strict {
                            let target = self.schema.target_of(association)?;
                            for item in &items {
                                self.check_entry(target, item);
                            }
                        }

                        children.push((name.to_string(), items));
                    }
                    (AssociationOn::Condition(_), _) if association.composition => {
                        return Err(Error::unsupported_construct(format!(
                            "writing through `{}.{name}`, an association with a custom condition",
                            entity.name
                        )));
                    }
                    _ if !association.composition && !association.is_foreign_key() => {
                        tracing::debug!(
                            entity = %entity.name,
                            element = name,
                            "nested data for a non-composition association is not written"
                        );
                    }
                    (_, value) => self.errors.push(Error::invalid_type(
                        format!("{value:?} for `{}.{name}`", entity.name),
                        "an object or null",
                    )),
                },
                ElementTy::Calculated(_) => {}
            }
        }

        for (name, expr) in &update.with {
            let Some(element) = entity.element(name).filter(|element| element.is_column()) else {
                self.unknown(entity, name);
                continue;
            };

            let Some(ty) = element.builtin() else {
                continue;
            };

            assignments.push(sql::Assignment {
                column: name.clone(),
                expr: rewriter.write_expr(entity, expr, ty)?,
            });
        }

        self.finish()?;

        // Children are diffed first: the parent filter still matches the
        // rows it matched before the update
        let mut steps: Vec<Step> = children
            .into_iter()
            .enumerate()
            .map(|(i, (element, children))| {
                Step::Children(ChildrenStep {
                    entity: entity.name.clone(),
                    filter: filter.clone(),
                    element,
                    children,
                    counts: i == 0 && assignments.is_empty(),
                })
            })
            .collect();

        if !assignments.is_empty() {
            steps.push(Step::Sql(SqlStep {
                stmt: sql::Update {
                    table: entity.table.clone(),
                    assignments,
                    filter,
                }
                .into(),
                args,
                counts: true,
            }));
        }

        Ok(Plan {
            entity: entity.name.clone(),
            steps,
            roots: vec![],
        })
    }

    /// Plans the statements that turn the composition children of one parent
    /// row into `step.children`.
    ///
    /// `parent` holds the parent's storage values for the association's
    /// source columns; `existing` the storage keys of the children already
    /// stored. Children are matched by key, not by position: a matched child
    /// is updated in place, an unmatched one inserted, and a stored child
    /// missing from the new list deleted along with its own compositions.
    pub(crate) fn plan_children(
        &mut self,
        step: &ChildrenStep,
        parent: &ValueRecord,
        existing: Vec<ValueRecord>,
    ) -> Result<Vec<Step>> {
        let entity = self.schema.entity(&step.entity)?;
        let association = entity
            .association(&step.element)
            .ok_or_else(|| Error::unknown_column(&entity.name, &step.element))?;
        let target = self.schema.target_of(association)?;

        let Some(pairs) = association.key_pairs() else {
            return Err(Error::unsupported_construct(format!(
                "writing through `{}.{}`, an association with a custom condition",
                entity.name, step.element
            )));
        };

        // Child columns fixed by the parent row, in storage form
        let inherited: IndexMap<String, Value> = pairs
            .iter()
            .map(|pair| {
                let value = parent.get(&pair.source).cloned().unwrap_or_default();
                (pair.target.clone(), value)
            })
            .collect();

        let mut existing = existing
            .into_iter()
            .map(|row| self.stored_key(target, &row))
            .collect::<Result<Vec<_>>>()?;

        let mut steps = vec![];
        let mut inserts = vec![];

        for child in &step.children {
            let matched = self
                .payload_key(target, child, &inherited)?
                .and_then(|key| existing.iter().position(|stored| *stored == key))
                .map(|i| existing.swap_remove(i));

            match matched {
                Some(key) => {
                    let mut data = child.clone();
                    for column in inherited.keys() {
                        data.remove(column);
                    }

                    let update = stmt::Update {
                        entity: target.name.clone(),
                        filter: Some(key_filter(target, &key)),
                        data,
                        with: IndexMap::new(),
                    };

                    steps.extend(self.plan_update(&update)?.steps);
                }
                None => inserts.push(child),
            }
        }

        for key in existing {
            let delete = stmt::Delete {
                from: target.name.clone(),
                filter: Some(key_filter(target, &key)),
            };

            steps.extend(self.plan_delete(&delete)?.steps);
        }

        if !inserts.is_empty() {
            let cells: IndexMap<String, Cell> = inherited
                .iter()
                .map(|(column, value)| (column.clone(), Cell::Value(value.clone())))
                .collect();

            let plan = self.plan_entries(target, inserts.into_iter().map(|child| (child, cells.clone())), false)?;
            steps.extend(plan.steps);
        }

        for step in &mut steps {
            step.uncount();
        }

        tracing::debug!(
            entity = %target.name,
            statements = steps.len(),
            "planned composition diff"
        );

        Ok(steps)
    }

    /// Key of a stored child, in application form.
    fn stored_key(&self, entity: &Entity, row: &ValueRecord) -> Result<Vec<Value>> {
        entity
            .key_elements()
            .map(|key| {
                let value = row.get(&key.name).cloned().unwrap_or_default();
                match key.builtin() {
                    Some(ty) => self.registry.from_storage(value, ty),
                    None => Ok(value),
                }
            })
            .collect()
    }

    /// Key of a payload child in application form, `None` when the payload
    /// does not carry all of it.
    fn payload_key(
        &self,
        entity: &Entity,
        child: &Entry,
        inherited: &IndexMap<String, Value>,
    ) -> Result<Option<Vec<Value>>> {
        let mut key = vec![];

        for element in entity.key_elements() {
            let Some(ty) = element.builtin() else {
                return Ok(None);
            };

            let storage = match (inherited.get(&element.name), child.value(&element.name)) {
                (Some(value), _) => value.clone(),
                (None, Some(value)) => self.registry.to_storage(value.clone(), ty)?,
                (None, None) => return Ok(None),
            };

            key.push(self.registry.from_storage(storage, ty)?);
        }

        Ok(Some(key))
    }
}

/// `key1 = v1 AND key2 = v2 ..` over the keys of `entity`.
fn key_filter(entity: &Entity, key: &[Value]) -> stmt::Expr {
    let mut terms = entity
        .keys
        .iter()
        .zip(key)
        .map(|(name, value)| stmt::Expr::eq(Path::from(name.as_str()), value.clone()));

    let first = terms.next().unwrap_or_else(|| stmt::Expr::value(true));
    terms.fold(first, |filter, term| stmt::Expr::and(filter, term))
}
