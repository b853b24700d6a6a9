use super::{
    decode::{Field, FieldKind, Shape},
    resolve::{Aliases, Anchor, Resolved, Scope, Source, SourceKind},
};

use quarry_core::{
    schema::{Association, BuiltinType, Element, ElementTy, Entity},
    stmt::{self, Column, ExistsTarget, Path, Quantifier},
    Error, Result, Schema,
};
use quarry_sql::stmt as sql;

/// Lowers caller-facing statements into flat SQL, one `Rewriter` per
/// compiled statement.
#[derive(Debug)]
pub(crate) struct Rewriter<'a> {
    pub(crate) schema: &'a Schema,

    /// Localized elements read through their texts entity
    pub(crate) locale: bool,

    pub(crate) aliases: Aliases,

    /// Type inferred for each argument slot from the element it is compared
    /// with. Slots without a type are bound as given.
    pub(crate) arg_types: Vec<Option<BuiltinType>>,

    next_group: usize,
}

/// A compiled select with its result layout
#[derive(Debug)]
pub(crate) struct Rewritten {
    pub(crate) select: sql::Select,
    pub(crate) shape: Shape,
    pub(crate) arg_types: Vec<Option<BuiltinType>>,
}

/// A lowered expression with the builtin type it evaluates to, when known.
#[derive(Debug)]
pub(crate) struct Lowered {
    pub(crate) expr: sql::Expr,
    pub(crate) ty: Option<BuiltinType>,
}

/// One output column before ordering.
#[derive(Debug)]
struct Part {
    /// Inline columns share a group and stay together
    group: usize,

    /// Canonical position: declaration index of the element, then name
    key: (usize, String),

    item: sql::SelectItem,
    field: Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Order {
    /// Requested order, inline groups sorted in place
    Requested,

    /// Sorted by element declaration order, so any permutation of the same
    /// columns emits the same text
    Canonical,
}

impl<'a> Rewriter<'a> {
    pub(crate) fn new(schema: &'a Schema, locale: bool) -> Rewriter<'a> {
        Rewriter {
            schema,
            locale,
            aliases: Aliases::default(),
            arg_types: vec![],
            next_group: 0,
        }
    }

    pub(crate) fn rewrite(mut self, select: &stmt::Select) -> Result<Rewritten> {
        let (select, shape) = self.select(None, select)?;

        Ok(Rewritten {
            select,
            shape,
            arg_types: self.arg_types,
        })
    }

    /// Lowers one `SELECT` level. `parent` is set for sub-selects that may
    /// correlate with the enclosing query.
    pub(crate) fn select(
        &mut self,
        parent: Option<&Scope<'a>>,
        select: &stmt::Select,
    ) -> Result<(sql::Select, Shape)> {
        let mut scope = match parent {
            Some(parent) => Scope::nested(parent),
            None => Scope::new(self.schema),
        };

        let from = self.lower_source(&mut scope, &select.from)?;

        let mut out = sql::Select {
            distinct: select.distinct,
            from: Some(from),
            ..sql::Select::default()
        };

        let columns = if select.columns.is_empty() {
            vec![Column::wildcard()]
        } else {
            select.columns.clone()
        };

        let mut parts = vec![];
        for column in &columns {
            self.lower_column(&mut scope, column, &mut parts)?;
        }

        let (items, fields) = assemble(parts, Order::Requested);
        out.items = items;

        if let Some(filter) = &select.filter {
            out.filter = Some(self.lower_bool(&mut scope, filter)?);
        }

        if !select.search.is_empty() {
            let search = self.search(&mut scope, &select.search)?;
            out.and_filter(search);
        }

        for expr in &select.group_by {
            let lowered = self.lower_expr(&mut scope, expr)?;
            out.group_by.push(lowered.expr);
        }

        if let Some(having) = &select.having {
            out.having = Some(self.lower_bool(&mut scope, having)?);
        }

        for order_by in &select.order_by {
            let expr = self.lower_order_expr(&mut scope, &order_by.expr, &fields)?;
            out.order_by.push(sql::OrderByExpr {
                expr,
                direction: order_by.direction,
            });
        }

        if let Some(limit) = &select.limit {
            out.limit = Some(self.lower_limit(&mut scope, limit)?);
        }

        if let Some(lock) = &select.lock {
            let mut columns = vec![];
            for path in &lock.columns {
                let lowered = self.lower_expr(&mut scope, &stmt::Expr::Ref(path.clone()))?;
                columns.push(lowered.expr);
            }

            out.lock = Some(sql::Lock {
                mode: lock.mode,
                columns,
                wait: lock.wait,
            });
        }

        scope.finish(&mut out);

        Ok((out, Shape { fields }))
    }

    /// Lowers the filter of an update or delete on `entity`. References are
    /// qualified with the table name; a filter that needs joins becomes a key
    /// lookup through a sub-select.
    pub(crate) fn write_filter(&mut self, entity: &'a Entity, filter: &stmt::Expr) -> Result<sql::Expr> {
        let name = simple_name(&entity.name);
        self.aliases.fresh(&entity.table);

        let mut scope = Scope::single(self.schema, name, &entity.table, entity);
        let lowered = self.lower_bool(&mut scope, filter)?;

        if scope.joins.is_empty() {
            return Ok(lowered);
        }

        let mut select = sql::Select::from_table(&entity.table, None);
        for key in &entity.keys {
            select.items.push(sql::SelectItem {
                expr: sql::Expr::column(&entity.table, key),
                alias: None,
            });
        }
        select.filter = Some(lowered);
        scope.finish(&mut select);

        Ok(sql::Expr::in_subquery(key_tuple(entity), select))
    }

    /// Lowers an `UPDATE .. SET` expression on `entity`. No joins.
    pub(crate) fn write_expr(
        &mut self,
        entity: &'a Entity,
        expr: &stmt::Expr,
        ty: &BuiltinType,
    ) -> Result<sql::Expr> {
        let mut scope = Scope::single(self.schema, simple_name(&entity.name), &entity.table, entity);
        scope.allow_joins = false;

        let mut lowered = self.lower_expr(&mut scope, expr)?;
        self.hint(&mut lowered, Some(ty));
        Ok(lowered.expr)
    }

    /// Lowers an insert-as-select source.
    pub(crate) fn insert_source(&mut self, select: &stmt::Select) -> Result<(sql::Select, Shape)> {
        self.select(None, select)
    }

    fn lower_source(&mut self, scope: &mut Scope<'a>, source: &stmt::Source) -> Result<sql::TableWithJoins> {
        match source {
            stmt::Source::Entity { name, alias } => {
                let entity = self.schema.entity(name)?;

                if entity.persistence_skip() {
                    return Err(Error::unsupported_construct(format!(
                        "entity `{name}` is not persisted"
                    )));
                }

                let name = alias
                    .clone()
                    .unwrap_or_else(|| simple_name(&entity.name).to_string());
                let sql_alias = self.aliases.fresh(&name);

                scope.sources.push(Source::entity(name, &sql_alias, entity));

                Ok(sql::TableWithJoins {
                    relation: sql::TableFactor::table(&entity.table, sql_alias),
                    joins: vec![],
                })
            }
            stmt::Source::Join(join) => {
                let mut left = self.lower_source(scope, &join.left)?;
                let right = self.lower_source(scope, &join.right)?;
                let on = self.lower_bool(scope, &join.on)?;

                left.joins.push(sql::Join {
                    kind: match join.kind {
                        stmt::JoinKind::Inner => sql::JoinKind::Inner,
                        stmt::JoinKind::Left => sql::JoinKind::Left,
                    },
                    relation: right.relation,
                    on,
                });
                left.joins.extend(right.joins);

                Ok(left)
            }
            stmt::Source::Select { select, alias } => {
                let (query, shape) = self.select(None, select)?;
                let sql_alias = self.aliases.fresh(alias);

                let columns = shape
                    .fields
                    .iter()
                    .map(|field| (field.name.clone(), field.scalar_ty()))
                    .collect();

                scope.sources.push(Source {
                    name: alias.clone(),
                    alias: sql_alias.clone(),
                    kind: SourceKind::Derived(columns),
                });

                Ok(sql::TableWithJoins {
                    relation: sql::TableFactor::Derived {
                        query: Box::new(query),
                        alias: sql_alias,
                    },
                    joins: vec![],
                })
            }
        }
    }

    fn lower_column(&mut self, scope: &mut Scope<'a>, column: &Column, parts: &mut Vec<Part>) -> Result<()> {
        match column {
            Column::Expr { expr, alias } => {
                let name = alias.clone().unwrap_or_else(|| default_name(expr, parts.len()));
                let key = (sort_index(scope, expr), name.clone());

                if let stmt::Expr::Ref(path) = expr {
                    let resolved = self.resolve_path(scope, path)?;

                    // A managed to-one association reads as its foreign keys
                    if let Resolved::Association {
                        anchor,
                        association,
                        ..
                    } = &resolved
                    {
                        if alias.is_none() {
                            if let Some(pairs) = association.key_pairs().filter(|_| association.is_foreign_key()) {
                                for pair in pairs {
                                    let element = anchor.entity.expect_element(&pair.source)?;
                                    let lowered = self.lower_element(scope, &anchor.alias, anchor.entity, element)?;
                                    let name = if anchor.prefix.is_empty() {
                                        pair.source.clone()
                                    } else {
                                        format!("{}_{}", anchor.prefix, pair.source)
                                    };
                                    parts.push(self.part(key.clone(), name, lowered));
                                }
                                return Ok(());
                            }
                        }
                    }

                    let lowered = self.lower_resolved(scope, resolved, path)?;
                    parts.push(self.part(key, name, lowered));
                    return Ok(());
                }

                let lowered = self.lower_expr(scope, expr)?;
                parts.push(self.part(key, name, lowered));
            }
            Column::Wildcard { excluding } => {
                for column in self.expand_wildcard(scope, excluding)? {
                    self.lower_column(scope, &column, parts)?;
                }
            }
            Column::Expand(expand) => {
                let name = expand.name().to_string();
                let key = (path_index(scope, &expand.path), name.clone());
                let resolved = self.resolve_path(scope, &expand.path)?;
                let (expr, kind) = self.lower_expand(resolved, expand)?;

                parts.push(self.json_part(key, name, expr, kind));
            }
            Column::Inline(inline) => self.lower_inline(scope, inline, parts)?,
        }

        Ok(())
    }

    fn part(&mut self, key: (usize, String), name: String, lowered: Lowered) -> Part {
        let group = self.next_group();
        let alias = match &lowered.expr {
            sql::Expr::Column(column) if column.name == name => None,
            _ => Some(name.clone()),
        };

        Part {
            group,
            key,
            item: sql::SelectItem {
                expr: lowered.expr,
                alias,
            },
            field: Field::scalar(name, lowered.ty),
        }
    }

    fn json_part(&mut self, key: (usize, String), name: String, expr: sql::Expr, kind: FieldKind) -> Part {
        Part {
            group: self.next_group(),
            key,
            item: sql::SelectItem {
                expr,
                alias: Some(name.clone()),
            },
            field: Field {
                name,
                position: 0,
                kind,
            },
        }
    }

    fn next_group(&mut self) -> usize {
        self.next_group += 1;
        self.next_group
    }

    /// Columns a wildcard stands for, qualified by source when there are
    /// several.
    fn expand_wildcard(&self, scope: &Scope<'a>, excluding: &[String]) -> Result<Vec<Column>> {
        let mut per_source: Vec<(&Source<'a>, Vec<String>)> = vec![];

        for source in &scope.sources {
            let names: Vec<String> = match &source.kind {
                SourceKind::Entity(entity) => entity
                    .elements
                    .values()
                    .filter(|element| in_wildcard(element))
                    .map(|element| element.name.clone())
                    .collect(),
                SourceKind::Derived(columns) => columns.iter().map(|(name, _)| name.clone()).collect(),
            };

            let names = names
                .into_iter()
                .filter(|name| !excluding.contains(name))
                .collect();

            per_source.push((source, names));
        }

        if per_source.len() > 1 {
            for (i, (source, names)) in per_source.iter().enumerate() {
                for (other, other_names) in &per_source[i + 1..] {
                    if let Some(name) = names.iter().find(|name| other_names.contains(name)) {
                        return Err(Error::unsupported_construct(format!(
                            "wildcard over `{}` and `{}` is ambiguous for column `{name}`; list the columns explicitly",
                            source.name, other.name
                        )));
                    }
                }
            }
        }

        let qualify = per_source.len() > 1;

        Ok(per_source
            .into_iter()
            .flat_map(|(source, names)| {
                names.into_iter().map(move |name| {
                    if qualify {
                        Column::Expr {
                            expr: stmt::Expr::Ref(Path::new([source.name.clone(), name.clone()])),
                            alias: Some(name),
                        }
                    } else {
                        Column::path(Path::new([name]))
                    }
                })
            })
            .collect())
    }

    fn lower_expand(&mut self, resolved: Resolved<'a>, expand: &stmt::Expand) -> Result<(sql::Expr, FieldKind)> {
        let (anchor, element, association, filter, to_many) = match resolved {
            Resolved::Association {
                anchor,
                element,
                association,
                filter,
            } => (anchor, element, association, filter, false),
            Resolved::ToMany {
                anchor,
                element,
                association,
                filter,
                rest,
            } if rest.is_empty() => (anchor, element, association, filter, true),
            Resolved::ToMany { element, .. } => {
                return Err(Error::unsupported_construct(format!(
                    "expand `{}` continues past to-many association `{}`",
                    expand.path, element.name
                )))
            }
            _ => {
                return Err(Error::unsupported_construct(format!(
                    "expand on `{}`, which is not an association",
                    expand.path
                )))
            }
        };

        let target = self.schema.target_of(association)?;
        let alias = self.aliases.fresh(expand.name());

        let mut scope = Scope::single(self.schema, &element.name, &alias, target);
        let mut select = sql::Select::from_table(&target.table, Some(alias.clone()));

        let on = self.association_on(&anchor.alias, anchor.entity, &alias, target, element, association)?;
        select.and_filter(on);

        if let Some(filter) = &filter {
            let filter = self.lower_bool(&mut scope, filter)?;
            select.and_filter(filter);
        }

        let columns = if expand.columns.is_empty() {
            vec![Column::wildcard()]
        } else {
            expand.columns.clone()
        };

        let mut parts = vec![];
        for column in &columns {
            self.lower_column(&mut scope, column, &mut parts)?;
        }

        let (items, fields) = assemble(parts, Order::Canonical);
        select.items = items;

        if to_many {
            for order_by in &expand.order_by {
                let lowered = self.lower_expr(&mut scope, &order_by.expr)?;
                select.order_by.push(sql::OrderByExpr {
                    expr: lowered.expr,
                    direction: order_by.direction,
                });
            }

            if let Some(limit) = &expand.limit {
                select.limit = Some(self.lower_limit(&mut scope, limit)?);
            }
        }

        scope.finish(&mut select);

        let mut types = vec![None; select.items.len()];
        for field in &fields {
            types[field.position] = field.scalar_ty();
        }

        tracing::trace!(expand = %expand.path, to_many, "lowered expand to a correlated sub-select");

        Ok((
            sql::Expr::Json(Box::new(sql::ExprJson {
                query: select,
                to_many,
                types,
            })),
            FieldKind::Json { to_many, fields },
        ))
    }

    /// Splices the columns of a to-one target into the current row, named
    /// `<path>_<column>`.
    fn lower_inline(&mut self, scope: &mut Scope<'a>, inline: &stmt::Inline, parts: &mut Vec<Part>) -> Result<()> {
        let resolved = self.resolve_path(scope, &inline.path)?;

        let (anchor, element, association, filter) = match resolved {
            Resolved::Association {
                anchor,
                element,
                association,
                filter,
            } => (anchor, element, association, filter),
            Resolved::ToMany { element, .. } => {
                return Err(Error::unsupported_construct(format!(
                    "inline over to-many association `{}`",
                    element.name
                )))
            }
            _ => {
                return Err(Error::unsupported_construct(format!(
                    "inline on `{}`, which is not an association",
                    inline.path
                )))
            }
        };

        let target = self.join_to_one(scope, &anchor, element, association, filter.as_ref())?;
        let prefix = inline.path.names().collect::<Vec<_>>().join("_");
        let group = self.next_group();

        let columns = if inline.columns.is_empty() {
            vec![Column::wildcard()]
        } else {
            inline.columns.clone()
        };

        let mut group_parts = vec![];

        for column in columns {
            match column {
                Column::Wildcard { excluding } => {
                    for element in target.entity.elements.values() {
                        if !in_wildcard(element) || excluding.contains(&element.name) {
                            continue;
                        }

                        let name = format!("{prefix}_{}", element.name);
                        let key = (element_index(target.entity, &element.name), name.clone());
                        let resolved = self.walk(scope, target.clone(), &Path::new([element.name.clone()]), 0)?;
                        let lowered = self.lower_resolved(scope, resolved, &inline.path)?;
                        group_parts.push(self.part(key, name, lowered));
                    }
                }
                Column::Expr {
                    expr: stmt::Expr::Ref(path),
                    alias,
                } => {
                    let name = alias.unwrap_or_else(|| {
                        format!("{prefix}_{}", path.names().collect::<Vec<_>>().join("_"))
                    });
                    let key = (element_index(target.entity, path.first()), name.clone());
                    let resolved = self.walk(scope, target.clone(), &path, 0)?;
                    let lowered = self.lower_resolved(scope, resolved, &path)?;
                    group_parts.push(self.part(key, name, lowered));
                }
                Column::Expand(expand) => {
                    let name = format!("{prefix}_{}", expand.name());
                    let key = (element_index(target.entity, expand.path.first()), name.clone());
                    let resolved = self.walk(scope, target.clone(), &expand.path, 0)?;
                    let (expr, kind) = self.lower_expand(resolved, &expand)?;
                    group_parts.push(self.json_part(key, name, expr, kind));
                }
                Column::Inline(nested) => {
                    let mut path = inline.path.clone();
                    path.segments.extend(nested.path.segments);
                    let nested = stmt::Inline {
                        path,
                        columns: nested.columns,
                    };

                    let mut nested_parts = vec![];
                    self.lower_inline(scope, &nested, &mut nested_parts)?;
                    group_parts.extend(nested_parts);
                }
                Column::Expr { .. } => {
                    return Err(Error::unsupported_construct(format!(
                        "inline `{}` lists an expression; only element references are allowed",
                        inline.path
                    )))
                }
            }
        }

        group_parts.sort_by(|a, b| a.key.cmp(&b.key));

        for mut part in group_parts {
            part.group = group;
            parts.push(part);
        }

        Ok(())
    }

    /// Lowers an expression used as a condition.
    pub(crate) fn lower_bool(&mut self, scope: &mut Scope<'a>, expr: &stmt::Expr) -> Result<sql::Expr> {
        Ok(self.lower_expr(scope, expr)?.expr)
    }

    pub(crate) fn lower_expr(&mut self, scope: &mut Scope<'a>, expr: &stmt::Expr) -> Result<Lowered> {
        match expr {
            stmt::Expr::Ref(path) => {
                let resolved = self.resolve_path(scope, path)?;
                self.lower_resolved(scope, resolved, path)
            }
            stmt::Expr::Value(value) => Ok(Lowered {
                expr: sql::Expr::typed(value.clone(), None),
                ty: None,
            }),
            stmt::Expr::Arg(index) => {
                if self.arg_types.len() <= *index {
                    self.arg_types.resize(index + 1, None);
                }
                Ok(Lowered {
                    expr: sql::Expr::arg(*index),
                    ty: None,
                })
            }
            stmt::Expr::Raw(raw) => Ok(Lowered {
                expr: sql::Expr::raw(raw),
                ty: None,
            }),
            stmt::Expr::Func(func) => self.lower_func(scope, func),
            stmt::Expr::List(items) => {
                let mut lowered = vec![];
                for item in items {
                    lowered.push(self.lower_expr(scope, item)?.expr);
                }
                Ok(Lowered {
                    expr: sql::Expr::Tuple(lowered),
                    ty: None,
                })
            }
            stmt::Expr::Stmt(select) => {
                let (query, shape) = self.select(Some(scope), select)?;
                let ty = shape.fields.first().and_then(Field::scalar_ty);
                Ok(Lowered {
                    expr: sql::Expr::Subquery(Box::new(query)),
                    ty,
                })
            }
            stmt::Expr::BinaryOp(binary) => {
                // `= null` means `is null`
                if matches!(binary.op, stmt::BinaryOp::Eq | stmt::BinaryOp::Ne) {
                    let negate = binary.op == stmt::BinaryOp::Ne;
                    let operand = match (&*binary.lhs, &*binary.rhs) {
                        (operand, stmt::Expr::Value(stmt::Value::Null))
                        | (stmt::Expr::Value(stmt::Value::Null), operand) => Some(operand),
                        _ => None,
                    };

                    if let Some(operand) = operand {
                        let lowered = self.lower_expr(scope, operand)?;
                        return Ok(boolean(sql::Expr::IsNull {
                            expr: Box::new(lowered.expr),
                            negate,
                        }));
                    }
                }

                let mut lhs = self.lower_expr(scope, &binary.lhs)?;
                let mut rhs = self.lower_expr(scope, &binary.rhs)?;
                self.unify(&mut lhs, &mut rhs);

                let ty = if binary.op.is_comparison() {
                    Some(BuiltinType::Boolean)
                } else {
                    lhs.ty.clone().or_else(|| rhs.ty.clone())
                };

                Ok(Lowered {
                    expr: sql::Expr::binary_op(lhs.expr, binary.op, rhs.expr),
                    ty,
                })
            }
            stmt::Expr::And(operands) => {
                let mut lowered = vec![];
                for operand in operands {
                    lowered.push(self.lower_bool(scope, operand)?);
                }
                Ok(boolean(sql::Expr::and_all(lowered)))
            }
            stmt::Expr::Or(operands) => {
                let mut lowered = vec![];
                for operand in operands {
                    lowered.push(self.lower_bool(scope, operand)?);
                }
                Ok(boolean(sql::Expr::or_all(lowered)))
            }
            stmt::Expr::Not(operand) => {
                let lowered = self.lower_bool(scope, operand)?;
                Ok(boolean(sql::Expr::Not(Box::new(lowered))))
            }
            stmt::Expr::IsNull(is_null) => {
                let lowered = self.lower_expr(scope, &is_null.expr)?;
                Ok(boolean(sql::Expr::IsNull {
                    expr: Box::new(lowered.expr),
                    negate: is_null.negate,
                }))
            }
            stmt::Expr::InList(in_list) => self.lower_in_list(scope, in_list),
            stmt::Expr::Like(like) => {
                let mut lowered = self.lower_expr(scope, &like.expr)?;
                let mut pattern = self.lower_expr(scope, &like.pattern)?;
                self.unify(&mut lowered, &mut pattern);

                let expr = sql::Expr::Like {
                    expr: Box::new(lowered.expr),
                    pattern: Box::new(pattern.expr),
                };

                Ok(boolean(if like.negate {
                    sql::Expr::Not(Box::new(expr))
                } else {
                    expr
                }))
            }
            stmt::Expr::Exists(exists) => {
                let query = match &exists.target {
                    ExistsTarget::Path(path) => self.exists_path(scope, path, None)?,
                    ExistsTarget::Select(select) => self.select(Some(scope), select)?.0,
                };
                Ok(boolean(sql::Expr::exists(query, exists.negate)))
            }
            stmt::Expr::Quantified(quantified) => {
                // `all` holds when no row violates the predicate
                let (predicate, negate) = match quantified.quantifier {
                    Quantifier::Any => ((*quantified.predicate).clone(), false),
                    Quantifier::All => (stmt::Expr::not((*quantified.predicate).clone()), true),
                };

                let query = self.exists_path(scope, &quantified.path, Some(&predicate))?;
                Ok(boolean(sql::Expr::exists(query, negate)))
            }
        }
    }

    pub(crate) fn lower_resolved(&mut self, scope: &mut Scope<'a>, resolved: Resolved<'a>, path: &Path) -> Result<Lowered> {
        match resolved {
            Resolved::Column {
                qualifier,
                entity,
                element,
            } => self.lower_element(scope, &qualifier, entity, element),
            Resolved::Derived { qualifier, name, ty } => Ok(Lowered {
                expr: sql::Expr::column(qualifier, name),
                ty,
            }),
            Resolved::Calculated { anchor, element } => self.lower_calculated(scope, &anchor, element),
            Resolved::Association {
                anchor,
                element,
                association,
                ..
            } => match association.key_pairs() {
                // A single-key managed association compares as its foreign key
                Some([pair]) if association.is_foreign_key() => {
                    let fk = anchor.entity.expect_element(&pair.source)?;
                    self.lower_element(scope, &anchor.alias, anchor.entity, fk)
                }
                _ => Err(Error::unsupported_construct(format!(
                    "association `{}` used as a value in `{path}`",
                    element.name
                ))),
            },
            Resolved::ToMany { element, .. } => Err(Error::unsupported_construct(format!(
                "to-many association `{}` in `{path}` must be wrapped in an aggregate, exists, any or all",
                element.name
            ))),
        }
    }

    /// A persisted element, read through its texts row when localized.
    fn lower_element(
        &mut self,
        scope: &mut Scope<'a>,
        qualifier: &str,
        entity: &'a Entity,
        element: &'a Element,
    ) -> Result<Lowered> {
        let ty = element.builtin().cloned();
        let base = sql::Expr::column(qualifier, &element.name);

        if element.localized {
            if let Some(texts) = self.texts_join(scope, qualifier, entity)? {
                return Ok(Lowered {
                    expr: sql::Expr::func(
                        "coalesce",
                        vec![sql::Expr::column(texts, &element.name), base],
                    ),
                    ty,
                });
            }
        }

        Ok(Lowered { expr: base, ty })
    }

    /// Inlines the formula of a calculated element at `anchor`.
    fn lower_calculated(&mut self, scope: &mut Scope<'a>, anchor: &Anchor<'a>, element: &'a Element) -> Result<Lowered> {
        let ElementTy::Calculated(calculated) = &element.ty else {
            return Err(Error::unsupported_construct(format!(
                "`{}` is not a calculated element",
                element.name
            )));
        };

        let mut inner = Scope::single(self.schema, "$self", &anchor.alias, anchor.entity);
        inner.allow_joins = scope.allow_joins;
        inner.joins = std::mem::take(&mut scope.joins);

        let lowered = self.lower_expr(&mut inner, &calculated.expr);

        // Joins the formula needed belong to the enclosing select
        scope.joins = inner.joins;

        Ok(Lowered {
            expr: lowered?.expr,
            ty: Some(calculated.ty.clone()),
        })
    }

    fn lower_func(&mut self, scope: &mut Scope<'a>, func: &stmt::ExprFunc) -> Result<Lowered> {
        let name = func.name.to_ascii_lowercase();

        if func.is_aggregate() && func.args.len() == 1 {
            if let stmt::Expr::Ref(path) = &func.args[0] {
                let resolved = self.resolve_path(scope, path)?;

                if let Resolved::ToMany {
                    anchor,
                    element,
                    association,
                    filter,
                    rest,
                } = resolved
                {
                    return self.aggregate_subquery(&name, anchor, element, association, filter, &rest);
                }

                let arg = self.lower_resolved(scope, resolved, path)?;
                return Ok(call(&name, vec![arg]));
            }
        }

        let mut args = vec![];
        for arg in &func.args {
            args.push(self.lower_expr(scope, arg)?);
        }

        // String functions compare their operands as the first typed one
        if matches!(
            name.as_str(),
            "contains" | "startswith" | "endswith" | "indexof" | "concat" | "coalesce"
        ) {
            let ty = args.iter().find_map(|arg| arg.ty.clone());
            for arg in &mut args {
                self.hint(arg, ty.as_ref());
            }
        }

        Ok(call(&name, args))
    }

    /// `count(books)` and friends: a correlated scalar sub-select over the
    /// to-many target.
    fn aggregate_subquery(
        &mut self,
        func: &str,
        anchor: Anchor<'a>,
        element: &'a Element,
        association: &'a Association,
        filter: Option<stmt::Expr>,
        rest: &Path,
    ) -> Result<Lowered> {
        let target = self.schema.target_of(association)?;
        let alias = self.aliases.fresh(&element.name);

        let mut scope = Scope::single(self.schema, &element.name, &alias, target);
        let mut select = sql::Select::from_table(&target.table, Some(alias.clone()));

        let on = self.association_on(&anchor.alias, anchor.entity, &alias, target, element, association)?;
        select.and_filter(on);

        if let Some(filter) = &filter {
            let filter = self.lower_bool(&mut scope, filter)?;
            select.and_filter(filter);
        }

        let arg = if rest.is_empty() {
            if func != "count" {
                return Err(Error::unsupported_construct(format!(
                    "`{func}` over association `{}` needs an element to aggregate",
                    element.name
                )));
            }

            Lowered {
                expr: sql::Expr::Star,
                ty: None,
            }
        } else {
            let target_anchor = Anchor {
                alias: alias.clone(),
                entity: target,
                prefix: String::new(),
            };
            let resolved = self.walk(&mut scope, target_anchor, rest, 0)?;
            self.lower_resolved(&mut scope, resolved, rest)?
        };

        let lowered = call(func, vec![arg]);
        select.items.push(sql::SelectItem {
            expr: lowered.expr,
            alias: None,
        });
        scope.finish(&mut select);

        tracing::trace!(association = %element.name, func, "aggregate lowered to a scalar sub-select");

        Ok(Lowered {
            expr: sql::Expr::Subquery(Box::new(select)),
            ty: lowered.ty,
        })
    }

    /// Builds `SELECT 1 ..` over the rows an association path reaches, one
    /// nested correlated select per association segment. `predicate` applies
    /// to the last one.
    fn exists_path(&mut self, scope: &mut Scope<'a>, path: &Path, predicate: Option<&stmt::Expr>) -> Result<sql::Select> {
        let resolved = self.resolve_path(scope, path)?;
        self.exists_resolved(resolved, path, predicate)
    }

    fn exists_resolved(&mut self, resolved: Resolved<'a>, path: &Path, predicate: Option<&stmt::Expr>) -> Result<sql::Select> {
        let (anchor, element, association, filter, rest) = match resolved {
            Resolved::ToMany {
                anchor,
                element,
                association,
                filter,
                rest,
            } => (anchor, element, association, filter, rest),
            Resolved::Association {
                anchor,
                element,
                association,
                filter,
            } => (anchor, element, association, filter, Path { segments: vec![] }),
            _ => {
                return Err(Error::unsupported_construct(format!(
                    "exists on `{path}`, which does not end on an association"
                )))
            }
        };

        let target = self.schema.target_of(association)?;
        let alias = self.aliases.fresh(&element.name);

        let mut scope = Scope::single(self.schema, &element.name, &alias, target);
        let mut select = sql::Select::from_table(&target.table, Some(alias.clone()))
            .item(sql::Expr::raw("1"), None);

        let on = self.association_on(&anchor.alias, anchor.entity, &alias, target, element, association)?;
        select.and_filter(on);

        if let Some(filter) = &filter {
            let filter = self.lower_bool(&mut scope, filter)?;
            select.and_filter(filter);
        }

        if rest.is_empty() {
            if let Some(predicate) = predicate {
                let predicate = self.lower_bool(&mut scope, predicate)?;
                select.and_filter(predicate);
            }
        } else {
            let target_anchor = Anchor {
                alias,
                entity: target,
                prefix: String::new(),
            };
            let resolved = self.walk(&mut scope, target_anchor, &rest, 0)?;
            let nested = self.exists_resolved(resolved, path, predicate)?;
            select.and_filter(sql::Expr::exists(nested, false));
        }

        scope.finish(&mut select);

        tracing::trace!(path = %path, "association path lowered to a correlated exists");

        Ok(select)
    }

    fn lower_in_list(&mut self, scope: &mut Scope<'a>, in_list: &stmt::ExprInList) -> Result<Lowered> {
        let lowered = self.lower_expr(scope, &in_list.expr)?;

        let items = match &*in_list.list {
            stmt::Expr::Stmt(select) => {
                let (query, _) = self.select(Some(scope), select)?;
                return Ok(boolean(sql::Expr::InSubquery {
                    expr: Box::new(lowered.expr),
                    query: Box::new(query),
                    negate: in_list.negate,
                }));
            }
            stmt::Expr::List(items) => items.clone(),
            stmt::Expr::Value(stmt::Value::List(values)) => {
                values.iter().cloned().map(stmt::Expr::Value).collect()
            }
            other => {
                return Err(Error::unsupported_construct(format!(
                    "`in` over {other:?}; expected a list or a sub-select"
                )))
            }
        };

        // `x in ()` is never true
        if items.is_empty() {
            let always = if in_list.negate { "1 = 1" } else { "1 = 0" };
            return Ok(boolean(sql::Expr::raw(always)));
        }

        let mut list = vec![];
        for item in &items {
            let mut item = self.lower_expr(scope, item)?;
            self.hint(&mut item, lowered.ty.as_ref());
            list.push(item.expr);
        }

        Ok(boolean(sql::Expr::InList {
            expr: Box::new(lowered.expr),
            list,
            negate: in_list.negate,
        }))
    }

    /// `search` terms: every term must match one searchable element,
    /// case-insensitively.
    fn search(&mut self, scope: &mut Scope<'a>, terms: &[String]) -> Result<sql::Expr> {
        let Some((source, entity)) = scope.entity_sources().next() else {
            return Err(Error::unsupported_construct("search needs an entity source"));
        };
        let qualifier = source.alias.clone();

        let elements = entity.searchable();
        if elements.is_empty() {
            tracing::debug!(entity = %entity.name, "no searchable elements; search matches nothing");
            return Ok(sql::Expr::raw("1 = 0"));
        }

        let mut per_term = vec![];
        for term in terms {
            let mut alternatives = vec![];
            for element in &elements {
                let column = self.lower_element(scope, &qualifier, entity, element)?;
                alternatives.push(sql::Expr::func(
                    "contains",
                    vec![
                        sql::Expr::func("tolower", vec![column.expr]),
                        sql::Expr::func("tolower", vec![sql::Expr::typed(term.as_str(), None)]),
                    ],
                ));
            }
            per_term.push(sql::Expr::or_all(alternatives));
        }

        Ok(sql::Expr::and_all(per_term))
    }

    fn lower_order_expr(&mut self, scope: &mut Scope<'a>, expr: &stmt::Expr, fields: &[Field]) -> Result<sql::Expr> {
        match self.lower_expr(scope, expr) {
            Ok(lowered) => Ok(lowered.expr),
            // Ordering by the alias of an output column
            Err(err) if err.is_unknown_reference() => match expr {
                stmt::Expr::Ref(path) if path.len() == 1 && fields.iter().any(|field| field.name == path.first()) => {
                    Ok(sql::Expr::bare_column(path.first()))
                }
                _ => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    fn lower_limit(&mut self, scope: &mut Scope<'a>, limit: &stmt::Limit) -> Result<sql::Limit> {
        let mut lower = |this: &mut Self, expr: &Option<stmt::Expr>| -> Result<Option<sql::Expr>> {
            match expr {
                Some(expr) => {
                    let mut lowered = this.lower_expr(scope, expr)?;
                    this.hint(&mut lowered, Some(&BuiltinType::Int64));
                    Ok(Some(lowered.expr))
                }
                None => Ok(None),
            }
        };

        Ok(sql::Limit {
            rows: lower(self, &limit.rows)?,
            offset: lower(self, &limit.offset)?,
        })
    }

    /// Gives an untyped side of a comparison the type of the other side.
    fn unify(&mut self, lhs: &mut Lowered, rhs: &mut Lowered) {
        let (lhs_ty, rhs_ty) = (lhs.ty.clone(), rhs.ty.clone());
        self.hint(lhs, rhs_ty.as_ref());
        self.hint(rhs, lhs_ty.as_ref());
    }

    pub(crate) fn hint(&mut self, lowered: &mut Lowered, ty: Option<&BuiltinType>) {
        if lowered.ty.is_some() {
            return;
        }

        let Some(ty) = ty else {
            return;
        };

        self.hint_expr(&mut lowered.expr, ty);
        lowered.ty = Some(ty.clone());
    }

    fn hint_expr(&mut self, expr: &mut sql::Expr, ty: &BuiltinType) {
        match expr {
            sql::Expr::Value(typed) if typed.ty.is_none() => typed.ty = Some(ty.clone()),
            sql::Expr::Arg(arg) => {
                if self.arg_types.len() <= arg.index {
                    self.arg_types.resize(arg.index + 1, None);
                }
                self.arg_types[arg.index].get_or_insert_with(|| ty.clone());
            }
            sql::Expr::Tuple(items) => {
                for item in items {
                    self.hint_expr(item, ty);
                }
            }
            _ => {}
        }
    }
}

/// Orders parts into the select list. Fields keep the requested order and
/// point at their column.
fn assemble(parts: Vec<Part>, order: Order) -> (Vec<sql::SelectItem>, Vec<Field>) {
    // The first mention of a name wins
    let mut seen = std::collections::HashSet::new();
    let parts: Vec<Part> = parts
        .into_iter()
        .filter(|part| seen.insert(part.field.name.clone()))
        .collect();

    let mut sorted: Vec<usize> = (0..parts.len()).collect();
    if order == Order::Canonical {
        sorted.sort_by(|&a, &b| parts[a].key.cmp(&parts[b].key));
    }

    let mut positions = vec![0; parts.len()];
    for (position, &index) in sorted.iter().enumerate() {
        positions[index] = position;
    }

    let mut items: Vec<Option<sql::SelectItem>> = vec![None; parts.len()];
    let mut fields = Vec::with_capacity(parts.len());

    for (index, part) in parts.into_iter().enumerate() {
        items[positions[index]] = Some(part.item);
        fields.push(Field {
            position: positions[index],
            ..part.field
        });
    }

    (items.into_iter().flatten().collect(), fields)
}

fn call(name: &str, args: Vec<Lowered>) -> Lowered {
    let ty = func_type(name, &args);
    Lowered {
        expr: sql::Expr::func(name, args.into_iter().map(|arg| arg.expr).collect()),
        ty,
    }
}

/// Result type of the portable functions.
fn func_type(name: &str, args: &[Lowered]) -> Option<BuiltinType> {
    use BuiltinType::*;

    match name {
        "count" | "countdistinct" => Some(Int64),
        "contains" | "startswith" | "endswith" => Some(Boolean),
        "indexof" | "length" | "year" | "month" | "day" | "hour" | "minute" | "second" => Some(Int32),
        "concat" | "tolower" | "toupper" | "trim" | "substring" => Some(LargeString),
        "min" | "max" | "sum" | "coalesce" => args.iter().find_map(|arg| arg.ty.clone()),
        "avg" => Some(Double),
        "current_date" => Some(Date),
        _ => None,
    }
}

fn boolean(expr: sql::Expr) -> Lowered {
    Lowered {
        expr,
        ty: Some(BuiltinType::Boolean),
    }
}

/// Elements a wildcard selects.
fn in_wildcard(element: &Element) -> bool {
    match &element.ty {
        ElementTy::Calculated(_) => !element.is_virtual && !element.persistence_skip(),
        _ => element.is_column(),
    }
}

/// Output name of an unaliased column.
fn default_name(expr: &stmt::Expr, position: usize) -> String {
    match expr {
        stmt::Expr::Ref(path) => path.names().collect::<Vec<_>>().join("_"),
        stmt::Expr::Func(func) => func.name.clone(),
        _ => format!("column_{}", position + 1),
    }
}

/// Declaration index of the element a column names, for canonical order.
fn sort_index(scope: &Scope<'_>, expr: &stmt::Expr) -> usize {
    match expr {
        stmt::Expr::Ref(path) => path_index(scope, path),
        _ => usize::MAX,
    }
}

fn path_index(scope: &Scope<'_>, path: &Path) -> usize {
    let Some((source, entity)) = scope.entity_sources().next() else {
        return usize::MAX;
    };

    let name = match path.segments.as_slice() {
        [first, second, ..] if first.name == source.name => &second.name,
        [first, ..] => &first.name,
        [] => return usize::MAX,
    };

    element_index(entity, name)
}

fn element_index(entity: &Entity, name: &str) -> usize {
    entity.elements.get_index_of(name).unwrap_or(usize::MAX)
}

/// Key columns of `entity`, unqualified, as one operand.
pub(crate) fn key_tuple(entity: &Entity) -> sql::Expr {
    match entity.keys.as_slice() {
        [key] => sql::Expr::bare_column(key),
        keys => sql::Expr::Tuple(keys.iter().map(sql::Expr::bare_column).collect()),
    }
}

/// Last segment of a qualified entity name.
pub(crate) fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}
