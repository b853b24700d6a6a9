use super::rewrite::Rewriter;

use indexmap::IndexMap;
use quarry_core::{
    schema::{Association, AssociationOn, BuiltinType, Element, ElementTy, Entity},
    stmt::{self, Path, PathSegment},
    Error, Result, Schema,
};
use quarry_sql::stmt as sql;
use std::collections::HashSet;

/// SQL aliases handed out while compiling one statement. Nested sub-selects
/// share the set so every alias is unique across the whole text.
#[derive(Debug, Default)]
pub(crate) struct Aliases {
    used: HashSet<String>,
}

impl Aliases {
    pub(crate) fn fresh(&mut self, base: &str) -> String {
        let base = base.replace('.', "_");

        if self.used.insert(base.clone()) {
            return base;
        }

        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Name resolution state of one `SELECT` level.
#[derive(Debug)]
pub(crate) struct Scope<'a> {
    pub(crate) schema: &'a Schema,

    /// Sources listed in `FROM`, in order
    pub(crate) sources: Vec<Source<'a>>,

    /// Sources of enclosing selects, visible to correlated references
    pub(crate) outer: Vec<Source<'a>>,

    /// Joins added while walking association paths, keyed by the anchor alias
    /// and association name. Reusing an entry is what keeps a path mentioned
    /// twice from joining twice.
    pub(crate) joins: IndexMap<String, JoinEntry<'a>>,

    /// Association conditions are lowered without implicit joins
    pub(crate) allow_joins: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Source<'a> {
    /// Name references use to qualify a path
    pub(crate) name: String,

    /// SQL alias
    pub(crate) alias: String,

    pub(crate) kind: SourceKind<'a>,
}

#[derive(Debug, Clone)]
pub(crate) enum SourceKind<'a> {
    Entity(&'a Entity),

    /// Derived table with its output columns
    Derived(Vec<(String, Option<BuiltinType>)>),
}

#[derive(Debug)]
pub(crate) struct JoinEntry<'a> {
    pub(crate) alias: String,
    pub(crate) target: &'a Entity,
    pub(crate) kind: sql::JoinKind,
    pub(crate) on: sql::Expr,
}

/// Where a path walk currently stands: an entity row reachable under an alias.
#[derive(Debug, Clone)]
pub(crate) struct Anchor<'a> {
    pub(crate) alias: String,
    pub(crate) entity: &'a Entity,

    /// Association names walked from the source, joined by `_`. Empty at the
    /// source itself.
    pub(crate) prefix: String,
}

/// What a path refers to.
#[derive(Debug)]
pub(crate) enum Resolved<'a> {
    /// A persisted element
    Column {
        qualifier: String,
        entity: &'a Entity,
        element: &'a Element,
    },

    /// A column of a derived table
    Derived {
        qualifier: String,
        name: String,
        ty: Option<BuiltinType>,
    },

    Calculated {
        anchor: Anchor<'a>,
        element: &'a Element,
    },

    /// The path ends on a to-one association
    Association {
        anchor: Anchor<'a>,
        element: &'a Element,
        association: &'a Association,
        filter: Option<stmt::Expr>,
    },

    /// The walk reached a to-many association. `rest` holds the segments
    /// after it.
    ToMany {
        anchor: Anchor<'a>,
        element: &'a Element,
        association: &'a Association,
        filter: Option<stmt::Expr>,
        rest: Path,
    },
}

impl<'a> Scope<'a> {
    pub(crate) fn new(schema: &'a Schema) -> Scope<'a> {
        Scope {
            schema,
            sources: vec![],
            outer: vec![],
            joins: IndexMap::new(),
            allow_joins: true,
        }
    }

    /// Scope of a sub-select that may reference the sources of `parent`.
    pub(crate) fn nested(parent: &Scope<'a>) -> Scope<'a> {
        let mut outer = parent.sources.clone();
        outer.extend(parent.outer.iter().cloned());

        Scope {
            outer,
            ..Scope::new(parent.schema)
        }
    }

    /// Scope with a single entity source, used for association conditions,
    /// calculated elements and path filters.
    pub(crate) fn single(
        schema: &'a Schema,
        name: impl Into<String>,
        alias: impl Into<String>,
        entity: &'a Entity,
    ) -> Scope<'a> {
        let mut scope = Scope::new(schema);
        scope.sources.push(Source::entity(name, alias, entity));
        scope
    }

    /// Entity sources of this level, in `FROM` order.
    pub(crate) fn entity_sources(&self) -> impl Iterator<Item = (&Source<'a>, &'a Entity)> + '_ {
        self.sources.iter().filter_map(|source| match source.kind {
            SourceKind::Entity(entity) => Some((source, entity)),
            SourceKind::Derived(_) => None,
        })
    }

    /// Appends the joins collected while resolving to `select`.
    pub(crate) fn finish(self, select: &mut sql::Select) {
        for (_, entry) in self.joins {
            select.add_join(sql::Join {
                kind: entry.kind,
                relation: sql::TableFactor::table(&entry.target.table, entry.alias),
                on: entry.on,
            });
        }
    }
}

impl<'a> Source<'a> {
    pub(crate) fn entity(
        name: impl Into<String>,
        alias: impl Into<String>,
        entity: &'a Entity,
    ) -> Source<'a> {
        Source {
            name: name.into(),
            alias: alias.into(),
            kind: SourceKind::Entity(entity),
        }
    }

    fn has(&self, name: &str) -> bool {
        match &self.kind {
            SourceKind::Entity(entity) => entity.element(name).is_some(),
            SourceKind::Derived(columns) => columns.iter().any(|(column, _)| column == name),
        }
    }

    fn describe(&self) -> &str {
        match &self.kind {
            SourceKind::Entity(entity) => &entity.name,
            SourceKind::Derived(_) => &self.name,
        }
    }
}

impl<'a> Rewriter<'a> {
    /// Resolves a reference against the sources of `scope`, adding a join for
    /// every to-one association it walks through.
    pub(crate) fn resolve_path(&mut self, scope: &mut Scope<'a>, path: &Path) -> Result<Resolved<'a>> {
        if path.is_empty() {
            return Err(Error::unknown_reference("", "", "query"));
        }

        let source = self.path_source(scope, path)?;

        match source.kind {
            SourceKind::Entity(entity) => {
                let start = if source.explicit { 1 } else { 0 };
                let anchor = Anchor {
                    alias: source.alias,
                    entity,
                    prefix: String::new(),
                };
                self.walk(scope, anchor, path, start)
            }
            SourceKind::Derived(columns) => {
                let name = if source.explicit {
                    if path.len() != 2 {
                        return Err(Error::unknown_reference(
                            path.to_string(),
                            path.segments[path.len() - 1].name.clone(),
                            source.name,
                        ));
                    }
                    &path.segments[1].name
                } else {
                    if path.len() != 1 {
                        return Err(Error::unsupported_construct(format!(
                            "path `{path}` navigates from a derived table"
                        )));
                    }
                    &path.segments[0].name
                };

                let ty = columns
                    .iter()
                    .find(|(column, _)| column == name)
                    .map(|(_, ty)| ty.clone())
                    .ok_or_else(|| Error::unknown_reference(path.to_string(), name, &source.name))?;

                Ok(Resolved::Derived {
                    qualifier: source.alias,
                    name: name.clone(),
                    ty,
                })
            }
        }
    }

    /// Walks `path` from `start` on, beginning at `anchor`.
    pub(crate) fn walk(
        &mut self,
        scope: &mut Scope<'a>,
        mut anchor: Anchor<'a>,
        path: &Path,
        start: usize,
    ) -> Result<Resolved<'a>> {
        let mut i = start;

        loop {
            let Some(segment) = path.segments.get(i) else {
                return Err(Error::unknown_reference(path.to_string(), "", &anchor.entity.name));
            };
            let last = i + 1 == path.len();

            let element = anchor.entity.element(&segment.name).ok_or_else(|| {
                Error::unknown_reference(path.to_string(), &segment.name, &anchor.entity.name)
            })?;

            match &element.ty {
                ElementTy::Primitive(_) | ElementTy::Calculated(_) => {
                    if !last {
                        return Err(Error::unknown_reference(
                            path.to_string(),
                            &path.segments[i + 1].name,
                            &element.name,
                        ));
                    }

                    if segment.filter.is_some() {
                        return Err(Error::unsupported_construct(format!(
                            "filter on element `{}`, which is not an association",
                            element.name
                        )));
                    }

                    return Ok(match element.ty {
                        ElementTy::Calculated(_) => Resolved::Calculated { anchor, element },
                        _ => Resolved::Column {
                            qualifier: anchor.alias,
                            entity: anchor.entity,
                            element,
                        },
                    });
                }
                ElementTy::Association(association) => {
                    let filter = segment.filter.as_deref().cloned();

                    if association.is_to_many() {
                        return Ok(Resolved::ToMany {
                            anchor,
                            element,
                            association,
                            filter,
                            rest: Path {
                                segments: path.segments[i + 1..].to_vec(),
                            },
                        });
                    }

                    if last {
                        return Ok(Resolved::Association {
                            anchor,
                            element,
                            association,
                            filter,
                        });
                    }

                    // `author.ID` reads the foreign key without a join
                    if let Some(fk) = foreign_key_shortcut(anchor.entity, association, segment, &path.segments[i + 1]) {
                        if i + 2 == path.len() {
                            return Ok(Resolved::Column {
                                qualifier: anchor.alias,
                                entity: anchor.entity,
                                element: fk,
                            });
                        }
                    }

                    anchor = self.join_to_one(scope, &anchor, element, association, filter.as_ref())?;
                    i += 1;
                }
            }
        }
    }

    /// Joins the target of a to-one association, reusing an existing join for
    /// the same anchor, association and filter.
    pub(crate) fn join_to_one(
        &mut self,
        scope: &mut Scope<'a>,
        anchor: &Anchor<'a>,
        element: &'a Element,
        association: &'a Association,
        filter: Option<&stmt::Expr>,
    ) -> Result<Anchor<'a>> {
        if !scope.allow_joins {
            return Err(Error::unsupported_construct(format!(
                "navigation through `{}` inside an association condition",
                element.name
            )));
        }

        let mut key = format!("{}.{}", anchor.alias, element.name);
        if let Some(filter) = filter {
            key.push_str(&format!("[{filter:?}]"));
        }

        let prefix = if anchor.prefix.is_empty() {
            element.name.clone()
        } else {
            format!("{}_{}", anchor.prefix, element.name)
        };

        if let Some(entry) = scope.joins.get(&key) {
            tracing::trace!(association = %element.name, alias = %entry.alias, "reusing join");
            return Ok(Anchor {
                alias: entry.alias.clone(),
                entity: entry.target,
                prefix,
            });
        }

        let target = self.schema.target_of(association)?;
        let alias = self.aliases.fresh(&prefix);

        let mut on = self.association_on(&anchor.alias, anchor.entity, &alias, target, element, association)?;

        if let Some(filter) = filter {
            let mut filter_scope = Scope::single(self.schema, &element.name, &alias, target);
            filter_scope.allow_joins = false;
            let filter = self.lower_expr(&mut filter_scope, filter)?;
            on = sql::Expr::and_all([on, filter.expr]);
        }

        tracing::trace!(association = %element.name, alias = %alias, target = %target.name, "joining association");

        scope.joins.insert(
            key,
            JoinEntry {
                alias: alias.clone(),
                target,
                kind: sql::JoinKind::Left,
                on,
            },
        );

        Ok(Anchor {
            alias,
            entity: target,
            prefix,
        })
    }

    /// Condition matching source rows under `source_alias` to target rows
    /// under `target_alias`.
    pub(crate) fn association_on(
        &mut self,
        source_alias: &str,
        source: &'a Entity,
        target_alias: &str,
        target: &'a Entity,
        element: &Element,
        association: &Association,
    ) -> Result<sql::Expr> {
        match &association.on {
            AssociationOn::ForeignKey(pairs) | AssociationOn::Backlink { pairs, .. } => {
                Ok(sql::Expr::and_all(pairs.iter().map(|pair| {
                    sql::Expr::eq(
                        sql::Expr::column(target_alias, &pair.target),
                        sql::Expr::column(source_alias, &pair.source),
                    )
                })))
            }
            AssociationOn::Condition(condition) => {
                let mut scope = Scope::new(self.schema);
                scope.sources.push(Source::entity("$self", source_alias, source));
                scope.sources.push(Source::entity(&element.name, target_alias, target));
                scope.allow_joins = false;

                Ok(self.lower_expr(&mut scope, condition)?.expr)
            }
        }
    }

    /// Joins the texts entity of a localized entity for the active locale.
    /// Returns the alias of the texts row.
    pub(crate) fn texts_join(
        &mut self,
        scope: &mut Scope<'a>,
        qualifier: &str,
        entity: &'a Entity,
    ) -> Result<Option<String>> {
        let Some(texts) = &entity.texts else {
            return Ok(None);
        };

        if !self.locale || !scope.allow_joins {
            return Ok(None);
        }

        let key = format!("{qualifier}#texts");
        if let Some(entry) = scope.joins.get(&key) {
            return Ok(Some(entry.alias.clone()));
        }

        let texts = self.schema.entity(texts)?;
        let alias = self.aliases.fresh(&format!("{qualifier}_texts"));

        let mut conditions = vec![sql::Expr::eq(
            sql::Expr::column(&alias, "locale"),
            sql::Expr::Locale,
        )];
        conditions.extend(entity.keys.iter().map(|key| {
            sql::Expr::eq(sql::Expr::column(&alias, key), sql::Expr::column(qualifier, key))
        }));

        tracing::trace!(entity = %entity.name, alias = %alias, "joining localized texts");

        scope.joins.insert(
            key,
            JoinEntry {
                alias: alias.clone(),
                target: texts,
                kind: sql::JoinKind::Left,
                on: sql::Expr::and_all(conditions),
            },
        );

        Ok(Some(alias))
    }

    /// Finds the source a path starts from.
    fn path_source(&self, scope: &Scope<'a>, path: &Path) -> Result<PathSource<'a>> {
        let first = path.first();

        // An explicit source qualifier, `Books.title`
        if path.len() > 1 {
            let qualified = scope
                .sources
                .iter()
                .chain(scope.outer.iter())
                .find(|source| source.name == first);

            if let Some(source) = qualified {
                return Ok(PathSource::from_source(source, true));
            }
        }

        for sources in [&scope.sources, &scope.outer] {
            let matches: Vec<_> = sources.iter().filter(|source| source.has(first)).collect();

            match matches.len() {
                0 => continue,
                1 => return Ok(PathSource::from_source(matches[0], false)),
                _ => {
                    return Err(Error::ambiguous_reference(
                        first,
                        matches.iter().map(|source| source.name.clone()).collect(),
                    ))
                }
            }
        }

        let described = scope
            .sources
            .iter()
            .map(Source::describe)
            .collect::<Vec<_>>()
            .join(", ");

        Err(Error::unknown_reference(path.to_string(), first, described))
    }
}

struct PathSource<'a> {
    name: String,
    alias: String,
    kind: SourceKind<'a>,

    /// The first path segment names the source
    explicit: bool,
}

impl<'a> PathSource<'a> {
    fn from_source(source: &Source<'a>, explicit: bool) -> PathSource<'a> {
        PathSource {
            name: source.name.clone(),
            alias: source.alias.clone(),
            kind: source.kind.clone(),
            explicit,
        }
    }
}

/// The foreign key element read by `<association>.<target key>` on a managed
/// association, when the segment carries no filter.
fn foreign_key_shortcut<'a>(
    entity: &'a Entity,
    association: &Association,
    segment: &PathSegment,
    next: &PathSegment,
) -> Option<&'a Element> {
    let AssociationOn::ForeignKey(pairs) = &association.on else {
        return None;
    };

    if segment.filter.is_some() || next.filter.is_some() {
        return None;
    }

    pairs
        .iter()
        .find(|pair| pair.target == next.name)
        .and_then(|pair| entity.element(&pair.source))
}
