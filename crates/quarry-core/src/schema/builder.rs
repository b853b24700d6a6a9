use super::*;
use crate::stmt::Expr;

use serde_json::Value as Json;
use std::collections::HashSet;

/// Assembles a [`Schema`] from entity declarations.
///
/// Types are resolved, foreign keys generated and backlinks matched in
/// [`Builder::build`], so declarations may appear in any order.
#[derive(Debug, Default)]
pub struct Builder {
    types: IndexMap<String, TypeDef>,
    entities: Vec<EntityBuilder>,
}

#[derive(Debug)]
pub struct EntityBuilder {
    name: String,
    elements: Vec<ElementDef>,
    annotations: Annotations,
}

/// Declaration of a single element.
#[derive(Debug, Clone)]
pub struct ElementDef {
    name: String,
    kind: DefKind,
    key: bool,
    is_virtual: bool,
    localized: bool,
    not_null: bool,
    auto: Option<AutoStrategy>,
    annotations: Annotations,
}

#[derive(Debug, Clone)]
enum DefKind {
    Primitive(TypeRef),
    Calculated(Expr, TypeRef),
    Association {
        target: String,
        cardinality: Cardinality,
        composition: bool,
        on: OnDef,
    },
}

#[derive(Debug, Clone)]
enum OnDef {
    Managed,
    Backlink(String),
    Condition(Expr),
}

/// Locale key of generated texts entities
const LOCALE: &str = "locale";

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Declares a named type.
    pub fn ty(mut self, name: impl Into<String>, def: impl Into<TypeDef>) -> Builder {
        self.types.insert(name.into(), def.into());
        self
    }

    /// Declares a named type as an alias of another named type.
    pub fn alias(mut self, name: impl Into<String>, of: impl Into<String>) -> Builder {
        self.types.insert(name.into(), TypeDef::Alias(of.into()));
        self
    }

    pub fn entity(
        mut self,
        name: impl Into<String>,
        f: impl FnOnce(EntityBuilder) -> EntityBuilder,
    ) -> Builder {
        let entity = EntityBuilder {
            name: name.into(),
            elements: vec![],
            annotations: Annotations::default(),
        };
        self.entities.push(f(entity));
        self
    }

    pub fn build(self) -> Result<Schema> {
        let mut seen = HashSet::new();
        for entity in &self.entities {
            if !seen.insert(entity.name.as_str()) {
                crate::bail!("entity `{}` declared twice", entity.name);
            }
        }

        let mut entities = IndexMap::new();

        for def in &self.entities {
            let entity = self.build_entity(def)?;

            if let Some(texts) = self.build_texts(def, &entity)? {
                entities.insert(entity.name.clone(), entity);
                entities.insert(texts.name.clone(), texts);
            } else {
                entities.insert(entity.name.clone(), entity);
            }
        }

        Ok(Schema {
            entities,
            types: self.types,
        })
    }

    fn build_entity(&self, def: &EntityBuilder) -> Result<Entity> {
        let mut elements = IndexMap::new();
        let mut keys = vec![];

        let declared: HashSet<&str> = def.elements.iter().map(|e| e.name.as_str()).collect();

        for element in &def.elements {
            let ty = match &element.kind {
                DefKind::Primitive(ty) => ElementTy::Primitive(self.resolve_type(ty)?),
                DefKind::Calculated(expr, ty) => ElementTy::Calculated(Calculated {
                    expr: expr.clone(),
                    ty: self.resolve_type(ty)?,
                }),
                DefKind::Association {
                    target,
                    cardinality,
                    composition,
                    on,
                } => {
                    let target_def = self.entity_def(target, &def.name)?;

                    let on = match on {
                        OnDef::Managed => {
                            let target_keys = self.flat_keys(target_def, &mut vec![])?;
                            let mut pairs = vec![];

                            for (target_key, key_ty) in target_keys {
                                let fk = format!("{}_{}", element.name, target_key);
                                pairs.push(KeyPair {
                                    source: fk.clone(),
                                    target: target_key,
                                });

                                // An explicit declaration of the foreign key wins
                                if declared.contains(fk.as_str()) {
                                    continue;
                                }

                                fk_elements(&mut elements, &mut keys, element, fk, key_ty);
                            }

                            AssociationOn::ForeignKey(pairs)
                        }
                        OnDef::Backlink(via) => {
                            let via_def = target_def
                                .elements
                                .iter()
                                .find(|e| e.name == *via)
                                .ok_or_else(|| {
                                    Error::unknown_reference(
                                        format!("{}.{via}", element.name),
                                        via,
                                        target,
                                    )
                                })?;

                            match &via_def.kind {
                                DefKind::Association {
                                    target: back,
                                    on: OnDef::Managed,
                                    ..
                                } if *back == def.name => {}
                                _ => crate::bail!(
                                    "backlink `{via}` of `{}.{}` is not a managed association to `{}`",
                                    def.name,
                                    element.name,
                                    def.name
                                ),
                            }

                            let pairs = self
                                .flat_keys(def, &mut vec![])?
                                .into_iter()
                                .map(|(key, _)| KeyPair {
                                    target: format!("{via}_{key}"),
                                    source: key,
                                })
                                .collect();

                            AssociationOn::Backlink {
                                via: via.clone(),
                                pairs,
                            }
                        }
                        OnDef::Condition(expr) => AssociationOn::Condition(expr.clone()),
                    };

                    // Keep the association ahead of its generated foreign keys
                    let association = Element {
                        name: element.name.clone(),
                        ty: ElementTy::Association(Association {
                            target: target.clone(),
                            cardinality: *cardinality,
                            composition: *composition,
                            on,
                        }),
                        key: false,
                        is_virtual: element.is_virtual,
                        localized: false,
                        not_null: element.not_null,
                        auto: None,
                        foreign_key_of: None,
                        annotations: element.annotations.clone(),
                    };

                    let position = elements
                        .iter()
                        .position(|(_, e): (&String, &Element)| {
                            e.foreign_key_of.as_deref() == Some(element.name.as_str())
                        })
                        .unwrap_or(elements.len());
                    elements.shift_insert(position, element.name.clone(), association);
                    continue;
                }
            };

            if element.key {
                keys.push(element.name.clone());
            }

            elements.insert(
                element.name.clone(),
                Element {
                    name: element.name.clone(),
                    ty,
                    key: element.key,
                    is_virtual: element.is_virtual,
                    localized: element.localized,
                    not_null: element.not_null || element.key,
                    auto: element.auto,
                    foreign_key_of: None,
                    annotations: element.annotations.clone(),
                },
            );
        }

        let has_localized = elements.values().any(|e: &Element| e.localized);

        Ok(Entity {
            table: table_name(&def.name),
            texts: has_localized.then(|| texts_name(&def.name)),
            name: def.name.clone(),
            elements,
            keys,
            annotations: def.annotations.clone(),
        })
    }

    /// Generates `<Entity>.texts`: keyed by locale plus the entity keys,
    /// holding one column per localized element.
    fn build_texts(&self, def: &EntityBuilder, entity: &Entity) -> Result<Option<Entity>> {
        let Some(name) = &entity.texts else {
            return Ok(None);
        };

        let mut elements = IndexMap::new();
        let mut keys = vec![LOCALE.to_string()];

        elements.insert(
            LOCALE.to_string(),
            plain_element(LOCALE, BuiltinType::string_of(14), true),
        );

        for (key, ty) in self.flat_keys(def, &mut vec![])? {
            keys.push(key.clone());
            elements.insert(key.clone(), plain_element(&key, ty, true));
        }

        for element in entity.elements.values().filter(|e| e.localized) {
            let ty = element.builtin().cloned().unwrap_or_else(BuiltinType::string);
            elements.insert(element.name.clone(), plain_element(&element.name, ty, false));
        }

        Ok(Some(Entity {
            name: name.clone(),
            table: table_name(name),
            elements,
            keys,
            texts: None,
            annotations: Annotations::default(),
        }))
    }

    fn entity_def(&self, name: &str, scope: &str) -> Result<&EntityBuilder> {
        self.entities
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| Error::unknown_reference(name, name, scope))
    }

    /// Key columns of an entity after foreign key generation, in order.
    fn flat_keys(
        &self,
        def: &EntityBuilder,
        stack: &mut Vec<String>,
    ) -> Result<Vec<(String, BuiltinType)>> {
        if stack.contains(&def.name) {
            return Err(Error::invalid_type(
                format!("key of `{}`", def.name),
                "a key that does not reference itself",
            ));
        }

        stack.push(def.name.clone());

        let mut keys = vec![];

        for element in def.elements.iter().filter(|e| e.key) {
            match &element.kind {
                DefKind::Primitive(ty) => keys.push((element.name.clone(), self.resolve_type(ty)?)),
                DefKind::Association {
                    target,
                    on: OnDef::Managed,
                    ..
                } => {
                    let target = self.entity_def(target, &def.name)?;
                    for (key, ty) in self.flat_keys(target, stack)? {
                        keys.push((format!("{}_{key}", element.name), ty));
                    }
                }
                _ => crate::bail!(
                    "key element `{}.{}` must be a primitive or managed association",
                    def.name,
                    element.name
                ),
            }
        }

        stack.pop();
        Ok(keys)
    }

    /// Walks alias chains down to a builtin type.
    fn resolve_type(&self, ty: &TypeRef) -> Result<BuiltinType> {
        let mut name = match ty {
            TypeRef::Builtin(ty) => return Ok(ty.clone()),
            TypeRef::Named(name) => name,
        };

        let mut visited = HashSet::new();

        loop {
            if !visited.insert(name.as_str()) {
                return Err(Error::invalid_type(
                    format!("type `{name}`"),
                    "a builtin type (alias cycle)",
                ));
            }

            match self.types.get(name) {
                Some(TypeDef::Builtin(ty)) => return Ok(ty.clone()),
                Some(TypeDef::Alias(next)) => name = next,
                None => {
                    return Err(Error::invalid_type(
                        format!("type `{name}`"),
                        "a declared type",
                    ))
                }
            }
        }
    }
}

fn fk_elements(
    elements: &mut IndexMap<String, Element>,
    keys: &mut Vec<String>,
    association: &ElementDef,
    fk: String,
    ty: BuiltinType,
) {
    if association.key {
        keys.push(fk.clone());
    }

    elements.insert(
        fk.clone(),
        Element {
            name: fk,
            ty: ElementTy::Primitive(ty),
            key: association.key,
            is_virtual: false,
            localized: false,
            not_null: association.not_null || association.key,
            auto: None,
            foreign_key_of: Some(association.name.clone()),
            annotations: Annotations::default(),
        },
    );
}

fn plain_element(name: &str, ty: BuiltinType, key: bool) -> Element {
    Element {
        name: name.to_string(),
        ty: ElementTy::Primitive(ty),
        key,
        is_virtual: false,
        localized: false,
        not_null: key,
        auto: None,
        foreign_key_of: None,
        annotations: Annotations::default(),
    }
}

fn table_name(entity: &str) -> String {
    entity.replace('.', "_")
}

fn texts_name(entity: &str) -> String {
    format!("{entity}.texts")
}

impl EntityBuilder {
    /// Declares a key element.
    pub fn key(mut self, element: ElementDef) -> EntityBuilder {
        let mut element = element;
        element.key = true;
        self.elements.push(element);
        self
    }

    pub fn element(mut self, element: ElementDef) -> EntityBuilder {
        self.elements.push(element);
        self
    }

    /// Managed to-one association.
    pub fn association(self, name: impl Into<String>, target: impl Into<String>) -> EntityBuilder {
        self.element(ElementDef::association(
            name,
            target,
            Cardinality::ToOne,
            false,
            OnDef::Managed,
        ))
    }

    /// Managed to-one association that is part of the key.
    pub fn key_association(
        self,
        name: impl Into<String>,
        target: impl Into<String>,
    ) -> EntityBuilder {
        self.key(ElementDef::association(
            name,
            target,
            Cardinality::ToOne,
            false,
            OnDef::Managed,
        ))
    }

    /// Managed to-one composition. The foreign key lives on this entity.
    pub fn composition_one(
        self,
        name: impl Into<String>,
        target: impl Into<String>,
    ) -> EntityBuilder {
        self.element(ElementDef::association(
            name,
            target,
            Cardinality::ToOne,
            true,
            OnDef::Managed,
        ))
    }

    /// To-many association matched through the target's managed association
    /// `backlink`.
    pub fn to_many(
        self,
        name: impl Into<String>,
        target: impl Into<String>,
        backlink: impl Into<String>,
    ) -> EntityBuilder {
        self.element(ElementDef::association(
            name,
            target,
            Cardinality::ToMany,
            false,
            OnDef::Backlink(backlink.into()),
        ))
    }

    /// To-many composition matched through the target's managed association
    /// `backlink`.
    pub fn composition_many(
        self,
        name: impl Into<String>,
        target: impl Into<String>,
        backlink: impl Into<String>,
    ) -> EntityBuilder {
        self.element(ElementDef::association(
            name,
            target,
            Cardinality::ToMany,
            true,
            OnDef::Backlink(backlink.into()),
        ))
    }

    /// Unmanaged association with an explicit condition.
    pub fn association_on(
        self,
        name: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
        on: Expr,
    ) -> EntityBuilder {
        self.element(ElementDef::association(
            name,
            target,
            cardinality,
            false,
            OnDef::Condition(on),
        ))
    }

    pub fn calculated(
        self,
        name: impl Into<String>,
        expr: Expr,
        ty: impl Into<TypeRef>,
    ) -> EntityBuilder {
        self.element(ElementDef {
            kind: DefKind::Calculated(expr, ty.into()),
            ..ElementDef::new(name, BuiltinType::string())
        })
    }

    pub fn annotate(mut self, name: impl Into<String>, value: impl Into<Json>) -> EntityBuilder {
        self.annotations.insert(name, value);
        self
    }

    /// Excludes the entity from persistence.
    pub fn persistence_skip(self) -> EntityBuilder {
        self.annotate(PERSISTENCE_SKIP, true)
    }
}

impl ElementDef {
    pub fn new(name: impl Into<String>, ty: impl Into<TypeRef>) -> ElementDef {
        ElementDef {
            name: name.into(),
            kind: DefKind::Primitive(ty.into()),
            key: false,
            is_virtual: false,
            localized: false,
            not_null: false,
            auto: None,
            annotations: Annotations::default(),
        }
    }

    fn association(
        name: impl Into<String>,
        target: impl Into<String>,
        cardinality: Cardinality,
        composition: bool,
        on: OnDef,
    ) -> ElementDef {
        ElementDef {
            kind: DefKind::Association {
                target: target.into(),
                cardinality,
                composition,
                on,
            },
            ..ElementDef::new(name, BuiltinType::string())
        }
    }

    pub fn mark_virtual(mut self) -> ElementDef {
        self.is_virtual = true;
        self
    }

    pub fn localized(mut self) -> ElementDef {
        self.localized = true;
        self
    }

    pub fn not_null(mut self) -> ElementDef {
        self.not_null = true;
        self
    }

    pub fn auto(mut self, strategy: AutoStrategy) -> ElementDef {
        self.auto = Some(strategy);
        self
    }

    pub fn annotate(mut self, name: impl Into<String>, value: impl Into<Json>) -> ElementDef {
        self.annotations.insert(name, value);
        self
    }

    pub fn persistence_skip(self) -> ElementDef {
        self.annotate(PERSISTENCE_SKIP, true)
    }
}

impl From<BuiltinType> for TypeDef {
    fn from(value: BuiltinType) -> Self {
        TypeDef::Builtin(value)
    }
}
