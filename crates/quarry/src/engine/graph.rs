use quarry_core::{schema::Entity, Error, Result, Schema};
use std::collections::HashSet;

/// Walks the composition graph from `root` depth first. A composition edge
/// leading back to an entity still on the walk is a cycle; the error names
/// the entities along it, starting and ending with the repeated one.
pub(crate) fn check_acyclic(schema: &Schema, root: &Entity) -> Result<()> {
    let mut walk = Walk {
        schema,
        visited: HashSet::new(),
        stack: vec![],
    };

    walk.visit(root)
}

struct Walk<'a> {
    schema: &'a Schema,

    /// Entities whose compositions are fully explored
    visited: HashSet<&'a str>,

    /// Entities on the current path, in order
    stack: Vec<&'a str>,
}

impl<'a> Walk<'a> {
    fn visit(&mut self, entity: &'a Entity) -> Result<()> {
        if let Some(start) = self.stack.iter().position(|name| *name == entity.name) {
            let mut path: Vec<String> = self.stack[start..].iter().map(|name| name.to_string()).collect();
            path.push(entity.name.clone());

            tracing::debug!(cycle = ?path, "composition cycle");
            return Err(Error::circular_composition(path));
        }

        if !self.visited.insert(&entity.name) {
            return Ok(());
        }

        self.stack.push(&entity.name);

        for (_, association) in entity.compositions() {
            let target = self.schema.target_of(association)?;
            self.visit(target)?;
        }

        self.stack.pop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quarry_core::schema::{BuiltinType, ElementDef};

    #[test]
    fn tree_is_acyclic() {
        let schema = Schema::builder()
            .entity("Orders", |e| {
                e.key(ElementDef::new("ID", BuiltinType::Int32))
                    .composition_many("items", "Items", "order")
                    .composition_many("notes", "Notes", "order")
            })
            .entity("Items", |e| {
                e.key_association("order", "Orders")
                    .key(ElementDef::new("pos", BuiltinType::Int32))
                    .composition_many("notes", "Notes", "item")
                    .association("item", "Items")
            })
            .entity("Notes", |e| {
                e.key(ElementDef::new("ID", BuiltinType::Int32))
                    .association("order", "Orders")
                    .association("item", "Items")
            })
            .build()
            .unwrap();

        check_acyclic(&schema, schema.entity("Orders").unwrap()).unwrap();
    }

    #[test]
    fn cycle_is_reported_with_its_path() {
        let schema = Schema::builder()
            .entity("A", |e| {
                e.key(ElementDef::new("ID", BuiltinType::Int32))
                    .composition_one("b", "B")
            })
            .entity("B", |e| {
                e.key(ElementDef::new("ID", BuiltinType::Int32))
                    .composition_one("a", "A")
            })
            .build()
            .unwrap();

        let err = check_acyclic(&schema, schema.entity("A").unwrap()).unwrap_err();

        assert!(err.is_circular_composition());
        assert_eq!(err.to_string(), "circular composition: A -> B -> A");
    }
}
