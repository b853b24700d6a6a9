use super::{BuiltinType, Statement};

use quarry_core::schema::Entity;

/// `CREATE TABLE`, used to stand up tables for a model in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: BuiltinType,
    pub not_null: bool,
    pub auto_increment: bool,
}

impl Statement {
    /// Table definition for an entity's persisted columns.
    pub fn create_table(entity: &Entity) -> Statement {
        let columns = entity
            .columns()
            .filter_map(|element| {
                element.builtin().map(|ty| ColumnDef {
                    name: element.name.clone(),
                    ty: ty.clone(),
                    not_null: element.not_null || element.key,
                    auto_increment: element.is_auto_increment(),
                })
            })
            .collect();

        CreateTable {
            name: entity.table.clone(),
            columns,
            primary_key: entity.keys.clone(),
        }
        .into()
    }
}

impl From<CreateTable> for Statement {
    fn from(value: CreateTable) -> Self {
        Statement::CreateTable(value)
    }
}
