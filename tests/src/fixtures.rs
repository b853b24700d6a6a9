//! Models shared by the scenarios.

use quarry::{
    schema::{AutoStrategy, BuiltinType, ElementDef},
    stmt::Entry,
    Schema,
};

/// Authors, books with localized titles, chapters composed of pages, and
/// orders whose items get backend-generated keys.
pub fn bookshop() -> Schema {
    Schema::builder()
        .entity("Authors", |e| {
            e.key(ElementDef::new("ID", BuiltinType::Int32))
                .element(ElementDef::new("name", BuiltinType::string_of(111)))
                .to_many("books", "Books", "author")
        })
        .entity("Books", |e| {
            e.key(ElementDef::new("ID", BuiltinType::Int32))
                .element(ElementDef::new("title", BuiltinType::string_of(111)).localized())
                .element(ElementDef::new("descr", BuiltinType::string_of(1111)))
                .element(ElementDef::new("stock", BuiltinType::Int32))
                .element(ElementDef::new("price", BuiltinType::decimal(9, 2)))
                .association("author", "Authors")
                .composition_many("chapters", "Chapters", "book")
        })
        .entity("Chapters", |e| {
            e.key_association("book", "Books")
                .key(ElementDef::new("no", BuiltinType::Int32))
                .element(ElementDef::new("title", BuiltinType::string()))
                .composition_many("pages", "Pages", "chapter")
        })
        .entity("Pages", |e| {
            e.key_association("chapter", "Chapters")
                .key(ElementDef::new("no", BuiltinType::Int32))
                .element(ElementDef::new("text", BuiltinType::string()))
        })
        .entity("Orders", |e| {
            e.key(ElementDef::new("ID", BuiltinType::Uuid).auto(AutoStrategy::Uuid))
                .element(ElementDef::new("buyer", BuiltinType::string()))
                .composition_many("items", "OrderItems", "order")
        })
        .entity("OrderItems", |e| {
            e.key(ElementDef::new("ID", BuiltinType::Int64).auto(AutoStrategy::Increment))
                .association("order", "Orders")
                .element(ElementDef::new("qty", BuiltinType::Int32))
        })
        .build()
        .expect("bookshop model")
}

/// A self-contained tree, used for composition cycles.
pub fn nodes() -> Schema {
    Schema::builder()
        .entity("Nodes", |e| {
            e.key(ElementDef::new("ID", BuiltinType::Int32))
                .association("parent", "Nodes")
                .composition_many("children", "Nodes", "parent")
        })
        .build()
        .expect("nodes model")
}

pub fn author(id: i32, name: &str) -> Entry {
    Entry::new().set("ID", id).set("name", name)
}

pub fn book(id: i32, title: &str, stock: i32) -> Entry {
    Entry::new().set("ID", id).set("title", title).set("stock", stock)
}

pub fn chapter(no: i32, pages: Vec<Entry>) -> Entry {
    Entry::new()
        .set("no", no)
        .set("title", format!("Chapter {no}"))
        .set("pages", pages)
}

pub fn page(no: i32) -> Entry {
    Entry::new().set("no", no).set("text", format!("page {no}"))
}
