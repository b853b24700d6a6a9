use super::*;

use pretty_assertions::assert_eq;
use quarry_sql::{
    serializer::{JsonExpand, LockTarget, UpsertSyntax},
    Flavor, Sqlite,
};
use quarry_core::{
    schema::{AutoStrategy, BuiltinType, ElementDef},
    stmt::{Expr, Path, ValueRecord},
    Dialect,
};

fn bookshop() -> Schema {
    Schema::builder()
        .entity("Books", |e| {
            e.key(ElementDef::new("ID", BuiltinType::Int32))
                .element(ElementDef::new("title", BuiltinType::string()))
                .element(ElementDef::new("rating", BuiltinType::Int32).mark_virtual())
                .element(ElementDef::new("draft", BuiltinType::string()).persistence_skip())
                .association("author", "Authors")
                .composition_many("chapters", "Chapters", "book")
        })
        .entity("Authors", |e| {
            e.key(ElementDef::new("ID", BuiltinType::Int32))
                .element(ElementDef::new("name", BuiltinType::string()))
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
        })
        .entity("Orders", |e| {
            e.key(ElementDef::new("ID", BuiltinType::Uuid).auto(AutoStrategy::Uuid))
                .composition_many("items", "Items", "order")
        })
        .entity("Items", |e| {
            e.key(ElementDef::new("ID", BuiltinType::Int64).auto(AutoStrategy::Increment))
                .association("order", "Orders")
                .element(ElementDef::new("qty", BuiltinType::Int32))
        })
        .build()
        .unwrap()
}

fn plan(schema: &Schema, strict: bool, stmt: impl Into<stmt::Statement>) -> Result<Plan> {
    let registry = Registry::new(Dialect::Sqlite);
    Planner::new(schema, &registry, Serializer::sqlite(), strict).plan(&stmt.into())
}

fn book(id: i32, title: &str, chapters: Vec<Entry>) -> Entry {
    Entry::new()
        .set("ID", id)
        .set("title", title)
        .set("chapters", chapters)
}

fn chapter(no: i32) -> Entry {
    Entry::new().set("no", no).set("title", format!("Chapter {no}"))
}

fn inserts(plan: &Plan) -> Vec<&InsertStep> {
    plan.steps
        .iter()
        .filter_map(|step| match step {
            Step::Insert(step) => Some(step),
            _ => None,
        })
        .collect()
}

fn sql_steps(plan: &Plan) -> Vec<&SqlStep> {
    plan.steps
        .iter()
        .filter_map(|step| match step {
            Step::Sql(step) => Some(step),
            _ => None,
        })
        .collect()
}

#[test]
fn parent_rows_are_inserted_before_children() {
    let schema = bookshop();
    let insert = stmt::Insert::into("Books").entry(book(1, "Emma", vec![chapter(1), chapter(2)]));

    let plan = plan(&schema, false, insert).unwrap();
    let steps = inserts(&plan);

    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].insert.table, "Books");
    assert_eq!(steps[0].insert.columns, ["ID", "title"]);
    assert_eq!(steps[1].insert.table, "Chapters");
    assert_eq!(steps[1].insert.columns, ["book_ID", "no", "title"]);

    // Both chapters take the key of the one book row
    assert_eq!(steps[1].rows.len(), 2);
    for row in &steps[1].rows {
        assert_eq!(
            row.cells[0],
            Cell::KeyOf {
                row: plan.roots[0],
                column: "ID".into()
            }
        );
    }
}

#[test]
fn nested_levels_follow_each_other() {
    let schema = bookshop();
    let chapter = chapter(1).set("pages", vec![Entry::new().set("no", 1), Entry::new().set("no", 2)]);
    let insert = stmt::Insert::into("Books").entry(book(1, "Emma", vec![chapter]));

    let plan = plan(&schema, false, insert).unwrap();
    let tables: Vec<_> = inserts(&plan).iter().map(|step| step.insert.table.as_str()).collect();

    assert_eq!(tables, ["Books", "Chapters", "Pages"]);
}

#[test]
fn sibling_roots_share_a_statement() {
    let schema = bookshop();
    let insert = stmt::Insert::into("Books").entries([book(1, "Emma", vec![]), book(2, "Persuasion", vec![])]);

    let plan = plan(&schema, false, insert).unwrap();

    assert_eq!(plan.roots.len(), 2);
    assert_eq!(inserts(&plan).len(), 1);
    assert_eq!(inserts(&plan)[0].rows.len(), 2);
}

#[test]
fn strict_mode_reports_every_unknown_column() {
    let schema = bookshop();
    let entry = book(1, "Emma", vec![]).set("isbn", "x").set("pages", 3);

    let err = plan(&schema, true, stmt::Insert::into("Books").entry(entry)).unwrap_err();

    assert!(err.is_multiple());
    assert_eq!(err.sub_errors().len(), 2);
    assert!(err.sub_errors().iter().all(|err| err.is_unknown_column()));
}

#[test]
fn lenient_mode_drops_unknown_columns() {
    let schema = bookshop();
    let entry = book(1, "Emma", vec![]).set("isbn", "x");

    let plan = plan(&schema, false, stmt::Insert::into("Books").entry(entry)).unwrap();

    assert_eq!(inserts(&plan)[0].insert.columns, ["ID", "title"]);
}

#[test]
fn skipped_and_virtual_elements_are_accepted_but_not_written() {
    let schema = bookshop();
    let entry = book(1, "Emma", vec![]).set("draft", "x").set("rating", 5);

    let plan = plan(&schema, true, stmt::Insert::into("Books").entry(entry)).unwrap();

    assert_eq!(inserts(&plan)[0].insert.columns, ["ID", "title"]);
}

#[test]
fn conversion_failures_are_collected() {
    let schema = bookshop();
    let entry = Entry::new().set("ID", "one").set("title", "Emma").set("author", Entry::new());

    let err = plan(&schema, false, stmt::Insert::into("Books").entry(entry)).unwrap_err();

    assert!(err.is_multiple());
    assert_eq!(err.sub_errors().len(), 2);
    assert!(err.sub_errors()[0].is_invalid_type());
}

#[test]
fn reference_copies_the_target_key() {
    let schema = bookshop();
    let entry = book(1, "Emma", vec![]).set("author", Entry::new().set("ID", 7));

    let plan = plan(&schema, false, stmt::Insert::into("Books").entry(entry)).unwrap();
    let step = inserts(&plan)[0];

    assert_eq!(step.insert.columns, ["ID", "title", "author_ID"]);
    assert_eq!(step.rows[0].cells[2], Cell::Value(Value::I64(7)));
}

#[test]
fn payload_foreign_key_must_match_the_parent() {
    let schema = bookshop();
    let stray = chapter(1).set("book_ID", 2);
    let insert = stmt::Insert::into("Books").entry(book(1, "Emma", vec![stray]));

    let err = plan(&schema, false, insert).unwrap_err();
    assert!(err.is_invalid_type());
}

#[test]
fn generated_keys() {
    let schema = bookshop();
    let order = Entry::new().set("items", vec![Entry::new().set("qty", 1)]);

    let plan = plan(&schema, false, stmt::Insert::into("Orders").entry(order)).unwrap();
    let steps = inserts(&plan);

    // The order key is generated while planning
    assert_eq!(steps[0].insert.columns, ["ID"]);
    assert!(matches!(steps[0].rows[0].cells[0], Cell::Value(Value::String(_))));

    // The item key comes back from the backend
    assert_eq!(steps[1].insert.columns, ["order_ID", "qty"]);
    assert_eq!(steps[1].insert.returning, ["ID"]);
}

#[test]
fn repeated_key_on_the_composition_path_is_circular() {
    let schema = Schema::builder()
        .entity("Nodes", |e| {
            e.key(ElementDef::new("ID", BuiltinType::Int32))
                .association("parent", "Nodes")
                .composition_many("children", "Nodes", "parent")
        })
        .build()
        .unwrap();

    let node = Entry::new()
        .set("ID", 1)
        .set("children", vec![Entry::new().set("ID", 2).set("children", vec![Entry::new().set("ID", 1)])]);

    let err = plan(&schema, false, stmt::Insert::into("Nodes").entry(node)).unwrap_err();

    assert!(err.is_circular_composition());
}

#[test]
fn rows_source_becomes_entries() {
    let schema = bookshop();
    let insert = stmt::Insert::into("Books").rows(
        ["ID", "title"],
        vec![
            vec![Value::I32(1), Value::from("Emma")],
            vec![Value::I32(2), Value::from("Persuasion")],
        ],
    );

    let short = stmt::Insert::into("Books").rows(["ID", "title"], vec![vec![Value::I32(1)]]);
    assert!(plan(&schema, false, short).unwrap_err().is_invalid_type());

    let plan = plan(&schema, false, insert).unwrap();
    assert_eq!(inserts(&plan)[0].rows.len(), 2);
}

#[test]
fn upsert_overwrites_non_key_columns() {
    let schema = bookshop();
    let upsert = stmt::Insert::into("Books").entry(book(1, "Emma", vec![])).upsert();

    let plan = plan(&schema, false, upsert).unwrap();
    let step = inserts(&plan)[0];

    assert!(!step.replace);
    assert_eq!(
        step.insert.upsert,
        Some(sql::Upsert {
            keys: vec!["ID".into()],
            update_columns: vec!["title".into()],
        })
    );
}

/// SQLite with its upsert support taken away
#[derive(Debug)]
struct WithoutUpsert;

impl Flavor for WithoutUpsert {
    fn dialect(&self) -> Dialect {
        Sqlite.dialect()
    }

    fn is_reserved(&self, upper: &str) -> bool {
        Sqlite.is_reserved(upper)
    }

    fn placeholder(&self, index: usize, dst: &mut String) {
        Sqlite.placeholder(index, dst)
    }

    fn paginate(&self, rows: Option<&str>, offset: Option<&str>) -> Option<String> {
        Sqlite.paginate(rows, offset)
    }

    fn lock_clause(
        &self,
        mode: sql::LockMode,
        wait: sql::LockWait,
        targets: &[LockTarget],
    ) -> Option<String> {
        Sqlite.lock_clause(mode, wait, targets)
    }

    fn native_upsert(&self) -> Option<UpsertSyntax> {
        None
    }

    fn json_expand(&self, expand: &JsonExpand<'_>) -> String {
        Sqlite.json_expand(expand)
    }

    fn column_type(&self, ty: &BuiltinType, auto_increment: bool) -> String {
        Sqlite.column_type(ty, auto_increment)
    }
}

#[test]
fn upsert_without_native_syntax_replaces_rows() {
    let schema = bookshop();
    let registry = Registry::new(Dialect::Sqlite);
    let upsert = stmt::Insert::into("Books").entry(book(1, "Emma", vec![])).upsert();

    let plan = Planner::new(&schema, &registry, Serializer::new(&WithoutUpsert), false)
        .plan(&upsert)
        .unwrap();
    let step = inserts(&plan)[0];

    assert!(step.replace);
    assert_eq!(step.insert.upsert, None);

    let from_select = stmt::Insert::into("Books")
        .select(stmt::Select::from("Authors").columns(["ID"]))
        .upsert();
    let err = Planner::new(&schema, &registry, Serializer::new(&WithoutUpsert), false)
        .plan(&from_select)
        .unwrap_err();
    assert!(err.is_unsupported_construct());
}

#[test]
fn insert_from_select_maps_columns_by_name() {
    let schema = bookshop();
    let select = stmt::Select::from("Authors").columns([
        stmt::Column::aliased(Path::from("name"), "title"),
        stmt::Column::path("ID"),
    ]);

    let plan = plan(&schema, false, stmt::Insert::into("Books").select(select)).unwrap();
    let steps = sql_steps(&plan);

    let sql::Statement::Insert(insert) = &steps[0].stmt else {
        panic!("expected an insert");
    };
    assert_eq!(insert.columns, ["title", "ID"]);
    assert!(steps[0].counts);
}

#[test]
fn delete_removes_compositions_first() {
    let schema = bookshop();
    let delete = stmt::Delete::from("Books").filter(Expr::eq(Path::from("ID"), 1));

    let plan = plan(&schema, false, delete).unwrap();
    let tables: Vec<_> = sql_steps(&plan)
        .iter()
        .map(|step| match &step.stmt {
            sql::Statement::Delete(delete) => delete.table.as_str(),
            _ => panic!("expected a delete"),
        })
        .collect();

    assert_eq!(tables, ["Pages", "Chapters", "Books"]);
    assert_eq!(
        sql_steps(&plan).iter().map(|step| step.counts).collect::<Vec<_>>(),
        [false, false, true]
    );
}

#[test]
fn delete_over_cyclic_compositions_plans_nothing() {
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

    let err = plan(&schema, false, stmt::Delete::from("A")).unwrap_err();
    assert!(err.is_circular_composition());
}

#[test]
fn update_stages_a_composition_diff() {
    let schema = bookshop();
    let update = stmt::Update::entity("Books")
        .filter(Expr::eq(Path::from("ID"), 1))
        .set("title", "Emma")
        .set("chapters", vec![chapter(1)]);

    let plan = plan(&schema, false, update).unwrap();

    let Step::Children(children) = &plan.steps[0] else {
        panic!("expected the children diff first");
    };
    assert_eq!(children.element, "chapters");
    assert!(!children.counts);

    let Step::Sql(step) = &plan.steps[1] else {
        panic!("expected the update");
    };
    assert!(step.counts);
    assert_eq!(step.args, [Value::from("Emma")]);
}

#[test]
fn diff_matches_children_by_key() {
    let schema = bookshop();
    let registry = Registry::new(Dialect::Sqlite);
    let mut planner = Planner::new(&schema, &registry, Serializer::sqlite(), false);

    let step = ChildrenStep {
        entity: "Books".into(),
        filter: None,
        element: "chapters".into(),
        children: vec![chapter(1), chapter(3)],
        counts: false,
    };
    let parent = ValueRecord::new().set("ID", Value::I64(1));
    let stored = |no: i64| ValueRecord::new().set("book_ID", Value::I64(1)).set("no", Value::I64(no));

    let steps = planner
        .plan_children(&step, &parent, vec![stored(1), stored(2)])
        .unwrap();

    let mut updated = vec![];
    let mut deleted = vec![];
    let mut inserted = vec![];

    for step in &steps {
        match step {
            Step::Sql(SqlStep { stmt: sql::Statement::Update(update), .. }) => updated.push(update.table.as_str()),
            Step::Sql(SqlStep { stmt: sql::Statement::Delete(delete), .. }) => deleted.push(delete.table.as_str()),
            Step::Insert(insert) => inserted.push(insert),
            other => panic!("unexpected step {other:?}"),
        }
    }

    // Chapter 1 is updated, chapter 2 deleted with its pages, chapter 3 inserted
    assert_eq!(updated, ["Chapters"]);
    assert_eq!(deleted, ["Pages", "Chapters"]);
    assert_eq!(inserted.len(), 1);
    assert_eq!(inserted[0].rows[0].cells[0], Cell::Value(Value::I64(1)));
}
