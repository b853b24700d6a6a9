use tests::prelude::*;

use pretty_assertions::assert_eq;

async fn count(db: &Db, entity: &str) -> usize {
    db.select(Select::from(entity).column(Column::wildcard())).await.unwrap().len()
}

async fn explicit_keys_reach_every_level(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;

    let emma = book(1, "Emma", 5).set(
        "chapters",
        vec![chapter(1, vec![page(1), page(2)]), chapter(2, vec![page(1)])],
    );

    let outcome = db.exec(Insert::into("Books").entry(emma)).await.unwrap();
    assert_eq!(outcome.keys.len(), 1);
    assert_eq!(outcome.keys[0]["ID"].as_i64(), Some(1));

    let chapters = db
        .select(Select::from("Chapters").columns(["book_ID", "no"]).order_by(OrderBy::asc("no")))
        .await
        .unwrap();
    assert_eq!(chapters.len(), 2);
    assert!(chapters.iter().all(|chapter| chapter["book_ID"].as_i64() == Some(1)));

    let pages = db
        .select(Select::from("Pages").columns(["chapter_book_ID", "chapter_no", "no"]))
        .await
        .unwrap();
    assert_eq!(pages.len(), 3);
    assert!(pages.iter().all(|page| page["chapter_book_ID"].as_i64() == Some(1)));

    let mut owners: Vec<_> = pages
        .iter()
        .map(|page| (page["chapter_no"].as_i64().unwrap(), page["no"].as_i64().unwrap()))
        .collect();
    owners.sort();
    assert_eq!(owners, [(1, 1), (1, 2), (2, 1)]);
}

async fn generated_keys_reach_the_children(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;

    let order = Entry::new().set("buyer", "Jane").set(
        "items",
        vec![Entry::new().set("qty", 1), Entry::new().set("qty", 2)],
    );

    let outcome = db.exec(Insert::into("Orders").entry(order)).await.unwrap();
    let Value::Uuid(order_id) = outcome.keys[0]["ID"] else {
        panic!("expected a generated UUID key; got {:?}", outcome.keys[0]);
    };

    let items = db
        .select(
            Select::from("OrderItems")
                .columns(["ID", "qty"])
                .filter(Expr::eq(Path::from("order_ID"), order_id))
                .order_by(OrderBy::asc("qty")),
        )
        .await
        .unwrap();

    assert_eq!(items.len(), 2);

    // Backend-generated keys are distinct
    let first = items[0]["ID"].as_i64().unwrap();
    let second = items[1]["ID"].as_i64().unwrap();
    assert_ne!(first, second);
}

async fn reading_children_back_through_an_expand(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;

    db.exec(Insert::into("Books").entry(book(7, "Persuasion", 1).set("chapters", vec![chapter(1, vec![])])))
        .await
        .unwrap();

    let rows = db
        .select(
            Select::from("Books")
                .columns([Column::path("ID"), Column::expand("chapters", [Column::path("no"), Column::path("title")])])
                .filter(Expr::eq(Path::from("ID"), 7)),
        )
        .await
        .unwrap();

    let chapters = rows[0]["chapters"].as_list().unwrap();
    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0].as_record().unwrap()["title"], Value::from("Chapter 1"));
}

async fn composition_cycle_is_rejected_before_any_write(test: &mut DbTest) {
    let db = test.setup_db(nodes()).await;

    db.exec(Insert::into("Nodes").entry(Entry::new().set("ID", 100)))
        .await
        .unwrap();
    let before = count(&db, "Nodes").await;
    test.log().clear();

    let node = Entry::new().set("ID", 1).set(
        "children",
        vec![Entry::new().set("ID", 2).set("children", vec![Entry::new().set("ID", 1)])],
    );

    let err = db.exec(Insert::into("Nodes").entry(node)).await.unwrap_err();
    assert!(err.is_circular_composition(), "{err}");

    // Planning failed, so nothing reached the backend
    assert!(test.log().is_empty());
    assert_eq!(count(&db, "Nodes").await, before);
}

async fn a_failing_child_rolls_back_the_parent(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;

    // Two chapters with the same key collide on the second insert
    let emma = book(1, "Emma", 5).set("chapters", vec![chapter(1, vec![]), chapter(1, vec![])]);

    let err = db.exec(Insert::into("Books").entry(emma)).await.unwrap_err();
    assert!(err.is_entity_already_exists(), "{err}");

    assert_eq!(count(&db, "Books").await, 0);
    assert_eq!(count(&db, "Chapters").await, 0);
}

async fn insert_from_columns_and_rows(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;

    let outcome = db
        .exec(Insert::into("Authors").rows(
            ["ID", "name"],
            vec![
                vec![Value::from(1), Value::from("Mary Shelley")],
                vec![Value::from(2), Value::from("Ann Radcliffe")],
            ],
        ))
        .await
        .unwrap();

    assert_eq!(outcome.affected_rows, 2);
    assert_eq!(count(&db, "Authors").await, 2);
}

async fn insert_from_select(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;

    db.exec(Insert::into("Authors").entries([author(1, "Mary Shelley"), author(2, "Ann Radcliffe")]))
        .await
        .unwrap();

    db.exec(
        Insert::into("Books").select(
            Select::from("Authors").columns([Column::path("ID"), Column::aliased(Path::from("name"), "title")]),
        ),
    )
    .await
    .unwrap();

    let rows = db
        .select(Select::from("Books").columns(["ID", "title"]).order_by(OrderBy::asc("ID")))
        .await
        .unwrap();
    assert_eq!(rows[1]["title"], Value::from("Ann Radcliffe"));
}

tests!(
    explicit_keys_reach_every_level,
    generated_keys_reach_the_children,
    reading_children_back_through_an_expand,
    composition_cycle_is_rejected_before_any_write,
    a_failing_child_rolls_back_the_parent,
    insert_from_columns_and_rows,
    insert_from_select,
);
