use tests::prelude::*;

use pretty_assertions::assert_eq;

async fn chapter_titles(db: &Db) -> Vec<(i64, String)> {
    db.select(Select::from("Chapters").columns(["no", "title"]).order_by(OrderBy::asc("no")))
        .await
        .unwrap()
        .into_iter()
        .map(|row| (row["no"].as_i64().unwrap(), row["title"].as_str().unwrap().to_string()))
        .collect()
}

async fn seed(db: &Db) {
    let emma = book(1, "Emma", 5).set(
        "chapters",
        vec![chapter(1, vec![page(1)]), chapter(2, vec![page(1), page(2)])],
    );
    db.exec(Insert::into("Books").entry(emma)).await.unwrap();
}

async fn update_plain_columns(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    let outcome = db
        .exec(Update::entity("Books").filter(Expr::eq(Path::from("ID"), 1)).set("stock", 9))
        .await
        .unwrap();
    assert_eq!(outcome.affected_rows, 1);

    let rows = db.select(Select::from("Books").columns(["stock"])).await.unwrap();
    assert_eq!(rows[0]["stock"].as_i64(), Some(9));
}

async fn update_with_an_expression(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    db.exec(
        Update::entity("Books")
            .filter(Expr::eq(Path::from("ID"), 1))
            .with("stock", Expr::binary_op(Path::from("stock"), quarry::stmt::BinaryOp::Sub, 2)),
    )
    .await
    .unwrap();

    let rows = db.select(Select::from("Books").columns(["stock"])).await.unwrap();
    assert_eq!(rows[0]["stock"].as_i64(), Some(3));
}

async fn children_are_diffed_by_key(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    // Chapter 1 is renamed, chapter 2 goes away with its pages, chapter 3 is new
    let renamed = Entry::new().set("no", 1).set("title", "Opening");
    db.exec(
        Update::entity("Books")
            .filter(Expr::eq(Path::from("ID"), 1))
            .set("chapters", vec![renamed, chapter(3, vec![page(1)])]),
    )
    .await
    .unwrap();

    assert_eq!(
        chapter_titles(&db).await,
        [(1, "Opening".to_string()), (3, "Chapter 3".to_string())]
    );

    let pages = db
        .select(Select::from("Pages").columns(["chapter_no", "no"]).order_by(OrderBy::asc("chapter_no")))
        .await
        .unwrap();
    let owners: Vec<_> = pages.iter().map(|page| page["chapter_no"].as_i64().unwrap()).collect();
    assert_eq!(owners, [1, 3]);
}

async fn an_empty_list_removes_every_child(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    db.exec(
        Update::entity("Books")
            .filter(Expr::eq(Path::from("ID"), 1))
            .set("chapters", Vec::<Entry>::new()),
    )
    .await
    .unwrap();

    assert!(chapter_titles(&db).await.is_empty());
    assert!(db.select(Select::from("Pages").column(Column::wildcard())).await.unwrap().is_empty());
}

async fn delete_cascades_through_compositions(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    seed(&db).await;
    db.exec(Insert::into("Books").entry(book(2, "Persuasion", 1).set("chapters", vec![chapter(1, vec![])])))
        .await
        .unwrap();

    let outcome = db
        .exec(Delete::from("Books").filter(Expr::eq(Path::from("ID"), 1)))
        .await
        .unwrap();
    assert_eq!(outcome.affected_rows, 1);

    let chapters = db
        .select(Select::from("Chapters").columns(["book_ID"]))
        .await
        .unwrap();
    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0]["book_ID"].as_i64(), Some(2));
    assert!(db.select(Select::from("Pages").column(Column::wildcard())).await.unwrap().is_empty());
}

async fn upsert_inserts_then_overwrites(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;

    db.exec(Insert::into("Books").entry(book(1, "Emma", 5)).upsert())
        .await
        .unwrap();
    db.exec(Insert::into("Books").entry(book(1, "Emma", 8)).upsert())
        .await
        .unwrap();

    let rows = db.select(Select::from("Books").columns(["ID", "stock"])).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["stock"].as_i64(), Some(8));
}

async fn plain_insert_of_an_existing_key_fails(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    let err = db.exec(Insert::into("Books").entry(book(1, "Emma", 5))).await.unwrap_err();
    assert!(err.is_entity_already_exists(), "{err}");
}

tests!(
    update_plain_columns,
    update_with_an_expression,
    children_are_diffed_by_key,
    an_empty_list_removes_every_child,
    delete_cascades_through_compositions,
    upsert_inserts_then_overwrites,
    plain_insert_of_an_existing_key_fails,
);
