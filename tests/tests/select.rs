use tests::prelude::*;

use pretty_assertions::assert_eq;

async fn seed(db: &Db) {
    db.exec(Insert::into("Authors").entries([author(10, "Emily Brontë"), author(20, "Jane Austen")]))
        .await
        .unwrap();

    db.exec(Insert::into("Books").entries([
        book(1, "A", 11).set("author", Entry::new().set("ID", 10)),
        book(2, "B", 22).set("author", Entry::new().set("ID", 20)),
        book(3, "C", 33).set("author", Entry::new().set("ID", 20)),
    ]))
    .await
    .unwrap();
}

fn ids(rows: &[ValueRecord]) -> Vec<i64> {
    rows.iter().map(|row| row["ID"].as_i64().unwrap()).collect()
}

async fn order_by_with_limit_and_offset(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    let rows = db
        .select(
            Select::from("Books")
                .columns(["ID", "title"])
                .order_by(OrderBy::asc("title"))
                .limit(1)
                .offset(1),
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["ID"].as_i64(), Some(2));
    assert_eq!(rows[0]["title"], Value::from("B"));
}

async fn columns_come_back_in_requested_order(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    let rows = db
        .select(Select::from("Books").columns(["stock", "title", "ID"]).filter(Expr::eq(Path::from("ID"), 1)))
        .await
        .unwrap();

    assert_eq!(rows[0].names().collect::<Vec<_>>(), ["stock", "title", "ID"]);
}

async fn wildcard_skips_excluded_columns(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    let rows = db
        .select(
            Select::from("Books")
                .column(Column::excluding(["descr", "price"]))
                .filter(Expr::eq(Path::from("ID"), 1)),
        )
        .await
        .unwrap();

    let names: Vec<_> = rows[0].names().collect();
    assert!(names.contains(&"title"));
    assert!(!names.contains(&"descr"));
    assert!(!names.contains(&"price"));
}

async fn filter_through_a_to_one_association(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    let rows = db
        .select(
            Select::from("Books")
                .columns(["ID"])
                .filter(Expr::eq(Path::new(["author", "name"]), "Jane Austen"))
                .order_by(OrderBy::asc("ID")),
        )
        .await
        .unwrap();

    assert_eq!(ids(&rows), [2, 3]);
}

async fn exists_over_a_to_many_association(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    // Only Jane Austen has a book with more than 20 in stock
    let books = Path::from("books").filter(Expr::gt(Path::from("stock"), 20));
    let rows = db
        .select(Select::from("Authors").columns(["ID"]).filter(Expr::exists(books)))
        .await
        .unwrap();

    assert_eq!(ids(&rows), [20]);
}

async fn expand_to_one_nests_the_target(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    let rows = db
        .select(
            Select::from("Books")
                .columns([Column::path("ID"), Column::expand("author", [Column::path("name")])])
                .filter(Expr::eq(Path::from("ID"), 1)),
        )
        .await
        .unwrap();

    let author = rows[0]["author"].as_record().unwrap();
    assert_eq!(author["name"], Value::from("Emily Brontë"));
}

async fn expand_to_many_lists_the_targets(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    let rows = db
        .select(
            Select::from("Authors")
                .columns([Column::path("name"), Column::expand("books", [Column::path("ID"), Column::path("title")])])
                .filter(Expr::eq(Path::from("ID"), 20)),
        )
        .await
        .unwrap();

    let books = rows[0]["books"].as_list().unwrap();
    let mut titles: Vec<_> = books
        .iter()
        .map(|book| book.as_record().unwrap()["title"].as_str().unwrap().to_string())
        .collect();
    titles.sort();

    assert_eq!(titles, ["B", "C"]);
}

async fn expand_column_order_does_not_change_the_sql(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;

    let one = Select::from("Authors").columns([
        Column::path("ID"),
        Column::expand("books", [Column::path("ID"), Column::path("title"), Column::path("stock")]),
    ]);
    let other = Select::from("Authors").columns([
        Column::path("ID"),
        Column::expand("books", [Column::path("stock"), Column::path("ID"), Column::path("title")]),
    ]);

    assert_eq!(db.to_sql(&one).unwrap(), db.to_sql(&other).unwrap());
}

async fn search_matches_any_string_column(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    db.exec(Update::entity("Books").filter(Expr::eq(Path::from("ID"), 3)).set("descr", "A tale of Bath"))
        .await
        .unwrap();

    let rows = db
        .select(Select::from("Books").columns(["ID"]).search("bath"))
        .await
        .unwrap();

    assert_eq!(ids(&rows), [3]);
}

async fn compiled_selects_are_reused_across_literals(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    seed(&db).await;
    test.log().clear();

    for id in [1, 2, 3] {
        let rows = db
            .select(Select::from("Books").columns(["ID"]).filter(Expr::eq(Path::from("ID"), id)))
            .await
            .unwrap();
        assert_eq!(ids(&rows), [id as i64]);
    }

    // The same statement text is sent each time, only the arguments differ
    let sql: Vec<_> = test
        .log()
        .sql()
        .into_iter()
        .filter(|sql| sql.starts_with("SELECT"))
        .collect();
    assert_eq!(sql.len(), 3);
    assert!(sql.iter().all(|text| *text == sql[0]));
}

tests!(
    order_by_with_limit_and_offset,
    columns_come_back_in_requested_order,
    wildcard_skips_excluded_columns,
    filter_through_a_to_one_association,
    exists_over_a_to_many_association,
    expand_to_one_nests_the_target,
    expand_to_many_lists_the_targets,
    expand_column_order_does_not_change_the_sql,
    search_matches_any_string_column,
    compiled_selects_are_reused_across_literals,
);
