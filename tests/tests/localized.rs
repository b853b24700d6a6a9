use tests::prelude::*;

use pretty_assertions::assert_eq;

async fn seed(db: &Db) {
    db.exec(Insert::into("Books").entries([book(1, "Pride and Prejudice", 1), book(2, "Emma", 1)]))
        .await
        .unwrap();

    db.exec(Insert::into("Books.texts").entry(
        Entry::new()
            .set("locale", "de")
            .set("ID", 1)
            .set("title", "Stolz und Vorurteil"),
    ))
    .await
    .unwrap();
}

async fn titles(db: &Db) -> Vec<String> {
    db.select(Select::from("Books").columns(["title"]).order_by(OrderBy::asc("ID")))
        .await
        .unwrap()
        .iter()
        .map(|row| row["title"].as_str().unwrap().to_string())
        .collect()
}

async fn translation_replaces_the_base_text(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    let german = db.with_context(Context::new().locale("de"));

    // Book 2 has no German row and falls back to the base table
    assert_eq!(titles(&german).await, ["Stolz und Vorurteil", "Emma"]);
}

async fn no_locale_reads_the_base_table(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    assert_eq!(titles(&db).await, ["Pride and Prejudice", "Emma"]);
}

async fn default_locale_applies_without_a_context(test: &mut DbTest) {
    let db = test
        .setup_db_with(bookshop(), |builder| {
            builder.default_locale("de");
        })
        .await;
    seed(&db).await;

    assert_eq!(titles(&db).await, ["Stolz und Vorurteil", "Emma"]);

    // An explicit locale wins over the default
    let french = db.with_context(Context::new().locale("fr"));
    assert_eq!(titles(&french).await, ["Pride and Prejudice", "Emma"]);
}

async fn locales_do_not_leak_between_handles(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    let german = db.with_context(Context::new().locale("de"));
    let english = db.with_context(Context::new().locale("en"));

    let (de, en) = tokio::join!(titles(&german), titles(&english));
    assert_eq!(de[0], "Stolz und Vorurteil");
    assert_eq!(en[0], "Pride and Prejudice");
}

tests!(
    translation_replaces_the_base_text,
    no_locale_reads_the_base_table,
    default_locale_applies_without_a_context,
    locales_do_not_leak_between_handles,
);
