use tests::prelude::*;

use pretty_assertions::assert_eq;

async fn unknown_columns_are_reported_together(test: &mut DbTest) {
    let db = test.setup_db_with(bookshop(), |builder| {
        builder.strict(true);
    })
    .await;

    let entry = book(1, "Emma", 5).set("isbn", "978-0141439587").set("pages", 474);

    let err = db.exec(Insert::into("Books").entry(entry)).await.unwrap_err();

    assert!(err.is_multiple(), "{err}");
    assert_eq!(err.sub_errors().len(), 2);
    assert!(err.sub_errors().iter().all(|err| err.is_unknown_column()));

    // Rejected while planning
    assert!(test.log().is_empty());
}

async fn lenient_mode_drops_unknown_columns(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;

    let entry = book(1, "Emma", 5).set("isbn", "978-0141439587");
    db.exec(Insert::into("Books").entry(entry)).await.unwrap();

    let rows = db.select(Select::from("Books").columns(["ID", "title"])).await.unwrap();
    assert_eq!(rows.len(), 1);
}

async fn unknown_select_column_is_an_error(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;

    let err = db
        .select(Select::from("Books").columns(["ID", "isbn"]))
        .await
        .unwrap_err();
    assert!(err.is_unknown_reference(), "{err}");
}

async fn unknown_entity_is_an_error(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;

    let err = db.select(Select::from("Magazines")).await.unwrap_err();
    assert!(err.is_unknown_reference(), "{err}");
}

tests!(
    unknown_columns_are_reported_together,
    lenient_mode_drops_unknown_columns,
    unknown_select_column_is_an_error,
    unknown_entity_is_an_error,
);
