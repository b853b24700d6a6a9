use tests::prelude::*;

use pretty_assertions::assert_eq;
use quarry::{
    db::PoolConfig,
    schema::{BuiltinType, ElementDef},
    Schema,
};
use std::time::Duration;

async fn stream_yields_rows_lazily(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;

    db.exec(Insert::into("Authors").entries((1..=50).map(|id| author(id, &format!("Author {id}")))))
        .await
        .unwrap();

    let mut stream = db
        .stream(Select::from("Authors").columns(["ID"]).order_by(OrderBy::asc("ID")))
        .await
        .unwrap();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.as_record().unwrap()["ID"].as_i64(), Some(1));

    let rest = stream.collect().await.unwrap();
    assert_eq!(rest.len(), 49);
}

async fn dropping_a_stream_returns_its_connection(test: &mut DbTest) {
    let db = test
        .setup_db_with(bookshop(), |builder| {
            builder.pool(PoolConfig::new().max_size(1));
        })
        .await;

    db.exec(Insert::into("Authors").entries([author(1, "Mary Shelley"), author(2, "Ann Radcliffe")]))
        .await
        .unwrap();

    let mut stream = db.stream(Select::from("Authors").columns(["ID"])).await.unwrap();
    stream.next().await.unwrap().unwrap();
    drop(stream);

    // The only pooled connection is available again
    assert_eq!(db.select(Select::from("Authors").columns(["ID"])).await.unwrap().len(), 2);
}

async fn operation_within_its_timeout_succeeds(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;

    let outcome = db
        .exec_with_timeout(Insert::into("Authors").entry(author(1, "Mary Shelley")), Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(outcome.affected_rows, 1);
}

async fn reloaded_model_applies_to_new_operations(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;
    db.exec(Insert::into("Authors").entry(author(1, "Mary Shelley"))).await.unwrap();

    // Compile once so the plan is cached
    db.select(Select::from("Authors").columns(["ID", "name"])).await.unwrap();

    let narrowed = Schema::builder()
        .entity("Authors", |e| e.key(ElementDef::new("ID", BuiltinType::Int32)))
        .build()
        .unwrap();
    db.reload_model(narrowed);

    let err = db
        .select(Select::from("Authors").columns(["ID", "name"]))
        .await
        .unwrap_err();
    assert!(err.is_unknown_reference(), "{err}");

    let rows = db.select(Select::from("Authors").columns(["ID"])).await.unwrap();
    assert_eq!(rows.len(), 1);
}

tests!(
    stream_yields_rows_lazily,
    dropping_a_stream_returns_its_connection,
    operation_within_its_timeout_succeeds,
    reloaded_model_applies_to_new_operations,
);
