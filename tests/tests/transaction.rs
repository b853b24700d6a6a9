use tests::prelude::*;

use pretty_assertions::assert_eq;
use quarry::driver::operation::Transaction as TxOp;

async fn author_ids(db: &Db) -> Vec<i64> {
    db.select(Select::from("Authors").columns(["ID"]).order_by(OrderBy::asc("ID")))
        .await
        .unwrap()
        .iter()
        .map(|row| row["ID"].as_i64().unwrap())
        .collect()
}

async fn every_write_runs_in_one_transaction(test: &mut DbTest) {
    let db = test.setup_db(bookshop()).await;

    db.exec(Insert::into("Books").entry(book(1, "Emma", 1).set("chapters", vec![chapter(1, vec![page(1)])])))
        .await
        .unwrap();

    assert_eq!(test.log().transactions(), [TxOp::Start, TxOp::Commit]);
    assert_eq!(test.log().statements("INSERT"), 3);
}

async fn commit_makes_writes_visible(test: &mut DbTest) {
    let mut db = test.setup_db(bookshop()).await;

    let mut tx = db.transaction().await.unwrap();
    tx.exec(Insert::into("Authors").entry(author(1, "Mary Shelley"))).await.unwrap();
    tx.exec(Insert::into("Authors").entry(author(2, "Ann Radcliffe"))).await.unwrap();

    // Reads inside the transaction see its own writes
    assert_eq!(tx.select(Select::from("Authors").columns(["ID"])).await.unwrap().len(), 2);
    tx.commit().await.unwrap();

    assert_eq!(author_ids(&db).await, [1, 2]);
}

async fn rollback_discards_writes(test: &mut DbTest) {
    let mut db = test.setup_db(bookshop()).await;

    let mut tx = db.transaction().await.unwrap();
    tx.exec(Insert::into("Authors").entry(author(1, "Mary Shelley"))).await.unwrap();
    tx.rollback().await.unwrap();

    assert!(author_ids(&db).await.is_empty());
}

async fn a_failed_write_keeps_earlier_work(test: &mut DbTest) {
    let mut db = test.setup_db(bookshop()).await;

    let mut tx = db.transaction().await.unwrap();
    tx.exec(Insert::into("Authors").entry(author(1, "Mary Shelley"))).await.unwrap();

    let err = tx
        .exec(Insert::into("Authors").entry(author(1, "Mary Shelley")))
        .await
        .unwrap_err();
    assert!(err.is_entity_already_exists(), "{err}");

    // The failed write rolled back to its savepoint only
    tx.exec(Insert::into("Authors").entry(author(2, "Ann Radcliffe"))).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(author_ids(&db).await, [1, 2]);
}

async fn savepoint_rollback_keeps_the_transaction(test: &mut DbTest) {
    let mut db = test.setup_db(bookshop()).await;

    let mut tx = db.transaction().await.unwrap();
    tx.exec(Insert::into("Authors").entry(author(1, "Mary Shelley"))).await.unwrap();

    let mut savepoint = tx.savepoint().await.unwrap();
    savepoint
        .exec(Insert::into("Authors").entry(author(2, "Ann Radcliffe")))
        .await
        .unwrap();
    savepoint.rollback().await.unwrap();

    let mut savepoint = tx.savepoint().await.unwrap();
    savepoint
        .exec(Insert::into("Authors").entry(author(3, "Horace Walpole")))
        .await
        .unwrap();
    savepoint.release().await.unwrap();

    tx.commit().await.unwrap();

    assert_eq!(author_ids(&db).await, [1, 3]);
}

async fn dropped_savepoint_rolls_back(test: &mut DbTest) {
    let mut db = test.setup_db(bookshop()).await;

    let mut tx = db.transaction().await.unwrap();
    {
        let mut savepoint = tx.savepoint().await.unwrap();
        savepoint
            .exec(Insert::into("Authors").entry(author(2, "Ann Radcliffe")))
            .await
            .unwrap();
    }
    tx.exec(Insert::into("Authors").entry(author(1, "Mary Shelley"))).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(author_ids(&db).await, [1]);
}

async fn dropped_transaction_rolls_back(test: &mut DbTest) {
    let mut db = test.setup_db(bookshop()).await;

    {
        let mut tx = db.transaction().await.unwrap();
        tx.exec(Insert::into("Authors").entry(author(1, "Mary Shelley"))).await.unwrap();
    }

    assert!(author_ids(&db).await.is_empty());
}

tests!(
    every_write_runs_in_one_transaction,
    commit_makes_writes_visible,
    rollback_discards_writes,
    a_failed_write_keeps_earlier_work,
    savepoint_rollback_keeps_the_transaction,
    dropped_savepoint_rolls_back,
    dropped_transaction_rolls_back,
);
