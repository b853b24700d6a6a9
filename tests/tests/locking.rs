use tests::prelude::*;

use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};

fn locked(wait: LockWait) -> Select {
    Select::from("Books")
        .columns(["ID", "stock"])
        .filter(Expr::eq(Path::from("ID"), 1))
        .for_update(wait)
}

async fn seed(db: &Db) {
    db.exec(Insert::into("Books").entry(book(1, "Emma", 5))).await.unwrap();
}

async fn backend_without_row_locks_reads_normally(test: &mut DbTest) {
    if test.capability().select_for_update {
        return;
    }

    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    let rows = db.select(locked(LockWait::NoWait)).await.unwrap();
    assert_eq!(rows.len(), 1);

    // The lock clause is dropped from the statement
    assert!(test.log().sql().iter().all(|sql| !sql.contains("FOR UPDATE")));
}

async fn nowait_fails_immediately_on_a_held_lock(test: &mut DbTest) {
    if !test.capability().select_for_update {
        return;
    }

    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    let mut first = db.clone();
    let mut second = db.clone();

    let mut holder = first.transaction().await.unwrap();
    assert_eq!(holder.select(locked(LockWait::NoWait)).await.unwrap().len(), 1);

    let mut waiter = second.transaction().await.unwrap();
    let err = waiter.select(locked(LockWait::NoWait)).await.unwrap_err();
    assert!(err.is_lock_conflict(), "{err}");
    assert!(err.is_locked());

    waiter.rollback().await.unwrap();
    holder.commit().await.unwrap();
}

async fn timeout_fails_after_the_wait(test: &mut DbTest) {
    if !test.capability().select_for_update {
        return;
    }

    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    let mut first = db.clone();
    let mut second = db.clone();

    let mut holder = first.transaction().await.unwrap();
    holder.select(locked(LockWait::NoWait)).await.unwrap();

    let mut waiter = second.transaction().await.unwrap();
    let started = Instant::now();
    let err = waiter.select(locked(LockWait::millis(1000))).await.unwrap_err();

    assert!(err.is_lock_timeout(), "{err}");
    assert!(started.elapsed() >= Duration::from_millis(900));

    waiter.rollback().await.unwrap();
    holder.commit().await.unwrap();
}

async fn waiter_proceeds_once_the_lock_is_released(test: &mut DbTest) {
    if !test.capability().select_for_update {
        return;
    }

    let db = test.setup_db(bookshop()).await;
    seed(&db).await;

    let mut first = db.clone();
    let mut second = db.clone();

    let mut holder = first.transaction().await.unwrap();
    holder.select(locked(LockWait::NoWait)).await.unwrap();

    let mut waiter = second.transaction().await.unwrap();

    let release = async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        holder.commit().await.unwrap();
    };

    let (_, rows) = tokio::join!(release, waiter.select(locked(LockWait::millis(5000))));
    assert_eq!(rows.unwrap().len(), 1);

    waiter.commit().await.unwrap();
}

tests!(
    backend_without_row_locks_reads_normally,
    nowait_fails_immediately_on_a_held_lock,
    timeout_fails_after_the_wait,
    waiter_proceeds_once_the_lock_is_released,
);
