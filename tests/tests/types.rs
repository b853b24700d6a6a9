use tests::prelude::*;

use chrono::{NaiveDate, NaiveDateTime};
use pretty_assertions::assert_eq;
use quarry::{
    schema::{BuiltinType, ElementDef},
    Schema,
};
use rust_decimal::Decimal;

fn readings() -> Schema {
    Schema::builder()
        .entity("Readings", |e| {
            e.key(ElementDef::new("ID", BuiltinType::Uuid))
                .element(ElementDef::new("amount", BuiltinType::decimal(5, 2)))
                .element(ElementDef::new("day", BuiltinType::Date))
                .element(ElementDef::new("taken", BuiltinType::timestamp()))
                .element(ElementDef::new("valid", BuiltinType::Boolean))
                .element(ElementDef::new("payload", BuiltinType::binary()))
        })
        .build()
        .unwrap()
}

/// Authors owning covers with an image and a price too wide for a double
fn covers() -> Schema {
    Schema::builder()
        .entity("Authors", |e| {
            e.key(ElementDef::new("ID", BuiltinType::Int32))
                .element(ElementDef::new("name", BuiltinType::string()))
                .composition_many("covers", "Covers", "author")
        })
        .entity("Covers", |e| {
            e.key(ElementDef::new("ID", BuiltinType::Int32))
                .association("author", "Authors")
                .element(ElementDef::new("image", BuiltinType::binary()))
                .element(ElementDef::new("price", BuiltinType::decimal(20, 2)))
        })
        .build()
        .unwrap()
}

fn dec(text: &str) -> Decimal {
    text.parse().unwrap()
}

async fn read_back(db: &Db, id: uuid::Uuid) -> ValueRecord {
    let mut rows = db
        .select(Select::from("Readings").column(Column::wildcard()).filter(Expr::eq(Path::from("ID"), id)))
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    rows.remove(0)
}

async fn decimals_keep_their_declared_scale(test: &mut DbTest) {
    let db = test.setup_db(readings()).await;

    for text in ["0.5", "12.25", "-999.99", "100"] {
        let id = uuid::Uuid::new_v4();
        db.exec(Insert::into("Readings").entry(Entry::new().set("ID", id).set("amount", dec(text))))
            .await
            .unwrap();

        let Value::Decimal(amount) = read_back(&db, id).await["amount"] else {
            panic!("expected a decimal");
        };
        assert_eq!(amount, dec(text));
        assert_eq!(amount.scale(), 2);
    }
}

async fn decimals_that_do_not_fit_are_rejected(test: &mut DbTest) {
    let db = test.setup_db(readings()).await;

    // Too many fractional digits, then too many integer digits
    for text in ["1.005", "1000"] {
        let entry = Entry::new().set("ID", uuid::Uuid::new_v4()).set("amount", dec(text));
        let err = db.exec(Insert::into("Readings").entry(entry)).await.unwrap_err();
        assert!(err.is_invalid_decimal(), "{text}: {err}");
    }

    let rows = db.select(Select::from("Readings").column(Column::wildcard())).await.unwrap();
    assert!(rows.is_empty());
}

async fn wide_decimals_keep_every_digit(test: &mut DbTest) {
    let db = test.setup_db(covers()).await;
    let price = dec("123456789012345678.91");

    db.exec(Insert::into("Covers").entry(Entry::new().set("ID", 1).set("price", price)))
        .await
        .unwrap();

    let rows = db.select(Select::from("Covers").column(Column::wildcard())).await.unwrap();
    assert_eq!(rows[0]["price"], Value::Decimal(price));
}

async fn expand_carries_binary_and_decimal_columns(test: &mut DbTest) {
    let db = test.setup_db(covers()).await;
    let price = dec("123456789012345678.91");

    db.exec(Insert::into("Authors").entry(
        Entry::new().set("ID", 1).set("name", "Austen").set(
            "covers",
            vec![Entry::new()
                .set("ID", 7)
                .set("image", vec![0u8, 1, 2, 254])
                .set("price", price)],
        ),
    ))
    .await
    .unwrap();

    let rows = db
        .select(Select::from("Authors").columns([
            Column::path("ID"),
            Column::expand(
                "covers",
                [Column::path("ID"), Column::path("image"), Column::path("price")],
            ),
        ]))
        .await
        .unwrap();

    let covers = rows[0]["covers"].as_list().unwrap();
    assert_eq!(covers.len(), 1);

    let cover = covers[0].as_record().unwrap();
    assert_eq!(cover["image"], Value::Bytes(vec![0, 1, 2, 254]));
    assert_eq!(cover["price"], Value::Decimal(price));
}

async fn temporal_values_round_trip(test: &mut DbTest) {
    let db = test.setup_db(readings()).await;

    let id = uuid::Uuid::new_v4();
    let taken = NaiveDateTime::parse_from_str("2024-02-29 13:45:10.250", "%Y-%m-%d %H:%M:%S%.f").unwrap();

    db.exec(Insert::into("Readings").entry(
        Entry::new()
            .set("ID", id)
            .set("day", "2024-02-29")
            .set("taken", taken),
    ))
    .await
    .unwrap();

    let row = read_back(&db, id).await;
    assert_eq!(row["day"], Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
    assert_eq!(row["taken"], Value::Timestamp(taken));
}

async fn booleans_binaries_and_uuids_round_trip(test: &mut DbTest) {
    let db = test.setup_db(readings()).await;

    let id = uuid::Uuid::new_v4();
    db.exec(Insert::into("Readings").entry(
        Entry::new()
            .set("ID", id)
            .set("valid", true)
            .set("payload", vec![0u8, 1, 2, 254]),
    ))
    .await
    .unwrap();

    let row = read_back(&db, id).await;
    assert_eq!(row["ID"], Value::Uuid(id));
    assert_eq!(row["valid"], Value::Bool(true));
    assert_eq!(row["payload"], Value::Bytes(vec![0, 1, 2, 254]));
    assert!(row["amount"].is_null());
}

async fn values_of_the_wrong_type_are_rejected(test: &mut DbTest) {
    let db = test.setup_db(readings()).await;

    let entry = Entry::new().set("ID", uuid::Uuid::new_v4()).set("day", "yesterday");
    let err = db.exec(Insert::into("Readings").entry(entry)).await.unwrap_err();
    assert!(err.is_invalid_type(), "{err}");
}

tests!(
    decimals_keep_their_declared_scale,
    decimals_that_do_not_fit_are_rejected,
    wide_decimals_keep_every_digit,
    expand_carries_binary_and_decimal_columns,
    temporal_values_round_trip,
    booleans_binaries_and_uuids_round_trip,
    values_of_the_wrong_type_are_rejected,
);
