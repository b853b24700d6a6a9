use pretty_assertions::assert_eq;
use quarry_sql::{
    stmt::{
        BuiltinType, Direction, Expr, ExprArg, ExprJson, Limit, Lock, LockMode, LockWait, OrderByExpr, Select,
        Statement, TypedValue, Value,
    },
    Bind, Serializer,
};

fn books_page() -> Statement {
    let mut select = Select::from_table("Books", None)
        .item(Expr::column("Books", "ID"), Some("ID".into()))
        .item(Expr::column("Books", "title"), Some("title".into()));

    select.order_by.push(OrderByExpr {
        expr: Expr::column("Books", "title"),
        direction: Direction::Asc,
    });
    select.limit = Some(Limit {
        rows: Some(Expr::arg(0)),
        offset: Some(Expr::arg(1)),
    });

    select.into()
}

fn args(indices: &[usize]) -> Vec<Bind> {
    indices
        .iter()
        .map(|&index| Bind::Arg(ExprArg { index }))
        .collect()
}

#[test]
fn paginate_per_flavor() {
    let stmt = books_page();

    let sqlite = Serializer::sqlite().serialize(&stmt);
    assert_eq!(
        sqlite.sql,
        "SELECT Books.ID, Books.title FROM Books ORDER BY Books.title ASC LIMIT ?1 OFFSET ?2"
    );
    assert_eq!(sqlite.binds, args(&[0, 1]));

    let postgresql = Serializer::postgresql().serialize(&stmt);
    assert_eq!(
        postgresql.sql,
        r#"SELECT "Books"."ID", "Books".title FROM "Books" ORDER BY "Books".title ASC LIMIT $1 OFFSET $2"#
    );

    let hana = Serializer::hana().serialize(&stmt);
    assert_eq!(
        hana.sql,
        r#"SELECT "Books".ID, "Books"."title" FROM "Books" ORDER BY "Books"."title" ASC LIMIT ? OFFSET ?"#
    );
    assert_eq!(hana.binds, args(&[0, 1]));
}

#[test]
fn offset_without_limit() {
    let mut select = Select::from_table("Books", None).item(Expr::column("Books", "ID"), None);
    select.limit = Some(Limit {
        rows: None,
        offset: Some(Expr::arg(0)),
    });
    let stmt = Statement::from(select);

    assert_eq!(
        Serializer::sqlite().serialize(&stmt).sql,
        "SELECT Books.ID FROM Books LIMIT -1 OFFSET ?1"
    );
    assert_eq!(
        Serializer::postgresql().serialize(&stmt).sql,
        r#"SELECT "Books"."ID" FROM "Books" OFFSET $1"#
    );
    assert_eq!(
        Serializer::hana().serialize(&stmt).sql,
        r#"SELECT "Books".ID FROM "Books" LIMIT 2147483647 OFFSET ?"#
    );
}

#[test]
fn keywords_are_quoted() {
    let stmt = Statement::from(
        Select::from_table("Orders", None)
            .item(Expr::column("Orders", "order"), None)
            .item(Expr::column("Orders", "Group"), None)
            .item(Expr::column("Orders", "with space"), None),
    );

    assert_eq!(
        Serializer::sqlite().serialize(&stmt).sql,
        r#"SELECT Orders."order", Orders."Group", Orders."with space" FROM Orders"#
    );
}

#[test]
fn literals_are_bound_not_inlined() {
    let mut select = Select::from_table("Books", None).item(Expr::column("Books", "ID"), None);
    select.and_filter(Expr::eq(
        Expr::column("Books", "title"),
        Expr::value("Wuthering Heights'; --"),
    ));

    let compiled = Serializer::sqlite().serialize(&select.into());

    assert_eq!(
        compiled.sql,
        "SELECT Books.ID FROM Books WHERE Books.title = ?1"
    );
    assert_eq!(
        compiled.binds,
        [Bind::Value(TypedValue {
            value: Value::from("Wuthering Heights'; --"),
            ty: None,
        })]
    );
}

#[test]
fn value_list_binds_each_element() {
    let mut select = Select::from_table("Books", None).item(Expr::column("Books", "ID"), None);
    select.and_filter(Expr::InList {
        expr: Box::new(Expr::column("Books", "ID")),
        list: vec![Expr::value(1), Expr::value(2)],
        negate: false,
    });
    select.and_filter(Expr::InList {
        expr: Box::new(Expr::column("Books", "ID")),
        list: vec![],
        negate: false,
    });

    assert_eq!(
        Serializer::postgresql().serialize(&select.into()).sql,
        r#"SELECT "Books"."ID" FROM "Books" WHERE "Books"."ID" IN ($1, $2) AND 1 = 0"#
    );
}

#[test]
fn or_inside_and_keeps_grouping() {
    let mut select = Select::from_table("Books", None).item(Expr::column("Books", "ID"), None);
    select.and_filter(Expr::Or(vec![
        Expr::eq(Expr::column("Books", "ID"), Expr::value(1)),
        Expr::eq(Expr::column("Books", "ID"), Expr::value(2)),
    ]));
    select.and_filter(Expr::is_null(Expr::column("Books", "title")));

    assert_eq!(
        Serializer::sqlite().serialize(&select.into()).sql,
        "SELECT Books.ID FROM Books WHERE (Books.ID = ?1 OR Books.ID = ?2) AND Books.title IS NULL"
    );
}

#[test]
fn portable_functions_translate() {
    let contains = Expr::func(
        "contains",
        vec![Expr::column("Books", "title"), Expr::value("Heights")],
    );
    let mut select = Select::from_table("Books", None)
        .item(Expr::func("toupper", vec![Expr::column("Books", "title")]), Some("t".into()))
        .item(Expr::func("count", vec![Expr::Star]), Some("n".into()));
    select.and_filter(contains);
    select.group_by.push(Expr::column("Books", "title"));
    let stmt = Statement::from(select);

    assert_eq!(
        Serializer::sqlite().serialize(&stmt).sql,
        "SELECT UPPER(Books.title) AS t, COUNT(*) AS n FROM Books WHERE instr(Books.title, ?1) > 0 GROUP BY Books.title"
    );
    assert_eq!(
        Serializer::postgresql().serialize(&stmt).sql,
        r#"SELECT UPPER("Books".title) AS t, COUNT(*) AS n FROM "Books" WHERE strpos("Books".title, $1) > 0 GROUP BY "Books".title"#
    );
    assert_eq!(
        Serializer::hana().serialize(&stmt).sql,
        r#"SELECT UPPER("Books"."title") AS "t", COUNT(*) AS "n" FROM "Books" WHERE LOCATE("Books"."title", ?) > 0 GROUP BY "Books"."title""#
    );
}

#[test]
fn reordered_template_arguments() {
    let mut select = Select::from_table("Books", None).item(Expr::column("Books", "ID"), None);
    select.and_filter(Expr::func(
        "endswith",
        vec![Expr::column("Books", "title"), Expr::value("s")],
    ));

    let compiled = Serializer::sqlite().serialize(&select.into());
    assert_eq!(
        compiled.sql,
        "SELECT Books.ID FROM Books WHERE substr(Books.title, -length(?1)) = ?2"
    );
    assert_eq!(compiled.binds.len(), 2);
}

#[test]
fn unknown_function_passes_through() {
    let select = Select::from_table("Books", None)
        .item(Expr::func("soundex", vec![Expr::column("Books", "title")]), Some("s".into()));

    assert_eq!(
        Serializer::sqlite().serialize(&select.into()).sql,
        "SELECT SOUNDEX(Books.title) AS s FROM Books"
    );
}

fn locked(wait: LockWait, columns: Vec<Expr>) -> Statement {
    let mut select = Select::from_table("Books", None).item(Expr::column("Books", "ID"), None);
    select.and_filter(Expr::eq(Expr::column("Books", "ID"), Expr::value(1)));
    select.lock = Some(Lock {
        mode: LockMode::Update,
        columns,
        wait,
    });
    select.into()
}

#[test]
fn lock_clause_postgresql() {
    let nowait = Serializer::postgresql().serialize(&locked(LockWait::NoWait, vec![]));
    assert_eq!(
        nowait.sql,
        r#"SELECT "Books"."ID" FROM "Books" WHERE "Books"."ID" = $1 FOR UPDATE NOWAIT"#
    );
    assert!(nowait.preamble.is_empty());

    let timeout = Serializer::postgresql().serialize(&locked(LockWait::Timeout(1000), vec![]));
    assert_eq!(
        timeout.sql,
        r#"SELECT "Books"."ID" FROM "Books" WHERE "Books"."ID" = $1 FOR UPDATE"#
    );
    assert_eq!(timeout.preamble, ["SET LOCAL lock_timeout = '1000ms'"]);

    let of = Serializer::postgresql().serialize(&locked(
        LockWait::SkipLocked,
        vec![Expr::column("Books", "title")],
    ));
    assert!(of.sql.ends_with(r#"FOR UPDATE OF "Books" SKIP LOCKED"#));
}

#[test]
fn lock_clause_hana() {
    let timeout = Serializer::hana().serialize(&locked(
        LockWait::Timeout(1500),
        vec![Expr::column("Books", "title")],
    ));
    assert_eq!(
        timeout.sql,
        r#"SELECT "Books".ID FROM "Books" WHERE "Books".ID = ? FOR UPDATE OF "Books"."title" WAIT 2"#
    );

    let ignore = Serializer::hana().serialize(&locked(LockWait::SkipLocked, vec![]));
    assert!(ignore.sql.ends_with("FOR UPDATE IGNORE LOCKED"));
}

#[test]
fn lock_clause_dropped_on_sqlite() {
    let compiled = Serializer::sqlite().serialize(&locked(LockWait::NoWait, vec![]));
    assert_eq!(compiled.sql, "SELECT Books.ID FROM Books WHERE Books.ID = ?1");
}

fn authors_with_books() -> Statement {
    let mut books = Select::from_table("Books", Some("books".into()))
        .item(Expr::column("books", "ID"), Some("ID".into()))
        .item(Expr::column("books", "title"), Some("title".into()));
    books.and_filter(Expr::eq(
        Expr::column("books", "author_ID"),
        Expr::column("Authors", "ID"),
    ));

    Select::from_table("Authors", None)
        .item(Expr::column("Authors", "name"), Some("name".into()))
        .item(
            ExprJson {
                query: books,
                to_many: true,
                types: vec![],
            },
            Some("books".into()),
        )
        .into()
}

#[test]
fn json_expand_sqlite() {
    assert_eq!(
        Serializer::sqlite().serialize(&authors_with_books()).sql,
        "SELECT Authors.name, (SELECT coalesce(json_group_array(json_object('ID', _json_.ID, 'title', _json_.title)), '[]') \
         FROM (SELECT books.ID, books.title FROM Books AS books WHERE books.author_ID = Authors.ID) AS _json_) AS books \
         FROM Authors"
    );
}

#[test]
fn json_expand_postgresql() {
    assert_eq!(
        Serializer::postgresql().serialize(&authors_with_books()).sql,
        r#"SELECT "Authors".name, (SELECT coalesce(json_agg(json_build_object('ID', _json_."ID", 'title', _json_.title)), '[]'::json) FROM (SELECT books."ID", books.title FROM "Books" AS books WHERE books."author_ID" = "Authors"."ID") AS _json_) AS books FROM "Authors""#
    );
}

#[test]
fn json_expand_hana() {
    let sql = Serializer::hana().serialize(&authors_with_books()).sql;
    assert!(sql.contains(r#"(SELECT "_json_".ID, "_json_"."title" FROM (SELECT "books".ID"#));
    assert!(sql.contains(r#"AS "_json_" FOR JSON) AS "books""#));
}

#[test]
fn nested_json_is_reparsed_on_sqlite() {
    let mut author = Select::from_table("Authors", Some("author".into()))
        .item(Expr::column("author", "name"), Some("name".into()));
    author.and_filter(Expr::eq(
        Expr::column("author", "ID"),
        Expr::column("books", "author_ID"),
    ));

    let books = Select::from_table("Books", Some("books".into()))
        .item(Expr::column("books", "title"), Some("title".into()))
        .item(
            ExprJson {
                query: author,
                to_many: false,
                types: vec![],
            },
            Some("author".into()),
        );

    let stmt = Statement::from(Select::from_table("Authors", None).item(
        ExprJson {
            query: books,
            to_many: true,
            types: vec![],
        },
        Some("books".into()),
    ));

    let sql = Serializer::sqlite().serialize(&stmt).sql;
    assert!(sql.contains("json_object('title', _json_.title, 'author', json(_json_.author))"));
    assert!(sql.contains("(SELECT json_object('name', _json_.name) FROM (SELECT author.name FROM Authors AS author"));
}

fn covers_of_authors() -> Statement {
    let mut covers = Select::from_table("Covers", Some("covers".into()))
        .item(Expr::column("covers", "image"), Some("image".into()))
        .item(Expr::column("covers", "price"), Some("price".into()))
        .item(Expr::column("covers", "no"), Some("no".into()));
    covers.and_filter(Expr::eq(
        Expr::column("covers", "author_ID"),
        Expr::column("Authors", "ID"),
    ));

    Select::from_table("Authors", None)
        .item(
            ExprJson {
                query: covers,
                to_many: true,
                types: vec![
                    Some(BuiltinType::LargeBinary),
                    Some(BuiltinType::decimal(20, 2)),
                    Some(BuiltinType::Int32),
                ],
            },
            Some("covers".into()),
        )
        .into()
}

#[test]
fn json_expand_renders_binary_as_hex_and_decimal_as_text() {
    let sqlite = Serializer::sqlite().serialize(&covers_of_authors()).sql;
    assert!(
        sqlite.contains("json_object('image', hex(_json_.image), 'price', CAST(_json_.price AS TEXT), 'no', _json_.no)"),
        "{sqlite}"
    );

    let postgresql = Serializer::postgresql().serialize(&covers_of_authors()).sql;
    assert!(
        postgresql.contains("json_build_object('image', encode(_json_.image, 'hex'), 'price', _json_.price::text, 'no', _json_.no)"),
        "{postgresql}"
    );

    let hana = Serializer::hana().serialize(&covers_of_authors()).sql;
    assert!(
        hana.contains(r#"BINTOHEX("_json_"."image") AS "image", TO_NVARCHAR("_json_"."price") AS "price""#),
        "{hana}"
    );
}
