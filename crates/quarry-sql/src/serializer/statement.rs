use super::{Comma, Delimited, Formatter, Ident, LockTarget, Params, ToSql, UpsertSyntax};

use crate::stmt::{self, Direction, Expr, InsertSource, JoinKind, TableFactor};

impl ToSql for &stmt::Statement {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match self {
            stmt::Statement::CreateTable(stmt) => stmt.to_sql(f),
            stmt::Statement::Delete(stmt) => stmt.to_sql(f),
            stmt::Statement::DropTable(stmt) => stmt.to_sql(f),
            stmt::Statement::Insert(stmt) => stmt.to_sql(f),
            stmt::Statement::Select(stmt) => stmt.to_sql(f),
            stmt::Statement::Update(stmt) => stmt.to_sql(f),
        }
    }
}

impl ToSql for &stmt::Select {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let distinct = if self.distinct { "DISTINCT " } else { "" };
        let from = self.from.as_ref().map(|from| (" FROM ", from));
        let filter = self.filter.as_ref().map(|expr| (" WHERE ", expr));
        let group_by = if self.group_by.is_empty() {
            None
        } else {
            Some((" GROUP BY ", Comma(&self.group_by)))
        };
        let having = self.having.as_ref().map(|expr| (" HAVING ", expr));
        let order_by = if self.order_by.is_empty() {
            None
        } else {
            Some((" ORDER BY ", Comma(&self.order_by)))
        };

        fmt!(f, "SELECT " distinct Comma(&self.items) from filter group_by having order_by);

        if let Some(limit) = &self.limit {
            limit.to_sql(f);
        }

        if let Some(lock) = &self.lock {
            lock.to_sql(f);
        }
    }
}

impl ToSql for &stmt::SelectItem {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let alias = match (&self.alias, &self.expr) {
            (Some(alias), Expr::Column(column)) if column.name == *alias => None,
            (Some(alias), _) => Some((" AS ", Ident(alias))),
            (None, _) => None,
        };

        fmt!(f, &self.expr alias);
    }
}

impl ToSql for &stmt::TableWithJoins {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        fmt!(f, &self.relation Delimited(&self.joins, ""));
    }
}

impl ToSql for &stmt::TableFactor {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match self {
            TableFactor::Table { name, alias } => {
                let alias = alias
                    .as_ref()
                    .filter(|alias| *alias != name)
                    .map(|alias| (" AS ", Ident(alias)));
                fmt!(f, Ident(name) alias);
            }
            TableFactor::Derived { query, alias } => {
                let query = &**query;
                fmt!(f, "(" query ") AS " Ident(alias));
            }
        }
    }
}

impl ToSql for &stmt::Join {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let kind = match self.kind {
            JoinKind::Inner => " JOIN ",
            JoinKind::Left => " LEFT JOIN ",
        };

        let relation = &self.relation;
        let on = &self.on;
        fmt!(f, kind relation " ON " on);
    }
}

impl ToSql for &stmt::OrderByExpr {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let direction = match self.direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        };

        fmt!(f, &self.expr direction);
    }
}

impl ToSql for &stmt::Limit {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let rows = self.rows.as_ref().map(|rows| f.capture(|f| rows.to_sql(f)));
        let offset = self
            .offset
            .as_ref()
            .map(|offset| f.capture(|f| offset.to_sql(f)));

        if let Some(clause) = f.flavor().paginate(rows.as_deref(), offset.as_deref()) {
            fmt!(f, " " clause);
        }
    }
}

impl ToSql for &stmt::Lock {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let targets: Vec<_> = self
            .columns
            .iter()
            .filter_map(Expr::as_column)
            .map(|column| LockTarget {
                qualifier: column
                    .qualifier
                    .as_ref()
                    .map(|qualifier| f.flavor().quoted(qualifier))
                    .unwrap_or_default(),
                column: f.capture(|f| column.to_sql(f)),
            })
            .collect();

        if let Some(preamble) = f.flavor().lock_preamble(self.wait) {
            f.preamble.push(preamble);
        }

        if let Some(clause) = f.flavor().lock_clause(self.mode, self.wait, &targets) {
            fmt!(f, " " clause);
        }
    }
}

impl ToSql for &stmt::Insert {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        insert_head(self, f);

        match &self.source {
            InsertSource::Values(rows) => values_to_sql(rows, f),
            InsertSource::Select(query) => {
                let query = &**query;
                fmt!(f, " " query);
            }
        }

        insert_tail(self, self.rows().map(<[_]>::len), f);
    }
}

/// Emits the one-row template of `insert` repeated `rows` times, shifting
/// argument slots per row.
pub(super) fn insert_batch<P: Params>(insert: &stmt::Insert, rows: usize, f: &mut Formatter<'_, P>) {
    let Some(template) = insert.rows().and_then(|rows| rows.first()) else {
        insert.to_sql(f);
        return;
    };

    insert_head(insert, f);

    let width = template.len();
    let multi_row = f.flavor().multi_row_insert();
    let from_dual = f.flavor().dual_table().map(|dual| (" FROM ", dual));

    for row in 0..rows {
        f.arg_offset = row * width;

        match (row, multi_row || rows == 1) {
            (0, true) => fmt!(f, " VALUES (" Comma(template) ")"),
            (_, true) => fmt!(f, ", (" Comma(template) ")"),
            (0, false) => fmt!(f, " SELECT " Comma(template) from_dual),
            (_, false) => fmt!(f, " UNION ALL SELECT " Comma(template) from_dual),
        }
    }

    f.arg_offset = 0;

    insert_tail(insert, Some(rows), f);
}

fn insert_head<P: Params>(insert: &stmt::Insert, f: &mut Formatter<'_, P>) {
    let keyword = match (&insert.upsert, f.flavor().native_upsert()) {
        (Some(_), Some(UpsertSyntax::UpsertWithPrimaryKey)) => "UPSERT ",
        _ => "INSERT INTO ",
    };

    let columns = Comma(insert.columns.iter().map(Ident));
    fmt!(f, keyword Ident(&insert.table) " (" columns ")");
}

fn values_to_sql<P: Params>(rows: &[Vec<Expr>], f: &mut Formatter<'_, P>) {
    if f.flavor().multi_row_insert() || rows.len() == 1 {
        let rows = Comma(rows.iter().map(|row| ("(", Comma(row), ")")));
        fmt!(f, " VALUES " rows);
    } else {
        let from_dual = f.flavor().dual_table().map(|dual| (" FROM ", dual));
        let rows = Delimited(
            rows.iter().map(|row| ("SELECT ", Comma(row), from_dual)),
            " UNION ALL ",
        );
        fmt!(f, " " rows);
    }
}

fn insert_tail<P: Params>(insert: &stmt::Insert, rows: Option<usize>, f: &mut Formatter<'_, P>) {
    if let Some(upsert) = &insert.upsert {
        let single_row = rows == Some(1);

        match f.flavor().native_upsert() {
            Some(UpsertSyntax::OnConflict) => {
                let keys = Comma(upsert.keys.iter().map(Ident));
                if upsert.update_columns.is_empty() {
                    fmt!(f, " ON CONFLICT (" keys ") DO NOTHING");
                } else {
                    let assignments = Comma(
                        upsert
                            .update_columns
                            .iter()
                            .map(|column| (Ident(column), " = excluded.", Ident(column))),
                    );
                    fmt!(f, " ON CONFLICT (" keys ") DO UPDATE SET " assignments);
                }
            }
            // The subquery form of UPSERT matches on the primary key implicitly
            Some(UpsertSyntax::UpsertWithPrimaryKey) if single_row || f.flavor().multi_row_insert() => {
                fmt!(f, " WITH PRIMARY KEY");
            }
            Some(UpsertSyntax::UpsertWithPrimaryKey) | None => {}
        }
    }

    if !insert.returning.is_empty() {
        let returning = Comma(insert.returning.iter().map(Ident));
        fmt!(f, " RETURNING " returning);
    }
}

impl ToSql for &stmt::Update {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let assignments = Comma(
            self.assignments
                .iter()
                .map(|assignment| (Ident(&assignment.column), " = ", &assignment.expr)),
        );
        let filter = self.filter.as_ref().map(|expr| (" WHERE ", expr));

        fmt!(f, "UPDATE " Ident(&self.table) " SET " assignments filter);
    }
}

impl ToSql for &stmt::Delete {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let filter = self.filter.as_ref().map(|expr| (" WHERE ", expr));

        fmt!(f, "DELETE FROM " Ident(&self.table) filter);
    }
}

impl ToSql for &stmt::CreateTable {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let inline_pk = f.flavor().identity_is_primary_key()
            && self.columns.iter().any(|column| column.auto_increment);

        fmt!(f, "CREATE TABLE " Ident(&self.name) " (");

        for (index, column) in self.columns.iter().enumerate() {
            fmt!(f, "\n    " column);
            if index < self.columns.len() - 1 {
                fmt!(f, ",");
            }
        }

        if !self.primary_key.is_empty() && !inline_pk {
            let keys = Comma(self.primary_key.iter().map(Ident));
            fmt!(f, ",\n    PRIMARY KEY (" keys ")");
        }

        fmt!(f, "\n)");
    }
}

impl ToSql for &stmt::ColumnDef {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let ty = f.flavor().column_type(&self.ty, self.auto_increment);
        let not_null = if self.not_null && !self.auto_increment {
            " NOT NULL"
        } else {
            ""
        };

        fmt!(f, Ident(&self.name) " " ty not_null);
    }
}

impl ToSql for &stmt::DropTable {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let if_exists = if self.if_exists { "IF EXISTS " } else { "" };
        fmt!(f, "DROP TABLE " if_exists Ident(&self.name));
    }
}
