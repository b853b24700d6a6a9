use super::{Bind, Comma, Delimited, Ident, JsonEncoding, JsonExpand, JsonField, Params, ToSql};

use crate::stmt::{self, Expr};

impl ToSql for &stmt::Expr {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match self {
            Expr::And(operands) => {
                fmt!(f, Delimited(operands.iter().map(Operand), " AND "));
            }
            Expr::Arg(arg) => {
                let placeholder = f.params.push(Bind::Arg(stmt::ExprArg {
                    index: arg.index + f.arg_offset,
                }));
                fmt!(f, placeholder);
            }
            Expr::BinaryOp { lhs, op, rhs } => {
                fmt!(f, Operand(lhs) " " op.to_string() " " Operand(rhs));
            }
            Expr::Column(column) => column.to_sql(f),
            Expr::Exists { query, negate } => {
                let not = if *negate { "NOT " } else { "" };
                let query = &**query;
                fmt!(f, not "EXISTS (" query ")");
            }
            Expr::Func(func) => func.to_sql(f),
            Expr::InList { expr, list, negate } => {
                if list.is_empty() {
                    // nothing is in an empty list
                    let constant = if *negate { "1 = 1" } else { "1 = 0" };
                    fmt!(f, constant);
                } else {
                    let not = if *negate { " NOT" } else { "" };
                    fmt!(f, Operand(expr) not " IN (" Comma(list) ")");
                }
            }
            Expr::InSubquery {
                expr,
                query,
                negate,
            } => {
                let not = if *negate { " NOT" } else { "" };
                let query = &**query;
                fmt!(f, Operand(expr) not " IN (" query ")");
            }
            Expr::IsNull { expr, negate } => {
                let suffix = if *negate { " IS NOT NULL" } else { " IS NULL" };
                fmt!(f, Operand(expr) suffix);
            }
            Expr::Json(json) => json_to_sql(json, f),
            Expr::Like { expr, pattern } => {
                fmt!(f, Operand(expr) " LIKE " Operand(pattern));
            }
            Expr::Locale => {
                let placeholder = f.params.push(Bind::Locale);
                fmt!(f, placeholder);
            }
            Expr::Not(expr) => {
                let expr = &**expr;
                fmt!(f, "NOT (" expr ")");
            }
            Expr::Or(operands) => {
                fmt!(f, "(" Delimited(operands, " OR ") ")");
            }
            Expr::Raw(sql) => fmt!(f, sql),
            Expr::Star => fmt!(f, "*"),
            Expr::Subquery(query) => {
                let query = &**query;
                fmt!(f, "(" query ")");
            }
            Expr::Tuple(exprs) => {
                fmt!(f, "(" Comma(exprs) ")");
            }
            Expr::Value(value) => value.to_sql(f),
        }
    }
}

impl ToSql for &stmt::ExprColumn {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match &self.qualifier {
            Some(qualifier) => fmt!(f, Ident(qualifier) "." Ident(&self.name)),
            None => fmt!(f, Ident(&self.name)),
        }
    }
}

impl ToSql for &stmt::TypedValue {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match &self.value {
            // A list literal binds element-wise with the shared type
            stmt::Value::List(items) => {
                let items = items.iter().map(|item| stmt::TypedValue {
                    value: item.clone(),
                    ty: self.ty.clone(),
                });
                fmt!(f, "(" Comma(items.collect::<Vec<_>>().iter()) ")");
            }
            _ => {
                let placeholder = f.params.push(Bind::Value(self.clone()));
                fmt!(f, placeholder);
            }
        }
    }
}

/// An operand of an operator. Compound expressions are parenthesized so the
/// emitted text keeps the tree's grouping.
struct Operand<'a>(&'a Expr);

impl ToSql for Operand<'_> {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match self.0 {
            Expr::BinaryOp { .. } | Expr::And(_) => fmt!(f, "(" self.0 ")"),
            expr => expr.to_sql(f),
        }
    }
}

fn json_to_sql<P: Params>(json: &stmt::ExprJson, f: &mut super::Formatter<'_, P>) {
    let fields: Vec<_> = json
        .query
        .items
        .iter()
        .enumerate()
        .map(|(position, item)| JsonField {
            key: match (&item.alias, &item.expr) {
                (Some(alias), _) => alias.clone(),
                (None, Expr::Column(column)) => column.name.clone(),
                (None, _) => String::new(),
            },
            encoding: JsonEncoding::of(
                item.expr.is_json(),
                json.types.get(position).and_then(Option::as_ref),
            ),
        })
        .collect();

    let inner = f.capture(|f| json.query.to_sql(f));

    let sql = f.flavor().json_expand(&JsonExpand {
        inner: &inner,
        fields: &fields,
        to_many: json.to_many,
    });

    f.dst.push_str(&sql);
}
