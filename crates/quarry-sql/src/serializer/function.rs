use super::{Comma, Delimited, Formatter, Function, Params, ToSql};

use crate::stmt::{Expr, ExprFunc};

use std::borrow::Cow;

/// Translation shared by all dialects. Unknown names are native functions
/// and pass through upper-cased.
pub(super) fn common(name: &str) -> Function {
    match name {
        "concat" => Function::Infix(" || "),
        "countdistinct" => Function::Template("COUNT(DISTINCT {0})"),
        "tolower" => Function::Call(Cow::Borrowed("LOWER")),
        "toupper" => Function::Call(Cow::Borrowed("UPPER")),
        _ => Function::Call(Cow::Owned(name.to_ascii_uppercase())),
    }
}

impl ToSql for &ExprFunc {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match f.flavor().translate_function(&self.name) {
            Function::Call(name) => fmt!(f, name.as_ref() "(" Comma(&self.args) ")"),
            Function::Infix(op) => fmt!(f, "(" Delimited(&self.args, op) ")"),
            Function::Template(template) => template_to_sql(template, &self.args, f),
        }
    }
}

fn template_to_sql<P: Params>(template: &str, args: &[Expr], f: &mut Formatter<'_, P>) {
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        f.dst.push_str(&rest[..start]);

        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            f.dst.push_str(&rest[start..]);
            return;
        };

        match &after[..end] {
            "*" => fmt!(f, Comma(args)),
            slot => match slot.parse::<usize>().ok().and_then(|i| args.get(i)) {
                Some(arg) => arg.to_sql(f),
                None => f.dst.push_str("NULL"),
            },
        }

        rest = &after[end + 1..];
    }

    f.dst.push_str(rest);
}
