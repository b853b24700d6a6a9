use super::{Formatter, Params};

macro_rules! fmt {
    ($f:expr, $( $fragments:expr )*) => {{
        $(
            $fragments.to_sql($f);
        )*
    }};
}

pub(super) trait ToSql {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>);
}

impl ToSql for &str {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        f.dst.push_str(self);
    }
}

impl ToSql for &String {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        f.dst.push_str(self);
    }
}

impl ToSql for String {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        f.dst.push_str(&self);
    }
}

impl ToSql for usize {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        f.dst.push_str(&self.to_string());
    }
}

impl<T: ToSql> ToSql for Option<T> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        if let Some(inner) = self {
            inner.to_sql(f);
        }
    }
}

impl<T1: ToSql, T2: ToSql> ToSql for (T1, T2) {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        self.0.to_sql(f);
        self.1.to_sql(f);
    }
}

impl<T1: ToSql, T2: ToSql, T3: ToSql> ToSql for (T1, T2, T3) {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        self.0.to_sql(f);
        self.1.to_sql(f);
        self.2.to_sql(f);
    }
}
