use super::{Formatter, Params, ToSql};

/// Identifier, quoted only when the flavor cannot use it bare.
pub(super) struct Ident<S>(pub(super) S);

impl<S: AsRef<str>> ToSql for Ident<S> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        f.serializer.flavor.quote(self.0.as_ref(), f.dst);
    }
}
