pub mod serializer;
pub use serializer::{Bind, Compiled, Flavor, Hana, Params, Postgresql, Serializer, Sqlite};

pub mod stmt;
pub use stmt::Statement;
