mod byte_stream;
pub use byte_stream::ByteStream;

mod column;
pub use column::{Column, Expand, Inline};

mod delete;
pub use delete::Delete;

mod entry;
pub use entry::{Entry, EntryValue};

mod expr;
pub use expr::Expr;

mod expr_binary_op;
pub use expr_binary_op::ExprBinaryOp;

mod expr_exists;
pub use expr_exists::{ExistsTarget, ExprExists};

mod expr_func;
pub use expr_func::ExprFunc;

mod expr_in_list;
pub use expr_in_list::ExprInList;

mod expr_is_null;
pub use expr_is_null::ExprIsNull;

mod expr_like;
pub use expr_like::ExprLike;

mod expr_quantified;
pub use expr_quantified::{ExprQuantified, Quantifier};

mod insert;
pub use insert::{Insert, InsertSource};

mod limit;
pub use limit::Limit;

mod lock;
pub use lock::{Lock, LockMode, LockWait};

mod op_binary;
pub use op_binary::BinaryOp;

mod order_by;
pub use order_by::{Direction, OrderBy};

mod path;
pub use path::{Path, PathSegment};

mod select;
pub use select::Select;

mod source;
pub use source::{Join, JoinKind, Source};

mod statement;
pub use statement::Statement;

mod update;
pub use update::Update;

mod value;
pub use value::Value;

mod value_record;
pub use value_record::ValueRecord;

mod value_stream;
pub use value_stream::ValueStream;

pub mod visit_mut;
pub use visit_mut::VisitMut;
