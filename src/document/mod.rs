//! Document model: structure tree, parser adapter, serializer.

pub mod node;
pub mod parse;
pub mod serialize;

pub use node::{ColumnAlign, Document, DocumentNode, NodeKind, NodeSpan};
pub use parse::{ParserCaps, parse};
pub use serialize::serialize;
