//! Text-level helpers shared by every record kind: entity escaping, the
//! literal-expression parser and the reference list codec.

pub mod literal;
pub mod refs;
pub mod sanitize;

pub use literal::{Literal, LiteralError};
pub use refs::{first_ref, make_refs, parse_refs, replace_command, search_model};
pub use sanitize::{escape, sanitize};
