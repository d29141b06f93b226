//! Domain layer: the document tree and code block value types.

pub mod ast;
pub mod code;
pub mod document;
pub mod slug;
