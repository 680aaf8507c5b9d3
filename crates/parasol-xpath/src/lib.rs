//! The XPath/XQuery evaluator (`spec.md` §4.10): a compiled AST, a typed
//! value model, a ~70-function library grounded on `examples/
//! original_source/src/xpath/function_library.cpp`, and a streaming
//! `query` entry point over an in-memory XML document tree.
//!
//! Unlike the NetSocket and SVG crates this one has no particular object
//! to drive through `Action` dispatch; it is a pure expression-evaluation
//! library the XML class (out of scope here) would embed.

pub mod ast;
pub mod dom;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod query;
pub mod value;

pub use ast::Expr;
pub use dom::{Document, NodeId};
pub use eval::{evaluate, Context};
pub use functions::FunctionLibrary;
pub use parser::{parse, ParseError};
pub use query::query;
pub use value::Value;
