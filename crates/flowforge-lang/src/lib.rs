//! FlowScript: the DOT-like DSL that describes flowforge workflows.
//!
//! A FlowScript source file compiles to a [`ParsedGraph`] — a validated,
//! flat map of node id to [`Node`] — which the engine's graph runner then
//! walks to build jobs and wire dependencies. See [`parse`] and [`emit`].
//!
//! ```
//! let src = r#"
//!     digraph {
//!       { node [shape="circle"]; inputs [data='{"command":"make"}']; }
//!       { node [shape="box"]; compileJob; }
//!       inputs -> compileJob;
//!     }
//! "#;
//! let graph = flowforge_lang::parse(src).unwrap();
//! assert_eq!(graph.len(), 2);
//! ```

mod ast;
mod emitter;
mod error;
mod lexer;
mod parser;

pub use ast::{Node, NodeId, NodeType, ParsedGraph};
pub use emitter::emit;
pub use error::{LexError, ParseError, ParseResult};
pub use lexer::{tokenize, SpannedToken, Token};
pub use parser::parse;
