//! # Naipe AST
//!
//! Abstract Syntax Tree definitions for the Naipe card-game description
//! language.
//!
//! The AST represents the syntactic structure of a Naipe program after
//! parsing: deck composition, card types, scoring arithmetic, per-round
//! rules, conditional structures and visual card designs. The parser
//! allocates nodes into an [`Ast`] store as grammar productions reduce and
//! hands the resulting [`Program`] root to the semantic checker and
//! interpreter; once every downstream pass is done, the whole tree is torn
//! down with a single [`Ast::release`] call.
//!
//! Parent to child edges are exclusive: each node has exactly one owner and
//! the tree contains no cycles, so release visits every reachable node
//! exactly once.

mod ast;
mod error;
mod module;
mod release;

pub use ast::*;
pub use error::AstError;
pub use module::{initialize_module, shutdown_module};
pub use release::{NodeKind, ReleaseStats};
