// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Abstract Syntax Tree types for the Char language.
//!
//! This crate defines the tokens and AST nodes shared between the
//! lexer, the parser, and downstream consumers (printer, diagnostics,
//! CLI). It is pure data: nodes are built by the parser in a single
//! pass and immutable afterwards. `Error` nodes are ordinary members
//! of the tree and every consumer must tolerate them.

pub mod expr;
pub mod printer;
pub mod span;
pub mod stmt;
pub mod token;
pub mod types;

pub use span::{LineMap, Span};
