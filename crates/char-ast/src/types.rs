// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type expression AST nodes.

use std::fmt;

/// A type as written in source: `pkg.Name<Args>`, `[]Elem`, or
/// `fn(Params) Returns`.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Ident(TypeIdent),
    Array(Box<Type>),
    FuncSig(FuncSig),
    /// A slot where a type was expected but could not be parsed.
    Error(String),
}

/// A possibly dotted type name with optional generic arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeIdent {
    pub parts: Vec<String>,
    pub type_params: Vec<Type>,
}

impl TypeIdent {
    pub fn new(first: impl Into<String>) -> Self {
        Self { parts: vec![first.into()], type_params: Vec::new() }
    }
}

/// A function signature type: parameter types and return types.
/// Also usable as an expression (spec'd shared variant), e.g. in a
/// type redirect `fn(Int) Int as Unary`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuncSig {
    pub params: Vec<Type>,
    pub returns: Vec<Type>,
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Ident(t) => write!(f, "{}", t),
            Type::Array(elem) => write!(f, "[]{}", elem),
            Type::FuncSig(sig) => write!(f, "{}", sig),
            Type::Error(msg) => write!(f, "<error: {}>", msg),
        }
    }
}

impl fmt::Display for TypeIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts.join("."))?;
        if !self.type_params.is_empty() {
            write!(f, "<")?;
            for (i, tp) in self.type_params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", tp)?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

impl fmt::Display for FuncSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ")")?;
        if !self.returns.is_empty() {
            write!(f, " ")?;
            if self.returns.len() > 1 {
                write!(f, "(")?;
            }
            for (i, r) in self.returns.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", r)?;
            }
            if self.returns.len() > 1 {
                write!(f, ")")?;
            }
        }
        Ok(())
    }
}
