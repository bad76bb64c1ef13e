// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Terms
//!
//! The `term` module provides the structured values exchanged between processes: atoms, process
//! identifiers and the `Term` tree that every envelope is built from.
//!

use crate::Reference;

use serde::{Deserialize, Serialize};

use std::fmt::{Display, Formatter};

/// Symbolic constant.
///
#[derive(
    Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Debug, Serialize, Deserialize,
)]
pub struct Atom(String);

impl Atom {
    /// Creates a new atom.
    pub fn new(name: &str) -> Self {
        Atom(name.to_owned())
    }

    /// Returns the atom text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Atom {
    fn from(name: &str) -> Self {
        Atom::new(name)
    }
}

impl From<String> for Atom {
    fn from(name: String) -> Self {
        Atom(name)
    }
}

impl Display for Atom {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process identifier.
///
/// Assigned once by the node when the process is created and never changed afterwards.
///
#[derive(
    Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Debug, Serialize, Deserialize,
)]
pub struct Pid {
    /// Name of the node that owns the process.
    pub node: Atom,
    /// Local serial of the process within the node.
    pub id: u32,
    /// Wrap-around counter for `id`.
    pub serial: u32,
    /// Creation epoch of the node.
    pub creation: u8,
}

impl Display for Pid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}.{}.{}>", self.node, self.id, self.serial)
    }
}

/// Structured value carried by messages.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Term {
    /// Symbolic constant.
    Atom(Atom),
    /// Signed integer.
    Integer(i64),
    /// UTF-8 text.
    String(String),
    /// Raw bytes.
    Binary(Vec<u8>),
    /// Fixed-size sequence.
    Tuple(Vec<Term>),
    /// Variable-size sequence.
    List(Vec<Term>),
    /// Process identifier.
    Pid(Pid),
    /// Call-correlation reference.
    Ref(Reference),
    /// Empty value.
    Nil,
}

impl Term {
    /// Builds an atom term.
    pub fn atom(name: &str) -> Self {
        Term::Atom(Atom::new(name))
    }

    /// Builds a tuple term.
    pub fn tuple(elements: Vec<Term>) -> Self {
        Term::Tuple(elements)
    }

    /// Returns the atom if the term is one.
    pub fn as_atom(&self) -> Option<&Atom> {
        match self {
            Term::Atom(atom) => Some(atom),
            _ => None,
        }
    }

    /// Returns the tuple elements if the term is a tuple.
    pub fn as_tuple(&self) -> Option<&[Term]> {
        match self {
            Term::Tuple(elements) => Some(elements),
            _ => None,
        }
    }

    /// True if the term is the atom `name`.
    pub fn is_atom(&self, name: &str) -> bool {
        self.as_atom().is_some_and(|atom| atom.as_str() == name)
    }
}

impl From<Atom> for Term {
    fn from(atom: Atom) -> Self {
        Term::Atom(atom)
    }
}

impl From<Pid> for Term {
    fn from(pid: Pid) -> Self {
        Term::Pid(pid)
    }
}

impl From<Reference> for Term {
    fn from(reference: Reference) -> Self {
        Term::Ref(reference)
    }
}

impl From<i64> for Term {
    fn from(value: i64) -> Self {
        Term::Integer(value)
    }
}

impl From<&str> for Term {
    fn from(value: &str) -> Self {
        Term::String(value.to_owned())
    }
}

impl From<String> for Term {
    fn from(value: String) -> Self {
        Term::String(value)
    }
}

impl From<Vec<u8>> for Term {
    fn from(value: Vec<u8>) -> Self {
        Term::Binary(value)
    }
}
