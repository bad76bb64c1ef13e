// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Process context
//!
//! Every callback of a `GenServer` receives a `ProcessContext`. It carries the identity of the
//! running process and a handle to its node, and it is the only way a behavior talks to the rest
//! of the world: registering a name, calling, casting, sending raw messages and answering a call
//! after the fact.
//!
//! Sends from the context wait for room in the destination mailbox. The wait ends if the node shuts
//! down, taking the process with it.
//!

use crate::{
    Atom, Destination, Error, Node, Pid, Reference, Term, client,
    envelope::Caller,
};

/// Execution context handed to every `GenServer` callback.
///
/// Gives the behavior its own identity and the outbound half of the client API. Every send goes
/// through the node; a delivery failure comes back as an `Error`, and propagating it with `?` out
/// of a callback terminates the process.
pub struct ProcessContext {
    /// Identity of the process.
    pid: Pid,
    /// Node the process runs on.
    node: Node,
}

impl ProcessContext {
    pub(crate) fn new(pid: Pid, node: Node) -> Self {
        Self { pid, node }
    }

    /// Identity of this process.
    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    /// Node this process runs on.
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Generates a reference on this node.
    pub fn make_ref(&self) -> Reference {
        self.node.make_ref()
    }

    /// Registers this process under `name`.
    pub async fn register(&self, name: &str) -> Result<(), Error> {
        self.node.register(Atom::from(name), self.pid.clone()).await
    }

    /// Sends a call to `to` and returns its reference without waiting for the reply.
    ///
    /// The reply reaches `handle_info` as `{Ref, Reply}`.
    ///
    /// # Errors
    ///
    /// Returns the delivery error of the node.
    ///
    pub async fn call<D>(&self, to: D, request: Term) -> Result<Reference, Error>
    where
        D: Into<Destination>,
    {
        client::call(&self.node, &self.pid, to, request).await
    }

    /// Sends a cast to `to`.
    pub async fn cast<D>(&self, to: D, request: Term) -> Result<(), Error>
    where
        D: Into<Destination>,
    {
        client::cast(&self.node, to, request).await
    }

    /// Sends a raw, untagged message to `to`.
    pub async fn send<D>(&self, to: D, message: Term) -> Result<(), Error>
    where
        D: Into<Destination>,
    {
        client::send(&self.node, to, message).await
    }

    /// Answers a call whose `handle_call` returned `None`.
    pub async fn reply(&self, from: &Caller, reply: Term) -> Result<(), Error> {
        client::reply(&self.node, from, reply).await
    }
}
