// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Rush Generic Server
//!
//! An implementation of the OTP generic server behavior on top of Tokio. Business logic is
//! packaged as a process that receives asynchronous casts, synchronous calls with correlated
//! replies, out-of-band info messages and node-level control signals, all multiplexed through a
//! per-process mailbox.
//!
//! ## Overview
//!
//! - A **process** is a Tokio task owning a behavior and a mailbox. Nothing else can reach its
//!   state; the only way in is a message.
//! - The **mailbox** has a plain channel, an addressed channel (messages carrying the sender's
//!   pid), a control channel and a one-shot init acknowledgement.
//! - Every message is a [`Term`]. The runtime classifies it by protocol tag into a call, a cast,
//!   a control signal or an info message and invokes exactly one callback of the [`GenServer`].
//! - A call carries `{Pid, Ref}`. When `handle_call` returns a reply, `{Ref, Reply}` is sent back
//!   to `Pid`; the [`Reference`] is what lets the caller match the reply to its request.
//! - A callback that fails, by error or by panic, stops its own process and nothing else.
//!   [`GenServer::terminate`] then runs once with the [`ExitReason`].
//!
//! ## Getting Started
//!
//! ```ignore
//! use gen_server::{Caller, Error, GenServer, Node, ProcessContext, ProcessOptions, Term};
//! use async_trait::async_trait;
//! use std::time::Duration;
//!
//! struct Ping;
//!
//! #[async_trait]
//! impl GenServer for Ping {
//!     async fn handle_call(
//!         &mut self,
//!         _ctx: &mut ProcessContext,
//!         _from: &Caller,
//!         request: Term,
//!     ) -> Result<Option<Term>, Error> {
//!         if request == Term::from("ping") {
//!             Ok(Some(Term::from("pong")))
//!         } else {
//!             Ok(None)
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let node = Node::new("demo@localhost", 1);
//!     let pid = node.spawn(Ping, vec![], ProcessOptions::default()).await?;
//!
//!     let mut inbox = node.create_inbox(ProcessOptions::default()).await;
//!     let reply = inbox.call(&pid, Term::from("ping"), Duration::from_secs(1)).await?;
//!     assert_eq!(reply, Term::from("pong"));
//!
//!     node.shutdown();
//!     Ok(())
//! }
//! ```
//!

mod behavior;
mod client;
mod context;
pub mod envelope;
mod error;
pub mod mailbox;
mod net_kernel;
mod node;
mod options;
mod reference;
mod runner;
mod term;

//
// Behavior Contract
//

/// The capability set every process implementation provides.
///
/// See [`ProcessContext`] for what a callback can do.
pub use behavior::GenServer;

/// Boxed behavior constructor, as stored by the node's behavior registry.
pub use behavior::BehaviorFactory;

/// Name-keyed behavior constructors.
pub use behavior::BehaviorRegistry;

/// Execution context of a callback: identity, node access and the client helpers.
pub use context::ProcessContext;

//
// Client API
//

/// A pid and a mailbox for code running outside any process.
pub use client::Inbox;

//
// Envelope Protocol
//

/// Sender descriptor of a call.
pub use envelope::Caller;

/// A classified message.
pub use envelope::Envelope;

//
// Error Handling
//

/// Error type for the runtime.
pub use error::Error;

/// Why a process stopped.
pub use error::ExitReason;

//
// Node
//

/// Where a message is sent: a pid or a registered name.
pub use node::Destination;

/// Local routing collaborator: process table, name registry, spawn and send.
pub use node::Node;

/// Per-process configuration.
pub use options::ProcessOptions;

/// Default mailbox channel capacity.
pub use options::DEFAULT_CHAN_SIZE;

//
// Terms
//

/// Symbolic constant.
pub use term::Atom;

/// Process identifier.
pub use term::Pid;

/// Call-correlation reference.
pub use reference::Reference;

/// Structured message value.
pub use term::Term;

/// Lifecycle state of a process.
pub use runner::ProcessLifecycle;

//
// Sample Behaviors
//

/// Node control service answering `is_auth`.
pub use net_kernel::{NET_KERNEL, NetKernel};
