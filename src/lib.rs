//! Core library for the Rush generic server.
//! Provides OTP-style processes on top of Tokio: a node with a process table and name registry,
//! per-process mailboxes, and the call, cast and info protocol between processes.

pub use gen_server::{
    Atom, BehaviorFactory, BehaviorRegistry, Caller, DEFAULT_CHAN_SIZE,
    Destination, Envelope, Error as GenServerError, ExitReason, GenServer,
    Inbox, NET_KERNEL, NetKernel, Node, Pid, ProcessContext,
    ProcessLifecycle, ProcessOptions, Reference, Term,
};
