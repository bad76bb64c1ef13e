// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Process options
//!
//! `ProcessOptions` is handed to `Node::spawn` and `Node::create_inbox`. It sizes the mailbox
//! channels, which is where backpressure comes from: a full channel makes ordinary senders wait,
//! while replies to calls are dropped instead. It also lets the caller pick the tracing span the
//! process logs in.
//!

use tracing::Span;

/// Default capacity of every mailbox channel.
pub const DEFAULT_CHAN_SIZE: usize = 100;

/// Per-process configuration.
///
/// `chan_size` bounds each mailbox channel; senders wait when it is full. `span` is the tracing
/// span the process loop runs in. When it is `None` the node opens a `gen_server` span carrying
/// the process identifier.
#[derive(Clone, Debug)]
pub struct ProcessOptions {
    /// Size of each mailbox channel.
    pub chan_size: usize,
    /// Span used for every log line of the process.
    pub span: Option<Span>,
}

impl ProcessOptions {
    /// Sets the mailbox channel size. Zero is raised to one.
    pub fn with_chan_size(mut self, chan_size: usize) -> Self {
        self.chan_size = chan_size.max(1);
        self
    }

    /// Sets the span the process loop logs in.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            chan_size: DEFAULT_CHAN_SIZE,
            span: None,
        }
    }
}
