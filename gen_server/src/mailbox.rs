// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Mailbox
//!
//! A mailbox is the bundle of input channels owned by exactly one process:
//!
//! - **plain** messages, delivered without a sender;
//! - **addressed** messages, delivered together with the sender's `Pid`;
//! - **control** messages, the node-to-process control plane;
//! - a one-shot **init** acknowledgement the process fires once `init` has run.
//!
//! The node keeps the `MailboxSender` half in its process table; the runner owns the `Mailbox`.
//!

use crate::{Error, Pid, Term};

use tokio::{
    select,
    sync::{mpsc, oneshot},
};

use tracing::debug;

/// Sender side of the init acknowledgement.
pub type InitSender = oneshot::Sender<bool>;

/// Receiver side of the init acknowledgement.
pub type InitReceiver = oneshot::Receiver<bool>;

/// A message taken from one of the mailbox channels.
#[derive(Clone, Debug, PartialEq)]
pub enum Received {
    /// From the control channel.
    Control(Term),
    /// From the addressed channel, with its sender.
    Addressed(Pid, Term),
    /// From the plain channel.
    Plain(Term),
}

impl Received {
    /// The message itself.
    pub fn term(&self) -> &Term {
        match self {
            Received::Control(term)
            | Received::Addressed(_, term)
            | Received::Plain(term) => term,
        }
    }

    /// Drops the channel information.
    pub fn into_term(self) -> Term {
        match self {
            Received::Control(term)
            | Received::Addressed(_, term)
            | Received::Plain(term) => term,
        }
    }
}

/// Writer half of a mailbox.
#[derive(Clone, Debug)]
pub struct MailboxSender {
    plain: mpsc::Sender<Term>,
    addressed: mpsc::Sender<(Pid, Term)>,
    control: mpsc::Sender<Term>,
}

impl MailboxSender {
    /// Delivers a message. With a sender it goes to the addressed channel, otherwise to the
    /// plain channel. Waits while the channel is full.
    ///
    /// # Errors
    ///
    /// Returns `Error::Send` if the mailbox has been closed.
    ///
    pub async fn deliver(
        &self,
        from: Option<Pid>,
        message: Term,
    ) -> Result<(), Error> {
        let result = match from {
            Some(from) => self
                .addressed
                .send((from, message))
                .await
                .map_err(|error| error.to_string()),
            None => self
                .plain
                .send(message)
                .await
                .map_err(|error| error.to_string()),
        };
        result.map_err(|error| {
            debug!("Failed to deliver message! {}", error);
            Error::Send(error)
        })
    }

    /// Delivers a message to the plain channel without waiting for capacity.
    ///
    /// # Errors
    ///
    /// Returns `Error::Send` if the channel is full or the mailbox has been closed.
    ///
    pub fn try_deliver(&self, message: Term) -> Result<(), Error> {
        self.plain.try_send(message).map_err(|error| {
            debug!("Failed to deliver message! {}", error);
            Error::Send(error.to_string())
        })
    }

    /// Delivers a message to the control channel.
    ///
    /// # Errors
    ///
    /// Returns `Error::Send` if the mailbox has been closed.
    ///
    pub async fn deliver_control(&self, message: Term) -> Result<(), Error> {
        self.control.send(message).await.map_err(|error| {
            debug!("Failed to deliver control message! {}", error);
            Error::Send(error.to_string())
        })
    }

    /// True once the owning process dropped its mailbox.
    pub fn is_closed(&self) -> bool {
        self.plain.is_closed()
    }
}

/// Reader half of a mailbox.
#[derive(Debug)]
pub struct Mailbox {
    plain: mpsc::Receiver<Term>,
    addressed: mpsc::Receiver<(Pid, Term)>,
    control: mpsc::Receiver<Term>,
    init: Option<InitSender>,
}

impl Mailbox {
    /// Waits until one of the channels has a message and takes it. No order is promised between
    /// channels; each channel is FIFO.
    ///
    /// Returns `None` once every sender has been dropped.
    pub async fn recv(&mut self) -> Option<Received> {
        select! {
            Some(message) = self.control.recv() => Some(Received::Control(message)),
            Some((from, message)) = self.addressed.recv() => Some(Received::Addressed(from, message)),
            Some(message) = self.plain.recv() => Some(Received::Plain(message)),
            else => None,
        }
    }

    /// Fires the init acknowledgement. Only the first call has an effect.
    pub fn acknowledge_init(&mut self, started: bool) {
        if let Some(sender) = self.init.take() {
            if sender.send(started).is_err() {
                debug!("Nobody is waiting for the init acknowledgement.");
            }
        }
    }

    /// Closes every channel. Messages still queued are dropped with the mailbox.
    pub fn close(&mut self) {
        self.plain.close();
        self.addressed.close();
        self.control.close();
    }
}

/// Creates a mailbox whose channels hold `chan_size` messages each.
///
/// # Returns
///
/// Returns the writer half, the reader half and the receiver of the init acknowledgement.
///
pub fn mailbox(chan_size: usize) -> (MailboxSender, Mailbox, InitReceiver) {
    let chan_size = chan_size.max(1);
    let (plain_sender, plain) = mpsc::channel(chan_size);
    let (addressed_sender, addressed) = mpsc::channel(chan_size);
    let (control_sender, control) = mpsc::channel(chan_size);
    let (init_sender, init_receiver) = oneshot::channel();
    (
        MailboxSender {
            plain: plain_sender,
            addressed: addressed_sender,
            control: control_sender,
        },
        Mailbox {
            plain,
            addressed,
            control,
            init: Some(init_sender),
        },
        init_receiver,
    )
}
