// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Client API
//!
//! Builders of outbound traffic. `call`, `cast`, `send` and `reply` construct the envelope terms
//! and hand them to the node. They return once the message sits in the destination mailbox, never
//! waiting for the callee to process it.
//!
//! The `Inbox` is a bare mailbox with a pid, for code that is not a process: the application's
//! main task, a test, a bridge to another runtime. Its `call` does wait for the reply, with a
//! timeout, by picking the `{Ref, Reply}` message out of the mailbox.
//!

use crate::{
    Destination, Error, Node, Pid, Reference, Term,
    envelope::{Caller, Envelope, reply_term},
    mailbox::{Mailbox, Received},
};

use tracing::debug;

use std::{collections::VecDeque, time::Duration};

pub(crate) async fn call<D>(
    node: &Node,
    from: &Pid,
    to: D,
    request: Term,
) -> Result<Reference, Error>
where
    D: Into<Destination>,
{
    let reference = node.make_ref();
    let envelope = Envelope::Call {
        from: Caller {
            pid: from.clone(),
            reference: reference.clone(),
        },
        request,
    };
    node.send(Some(from), to, envelope.into_term()).await?;
    Ok(reference)
}

pub(crate) async fn cast<D>(node: &Node, to: D, request: Term) -> Result<(), Error>
where
    D: Into<Destination>,
{
    node.send(None, to, Envelope::Cast(request).into_term()).await
}

pub(crate) async fn send<D>(node: &Node, to: D, message: Term) -> Result<(), Error>
where
    D: Into<Destination>,
{
    node.send(None, to, message).await
}

pub(crate) async fn reply(
    node: &Node,
    from: &Caller,
    reply: Term,
) -> Result<(), Error> {
    node.send(None, &from.pid, reply_term(&from.reference, reply))
        .await
}

/// True if `term` is the `{Ref, Reply}` answer to `reference`.
fn is_reply_to(term: &Term, reference: &Reference) -> bool {
    matches!(
        term.as_tuple(),
        Some([Term::Ref(candidate), _]) if candidate == reference
    )
}

/// Mailbox with a pid, not driven by a behavior.
///
/// Messages are read with `recv`; `call` performs a selective receive for its reply and keeps
/// every other message for later `recv` calls, in arrival order.
pub struct Inbox {
    pid: Pid,
    mailbox: Mailbox,
    node: Node,
    stash: VecDeque<Received>,
}

impl Inbox {
    pub(crate) fn new(pid: Pid, mailbox: Mailbox, node: Node) -> Self {
        Self {
            pid,
            mailbox,
            node,
            stash: VecDeque::new(),
        }
    }

    /// Identity of the inbox.
    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    /// Sends a call and waits up to `timeout` for its reply.
    ///
    /// # Errors
    ///
    /// Returns the delivery error of the node, or the errors of `receive_reply`.
    ///
    pub async fn call<D>(
        &mut self,
        to: D,
        request: Term,
        timeout: Duration,
    ) -> Result<Term, Error>
    where
        D: Into<Destination>,
    {
        let reference = call(&self.node, &self.pid, to, request).await?;
        self.receive_reply(&reference, timeout).await
    }

    /// Sends a call and returns its reference without waiting.
    pub async fn call_async<D>(
        &self,
        to: D,
        request: Term,
    ) -> Result<Reference, Error>
    where
        D: Into<Destination>,
    {
        call(&self.node, &self.pid, to, request).await
    }

    /// Waits up to `timeout` for the reply to `reference`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Timeout` if no reply arrived in time, or `Error::NoProcess` if the node
    /// dropped the inbox from its process table while waiting.
    ///
    pub async fn receive_reply(
        &mut self,
        reference: &Reference,
        timeout: Duration,
    ) -> Result<Term, Error> {
        if let Some(position) = self
            .stash
            .iter()
            .position(|received| is_reply_to(received.term(), reference))
        {
            if let Some(received) = self.stash.remove(position) {
                return Ok(Self::reply_body(received.into_term()));
            }
        }
        tokio::time::timeout(timeout, self.wait_reply(reference))
            .await
            .map_err(|_| {
                debug!("No reply to {} in {:?}.", reference, timeout);
                Error::Timeout
            })?
    }

    async fn wait_reply(&mut self, reference: &Reference) -> Result<Term, Error> {
        while let Some(received) = self.mailbox.recv().await {
            if is_reply_to(received.term(), reference) {
                return Ok(Self::reply_body(received.into_term()));
            }
            self.stash.push_back(received);
        }
        // The node dropped the sender: this pid is no longer routable.
        Err(Error::NoProcess(self.pid.clone()))
    }

    fn reply_body(term: Term) -> Term {
        match term {
            Term::Tuple(mut elements) if elements.len() == 2 => {
                elements.swap_remove(1)
            }
            other => other,
        }
    }

    /// Sends a cast.
    pub async fn cast<D>(&self, to: D, request: Term) -> Result<(), Error>
    where
        D: Into<Destination>,
    {
        cast(&self.node, to, request).await
    }

    /// Sends a raw, untagged message.
    pub async fn send<D>(&self, to: D, message: Term) -> Result<(), Error>
    where
        D: Into<Destination>,
    {
        send(&self.node, to, message).await
    }

    /// Takes the next message, with the channel it arrived on.
    pub async fn recv_from(&mut self) -> Option<Received> {
        match self.stash.pop_front() {
            Some(received) => Some(received),
            None => self.mailbox.recv().await,
        }
    }

    /// Takes the next message.
    pub async fn recv(&mut self) -> Option<Term> {
        self.recv_from().await.map(Received::into_term)
    }
}

impl Drop for Inbox {
    fn drop(&mut self) {
        self.mailbox.close();
        // Outside a runtime the closed entry is pruned by the next `create_inbox`.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let node = self.node.clone();
            let pid = self.pid.clone();
            handle.spawn(async move {
                node.remove_process(&pid).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{Atom, ProcessOptions};

    #[test]
    fn test_is_reply_to() {
        let reference = Reference::from_nanos(Atom::from("demo"), 1, 10);
        let other = Reference::from_nanos(Atom::from("demo"), 1, 11);
        let reply = reply_term(&reference, Term::atom("ok"));
        assert!(is_reply_to(&reply, &reference));
        assert!(!is_reply_to(&reply, &other));
        assert!(!is_reply_to(&Term::Ref(reference.clone()), &reference));
    }

    #[tokio::test]
    async fn test_receive_reply_keeps_other_messages() {
        let node = Node::new("demo", 1);
        let mut inbox = node.create_inbox(ProcessOptions::default()).await;
        let pid = inbox.pid().clone();
        let reference = node.make_ref();

        node.send(None, &pid, Term::atom("first")).await.unwrap();
        node.send(None, &pid, reply_term(&reference, Term::atom("answer")))
            .await
            .unwrap();
        node.send(None, &pid, Term::atom("second")).await.unwrap();

        let reply = inbox
            .receive_reply(&reference, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reply, Term::atom("answer"));
        assert_eq!(inbox.recv().await, Some(Term::atom("first")));
        assert_eq!(inbox.recv().await, Some(Term::atom("second")));
    }

    #[tokio::test]
    async fn test_receive_reply_times_out() {
        let node = Node::new("demo", 1);
        let mut inbox = node.create_inbox(ProcessOptions::default()).await;
        let reference = node.make_ref();
        let result = inbox
            .receive_reply(&reference, Duration::from_millis(50))
            .await;
        assert_eq!(result, Err(Error::Timeout));
    }

    #[tokio::test]
    async fn test_cast_and_send_shapes() {
        let node = Node::new("demo", 1);
        let mut target = node.create_inbox(ProcessOptions::default()).await;
        let sender = node.create_inbox(ProcessOptions::default()).await;
        let to = target.pid().clone();

        sender.cast(&to, Term::from("log-me")).await.unwrap();
        sender.send(&to, Term::atom("hello")).await.unwrap();

        assert_eq!(
            target.recv_from().await,
            Some(Received::Plain(Envelope::Cast(Term::from("log-me")).into_term()))
        );
        assert_eq!(target.recv_from().await, Some(Received::Plain(Term::atom("hello"))));
    }

    #[tokio::test]
    async fn test_call_async_builds_addressed_call() {
        let node = Node::new("demo", 1);
        let mut target = node.create_inbox(ProcessOptions::default()).await;
        let caller = node.create_inbox(ProcessOptions::default()).await;
        let reference = caller
            .call_async(target.pid(), Term::from("ping"))
            .await
            .unwrap();

        match target.recv_from().await {
            Some(Received::Addressed(from, term)) => {
                assert_eq!(&from, caller.pid());
                assert_eq!(
                    Envelope::classify(term),
                    Envelope::Call {
                        from: Caller {
                            pid: caller.pid().clone(),
                            reference,
                        },
                        request: Term::from("ping"),
                    }
                );
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_wait_reply_on_unrouted_inbox() {
        let node = Node::new("demo", 1);
        let mut inbox = node.create_inbox(ProcessOptions::default()).await;
        let pid = inbox.pid().clone();
        node.remove_process(&pid).await;
        let reference = node.make_ref();
        assert_eq!(
            inbox.receive_reply(&reference, Duration::from_secs(1)).await,
            Err(Error::NoProcess(pid))
        );
    }

    #[tokio::test]
    async fn test_send_to_closed_inbox_fails() {
        let node = Node::new("demo", 1);
        let target = node.create_inbox(ProcessOptions::default()).await;
        let to = target.pid().clone();
        drop(target);
        assert_eq!(
            node.send(None, &to, Term::Nil).await,
            Err(Error::NoProcess(to))
        );
    }
}
