// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Process Runtime Loop
//!
//! The `ProcessRunner` drives one process from creation to termination. It owns the behavior and
//! the reader half of the mailbox, and it is the only code that ever invokes the behavior.
//!
//! # Lifecycle
//!
//! ```text
//! Starting --init ok--> Running --fault / shutdown--> Terminated
//!     \------------------init failed---------------------/
//! ```
//!
//! - **Starting**: `init` runs with the constructor arguments, then the init acknowledgement is
//!   fired so that `Node::spawn` can return.
//! - **Running**: the loop waits for exactly one message from the mailbox, classifies it and
//!   invokes exactly one callback, which runs to completion before the next message is taken.
//!   Messages on the control channel are control signals whatever their shape.
//! - **Terminated**: reached when a callback returns an error or panics, when the node shuts down
//!   (even in the middle of a callback), or when every mailbox sender is gone. The process leaves the node table, `terminate` runs
//!   once with the reason, and any message still queued is dropped.
//!
//! # Fault boundary
//!
//! Every callback runs behind `guard`, which turns both an `Err` return and a panic into an
//! `ExitReason`. A fault therefore only ever stops the process that raised it.
//!
//! # Replies
//!
//! The reply to a call is delivered without waiting for room in the caller's mailbox. If the
//! caller is gone or its mailbox is full, the reply is dropped with a warning and the process keeps
//! serving its other callers.
//!

use crate::{
    Error, ExitReason, GenServer, Node, Pid, ProcessContext, Term,
    envelope::{Envelope, reply_term},
    mailbox::{Mailbox, Received},
};

use futures::FutureExt;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use std::{any::Any, future::Future, panic::AssertUnwindSafe};

/// Lifecycle state of a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessLifecycle {
    /// `init` has not completed yet.
    Starting,
    /// Processing messages.
    Running,
    /// Stopped for good.
    Terminated,
}

/// Runs a callback future, turning errors and panics into an exit reason.
async fn guard<T, F>(future: F) -> Result<T, ExitReason>
where
    F: Future<Output = Result<T, Error>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(ExitReason::Error(error)),
        Err(panic) => Err(ExitReason::Panic(panic_message(panic))),
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

/// Execution engine of a single process.
pub(crate) struct ProcessRunner {
    /// Identity of the process.
    pid: Pid,

    /// The behavior implementation.
    behavior: Box<dyn GenServer>,

    /// Current lifecycle state.
    lifecycle: ProcessLifecycle,

    /// Reader half of the mailbox.
    mailbox: Mailbox,

    /// Node used for replies and for leaving the process table.
    node: Node,
}

impl ProcessRunner {
    pub(crate) fn new(
        pid: Pid,
        behavior: Box<dyn GenServer>,
        mailbox: Mailbox,
        node: Node,
    ) -> Self {
        Self {
            pid,
            behavior,
            lifecycle: ProcessLifecycle::Starting,
            mailbox,
            node,
        }
    }

    /// Runs the whole lifecycle of the process.
    ///
    /// # Arguments
    ///
    /// * `args` - Constructor arguments handed to `init`.
    ///
    pub(crate) async fn run(mut self, args: Vec<Term>) {
        let mut ctx = ProcessContext::new(self.pid.clone(), self.node.clone());
        let token = self.node.shutdown_token();
        let mut args = Some(args);
        let mut reason = ExitReason::Shutdown;

        loop {
            match self.lifecycle {
                // State: STARTING
                ProcessLifecycle::Starting => {
                    debug!("Process {} is starting.", &self.pid);
                    let args = args.take().unwrap_or_default();
                    match guard(self.behavior.init(&mut ctx, args)).await {
                        Ok(()) => {
                            debug!("Process {} has started.", &self.pid);
                            self.lifecycle = ProcessLifecycle::Running;
                            self.mailbox.acknowledge_init(true);
                        }
                        Err(exit) => {
                            error!(
                                "Process {} failed to init: {}",
                                &self.pid, exit
                            );
                            reason = exit;
                            self.lifecycle = ProcessLifecycle::Terminated;
                        }
                    }
                }
                // State: RUNNING
                ProcessLifecycle::Running => {
                    reason = self.receive(&mut ctx, &token).await;
                    self.lifecycle = ProcessLifecycle::Terminated;
                }
                // State: TERMINATED
                ProcessLifecycle::Terminated => {
                    self.mailbox.close();
                    self.node.remove_process(&self.pid).await;
                    self.mailbox.acknowledge_init(false);

                    let terminated = guard(async {
                        self.behavior.terminate(&mut ctx, &reason).await;
                        Ok(())
                    })
                    .await;
                    if let Err(exit) = terminated {
                        error!(
                            "Process {} failed to terminate: {}",
                            &self.pid, exit
                        );
                    }
                    debug!("Process {} is terminated: {}", &self.pid, &reason);
                    break;
                }
            }
        }
    }

    /// Takes and dispatches messages until the process has to stop.
    ///
    /// # Returns
    ///
    /// Returns why the process stops.
    ///
    async fn receive(
        &mut self,
        ctx: &mut ProcessContext,
        token: &CancellationToken,
    ) -> ExitReason {
        loop {
            let received = select! {
                _ = token.cancelled() => {
                    debug!("Node is shutting down.");
                    return ExitReason::Shutdown;
                }
                received = self.mailbox.recv() => received,
            };
            let Some(received) = received else {
                debug!("Mailbox of {} lost every sender.", &self.pid);
                return ExitReason::Shutdown;
            };
            // A callback waiting on a full mailbox must not outlive the node.
            let dispatched = select! {
                _ = token.cancelled() => {
                    debug!("Node is shutting down during a callback.");
                    return ExitReason::Shutdown;
                }
                dispatched = self.dispatch(received, ctx) => dispatched,
            };
            if let Err(exit) = dispatched {
                error!("Process {} crashed: {}", &self.pid, exit);
                return exit;
            }
        }
    }

    /// Classifies one message and invokes the matching callback.
    async fn dispatch(
        &mut self,
        received: Received,
        ctx: &mut ProcessContext,
    ) -> Result<(), ExitReason> {
        let envelope = match received {
            Received::Control(message) => Envelope::Control(message),
            Received::Addressed(from, message) => {
                debug!("Message from {}.", from);
                Envelope::classify(message)
            }
            Received::Plain(message) => Envelope::classify(message),
        };

        match envelope {
            Envelope::Call { from, request } => {
                let reply =
                    guard(self.behavior.handle_call(ctx, &from, request))
                        .await?;
                if let Some(reply) = reply {
                    let message = reply_term(&from.reference, reply);
                    if let Err(error) =
                        self.node.try_send(&from.pid, message).await
                    {
                        warn!(
                            "Reply to {} dropped: {}",
                            &from.pid, error
                        );
                    }
                }
            }
            Envelope::Cast(message) => {
                guard(self.behavior.handle_cast(ctx, message)).await?
            }
            Envelope::Control(message) => {
                debug!("Control message ignored: {:?}", message);
            }
            Envelope::Info(message) => {
                guard(self.behavior.handle_info(ctx, message)).await?
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::{ProcessOptions, envelope::Caller};

    use async_trait::async_trait;
    use tracing_test::traced_test;

    use std::time::Duration;

    #[tokio::test]
    async fn test_guard_passes_values() {
        let result = guard(async { Ok::<_, Error>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_guard_maps_errors() {
        let result = guard(async {
            Err::<(), _>(Error::Functional("bad".to_owned()))
        })
        .await;
        assert_eq!(
            result,
            Err(ExitReason::Error(Error::Functional("bad".to_owned())))
        );
    }

    fn explode(value: usize) -> Result<(), Error> {
        panic!("boom {}", value)
    }

    fn explode_static() -> Result<(), Error> {
        panic!("static")
    }

    #[tokio::test]
    async fn test_guard_catches_panics() {
        let result = guard(async { explode(1) }).await;
        assert_eq!(result, Err(ExitReason::Panic("boom 1".to_owned())));

        let result = guard(async { explode_static() }).await;
        assert_eq!(result, Err(ExitReason::Panic("static".to_owned())));
    }

    struct Idle;

    #[async_trait]
    impl GenServer for Idle {
        async fn handle_call(
            &mut self,
            _ctx: &mut ProcessContext,
            _from: &Caller,
            _message: Term,
        ) -> Result<Option<Term>, Error> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_runner_starts_in_starting_state() {
        let node = Node::new("demo", 1);
        let inbox = node.create_inbox(Default::default()).await;
        let (_, mailbox, _) = crate::mailbox::mailbox(1);
        let runner = ProcessRunner::new(
            inbox.pid().clone(),
            Box::new(Idle),
            mailbox,
            node,
        );
        assert_eq!(runner.lifecycle, ProcessLifecycle::Starting);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_control_messages_are_ignored() {
        let node = Node::new("demo", 1);
        let pid = node
            .spawn(Idle, vec![], ProcessOptions::default())
            .await
            .unwrap();
        node.send_control(&pid, Term::atom("credit")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(logs_contain("Control message ignored"));
        assert!(node.is_alive(&pid).await);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_shutdown_stops_the_loop() {
        let node = Node::new("demo", 1);
        let pid = node
            .spawn(Idle, vec![], ProcessOptions::default())
            .await
            .unwrap();
        node.shutdown();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!node.is_alive(&pid).await);
        assert!(logs_contain("is terminated: shutdown"));
    }

    struct Echo;

    #[async_trait]
    impl GenServer for Echo {
        async fn handle_call(
            &mut self,
            _ctx: &mut ProcessContext,
            _from: &Caller,
            message: Term,
        ) -> Result<Option<Term>, Error> {
            Ok(Some(message))
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_reply_to_full_mailbox_is_dropped() {
        let node = Node::new("demo", 1);
        let pid = node
            .spawn(Echo, vec![], ProcessOptions::default())
            .await
            .unwrap();

        let mut slow = node
            .create_inbox(ProcessOptions::default().with_chan_size(1))
            .await;
        for value in 0..3 {
            slow.call_async(&pid, Term::Integer(value)).await.unwrap();
        }

        let mut other = node.create_inbox(ProcessOptions::default()).await;
        let reply = other
            .call(&pid, Term::atom("ping"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reply, Term::atom("ping"));
        assert!(logs_contain("dropped"));

        let first = slow.recv().await.unwrap();
        assert_eq!(
            first.as_tuple().map(|reply| reply[1].clone()),
            Some(Term::Integer(0))
        );
    }
}
