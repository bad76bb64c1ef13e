// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Node
//!
//! The `node` module provides the `Node` type, the local routing collaborator of the runtime. A
//! node allocates process identifiers, owns the process table and the name registry, and delivers
//! messages into mailboxes. It knows nothing about distribution: every destination is a process of
//! this node.
//!

use crate::{
    Atom, Error, GenServer, Inbox, Pid, ProcessOptions, Reference, Term,
    behavior::BehaviorRegistry,
    mailbox::{MailboxSender, mailbox},
    runner::ProcessRunner,
};

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use tracing::{Instrument, debug, debug_span, error};

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
};

/// Bits of the process counter stored in `Pid::id`; the rest goes to `Pid::serial`.
const PID_ID_BITS: u32 = 15;

/// Where a message is sent.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Destination {
    /// A process identifier.
    Pid(Pid),
    /// A registered name.
    Name(Atom),
}

impl From<Pid> for Destination {
    fn from(pid: Pid) -> Self {
        Destination::Pid(pid)
    }
}

impl From<&Pid> for Destination {
    fn from(pid: &Pid) -> Self {
        Destination::Pid(pid.clone())
    }
}

impl From<Atom> for Destination {
    fn from(name: Atom) -> Self {
        Destination::Name(name)
    }
}

impl From<&str> for Destination {
    fn from(name: &str) -> Self {
        Destination::Name(Atom::from(name))
    }
}

/// Node reference.
///
/// Cheap to clone; every clone shares the same process table.
#[derive(Clone)]
pub struct Node {
    /// Full name of the node.
    name: Atom,

    /// Creation epoch stamped on every pid and reference.
    creation: u8,

    /// Mailbox senders of the live processes.
    processes: Arc<RwLock<HashMap<Pid, MailboxSender>>>,

    /// Registered names.
    names: Arc<RwLock<HashMap<Atom, Pid>>>,

    /// Behavior constructors spawnable by name.
    behaviors: Arc<RwLock<BehaviorRegistry>>,

    /// Source of local process serials.
    next_pid: Arc<AtomicU32>,

    token: CancellationToken,
}

impl Node {
    /// Creates a node.
    ///
    /// # Arguments
    ///
    /// * `name` - The full node name, e.g. `demo@localhost`.
    /// * `creation` - The creation epoch of this incarnation of the node.
    ///
    pub fn new(name: &str, creation: u8) -> Self {
        Self::with_token(name, creation, CancellationToken::new())
    }

    /// Creates a node stopped by `token`. Cancelling the token terminates every process.
    pub fn with_token(name: &str, creation: u8, token: CancellationToken) -> Self {
        Node {
            name: Atom::from(name),
            creation,
            processes: Arc::new(RwLock::new(HashMap::new())),
            names: Arc::new(RwLock::new(HashMap::new())),
            behaviors: Arc::new(RwLock::new(BehaviorRegistry::default())),
            next_pid: Arc::new(AtomicU32::new(1)),
            token,
        }
    }

    /// Node name.
    pub fn name(&self) -> &Atom {
        &self.name
    }

    /// Node creation epoch.
    pub fn creation(&self) -> u8 {
        self.creation
    }

    /// Generates a call-correlation reference for this node.
    pub fn make_ref(&self) -> Reference {
        Reference::new(self.name.clone(), self.creation)
    }

    /// Token cancelled when the node shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stops every process of the node. Each one terminates with `ExitReason::Shutdown`.
    pub fn shutdown(&self) {
        debug!("Stopping node {}...", &self.name);
        self.token.cancel();
    }

    fn next_pid(&self) -> Pid {
        let counter = self.next_pid.fetch_add(1, Ordering::Relaxed);
        Pid {
            node: self.name.clone(),
            id: counter & ((1 << PID_ID_BITS) - 1),
            serial: counter >> PID_ID_BITS,
            creation: self.creation,
        }
    }

    /// Spawns a process running `behavior`.
    ///
    /// Returns once `init` has run.
    ///
    /// # Errors
    ///
    /// Returns `Error::Init` if `init` failed; the process is gone by then.
    ///
    pub async fn spawn<B>(
        &self,
        behavior: B,
        args: Vec<Term>,
        options: ProcessOptions,
    ) -> Result<Pid, Error>
    where
        B: GenServer,
    {
        self.spawn_boxed(Box::new(behavior), args, options).await
    }

    /// Spawns a process running an already boxed behavior.
    pub async fn spawn_boxed(
        &self,
        behavior: Box<dyn GenServer>,
        args: Vec<Term>,
        options: ProcessOptions,
    ) -> Result<Pid, Error> {
        let pid = self.next_pid();
        let (sender, mailbox, init) = mailbox(options.chan_size);
        {
            let mut processes = self.processes.write().await;
            processes.insert(pid.clone(), sender);
        }

        let span = options
            .span
            .unwrap_or_else(|| debug_span!("gen_server", pid = %pid));
        let runner =
            ProcessRunner::new(pid.clone(), behavior, mailbox, self.clone());
        tokio::spawn(runner.run(args).instrument(span));

        match init.await {
            Ok(true) => Ok(pid),
            _ => {
                error!("Process {} failed to init!", &pid);
                Err(Error::Init(format!("Process {} can not init", pid)))
            }
        }
    }

    /// Registers a behavior constructor under `name`.
    pub async fn register_behavior<F, B>(&self, name: &str, factory: F)
    where
        F: Fn() -> B + Send + Sync + 'static,
        B: GenServer,
    {
        let mut behaviors = self.behaviors.write().await;
        behaviors.insert(name, factory);
    }

    /// Spawns a process from a registered behavior constructor.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownBehavior` if no constructor is registered under `name`, or the
    /// errors of `spawn`.
    ///
    pub async fn spawn_named_behavior(
        &self,
        name: &str,
        args: Vec<Term>,
        options: ProcessOptions,
    ) -> Result<Pid, Error> {
        let behavior = {
            let behaviors = self.behaviors.read().await;
            behaviors.build(name)?
        };
        self.spawn_boxed(behavior, args, options).await
    }

    /// Opens a mailbox that is not driven by a behavior, for code running outside any process.
    ///
    /// The inbox leaves the process table when it is dropped.
    pub async fn create_inbox(&self, options: ProcessOptions) -> Inbox {
        let pid = self.next_pid();
        let (sender, mailbox, _) = mailbox(options.chan_size);
        {
            let mut processes = self.processes.write().await;
            // Entries of inboxes dropped outside a runtime.
            processes.retain(|_, sender| !sender.is_closed());
            processes.insert(pid.clone(), sender);
        }
        Inbox::new(pid, mailbox, self.clone())
    }

    async fn resolve(
        &self,
        to: Destination,
    ) -> Result<(Pid, MailboxSender), Error> {
        let pid = match to {
            Destination::Pid(pid) => pid,
            Destination::Name(name) => self
                .whereis(&name)
                .await
                .ok_or(Error::NameNotFound(name))?,
        };
        let processes = self.processes.read().await;
        match processes.get(&pid) {
            Some(sender) if !sender.is_closed() => Ok((pid, sender.clone())),
            _ => Err(Error::NoProcess(pid)),
        }
    }

    /// Delivers `message` to `to`. With a sender it lands on the addressed channel, otherwise on
    /// the plain channel.
    ///
    /// # Errors
    ///
    /// Returns `Error::NameNotFound` or `Error::NoProcess` if the destination can not be
    /// resolved, `Error::Send` if the mailbox closed during delivery.
    ///
    pub async fn send<D>(
        &self,
        from: Option<&Pid>,
        to: D,
        message: Term,
    ) -> Result<(), Error>
    where
        D: Into<Destination>,
    {
        let (pid, sender) = self.resolve(to.into()).await?;
        debug!("Sending message to {}.", &pid);
        sender.deliver(from.cloned(), message).await
    }

    /// Delivers `message` to the plain channel of `to` only if there is room for it right now.
    ///
    /// # Errors
    ///
    /// Same as `send`, plus `Error::Send` when the channel is full.
    ///
    pub async fn try_send<D>(&self, to: D, message: Term) -> Result<(), Error>
    where
        D: Into<Destination>,
    {
        let (pid, sender) = self.resolve(to.into()).await?;
        debug!("Sending message to {} without waiting.", &pid);
        sender.try_deliver(message)
    }

    /// Delivers `message` to the control channel of `to`.
    ///
    /// # Errors
    ///
    /// Same as `send`.
    ///
    pub async fn send_control<D>(&self, to: D, message: Term) -> Result<(), Error>
    where
        D: Into<Destination>,
    {
        let (pid, sender) = self.resolve(to.into()).await?;
        debug!("Sending control message to {}.", &pid);
        sender.deliver_control(message).await
    }

    /// Binds `name` to `pid`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoProcess` if `pid` is not alive and `Error::NameTaken` if another live
    /// process already holds the name.
    ///
    pub async fn register(&self, name: Atom, pid: Pid) -> Result<(), Error> {
        if !self.is_alive(&pid).await {
            return Err(Error::NoProcess(pid));
        }
        let mut names = self.names.write().await;
        if let Some(current) = names.get(&name) {
            if *current != pid && self.is_alive(current).await {
                error!("Name '{}' already registered!", &name);
                return Err(Error::NameTaken(name));
            }
        }
        debug!("Registering {} as '{}'.", &pid, &name);
        names.insert(name, pid);
        Ok(())
    }

    /// Removes a name binding.
    pub async fn unregister(&self, name: &Atom) -> Option<Pid> {
        let mut names = self.names.write().await;
        names.remove(name)
    }

    /// Looks a name up.
    pub async fn whereis(&self, name: &Atom) -> Option<Pid> {
        let names = self.names.read().await;
        names.get(name).cloned()
    }

    /// True while the process can receive messages.
    pub async fn is_alive(&self, pid: &Pid) -> bool {
        let processes = self.processes.read().await;
        processes
            .get(pid)
            .is_some_and(|sender| !sender.is_closed())
    }

    /// Pids of every live process.
    pub async fn processes(&self) -> Vec<Pid> {
        let processes = self.processes.read().await;
        processes
            .iter()
            .filter(|(_, sender)| !sender.is_closed())
            .map(|(pid, _)| pid.clone())
            .collect()
    }

    /// Removes a process and every name bound to it.
    pub(crate) async fn remove_process(&self, pid: &Pid) {
        {
            let mut processes = self.processes.write().await;
            processes.remove(pid);
        }
        let mut names = self.names.write().await;
        names.retain(|_, bound| bound != pid);
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    use tracing_test::traced_test;

    #[tokio::test]
    async fn test_pids_are_unique() {
        let node = Node::new("demo@localhost", 2);
        let a = node.next_pid();
        let b = node.next_pid();
        assert_ne!(a, b);
        assert_eq!(a.creation, 2);
        assert_eq!(a.node, Atom::from("demo@localhost"));
    }

    #[test]
    fn test_pid_serial_wraps() {
        let node = Node::new("demo", 1);
        node.next_pid.store(1 << PID_ID_BITS, Ordering::Relaxed);
        let pid = node.next_pid();
        assert_eq!(pid.id, 0);
        assert_eq!(pid.serial, 1);
    }

    #[tokio::test]
    async fn test_make_ref_uses_node_identity() {
        let node = Node::new("demo@localhost", 4);
        let reference = node.make_ref();
        assert_eq!(reference.node, Atom::from("demo@localhost"));
        assert_eq!(reference.creation, 4);
    }

    #[tokio::test]
    async fn test_send_to_unknown_destinations() {
        let node = Node::new("demo", 1);
        let result = node.send(None, "nobody", Term::Nil).await;
        assert_eq!(result, Err(Error::NameNotFound(Atom::from("nobody"))));

        let ghost = node.next_pid();
        let result = node.send(None, &ghost, Term::Nil).await;
        assert_eq!(result, Err(Error::NoProcess(ghost)));
    }

    #[tokio::test]
    async fn test_register_and_whereis() {
        let node = Node::new("demo", 1);
        let inbox = node.create_inbox(ProcessOptions::default()).await;
        let name = Atom::from("inbox");
        node.register(name.clone(), inbox.pid().clone()).await.unwrap();
        assert_eq!(node.whereis(&name).await, Some(inbox.pid().clone()));

        let other = node.create_inbox(ProcessOptions::default()).await;
        assert_eq!(
            node.register(name.clone(), other.pid().clone()).await,
            Err(Error::NameTaken(name.clone()))
        );

        assert_eq!(node.unregister(&name).await, Some(inbox.pid().clone()));
        assert_eq!(node.whereis(&name).await, None);
    }

    #[tokio::test]
    async fn test_register_dead_process() {
        let node = Node::new("demo", 1);
        let ghost = node.next_pid();
        assert_eq!(
            node.register(Atom::from("ghost"), ghost.clone()).await,
            Err(Error::NoProcess(ghost))
        );
    }

    #[tokio::test]
    async fn test_remove_process_drops_names() {
        let node = Node::new("demo", 1);
        let inbox = node.create_inbox(ProcessOptions::default()).await;
        let pid = inbox.pid().clone();
        node.register(Atom::from("a"), pid.clone()).await.unwrap();
        node.register(Atom::from("b"), pid.clone()).await.unwrap();
        node.remove_process(&pid).await;
        assert!(!node.is_alive(&pid).await);
        assert_eq!(node.whereis(&Atom::from("a")).await, None);
        assert_eq!(node.whereis(&Atom::from("b")).await, None);
        assert!(node.processes().await.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_inboxes_leave_the_table() {
        let node = Node::new("demo", 1);
        for _ in 0..1000 {
            let inbox = node.create_inbox(ProcessOptions::default()).await;
            drop(inbox);
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(node.processes.read().await.is_empty());

        let inbox = node.create_inbox(ProcessOptions::default()).await;
        let pid = inbox.pid().clone();
        node.register(Atom::from("short-lived"), pid.clone()).await.unwrap();
        drop(inbox);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!node.processes.read().await.contains_key(&pid));
        assert_eq!(node.whereis(&Atom::from("short-lived")).await, None);
    }

    #[tokio::test]
    async fn test_try_send_on_full_mailbox() {
        let node = Node::new("demo", 1);
        let mut inbox = node
            .create_inbox(ProcessOptions::default().with_chan_size(1))
            .await;
        let pid = inbox.pid().clone();
        node.try_send(&pid, Term::Integer(1)).await.unwrap();
        assert!(matches!(
            node.try_send(&pid, Term::Integer(2)).await,
            Err(Error::Send(_))
        ));
        assert_eq!(inbox.recv().await, Some(Term::Integer(1)));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_shutdown_cancels_token() {
        let token = CancellationToken::new();
        let node = Node::with_token("demo", 1, token.clone());
        node.shutdown();
        assert!(token.is_cancelled());
        assert!(logs_contain("Stopping node demo..."));
    }
}
