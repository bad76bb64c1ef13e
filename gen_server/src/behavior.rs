// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Behavior
//!
//! The `behavior` module provides the `GenServer` trait, the contract every process implementation
//! satisfies. The runtime loop only sees this capability set; the state of the implementation is
//! its own private fields, touched by one callback at a time.
//!

use crate::{Error, ExitReason, ProcessContext, Term, envelope::Caller};

use async_trait::async_trait;

use std::{collections::HashMap, sync::Arc};

/// Generic server behavior.
///
/// Callbacks run to completion, one at a time, in the task of the process that owns the
/// implementation. A callback that returns an error, or panics, terminates the process: `terminate`
/// is then invoked once with the reason and no further message is dispatched.
///
/// # Examples
///
/// ```ignore
/// struct Echo;
///
/// #[async_trait]
/// impl GenServer for Echo {
///     async fn handle_call(
///         &mut self,
///         _ctx: &mut ProcessContext,
///         _from: &Caller,
///         request: Term,
///     ) -> Result<Option<Term>, Error> {
///         Ok(Some(request))
///     }
/// }
/// ```
#[async_trait]
pub trait GenServer: Send + 'static {
    /// First-time setup, run before the process is considered live.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The process context.
    /// * `args` - The constructor arguments given at spawn time.
    ///
    /// # Errors
    ///
    /// An error aborts the spawn; the caller of `Node::spawn` receives `Error::Init`.
    ///
    async fn init(
        &mut self,
        _ctx: &mut ProcessContext,
        _args: Vec<Term>,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Handles a one-way request. Nothing is ever sent back.
    async fn handle_cast(
        &mut self,
        _ctx: &mut ProcessContext,
        _message: Term,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Handles a two-way request.
    ///
    /// Returning `Some(reply)` sends `{Ref, reply}` to the caller. Returning `None` sends nothing;
    /// the callee may answer later with `ProcessContext::reply`, or the caller times out.
    async fn handle_call(
        &mut self,
        ctx: &mut ProcessContext,
        from: &Caller,
        message: Term,
    ) -> Result<Option<Term>, Error>;

    /// Handles any message that is neither a call, a cast nor a control signal.
    async fn handle_info(
        &mut self,
        _ctx: &mut ProcessContext,
        _message: Term,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Runs once when the process stops.
    async fn terminate(&mut self, _ctx: &mut ProcessContext, _reason: &ExitReason) {}
}

/// Constructor of a boxed behavior.
pub type BehaviorFactory = Arc<dyn Fn() -> Box<dyn GenServer> + Send + Sync>;

/// Name-keyed set of behavior constructors.
#[derive(Clone, Default)]
pub struct BehaviorRegistry {
    factories: HashMap<String, BehaviorFactory>,
}

impl BehaviorRegistry {
    /// Adds or replaces a constructor.
    pub fn insert<F, B>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> B + Send + Sync + 'static,
        B: GenServer,
    {
        self.factories.insert(
            name.to_owned(),
            Arc::new(move || Box::new(factory()) as Box<dyn GenServer>),
        );
    }

    /// Builds a fresh behavior.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownBehavior` if nothing is registered under `name`.
    ///
    pub fn build(&self, name: &str) -> Result<Box<dyn GenServer>, Error> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| Error::UnknownBehavior(name.to_owned()))
    }

    /// True if a constructor exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }
}
