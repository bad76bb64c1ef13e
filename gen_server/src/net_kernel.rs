// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Net kernel
//!
//! Minimal node control service. It registers itself as `net_kernel` and answers the
//! authentication query `{is_auth, Node}` with `yes`. Everything else is logged and ignored.
//!

use crate::{Error, ExitReason, GenServer, ProcessContext, Term, envelope::Caller};

use async_trait::async_trait;

use tracing::debug;

/// Registered name of the service.
pub const NET_KERNEL: &str = "net_kernel";

/// Node control service.
#[derive(Debug, Default)]
pub struct NetKernel;

#[async_trait]
impl GenServer for NetKernel {
    async fn init(
        &mut self,
        ctx: &mut ProcessContext,
        args: Vec<Term>,
    ) -> Result<(), Error> {
        debug!("NET_KERNEL: Init: {:?}", args);
        ctx.register(NET_KERNEL).await
    }

    async fn handle_cast(
        &mut self,
        _ctx: &mut ProcessContext,
        message: Term,
    ) -> Result<(), Error> {
        debug!("NET_KERNEL: HandleCast: {:?}", message);
        Ok(())
    }

    async fn handle_call(
        &mut self,
        _ctx: &mut ProcessContext,
        from: &Caller,
        message: Term,
    ) -> Result<Option<Term>, Error> {
        debug!("NET_KERNEL: HandleCall: {:?}, From: {}", message, from.pid);
        match message.as_tuple() {
            Some([tag, node]) if tag.is_atom("is_auth") => {
                debug!("NET_KERNEL: is_auth: {:?}", node);
                Ok(Some(Term::atom("yes")))
            }
            _ => Ok(None),
        }
    }

    async fn handle_info(
        &mut self,
        _ctx: &mut ProcessContext,
        message: Term,
    ) -> Result<(), Error> {
        debug!("NET_KERNEL: HandleInfo: {:?}", message);
        Ok(())
    }

    async fn terminate(&mut self, _ctx: &mut ProcessContext, reason: &ExitReason) {
        debug!("NET_KERNEL: Terminate: {}", reason);
    }
}
