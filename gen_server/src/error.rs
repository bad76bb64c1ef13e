// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Errors module
//!
//! `Error` covers everything the runtime reports to its callers: routing failures, registry
//! conflicts, failed spawns and call timeouts. Behaviors return it from their callbacks as well,
//! usually as `Error::Functional`.
//!
//! `ExitReason` is what a process hands to `terminate`. A callback error becomes
//! `ExitReason::Error`, a panic becomes `ExitReason::Panic` with the panic message, and node
//! shutdown becomes `ExitReason::Shutdown`.
//!

use crate::{Atom, Pid};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt::{Display, Formatter};

/// Error type for the generic server runtime.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// An error occurred while delivering a message to a mailbox.
    #[error("An error occurred while sending a message: {0}.")]
    Send(String),
    /// The destination process does not exist (or has terminated).
    #[error("Process {0} does not exist.")]
    NoProcess(Pid),
    /// No process is registered under the name.
    #[error("Name {0} is not registered.")]
    NameNotFound(Atom),
    /// The name is already bound to another live process.
    #[error("Name {0} is already registered.")]
    NameTaken(Atom),
    /// No behavior factory is registered under the name.
    #[error("Behavior {0} is not registered.")]
    UnknownBehavior(String),
    /// The behavior failed to initialize.
    #[error("An error occurred while initializing a process: {0}")]
    Init(String),
    /// No reply arrived in time.
    #[error("Timed out waiting for a reply.")]
    Timeout,
    /// Error raised by behavior code.
    #[error("Error: {0}")]
    Functional(String),
}

/// Why a process stopped.
///
/// Handed to `GenServer::terminate` exactly once.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ExitReason {
    /// The node was shut down or the mailbox lost every sender.
    Shutdown,
    /// A callback returned an error.
    Error(Error),
    /// A callback panicked. Holds the panic message.
    Panic(String),
}

impl Display for ExitReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitReason::Shutdown => write!(f, "shutdown"),
            ExitReason::Error(error) => write!(f, "error: {}", error),
            ExitReason::Panic(message) => write!(f, "panic: {}", message),
        }
    }
}

impl From<Error> for ExitReason {
    fn from(error: Error) -> Self {
        ExitReason::Error(error)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_exit_reason_display() {
        assert_eq!(ExitReason::Shutdown.to_string(), "shutdown");
        assert_eq!(
            ExitReason::Panic("boom".to_owned()).to_string(),
            "panic: boom"
        );
        let reason: ExitReason = Error::Timeout.into();
        assert_eq!(
            reason.to_string(),
            "error: Timed out waiting for a reply."
        );
    }
}
