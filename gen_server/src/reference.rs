// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # References
//!
//! A `Reference` correlates one call with its one reply. References are derived from the wall
//! clock and the identity of the node that made them, so they can be generated from any process
//! without coordination. Two references made within the same nanosecond by the same node are
//! equal; callers correlating replies must tolerate that.
//!

use crate::Atom;

use serde::{Deserialize, Serialize};

use std::{
    fmt::{Display, Formatter},
    time::{SystemTime, UNIX_EPOCH},
};

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Call-correlation reference.
///
#[derive(
    Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Debug, Serialize, Deserialize,
)]
pub struct Reference {
    /// Name of the node that generated the reference.
    pub node: Atom,
    /// Creation epoch of the node.
    pub creation: u8,
    /// Sub-second nanoseconds, whole seconds and a reserved word (always zero).
    pub id: [u32; 3],
}

impl Reference {
    /// Generates a reference from the current system time.
    ///
    /// # Arguments
    ///
    /// * `node` - Name of the requesting node.
    /// * `creation` - Current creation epoch of the node.
    ///
    pub fn new(node: Atom, creation: u8) -> Self {
        // A clock before the epoch yields zero, which is still a valid reference.
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos())
            .unwrap_or_default();
        Self::from_nanos(node, creation, nanos)
    }

    /// Generates a reference from an explicit timestamp in nanoseconds.
    pub fn from_nanos(node: Atom, creation: u8, nanos: u128) -> Self {
        let low = (nanos % NANOS_PER_SEC) as u32;
        let high = (nanos / NANOS_PER_SEC) as u32;
        Reference {
            node,
            creation,
            id: [low, high, 0],
        }
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#Ref<{}.{}.{}.{}>",
            self.node, self.id[2], self.id[1], self.id[0]
        )
    }
}
