//! Socket identity codec.
//!
//! A socket is addressed by its slot `index` in the gateway's socket table,
//! a `unique_id` that changes every time the slot is reused, and the
//! scheduler / gateway worker pair that owns it.
//!
//! Compact form, one word, low to high:
//! ```text
//! ┌──────────────┬────────────────┬──────────────┬──────────────┐
//! │ index        │ unique_id      │ scheduler_id │ worker_id    │
//! │ bits 0..22   │ bits 22..54    │ bits 54..59  │ bits 59..64  │
//! └──────────────┴────────────────┴──────────────┴──────────────┘
//! ```
//!
//! Wide form, two words:
//! ```text
//! word0: unique_id                                (bits 0..32)
//! word1: index | scheduler_id << 32 | worker_id << 40
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{IdentityError, Result};

pub const INDEX_BITS: u32 = 22;
pub const UNIQUE_ID_BITS: u32 = 32;
pub const SCHEDULER_ID_BITS: u32 = 5;
pub const GATEWAY_WORKER_ID_BITS: u32 = 5;

const UNIQUE_ID_SHIFT: u32 = INDEX_BITS;
const SCHEDULER_ID_SHIFT: u32 = UNIQUE_ID_SHIFT + UNIQUE_ID_BITS;
const GATEWAY_WORKER_ID_SHIFT: u32 = SCHEDULER_ID_SHIFT + SCHEDULER_ID_BITS;

const WIDE_SCHEDULER_SHIFT: u32 = 32;
const WIDE_WORKER_SHIFT: u32 = 40;

const fn mask(bits: u32) -> u64 {
    (1u64 << bits) - 1
}

/// Identity of one client socket, as shared by gateway and host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocketIdentity {
    /// Slot in the gateway socket table.
    pub index: u32,
    /// Changes on every reuse of `index`.
    pub unique_id: u32,
    pub scheduler_id: u8,
    pub gateway_worker_id: u8,
}

impl SocketIdentity {
    /// Check every field against the width reserved for it.
    pub fn validate(&self) -> Result<()> {
        check("index", u64::from(self.index), INDEX_BITS)?;
        check("scheduler_id", u64::from(self.scheduler_id), SCHEDULER_ID_BITS)?;
        check(
            "gateway_worker_id",
            u64::from(self.gateway_worker_id),
            GATEWAY_WORKER_ID_BITS,
        )
    }

    /// Both identities address the same socket table slot.
    pub fn is_same_slot(&self, other: &SocketIdentity) -> bool {
        self.index == other.index
            && self.scheduler_id == other.scheduler_id
            && self.gateway_worker_id == other.gateway_worker_id
    }

    /// `self` refers to an earlier occupant of `current`'s slot.
    pub fn is_stale_for(&self, current: &SocketIdentity) -> bool {
        self.is_same_slot(current) && self.unique_id != current.unique_id
    }
}

impl fmt::Display for SocketIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "socket {}/{} on scheduler {} worker {}",
            self.index, self.unique_id, self.scheduler_id, self.gateway_worker_id
        )
    }
}

fn check(field: &'static str, value: u64, bits: u32) -> Result<()> {
    if value > mask(bits) {
        return Err(IdentityError::FieldOverflow { field, value, bits });
    }
    Ok(())
}

/// Pack into the single-word form.
pub fn pack_compact(identity: &SocketIdentity) -> Result<u64> {
    identity.validate()?;
    Ok(u64::from(identity.index)
        | (u64::from(identity.unique_id) << UNIQUE_ID_SHIFT)
        | (u64::from(identity.scheduler_id) << SCHEDULER_ID_SHIFT)
        | (u64::from(identity.gateway_worker_id) << GATEWAY_WORKER_ID_SHIFT))
}

/// Unpack the single-word form. Every word decodes to some identity.
pub fn unpack_compact(word: u64) -> SocketIdentity {
    SocketIdentity {
        index: (word & mask(INDEX_BITS)) as u32,
        unique_id: ((word >> UNIQUE_ID_SHIFT) & mask(UNIQUE_ID_BITS)) as u32,
        scheduler_id: ((word >> SCHEDULER_ID_SHIFT) & mask(SCHEDULER_ID_BITS)) as u8,
        gateway_worker_id: ((word >> GATEWAY_WORKER_ID_SHIFT) & mask(GATEWAY_WORKER_ID_BITS))
            as u8,
    }
}

/// Pack into the two-word form.
pub fn pack_wide(identity: &SocketIdentity) -> Result<(u64, u64)> {
    identity.validate()?;
    let word1 = u64::from(identity.index)
        | (u64::from(identity.scheduler_id) << WIDE_SCHEDULER_SHIFT)
        | (u64::from(identity.gateway_worker_id) << WIDE_WORKER_SHIFT);
    Ok((u64::from(identity.unique_id), word1))
}

/// Unpack the two-word form, rejecting bits outside the documented fields.
pub fn unpack_wide(word0: u64, word1: u64) -> Result<SocketIdentity> {
    check("unique_id", word0, UNIQUE_ID_BITS)?;
    check("index", word1 & mask(WIDE_SCHEDULER_SHIFT), INDEX_BITS)?;
    check(
        "scheduler_id",
        (word1 >> WIDE_SCHEDULER_SHIFT) & mask(WIDE_WORKER_SHIFT - WIDE_SCHEDULER_SHIFT),
        SCHEDULER_ID_BITS,
    )?;
    check("gateway_worker_id", word1 >> WIDE_WORKER_SHIFT, GATEWAY_WORKER_ID_BITS)?;

    Ok(SocketIdentity {
        index: (word1 & mask(INDEX_BITS)) as u32,
        unique_id: word0 as u32,
        scheduler_id: ((word1 >> WIDE_SCHEDULER_SHIFT) & mask(SCHEDULER_ID_BITS)) as u8,
        gateway_worker_id: ((word1 >> WIDE_WORKER_SHIFT) & mask(GATEWAY_WORKER_ID_BITS)) as u8,
    })
}
