// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Ownership wrappers for shards placed in a wire.

use crate::traits::Shard;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

struct SharedInner {
    shard: Mutex<Box<dyn Shard>>,
    in_use: AtomicBool,
}

impl Drop for SharedInner {
    fn drop(&mut self) {
        self.shard
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .destroy();
    }
}

/// A shard owned by the host rather than by a wire.
///
/// A wire holding a `SharedShard` warms it up and cleans it up but never
/// destroys it; destruction happens when the last handle is dropped. The
/// shard can sit in at most one wire at a time.
#[derive(Clone)]
pub struct SharedShard(Arc<SharedInner>);

impl SharedShard {
    pub fn new(shard: Box<dyn Shard>) -> Self {
        Self(Arc::new(SharedInner {
            shard: Mutex::new(shard),
            in_use: AtomicBool::new(false),
        }))
    }

    pub fn name(&self) -> String {
        self.with(|shard| shard.name().to_string())
    }

    pub fn is_in_use(&self) -> bool {
        self.0.in_use.load(Ordering::Acquire)
    }

    pub(crate) fn claim(&self) -> bool {
        self.0
            .in_use
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn unclaim(&self) {
        self.0.in_use.store(false, Ordering::Release);
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut dyn Shard) -> R) -> R {
        let mut guard = self
            .0
            .shard
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(guard.as_mut())
    }
}

enum Holder {
    Owned(Box<dyn Shard>),
    External(SharedShard),
}

/// One position in a wire (or in a nested shard list).
pub struct ShardSlot {
    holder: Holder,
    pub(crate) warmed: bool,
}

impl ShardSlot {
    pub fn owned(shard: Box<dyn Shard>) -> Self {
        Self {
            holder: Holder::Owned(shard),
            warmed: false,
        }
    }

    /// Wrap a host-owned shard. The caller must already have claimed it.
    pub(crate) fn external(shard: SharedShard) -> Self {
        Self {
            holder: Holder::External(shard),
            warmed: false,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self.holder, Holder::External(_))
    }

    pub fn is_warmed(&self) -> bool {
        self.warmed
    }

    pub fn with<R>(&mut self, f: impl FnOnce(&mut dyn Shard) -> R) -> R {
        match &mut self.holder {
            Holder::Owned(shard) => f(shard.as_mut()),
            Holder::External(shared) => shared.with(f),
        }
    }

    /// Read-only access to the shard.
    pub fn peek<R>(&self, f: impl FnOnce(&dyn Shard) -> R) -> R {
        match &self.holder {
            Holder::Owned(shard) => f(shard.as_ref()),
            Holder::External(shared) => shared.with(|shard| f(&*shard)),
        }
    }

    pub fn name(&self) -> String {
        self.peek(|shard| shard.name().to_string())
    }

    /// Destroy an owned shard, or hand an external one back to its host.
    /// Returns whether a shard was destroyed. Cleanup must already have run.
    pub(crate) fn dispose(self) -> bool {
        match self.holder {
            Holder::Owned(mut shard) => {
                shard.destroy();
                true
            }
            Holder::External(shared) => {
                shared.unclaim();
                false
            }
        }
    }

    /// Give the owned box back without destroying it.
    pub(crate) fn into_owned(self) -> Result<Box<dyn Shard>, SharedShard> {
        match self.holder {
            Holder::Owned(shard) => Ok(shard),
            Holder::External(shared) => {
                shared.unclaim();
                Err(shared)
            }
        }
    }
}
