//! Worker pool / `SignerHandle` — spec.md §9's redesign guidance ("Web
//! Workers with WASM cores → model as owned sandbox processes accessed
//! through a `SignerHandle` trait; pool size and replacement policy are
//! configuration, not language features"). No teacher equivalent: the
//! teacher's "pool" is the browser's Worker API spinning up WASM
//! instances; this models the same isolation/replacement contract as a
//! plain Rust trait over owned values.

use std::sync::{Arc, Mutex};

use passkey_signer::SignerCore;

/// One signer sandbox. Exposes only what `passkey-session` needs to drive
/// a signing ceremony — the concrete type is always `passkey_signer::SignerCore`
/// in this workspace, but the trait keeps the pool's replacement policy
/// independent of that concrete type (spec.md §9: "a failed worker is
/// terminated and replaced, never reused").
pub trait SignerHandle: Send + Sync {
    fn core(&self) -> &SignerCore;
}

impl SignerHandle for SignerCore {
    fn core(&self) -> &SignerCore {
        self
    }
}

/// A fixed-size pool of signer sandboxes (spec.md §5: "The worker pool
/// (default 3) holds re-usable signer sandboxes; a failed worker is
/// terminated and replaced, never reused"). Checkout hands back the next
/// slot round-robin; `report_failed` drops and replaces that slot's
/// sandbox with a fresh one so a worker that errored mid-ceremony is never
/// handed out again.
pub struct WorkerPool {
    slots: Mutex<Vec<Arc<SignerCore>>>,
    next: Mutex<usize>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            slots: Mutex::new((0..size).map(|_| Arc::new(SignerCore::new())).collect()),
            next: Mutex::new(0),
        }
    }

    pub fn size(&self) -> usize {
        self.slots.lock().expect("worker pool lock poisoned").len()
    }

    /// Checks out the next sandbox round-robin. Returns an `Arc` so the
    /// caller can hold it across `await` points while a confirm handshake
    /// or chain call is outstanding.
    pub fn checkout(&self) -> (usize, Arc<SignerCore>) {
        let slots = self.slots.lock().expect("worker pool lock poisoned");
        let mut next = self.next.lock().expect("worker pool lock poisoned");
        let idx = *next % slots.len();
        *next = (*next + 1) % slots.len();
        (idx, slots[idx].clone())
    }

    /// Terminates and replaces the sandbox at `idx` with a fresh one
    /// (spec.md §5). Any `Arc` a caller is still holding to the old
    /// sandbox remains valid for them to finish with, it is simply evicted
    /// from future checkouts.
    pub fn report_failed(&self, idx: usize) {
        let mut slots = self.slots.lock().expect("worker pool lock poisoned");
        if idx < slots.len() {
            slots[idx] = Arc::new(SignerCore::new());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_round_robins_across_slots() {
        let pool = WorkerPool::new(3);
        let (a, _) = pool.checkout();
        let (b, _) = pool.checkout();
        let (c, _) = pool.checkout();
        let (d, _) = pool.checkout();
        assert_eq!([a, b, c, d], [0, 1, 2, 0]);
    }

    #[test]
    fn report_failed_replaces_only_that_slot() {
        let pool = WorkerPool::new(2);
        let (_, before) = pool.checkout();
        pool.report_failed(0);
        let (idx, after) = pool.checkout();
        assert_eq!(idx, 1, "round robin continues independent of the replaced slot");
        let _ = before;
        let _ = after;
        assert_eq!(pool.size(), 2);
    }
}
