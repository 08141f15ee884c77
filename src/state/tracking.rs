//! Render tracking - who is rendering right now, and what they read.
//!
//! While an instance renders, a [`RenderFrame`] sits on a thread-local stack.
//! Signal reads record their `(signal id, path)` into the top frame, and
//! [`use_signal`](super::use_signal) hands out the instance's signals by
//! call order. Reads with no frame on the stack are untracked.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use super::signal::Signal;
use crate::types::{Address, PATH_SEPARATOR, SignalId};

// =============================================================================
// Signal access sets
// =============================================================================

/// The read set of one render: which paths of which signals were observed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalAccess {
    /// Exact paths read (every traversed prefix is recorded)
    paths: HashMap<SignalId, HashSet<String>>,
    /// Paths whose whole subtree was read (object/array values)
    deep: HashMap<SignalId, HashSet<String>>,
}

impl SignalAccess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: SignalId, path: &str) {
        self.paths.entry(id).or_default().insert(path.to_string());
    }

    pub fn record_deep(&mut self, id: SignalId, path: &str) {
        self.deep.entry(id).or_default().insert(path.to_string());
    }

    /// Whether a write to `path` of signal `id` concerns this read set.
    ///
    /// Matches the exact path, or any path below a subtree read as a whole.
    pub fn is_interested(&self, id: SignalId, path: &str) -> bool {
        if self.paths.get(&id).is_some_and(|paths| paths.contains(path)) {
            return true;
        }
        self.deep.get(&id).is_some_and(|deep| {
            deep.iter().any(|prefix| is_path_within(path, prefix))
        })
    }

    pub fn paths(&self, id: SignalId) -> Option<&HashSet<String>> {
        self.paths.get(&id)
    }

    pub fn signal_ids(&self) -> impl Iterator<Item = SignalId> + '_ {
        self.paths.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.deep.is_empty()
    }
}

/// `path` equals `prefix` or lies below it.
fn is_path_within(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() || path == prefix {
        return true;
    }
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with(PATH_SEPARATOR))
}

// =============================================================================
// Render frames
// =============================================================================

/// Tracking state of one in-progress render.
#[derive(Debug)]
pub struct RenderFrame {
    pub address: Address,
    /// The instance's local signals, in creation order
    pub signals: Vec<Signal>,
    /// Index of the next `use_signal` call
    pub next_signal: usize,
    pub access: SignalAccess,
}

thread_local! {
    static FRAMES: RefCell<Vec<RenderFrame>> = const { RefCell::new(Vec::new()) };
}

/// Start tracking a render of the instance at `address`.
pub fn begin_render(address: Address, signals: Vec<Signal>) {
    FRAMES.with(|frames| {
        frames.borrow_mut().push(RenderFrame {
            address,
            signals,
            next_signal: 0,
            access: SignalAccess::new(),
        });
    });
}

/// Stop tracking the innermost render and return what it collected.
pub fn end_render() -> Option<RenderFrame> {
    FRAMES.with(|frames| frames.borrow_mut().pop())
}

pub fn is_rendering() -> bool {
    FRAMES.with(|frames| !frames.borrow().is_empty())
}

/// Address of the instance currently rendering.
pub fn current_address() -> Option<Address> {
    FRAMES.with(|frames| frames.borrow().last().map(|frame| frame.address.clone()))
}

/// Record a read into the current frame; no-op outside a render.
pub(crate) fn record_read(id: SignalId, path: &str, deep: bool) {
    FRAMES.with(|frames| {
        if let Some(frame) = frames.borrow_mut().last_mut() {
            frame.access.record(id, path);
            if deep {
                frame.access.record_deep(id, path);
            }
        }
    });
}

/// Hand out the next instance-local signal, creating it on first use.
///
/// Returns `None` outside a render.
pub(crate) fn next_instance_signal(create: impl FnOnce() -> Signal) -> Option<Signal> {
    FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        let frame = frames.last_mut()?;
        let index = frame.next_signal;
        frame.next_signal += 1;
        if let Some(existing) = frame.signals.get(index) {
            return Some(existing.clone());
        }
        let signal = create();
        frame.signals.push(signal.clone());
        Some(signal)
    })
}

/// Drop all frames (for testing).
pub fn reset_tracking() {
    FRAMES.with(|frames| frames.borrow_mut().clear());
}
