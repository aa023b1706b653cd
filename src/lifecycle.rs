//! Lifecycle state shared between the realtime thread and the main thread.
//!
//! A single [`LifecycleController`] is created per session and shared by
//! `Arc` with the capture producer, the audio backend's notification
//! handler and the drain loop. Everything the realtime thread touches is a
//! plain atomic: no locks, no allocation.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use tokio::sync::Notify;

use crate::CaptureFault;

/// Lifecycle states of a capture session, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LifecycleState {
    /// Buffers, sink and ports are being set up.
    Initializing = 0,
    /// The audio graph is active and sources are being connected.
    Connecting = 1,
    /// All ports are connected; the producer is live.
    Ready = 2,
    /// The drain loop is streaming.
    Running = 3,
    /// The session has ended.
    Terminated = 4,
}

impl LifecycleState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Initializing,
            1 => Self::Connecting,
            2 => Self::Ready,
            3 => Self::Running,
            _ => Self::Terminated,
        }
    }
}

const FAULT_NONE: u8 = 0;
const FAULT_OVERRUN: u8 = 1;
const FAULT_SHORT_INPUT: u8 = 2;
const FAULT_WRITING: u8 = u8::MAX;

/// Single-slot record of the first producer fault.
///
/// Fields are written before the kind is published with release ordering,
/// so a reader that observes the kind also observes the fields.
struct FaultSlot {
    kind: AtomicU8,
    channel: AtomicUsize,
    first: AtomicUsize,
    second: AtomicUsize,
}

impl FaultSlot {
    fn new() -> Self {
        Self {
            kind: AtomicU8::new(FAULT_NONE),
            channel: AtomicUsize::new(0),
            first: AtomicUsize::new(0),
            second: AtomicUsize::new(0),
        }
    }

    fn publish(&self, fault: CaptureFault) -> bool {
        if self
            .kind
            .compare_exchange(FAULT_NONE, FAULT_WRITING, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }

        let (kind, channel, first, second) = match fault {
            CaptureFault::Overrun {
                channel,
                free,
                needed,
            } => (FAULT_OVERRUN, channel, free, needed),
            CaptureFault::ShortInput {
                channel,
                available,
                frames,
            } => (FAULT_SHORT_INPUT, channel, available, frames),
        };
        self.channel.store(channel, Ordering::Relaxed);
        self.first.store(first, Ordering::Relaxed);
        self.second.store(second, Ordering::Relaxed);
        self.kind.store(kind, Ordering::Release);
        true
    }

    fn load(&self) -> Option<CaptureFault> {
        let kind = self.kind.load(Ordering::Acquire);
        let channel = self.channel.load(Ordering::Relaxed);
        let first = self.first.load(Ordering::Relaxed);
        let second = self.second.load(Ordering::Relaxed);
        match kind {
            FAULT_OVERRUN => Some(CaptureFault::Overrun {
                channel,
                free: first,
                needed: second,
            }),
            FAULT_SHORT_INPUT => Some(CaptureFault::ShortInput {
                channel,
                available: first,
                frames: second,
            }),
            _ => None,
        }
    }
}

/// Owns startup ordering, the readiness gate and shutdown signalling.
pub struct LifecycleController {
    state: AtomicU8,
    ready: AtomicBool,
    verbose: bool,
    fault: FaultSlot,
    shutdown_requested: AtomicBool,
    shutdown: Notify,
}

impl LifecycleController {
    /// Creates a controller in the `Initializing` state.
    pub fn new(verbose: bool) -> Self {
        Self {
            state: AtomicU8::new(LifecycleState::Initializing as u8),
            ready: AtomicBool::new(false),
            verbose,
            fault: FaultSlot::new(),
            shutdown_requested: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether progress diagnostics are enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Moves to `Connecting`.
    pub fn begin_connecting(&self) {
        self.advance(LifecycleState::Connecting);
    }

    /// Sets the readiness flag and moves to `Ready`.
    ///
    /// From this point on the capture producer writes into the buffers.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
        self.advance(LifecycleState::Ready);
    }

    /// Moves to `Running`.
    pub fn begin_running(&self) {
        self.advance(LifecycleState::Running);
    }

    /// Moves to `Terminated`. Valid from any state.
    pub fn terminate(&self) {
        self.state
            .store(LifecycleState::Terminated as u8, Ordering::Release);
    }

    /// Readiness flag as seen by the realtime thread.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Publishes a producer fault. Safe to call from the realtime thread.
    ///
    /// Only the first fault is kept; returns `false` if one was already
    /// recorded.
    pub fn report_fault(&self, fault: CaptureFault) -> bool {
        self.fault.publish(fault)
    }

    /// The first producer fault, if any.
    pub fn fault(&self) -> Option<CaptureFault> {
        self.fault.load()
    }

    /// Signals that the audio server is shutting down.
    ///
    /// May be called from any thread other than the realtime one.
    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Release);
        self.shutdown.notify_waiters();
    }

    /// Returns `true` once shutdown has been requested.
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Resolves once [`request_shutdown`](Self::request_shutdown) is called.
    pub async fn wait_for_shutdown(&self) {
        loop {
            // Register before checking the flag so a concurrent request
            // cannot slip between the check and the await.
            let notified = self.shutdown.notified();
            if self.is_shutdown_requested() {
                return;
            }
            notified.await;
        }
    }

    fn advance(&self, next: LifecycleState) {
        let previous = self.state.fetch_max(next as u8, Ordering::AcqRel);
        if previous > next as u8 {
            tracing::warn!(
                from = ?LifecycleState::from_u8(previous),
                to = ?next,
                "ignoring backwards lifecycle transition"
            );
        }
    }
}
