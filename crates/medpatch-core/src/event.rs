//! Patch engine events with a pre-allocated ring buffer.
//!
//! The transfer engine, scheduler and state machine push [`PatchEvent`]s into
//! an [`EventBuffer`] as they work. Hosts read them after a sweep for
//! analytics, sound cues and tests. Events are observational only; nothing
//! in the engine reads them back.
//!
//! Kinds can be suppressed via [`EventBuffer::suppress`], which skips
//! recording for that kind entirely.

use std::collections::VecDeque;

use crate::fixed::{Fixed64, Ticks};
use crate::id::EntityId;
use crate::lifecycle::Disposed;
use crate::transfer::TransferFailure;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Something the patch engine did. All events carry the tick they occurred on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchEvent {
    // -- Transfers --
    Injected {
        patch: EntityId,
        target: EntityId,
        amount: Fixed64,
        tick: Ticks,
    },
    NoRoom {
        patch: EntityId,
        target: EntityId,
        tick: Ticks,
    },
    /// The target refused a quantity already split from the payload.
    TransferRejected {
        patch: EntityId,
        target: EntityId,
        amount: Fixed64,
        /// Whether the quantity went back into the payload.
        restored: bool,
        tick: Ticks,
    },
    TransferFailed {
        patch: EntityId,
        reason: TransferFailure,
        tick: Ticks,
    },

    // -- Attachment --
    Attached {
        patch: EntityId,
        target: EntityId,
        user: EntityId,
        tick: Ticks,
    },
    DetachRequested {
        patch: EntityId,
        target: EntityId,
        accepted: bool,
        tick: Ticks,
    },
    Detached {
        patch: EntityId,
        target: EntityId,
        tick: Ticks,
    },
    Consumed {
        patch: EntityId,
        disposed: Disposed,
        tick: Ticks,
    },
}

/// Discriminant tag for event types, used for suppression and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchEventKind {
    Injected,
    NoRoom,
    TransferRejected,
    TransferFailed,
    Attached,
    DetachRequested,
    Detached,
    Consumed,
}

const EVENT_KIND_COUNT: usize = 8;

impl PatchEvent {
    pub fn kind(&self) -> PatchEventKind {
        match self {
            PatchEvent::Injected { .. } => PatchEventKind::Injected,
            PatchEvent::NoRoom { .. } => PatchEventKind::NoRoom,
            PatchEvent::TransferRejected { .. } => PatchEventKind::TransferRejected,
            PatchEvent::TransferFailed { .. } => PatchEventKind::TransferFailed,
            PatchEvent::Attached { .. } => PatchEventKind::Attached,
            PatchEvent::DetachRequested { .. } => PatchEventKind::DetachRequested,
            PatchEvent::Detached { .. } => PatchEventKind::Detached,
            PatchEvent::Consumed { .. } => PatchEventKind::Consumed,
        }
    }

    /// The patch entity this event is about.
    pub fn patch(&self) -> EntityId {
        match self {
            PatchEvent::Injected { patch, .. }
            | PatchEvent::NoRoom { patch, .. }
            | PatchEvent::TransferRejected { patch, .. }
            | PatchEvent::TransferFailed { patch, .. }
            | PatchEvent::Attached { patch, .. }
            | PatchEvent::DetachRequested { patch, .. }
            | PatchEvent::Detached { patch, .. }
            | PatchEvent::Consumed { patch, .. } => *patch,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBuffer
// ---------------------------------------------------------------------------

/// Fixed-capacity event log. When full, the oldest events are dropped.
#[derive(Debug)]
pub struct EventBuffer {
    events: VecDeque<PatchEvent>,
    capacity: usize,
    total_written: u64,
    suppressed: [bool; EVENT_KIND_COUNT],
}

impl EventBuffer {
    /// Create a buffer holding up to `capacity` events. Zero is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            total_written: 0,
            suppressed: [false; EVENT_KIND_COUNT],
        }
    }

    /// Stop recording events of `kind`.
    pub fn suppress(&mut self, kind: PatchEventKind) {
        self.suppressed[kind as usize] = true;
    }

    pub fn is_suppressed(&self, kind: PatchEventKind) -> bool {
        self.suppressed[kind as usize]
    }

    /// Record an event unless its kind is suppressed.
    pub fn push(&mut self, event: PatchEvent) {
        if self.is_suppressed(event.kind()) {
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Total events recorded since creation (including dropped).
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Number of events dropped because the buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.events.len() as u64)
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &PatchEvent> + '_ {
        self.events.iter()
    }

    /// Count buffered events of one kind.
    pub fn count(&self, kind: PatchEventKind) -> usize {
        self.events.iter().filter(|e| e.kind() == kind).count()
    }

    /// Remove and return all buffered events, oldest first.
    pub fn drain(&mut self) -> Vec<PatchEvent> {
        self.events.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new(1024)
    }
}
