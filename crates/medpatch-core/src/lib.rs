//! Medpatch Core -- lifecycle engine for medical patches.
//!
//! A patch is a device entity that sticks onto a target and feeds a payload
//! solution into the target's bloodstream over time. This crate provides the
//! transfer primitive, the periodic scheduler and the attach/detach state
//! machine, all written against collaborator traits so any host world can
//! drive them.
//!
//! # Tick Flow
//!
//! Each call to [`system::PatchSystem::update`] runs one sweep:
//!
//! 1. **Guard** -- Replayed prediction ticks do nothing.
//! 2. **Due check** -- Patches still cooling down, or not stuck to anything,
//!    are skipped.
//! 3. **Cooldown** -- The next due time moves to `now + update_period`.
//! 4. **Transfer** -- Up to `transfer_amount` moves from payload to target.
//! 5. **Detach** -- A failed precondition asks the host to peel the patch off.
//!
//! Attachment notifications go through [`system::PatchSystem::handle`] and
//! are processed to completion before it returns.
//!
//! # Key Types
//!
//! - [`transfer::TransferEngine`] -- The bounded, non-destructive transfer.
//! - [`scheduler::sweep`] -- One scheduler pass over the registry.
//! - [`lifecycle::dispatch`] -- Attach boluses and single-use disposal.
//! - [`registry::PatchRegistry`] -- Active patches keyed by entity.
//! - [`context::PatchContext`] -- The collaborator bundle a host lends out.
//! - [`simulation::Simulation`] -- In-memory reference host.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for every quantity.

pub mod attachment;
pub mod container;
pub mod context;
pub mod entity;
pub mod event;
pub mod fixed;
pub mod id;
pub mod journal;
pub mod lifecycle;
pub mod patch;
pub mod registry;
pub mod scheduler;
pub mod sim;
pub mod simulation;
pub mod solution;
pub mod system;
pub mod transfer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
