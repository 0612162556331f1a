//! Rollback and Replay
//!
//! Reconciles locally simulated ticks with late-arriving remote input.
//! The system snapshots the world before every tick; when input shows up
//! for a tick that has already been simulated, it restores the snapshot at
//! that tick and replays forward, re-applying every buffered input along
//! the way. Because the physics layer is bit-deterministic, the replayed
//! history is exactly what would have been simulated had the input arrived
//! on time.
//!
//! # Guarantee
//!
//! For a given target tick, the resulting body state depends only on the
//! *set* of inputs submitted for ticks up to the target — not on the order
//! or timing of their arrival — as long as every late tick is still inside
//! the retention window.
//!
//! # Velocity model
//!
//! Every body's linear velocity is zeroed at the start of each tick. The
//! caller's `apply_input` callback is solely responsible for
//! re-establishing velocity from the tick's input, which makes a tick a
//! pure function of its input and prior position. Momentum does NOT carry
//! across ticks; a game that needs ballistic bodies must model them through
//! forces applied in the callback instead.
//!
//! # Threading
//!
//! Single-threaded by construction: `&mut self` on every mutating call.
//! Network receive callbacks must marshal inputs onto the simulation thread
//! before calling `submit_input`.

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use crate::input::InputBuffer;
use crate::math::{Fix64, Vec3Fix};
use crate::physics::PhysicsWorld;
use crate::snapshot::Snapshot;

/// Default number of ticks of snapshot/input history to retain.
pub const DEFAULT_RETENTION_TICKS: i64 = 200;

/// Drives a [`PhysicsWorld`] tick by tick, transparently repairing history
/// when late input appears.
///
/// `T` is the game-defined per-tick input type.
pub struct RollbackSystem<T> {
    inputs: InputBuffer<T>,
    snapshots: BTreeMap<i64, Snapshot>,
    last_applied_tick: i64,
    retention: i64,
    /// Earliest already-simulated tick that received input since the last
    /// advance, i.e. the point history diverged from.
    pending_rollback: Option<i64>,
}

impl<T> Default for RollbackSystem<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RollbackSystem<T> {
    /// New system with the default 200-tick retention window.
    pub fn new() -> Self {
        Self {
            inputs: InputBuffer::new(),
            snapshots: BTreeMap::new(),
            last_applied_tick: -1,
            retention: DEFAULT_RETENTION_TICKS,
            pending_rollback: None,
        }
    }

    /// Override the retention window (in ticks). Late input older than the
    /// window is unrecoverable.
    pub fn with_retention(mut self, ticks: i64) -> Self {
        self.retention = ticks;
        self
    }

    /// The most recently simulated tick, or −1 before the first advance.
    #[inline]
    pub fn last_applied_tick(&self) -> i64 {
        self.last_applied_tick
    }

    /// Number of retained snapshots.
    #[inline]
    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// The retained snapshot for `tick`, if any.
    pub fn snapshot(&self, tick: i64) -> Option<&Snapshot> {
        self.snapshots.get(&tick)
    }

    /// Buffer an input for `tick`.
    ///
    /// May be called from any point in the frame, for past or future ticks.
    /// Input for an already-simulated tick marks that tick as the rollback
    /// point for the next [`advance_to`](Self::advance_to).
    pub fn submit_input(&mut self, tick: i64, input: T) {
        if tick <= self.last_applied_tick {
            trace!(
                tick,
                last_applied = self.last_applied_tick,
                "late input buffered"
            );
            match self.pending_rollback {
                Some(pending) if pending <= tick => {}
                _ => self.pending_rollback = Some(tick),
            }
        }
        self.inputs.push(tick, input);
    }

    /// Advance the simulation through `target_tick`.
    ///
    /// Rolls back first if late input arrived since the previous call, then
    /// simulates each missing tick: snapshot, zero velocities, apply the
    /// tick's buffered inputs through `apply_input`, and step the world by
    /// the fixed `dt`. Finally prunes history older than the retention
    /// window.
    pub fn advance_to(
        &mut self,
        world: &mut PhysicsWorld,
        target_tick: i64,
        dt: Fix64,
        mut apply_input: impl FnMut(&mut PhysicsWorld, &T),
    ) {
        // Rewind to the earliest late tick, when its snapshot survives.
        if let Some(late_tick) = self.pending_rollback.take() {
            match self.snapshots.get(&late_tick) {
                Some(snap) => {
                    snap.restore(&mut world.bodies);
                    self.last_applied_tick = late_tick - 1;
                    debug!(
                        tick = late_tick,
                        target = target_tick,
                        "rolled back for late input"
                    );
                }
                None => {
                    // Evicted from the retention window: the input is lost
                    // for good, and the simulation carries on as if it had
                    // never arrived.
                    warn!(
                        tick = late_tick,
                        retention = self.retention,
                        "late input older than retention window; dropped"
                    );
                }
            }
        }

        for tick in (self.last_applied_tick + 1)..=target_tick {
            self.snapshots
                .insert(tick, Snapshot::create(tick, &world.bodies));

            // Velocity is a per-tick quantity in this movement model; see
            // the module docs.
            for body in &mut world.bodies {
                body.velocity = Vec3Fix::ZERO;
            }

            if let Some(inputs) = self.inputs.get(tick) {
                for input in inputs {
                    apply_input(world, input);
                }
            }

            world.step(dt);
            self.last_applied_tick = tick;
        }

        let cutoff = target_tick - self.retention;
        self.snapshots.retain(|&tick, _| tick >= cutoff);
        self.inputs.remove_older_than(cutoff);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::RigidBody;
    use crate::snapshot::StateChecksum;

    /// World with one massless-force test body and no gravity.
    fn test_world() -> PhysicsWorld {
        let mut world = PhysicsWorld::new();
        world.gravity = Vec3Fix::ZERO;
        world.add_body(RigidBody::new());
        world
    }

    /// Inputs are forces on body 0.
    fn apply_force(world: &mut PhysicsWorld, input: &Vec3Fix) {
        world.bodies[0].add_force(*input);
    }

    #[test]
    fn test_advance_applies_inputs_in_order() {
        let mut world = test_world();
        let mut rollback = RollbackSystem::new();

        rollback.submit_input(1, Vec3Fix::from_int(1, 0, 0));
        rollback.submit_input(2, Vec3Fix::from_int(2, 0, 0));
        rollback.advance_to(&mut world, 2, Fix64::ONE, apply_force);

        // Velocity resets each tick, so each tick's displacement is just
        // that tick's force integrated once:
        // tick 0: no input, x = 0
        // tick 1: F=1 ⇒ v=1, x += 1
        // tick 2: F=2 ⇒ v=2, x += 2 ⇒ x = 3
        assert_eq!(rollback.last_applied_tick(), 2);
        assert_eq!(world.bodies[0].position, Vec3Fix::from_int(3, 0, 0));
        assert_eq!(world.bodies[0].velocity, Vec3Fix::from_int(2, 0, 0));
    }

    #[test]
    fn test_velocity_does_not_persist_across_ticks() {
        let mut world = test_world();
        let mut rollback = RollbackSystem::new();

        rollback.submit_input(0, Vec3Fix::from_int(5, 0, 0));
        rollback.advance_to(&mut world, 3, Fix64::ONE, apply_force);

        // Only tick 0 moves the body; ticks 1-3 start from zero velocity
        // and receive no input.
        assert_eq!(world.bodies[0].position, Vec3Fix::from_int(5, 0, 0));
        assert_eq!(world.bodies[0].velocity, Vec3Fix::ZERO);
    }

    #[test]
    fn test_late_input_triggers_rollback_and_replay() {
        let mut world = test_world();
        let mut rollback = RollbackSystem::new();

        // Simulate past tick 2 with no input at all.
        rollback.advance_to(&mut world, 2, Fix64::ONE, apply_force);
        assert_eq!(world.bodies[0].position, Vec3Fix::ZERO);

        // Input for tick 1 arrives late.
        rollback.submit_input(1, Vec3Fix::from_int(1, 0, 0));
        rollback.advance_to(&mut world, 2, Fix64::ONE, apply_force);

        // Replay: tick 1 moves by 1, tick 2 has no input and velocity was
        // reset, so the body ends at x = 1.
        assert_eq!(world.bodies[0].position, Vec3Fix::from_int(1, 0, 0));
        assert_eq!(rollback.last_applied_tick(), 2);
    }

    #[test]
    fn test_late_input_equivalence() {
        let dt = Fix64::from_ratio(1, 15);
        let input = Vec3Fix::from_int(3, 0, 0);

        // On time: input for tick 4 submitted before any advance.
        let mut world_a = test_world();
        let mut rb_a = RollbackSystem::new();
        rb_a.submit_input(4, input);
        rb_a.advance_to(&mut world_a, 10, dt, apply_force);

        // Late: simulate past tick 4 first, then submit.
        let mut world_b = test_world();
        let mut rb_b = RollbackSystem::new();
        rb_b.advance_to(&mut world_b, 7, dt, apply_force);
        rb_b.submit_input(4, input);
        rb_b.advance_to(&mut world_b, 10, dt, apply_force);

        assert_eq!(
            StateChecksum::from_bodies(&world_a.bodies),
            StateChecksum::from_bodies(&world_b.bodies),
        );
        assert_eq!(
            world_a.bodies[0].position.x.raw(),
            world_b.bodies[0].position.x.raw()
        );
    }

    #[test]
    fn test_two_instances_bit_identical() {
        let dt = Fix64::from_ratio(1, 60);
        let submissions: Vec<(i64, Vec3Fix)> = vec![
            (0, Vec3Fix::from_int(1, 0, 0)),
            (3, Vec3Fix::from_int(0, 0, 2)),
            (3, Vec3Fix::from_int(-1, 0, 0)),
            (7, Vec3Fix::from_int(2, 0, -1)),
        ];

        let run = || {
            let mut world = test_world();
            let mut rollback = RollbackSystem::new();
            for &(tick, input) in &submissions {
                rollback.submit_input(tick, input);
            }
            for target in 0..10 {
                rollback.advance_to(&mut world, target, dt, apply_force);
            }
            StateChecksum::from_bodies(&world.bodies)
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_multiple_inputs_per_tick_apply_in_insertion_order() {
        let mut world = test_world();
        let mut rollback = RollbackSystem::new();

        rollback.submit_input(0, Vec3Fix::from_int(1, 0, 0));
        rollback.submit_input(0, Vec3Fix::from_int(2, 0, 0));
        rollback.advance_to(&mut world, 0, Fix64::ONE, apply_force);

        // Both forces accumulate before the step.
        assert_eq!(world.bodies[0].position, Vec3Fix::from_int(3, 0, 0));
    }

    #[test]
    fn test_input_older_than_retention_is_dropped() {
        let mut world = test_world();
        let mut rollback = RollbackSystem::new().with_retention(5);

        rollback.advance_to(&mut world, 20, Fix64::ONE, apply_force);

        // Tick 2 history is long gone.
        rollback.submit_input(2, Vec3Fix::from_int(9, 0, 0));
        rollback.advance_to(&mut world, 21, Fix64::ONE, apply_force);

        // The simulation proceeded as though the input never arrived.
        assert_eq!(world.bodies[0].position, Vec3Fix::ZERO);
        assert_eq!(rollback.last_applied_tick(), 21);
    }

    #[test]
    fn test_history_is_pruned() {
        let mut world = test_world();
        let mut rollback = RollbackSystem::new().with_retention(10);

        rollback.advance_to(&mut world, 50, Fix64::ONE, apply_force);

        // Ticks 40..=50 survive the prune.
        assert_eq!(rollback.snapshot_count(), 11);
        assert!(rollback.snapshot(39).is_none());
        assert!(rollback.snapshot(40).is_some());
        assert!(rollback.snapshot(50).is_some());
    }

    #[test]
    fn test_earliest_late_tick_wins() {
        let mut world = test_world();
        let mut rollback = RollbackSystem::new();

        rollback.advance_to(&mut world, 5, Fix64::ONE, apply_force);

        // Two late inputs; the rollback must restart from tick 1 so that
        // tick 3's input is replayed on top of tick 1's effect.
        rollback.submit_input(3, Vec3Fix::from_int(1, 0, 0));
        rollback.submit_input(1, Vec3Fix::from_int(1, 0, 0));
        rollback.advance_to(&mut world, 5, Fix64::ONE, apply_force);

        assert_eq!(world.bodies[0].position, Vec3Fix::from_int(2, 0, 0));
    }

    #[test]
    fn test_rollback_replay_matches_straight_run() {
        // A rolled-back-and-replayed history must be bit-identical to the
        // same inputs arriving on time, even with collisions in play.
        let dt = Fix64::from_ratio(1, 30);
        let build_world = || {
            let mut world = PhysicsWorld::new();
            world.gravity = Vec3Fix::ZERO;
            let a = world.add_body(RigidBody::new());
            let b = world.add_body(RigidBody::at(Vec3Fix::from_int(3, 0, 0)));
            world.add_collider(crate::collider::Collider::sphere(Fix64::ONE).with_body(a));
            world.add_collider(crate::collider::Collider::sphere(Fix64::ONE).with_body(b));
            world
        };
        let push_together = |world: &mut PhysicsWorld, input: &(usize, Vec3Fix)| {
            let (index, force) = *input;
            world.bodies[index].add_force(force);
        };

        let on_time = {
            let mut world = build_world();
            let mut rollback = RollbackSystem::new();
            for tick in 0..20 {
                rollback.submit_input(tick, (0usize, Vec3Fix::from_int(40, 0, 0)));
                rollback.submit_input(tick, (1usize, Vec3Fix::from_int(-40, 0, 0)));
            }
            rollback.advance_to(&mut world, 19, dt, push_together);
            StateChecksum::from_bodies(&world.bodies)
        };

        let with_rollback = {
            let mut world = build_world();
            let mut rollback = RollbackSystem::new();
            // Body 0's inputs arrive on time; body 1's arrive 6 ticks late.
            for tick in 0..20 {
                rollback.submit_input(tick, (0usize, Vec3Fix::from_int(40, 0, 0)));
            }
            rollback.advance_to(&mut world, 12, dt, push_together);
            for tick in 0..20 {
                rollback.submit_input(tick, (1usize, Vec3Fix::from_int(-40, 0, 0)));
            }
            rollback.advance_to(&mut world, 19, dt, push_together);
            StateChecksum::from_bodies(&world.bodies)
        };

        assert_eq!(on_time, with_rollback);
    }
}
