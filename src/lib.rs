//! # fixedstep
//!
//! **Deterministic fixed-point simulation core for two-peer lockstep games**
//!
//! Given the same sequence of per-tick inputs, this crate produces
//! bit-identical simulation state on every participating machine, and it
//! tolerates inputs that arrive late or out of order by rolling back and
//! replaying ticks.
//!
//! ```text
//! Same Inputs + Same Initial State → Bit-Exact Same Output (on all peers)
//! ```
//!
//! # Layers
//!
//! | Layer | Module | What it provides |
//! |-------|--------|------------------|
//! | Numeric tower | [`math`] | Q32.32 scalar, vectors, quaternion, 4x4 matrix, CORDIC trig |
//! | Physics | [`physics`], [`collider`] | Rigid bodies, AABB/sphere/OBB narrow phase, impulse resolution |
//! | Rollback | [`rollback`], [`input`], [`snapshot`] | Input buffering, per-tick snapshots, rewind + replay |
//! | Wire | [`protocol`] | Fixed-layout lockstep messages |
//! | Utilities | [`rng`], [`clock`], [`diag`] | Seeded RNG, fixed-step clock, error diagnostics |
//!
//! # Quick start
//!
//! ```rust
//! use fixedstep::{Collider, Fix64, PhysicsWorld, RigidBody, RollbackSystem, Vec3Fix};
//!
//! let mut world = PhysicsWorld::new();
//! world.gravity = Vec3Fix::ZERO;
//! let hero = world.add_body(RigidBody::new());
//! world.add_collider(Collider::sphere(Fix64::HALF).with_body(hero));
//!
//! let mut rollback: RollbackSystem<Vec3Fix> = RollbackSystem::new();
//! let dt = Fix64::from_ratio(1, 15);
//!
//! // Each fixed tick: submit local + remote inputs, then advance.
//! rollback.submit_input(0, Vec3Fix::from_int(1, 0, 0));
//! rollback.advance_to(&mut world, 0, dt, |world, dir| {
//!     world.bodies[0].velocity = *dir * Fix64::from_int(5);
//! });
//! ```
//!
//! Inputs for ticks that were already simulated trigger a rollback on the
//! next `advance_to`: the world is restored from the snapshot taken at that
//! tick and resimulated forward, so a late packet corrects history instead
//! of being dropped — until it falls out of the retention window (200 ticks
//! by default).
//!
//! # Determinism rules
//!
//! - All simulation state lives in [`math::Fix64`] values; floats exist only
//!   at the presentation and wire boundaries.
//! - `Fix64::exp`/`ln`/`pow` use an `f64` fallback and are excluded from the
//!   cross-platform guarantee; everything else is bit-exact.
//! - The simulation is single-threaded: marshal network input onto the
//!   simulation thread before submitting it.

pub mod clock;
pub mod collider;
pub mod diag;
pub mod input;
pub mod math;
pub mod physics;
pub mod protocol;
pub mod rng;
pub mod rollback;
pub mod snapshot;

pub use clock::FixedClock;
pub use collider::{Collider, Manifold, Shape};
pub use input::InputBuffer;
pub use math::{Fix64, Mat4Fix, QuatFix, Vec2Fix, Vec3Fix, Vec4Fix};
pub use physics::{PhysicsWorld, RigidBody};
pub use protocol::{
    MatchAssign, MatchRequest, Message, MoveOp, ProtocolError, TransportConfig,
};
pub use rng::FixedRng;
pub use rollback::RollbackSystem;
pub use snapshot::{Snapshot, StateChecksum};
