//! Rigid Bodies and the Physics Step
//!
//! Semi-implicit Euler integration plus single-point impulse resolution.
//! There is no broad phase — collision detection is O(n²) over registered
//! collider pairs, which is the intended envelope for a handful of players
//! and props. Every operation runs on `Fix64`, so a step is bit-identical
//! on all platforms.

use crate::collider::{self, Collider};
use crate::math::{Fix64, QuatFix, Vec3Fix};

// ============================================================================
// Rigid Body
// ============================================================================

/// A simulated rigid body.
///
/// Mass and inverse mass are kept in lockstep through `set_mass`; an inverse
/// mass of zero means infinite mass. Force and torque accumulate over a tick
/// and are cleared by `integrate`, whether or not integration moved the
/// body.
#[derive(Clone, Copy, Debug)]
pub struct RigidBody {
    /// World-space position.
    pub position: Vec3Fix,
    /// World-space orientation.
    pub rotation: QuatFix,
    /// Linear velocity.
    pub velocity: Vec3Fix,
    /// Angular velocity (radians/second about each axis).
    pub angular_velocity: Vec3Fix,
    /// Kinematic bodies ignore forces and impulses; they are moved only by
    /// external code.
    pub is_kinematic: bool,
    mass: Fix64,
    inv_mass: Fix64,
    force_accum: Vec3Fix,
    torque_accum: Vec3Fix,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self::new()
    }
}

impl RigidBody {
    /// A dynamic body of mass 1 at the origin.
    pub fn new() -> Self {
        Self {
            position: Vec3Fix::ZERO,
            rotation: QuatFix::IDENTITY,
            velocity: Vec3Fix::ZERO,
            angular_velocity: Vec3Fix::ZERO,
            is_kinematic: false,
            mass: Fix64::ONE,
            inv_mass: Fix64::ONE,
            force_accum: Vec3Fix::ZERO,
            torque_accum: Vec3Fix::ZERO,
        }
    }

    /// A dynamic body at `position`.
    pub fn at(position: Vec3Fix) -> Self {
        Self {
            position,
            ..Self::new()
        }
    }

    /// Builder-style mass assignment.
    pub fn with_mass(mut self, mass: Fix64) -> Self {
        self.set_mass(mass);
        self
    }

    /// Builder-style kinematic flag.
    pub fn kinematic(mut self) -> Self {
        self.is_kinematic = true;
        self
    }

    /// Current mass. Zero means infinite.
    #[inline]
    pub fn mass(&self) -> Fix64 {
        self.mass
    }

    /// Derived inverse mass: zero for infinite-mass bodies.
    #[inline]
    pub fn inverse_mass(&self) -> Fix64 {
        self.inv_mass
    }

    /// Set the mass, updating the inverse. Mass zero denotes an
    /// infinite-mass (immovable) body.
    pub fn set_mass(&mut self, mass: Fix64) {
        self.mass = mass;
        self.inv_mass = if mass.is_zero() {
            Fix64::ZERO
        } else {
            Fix64::ONE / mass
        };
    }

    /// Accumulate a force (newtons) at the center of mass for this tick.
    #[inline]
    pub fn add_force(&mut self, force: Vec3Fix) {
        self.force_accum += force;
    }

    /// Accumulate a torque (newton-meters) for this tick.
    #[inline]
    pub fn add_torque(&mut self, torque: Vec3Fix) {
        self.torque_accum += torque;
    }

    /// Drop any accumulated force and torque.
    #[inline]
    pub fn clear_accumulators(&mut self) {
        self.force_accum = Vec3Fix::ZERO;
        self.torque_accum = Vec3Fix::ZERO;
    }

    /// Semi-implicit Euler integration over `dt`.
    ///
    /// Kinematic, zero-dt, and infinite-mass bodies skip the math but the
    /// accumulators are always cleared — stale forces must never leak into
    /// the next tick.
    pub fn integrate(&mut self, dt: Fix64) {
        if self.is_kinematic || dt.is_zero() || self.mass.is_zero() {
            self.clear_accumulators();
            return;
        }

        // Linear: velocity first, then position from the new velocity.
        let acceleration = self.force_accum * self.inv_mass;
        self.velocity += acceleration * dt;
        self.position += self.velocity * dt;

        // Angular, without an inertia tensor: α = τ · inv_mass.
        let angular_acc = self.torque_accum * self.inv_mass;
        self.angular_velocity += angular_acc * dt;

        let omega = self.angular_velocity.magnitude();
        if !omega.is_zero() {
            let axis = self.angular_velocity / omega;
            let angle = omega * dt;
            let delta = QuatFix::from_axis_angle(axis, angle);
            self.rotation = (delta * self.rotation).normalized();
        }

        self.clear_accumulators();
    }
}

// ============================================================================
// Physics World
// ============================================================================

/// Owns the body and collider arenas and advances them one fixed step at a
/// time.
pub struct PhysicsWorld {
    /// Registered bodies, in registration order. The snapshot layer depends
    /// on this ordering being stable.
    pub bodies: Vec<RigidBody>,
    /// Registered colliders; each may reference a body by index.
    pub colliders: Vec<Collider>,
    /// Global gravity, applied as a force `g · m` each step.
    pub gravity: Vec3Fix,
    /// System-wide coefficient of restitution (0 = inelastic, 1 = elastic).
    pub restitution: Fix64,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Empty world with gravity (0, −9.81, 0) and restitution 0.5.
    pub fn new() -> Self {
        Self {
            bodies: Vec::new(),
            colliders: Vec::new(),
            gravity: Vec3Fix::new(Fix64::ZERO, Fix64::from_ratio(-981, 100), Fix64::ZERO),
            restitution: Fix64::HALF,
        }
    }

    /// Register a body; returns its arena index.
    pub fn add_body(&mut self, body: RigidBody) -> usize {
        let idx = self.bodies.len();
        self.bodies.push(body);
        idx
    }

    /// Register a collider (optionally already attached to a body via
    /// `Collider::with_body`); returns its arena index.
    pub fn add_collider(&mut self, collider: Collider) -> usize {
        let idx = self.colliders.len();
        self.colliders.push(collider);
        idx
    }

    /// Remove a body, detaching its colliders and re-pointing the indices
    /// of colliders that referenced later bodies.
    ///
    /// Invalidates snapshots taken while the body was registered.
    pub fn remove_body(&mut self, index: usize) -> Option<RigidBody> {
        if index >= self.bodies.len() {
            return None;
        }
        let body = self.bodies.remove(index);
        self.colliders.retain(|c| c.body != Some(index));
        for collider in &mut self.colliders {
            if let Some(b) = collider.body {
                if b > index {
                    collider.body = Some(b - 1);
                }
            }
        }
        Some(body)
    }

    /// Shared access to a body by index.
    #[inline]
    pub fn body(&self, index: usize) -> Option<&RigidBody> {
        self.bodies.get(index)
    }

    /// Mutable access to a body by index.
    #[inline]
    pub fn body_mut(&mut self, index: usize) -> Option<&mut RigidBody> {
        self.bodies.get_mut(index)
    }

    /// Advance the simulation by one fixed step.
    ///
    /// 1. Apply gravity as a force to every non-kinematic, finite-mass body.
    /// 2. Integrate every body.
    /// 3. Narrow-phase every unordered collider pair and resolve contacts.
    ///
    /// A zero `dt` is a no-op.
    pub fn step(&mut self, dt: Fix64) {
        if dt.is_zero() {
            return;
        }

        let gravity = self.gravity;
        for body in &mut self.bodies {
            if body.is_kinematic || body.mass().is_zero() {
                continue;
            }
            let weight = gravity * body.mass();
            body.add_force(weight);
        }

        for body in &mut self.bodies {
            body.integrate(dt);
        }

        let count = self.colliders.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let body_a = self.colliders[i].body;
                let body_b = self.colliders[j].body;

                // Two free-floating colliders have nothing to resolve, and
                // two kinematic bodies never respond to each other.
                if body_a.is_none() && body_b.is_none() {
                    continue;
                }
                let kin_a = body_a.map(|b| self.bodies[b].is_kinematic) == Some(true);
                let kin_b = body_b.map(|b| self.bodies[b].is_kinematic) == Some(true);
                if kin_a && kin_b {
                    continue;
                }

                let manifold =
                    collider::compute_manifold(&self.colliders[i], &self.colliders[j], &self.bodies);
                if manifold.colliding {
                    Self::resolve(
                        &mut self.bodies,
                        body_a,
                        body_b,
                        &manifold,
                        self.restitution,
                    );
                }
            }
        }
    }

    /// Impulse-based contact resolution with positional correction.
    fn resolve(
        bodies: &mut [RigidBody],
        a: Option<usize>,
        b: Option<usize>,
        manifold: &crate::collider::Manifold,
        restitution: Fix64,
    ) {
        let inv_a = a.map(|i| bodies[i].inverse_mass()).unwrap_or(Fix64::ZERO);
        let inv_b = b.map(|i| bodies[i].inverse_mass()).unwrap_or(Fix64::ZERO);
        let total_inv_mass = inv_a + inv_b;
        if total_inv_mass.is_zero() {
            return;
        }

        // Positional correction: split the penetration by inverse-mass
        // share. Kinematic bodies keep their inverse mass in the
        // denominator but are never displaced.
        let correction = manifold.normal * (manifold.penetration / total_inv_mass);
        if let Some(ia) = a {
            if !bodies[ia].is_kinematic {
                bodies[ia].position -= correction * inv_a;
            }
        }
        if let Some(ib) = b {
            if !bodies[ib].is_kinematic {
                bodies[ib].position += correction * inv_b;
            }
        }

        // Velocity response along the normal.
        let vel_a = a.map(|i| bodies[i].velocity).unwrap_or(Vec3Fix::ZERO);
        let vel_b = b.map(|i| bodies[i].velocity).unwrap_or(Vec3Fix::ZERO);
        let relative = vel_b - vel_a;
        let vel_along_normal = relative.dot(manifold.normal);
        if vel_along_normal > Fix64::ZERO {
            // Already separating.
            return;
        }

        let j = -(Fix64::ONE + restitution) * vel_along_normal / total_inv_mass;
        let impulse = manifold.normal * j;
        if let Some(ia) = a {
            if !bodies[ia].is_kinematic {
                bodies[ia].velocity -= impulse * inv_a;
            }
        }
        if let Some(ib) = b {
            if !bodies[ib].is_kinematic {
                bodies[ib].velocity += impulse * inv_b;
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_fix_close(actual: Fix64, expected: f64) {
        let err = (actual.to_f64() - expected).abs();
        assert!(err < 1e-5, "expected {expected}, got {}", actual.to_f64());
    }

    #[test]
    fn test_constant_force_integration() {
        // m = 2, F = (4,0,0), dt = 1 ⇒ v = (2,0,0), x = (2,0,0).
        let mut body = RigidBody::new().with_mass(Fix64::from_int(2));
        body.add_force(Vec3Fix::from_int(4, 0, 0));
        body.integrate(Fix64::ONE);

        assert_eq!(body.velocity, Vec3Fix::from_int(2, 0, 0));
        assert_eq!(body.position, Vec3Fix::from_int(2, 0, 0));
    }

    #[test]
    fn test_zero_force_never_moves() {
        let mut body = RigidBody::new();
        for _ in 0..100 {
            body.integrate(Fix64::from_ratio(1, 60));
        }
        assert_eq!(body.position, Vec3Fix::ZERO);
        assert_eq!(body.velocity, Vec3Fix::ZERO);
    }

    #[test]
    fn test_kinematic_skips_integration_but_clears_forces() {
        let mut body = RigidBody::new().kinematic();
        body.add_force(Vec3Fix::from_int(100, 0, 0));
        body.integrate(Fix64::ONE);
        assert_eq!(body.position, Vec3Fix::ZERO);

        // Make it dynamic again: the old force must be gone.
        body.is_kinematic = false;
        body.integrate(Fix64::ONE);
        assert_eq!(body.position, Vec3Fix::ZERO);
    }

    #[test]
    fn test_infinite_mass_is_immovable() {
        let mut body = RigidBody::new().with_mass(Fix64::ZERO);
        assert_eq!(body.inverse_mass(), Fix64::ZERO);
        body.add_force(Vec3Fix::from_int(50, 0, 0));
        body.integrate(Fix64::ONE);
        assert_eq!(body.position, Vec3Fix::ZERO);
    }

    #[test]
    fn test_torque_spins_body() {
        let mut body = RigidBody::new();
        body.add_torque(Vec3Fix::new(Fix64::ZERO, Fix64::ONE, Fix64::ZERO));
        body.integrate(Fix64::ONE);

        assert_eq!(
            body.angular_velocity,
            Vec3Fix::new(Fix64::ZERO, Fix64::ONE, Fix64::ZERO)
        );
        // One radian of accumulated Y rotation.
        let euler = body.rotation.to_euler();
        assert_fix_close(euler.y, 1.0);
    }

    #[test]
    fn test_gravity_applied_in_step() {
        let mut world = PhysicsWorld::new();
        world.add_body(RigidBody::at(Vec3Fix::from_int(0, 100, 0)));

        let dt = Fix64::from_ratio(1, 60);
        for _ in 0..60 {
            world.step(dt);
        }

        assert!(
            world.bodies[0].position.y < Fix64::from_int(100),
            "body should fall under gravity"
        );
    }

    #[test]
    fn test_kinematic_ignores_gravity() {
        let mut world = PhysicsWorld::new();
        world.add_body(RigidBody::at(Vec3Fix::from_int(0, 10, 0)).kinematic());
        for _ in 0..60 {
            world.step(Fix64::from_ratio(1, 60));
        }
        assert_eq!(world.bodies[0].position, Vec3Fix::from_int(0, 10, 0));
    }

    #[test]
    fn test_zero_dt_is_noop() {
        let mut world = PhysicsWorld::new();
        world.add_body(RigidBody::at(Vec3Fix::from_int(0, 5, 0)));
        world.step(Fix64::ZERO);
        assert_eq!(world.bodies[0].position, Vec3Fix::from_int(0, 5, 0));
    }

    #[test]
    fn test_restitution_scenario() {
        // Two unit spheres at x = 0 and x = 1.5, closing at ±1, e = 0.5,
        // one step of dt = 0.1 ⇒ velocities swap sign and halve.
        let mut world = PhysicsWorld::new();
        world.gravity = Vec3Fix::ZERO;
        world.restitution = Fix64::HALF;

        let mut a = RigidBody::new();
        a.velocity = Vec3Fix::from_int(1, 0, 0);
        let mut b = RigidBody::at(Vec3Fix::new(
            Fix64::from_ratio(3, 2),
            Fix64::ZERO,
            Fix64::ZERO,
        ));
        b.velocity = Vec3Fix::from_int(-1, 0, 0);

        let ia = world.add_body(a);
        let ib = world.add_body(b);
        world.add_collider(Collider::sphere(Fix64::ONE).with_body(ia));
        world.add_collider(Collider::sphere(Fix64::ONE).with_body(ib));

        world.step(Fix64::from_ratio(1, 10));

        assert_fix_close(world.bodies[ia].velocity.x, -0.5);
        assert_fix_close(world.bodies[ib].velocity.x, 0.5);
        assert_fix_close(world.bodies[ia].velocity.y, 0.0);
        assert_fix_close(world.bodies[ib].velocity.y, 0.0);
    }

    #[test]
    fn test_positional_correction_separates() {
        let mut world = PhysicsWorld::new();
        world.gravity = Vec3Fix::ZERO;

        let ia = world.add_body(RigidBody::new());
        let ib = world.add_body(RigidBody::at(Vec3Fix::new(
            Fix64::from_ratio(3, 2),
            Fix64::ZERO,
            Fix64::ZERO,
        )));
        world.add_collider(Collider::sphere(Fix64::ONE).with_body(ia));
        world.add_collider(Collider::sphere(Fix64::ONE).with_body(ib));

        world.step(Fix64::from_ratio(1, 10));

        // Penetration 0.5 split evenly between equal masses.
        assert_fix_close(world.bodies[ia].position.x, -0.25);
        assert_fix_close(world.bodies[ib].position.x, 1.75);
    }

    #[test]
    fn test_separating_bodies_get_no_impulse() {
        let mut world = PhysicsWorld::new();
        world.gravity = Vec3Fix::ZERO;

        // Overlapping but already moving apart.
        let mut a = RigidBody::new();
        a.velocity = Vec3Fix::from_int(-1, 0, 0);
        let mut b = RigidBody::at(Vec3Fix::ONE * Fix64::HALF);
        b.velocity = Vec3Fix::from_int(1, 0, 0);

        let ia = world.add_body(a);
        let ib = world.add_body(b);
        world.add_collider(Collider::sphere(Fix64::ONE).with_body(ia));
        world.add_collider(Collider::sphere(Fix64::ONE).with_body(ib));

        world.step(Fix64::from_ratio(1, 10));

        // Positions were corrected, but velocities are untouched.
        assert_fix_close(world.bodies[ia].velocity.x, -1.0);
        assert_fix_close(world.bodies[ib].velocity.x, 1.0);
    }

    #[test]
    fn test_static_collider_pushes_dynamic_body() {
        let mut world = PhysicsWorld::new();
        world.gravity = Vec3Fix::ZERO;

        // Bodiless wall collider at the origin, body approaching it.
        world.add_collider(Collider::aabb(Vec3Fix::ONE));
        let mut mover = RigidBody::at(Vec3Fix::new(
            Fix64::from_ratio(3, 2),
            Fix64::ZERO,
            Fix64::ZERO,
        ));
        mover.velocity = Vec3Fix::from_int(-1, 0, 0);
        let ib = world.add_body(mover);
        world.add_collider(Collider::aabb(Vec3Fix::ONE).with_body(ib));

        world.step(Fix64::from_ratio(1, 100));

        // The wall has no body (infinite mass): the mover takes the entire
        // correction and bounces.
        assert!(world.bodies[ib].position.x > Fix64::from_ratio(14, 10));
        assert!(world.bodies[ib].velocity.x > Fix64::ZERO);
    }

    #[test]
    fn test_remove_body_repoints_collider_indices() {
        let mut world = PhysicsWorld::new();
        let a = world.add_body(RigidBody::new());
        let b = world.add_body(RigidBody::at(Vec3Fix::from_int(5, 0, 0)));
        world.add_collider(Collider::sphere(Fix64::ONE).with_body(a));
        world.add_collider(Collider::sphere(Fix64::ONE).with_body(b));

        world.remove_body(a);

        assert_eq!(world.bodies.len(), 1);
        assert_eq!(world.colliders.len(), 1);
        assert_eq!(world.colliders[0].body, Some(0));
    }

    #[test]
    fn test_two_kinematic_bodies_do_not_interact() {
        let mut world = PhysicsWorld::new();
        world.gravity = Vec3Fix::ZERO;

        let ia = world.add_body(RigidBody::new().kinematic());
        let ib = world.add_body(
            RigidBody::at(Vec3Fix::new(Fix64::HALF, Fix64::ZERO, Fix64::ZERO)).kinematic(),
        );
        world.add_collider(Collider::sphere(Fix64::ONE).with_body(ia));
        world.add_collider(Collider::sphere(Fix64::ONE).with_body(ib));

        world.step(Fix64::from_ratio(1, 10));

        assert_eq!(world.bodies[ia].position, Vec3Fix::ZERO);
        assert_eq!(
            world.bodies[ib].position,
            Vec3Fix::new(Fix64::HALF, Fix64::ZERO, Fix64::ZERO)
        );
    }
}
