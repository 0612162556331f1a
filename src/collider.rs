//! Collider Shapes and Narrow-Phase Collision
//!
//! Three convex shapes — axis-aligned box, sphere, oriented box — with
//! pairwise manifold computation. Box/box pairs use the classic 15-axis
//! separating-axis test; everything runs on `Fix64` and is bit-deterministic.
//!
//! # Dispatch
//!
//! Shape pairs are dispatched through a single `match` over the two shape
//! tags. Every supported combination is listed explicitly, so dispatch
//! always terminates and unsupported pairs degrade to "no collision"
//! instead of recursing between shapes.

use crate::math::{Fix64, QuatFix, Vec3Fix};
use crate::physics::RigidBody;

// ============================================================================
// Shapes
// ============================================================================

/// Closed set of collider shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    /// Axis-aligned box described by its half-extents. Ignores rotation.
    Aabb { half_extents: Vec3Fix },
    /// Sphere described by its radius.
    Sphere { radius: Fix64 },
    /// Oriented box described by its half-extents in local space.
    Obb { half_extents: Vec3Fix },
}

/// A collider: a shape placed relative to an optional owning rigid body.
///
/// The body reference is a plain index into the world's body arena — bodies
/// and colliders have independent registration lifecycles, so the collider
/// never owns the body. A collider without a body is static at its local
/// offset/rotation.
#[derive(Clone, Copy, Debug)]
pub struct Collider {
    pub shape: Shape,
    /// Index of the owning body in the world's body list, if any.
    pub body: Option<usize>,
    /// Offset relative to the owning body (or the world origin).
    pub local_offset: Vec3Fix,
    /// Rotation relative to the owning body (or the world axes).
    pub local_rotation: QuatFix,
}

impl Collider {
    /// Axis-aligned box collider with the given half-extents.
    pub fn aabb(half_extents: Vec3Fix) -> Self {
        Self::new(Shape::Aabb { half_extents })
    }

    /// Sphere collider with the given radius.
    pub fn sphere(radius: Fix64) -> Self {
        Self::new(Shape::Sphere { radius })
    }

    /// Oriented box collider with the given half-extents.
    pub fn obb(half_extents: Vec3Fix) -> Self {
        Self::new(Shape::Obb { half_extents })
    }

    fn new(shape: Shape) -> Self {
        Self {
            shape,
            body: None,
            local_offset: Vec3Fix::ZERO,
            local_rotation: QuatFix::IDENTITY,
        }
    }

    /// Attach to a body by arena index.
    pub fn with_body(mut self, body: usize) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the local offset.
    pub fn with_offset(mut self, offset: Vec3Fix) -> Self {
        self.local_offset = offset;
        self
    }

    /// Set the local rotation.
    pub fn with_rotation(mut self, rotation: QuatFix) -> Self {
        self.local_rotation = rotation;
        self
    }

    /// Derived world position:
    /// `body.position + body.rotation.rotate(local_offset)`.
    pub fn world_position(&self, bodies: &[RigidBody]) -> Vec3Fix {
        match self.body.and_then(|i| bodies.get(i)) {
            Some(body) => body.position + body.rotation.rotate(self.local_offset),
            None => self.local_offset,
        }
    }

    /// Derived world rotation:
    /// `(body.rotation * local_rotation).normalized`.
    pub fn world_rotation(&self, bodies: &[RigidBody]) -> QuatFix {
        match self.body.and_then(|i| bodies.get(i)) {
            Some(body) => (body.rotation * self.local_rotation).normalized(),
            None => self.local_rotation,
        }
    }
}

// ============================================================================
// Manifold
// ============================================================================

/// Result of a pairwise narrow-phase test. Transient — recomputed every
/// step, never stored.
#[derive(Clone, Copy, Debug)]
pub struct Manifold {
    /// Whether the two shapes overlap.
    pub colliding: bool,
    /// Unit collision normal, pointing from the first shape toward the
    /// second.
    pub normal: Vec3Fix,
    /// Penetration depth along the normal (≥ 0 when colliding).
    pub penetration: Fix64,
    /// A single world-space contact point.
    pub contact_point: Vec3Fix,
}

impl Manifold {
    /// The "no collision" manifold.
    pub const NONE: Self = Self {
        colliding: false,
        normal: Vec3Fix::ZERO,
        penetration: Fix64::ZERO,
        contact_point: Vec3Fix::ZERO,
    };
}

// ============================================================================
// Pair dispatch
// ============================================================================

/// Compute the collision manifold between two colliders.
///
/// The normal always points from `a` toward `b`. Mixed box pairs promote
/// the AABB to an identity-oriented OBB; sphere-vs-box pairs have no
/// formula in this engine and report no collision.
pub fn compute_manifold(a: &Collider, b: &Collider, bodies: &[RigidBody]) -> Manifold {
    let pa = a.world_position(bodies);
    let pb = b.world_position(bodies);

    match (a.shape, b.shape) {
        (Shape::Aabb { half_extents: ha }, Shape::Aabb { half_extents: hb }) => {
            aabb_vs_aabb(pa, ha, pb, hb)
        }
        (Shape::Sphere { radius: ra }, Shape::Sphere { radius: rb }) => {
            sphere_vs_sphere(pa, ra, pb, rb)
        }
        (Shape::Obb { half_extents: ha }, Shape::Obb { half_extents: hb }) => obb_vs_obb(
            pa,
            a.world_rotation(bodies),
            ha,
            pb,
            b.world_rotation(bodies),
            hb,
        ),
        (Shape::Aabb { half_extents: ha }, Shape::Obb { half_extents: hb }) => obb_vs_obb(
            pa,
            QuatFix::IDENTITY,
            ha,
            pb,
            b.world_rotation(bodies),
            hb,
        ),
        (Shape::Obb { half_extents: ha }, Shape::Aabb { half_extents: hb }) => obb_vs_obb(
            pa,
            a.world_rotation(bodies),
            ha,
            pb,
            QuatFix::IDENTITY,
            hb,
        ),
        // Sphere-vs-box: unsupported pair, explicitly no collision.
        (Shape::Sphere { .. }, Shape::Aabb { .. } | Shape::Obb { .. })
        | (Shape::Aabb { .. } | Shape::Obb { .. }, Shape::Sphere { .. }) => Manifold::NONE,
    }
}

/// Boolean overlap query; same dispatch as `compute_manifold`.
pub fn overlaps(a: &Collider, b: &Collider, bodies: &[RigidBody]) -> bool {
    compute_manifold(a, b, bodies).colliding
}

// ============================================================================
// AABB vs AABB
// ============================================================================

fn aabb_vs_aabb(ca: Vec3Fix, ha: Vec3Fix, cb: Vec3Fix, hb: Vec3Fix) -> Manifold {
    let amin = ca - ha;
    let amax = ca + ha;
    let bmin = cb - hb;
    let bmax = cb + hb;

    // Per-axis interval overlap.
    let dx = amax.x.min(bmax.x) - amin.x.max(bmin.x);
    let dy = amax.y.min(bmax.y) - amin.y.max(bmin.y);
    let dz = amax.z.min(bmax.z) - amin.z.max(bmin.z);

    if dx <= Fix64::ZERO || dy <= Fix64::ZERO || dz <= Fix64::ZERO {
        return Manifold::NONE;
    }

    // Axis of minimum penetration.
    let mut penetration = dx;
    let mut normal = Vec3Fix::UNIT_X;
    if dy < penetration {
        penetration = dy;
        normal = Vec3Fix::UNIT_Y;
    }
    if dz < penetration {
        penetration = dz;
        normal = Vec3Fix::UNIT_Z;
    }

    // Point the normal from a toward b.
    if !normal.x.is_zero() && (cb.x - ca.x).is_negative() {
        normal = -Vec3Fix::UNIT_X;
    } else if !normal.y.is_zero() && (cb.y - ca.y).is_negative() {
        normal = -Vec3Fix::UNIT_Y;
    } else if !normal.z.is_zero() && (cb.z - ca.z).is_negative() {
        normal = -Vec3Fix::UNIT_Z;
    }

    // Contact: midpoint of the overlap region.
    let contact_point = Vec3Fix::new(
        (amin.x.max(bmin.x) + amax.x.min(bmax.x)) * Fix64::HALF,
        (amin.y.max(bmin.y) + amax.y.min(bmax.y)) * Fix64::HALF,
        (amin.z.max(bmin.z) + amax.z.min(bmax.z)) * Fix64::HALF,
    );

    Manifold {
        colliding: true,
        normal,
        penetration,
        contact_point,
    }
}

// ============================================================================
// Sphere vs Sphere
// ============================================================================

fn sphere_vs_sphere(ca: Vec3Fix, ra: Fix64, cb: Vec3Fix, rb: Fix64) -> Manifold {
    let diff = cb - ca;
    let dist_sq = diff.dot(diff);
    let r_sum = ra + rb;

    if dist_sq > r_sum * r_sum {
        return Manifold::NONE;
    }

    let dist = dist_sq.sqrt();
    // Exactly coincident centers: any separating direction works, pick +X.
    let normal = if dist.is_zero() {
        Vec3Fix::UNIT_X
    } else {
        diff / dist
    };
    let penetration = r_sum - dist;
    // A's surface point along the normal, pulled back by half the overlap.
    let contact_point = ca + normal * (ra - penetration * Fix64::HALF);

    Manifold {
        colliding: true,
        normal,
        penetration,
        contact_point,
    }
}

// ============================================================================
// OBB vs OBB (15-axis SAT)
// ============================================================================

fn obb_vs_obb(
    ca: Vec3Fix,
    qa: QuatFix,
    ha: Vec3Fix,
    cb: Vec3Fix,
    qb: QuatFix,
    hb: Vec3Fix,
) -> Manifold {
    let axes_a = [
        qa.rotate(Vec3Fix::UNIT_X),
        qa.rotate(Vec3Fix::UNIT_Y),
        qa.rotate(Vec3Fix::UNIT_Z),
    ];
    let axes_b = [
        qb.rotate(Vec3Fix::UNIT_X),
        qb.rotate(Vec3Fix::UNIT_Y),
        qb.rotate(Vec3Fix::UNIT_Z),
    ];
    let half_a = [ha.x, ha.y, ha.z];
    let half_b = [hb.x, hb.y, hb.z];

    // Rotation matrix between the two frames and its absolute value, padded
    // by one ulp so near-parallel cross axes do not produce a false
    // separation from rounding.
    let mut r = [[Fix64::ZERO; 3]; 3];
    let mut abs_r = [[Fix64::ZERO; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            r[i][j] = axes_a[i].dot(axes_b[j]);
            abs_r[i][j] = r[i][j].abs() + Fix64::EPSILON;
        }
    }

    // Center delta projected onto each frame.
    let t_vec = cb - ca;
    let mut t_a = [Fix64::ZERO; 3];
    let mut t_b = [Fix64::ZERO; 3];
    for i in 0..3 {
        t_a[i] = t_vec.dot(axes_a[i]);
        t_b[i] = t_vec.dot(axes_b[i]);
    }

    let mut best_pen = Fix64::ZERO;
    let mut best_axis = Vec3Fix::ZERO;
    let mut found = false;

    // A's face axes.
    for i in 0..3 {
        let ra = half_a[i];
        let rb = half_b[0] * abs_r[i][0] + half_b[1] * abs_r[i][1] + half_b[2] * abs_r[i][2];
        let penetration = (ra + rb) - t_a[i].abs();
        if penetration.is_negative() {
            return Manifold::NONE;
        }

        let sign = if t_a[i].is_negative() {
            Fix64::NEG_ONE
        } else {
            Fix64::ONE
        };
        if !found || penetration < best_pen {
            best_pen = penetration;
            best_axis = axes_a[i] * sign;
            found = true;
        }
    }

    // B's face axes.
    for j in 0..3 {
        let ra = half_a[0] * abs_r[0][j] + half_a[1] * abs_r[1][j] + half_a[2] * abs_r[2][j];
        let rb = half_b[j];
        let penetration = (ra + rb) - t_b[j].abs();
        if penetration.is_negative() {
            return Manifold::NONE;
        }

        let sign = if t_b[j].is_negative() {
            Fix64::NEG_ONE
        } else {
            Fix64::ONE
        };
        if !found || penetration < best_pen {
            best_pen = penetration;
            best_axis = axes_b[j] * sign;
            found = true;
        }
    }

    // Cross axes A_i × B_j.
    for i in 0..3 {
        for j in 0..3 {
            let k = (i + 1) % 3;
            let l = (i + 2) % 3;
            let m = (j + 1) % 3;
            let n = (j + 2) % 3;

            let ra = half_a[k] * abs_r[l][j] + half_a[l] * abs_r[k][j];
            let rb = half_b[m] * abs_r[i][n] + half_b[n] * abs_r[i][m];

            let dist = (t_a[l] * r[k][j] - t_a[k] * r[l][j]).abs();
            if dist > ra + rb {
                return Manifold::NONE;
            }

            let axis = axes_a[i].cross(axes_b[j]);
            if axis == Vec3Fix::ZERO {
                // Parallel edges; this axis duplicates a face axis.
                continue;
            }

            let penetration = (ra + rb) - dist;
            let sign = if t_vec.dot(axis).is_negative() {
                Fix64::NEG_ONE
            } else {
                Fix64::ONE
            };
            let axis = axis.normalized() * sign;

            if !found || penetration < best_pen {
                best_pen = penetration;
                best_axis = axis;
                found = true;
            }
        }
    }

    if !found {
        return Manifold::NONE;
    }

    // Contact approximation: midpoint of the two support points along the
    // separating axis.
    let support_a = obb_support(ca, &axes_a, ha, -best_axis);
    let support_b = obb_support(cb, &axes_b, hb, best_axis);
    let contact_point = (support_a + support_b) * Fix64::HALF;

    Manifold {
        colliding: true,
        normal: best_axis,
        penetration: best_pen,
        contact_point,
    }
}

/// World-space support point of an OBB in direction `dir`.
fn obb_support(center: Vec3Fix, axes: &[Vec3Fix; 3], half: Vec3Fix, dir: Vec3Fix) -> Vec3Fix {
    let half = [half.x, half.y, half.z];
    let mut p = center;
    for (axis, h) in axes.iter().zip(half) {
        let sign = if dir.dot(*axis).is_negative() {
            -h
        } else {
            h
        };
        p += *axis * sign;
    }
    p
}

// ============================================================================
// Tests
// ============================================================================
