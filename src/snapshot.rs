//! State Snapshots and Desync Checksums
//!
//! A snapshot is a byte-exact capture of every body's dynamic state at one
//! tick, written and read in strict list order. Restoring a snapshot into
//! the same body list reproduces the raw fixed-point bits exactly, which is
//! what makes rollback deterministic.
//!
//! The layout per body is 13 little-endian `i64` raw values:
//! position xyz, rotation xyzw, velocity xyz, angular velocity xyz.

use crate::math::{Fix64, QuatFix, Vec3Fix};
use crate::physics::RigidBody;

/// Bytes captured per body: 13 raw `i64` fields.
pub const BYTES_PER_BODY: usize = 13 * 8;

// ============================================================================
// Snapshot
// ============================================================================

/// Byte-exact capture of a body list's dynamic state at one tick.
///
/// # Precondition
///
/// `restore` must be handed a list with the same length and ordering as the
/// one passed to `create`. This is NOT checked in release builds — a
/// reordered or resized list silently misassigns state. The rollback layer
/// guarantees it by always snapshotting the world's registration-ordered
/// body list.
#[derive(Clone, Debug)]
pub struct Snapshot {
    tick: i64,
    data: Vec<u8>,
}

impl Snapshot {
    /// Capture `bodies` at `tick`, in list order.
    pub fn create(tick: i64, bodies: &[RigidBody]) -> Self {
        let mut data = Vec::with_capacity(bodies.len() * BYTES_PER_BODY);
        for body in bodies {
            write_vec3(&mut data, body.position);
            write_quat(&mut data, body.rotation);
            write_vec3(&mut data, body.velocity);
            write_vec3(&mut data, body.angular_velocity);
        }
        Self { tick, data }
    }

    /// The tick this snapshot was taken at.
    #[inline]
    pub fn tick(&self) -> i64 {
        self.tick
    }

    /// Size of the captured state in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the snapshot covers no bodies.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write the captured state back into `bodies`, in list order.
    pub fn restore(&self, bodies: &mut [RigidBody]) {
        debug_assert_eq!(
            self.data.len(),
            bodies.len() * BYTES_PER_BODY,
            "snapshot restored into a list of a different size"
        );

        for (i, body) in bodies.iter_mut().enumerate() {
            let base = i * BYTES_PER_BODY;
            if base + BYTES_PER_BODY > self.data.len() {
                break;
            }
            let mut offset = base;
            body.position = read_vec3(&self.data, &mut offset);
            body.rotation = read_quat(&self.data, &mut offset);
            body.velocity = read_vec3(&self.data, &mut offset);
            body.angular_velocity = read_vec3(&self.data, &mut offset);
        }
    }
}

fn write_fix(data: &mut Vec<u8>, value: Fix64) {
    data.extend_from_slice(&value.raw().to_le_bytes());
}

fn write_vec3(data: &mut Vec<u8>, v: Vec3Fix) {
    write_fix(data, v.x);
    write_fix(data, v.y);
    write_fix(data, v.z);
}

fn write_quat(data: &mut Vec<u8>, q: QuatFix) {
    write_fix(data, q.x);
    write_fix(data, q.y);
    write_fix(data, q.z);
    write_fix(data, q.w);
}

fn read_fix(data: &[u8], offset: &mut usize) -> Fix64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[*offset..*offset + 8]);
    *offset += 8;
    Fix64::from_raw(i64::from_le_bytes(bytes))
}

fn read_vec3(data: &[u8], offset: &mut usize) -> Vec3Fix {
    Vec3Fix::new(
        read_fix(data, offset),
        read_fix(data, offset),
        read_fix(data, offset),
    )
}

fn read_quat(data: &[u8], offset: &mut usize) -> QuatFix {
    QuatFix::new(
        read_fix(data, offset),
        read_fix(data, offset),
        read_fix(data, offset),
        read_fix(data, offset),
    )
}

// ============================================================================
// State Checksum
// ============================================================================

/// 64-bit checksum of a body list's dynamic state.
///
/// Peers exchange these once in a while to detect desyncs: two simulations
/// that processed identical inputs must produce identical checksums at the
/// same tick. Uses xor-rotate mixing per field with an avalanche finisher
/// so single-bit state differences flip roughly half the output bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StateChecksum(pub u64);

impl StateChecksum {
    /// Checksum the dynamic state of `bodies`, in list order.
    pub fn from_bodies(bodies: &[RigidBody]) -> Self {
        let mut hash: u64 = 0;
        for (i, body) in bodies.iter().enumerate() {
            let mut h = i as u64;
            h ^= (body.position.x.raw() as u64).rotate_left(5);
            h ^= (body.position.y.raw() as u64).rotate_left(11);
            h ^= (body.position.z.raw() as u64).rotate_left(17);
            h ^= (body.rotation.x.raw() as u64).rotate_left(23);
            h ^= (body.rotation.y.raw() as u64).rotate_left(29);
            h ^= (body.rotation.z.raw() as u64).rotate_left(37);
            h ^= (body.rotation.w.raw() as u64).rotate_left(41);
            h ^= (body.velocity.x.raw() as u64).rotate_left(3);
            h ^= (body.velocity.y.raw() as u64).rotate_left(13);
            h ^= (body.velocity.z.raw() as u64).rotate_left(19);
            h ^= (body.angular_velocity.x.raw() as u64).rotate_left(43);
            h ^= (body.angular_velocity.y.raw() as u64).rotate_left(47);
            h ^= (body.angular_velocity.z.raw() as u64).rotate_left(53);
            // Avalanche finisher (splitmix64 style).
            h = (h ^ (h >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
            h = (h ^ (h >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
            h ^= h >> 31;
            hash ^= h;
        }
        Self(hash)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_body() -> RigidBody {
        let mut body = RigidBody::at(Vec3Fix::from_int(1, 2, 3));
        body.rotation = QuatFix::from_axis_angle(Vec3Fix::UNIT_Z, Fix64::HALF);
        body.velocity = Vec3Fix::from_int(4, 5, 6);
        body.angular_velocity = Vec3Fix::from_int(7, 8, 9);
        body
    }

    #[test]
    fn test_round_trip_is_bit_exact() {
        let original = sample_body();
        let mut bodies = vec![original];

        let snap = Snapshot::create(42, &bodies);
        assert_eq!(snap.tick(), 42);
        assert_eq!(snap.len(), BYTES_PER_BODY);

        // Scramble, then restore.
        bodies[0] = RigidBody::new();
        snap.restore(&mut bodies);

        let restored = &bodies[0];
        assert_eq!(restored.position.x.raw(), original.position.x.raw());
        assert_eq!(restored.position.y.raw(), original.position.y.raw());
        assert_eq!(restored.position.z.raw(), original.position.z.raw());
        assert_eq!(restored.rotation.x.raw(), original.rotation.x.raw());
        assert_eq!(restored.rotation.y.raw(), original.rotation.y.raw());
        assert_eq!(restored.rotation.z.raw(), original.rotation.z.raw());
        assert_eq!(restored.rotation.w.raw(), original.rotation.w.raw());
        assert_eq!(restored.velocity.x.raw(), original.velocity.x.raw());
        assert_eq!(restored.velocity.y.raw(), original.velocity.y.raw());
        assert_eq!(restored.velocity.z.raw(), original.velocity.z.raw());
        assert_eq!(
            restored.angular_velocity.x.raw(),
            original.angular_velocity.x.raw()
        );
        assert_eq!(
            restored.angular_velocity.y.raw(),
            original.angular_velocity.y.raw()
        );
        assert_eq!(
            restored.angular_velocity.z.raw(),
            original.angular_velocity.z.raw()
        );
    }

    #[test]
    fn test_round_trip_many_bodies_in_order() {
        let mut bodies: Vec<RigidBody> = (0..8)
            .map(|i| RigidBody::at(Vec3Fix::from_int(i, i * 2, -i)))
            .collect();

        let snap = Snapshot::create(0, &bodies);
        for body in &mut bodies {
            body.position = Vec3Fix::ZERO;
        }
        snap.restore(&mut bodies);

        for (i, body) in bodies.iter().enumerate() {
            let i = i as i64;
            assert_eq!(body.position, Vec3Fix::from_int(i, i * 2, -i));
        }
    }

    #[test]
    fn test_restore_does_not_touch_mass_or_flags() {
        let mut bodies = vec![RigidBody::new().with_mass(Fix64::from_int(3))];
        let snap = Snapshot::create(0, &bodies);

        bodies[0].set_mass(Fix64::from_int(7));
        snap.restore(&mut bodies);

        // Only dynamic state is captured; configuration stays put.
        assert_eq!(bodies[0].mass(), Fix64::from_int(7));
    }

    #[test]
    fn test_checksum_equal_for_equal_state() {
        let bodies_a = vec![sample_body(), RigidBody::new()];
        let bodies_b = vec![sample_body(), RigidBody::new()];
        assert_eq!(
            StateChecksum::from_bodies(&bodies_a),
            StateChecksum::from_bodies(&bodies_b)
        );
    }

    #[test]
    fn test_checksum_differs_on_single_bit() {
        let bodies_a = vec![sample_body()];
        let mut tweaked = sample_body();
        tweaked.position.x = Fix64::from_raw(tweaked.position.x.raw() ^ 1);
        let bodies_b = vec![tweaked];

        assert_ne!(
            StateChecksum::from_bodies(&bodies_a),
            StateChecksum::from_bodies(&bodies_b)
        );
    }

    #[test]
    fn test_checksum_sensitive_to_order() {
        let a = sample_body();
        let b = RigidBody::at(Vec3Fix::from_int(-1, -2, -3));
        assert_ne!(
            StateChecksum::from_bodies(&[a, b]),
            StateChecksum::from_bodies(&[b, a])
        );
    }
}
