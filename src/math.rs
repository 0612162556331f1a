//! Deterministic Fixed-Point Mathematics
//!
//! # Overview
//!
//! This module provides bit-exact arithmetic that produces identical results
//! on x86, ARM, WASM, or any other platform. No IEEE 754 floating point is
//! used anywhere on the simulation path.
//!
//! # Types
//!
//! - `Fix64` (Q32.32): 64-bit fixed-point with 32 integer bits, 32 fractional bits
//! - `Vec2Fix` / `Vec3Fix` / `Vec4Fix`: vectors using `Fix64` components
//! - `QuatFix`: quaternion for 3D rotations
//! - `Mat4Fix`: 4x4 matrix for homogeneous transforms
//!
//! # Precision
//!
//! - Range: ±2.1 × 10^9
//! - Resolution: 2^-32 ≈ 2.3 × 10^-10
//! - Transcendentals (CORDIC trig, Newton sqrt) are accurate to ~1e-5 and
//!   bit-identical across platforms. `exp`/`ln`/`pow` fall back to `f64`
//!   and are explicitly NOT part of the determinism guarantee.

use core::fmt;
use core::ops::{Add, AddAssign, Div, Mul, Neg, Shl, Shr, Sub, SubAssign};

// ============================================================================
// Fix64 (Q32.32) - 64-bit Fixed-Point Number
// ============================================================================

/// Number of fractional bits.
pub const SHIFT: u32 = 32;

/// Raw value of 1.0.
pub const ONE_RAW: i64 = 1i64 << SHIFT;

/// 64-bit fixed-point number, format Q32.32.
///
/// Internal representation: `value = raw / 2^32`.
///
/// Addition and subtraction wrap on overflow (overflow is outside the
/// simulation envelope and is not guarded). Multiplication and division use
/// a widened 128-bit intermediate before re-scaling, so intermediate
/// products never overflow.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Fix64 {
    raw: i64,
}

impl Fix64 {
    /// Fixed-point 0.
    pub const ZERO: Self = Self { raw: 0 };

    /// Fixed-point 1.
    pub const ONE: Self = Self { raw: ONE_RAW };

    /// Fixed-point -1.
    pub const NEG_ONE: Self = Self { raw: -ONE_RAW };

    /// Fixed-point 0.5.
    pub const HALF: Self = Self { raw: ONE_RAW >> 1 };

    /// Smallest representable increment (2^-32).
    pub const EPSILON: Self = Self { raw: 1 };

    /// π in Q32.32 (truncated).
    pub const PI: Self = Self { raw: 13_493_037_704 };

    /// 2π in Q32.32 (truncated).
    pub const TWO_PI: Self = Self { raw: 26_986_075_409 };

    /// π/2 in Q32.32 (truncated).
    pub const HALF_PI: Self = Self { raw: 6_746_518_852 };

    /// Euler's number e in Q32.32 (truncated).
    pub const E: Self = Self { raw: 11_674_931_554 };

    /// Build from a raw Q32.32 bit pattern.
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Self { raw }
    }

    /// The raw Q32.32 bit pattern. The snapshot and checksum layers depend
    /// on this being the exact wire representation.
    #[inline]
    pub const fn raw(self) -> i64 {
        self.raw
    }

    /// Convert from an integer.
    #[inline]
    pub const fn from_int(v: i64) -> Self {
        Self { raw: v << SHIFT }
    }

    /// Exact rational constructor: `num / denom`.
    ///
    /// The preferred way to write fractional constants without touching
    /// floating point. Panics when `denom` is zero, like `Div`.
    #[inline]
    pub fn from_ratio(num: i64, denom: i64) -> Self {
        Self::from_int(num) / Self::from_int(denom)
    }

    /// Convert from `f32`. Initialization/tooling only — float conversions
    /// are not part of the determinism guarantee.
    #[inline]
    pub fn from_f32(v: f32) -> Self {
        Self {
            raw: (v as f64 * ONE_RAW as f64) as i64,
        }
    }

    /// Convert from `f64`. Initialization/tooling only — float conversions
    /// are not part of the determinism guarantee.
    #[inline]
    pub fn from_f64(v: f64) -> Self {
        Self {
            raw: (v * ONE_RAW as f64) as i64,
        }
    }

    /// Truncate to an integer.
    #[inline]
    pub const fn to_int(self) -> i64 {
        self.raw >> SHIFT
    }

    /// Convert to `f32` (debugging/presentation only).
    #[inline]
    pub fn to_f32(self) -> f32 {
        self.raw as f32 / ONE_RAW as f32
    }

    /// Convert to `f64` (debugging/presentation only).
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.raw as f64 / ONE_RAW as f64
    }

    /// Absolute value.
    #[inline]
    pub const fn abs(self) -> Self {
        if self.raw < 0 {
            Self { raw: -self.raw }
        } else {
            self
        }
    }

    /// True when the value is exactly zero.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.raw == 0
    }

    /// True when the value is negative.
    #[inline]
    pub const fn is_negative(self) -> bool {
        self.raw < 0
    }

    /// Minimum of two values.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        if self.raw < other.raw {
            self
        } else {
            other
        }
    }

    /// Maximum of two values.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        if self.raw > other.raw {
            self
        } else {
            other
        }
    }

    /// Clamp into `[min, max]`.
    #[inline]
    pub fn clamp(self, min: Self, max: Self) -> Self {
        if self.raw < min.raw {
            min
        } else if self.raw > max.raw {
            max
        } else {
            self
        }
    }

    /// Linear interpolation `a + (b - a) * t` (t is not clamped here).
    #[inline]
    pub fn lerp(a: Self, b: Self, t: Self) -> Self {
        a + (b - a) * t
    }

    /// Checked division: `None` when `rhs` is zero.
    #[inline]
    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        if rhs.raw == 0 {
            None
        } else {
            Some(self / rhs)
        }
    }

    /// Square root via Newton iteration, seeded from the input itself.
    ///
    /// 16 iterations reach full Q32.32 precision for inputs in the
    /// simulation's working range. Non-positive input returns zero.
    pub fn sqrt(self) -> Self {
        if self.raw <= 0 {
            return Self::ZERO;
        }
        let mut guess = self;
        for _ in 0..16 {
            guess = (guess + self / guess) >> 1;
        }
        guess
    }

    /// Simultaneous sine and cosine via CORDIC rotation mode.
    ///
    /// The angle is reduced into (−π, π] first; 32 iterations give ~1e-5
    /// accuracy. Bit-identical on every platform.
    pub fn sin_cos(self) -> (Self, Self) {
        cordic_sin_cos(self)
    }

    /// Sine (CORDIC).
    #[inline]
    pub fn sin(self) -> Self {
        cordic_sin_cos(self).0
    }

    /// Cosine (CORDIC).
    #[inline]
    pub fn cos(self) -> Self {
        cordic_sin_cos(self).1
    }

    /// Tangent: `sin / cos`. Panics at odd multiples of π/2 where the
    /// cosine rounds to exactly zero.
    #[inline]
    pub fn tan(self) -> Self {
        let (s, c) = cordic_sin_cos(self);
        s / c
    }

    /// Four-quadrant arctangent via CORDIC vectoring mode, range (−π, π].
    pub fn atan2(y: Self, x: Self) -> Self {
        cordic_atan2(y, x)
    }

    /// Arcsine via `atan2(x, sqrt(1 - x²))`. Input is clamped to [−1, 1].
    pub fn asin(self) -> Self {
        let x = self.clamp(Self::NEG_ONE, Self::ONE);
        Self::atan2(x, (Self::ONE - x * x).sqrt())
    }

    /// Arccosine via `atan2(sqrt(1 - x²), x)`. Input is clamped to [−1, 1].
    pub fn acos(self) -> Self {
        let x = self.clamp(Self::NEG_ONE, Self::ONE);
        Self::atan2((Self::ONE - x * x).sqrt(), x)
    }

    /// Natural exponential.
    ///
    /// Implemented via `f64` — NOT bit-deterministic across platforms.
    /// Keep it out of replicated simulation state.
    pub fn exp(self) -> Self {
        Self::from_f64(self.to_f64().exp())
    }

    /// Natural logarithm (input must be > 0).
    ///
    /// Implemented via `f64` — NOT bit-deterministic across platforms.
    /// Keep it out of replicated simulation state.
    pub fn ln(self) -> Self {
        Self::from_f64(self.to_f64().ln())
    }

    /// Power: `x^y = exp(y · ln x)`.
    ///
    /// Inherits the `f64` fallback of `exp`/`ln` and the same caveat.
    pub fn pow(self, exponent: Self) -> Self {
        (exponent * self.ln()).exp()
    }
}

impl Add for Fix64 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self {
            raw: self.raw.wrapping_add(rhs.raw),
        }
    }
}

impl Sub for Fix64 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self {
            raw: self.raw.wrapping_sub(rhs.raw),
        }
    }
}

impl AddAssign for Fix64 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Fix64 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul for Fix64 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        // Widen to 128 bits so the pre-shift product cannot overflow.
        let product = self.raw as i128 * rhs.raw as i128;
        Self {
            raw: (product >> SHIFT) as i64,
        }
    }
}

impl Div for Fix64 {
    type Output = Self;

    /// Panics when `rhs` is zero — fixed-point division by zero is a fatal
    /// simulation error, exactly like integer division in Rust.
    #[inline]
    fn div(self, rhs: Self) -> Self {
        if rhs.raw == 0 {
            panic!("fixed-point division by zero");
        }
        let dividend = (self.raw as i128) << SHIFT;
        Self {
            raw: (dividend / rhs.raw as i128) as i64,
        }
    }
}

impl Neg for Fix64 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            raw: self.raw.wrapping_neg(),
        }
    }
}

impl Shl<u32> for Fix64 {
    type Output = Self;

    #[inline]
    fn shl(self, bits: u32) -> Self {
        Self {
            raw: self.raw << bits,
        }
    }
}

impl Shr<u32> for Fix64 {
    type Output = Self;

    #[inline]
    fn shr(self, bits: u32) -> Self {
        Self {
            raw: self.raw >> bits,
        }
    }
}

impl fmt::Debug for Fix64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fix64({})", self.to_f64())
    }
}

impl fmt::Display for Fix64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

impl From<i64> for Fix64 {
    #[inline]
    fn from(v: i64) -> Self {
        Self::from_int(v)
    }
}

// ============================================================================
// CORDIC (Coordinate Rotation Digital Computer)
// ============================================================================

/// Number of CORDIC iterations. 32 matches the fractional precision of the
/// Q32.32 format; each iteration contributes roughly one bit.
const CORDIC_ITERATIONS: u32 = 32;

/// atan(2^-i) for i = 0..32, in Q32.32 raw form.
///
/// Baked in as constants so the table is identical on every platform (the
/// reference implementation computed it from doubles at startup, which tied
/// the table to the host libm).
const ATAN_TABLE: [Fix64; CORDIC_ITERATIONS as usize] = [
    Fix64::from_raw(3_373_259_426), // atan(1) = π/4
    Fix64::from_raw(1_991_351_317), // atan(1/2)
    Fix64::from_raw(1_052_175_346), // atan(1/4)
    Fix64::from_raw(534_100_634),
    Fix64::from_raw(268_086_747),
    Fix64::from_raw(134_174_062),
    Fix64::from_raw(67_103_403),
    Fix64::from_raw(33_553_749),
    Fix64::from_raw(16_777_130),
    Fix64::from_raw(8_388_597),
    Fix64::from_raw(4_194_302),
    Fix64::from_raw(2_097_151),
    Fix64::from_raw(1_048_575),
    Fix64::from_raw(524_287),
    Fix64::from_raw(262_143),
    Fix64::from_raw(131_071),
    Fix64::from_raw(65_535),
    Fix64::from_raw(32_767),
    Fix64::from_raw(16_383),
    Fix64::from_raw(8_191),
    Fix64::from_raw(4_095),
    Fix64::from_raw(2_047),
    Fix64::from_raw(1_023),
    Fix64::from_raw(511),
    Fix64::from_raw(255),
    Fix64::from_raw(127),
    Fix64::from_raw(63),
    Fix64::from_raw(32),
    Fix64::from_raw(16),
    Fix64::from_raw(8),
    Fix64::from_raw(4),
    Fix64::from_raw(2),
];

/// CORDIC gain K = Π 1/√(1 + 2^-2i) ≈ 0.607252935, Q32.32 raw form.
const CORDIC_K: Fix64 = Fix64::from_raw(2_608_131_496);

/// CORDIC rotation mode: simultaneous sin/cos.
fn cordic_sin_cos(angle: Fix64) -> (Fix64, Fix64) {
    // Reduce into (−π, π].
    let mut raw = angle.raw() % Fix64::TWO_PI.raw();
    if raw < 0 {
        raw += Fix64::TWO_PI.raw();
    }
    let mut z = Fix64::from_raw(raw);
    if z > Fix64::PI {
        z = z - Fix64::TWO_PI;
    }

    // Start at (K, 0) and rotate by z.
    let mut x = CORDIC_K;
    let mut y = Fix64::ZERO;

    for i in 0..CORDIC_ITERATIONS {
        let dx = x >> i;
        let dy = y >> i;
        if !z.is_negative() {
            x = x - dy;
            y = y + dx;
            z = z - ATAN_TABLE[i as usize];
        } else {
            x = x + dy;
            y = y - dx;
            z = z + ATAN_TABLE[i as usize];
        }
    }

    (y, x)
}

/// CORDIC vectoring mode: atan2 with quadrant correction.
fn cordic_atan2(y: Fix64, x: Fix64) -> Fix64 {
    let mut x1 = x;
    let mut y1 = y;
    let mut z = Fix64::ZERO;

    for i in 0..CORDIC_ITERATIONS {
        let dx = x1 >> i;
        let dy = y1 >> i;
        if y1.raw() > 0 {
            x1 = x1 + dy;
            y1 = y1 - dx;
            z = z + ATAN_TABLE[i as usize];
        } else {
            x1 = x1 - dy;
            y1 = y1 + dx;
            z = z - ATAN_TABLE[i as usize];
        }
    }

    // Vectoring converges to atan(y/x) for x > 0; fold the left half-plane
    // back in so the result covers (−π, π].
    if x.is_negative() {
        if !y.is_negative() {
            z = z + Fix64::PI;
        } else {
            z = z - Fix64::PI;
        }
    }
    z
}

// ============================================================================
// Vec2Fix - 2D Vector
// ============================================================================

/// 2D vector with `Fix64` components.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Vec2Fix {
    pub x: Fix64,
    pub y: Fix64,
}

impl Vec2Fix {
    pub const ZERO: Self = Self {
        x: Fix64::ZERO,
        y: Fix64::ZERO,
    };

    pub const ONE: Self = Self {
        x: Fix64::ONE,
        y: Fix64::ONE,
    };

    #[inline]
    pub const fn new(x: Fix64, y: Fix64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub const fn from_int(x: i64, y: i64) -> Self {
        Self {
            x: Fix64::from_int(x),
            y: Fix64::from_int(y),
        }
    }

    /// Dot product.
    #[inline]
    pub fn dot(self, rhs: Self) -> Fix64 {
        self.x * rhs.x + self.y * rhs.y
    }

    /// 2D pseudo-scalar cross product: `x1·y2 − y1·x2`.
    #[inline]
    pub fn cross(self, rhs: Self) -> Fix64 {
        self.x * rhs.y - self.y * rhs.x
    }

    /// Squared length.
    #[inline]
    pub fn sqr_magnitude(self) -> Fix64 {
        self.dot(self)
    }

    /// Length.
    #[inline]
    pub fn magnitude(self) -> Fix64 {
        self.sqr_magnitude().sqrt()
    }

    /// Unit vector, or zero when the length is zero.
    pub fn normalized(self) -> Self {
        let mag = self.magnitude();
        if mag.is_zero() {
            Self::ZERO
        } else {
            Self {
                x: self.x / mag,
                y: self.y / mag,
            }
        }
    }

    /// Clamped linear interpolation, t ∈ [0, 1].
    pub fn lerp(a: Self, b: Self, t: Fix64) -> Self {
        let t = t.clamp(Fix64::ZERO, Fix64::ONE);
        a + (b - a) * t
    }
}

impl Add for Vec2Fix {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2Fix {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Neg for Vec2Fix {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl Mul<Fix64> for Vec2Fix {
    type Output = Self;

    #[inline]
    fn mul(self, s: Fix64) -> Self {
        Self::new(self.x * s, self.y * s)
    }
}

impl Div<Fix64> for Vec2Fix {
    type Output = Self;

    #[inline]
    fn div(self, s: Fix64) -> Self {
        Self::new(self.x / s, self.y / s)
    }
}

// ============================================================================
// Vec3Fix - 3D Vector
// ============================================================================

/// 3D vector with `Fix64` components.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Vec3Fix {
    pub x: Fix64,
    pub y: Fix64,
    pub z: Fix64,
}

impl Vec3Fix {
    pub const ZERO: Self = Self {
        x: Fix64::ZERO,
        y: Fix64::ZERO,
        z: Fix64::ZERO,
    };

    pub const ONE: Self = Self {
        x: Fix64::ONE,
        y: Fix64::ONE,
        z: Fix64::ONE,
    };

    pub const UNIT_X: Self = Self {
        x: Fix64::ONE,
        y: Fix64::ZERO,
        z: Fix64::ZERO,
    };

    pub const UNIT_Y: Self = Self {
        x: Fix64::ZERO,
        y: Fix64::ONE,
        z: Fix64::ZERO,
    };

    pub const UNIT_Z: Self = Self {
        x: Fix64::ZERO,
        y: Fix64::ZERO,
        z: Fix64::ONE,
    };

    #[inline]
    pub const fn new(x: Fix64, y: Fix64, z: Fix64) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn from_int(x: i64, y: i64, z: i64) -> Self {
        Self {
            x: Fix64::from_int(x),
            y: Fix64::from_int(y),
            z: Fix64::from_int(z),
        }
    }

    /// Dot product.
    #[inline]
    pub fn dot(self, rhs: Self) -> Fix64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    /// Cross product.
    #[inline]
    pub fn cross(self, rhs: Self) -> Self {
        Self {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }

    /// Squared length.
    #[inline]
    pub fn sqr_magnitude(self) -> Fix64 {
        self.dot(self)
    }

    /// Length.
    #[inline]
    pub fn magnitude(self) -> Fix64 {
        self.sqr_magnitude().sqrt()
    }

    /// Unit vector, or zero when the length is zero.
    pub fn normalized(self) -> Self {
        let mag = self.magnitude();
        if mag.is_zero() {
            Self::ZERO
        } else {
            self / mag
        }
    }

    /// Clamped linear interpolation, t ∈ [0, 1].
    pub fn lerp(a: Self, b: Self, t: Fix64) -> Self {
        let t = t.clamp(Fix64::ZERO, Fix64::ONE);
        a + (b - a) * t
    }
}

impl Add for Vec3Fix {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3Fix {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl AddAssign for Vec3Fix {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Vec3Fix {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Vec3Fix {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<Fix64> for Vec3Fix {
    type Output = Self;

    #[inline]
    fn mul(self, s: Fix64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Div<Fix64> for Vec3Fix {
    type Output = Self;

    #[inline]
    fn div(self, s: Fix64) -> Self {
        Self::new(self.x / s, self.y / s, self.z / s)
    }
}

// ============================================================================
// Vec4Fix - 4D Vector (homogeneous coordinates)
// ============================================================================

/// 4D vector with `Fix64` components, used for homogeneous transforms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Vec4Fix {
    pub x: Fix64,
    pub y: Fix64,
    pub z: Fix64,
    pub w: Fix64,
}

impl Vec4Fix {
    pub const ZERO: Self = Self {
        x: Fix64::ZERO,
        y: Fix64::ZERO,
        z: Fix64::ZERO,
        w: Fix64::ZERO,
    };

    pub const UNIT_W: Self = Self {
        x: Fix64::ZERO,
        y: Fix64::ZERO,
        z: Fix64::ZERO,
        w: Fix64::ONE,
    };

    #[inline]
    pub const fn new(x: Fix64, y: Fix64, z: Fix64, w: Fix64) -> Self {
        Self { x, y, z, w }
    }

    /// Dot product.
    #[inline]
    pub fn dot(self, rhs: Self) -> Fix64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z + self.w * rhs.w
    }

    /// Squared length.
    #[inline]
    pub fn sqr_magnitude(self) -> Fix64 {
        self.dot(self)
    }

    /// Length.
    #[inline]
    pub fn magnitude(self) -> Fix64 {
        self.sqr_magnitude().sqrt()
    }

    /// Unit vector, or zero when the length is zero.
    pub fn normalized(self) -> Self {
        let mag = self.magnitude();
        if mag.is_zero() {
            Self::ZERO
        } else {
            Self::new(self.x / mag, self.y / mag, self.z / mag, self.w / mag)
        }
    }

    /// Homogeneous divide: `(x/w, y/w, z/w, 1)`. Left unchanged when w = 0.
    pub fn homogenized(self) -> Self {
        if self.w.is_zero() {
            return self;
        }
        let inv_w = Fix64::ONE / self.w;
        Self::new(self.x * inv_w, self.y * inv_w, self.z * inv_w, Fix64::ONE)
    }

    /// Clamped linear interpolation, t ∈ [0, 1].
    pub fn lerp(a: Self, b: Self, t: Fix64) -> Self {
        let t = t.clamp(Fix64::ZERO, Fix64::ONE);
        a + (b - a) * t
    }
}

impl Add for Vec4Fix {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.x + rhs.x,
            self.y + rhs.y,
            self.z + rhs.z,
            self.w + rhs.w,
        )
    }
}

impl Sub for Vec4Fix {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(
            self.x - rhs.x,
            self.y - rhs.y,
            self.z - rhs.z,
            self.w - rhs.w,
        )
    }
}

impl Neg for Vec4Fix {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, -self.w)
    }
}

impl Mul<Fix64> for Vec4Fix {
    type Output = Self;

    #[inline]
    fn mul(self, s: Fix64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s, self.w * s)
    }
}

// ============================================================================
// QuatFix - Quaternion
// ============================================================================

/// Quaternion with `Fix64` components, stored as (x, y, z, w) with w the
/// scalar part.
///
/// No unit-norm invariant is enforced at rest; composing rotations
/// denormalizes slightly. `rotate` and the matrix/Euler conversions assume
/// a near-unit quaternion — normalize after chaining multiplications.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct QuatFix {
    pub x: Fix64,
    pub y: Fix64,
    pub z: Fix64,
    pub w: Fix64,
}

impl Default for QuatFix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl QuatFix {
    /// Identity rotation.
    pub const IDENTITY: Self = Self {
        x: Fix64::ZERO,
        y: Fix64::ZERO,
        z: Fix64::ZERO,
        w: Fix64::ONE,
    };

    #[inline]
    pub const fn new(x: Fix64, y: Fix64, z: Fix64, w: Fix64) -> Self {
        Self { x, y, z, w }
    }

    /// Axis–angle constructor. `axis` must already be normalized; `angle`
    /// is in radians.
    pub fn from_axis_angle(axis: Vec3Fix, angle: Fix64) -> Self {
        let half = angle * Fix64::HALF;
        let (s, c) = half.sin_cos();
        Self {
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
            w: c,
        }
    }

    /// Euler → quaternion, composition order yaw (Y) ∘ pitch (X) ∘ roll (Z).
    /// `euler` carries (pitch, yaw, roll) in radians.
    pub fn from_euler(euler: Vec3Fix) -> Self {
        let (sin_x, cos_x) = (euler.x * Fix64::HALF).sin_cos();
        let (sin_y, cos_y) = (euler.y * Fix64::HALF).sin_cos();
        let (sin_z, cos_z) = (euler.z * Fix64::HALF).sin_cos();

        Self {
            x: cos_y * sin_x * cos_z + sin_y * cos_x * sin_z,
            y: sin_y * cos_x * cos_z - cos_y * sin_x * sin_z,
            z: cos_y * cos_x * sin_z - sin_y * sin_x * cos_z,
            w: cos_y * cos_x * cos_z + sin_y * sin_x * sin_z,
        }
    }

    /// Quaternion → Euler angles (pitch, yaw, roll) in radians, using the
    /// same yaw ∘ pitch ∘ roll convention as `from_euler`.
    pub fn to_euler(self) -> Vec3Fix {
        let two = Fix64::from_int(2);

        // Roll (rotation about Z)
        let sr_cp = two * (self.w * self.z + self.x * self.y);
        let cr_cp = Fix64::ONE - two * (self.y * self.y + self.z * self.z);
        let roll = Fix64::atan2(sr_cp, cr_cp);

        // Pitch (rotation about X)
        let sp = (two * (self.w * self.x - self.z * self.y)).clamp(Fix64::NEG_ONE, Fix64::ONE);
        let pitch = sp.asin();

        // Yaw (rotation about Y)
        let sy_cp = two * (self.w * self.y + self.z * self.x);
        let cy_cp = Fix64::ONE - two * (self.x * self.x + self.y * self.y);
        let yaw = Fix64::atan2(sy_cp, cy_cp);

        Vec3Fix::new(pitch, yaw, roll)
    }

    /// Dot product of two quaternions.
    #[inline]
    pub fn dot(a: Self, b: Self) -> Fix64 {
        a.x * b.x + a.y * b.y + a.z * b.z + a.w * b.w
    }

    /// Conjugate: negated vector part.
    #[inline]
    pub fn conjugate(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
            w: self.w,
        }
    }

    /// Inverse: `q* / |q|²`. Returns identity for the zero quaternion.
    pub fn inverse(self) -> Self {
        let sq = self.sqr_magnitude();
        if sq.is_zero() {
            return Self::IDENTITY;
        }
        self.conjugate() * (Fix64::ONE / sq)
    }

    /// Squared norm.
    #[inline]
    pub fn sqr_magnitude(self) -> Fix64 {
        self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w
    }

    /// Norm.
    #[inline]
    pub fn magnitude(self) -> Fix64 {
        self.sqr_magnitude().sqrt()
    }

    /// Unit quaternion, or identity when the norm is zero.
    pub fn normalized(self) -> Self {
        let mag = self.magnitude();
        if mag.is_zero() {
            return Self::IDENTITY;
        }
        let inv = Fix64::ONE / mag;
        Self {
            x: self.x * inv,
            y: self.y * inv,
            z: self.z * inv,
            w: self.w * inv,
        }
    }

    /// Rotate a vector: the expanded `q v q⁻¹` identity
    /// `v + 2w(u×v) + 2u×(u×v)` with u the vector part.
    pub fn rotate(self, v: Vec3Fix) -> Vec3Fix {
        let u = Vec3Fix::new(self.x, self.y, self.z);
        let t = u.cross(v) * Fix64::from_int(2);
        v + t * self.w + u.cross(t)
    }

    /// Spherical linear interpolation along the shortest arc, t ∈ [0, 1].
    ///
    /// Falls back to normalized linear interpolation when the inputs are
    /// nearly parallel (cosine above 0.9995), where the sine denominator
    /// loses precision.
    pub fn slerp(a: Self, b: Self, t: Fix64) -> Self {
        let t = t.clamp(Fix64::ZERO, Fix64::ONE);
        let mut b = b;
        let mut cos_theta = Self::dot(a, b);

        // Take the shorter of the two arcs.
        if cos_theta.is_negative() {
            b = Self::new(-b.x, -b.y, -b.z, -b.w);
            cos_theta = -cos_theta;
        }

        if cos_theta > Fix64::from_ratio(9995, 10_000) {
            let lerped = Self::new(
                a.x + (b.x - a.x) * t,
                a.y + (b.y - a.y) * t,
                a.z + (b.z - a.z) * t,
                a.w + (b.w - a.w) * t,
            );
            return lerped.normalized();
        }

        let theta = cos_theta.acos();
        let sin_theta = (Fix64::ONE - cos_theta * cos_theta).sqrt();
        let inv_sin = Fix64::ONE / sin_theta;
        let w1 = ((Fix64::ONE - t) * theta).sin() * inv_sin;
        let w2 = (t * theta).sin() * inv_sin;

        Self::new(
            a.x * w1 + b.x * w2,
            a.y * w1 + b.y * w2,
            a.z * w1 + b.z * w2,
            a.w * w1 + b.w * w2,
        )
    }

    /// Quaternion → 4x4 rotation matrix.
    pub fn to_rotation_matrix(self) -> Mat4Fix {
        let two = Fix64::from_int(2);
        let (x, y, z, w) = (self.x, self.y, self.z, self.w);
        let (xx, yy, zz) = (x * x, y * y, z * z);
        let (xy, xz, yz) = (x * y, x * z, y * z);
        let (wx, wy, wz) = (w * x, w * y, w * z);

        Mat4Fix::new(
            Fix64::ONE - two * (yy + zz),
            two * (xy - wz),
            two * (xz + wy),
            Fix64::ZERO,
            two * (xy + wz),
            Fix64::ONE - two * (xx + zz),
            two * (yz - wx),
            Fix64::ZERO,
            two * (xz - wy),
            two * (yz + wx),
            Fix64::ONE - two * (xx + yy),
            Fix64::ZERO,
            Fix64::ZERO,
            Fix64::ZERO,
            Fix64::ZERO,
            Fix64::ONE,
        )
    }
}

impl Mul for QuatFix {
    type Output = Self;

    /// Hamilton product (rotation composition).
    fn mul(self, b: Self) -> Self {
        let a = self;
        Self {
            x: a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
            y: a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
            z: a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
            w: a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
        }
    }
}

impl Mul<Fix64> for QuatFix {
    type Output = Self;

    #[inline]
    fn mul(self, s: Fix64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s, self.w * s)
    }
}

impl Div<Fix64> for QuatFix {
    type Output = Self;

    #[inline]
    fn div(self, s: Fix64) -> Self {
        Self::new(self.x / s, self.y / s, self.z / s, self.w / s)
    }
}

// ============================================================================
// Mat4Fix - 4x4 Matrix (row-major)
// ============================================================================

/// 4x4 matrix with `Fix64` elements, row-major.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[rustfmt::skip]
pub struct Mat4Fix {
    pub m00: Fix64, pub m01: Fix64, pub m02: Fix64, pub m03: Fix64,
    pub m10: Fix64, pub m11: Fix64, pub m12: Fix64, pub m13: Fix64,
    pub m20: Fix64, pub m21: Fix64, pub m22: Fix64, pub m23: Fix64,
    pub m30: Fix64, pub m31: Fix64, pub m32: Fix64, pub m33: Fix64,
}

impl Mat4Fix {
    /// Zero matrix.
    #[rustfmt::skip]
    pub const ZERO: Self = Self {
        m00: Fix64::ZERO, m01: Fix64::ZERO, m02: Fix64::ZERO, m03: Fix64::ZERO,
        m10: Fix64::ZERO, m11: Fix64::ZERO, m12: Fix64::ZERO, m13: Fix64::ZERO,
        m20: Fix64::ZERO, m21: Fix64::ZERO, m22: Fix64::ZERO, m23: Fix64::ZERO,
        m30: Fix64::ZERO, m31: Fix64::ZERO, m32: Fix64::ZERO, m33: Fix64::ZERO,
    };

    /// Identity matrix.
    #[rustfmt::skip]
    pub const IDENTITY: Self = Self {
        m00: Fix64::ONE,  m01: Fix64::ZERO, m02: Fix64::ZERO, m03: Fix64::ZERO,
        m10: Fix64::ZERO, m11: Fix64::ONE,  m12: Fix64::ZERO, m13: Fix64::ZERO,
        m20: Fix64::ZERO, m21: Fix64::ZERO, m22: Fix64::ONE,  m23: Fix64::ZERO,
        m30: Fix64::ZERO, m31: Fix64::ZERO, m32: Fix64::ZERO, m33: Fix64::ONE,
    };

    /// Construct from 16 elements, row by row.
    #[allow(clippy::too_many_arguments)]
    #[rustfmt::skip]
    pub const fn new(
        m00: Fix64, m01: Fix64, m02: Fix64, m03: Fix64,
        m10: Fix64, m11: Fix64, m12: Fix64, m13: Fix64,
        m20: Fix64, m21: Fix64, m22: Fix64, m23: Fix64,
        m30: Fix64, m31: Fix64, m32: Fix64, m33: Fix64,
    ) -> Self {
        Self {
            m00, m01, m02, m03,
            m10, m11, m12, m13,
            m20, m21, m22, m23,
            m30, m31, m32, m33,
        }
    }

    /// Multiply a 4D vector by this matrix.
    pub fn multiply(self, v: Vec4Fix) -> Vec4Fix {
        Vec4Fix::new(
            self.m00 * v.x + self.m01 * v.y + self.m02 * v.z + self.m03 * v.w,
            self.m10 * v.x + self.m11 * v.y + self.m12 * v.z + self.m13 * v.w,
            self.m20 * v.x + self.m21 * v.y + self.m22 * v.z + self.m23 * v.w,
            self.m30 * v.x + self.m31 * v.y + self.m32 * v.z + self.m33 * v.w,
        )
    }

    /// Transform a point (w = 1) with homogeneous divide by the transformed
    /// W. Panics when the transformed W is exactly zero, like any other
    /// fixed-point division by zero.
    pub fn multiply_point(self, p: Vec3Fix) -> Vec3Fix {
        let v = self.multiply(Vec4Fix::new(p.x, p.y, p.z, Fix64::ONE));
        Vec3Fix::new(v.x / v.w, v.y / v.w, v.z / v.w)
    }

    /// Transform a direction (w = 0), no divide.
    pub fn multiply_vector(self, v: Vec3Fix) -> Vec3Fix {
        let r = self.multiply(Vec4Fix::new(v.x, v.y, v.z, Fix64::ZERO));
        Vec3Fix::new(r.x, r.y, r.z)
    }
}

impl Mul for Mat4Fix {
    type Output = Self;

    fn mul(self, b: Self) -> Self {
        let a = self;
        Self::new(
            // Row 0
            a.m00 * b.m00 + a.m01 * b.m10 + a.m02 * b.m20 + a.m03 * b.m30,
            a.m00 * b.m01 + a.m01 * b.m11 + a.m02 * b.m21 + a.m03 * b.m31,
            a.m00 * b.m02 + a.m01 * b.m12 + a.m02 * b.m22 + a.m03 * b.m32,
            a.m00 * b.m03 + a.m01 * b.m13 + a.m02 * b.m23 + a.m03 * b.m33,
            // Row 1
            a.m10 * b.m00 + a.m11 * b.m10 + a.m12 * b.m20 + a.m13 * b.m30,
            a.m10 * b.m01 + a.m11 * b.m11 + a.m12 * b.m21 + a.m13 * b.m31,
            a.m10 * b.m02 + a.m11 * b.m12 + a.m12 * b.m22 + a.m13 * b.m32,
            a.m10 * b.m03 + a.m11 * b.m13 + a.m12 * b.m23 + a.m13 * b.m33,
            // Row 2
            a.m20 * b.m00 + a.m21 * b.m10 + a.m22 * b.m20 + a.m23 * b.m30,
            a.m20 * b.m01 + a.m21 * b.m11 + a.m22 * b.m21 + a.m23 * b.m31,
            a.m20 * b.m02 + a.m21 * b.m12 + a.m22 * b.m22 + a.m23 * b.m32,
            a.m20 * b.m03 + a.m21 * b.m13 + a.m22 * b.m23 + a.m23 * b.m33,
            // Row 3
            a.m30 * b.m00 + a.m31 * b.m10 + a.m32 * b.m20 + a.m33 * b.m30,
            a.m30 * b.m01 + a.m31 * b.m11 + a.m32 * b.m21 + a.m33 * b.m31,
            a.m30 * b.m02 + a.m31 * b.m12 + a.m32 * b.m22 + a.m33 * b.m32,
            a.m30 * b.m03 + a.m31 * b.m13 + a.m32 * b.m23 + a.m33 * b.m33,
        )
    }
}

// ============================================================================
// Tests
// ============================================================================


#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    // Keep operands inside ±2^20 so products stay far from the Q32.32
    // envelope; overflow is documented UB, not something to exercise here.
    fn small_fix() -> impl Strategy<Value = Fix64> {
        (-(1i64 << 52)..(1i64 << 52)).prop_map(Fix64::from_raw)
    }

    proptest! {
        #[test]
        fn add_sub_round_trips(a in small_fix(), b in small_fix()) {
            prop_assert_eq!(a + b - b, a);
        }

        #[test]
        fn mul_by_one_is_identity(a in small_fix()) {
            prop_assert_eq!(a * Fix64::ONE, a);
        }

        #[test]
        fn mul_div_round_trips_within_eps(a in small_fix(), b in small_fix()) {
            // Quotients of a large value by a sub-unit one leave the Q32.32
            // range, so keep |b| ≥ 1.
            prop_assume!(b.abs() >= Fix64::ONE);
            let round_tripped = a / b * b;
            // One ulp of quotient truncation scales by |b| on the way back.
            let bound = (b.abs().raw() >> SHIFT) + 4;
            prop_assert!((round_tripped - a).abs().raw() <= bound);
        }

        #[test]
        fn sqrt_squares_back(a in (0i64..(1i64 << 48)).prop_map(Fix64::from_raw)) {
            let root = a.sqrt();
            let err = (root * root - a).abs();
            prop_assert!(err < Fix64::from_ratio(1, 10_000));
        }
    }
}
