//! 16.16 fixed-point math and lookup-table trigonometry.
//!
//! Every position, velocity and trigonometric result in the simulation goes
//! through this module. The tables are generated at compile time, so two runs
//! with the same input produce bit-identical results on every platform.

use core::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Number of fractional bits.
pub const FRAC_BITS: u32 = 16;

/// Entries in the sine/cosine tables (a full turn).
pub const TRIG_TABLE_SIZE: usize = 512;

/// Scale of the sine/cosine table values (512 = 1.0).
pub const TRIG_SCALE: i32 = 512;

/// Signed 16.16 fixed-point number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Fixed(pub i32);

impl Fixed {
    pub const ZERO: Fixed = Fixed(0);
    pub const ONE: Fixed = Fixed(1 << FRAC_BITS);
    /// Largest whole-pixel magnitude `from_int` keeps intact.
    pub const MAX_INT: i32 = i16::MAX as i32;

    /// Whole pixels to fixed point.
    #[inline]
    pub const fn from_int(n: i32) -> Self {
        Fixed(n << FRAC_BITS)
    }

    /// Whole pixels to fixed point, `None` when `|n| > MAX_INT`.
    #[inline]
    pub const fn checked_from_int(n: i32) -> Option<Self> {
        if n.unsigned_abs() > Self::MAX_INT as u32 {
            None
        } else {
            Some(Self::from_int(n))
        }
    }

    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Fixed(raw)
    }

    #[inline]
    pub const fn raw(self) -> i32 {
        self.0
    }

    /// Floors to whole pixels.
    #[inline]
    pub const fn to_int(self) -> i32 {
        self.0 >> FRAC_BITS
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn signum(self) -> i32 {
        self.0.signum()
    }

    #[inline]
    pub const fn abs(self) -> Self {
        Fixed(self.0.wrapping_abs())
    }

    /// Fixed-point multiply, truncating toward negative infinity.
    #[inline]
    pub const fn mul(self, rhs: Fixed) -> Fixed {
        Fixed(fix_mul(self.0, rhs.0))
    }

    /// Fixed-point divide, `None` on a zero divisor.
    #[inline]
    pub const fn checked_div(self, rhs: Fixed) -> Option<Fixed> {
        match fix_div(self.0, rhs.0) {
            Some(v) => Some(Fixed(v)),
            None => None,
        }
    }
}

impl Add for Fixed {
    type Output = Self;
    #[inline]
    fn add(self, other: Self) -> Self {
        Fixed(self.0.wrapping_add(other.0))
    }
}

impl AddAssign for Fixed {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.wrapping_add(other.0);
    }
}

impl Sub for Fixed {
    type Output = Self;
    #[inline]
    fn sub(self, other: Self) -> Self {
        Fixed(self.0.wrapping_sub(other.0))
    }
}

impl SubAssign for Fixed {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.wrapping_sub(other.0);
    }
}

impl Neg for Fixed {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Fixed(self.0.wrapping_neg())
    }
}

/// Multiplies two raw 16.16 values.
#[inline]
pub const fn fix_mul(a: i32, b: i32) -> i32 {
    ((a as i64 * b as i64) >> FRAC_BITS) as i32
}

/// Divides two raw 16.16 values, `None` when `b` is zero.
#[inline]
pub const fn fix_div(a: i32, b: i32) -> Option<i32> {
    if b == 0 {
        return None;
    }
    Some((((a as i64) << FRAC_BITS) / b as i64) as i32)
}

// =============================================================================
// Lookup tables
// =============================================================================

const PI: f64 = 3.14159265358979323846;

/// Sine table, index 0..512 covers a full turn, values scaled by 512.
pub static SIN_TABLE: [i32; TRIG_TABLE_SIZE] = generate_sin_table();

/// Cosine table, same layout as [`SIN_TABLE`].
pub static COS_TABLE: [i32; TRIG_TABLE_SIZE] = generate_cos_table();

/// First-octant arctangent: ratio `i / 256` to an angle in 256ths of a turn (0..=32).
static ATAN_TABLE: [u8; 257] = generate_atan_table();

const fn generate_sin_table() -> [i32; TRIG_TABLE_SIZE] {
    let mut table = [0i32; TRIG_TABLE_SIZE];
    let mut i = 0;
    while i < TRIG_TABLE_SIZE {
        let angle = (i as f64) * 2.0 * PI / (TRIG_TABLE_SIZE as f64);
        table[i] = round_to_int(taylor_sin(normalize_angle(angle)) * TRIG_SCALE as f64);
        i += 1;
    }
    table
}

const fn generate_cos_table() -> [i32; TRIG_TABLE_SIZE] {
    let mut table = [0i32; TRIG_TABLE_SIZE];
    let mut i = 0;
    while i < TRIG_TABLE_SIZE {
        let angle = (i as f64) * 2.0 * PI / (TRIG_TABLE_SIZE as f64);
        table[i] = round_to_int(taylor_cos(normalize_angle(angle)) * TRIG_SCALE as f64);
        i += 1;
    }
    table
}

const fn generate_atan_table() -> [u8; 257] {
    let mut table = [0u8; 257];
    let mut i = 0;
    while i <= 256 {
        let ratio = i as f64 / 256.0;
        let turns = series_atan(ratio) * 128.0 / PI;
        table[i] = (turns + 0.5) as u8;
        i += 1;
    }
    table
}

/// Rounds half away from zero.
const fn round_to_int(value: f64) -> i32 {
    if value >= 0.0 {
        (value + 0.5) as i32
    } else {
        (value - 0.5) as i32
    }
}

/// Normalizes to [-π, π] so the Taylor series converges quickly.
const fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle;
    while a > PI {
        a -= 2.0 * PI;
    }
    while a < -PI {
        a += 2.0 * PI;
    }
    a
}

const fn taylor_sin(x: f64) -> f64 {
    let x2 = x * x;
    let mut term = x;
    let mut sum = x;
    let mut n = 1;
    while n < 12 {
        term = -term * x2 / ((2 * n) as f64 * (2 * n + 1) as f64);
        sum += term;
        n += 1;
    }
    sum
}

const fn taylor_cos(x: f64) -> f64 {
    let x2 = x * x;
    let mut term = 1.0;
    let mut sum = 1.0;
    let mut n = 1;
    while n < 12 {
        term = -term * x2 / ((2 * n - 1) as f64 * (2 * n) as f64);
        sum += term;
        n += 1;
    }
    sum
}

const fn const_sqrt(value: f64) -> f64 {
    if value <= 0.0 {
        return 0.0;
    }
    let mut guess = if value > 1.0 { value } else { 1.0 };
    let mut i = 0;
    while i < 32 {
        guess = (guess + value / guess) * 0.5;
        i += 1;
    }
    guess
}

/// Arctangent for `x` in [0, 1] using one half-angle reduction and a series.
const fn series_atan(x: f64) -> f64 {
    let reduced = x / (1.0 + const_sqrt(1.0 + x * x));
    let r2 = reduced * reduced;
    let mut power = reduced;
    let mut sum = 0.0;
    let mut n = 0;
    while n < 24 {
        let term = power / (2 * n + 1) as f64;
        if n % 2 == 0 {
            sum += term;
        } else {
            sum -= term;
        }
        power *= r2;
        n += 1;
    }
    2.0 * sum
}

/// Sine of `angle` (512 per turn), scaled by 512.
#[inline]
pub fn sin512(angle: i32) -> i32 {
    SIN_TABLE[(angle & 0x1FF) as usize]
}

/// Cosine of `angle` (512 per turn), scaled by 512.
#[inline]
pub fn cos512(angle: i32) -> i32 {
    COS_TABLE[(angle & 0x1FF) as usize]
}

/// Angle of the vector `(x, y)` in 256ths of a turn, `y` pointing down.
///
/// `(1, 0)` is 0, `(0, 1)` is 64, `(-1, 0)` is 128, `(0, -1)` is 192.
/// The zero vector maps to 0.
pub fn atan2(x: i32, y: i32) -> u8 {
    if x == 0 && y == 0 {
        return 0;
    }
    let ax = x.unsigned_abs() as u64;
    let ay = y.unsigned_abs() as u64;
    let base = if ay <= ax {
        ATAN_TABLE[(ay * 256 / ax) as usize] as i32
    } else {
        64 - ATAN_TABLE[(ax * 256 / ay) as usize] as i32
    };
    let angle = match (x >= 0, y >= 0) {
        (true, true) => base,
        (false, true) => 128 - base,
        (false, false) => 128 + base,
        (true, false) => 256 - base,
    };
    (angle & 0xFF) as u8
}
