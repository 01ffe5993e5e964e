//! Fixed-point superaccumulator for order-independent summation.
//!
//! Every finite `f64` is an integer multiple of 2⁻¹⁰⁷⁴, so a long enough
//! fixed-point register represents any partial sum of doubles *exactly*. The
//! register is stored as [`LIMBS`] signed 64-bit limbs of 32 significant bits
//! each; the upper 31 bits of every limb are carry headroom, which lets us add
//! values without propagating carries until [`Superaccumulator::normalize`].
//!
//! Because the stored value is an exact integer, merging two accumulators is plain
//! limb-wise integer addition, which is associative and commutative. The final
//! [`Superaccumulator::round`] performs the single rounding to nearest-even, so the
//! result depends only on the multiset of inputs, never on their order or on how
//! they were partitioned across threads or processes.
//!
//! Products are fed in through [`Superaccumulator::add_product`], which uses an
//! FMA two-product to split `a * b` into the rounded product and its exact
//! rounding error.
//!
//! # References
//! - Collange, Defour, Graillat, Iakymchuk (2015). Numerical reproducibility for the
//!   parallel reduction on multi- and many-core architectures. Parallel Computing 49.
//! - Kulisch, U. (2013). Computer Arithmetic and Validity. de Gruyter.

use crate::core::traits::Real;

/// Number of limbs in the register.
pub const LIMBS: usize = 68;
/// Length of the integer image used for distributed merges: the limbs plus
/// three counters of non-finite contributions.
pub const WORDS: usize = LIMBS + 3;
/// Significant bits per limb.
const DIGITS: u32 = 32;
/// Binary exponent of the least significant bit of limb 0.
const MIN_EXP: i64 = -1088;
/// Adds allowed between normalizations before a limb could overflow.
const NORMALIZE_EVERY: u32 = 1 << 29;
const LIMB_MASK: u64 = (1 << DIGITS) - 1;

/// Exact accumulator for sums of `f64` values and products.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Superaccumulator {
    limbs: [i64; LIMBS],
    pending: u32,
    /// Sum of non-finite contributions (inf/NaN), kept outside the fixed-point range.
    special: SpecialSum,
}

/// Tracks inf/NaN contributions in an order-independent way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
struct SpecialSum {
    pos_inf: bool,
    neg_inf: bool,
    nan: bool,
}

impl SpecialSum {
    fn add(&mut self, x: f64) {
        if x.is_nan() {
            self.nan = true;
        } else if x > 0.0 {
            self.pos_inf = true;
        } else {
            self.neg_inf = true;
        }
    }

    fn merge(self, other: Self) -> Self {
        SpecialSum {
            pos_inf: self.pos_inf || other.pos_inf,
            neg_inf: self.neg_inf || other.neg_inf,
            nan: self.nan || other.nan,
        }
    }

    fn value(self) -> Option<f64> {
        match (self.nan || (self.pos_inf && self.neg_inf), self.pos_inf, self.neg_inf) {
            (true, _, _) => Some(f64::NAN),
            (false, true, _) => Some(f64::INFINITY),
            (false, _, true) => Some(f64::NEG_INFINITY),
            _ => None,
        }
    }

    fn encode(self) -> [i64; 3] {
        [self.pos_inf as i64, self.neg_inf as i64, self.nan as i64]
    }

    fn decode(counts: &[i64]) -> Self {
        SpecialSum {
            pos_inf: counts[0] > 0,
            neg_inf: counts[1] > 0,
            nan: counts[2] > 0,
        }
    }
}

impl Default for Superaccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Superaccumulator {
    /// Empty accumulator (value zero).
    pub fn new() -> Self {
        Self {
            limbs: [0; LIMBS],
            pending: 0,
            special: SpecialSum::default(),
        }
    }

    /// Add one double exactly.
    pub fn add(&mut self, x: f64) {
        if x == 0.0 {
            return;
        }
        if !x.is_finite() {
            self.special.add(x);
            return;
        }
        if self.pending >= NORMALIZE_EVERY {
            self.normalize();
        }
        self.pending += 1;

        let bits = x.to_bits();
        let biased = ((bits >> 52) & 0x7ff) as i64;
        let frac = bits & ((1u64 << 52) - 1);
        let (mantissa, exp) = if biased == 0 {
            (frac, -1074)
        } else {
            (frac | (1u64 << 52), biased - 1075)
        };
        let shift = (exp - MIN_EXP) as u32;
        let k = (shift / DIGITS) as usize;
        let wide = (mantissa as u128) << (shift % DIGITS);
        let sign = if x < 0.0 { -1 } else { 1 };
        for (j, limb) in self.limbs[k..k + 3].iter_mut().enumerate() {
            let chunk = ((wide >> (DIGITS as usize * j)) as u64 & LIMB_MASK) as i64;
            *limb += sign * chunk;
        }
    }

    /// Add `a * b` exactly (rounded product plus its rounding error).
    pub fn add_product<T: Real>(&mut self, a: T, b: T) {
        let (p, e) = T::two_product(a, b);
        if !p.is_finite() {
            self.special.add(p);
            return;
        }
        self.add(p);
        self.add(e);
    }

    /// Contribution of one element of a weighted inner product `x * w * y`.
    ///
    /// The weighting is applied first in the working precision, so the
    /// per-element contribution is fixed regardless of traversal order.
    pub fn add_weighted<T: Real>(&mut self, x: T, w: T, y: T) {
        self.add_product(x * w, y);
    }

    /// Propagate carries so that limbs `0..LIMBS-1` lie in `[0, 2^32)`.
    pub fn normalize(&mut self) {
        for k in 0..LIMBS - 1 {
            let carry = self.limbs[k] >> DIGITS;
            self.limbs[k] -= carry << DIGITS;
            self.limbs[k + 1] += carry;
        }
        self.pending = 0;
    }

    /// Normalize-then-add merge of two partial accumulators.
    pub fn merge(mut self, mut other: Self) -> Self {
        self.normalize();
        other.normalize();
        for (a, b) in self.limbs.iter_mut().zip(other.limbs.iter()) {
            *a += *b;
        }
        self.pending = 1;
        self.special = self.special.merge(other.special);
        self
    }

    /// Normalized limbs followed by the non-finite counters, suitable for a
    /// word-wise integer sum all-reduce.
    pub fn to_words(&self) -> [i64; WORDS] {
        let mut acc = self.clone();
        acc.normalize();
        let mut words = [0i64; WORDS];
        words[..LIMBS].copy_from_slice(&acc.limbs);
        words[LIMBS..].copy_from_slice(&acc.special.encode());
        words
    }

    /// Rebuild an accumulator from words summed over any number of participants.
    pub fn from_words(words: &[i64; WORDS]) -> Self {
        let mut limbs = [0i64; LIMBS];
        limbs.copy_from_slice(&words[..LIMBS]);
        Self {
            limbs,
            pending: 1,
            special: SpecialSum::decode(&words[LIMBS..]),
        }
    }

    /// Round the exact value to the nearest double (ties to even).
    pub fn round(&self) -> f64 {
        if let Some(v) = self.special.value() {
            return v;
        }
        let mut acc = self.clone();
        acc.normalize();
        let negative = acc.limbs[LIMBS - 1] < 0;
        if negative {
            for limb in acc.limbs.iter_mut() {
                *limb = -*limb;
            }
            acc.normalize();
        }
        let magnitude = round_magnitude(&acc.limbs);
        if negative { -magnitude } else { magnitude }
    }
}

/// Round a normalized, non-negative register to `f64`.
fn round_magnitude(limbs: &[i64; LIMBS]) -> f64 {
    if limbs[LIMBS - 1] != 0 {
        return f64::INFINITY;
    }
    let Some(h) = limbs.iter().rposition(|&l| l != 0) else {
        return 0.0;
    };
    let limb = |k: isize| -> u128 {
        if k < 0 { 0 } else { limbs[k as usize] as u128 }
    };
    let h = h as isize;
    let window = limb(h) << 96 | limb(h - 1) << 64 | limb(h - 2) << 32 | limb(h - 3);
    let sticky = h >= 4 && limbs[..(h - 3) as usize].iter().any(|&l| l != 0);
    let window_exp = DIGITS as i64 * (h as i64 - 3) + MIN_EXP;
    let msb = window_exp + 127 - window.leading_zeros() as i64;
    if msb >= 1024 {
        return f64::INFINITY;
    }
    let ulp = (msb - 52).max(-1074);
    let s = (ulp - window_exp) as u32;
    let mut mantissa = window >> s;
    let rem = window & ((1u128 << s) - 1);
    let half = 1u128 << (s - 1);
    if rem > half || (rem == half && (sticky || mantissa & 1 == 1)) {
        mantissa += 1;
    }
    ldexp(mantissa as f64, ulp)
}

fn pow2(e: i64) -> f64 {
    debug_assert!((-1022..=1023).contains(&e));
    f64::from_bits(((e + 1023) as u64) << 52)
}

/// `m * 2^e` without intermediate overflow/underflow for exactly representable results.
fn ldexp(mut m: f64, mut e: i64) -> f64 {
    while e > 1000 {
        m *= pow2(1000);
        e -= 1000;
    }
    while e < -1000 {
        m *= pow2(-1000);
        e += 1000;
    }
    m * pow2(e)
}
