use bytemuck::cast;
use simba::simd::{SimdValue as _, WideBoolF32x8, WideF32x8};
use wide::{f32x8, i32x8};

use super::{Mask8, Mask8Ext as _};

/// 8-lane IEEE-754 single-precision vector, one value per ray of a packet.
pub type Float8 = WideF32x8;

/// Operations on [`Float8`] that simba does not provide.
///
/// Comparisons stay on `simba::simd::SimdPartialOrd` (ordered semantics,
/// NaN lanes compare false); arithmetic stays on the std operators. This
/// trait covers the bit-level and fused operations the traversal and the
/// triangle kernel are written against.
pub trait Float8Ext: Sized {
    fn infinity() -> Self;
    fn neg_infinity() -> Self;
    fn is_nan(self) -> Mask8;

    fn abs(self) -> Self;
    /// +1 where the lane is `>= 0`, -1 otherwise (including NaN lanes).
    fn sign(self) -> Self;
    /// The isolated sign bit of each lane, as a value suitable for [`xor`](Self::xor).
    fn signmask(self) -> Self;
    /// Lanewise bitwise XOR. `a.xor(b.signmask())` flips `a`'s sign where `b` is negative.
    fn xor(self, other: Self) -> Self;

    fn sqrt(self) -> Self;
    /// Lanewise reciprocal, relative error within one ulp.
    fn rcp(self) -> Self;
    fn rsqrt(self) -> Self;

    /// Fused `self * b + c`.
    fn madd(self, b: Self, c: Self) -> Self;
    /// Fused `self * b - c`.
    fn msub(self, b: Self, c: Self) -> Self;
    /// Fused `-(self * b) - c`.
    fn nmadd(self, b: Self, c: Self) -> Self;
    /// Fused `c - self * b`.
    fn nmsub(self, b: Self, c: Self) -> Self;

    /// Lanewise minimum over the 32-bit patterns as signed integers.
    ///
    /// Agrees with the float minimum whenever at least one operand is
    /// non-negative, and orders `-0.0 < +0.0`; between two negative
    /// values the order flips. The slab test clamps against the
    /// non-negative ray interval last, so the flip never changes a hit
    /// verdict there.
    fn mini(self, other: Self) -> Self;
    /// Lanewise maximum counterpart of [`mini`](Self::mini).
    fn maxi(self, other: Self) -> Self;

    fn reduce_min(self) -> f32;
    fn reduce_max(self) -> f32;
    fn reduce_add(self) -> f32;

    /// Index of a lane holding the minimum; ties go to the lowest lane.
    fn select_min(self) -> usize;
    /// Index of a lane holding the maximum; ties go to the lowest lane.
    fn select_max(self) -> usize;
}

impl Float8Ext for Float8 {
    fn infinity() -> Self {
        Self::splat(f32::INFINITY)
    }

    fn neg_infinity() -> Self {
        Self::splat(f32::NEG_INFINITY)
    }

    fn is_nan(self) -> Mask8 {
        WideBoolF32x8(self.0.is_nan())
    }

    fn abs(self) -> Self {
        WideF32x8(self.0.abs())
    }

    fn sign(self) -> Self {
        use simba::simd::SimdPartialOrd as _;
        Self::ONE.select(self.simd_ge(Self::ZERO), -Self::ONE)
    }

    fn signmask(self) -> Self {
        WideF32x8(self.0 & f32x8::splat(-0.0))
    }

    fn xor(self, other: Self) -> Self {
        WideF32x8(self.0 ^ other.0)
    }

    fn sqrt(self) -> Self {
        WideF32x8(self.0.sqrt())
    }

    fn rcp(self) -> Self {
        Self::ONE / self
    }

    fn rsqrt(self) -> Self {
        Self::ONE / self.sqrt()
    }

    fn madd(self, b: Self, c: Self) -> Self {
        WideF32x8(self.0.mul_add(b.0, c.0))
    }

    fn msub(self, b: Self, c: Self) -> Self {
        WideF32x8(self.0.mul_add(b.0, -c.0))
    }

    fn nmadd(self, b: Self, c: Self) -> Self {
        WideF32x8((-self.0).mul_add(b.0, -c.0))
    }

    fn nmsub(self, b: Self, c: Self) -> Self {
        WideF32x8((-self.0).mul_add(b.0, c.0))
    }

    fn mini(self, other: Self) -> Self {
        let a: i32x8 = cast(self.0);
        let b: i32x8 = cast(other.0);
        WideF32x8(cast(a.min(b)))
    }

    fn maxi(self, other: Self) -> Self {
        let a: i32x8 = cast(self.0);
        let b: i32x8 = cast(other.0);
        WideF32x8(cast(a.max(b)))
    }

    fn reduce_min(self) -> f32 {
        self.0
            .as_array_ref()
            .iter()
            .copied()
            .fold(f32::INFINITY, f32::min)
    }

    fn reduce_max(self) -> f32 {
        self.0
            .as_array_ref()
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }

    fn reduce_add(self) -> f32 {
        self.0.as_array_ref().iter().sum()
    }

    fn select_min(self) -> usize {
        use simba::simd::SimdPartialOrd as _;
        let m = self.simd_eq(Self::splat(self.reduce_min()));
        m.movemask().trailing_zeros() as usize
    }

    fn select_max(self) -> usize {
        use simba::simd::SimdPartialOrd as _;
        let m = self.simd_eq(Self::splat(self.reduce_max()));
        m.movemask().trailing_zeros() as usize
    }
}

/// `t` where the mask lane is true, `f` elsewhere.
pub fn select(mask: Mask8, t: Float8, f: Float8) -> Float8 {
    WideF32x8(mask.0.blend(t.0, f.0))
}

/// Like [`select`], with the lane choice fixed at compile time.
pub fn blend_imm<const IMM: u8>(t: Float8, f: Float8) -> Float8 {
    select(Mask8::from_bits(IMM), t, f)
}

/// Overwrites `dst` lanes where the mask is true; other lanes keep their value.
pub fn store_masked(mask: Mask8, dst: &mut Float8, v: Float8) {
    *dst = select(mask, v, *dst);
}

/// Lanewise minimum, no defined NaN ordering.
pub fn fast_min(a: Float8, b: Float8) -> Float8 {
    WideF32x8(a.0.fast_min(b.0))
}

/// Lanewise maximum, no defined NaN ordering.
pub fn fast_max(a: Float8, b: Float8) -> Float8 {
    WideF32x8(a.0.fast_max(b.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;
    use proptest::prelude::Strategy;
    use simba::simd::{SimdPartialOrd as _, SimdValue as _};
    use test_strategy::proptest;

    use crate::simd::Mask8Ext as _;

    fn lanes_strategy() -> impl Strategy<Value = [f32; 8]> {
        proptest::array::uniform8(-1e6f32..1e6f32)
    }

    fn from_lanes(lanes: [f32; 8]) -> Float8 {
        WideF32x8(wide::f32x8::from(lanes))
    }

    #[proptest]
    fn fused_ops_match_unfused(
        #[strategy(lanes_strategy())] a: [f32; 8],
        #[strategy(lanes_strategy())] b: [f32; 8],
        #[strategy(lanes_strategy())] c: [f32; 8],
    ) {
        let (a, b, c) = (from_lanes(a), from_lanes(b), from_lanes(c));
        for (fused, plain) in [
            (a.madd(b, c), a * b + c),
            (a.msub(b, c), a * b - c),
            (a.nmadd(b, c), -(a * b) - c),
            (a.nmsub(b, c), c - a * b),
        ] {
            for i in 0..8 {
                let err = (fused.extract(i) - plain.extract(i)).abs();
                // Fusing only removes the rounding of the product term
                let scale = (a.extract(i) * b.extract(i)).abs() + c.extract(i).abs();
                assert!(err <= scale * 1e-6 + 1e-3);
            }
        }
    }

    #[proptest]
    fn signmask_xor_flips_negative_lanes(
        #[strategy(lanes_strategy())] a: [f32; 8],
        #[strategy(lanes_strategy())] b: [f32; 8],
    ) {
        let (a, b) = (from_lanes(a), from_lanes(b));
        let flipped = a.xor(b.signmask());
        for i in 0..8 {
            let expected = if b.extract(i).is_sign_negative() {
                -a.extract(i)
            } else {
                a.extract(i)
            };
            assert!(flipped.extract(i).to_bits() == expected.to_bits());
        }
    }

    #[test]
    fn sign_of_zero_and_nan() {
        let v = from_lanes([1.0, -1.0, 0.0, -0.0, f32::NAN, 5.0, -5.0, 0.5]);
        let s = v.sign();
        assert!(s.extract(0) == 1.0);
        assert!(s.extract(1) == -1.0);
        assert!(s.extract(2) == 1.0);
        // -0.0 >= 0.0 holds in IEEE compare
        assert!(s.extract(3) == 1.0);
        assert!(s.extract(4) == -1.0);
    }

    #[proptest]
    fn integer_minmax_match_float_when_one_operand_is_nonnegative(
        #[strategy(proptest::array::uniform8(-1e6f32..1e6f32))] a: [f32; 8],
        #[strategy(proptest::array::uniform8(0.0f32..1e6f32))] b: [f32; 8],
    ) {
        let (va, vb) = (from_lanes(a), from_lanes(b));
        let mini = va.mini(vb);
        let maxi = va.maxi(vb);
        for i in 0..8 {
            assert!(mini.extract(i) == a[i].min(b[i]));
            assert!(maxi.extract(i) == a[i].max(b[i]));
        }
    }

    #[test]
    fn integer_minmax_orders_signed_zero() {
        let pz = Float8::splat(0.0);
        let nz = Float8::splat(-0.0);
        assert!(pz.mini(nz).extract(0).is_sign_negative());
        assert!(pz.maxi(nz).extract(0).is_sign_positive());
    }

    #[test]
    fn ordered_compares_reject_nan() {
        let nan = Float8::splat(f32::NAN);
        let one = Float8::ONE;
        assert!(nan.simd_lt(one).movemask() == 0);
        assert!(nan.simd_ge(one).movemask() == 0);
        assert!(nan.simd_eq(nan).movemask() == 0);
        assert!(one.simd_le(one).movemask() == 0xff);
    }

    #[proptest]
    fn rcp_accuracy(#[strategy(proptest::array::uniform8(1e-3f32..1e6f32))] a: [f32; 8]) {
        let v = from_lanes(a);
        let r = v.rcp();
        for i in 0..8 {
            let err = (r.extract(i) * a[i] - 1.0).abs();
            assert!(err <= 2.4e-7, "lane {}: {}", i, err);
        }
    }

    #[test]
    fn reductions() {
        let v = from_lanes([3.0, -1.0, 7.0, 2.0, -1.0, 9.0, 0.0, 4.0]);
        assert!(v.reduce_min() == -1.0);
        assert!(v.reduce_max() == 9.0);
        assert!(v.reduce_add() == 23.0);
    }

    #[test]
    fn select_extrema_tie_goes_to_lowest_lane() {
        let v = from_lanes([3.0, -1.0, 7.0, 2.0, -1.0, 7.0, 0.0, 4.0]);
        assert!(v.select_min() == 1);
        assert!(v.select_max() == 2);
    }

    #[proptest]
    fn masked_store_only_touches_selected_lanes(
        #[strategy(lanes_strategy())] dst: [f32; 8],
        #[strategy(lanes_strategy())] v: [f32; 8],
        bits: u8,
    ) {
        let mut out = from_lanes(dst);
        store_masked(Mask8::from_bits(bits), &mut out, from_lanes(v));
        for i in 0..8 {
            let expected = if bits & (1 << i) != 0 { v[i] } else { dst[i] };
            assert!(out.extract(i) == expected);
        }
    }

    #[test]
    fn blend_imm_picks_constant_lanes() {
        let t = Float8::ONE;
        let f = Float8::ZERO;
        let r = blend_imm::<0b1010_1010>(t, f);
        for i in 0..8 {
            assert!(r.extract(i) == if i % 2 == 1 { 1.0 } else { 0.0 });
        }
    }
}
