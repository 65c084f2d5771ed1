use nalgebra::Vector3;
use simba::simd::{SimdPartialOrd as _, SimdValue as _, WideF32x8};

use crate::simd::{select, Float8, Float8Ext as _};

/// Struct-of-arrays three-vector over eight lanes.
pub type Vec3x8 = Vector3<Float8>;

/// Inputs below this magnitude are clamped by [`rcp_safe`].
const MIN_RCP_INPUT: f32 = 1e-18;

/// Broadcasts one scalar vector to all eight lanes.
pub fn broadcast(v: &Vector3<f32>) -> Vec3x8 {
    Vec3x8::new(
        Float8::splat(v.x),
        Float8::splat(v.y),
        Float8::splat(v.z),
    )
}

/// Gathers eight scalar vectors into one packet, one per lane.
pub fn from_lanes(vs: &[Vector3<f32>; 8]) -> Vec3x8 {
    let component = |f: fn(&Vector3<f32>) -> f32| {
        WideF32x8(wide::f32x8::from(core::array::from_fn(|i| f(&vs[i]))))
    };
    Vec3x8::new(component(|v| v.x), component(|v| v.y), component(|v| v.z))
}

/// Dot product accumulated through fused multiply-adds, x lane first.
pub fn fma_dot(a: &Vec3x8, b: &Vec3x8) -> Float8 {
    a.x.madd(b.x, a.y.madd(b.y, a.z * b.z))
}

/// Componentwise reciprocal that never yields NaN or infinity.
///
/// Components of magnitude below `MIN_RCP_INPUT` are clamped to
/// `±MIN_RCP_INPUT` before the division, so a ray running parallel to a
/// slab produces a large finite clip distance instead of 0 times infinity downstream.
pub fn rcp_safe(v: &Vec3x8) -> Vec3x8 {
    v.map(rcp_safe_component)
}

fn rcp_safe_component(x: Float8) -> Float8 {
    let tiny = Float8::splat(MIN_RCP_INPUT).xor(x.signmask());
    let clamped = select(x.abs().simd_lt(Float8::splat(MIN_RCP_INPUT)), tiny, x);
    clamped.rcp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;
    use proptest::prelude::Strategy;
    use simba::simd::SimdValue as _;
    use test_strategy::proptest;

    fn component_strategy() -> impl Strategy<Value = [f32; 3]> {
        proptest::array::uniform3(-1e3f32..1e3f32)
    }

    #[proptest]
    fn fma_dot_matches_scalar_dot(
        #[strategy(component_strategy())] a: [f32; 3],
        #[strategy(component_strategy())] b: [f32; 3],
    ) {
        let va = broadcast(&Vector3::from(a));
        let vb = broadcast(&Vector3::from(b));
        let expected = Vector3::from(a).dot(&Vector3::from(b));
        let actual = fma_dot(&va, &vb).extract(0);
        let difference = (expected - actual).abs();
        assert!(difference < 1e-3 || difference < expected.abs() * 1e-3);
    }

    #[proptest]
    fn cross_matches_scalar_cross(
        #[strategy(component_strategy())] a: [f32; 3],
        #[strategy(component_strategy())] b: [f32; 3],
    ) {
        let simd = broadcast(&Vector3::from(a)).cross(&broadcast(&Vector3::from(b)));
        let scalar = Vector3::from(a).cross(&Vector3::from(b));
        for (lane, expected) in [simd.x, simd.y, simd.z].iter().zip(scalar.iter()) {
            let difference = (lane.extract(0) - expected).abs();
            assert!(difference < 1e-2 || difference < expected.abs() * 1e-3);
        }
    }

    #[test]
    fn rcp_safe_is_finite_for_degenerate_components() {
        let v = Vec3x8::new(
            Float8::splat(0.0),
            Float8::splat(-0.0),
            Float8::splat(f32::MIN_POSITIVE / 4.0),
        );
        let r = rcp_safe(&v);
        assert!(r.x.extract(0) == 1.0 / MIN_RCP_INPUT);
        assert!(r.y.extract(0) == -1.0 / MIN_RCP_INPUT);
        assert!(r.z.extract(0).is_finite());
        assert!(r.z.extract(0) > 0.0);
    }

    #[proptest]
    fn rcp_safe_matches_plain_reciprocal_away_from_zero(
        #[strategy(1e-3f32..1e6f32)] x: f32,
    ) {
        let v = Vec3x8::new(Float8::splat(x), Float8::splat(-x), Float8::splat(x));
        let r = rcp_safe(&v);
        assert!((r.x.extract(0) * x - 1.0).abs() < 1e-5);
        assert!((r.y.extract(0) * -x - 1.0).abs() < 1e-5);
    }
}
