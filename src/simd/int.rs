use bytemuck::cast;
use simba::simd::WideBoolF32x8;
use wide::{f32x8, i32x8, CmpEq as _};

use super::Mask8;

/// 8-lane 32-bit integer vector, used for the `geomID`/`primID` hit lanes
/// and for ray masks.
///
/// simba has no integer vector wrapper, so this side of the packet layer
/// uses `wide` directly.
pub type Int8 = i32x8;

/// `t` where the mask lane is true, `f` elsewhere.
pub fn select_i32(mask: Mask8, t: Int8, f: Int8) -> Int8 {
    let mask: Int8 = cast(mask.0);
    mask.blend(t, f)
}

/// Overwrites `dst` lanes where the mask is true; other lanes keep their value.
pub fn store_masked_i32(mask: Mask8, dst: &mut Int8, v: Int8) {
    *dst = select_i32(mask, v, *dst);
}

/// Lanes where `v` is nonzero, as a float-representation mask.
pub fn nonzero_i32(v: Int8) -> Mask8 {
    let zero: f32x8 = cast(v.cmp_eq(Int8::ZERO));
    WideBoolF32x8(!zero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;
    use test_strategy::proptest;

    use crate::simd::Mask8Ext as _;

    #[proptest]
    fn masked_store_only_touches_selected_lanes(
        dst: [i32; 8],
        v: [i32; 8],
        bits: u8,
    ) {
        let mut out = Int8::from(dst);
        store_masked_i32(Mask8::from_bits(bits), &mut out, Int8::from(v));
        for i in 0..8 {
            let expected = if bits & (1 << i) != 0 { v[i] } else { dst[i] };
            assert!(out.as_array_ref()[i] == expected);
        }
    }

    #[test]
    fn nonzero_lanes() {
        let v = Int8::from([0, 1, -1, 0, i32::MAX, i32::MIN, 0, 7]);
        assert!(nonzero_i32(v).movemask() == 0b1011_0110);
    }
}
