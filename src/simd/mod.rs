//! Packet SIMD layer: 8-lane mask, float, and integer vectors.
//!
//! The float and mask types are simba's `wide`-backed wrappers so they
//! compose with nalgebra; everything simba does not expose (integer
//! lanes, movemask, blends, fused ops, sign-bit tricks) goes through
//! `wide` directly.

mod float;
mod int;
mod mask;

pub use float::{blend_imm, fast_max, fast_min, select, store_masked, Float8, Float8Ext};
pub use int::{nonzero_i32, select_i32, store_masked_i32, Int8};
pub use mask::{Mask8, Mask8Ext};

use wide::f32x4;

/// Transposes four 4-lane rows into four 4-lane columns.
///
/// Column `i` gathers lane `i` of every row; this turns the per-axis
/// slab layout of an inner node into per-child bound vectors.
pub fn transpose4(rows: [f32x4; 4]) -> [f32x4; 4] {
    let r: [[f32; 4]; 4] = [
        *rows[0].as_array_ref(),
        *rows[1].as_array_ref(),
        *rows[2].as_array_ref(),
        *rows[3].as_array_ref(),
    ];
    core::array::from_fn(|i| f32x4::from([r[0][i], r[1][i], r[2][i], r[3][i]]))
}
