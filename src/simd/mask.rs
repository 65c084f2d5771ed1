use simba::simd::WideBoolF32x8;
use wide::f32x8;

/// 8-lane boolean mask. One lane per ray of a packet.
///
/// The representation is the float-vector mask simba uses (every lane is
/// either all-zero or all-one bits), so it can be fed straight into
/// `blend` and bitwise ops on `wide::f32x8` without conversion.
pub type Mask8 = WideBoolF32x8;

const ALL_BITS: f32 = f32::from_bits(!0u32);

/// Operations on [`Mask8`] that simba does not provide.
pub trait Mask8Ext: Sized {
    /// Builds a mask from an 8-bit integer; bit `i` becomes lane `i`.
    fn from_bits(bits: u8) -> Self;

    /// The inverse of [`from_bits`](Self::from_bits): bit `i` is lane `i`.
    fn movemask(self) -> u8;

    /// Number of true lanes.
    fn popcount(self) -> u32;

    /// Value of a single lane.
    fn lane(self, i: usize) -> bool;

    /// Lanewise equality; the complement of [`ne_lanes`](Self::ne_lanes).
    fn eq_lanes(self, other: Self) -> Self;

    /// Lanewise inequality (XOR).
    fn ne_lanes(self, other: Self) -> Self;
}

impl Mask8Ext for Mask8 {
    fn from_bits(bits: u8) -> Self {
        let lanes = core::array::from_fn(|i| {
            if bits & (1 << i) != 0 { ALL_BITS } else { 0.0 }
        });
        WideBoolF32x8(f32x8::from(lanes))
    }

    fn movemask(self) -> u8 {
        self.0.move_mask() as u8
    }

    fn popcount(self) -> u32 {
        self.movemask().count_ones()
    }

    fn lane(self, i: usize) -> bool {
        assert2::debug_assert!(i < 8);
        (self.movemask() >> i) & 1 != 0
    }

    fn eq_lanes(self, other: Self) -> Self {
        !(self ^ other)
    }

    fn ne_lanes(self, other: Self) -> Self {
        self ^ other
    }
}
