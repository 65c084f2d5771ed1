use nalgebra::Vector3;
use simba::simd::{SimdValue as _, WideF32x4};
use wide::f32x4;

use crate::simd::Float8;
use crate::vec3::Vec3x8;

/// `geom_ids` value marking an unused slot of a [`Triangle4`].
pub const INVALID_GEOM_ID: u32 = !0;

/// High bit of the stored ids; in list mode it flags the last primitive
/// of a leaf list and is stripped by the accessors.
const LIST_FLAG: u32 = 1 << 31;

/// One input triangle for [`Triangle4::from_triangles`].
#[derive(Clone, Copy, Debug)]
pub struct TriangleDef {
    pub v0: Vector3<f32>,
    pub v1: Vector3<f32>,
    pub v2: Vector3<f32>,
    pub geom_id: u32,
    pub prim_id: u32,
    pub mask: i32,
}

impl TriangleDef {
    pub fn new(
        v0: Vector3<f32>,
        v1: Vector3<f32>,
        v2: Vector3<f32>,
        geom_id: u32,
        prim_id: u32,
    ) -> TriangleDef {
        TriangleDef {
            v0,
            v1,
            v2,
            geom_id,
            prim_id,
            mask: !0,
        }
    }
}

/// Block of four triangles in struct-of-arrays form: base vertex, the
/// edge vectors `e1 = v0 - v1` and `e2 = v2 - v0`, and the precomputed
/// normal `ng = e1 x e2`, each as a 4-lane vector.
///
/// The edge orientation is what lets the intersector fold the
/// determinant sign into `ng` and `e1`; hits on this triangle record
/// `ng`, which for counterclockwise winding points against the winding
/// normal.
///
/// Slots are filled front to back; the first slot with an invalid
/// `geom_id` ends the block.
#[derive(Clone, Copy, Debug)]
pub struct Triangle4 {
    pub v0: Vector3<WideF32x4>,
    pub e1: Vector3<WideF32x4>,
    pub e2: Vector3<WideF32x4>,
    pub ng: Vector3<WideF32x4>,
    geom_ids: [u32; 4],
    prim_ids: [u32; 4],
    masks: [i32; 4],
}

impl Triangle4 {
    /// Packs up to four triangles into one block; remaining slots stay
    /// invalid.
    pub fn from_triangles(triangles: &[TriangleDef]) -> Triangle4 {
        assert2::assert!(triangles.len() <= 4);

        let component = |f: &dyn Fn(&TriangleDef) -> f32| {
            WideF32x4(f32x4::from(core::array::from_fn(|i| {
                triangles.get(i).map_or(0.0, f)
            })))
        };
        let v0 = Vector3::new(
            component(&|t| t.v0.x),
            component(&|t| t.v0.y),
            component(&|t| t.v0.z),
        );
        let e1 = Vector3::new(
            component(&|t| t.v0.x - t.v1.x),
            component(&|t| t.v0.y - t.v1.y),
            component(&|t| t.v0.z - t.v1.z),
        );
        let e2 = Vector3::new(
            component(&|t| t.v2.x - t.v0.x),
            component(&|t| t.v2.y - t.v0.y),
            component(&|t| t.v2.z - t.v0.z),
        );
        let ng = e1.cross(&e2);

        Triangle4 {
            v0,
            e1,
            e2,
            ng,
            geom_ids: core::array::from_fn(|i| {
                triangles.get(i).map_or(INVALID_GEOM_ID, |t| t.geom_id)
            }),
            prim_ids: core::array::from_fn(|i| {
                triangles.get(i).map_or(INVALID_GEOM_ID, |t| t.prim_id)
            }),
            masks: core::array::from_fn(|i| triangles.get(i).map_or(0, |t| t.mask)),
        }
    }

    /// True while slot `i` holds a triangle.
    pub fn valid(&self, i: usize) -> bool {
        assert2::debug_assert!(i < 4);
        self.geom_ids[i] != INVALID_GEOM_ID
    }

    /// Number of filled slots.
    pub fn len(&self) -> usize {
        (0..4).take_while(|&i| self.valid(i)).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.valid(0)
    }

    pub fn geom_id<const LIST: bool>(&self, i: usize) -> u32 {
        if LIST {
            self.geom_ids[i] & !LIST_FLAG
        } else {
            self.geom_ids[i]
        }
    }

    pub fn prim_id<const LIST: bool>(&self, i: usize) -> u32 {
        if LIST {
            self.prim_ids[i] & !LIST_FLAG
        } else {
            self.prim_ids[i]
        }
    }

    pub fn mask(&self, i: usize) -> i32 {
        self.masks[i]
    }
}

/// Broadcasts lane `i` of a 4-lane vector to all eight packet lanes.
pub fn broadcast8(v: &Vector3<WideF32x4>, i: usize) -> Vec3x8 {
    Vec3x8::new(
        Float8::splat(v.x.extract(i)),
        Float8::splat(v.y.extract(i)),
        Float8::splat(v.z.extract(i)),
    )
}
