use bytemuck::cast;
use nalgebra::Vector3;
use simba::simd::{SimdValue as _, WideBoolF32x8};
use wide::{f32x8, CmpEq as _};

use crate::simd::{Float8, Int8, Mask8};
use crate::vec3::{self, Vec3x8};

/// `geomID`/`primID` lane value meaning "no hit recorded".
pub const INVALID_ID: i32 = -1;

/// Eight rays in struct-of-arrays layout, together with their hit fields.
///
/// `tfar` is both an input (far clip) and an output: every recorded hit
/// shrinks it toward the nearest intersection. A lane has a hit iff its
/// `geom_id` differs from [`INVALID_ID`]; `u`/`v` are then the
/// barycentric coordinates of the hit and `ng` the unnormalized
/// geometric normal of the hit primitive.
#[derive(Clone, Copy, Debug)]
pub struct Ray8 {
    pub org: Vec3x8,
    pub dir: Vec3x8,
    pub tnear: Float8,
    pub tfar: Float8,
    pub time: Float8,
    pub mask: Int8,

    pub u: Float8,
    pub v: Float8,
    pub ng: Vec3x8,
    pub geom_id: Int8,
    pub prim_id: Int8,
}

impl Ray8 {
    pub fn new(org: Vec3x8, dir: Vec3x8, tnear: Float8, tfar: Float8) -> Ray8 {
        Ray8 {
            org,
            dir,
            tnear,
            tfar,
            time: Float8::ZERO,
            mask: Int8::splat(!0),
            u: Float8::ZERO,
            v: Float8::ZERO,
            ng: Vec3x8::zeros(),
            geom_id: Int8::splat(INVALID_ID),
            prim_id: Int8::splat(INVALID_ID),
        }
    }

    /// One ray replicated across all eight lanes.
    pub fn broadcast(org: &Vector3<f32>, dir: &Vector3<f32>, tnear: f32, tfar: f32) -> Ray8 {
        Ray8::new(
            vec3::broadcast(org),
            vec3::broadcast(dir),
            Float8::splat(tnear),
            Float8::splat(tfar),
        )
    }

    /// Eight independent rays sharing one ray interval.
    pub fn from_lanes(
        orgs: &[Vector3<f32>; 8],
        dirs: &[Vector3<f32>; 8],
        tnear: f32,
        tfar: f32,
    ) -> Ray8 {
        Ray8::new(
            vec3::from_lanes(orgs),
            vec3::from_lanes(dirs),
            Float8::splat(tnear),
            Float8::splat(tfar),
        )
    }

    /// Lanes that have recorded a hit.
    pub fn hit_mask(&self) -> Mask8 {
        let miss: f32x8 = cast(self.geom_id.cmp_eq(Int8::splat(INVALID_ID)));
        WideBoolF32x8(!miss)
    }

    /// Value of `tfar` in one lane.
    pub fn tfar_lane(&self, i: usize) -> f32 {
        self.tfar.extract(i)
    }
}
