use nalgebra::Vector3;
use simba::simd::SimdPartialOrd as _;
use simba::simd::SimdValue as _;
use wide::f32x4;

use crate::simd::{fast_max, fast_min, transpose4, Float8, Float8Ext as _, Mask8};
use crate::vec3::Vec3x8;

use super::{Aabb, NodeRef, N};

/// Two-ulp widening factors of the robust slab compare.
const ROUND_DOWN: f32 = 1.0 - 2.0 * f32::EPSILON;
const ROUND_UP: f32 = 1.0 + 2.0 * f32::EPSILON;

/// Inner node: the bounds of all four children as one slab per axis and
/// side, plus the four child references.
///
/// Children are left-packed; the first [`NodeRef::EMPTY`] terminates the
/// list and every later slot is empty too. Empty slots keep inverted
/// bounds (`+inf`/`-inf`) so they fall out of every reduction.
#[derive(Clone, Copy, Debug)]
pub struct Node {
    pub lower_x: f32x4,
    pub upper_x: f32x4,
    pub lower_y: f32x4,
    pub upper_y: f32x4,
    pub lower_z: f32x4,
    pub upper_z: f32x4,
    pub children: [NodeRef; N],
}

impl Node {
    pub fn empty() -> Node {
        Node {
            lower_x: f32x4::splat(f32::INFINITY),
            upper_x: f32x4::splat(f32::NEG_INFINITY),
            lower_y: f32x4::splat(f32::INFINITY),
            upper_y: f32x4::splat(f32::NEG_INFINITY),
            lower_z: f32x4::splat(f32::INFINITY),
            upper_z: f32x4::splat(f32::NEG_INFINITY),
            children: [NodeRef::EMPTY; N],
        }
    }

    pub fn clear(&mut self) {
        *self = Node::empty();
    }

    pub fn child(&self, i: usize) -> NodeRef {
        assert2::debug_assert!(i < N);
        self.children[i]
    }

    pub fn set_child(&mut self, i: usize, child: NodeRef) {
        assert2::debug_assert!(i < N);
        self.children[i] = child;
    }

    pub fn set_bounds(&mut self, i: usize, bounds: &Aabb) {
        assert2::debug_assert!(i < N);
        set_lane(&mut self.lower_x, i, bounds.min.x);
        set_lane(&mut self.lower_y, i, bounds.min.y);
        set_lane(&mut self.lower_z, i, bounds.min.z);
        set_lane(&mut self.upper_x, i, bounds.max.x);
        set_lane(&mut self.upper_y, i, bounds.max.y);
        set_lane(&mut self.upper_z, i, bounds.max.z);
    }

    pub fn set(&mut self, i: usize, bounds: &Aabb, child: NodeRef) {
        self.set_bounds(i, bounds);
        self.set_child(i, child);
    }

    /// Bounds of one child.
    pub fn child_bounds(&self, i: usize) -> Aabb {
        assert2::debug_assert!(i < N);
        Aabb::new(
            Vector3::new(
                self.lower_x.as_array_ref()[i],
                self.lower_y.as_array_ref()[i],
                self.lower_z.as_array_ref()[i],
            ),
            Vector3::new(
                self.upper_x.as_array_ref()[i],
                self.upper_y.as_array_ref()[i],
                self.upper_z.as_array_ref()[i],
            ),
        )
    }

    /// Bounds of all four children at once, through the slab transpose.
    pub fn children_bounds(&self) -> [Aabb; N] {
        let lower = transpose4([self.lower_x, self.lower_y, self.lower_z, f32x4::ZERO]);
        let upper = transpose4([self.upper_x, self.upper_y, self.upper_z, f32x4::ZERO]);
        core::array::from_fn(|i| {
            let l = lower[i].as_array_ref();
            let u = upper[i].as_array_ref();
            Aabb::new(Vector3::new(l[0], l[1], l[2]), Vector3::new(u[0], u[1], u[2]))
        })
    }

    /// Bounds of the whole node. Empty slots do not contribute.
    pub fn bounds(&self) -> Aabb {
        Aabb::new(
            Vector3::new(
                reduce_min4(self.lower_x),
                reduce_min4(self.lower_y),
                reduce_min4(self.lower_z),
            ),
            Vector3::new(
                reduce_max4(self.upper_x),
                reduce_max4(self.upper_y),
                reduce_max4(self.upper_z),
            ),
        )
    }

    pub fn swap(&mut self, i: usize, j: usize) {
        assert2::debug_assert!(i < N && j < N);
        self.children.swap(i, j);
        for slab in [
            &mut self.lower_x,
            &mut self.lower_y,
            &mut self.lower_z,
            &mut self.upper_x,
            &mut self.upper_y,
            &mut self.upper_z,
        ] {
            let mut lanes = *slab.as_array_ref();
            lanes.swap(i, j);
            *slab = f32x4::from(lanes);
        }
    }

    /// Slab test of child `i` against eight rays.
    ///
    /// Returns the hit mask and the near-plane clip distance per lane.
    /// `rdir` must come from `rcp_safe` and `org_rdir` is `org * rdir`,
    /// so no lane can produce `0 * inf` here.
    ///
    /// `ROBUST` selects the watertight variant: both compare operands are
    /// widened by two ulp, so a ray grazing the seam between two
    /// adjacent children registers on at least one of them despite
    /// rounding. The plain variant compares through the signed integer
    /// min/max on the float bit patterns, which is the reproducibility
    /// anchor across lanes and fixes `min(+0, -0) = -0`.
    pub fn intersect8<const ROBUST: bool>(
        &self,
        i: usize,
        rdir: &Vec3x8,
        org_rdir: &Vec3x8,
        tnear: Float8,
        tfar: Float8,
    ) -> (Mask8, Float8) {
        assert2::debug_assert!(i < N);
        let lclip_min_x = Float8::splat(self.lower_x.as_array_ref()[i]).msub(rdir.x, org_rdir.x);
        let lclip_min_y = Float8::splat(self.lower_y.as_array_ref()[i]).msub(rdir.y, org_rdir.y);
        let lclip_min_z = Float8::splat(self.lower_z.as_array_ref()[i]).msub(rdir.z, org_rdir.z);
        let lclip_max_x = Float8::splat(self.upper_x.as_array_ref()[i]).msub(rdir.x, org_rdir.x);
        let lclip_max_y = Float8::splat(self.upper_y.as_array_ref()[i]).msub(rdir.y, org_rdir.y);
        let lclip_max_z = Float8::splat(self.upper_z.as_array_ref()[i]).msub(rdir.z, org_rdir.z);

        if ROBUST {
            let lnear = fast_max(
                fast_max(
                    fast_min(lclip_min_x, lclip_max_x),
                    fast_min(lclip_min_y, lclip_max_y),
                ),
                fast_min(lclip_min_z, lclip_max_z),
            );
            let lfar = fast_min(
                fast_min(
                    fast_max(lclip_min_x, lclip_max_x),
                    fast_max(lclip_min_y, lclip_max_y),
                ),
                fast_max(lclip_min_z, lclip_max_z),
            );
            let lhs = Float8::splat(ROUND_DOWN) * fast_max(lnear, tnear);
            let rhs = Float8::splat(ROUND_UP) * fast_min(lfar, tfar);
            (lhs.simd_le(rhs), lnear)
        } else {
            let lnear = lclip_min_x
                .mini(lclip_max_x)
                .maxi(lclip_min_y.mini(lclip_max_y))
                .maxi(lclip_min_z.mini(lclip_max_z));
            let lfar = lclip_min_x
                .maxi(lclip_max_x)
                .mini(lclip_min_y.maxi(lclip_max_y))
                .mini(lclip_min_z.maxi(lclip_max_z));
            let lhit = lnear.maxi(tnear).simd_le(lfar.mini(tfar));
            (lhit, lnear)
        }
    }
}

fn set_lane(slab: &mut f32x4, i: usize, v: f32) {
    let mut lanes = *slab.as_array_ref();
    lanes[i] = v;
    *slab = f32x4::from(lanes);
}

fn reduce_min4(v: f32x4) -> f32 {
    v.as_array_ref().iter().copied().fold(f32::INFINITY, f32::min)
}

fn reduce_max4(v: f32x4) -> f32 {
    v.as_array_ref()
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max)
}
