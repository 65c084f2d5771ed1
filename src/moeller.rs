use num_traits::zero;
use simba::simd::{SimdBool as _, SimdPartialOrd as _};

use crate::bvh4::traversal::PrimitiveIntersector8;
use crate::ray::Ray8;
use crate::scene::{GeomId, Hit8, Scene};
use crate::simd::{nonzero_i32, Float8, Float8Ext as _, Int8, Mask8, Mask8Ext as _};
use crate::stats::TraversalStats;
use crate::triangle4::{broadcast8, Triangle4};
use crate::vec3::fma_dot;

/// Möller–Trumbore intersection of [`Triangle4`] blocks with eight rays.
///
/// Works on the precomputed `ng = e1 x e2` instead of re-deriving the
/// cross product, and folds the determinant sign into the barycentric
/// numerators, so one sign flip replaces a divide until a hit is
/// certain.
///
/// `LIST` selects the list-mode id accessors of the block; `FILTER`
/// enables dispatch to per-geometry intersection filters.
pub struct Triangle4Intersector8Moeller<const LIST: bool, const FILTER: bool>;

impl<const LIST: bool, const FILTER: bool> PrimitiveIntersector8
    for Triangle4Intersector8Moeller<LIST, FILTER>
{
    type Primitive = Triangle4;
    type Precalculations = ();

    fn precalculate(_valid: Mask8, _ray: &Ray8) {}

    fn intersect(
        valid_i: Mask8,
        _pre: &(),
        ray: &mut Ray8,
        blocks: &[Triangle4],
        scene: &Scene,
        stats: &mut TraversalStats,
    ) {
        for tri in blocks {
            for i in 0..4 {
                if !tri.valid(i) {
                    break;
                }
                stats.trav_prims.add_sample(valid_i.popcount() as usize);

                let p0 = broadcast8(&tri.v0, i);
                let e1 = broadcast8(&tri.e1, i);
                let e2 = broadcast8(&tri.e2, i);
                let ng = broadcast8(&tri.ng, i);

                let c = p0 - ray.org;
                let r = ray.dir.cross(&c);
                let den = fma_dot(&ng, &ray.dir);
                let abs_den = den.abs();
                let sgn_den = den.signmask();

                // Numerators of u, v and the third barycentric weight,
                // all scaled by |den| and sign-corrected
                let mut valid = valid_i;
                let u = fma_dot(&r, &e2).xor(sgn_den);
                valid = valid & u.simd_ge(zero());
                let v = fma_dot(&r, &e1).xor(sgn_den);
                valid = valid & v.simd_ge(zero());
                let w = abs_den - u - v;
                valid = valid & w.simd_ge(zero());
                if !valid.any() {
                    continue;
                }

                let t = fma_dot(&ng, &c).xor(sgn_den);
                valid = valid & t.simd_ge(abs_den * ray.tnear) & (abs_den * ray.tfar).simd_ge(t);
                if !valid.any() {
                    continue;
                }

                valid = if cfg!(feature = "backface-culling") {
                    valid & den.simd_gt(zero())
                } else {
                    valid & den.simd_ne(zero())
                };
                if !valid.any() {
                    continue;
                }

                if cfg!(feature = "ray-mask") {
                    valid = valid & nonzero_i32(Int8::splat(tri.mask(i)) & ray.mask);
                    if !valid.any() {
                        continue;
                    }
                }

                let rcp_abs_den = abs_den.rcp();
                let geom_id = tri.geom_id::<LIST>(i);
                let hit = Hit8 {
                    u: u * rcp_abs_den,
                    v: v * rcp_abs_den,
                    t: t * rcp_abs_den,
                    ng,
                    geom_id: Int8::splat(geom_id as i32),
                    prim_id: Int8::splat(tri.prim_id::<LIST>(i) as i32),
                };

                if FILTER {
                    let geometry = scene.get(GeomId::from_raw(geom_id));
                    if geometry.has_intersection_filter8() {
                        geometry.run_intersection_filter8(valid, ray, &hit);
                        continue;
                    }
                }

                hit.commit(valid, ray);
            }
        }
    }
}
