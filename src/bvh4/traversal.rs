use std::marker::PhantomData;

use assert2::debug_assert;
use simba::simd::{SimdBool as _, SimdPartialOrd as _};

use crate::moeller::Triangle4Intersector8Moeller;
use crate::ray::Ray8;
use crate::scene::Scene;
use crate::simd::{select, Float8, Float8Ext as _, Mask8, Mask8Ext as _};
use crate::stats::TraversalStats;
use crate::triangle4::Triangle4;
use crate::vec3::rcp_safe;

use super::{Bvh4, NodeRef, MAX_DEPTH, N};

/// Bitset of node kinds a tree may contain. Only [`AABB`](node_types::AABB)
/// nodes are handled here; the other bits are dispatch points for trees
/// with interpolated or oriented bounds.
pub mod node_types {
    pub const AABB: usize = 0x1;
    pub const MOTION_BLUR: usize = 0x10;
    pub const UNALIGNED: usize = 0x100;
    pub const UNALIGNED_MOTION_BLUR: usize = 0x1000;
}

/// Worst-case stack depth: every descent can push all four children.
pub const STACK_SIZE: usize = 4 * MAX_DEPTH + 1;

/// Leaf-stage contract of the traversal.
///
/// `intersect` receives the decoded run of primitive blocks of one leaf
/// and updates `ray` in place, only ever shrinking `tfar` and only in
/// lanes of `valid`.
pub trait PrimitiveIntersector8 {
    type Primitive;
    /// Per-call state derived from the ray packet before traversal
    /// starts, shared by every leaf of the call.
    type Precalculations;

    fn precalculate(valid: Mask8, ray: &Ray8) -> Self::Precalculations;

    fn intersect(
        valid: Mask8,
        pre: &Self::Precalculations,
        ray: &mut Ray8,
        blocks: &[Self::Primitive],
        scene: &Scene,
        stats: &mut TraversalStats,
    );
}

/// Depth-first packet traversal of a [`Bvh4`] by eight rays at once.
///
/// The whole packet walks the tree as one unit: a subtree is entered if
/// any lane can still hit it, and per-lane activity is carried in the
/// near-distance vectors on the stack. Descent follows the child whose
/// slab distance beats the best stacked candidate, so near geometry
/// tightens `tfar` early and far subtrees die in the pop-time cull.
pub struct Bvh4Intersector8Chunk<const TYPES: usize, const ROBUST: bool, I> {
    _marker: PhantomData<I>,
}

impl<const TYPES: usize, const ROBUST: bool, I: PrimitiveIntersector8>
    Bvh4Intersector8Chunk<TYPES, ROBUST, I>
{
    pub fn intersect(valid_i: Mask8, bvh: &Bvh4<I::Primitive>, ray: &mut Ray8) {
        let mut stats = TraversalStats::new();
        Self::intersect_with_stats(valid_i, bvh, ray, &mut stats);
    }

    pub fn intersect_with_stats(
        valid_i: Mask8,
        bvh: &Bvh4<I::Primitive>,
        ray: &mut Ray8,
        stats: &mut TraversalStats,
    ) {
        let rdir = rcp_safe(&ray.dir);
        let org_rdir = ray.org.component_mul(&rdir);
        // Inactive lanes get an empty interval and fail every slab test
        let ray_tnear = select(valid_i, ray.tnear, Float8::infinity());
        let mut ray_tfar = select(valid_i, ray.tfar, Float8::neg_infinity());
        let inf = Float8::infinity();
        let pre = I::precalculate(valid_i, ray);

        let mut stack_node = [NodeRef::INVALID; STACK_SIZE];
        let mut stack_near = [inf; STACK_SIZE];
        stack_node[1] = bvh.root();
        stack_near[1] = ray_tnear;
        let mut sp = 2usize;

        loop {
            // Pop the next subtree
            debug_assert!(sp > 0);
            sp -= 1;
            let mut cur = stack_node[sp];
            let mut cur_dist = stack_near[sp];
            if cur == NodeRef::INVALID {
                debug_assert!(sp == 0);
                break;
            }

            // A previous hit may have shrunk every lane's interval past
            // this entry's near distance
            if !ray_tfar.simd_gt(cur_dist).any() {
                continue;
            }

            while (TYPES & node_types::AABB) != 0 && cur.is_node() {
                debug_assert!(!cur.is_barrier());
                let valid_node = ray_tfar.simd_gt(cur_dist);
                stats.trav_nodes.add_sample(valid_node.popcount() as usize);
                // TODO: Perf: prefetch the child nodes before the slab tests
                let node = bvh.node(cur.node_index());

                // Eagerly pop the best stacked candidate; any closer
                // child displaces it back onto the stack
                debug_assert!(sp > 0);
                sp -= 1;
                cur = stack_node[sp];
                cur_dist = stack_near[sp];

                for i in 0..N {
                    let child = node.children[i];
                    if child == NodeRef::EMPTY {
                        break;
                    }
                    let (lhit, lnear) =
                        node.intersect8::<ROBUST>(i, &rdir, &org_rdir, ray_tnear, ray_tfar);
                    if lhit.any() {
                        debug_assert!(sp < STACK_SIZE);
                        let child_dist = select(lhit, lnear, inf);
                        if child_dist.simd_lt(cur_dist).any() {
                            stack_node[sp] = cur;
                            stack_near[sp] = cur_dist;
                            sp += 1;
                            cur = child;
                            cur_dist = child_dist;
                        } else {
                            stack_node[sp] = child;
                            stack_near[sp] = child_dist;
                            sp += 1;
                        }
                    }
                }
            }

            if cur == NodeRef::INVALID {
                debug_assert!(sp == 0);
                break;
            }

            // Leaf
            debug_assert!(cur != NodeRef::EMPTY);
            let valid_leaf = ray_tfar.simd_gt(cur_dist);
            stats.trav_leaves.add_sample(valid_leaf.popcount() as usize);
            let (base, blocks) = cur.decode_leaf();
            I::intersect(
                valid_leaf,
                &pre,
                ray,
                bvh.leaf_blocks(base, blocks),
                bvh.scene(),
                stats,
            );
            ray_tfar = select(valid_leaf, ray.tfar, ray_tfar);
        }
    }
}

type ChunkMoeller<const FILTER: bool> = Bvh4Intersector8Chunk<
    { node_types::AABB },
    false,
    Triangle4Intersector8Moeller<false, FILTER>,
>;

/// Canonical instantiation: aligned nodes, fast slab test, Triangle4
/// Möller–Trumbore with intersection-filter dispatch.
pub fn bvh4_triangle4_intersector8_chunk_moeller(
    valid: Mask8,
    bvh: &Bvh4<Triangle4>,
    ray: &mut Ray8,
) {
    ChunkMoeller::<true>::intersect(valid, bvh, ray)
}

/// As [`bvh4_triangle4_intersector8_chunk_moeller`], skipping filter
/// dispatch entirely.
pub fn bvh4_triangle4_intersector8_chunk_moeller_no_filter(
    valid: Mask8,
    bvh: &Bvh4<Triangle4>,
    ray: &mut Ray8,
) {
    ChunkMoeller::<false>::intersect(valid, bvh, ray)
}

pub fn bvh4_triangle4_intersector8_chunk_moeller_with_stats(
    valid: Mask8,
    bvh: &Bvh4<Triangle4>,
    ray: &mut Ray8,
    stats: &mut TraversalStats,
) {
    ChunkMoeller::<true>::intersect_with_stats(valid, bvh, ray, stats)
}

pub fn bvh4_triangle4_intersector8_chunk_moeller_no_filter_with_stats(
    valid: Mask8,
    bvh: &Bvh4<Triangle4>,
    ray: &mut Ray8,
    stats: &mut TraversalStats,
) {
    ChunkMoeller::<false>::intersect_with_stats(valid, bvh, ray, stats)
}
