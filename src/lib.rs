//! Packet ray-traversal kernel over a four-wide BVH.
//!
//! Eight coherent rays traverse the tree as one SIMD packet: inner
//! nodes are culled with an 8-ray slab test against all four child
//! boxes, and leaves run a Möller–Trumbore kernel over blocks of four
//! triangles. The tree is built elsewhere; this crate only consumes it.

pub mod bvh4;
pub mod moeller;
pub mod ray;
pub mod scene;
pub mod simd;
pub mod stats;
pub mod triangle4;
pub mod util;
pub mod vec3;

pub use bvh4::traversal::{
    bvh4_triangle4_intersector8_chunk_moeller, bvh4_triangle4_intersector8_chunk_moeller_no_filter,
    bvh4_triangle4_intersector8_chunk_moeller_no_filter_with_stats,
    bvh4_triangle4_intersector8_chunk_moeller_with_stats, Bvh4Intersector8Chunk,
    PrimitiveIntersector8,
};
pub use bvh4::{Aabb, Bvh4, Node, NodeRef};
pub use moeller::Triangle4Intersector8Moeller;
pub use ray::Ray8;
pub use scene::{Geometry, Hit8, Scene};
pub use simd::{Float8, Int8, Mask8};
pub use stats::TraversalStats;
pub use triangle4::{Triangle4, TriangleDef};
pub use vec3::Vec3x8;

/// The tree type of the canonical Triangle4 instantiations.
pub type Bvh4Triangle4 = Bvh4<triangle4::Triangle4>;
