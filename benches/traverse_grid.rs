use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use nalgebra::Vector3;

use raypack::{
    bvh4::NodeRef,
    bvh4_triangle4_intersector8_chunk_moeller_no_filter,
    simd::{Mask8, Mask8Ext as _},
    Aabb, Bvh4Triangle4, Node, Ray8, Scene, Triangle4, TriangleDef,
};

/// A z = 5 plane tiled with triangles, split into four column strips.
fn build_grid(columns: usize, rows: usize) -> Bvh4Triangle4 {
    let mut tris = Vec::new();
    for x in 0..columns {
        for y in 0..rows {
            let (x0, y0) = (x as f32, y as f32);
            tris.push(TriangleDef::new(
                Vector3::new(x0, y0, 5.0),
                Vector3::new(x0 + 1.0, y0, 5.0),
                Vector3::new(x0, y0 + 1.0, 5.0),
                0,
                (2 * (x * rows + y)) as u32,
            ));
            tris.push(TriangleDef::new(
                Vector3::new(x0 + 1.0, y0 + 1.0, 5.0),
                Vector3::new(x0, y0 + 1.0, 5.0),
                Vector3::new(x0 + 1.0, y0, 5.0),
                0,
                (2 * (x * rows + y) + 1) as u32,
            ));
        }
    }

    let mut bvh = Bvh4Triangle4::new(Arc::new(Scene::new()), false);
    let mut root = Node::empty();
    let per_child = tris.len().div_ceil(4);
    for (slot, chunk) in tris.chunks(per_child).enumerate() {
        let blocks: Vec<Triangle4> = chunk.chunks(4).map(Triangle4::from_triangles).collect();
        let leaf = bvh.push_leaf(blocks);
        let mut min = Vector3::repeat(f32::INFINITY);
        let mut max = Vector3::repeat(f32::NEG_INFINITY);
        for t in chunk {
            for v in [t.v0, t.v1, t.v2] {
                min = min.inf(&v);
                max = max.sup(&v);
            }
        }
        root.set(slot, &Aabb::new(min, max), leaf);
    }
    let root = bvh.push_node(root);
    bvh.set_root(NodeRef::node(root));
    bvh.num_primitives = tris.len();
    bvh.verify().unwrap();
    bvh
}

fn criterion_benchmark(c: &mut Criterion) {
    let bvh = build_grid(7, 8);

    c.bench_function("traverse_grid_packets", |b| {
        b.iter(|| {
            let mut nearest = 0.0f32;
            for x in 0..7 {
                for y in 0..8 {
                    let orgs = core::array::from_fn(|i| {
                        Vector3::new(
                            x as f32 + 0.1 * (i % 4) as f32,
                            y as f32 + 0.2 * (i / 4) as f32,
                            0.0,
                        )
                    });
                    let dirs = [Vector3::new(0.0, 0.0, 1.0); 8];
                    let mut ray = Ray8::from_lanes(&orgs, &dirs, 0.0, f32::INFINITY);
                    bvh4_triangle4_intersector8_chunk_moeller_no_filter(
                        Mask8::from_bits(0xff),
                        black_box(&bvh),
                        &mut ray,
                    );
                    nearest += ray.tfar_lane(0);
                }
            }
            black_box(nearest)
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
