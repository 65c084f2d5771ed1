use index_vec::{define_index_type, IndexVec};
use simba::simd::SimdBool as _;

use crate::ray::Ray8;
use crate::simd::{store_masked, store_masked_i32, Float8, Int8, Mask8};
use crate::vec3::Vec3x8;

define_index_type! {
    /// Identifier of a geometry within a [`Scene`].
    pub struct GeomId = u32;
    IMPL_RAW_CONVERSIONS = true;
}

/// A candidate intersection for up to eight lanes, staged before it is
/// written into the ray packet.
#[derive(Clone, Copy, Debug)]
pub struct Hit8 {
    pub u: Float8,
    pub v: Float8,
    pub t: Float8,
    pub ng: Vec3x8,
    pub geom_id: Int8,
    pub prim_id: Int8,
}

impl Hit8 {
    /// Writes the hit into `ray` for the lanes in `valid`; other lanes
    /// keep all of their fields, including `tfar`.
    pub fn commit(&self, valid: Mask8, ray: &mut Ray8) {
        store_masked(valid, &mut ray.u, self.u);
        store_masked(valid, &mut ray.v, self.v);
        store_masked(valid, &mut ray.tfar, self.t);
        store_masked_i32(valid, &mut ray.geom_id, self.geom_id);
        store_masked_i32(valid, &mut ray.prim_id, self.prim_id);
        store_masked(valid, &mut ray.ng.x, self.ng.x);
        store_masked(valid, &mut ray.ng.y, self.ng.y);
        store_masked(valid, &mut ray.ng.z, self.ng.z);
    }
}

/// User callback deciding which candidate lanes become hits.
///
/// Receives the candidate lanes, the current ray packet, and the staged
/// hit; returns the subset of lanes that commit.
pub type IntersectionFilter8 = dyn Fn(Mask8, &Ray8, &Hit8) -> Mask8 + Send + Sync;

/// One registered geometry: the per-geometry capabilities the kernel
/// consults during leaf intersection.
#[derive(Default)]
pub struct Geometry {
    filter8: Option<Box<IntersectionFilter8>>,
}

impl Geometry {
    pub fn new() -> Geometry {
        Geometry::default()
    }

    pub fn with_intersection_filter8(
        filter: impl Fn(Mask8, &Ray8, &Hit8) -> Mask8 + Send + Sync + 'static,
    ) -> Geometry {
        Geometry {
            filter8: Some(Box::new(filter)),
        }
    }

    pub fn has_intersection_filter8(&self) -> bool {
        self.filter8.is_some()
    }

    /// Runs the filter on the candidate lanes and commits the lanes it
    /// accepts. Without a registered filter every candidate lane commits.
    pub fn run_intersection_filter8(&self, valid: Mask8, ray: &mut Ray8, hit: &Hit8) {
        let accepted = match &self.filter8 {
            Some(filter) => filter(valid, ray, hit) & valid,
            None => valid,
        };
        if accepted.any() {
            hit.commit(accepted, ray);
        }
    }
}

/// Geometry table resolving the `geomID` recorded in hits.
///
/// The kernel only reads it: [`get`](Scene::get) during filter dispatch.
#[derive(Default)]
pub struct Scene {
    geometries: IndexVec<GeomId, Geometry>,
}

impl Scene {
    pub fn new() -> Scene {
        Scene::default()
    }

    pub fn add(&mut self, geometry: Geometry) -> GeomId {
        self.geometries.push(geometry)
    }

    pub fn get(&self, id: GeomId) -> &Geometry {
        &self.geometries[id]
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
}
