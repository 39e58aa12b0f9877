//! Terrain sampling
//!
//! The simulation only asks one question of the track: "what is under me?".
//! Samplers answer with the hit point and surface normal of a bounded ray.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A bounded ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
    pub max_distance: f32,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3, max_distance: f32) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
            max_distance,
        }
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Result of a terrain probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainHit {
    /// Whether the probe hit anything within range
    pub hit: bool,
    pub point: Vec3,
    /// Unit surface normal at `point`
    pub normal: Vec3,
    /// Distance along the ray
    pub distance: f32,
}

impl TerrainHit {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec3::ZERO,
            normal: Vec3::ZERO,
            distance: f32::INFINITY,
        }
    }
}

/// Read-only terrain query
pub trait TerrainSampler {
    /// Cast `ray` against the terrain, returning the nearest hit within `ray.max_distance`
    fn sample(&self, ray: &Ray) -> TerrainHit;
}

impl<T: TerrainSampler + ?Sized> TerrainSampler for &T {
    fn sample(&self, ray: &Ray) -> TerrainHit {
        (**self).sample(ray)
    }
}

/// Interpolate a vertex attribute from barycentric coordinates.
///
/// `(b0, b1)` are the raw coordinates a ray/triangle test reports; the weights are
/// `w0 = 1 - b0 - b1` for `v0`, `w1 = b0` for `v1` and `w2 = b1` for `v2`.
/// Swapping these silently corrupts interpolated normals.
#[inline]
pub fn barycentric_blend(b0: f32, b1: f32, v0: Vec3, v1: Vec3, v2: Vec3) -> Vec3 {
    let w0 = 1.0 - b0 - b1;
    v0 * w0 + v1 * b0 + v2 * b1
}

/// Infinite horizontal plane at height `y`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlatGround {
    pub y: f32,
}

impl FlatGround {
    pub fn new(y: f32) -> Self {
        Self { y }
    }
}

impl TerrainSampler for FlatGround {
    fn sample(&self, ray: &Ray) -> TerrainHit {
        let denom = ray.direction.y;
        if denom.abs() < 1e-6 {
            return TerrainHit::miss();
        }
        let t = (self.y - ray.origin.y) / denom;
        if !(0.0..=ray.max_distance).contains(&t) {
            return TerrainHit::miss();
        }
        // Plane normal faces the ray origin
        let normal = if denom < 0.0 { Vec3::Y } else { Vec3::NEG_Y };
        TerrainHit {
            hit: true,
            point: ray.at(t),
            normal,
            distance: t,
        }
    }
}

/// A triangle with per-vertex normals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub vertices: [Vec3; 3],
    pub normals: [Vec3; 3],
}

impl Triangle {
    /// Triangle with the face normal on every vertex
    pub fn flat(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        let n = (v1 - v0).cross(v2 - v0).normalize_or_zero();
        Self {
            vertices: [v0, v1, v2],
            normals: [n, n, n],
        }
    }

    /// Möller-Trumbore intersection; returns `(t, b0, b1)`
    pub fn intersect(&self, ray: &Ray) -> Option<(f32, f32, f32)> {
        const EPS: f32 = 1e-7;
        let [v0, v1, v2] = self.vertices;
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let p = ray.direction.cross(e2);
        let det = e1.dot(p);
        if det.abs() < EPS {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = ray.origin - v0;
        let b0 = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&b0) {
            return None;
        }
        let q = s.cross(e1);
        let b1 = ray.direction.dot(q) * inv_det;
        if b1 < 0.0 || b0 + b1 > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv_det;
        (t >= 0.0).then_some((t, b0, b1))
    }

    /// Smooth normal at barycentric `(b0, b1)`
    pub fn normal_at(&self, b0: f32, b1: f32) -> Vec3 {
        let [n0, n1, n2] = self.normals;
        barycentric_blend(b0, b1, n0, n1, n2).normalize_or_zero()
    }
}

/// Brute-force triangle soup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub triangles: Vec<Triangle>,
}

impl TriangleMesh {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }
}

impl TerrainSampler for TriangleMesh {
    fn sample(&self, ray: &Ray) -> TerrainHit {
        let mut best = TerrainHit::miss();
        for tri in &self.triangles {
            let Some((t, b0, b1)) = tri.intersect(ray) else {
                continue;
            };
            if t > ray.max_distance || t >= best.distance {
                continue;
            }
            let mut normal = tri.normal_at(b0, b1);
            // Normal faces the ray origin
            if normal.dot(ray.direction) > 0.0 {
                normal = -normal;
            }
            best = TerrainHit {
                hit: true,
                point: ray.at(t),
                normal,
                distance: t,
            };
        }
        best
    }
}
