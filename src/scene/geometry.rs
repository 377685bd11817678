//! Primitive solids and their transforms.
//!
//! Everything here is plain data: a [`Primitive`] knows how to emit its unit
//! mesh and local bounds, a [`Transform`] places it in the room. GPU upload
//! happens elsewhere.

use glam::{Mat4, Quat, Vec3};

/// Planes are intersected as very thin slabs.
const PLANE_HALF_THICKNESS: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Unit square in the local XY plane, facing +Z. Single-sided.
    Plane,
    /// Unit cube centered on the origin.
    Box,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new(translation: Vec3, scale: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
            scale,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Bounds of the eight corners after `matrix` is applied.
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            let p = matrix.transform_point3(corner);
            min = min.min(p);
            max = max.max(p);
        }
        Aabb { min, max }
    }

    /// True when `other` fits inside `self`, allowing `tolerance` of slack.
    pub fn contains(&self, other: &Aabb, tolerance: f32) -> bool {
        other.min.cmpge(self.min - Vec3::splat(tolerance)).all()
            && other.max.cmple(self.max + Vec3::splat(tolerance)).all()
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
}

#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

impl MeshData {
    /// Appends a quad centered at `center` spanning `u` and `v`, facing `u x v`.
    fn push_quad(&mut self, center: Vec3, u: Vec3, v: Vec3) {
        let normal = u.cross(v).normalize().to_array();
        let base = self.vertices.len() as u16;
        for (su, sv) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
            let pos = center + u * su + v * sv;
            self.vertices.push(Vertex {
                pos: pos.to_array(),
                normal,
            });
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

impl Primitive {
    pub fn mesh(self) -> MeshData {
        let mut mesh = MeshData::default();
        match self {
            Primitive::Plane => mesh.push_quad(Vec3::ZERO, Vec3::X, Vec3::Y),
            Primitive::Box => {
                // (outward normal, u, v) with u x v == normal
                let faces = [
                    (Vec3::X, Vec3::NEG_Z, Vec3::Y),
                    (Vec3::NEG_X, Vec3::Z, Vec3::Y),
                    (Vec3::Y, Vec3::X, Vec3::NEG_Z),
                    (Vec3::NEG_Y, Vec3::X, Vec3::Z),
                    (Vec3::Z, Vec3::X, Vec3::Y),
                    (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
                ];
                for (normal, u, v) in faces {
                    mesh.push_quad(normal * 0.5, u, v);
                }
            }
        }
        mesh
    }

    pub fn local_bounds(self) -> Aabb {
        match self {
            Primitive::Plane => Aabb::new(
                Vec3::new(-0.5, -0.5, -PLANE_HALF_THICKNESS),
                Vec3::new(0.5, 0.5, PLANE_HALF_THICKNESS),
            ),
            Primitive::Box => Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5)),
        }
    }

    /// Area of the faces a material would cover once scaled by `scale`.
    pub fn surface_area(self, scale: Vec3) -> f32 {
        let s = scale.abs();
        match self {
            Primitive::Plane => s.x * s.y,
            Primitive::Box => 2.0 * (s.x * s.y + s.y * s.z + s.x * s.z),
        }
    }

    pub fn is_single_sided(self) -> bool {
        matches!(self, Primitive::Plane)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_faces_wind_outward() {
        let mesh = Primitive::Box.mesh();
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        for tri in mesh.indices.chunks(3) {
            let a = Vec3::from(mesh.vertices[tri[0] as usize].pos);
            let b = Vec3::from(mesh.vertices[tri[1] as usize].pos);
            let c = Vec3::from(mesh.vertices[tri[2] as usize].pos);
            let face_normal = (b - a).cross(c - a).normalize();
            let stored = Vec3::from(mesh.vertices[tri[0] as usize].normal);
            assert!(face_normal.dot(stored) > 0.99);
            // outward: the normal points away from the cube center
            assert!(face_normal.dot((a + b + c) / 3.0) > 0.0);
        }
    }

    #[test]
    fn plane_faces_positive_z() {
        let mesh = Primitive::Plane.mesh();
        assert_eq!(mesh.indices.len(), 6);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
    }

    #[test]
    fn rotated_bounds_cover_all_corners() {
        let transform = Transform::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 2.0, 1.0))
            .with_rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let bounds = Primitive::Box.local_bounds().transformed(&transform.matrix());
        assert!((bounds.max.x - bounds.min.x - 1.0).abs() < 1e-4);
        assert!((bounds.max.z - bounds.min.z - 4.0).abs() < 1e-4);
        assert!((bounds.center() - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-4);
    }

    #[test]
    fn areas_follow_scale() {
        assert_eq!(Primitive::Plane.surface_area(Vec3::new(3.0, 2.0, 1.0)), 6.0);
        assert_eq!(Primitive::Box.surface_area(Vec3::new(1.0, 2.0, 3.0)), 22.0);
    }
}
