//! CPU ray picking.
//!
//! A click is unprojected through the inverse view-projection into a world
//! ray, then tested against every surface's local bounds with a slab test.
//! Only tagged surfaces can be picked and planes only from their front side;
//! anything else is looked through.

use super::camera::CameraView;
use crate::scene::{Aabb, Scene, SurfaceId};
use glam::{Mat4, Vec3, Vec4};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub dir: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub surface: SurfaceId,
    /// World distance from the ray origin.
    pub distance: f32,
    /// Where the ray enters the surface, in world space.
    pub point: Vec3,
    pub screen_x: f32,
    pub screen_y: f32,
}

/// Pixel coordinates (origin top-left) to a world ray through the near and far planes.
pub fn screen_to_ray(camera: &CameraView, viewport: (u32, u32), screen_x: f32, screen_y: f32) -> Option<Ray> {
    let (w, h) = viewport;
    if w == 0 || h == 0 {
        return None;
    }
    let ndc_x = (screen_x / w as f32) * 2.0 - 1.0;
    let ndc_y = 1.0 - (screen_y / h as f32) * 2.0;
    let inv_vp = camera.view_proj(w as f32, h as f32).inverse();
    let near4 = inv_vp * Vec4::new(ndc_x, ndc_y, 0.0, 1.0);
    let far4 = inv_vp * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
    let near = near4.truncate() / near4.w;
    let far = far4.truncate() / far4.w;
    let dir = (far - near).try_normalize()?;
    Some(Ray { origin: near, dir })
}

/// Slab test in the object's local space. Returns the distance along `ray`
/// to the entry face. A ray starting inside the box only sees back faces and
/// misses.
pub fn ray_aabb(ray: &Ray, aabb: &Aabb, world: &Mat4) -> Option<f32> {
    let inv = world.inverse();
    let lo = (inv * ray.origin.extend(1.0)).truncate();
    let ld = (inv * ray.dir.extend(0.0)).truncate();
    let t1 = (aabb.min - lo) / ld;
    let t2 = (aabb.max - lo) / ld;
    let tmin = t1.min(t2);
    let tmax = t1.max(t2);
    let enter = tmin.x.max(tmin.y).max(tmin.z);
    let exit = tmax.x.min(tmax.y).min(tmax.z);
    if enter >= 0.0 && exit >= enter {
        Some(enter)
    } else {
        None
    }
}

/// Nearest tagged surface under the pixel, if any.
pub fn pick(
    screen_x: f32,
    screen_y: f32,
    camera: &CameraView,
    viewport: (u32, u32),
    scene: &Scene,
) -> Option<PickHit> {
    let ray = screen_to_ray(camera, viewport, screen_x, screen_y)?;

    let mut closest: Option<(SurfaceId, f32)> = None;
    for surface in scene.tagged_surfaces() {
        if let Some(normal) = surface.front_normal() {
            if ray.dir.dot(normal) >= 0.0 {
                continue;
            }
        }
        let Some(t) = ray_aabb(&ray, &surface.geometry.local_bounds(), &surface.world_matrix()) else {
            continue;
        };
        if closest.map_or(true, |(_, best)| t < best) {
            closest = Some((surface.id, t));
        }
    }

    closest.map(|(surface, distance)| PickHit {
        surface,
        distance,
        point: ray.at(distance),
        screen_x,
        screen_y,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::camera::{CameraController, CameraSettings};
    use crate::scene::{build, Dimensions, RoomType};

    const VIEWPORT: (u32, u32) = (800, 600);

    fn looking(eye: Vec3, target: Vec3) -> CameraView {
        CameraView {
            eye,
            target,
            up: Vec3::Y,
            fov_y: 50f32.to_radians(),
            znear: 0.1,
            zfar: 200.0,
        }
    }

    fn label(scene: &Scene, hit: Option<PickHit>) -> Option<&str> {
        hit.and_then(|h| scene.surface(h.surface)).map(|s| s.label.as_str())
    }

    #[test]
    fn center_ray_points_at_target() {
        let camera = looking(Vec3::new(0.0, 2.0, 10.0), Vec3::new(0.0, 2.0, 0.0));
        let ray = screen_to_ray(&camera, VIEWPORT, 400.0, 300.0).unwrap();
        assert!((ray.dir - Vec3::NEG_Z).length() < 1e-4);
        assert!(screen_to_ray(&camera, (0, 600), 0.0, 0.0).is_none());
    }

    #[test]
    fn center_click_passes_through_front_wall() {
        let scene = build(RoomType::Kitchen, Dimensions::new(14.0, 12.0, 9.0)).unwrap();
        let camera = CameraController::for_room(scene.dimensions(), CameraSettings::default());
        let hit = pick(400.0, 300.0, &camera.view(), VIEWPORT, &scene);
        assert_eq!(label(&scene, hit), Some("Back Wall"));
        assert!(hit.unwrap().distance > 0.0);
    }

    #[test]
    fn nearest_tagged_surface_wins() {
        let scene = build(RoomType::Kitchen, Dimensions::new(14.0, 12.0, 9.0)).unwrap();
        // straight at the island from the front, below the countertop
        let camera = looking(Vec3::new(0.0, 1.0, 5.0), Vec3::new(0.0, 1.0, 0.0));
        let hit = pick(400.0, 300.0, &camera, VIEWPORT, &scene);
        assert_eq!(label(&scene, hit), Some("Kitchen Island"));
    }

    #[test]
    fn planes_are_not_pickable_from_behind() {
        let scene = build(RoomType::Other, Dimensions::new(14.0, 12.0, 9.0)).unwrap();
        let from_front = looking(Vec3::new(0.0, 4.5, 20.0), Vec3::new(0.0, 4.5, 0.0));
        assert_eq!(
            label(&scene, pick(400.0, 300.0, &from_front, VIEWPORT, &scene)),
            Some("Back Wall")
        );

        // behind the back wall; the only other plane on this line is the untagged front wall
        let from_back = looking(Vec3::new(0.0, 4.5, -20.0), Vec3::new(0.0, 4.5, 0.0));
        assert_eq!(pick(400.0, 300.0, &from_back, VIEWPORT, &scene), None);
    }

    #[test]
    fn box_entry_point_lies_on_its_face() {
        let ray = Ray {
            origin: Vec3::new(0.0, 0.0, 5.0),
            dir: Vec3::NEG_Z,
        };
        let aabb = Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5));
        let t = ray_aabb(&ray, &aabb, &Mat4::IDENTITY).unwrap();
        assert!((ray.at(t) - Vec3::new(0.0, 0.0, 0.5)).length() < 1e-5);

        let inside = Ray {
            origin: Vec3::ZERO,
            dir: Vec3::NEG_Z,
        };
        assert_eq!(ray_aabb(&inside, &aabb, &Mat4::IDENTITY), None);
    }

    #[test]
    fn eye_inside_a_fixture_picks_past_it() {
        let scene = build(RoomType::Bathroom, Dimensions::new(9.0, 8.0, 8.0)).unwrap();
        let shower = scene.surfaces().iter().find(|s| s.label == "Shower").unwrap();
        let eye = Vec3::new(3.0, 4.0, -3.0);
        let bounds = shower.world_bounds();
        assert!(eye.cmpgt(bounds.min).all() && eye.cmplt(bounds.max).all());

        let camera = looking(eye, Vec3::new(0.0, 1.0, 0.0));
        let hit = pick(400.0, 300.0, &camera, VIEWPORT, &scene).unwrap();
        assert_ne!(scene.surface(hit.surface).unwrap().label, "Shower");
        assert!(hit.distance > 0.0);

        for x in [100.0, 300.0, 500.0, 700.0] {
            let hit = pick(x, 450.0, &camera, VIEWPORT, &scene);
            assert_ne!(label(&scene, hit), Some("Shower"));
        }
    }

    #[test]
    fn empty_space_is_a_miss() {
        let scene = build(RoomType::Bathroom, Dimensions::new(8.0, 6.0, 3.0)).unwrap();
        let camera = looking(Vec3::new(0.0, 1.5, 30.0), Vec3::new(0.0, 1.5, 60.0));
        assert_eq!(pick(400.0, 300.0, &camera, VIEWPORT, &scene), None);
    }
}
