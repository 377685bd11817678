//! Parametric room construction.
//!
//! [`build`] turns a room type and its dimensions into a [`Scene`] holding the
//! six enclosure surfaces plus room-type fixtures. Every fixture is sized and
//! placed as a fraction of the dimensions so it stays inside the enclosure.

use super::{CategoryTag, Primitive, Scene, Surface, Transform};
use glam::{Quat, Vec3};
use std::f32::consts::{FRAC_PI_2, PI};

/// Opacity of the front wall so the camera can see into the room from outside.
const FRONT_WALL_OPACITY: f32 = 0.15;
const SHOWER_OPACITY: f32 = 0.35;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BuildError {
    #[error("invalid room dimensions {length} x {width} x {height}: all must be finite and > 0")]
    InvalidDimensions { length: f32, width: f32, height: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomType {
    Kitchen,
    Bathroom,
    #[default]
    #[serde(other)]
    Other,
}

impl RoomType {
    pub fn as_str(self) -> &'static str {
        match self {
            RoomType::Kitchen => "kitchen",
            RoomType::Bathroom => "bathroom",
            RoomType::Other => "other",
        }
    }
}

/// Room extents. Length runs along X, width along Z, height along Y.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub length: f32,
    pub width: f32,
    pub height: f32,
}

impl Dimensions {
    pub fn new(length: f32, width: f32, height: f32) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    pub fn validate(&self) -> Result<(), BuildError> {
        let ok = |v: f32| v.is_finite() && v > 0.0;
        if ok(self.length) && ok(self.width) && ok(self.height) {
            Ok(())
        } else {
            Err(BuildError::InvalidDimensions {
                length: self.length,
                width: self.width,
                height: self.height,
            })
        }
    }

    pub fn max_extent(&self) -> f32 {
        self.length.max(self.width).max(self.height)
    }
}

pub fn build(room_type: RoomType, dimensions: Dimensions) -> Result<Scene, BuildError> {
    dimensions.validate()?;

    let mut scene = Scene::new(room_type, dimensions);
    add_enclosure(&mut scene, dimensions);
    match room_type {
        RoomType::Kitchen => add_kitchen(&mut scene, dimensions),
        RoomType::Bathroom => add_bathroom(&mut scene, dimensions),
        RoomType::Other => {}
    }

    log::debug!(
        "built {} room with {} surfaces ({} tagged)",
        room_type.as_str(),
        scene.surfaces().len(),
        scene.tagged_surfaces().count()
    );
    Ok(scene)
}

fn plane(translation: Vec3, size_x: f32, size_y: f32, rotation: Quat) -> Transform {
    Transform::new(translation, Vec3::new(size_x, size_y, 1.0)).with_rotation(rotation)
}

fn solid(center: Vec3, size: Vec3) -> Transform {
    Transform::new(center, size)
}

/// Floor, four walls and ceiling. Every plane faces into the room.
fn add_enclosure(scene: &mut Scene, d: Dimensions) {
    let (l, w, h) = (d.length, d.width, d.height);

    scene.add_surface(Surface::new(
        "Floor",
        Primitive::Plane,
        plane(Vec3::ZERO, l, w, Quat::from_rotation_x(-FRAC_PI_2)),
        Some(CategoryTag::Flooring),
    ));
    scene.add_surface(Surface::new(
        "Back Wall",
        Primitive::Plane,
        plane(Vec3::new(0.0, h * 0.5, -w * 0.5), l, h, Quat::IDENTITY),
        Some(CategoryTag::Paint),
    ));
    scene.add_surface(Surface::new(
        "Left Wall",
        Primitive::Plane,
        plane(Vec3::new(-l * 0.5, h * 0.5, 0.0), w, h, Quat::from_rotation_y(FRAC_PI_2)),
        Some(CategoryTag::Paint),
    ));
    scene.add_surface(Surface::new(
        "Right Wall",
        Primitive::Plane,
        plane(Vec3::new(l * 0.5, h * 0.5, 0.0), w, h, Quat::from_rotation_y(-FRAC_PI_2)),
        Some(CategoryTag::Paint),
    ));
    scene.add_surface(
        Surface::new(
            "Front Wall",
            Primitive::Plane,
            plane(Vec3::new(0.0, h * 0.5, w * 0.5), l, h, Quat::from_rotation_y(PI)),
            None,
        )
        .with_opacity(FRONT_WALL_OPACITY),
    );
    scene.add_surface(Surface::new(
        "Ceiling",
        Primitive::Plane,
        plane(Vec3::new(0.0, h, 0.0), l, w, Quat::from_rotation_x(FRAC_PI_2)),
        None,
    ));
}

fn add_kitchen(scene: &mut Scene, d: Dimensions) {
    let (l, w, h) = (d.length, d.width, d.height);

    let island = Vec3::new(l * 0.25, h * 0.4, w * 0.15);
    let island_z = w * 0.1;
    scene.add_surface(Surface::new(
        "Kitchen Island",
        Primitive::Box,
        solid(Vec3::new(0.0, island.y * 0.5, island_z), island),
        Some(CategoryTag::Cabinets),
    ));

    let top_thickness = h * 0.02;
    scene.add_surface(Surface::new(
        "Island Countertop",
        Primitive::Box,
        solid(
            Vec3::new(0.0, island.y + top_thickness * 0.5, island_z),
            Vec3::new(island.x * 1.05, top_thickness, island.z * 1.05),
        ),
        Some(CategoryTag::Countertops),
    ));

    let cabinets = Vec3::new(l * 0.5, h * 0.2, w * 0.06);
    scene.add_surface(Surface::new(
        "Wall Cabinets",
        Primitive::Box,
        solid(
            Vec3::new(0.0, h * 0.7, -w * 0.5 + cabinets.z * 0.5),
            cabinets,
        ),
        Some(CategoryTag::Cabinets),
    ));

    // Sits just proud of the back wall so the two never z-fight.
    scene.add_surface(Surface::new(
        "Backsplash",
        Primitive::Plane,
        plane(
            Vec3::new(0.0, h * 0.5, -w * 0.5 + w * 0.002),
            l * 0.5,
            h * 0.15,
            Quat::IDENTITY,
        ),
        Some(CategoryTag::Backsplash),
    ));
}

fn add_bathroom(scene: &mut Scene, d: Dimensions) {
    let (l, w, h) = (d.length, d.width, d.height);
    let back = -w * 0.5;

    let vanity = Vec3::new(l * 0.2, h * 0.35, w * 0.12);
    let vanity_x = -l * 0.35;
    scene.add_surface(Surface::new(
        "Vanity",
        Primitive::Box,
        solid(
            Vec3::new(vanity_x, vanity.y * 0.5, back + vanity.z * 0.5),
            vanity,
        ),
        Some(CategoryTag::Cabinets),
    ));

    let top = Vec3::new(vanity.x * 1.05, h * 0.02, vanity.z * 1.05);
    scene.add_surface(Surface::new(
        "Vanity Countertop",
        Primitive::Box,
        solid(
            Vec3::new(vanity_x, vanity.y + top.y * 0.5, back + top.z * 0.5),
            top,
        ),
        Some(CategoryTag::Countertops),
    ));

    let shower = Vec3::new(l * 0.2, h * 0.8, w * 0.25);
    scene.add_surface(
        Surface::new(
            "Shower",
            Primitive::Box,
            solid(
                Vec3::new(l * 0.38, shower.y * 0.5, back + shower.z * 0.5),
                shower,
            ),
            Some(CategoryTag::Tiles),
        )
        .with_opacity(SHOWER_OPACITY),
    );

    let tub = Vec3::new(l * 0.3, h * 0.15, w * 0.18);
    scene.add_surface(Surface::new(
        "Bathtub",
        Primitive::Box,
        solid(Vec3::new(-l * 0.05, tub.y * 0.5, back + tub.z * 0.5), tub),
        Some(CategoryTag::Fixtures),
    ));
}
