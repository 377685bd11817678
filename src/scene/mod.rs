pub mod geometry;
pub mod lighting;
pub mod room;

pub use geometry::{Aabb, Primitive, Transform};
pub use lighting::LightingState;
pub use room::{build, BuildError, Dimensions, RoomType};

use glam::{Mat4, Vec3};
use std::fmt;

/// Material category a surface belongs to. Surfaces sharing a category always
/// carry the same applied material.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CategoryTag {
    Flooring,
    Paint,
    Cabinets,
    Countertops,
    Backsplash,
    Tiles,
    Fixtures,
    Other(String),
}

impl CategoryTag {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "flooring" => Self::Flooring,
            "paint" => Self::Paint,
            "cabinets" => Self::Cabinets,
            "countertops" => Self::Countertops,
            "backsplash" => Self::Backsplash,
            "tiles" => Self::Tiles,
            "fixtures" => Self::Fixtures,
            _ => Self::Other(value.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Flooring => "flooring",
            Self::Paint => "paint",
            Self::Cabinets => "cabinets",
            Self::Countertops => "countertops",
            Self::Backsplash => "backsplash",
            Self::Tiles => "tiles",
            Self::Fixtures => "fixtures",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for CategoryTag {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&str> for CategoryTag {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<CategoryTag> for String {
    fn from(value: CategoryTag) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for CategoryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid color '{0}': expected #rrggbb")]
pub struct ColorParseError(String);

/// Linear-ish RGB in `0..=1`, serialized as a `#rrggbb` hex string.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(value: &str) -> Result<Self, ColorParseError> {
        let digits = value.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorParseError(value.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|_| ColorParseError(value.to_string()))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn to_hex(&self) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))
    }

    pub fn scaled(&self, factor: f32) -> [f32; 3] {
        [self.r * factor, self.g * factor, self.b * factor]
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub u32);

/// A single renderable mesh of the room.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    pub id: SurfaceId,
    pub label: String,
    pub geometry: Primitive,
    pub transform: Transform,
    pub category: Option<CategoryTag>,
    pub color: Rgb,
    pub opacity: f32,
}

impl Surface {
    pub fn new(
        label: impl Into<String>,
        geometry: Primitive,
        transform: Transform,
        category: Option<CategoryTag>,
    ) -> Self {
        let color = default_color(category.as_ref());
        Self {
            id: SurfaceId(0),
            label: label.into(),
            geometry,
            transform,
            category,
            color,
            opacity: 1.0,
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn is_tagged(&self) -> bool {
        self.category.is_some()
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.transform.matrix()
    }

    pub fn world_bounds(&self) -> Aabb {
        self.geometry.local_bounds().transformed(&self.world_matrix())
    }

    /// World-space normal of a single-sided surface's front face.
    pub fn front_normal(&self) -> Option<Vec3> {
        self.geometry
            .is_single_sided()
            .then(|| (self.transform.rotation * Vec3::Z).normalize())
    }

    pub fn area(&self) -> f32 {
        self.geometry.surface_area(self.transform.scale)
    }
}

/// Color a surface carries before any material is bound to it.
fn default_color(category: Option<&CategoryTag>) -> Rgb {
    match category {
        None => Rgb::new(0.92, 0.92, 0.9),
        Some(CategoryTag::Flooring) => Rgb::new(0.62, 0.48, 0.34),
        Some(CategoryTag::Paint) => Rgb::new(0.86, 0.84, 0.8),
        Some(CategoryTag::Cabinets) => Rgb::new(0.55, 0.42, 0.3),
        Some(CategoryTag::Countertops) => Rgb::new(0.8, 0.8, 0.78),
        Some(CategoryTag::Backsplash) => Rgb::new(0.75, 0.78, 0.8),
        Some(CategoryTag::Tiles) => Rgb::new(0.7, 0.82, 0.88),
        Some(CategoryTag::Fixtures) => Rgb::new(0.96, 0.96, 0.96),
        Some(CategoryTag::Other(_)) => Rgb::new(0.7, 0.7, 0.7),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Ambient {
        color: Rgb,
        intensity: f32,
    },
    Directional {
        color: Rgb,
        intensity: f32,
        /// Direction the light travels in.
        direction: Vec3,
    },
    Point {
        color: Rgb,
        intensity: f32,
        position: Vec3,
        range: f32,
    },
}

/// Everything drawn for one mounted viewer: the room surfaces and lights.
#[derive(Debug, Clone)]
pub struct Scene {
    room_type: RoomType,
    dimensions: Dimensions,
    surfaces: Vec<Surface>,
    lights: Vec<Light>,
}

impl Scene {
    pub fn new(room_type: RoomType, dimensions: Dimensions) -> Self {
        Self {
            room_type,
            dimensions,
            surfaces: Vec::new(),
            lights: Vec::new(),
        }
    }

    pub fn room_type(&self) -> RoomType {
        self.room_type
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Point the camera orbits: the room center at half height.
    pub fn center(&self) -> Vec3 {
        Vec3::new(0.0, self.dimensions.height * 0.5, 0.0)
    }

    /// Interior volume of the enclosure.
    pub fn bounds(&self) -> Aabb {
        let d = self.dimensions;
        Aabb::new(
            Vec3::new(-d.length * 0.5, 0.0, -d.width * 0.5),
            Vec3::new(d.length * 0.5, d.height, d.width * 0.5),
        )
    }

    pub fn add_surface(&mut self, mut surface: Surface) -> SurfaceId {
        let id = SurfaceId(self.surfaces.len() as u32);
        surface.id = id;
        self.surfaces.push(surface);
        id
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&Surface> {
        self.surfaces.get(id.0 as usize)
    }

    pub fn tagged_surfaces(&self) -> impl Iterator<Item = &Surface> {
        self.surfaces.iter().filter(|s| s.is_tagged())
    }

    pub fn surfaces_in<'a>(&'a self, category: &'a CategoryTag) -> impl Iterator<Item = &'a Surface> {
        self.surfaces
            .iter()
            .filter(move |s| s.category.as_ref() == Some(category))
    }

    pub fn surfaces_in_mut<'a>(
        &'a mut self,
        category: &'a CategoryTag,
    ) -> impl Iterator<Item = &'a mut Surface> {
        self.surfaces
            .iter_mut()
            .filter(move |s| s.category.as_ref() == Some(category))
    }

    /// Categories present in the room, in first-appearance order.
    pub fn categories(&self) -> Vec<CategoryTag> {
        let mut out: Vec<CategoryTag> = Vec::new();
        for category in self.surfaces.iter().filter_map(|s| s.category.as_ref()) {
            if !out.contains(category) {
                out.push(category.clone());
            }
        }
        out
    }

    /// Total area covered by surfaces of `category`.
    pub fn category_area(&self, category: &CategoryTag) -> f32 {
        self.surfaces_in(category).map(Surface::area).sum()
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn set_lights(&mut self, lights: Vec<Light>) {
        self.lights = lights;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_strings() {
        let tags: Vec<CategoryTag> =
            serde_json::from_str(r#"["paint", "Cabinets", "wallpaper"]"#).unwrap();
        assert_eq!(
            tags,
            vec![
                CategoryTag::Paint,
                CategoryTag::Cabinets,
                CategoryTag::Other("wallpaper".to_string())
            ]
        );
        assert_eq!(serde_json::to_string(&tags[0]).unwrap(), "\"paint\"");
    }

    #[test]
    fn hex_colors_parse_and_print() {
        let color = Rgb::from_hex("#ff8000").unwrap();
        assert_eq!(color.r, 1.0);
        assert!((color.g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(color.b, 0.0);
        assert_eq!(color.to_hex(), "#ff8000");
        assert!(Rgb::from_hex("orange").is_err());
        // integer parsing alone would take the sign characters
        assert!(Rgb::from_hex("#+f+f+f").is_err());
        assert!(Rgb::from_hex("#-1-1-1").is_err());
        assert!(serde_json::from_str::<Rgb>("\"#12345\"").is_err());
    }

    #[test]
    fn surfaces_get_sequential_ids() {
        let mut scene = Scene::new(RoomType::Other, Dimensions::new(4.0, 3.0, 2.5));
        let a = scene.add_surface(Surface::new(
            "A",
            Primitive::Plane,
            Transform::default(),
            Some(CategoryTag::Paint),
        ));
        let b = scene.add_surface(Surface::new("B", Primitive::Box, Transform::default(), None));
        assert_eq!(a, SurfaceId(0));
        assert_eq!(b, SurfaceId(1));
        assert_eq!(scene.surface(b).map(|s| s.label.as_str()), Some("B"));
        assert_eq!(scene.tagged_surfaces().count(), 1);
        assert_eq!(scene.categories(), vec![CategoryTag::Paint]);
    }
}
