//! roomviz: an interactive 3D viewer for a parametric room.
//!
//! The host supplies a room type, its dimensions, a material catalog and the
//! current per-category selections. The viewer builds the room, lights it, and
//! lets the user orbit around it and click surfaces to cycle their materials.

pub mod app;
pub mod config;
pub mod materials;
pub mod render;
pub mod scene;
pub mod ui;
