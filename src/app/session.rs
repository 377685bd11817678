//! Host session file: which room to show, the material catalog and the
//! per-category selections the host persists between runs.

use crate::config::ViewerConfig;
use crate::materials::{Material, MaterialCatalog, MaterialId, SelectionTable};
use crate::render::{MaterialChange, ViewerProps};
use crate::scene::{CategoryTag, Dimensions, LightingState, Rgb, RoomType};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HostSession {
    pub room_type: RoomType,
    pub dimensions: Dimensions,
    #[serde(default)]
    pub catalog: MaterialCatalog,
    #[serde(default)]
    pub selections: SelectionTable,
    #[serde(default)]
    pub lighting: LightingState,
    #[serde(default)]
    pub config: ViewerConfig,
}

impl HostSession {
    pub fn props(&self) -> ViewerProps {
        ViewerProps {
            room_type: self.room_type,
            dimensions: self.dimensions,
            catalog: self.catalog.clone(),
            selections: self.selections.clone(),
        }
    }

    /// Records a pick-cycle result; the viewer receives the table back.
    pub fn apply_change(&mut self, change: &MaterialChange) {
        self.selections
            .set(change.category.clone(), change.material_id);
    }

    /// Built-in session used when no file is given.
    pub fn demo(room_type: RoomType) -> Self {
        let dimensions = match room_type {
            RoomType::Kitchen => Dimensions::new(14.0, 12.0, 9.0),
            RoomType::Bathroom => Dimensions::new(9.0, 8.0, 8.0),
            RoomType::Other => Dimensions::new(12.0, 10.0, 8.0),
        };
        let catalog = demo_catalog();
        let selections = [
            CategoryTag::Flooring,
            CategoryTag::Paint,
            CategoryTag::Cabinets,
            CategoryTag::Countertops,
            CategoryTag::Backsplash,
            CategoryTag::Tiles,
            CategoryTag::Fixtures,
        ]
        .into_iter()
        .filter_map(|category| {
            let first = catalog.in_category(&category).next()?.id;
            Some((category, first))
        })
        .collect();

        Self {
            room_type,
            dimensions,
            catalog,
            selections,
            lighting: LightingState::default(),
            config: ViewerConfig::default(),
        }
    }
}

fn demo_catalog() -> MaterialCatalog {
    let entries: [(u64, CategoryTag, Rgb, f64, &str); 17] = [
        (101, CategoryTag::Flooring, Rgb::new(0.55, 0.38, 0.22), 6.5, "White oak plank"),
        (102, CategoryTag::Flooring, Rgb::new(0.78, 0.76, 0.72), 4.0, "Porcelain tile, warm gray"),
        (103, CategoryTag::Flooring, Rgb::new(0.28, 0.2, 0.14), 8.25, "Walnut engineered wood"),
        (201, CategoryTag::Paint, Rgb::new(0.94, 0.93, 0.89), 0.45, "Eggshell, chalk white"),
        (202, CategoryTag::Paint, Rgb::new(0.62, 0.71, 0.66), 0.5, "Eggshell, sage"),
        (203, CategoryTag::Paint, Rgb::new(0.25, 0.32, 0.42), 0.55, "Matte, harbor blue"),
        (301, CategoryTag::Cabinets, Rgb::new(0.95, 0.95, 0.93), 120.0, "Shaker, painted white"),
        (302, CategoryTag::Cabinets, Rgb::new(0.2, 0.27, 0.35), 135.0, "Shaker, navy"),
        (303, CategoryTag::Cabinets, Rgb::new(0.6, 0.45, 0.3), 150.0, "Flat panel, rift oak"),
        (401, CategoryTag::Countertops, Rgb::new(0.92, 0.92, 0.9), 75.0, "Quartz, polar white"),
        (402, CategoryTag::Countertops, Rgb::new(0.18, 0.18, 0.2), 90.0, "Granite, absolute black"),
        (501, CategoryTag::Backsplash, Rgb::new(0.9, 0.92, 0.93), 22.0, "Subway tile, gloss white"),
        (502, CategoryTag::Backsplash, Rgb::new(0.4, 0.55, 0.6), 35.0, "Zellige, teal"),
        (601, CategoryTag::Tiles, Rgb::new(0.85, 0.88, 0.9), 18.0, "Hex mosaic, white"),
        (602, CategoryTag::Tiles, Rgb::new(0.45, 0.47, 0.5), 24.0, "Slate, charcoal"),
        (701, CategoryTag::Fixtures, Rgb::new(0.97, 0.97, 0.97), 40.0, "Enamel, gloss white"),
        (702, CategoryTag::Fixtures, Rgb::new(0.75, 0.74, 0.7), 55.0, "Stone resin, matte"),
    ];
    MaterialCatalog::new(
        entries
            .into_iter()
            .map(|(id, category, color, price_per_area, description)| Material {
                id: MaterialId(id),
                category,
                color,
                price_per_area,
                description: description.to_string(),
            })
            .collect(),
    )
}

pub fn save_session_to_file(session: &HostSession, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(session)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_session_from_file(path: &Path) -> Result<HostSession> {
    let json = std::fs::read_to_string(path)?;
    let session: HostSession = serde_json::from_str(&json)?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_selects_first_material_per_category() {
        let session = HostSession::demo(RoomType::Kitchen);
        assert_eq!(
            session.selections.get(&CategoryTag::Cabinets),
            Some(MaterialId(301))
        );
        assert_eq!(session.selections.len(), 7);
        assert!(session.dimensions.validate().is_ok());
    }

    #[test]
    fn minimal_session_file_uses_defaults() {
        let session: HostSession = serde_json::from_str(
            r#"{"room_type": "bathroom", "dimensions": {"length": 8, "width": 6, "height": 3}}"#,
        )
        .unwrap();
        assert_eq!(session.room_type, RoomType::Bathroom);
        assert!(session.catalog.is_empty());
        assert!(session.selections.is_empty());
        assert_eq!(session.lighting, LightingState::default());
        assert_eq!(session.config, ViewerConfig::default());
    }

    #[test]
    fn picked_changes_persist_via_file() {
        let mut session = HostSession::demo(RoomType::Kitchen);
        session.apply_change(&MaterialChange {
            category: CategoryTag::Paint,
            material_id: MaterialId(203),
            label: "Back Wall".to_string(),
        });

        let mut path = std::env::temp_dir();
        let nonce = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        path.push(format!("roomviz_session_{}_{}.json", std::process::id(), nonce));

        save_session_to_file(&session, &path).unwrap();
        let loaded = load_session_from_file(&path).unwrap();
        assert_eq!(loaded.selections.get(&CategoryTag::Paint), Some(MaterialId(203)));
        assert_eq!(loaded.catalog.len(), session.catalog.len());
        assert_eq!(loaded.selections, session.selections);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_session_from_file(Path::new("/nonexistent/roomviz.json")).unwrap_err();
        assert!(matches!(err, SessionError::Io(_)));
    }
}
