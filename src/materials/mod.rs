//! Host material catalog and the per-category selection table.
//!
//! The catalog is owned by the host and never mutated here. [`MaterialBindings`]
//! maps each category present in the room to the selected material and pushes
//! that material's color onto every surface of the category.

use crate::scene::{CategoryTag, Rgb, Scene};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct MaterialId(pub u64);

impl std::fmt::Display for MaterialId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub category: CategoryTag,
    pub color: Rgb,
    #[serde(alias = "pricePerArea")]
    pub price_per_area: f64,
    #[serde(default)]
    pub description: String,
}

/// Ordered list of host materials. Order defines the cycle order within a category.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct MaterialCatalog {
    entries: Vec<Material>,
}

impl MaterialCatalog {
    pub fn new(entries: Vec<Material>) -> Self {
        Self { entries }
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.entries.iter().find(|m| m.id == id)
    }

    pub fn in_category<'a>(&'a self, category: &'a CategoryTag) -> impl Iterator<Item = &'a Material> {
        self.entries.iter().filter(move |m| &m.category == category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `category -> selected material id`, as exchanged with the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SelectionTable(BTreeMap<CategoryTag, MaterialId>);

impl SelectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, category: &CategoryTag) -> Option<MaterialId> {
        self.0.get(category).copied()
    }

    pub fn set(&mut self, category: CategoryTag, id: MaterialId) -> Option<MaterialId> {
        self.0.insert(category, id)
    }

    pub fn remove(&mut self, category: &CategoryTag) -> Option<MaterialId> {
        self.0.remove(category)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CategoryTag, &MaterialId)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(CategoryTag, MaterialId)> for SelectionTable {
    fn from_iter<T: IntoIterator<Item = (CategoryTag, MaterialId)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebindOutcome {
    /// Number of surfaces whose color changed hands.
    Repainted(usize),
    /// The id is not in the catalog; nothing changed.
    MissingCatalogEntry(MaterialId),
}

/// Next material in `category` after `current`, wrapping around.
///
/// `current` is re-resolved against the catalog on every call. When it is
/// absent (or `None`) the first material of the category is returned. `None`
/// means the category has no materials at all.
pub fn next_material(
    catalog: &MaterialCatalog,
    category: &CategoryTag,
    current: Option<MaterialId>,
) -> Option<MaterialId> {
    let ids: Vec<MaterialId> = catalog.in_category(category).map(|m| m.id).collect();
    if ids.is_empty() {
        return None;
    }
    let next = current
        .and_then(|id| ids.iter().position(|candidate| *candidate == id))
        .map(|index| (index + 1) % ids.len())
        .unwrap_or(0);
    Some(ids[next])
}

/// Selection table bound to one scene.
#[derive(Debug, Clone, Default)]
pub struct MaterialBindings {
    table: SelectionTable,
}

impl MaterialBindings {
    /// Seeds the table from host selections, keeping only categories the room
    /// actually contains, and paints every valid selection onto the scene.
    pub fn new(scene: &mut Scene, catalog: &MaterialCatalog, selections: &SelectionTable) -> Self {
        let present = scene.categories();
        let mut bindings = Self::default();
        for (category, id) in selections.iter() {
            if present.contains(category) {
                bindings.rebind(scene, catalog, category, *id);
            }
        }
        bindings
    }

    /// Records `id` for `category` and repaints every surface of that category.
    pub fn rebind(
        &mut self,
        scene: &mut Scene,
        catalog: &MaterialCatalog,
        category: &CategoryTag,
        id: MaterialId,
    ) -> RebindOutcome {
        let Some(material) = catalog.get(id) else {
            log::debug!("material {id} for category {category} not in catalog; keeping current binding");
            return RebindOutcome::MissingCatalogEntry(id);
        };

        self.table.set(category.clone(), id);
        let mut repainted = 0;
        for surface in scene.surfaces_in_mut(category) {
            surface.color = material.color;
            repainted += 1;
        }
        RebindOutcome::Repainted(repainted)
    }

    /// Re-applies every recorded binding, e.g. after the catalog changed.
    pub fn apply_all(&mut self, scene: &mut Scene, catalog: &MaterialCatalog) {
        let current: Vec<(CategoryTag, MaterialId)> =
            self.table.iter().map(|(c, id)| (c.clone(), *id)).collect();
        for (category, id) in current {
            if let RebindOutcome::MissingCatalogEntry(_) = self.rebind(scene, catalog, &category, id) {
                self.table.remove(&category);
            }
        }
    }

    /// Applies host selections on top of the current table.
    pub fn update(&mut self, scene: &mut Scene, catalog: &MaterialCatalog, selections: &SelectionTable) {
        let present = scene.categories();
        for (category, id) in selections.iter() {
            if present.contains(category) && self.table.get(category) != Some(*id) {
                self.rebind(scene, catalog, category, *id);
            }
        }
    }

    pub fn selected(&self, category: &CategoryTag) -> Option<MaterialId> {
        self.table.get(category)
    }

    pub fn table(&self) -> &SelectionTable {
        &self.table
    }

    /// Advances `category` one step through the catalog and repaints.
    pub fn cycle(
        &mut self,
        scene: &mut Scene,
        catalog: &MaterialCatalog,
        category: &CategoryTag,
    ) -> Option<MaterialId> {
        let next = next_material(catalog, category, self.selected(category))?;
        self.rebind(scene, catalog, category, next);
        Some(next)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostLine {
    pub category: CategoryTag,
    pub area: f32,
    pub material: Option<MaterialId>,
    pub price_per_area: f64,
    pub total: f64,
}

/// Per-category cost of the current selections, in first-appearance order.
pub fn estimate_costs(scene: &Scene, catalog: &MaterialCatalog, table: &SelectionTable) -> Vec<CostLine> {
    scene
        .categories()
        .into_iter()
        .map(|category| {
            let area = scene.category_area(&category);
            let material = table.get(&category).and_then(|id| catalog.get(id));
            let price_per_area = material.map(|m| m.price_per_area).unwrap_or(0.0);
            CostLine {
                area,
                material: material.map(|m| m.id),
                price_per_area,
                total: area as f64 * price_per_area,
                category,
            }
        })
        .collect()
}
