use crate::materials::{CostLine, MaterialCatalog, MaterialId};
use crate::scene::{CategoryTag, LightingState, RoomType};
use crate::scene::lighting::{MAX_INTENSITY, MIN_INTENSITY};

/// Read-only view of the viewer the panel renders from.
pub struct UiSnapshot<'a> {
    pub room_type: RoomType,
    pub lighting: LightingState,
    pub selected_label: Option<&'a str>,
    pub catalog: &'a MaterialCatalog,
    pub costs: &'a [CostLine],
    pub session_name: &'a str,
    pub status: Option<&'a str>,
}

/// What the user asked for this frame.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UiActions {
    pub lighting: Option<LightingState>,
    pub reset_camera: bool,
    pub open_session: bool,
    pub select: Option<(CategoryTag, MaterialId)>,
}

impl UiActions {
    pub fn is_empty(&self) -> bool {
        *self == UiActions::default()
    }
}

pub struct UiState {
    show_panel: bool,
}

impl UiState {
    pub fn new() -> Self {
        Self { show_panel: true }
    }

    pub fn toggle_panel(&mut self) {
        self.show_panel = !self.show_panel;
    }

    pub fn show(&mut self, ctx: &egui::Context, snapshot: &UiSnapshot<'_>) -> UiActions {
        let mut actions = UiActions::default();
        if !self.show_panel {
            return actions;
        }

        egui::Window::new("Room")
            .default_pos(egui::pos2(12.0, 12.0))
            .resizable(false)
            .show(ctx, |ui| {
                ui.label(format!(
                    "{} ({})",
                    snapshot.session_name,
                    snapshot.room_type.as_str()
                ));
                if ui.button("Open session…").clicked() {
                    actions.open_session = true;
                }
                ui.separator();

                let mut lighting = snapshot.lighting;
                let mut changed = ui.checkbox(&mut lighting.is_day, "Daylight").changed();
                changed |= ui
                    .add(
                        egui::Slider::new(&mut lighting.intensity, MIN_INTENSITY..=MAX_INTENSITY)
                            .text("Intensity"),
                    )
                    .changed();
                if changed {
                    actions.lighting = Some(lighting);
                }
                if ui.button("Reset camera").clicked() {
                    actions.reset_camera = true;
                }
                ui.separator();

                match snapshot.selected_label {
                    Some(label) => ui.strong(format!("Selected: {label}")),
                    None => ui.weak("Click a surface to cycle its material"),
                };
                ui.separator();

                self.selection_grid(ui, snapshot, &mut actions);

                if let Some(status) = snapshot.status {
                    ui.separator();
                    ui.colored_label(egui::Color32::LIGHT_RED, status);
                }
            });
        actions
    }

    fn selection_grid(&self, ui: &mut egui::Ui, snapshot: &UiSnapshot<'_>, actions: &mut UiActions) {
        let mut total = 0.0;
        egui::Grid::new("selections")
            .num_columns(4)
            .striped(true)
            .show(ui, |ui| {
                ui.strong("Category");
                ui.strong("Material");
                ui.strong("Area");
                ui.strong("Cost");
                ui.end_row();

                for line in snapshot.costs {
                    ui.label(line.category.as_str());

                    let current = line.material;
                    let selected_text = current
                        .and_then(|id| snapshot.catalog.get(id))
                        .map(|m| m.description.clone())
                        .unwrap_or_else(|| "none".to_string());
                    let mut choice = current;
                    egui::ComboBox::from_id_salt(("material", line.category.as_str()))
                        .selected_text(selected_text)
                        .show_ui(ui, |ui| {
                            for material in snapshot.catalog.in_category(&line.category) {
                                ui.selectable_value(
                                    &mut choice,
                                    Some(material.id),
                                    format!(
                                        "{} ({})",
                                        material.description,
                                        format_price(material.price_per_area)
                                    ),
                                );
                            }
                        });
                    if let Some(id) = choice.filter(|id| Some(*id) != current) {
                        actions.select = Some((line.category.clone(), id));
                    }

                    ui.label(format!("{:.1}", line.area));
                    ui.label(format_price(line.total));
                    ui.end_row();
                    total += line.total;
                }
            });
        ui.label(format!("Estimated total: {}", format_price(total)));
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn format_price(amount: f64) -> String {
    format!("${amount:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_panel_requests_nothing() {
        let ctx = egui::Context::default();
        let catalog = MaterialCatalog::default();
        let costs = [CostLine {
            category: CategoryTag::Paint,
            area: 120.0,
            material: None,
            price_per_area: 0.0,
            total: 0.0,
        }];
        let snapshot = UiSnapshot {
            room_type: RoomType::Kitchen,
            lighting: LightingState::default(),
            selected_label: Some("Back Wall"),
            catalog: &catalog,
            costs: &costs,
            session_name: "demo",
            status: None,
        };

        let mut ui = UiState::new();
        let mut actions = UiActions::default();
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            actions = ui.show(ctx, &snapshot);
        });
        assert!(actions.is_empty());
    }

    #[test]
    fn prices_show_cents() {
        assert_eq!(format_price(1234.5), "$1234.50");
    }
}
