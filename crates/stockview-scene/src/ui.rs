//! Legend panel and inspection dialog

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use stockview_core::config::Palette;
use stockview_core::{OccupancyTier, Rgb};

use crate::controller::{InspectionDialog, InteractionController};
use crate::types::{HoveredBin, UiLayout};

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(EguiPrimaryContextPass, ui_system);
    }
}

fn swatch_color(rgb: Rgb, alpha: f32) -> egui::Color32 {
    let [r, g, b] = rgb.0.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    egui::Color32::from_rgba_unmultiplied(r, g, b, (alpha.clamp(0.0, 1.0) * 255.0).round() as u8)
}

fn ui_system(
    mut contexts: EguiContexts,
    mut controller: ResMut<InteractionController>,
    hovered: Res<HoveredBin>,
    ui_layout: Res<UiLayout>,
) {
    if !controller.is_rendering() {
        return;
    }
    let Ok(ctx) = contexts.ctx_mut() else { return };

    if ui_layout.show_legend {
        egui::Window::new("Legend")
            .collapsible(true)
            .resizable(false)
            .anchor(egui::Align2::LEFT_TOP, egui::vec2(10.0, 10.0))
            .show(ctx, |ui| {
                render_legend(ui, &controller.config().palette, hovered.0.as_deref(), &ui_layout);
            });
    }

    let dismissed = controller
        .dialog()
        .map(|dialog| render_inspection_dialog(ctx, dialog, &ui_layout))
        .unwrap_or(false);
    if dismissed {
        controller.dismiss_dialog();
    }
}

/// Occupancy tiers with their colors, plus the hovered bin
pub fn render_legend(ui: &mut egui::Ui, palette: &Palette, hovered: Option<&str>, ui_layout: &UiLayout) {
    let ui_scale = ui_layout.ui_scale();

    for tier in OccupancyTier::ALL {
        // Unknown shares the inactive swatch
        if tier == OccupancyTier::Unknown {
            continue;
        }
        let appearance = palette.appearance(tier);
        ui.horizontal(|ui| {
            let (rect, _) = ui.allocate_exact_size(egui::vec2(12.0 * ui_scale, 12.0 * ui_scale), egui::Sense::hover());
            ui.painter()
                .rect_filled(rect, 2.0, swatch_color(appearance.color, appearance.opacity.max(0.5)));
            ui.label(egui::RichText::new(tier.label()).size(13.0 * ui_scale));
        });
    }

    ui.separator();
    match hovered {
        Some(code) => ui.label(egui::RichText::new(code).strong()),
        None => ui.label(egui::RichText::new("Double-click a bin to list its products").small().color(egui::Color32::GRAY)),
    };
}

/// Modal listing the products of the inspected bin. Returns true when dismissed.
pub fn render_inspection_dialog(ctx: &egui::Context, dialog: &InspectionDialog, ui_layout: &UiLayout) -> bool {
    let mut dismissed = false;

    egui::Window::new(dialog.title())
        .id(egui::Id::new("inspection_dialog"))
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .show(ctx, |ui| {
            ui.set_min_width(ui_layout.dialog_width());

            if dialog.is_loading() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading products…");
                });
            } else {
                let lines = dialog.lines();
                if lines.is_empty() {
                    ui.label(egui::RichText::new("No products stored here").color(egui::Color32::GRAY));
                } else {
                    egui::ScrollArea::vertical().max_height(300.0).show(ui, |ui| {
                        for line in &lines {
                            ui.label(line);
                        }
                    });
                }
                if let Some(error) = &dialog.error {
                    ui.colored_label(egui::Color32::RED, error);
                }
            }

            ui.add_space(12.0);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
            });
        });

    if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        dismissed = true;
    }
    dismissed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swatch_color() {
        let color = swatch_color(Rgb([1.0, 0.0, 0.0]), 0.6);
        assert_eq!(color, egui::Color32::from_rgba_unmultiplied(255, 0, 0, 153));
    }
}
