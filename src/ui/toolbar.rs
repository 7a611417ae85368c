// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar with marker colour selection and playback controls.

use vidnote::Category;

/// Result of toolbar interaction.
pub enum ToolbarAction {
    None,
    TogglePlayback,
    Save,
    Undo,
    Redo,
}

fn swatch(category: Category) -> egui::Color32 {
    let [r, g, b] = category.rgb();
    egui::Color32::from_rgb(r, g, b)
}

/// Display the toolbar.
pub fn show(
    ui: &mut egui::Ui,
    category: &mut Category,
    playing: bool,
    can_undo: bool,
    can_redo: bool,
) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        egui::ComboBox::from_label("Marker colour")
            .selected_text(egui::RichText::new(category.name()).color(swatch(*category)))
            .show_ui(ui, |ui| {
                for option in Category::ALL {
                    ui.selectable_value(
                        &mut *category,
                        option,
                        egui::RichText::new(option.name()).color(swatch(option)),
                    );
                }
            });

        ui.separator();

        let play_label = if playing { "⏸ Pause" } else { "▶ Play" };
        if ui.button(play_label).clicked() {
            action = ToolbarAction::TogglePlayback;
        }
        if ui.add_enabled(can_undo, egui::Button::new("Undo")).clicked() {
            action = ToolbarAction::Undo;
        }
        if ui.add_enabled(can_redo, egui::Button::new("Redo")).clicked() {
            action = ToolbarAction::Redo;
        }
        if ui.button("Save").clicked() {
            action = ToolbarAction::Save;
        }

        ui.separator();

        ui.label(
            egui::RichText::new(
                "Double-click: point · Drag: arrow · Click arrow end: select · ↑/↓: rotate · Backspace: delete · Shift+Backspace: remove last point · ←/→: step",
            )
            .italics()
            .weak(),
        );
    });

    action
}
