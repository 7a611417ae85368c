// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Video timeline scrubber control.
//!
//! This module provides the timeline scrubber for navigating through
//! video frames and selecting the frame to annotate.

/// Show the frame slider. Returns the frame the user moved to, if any.
pub fn show(ui: &mut egui::Ui, current_frame: usize, frame_count: usize) -> Option<usize> {
    let last = frame_count.saturating_sub(1);
    let mut frame = current_frame;

    ui.horizontal(|ui| {
        if ui.small_button("⏮").on_hover_text("First frame").clicked() {
            frame = 0;
        }
        ui.spacing_mut().slider_width = (ui.available_width() - 160.0).max(100.0);
        ui.add(egui::Slider::new(&mut frame, 0..=last).text(format!("/ {}", last)));
        if ui.small_button("⏭").on_hover_text("Last frame").clicked() {
            frame = last;
        }
    });

    (frame != current_frame).then_some(frame)
}
