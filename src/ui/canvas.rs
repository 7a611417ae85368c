// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing canvas for frame display and annotation.
//!
//! [`CanvasRenderer`] receives frames and overlays from the session and keeps
//! them as an egui texture plus a copy of the marks. [`show`] paints that
//! state and translates pointer input on the frame into gesture events in
//! frame coordinates.

use vidnote::io::media::Frame;
use vidnote::render::{Overlay, Renderer};
use vidnote::util::geometry::FrameTransform;
use vidnote::{ArrowId, ArrowMark, Category, GestureEvent, Point, PointMark};

const POINT_RADIUS: f32 = 6.0;
const ENDPOINT_RADIUS: f32 = 3.0;

/// Last frame and overlay handed over by the session.
pub struct CanvasRenderer {
    ctx: egui::Context,
    texture: Option<egui::TextureHandle>,
    texture_frame: Option<usize>,
    frame_size: (u32, u32),
    points: Vec<PointMark>,
    arrows: Vec<(ArrowId, ArrowMark)>,
    provisional: Option<(Point, Point)>,
    selected: Option<ArrowId>,
}

impl CanvasRenderer {
    pub fn new(ctx: egui::Context) -> Self {
        Self {
            ctx,
            texture: None,
            texture_frame: None,
            frame_size: (0, 0),
            points: Vec::new(),
            arrows: Vec::new(),
            provisional: None,
            selected: None,
        }
    }
}

impl Renderer for CanvasRenderer {
    fn render(&mut self, frame: &Frame, overlay: &Overlay<'_>) {
        // Only upload pixels when the frame itself changed
        if self.texture_frame != Some(frame.index) || self.texture.is_none() {
            let size = [frame.width() as usize, frame.height() as usize];
            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, frame.image.as_raw());
            match &mut self.texture {
                Some(texture) => texture.set(color_image, egui::TextureOptions::LINEAR),
                None => {
                    self.texture = Some(self.ctx.load_texture(
                        "video_frame",
                        color_image,
                        egui::TextureOptions::LINEAR,
                    ))
                }
            }
            self.texture_frame = Some(frame.index);
            self.frame_size = (frame.width(), frame.height());
        }

        self.points = overlay.marks.points().copied().collect();
        self.arrows = overlay.marks.arrows().map(|(id, arrow)| (id, *arrow)).collect();
        self.provisional = overlay.provisional;
        self.selected = overlay.selected;
    }
}

fn colour(category: Category) -> egui::Color32 {
    let [r, g, b] = category.rgb();
    egui::Color32::from_rgb(r, g, b)
}

/// Display the canvas and collect gesture events from pointer input.
pub fn show(ui: &mut egui::Ui, renderer: &CanvasRenderer) -> Vec<GestureEvent> {
    let mut events = Vec::new();
    // Set background color
    ui.style_mut().visuals.extreme_bg_color = egui::Color32::from_gray(40);

    let Some(texture) = &renderer.texture else {
        ui.centered_and_justified(|ui| {
            ui.label(egui::RichText::new("Loading frame...").color(egui::Color32::WHITE));
        });
        return events;
    };

    // Fit the frame in the available space, centered
    let available = ui.available_rect_before_wrap();
    let (frame_width, frame_height) = renderer.frame_size;
    let transform = FrameTransform::fit(
        frame_width,
        frame_height,
        available.min.x as f64,
        available.min.y as f64,
        available.width() as f64,
        available.height() as f64,
    );
    let to_screen = |p: Point| {
        let (x, y) = transform.to_screen(p);
        egui::pos2(x as f32, y as f32)
    };
    let to_frame = |pos: egui::Pos2| transform.to_frame(pos.x as f64, pos.y as f64);

    let image_rect = egui::Rect::from_min_max(
        to_screen(Point::new(0.0, 0.0)),
        to_screen(Point::new(frame_width as f64, frame_height as f64)),
    );
    let response = ui.allocate_rect(image_rect, egui::Sense::click_and_drag());

    // Pointer input. The shell decides what kind of gesture happened.
    if response.double_clicked() {
        if let Some(pos) = response.interact_pointer_pos() {
            events.push(GestureEvent::PointCreate(to_frame(pos)));
        }
    } else if response.clicked() {
        // A click without movement selects an arrow end or is discarded
        if let Some(pos) = response.interact_pointer_pos() {
            let at = to_frame(pos);
            events.push(GestureEvent::ArrowStart(at));
            events.push(GestureEvent::ArrowRelease(at));
        }
    }
    if response.drag_started() {
        if let Some(origin) = ui.input(|i| i.pointer.press_origin()) {
            events.push(GestureEvent::ArrowStart(to_frame(origin)));
        }
    }
    if response.dragged() {
        if let Some(pos) = response.interact_pointer_pos() {
            events.push(GestureEvent::ArrowDrag(to_frame(pos)));
        }
    }
    if response.drag_stopped() {
        let pos = response
            .interact_pointer_pos()
            .or_else(|| ui.input(|i| i.pointer.latest_pos()));
        if let Some(pos) = pos {
            events.push(GestureEvent::ArrowRelease(to_frame(pos)));
        }
    }

    let painter = ui.painter_at(image_rect);

    // Draw the frame
    painter.image(
        texture.id(),
        image_rect,
        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
        egui::Color32::WHITE,
    );

    for point in &renderer.points {
        let center = to_screen(point.position());
        painter.circle_filled(center, POINT_RADIUS, colour(point.category));
        painter.circle_stroke(center, POINT_RADIUS, egui::Stroke::new(1.0, egui::Color32::BLACK));
    }

    for (id, arrow) in &renderer.arrows {
        let start = to_screen(arrow.start);
        let head = to_screen(arrow.head);
        let stroke = if renderer.selected == Some(*id) {
            egui::Stroke::new(3.0, egui::Color32::YELLOW)
        } else {
            egui::Stroke::new(2.0, colour(arrow.category))
        };
        painter.arrow(start, head - start, stroke);
        painter.circle_filled(start, ENDPOINT_RADIUS, stroke.color);
    }

    if let Some((start, head)) = renderer.provisional {
        let start = to_screen(start);
        painter.arrow(
            start,
            to_screen(head) - start,
            egui::Stroke::new(2.0, egui::Color32::LIGHT_BLUE),
        );
    }

    events
}
