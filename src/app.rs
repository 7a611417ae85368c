// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! The app owns the session manager, the frame source and the canvas
//! renderer. Each egui frame it collects input from the toolbar, timeline,
//! keyboard and canvas, forwards it to the session as gesture events or
//! navigation calls, and asks the session to redraw when something changed.

use crate::ui::canvas::{self, CanvasRenderer};
use crate::ui::{timeline, toolbar};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use vidnote::io::media::FrameSource;
use vidnote::{GestureEvent, RotateDirection, Session, SessionManager};

/// Main application state.
pub struct VidnoteApp {
    sessions: SessionManager,

    /// Identifier of the video being annotated
    video_id: String,

    source: Box<dyn FrameSource>,

    renderer: CanvasRenderer,

    /// Where annotations are saved
    output: PathBuf,

    /// Whether frames advance automatically
    playing: bool,

    /// Time of the last playback step
    last_tick: Instant,

    /// Last status line message
    status: Option<String>,

    /// Set once the document has been written on close
    saved_on_close: bool,
}

impl VidnoteApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        sessions: SessionManager,
        video_id: String,
        source: Box<dyn FrameSource>,
        output: PathBuf,
    ) -> Self {
        Self {
            sessions,
            video_id,
            source,
            renderer: CanvasRenderer::new(cc.egui_ctx.clone()),
            output,
            playing: false,
            last_tick: Instant::now(),
            status: None,
            saved_on_close: false,
        }
    }

    fn session_mut(&mut self) -> Option<&mut Session> {
        match self.sessions.get_mut(&self.video_id) {
            Ok(session) => Some(session),
            Err(e) => {
                log::error!("{}", e);
                None
            }
        }
    }

    fn send(&mut self, event: GestureEvent) {
        if let Some(session) = self.session_mut() {
            // Errors are logged by the session and never fatal
            let _ = session.handle(event);
        }
    }

    fn step(&mut self, delta: isize) {
        self.playing = false;
        if let Some(session) = self.session_mut() {
            session.step_frame(delta);
        }
    }

    fn save(&mut self) {
        self.status = Some(match self.sessions.save(&self.output) {
            Ok(()) => format!("Saved to {}", self.output.display()),
            Err(e) => {
                log::error!("Failed to save annotations: {:#}", e);
                format!("Save failed: {}", e)
            }
        });
    }

    fn tick_playback(&mut self, ctx: &egui::Context) {
        if !self.playing {
            return;
        }
        let delay = Duration::from_millis(self.sessions.config().playback_delay_ms);
        if self.last_tick.elapsed() >= delay {
            self.last_tick = Instant::now();
            let advanced = self.session_mut().map(|s| s.advance()).unwrap_or(false);
            if !advanced {
                self.playing = false;
                log::info!("Reached the last frame");
            }
        }
        ctx.request_repaint_after(delay);
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (up, down, delete, escape, left, right, space) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::ArrowUp),
                i.key_pressed(egui::Key::ArrowDown),
                !i.modifiers.shift
                    && (i.key_pressed(egui::Key::Backspace) || i.key_pressed(egui::Key::Delete)),
                i.key_pressed(egui::Key::Escape),
                i.key_pressed(egui::Key::ArrowLeft),
                i.key_pressed(egui::Key::ArrowRight),
                i.key_pressed(egui::Key::Space),
            )
        });
        let (save, undo, redo, remove_point) = ctx.input(|i| {
            let command = i.modifiers.command;
            (
                command && i.key_pressed(egui::Key::S),
                command && !i.modifiers.shift && i.key_pressed(egui::Key::Z),
                (command && i.modifiers.shift && i.key_pressed(egui::Key::Z))
                    || (command && i.key_pressed(egui::Key::Y)),
                i.modifiers.shift && i.key_pressed(egui::Key::Backspace),
            )
        });

        if up {
            self.send(GestureEvent::Rotate(RotateDirection::Up));
        }
        if down {
            self.send(GestureEvent::Rotate(RotateDirection::Down));
        }
        if delete {
            self.send(GestureEvent::Delete);
        }
        if remove_point {
            if let Some(session) = self.session_mut() {
                session.remove_last_point();
            }
        }
        if escape {
            self.send(GestureEvent::Cancel);
        }
        if left {
            self.step(-1);
        }
        if right {
            self.step(1);
        }
        if space {
            self.toggle_playback();
        }
        if save {
            self.save();
        }
        if undo {
            if let Some(session) = self.session_mut() {
                session.undo();
            }
        }
        if redo {
            if let Some(session) = self.session_mut() {
                session.redo();
            }
        }
    }

    fn toggle_playback(&mut self) {
        self.playing = !self.playing;
        self.last_tick = Instant::now();
        if self.playing {
            // Playing starts a new frame, so drop any gesture in progress
            self.send(GestureEvent::FrameChange);
        }
    }

    fn redraw_if_requested(&mut self, ctx: &egui::Context) {
        let requested = self
            .session_mut()
            .map(|s| s.take_redraw_request())
            .unwrap_or(false);
        if !requested {
            return;
        }
        if let Err(e) = self
            .sessions
            .redraw(&self.video_id, self.source.as_mut(), &mut self.renderer)
        {
            log::error!("Failed to show frame: {}", e);
            self.status = Some(e.to_string());
        }
        ctx.request_repaint();
    }
}

impl eframe::App for VidnoteApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.viewport().close_requested()) && !self.saved_on_close {
            self.save();
            self.saved_on_close = true;
        }

        self.tick_playback(ctx);

        let Ok(session) = self.sessions.get(&self.video_id) else {
            return;
        };
        let mut category = session.category();
        let (can_undo, can_redo) = (session.can_undo(), session.can_redo());
        let (current_frame, frame_count) = (session.current_frame(), session.frame_count());
        let mark_count = session.store().len();

        // Toolbar
        let toolbar_action = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| toolbar::show(ui, &mut category, self.playing, can_undo, can_redo))
            .inner;

        // Timeline and status (bottom)
        let seek = egui::TopBottomPanel::bottom("timeline")
            .show(ctx, |ui| {
                let seek = timeline::show(ui, current_frame, frame_count);
                ui.separator();
                ui.horizontal(|ui| {
                    ui.label(format!("{} marks", mark_count));
                    ui.separator();
                    ui.label(format!("Saving to {}", self.output.display()));
                    if let Some(status) = &self.status {
                        ui.separator();
                        ui.label(status);
                    }
                });
                seek
            })
            .inner;

        if let Some(session) = self.session_mut() {
            session.set_category(category);
        }
        match toolbar_action {
            toolbar::ToolbarAction::TogglePlayback => self.toggle_playback(),
            toolbar::ToolbarAction::Save => self.save(),
            toolbar::ToolbarAction::Undo => {
                if let Some(session) = self.session_mut() {
                    session.undo();
                }
            }
            toolbar::ToolbarAction::Redo => {
                if let Some(session) = self.session_mut() {
                    session.redo();
                }
            }
            toolbar::ToolbarAction::None => {}
        }
        if let Some(frame) = seek {
            self.playing = false;
            if let Some(session) = self.session_mut() {
                if let Err(e) = session.set_frame(frame) {
                    log::warn!("{}", e);
                }
            }
        }

        self.handle_keys(ctx);

        // Main canvas (center)
        let events = egui::CentralPanel::default()
            .show(ctx, |ui| canvas::show(ui, &self.renderer))
            .inner;
        for event in events {
            self.send(event);
        }

        self.redraw_if_requested(ctx);
    }
}
