// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation sessions.
//!
//! A [`Session`] is the mutable context of one open video: current frame,
//! active category, gesture state, store and undo history. The
//! [`SessionManager`] keys sessions by video identifier and also keeps the
//! stores of videos that are not open (loaded from a document, or closed), so
//! that saving always writes every video back.

use crate::config::AnnotatorConfig;
use crate::error::{AnnotationError, FrameSourceError};
use crate::gesture::{GestureContext, GestureEvent, GestureMachine, GestureOutcome};
use crate::io::media::FrameSource;
use crate::io::serialization::{self, AnnotationDocument, LoadedDocument};
use crate::models::annotation::{Category, PointMark};
use crate::models::history::History;
use crate::models::store::{AnnotationStore, ArrowId};
use crate::render::{Overlay, Renderer};
use std::collections::BTreeMap;
use std::path::Path;

pub struct Session {
    video_id: String,
    store: AnnotationStore,
    frame_count: usize,
    current_frame: usize,
    current_category: Category,
    gesture: GestureMachine,
    history: History<AnnotationStore>,
    /// Arrow whose rotation already has an undo snapshot.
    rotating: Option<ArrowId>,
    redraw_requested: bool,
}

impl Session {
    pub fn new(
        video_id: impl Into<String>,
        frame_count: usize,
        config: &AnnotatorConfig,
    ) -> Result<Self, AnnotationError> {
        Self::with_store(video_id, frame_count, AnnotationStore::new(), config)
    }

    /// Open a session on an existing store. A video without frames is refused.
    pub fn with_store(
        video_id: impl Into<String>,
        frame_count: usize,
        store: AnnotationStore,
        config: &AnnotatorConfig,
    ) -> Result<Self, AnnotationError> {
        if frame_count == 0 {
            return Err(FrameSourceError::Empty.into());
        }
        let video_id = video_id.into();
        let beyond_end = store
            .points()
            .iter()
            .map(|p| p.frame)
            .chain(store.arrows().map(|a| a.frame))
            .filter(|f| *f >= frame_count)
            .count();
        if beyond_end > 0 {
            log::warn!(
                "{} marks of '{}' lie beyond the last frame ({})",
                beyond_end,
                video_id,
                frame_count - 1
            );
        }

        Ok(Self {
            video_id,
            store,
            frame_count,
            current_frame: 0,
            current_category: config.default_category,
            gesture: GestureMachine::new(config),
            history: History::new(config.history_limit),
            rotating: None,
            redraw_requested: true,
        })
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn category(&self) -> Category {
        self.current_category
    }

    pub fn selected(&self) -> Option<ArrowId> {
        self.gesture.selected()
    }

    /// Jump to frame `n`. Any selection or arrow in progress is dropped first.
    pub fn set_frame(&mut self, n: usize) -> Result<(), AnnotationError> {
        if n >= self.frame_count {
            return Err(AnnotationError::OutOfRange {
                requested: n,
                frame_count: self.frame_count,
            });
        }
        self.dispatch(GestureEvent::FrameChange)?;
        self.current_frame = n;
        self.redraw_requested = true;
        log::debug!("'{}' at frame {}", self.video_id, n);
        Ok(())
    }

    /// Move by `delta` frames, clamped to the video. Returns the new frame.
    pub fn step_frame(&mut self, delta: isize) -> usize {
        let last = self.frame_count - 1;
        let target = self.current_frame.saturating_add_signed(delta).min(last);
        if target != self.current_frame {
            if let Err(e) = self.set_frame(target) {
                log::warn!("'{}': {}", self.video_id, e);
            }
        }
        self.current_frame
    }

    /// Playback step. Returns `false` once the last frame is reached.
    pub fn advance(&mut self) -> bool {
        if self.current_frame + 1 >= self.frame_count {
            return false;
        }
        self.step_frame(1);
        true
    }

    /// Category for marks created from now on.
    pub fn set_category(&mut self, category: Category) {
        if category != self.current_category {
            log::info!("Marker colour set to {}", category);
            self.current_category = category;
        }
    }

    /// Apply a gesture event to the store.
    pub fn handle(&mut self, event: GestureEvent) -> Result<GestureOutcome, AnnotationError> {
        self.dispatch(event)
    }

    fn dispatch(&mut self, event: GestureEvent) -> Result<GestureOutcome, AnnotationError> {
        let may_mutate = match event {
            GestureEvent::PointCreate(_) | GestureEvent::ArrowRelease(_) | GestureEvent::Delete => true,
            // Further steps of the rotation in progress reuse its snapshot
            GestureEvent::Rotate(_) => self
                .gesture
                .selected()
                .is_some_and(|id| self.rotating != Some(id)),
            _ => false,
        };
        let snapshot = may_mutate.then(|| self.store.clone());

        let result = self.gesture.handle(
            event,
            GestureContext {
                store: &mut self.store,
                frame: self.current_frame,
                category: self.current_category,
            },
        );

        match &result {
            Ok(outcome) => {
                self.record_history(outcome, snapshot);
                if outcome.needs_redraw() {
                    self.redraw_requested = true;
                }
            }
            Err(e) => {
                self.rotating = None;
                self.redraw_requested = true;
                log::warn!("'{}': {}", self.video_id, e);
            }
        }
        result
    }

    fn record_history(&mut self, outcome: &GestureOutcome, snapshot: Option<AnnotationStore>) {
        // Consecutive rotation steps of one arrow undo as a single change
        match outcome {
            GestureOutcome::Rotated { id, .. } => {
                if self.rotating == Some(*id) {
                    return;
                }
                self.rotating = Some(*id);
            }
            GestureOutcome::Ignored => return,
            _ => self.rotating = None,
        }
        if let Some(snapshot) = snapshot.filter(|_| outcome.mutated_store()) {
            self.history.push(snapshot);
        }
    }

    /// Drop the most recently added point of the video, on any frame.
    pub fn remove_last_point(&mut self) -> Option<PointMark> {
        let snapshot = self.store.clone();
        let removed = self.store.remove_last_point()?;
        self.history.push(snapshot);
        self.rotating = None;
        self.redraw_requested = true;
        log::info!(
            "Point ({:.1},{:.1}) on frame {} removed",
            removed.x,
            removed.y,
            removed.frame
        );
        Some(removed)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Revert the last store change. Clears any selection.
    pub fn undo(&mut self) -> bool {
        let current = self.store.clone();
        match self.history.undo(current) {
            Some(previous) => {
                self.restore(previous);
                log::info!("Undo on '{}'", self.video_id);
                true
            }
            None => false,
        }
    }

    /// Re-apply the last undone change. Clears any selection.
    pub fn redo(&mut self) -> bool {
        let current = self.store.clone();
        match self.history.redo(current) {
            Some(next) => {
                self.restore(next);
                log::info!("Redo on '{}'", self.video_id);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, store: AnnotationStore) {
        self.store = store;
        self.gesture.reset();
        self.rotating = None;
        self.redraw_requested = true;
    }

    /// What to draw over the current frame.
    pub fn overlay(&self) -> Overlay<'_> {
        Overlay {
            marks: self.store.list_for_frame(self.current_frame),
            provisional: self.gesture.provisional_arrow(),
            selected: self.gesture.selected(),
        }
    }

    /// Returns whether a redraw was requested since the last call, and clears it.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    /// Fetch the current frame and hand it to the renderer with the overlay.
    pub fn redraw(
        &mut self,
        source: &mut dyn FrameSource,
        renderer: &mut dyn Renderer,
    ) -> Result<(), AnnotationError> {
        let frame = source.frame(self.current_frame)?;
        renderer.render(&frame, &self.overlay());
        self.redraw_requested = false;
        Ok(())
    }

    fn into_store(self) -> AnnotationStore {
        self.store
    }
}

/// All sessions of the process, keyed by video identifier.
pub struct SessionManager {
    config: AnnotatorConfig,
    sessions: BTreeMap<String, Session>,
    /// Stores of videos without an open session.
    dormant: BTreeMap<String, AnnotationStore>,
    /// Document entries that could not be read, saved back as they were.
    unreadable: BTreeMap<String, serde_json::Value>,
}

impl SessionManager {
    pub fn new(config: AnnotatorConfig) -> Self {
        Self {
            config,
            sessions: BTreeMap::new(),
            dormant: BTreeMap::new(),
            unreadable: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    /// Take in the stores of a loaded document. Videos with an open session
    /// keep their in-memory marks. Returns the number of stores taken.
    pub fn load(&mut self, loaded: LoadedDocument) -> usize {
        for rejected in loaded.rejected {
            log::error!(
                "Annotations for '{}' not loaded: {}",
                rejected.video_id,
                rejected.error
            );
            self.unreadable.insert(rejected.video_id, rejected.raw);
        }
        let mut taken = 0;
        for (video_id, store) in loaded.stores {
            if self.sessions.contains_key(&video_id) {
                log::warn!("'{}' is open; ignoring its stored annotations", video_id);
                continue;
            }
            log::info!("Loaded {} marks for '{}'", store.len(), video_id);
            self.dormant.insert(video_id, store);
            taken += 1;
        }
        taken
    }

    /// Open (or return the already open) session for `video_id`. Previously
    /// loaded marks for the video are picked up; otherwise it starts empty.
    pub fn open(&mut self, video_id: &str, source: &dyn FrameSource) -> Result<&mut Session, AnnotationError> {
        if !self.sessions.contains_key(video_id) {
            let frame_count = source.frame_count();
            if frame_count == 0 {
                return Err(FrameSourceError::Empty.into());
            }
            if self.is_unreadable(video_id) {
                log::warn!(
                    "Stored annotations for '{}' could not be read; saving replaces them with this session's marks",
                    video_id
                );
            }
            let store = self.dormant.remove(video_id).unwrap_or_default();
            log::info!(
                "Opened '{}' ({} frames, {} existing marks)",
                video_id,
                frame_count,
                store.len()
            );
            let session = Session::with_store(video_id, frame_count, store, &self.config)?;
            self.sessions.insert(video_id.to_string(), session);
        }
        self.get_mut(video_id)
    }

    /// Close a session. Its marks stay in the manager and are still saved.
    pub fn close(&mut self, video_id: &str) -> Result<(), AnnotationError> {
        let session = self
            .sessions
            .remove(video_id)
            .ok_or_else(|| AnnotationError::NoSession(video_id.to_string()))?;
        log::info!("Closed '{}'", video_id);
        self.dormant.insert(video_id.to_string(), session.into_store());
        Ok(())
    }

    /// Whether the loaded document held an entry for `video_id` that could
    /// not be read.
    pub fn is_unreadable(&self, video_id: &str) -> bool {
        self.unreadable.contains_key(video_id)
    }

    pub fn get(&self, video_id: &str) -> Result<&Session, AnnotationError> {
        self.sessions
            .get(video_id)
            .ok_or_else(|| AnnotationError::NoSession(video_id.to_string()))
    }

    pub fn get_mut(&mut self, video_id: &str) -> Result<&mut Session, AnnotationError> {
        self.sessions
            .get_mut(video_id)
            .ok_or_else(|| AnnotationError::NoSession(video_id.to_string()))
    }

    /// Snapshot of every store, open or not.
    pub fn to_document(&self) -> AnnotationDocument {
        let open = self.sessions.iter().map(|(id, s)| (id.as_str(), s.store()));
        let dormant = self.dormant.iter().map(|(id, store)| (id.as_str(), store));
        serialization::to_document(open.chain(dormant))
    }

    /// Rewrite the whole document at `path`. Entries that could not be read
    /// are written back unchanged unless their video has marks here.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let doc = self.to_document();
        let value = serialization::with_unreadable(&doc, &self.unreadable)?;
        serialization::export(&value, path)?;
        log::info!(
            "Saved annotations for {} videos to {}",
            value.as_object().map_or(0, |videos| videos.len()),
            path.display()
        );
        Ok(())
    }

    pub fn redraw(
        &mut self,
        video_id: &str,
        source: &mut dyn FrameSource,
        renderer: &mut dyn Renderer,
    ) -> Result<(), AnnotationError> {
        self.get_mut(video_id)?.redraw(source, renderer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::RotateDirection;
    use crate::models::annotation::Point;

    fn session(frames: usize) -> Session {
        Session::new("clip", frames, &AnnotatorConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_video_refused() {
        assert!(matches!(
            Session::new("clip", 0, &AnnotatorConfig::default()),
            Err(AnnotationError::FrameSource(FrameSourceError::Empty))
        ));
    }

    #[test]
    fn test_set_frame_out_of_range_keeps_state() {
        let mut s = session(10);
        s.set_frame(4).unwrap();
        s.handle(GestureEvent::ArrowStart(Point::new(1.0, 1.0))).unwrap();

        let err = s.set_frame(10).unwrap_err();

        assert!(matches!(err, AnnotationError::OutOfRange { requested: 10, frame_count: 10 }));
        assert_eq!(s.current_frame(), 4);
        assert!(s.overlay().provisional.is_some());
    }

    #[test]
    fn test_step_frame_clamps() {
        let mut s = session(3);
        assert_eq!(s.step_frame(-5), 0);
        assert_eq!(s.step_frame(10), 2);
        assert_eq!(s.step_frame(-1), 1);
    }

    #[test]
    fn test_step_frame_drops_draw_in_progress() {
        let mut s = session(3);
        s.handle(GestureEvent::ArrowStart(Point::new(1.0, 1.0))).unwrap();

        assert_eq!(s.step_frame(1), 1);
        assert!(s.overlay().provisional.is_none());
        assert_eq!(s.step_frame(0), 1);
    }

    #[test]
    fn test_advance_stops_at_end() {
        let mut s = session(2);
        assert!(s.advance());
        assert_eq!(s.current_frame(), 1);
        assert!(!s.advance());
    }

    #[test]
    fn test_category_is_not_retroactive() {
        let mut s = session(5);
        s.handle(GestureEvent::PointCreate(Point::new(1.0, 1.0))).unwrap();
        s.set_category(Category::Green);
        s.handle(GestureEvent::PointCreate(Point::new(2.0, 2.0))).unwrap();

        let categories: Vec<Category> = s.store().points().iter().map(|p| p.category).collect();
        assert_eq!(categories, vec![Category::Blue, Category::Green]);
    }

    #[test]
    fn test_undo_redo_point() {
        let mut s = session(5);
        s.handle(GestureEvent::PointCreate(Point::new(1.0, 1.0))).unwrap();
        s.handle(GestureEvent::PointCreate(Point::new(2.0, 2.0))).unwrap();

        assert!(s.undo());
        assert_eq!(s.store().points().len(), 1);
        assert!(s.redo());
        assert_eq!(s.store().points().len(), 2);
    }

    #[test]
    fn test_rotation_steps_undo_together() {
        let mut s = session(5);
        s.handle(GestureEvent::ArrowStart(Point::new(0.0, 0.0))).unwrap();
        s.handle(GestureEvent::ArrowRelease(Point::new(50.0, 0.0))).unwrap();
        s.handle(GestureEvent::ArrowStart(Point::new(50.0, 0.0))).unwrap();
        for _ in 0..10 {
            s.handle(GestureEvent::Rotate(RotateDirection::Down)).unwrap();
        }

        assert!(s.undo());
        let arrow = s.store().arrows().next().unwrap();
        assert_eq!(arrow.head, Point::new(50.0, 0.0));
        assert_eq!(s.selected(), None);
        assert!(s.undo());
        assert_eq!(s.store().arrows().count(), 0);
    }

    #[test]
    fn test_rotating_another_arrow_is_a_new_undo_step() {
        let mut s = session(5);
        for y in [0.0, 100.0] {
            s.handle(GestureEvent::ArrowStart(Point::new(0.0, y))).unwrap();
            s.handle(GestureEvent::ArrowRelease(Point::new(50.0, y))).unwrap();
        }
        s.handle(GestureEvent::ArrowStart(Point::new(50.0, 0.0))).unwrap();
        for _ in 0..3 {
            s.handle(GestureEvent::Rotate(RotateDirection::Up)).unwrap();
        }
        s.handle(GestureEvent::ArrowStart(Point::new(50.0, 100.0))).unwrap();
        for _ in 0..3 {
            s.handle(GestureEvent::Rotate(RotateDirection::Up)).unwrap();
        }

        assert!(s.undo());
        let heads: Vec<Point> = s.store().arrows().map(|a| a.head).collect();
        assert_ne!(heads[0], Point::new(50.0, 0.0));
        assert_eq!(heads[1], Point::new(50.0, 100.0));

        assert!(s.undo());
        let heads: Vec<Point> = s.store().arrows().map(|a| a.head).collect();
        assert_eq!(heads, vec![Point::new(50.0, 0.0), Point::new(50.0, 100.0)]);
    }

    #[test]
    fn test_remove_last_point_is_undoable() {
        let mut s = session(5);
        assert!(s.remove_last_point().is_none());
        assert!(!s.can_undo());

        s.handle(GestureEvent::PointCreate(Point::new(1.0, 1.0))).unwrap();
        s.set_frame(3).unwrap();
        s.handle(GestureEvent::PointCreate(Point::new(2.0, 2.0))).unwrap();
        s.take_redraw_request();

        assert_eq!(s.remove_last_point().map(|p| p.frame), Some(3));
        assert!(s.take_redraw_request());
        assert_eq!(s.store().points().len(), 1);
        assert!(s.undo());
        assert_eq!(s.store().points().len(), 2);
    }

    #[test]
    fn test_redraw_request_flag() {
        let mut s = session(5);
        assert!(s.take_redraw_request());
        assert!(!s.take_redraw_request());

        s.handle(GestureEvent::Rotate(RotateDirection::Up)).unwrap();
        assert!(!s.take_redraw_request());

        s.handle(GestureEvent::PointCreate(Point::new(3.0, 3.0))).unwrap();
        assert!(s.take_redraw_request());
    }

    #[test]
    fn test_close_keeps_marks_for_save() {
        let mut manager = SessionManager::new(AnnotatorConfig::default());
        let mut store = AnnotationStore::new();
        store.add_point(0, 1.0, 1.0, Category::Pink);
        manager.dormant.insert("clip".to_string(), store);

        let doc = manager.to_document();
        assert_eq!(doc.videos["clip"].points.frame_counter, vec![0]);

        assert!(matches!(manager.close("clip"), Err(AnnotationError::NoSession(_))));
    }
}
