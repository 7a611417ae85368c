// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! End-to-end annotation sessions driven through the public API.

use image::RgbaImage;
use std::sync::Arc;
use vidnote::io::media::{Frame, FrameSource};
use vidnote::io::serialization;
use vidnote::render::{Overlay, Renderer};
use vidnote::{
    AnnotationError, AnnotatorConfig, ArrowId, Category, FrameSourceError, GestureEvent, GestureOutcome,
    Point, RotateDirection, SessionManager,
};

/// Blank frames of a fixed count.
struct BlankVideo {
    frames: usize,
    decoded: Vec<usize>,
}

impl BlankVideo {
    fn new(frames: usize) -> Self {
        Self {
            frames,
            decoded: Vec::new(),
        }
    }
}

impl FrameSource for BlankVideo {
    fn frame_count(&self) -> usize {
        self.frames
    }

    fn frame(&mut self, index: usize) -> Result<Frame, FrameSourceError> {
        if index >= self.frames {
            return Err(FrameSourceError::IndexOutOfRange {
                index,
                frame_count: self.frames,
            });
        }
        self.decoded.push(index);
        Ok(Frame {
            index,
            image: Arc::new(RgbaImage::new(4, 3)),
        })
    }
}

/// What the last render call was given.
#[derive(Default)]
struct RecordingRenderer {
    frame: Option<usize>,
    points: usize,
    arrows: Vec<ArrowId>,
    provisional: Option<(Point, Point)>,
    selected: Option<ArrowId>,
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, frame: &Frame, overlay: &Overlay<'_>) {
        self.frame = Some(frame.index);
        self.points = overlay.marks.points().count();
        self.arrows = overlay.marks.arrows().map(|(id, _)| id).collect();
        self.provisional = overlay.provisional;
        self.selected = overlay.selected;
    }
}

fn manager() -> SessionManager {
    SessionManager::new(AnnotatorConfig::default())
}

#[test]
fn test_point_scenario_serializes_to_columns() {
    let mut sessions = manager();
    let session = sessions.open("clip", &BlankVideo::new(10)).unwrap();
    session.set_frame(5).unwrap();
    session.set_category(Category::Pink);
    session
        .handle(GestureEvent::PointCreate(Point::new(10.0, 20.0)))
        .unwrap();

    let value = serde_json::to_value(sessions.to_document()).unwrap();
    let points = &value["clip"]["points"];

    assert_eq!(points["frame_counter"], serde_json::json!([5]));
    assert_eq!(points["mouse_x"][0].as_f64(), Some(10.0));
    assert_eq!(points["mouse_y"][0].as_f64(), Some(20.0));
    assert_eq!(points["marker_colour"], serde_json::json!(["pink"]));
}

#[test]
fn test_frame_change_mid_draw_discards_arrow() {
    let mut sessions = manager();
    let session = sessions.open("clip", &BlankVideo::new(10)).unwrap();
    session.set_frame(2).unwrap();
    session
        .handle(GestureEvent::ArrowStart(Point::new(0.0, 0.0)))
        .unwrap();
    session
        .handle(GestureEvent::ArrowDrag(Point::new(80.0, 0.0)))
        .unwrap();

    session.set_frame(3).unwrap();
    let outcome = session
        .handle(GestureEvent::ArrowRelease(Point::new(80.0, 0.0)))
        .unwrap();

    assert_eq!(outcome, GestureOutcome::Ignored);
    assert_eq!(session.store().arrows().count(), 0);
    assert!(session.overlay().provisional.is_none());
}

#[test]
fn test_release_at_start_stores_nothing() {
    let mut sessions = manager();
    let session = sessions.open("clip", &BlankVideo::new(4)).unwrap();
    let at = Point::new(7.0, 7.0);

    session.handle(GestureEvent::ArrowStart(at)).unwrap();
    let outcome = session.handle(GestureEvent::ArrowRelease(at)).unwrap();

    assert_eq!(outcome, GestureOutcome::Discarded);
    assert!(session.store().is_empty());
    assert!(!session.can_undo());
}

#[test]
fn test_rotate_with_custom_step() {
    let config = AnnotatorConfig {
        rotation_step_deg: 90.0,
        ..AnnotatorConfig::default()
    };
    let mut sessions = SessionManager::new(config);
    let session = sessions.open("clip", &BlankVideo::new(4)).unwrap();
    session
        .handle(GestureEvent::ArrowStart(Point::new(100.0, 100.0)))
        .unwrap();
    session
        .handle(GestureEvent::ArrowRelease(Point::new(150.0, 100.0)))
        .unwrap();
    session
        .handle(GestureEvent::ArrowStart(Point::new(150.0, 100.0)))
        .unwrap();

    session
        .handle(GestureEvent::Rotate(RotateDirection::Up))
        .unwrap();

    let arrow = session.store().arrows().next().unwrap();
    assert!((arrow.head.x - 100.0).abs() < 1e-9);
    assert!((arrow.head.y - 150.0).abs() < 1e-9);
    assert_eq!(arrow.start, Point::new(100.0, 100.0));
}

#[test]
fn test_redraw_hands_overlay_to_renderer() {
    let mut sessions = manager();
    let mut video = BlankVideo::new(6);
    let mut renderer = RecordingRenderer::default();
    {
        let session = sessions.open("clip", &video).unwrap();
        session.set_frame(1).unwrap();
        session
            .handle(GestureEvent::PointCreate(Point::new(1.0, 2.0)))
            .unwrap();
        session
            .handle(GestureEvent::ArrowStart(Point::new(0.0, 0.0)))
            .unwrap();
        session
            .handle(GestureEvent::ArrowRelease(Point::new(0.0, 60.0)))
            .unwrap();
        session
            .handle(GestureEvent::ArrowStart(Point::new(0.0, 60.0)))
            .unwrap();
    }

    sessions.redraw("clip", &mut video, &mut renderer).unwrap();

    assert_eq!(renderer.frame, Some(1));
    assert_eq!(renderer.points, 1);
    assert_eq!(renderer.arrows.len(), 1);
    assert_eq!(renderer.selected, Some(renderer.arrows[0]));
    assert!(renderer.provisional.is_none());
    assert_eq!(video.decoded, vec![1]);
}

#[test]
fn test_marks_stay_on_their_frame() {
    let mut sessions = manager();
    let mut video = BlankVideo::new(6);
    let mut renderer = RecordingRenderer::default();
    {
        let session = sessions.open("clip", &video).unwrap();
        session
            .handle(GestureEvent::PointCreate(Point::new(1.0, 2.0)))
            .unwrap();
        session.set_frame(4).unwrap();
    }

    sessions.redraw("clip", &mut video, &mut renderer).unwrap();

    assert_eq!(renderer.frame, Some(4));
    assert_eq!(renderer.points, 0);
}

#[test]
fn test_save_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("annotations.json");

    let mut sessions = manager();
    {
        let session = sessions.open("clip", &BlankVideo::new(10)).unwrap();
        session.set_category(Category::Green);
        session
            .handle(GestureEvent::ArrowStart(Point::new(5.0, 5.0)))
            .unwrap();
        session
            .handle(GestureEvent::ArrowRelease(Point::new(5.0, 50.0)))
            .unwrap();
    }
    sessions.close("clip").unwrap();
    sessions.open("other", &BlankVideo::new(3)).unwrap();
    sessions.save(&path).unwrap();

    let mut reloaded = manager();
    assert_eq!(reloaded.load(serialization::import(&path).unwrap()), 2);
    let session = reloaded.open("clip", &BlankVideo::new(10)).unwrap();

    let arrow = session.store().arrows().next().unwrap();
    assert_eq!(arrow.head, Point::new(5.0, 50.0));
    assert_eq!(arrow.category, Category::Green);
    assert_eq!(session.store().points().len(), 0);
}

#[test]
fn test_bad_video_entry_does_not_block_others() {
    let text = r#"{
        "good": {
            "points": {"frame_counter": [0], "mouse_x": [1.0], "mouse_y": [2.0], "marker_colour": ["blue"]},
            "arrows": {}
        },
        "bad": {
            "points": {"frame_counter": [0, 1], "mouse_x": [1.0], "mouse_y": [2.0], "marker_colour": ["blue"]}
        }
    }"#;
    let loaded = serialization::LoadedDocument::from_json_str(text).unwrap();

    let mut sessions = manager();
    assert_eq!(sessions.load(loaded), 1);
    let session = sessions.open("good", &BlankVideo::new(2)).unwrap();
    assert_eq!(session.store().points().len(), 1);
}

#[test]
fn test_unknown_session_and_empty_video() {
    let mut sessions = manager();

    assert!(matches!(sessions.get("nope"), Err(AnnotationError::NoSession(_))));
    assert!(matches!(
        sessions.open("empty", &BlankVideo::new(0)),
        Err(AnnotationError::FrameSource(FrameSourceError::Empty))
    ));
}

#[test]
fn test_delete_then_undo_restores_arrow() {
    let mut sessions = manager();
    let session = sessions.open("clip", &BlankVideo::new(3)).unwrap();
    session
        .handle(GestureEvent::ArrowStart(Point::new(0.0, 0.0)))
        .unwrap();
    session
        .handle(GestureEvent::ArrowRelease(Point::new(40.0, 0.0)))
        .unwrap();
    session
        .handle(GestureEvent::ArrowStart(Point::new(40.0, 0.0)))
        .unwrap();

    assert!(matches!(
        session.handle(GestureEvent::Delete).unwrap(),
        GestureOutcome::Removed(_)
    ));
    assert_eq!(session.store().arrows().count(), 0);

    assert!(session.undo());
    assert_eq!(session.store().arrows().count(), 1);
    assert_eq!(session.selected(), None);
}

const DOCUMENT_WITH_BAD_ENTRY: &str = r#"{
    "clip": {
        "points": {"frame_counter": [0], "mouse_x": [1.0], "mouse_y": [2.0], "marker_colour": ["blue"]}
    },
    "other": {
        "points": {"frame_counter": [0, 1], "mouse_x": [3.0, 4.0], "mouse_y": [5.0, 6.0],
                   "marker_colour": ["pink", "yellow"]}
    }
}"#;

#[test]
fn test_unreadable_video_survives_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("annotations.json");
    std::fs::write(&path, DOCUMENT_WITH_BAD_ENTRY).unwrap();

    let mut sessions = manager();
    assert_eq!(sessions.load(serialization::import(&path).unwrap()), 1);
    sessions
        .open("clip", &BlankVideo::new(4))
        .unwrap()
        .handle(GestureEvent::PointCreate(Point::new(9.0, 9.0)))
        .unwrap();
    sessions.save(&path).unwrap();

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        saved["other"]["points"]["marker_colour"],
        serde_json::json!(["pink", "yellow"])
    );
    assert_eq!(saved["clip"]["points"]["frame_counter"], serde_json::json!([0, 0]));
}

#[test]
fn test_unreadable_video_is_reported() {
    let loaded = serialization::LoadedDocument::from_json_str(DOCUMENT_WITH_BAD_ENTRY).unwrap();
    let mut sessions = manager();
    sessions.load(loaded);

    assert!(sessions.is_unreadable("other"));
    assert!(!sessions.is_unreadable("clip"));
    let session = sessions.open("other", &BlankVideo::new(4)).unwrap();
    assert!(session.store().is_empty());
}
