// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Rendering collaborator interface.
//!
//! The core never draws. After a change it hands the current frame and an
//! [`Overlay`] describing what to draw on top to a [`Renderer`].

use crate::io::media::Frame;
use crate::models::annotation::Point;
use crate::models::store::{ArrowId, FrameMarks};

/// Marks to draw over one frame.
#[derive(Debug, Clone, Copy)]
pub struct Overlay<'a> {
    /// Finalized marks of the active frame.
    pub marks: FrameMarks<'a>,
    /// Arrow currently being dragged out, as `(start, head)`.
    pub provisional: Option<(Point, Point)>,
    pub selected: Option<ArrowId>,
}

pub trait Renderer {
    fn render(&mut self, frame: &Frame, overlay: &Overlay<'_>);
}
