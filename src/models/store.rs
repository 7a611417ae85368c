// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Per-video annotation store.
//!
//! Points and arrows are kept in insertion order. Arrows are addressed by an
//! [`ArrowId`] handed out by the store, so a reference held by the gesture
//! machine can go stale (after a delete or undo) and be detected as such.

use super::annotation::{ArrowMark, Category, Point, PointMark};
use crate::error::AnnotationError;
use crate::util::geometry;
use std::fmt;

/// Store-issued handle to an arrow. Never reused within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArrowId(u64);

impl fmt::Display for ArrowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// All finalized marks of one video.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    points: Vec<PointMark>,
    arrows: Vec<(ArrowId, ArrowMark)>,
    next_arrow_id: u64,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a point mark. Duplicates are allowed.
    pub fn add_point(&mut self, frame: usize, x: f64, y: f64, category: Category) {
        self.points.push(PointMark {
            frame,
            x,
            y,
            category,
        });
    }

    /// Append an arrow mark. Zero-length arrows are rejected.
    pub fn add_arrow(
        &mut self,
        frame: usize,
        start: Point,
        head: Point,
        category: Category,
    ) -> Result<ArrowId, AnnotationError> {
        if start == head {
            return Err(AnnotationError::InvalidGeometry {
                x: start.x,
                y: start.y,
            });
        }

        let id = ArrowId(self.next_arrow_id);
        self.next_arrow_id += 1;
        self.arrows.push((
            id,
            ArrowMark {
                frame,
                start,
                head,
                category,
            },
        ));
        Ok(id)
    }

    /// Remove an arrow by identity.
    pub fn remove_arrow(&mut self, id: ArrowId) -> Result<ArrowMark, AnnotationError> {
        let idx = self.arrow_index(id)?;
        let (_, arrow) = self.arrows.remove(idx);
        log::debug!("Arrow {} removed, {} arrows left", id, self.arrows.len());
        Ok(arrow)
    }

    /// Move an arrow's head in place. Start, frame and category are kept.
    pub fn update_arrow_head(&mut self, id: ArrowId, head: Point) -> Result<(), AnnotationError> {
        let idx = self.arrow_index(id)?;
        self.arrows[idx].1.head = head;
        Ok(())
    }

    /// Drop the most recently added point, if any.
    pub fn remove_last_point(&mut self) -> Option<PointMark> {
        let removed = self.points.pop();
        if let Some(point) = &removed {
            log::debug!("Removed last point on frame {}", point.frame);
        }
        removed
    }

    pub fn arrow(&self, id: ArrowId) -> Option<&ArrowMark> {
        self.arrows
            .iter()
            .find(|(arrow_id, _)| *arrow_id == id)
            .map(|(_, arrow)| arrow)
    }

    pub fn points(&self) -> &[PointMark] {
        &self.points
    }

    /// Arrows in insertion order.
    pub fn arrows(&self) -> impl Iterator<Item = &ArrowMark> + '_ {
        self.arrows.iter().map(|(_, arrow)| arrow)
    }

    /// Total number of marks.
    pub fn len(&self) -> usize {
        self.points.len() + self.arrows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.arrows.is_empty()
    }

    /// Read-only view of the marks recorded on `frame`.
    pub fn list_for_frame(&self, frame: usize) -> FrameMarks<'_> {
        FrameMarks { store: self, frame }
    }

    /// Topmost (most recently added) arrow on `frame` whose start or head lies
    /// within `radius` of `at`.
    pub fn hit_arrow(&self, frame: usize, at: Point, radius: f64) -> Option<ArrowId> {
        self.arrows
            .iter()
            .rev()
            .filter(|(_, arrow)| arrow.frame == frame)
            .find(|(_, arrow)| {
                geometry::hit_test(at, arrow.start, radius) || geometry::hit_test(at, arrow.head, radius)
            })
            .map(|(id, _)| *id)
    }

    fn arrow_index(&self, id: ArrowId) -> Result<usize, AnnotationError> {
        self.arrows
            .iter()
            .position(|(arrow_id, _)| *arrow_id == id)
            .ok_or(AnnotationError::NotFound(id))
    }
}

/// Marks of a single frame, borrowed from a store.
#[derive(Debug, Clone, Copy)]
pub struct FrameMarks<'a> {
    store: &'a AnnotationStore,
    frame: usize,
}

impl<'a> FrameMarks<'a> {
    pub fn points(&self) -> impl Iterator<Item = &'a PointMark> + 'a {
        let frame = self.frame;
        self.store.points.iter().filter(move |p| p.frame == frame)
    }

    pub fn arrows(&self) -> impl Iterator<Item = (ArrowId, &'a ArrowMark)> + 'a {
        let frame = self.frame;
        self.store
            .arrows
            .iter()
            .filter(move |(_, arrow)| arrow.frame == frame)
            .map(|(id, arrow)| (*id, arrow))
    }

    pub fn is_empty(&self) -> bool {
        self.points().next().is_none() && self.arrows().next().is_none()
    }
}
