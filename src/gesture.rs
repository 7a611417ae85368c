// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Gesture state machine.
//!
//! The calling shell turns raw pointer and key input into [`GestureEvent`]s
//! (click vs. double-click vs. drag is decided there). This module turns
//! those events into store mutations. Each event either applies its whole
//! mutation or none of it; an arrow being drawn lives only in the machine's
//! state until it is released.

use crate::config::AnnotatorConfig;
use crate::error::AnnotationError;
use crate::models::annotation::{ArrowMark, Category, Point};
use crate::models::store::{AnnotationStore, ArrowId};
use crate::util::geometry;

/// Rotation direction for the selected arrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotateDirection {
    /// Positive angle (clockwise on screen).
    Up,
    /// Negative angle.
    Down,
}

/// Semantic input events, in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    PointCreate(Point),
    ArrowStart(Point),
    ArrowDrag(Point),
    ArrowRelease(Point),
    Rotate(RotateDirection),
    Delete,
    Cancel,
    FrameChange,
}

/// Selected arrow plus what is needed to rotate it without drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    pub id: ArrowId,
    start: Point,
    /// Head when the arrow was selected; rotations are applied to this.
    origin_head: Point,
    rotation_deg: f64,
}

impl Selection {
    fn new(id: ArrowId, arrow: &ArrowMark) -> Self {
        Self {
            id,
            start: arrow.start,
            origin_head: arrow.head,
            rotation_deg: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    DrawingArrow {
        start: Point,
        frame: usize,
        /// Provisional endpoint, never stored.
        head: Point,
    },
    ArrowSelected(Selection),
}

/// What an event did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureOutcome {
    PointAdded,
    DrawStarted,
    DrawMoved,
    ArrowAdded(ArrowId),
    /// Release too close to the start; nothing stored.
    Discarded,
    Selected(ArrowId),
    Rotated { id: ArrowId, head: Point },
    Removed(ArrowId),
    /// A draw or selection was dropped without touching the store.
    Cancelled,
    /// Event does not apply in the current state.
    Ignored,
}

impl GestureOutcome {
    /// Whether the store changed.
    pub fn mutated_store(&self) -> bool {
        matches!(
            self,
            GestureOutcome::PointAdded
                | GestureOutcome::ArrowAdded(_)
                | GestureOutcome::Rotated { .. }
                | GestureOutcome::Removed(_)
        )
    }

    /// Whether anything visible changed.
    pub fn needs_redraw(&self) -> bool {
        !matches!(self, GestureOutcome::Ignored)
    }
}

/// Session values an event is applied against.
pub struct GestureContext<'a> {
    pub store: &'a mut AnnotationStore,
    pub frame: usize,
    pub category: Category,
}

#[derive(Debug, Clone)]
pub struct GestureMachine {
    state: GestureState,
    min_arrow_length: f64,
    rotation_step_deg: f64,
    hit_radius: f64,
}

impl GestureMachine {
    pub fn new(config: &AnnotatorConfig) -> Self {
        Self {
            state: GestureState::Idle,
            min_arrow_length: config.min_arrow_length,
            rotation_step_deg: config.rotation_step_deg,
            hit_radius: config.hit_radius,
        }
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn selected(&self) -> Option<ArrowId> {
        match self.state {
            GestureState::ArrowSelected(selection) => Some(selection.id),
            _ => None,
        }
    }

    /// In-progress arrow as `(start, head)`.
    pub fn provisional_arrow(&self) -> Option<(Point, Point)> {
        match self.state {
            GestureState::DrawingArrow { start, head, .. } => Some((start, head)),
            _ => None,
        }
    }

    /// Drop any draw or selection. Returns whether there was one.
    pub fn reset(&mut self) -> bool {
        let was_active = self.state != GestureState::Idle;
        self.state = GestureState::Idle;
        was_active
    }

    pub fn handle(
        &mut self,
        event: GestureEvent,
        mut ctx: GestureContext<'_>,
    ) -> Result<GestureOutcome, AnnotationError> {
        match event {
            GestureEvent::PointCreate(at) => {
                self.reset();
                ctx.store.add_point(ctx.frame, at.x, at.y, ctx.category);
                log::info!(
                    "Point ({:.1},{:.1}). Frame {}. Colour {}.",
                    at.x,
                    at.y,
                    ctx.frame,
                    ctx.category
                );
                Ok(GestureOutcome::PointAdded)
            }
            GestureEvent::ArrowStart(at) => {
                self.reset();
                let hit = ctx
                    .store
                    .hit_arrow(ctx.frame, at, self.hit_radius)
                    .and_then(|id| ctx.store.arrow(id).map(|arrow| Selection::new(id, arrow)));
                match hit {
                    Some(selection) => {
                        log::info!("Selected arrow {}", selection.id);
                        self.state = GestureState::ArrowSelected(selection);
                        Ok(GestureOutcome::Selected(selection.id))
                    }
                    None => {
                        log::debug!("Started arrow at ({:.1}, {:.1})", at.x, at.y);
                        self.state = GestureState::DrawingArrow {
                            start: at,
                            frame: ctx.frame,
                            head: at,
                        };
                        Ok(GestureOutcome::DrawStarted)
                    }
                }
            }
            GestureEvent::ArrowDrag(at) => match &mut self.state {
                GestureState::DrawingArrow { head, .. } => {
                    *head = at;
                    Ok(GestureOutcome::DrawMoved)
                }
                _ => Ok(GestureOutcome::Ignored),
            },
            GestureEvent::ArrowRelease(at) => {
                let GestureState::DrawingArrow { start, frame, .. } = self.state else {
                    return Ok(GestureOutcome::Ignored);
                };
                self.state = GestureState::Idle;
                if geometry::distance(start, at) > self.min_arrow_length {
                    let id = ctx.store.add_arrow(frame, start, at, ctx.category)?;
                    log::info!(
                        "Arrow {} ({:.1},{:.1}) -> ({:.1},{:.1}). Frame {}. Colour {}.",
                        id,
                        start.x,
                        start.y,
                        at.x,
                        at.y,
                        frame,
                        ctx.category
                    );
                    Ok(GestureOutcome::ArrowAdded(id))
                } else {
                    log::debug!("Arrow released too close to its start, discarded");
                    Ok(GestureOutcome::Discarded)
                }
            }
            GestureEvent::Rotate(direction) => {
                let GestureState::ArrowSelected(selection) = &mut self.state else {
                    log::info!("No arrow selected to rotate");
                    return Ok(GestureOutcome::Ignored);
                };
                let step = match direction {
                    RotateDirection::Up => self.rotation_step_deg,
                    RotateDirection::Down => -self.rotation_step_deg,
                };
                let rotation = selection.rotation_deg + step;
                let head = geometry::rotate(selection.origin_head, selection.start, rotation);
                let id = selection.id;
                match ctx.store.update_arrow_head(id, head) {
                    Ok(()) => {
                        selection.rotation_deg = rotation;
                        log::info!(
                            "Arrow {} rotated. Heading now {:.0} degrees (w.r.t. East).",
                            id,
                            geometry::heading_deg(selection.start, head)
                        );
                        Ok(GestureOutcome::Rotated { id, head })
                    }
                    Err(e) => {
                        self.state = GestureState::Idle;
                        Err(e)
                    }
                }
            }
            GestureEvent::Delete => {
                let GestureState::ArrowSelected(selection) = self.state else {
                    log::info!("No arrow selected to remove");
                    return Ok(GestureOutcome::Ignored);
                };
                self.state = GestureState::Idle;
                ctx.store.remove_arrow(selection.id)?;
                log::info!("Arrow {} removed", selection.id);
                Ok(GestureOutcome::Removed(selection.id))
            }
            GestureEvent::Cancel | GestureEvent::FrameChange => {
                if self.reset() {
                    Ok(GestureOutcome::Cancelled)
                } else {
                    Ok(GestureOutcome::Ignored)
                }
            }
        }
    }
}
