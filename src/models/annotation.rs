// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data structures.
//!
//! This module defines the marks a user records on video frames: point
//! clicks and direction arrows, each tagged with a frame index and a
//! marker category.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 2D point in frame pixel coordinates (origin top-left, y down).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Marker category, shown as a colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Blue,
    Pink,
    Green,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Blue, Category::Pink, Category::Green];

    pub fn name(self) -> &'static str {
        match self {
            Category::Blue => "blue",
            Category::Pink => "pink",
            Category::Green => "green",
        }
    }

    /// Display colour as RGB.
    pub fn rgb(self) -> [u8; 3] {
        match self {
            Category::Blue => [0x74, 0x9C, 0xE2],
            Category::Pink => [0xE2, 0x74, 0xCF],
            Category::Green => [0x8C, 0xE2, 0x74],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown marker colour '{s}' (expected blue, pink or green)"))
    }
}

/// A point click recorded on one frame. Immutable once stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointMark {
    pub frame: usize,
    pub x: f64,
    pub y: f64,
    pub category: Category,
}

impl PointMark {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A direction arrow from `start` to `head` recorded on one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrowMark {
    pub frame: usize,
    pub start: Point,
    pub head: Point,
    pub category: Category,
}

impl ArrowMark {
    /// Length of the arrow.
    pub fn length(&self) -> f64 {
        crate::util::geometry::distance(self.start, self.head)
    }
}
