// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error types for the annotation core.
//!
//! Nothing here is fatal: every variant is recoverable at the session
//! boundary. File-level failures (reading or writing documents) are reported
//! through `anyhow` by the `io` module instead.

use crate::models::store::ArrowId;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a frame source (decoder, image sequence, ...).
#[derive(Debug, Error)]
pub enum FrameSourceError {
    #[error("frame {index} is outside 0..{frame_count}")]
    IndexOutOfRange { index: usize, frame_count: usize },

    #[error("source has no frames")]
    Empty,

    #[error("cannot open {}: {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    #[error("failed to decode frame {index}: {reason}")]
    Decode { index: usize, reason: String },

    #[error("unsupported source {}", path.display())]
    Unsupported { path: PathBuf },
}

/// Errors raised by the store, gesture machine, session and serializer.
#[derive(Debug, Error)]
pub enum AnnotationError {
    /// Zero-length arrow; no mark is created.
    #[error("arrow start and head coincide at ({x:.1}, {y:.1})")]
    InvalidGeometry { x: f64, y: f64 },

    /// Reference to an arrow that has already been removed.
    #[error("arrow {0} no longer exists")]
    NotFound(ArrowId),

    #[error("frame {requested} is outside 0..{frame_count}")]
    OutOfRange { requested: usize, frame_count: usize },

    #[error("malformed annotation document: {0}")]
    MalformedDocument(String),

    #[error("no annotations for video '{0}'")]
    UnknownVideo(String),

    #[error("no open session for video '{0}'")]
    NoSession(String),

    #[error(transparent)]
    FrameSource(#[from] FrameSourceError),
}

impl AnnotationError {
    pub(crate) fn malformed(reason: impl std::fmt::Display) -> Self {
        Self::MalformedDocument(reason.to_string())
    }
}
