// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! vidnote - frame-by-frame video annotation core.
//!
//! Point marks and direction arrows are recorded against integer frame
//! indices. Input arrives as already-disambiguated gesture events, marks live
//! in one store per video, and the whole set of stores serializes to a
//! columnar JSON document. Decoding frames and drawing them are delegated to
//! the [`io::media::FrameSource`] and [`render::Renderer`] collaborators.

pub mod config;
pub mod error;
pub mod gesture;
pub mod io;
pub mod models;
pub mod render;
pub mod session;
pub mod util;

pub use config::AnnotatorConfig;
pub use error::{AnnotationError, FrameSourceError};
pub use gesture::{GestureEvent, GestureOutcome, GestureState, RotateDirection};
pub use models::annotation::{ArrowMark, Category, Point, PointMark};
pub use models::store::{AnnotationStore, ArrowId};
pub use session::{Session, SessionManager};
