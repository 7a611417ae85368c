// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Annotation data model: marks, the per-video store and undo history.

pub mod annotation;
pub mod history;
pub mod store;
