// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media file loading (images and videos).
//!
//! Frames are served through the [`FrameSource`] trait. A directory of still
//! images (or a single image) is read with the `image` crate; video files
//! need the `video-opencv` feature.

use crate::error::FrameSourceError;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Extensions treated as still images.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

/// One decoded frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: usize,
    pub image: Arc<RgbaImage>,
}

impl Frame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Random access to the frames of one video.
pub trait FrameSource {
    fn frame_count(&self) -> usize;

    /// Decode frame `index`. Fails with `IndexOutOfRange` outside
    /// `0..frame_count()`.
    fn frame(&mut self, index: usize) -> Result<Frame, FrameSourceError>;
}

/// Identifier used to key annotations for a source: the file stem, or the
/// directory name for an image sequence.
pub fn video_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Open a frame source for `path`.
pub fn open_source(path: &Path) -> Result<Box<dyn FrameSource>, FrameSourceError> {
    if path.is_dir() {
        return Ok(Box::new(ImageSequence::from_dir(path)?));
    }
    if is_image(path) {
        return Ok(Box::new(ImageSequence::new(vec![path.to_path_buf()])?));
    }
    open_video(path)
}

#[cfg(feature = "video-opencv")]
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>, FrameSourceError> {
    Ok(Box::new(opencv_source::VideoFile::open(path)?))
}

#[cfg(not(feature = "video-opencv"))]
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>, FrameSourceError> {
    Err(FrameSourceError::Unsupported {
        path: path.to_path_buf(),
    })
}

/// Frames stored as individual image files, ordered by file name.
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    cached: Option<Frame>,
}

impl ImageSequence {
    pub fn new(paths: Vec<PathBuf>) -> Result<Self, FrameSourceError> {
        if paths.is_empty() {
            return Err(FrameSourceError::Empty);
        }
        Ok(Self {
            paths,
            cached: None,
        })
    }

    /// Collect every image in `dir`, sorted by file name.
    pub fn from_dir(dir: &Path) -> Result<Self, FrameSourceError> {
        let open_err = |e: std::io::Error| FrameSourceError::Open {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        };
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(open_err)? {
            let path = entry.map_err(open_err)?.path();
            if path.is_file() && is_image(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        log::info!("Found {} frames in {}", paths.len(), dir.display());
        Self::new(paths)
    }
}

impl FrameSource for ImageSequence {
    fn frame_count(&self) -> usize {
        self.paths.len()
    }

    fn frame(&mut self, index: usize) -> Result<Frame, FrameSourceError> {
        if let Some(frame) = self.cached.as_ref().filter(|f| f.index == index) {
            return Ok(frame.clone());
        }
        let path = self
            .paths
            .get(index)
            .ok_or(FrameSourceError::IndexOutOfRange {
                index,
                frame_count: self.paths.len(),
            })?;
        let image = image::open(path)
            .map_err(|e| FrameSourceError::Decode {
                index,
                reason: format!("{}: {}", path.display(), e),
            })?
            .to_rgba8();
        log::debug!("Decoded frame {} ({}x{})", index, image.width(), image.height());

        let frame = Frame {
            index,
            image: Arc::new(image),
        };
        self.cached = Some(frame.clone());
        Ok(frame)
    }
}

#[cfg(feature = "video-opencv")]
mod opencv_source {
    use super::Frame;
    use crate::error::FrameSourceError;
    use image::RgbaImage;
    use opencv::core::Mat;
    use opencv::prelude::*;
    use opencv::{imgproc, videoio};
    use std::path::Path;
    use std::sync::Arc;

    /// Video file decoded through OpenCV.
    pub struct VideoFile {
        capture: videoio::VideoCapture,
        frame_count: usize,
        /// Index of the frame the next `read` returns.
        position: usize,
        cached: Option<Frame>,
    }

    impl VideoFile {
        pub fn open(path: &Path) -> Result<Self, FrameSourceError> {
            let open_err = |reason: String| FrameSourceError::Open {
                path: path.to_path_buf(),
                reason,
            };
            let capture = videoio::VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY)
                .map_err(|e| open_err(e.to_string()))?;
            if !capture.is_opened().map_err(|e| open_err(e.to_string()))? {
                return Err(open_err("unable to open video source".to_string()));
            }
            let frame_count = capture
                .get(videoio::CAP_PROP_FRAME_COUNT)
                .map_err(|e| open_err(e.to_string()))?
                .max(0.0) as usize;
            if frame_count == 0 {
                return Err(FrameSourceError::Empty);
            }
            log::info!("Opened video {} with {} frames", path.display(), frame_count);
            Ok(Self {
                capture,
                frame_count,
                position: 0,
                cached: None,
            })
        }
    }

    impl super::FrameSource for VideoFile {
        fn frame_count(&self) -> usize {
            self.frame_count
        }

        fn frame(&mut self, index: usize) -> Result<Frame, FrameSourceError> {
            if index >= self.frame_count {
                return Err(FrameSourceError::IndexOutOfRange {
                    index,
                    frame_count: self.frame_count,
                });
            }
            if let Some(frame) = self.cached.as_ref().filter(|f| f.index == index) {
                return Ok(frame.clone());
            }

            let decode_err = |reason: String| FrameSourceError::Decode { index, reason };
            // Sequential reads are cheap; only seek when jumping
            if index != self.position {
                self.capture
                    .set(videoio::CAP_PROP_POS_FRAMES, index as f64)
                    .map_err(|e| decode_err(e.to_string()))?;
            }
            let mut bgr = Mat::default();
            if !self.capture.read(&mut bgr).map_err(|e| decode_err(e.to_string()))? {
                return Err(decode_err("no frame returned".to_string()));
            }
            self.position = index + 1;

            let mut rgba = Mat::default();
            imgproc::cvt_color(&bgr, &mut rgba, imgproc::COLOR_BGR2RGBA, 0)
                .map_err(|e| decode_err(e.to_string()))?;
            let width = rgba.cols() as u32;
            let height = rgba.rows() as u32;
            let bytes = rgba
                .data_bytes()
                .map_err(|e| decode_err(e.to_string()))?
                .to_vec();
            let image = RgbaImage::from_raw(width, height, bytes)
                .ok_or_else(|| decode_err("frame buffer size mismatch".to_string()))?;

            let frame = Frame {
                index,
                image: Arc::new(image),
            };
            self.cached = Some(frame.clone());
            Ok(frame)
        }
    }
}
