// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! vidnote - frame-by-frame video annotation.
//!
//! Step through the frames of a video (or a directory of frame images),
//! double-click to record points, drag to draw direction arrows. Annotations
//! are written to a JSON document on exit.

mod app;
mod ui;

use anyhow::{Context, Result};
use app::VidnoteApp;
use clap::Parser;
use std::path::{Path, PathBuf};
use vidnote::io::{media, serialization};
use vidnote::{AnnotatorConfig, Category, SessionManager};

#[derive(Parser, Debug)]
#[command(name = "vidnote", version, about = "Annotate video frames with points and direction arrows")]
struct Cli {
    /// Video file, single image, or directory of frame images
    source: PathBuf,

    /// Annotation document to load and save [default: annotations-DDMMYYYY.json]
    #[arg(short, long)]
    annotations: Option<PathBuf>,

    /// Settings file (YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Marker colour to start with (blue, pink, green)
    #[arg(long)]
    category: Option<Category>,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AnnotatorConfig::load(path)?,
        None => AnnotatorConfig::default(),
    };
    if let Some(category) = cli.category {
        config.default_category = category;
    }

    let source = media::open_source(&cli.source)
        .with_context(|| format!("Failed to open {}", cli.source.display()))?;
    let video_id = media::video_id_for(&cli.source);

    let mut output = cli
        .annotations
        .unwrap_or_else(|| serialization::default_output_path(Path::new(".")));
    serialization::DocumentFormat::from_path(&output)
        .with_context(|| format!("Cannot save annotations to {}", output.display()))?;

    let mut sessions = SessionManager::new(config);
    let mut keep_original = false;
    if output.exists() {
        match serialization::import(&output) {
            Ok(loaded) => {
                sessions.load(loaded);
                // Marks of this video that could not be read must not be overwritten
                keep_original = sessions.is_unreadable(&video_id);
            }
            Err(e) => {
                log::error!("Failed to load annotations: {:#}", e);
                keep_original = true;
            }
        }
    }
    if keep_original {
        output = output.with_extension("recovered.json");
        log::warn!("Annotations will be saved to {}", output.display());
    }
    sessions.open(&video_id, source.as_ref())?;

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title(format!("vidnote - {}", video_id)),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "vidnote",
        options,
        Box::new(move |cc| Ok(Box::new(VidnoteApp::new(cc, sessions, video_id, source, output)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
