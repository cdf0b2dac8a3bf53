//! Input discovery and per-job output layout.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use brushscan_core::types::{extension_of, VideoJob};

use crate::error::DiscoveryError;

/// Recognized video extensions, compared case-insensitively.
pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "avi", "mov", "mkv", "m4v"];

pub fn is_video(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
}

/// List the video files directly inside `input_dir`, sorted by path.
///
/// Sub-directories are not descended into.
pub async fn discover_videos(input_dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let is_dir = tokio::fs::metadata(input_dir)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if !is_dir {
        return Err(DiscoveryError::NotADirectory(input_dir.to_path_buf()));
    }

    let io_err = |source| DiscoveryError::Io {
        path: input_dir.to_path_buf(),
        source,
    };
    let mut entries = tokio::fs::read_dir(input_dir).await.map_err(io_err)?;

    let mut videos = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        if !is_video(&path) {
            continue;
        }
        // Follows symlinks, so a linked video counts as a file.
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => videos.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable entry"),
        }
    }

    if videos.is_empty() {
        return Err(DiscoveryError::NoVideos(input_dir.to_path_buf()));
    }
    videos.sort();
    Ok(videos)
}

/// Assign each video an exclusive output sub-directory under `output_root`.
///
/// The folder is named after the file stem. When stems collide, every
/// file after the first (in the given order) uses `<stem>_<ext>`, with a
/// numeric suffix if that is taken too. Names are compared ignoring case
/// so folders stay distinct on case-insensitive filesystems.
pub fn plan_jobs(videos: &[PathBuf], output_root: &Path) -> Vec<VideoJob> {
    let mut taken = HashSet::new();
    let is_taken = |taken: &HashSet<String>, name: &str| taken.contains(&name.to_lowercase());

    videos
        .iter()
        .map(|path| {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "video".to_string());

            let mut name = stem.clone();
            if is_taken(&taken, &name) {
                let ext = extension_of(path).unwrap_or_default();
                name = format!("{stem}_{ext}");
                let mut n = 2;
                while is_taken(&taken, &name) {
                    name = format!("{stem}_{ext}_{n}");
                    n += 1;
                }
                tracing::warn!(video = %path.display(), folder = %name, "Output folder name collision");
            }
            taken.insert(name.to_lowercase());

            VideoJob::new(path.clone(), name.clone(), output_root.join(&name))
        })
        .collect()
}
