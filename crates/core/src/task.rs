//! Per-trial task definition and task image loading.
//!
//! Each trial is described by a `TaskInfo{NN}.json` descriptor and an
//! optional `TaskImage{NN}.jpg` companion image, both keyed by the two-digit
//! trial number. The image is flipped vertically before it is handed to the
//! host, whose rendering coordinate convention differs from the storage
//! convention.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::error;

/// Errors raised while loading a trial's task definition.
///
/// All variants are fatal to session bootstrap: the trial cannot proceed
/// without valid configuration, so none of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Task info file does not exist. trial={trial} path={}", .path.display())]
    MissingDescriptor { trial: u32, path: PathBuf },
    #[error("Couldn't read the task info file. path={}: {source}", .path.display())]
    DescriptorIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Task info file is not valid JSON. path={}: {source}", .path.display())]
    DescriptorParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Task image file does not exist. trial={trial} path={}", .path.display())]
    MissingImage { trial: u32, path: PathBuf },
    #[error("Couldn't read the task image file. path={}: {source}", .path.display())]
    ImageDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// The task definition of one trial. Immutable once loaded; replaced wholesale
/// when the next trial bootstraps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    /// The instruction text announced (and spoken) to the robot.
    pub message: String,
    /// Whether a companion image accompanies this trial.
    pub has_image: bool,
    /// Name of the target object among the graspable candidates.
    pub target_name: String,
}

/// A task image decoded from disk, flipped into the host's orientation and
/// re-encoded as JPEG for the host to consume.
#[derive(Debug, Clone)]
pub struct TaskImage {
    pub width: u32,
    pub height: u32,
    pub jpeg: Vec<u8>,
}

/// Flips the raster upside down. Fixed, non-configurable transform; applying
/// it twice restores the original pixels.
pub fn flip_vertical(image: &DynamicImage) -> DynamicImage {
    image.flipv()
}

/// Reads task descriptors and companion images from the configuration
/// directory.
///
/// Target-name validation against the candidate set is the caller's job; the
/// loader has no knowledge of the scene.
pub struct TaskLoader {
    config_dir: PathBuf,
}

impl TaskLoader {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of the descriptor for the given trial.
    pub fn descriptor_path(&self, trial: u32) -> PathBuf {
        self.config_dir.join(format!("TaskInfo{trial:02}.json"))
    }

    /// Path of the companion image for the given trial.
    pub fn image_path(&self, trial: u32) -> PathBuf {
        self.config_dir.join(format!("TaskImage{trial:02}.jpg"))
    }

    /// Loads the task definition for one trial, including the flipped
    /// companion image when the descriptor declares one. Both loads complete
    /// fully before the result is returned.
    pub fn load(&self, trial: u32) -> Result<(TaskInfo, Option<TaskImage>), TaskError> {
        let task_info = self.read_task_info(trial)?;

        let task_image = if task_info.has_image {
            Some(self.read_flipped_task_image(trial)?)
        } else {
            None
        };

        Ok((task_info, task_image))
    }

    fn read_task_info(&self, trial: u32) -> Result<TaskInfo, TaskError> {
        let path = self.descriptor_path(trial);

        if !path.is_file() {
            return Err(TaskError::MissingDescriptor { trial, path });
        }

        let text = std::fs::read_to_string(&path).map_err(|source| TaskError::DescriptorIo {
            path: path.clone(),
            source,
        })?;

        serde_json::from_str(&text).map_err(|source| TaskError::DescriptorParse { path, source })
    }

    fn read_flipped_task_image(&self, trial: u32) -> Result<TaskImage, TaskError> {
        let path = self.image_path(trial);

        if !path.is_file() {
            return Err(TaskError::MissingImage { trial, path });
        }

        let original = image::open(&path).map_err(|source| {
            error!(path = %path.display(), "Couldn't read the task image file");
            TaskError::ImageDecode {
                path: path.clone(),
                source,
            }
        })?;

        // JPEG output carries no alpha channel, so normalize to RGB8.
        let flipped = DynamicImage::ImageRgb8(flip_vertical(&original).into_rgb8());

        let mut jpeg = Vec::new();
        flipped
            .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .map_err(|source| TaskError::ImageDecode { path, source })?;

        Ok(TaskImage {
            width: flipped.width(),
            height: flipped.height(),
            jpeg,
        })
    }
}
