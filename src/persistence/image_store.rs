//! Image files on local disk.

use super::{Persistence, SaveError, SavedImage};
use crate::config::{ImageFormat, OutputConfig};
use crate::provider::FrameBuffer;
use chrono::{Local, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes frames as `{timestamp}_{camera}.{ext}` under one directory.
#[derive(Clone, Debug)]
pub struct ImageStore {
    directory: PathBuf,
    format: ImageFormat,
    jpeg_quality: u8,
}

impl ImageStore {
    pub fn new(directory: impl Into<PathBuf>, format: ImageFormat) -> Self {
        Self {
            directory: directory.into(),
            format,
            jpeg_quality: crate::config::DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn from_config(output: &OutputConfig) -> Self {
        Self::new(output.directory.clone(), output.format).with_jpeg_quality(output.jpeg_quality)
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn file_name(&self, hint: &str) -> String {
        let stamp = Local::now().format("%Y%m%d_%H%M%S_%6f");
        let hint: String = hint
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("{}_{}.{}", stamp, hint, self.format.extension())
    }

    fn decode(frame: &FrameBuffer) -> Result<DynamicImage, SaveError> {
        if frame.is_empty() {
            return Err(SaveError::InvalidFrame("frame is empty".to_string()));
        }
        let image = image::load_from_memory(frame.as_bytes())
            .map_err(|e| SaveError::InvalidFrame(e.to_string()))?;
        if image.width() == 0 || image.height() == 0 {
            return Err(SaveError::InvalidFrame(format!(
                "invalid dimensions {}x{}",
                image.width(),
                image.height()
            )));
        }
        Ok(image)
    }

    fn write(&self, img: &DynamicImage, path: &Path) -> Result<(), SaveError> {
        let io_err = |source| SaveError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);

        match self.format {
            ImageFormat::Jpg => {
                let rgb = img.to_rgb8();
                JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality)
                    .encode_image(&rgb)
                    .map_err(|e| SaveError::Encode(e.to_string()))?;
            }
            ImageFormat::Png => {
                img.write_to(&mut writer, image::ImageFormat::Png)
                    .map_err(|e| SaveError::Encode(e.to_string()))?;
            }
        }

        writer.flush().map_err(io_err)
    }
}

impl Persistence for ImageStore {
    fn validate(&self, frame: &FrameBuffer) -> bool {
        match Self::decode(frame) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "Image validation failed");
                false
            }
        }
    }

    fn save(
        &mut self,
        frame: &FrameBuffer,
        destination_hint: &str,
    ) -> Result<SavedImage, SaveError> {
        let image = Self::decode(frame)?;

        if !self.directory.exists() {
            fs::create_dir_all(&self.directory).map_err(|source| SaveError::Io {
                path: self.directory.clone(),
                source,
            })?;
            tracing::info!(directory = %self.directory.display(), "Created output directory");
        }

        let path = self.directory.join(self.file_name(destination_hint));
        self.write(&image, &path)?;

        let size = fs::metadata(&path)
            .map_err(|source| SaveError::Io {
                path: path.clone(),
                source,
            })?
            .len();

        tracing::info!(path = %path.display(), size, "Saved image");

        Ok(SavedImage {
            path,
            size,
            format: self.format,
            width: image.width(),
            height: image.height(),
            timestamp: Utc::now(),
        })
    }
}
