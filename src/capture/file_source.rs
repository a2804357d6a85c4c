use async_trait::async_trait;
use image::{ DynamicImage, ImageReader };
use log::{ debug, info };
use std::fs;
use std::path::{ Path, PathBuf };
use std::sync::{ Arc, Mutex };
use std::time::SystemTime;

use super::{ DisplayCapture, ReadyState, VideoSource };
use crate::error::{ GhostError, Result };

/// Display capture backed by an image file that an external recorder keeps
/// overwriting. With no path configured, capture is unsupported.
pub struct FileDisplayCapture {
    path: Option<PathBuf>,
}

impl FileDisplayCapture {
    pub fn new(path: Option<impl Into<PathBuf>>) -> Self {
        Self { path: path.map(Into::into) }
    }
}

#[async_trait]
impl DisplayCapture for FileDisplayCapture {
    async fn acquire(&self) -> Result<Arc<dyn VideoSource>> {
        let path = self.path.as_ref().ok_or(GhostError::CaptureUnsupported)?;
        if !path.exists() {
            return Err(
                GhostError::CapturePermission(format!("frame source {} does not exist", path.display()))
            );
        }
        info!("Display stream bound to {}", path.display());
        Ok(Arc::new(FileVideoSource::new(path)))
    }
}

pub struct FileVideoSource {
    path: PathBuf,
    // Last decoded frame keyed by the file's mtime.
    cache: Mutex<Option<(SystemTime, DynamicImage)>>,
}

impl FileVideoSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cache: Mutex::new(None),
        }
    }

    fn load(&self) -> Option<DynamicImage> {
        let modified = fs::metadata(&self.path).and_then(|m| m.modified()).ok()?;
        let mut cache = self.cache.lock().ok()?;
        if let Some((stamp, image)) = cache.as_ref() {
            if *stamp == modified {
                return Some(image.clone());
            }
        }

        let decoded = ImageReader::open(&self.path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(image::ImageError::IoError)
            .and_then(|reader| reader.decode());
        match decoded {
            Ok(image) => {
                *cache = Some((modified, image.clone()));
                Some(image)
            }
            Err(e) => {
                // Usually the recorder is mid-write; the next tick retries.
                debug!("Frame source {} not decodable yet: {}", self.path.display(), e);
                None
            }
        }
    }
}

impl VideoSource for FileVideoSource {
    fn ready_state(&self) -> ReadyState {
        if !self.path.exists() {
            ReadyState::HaveNothing
        } else if self.load().is_some() {
            ReadyState::HaveCurrentData
        } else {
            ReadyState::HaveMetadata
        }
    }

    fn current_frame(&self) -> Option<DynamicImage> {
        self.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ GenericImageView, RgbImage };

    #[tokio::test]
    async fn unconfigured_path_is_unsupported() {
        let capture = FileDisplayCapture::new(None::<PathBuf>);
        let err = capture.acquire().await.err().expect("must fail");
        assert!(matches!(err, GhostError::CaptureUnsupported));
    }

    #[tokio::test]
    async fn missing_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let capture = FileDisplayCapture::new(Some(dir.path().join("screen.png")));
        let err = capture.acquire().await.err().expect("must fail");
        assert!(matches!(err, GhostError::CapturePermission(_)));
    }

    #[tokio::test]
    async fn decodable_file_is_ready() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screen.png");
        RgbImage::from_pixel(40, 20, image::Rgb([1, 2, 3])).save(&path).unwrap();

        let source = FileDisplayCapture::new(Some(&path)).acquire().await.unwrap();
        assert_eq!(source.ready_state(), ReadyState::HaveCurrentData);
        assert_eq!(source.current_frame().unwrap().dimensions(), (40, 20));
    }

    #[test]
    fn garbage_file_only_has_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screen.png");
        fs::write(&path, b"half-written").unwrap();

        let source = FileVideoSource::new(&path);
        assert_eq!(source.ready_state(), ReadyState::HaveMetadata);
        assert!(source.current_frame().is_none());
    }
}
