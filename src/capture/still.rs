use std::io;
use std::path::{Path, PathBuf};

use image::{imageops::FilterType, RgbImage};

use super::device::{CaptureError, OpenFuture, StreamConstraints, VideoDevice, VideoStream};

/// A "camera" backed by an image file, for running without video hardware.
///
/// Opening reads and decodes the file once; frames larger than the requested
/// ideal size are scaled down to fit it.
#[derive(Debug, Clone)]
pub struct StillImageDevice {
    path: PathBuf,
}

impl StillImageDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VideoDevice for StillImageDevice {
    fn open<'a>(&'a self, constraints: &'a StreamConstraints) -> OpenFuture<'a> {
        Box::pin(async move {
            let bytes = tokio::fs::read(&self.path)
                .await
                .map_err(|err| map_io_error(&self.path, err))?;

            let (max_width, max_height) = (constraints.ideal_width, constraints.ideal_height);
            let frame = tokio::task::spawn_blocking(move || decode_frame(&bytes, max_width, max_height))
                .await
                .map_err(|err| {
                    CaptureError::DeviceUnavailable(format!("frame decode worker join failed: {err}"))
                })??;

            Ok(Box::new(StillImageStream { frame: Some(frame) }) as Box<dyn VideoStream>)
        })
    }
}

fn map_io_error(path: &Path, err: io::Error) -> CaptureError {
    match err.kind() {
        io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied,
        _ => CaptureError::DeviceUnavailable(format!("{}: {err}", path.display())),
    }
}

fn decode_frame(bytes: &[u8], max_width: u32, max_height: u32) -> Result<RgbImage, CaptureError> {
    let image = image::load_from_memory(bytes)
        .map_err(|err| CaptureError::DeviceUnavailable(format!("unreadable image: {err}")))?;

    let image = if image.width() > max_width || image.height() > max_height {
        image.resize(max_width, max_height, FilterType::Triangle)
    } else {
        image
    };

    Ok(image.to_rgb8())
}

struct StillImageStream {
    frame: Option<RgbImage>,
}

impl VideoStream for StillImageStream {
    fn is_ready(&self) -> bool {
        self.frame.is_some()
    }

    fn grab_frame(&mut self) -> Result<RgbImage, CaptureError> {
        self.frame
            .clone()
            .ok_or_else(|| CaptureError::DeviceUnavailable("stream stopped".into()))
    }

    fn stop(&mut self) {
        self.frame = None;
    }
}
