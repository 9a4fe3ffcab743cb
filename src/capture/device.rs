use std::future::Future;
use std::pin::Pin;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const IDEAL_WIDTH: u32 = 1280;
pub const IDEAL_HEIGHT: u32 = 720;

const PERMISSION_MESSAGE: &str = "Vui lòng cấp quyền camera để thầy bói xem mặt.";
const DEVICE_MESSAGE: &str = "Không thể mở camera. Vui lòng kiểm tra thiết bị.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum FacingMode {
    User,
    Environment,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StreamConstraints {
    pub facing: FacingMode,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            facing: FacingMode::User,
            ideal_width: IDEAL_WIDTH,
            ideal_height: IDEAL_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("camera permission denied")]
    PermissionDenied,
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),
}

impl CaptureError {
    /// Static copy shown in the capture view.
    pub fn user_message(&self) -> &'static str {
        match self {
            CaptureError::PermissionDenied => PERMISSION_MESSAGE,
            CaptureError::DeviceUnavailable(_) => DEVICE_MESSAGE,
        }
    }
}

/// A live, exclusively held video feed.
pub trait VideoStream: Send {
    /// True once the feed has produced metadata and frames can be read.
    fn is_ready(&self) -> bool;

    fn grab_frame(&mut self) -> Result<RgbImage, CaptureError>;

    /// Releases the underlying device. Must be idempotent.
    fn stop(&mut self);
}

pub type OpenFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Box<dyn VideoStream>, CaptureError>> + Send + 'a>>;

/// Boundary to whatever grants camera access.
pub trait VideoDevice: Send + Sync {
    fn open<'a>(&'a self, constraints: &'a StreamConstraints) -> OpenFuture<'a>;
}
