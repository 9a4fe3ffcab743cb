use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::capture::{CaptureError, CaptureStatus, CapturedImage};
use crate::inference::InferenceError;
use crate::models::{PredictionResult, RewardRange};

use super::status::INITIAL_LOADING_MESSAGE;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FortuneStatus {
    Intro,
    Camera,
    Analyzing,
    Result,
    Error,
}

impl Default for FortuneStatus {
    fn default() -> Self {
        FortuneStatus::Intro
    }
}

impl FortuneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FortuneStatus::Intro => "INTRO",
            FortuneStatus::Camera => "CAMERA",
            FortuneStatus::Analyzing => "ANALYZING",
            FortuneStatus::Result => "RESULT",
            FortuneStatus::Error => "ERROR",
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, FortuneStatus::Result | FortuneStatus::Error)
    }
}

impl fmt::Display for FortuneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Start,
    Cancel,
    FrameCaptured,
    InferenceSucceeded,
    InferenceFailed,
    Reset,
    ConfigureRange,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Start => "start",
            Transition::Cancel => "cancel",
            Transition::FrameCaptured => "capture",
            Transition::InferenceSucceeded | Transition::InferenceFailed => "finish analysis",
            Transition::Reset => "reset",
            Transition::ConfigureRange => "configure reward range",
        }
    }
}

/// Where `transition` leads from `from`, or `None` if it is not allowed.
///
/// Reset from ANALYZING abandons the in-flight draw; its outcome is dropped
/// when it arrives.
pub fn next_status(from: FortuneStatus, transition: Transition) -> Option<FortuneStatus> {
    use FortuneStatus as S;
    use Transition as T;

    match (from, transition) {
        (S::Intro, T::Start) => Some(S::Camera),
        (S::Intro, T::ConfigureRange) => Some(S::Intro),
        (S::Camera, T::Cancel) => Some(S::Intro),
        (S::Camera, T::FrameCaptured) => Some(S::Analyzing),
        (S::Analyzing, T::InferenceSucceeded) => Some(S::Result),
        (S::Analyzing, T::InferenceFailed) => Some(S::Error),
        (S::Result | S::Error | S::Analyzing, T::Reset) => Some(S::Intro),
        _ => None,
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FortuneError {
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        from: FortuneStatus,
        action: &'static str,
    },
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub status: FortuneStatus,
    pub reward_range: RewardRange,
    pub captured_image: Option<CapturedImage>,
    pub result: Option<PredictionResult>,
    /// Rotating status line, only while ANALYZING.
    pub loading_message: Option<String>,
    /// Static copy for a failed camera acquisition, only while in CAMERA.
    pub camera_message: Option<String>,
    /// The capture trigger is live, only while in CAMERA.
    pub camera_ready: bool,
    /// Static copy for the ERROR screen.
    pub error_message: Option<String>,
    pub drawn_at: Option<DateTime<Utc>>,
    /// Identifies the draw currently in flight.
    #[serde(skip)]
    pub draw_id: Option<Uuid>,
    /// Identifies the capture view currently mounted.
    #[serde(skip)]
    pub camera_id: Option<Uuid>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(RewardRange::default())
    }
}

impl SessionState {
    pub fn new(reward_range: RewardRange) -> Self {
        Self {
            status: FortuneStatus::Intro,
            reward_range,
            captured_image: None,
            result: None,
            loading_message: None,
            camera_message: None,
            camera_ready: false,
            error_message: None,
            drawn_at: None,
            draw_id: None,
            camera_id: None,
        }
    }

    fn advance(&mut self, transition: Transition) -> Result<(), FortuneError> {
        match next_status(self.status, transition) {
            Some(next) => {
                self.status = next;
                Ok(())
            }
            None => Err(FortuneError::InvalidTransition {
                from: self.status,
                action: transition.as_str(),
            }),
        }
    }

    pub fn set_reward_range(&mut self, range: RewardRange) -> Result<(), FortuneError> {
        self.advance(Transition::ConfigureRange)?;
        self.reward_range = range;
        Ok(())
    }

    pub fn start(&mut self, camera_id: Uuid) -> Result<(), FortuneError> {
        self.advance(Transition::Start)?;
        self.clear_camera();
        self.camera_id = Some(camera_id);
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), FortuneError> {
        self.advance(Transition::Cancel)?;
        self.clear_camera();
        Ok(())
    }

    fn clear_camera(&mut self) {
        self.camera_id = None;
        self.camera_ready = false;
        self.camera_message = None;
    }

    pub fn is_current_camera(&self, camera_id: Uuid) -> bool {
        self.status == FortuneStatus::Camera && self.camera_id == Some(camera_id)
    }

    pub fn record_camera_failure(&mut self, err: &CaptureError) {
        if self.status == FortuneStatus::Camera {
            self.camera_ready = false;
            self.camera_message = Some(err.user_message().to_string());
        }
    }

    /// Records the acquisition verdict of camera `camera_id`. Returns `false`
    /// and changes nothing if that camera is no longer the mounted one or the
    /// status is still `Acquiring`.
    pub fn apply_camera_status(&mut self, camera_id: Uuid, status: &CaptureStatus) -> bool {
        if !self.is_current_camera(camera_id) {
            return false;
        }
        match status {
            CaptureStatus::Acquiring => false,
            CaptureStatus::Ready => {
                self.camera_ready = true;
                self.camera_message = None;
                true
            }
            CaptureStatus::Failed(err) => {
                self.record_camera_failure(err);
                true
            }
        }
    }

    /// Enters ANALYZING with a fresh image, replacing whatever the last cycle left.
    pub fn begin_analysis(&mut self, image: CapturedImage, draw_id: Uuid) -> Result<(), FortuneError> {
        self.advance(Transition::FrameCaptured)?;
        self.captured_image = Some(image);
        self.result = None;
        self.error_message = None;
        self.clear_camera();
        self.drawn_at = None;
        self.draw_id = Some(draw_id);
        self.loading_message = Some(INITIAL_LOADING_MESSAGE.to_string());
        Ok(())
    }

    pub fn is_current_draw(&self, draw_id: Uuid) -> bool {
        self.status == FortuneStatus::Analyzing && self.draw_id == Some(draw_id)
    }

    /// Applies an inference outcome. Returns `false` and leaves the state
    /// untouched if `draw_id` is no longer the draw in flight.
    pub fn complete(
        &mut self,
        draw_id: Uuid,
        outcome: Result<PredictionResult, InferenceError>,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.is_current_draw(draw_id) {
            return false;
        }

        match outcome {
            Ok(result) => {
                self.status = FortuneStatus::Result;
                self.result = Some(result);
                self.drawn_at = Some(now);
            }
            Err(err) => {
                self.status = FortuneStatus::Error;
                self.error_message = Some(err.user_message().to_string());
            }
        }
        self.draw_id = None;
        self.loading_message = None;
        true
    }

    pub fn reset(&mut self) -> Result<(), FortuneError> {
        self.advance(Transition::Reset)?;
        *self = Self::new(self.reward_range);
        Ok(())
    }
}
