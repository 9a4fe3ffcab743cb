pub mod capture;
pub mod fortune;
pub mod inference;
pub mod models;
pub mod presenter;
pub mod settings;
mod utils;

pub use capture::{CaptureError, CaptureStatus, CapturedImage, StillImageDevice};
pub use fortune::{ControllerOptions, FortuneController, FortuneSnapshot, FortuneStatus};
pub use inference::{analyze, GeminiClient, GenerativeModel, InferenceError};
pub use models::{PredictionResult, RewardRange};
pub use settings::AppConfig;
