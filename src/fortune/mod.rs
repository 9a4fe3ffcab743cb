pub mod controller;
pub mod state;
pub mod status;

pub use controller::{ControllerOptions, FortuneController, FortuneSnapshot};
pub use state::{FortuneError, FortuneStatus, SessionState, Transition};
pub use status::{StatusRotation, INITIAL_LOADING_MESSAGE, LOADING_MESSAGES};
