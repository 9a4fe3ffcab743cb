pub mod device;
pub mod frame;
pub mod still;
pub mod view;

pub use device::{CaptureError, FacingMode, OpenFuture, StreamConstraints, VideoDevice, VideoStream};
pub use frame::{strip_data_uri_prefix, CapturedImage, JPEG_MIME, JPEG_QUALITY};
pub use still::StillImageDevice;
pub use view::{encode_still, CaptureStatus, CaptureView};
