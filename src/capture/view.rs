use std::sync::{Arc, Mutex, MutexGuard};

use image::RgbImage;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::device::{CaptureError, StreamConstraints, VideoDevice, VideoStream};
use super::frame::{CapturedImage, JPEG_QUALITY};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

type StreamSlot = Arc<Mutex<Option<Box<dyn VideoStream>>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
    Acquiring,
    Ready,
    Failed(CaptureError),
}

/// Holds the camera for as long as the capture screen is up.
///
/// Acquisition runs in the background from [`CaptureView::mount`]. The stream
/// is released by [`CaptureView::dismantle`] or on drop, and a stream that is
/// granted after that point is stopped instead of being installed.
pub struct CaptureView {
    stream: StreamSlot,
    status_rx: watch::Receiver<CaptureStatus>,
    cancel_token: CancellationToken,
    quality: u8,
}

impl CaptureView {
    pub fn mount(device: Arc<dyn VideoDevice>, constraints: StreamConstraints) -> Self {
        let stream: StreamSlot = Arc::new(Mutex::new(None));
        let cancel_token = CancellationToken::new();
        let (status_tx, status_rx) = watch::channel(CaptureStatus::Acquiring);

        tokio::spawn(acquire_stream(
            device,
            constraints,
            Arc::clone(&stream),
            status_tx,
            cancel_token.clone(),
        ));

        Self {
            stream,
            status_rx,
            cancel_token,
            quality: JPEG_QUALITY,
        }
    }

    pub fn status(&self) -> CaptureStatus {
        self.status_rx.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<CaptureStatus> {
        self.status_rx.clone()
    }

    /// Waits until acquisition either succeeds or fails.
    pub async fn wait_until_settled(&self) -> CaptureStatus {
        wait_settled(self.watch_status()).await
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Copies the current frame out of the stream.
    ///
    /// Returns `Ok(None)` while the stream is not ready yet.
    pub fn grab_frame(&self) -> Result<Option<RgbImage>, CaptureError> {
        if let CaptureStatus::Failed(err) = self.status() {
            return Err(err);
        }

        let mut slot = lock_slot(&self.stream);
        let Some(stream) = slot.as_mut() else {
            return Ok(None);
        };
        if !stream.is_ready() {
            return Ok(None);
        }

        stream.grab_frame().map(Some)
    }

    /// Snapshots the current frame as a JPEG still, encoding inline.
    pub fn snapshot(&self) -> Result<Option<CapturedImage>, CaptureError> {
        match self.grab_frame()? {
            Some(frame) => encode_frame(&frame, self.quality).map(Some),
            None => Ok(None),
        }
    }

    pub fn is_dismantled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    pub fn dismantle(&self) {
        self.cancel_token.cancel();
        if let Some(mut stream) = lock_slot(&self.stream).take() {
            stream.stop();
            log_info!("camera stream released");
        }
    }
}

impl Drop for CaptureView {
    fn drop(&mut self) {
        self.dismantle();
    }
}

fn encode_frame(frame: &RgbImage, quality: u8) -> Result<CapturedImage, CaptureError> {
    CapturedImage::encode_jpeg(frame, quality)
        .map_err(|err| CaptureError::DeviceUnavailable(format!("jpeg encode failed: {err}")))
}

/// JPEG-encodes `frame` on the blocking pool.
pub async fn encode_still(frame: RgbImage, quality: u8) -> Result<CapturedImage, CaptureError> {
    tokio::task::spawn_blocking(move || encode_frame(&frame, quality))
        .await
        .map_err(|err| {
            CaptureError::DeviceUnavailable(format!("jpeg encode worker join failed: {err}"))
        })?
}

/// Resolves once `status_rx` leaves `Acquiring`, or with the last status
/// seen if acquisition was abandoned first.
pub async fn wait_settled(mut status_rx: watch::Receiver<CaptureStatus>) -> CaptureStatus {
    let settled = status_rx
        .wait_for(|status| *status != CaptureStatus::Acquiring)
        .await
        .map(|status| (*status).clone());

    match settled {
        Ok(status) => status,
        Err(_) => status_rx.borrow().clone(),
    }
}

fn lock_slot(slot: &StreamSlot) -> MutexGuard<'_, Option<Box<dyn VideoStream>>> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

async fn acquire_stream(
    device: Arc<dyn VideoDevice>,
    constraints: StreamConstraints,
    slot: StreamSlot,
    status_tx: watch::Sender<CaptureStatus>,
    cancel_token: CancellationToken,
) {
    match device.open(&constraints).await {
        Ok(stream) => {
            if install_stream(&slot, stream, &cancel_token) {
                let _ = status_tx.send(CaptureStatus::Ready);
            }
        }
        Err(err) => {
            log_warn!("camera acquisition failed: {err}");
            if !cancel_token.is_cancelled() {
                let _ = status_tx.send(CaptureStatus::Failed(err));
            }
        }
    }
}

/// Checked under the slot lock so a concurrent `dismantle` either sees the
/// stream and stops it, or the stream is stopped here.
fn install_stream(
    slot: &StreamSlot,
    mut stream: Box<dyn VideoStream>,
    cancel_token: &CancellationToken,
) -> bool {
    let mut guard = lock_slot(slot);
    if cancel_token.is_cancelled() {
        stream.stop();
        log_info!("camera granted after capture view closed; stream stopped");
        return false;
    }
    *guard = Some(stream);
    true
}
