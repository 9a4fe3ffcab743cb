use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::capture::{view, CaptureStatus, CaptureView, StreamConstraints, VideoDevice};
use crate::inference::{self, GenerativeModel, InferenceError};
use crate::models::{PredictionResult, RewardRange};

use super::state::{FortuneError, FortuneStatus, SessionState};
use super::status::{StatusRotation, DEFAULT_STATUS_INTERVAL};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FortuneSnapshot {
    pub state: SessionState,
    pub status_rotating: bool,
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub reward_range: RewardRange,
    pub status_interval: Duration,
    pub constraints: StreamConstraints,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            reward_range: RewardRange::default(),
            status_interval: DEFAULT_STATUS_INTERVAL,
            constraints: StreamConstraints::default(),
        }
    }
}

struct Inner {
    state: Mutex<SessionState>,
    capture: Mutex<Option<CaptureView>>,
    rotation: Mutex<Option<StatusRotation>>,
    snapshot_tx: watch::Sender<FortuneSnapshot>,
    model: Arc<dyn GenerativeModel>,
    options: ControllerOptions,
}

/// Drives one session through INTRO → CAMERA → ANALYZING → RESULT/ERROR.
///
/// Locks are always taken in the order state, capture, rotation.
#[derive(Clone)]
pub struct FortuneController {
    inner: Arc<Inner>,
}

impl FortuneController {
    pub fn new(model: Arc<dyn GenerativeModel>, options: ControllerOptions) -> Self {
        warn_if_inverted(options.reward_range);

        let state = SessionState::new(options.reward_range);
        let (snapshot_tx, _) = watch::channel(FortuneSnapshot {
            state: state.clone(),
            status_rotating: false,
        });

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                capture: Mutex::new(None),
                rotation: Mutex::new(None),
                snapshot_tx,
                model,
                options,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FortuneSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    pub async fn snapshot(&self) -> FortuneSnapshot {
        let state = self.inner.state.lock().await;
        self.inner.snapshot_of(&state).await
    }

    pub async fn status(&self) -> FortuneStatus {
        self.inner.state.lock().await.status
    }

    pub async fn is_status_rotating(&self) -> bool {
        self.inner.is_rotating().await
    }

    pub async fn set_reward_range(&self, range: RewardRange) -> Result<(), FortuneError> {
        let mut state = self.inner.state.lock().await;
        state.set_reward_range(range)?;
        warn_if_inverted(range);
        self.inner.publish(&state).await;
        Ok(())
    }

    /// INTRO → CAMERA. Starts acquiring `device` in the background.
    ///
    /// The acquisition verdict is folded into the published state as soon as
    /// it lands, whether or not anyone is waiting on it.
    pub async fn start(&self, device: Arc<dyn VideoDevice>) -> Result<(), FortuneError> {
        let mut state = self.inner.state.lock().await;
        let camera_id = Uuid::new_v4();
        state.start(camera_id)?;

        let view = CaptureView::mount(device, self.inner.options.constraints.clone());
        let status_rx = view.watch_status();
        if let Some(stale) = self.inner.capture.lock().await.replace(view) {
            stale.dismantle();
        }

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let status = view::wait_settled(status_rx).await;
            if let Some(inner) = weak.upgrade() {
                inner.settle_camera(camera_id, &status).await;
            }
        });

        log_info!("capture view {camera_id} mounted");
        self.inner.publish(&state).await;
        Ok(())
    }

    /// Waits for the camera to be granted or refused. `None` outside CAMERA.
    pub async fn wait_for_camera(&self) -> Option<CaptureStatus> {
        let camera_id = self.inner.state.lock().await.camera_id?;
        let status_rx = {
            let capture = self.inner.capture.lock().await;
            capture.as_ref()?.watch_status()
        };

        let status = view::wait_settled(status_rx).await;
        self.inner.settle_camera(camera_id, &status).await;
        Some(status)
    }

    /// CAMERA → INTRO. Releases the camera.
    pub async fn cancel(&self) -> Result<(), FortuneError> {
        let mut state = self.inner.state.lock().await;
        state.cancel()?;
        self.inner.release_camera().await;
        self.inner.publish(&state).await;
        Ok(())
    }

    /// Snapshots the camera and, on success, enters ANALYZING.
    ///
    /// Returns `Ok(false)` without changing anything while the stream is not
    /// ready yet, or if the session left CAMERA while the frame was encoding.
    pub async fn capture(&self) -> Result<bool, FortuneError> {
        let (camera_id, frame, quality) = {
            let mut state = self.inner.state.lock().await;
            let camera_id = match state.camera_id {
                Some(camera_id) if state.status == FortuneStatus::Camera => camera_id,
                _ => {
                    return Err(FortuneError::InvalidTransition {
                        from: state.status,
                        action: "capture",
                    })
                }
            };

            let grabbed = match self.inner.capture.lock().await.as_ref() {
                Some(view) => view
                    .grab_frame()
                    .map(|frame| frame.map(|frame| (frame, view.quality()))),
                None => Ok(None),
            };

            match grabbed {
                Ok(Some((frame, quality))) => (camera_id, frame, quality),
                Ok(None) => return Ok(false),
                Err(err) => {
                    log_warn!("capture rejected: {err}");
                    state.record_camera_failure(&err);
                    self.inner.publish(&state).await;
                    return Err(err.into());
                }
            }
        };

        let encoded = view::encode_still(frame, quality).await;

        let mut state = self.inner.state.lock().await;
        if !state.is_current_camera(camera_id) {
            log_info!("discarding frame from capture view {camera_id}; session moved on");
            return Ok(false);
        }

        let image = match encoded {
            Ok(image) => image,
            Err(err) => {
                log_warn!("capture rejected: {err}");
                state.record_camera_failure(&err);
                self.inner.publish(&state).await;
                return Err(err.into());
            }
        };

        let draw_id = Uuid::new_v4();
        state.begin_analysis(image.clone(), draw_id)?;
        self.inner.release_camera().await;

        let range = state.reward_range;
        log_info!("draw {draw_id} started ({}..{})", range.min, range.max);

        self.inner.start_rotation(draw_id).await;

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let outcome = inference::analyze(inner.model.as_ref(), &image, range).await;
            inner.finish_analysis(draw_id, outcome).await;
        });

        self.inner.publish(&state).await;
        Ok(true)
    }

    /// RESULT/ERROR → INTRO, or abandons an ANALYZING draw.
    pub async fn reset(&self) -> Result<(), FortuneError> {
        let mut state = self.inner.state.lock().await;
        let abandoned = state.draw_id;
        state.reset()?;
        self.inner.release_camera().await;
        self.inner.stop_rotation().await;

        if let Some(draw_id) = abandoned {
            log_info!("draw {draw_id} abandoned by reset");
        }
        self.inner.publish(&state).await;
        Ok(())
    }

    /// Waits for the draw in flight to settle.
    ///
    /// Resolves with the RESULT or ERROR snapshot, or immediately with `None`
    /// if there is no draw in flight (INTRO, CAMERA) or it gets abandoned.
    pub async fn wait_for_outcome(&self) -> Option<FortuneSnapshot> {
        let mut rx = self.subscribe();
        let waited = rx
            .wait_for(|snapshot| snapshot.state.status != FortuneStatus::Analyzing)
            .await
            .map(|snapshot| (*snapshot).clone());
        let snapshot = match waited {
            Ok(snapshot) => snapshot,
            Err(_) => self.snapshot().await,
        };

        snapshot.state.status.is_settled().then_some(snapshot)
    }

    pub async fn result(&self) -> Option<PredictionResult> {
        self.inner.state.lock().await.result.clone()
    }
}

fn warn_if_inverted(range: RewardRange) {
    if !range.is_ordered() {
        log_warn!(
            "reward range is inverted ({} > {}); passing it through unchanged",
            range.min,
            range.max
        );
    }
}

impl Inner {
    async fn is_rotating(&self) -> bool {
        self.rotation
            .lock()
            .await
            .as_ref()
            .is_some_and(StatusRotation::is_running)
    }

    async fn snapshot_of(&self, state: &SessionState) -> FortuneSnapshot {
        FortuneSnapshot {
            state: state.clone(),
            status_rotating: self.is_rotating().await,
        }
    }

    async fn publish(&self, state: &SessionState) {
        let snapshot = self.snapshot_of(state).await;
        self.snapshot_tx.send_replace(snapshot);
    }

    async fn settle_camera(&self, camera_id: Uuid, status: &CaptureStatus) {
        let mut state = self.state.lock().await;
        if !state.apply_camera_status(camera_id, status) {
            return;
        }

        match status {
            CaptureStatus::Failed(err) => {
                log_warn!("capture view {camera_id} failed: {err}");
            }
            _ => {
                log_info!("capture view {camera_id} ready");
            }
        }
        self.publish(&state).await;
    }

    async fn release_camera(&self) {
        if let Some(view) = self.capture.lock().await.take() {
            view.dismantle();
        }
    }

    async fn start_rotation(self: &Arc<Self>, draw_id: Uuid) {
        let weak: Weak<Inner> = Arc::downgrade(self);
        let rotation = StatusRotation::spawn(self.options.status_interval, move |message| {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => inner.rotate_status(draw_id, message).await,
                    None => false,
                }
            }
        });

        if let Some(previous) = self.rotation.lock().await.replace(rotation) {
            previous.stop();
        }
    }

    async fn stop_rotation(&self) {
        if let Some(rotation) = self.rotation.lock().await.take() {
            rotation.stop();
        }
    }

    async fn rotate_status(&self, draw_id: Uuid, message: &'static str) -> bool {
        let mut state = self.state.lock().await;
        if !state.is_current_draw(draw_id) {
            return false;
        }
        state.loading_message = Some(message.to_string());
        self.snapshot_tx.send_replace(FortuneSnapshot {
            state: state.clone(),
            status_rotating: true,
        });
        true
    }

    async fn finish_analysis(
        &self,
        draw_id: Uuid,
        outcome: Result<PredictionResult, InferenceError>,
    ) {
        let mut state = self.state.lock().await;
        let succeeded = outcome.is_ok();
        if !state.complete(draw_id, outcome, Utc::now()) {
            log_info!("dropping outcome of superseded draw {draw_id}");
            return;
        }

        self.stop_rotation().await;
        log_info!(
            "draw {draw_id} finished: {}",
            if succeeded { "result" } else { "error" }
        );
        self.publish(&state).await;
    }
}
