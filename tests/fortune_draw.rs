use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{Rgb, RgbImage};
use tokio::sync::Notify;

use lucky_fortune_lib::capture::{
    CaptureError, CaptureStatus, OpenFuture, StreamConstraints, VideoDevice, VideoStream,
};
use lucky_fortune_lib::fortune::{
    ControllerOptions, FortuneController, FortuneError, FortuneStatus, LOADING_MESSAGES,
};
use lucky_fortune_lib::inference::{GenerateFuture, GenerationRequest, GenerativeModel};
use lucky_fortune_lib::{presenter, RewardRange};

const FORTUNE: &str = r#"{"title":"Ngựa Sắt","description":"...","luckyMoney":"123.000đ","advice":"...","strength":"..."}"#;

struct RedPixelStream {
    stopped: Arc<AtomicBool>,
}

impl VideoStream for RedPixelStream {
    fn is_ready(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    fn grab_frame(&mut self) -> Result<RgbImage, CaptureError> {
        Ok(RgbImage::from_pixel(1, 1, Rgb([255, 0, 0])))
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

struct RedPixelCamera {
    refuse: Option<CaptureError>,
    stopped: Arc<AtomicBool>,
}

impl RedPixelCamera {
    fn granting() -> Arc<Self> {
        Arc::new(Self {
            refuse: None,
            stopped: Arc::new(AtomicBool::new(false)),
        })
    }

    fn refusing(err: CaptureError) -> Arc<Self> {
        Arc::new(Self {
            refuse: Some(err),
            stopped: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl VideoDevice for RedPixelCamera {
    fn open<'a>(&'a self, _constraints: &'a StreamConstraints) -> OpenFuture<'a> {
        Box::pin(async move {
            if let Some(err) = &self.refuse {
                return Err(err.clone());
            }
            Ok(Box::new(RedPixelStream {
                stopped: Arc::clone(&self.stopped),
            }) as Box<dyn VideoStream>)
        })
    }
}

/// Replies with `reply` to every call, optionally waiting for `gate` first.
struct MockModel {
    reply: Option<String>,
    gate: Option<Arc<Notify>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockModel {
    fn replying(reply: Option<&str>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.map(str::to_string),
            gate: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn gated(reply: &str, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            gate: Some(gate),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GenerativeModel for MockModel {
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> GenerateFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(self.reply.clone())
        })
    }
}

fn controller(model: Arc<MockModel>) -> FortuneController {
    FortuneController::new(model, ControllerOptions::default())
}

async fn capture_red_pixel(controller: &FortuneController, camera: Arc<RedPixelCamera>) {
    controller.start(camera).await.unwrap();
    assert_eq!(controller.wait_for_camera().await, Some(CaptureStatus::Ready));
    assert!(controller.capture().await.unwrap());
}

#[tokio::test]
async fn red_pixel_draw_reaches_result() {
    let model = MockModel::replying(Some(FORTUNE));
    let controller = controller(model.clone());
    controller
        .set_reward_range(RewardRange::new(50_000, 500_000))
        .await
        .unwrap();

    let camera = RedPixelCamera::granting();
    capture_red_pixel(&controller, camera.clone()).await;
    assert!(camera.stopped.load(Ordering::SeqCst), "camera released after capture");

    let snapshot = controller.wait_for_outcome().await.unwrap();
    assert_eq!(snapshot.state.status, FortuneStatus::Result);
    let result = snapshot.state.result.clone().unwrap();
    assert_eq!(result.title, "Ngựa Sắt");
    assert_eq!(result.lucky_money, "123.000đ");
    assert!(presenter::render(&snapshot).contains("123.000đ"));
    assert_eq!(controller.result().await, Some(result));

    assert_eq!(model.calls(), 1);
    let requests = model.requests.lock().unwrap();
    assert_eq!(requests[0].mime_type, "image/jpeg");
    assert!(requests[0].image_base64.starts_with("/9j/"));
    assert!(requests[0].instructions.contains("từ 50000 đến 500000"));
    assert_eq!(
        snapshot.state.captured_image.as_ref().unwrap().base64_payload(),
        requests[0].image_base64
    );
}

#[tokio::test]
async fn malformed_responses_end_in_error() {
    let replies = [
        None,
        Some("not json at all"),
        Some(r#"{"title":"t","description":"d","advice":"a","strength":"s"}"#),
    ];

    for reply in replies {
        let model = MockModel::replying(reply);
        let controller = controller(model.clone());
        capture_red_pixel(&controller, RedPixelCamera::granting()).await;

        let snapshot = controller.wait_for_outcome().await.unwrap();
        assert_eq!(snapshot.state.status, FortuneStatus::Error, "reply {reply:?}");
        assert!(snapshot.state.result.is_none());
        assert!(!snapshot.status_rotating);
        assert_eq!(model.calls(), 1);
    }
}

#[tokio::test]
async fn permission_denial_never_reaches_inference() {
    let model = MockModel::replying(Some(FORTUNE));
    let controller = controller(model.clone());

    controller
        .start(RedPixelCamera::refusing(CaptureError::PermissionDenied))
        .await
        .unwrap();
    assert_eq!(
        controller.wait_for_camera().await,
        Some(CaptureStatus::Failed(CaptureError::PermissionDenied))
    );

    let snapshot = controller.snapshot().await;
    assert_eq!(
        snapshot.state.camera_message.as_deref(),
        Some(CaptureError::PermissionDenied.user_message())
    );
    assert_ne!(
        snapshot.state.camera_message.as_deref(),
        Some(CaptureError::DeviceUnavailable(String::new()).user_message())
    );

    assert_eq!(
        controller.capture().await,
        Err(FortuneError::Capture(CaptureError::PermissionDenied))
    );
    assert_eq!(controller.status().await, FortuneStatus::Camera);

    controller.cancel().await.unwrap();
    assert_eq!(controller.status().await, FortuneStatus::Intro);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn reset_clears_previous_cycle() {
    let model = MockModel::replying(Some(FORTUNE));
    let controller = controller(model);
    capture_red_pixel(&controller, RedPixelCamera::granting()).await;
    controller.wait_for_outcome().await.unwrap();

    controller.reset().await.unwrap();
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.state.status, FortuneStatus::Intro);
    assert!(snapshot.state.captured_image.is_none());
    assert!(snapshot.state.result.is_none());
    assert_eq!(snapshot.state.reward_range, RewardRange::default());

    controller.start(RedPixelCamera::granting()).await.unwrap();
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.state.status, FortuneStatus::Camera);
    assert!(snapshot.state.result.is_none());
}

#[tokio::test]
async fn late_response_after_reset_is_dropped() {
    let gate = Arc::new(Notify::new());
    let model = MockModel::gated(FORTUNE, Arc::clone(&gate));
    let controller = controller(model.clone());

    capture_red_pixel(&controller, RedPixelCamera::granting()).await;
    while model.calls() == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(controller.status().await, FortuneStatus::Analyzing);

    controller.reset().await.unwrap();
    assert!(!controller.is_status_rotating().await);

    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.state.status, FortuneStatus::Intro);
    assert!(snapshot.state.result.is_none());
    assert!(snapshot.state.captured_image.is_none());
}

#[tokio::test]
async fn transitions_are_refused_while_analyzing() {
    let gate = Arc::new(Notify::new());
    let model = MockModel::gated(FORTUNE, Arc::clone(&gate));
    let controller = controller(model.clone());
    capture_red_pixel(&controller, RedPixelCamera::granting()).await;

    assert!(controller.start(RedPixelCamera::granting()).await.is_err());
    assert!(controller.capture().await.is_err());
    assert!(controller.cancel().await.is_err());
    assert!(controller
        .set_reward_range(RewardRange::new(1, 2))
        .await
        .is_err());

    gate.notify_one();
    let snapshot = controller.wait_for_outcome().await.unwrap();
    assert_eq!(snapshot.state.status, FortuneStatus::Result);
    assert_eq!(model.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn status_rotation_lives_only_while_analyzing() {
    let gate = Arc::new(Notify::new());
    let model = MockModel::gated(FORTUNE, Arc::clone(&gate));
    let controller = controller(model);
    capture_red_pixel(&controller, RedPixelCamera::granting()).await;
    assert!(controller.is_status_rotating().await);

    tokio::time::sleep(Duration::from_millis(1600)).await;
    let rotating = controller.snapshot().await;
    let message = rotating.state.loading_message.unwrap();
    assert!(LOADING_MESSAGES.contains(&message.as_str()));

    gate.notify_one();
    let settled = controller.wait_for_outcome().await.unwrap();
    assert_eq!(settled.state.status, FortuneStatus::Result);
    assert!(!controller.is_status_rotating().await);

    let mut updates = controller.subscribe();
    updates.borrow_and_update();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!updates.has_changed().unwrap());
    assert!(controller.snapshot().await.state.loading_message.is_none());
}

#[tokio::test]
async fn capture_is_noop_until_stream_ready() {
    struct SlowCamera {
        gate: Arc<Notify>,
    }

    impl VideoDevice for SlowCamera {
        fn open<'a>(&'a self, _constraints: &'a StreamConstraints) -> OpenFuture<'a> {
            Box::pin(async move {
                self.gate.notified().await;
                Ok(Box::new(RedPixelStream {
                    stopped: Arc::new(AtomicBool::new(false)),
                }) as Box<dyn VideoStream>)
            })
        }
    }

    let gate = Arc::new(Notify::new());
    let model = MockModel::replying(Some(FORTUNE));
    let controller = controller(model.clone());
    controller
        .start(Arc::new(SlowCamera {
            gate: Arc::clone(&gate),
        }))
        .await
        .unwrap();

    assert!(!controller.capture().await.unwrap());
    assert_eq!(controller.status().await, FortuneStatus::Camera);
    assert_eq!(model.calls(), 0);

    gate.notify_one();
    assert_eq!(controller.wait_for_camera().await, Some(CaptureStatus::Ready));
    assert!(controller.capture().await.unwrap());
    assert_eq!(
        controller.wait_for_outcome().await.unwrap().state.status,
        FortuneStatus::Result
    );
}

#[tokio::test]
async fn camera_refusal_is_published_without_waiting() {
    let model = MockModel::replying(Some(FORTUNE));
    let controller = controller(model.clone());
    let mut updates = controller.subscribe();

    controller
        .start(RedPixelCamera::refusing(CaptureError::PermissionDenied))
        .await
        .unwrap();

    let snapshot = tokio::time::timeout(
        Duration::from_secs(1),
        updates.wait_for(|snapshot| snapshot.state.camera_message.is_some()),
    )
    .await
    .expect("refusal published")
    .unwrap()
    .clone();

    assert_eq!(snapshot.state.status, FortuneStatus::Camera);
    assert!(!snapshot.state.camera_ready);
    assert_eq!(
        snapshot.state.camera_message.as_deref(),
        Some(CaptureError::PermissionDenied.user_message())
    );
    assert_eq!(
        presenter::render(&snapshot),
        CaptureError::PermissionDenied.user_message()
    );
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn camera_readiness_is_published_without_waiting() {
    let controller = controller(MockModel::replying(Some(FORTUNE)));
    let mut updates = controller.subscribe();

    controller.start(RedPixelCamera::granting()).await.unwrap();

    let snapshot = tokio::time::timeout(
        Duration::from_secs(1),
        updates.wait_for(|snapshot| snapshot.state.camera_ready),
    )
    .await
    .expect("readiness published")
    .unwrap()
    .clone();

    assert_eq!(snapshot.state.status, FortuneStatus::Camera);
    assert!(snapshot.state.camera_message.is_none());
    assert_eq!(presenter::render(&snapshot), "Cười tươi lên nào!");
}

#[tokio::test]
async fn late_camera_verdict_is_ignored_after_cancel() {
    let gate = Arc::new(Notify::new());

    struct GatedRefusal {
        gate: Arc<Notify>,
    }

    impl VideoDevice for GatedRefusal {
        fn open<'a>(&'a self, _constraints: &'a StreamConstraints) -> OpenFuture<'a> {
            Box::pin(async move {
                self.gate.notified().await;
                Err(CaptureError::PermissionDenied)
            })
        }
    }

    let controller = controller(MockModel::replying(Some(FORTUNE)));
    controller
        .start(Arc::new(GatedRefusal {
            gate: Arc::clone(&gate),
        }))
        .await
        .unwrap();
    controller.cancel().await.unwrap();

    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.state.status, FortuneStatus::Intro);
    assert!(snapshot.state.camera_message.is_none());
}

#[tokio::test]
async fn wait_for_outcome_returns_when_no_draw_is_in_flight() {
    let gate = Arc::new(Notify::new());
    let model = MockModel::gated(FORTUNE, Arc::clone(&gate));
    let controller = controller(model.clone());
    let within = Duration::from_secs(1);

    let intro = tokio::time::timeout(within, controller.wait_for_outcome()).await;
    assert!(intro.expect("returns from INTRO").is_none());

    controller.start(RedPixelCamera::granting()).await.unwrap();
    let camera = tokio::time::timeout(within, controller.wait_for_outcome()).await;
    assert!(camera.expect("returns from CAMERA").is_none());

    assert_eq!(controller.wait_for_camera().await, Some(CaptureStatus::Ready));
    assert!(controller.capture().await.unwrap());
    let waiter = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.wait_for_outcome().await })
    };
    while model.calls() == 0 {
        tokio::task::yield_now().await;
    }
    controller.reset().await.unwrap();

    let abandoned = tokio::time::timeout(within, waiter).await;
    assert!(abandoned.expect("returns after reset").unwrap().is_none());
}

#[tokio::test]
async fn full_size_frame_is_captured_at_native_resolution() {
    struct WideStream;

    impl VideoStream for WideStream {
        fn is_ready(&self) -> bool {
            true
        }

        fn grab_frame(&mut self) -> Result<RgbImage, CaptureError> {
            Ok(RgbImage::from_pixel(1280, 720, Rgb([200, 30, 30])))
        }

        fn stop(&mut self) {}
    }

    struct WideCamera;

    impl VideoDevice for WideCamera {
        fn open<'a>(&'a self, _constraints: &'a StreamConstraints) -> OpenFuture<'a> {
            Box::pin(async move { Ok(Box::new(WideStream) as Box<dyn VideoStream>) })
        }
    }

    let model = MockModel::replying(Some(FORTUNE));
    let controller = controller(model.clone());
    controller.start(Arc::new(WideCamera)).await.unwrap();
    assert_eq!(controller.wait_for_camera().await, Some(CaptureStatus::Ready));
    assert!(controller.capture().await.unwrap());

    let snapshot = controller.wait_for_outcome().await.unwrap();
    let image = snapshot.state.captured_image.unwrap();
    let decoded = image::load_from_memory(&image.decode_bytes().unwrap()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (1280, 720));
    assert_eq!(model.calls(), 1);
}
