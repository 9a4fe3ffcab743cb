use std::future::Future;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const INITIAL_LOADING_MESSAGE: &str = "Đang gieo quẻ đầu năm...";

pub const LOADING_MESSAGES: [&str; 8] = [
    "Đang xem tướng mạo...",
    "Đang lắc ống xăm...",
    "Đang hỏi ý kiến Táo Quân...",
    "Đang tính toán độ dày ví tiền...",
    "Đang soi độ duyên dáng...",
    "Đang tìm quẻ 'Mã Đáo Thành Công'...",
    "Chờ chút, thầy đang cho ngựa ăn...",
    "Đang đếm hạt dưa...",
];

pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_millis(1500);

pub fn pick_message<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    LOADING_MESSAGES
        .choose(rng)
        .copied()
        .unwrap_or(INITIAL_LOADING_MESSAGE)
}

/// Periodic status-line rotation owned by whoever spawned it.
///
/// `on_tick` receives a freshly picked message every `period`; returning
/// `false` ends the rotation. Dropping the handle stops it as well.
pub struct StatusRotation {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl StatusRotation {
    pub fn spawn<F, Fut>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(&'static str) -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send,
    {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let message = pick_message(&mut rand::thread_rng());
                        if !on_tick(message).await {
                            break;
                        }
                    }
                    _ = token.cancelled() => {
                        break;
                    }
                }
            }
        });

        Self {
            cancel_token,
            handle,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.cancel_token.is_cancelled() && !self.handle.is_finished()
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
        self.handle.abort();
    }
}

impl Drop for StatusRotation {
    fn drop(&mut self) {
        self.stop();
    }
}
