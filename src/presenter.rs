//! Plain-text rendering of a session snapshot.
//!
//! Everything here is a pure function of the snapshot.

use std::fmt::Write;

use crate::fortune::{FortuneSnapshot, FortuneStatus};
use crate::models::{PredictionResult, RewardRange};

pub const ERROR_TITLE: &str = "Quẻ này khó quá!";
pub const ERROR_BODY: &str =
    "Thầy bói đang bận đi chúc Tết hoặc mạng bị nghẽn. Vui lòng thử lại sau nhé.";
pub const SHARE_FALLBACK: &str = "Chụp màn hình lại để đòi lì xì nhé!";
const ANALYZING_TITLE: &str = "Thầy đang luận giải";
const CAMERA_PROMPT: &str = "Cười tươi lên nào!";
const CAMERA_OPENING: &str = "Đang mở camera...";
const INTRO_TITLE: &str = "Năm Ngựa bạn là ai?";

/// Groups thousands with dots and appends `đ`, e.g. `50.000đ`.
pub fn format_vnd(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out.push('đ');
    out
}

pub fn share_title(result: &PredictionResult) -> String {
    format!("Quẻ bói Tết 2026: {}", result.title)
}

pub fn share_text(result: &PredictionResult) -> String {
    format!(
        "Năm 2026 tui là: {}. {} Lì xì tui: {} nha!",
        result.title, result.description, result.lucky_money
    )
}

/// Text a narrator would read out for the result card.
pub fn narration_text(result: &PredictionResult) -> String {
    format!(
        "Chúc mừng năm mới. Bạn chính là {}. {}",
        result.title, result.description
    )
}

pub fn render_card(result: &PredictionResult) -> String {
    let mut card = String::new();
    writeln!(card, "=== Quẻ Bói Đầu Xuân ===").unwrap();
    writeln!(card, "{}", result.title.to_uppercase()).unwrap();
    writeln!(card).unwrap();
    writeln!(card, "\u{201C}{}\u{201D}", result.description).unwrap();
    writeln!(card).unwrap();
    writeln!(card, "Lì xì:      {}", result.lucky_money).unwrap();
    writeln!(card, "Siêu năng lực: {}", result.strength).unwrap();
    write!(card, "Lời khuyên: {}", result.advice).unwrap();
    card
}

fn render_intro(range: RewardRange) -> String {
    format!(
        "{INTRO_TITLE}\nLì xì: {} – {}",
        format_vnd(range.min),
        format_vnd(range.max)
    )
}

pub fn render(snapshot: &FortuneSnapshot) -> String {
    let state = &snapshot.state;
    match state.status {
        FortuneStatus::Intro => render_intro(state.reward_range),
        FortuneStatus::Camera => match &state.camera_message {
            Some(message) => message.clone(),
            None if state.camera_ready => CAMERA_PROMPT.to_string(),
            None => CAMERA_OPENING.to_string(),
        },
        FortuneStatus::Analyzing => format!(
            "{ANALYZING_TITLE}\n\"{}\"",
            state.loading_message.as_deref().unwrap_or_default()
        ),
        FortuneStatus::Result => match (&state.captured_image, &state.result) {
            (Some(_), Some(result)) => render_card(result),
            _ => String::new(),
        },
        FortuneStatus::Error => format!("{ERROR_TITLE}\n{ERROR_BODY}"),
    }
}
