//! Onboarding plan calculation and chat phrasing suggestions.

use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::app::{errors, services::AppServices};
use crate::context::AuthContext;

const MIN_MINUTES_PER_DAY: u32 = 5;
const MAX_MINUTES_PER_DAY: u32 = 120;
const MAX_CHAT_TEXT_CHARS: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    #[serde(default = "default_goal_type")]
    pub goal_type: String,
    #[serde(default = "default_target_language")]
    pub target_language: String,
    pub minutes_per_day: u32,
}

fn default_goal_type() -> String {
    "both".to_string()
}

fn default_target_language() -> String {
    "English".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ChatAnalyzeRequest {
    pub text: String,
    #[serde(default = "default_tone")]
    pub tone_preference: String,
}

fn default_tone() -> String {
    "business".to_string()
}

fn check_rate_limit(services: &AppServices, ctx: &AuthContext) -> Result<(), Response> {
    match services.rate_limiter.allow(ctx.user_id().as_str()) {
        Ok(true) => Ok(()),
        Ok(false) => Err(errors::json_error(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "too many requests",
        )),
        Err(error) => {
            tracing::error!(%error, "rate limiter failure");
            Err(errors::internal_error())
        }
    }
}

/// Turn a daily time budget into a practice plan. The counts scale linearly
/// with the budget, floored so even the smallest plan has something to do.
pub async fn calculate_plan(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<PlanRequest>,
) -> Response {
    if let Err(response) = check_rate_limit(&services, &ctx) {
        return response;
    }

    if !matches!(req.goal_type.as_str(), "business" | "daily" | "both") {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "goal_type must be one of business, daily, both",
        );
    }
    if req.minutes_per_day < MIN_MINUTES_PER_DAY || req.minutes_per_day > MAX_MINUTES_PER_DAY {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            format!(
                "minutes_per_day must be between {MIN_MINUTES_PER_DAY} and {MAX_MINUTES_PER_DAY}"
            ),
        );
    }

    let plan = DailyPlan::for_budget(req.minutes_per_day);
    Json(json!({
        "minutes_per_day": plan.minutes_per_day,
        "words_count": plan.words_count,
        "sentences_count": plan.sentences_count,
        "chat_turns": plan.chat_turns,
        "plan_preview": plan.preview(),
    }))
    .into_response()
}

/// Suggest alternative phrasings for a chat message, shaped by the caller's
/// tone preference.
pub async fn analyze_chat(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<AuthContext>,
    Json(req): Json<ChatAnalyzeRequest>,
) -> Response {
    if let Err(response) = check_rate_limit(&services, &ctx) {
        return response;
    }

    let text = req.text.trim();
    if text.is_empty() || text.chars().count() > MAX_CHAT_TEXT_CHARS {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            format!("text must be 1 to {MAX_CHAT_TEXT_CHARS} characters"),
        );
    }
    if !matches!(req.tone_preference.as_str(), "business" | "daily") {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "tone_preference must be business or daily",
        );
    }

    let alternatives: Vec<_> = chat_alternatives(&req.tone_preference)
        .iter()
        .map(|(category, text)| json!({ "category": category, "text": text }))
        .collect();
    Json(json!({
        "original": text,
        "alternatives": alternatives,
    }))
    .into_response()
}

struct DailyPlan {
    minutes_per_day: u32,
    words_count: u32,
    sentences_count: u32,
    chat_turns: u32,
}

impl DailyPlan {
    fn for_budget(minutes_per_day: u32) -> Self {
        let minutes = f64::from(minutes_per_day);
        Self {
            minutes_per_day,
            words_count: ((minutes * 0.8) as u32).max(4),
            sentences_count: ((minutes * 0.3) as u32).max(2),
            chat_turns: ((minutes * 0.25) as u32).max(2),
        }
    }

    fn preview(&self) -> String {
        format!(
            "{} min/day → {} words + {} sentences + {} chat turns",
            self.minutes_per_day, self.words_count, self.sentences_count, self.chat_turns
        )
    }
}

fn chat_alternatives(tone_preference: &str) -> &'static [(&'static str, &'static str)] {
    if tone_preference == "business" {
        &[
            ("business", "Could we revisit this tomorrow?"),
            ("business", "Let me review this and get back to you."),
            ("natural", "I am tied up right now, can we reschedule?"),
        ]
    } else {
        &[
            ("daily", "Can we do this a bit later?"),
            ("daily", "I am swamped right now."),
            ("natural", "Let us pick this up tomorrow."),
        ]
    }
}
