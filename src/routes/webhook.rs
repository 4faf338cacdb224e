//! Inbound Webhook Endpoint
//!
//! 봇 플랫폼이 호출하는 진입점. 여기서 하는 일은 정확히 두 가지다:
//! update_id 기준 중복 판정, 그리고 중복이 아닌 update를 디스패치
//! 협력자에게 넘기는 것. 플랫폼은 at-least-once 전달이므로 중복도
//! 항상 200으로 응답한다 — 재시도 폭주를 막기 위한 전제 조건.

use axum::{extract::State, http::StatusCode, Json};

use crate::{error::ApiError, AppState};

/// POST /webhook
pub async fn telegram_webhook(
    State(state): State<AppState>,
    Json(update): Json<serde_json::Value>,
) -> Result<StatusCode, ApiError> {
    let update_id = update
        .get("update_id")
        .and_then(serde_json::Value::as_i64)
        .ok_or_else(|| ApiError::ValidationError("update_id is required".to_string()))?;

    if state.dedup.seen_or_mark(update_id) {
        tracing::warn!(update_id, "duplicate update – ignoring");
        // 카운터는 best-effort — 실패해도 응답은 200
        if let Err(err) = state.store.incr_metric("duplicate_updates", 1).await {
            tracing::warn!(error = %err, "failed to count duplicate update");
        }
        return Ok(StatusCode::OK);
    }

    state.dispatcher.dispatch(update).await;

    Ok(StatusCode::OK)
}
