//! Referral Telemetry Endpoints
//!
//! 인메모리 분석 그래프의 HTTP 표면. 내구 추천 저장소와는 별개의
//! 신호이며 서로 조정되지 않는다.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::services::{ReferralNode, TelemetryStats, VisitEvent};
use crate::AppState;

// ============ Request/Response Types ============

/// 방문 기록 요청
#[derive(Debug, Deserialize)]
pub struct TrackVisitRequest {
    pub referrer_id: i64,
    /// 방문자 id — 봇에서 /start를 누른 뒤에야 알 수 있다
    pub visitor_id: Option<i64>,
    /// 유입 경로 태그 ("landing", "whatsapp", ...)
    pub source: Option<String>,
    /// 클라이언트가 보낸 unix timestamp (초). 없으면 서버 시각.
    pub ts: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct TrackVisitResponse {
    pub status: String,
    pub stored: bool,
    pub event: VisitEvent,
}

// ============ Handlers ============

/// POST /api/referral/track_visit
pub async fn track_visit(
    State(state): State<AppState>,
    Json(req): Json<TrackVisitRequest>,
) -> Json<TrackVisitResponse> {
    let ts = req
        .ts
        .and_then(|secs| DateTime::from_timestamp(secs as i64, 0));

    let event = state
        .telemetry
        .record_visit(req.referrer_id, req.visitor_id, req.source.as_deref(), ts);

    Json(TrackVisitResponse {
        status: "ok".to_string(),
        stored: true,
        event,
    })
}

/// GET /api/referral/stats
pub async fn referral_stats(State(state): State<AppState>) -> Json<TelemetryStats> {
    Json(state.telemetry.stats())
}

/// GET /api/referral/tree/:user_id
///
/// 기록이 없는 사용자도 빈 트리를 받는다 — 클라이언트를 깨지 않는다.
pub async fn referral_tree(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Json<ReferralNode> {
    Json(state.telemetry.tree(user_id))
}
