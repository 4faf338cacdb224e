//! Admin Dashboard & Reward Endpoints
//!
//! 읽기 전용 대시보드 집계와 수동 리워드 발급. 전부 공유 토큰으로
//! 보호된다 — 토큰 미설정 시 잠김.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{ApprovalStats, MonthlyPaymentRow, TopReferrer};
use crate::routes::{require_admin, AdminTokenQuery};
use crate::{error::ApiError, AppState};

// ============ Request/Response Types ============

#[derive(Debug, Serialize)]
pub struct AdminStatsResponse {
    pub store: String,
    pub payments_stats: ApprovalStats,
    pub monthly_breakdown: Vec<MonthlyPaymentRow>,
    pub top_referrers: Vec<TopReferrer>,
}

#[derive(Debug, Deserialize)]
pub struct RewardRequest {
    pub user_id: i64,
    pub points: i32,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct RewardResponse {
    pub status: String,
}

// ============ Handlers ============

/// GET /admin/stats
///
/// 대시보드 한 화면 분량의 집계: 승인 통계 + 이번 달 분해 + Top 5.
pub async fn admin_stats(
    State(state): State<AppState>,
    Query(auth): Query<AdminTokenQuery>,
) -> Result<Json<AdminStatsResponse>, ApiError> {
    require_admin(&state.config, auth.token.as_deref())?;

    let now = Utc::now();
    let payments_stats = state.store.approval_stats().await?;
    let monthly = state.store.monthly_breakdown(now.year(), now.month()).await?;
    let top = state.store.top_referrers(5).await?;

    Ok(Json(AdminStatsResponse {
        store: state.store.backend().to_string(),
        payments_stats,
        monthly_breakdown: monthly,
        top_referrers: top,
    }))
}

/// POST /api/rewards
///
/// 커뮤니티 활동에 대한 수동 리워드. 포인트 합계는 리더보드 동률
/// 판정에 쓰인다.
pub async fn create_reward(
    State(state): State<AppState>,
    Query(auth): Query<AdminTokenQuery>,
    Json(req): Json<RewardRequest>,
) -> Result<Json<RewardResponse>, ApiError> {
    require_admin(&state.config, auth.token.as_deref())?;

    if req.reason.trim().is_empty() {
        return Err(ApiError::ValidationError("reason must not be empty".to_string()));
    }

    state
        .store
        .create_reward(req.user_id, &state.config.token.symbol, &req.reason, req.points)
        .await?;

    // 커밋 이후 안내 — 실패해도 리워드는 남는다
    state
        .notifier
        .notify_user(
            req.user_id,
            &format!(
                "You received a {} reward ({} pts): {}",
                state.config.token.symbol, req.points, req.reason
            ),
        )
        .await;

    Ok(Json(RewardResponse {
        status: "ok".to_string(),
    }))
}
