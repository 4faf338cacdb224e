//! Referral Graph & Promoter Endpoints
//!
//! 내구 추천 그래프(간선은 한 번 기록되면 수정/삭제되지 않는다)와
//! 프로모터 설정. 자기 추천 차단은 여기(호출자 경계)에서 한다 —
//! 저장소는 어떤 쌍이든 받아들인다.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::models::{PromoterSettingsUpdate, PromoterSummary, TopReferrer};
use crate::{error::ApiError, AppState};

// ============ Request/Response Types ============

#[derive(Debug, Deserialize)]
pub struct ReferralRequest {
    pub referrer_id: i64,
    pub referred_user_id: i64,
    /// 유입 경로 태그 ("bot_start", "landing", ...)
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReferralResponse {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

/// 프로모터 요약 응답 (실적 + 개인 공유 링크)
#[derive(Debug, Serialize)]
pub struct PromoterResponse {
    #[serde(flatten)]
    pub summary: PromoterSummary,
    pub personal_link: String,
}

// ============ Handlers ============

/// POST /api/referrals
pub async fn add_referral(
    State(state): State<AppState>,
    Json(req): Json<ReferralRequest>,
) -> Result<Json<ReferralResponse>, ApiError> {
    if req.referrer_id == req.referred_user_id {
        return Err(ApiError::ValidationError(
            "self-referral is not allowed".to_string(),
        ));
    }

    state
        .store
        .add_referral(req.referrer_id, req.referred_user_id, req.source.as_deref())
        .await?;

    Ok(Json(ReferralResponse {
        status: "ok".to_string(),
    }))
}

/// GET /api/referrals/top
pub async fn top_referrers(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<TopReferrer>>, ApiError> {
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let rows = state.store.top_referrers(limit).await?;
    Ok(Json(rows))
}

/// GET /api/promoters/:user_id
///
/// 프로모터 행이 없으면 404 — "아직 자산이 없다"는 명시적 상태.
pub async fn promoter_summary(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<PromoterResponse>, ApiError> {
    let summary = state
        .store
        .promoter_summary(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("promoter".to_string()))?;

    Ok(Json(PromoterResponse {
        summary,
        personal_link: state.config.personal_share_link(user_id),
    }))
}

/// POST /api/promoters/:user_id/settings
///
/// 명시된 필드만 갱신한다. ensure가 선행되므로 승인 전에 설정을
/// 먼저 만진 사용자도 행을 갖게 된다.
pub async fn update_promoter_settings(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(update): Json<PromoterSettingsUpdate>,
) -> Result<Json<ReferralResponse>, ApiError> {
    if update.is_empty() {
        return Err(ApiError::ValidationError(
            "at least one settings field is required".to_string(),
        ));
    }

    state.store.ensure_promoter(user_id).await?;
    state.store.update_promoter_settings(user_id, &update).await?;

    Ok(Json(ReferralResponse {
        status: "ok".to_string(),
    }))
}
