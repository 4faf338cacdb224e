//! Payment Ledger Endpoints
//!
//! 결제 제출과 운영자 해소(승인/거절). 저장소가 진실의 원천이고,
//! 커밋 이후의 알림/카운터는 best-effort다.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::db::models::{ApprovalStats, MonthlyPaymentRow, PaymentStatus};
use crate::routes::{require_admin, AdminTokenQuery};
use crate::{error::ApiError, AppState};

// ============ Request/Response Types ============

/// 결제 증빙 제출 요청
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub user_id: i64,
    pub username: Option<String>,
    /// 불투명 결제수단 태그 ("bank", "paybox", "ton", ...)
    pub pay_method: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub payment_id: i64,
    pub status: String,
}

/// 운영자 해소 요청
///
/// user_id는 운영자가 넘긴 원시 숫자 그대로다 — 존재 검증 없음.
/// 결제 이력이 없는 id면 저장소가 조용히 no-op 처리한다.
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub user_id: i64,
    pub outcome: ResolveOutcome,
    pub reason: Option<String>,
}

/// 운영자가 고를 수 있는 결과 — pending으로 되돌리는 길은 없다
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveOutcome {
    Approved,
    Rejected,
}

impl From<ResolveOutcome> for PaymentStatus {
    fn from(outcome: ResolveOutcome) -> Self {
        match outcome {
            ResolveOutcome::Approved => PaymentStatus::Approved,
            ResolveOutcome::Rejected => PaymentStatus::Rejected,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub user_id: i64,
    pub status: String,
}

/// 월별 집계 쿼리 파라미터 (생략하면 이번 달)
#[derive(Debug, Deserialize)]
pub struct MonthlyQuery {
    pub token: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct MonthlyResponse {
    pub year: i32,
    pub month: u32,
    pub rows: Vec<MonthlyPaymentRow>,
}

// ============ Handlers ============

/// POST /api/payments/submit
///
/// 증빙 수신 → pending 결제 행 생성. 이미지 자체는 여기로 오지 않고,
/// 게이트웨이 어댑터가 결제수단 태그만 넘긴다.
pub async fn submit_payment(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    if req.pay_method.trim().is_empty() {
        return Err(ApiError::ValidationError("pay_method must not be empty".to_string()));
    }

    state.store.store_user(req.user_id, req.username.as_deref()).await?;
    let payment_id = state
        .store
        .record_submission(req.user_id, req.username.as_deref(), &req.pay_method)
        .await?;

    if let Err(err) = state.store.incr_metric("payment_submissions", 1).await {
        tracing::warn!(error = %err, "failed to count payment submission");
    }

    // 커밋 이후의 운영 채널 알림 — 실패해도 제출은 성립
    state
        .notifier
        .notify_admin(&format!(
            "New payment proof: user_id={} method={} payment_id={}",
            req.user_id, req.pay_method, payment_id
        ))
        .await;

    Ok(Json(SubmitResponse {
        payment_id,
        status: "pending".to_string(),
    }))
}

/// POST /api/payments/resolve
///
/// 해당 사용자의 가장 최근 결제를 승인/거절한다. 승인이면 프로모터
/// 행을 만들고 승인 카운터를 올린 뒤 사용자에게 안내를 보낸다.
/// 알림은 커밋 이후이며 실패해도 상태는 그대로 남는다.
pub async fn resolve_payment(
    State(state): State<AppState>,
    Query(auth): Query<AdminTokenQuery>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    require_admin(&state.config, auth.token.as_deref())?;

    let status: PaymentStatus = req.outcome.into();
    state
        .store
        .resolve_latest(req.user_id, status, req.reason.as_deref())
        .await?;

    match req.outcome {
        ResolveOutcome::Approved => {
            state.store.ensure_promoter(req.user_id).await?;
            if let Err(err) = state.store.incr_metric("approved_payments", 1).await {
                tracing::warn!(error = %err, "failed to count approval");
            }

            let text = format!(
                "Payment approved! Your personal share link: {}\nCommunity group: {}",
                state.config.personal_share_link(req.user_id),
                state.config.community_group_link,
            );
            state.notifier.notify_user(req.user_id, &text).await;
        }
        ResolveOutcome::Rejected => {
            let text = match &req.reason {
                Some(reason) => format!("Payment proof rejected. Reason: {}", reason),
                None => "Payment proof rejected.".to_string(),
            };
            state.notifier.notify_user(req.user_id, &text).await;
        }
    }

    Ok(Json(ResolveResponse {
        user_id: req.user_id,
        status: status.as_str().to_string(),
    }))
}

/// GET /api/payments/stats
pub async fn payment_stats(
    State(state): State<AppState>,
    Query(auth): Query<AdminTokenQuery>,
) -> Result<Json<ApprovalStats>, ApiError> {
    require_admin(&state.config, auth.token.as_deref())?;

    let stats = state.store.approval_stats().await?;
    Ok(Json(stats))
}

/// GET /api/payments/monthly
pub async fn monthly_breakdown(
    State(state): State<AppState>,
    Query(query): Query<MonthlyQuery>,
) -> Result<Json<MonthlyResponse>, ApiError> {
    require_admin(&state.config, query.token.as_deref())?;

    let now = Utc::now();
    let year = query.year.unwrap_or_else(|| now.year());
    let month = query.month.unwrap_or_else(|| now.month());
    if !(1..=12).contains(&month) {
        return Err(ApiError::ValidationError("month must be 1..=12".to_string()));
    }

    let rows = state.store.monthly_breakdown(year, month).await?;
    Ok(Json(MonthlyResponse { year, month, rows }))
}
