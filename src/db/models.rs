//! Database Models
//!
//! Typed records for the payment and referral ledger.
//! Replaces untyped row maps with explicit structs decoded via `sqlx::FromRow`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 결제 상태
///
/// pending에서 approved/rejected로 한 방향으로만 전이된다.
/// 이미 해소된 행에 resolve를 다시 적용하면 상태/사유를 덮어쓴다 —
/// 이중 해소 가드는 없다 (운영상 리스크로 표시, 동작은 유지).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

/// 결제 제출 기록
///
/// 한 사용자가 여러 번 제출할 수 있다. "해소 대상" 결제는 항상
/// 그 사용자의 가장 최근 created_at 행이다. 행은 삭제되지 않는다.
#[derive(Debug, Clone, FromRow)]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub pay_method: String,
    /// pending / approved / rejected
    pub status: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 월별 (결제수단, 상태)별 집계 행
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MonthlyPaymentRow {
    pub pay_method: String,
    pub status: String,
    pub count: i64,
}

/// 전체 결제 승인 통계
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct ApprovalStats {
    pub total: i64,
    pub approved: i64,
    pub rejected: i64,
    pub pending: i64,
}

/// 추천 리더보드 한 줄
///
/// 정렬 기준: distinct 추천 수 내림차순, 동률이면 리워드 포인트 합계
/// 내림차순. 리워드가 전혀 없는 추천인도 포함된다 (left join).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TopReferrer {
    pub referrer_id: i64,
    pub username: Option<String>,
    pub total_referrals: i64,
    pub total_points: i64,
}

/// 프로모터 설정 행
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Promoter {
    pub user_id: i64,
    pub bank_details: Option<String>,
    pub personal_group_link: Option<String>,
    pub global_group_link: Option<String>,
    pub custom_price: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 프로모터 요약 (설정 + 추천 실적)
#[derive(Debug, Clone, Serialize)]
pub struct PromoterSummary {
    #[serde(flatten)]
    pub promoter: Promoter,
    pub total_referrals: i64,
    /// 가장 최근 결제가 approved인 피추천인 수
    pub approved_referrals: i64,
}

/// 프로모터 설정 부분 업데이트
///
/// None인 필드는 건드리지 않는다. 모든 필드가 None이면
/// 저장소 호출 자체가 일어나지 않는다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromoterSettingsUpdate {
    pub bank_details: Option<String>,
    pub personal_group_link: Option<String>,
    pub global_group_link: Option<String>,
}

impl PromoterSettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.bank_details.is_none()
            && self.personal_group_link.is_none()
            && self.global_group_link.is_none()
    }
}
