//! Repository Seam
//!
//! # Interview Q&A
//!
//! Q: Repository 패턴이란?
//! A: 데이터 접근 로직을 추상화하는 패턴
//!
//!    장점:
//!    - 비즈니스 로직과 데이터 접근 분리
//!    - 테스트 시 인메모리 구현으로 대체 쉬움
//!    - 저장소 없는 배포(no-op)를 호출부 수정 없이 지원
//!
//! Q: 왜 컴포넌트별 trait 대신 하나의 trait인가?
//! A: 구현체가 어차피 전부 같은 저장소(Postgres 풀 / 인메모리 맵)다.
//!    결제 원장, 추천 그래프, 프로모터 설정, 메트릭 카운터는 섹션으로
//!    구분하고, 선택은 시작 시점에 단 한 번 한다 — 호출부마다
//!    "DB가 있나?" 검사를 흩뿌리지 않는다.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{
    ApprovalStats, MonthlyPaymentRow, PaymentStatus, PromoterSettingsUpdate, PromoterSummary,
    TopReferrer,
};

/// 게이트웨이의 모든 내구 저장 연산
///
/// 모든 변경은 단일 statement로 커밋된다 — 부분 적용 상태는 없다.
/// 에러는 호출자에게 전파되어 해당 작업만 중단시킨다.
#[async_trait]
pub trait GatewayStore: Send + Sync {
    /// 구현체 식별 (health/admin 응답용)
    fn backend(&self) -> &'static str;

    /// 연결 상태 점검
    async fn ping(&self) -> Result<()>;

    // ============ users ============

    /// 사용자 upsert — 접촉할 때마다 핸들을 갱신한다. id는 불변.
    async fn store_user(&self, user_id: i64, username: Option<&str>) -> Result<()>;

    // ============ payment ledger ============

    /// pending 결제 행 생성, 생성된 id 반환. 알림 등 다른 부수효과 없음.
    async fn record_submission(
        &self,
        user_id: i64,
        username: Option<&str>,
        pay_method: &str,
    ) -> Result<i64>;

    /// 해당 사용자의 가장 최근 결제 행의 상태/사유를 갱신한다.
    ///
    /// 결제 이력이 없는 사용자면 아무 행도 바꾸지 않고 조용히 성공한다 —
    /// 운영자가 넘긴 원시 id는 상류에서 존재 검증을 하지 않는다.
    ///
    /// 사용자 단위 직렬화는 없다: 같은 사용자에 대한 동시 해소, 혹은
    /// 제출과 해소의 경합은 순서가 보장되지 않는다. 이미 해소된 행을
    /// 다시 해소하면 덮어쓴다.
    async fn resolve_latest(
        &self,
        user_id: i64,
        outcome: PaymentStatus,
        reason: Option<&str>,
    ) -> Result<()>;

    /// 주어진 달의 (결제수단, 상태)별 건수
    async fn monthly_breakdown(&self, year: i32, month: u32) -> Result<Vec<MonthlyPaymentRow>>;

    /// 전체 total/approved/rejected/pending 건수
    async fn approval_stats(&self) -> Result<ApprovalStats>;

    // ============ referral store ============

    /// 추천 간선 insert-or-ignore. (referrer, referred, source) 삼중으로
    /// 유일하다. 자기 추천 차단은 호출자 책임 — 저장소는 어떤 쌍이든 받는다.
    async fn add_referral(
        &self,
        referrer_id: i64,
        referred_user_id: i64,
        source: Option<&str>,
    ) -> Result<()>;

    /// 추천 리더보드
    async fn top_referrers(&self, limit: i64) -> Result<Vec<TopReferrer>>;

    /// (전체 피추천인 수, 가장 최근 결제가 approved인 피추천인 수)
    async fn promoter_referral_counts(&self, user_id: i64) -> Result<(i64, i64)>;

    // ============ promoter registry ============

    /// 프로모터 행 insert-or-ignore
    async fn ensure_promoter(&self, user_id: i64) -> Result<()>;

    /// 명시된 필드만 갱신. 전부 None이면 저장소 호출 없이 반환.
    /// 하나라도 바뀌면 updated_at을 갱신한다.
    async fn update_promoter_settings(
        &self,
        user_id: i64,
        update: &PromoterSettingsUpdate,
    ) -> Result<()>;

    /// 프로모터 행 + 추천 실적. 행이 없으면 None (에러 아님).
    async fn promoter_summary(&self, user_id: i64) -> Result<Option<PromoterSummary>>;

    // ============ reward ledger ============

    /// 수동 리워드 발급. 포인트 합계는 리더보드 동률 판정에 쓰인다.
    async fn create_reward(
        &self,
        user_id: i64,
        reward_type: &str,
        reason: &str,
        points: i32,
    ) -> Result<()>;

    // ============ metrics ============

    /// upsert-add 카운터. 음수 delta 허용 (하한/상한 없음).
    async fn incr_metric(&self, key: &str, delta: i64) -> Result<()>;

    /// 카운터 값, 없으면 0
    async fn get_metric(&self, key: &str) -> Result<i64>;
}

/// 저장소 없는 배포용 no-op 구현
///
/// DATABASE_URL 없이 기동하면 시작 시점에 이 구현이 선택된다.
/// 쓰기는 경고 로그만 남기고 성공 처리, 읽기는 빈 값/0을 돌려준다.
pub struct NullStore;

#[async_trait]
impl GatewayStore for NullStore {
    fn backend(&self) -> &'static str {
        "null"
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn store_user(&self, user_id: i64, _username: Option<&str>) -> Result<()> {
        tracing::warn!(user_id, "store_user called without a database; ignoring");
        Ok(())
    }

    async fn record_submission(
        &self,
        user_id: i64,
        _username: Option<&str>,
        _pay_method: &str,
    ) -> Result<i64> {
        tracing::warn!(user_id, "record_submission called without a database; ignoring");
        Ok(0)
    }

    async fn resolve_latest(
        &self,
        user_id: i64,
        _outcome: PaymentStatus,
        _reason: Option<&str>,
    ) -> Result<()> {
        tracing::warn!(user_id, "resolve_latest called without a database; ignoring");
        Ok(())
    }

    async fn monthly_breakdown(&self, _year: i32, _month: u32) -> Result<Vec<MonthlyPaymentRow>> {
        Ok(Vec::new())
    }

    async fn approval_stats(&self) -> Result<ApprovalStats> {
        Ok(ApprovalStats::default())
    }

    async fn add_referral(
        &self,
        referrer_id: i64,
        _referred_user_id: i64,
        _source: Option<&str>,
    ) -> Result<()> {
        tracing::warn!(referrer_id, "add_referral called without a database; ignoring");
        Ok(())
    }

    async fn top_referrers(&self, _limit: i64) -> Result<Vec<TopReferrer>> {
        Ok(Vec::new())
    }

    async fn promoter_referral_counts(&self, _user_id: i64) -> Result<(i64, i64)> {
        Ok((0, 0))
    }

    async fn ensure_promoter(&self, user_id: i64) -> Result<()> {
        tracing::warn!(user_id, "ensure_promoter called without a database; ignoring");
        Ok(())
    }

    async fn update_promoter_settings(
        &self,
        user_id: i64,
        _update: &PromoterSettingsUpdate,
    ) -> Result<()> {
        tracing::warn!(
            user_id,
            "update_promoter_settings called without a database; ignoring"
        );
        Ok(())
    }

    async fn promoter_summary(&self, _user_id: i64) -> Result<Option<PromoterSummary>> {
        Ok(None)
    }

    async fn create_reward(
        &self,
        user_id: i64,
        _reward_type: &str,
        _reason: &str,
        _points: i32,
    ) -> Result<()> {
        tracing::warn!(user_id, "create_reward called without a database; ignoring");
        Ok(())
    }

    async fn incr_metric(&self, _key: &str, _delta: i64) -> Result<()> {
        Ok(())
    }

    async fn get_metric(&self, _key: &str) -> Result<i64> {
        Ok(0)
    }
}

// 테스트용 인메모리 구현:

#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::{Datelike, Utc};

    use super::*;
    use crate::db::models::Promoter;

    #[derive(Debug, Clone)]
    struct MemPayment {
        user_id: i64,
        pay_method: String,
        status: PaymentStatus,
        #[allow(dead_code)]
        reason: Option<String>,
        created_at: chrono::DateTime<Utc>,
    }

    #[derive(Default)]
    struct MemoryState {
        users: HashMap<i64, Option<String>>,
        payments: Vec<MemPayment>,
        next_payment_id: i64,
        /// (referrer, referred, normalized source)
        referrals: Vec<(i64, i64, String)>,
        /// (user, points)
        rewards: Vec<(i64, i32)>,
        promoters: HashMap<i64, Promoter>,
        metrics: HashMap<String, i64>,
    }

    /// SQL 구현과 같은 의미론을 갖는 인메모리 저장소
    pub struct MemoryStore {
        inner: Mutex<MemoryState>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self {
                inner: Mutex::new(MemoryState::default()),
            }
        }
    }

    impl MemoryState {
        /// 해당 사용자의 가장 최근 결제 상태
        fn latest_status(&self, user_id: i64) -> Option<PaymentStatus> {
            self.payments
                .iter()
                .rev()
                .find(|p| p.user_id == user_id)
                .map(|p| p.status)
        }

        fn referral_counts(&self, user_id: i64) -> (i64, i64) {
            let mut referred: Vec<i64> = self
                .referrals
                .iter()
                .filter(|(r, _, _)| *r == user_id)
                .map(|(_, v, _)| *v)
                .collect();
            referred.sort_unstable();
            referred.dedup();

            let approved = referred
                .iter()
                .filter(|v| self.latest_status(**v) == Some(PaymentStatus::Approved))
                .count() as i64;

            (referred.len() as i64, approved)
        }
    }

    #[async_trait]
    impl GatewayStore for MemoryStore {
        fn backend(&self) -> &'static str {
            "memory"
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        async fn store_user(&self, user_id: i64, username: Option<&str>) -> Result<()> {
            let mut state = self.inner.lock().unwrap();
            state.users.insert(user_id, username.map(str::to_string));
            Ok(())
        }

        async fn record_submission(
            &self,
            user_id: i64,
            _username: Option<&str>,
            pay_method: &str,
        ) -> Result<i64> {
            let mut state = self.inner.lock().unwrap();
            state.next_payment_id += 1;
            let id = state.next_payment_id;
            state.payments.push(MemPayment {
                user_id,
                pay_method: pay_method.to_string(),
                status: PaymentStatus::Pending,
                reason: None,
                created_at: Utc::now(),
            });
            Ok(id)
        }

        async fn resolve_latest(
            &self,
            user_id: i64,
            outcome: PaymentStatus,
            reason: Option<&str>,
        ) -> Result<()> {
            let mut state = self.inner.lock().unwrap();
            // 이력이 없으면 조용히 성공
            if let Some(p) = state.payments.iter_mut().rev().find(|p| p.user_id == user_id) {
                p.status = outcome;
                p.reason = reason.map(str::to_string);
            }
            Ok(())
        }

        async fn monthly_breakdown(
            &self,
            year: i32,
            month: u32,
        ) -> Result<Vec<MonthlyPaymentRow>> {
            let state = self.inner.lock().unwrap();
            let mut counts: HashMap<(String, String), i64> = HashMap::new();
            for p in state
                .payments
                .iter()
                .filter(|p| p.created_at.year() == year && p.created_at.month() == month)
            {
                *counts
                    .entry((p.pay_method.clone(), p.status.as_str().to_string()))
                    .or_insert(0) += 1;
            }
            let mut rows: Vec<MonthlyPaymentRow> = counts
                .into_iter()
                .map(|((pay_method, status), count)| MonthlyPaymentRow {
                    pay_method,
                    status,
                    count,
                })
                .collect();
            rows.sort_by(|a, b| {
                (a.pay_method.as_str(), a.status.as_str())
                    .cmp(&(b.pay_method.as_str(), b.status.as_str()))
            });
            Ok(rows)
        }

        async fn approval_stats(&self) -> Result<ApprovalStats> {
            let state = self.inner.lock().unwrap();
            let mut stats = ApprovalStats {
                total: state.payments.len() as i64,
                ..Default::default()
            };
            for p in &state.payments {
                match p.status {
                    PaymentStatus::Approved => stats.approved += 1,
                    PaymentStatus::Rejected => stats.rejected += 1,
                    PaymentStatus::Pending => stats.pending += 1,
                }
            }
            Ok(stats)
        }

        async fn add_referral(
            &self,
            referrer_id: i64,
            referred_user_id: i64,
            source: Option<&str>,
        ) -> Result<()> {
            let mut state = self.inner.lock().unwrap();
            let key = (
                referrer_id,
                referred_user_id,
                source.unwrap_or("").to_string(),
            );
            if !state.referrals.contains(&key) {
                state.referrals.push(key);
            }
            Ok(())
        }

        async fn top_referrers(&self, limit: i64) -> Result<Vec<TopReferrer>> {
            let state = self.inner.lock().unwrap();
            let mut referrers: Vec<i64> =
                state.referrals.iter().map(|(r, _, _)| *r).collect();
            referrers.sort_unstable();
            referrers.dedup();

            let mut rows: Vec<TopReferrer> = referrers
                .into_iter()
                .map(|referrer_id| {
                    let (total_referrals, _) = state.referral_counts(referrer_id);
                    let total_points: i64 = state
                        .rewards
                        .iter()
                        .filter(|(u, _)| *u == referrer_id)
                        .map(|(_, p)| *p as i64)
                        .sum();
                    TopReferrer {
                        referrer_id,
                        username: state.users.get(&referrer_id).cloned().flatten(),
                        total_referrals,
                        total_points,
                    }
                })
                .collect();
            rows.sort_by(|a, b| {
                (b.total_referrals, b.total_points).cmp(&(a.total_referrals, a.total_points))
            });
            rows.truncate(limit as usize);
            Ok(rows)
        }

        async fn promoter_referral_counts(&self, user_id: i64) -> Result<(i64, i64)> {
            let state = self.inner.lock().unwrap();
            Ok(state.referral_counts(user_id))
        }

        async fn ensure_promoter(&self, user_id: i64) -> Result<()> {
            let mut state = self.inner.lock().unwrap();
            let now = Utc::now();
            state.promoters.entry(user_id).or_insert(Promoter {
                user_id,
                bank_details: None,
                personal_group_link: None,
                global_group_link: None,
                custom_price: None,
                created_at: now,
                updated_at: now,
            });
            Ok(())
        }

        async fn update_promoter_settings(
            &self,
            user_id: i64,
            update: &PromoterSettingsUpdate,
        ) -> Result<()> {
            if update.is_empty() {
                return Ok(());
            }
            let mut state = self.inner.lock().unwrap();
            // 행이 없으면 SQL UPDATE처럼 no-op
            if let Some(p) = state.promoters.get_mut(&user_id) {
                if let Some(v) = &update.bank_details {
                    p.bank_details = Some(v.clone());
                }
                if let Some(v) = &update.personal_group_link {
                    p.personal_group_link = Some(v.clone());
                }
                if let Some(v) = &update.global_group_link {
                    p.global_group_link = Some(v.clone());
                }
                p.updated_at = Utc::now();
            }
            Ok(())
        }

        async fn promoter_summary(&self, user_id: i64) -> Result<Option<PromoterSummary>> {
            let state = self.inner.lock().unwrap();
            let Some(promoter) = state.promoters.get(&user_id).cloned() else {
                return Ok(None);
            };
            let (total_referrals, approved_referrals) = state.referral_counts(user_id);
            Ok(Some(PromoterSummary {
                promoter,
                total_referrals,
                approved_referrals,
            }))
        }

        async fn create_reward(
            &self,
            user_id: i64,
            _reward_type: &str,
            _reason: &str,
            points: i32,
        ) -> Result<()> {
            let mut state = self.inner.lock().unwrap();
            state.rewards.push((user_id, points));
            Ok(())
        }

        async fn incr_metric(&self, key: &str, delta: i64) -> Result<()> {
            let mut state = self.inner.lock().unwrap();
            *state.metrics.entry(key.to_string()).or_insert(0) += delta;
            Ok(())
        }

        async fn get_metric(&self, key: &str) -> Result<i64> {
            let state = self.inner.lock().unwrap();
            Ok(state.metrics.get(key).copied().unwrap_or(0))
        }
    }
}
