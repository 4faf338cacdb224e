//! Database Module
//!
//! # Interview Q&A
//!
//! Q: 왜 PostgreSQL을 선택했는가?
//! A: 결제/추천 원장에 적합한 이유
//!
//!    1. ACID 트랜잭션: 결제 기록 무결성 보장
//!    2. ON CONFLICT: 중복 추천 간선을 insert-or-ignore로 처리
//!    3. EXTRACT: 월별 집계를 쿼리 한 방으로
//!    4. 생태계: SQLx, Diesel 등 Rust 라이브러리 지원
//!
//! Q: 커넥션은 어떻게 관리하는가?
//! A: SQLx의 PgPool 사용
//!    - 논리 연산 하나당 풀에서 커넥션을 빌리고 바로 반납
//!    - 여러 논리 연산에 걸친 장수 트랜잭션은 없다
//!    - 모든 변경은 단일 statement — 부분 적용 상태가 생기지 않는다
//!
//! Q: 스키마 마이그레이션은?
//! A: 시작 시 CREATE TABLE IF NOT EXISTS로 멱등 부트스트랩.
//!    기존 테이블을 수정하거나 삭제하지 않는다.

pub mod models;
pub mod repository;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, QueryBuilder};

pub use models::*;
pub use repository::{GatewayStore, NullStore};

/// 스키마 부트스트랩 statement들 — 순서대로 실행, 전부 멱등
const SCHEMA_STATEMENTS: &[&str] = &[
    // users – 플랫폼 사용자
    r#"
    CREATE TABLE IF NOT EXISTS users (
        user_id      BIGINT PRIMARY KEY,
        username     TEXT,
        created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
    // payments – 결제 제출/해소
    r#"
    CREATE TABLE IF NOT EXISTS payments (
        id          BIGSERIAL PRIMARY KEY,
        user_id     BIGINT NOT NULL,
        username    TEXT,
        pay_method  TEXT NOT NULL,
        status      TEXT NOT NULL DEFAULT 'pending',
        reason      TEXT,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
    // referrals – 누가 누구를 추천했나
    r#"
    CREATE TABLE IF NOT EXISTS referrals (
        id               BIGSERIAL PRIMARY KEY,
        referrer_id      BIGINT NOT NULL,
        referred_user_id BIGINT NOT NULL,
        source           TEXT,
        created_at       TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
    // 같은 (referrer, referred, source) 간선은 한 번만
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_referrals_unique
    ON referrals(referrer_id, referred_user_id, COALESCE(source, ''));
    "#,
    // rewards – 포인트/리워드 원장
    r#"
    CREATE TABLE IF NOT EXISTS rewards (
        id          BIGSERIAL PRIMARY KEY,
        user_id     BIGINT NOT NULL,
        reward_type TEXT NOT NULL,
        reason      TEXT,
        points      INT NOT NULL DEFAULT 0,
        status      TEXT NOT NULL DEFAULT 'pending',
        tx_hash     TEXT,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
    // promoters – 승인된 사용자의 배포 설정
    r#"
    CREATE TABLE IF NOT EXISTS promoters (
        user_id             BIGINT PRIMARY KEY,
        bank_details        TEXT,
        personal_group_link TEXT,
        global_group_link   TEXT,
        custom_price        BIGINT,
        created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
    // metrics – 프로세스 전역 카운터
    r#"
    CREATE TABLE IF NOT EXISTS metrics (
        key   TEXT PRIMARY KEY,
        value BIGINT NOT NULL DEFAULT 0
    );
    "#,
];

/// 데이터베이스 연결 및 쿼리 담당
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 데이터베이스 연결
    ///
    /// # Connection Pool Settings
    ///
    /// - max_connections: 10 (트래픽에 따라 조정)
    /// - min_connections: 1 (idle 시 최소 유지)
    /// - acquire_timeout: 3초 (커넥션 획득 대기)
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(3))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// 멱등 스키마 부트스트랩
    pub async fn init_schema(&self) -> Result<()> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!(
            "DB schema ensured (users, payments, referrals, rewards, promoters, metrics)"
        );
        Ok(())
    }
}

#[async_trait]
impl GatewayStore for Database {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn store_user(&self, user_id: i64, username: Option<&str>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, username)
            VALUES ($1, $2)
            ON CONFLICT (user_id)
            DO UPDATE SET username = EXCLUDED.username
            "#,
        )
        .bind(user_id)
        .bind(username)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_submission(
        &self,
        user_id: i64,
        username: Option<&str>,
        pay_method: &str,
    ) -> Result<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO payments (user_id, username, pay_method, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(username)
        .bind(pay_method)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn resolve_latest(
        &self,
        user_id: i64,
        outcome: PaymentStatus,
        reason: Option<&str>,
    ) -> Result<()> {
        // 서브쿼리가 빈 집합이면 0행 갱신 — 조용히 성공한다
        sqlx::query(
            r#"
            UPDATE payments
            SET status = $1,
                reason = $2,
                updated_at = NOW()
            WHERE id = (
                SELECT id
                FROM payments
                WHERE user_id = $3
                ORDER BY created_at DESC
                LIMIT 1
            )
            "#,
        )
        .bind(outcome.as_str())
        .bind(reason)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn monthly_breakdown(&self, year: i32, month: u32) -> Result<Vec<MonthlyPaymentRow>> {
        let rows = sqlx::query_as::<_, MonthlyPaymentRow>(
            r#"
            SELECT pay_method, status, COUNT(*) AS count
            FROM payments
            WHERE EXTRACT(YEAR FROM created_at)::int = $1
              AND EXTRACT(MONTH FROM created_at)::int = $2
            GROUP BY pay_method, status
            ORDER BY pay_method, status
            "#,
        )
        .bind(year)
        .bind(month as i32)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn approval_stats(&self) -> Result<ApprovalStats> {
        let stats = sqlx::query_as::<_, ApprovalStats>(
            r#"
            SELECT
                COUNT(*)                                      AS total,
                COUNT(*) FILTER (WHERE status = 'approved')   AS approved,
                COUNT(*) FILTER (WHERE status = 'rejected')   AS rejected,
                COUNT(*) FILTER (WHERE status = 'pending')    AS pending
            FROM payments
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn add_referral(
        &self,
        referrer_id: i64,
        referred_user_id: i64,
        source: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO referrals (referrer_id, referred_user_id, source)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(referrer_id)
        .bind(referred_user_id)
        .bind(source)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn top_referrers(&self, limit: i64) -> Result<Vec<TopReferrer>> {
        // 리워드 합계는 그룹화된 서브쿼리로 붙인다 — 간선 수만큼
        // 포인트가 뻥튀기되는 join fan-out을 피하기 위한 형태
        let rows = sqlx::query_as::<_, TopReferrer>(
            r#"
            SELECT
                r.referrer_id,
                u.username,
                COUNT(DISTINCT r.referred_user_id) AS total_referrals,
                COALESCE(MAX(rw.points), 0)        AS total_points
            FROM referrals r
            LEFT JOIN users u
                ON u.user_id = r.referrer_id
            LEFT JOIN (
                SELECT user_id, SUM(points)::bigint AS points
                FROM rewards
                GROUP BY user_id
            ) rw
                ON rw.user_id = r.referrer_id
            GROUP BY r.referrer_id, u.username
            ORDER BY total_referrals DESC, total_points DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn promoter_referral_counts(&self, user_id: i64) -> Result<(i64, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT referred_user_id) FROM referrals WHERE referrer_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        // 피추천인의 "가장 최근" 결제가 approved인 경우만 실적으로 인정
        let approved: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT r.referred_user_id)
            FROM referrals r
            WHERE r.referrer_id = $1
              AND (
                  SELECT p.status
                  FROM payments p
                  WHERE p.user_id = r.referred_user_id
                  ORDER BY p.created_at DESC
                  LIMIT 1
              ) = 'approved'
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok((total, approved))
    }

    async fn ensure_promoter(&self, user_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO promoters (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_promoter_settings(
        &self,
        user_id: i64,
        update: &PromoterSettingsUpdate,
    ) -> Result<()> {
        // 갱신할 필드가 없으면 커넥션도 빌리지 않는다
        if update.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::<sqlx::Postgres>::new("UPDATE promoters SET ");
        {
            let mut sets = qb.separated(", ");
            if let Some(v) = &update.bank_details {
                sets.push("bank_details = ");
                sets.push_bind_unseparated(v);
            }
            if let Some(v) = &update.personal_group_link {
                sets.push("personal_group_link = ");
                sets.push_bind_unseparated(v);
            }
            if let Some(v) = &update.global_group_link {
                sets.push("global_group_link = ");
                sets.push_bind_unseparated(v);
            }
            sets.push("updated_at = NOW()");
        }
        qb.push(" WHERE user_id = ");
        qb.push_bind(user_id);

        qb.build().execute(&self.pool).await?;

        Ok(())
    }

    async fn promoter_summary(&self, user_id: i64) -> Result<Option<PromoterSummary>> {
        let promoter = sqlx::query_as::<_, Promoter>(
            r#"
            SELECT
                user_id,
                bank_details,
                personal_group_link,
                global_group_link,
                custom_price,
                created_at,
                updated_at
            FROM promoters
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(promoter) = promoter else {
            return Ok(None);
        };

        let (total_referrals, approved_referrals) =
            self.promoter_referral_counts(user_id).await?;

        Ok(Some(PromoterSummary {
            promoter,
            total_referrals,
            approved_referrals,
        }))
    }

    async fn create_reward(
        &self,
        user_id: i64,
        reward_type: &str,
        reason: &str,
        points: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rewards (user_id, reward_type, reason, points)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user_id)
        .bind(reward_type)
        .bind(reason)
        .bind(points)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn incr_metric(&self, key: &str, delta: i64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO metrics (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key)
            DO UPDATE SET value = metrics.value + EXCLUDED.value
            "#,
        )
        .bind(key)
        .bind(delta)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_metric(&self, key: &str) -> Result<i64> {
        let value: Option<i64> = sqlx::query_scalar("SELECT value FROM metrics WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value.unwrap_or(0))
    }
}
