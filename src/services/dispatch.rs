//! Update Dispatch Seam
//!
//! 중복 제거 게이트를 통과한 인바운드 update의 후속 처리는
//! 게이트웨이 본체가 아니라 협력자의 몫이다. 실제 명령 라우팅과
//! 재시도 정책은 이 trait 뒤에 산다.

use async_trait::async_trait;

/// 중복이 아닌 update를 넘겨받는 협력자 경계
#[async_trait]
pub trait UpdateDispatcher: Send + Sync {
    async fn dispatch(&self, update: serde_json::Value);
}

/// 기본 구현 — 수신 사실만 기록한다
pub struct LoggingDispatcher;

#[async_trait]
impl UpdateDispatcher for LoggingDispatcher {
    async fn dispatch(&self, update: serde_json::Value) {
        let update_id = update.get("update_id").and_then(serde_json::Value::as_i64);
        tracing::debug!(?update_id, "accepted inbound update");
    }
}
