//! Outbound Notification Service
//!
//! 봇 플랫폼으로 나가는 알림의 경계. fire-and-forget:
//! 전송 실패는 여기서 로그로 흡수되고 호출자에게 올라가지 않는다.
//! 저장소가 진실의 원천이므로, 커밋된 변경이 알림 실패 때문에
//! 되돌아가는 일은 없어야 한다 — 사용자가 승인 메시지를 못 받아도
//! 결제는 approved로 남는다.

use async_trait::async_trait;

/// 아웃바운드 알림 경계
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 사용자 개인 채팅으로 알림
    async fn notify_user(&self, user_id: i64, text: &str);

    /// 운영 로그 채널로 알림
    async fn notify_admin(&self, text: &str);
}

/// 봇 플랫폼 send-message 엔드포인트에 대한 얇은 reqwest 래퍼
pub struct TelegramNotifier {
    http: reqwest::Client,
    api_base: String,
    admin_chat_id: Option<i64>,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, admin_chat_id: Option<i64>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: format!("https://api.telegram.org/bot{}", bot_token),
            admin_chat_id,
        }
    }

    async fn send(&self, chat_id: i64, text: &str) {
        let result = self
            .http
            .post(format!("{}/sendMessage", self.api_base))
            .json(&serde_json::json!({
                "chat_id": chat_id,
                "text": text,
            }))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(chat_id, status = %response.status(), "notification rejected by platform");
            }
            Err(err) => {
                tracing::warn!(chat_id, error = %err, "failed to deliver notification");
            }
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify_user(&self, user_id: i64, text: &str) {
        self.send(user_id, text).await;
    }

    async fn notify_admin(&self, text: &str) {
        match self.admin_chat_id {
            Some(chat_id) => self.send(chat_id, text).await,
            None => tracing::debug!("no admin log channel configured; dropping admin notification"),
        }
    }
}

/// 봇 토큰 없이 기동했을 때의 구현 — 로그만 남긴다
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify_user(&self, user_id: i64, text: &str) {
        tracing::debug!(user_id, text, "notifier disabled; user notification dropped");
    }

    async fn notify_admin(&self, text: &str) {
        tracing::debug!(text, "notifier disabled; admin notification dropped");
    }
}
