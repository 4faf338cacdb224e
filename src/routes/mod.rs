//! Routes Module
//!
//! HTTP 엔드포인트 핸들러. 라우터 구성은 main.rs에 있다.

pub mod health;
pub mod public;
pub mod webhook;
pub mod payments;
pub mod referrals;
pub mod telemetry;
pub mod admin;

use serde::Deserialize;

use crate::{config::Config, error::ApiError};

/// 관리자 엔드포인트 공용 쿼리 파라미터
#[derive(Debug, Deserialize)]
pub struct AdminTokenQuery {
    pub token: Option<String>,
}

/// 관리자 토큰 검사
///
/// 토큰이 설정되어 있지 않으면 관리자 표면 전체가 잠긴다.
pub(crate) fn require_admin(config: &Config, token: Option<&str>) -> Result<(), ApiError> {
    match (&config.admin_dash_token, token) {
        (Some(expected), Some(given)) if expected == given => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_token(token: Option<&str>) -> Config {
        let mut config = Config::from_env().unwrap();
        config.admin_dash_token = token.map(str::to_string);
        config
    }

    #[test]
    fn test_require_admin() {
        let config = config_with_token(Some("secret"));
        assert!(require_admin(&config, Some("secret")).is_ok());
        assert!(require_admin(&config, Some("wrong")).is_err());
        assert!(require_admin(&config, None).is_err());
    }

    #[test]
    fn test_admin_surface_locked_without_configured_token() {
        let config = config_with_token(None);
        assert!(require_admin(&config, Some("anything")).is_err());
        assert!(require_admin(&config, None).is_err());
    }
}
