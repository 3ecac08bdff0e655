//! サーバー設定
//!
//! バイナリのコマンドライン引数（環境変数）から組み立てられ、サーバーとユースケースに渡されます。

use std::time::Duration;

use crate::domain::RateLimitPolicy;

/// 任意のオリジンを許可する値
pub const ANY_ORIGIN: &str = "*";

/// リレーサーバーの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// WebSocket ハンドシェイクで許可する `Origin`（`*` なら全て許可）
    pub allowed_origin: String,
    pub rate_limit: RateLimitPolicy,
    /// 空のルームを削除するまでのアイドル時間
    pub room_inactivity_timeout: Duration,
    pub room_sweep_interval: Duration,
    pub rate_limit_sweep_interval: Duration,
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
    /// 接続ごとの送信キューの容量（溢れた接続は切断される）
    pub outbound_queue_capacity: usize,
    /// グレースフルシャットダウンを待つ上限
    pub shutdown_grace: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            allowed_origin: ANY_ORIGIN.to_string(),
            rate_limit: RateLimitPolicy::default(),
            room_inactivity_timeout: Duration::from_secs(60 * 60),
            room_sweep_interval: Duration::from_secs(15 * 60),
            rate_limit_sweep_interval: Duration::from_secs(60),
            ping_interval: Duration::from_secs(25),
            ping_timeout: Duration::from_secs(20),
            outbound_queue_capacity: 256,
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

impl RelayConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// この時間何も受信しなかった接続は切断されたものとみなす
    pub fn idle_timeout(&self) -> Duration {
        self.ping_interval + self.ping_timeout
    }

    /// ハンドシェイクの `Origin` ヘッダーを許可するか
    ///
    /// ヘッダーのないクライアント（ブラウザ以外）は許可します。
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        match origin {
            _ if self.allowed_origin == ANY_ORIGIN => true,
            None => true,
            Some(origin) => {
                origin.trim_end_matches('/') == self.allowed_origin.trim_end_matches('/')
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        // テスト項目: デフォルト値
        // given (前提条件):
        let config = RelayConfig::default();

        // when (操作):
        let bind_addr = config.bind_addr();

        // then (期待する結果):
        assert_eq!(bind_addr, "127.0.0.1:3001");
        assert_eq!(config.rate_limit.points, 50);
        assert_eq!(config.room_inactivity_timeout, Duration::from_secs(3600));
        assert_eq!(config.room_sweep_interval, Duration::from_secs(900));
        assert_eq!(config.idle_timeout(), Duration::from_secs(45));
        assert_eq!(config.outbound_queue_capacity, 256);
    }

    #[test]
    fn test_origin_allowed() {
        // テスト項目: 設定したオリジンのみ許可される
        // given (前提条件):
        let config = RelayConfig {
            allowed_origin: "https://chat.example.com".to_string(),
            ..Default::default()
        };

        // when (操作) / then (期待する結果):
        assert!(config.origin_allowed(Some("https://chat.example.com")));
        assert!(config.origin_allowed(Some("https://chat.example.com/")));
        assert!(config.origin_allowed(None));
        assert!(!config.origin_allowed(Some("https://evil.example.com")));
    }

    #[test]
    fn test_wildcard_origin_allows_everything() {
        // テスト項目: `*` の場合は全てのオリジンを許可
        // given (前提条件):
        let config = RelayConfig::default();

        // when (操作) / then (期待する結果):
        assert!(config.origin_allowed(Some("http://localhost:5173")));
        assert!(config.origin_allowed(None));
    }
}
