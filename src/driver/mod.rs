//! Driver Module
//!
//! 세션 기반 그래프 드라이버 코어
//!
//! # 구성
//!
//! - 연결 풀 (ConnectionPool, PoolConfig, AcquireOptions)
//! - 연결/세션 수명주기 (Connection)
//! - 트랜잭션 API (open_transaction / close_transaction / transaction)
//! - 엔드포인트 페일오버 (Candidates, 블랙리스트)
//!
//! # Example
//!
//! ```ignore
//! use rexpro_driver::{ConnectionPool, PoolConfig, TokioBackend, params};
//!
//! // 풀 생성
//! let pool = ConnectionPool::new(
//!     PoolConfig::new(vec!["server1", "server2"], 8184, "graph"),
//!     TokioBackend::<MyCodec>::new(),
//! );
//!
//! // 연결 획득 및 스크립트 실행
//! let mut conn = pool.acquire().await?;
//! let results = conn.execute(
//!     "g.addVertex([name: name])",
//!     params! {"name" => "Alice"},
//! ).await?;
//! pool.close_connection(conn, true).await?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod pool;
pub mod types;

// Re-exports
pub use config::{AcquireOptions, Candidates, PoolConfig, PoolConfigBuilder};
pub use connection::{Connection, CONNECTION_ATTEMPTS};
pub use error::{RexProError, RexProResult};
pub use pool::{ConnectionPool, TokioPool};
pub use types::Value;

/// 파라미터 맵 생성 매크로
#[macro_export]
macro_rules! params {
    () => {
        std::collections::HashMap::<String, $crate::driver::Value>::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = std::collections::HashMap::<String, $crate::driver::Value>::new();
        $(
            map.insert($key.into(), $crate::driver::Value::from($value));
        )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::types::Value;

    #[test]
    fn test_params_macro() {
        let params = params! {
            "name" => "Alice",
            "age" => 30,
        };
        assert_eq!(params.get("name"), Some(&Value::String("Alice".to_string())));
        assert_eq!(params.get("age"), Some(&Value::Int(30)));
    }

    #[test]
    fn test_params_macro_empty() {
        let params = params! {};
        assert!(params.is_empty());
    }
}
