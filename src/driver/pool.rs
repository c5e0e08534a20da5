//! Connection Pool
//!
//! 연결 풀 구현
//!
//! 유휴 연결을 큐 백엔드에 보관하고, 획득한 호출자에게 연결의 배타적
//! 소유권을 넘깁니다. 풀 자체는 잠금을 추가하지 않으며 동시성 보장은
//! 큐 백엔드에 위임합니다.

use futures::future::BoxFuture;
use tracing::warn;

use crate::backend::{QueueBackend, SocketFactory, TokioBackend, TokioQueue};

use super::config::{AcquireOptions, PoolConfig};
use super::connection::Connection;
use super::error::RexProResult;

/// Tokio 백엔드를 사용하는 풀 타입 별칭
pub type TokioPool<C> = ConnectionPool<TokioBackend<C>, TokioQueue<Connection<TokioBackend<C>>>>;

// ============================================================================
// ConnectionPool - 연결 풀
// ============================================================================

/// 연결 풀
///
/// 획득(acquire)과 반납(release) 사이에는 호출자가 연결을 단독으로
/// 소유합니다. 유휴 연결이 없으면 새로 만들고, 있으면 세션만 다시 열어
/// 재사용합니다.
///
/// # Example
///
/// ```ignore
/// let pool: TokioPool<MyCodec> = ConnectionPool::new(
///     PoolConfig::new("localhost", 8184, "graph"),
///     TokioBackend::new(),
/// );
/// let mut conn = pool.acquire().await?;
/// let results = conn.execute("g.V().count()", params! {}).await?;
/// pool.close_connection(conn, true).await?;
/// ```
pub struct ConnectionPool<F: SocketFactory, Q: QueueBackend<Connection<F>>> {
    /// 풀 기본 설정
    config: PoolConfig,
    /// 소켓 팩토리
    factory: F,
    /// 유휴 연결 큐
    queue: Q,
}

impl<F: SocketFactory, Q: QueueBackend<Connection<F>>> ConnectionPool<F, Q> {
    /// 풀 생성
    ///
    /// 연결은 미리 만들지 않고 첫 획득 시점에 만듭니다.
    pub fn new(config: PoolConfig, factory: F) -> Self {
        Self {
            config,
            factory,
            queue: Q::default(),
        }
    }

    /// 풀 기본 설정
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// 유휴 연결 수
    pub fn idle_count(&self) -> usize {
        self.queue.size()
    }

    /// 유휴 연결이 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// 연결 획득
    ///
    /// 유휴 연결이 있으면 세션을 다시 열어 재사용하고 (전송 계층이
    /// 살아 있으면 소프트), 없으면 새 연결을 만듭니다.
    pub async fn acquire(&self) -> RexProResult<Connection<F>> {
        self.acquire_with(AcquireOptions::new()).await
    }

    /// 설정 재정의와 함께 연결 획득
    ///
    /// 재정의는 새 연결이 만들어질 때만 적용됩니다. 유휴 연결은 처음
    /// 만들어질 때의 설정을 유지합니다.
    pub async fn acquire_with(&self, options: AcquireOptions) -> RexProResult<Connection<F>> {
        if let Some(mut conn) = self.queue.try_get() {
            let soft = conn.opened();
            conn.open(soft).await?;
            return Ok(conn);
        }
        let config = options.apply(&self.config);
        Connection::connect(config, self.factory.clone()).await
    }

    /// 연결 반납
    ///
    /// 세션 상태와 무관하게 유휴 큐로 돌려놓습니다. 다음 획득 시
    /// 세션이 다시 열립니다.
    pub fn release(&self, conn: Connection<F>) {
        self.queue.put(conn);
    }

    /// 세션을 닫고 연결 반납
    ///
    /// 닫기가 실패해도 연결은 항상 풀로 돌아가며, 닫기 결과를
    /// 돌려줍니다.
    pub async fn close_connection(&self, mut conn: Connection<F>, soft: bool) -> RexProResult<()> {
        let result = if conn.opened() {
            conn.close(soft).await
        } else {
            Ok(())
        };
        self.queue.put(conn);
        result
    }

    /// 트랜잭션 범위로 연결 사용
    ///
    /// 연결을 획득해 트랜잭션 안에서 `work`를 실행하고, 성공 시 커밋
    /// 실패 시 롤백한 뒤 연결을 풀로 돌려놓습니다. 작업 에러가 반납
    /// 에러보다 우선합니다.
    pub async fn with_connection<T, W>(&self, work: W) -> RexProResult<T>
    where
        W: for<'a> FnOnce(&'a mut Connection<F>) -> BoxFuture<'a, RexProResult<T>>,
    {
        self.with_connection_opts(AcquireOptions::new(), work).await
    }

    /// 설정 재정의와 함께 트랜잭션 범위로 연결 사용
    ///
    /// [`acquire_with`](Self::acquire_with)와 같은 규칙으로 재정의를
    /// 적용한 뒤 [`with_connection`](Self::with_connection)과 동일하게
    /// 동작합니다.
    pub async fn with_connection_opts<T, W>(
        &self,
        options: AcquireOptions,
        work: W,
    ) -> RexProResult<T>
    where
        W: for<'a> FnOnce(&'a mut Connection<F>) -> BoxFuture<'a, RexProResult<T>>,
    {
        let mut conn = self.acquire_with(options).await?;
        let result = conn.transaction(work).await;
        let released = self.close_connection(conn, true).await;
        match result {
            Err(e) => Err(e),
            Ok(value) => {
                released?;
                Ok(value)
            }
        }
    }

    /// 모든 유휴 연결 종료
    ///
    /// 큐를 비우며 각 연결을 하드 클로즈합니다. 종료 중의 실패는
    /// 경고로 남기고 계속 진행합니다.
    pub async fn close_all(&self) {
        while let Some(mut conn) = self.queue.try_get() {
            if let Err(e) = conn.close(false).await {
                warn!(error = %e, "풀 종료 중 연결 정리 실패");
            }
        }
    }
}

impl<F: SocketFactory, Q: QueueBackend<Connection<F>>> std::fmt::Debug for ConnectionPool<F, Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("idle", &self.queue.size())
            .field("graph_name", &self.config.graph_name)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::driver::error::RexProError;
    use crate::driver::types::Value;
    use crate::message::{ErrorCode, ErrorResponse, Response};

    type MockPool = ConnectionPool<MockBackend, TokioQueue<Connection<MockBackend>>>;

    fn pool(backend: &MockBackend) -> MockPool {
        ConnectionPool::new(
            PoolConfig::new("localhost", 8184u16, "graph"),
            backend.clone(),
        )
    }

    #[tokio::test]
    async fn test_acquire_creates_connection() {
        let backend = MockBackend::new();
        let pool = pool(&backend);
        assert!(pool.is_empty());

        let conn = pool.acquire().await.unwrap();
        assert!(conn.opened());
        assert_eq!(conn.session_key(), Some("session-1"));
    }

    #[tokio::test]
    async fn test_released_connection_is_reused() {
        let backend = MockBackend::new();
        let pool = pool(&backend);

        let conn = pool.acquire().await.unwrap();
        pool.release(conn);
        assert_eq!(pool.idle_count(), 1);

        // 재사용은 소프트 오픈: 새 세션, 접속은 그대로
        let conn = pool.acquire().await.unwrap();
        assert_eq!(conn.session_key(), Some("session-2"));
        assert_eq!(backend.connect_attempts().len(), 1);
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_acquires_get_distinct_connections() {
        let backend = MockBackend::new();
        let pool = pool(&backend);

        let first = pool.acquire().await.unwrap();
        let second = pool.acquire().await.unwrap();

        assert_ne!(first.session_key(), second.session_key());
        assert_eq!(backend.connect_attempts().len(), 2);
    }

    #[tokio::test]
    async fn test_acquire_with_overrides_new_connection() {
        let backend = MockBackend::new();
        let pool = pool(&backend);

        let conn = pool
            .acquire_with(AcquireOptions::new().with_graph_name("other"))
            .await
            .unwrap();

        assert_eq!(conn.config().graph_name, "other");
    }

    #[tokio::test]
    async fn test_close_connection_always_releases() {
        let backend = MockBackend::new();
        let pool = pool(&backend);

        let conn = pool.acquire().await.unwrap();
        pool.close_connection(conn, true).await.unwrap();
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn test_close_connection_surfaces_fault_but_releases() {
        let backend = MockBackend::new();
        backend.push_session_close_response(Response::Error(ErrorResponse::new(
            ErrorCode::InvalidSession,
            "already gone",
        )));

        let pool = pool(&backend);
        let conn = pool.acquire().await.unwrap();

        let err = pool.close_connection(conn, true).await.unwrap_err();
        assert!(matches!(err, RexProError::InvalidSession(_)));
        assert_eq!(pool.idle_count(), 1);
    }

    fn count_vertices(
        conn: &mut Connection<MockBackend>,
    ) -> BoxFuture<'_, RexProResult<Vec<Value>>> {
        Box::pin(async move { conn.execute("g.V().count()", HashMap::new()).await })
    }

    fn failing_work(
        conn: &mut Connection<MockBackend>,
    ) -> BoxFuture<'_, RexProResult<Vec<Value>>> {
        Box::pin(async move {
            conn.execute("g.addVertex()", HashMap::new()).await?;
            Err(RexProError::usage("caller gave up"))
        })
    }

    #[tokio::test]
    async fn test_with_connection_commits_and_releases() {
        let backend = MockBackend::new();
        backend.push_script_response(Response::Results(Vec::new()));
        backend.push_script_response(Response::Results(vec![Value::Int(3)]));

        let pool = pool(&backend);
        let results = pool.with_connection(count_vertices).await.unwrap();

        assert_eq!(results, vec![Value::Int(3)]);
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(
            backend.scripts(),
            vec![
                "g.stopTransaction(FAILURE)",
                "g.V().count()",
                "g.stopTransaction(SUCCESS)",
            ]
        );
    }

    #[tokio::test]
    async fn test_with_connection_rolls_back_and_releases() {
        let backend = MockBackend::new();
        let pool = pool(&backend);

        let err = pool.with_connection(failing_work).await.unwrap_err();

        assert!(matches!(err, RexProError::Usage(_)));
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(
            backend.scripts(),
            vec![
                "g.stopTransaction(FAILURE)",
                "g.addVertex()",
                "g.stopTransaction(FAILURE)",
            ]
        );
    }

    fn report_graph_name(
        conn: &mut Connection<MockBackend>,
    ) -> BoxFuture<'_, RexProResult<Vec<Value>>> {
        Box::pin(async move { Ok(vec![Value::String(conn.config().graph_name.clone())]) })
    }

    #[tokio::test]
    async fn test_with_connection_opts_applies_overrides() {
        let backend = MockBackend::new();
        let pool = pool(&backend);

        let results = pool
            .with_connection_opts(
                AcquireOptions::new().with_graph_name("other"),
                report_graph_name,
            )
            .await
            .unwrap();

        // 재정의된 그래프가 범위 안의 연결에 반영됨
        assert_eq!(results, vec![Value::String("other".to_string())]);
        assert_eq!(pool.idle_count(), 1);

        // 핸드셰이크도 재정의된 그래프로 나감
        let opens: Vec<String> = backend
            .requests()
            .into_iter()
            .filter_map(|r| match r {
                crate::message::Request::SessionOpen(msg) => Some(msg.graph_name),
                _ => None,
            })
            .collect();
        assert_eq!(opens, vec!["other"]);
    }

    #[tokio::test]
    async fn test_close_all_drains_pool() {
        let backend = MockBackend::new();
        let pool = pool(&backend);

        let first = pool.acquire().await.unwrap();
        let second = pool.acquire().await.unwrap();
        pool.release(first);
        pool.release(second);
        assert_eq!(pool.idle_count(), 2);

        pool.close_all().await;
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_close_all_suppresses_faults() {
        let backend = MockBackend::new();
        backend.push_session_close_response(Response::Error(ErrorResponse::new(
            ErrorCode::InvalidSession,
            "already gone",
        )));

        let pool = pool(&backend);
        let conn = pool.acquire().await.unwrap();
        pool.release(conn);

        pool.close_all().await;
        assert!(pool.is_empty());
    }
}
