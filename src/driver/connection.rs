//! RexPro Connection
//!
//! 단일 서버 세션을 관리하는 연결
//!
//! 연결은 소켓 팩토리로부터 전송 계층을 만들고, 세션 핸드셰이크와
//! 트랜잭션 상태 기계를 그 위에서 운영합니다. 접속 실패 시 후보
//! 엔드포인트를 블랙리스트 기반으로 순회하며, 전송 장애와 세션 만료는
//! 재접속 후 재시도합니다.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures::future::BoxFuture;
use tracing::{debug, error, info, warn};

use crate::backend::{SocketBackend, SocketFactory};
use crate::message::{Request, Response, ScriptExecute, SessionClose, SessionOpen};

use super::config::PoolConfig;
use super::error::{RexProError, RexProResult};
use super::types::Value;

/// 접속/재시도 공유 예산
pub const CONNECTION_ATTEMPTS: usize = 3;

/// 재접속 시 단계적 타임아웃 (초)
const RECONNECT_TIMEOUTS: [u64; 3] = [2, 4, 8];

// ============================================================================
// Connection - 단일 세션 연결
// ============================================================================

/// 서버 세션 하나를 소유하는 연결
///
/// 생성 시점에 주입된 [`SocketFactory`]로 전송 계층을 만들며,
/// 하드 오픈마다 새 소켓을 받아 고장난 전송이 재사용되지 않게 합니다.
pub struct Connection<F: SocketFactory> {
    /// 연결 설정
    config: PoolConfig,
    /// 소켓 팩토리
    factory: F,
    /// 현재 전송 계층 (하드 클로즈 시 해제)
    socket: Option<F::Socket>,
    /// 현재 세션 키
    session_key: Option<String>,
    /// 세션 핸드셰이크 성공 여부 (소프트 재개 가능 여부)
    opened: bool,
    /// 명시적 트랜잭션 진행 중 여부
    in_transaction: bool,
    /// 마지막으로 접속한 주소
    current_host: Option<String>,
    /// 마지막으로 접속한 포트
    current_port: Option<u16>,
    /// 접속 실패한 주소 블랙리스트
    host_blacklist: HashSet<String>,
    /// 접속 실패한 포트 블랙리스트
    port_blacklist: HashSet<u16>,
}

impl<F: SocketFactory> Connection<F> {
    /// 연결 생성 및 즉시 오픈
    ///
    /// 접속과 세션 핸드셰이크까지 성공해야 연결을 돌려줍니다.
    pub async fn connect(config: PoolConfig, factory: F) -> RexProResult<Self> {
        let mut conn = Self {
            config,
            factory,
            socket: None,
            session_key: None,
            opened: false,
            in_transaction: false,
            current_host: None,
            current_port: None,
            host_blacklist: HashSet::new(),
            port_blacklist: HashSet::new(),
        };
        conn.open(false).await?;
        Ok(conn)
    }

    // ------------------------------------------------------------------
    // 상태 조회
    // ------------------------------------------------------------------

    /// 세션 핸드셰이크가 성공한 적이 있는지 여부
    pub fn opened(&self) -> bool {
        self.opened
    }

    /// 현재 세션 키
    pub fn session_key(&self) -> Option<&str> {
        self.session_key.as_deref()
    }

    /// 명시적 트랜잭션 진행 중 여부
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// 마지막으로 접속한 주소
    pub fn current_host(&self) -> Option<&str> {
        self.current_host.as_deref()
    }

    /// 마지막으로 접속한 포트
    pub fn current_port(&self) -> Option<u16> {
        self.current_port
    }

    /// 연결 설정
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    #[cfg(test)]
    pub(crate) fn host_blacklist(&self) -> &HashSet<String> {
        &self.host_blacklist
    }

    // ------------------------------------------------------------------
    // 오픈/클로즈
    // ------------------------------------------------------------------

    /// 세션 오픈
    ///
    /// `soft`가 true면 기존 소켓 위에서 핸드셰이크만 다시 수행하고,
    /// false면 엔드포인트를 새로 뽑아 소켓부터 만듭니다. 접속 실패는
    /// 해당 엔드포인트를 블랙리스트에 올리고 예산 안에서 계속 시도하며,
    /// 핸드셰이크 실패는 이후 시도를 하드로 강등합니다.
    pub async fn open(&mut self, soft: bool) -> RexProResult<()> {
        self.opened = false;
        self.session_key = None;
        self.in_transaction = false;

        // 전송 계층이 없으면 소프트 오픈은 불가능하다
        let mut soft = soft && self.socket.is_some();
        let mut last_err: Option<RexProError> = None;
        let mut attempts = 0;

        while attempts < CONNECTION_ATTEMPTS {
            attempts += 1;

            if !soft {
                let host = self.config.host.draw(&mut self.host_blacklist)?;
                let port = self.config.port.draw(&mut self.port_blacklist)?;
                let mut socket = self.factory.new_socket();
                socket.set_timeout(self.config.timeout);

                self.current_host = Some(host.clone());
                self.current_port = Some(port);

                if let Err(e) = socket.connect(&host, port).await {
                    warn!(host = %host, port, error = %e, "접속 실패, 엔드포인트 블랙리스트 처리");
                    self.blacklist_current();
                    last_err = Some(e);
                    continue;
                }
                self.socket = Some(socket);
            }

            match self.open_session().await {
                Ok(session_key) => {
                    self.session_key = Some(session_key);
                    self.opened = true;
                    return Ok(());
                }
                Err(e) => {
                    // 서버까지 닿았지만 핸드셰이크가 거부됨
                    // 다음 시도는 새 엔드포인트에서 새 소켓으로
                    self.blacklist_current();
                    soft = false;
                    if attempts >= CONNECTION_ATTEMPTS {
                        return Err(e);
                    }
                    warn!(error = %e, "세션 핸드셰이크 실패, 재시도");
                    last_err = Some(e);
                }
            }
        }

        Err(RexProError::connection(format!(
            "could not connect after {} attempts: {}",
            CONNECTION_ATTEMPTS,
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no endpoint available".to_string())
        )))
    }

    /// 세션 클로즈
    ///
    /// 세션이 열려 있으면 서버에 kill 요청을 보냅니다. `soft`가 true면
    /// 전송 계층을 유지해 소프트 재개가 가능하고, false면 소켓까지
    /// 해제합니다. 서버가 에러를 돌려줘도 로컬 세션 상태는 비웁니다.
    pub async fn close(&mut self, soft: bool) -> RexProResult<()> {
        let mut result = Ok(());

        if self.opened && self.socket.is_some() {
            let request: Request =
                SessionClose::new(self.session_key.clone(), self.config.graph_name.clone()).into();
            match self.round_trip(&request).await {
                Ok(Response::Error(err)) => result = Err(err.into()),
                Ok(_) => {}
                Err(e) => result = Err(e),
            }
        }

        self.session_key = None;
        self.in_transaction = false;

        if !soft {
            self.opened = false;
            if let Some(mut socket) = self.socket.take() {
                socket.shutdown().await;
                socket.close();
            }
        }

        result
    }

    /// 연결 상태 점검
    ///
    /// 1초 내에 소켓 준비 상태가 확인되면 그대로 통과하고, 아니면
    /// 마지막 엔드포인트로 단계적 타임아웃(2/4/8초) 재접속을 시도한 뒤
    /// 세션을 다시 엽니다.
    pub async fn test_connection(&mut self) -> RexProResult<()> {
        if let Some(socket) = self.socket.as_mut() {
            if let Ok((readable, writable)) = socket.poll(Duration::from_secs(1)).await {
                if readable || writable {
                    return Ok(());
                }
            }
        }
        self.try_reconnect().await
    }

    async fn try_reconnect(&mut self) -> RexProResult<()> {
        let host = self
            .current_host
            .clone()
            .ok_or_else(|| RexProError::connection("connection was never opened"))?;
        let port = self
            .current_port
            .ok_or_else(|| RexProError::connection("connection was never opened"))?;

        if let Some(mut socket) = self.socket.take() {
            socket.shutdown().await;
            socket.close();
        }

        let mut last_err: Option<RexProError> = None;
        for seconds in RECONNECT_TIMEOUTS {
            let timeout = Duration::from_secs(seconds);
            let mut socket = self.factory.new_socket();
            socket.set_timeout(Some(timeout));
            match socket.connect(&host, port).await {
                Ok(()) => {
                    let (readable, writable) = socket.poll(timeout).await.unwrap_or((false, false));
                    if readable || writable {
                        socket.set_timeout(self.config.timeout);
                        self.socket = Some(socket);
                        return self.open(true).await;
                    }
                    last_err = Some(RexProError::connection(format!(
                        "{}:{} not ready after reconnect",
                        host, port
                    )));
                }
                Err(e) => {
                    debug!(host = %host, port, timeout = seconds, error = %e, "재접속 실패");
                    last_err = Some(e);
                }
            }
        }

        self.opened = false;
        Err(last_err.unwrap_or_else(|| RexProError::connection("reconnect failed")))
    }

    // ------------------------------------------------------------------
    // 스크립트 실행
    // ------------------------------------------------------------------

    /// 스크립트 실행
    ///
    /// 전송 장애와 세션 만료는 블랙리스트 처리 후 재접속해 재시도하고
    /// (공유 예산 [`CONNECTION_ATTEMPTS`]), 스크립트 에러는 즉시
    /// 호출자에게 전달합니다. 명시적 트랜잭션 중에는 서버 측 자동
    /// 트랜잭션 래핑을 끕니다.
    pub async fn execute(
        &mut self,
        script: impl Into<String>,
        params: HashMap<String, Value>,
    ) -> RexProResult<Vec<Value>> {
        self.run(script.into(), params, true, true).await
    }

    /// isolate/transaction 플래그를 지정한 스크립트 실행
    ///
    /// 재시도 정책은 [`execute`](Self::execute)와 같습니다.
    pub async fn execute_with(
        &mut self,
        script: impl Into<String>,
        params: HashMap<String, Value>,
        isolate: bool,
        transaction: bool,
    ) -> RexProResult<Vec<Value>> {
        self.run(script.into(), params, isolate, transaction).await
    }

    async fn run(
        &mut self,
        script: String,
        params: HashMap<String, Value>,
        isolate: bool,
        transaction: bool,
    ) -> RexProResult<Vec<Value>> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let request: Request = ScriptExecute::new(script.clone())
                .with_params(params.clone())
                .with_session(self.session_key.clone())
                .with_isolate(isolate)
                .with_transaction(transaction && !self.in_transaction)
                .into();

            let err = match self.round_trip(&request).await {
                Ok(Response::Results(values)) => return Ok(values),
                Ok(Response::Error(err)) => {
                    let err: RexProError = err.into();
                    if !err.is_session_expired() {
                        return Err(err);
                    }
                    err
                }
                Ok(other) => {
                    return Err(RexProError::protocol(format!(
                        "unexpected {} in response to ScriptExecute",
                        other.name()
                    )))
                }
                Err(e) if e.is_transport() => e,
                Err(e) => return Err(e),
            };

            if attempts >= CONNECTION_ATTEMPTS {
                return Err(err);
            }

            if err.is_session_expired() {
                // 유휴 타임아웃으로 세션이 죽는 것은 정상 동작
                info!(error = %err, "세션 만료, 재접속 후 재시도");
            } else {
                error!(error = %err, "전송 장애, 재접속 후 재시도");
            }

            self.blacklist_current();
            if let Err(close_err) = self.close(false).await {
                debug!(error = %close_err, "재접속 전 정리 실패");
            }
            self.open(false).await?;
        }
    }

    // ------------------------------------------------------------------
    // 트랜잭션
    // ------------------------------------------------------------------

    /// 명시적 트랜잭션 시작
    ///
    /// 시작 전에 세션에 남아 있을 수 있는 변경을 버립니다.
    pub async fn open_transaction(&mut self) -> RexProResult<()> {
        if self.in_transaction {
            return Err(RexProError::usage("transaction is already open"));
        }
        let script = format!("{}.stopTransaction(FAILURE)", self.config.graph_obj_name);
        self.run(script, HashMap::new(), false, false).await?;
        self.in_transaction = true;
        Ok(())
    }

    /// 명시적 트랜잭션 종료
    ///
    /// `success`가 true면 커밋, false면 롤백합니다.
    pub async fn close_transaction(&mut self, success: bool) -> RexProResult<()> {
        if !self.in_transaction {
            return Err(RexProError::usage("transaction is not open"));
        }
        let outcome = if success { "SUCCESS" } else { "FAILURE" };
        let script = format!("{}.stopTransaction({})", self.config.graph_obj_name, outcome);
        self.run(script, HashMap::new(), false, false).await?;
        self.in_transaction = false;
        Ok(())
    }

    /// 트랜잭션 범위 실행
    ///
    /// 연결 상태를 점검하고 트랜잭션을 연 뒤 `work`를 실행합니다.
    /// 성공 시 커밋하고 실패 시 롤백합니다. 롤백 자체가 실패하면 그
    /// 에러가 전달됩니다.
    pub async fn transaction<T, W>(&mut self, work: W) -> RexProResult<T>
    where
        W: for<'a> FnOnce(&'a mut Connection<F>) -> BoxFuture<'a, RexProResult<T>>,
    {
        self.test_connection().await?;
        self.open_transaction().await?;
        match work(self).await {
            Ok(value) => {
                self.close_transaction(true).await?;
                Ok(value)
            }
            Err(e) => {
                self.close_transaction(false).await?;
                Err(e)
            }
        }
    }

    // ------------------------------------------------------------------
    // 내부 동작
    // ------------------------------------------------------------------

    async fn open_session(&mut self) -> RexProResult<String> {
        let request: Request = SessionOpen::new(
            self.config.username.clone(),
            self.config.password.clone(),
            self.config.graph_name.clone(),
        )
        .into();
        match self.round_trip(&request).await? {
            Response::SessionOpened { session_key } => Ok(session_key),
            Response::Error(err) => Err(err.into()),
            other => Err(RexProError::protocol(format!(
                "unexpected {} in response to SessionOpen",
                other.name()
            ))),
        }
    }

    async fn round_trip(&mut self, request: &Request) -> RexProResult<Response> {
        let socket = self
            .socket
            .as_mut()
            .ok_or_else(|| RexProError::connection("connection has no transport"))?;
        socket.send(request).await?;
        socket.receive().await
    }

    /// 현재 엔드포인트를 블랙리스트에 추가
    ///
    /// 한 차원의 블랙리스트가 후보 전체를 덮으면 그 차원만 비웁니다.
    fn blacklist_current(&mut self) {
        if let Some(host) = &self.current_host {
            self.host_blacklist.insert(host.clone());
            if self
                .config
                .host
                .as_slice()
                .iter()
                .all(|h| self.host_blacklist.contains(h))
            {
                self.host_blacklist.clear();
            }
        }
        if let Some(port) = self.current_port {
            self.port_blacklist.insert(port);
            if self
                .config
                .port
                .as_slice()
                .iter()
                .all(|p| self.port_blacklist.contains(p))
            {
                self.port_blacklist.clear();
            }
        }
    }
}

impl<F: SocketFactory> std::fmt::Debug for Connection<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("opened", &self.opened)
            .field("session_key", &self.session_key)
            .field("in_transaction", &self.in_transaction)
            .field("current_host", &self.current_host)
            .field("current_port", &self.current_port)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
