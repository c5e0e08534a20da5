//! Pool Configuration
//!
//! 풀/연결 설정 및 엔드포인트 후보 집합

use std::collections::HashSet;
use std::hash::Hash;
use std::time::Duration;

use rand::seq::SliceRandom;

use super::error::{RexProError, RexProResult};

// ============================================================================
// Candidates - 엔드포인트 후보 집합
// ============================================================================

/// 엔드포인트 후보 집합 (순서 유지, 중복 제거)
///
/// 단일 값 설정은 원소 하나짜리 집합으로 정규화되어
/// 블랙리스트 기반 무작위 선택이 한 가지 코드 경로로 동작합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidates<T>(Vec<T>);

impl<T: Clone + Eq + Hash> Candidates<T> {
    /// 후보 집합 생성 (순서 유지하며 중복 제거)
    pub fn new(values: Vec<T>) -> Self {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(values.len());
        for value in values {
            if seen.insert(value.clone()) {
                out.push(value);
            }
        }
        Self(out)
    }

    /// 후보 슬라이스
    pub fn as_slice(&self) -> &[T] {
        &self.0
    }

    /// 후보 수
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 포함 여부
    pub fn contains(&self, value: &T) -> bool {
        self.0.contains(value)
    }

    /// 블랙리스트를 제외한 후보 중 하나를 균등 무작위로 선택
    ///
    /// 블랙리스트가 모든 후보를 덮으면 선택 직전에 블랙리스트를
    /// 비웁니다. 전체 후보가 제외된 채로 남는 일은 없습니다 (기아 방지).
    pub fn draw(&self, blacklist: &mut HashSet<T>) -> RexProResult<T> {
        if self.0.is_empty() {
            return Err(RexProError::configuration("empty endpoint candidate set"));
        }
        if self.0.iter().all(|c| blacklist.contains(c)) {
            blacklist.clear();
        }
        let remaining: Vec<&T> = self.0.iter().filter(|c| !blacklist.contains(c)).collect();
        remaining
            .choose(&mut rand::thread_rng())
            .map(|c| (*c).clone())
            .ok_or_else(|| RexProError::configuration("empty endpoint candidate set"))
    }
}

impl<T: Clone + Eq + Hash> From<T> for Candidates<T> {
    fn from(value: T) -> Self {
        Self(vec![value])
    }
}

impl<T: Clone + Eq + Hash> From<Vec<T>> for Candidates<T> {
    fn from(values: Vec<T>) -> Self {
        Self::new(values)
    }
}

impl From<&str> for Candidates<String> {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

impl From<Vec<&str>> for Candidates<String> {
    fn from(values: Vec<&str>) -> Self {
        Self::new(values.into_iter().map(String::from).collect())
    }
}

// ============================================================================
// PoolConfig - 풀 설정
// ============================================================================

/// 연결 풀 설정
///
/// 풀 인스턴스마다 불변이며, 획득 시 [`AcquireOptions`]로 필드 단위
/// 재정의가 가능합니다.
///
/// # 필드
///
/// | 필드 | 기본값 | 설명 |
/// |------|--------|------|
/// | `host` | - | 서버 주소 (단일 또는 후보 집합) |
/// | `port` | - | 서버 포트 (단일 또는 후보 집합) |
/// | `graph_name` | - | 접속할 그래프 이름 |
/// | `graph_obj_name` | "g" | 그래프 객체 이름 |
/// | `username` | "" | 인증 사용자명 |
/// | `password` | "" | 인증 비밀번호 |
/// | `timeout` | 없음 | 소켓 타임아웃 |
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    /// 서버 주소 후보
    pub host: Candidates<String>,
    /// 서버 포트 후보
    pub port: Candidates<u16>,
    /// 그래프 이름
    pub graph_name: String,
    /// 그래프 객체 이름
    pub graph_obj_name: String,
    /// 인증 사용자명
    pub username: String,
    /// 인증 비밀번호
    pub password: String,
    /// 소켓 타임아웃
    pub timeout: Option<Duration>,
}

impl PoolConfig {
    /// 새 설정 생성
    pub fn new(
        host: impl Into<Candidates<String>>,
        port: impl Into<Candidates<u16>>,
        graph_name: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
            graph_name: graph_name.into(),
            graph_obj_name: "g".to_string(),
            username: String::new(),
            password: String::new(),
            timeout: None,
        }
    }

    /// 빌더 시작
    pub fn builder(
        host: impl Into<Candidates<String>>,
        port: impl Into<Candidates<u16>>,
        graph_name: impl Into<String>,
    ) -> PoolConfigBuilder {
        PoolConfigBuilder {
            config: Self::new(host, port, graph_name),
        }
    }
}

// ============================================================================
// PoolConfigBuilder - 설정 빌더
// ============================================================================

/// 풀 설정 빌더
#[derive(Debug, Clone)]
pub struct PoolConfigBuilder {
    config: PoolConfig,
}

impl PoolConfigBuilder {
    /// 그래프 객체 이름 설정
    pub fn with_graph_obj_name(mut self, name: impl Into<String>) -> Self {
        self.config.graph_obj_name = name.into();
        self
    }

    /// 인증 정보 설정
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.config.username = username.into();
        self.config.password = password.into();
        self
    }

    /// 소켓 타임아웃 설정
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// 설정 빌드
    pub fn build(self) -> PoolConfig {
        self.config
    }
}

// ============================================================================
// AcquireOptions - 획득 시 재정의
// ============================================================================

/// 연결 획득 시 풀 기본값을 덮어쓰는 필드별 재정의
///
/// 지정한 필드만 적용되고 나머지는 풀 기본값을 따릅니다.
/// 재정의는 새 연결이 만들어질 때만 반영됩니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcquireOptions {
    /// 서버 주소 재정의
    pub host: Option<Candidates<String>>,
    /// 서버 포트 재정의
    pub port: Option<Candidates<u16>>,
    /// 그래프 이름 재정의
    pub graph_name: Option<String>,
    /// 그래프 객체 이름 재정의
    pub graph_obj_name: Option<String>,
    /// 사용자명 재정의
    pub username: Option<String>,
    /// 비밀번호 재정의
    pub password: Option<String>,
    /// 타임아웃 재정의
    pub timeout: Option<Duration>,
}

impl AcquireOptions {
    /// 빈 재정의 생성 (풀 기본값 그대로)
    pub fn new() -> Self {
        Self::default()
    }

    /// 서버 주소 재정의
    pub fn with_host(mut self, host: impl Into<Candidates<String>>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// 서버 포트 재정의
    pub fn with_port(mut self, port: impl Into<Candidates<u16>>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// 그래프 이름 재정의
    pub fn with_graph_name(mut self, name: impl Into<String>) -> Self {
        self.graph_name = Some(name.into());
        self
    }

    /// 그래프 객체 이름 재정의
    pub fn with_graph_obj_name(mut self, name: impl Into<String>) -> Self {
        self.graph_obj_name = Some(name.into());
        self
    }

    /// 인증 정보 재정의
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// 타임아웃 재정의
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// 풀 기본값 위에 재정의 적용
    pub fn apply(&self, defaults: &PoolConfig) -> PoolConfig {
        PoolConfig {
            host: self.host.clone().unwrap_or_else(|| defaults.host.clone()),
            port: self.port.clone().unwrap_or_else(|| defaults.port.clone()),
            graph_name: self
                .graph_name
                .clone()
                .unwrap_or_else(|| defaults.graph_name.clone()),
            graph_obj_name: self
                .graph_obj_name
                .clone()
                .unwrap_or_else(|| defaults.graph_obj_name.clone()),
            username: self
                .username
                .clone()
                .unwrap_or_else(|| defaults.username.clone()),
            password: self
                .password
                .clone()
                .unwrap_or_else(|| defaults.password.clone()),
            timeout: self.timeout.or(defaults.timeout),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
