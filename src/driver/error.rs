//! Driver Error Types
//!
//! 드라이버 에러 정의

use std::io;

use thiserror::Error;

use crate::message::ErrorResponse;

// ============================================================================
// RexProError - 드라이버 에러
// ============================================================================

/// 드라이버 에러
#[derive(Error, Debug)]
pub enum RexProError {
    /// 연결 에러 (접속/재접속 시도 소진)
    #[error("Connection error: {0}")]
    Connection(String),

    /// 세션 만료/무효 (유휴 타임아웃 시 정상적으로 발생)
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// 스크립트 실행 에러 (서버 에러 페이로드 포함)
    #[error("Script error: {code} - {message}")]
    Script {
        /// 서버 에러 코드
        code: String,
        /// 서버 에러 메시지
        message: String,
    },

    /// 사용 에러 (트랜잭션 상태 기계 위반)
    #[error("Usage error: {0}")]
    Usage(String),

    /// 프로토콜 에러 (예상치 못한 응답)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O 에러
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RexProError {
    /// 연결 에러 생성
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// 세션 무효 에러 생성
    pub fn invalid_session(msg: impl Into<String>) -> Self {
        Self::InvalidSession(msg.into())
    }

    /// 스크립트 에러 생성
    pub fn script(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Script {
            code: code.into(),
            message: message.into(),
        }
    }

    /// 사용 에러 생성
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// 프로토콜 에러 생성
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// 설정 에러 생성
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// 세션 만료 여부
    ///
    /// 유휴 타임아웃으로 세션이 죽는 것은 정상 동작이므로
    /// 재접속 시 info 레벨로만 로깅합니다.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::InvalidSession(_))
    }

    /// 전송 계층 에러 여부 (소켓 끊김 등)
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Io(_))
    }

    /// 재접속으로 복구 가능한 에러 여부
    pub fn is_recoverable(&self) -> bool {
        self.is_transport() || self.is_session_expired()
    }
}

impl From<ErrorResponse> for RexProError {
    fn from(err: ErrorResponse) -> Self {
        if err.code.is_session_error() {
            RexProError::InvalidSession(err.message)
        } else {
            RexProError::Script {
                code: err.code.as_str().to_string(),
                message: err.message,
            }
        }
    }
}

// ============================================================================
// Result Type
// ============================================================================

/// 드라이버 결과 타입
pub type RexProResult<T> = Result<T, RexProError>;

// ============================================================================
// Tests
// ============================================================================
