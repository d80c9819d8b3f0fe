//! POWERLENS 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 이 에러 타입을 그대로 반환한다.
//! 파이프라인 외부로 전파되는 것은 `ContractViolation`뿐이며,
//! 나머지는 오프라인 폴백 또는 요소 폐기로 흡수된다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 — {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 네트워크 에러 (연결 실패, 타임아웃)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 서비스 일시 불가 (503, LLM 비활성 등)
    #[error("서비스 일시 불가: {0}")]
    ServiceUnavailable(String),

    /// Rate Limit 초과 (429)
    #[error("요청 한도 초과, {retry_after_secs}초 후 재시도")]
    RateLimit {
        /// 재시도 대기 시간 (초)
        retry_after_secs: u64,
    },

    /// 실행 타임아웃
    #[error("실행 타임아웃: {timeout_ms}ms 초과")]
    ExecutionTimeout {
        /// 초과된 타임아웃 시간 (밀리초)
        timeout_ms: u64,
    },

    /// 정책에 의해 거부됨 (허용 목록 외 액션 등)
    #[error("정책 거부: {0}")]
    PolicyDenied(String),

    /// 내부 계약 위반 (범위 밖 카테고리 코드 등) — 손상된 내부 상태
    #[error("계약 위반: {0}")]
    ContractViolation(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// 백엔드 장애 여부 (오프라인 폴백으로 복구 가능한 에러)
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            CoreError::Network(_)
                | CoreError::ServiceUnavailable(_)
                | CoreError::RateLimit { .. }
                | CoreError::ExecutionTimeout { .. }
                | CoreError::Serialization(_)
                | CoreError::Internal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failures_are_recoverable() {
        assert!(CoreError::Network("down".into()).is_backend_failure());
        assert!(CoreError::ExecutionTimeout { timeout_ms: 10 }.is_backend_failure());
        assert!(CoreError::RateLimit {
            retry_after_secs: 5
        }
        .is_backend_failure());
        assert!(!CoreError::ContractViolation("bad".into()).is_backend_failure());
        assert!(!CoreError::PolicyDenied("nope".into()).is_backend_failure());
    }

    #[test]
    fn validation_message_includes_field() {
        let err = CoreError::Validation {
            field: "severity".into(),
            message: "1..5 범위 밖".into(),
        };
        assert!(err.to_string().contains("severity"));
    }
}
