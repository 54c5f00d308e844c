//! Error types for Keel
//!
//! 커널 전체의 에러를 중앙에서 관리

use crate::naming::ServiceName;
use crate::state::ServiceState;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Keel 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 서비스 조회 / 상태 전이
    // ========================================================================
    #[error("Service not found: {0}")]
    ServiceNotFound(ServiceName),

    #[error("Service already registered: {0}")]
    ServiceAlreadyRegistered(ServiceName),

    #[error("Invalid state transition for {name}: {from} -> {to}")]
    InvalidStateTransition {
        name: ServiceName,
        from: ServiceState,
        to: ServiceState,
    },

    // ========================================================================
    // 생성 / 소멸
    // ========================================================================
    #[error("Failed to construct {name}: {source}")]
    Construction {
        name: ServiceName,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to destroy {name}: {source}")]
    Destruction {
        name: ServiceName,
        #[source]
        source: anyhow::Error,
    },

    // ========================================================================
    // 실행 컨텍스트 / 타입 해석
    // ========================================================================
    #[error("Service context has not been set")]
    NoActiveContext,

    #[error("Cannot resolve type '{type_name}' with class loader '{loader}'")]
    TypeResolution { type_name: String, loader: String },

    // ========================================================================
    // 프록시
    // ========================================================================
    #[error("Service is no longer available: {0}")]
    ServiceUnavailable(ServiceName),

    #[error("Service {name} does not provide capability '{capability}'")]
    CapabilityMismatch { name: ServiceName, capability: String },

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Invalid service name: {0}")]
    InvalidName(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Listener error: {0}")]
    Listener(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 조회 대상이 존재하지 않는 에러인지 확인
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::ServiceNotFound(_))
    }

    /// 호출자가 복구할 수 있는 로컬 에러인지 확인
    ///
    /// 커널 자체를 망가뜨리는 에러는 없으므로 내부 에러만 제외한다.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::Internal(_))
    }

    /// 생성 실패 에러 헬퍼
    pub fn construction(name: &ServiceName, source: impl Into<anyhow::Error>) -> Self {
        Error::Construction {
            name: name.clone(),
            source: source.into(),
        }
    }

    /// 소멸 실패 에러 헬퍼
    pub fn destruction(name: &ServiceName, source: impl Into<anyhow::Error>) -> Self {
        Error::Destruction {
            name: name.clone(),
            source: source.into(),
        }
    }

    /// 타입 해석 실패 에러 헬퍼
    pub fn type_resolution(type_name: impl Into<String>, loader: impl Into<String>) -> Self {
        Error::TypeResolution {
            type_name: type_name.into(),
            loader: loader.into(),
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_active_context_message() {
        assert_eq!(
            Error::NoActiveContext.to_string(),
            "Service context has not been set"
        );
    }

    #[test]
    fn test_predicates() {
        let name = ServiceName::new("app").unwrap().with("name", "X").unwrap();
        assert!(Error::ServiceNotFound(name.clone()).is_not_found());
        assert!(!Error::NoActiveContext.is_not_found());
        assert!(Error::InvalidStateTransition {
            name,
            from: ServiceState::New,
            to: ServiceState::Running,
        }
        .is_recoverable());
        assert!(!Error::Internal("boom".into()).is_recoverable());
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = Error::InvalidStateTransition {
            name: ServiceName::new("app").unwrap().with("name", "X").unwrap(),
            from: ServiceState::New,
            to: ServiceState::Stopping,
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition for app:name=X: new -> stopping"
        );
    }
}
