//! # keel-foundation
//!
//! Foundation layer for Keel:
//! - Error: 커널 전체 에러 타입 (`Error`, `Result`)
//! - Naming: 구조화된 서비스 이름 (`ServiceName`) 과 와일드카드 패턴
//! - State: 서비스 라이프사이클 상태 머신 (`ServiceState`)
//! - Config: 커널 설정 (`KernelConfig`)
//!
//! ## 아키텍처
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  keel-core (Layer2)                          │
//! │  Kernel · LiveTracker · ExecutionContext     │
//! └──────────────────────┬───────────────────────┘
//!                        ▼
//! ┌──────────────────────────────────────────────┐
//! │  keel-foundation (Layer1)                    │
//! │  ServiceName · Pattern · ServiceState        │
//! │  Error · KernelConfig                        │
//! └──────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod naming;
pub mod state;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Naming (이름 / 패턴)
// ============================================================================
pub use naming::{Pattern, PatternSet, ServiceName, WILDCARD};

// ============================================================================
// State (라이프사이클)
// ============================================================================
pub use state::ServiceState;

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{KernelConfig, KERNEL_CONFIG_FILE, PROJECT_DIR};
