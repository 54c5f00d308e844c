//! Config - 커널 설정
//!
//! - `kernel.rs` - KernelConfig (이름, 이벤트 히스토리, 기본 클래스 로더)

mod kernel;

pub use kernel::{KernelConfig, KERNEL_CONFIG_FILE, PROJECT_DIR};
