//! # Capabilities
//!
//! 서비스 인스턴스를 호출자가 원하는 타입으로 보는 방법
//!
//! 커널은 인스턴스를 `Arc<dyn Any>`로만 알고 있습니다. 호출자는
//! [`CapabilityType`]으로 "이 인스턴스를 `dyn Greeter`로 꺼내는 법"을 기술하고,
//! [`ClassLoader`]에 이름으로 등록해 두면 타입 이름 문자열만으로도
//! 다시 찾을 수 있습니다.
//!
//! ```text
//!   ClassLoader "app" ──parent──▶ ClassLoader "system"
//!     "Greeter"  -> CapabilityType<dyn Greeter>
//!     "Clock"    -> CapabilityType<dyn Clock>
//! ```

mod loader;
mod types;

pub use loader::ClassLoader;
pub use types::CapabilityType;
