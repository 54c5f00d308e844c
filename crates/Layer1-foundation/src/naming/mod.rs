//! Naming - 구조화된 서비스 이름과 패턴 매칭
//!
//! 서비스는 `domain:key=value,...` 형태의 [`ServiceName`]으로 식별되고,
//! 트래커와 조회 API는 [`Pattern`] / [`PatternSet`]으로 대상을 고릅니다.
//!
//! ```ignore
//! use keel_foundation::naming::{Pattern, ServiceName};
//!
//! let name: ServiceName = "app:name=X,type=Greeter".parse()?;
//! let pattern: Pattern = "app:name=*".parse()?;
//! assert!(pattern.matches(&name));
//! ```

mod name;
mod pattern;

pub use name::ServiceName;
pub use pattern::{Pattern, PatternSet, WILDCARD};
