//! # Live Tracker
//!
//! 패턴에 매칭되는 Running 서비스를 실시간으로 따라가는 컬렉션
//!
//! ```text
//!   Kernel ── ServiceEvent ──▶ TrackerListener (Weak)
//!                                   │ entered_running / left_running
//!                                   ▼
//!                        LiveTracker<P>
//!                        ┌──────────────────────────────────┐
//!                        │ app:name=X -> ServiceProxy<P>    │
//!                        │ app:name=Y -> ServiceProxy<P>    │
//!                        └──────────────────────────────────┘
//! ```
//!
//! 일회성 조회가 필요하면 [`crate::query`]를 사용하세요.

mod collection;
mod proxy;
mod reference;

pub use collection::LiveTracker;
pub use proxy::ServiceProxy;
pub use reference::{ClassLoaderReference, CollectionReference};
