//! # Service Registry
//!
//! 이름으로 식별되는 서비스의 등록, 라이프사이클, 이벤트 통보
//!
//! ## 개요
//!
//! [`Kernel`]은 구조화된 이름([`ServiceName`])별로 하나의 레코드를 소유합니다.
//! 레코드는 팩토리, 클래스 로더, 현재 상태, 그리고 Running 중일 때의 인스턴스를
//! 가집니다. 상태가 바뀔 때마다 [`ServiceEvent`]가 발행되고, 패턴으로 구독한
//! [`ServiceListener`]에게 전달됩니다.
//!
//! ## 상태 머신
//!
//! ```text
//!   NEW ──▶ STARTING ──▶ RUNNING ──▶ STOPPING ──▶ STOPPED
//!              │            │            │           │
//!              └────────────┴─────┬──────┘           │
//!                                 ▼                  │
//!                              FAILED      STARTING ◀┘
//! ```
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Kernel                              │
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │  RwLock<HashMap<ServiceName, Arc<ServiceRecord>>>       ││
//! │  │  ┌──────────────┬──────────────┬──────────────┐         ││
//! │  │  │ app:name=X   │ app:name=Y   │ sys:name=Z   │  ...    ││
//! │  │  │ (RUNNING)    │ (STOPPED)    │ (NEW)        │         ││
//! │  │  └──────────────┴──────────────┴──────────────┘         ││
//! │  └─────────────────────────────────────────────────────────┘│
//! │                          │ publish                           │
//! │  ┌───────────────────────┼───────────────────────────────┐  │
//! │  │  history (VecDeque)   │  broadcast (watch)            │  │
//! │  │  subscriptions (PatternSet -> ServiceListener)        │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 사용 예시
//!
//! ```ignore
//! use keel_core::registry::{export, FnListener, Kernel};
//!
//! let kernel = Kernel::new();
//! kernel.subscribe(
//!     PatternSet::parse(["app:name=*"])?,
//!     Arc::new(FnListener::new("log", |event| {
//!         println!("{}", event);
//!         Ok(())
//!     })),
//! );
//!
//! kernel.register(name.clone(), |_ctx: &ExecutionContext| Ok(export(greeter())))?;
//! kernel.start(&name)?;
//! ```
//!
//! [`ServiceName`]: keel_foundation::ServiceName

mod event;
mod factory;
mod kernel;
mod record;

pub use event::{FnListener, ServiceEvent, ServiceEventKind, ServiceListener, SubscriptionId};
pub use factory::{export, InstanceFactory, ServiceFactory, ServiceInstance};
pub use kernel::{Kernel, KernelStats};
pub use record::{ServiceInfo, ServiceMetadata};
