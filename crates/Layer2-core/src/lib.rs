//! keel-core: Service Kernel for Keel
//!
//! Layer2 - 서비스 레지스트리와 라이브 트래킹 레이어
//!
//! # 주요 모듈
//!
//! - `registry`: 서비스 커널 (등록, 라이프사이클, 이벤트 구독)
//! - `context`: 스레드 범위 실행 컨텍스트 (`with_context` / `current`)
//! - `capability`: capability 타입 어댑터와 클래스 로더
//! - `tracker`: Running 서비스의 라이브 프록시 컬렉션
//! - `query`: 일회성 조회 (`is_running`, `running_targets`)
//!
//! # 사용 예시
//!
//! ```ignore
//! use keel_core::{export, context, CapabilityType, Kernel, LiveTracker};
//!
//! let kernel = Kernel::new();
//! let x: ServiceName = "app:name=X".parse()?;
//!
//! kernel.register(x.clone(), |_ctx: &ExecutionContext| {
//!     let greeter: Arc<dyn Greeter> = Arc::new(English);
//!     Ok(export(greeter))
//! })?;
//! kernel.start(&x)?;
//!
//! // 패턴에 매칭되는 Running 서비스를 계속 따라감
//! let greeters = LiveTracker::new(
//!     &kernel,
//!     "greeters",
//!     PatternSet::parse(["app:name=*"])?,
//!     CapabilityType::<dyn Greeter>::exported("Greeter"),
//! );
//! assert_eq!(greeters.len(), 1);
//!
//! kernel.stop(&x)?;
//! assert!(greeters.is_empty());
//! ```

// Core modules
pub mod capability;
pub mod context;
pub mod query;
pub mod registry;
pub mod tracker;

// Re-exports: Foundation
pub use keel_foundation::{
    Error, KernelConfig, Pattern, PatternSet, Result, ServiceName, ServiceState,
};

// Re-exports: Registry
pub use registry::{
    export, FnListener, InstanceFactory, Kernel, KernelStats, ServiceEvent, ServiceEventKind,
    ServiceFactory, ServiceInfo, ServiceInstance, ServiceListener, ServiceMetadata,
    SubscriptionId,
};

// Re-exports: Context
pub use context::{ContextGuard, ExecutionContext};

// Re-exports: Capability
pub use capability::{CapabilityType, ClassLoader};

// Re-exports: Tracker
pub use tracker::{ClassLoaderReference, CollectionReference, LiveTracker, ServiceProxy};

// Re-exports: Query
pub use query::{is_running, running_targets};
