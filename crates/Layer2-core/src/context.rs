//! Execution Context - 스레드 범위의 서비스 컨텍스트
//!
//! 팩토리 콜백처럼 커널이 호출하는 코드가, 인자로 받지 않고도 "지금 어느 커널과
//! 클래스 로더 아래에서 실행 중인지" 알 수 있게 해 줍니다.
//!
//! 컨텍스트는 스레드마다 스택으로 관리됩니다. [`with_context`]는 진입 시 push,
//! 종료 시 (패닉 포함) pop 하므로 중첩 호출이 끝나면 바깥 컨텍스트가 그대로
//! 복원됩니다. 다른 스레드로 전파되지 않습니다.
//!
//! ## 사용 예시
//!
//! ```ignore
//! let ctx = kernel.root_context();
//! context::with_context(ctx, || {
//!     let tracker = LiveTracker::<dyn Greeter>::from_context("greeters", patterns, greeter_type)?;
//!     // ...
//! })?;
//!
//! assert!(context::current().is_none());
//! ```

use crate::capability::ClassLoader;
use crate::registry::Kernel;
use keel_foundation::{Error, Result, ServiceName};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

// ============================================================================
// ExecutionContext
// ============================================================================

/// 커널 + 클래스 로더 (+ 실행 중인 서비스 이름)
#[derive(Clone)]
pub struct ExecutionContext {
    kernel: Kernel,
    class_loader: Arc<ClassLoader>,
    service: Option<ServiceName>,
}

impl ExecutionContext {
    pub fn new(kernel: Kernel, class_loader: Arc<ClassLoader>) -> Self {
        Self {
            kernel,
            class_loader,
            service: None,
        }
    }

    /// 특정 서비스의 콜백용 컨텍스트
    pub fn for_service(mut self, name: ServiceName) -> Self {
        self.service = Some(name);
        self
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn class_loader(&self) -> &Arc<ClassLoader> {
        &self.class_loader
    }

    /// Service whose factory is currently running, if any
    pub fn service(&self) -> Option<&ServiceName> {
        self.service.as_ref()
    }
}

impl PartialEq for ExecutionContext {
    fn eq(&self, other: &Self) -> bool {
        self.kernel.same_kernel(&other.kernel)
            && Arc::ptr_eq(&self.class_loader, &other.class_loader)
            && self.service == other.service
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("kernel", &self.kernel.name())
            .field("class_loader", &self.class_loader.name())
            .field("service", &self.service)
            .finish()
    }
}

// ============================================================================
// 스레드 로컬 스택
// ============================================================================

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ExecutionContext>> = const { RefCell::new(Vec::new()) };
}

/// Pops back to the depth it was created at.
///
/// Not `Send`: a guard must be dropped on the thread whose stack it marks.
pub struct ContextGuard {
    depth: usize,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| stack.borrow_mut().truncate(self.depth));
    }
}

/// 컨텍스트 진입. 반환된 가드가 drop 될 때 이전 컨텍스트로 복원
pub fn enter(ctx: ExecutionContext) -> ContextGuard {
    let depth = CONTEXT_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        let depth = stack.len();
        stack.push(ctx);
        depth
    });

    ContextGuard {
        depth,
        _not_send: PhantomData,
    }
}

/// `ctx`를 현재 컨텍스트로 두고 `f` 실행
///
/// `f`가 반환하거나 패닉으로 빠져나가도 진입 이전 컨텍스트가 복원된다.
pub fn with_context<R>(ctx: ExecutionContext, f: impl FnOnce() -> R) -> R {
    let _guard = enter(ctx);
    f()
}

/// 가장 안쪽 컨텍스트
pub fn current() -> Option<ExecutionContext> {
    CONTEXT_STACK.with(|stack| stack.borrow().last().cloned())
}

/// 가장 안쪽 컨텍스트, 없으면 `NoActiveContext`
pub fn require() -> Result<ExecutionContext> {
    current().ok_or(Error::NoActiveContext)
}

/// 현재 스레드의 중첩 깊이
pub fn depth() -> usize {
    CONTEXT_STACK.with(|stack| stack.borrow().len())
}

pub fn is_active() -> bool {
    depth() > 0
}
