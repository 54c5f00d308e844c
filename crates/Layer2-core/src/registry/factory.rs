//! Service factories - 서비스 인스턴스 생성/소멸 콜백

use crate::context::ExecutionContext;
use std::any::Any;
use std::sync::Arc;

/// Opaque handle to a live service instance
pub type ServiceInstance = Arc<dyn Any + Send + Sync>;

/// Wrap a capability-typed target so that [`CapabilityType::exported`] can
/// hand it back out of the opaque instance.
///
/// [`CapabilityType::exported`]: crate::capability::CapabilityType::exported
pub fn export<P>(target: Arc<P>) -> ServiceInstance
where
    P: ?Sized + Send + Sync + 'static,
{
    Arc::new(target)
}

/// Builds and tears down one service.
///
/// Both callbacks run on the thread driving the transition, inside a scoped
/// [`ExecutionContext`] for the service. The same context is also reachable
/// through [`crate::context::current`] for code that cannot take it as a
/// parameter.
pub trait ServiceFactory: Send + Sync {
    fn create(&self, ctx: &ExecutionContext) -> anyhow::Result<ServiceInstance>;

    fn destroy(&self, _ctx: &ExecutionContext, instance: ServiceInstance) -> anyhow::Result<()> {
        drop(instance);
        Ok(())
    }
}

impl<F> ServiceFactory for F
where
    F: Fn(&ExecutionContext) -> anyhow::Result<ServiceInstance> + Send + Sync,
{
    fn create(&self, ctx: &ExecutionContext) -> anyhow::Result<ServiceInstance> {
        self(ctx)
    }
}

/// Factory that hands out clones of one prebuilt instance
pub struct InstanceFactory {
    instance: ServiceInstance,
}

impl InstanceFactory {
    pub fn new(instance: ServiceInstance) -> Self {
        Self { instance }
    }
}

impl ServiceFactory for InstanceFactory {
    fn create(&self, _ctx: &ExecutionContext) -> anyhow::Result<ServiceInstance> {
        Ok(Arc::clone(&self.instance))
    }
}
