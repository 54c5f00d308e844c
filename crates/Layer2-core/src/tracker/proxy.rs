//! Service Proxy - 이름 하나에 묶인 지연 어댑터

use crate::capability::CapabilityType;
use crate::registry::ServiceInstance;
use keel_foundation::{Error, Result, ServiceName};
use parking_lot::Mutex;
use std::sync::Arc;

struct ProxySlot<P: ?Sized> {
    instance: Option<ServiceInstance>,
    /// 첫 `target()` 호출 때 채워짐
    target: Option<Arc<P>>,
}

/// Capability-typed handle onto one running service.
///
/// The instance is adapted on first use and the result kept until the tracker
/// invalidates the proxy (the service left `Running`).
pub struct ServiceProxy<P: ?Sized> {
    name: ServiceName,
    capability: CapabilityType<P>,
    slot: Mutex<ProxySlot<P>>,
}

impl<P> ServiceProxy<P>
where
    P: ?Sized + Send + Sync + 'static,
{
    pub(crate) fn new(
        name: ServiceName,
        instance: ServiceInstance,
        capability: CapabilityType<P>,
    ) -> Self {
        Self {
            name,
            capability,
            slot: Mutex::new(ProxySlot {
                instance: Some(instance),
                target: None,
            }),
        }
    }

    pub fn name(&self) -> &ServiceName {
        &self.name
    }

    pub fn capability(&self) -> &str {
        self.capability.name()
    }

    /// 어댑트된 대상
    ///
    /// 무효화된 뒤에는 `ServiceUnavailable`, 어댑터가 거부하면 `CapabilityMismatch`
    pub fn target(&self) -> Result<Arc<P>> {
        let mut slot = self.slot.lock();

        if let Some(target) = &slot.target {
            return Ok(Arc::clone(target));
        }

        let instance = slot
            .instance
            .as_ref()
            .ok_or_else(|| Error::ServiceUnavailable(self.name.clone()))?;

        let target = self.capability.adapt(instance).ok_or_else(|| Error::CapabilityMismatch {
            name: self.name.clone(),
            capability: self.capability.name().to_string(),
        })?;

        slot.target = Some(Arc::clone(&target));
        Ok(target)
    }

    /// Drop the instance and any adapted target
    pub fn invalidate(&self) {
        let mut slot = self.slot.lock();
        slot.instance = None;
        slot.target = None;
    }

    pub fn is_valid(&self) -> bool {
        self.slot.lock().instance.is_some()
    }
}

impl<P: ?Sized> std::fmt::Debug for ServiceProxy<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProxy")
            .field("name", &self.name)
            .field("capability", &self.capability.name())
            .finish()
    }
}
