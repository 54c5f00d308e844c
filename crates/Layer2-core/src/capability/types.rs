//! Capability Type - 인스턴스 어댑터

use crate::registry::ServiceInstance;
use std::sync::Arc;

type Adapter<P> = dyn Fn(&ServiceInstance) -> Option<Arc<P>> + Send + Sync;

/// Named view of a service instance as `P`.
///
/// `adapt` returns `None` when the instance does not provide the capability.
pub struct CapabilityType<P: ?Sized> {
    name: Arc<str>,
    adapter: Arc<Adapter<P>>,
}

impl<P: ?Sized> Clone for CapabilityType<P> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            adapter: Arc::clone(&self.adapter),
        }
    }
}

impl<P: ?Sized> CapabilityType<P> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn adapt(&self, instance: &ServiceInstance) -> Option<Arc<P>> {
        (self.adapter)(instance)
    }
}

impl<P> CapabilityType<P>
where
    P: ?Sized + Send + Sync + 'static,
{
    /// 임의의 어댑터 함수로 생성
    pub fn from_fn<F>(name: impl Into<String>, adapter: F) -> Self
    where
        F: Fn(&ServiceInstance) -> Option<Arc<P>> + Send + Sync + 'static,
    {
        let name: String = name.into();
        Self {
            name: Arc::from(name),
            adapter: Arc::new(adapter),
        }
    }

    /// Instances built with [`export::<P>`](crate::registry::export)
    pub fn exported(name: impl Into<String>) -> Self {
        Self::from_fn(name, |instance: &ServiceInstance| {
            instance.downcast_ref::<Arc<P>>().cloned()
        })
    }
}

impl<T> CapabilityType<T>
where
    T: Send + Sync + 'static,
{
    /// Instances that are exactly an `Arc<T>`
    pub fn concrete(name: impl Into<String>) -> Self {
        Self::from_fn(name, |instance: &ServiceInstance| {
            Arc::clone(instance).downcast::<T>().ok()
        })
    }
}

impl<P: ?Sized> std::fmt::Debug for CapabilityType<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CapabilityType").field(&self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::export;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    #[test]
    fn test_exported() {
        let ty = CapabilityType::<dyn Greeter>::exported("Greeter");
        let target: Arc<dyn Greeter> = Arc::new(English);
        let instance = export(target);

        assert_eq!(ty.adapt(&instance).unwrap().greet(), "hello");
        assert!(ty.adapt(&(Arc::new(7u8) as ServiceInstance)).is_none());
    }

    #[test]
    fn test_concrete() {
        let ty = CapabilityType::<u32>::concrete("u32");
        let instance: ServiceInstance = Arc::new(5u32);
        assert_eq!(*ty.adapt(&instance).unwrap(), 5);
        assert!(ty.adapt(&(Arc::new("x") as ServiceInstance)).is_none());
        assert_eq!(ty.name(), "u32");
    }

    #[test]
    fn test_from_fn() {
        let ty = CapabilityType::<dyn Greeter>::from_fn("Greeter", |instance: &ServiceInstance| {
            Arc::clone(instance)
                .downcast::<English>()
                .ok()
                .map(|g| g as Arc<dyn Greeter>)
        });
        let instance: ServiceInstance = Arc::new(English);
        assert_eq!(ty.adapt(&instance).unwrap().greet(), "hello");
    }
}
