//! Class Loader - 이름으로 capability 타입 해석

use super::CapabilityType;
use keel_foundation::{Error, Result};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// capability 타입 레지스트리
///
/// 타입 이름 -> [`CapabilityType`]. 해석은 부모 우선(parent-first)으로,
/// 부모 체인에서 먼저 찾고 없을 때만 자기 테이블을 본다.
pub struct ClassLoader {
    name: String,
    parent: Option<Arc<ClassLoader>>,
    /// 값은 `CapabilityType<P>`, 요청된 `P`로 downcast 해서 꺼냄
    types: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl ClassLoader {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            types: RwLock::new(HashMap::new()),
        }
    }

    /// 부모를 가진 로더
    pub fn with_parent(name: impl Into<String>, parent: Arc<ClassLoader>) -> Self {
        Self {
            parent: Some(parent),
            ..Self::new(name)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<ClassLoader>> {
        self.parent.as_ref()
    }

    /// 타입 정의. 같은 이름이 이미 있으면 교체하고 `true` 반환
    pub fn define<P>(&self, capability: CapabilityType<P>) -> bool
    where
        P: ?Sized + Send + Sync + 'static,
    {
        let type_name = capability.name().to_string();
        debug!(loader = %self.name, type_name = %type_name, "Defining capability type");
        self.types
            .write()
            .insert(type_name, Arc::new(capability))
            .is_some()
    }

    /// 타입 이름으로 capability 해석
    ///
    /// 이름이 없거나 정의된 타입이 `P`가 아니면 `TypeResolution`
    pub fn load<P>(&self, type_name: &str) -> Result<CapabilityType<P>>
    where
        P: ?Sized + Send + Sync + 'static,
    {
        let found = self
            .find(type_name)
            .ok_or_else(|| Error::type_resolution(type_name, &self.name))?;

        found
            .downcast_ref::<CapabilityType<P>>()
            .cloned()
            .ok_or_else(|| Error::type_resolution(type_name, &self.name))
    }

    fn find(&self, type_name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        if let Some(parent) = &self.parent {
            if let Some(found) = parent.find(type_name) {
                return Some(found);
            }
        }

        let found = self.types.read().get(type_name).cloned();
        if found.is_some() {
            trace!(loader = %self.name, type_name, "Resolved capability type");
        }
        found
    }

    /// 부모 체인 포함 정의 여부
    pub fn contains(&self, type_name: &str) -> bool {
        self.find(type_name).is_some()
    }

    /// 이 로더에 직접 정의된 타입 이름 (정렬)
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for ClassLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassLoader")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("types", &self.type_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    #[test]
    fn test_define_and_load() {
        let loader = ClassLoader::new("system");
        assert!(!loader.define(CapabilityType::<dyn Clock>::exported("Clock")));
        assert!(loader.define(CapabilityType::<dyn Clock>::exported("Clock")));

        let ty = loader.load::<dyn Clock>("Clock").unwrap();
        assert_eq!(ty.name(), "Clock");
        assert_eq!(loader.type_names(), vec!["Clock".to_string()]);
    }

    #[test]
    fn test_unknown_type() {
        let loader = ClassLoader::new("system");
        let err = loader.load::<dyn Clock>("Clock").unwrap_err();
        assert!(matches!(err, Error::TypeResolution { ref loader, .. } if loader == "system"));
    }

    #[test]
    fn test_wrong_capability_type() {
        let loader = ClassLoader::new("system");
        loader.define(CapabilityType::<u32>::concrete("Clock"));
        assert!(matches!(
            loader.load::<dyn Clock>("Clock"),
            Err(Error::TypeResolution { .. })
        ));
    }

    #[test]
    fn test_parent_first() {
        let system = Arc::new(ClassLoader::new("system"));
        system.define(CapabilityType::<u32>::concrete("Counter"));

        let app = ClassLoader::with_parent("app", Arc::clone(&system));
        app.define(CapabilityType::<u64>::concrete("Counter"));
        app.define(CapabilityType::<dyn Clock>::exported("Clock"));

        // 부모 정의가 우선
        assert!(app.load::<u32>("Counter").is_ok());
        assert!(app.load::<u64>("Counter").is_err());
        assert!(app.contains("Clock"));
        assert!(!system.contains("Clock"));
        assert_eq!(app.parent().unwrap().name(), "system");
    }
}
