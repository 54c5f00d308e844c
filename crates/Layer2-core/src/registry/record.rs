//! Service Record - 커널이 소유하는 서비스 레코드

use super::factory::{ServiceFactory, ServiceInstance};
use crate::capability::ClassLoader;
use chrono::{DateTime, Utc};
use keel_foundation::{ServiceName, ServiceState};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

// ============================================================================
// ServiceMetadata - 서비스 메타데이터
// ============================================================================

/// 서비스 메타데이터 (capability 정보 포함)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    /// 서비스가 제공하는 capability 타입 이름
    pub capabilities: BTreeSet<String>,

    /// 추가 속성
    pub attributes: BTreeMap<String, String>,

    /// 등록 시간
    pub registered_at: DateTime<Utc>,

    /// 마지막 상태 변경 시간
    pub updated_at: DateTime<Utc>,

    /// Running 진입 횟수
    pub start_count: u32,
}

impl ServiceMetadata {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            capabilities: BTreeSet::new(),
            attributes: BTreeMap::new(),
            registered_at: now,
            updated_at: now,
            start_count: 0,
        }
    }

    /// capability 추가
    pub fn with_capability(mut self, type_name: impl Into<String>) -> Self {
        self.capabilities.insert(type_name.into());
        self
    }

    /// 속성 추가
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn provides(&self, type_name: &str) -> bool {
        self.capabilities.contains(type_name)
    }
}

impl Default for ServiceMetadata {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// ServiceInfo - 조회용 스냅샷
// ============================================================================

/// Point-in-time view of one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: ServiceName,
    pub state: ServiceState,
    pub metadata: ServiceMetadata,
    pub class_loader: String,
    /// Message of the last construction/destruction failure
    pub last_failure: Option<String>,
}

// ============================================================================
// ServiceRecord
// ============================================================================

/// Mutable part of a record, swapped under one write lock so readers never
/// observe a half-applied transition.
pub(crate) struct RecordState {
    pub state: ServiceState,
    pub instance: Option<ServiceInstance>,
    pub metadata: ServiceMetadata,
    pub last_failure: Option<String>,
    /// Set once the record has been dropped from the kernel map
    pub removed: bool,
}

pub(crate) struct ServiceRecord {
    pub name: ServiceName,
    pub factory: Arc<dyn ServiceFactory>,
    pub class_loader: Arc<ClassLoader>,
    /// Serializes transitions on this name. Reentrant so that a listener running
    /// on the transitioning thread can still subscribe (and be backfilled).
    serial: ReentrantMutex<()>,
    pub state: RwLock<RecordState>,
}

impl ServiceRecord {
    pub fn new(
        name: ServiceName,
        factory: Arc<dyn ServiceFactory>,
        class_loader: Arc<ClassLoader>,
        metadata: ServiceMetadata,
    ) -> Self {
        Self {
            name,
            factory,
            class_loader,
            serial: ReentrantMutex::new(()),
            state: RwLock::new(RecordState {
                state: ServiceState::New,
                instance: None,
                metadata,
                last_failure: None,
                removed: false,
            }),
        }
    }

    pub fn serialize(&self) -> ReentrantMutexGuard<'_, ()> {
        self.serial.lock()
    }

    pub fn current_state(&self) -> ServiceState {
        self.state.read().state
    }

    pub fn is_removed(&self) -> bool {
        self.state.read().removed
    }

    /// Instance, only while running
    pub fn running_instance(&self) -> Option<ServiceInstance> {
        let state = self.state.read();
        match (state.removed, state.state) {
            (false, ServiceState::Running) => state.instance.clone(),
            _ => None,
        }
    }

    pub fn info(&self) -> ServiceInfo {
        let state = self.state.read();
        ServiceInfo {
            name: self.name.clone(),
            state: state.state,
            metadata: state.metadata.clone(),
            class_loader: self.class_loader.name().to_string(),
            last_failure: state.last_failure.clone(),
        }
    }
}
