//! Kernel - 서비스 레지스트리와 상태 전이

use super::event::{ServiceEvent, ServiceListener, SubscriptionId};
use super::factory::{ServiceFactory, ServiceInstance};
use super::record::{RecordState, ServiceInfo, ServiceMetadata, ServiceRecord};
use crate::capability::ClassLoader;
use crate::context::{self, ExecutionContext};
use chrono::Utc;
use keel_foundation::{Error, KernelConfig, PatternSet, Result, ServiceName, ServiceState};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};

/// 등록된 구독 정보
struct Subscription {
    id: SubscriptionId,
    patterns: PatternSet,
    listener: Arc<dyn ServiceListener>,
}

struct KernelInner {
    config: KernelConfig,

    /// 기본 클래스 로더 (레코드별로 덮어쓸 수 있음)
    class_loader: Arc<ClassLoader>,

    /// 이름 -> 레코드. 커널에서 유일하게 공유되는 가변 구조
    records: RwLock<HashMap<ServiceName, Arc<ServiceRecord>>>,

    subscriptions: RwLock<Vec<Subscription>>,
    subscription_counter: AtomicU64,

    sequence: AtomicU64,
    event_tx: broadcast::Sender<ServiceEvent>,
    history: Mutex<VecDeque<ServiceEvent>>,
}

/// 서비스 커널
///
/// 이름별 서비스 레코드와 라이프사이클 상태의 단일 진실 공급원입니다.
/// `Kernel`은 가벼운 핸들이라 clone 해서 어디든 넘길 수 있습니다.
///
/// ## 동시성
///
/// - 같은 이름에 대한 전이는 레코드별 락으로 직렬화되고, 다른 이름끼리는 병렬로 진행
/// - 상태와 인스턴스는 하나의 쓰기 락 안에서 함께 바뀌므로 조회는 항상 일관된 값을 봄
/// - 리스너는 전이를 일으킨 스레드에서, 레코드 락을 잡은 채 순서대로 호출됨
///
/// ## 사용법
///
/// ```ignore
/// let kernel = Kernel::new();
/// let name: ServiceName = "app:name=X".parse()?;
///
/// kernel.register(name.clone(), |_ctx: &ExecutionContext| Ok(export(greeter())))?;
/// kernel.start(&name)?;
/// assert_eq!(kernel.get_service_state(&name)?, ServiceState::Running);
///
/// kernel.stop(&name)?;
/// kernel.unregister(&name)?;
/// ```
#[derive(Clone)]
pub struct Kernel {
    inner: Arc<KernelInner>,
}

impl Kernel {
    /// 기본 설정으로 커널 생성
    pub fn new() -> Self {
        Self::build(KernelConfig::default())
    }

    /// 커스텀 설정으로 커널 생성
    pub fn with_config(config: KernelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: KernelConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity);
        let class_loader = Arc::new(ClassLoader::new(config.default_class_loader.clone()));

        info!(kernel = %config.name, "Kernel created");

        Self {
            inner: Arc::new(KernelInner {
                class_loader,
                records: RwLock::new(HashMap::new()),
                subscriptions: RwLock::new(Vec::new()),
                subscription_counter: AtomicU64::new(0),
                sequence: AtomicU64::new(0),
                event_tx,
                history: Mutex::new(VecDeque::new()),
                config,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn config(&self) -> &KernelConfig {
        &self.inner.config
    }

    /// 기본 클래스 로더
    pub fn class_loader(&self) -> Arc<ClassLoader> {
        Arc::clone(&self.inner.class_loader)
    }

    /// Do both handles point at the same kernel?
    pub fn same_kernel(&self, other: &Kernel) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Context bound to this kernel and its default class loader, not tied to any service
    pub fn root_context(&self) -> ExecutionContext {
        ExecutionContext::new(self.clone(), self.class_loader())
    }

    // ========================================================================
    // 등록 / 해제
    // ========================================================================

    /// 서비스 등록 (상태 New)
    pub fn register<F>(&self, name: ServiceName, factory: F) -> Result<()>
    where
        F: ServiceFactory + 'static,
    {
        self.register_with(name, Arc::new(factory), ServiceMetadata::new(), None)
    }

    /// 메타데이터와 클래스 로더를 지정해 등록
    pub fn register_with(
        &self,
        name: ServiceName,
        factory: Arc<dyn ServiceFactory>,
        metadata: ServiceMetadata,
        class_loader: Option<Arc<ClassLoader>>,
    ) -> Result<()> {
        let class_loader = class_loader.unwrap_or_else(|| self.class_loader());
        let record = Arc::new(ServiceRecord::new(
            name.clone(),
            factory,
            class_loader,
            metadata,
        ));

        // 등록 이벤트가 전달되기 전에는 다른 스레드가 전이를 시작할 수 없음
        let _serial = record.serialize();
        {
            let mut records = self.inner.records.write();
            if records.contains_key(&name) {
                return Err(Error::ServiceAlreadyRegistered(name));
            }
            records.insert(name.clone(), Arc::clone(&record));
        }

        debug!(kernel = %self.name(), service = %name, "Registered service");
        self.publish(ServiceEvent::registered(name));
        Ok(())
    }

    /// 서비스 등록 해제
    ///
    /// Running 상태면 먼저 정지한다. New / Stopped / Failed 레코드는 바로 제거된다.
    pub fn unregister(&self, name: &ServiceName) -> Result<()> {
        let record = self.lookup(name)?;
        let _serial = record.serialize();
        Self::ensure_present(&record)?;

        if record.current_state() == ServiceState::Running {
            // 정지 실패 시에도 레코드는 Failed 로 남으므로 제거는 계속 진행
            if let Err(e) = self.stop_locked(&record) {
                warn!(service = %name, error = %e, "Stop before unregister failed");
            }
        }

        let last = {
            let mut state = record.state.write();
            if !state.state.is_removable() {
                return Err(Error::InvalidStateTransition {
                    name: name.clone(),
                    from: state.state,
                    to: ServiceState::Stopped,
                });
            }
            state.removed = true;
            state.instance = None;
            state.state
        };
        self.inner.records.write().remove(name);

        debug!(
            kernel = %self.name(),
            service = %name,
            state = %last,
            "Unregistered service"
        );
        self.publish(ServiceEvent::unregistered(name.clone(), last));
        Ok(())
    }

    // ========================================================================
    // 라이프사이클
    // ========================================================================

    /// New / Stopped -> Starting -> Running (실패 시 Failed)
    pub fn start(&self, name: &ServiceName) -> Result<()> {
        let record = self.lookup(name)?;
        let _serial = record.serialize();
        Self::ensure_present(&record)?;

        self.transition(&record, ServiceState::Starting, |_| {})?;

        let ctx = self.context_for(&record);
        let created = context::with_context(ctx.clone(), || {
            panic::catch_unwind(AssertUnwindSafe(|| record.factory.create(&ctx)))
        });
        let created = match created {
            Ok(result) => result,
            Err(panic) => Err(anyhow::anyhow!(
                "factory panicked: {}",
                panic_message(panic.as_ref())
            )),
        };

        match created {
            Ok(instance) => {
                self.transition(&record, ServiceState::Running, move |state| {
                    state.instance = Some(instance);
                    state.metadata.start_count += 1;
                })?;
                info!(kernel = %self.name(), service = %name, "Service running");
                Ok(())
            }
            Err(e) => {
                error!(
                    kernel = %self.name(),
                    service = %name,
                    error = %e,
                    "Service failed to start"
                );
                let message = e.to_string();
                self.transition(&record, ServiceState::Failed, |state| {
                    state.last_failure = Some(message);
                })?;
                Err(Error::construction(name, e))
            }
        }
    }

    /// Running -> Stopping -> Stopped (실패 시 Failed)
    pub fn stop(&self, name: &ServiceName) -> Result<()> {
        let record = self.lookup(name)?;
        let _serial = record.serialize();
        Self::ensure_present(&record)?;
        self.stop_locked(&record)
    }

    fn stop_locked(&self, record: &ServiceRecord) -> Result<()> {
        let name = &record.name;
        let mut taken = None;
        self.transition(record, ServiceState::Stopping, |state| {
            taken = state.instance.take();
        })?;

        let destroyed = match taken {
            Some(instance) => {
                let ctx = self.context_for(record);
                context::with_context(ctx.clone(), || {
                    panic::catch_unwind(AssertUnwindSafe(|| {
                        record.factory.destroy(&ctx, instance)
                    }))
                })
                .unwrap_or_else(|panic| {
                    Err(anyhow::anyhow!(
                        "factory panicked: {}",
                        panic_message(panic.as_ref())
                    ))
                })
            }
            None => Ok(()),
        };

        match destroyed {
            Ok(()) => {
                self.transition(record, ServiceState::Stopped, |_| {})?;
                info!(kernel = %self.name(), service = %name, "Service stopped");
                Ok(())
            }
            Err(e) => {
                error!(
                    kernel = %self.name(),
                    service = %name,
                    error = %e,
                    "Service failed to stop"
                );
                let message = e.to_string();
                self.transition(record, ServiceState::Failed, |state| {
                    state.last_failure = Some(message);
                })?;
                Err(Error::destruction(name, e))
            }
        }
    }

    /// 관리자 전이: Starting / Running / Stopping -> Failed
    ///
    /// 인스턴스는 destroy 콜백 없이 버려진다.
    pub fn fail(&self, name: &ServiceName, reason: impl Into<String>) -> Result<()> {
        let reason = reason.into();
        let record = self.lookup(name)?;
        let _serial = record.serialize();
        Self::ensure_present(&record)?;

        warn!(kernel = %self.name(), service = %name, reason = %reason, "Marking service failed");
        self.transition(&record, ServiceState::Failed, |state| {
            state.instance = None;
            state.last_failure = Some(reason);
        })
    }

    /// Validate and apply `to` together with `apply` under one write lock, then notify.
    ///
    /// Caller must hold the record's serial lock.
    fn transition(
        &self,
        record: &ServiceRecord,
        to: ServiceState,
        apply: impl FnOnce(&mut RecordState),
    ) -> Result<()> {
        let from = {
            let mut state = record.state.write();
            let from = state.state;
            if !from.can_transition_to(to) {
                return Err(Error::InvalidStateTransition {
                    name: record.name.clone(),
                    from,
                    to,
                });
            }
            apply(&mut state);
            state.state = to;
            state.metadata.updated_at = Utc::now();
            from
        };

        debug!(kernel = %self.name(), service = %record.name, %from, %to, "State transition");
        self.publish(ServiceEvent::state_changed(record.name.clone(), from, to));
        Ok(())
    }

    fn context_for(&self, record: &ServiceRecord) -> ExecutionContext {
        ExecutionContext::new(self.clone(), Arc::clone(&record.class_loader))
            .for_service(record.name.clone())
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 패턴에 매칭되는 모든 이름 (상태 무관 스냅샷)
    pub fn list_services(&self, patterns: &PatternSet) -> BTreeSet<ServiceName> {
        let records = self.inner.records.read();
        records
            .keys()
            .filter(|name| patterns.matches_any(name))
            .cloned()
            .collect()
    }

    /// 서비스 상태 조회
    pub fn get_service_state(&self, name: &ServiceName) -> Result<ServiceState> {
        let record = self.lookup(name)?;
        let state = record.state.read();
        if state.removed {
            return Err(Error::ServiceNotFound(name.clone()));
        }
        Ok(state.state)
    }

    /// 서비스 정보 스냅샷
    pub fn service_info(&self, name: &ServiceName) -> Result<ServiceInfo> {
        let record = self.lookup(name)?;
        Self::ensure_present(&record)?;
        Ok(record.info())
    }

    /// Running 중인 서비스의 인스턴스
    pub fn service_instance(&self, name: &ServiceName) -> Option<ServiceInstance> {
        self.lookup(name).ok()?.running_instance()
    }

    /// 등록 여부
    pub fn is_registered(&self, name: &ServiceName) -> bool {
        self.inner.records.read().contains_key(name)
    }

    fn lookup(&self, name: &ServiceName) -> Result<Arc<ServiceRecord>> {
        self.inner
            .records
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ServiceNotFound(name.clone()))
    }

    /// A transition may have raced with unregister between lookup and lock.
    fn ensure_present(record: &ServiceRecord) -> Result<()> {
        if record.is_removed() {
            return Err(Error::ServiceNotFound(record.name.clone()));
        }
        Ok(())
    }

    // ========================================================================
    // 구독
    // ========================================================================

    /// 리스너 등록
    ///
    /// 등록 직후, 패턴에 매칭되고 이미 Running 인 서비스마다 `Backfill` 이벤트를
    /// 이 리스너에게만 전달한다. 등록과 backfill 사이의 전이는 중복 add 로만
    /// 나타날 수 있으므로 리스너는 add 를 멱등하게 처리해야 한다.
    pub fn subscribe(
        &self,
        patterns: PatternSet,
        listener: Arc<dyn ServiceListener>,
    ) -> SubscriptionId {
        let id = SubscriptionId::new(
            self.inner
                .subscription_counter
                .fetch_add(1, Ordering::SeqCst),
        );

        debug!(
            kernel = %self.name(),
            listener = listener.name(),
            subscription = %id,
            patterns = %patterns,
            "Registering service listener"
        );

        self.inner.subscriptions.write().push(Subscription {
            id,
            patterns: patterns.clone(),
            listener: Arc::clone(&listener),
        });

        let candidates: Vec<Arc<ServiceRecord>> = {
            let records = self.inner.records.read();
            records
                .iter()
                .filter(|(name, _)| patterns.matches_any(name))
                .map(|(_, record)| Arc::clone(record))
                .collect()
        };

        for record in candidates {
            // 지금 Running 이 아니면 이후 Running 전이가 어차피 전달된다
            if record.current_state() != ServiceState::Running {
                continue;
            }
            let _serial = record.serialize();
            let running = {
                let state = record.state.read();
                !state.removed && state.state == ServiceState::Running
            };
            if running {
                let event = ServiceEvent::backfill(record.name.clone())
                    .with_sequence(self.next_sequence());
                self.deliver(id, listener.as_ref(), &event);
            }
        }

        id
    }

    /// 리스너 해제
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.inner.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        let removed = subscriptions.len() != before;

        if removed {
            debug!(kernel = %self.name(), subscription = %id, "Unregistered service listener");
        }

        removed
    }

    /// 등록된 리스너 수
    pub fn listener_count(&self) -> usize {
        self.inner.subscriptions.read().len()
    }

    /// 모든 이벤트의 브로드캐스트 수신자 (스트림 방식, backfill 없음)
    pub fn watch(&self) -> broadcast::Receiver<ServiceEvent> {
        self.inner.event_tx.subscribe()
    }

    /// 최근 이벤트 (최신순)
    pub fn recent_events(&self, limit: Option<usize>) -> Vec<ServiceEvent> {
        let history = self.inner.history.lock();
        let limit = limit.unwrap_or(history.len());
        history.iter().rev().take(limit).cloned().collect()
    }

    fn next_sequence(&self) -> u64 {
        self.inner.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 이벤트 발행: 히스토리, 브로드캐스트, 매칭되는 리스너 순
    fn publish(&self, event: ServiceEvent) {
        let event = event.with_sequence(self.next_sequence());

        let history_size = self.inner.config.event_history_size;
        if history_size > 0 {
            let mut history = self.inner.history.lock();
            history.push_back(event.clone());
            while history.len() > history_size {
                history.pop_front();
            }
        }

        let _ = self.inner.event_tx.send(event.clone());

        // 콜백 중 subscribe/unsubscribe 가 가능하도록 락 밖에서 전달
        let targets: Vec<(SubscriptionId, Arc<dyn ServiceListener>)> = {
            let subscriptions = self.inner.subscriptions.read();
            subscriptions
                .iter()
                .filter(|s| s.patterns.matches_any(&event.name))
                .map(|s| (s.id, Arc::clone(&s.listener)))
                .collect()
        };

        for (id, listener) in targets {
            self.deliver(id, listener.as_ref(), &event);
        }
    }

    /// 리스너 하나에 전달. 에러/패닉은 로그만 남김
    fn deliver(&self, id: SubscriptionId, listener: &dyn ServiceListener, event: &ServiceEvent) {
        if self.inner.config.debug_events {
            trace!(
                subscription = %id,
                listener = listener.name(),
                event = %event,
                "Delivering service event"
            );
        }

        match panic::catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(
                subscription = %id,
                listener = listener.name(),
                event = %event,
                error = %e,
                "Service listener failed"
            ),
            Err(panic) => error!(
                subscription = %id,
                listener = listener.name(),
                event = %event,
                panic = %panic_message(panic.as_ref()),
                "Service listener panicked"
            ),
        }
    }

    // ========================================================================
    // 통계
    // ========================================================================

    /// 커널 통계
    pub fn stats(&self) -> KernelStats {
        let mut by_state = BTreeMap::new();
        let total = {
            let records = self.inner.records.read();
            for record in records.values() {
                *by_state.entry(record.current_state()).or_insert(0) += 1;
            }
            records.len()
        };

        KernelStats {
            name: self.name().to_string(),
            total,
            by_state,
            listeners: self.listener_count(),
            events_published: self.inner.sequence.load(Ordering::SeqCst),
        }
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("name", &self.name())
            .field("services", &self.inner.records.read().len())
            .finish()
    }
}

/// 커널 통계
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelStats {
    pub name: String,
    pub total: usize,
    pub by_state: BTreeMap<ServiceState, usize>,
    pub listeners: usize,
    /// Events numbered so far, backfill included
    pub events_published: u64,
}

impl KernelStats {
    pub fn count(&self, state: ServiceState) -> usize {
        self.by_state.get(&state).copied().unwrap_or(0)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
