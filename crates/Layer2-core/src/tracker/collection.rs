//! Live Tracker - Running 서비스의 프록시 컬렉션

use super::proxy::ServiceProxy;
use crate::capability::CapabilityType;
use crate::context;
use crate::registry::{Kernel, ServiceEvent, ServiceEventKind, ServiceListener, SubscriptionId};
use keel_foundation::{PatternSet, Result, ServiceName};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

struct TrackerShared<P: ?Sized> {
    name: String,
    kernel: Kernel,
    patterns: PatternSet,
    capability: CapabilityType<P>,
    members: RwLock<BTreeMap<ServiceName, Arc<ServiceProxy<P>>>>,
    subscription: Mutex<Option<SubscriptionId>>,
    disposed: AtomicBool,
}

impl<P> TrackerShared<P>
where
    P: ?Sized + Send + Sync + 'static,
{
    fn add(&self, name: &ServiceName) {
        let Some(instance) = self.kernel.service_instance(name) else {
            // 이미 Running 을 벗어남. 뒤따르는 이벤트가 정리함
            return;
        };

        let mut members = self.members.write();
        if self.disposed.load(Ordering::SeqCst) || members.contains_key(name) {
            return;
        }

        debug!(tracker = %self.name, service = %name, "Tracking service");
        members.insert(
            name.clone(),
            Arc::new(ServiceProxy::new(name.clone(), instance, self.capability.clone())),
        );
    }

    fn remove(&self, name: &ServiceName) {
        if let Some(proxy) = self.members.write().remove(name) {
            debug!(tracker = %self.name, service = %name, "Untracking service");
            proxy.invalidate();
        }
    }

    fn clear(&self) {
        let drained = std::mem::take(&mut *self.members.write());
        for proxy in drained.values() {
            proxy.invalidate();
        }
    }
}

/// Kernel-side listener. Holds the tracker weakly so that the subscription
/// never keeps a dropped tracker alive.
struct TrackerListener<P: ?Sized> {
    label: String,
    shared: Weak<TrackerShared<P>>,
}

impl<P> ServiceListener for TrackerListener<P>
where
    P: ?Sized + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.label
    }

    fn on_event(&self, event: &ServiceEvent) -> Result<()> {
        let Some(shared) = self.shared.upgrade() else {
            return Ok(());
        };
        if shared.disposed.load(Ordering::SeqCst) {
            return Ok(());
        }

        trace!(tracker = %shared.name, event = %event, "Tracker received event");

        if event.entered_running() {
            shared.add(&event.name);
        } else if event.left_running() || event.kind == ServiceEventKind::Unregistered {
            shared.remove(&event.name);
        }
        Ok(())
    }
}

// ============================================================================
// LiveTracker
// ============================================================================

/// Live set of proxies for every running service matching a pattern set.
///
/// Membership follows the kernel: a service joins when it enters `Running`
/// and leaves (its proxy invalidated) as soon as it stops, fails or is
/// unregistered. Services already running when the tracker is created are
/// picked up immediately.
///
/// Dropping the tracker disposes it. After disposal every read returns an
/// empty view.
///
/// ```ignore
/// let greeters = LiveTracker::new(
///     &kernel,
///     "greeters",
///     PatternSet::parse(["app:name=*"])?,
///     CapabilityType::<dyn Greeter>::exported("Greeter"),
/// );
///
/// for proxy in &greeters {
///     println!("{}", proxy.target()?.greet());
/// }
/// ```
pub struct LiveTracker<P: ?Sized + Send + Sync + 'static> {
    shared: Arc<TrackerShared<P>>,
}

impl<P> LiveTracker<P>
where
    P: ?Sized + Send + Sync + 'static,
{
    /// 트래커 생성 및 구독
    pub fn new(
        kernel: &Kernel,
        name: impl Into<String>,
        patterns: PatternSet,
        capability: CapabilityType<P>,
    ) -> Self {
        let shared = Arc::new(TrackerShared {
            name: name.into(),
            kernel: kernel.clone(),
            patterns,
            capability,
            members: RwLock::new(BTreeMap::new()),
            subscription: Mutex::new(None),
            disposed: AtomicBool::new(false),
        });

        let listener = Arc::new(TrackerListener {
            label: format!("tracker:{}", shared.name),
            shared: Arc::downgrade(&shared),
        });

        // 구독 시점에 이미 Running 인 서비스는 backfill 로 채워짐
        let id = kernel.subscribe(shared.patterns.clone(), listener);
        *shared.subscription.lock() = Some(id);

        debug!(
            tracker = %shared.name,
            patterns = %shared.patterns,
            capability = shared.capability.name(),
            initial = shared.members.read().len(),
            "Live tracker created"
        );

        Self { shared }
    }

    /// 현재 실행 컨텍스트의 커널로 트래커 생성
    ///
    /// 활성 컨텍스트가 없으면 `NoActiveContext`
    pub fn from_context(
        name: impl Into<String>,
        patterns: PatternSet,
        capability: CapabilityType<P>,
    ) -> Result<Self> {
        let ctx = context::require()?;
        Ok(Self::new(ctx.kernel(), name, patterns, capability))
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.shared.patterns
    }

    pub fn capability(&self) -> &str {
        self.shared.capability.name()
    }

    pub fn len(&self) -> usize {
        self.shared.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &ServiceName) -> bool {
        self.shared.members.read().contains_key(name)
    }

    /// 현재 멤버 이름 (정렬)
    pub fn names(&self) -> Vec<ServiceName> {
        self.shared.members.read().keys().cloned().collect()
    }

    pub fn get(&self, name: &ServiceName) -> Option<Arc<ServiceProxy<P>>> {
        self.shared.members.read().get(name).cloned()
    }

    /// Snapshot of the membership at call time
    pub fn iter(&self) -> std::vec::IntoIter<Arc<ServiceProxy<P>>> {
        let snapshot: Vec<_> = self.shared.members.read().values().cloned().collect();
        snapshot.into_iter()
    }

    /// 어댑트 가능한 대상만 모아서 반환
    pub fn targets(&self) -> Vec<Arc<P>> {
        self.iter().filter_map(|proxy| proxy.target().ok()).collect()
    }

    /// 구독 해제 및 캐시 비우기. 여러 번 호출해도 안전
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(id) = self.shared.subscription.lock().take() {
            self.shared.kernel.unsubscribe(id);
        }
        self.shared.clear();

        debug!(tracker = %self.shared.name, "Live tracker disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }
}

impl<P> Drop for LiveTracker<P>
where
    P: ?Sized + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<'a, P> IntoIterator for &'a LiveTracker<P>
where
    P: ?Sized + Send + Sync + 'static,
{
    type Item = Arc<ServiceProxy<P>>;
    type IntoIter = std::vec::IntoIter<Arc<ServiceProxy<P>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<P> std::fmt::Debug for LiveTracker<P>
where
    P: ?Sized + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveTracker")
            .field("name", &self.shared.name)
            .field("patterns", &self.shared.patterns)
            .field("members", &self.names())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
