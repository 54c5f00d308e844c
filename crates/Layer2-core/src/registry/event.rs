//! Service events and listeners

use chrono::{DateTime, Utc};
use keel_foundation::{Result, ServiceName, ServiceState};
use serde::{Deserialize, Serialize};

// ============================================================================
// SubscriptionId
// ============================================================================

/// 구독 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "subscription-{}", self.0)
    }
}

// ============================================================================
// ServiceEvent
// ============================================================================

/// 이벤트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceEventKind {
    /// 새 레코드 등록 (`None -> New`)
    Registered,
    /// 상태 전이
    StateChanged,
    /// 레코드 제거 (`Some(state) -> None`)
    Unregistered,
    /// 구독 시점에 이미 Running 인 서비스 (`None -> Running`), 해당 구독자에게만 전달
    Backfill,
}

/// A single observable change to one service record.
///
/// For a given name, events reach each subscriber in exactly the order the
/// kernel applied them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEvent {
    /// Kernel-wide monotonically increasing sequence number
    pub sequence: u64,
    pub name: ServiceName,
    pub kind: ServiceEventKind,
    pub old_state: Option<ServiceState>,
    pub new_state: Option<ServiceState>,
    pub timestamp: DateTime<Utc>,
}

impl ServiceEvent {
    fn build(
        name: ServiceName,
        kind: ServiceEventKind,
        old_state: Option<ServiceState>,
        new_state: Option<ServiceState>,
    ) -> Self {
        Self {
            sequence: 0,
            name,
            kind,
            old_state,
            new_state,
            timestamp: Utc::now(),
        }
    }

    pub fn registered(name: ServiceName) -> Self {
        Self::build(name, ServiceEventKind::Registered, None, Some(ServiceState::New))
    }

    pub fn state_changed(name: ServiceName, from: ServiceState, to: ServiceState) -> Self {
        Self::build(name, ServiceEventKind::StateChanged, Some(from), Some(to))
    }

    pub fn unregistered(name: ServiceName, last: ServiceState) -> Self {
        Self::build(name, ServiceEventKind::Unregistered, Some(last), None)
    }

    pub fn backfill(name: ServiceName) -> Self {
        Self::build(name, ServiceEventKind::Backfill, None, Some(ServiceState::Running))
    }

    pub(crate) fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Did this event make the service available?
    pub fn entered_running(&self) -> bool {
        self.new_state == Some(ServiceState::Running)
            && self.old_state != Some(ServiceState::Running)
    }

    /// Did this event take the service out of `Running`?
    pub fn left_running(&self) -> bool {
        self.old_state == Some(ServiceState::Running)
            && self.new_state != Some(ServiceState::Running)
    }
}

impl std::fmt::Display for ServiceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = |s: Option<ServiceState>| s.map(ServiceState::as_str).unwrap_or("-");
        write!(
            f,
            "#{} {} {} -> {}",
            self.sequence,
            self.name,
            state(self.old_state),
            state(self.new_state)
        )
    }
}

// ============================================================================
// ServiceListener
// ============================================================================

/// 서비스 이벤트 리스너
///
/// 전이를 일으킨 스레드에서 동기적으로 호출된다. 같은 이름에 대한 전이를
/// 다시 일으키면 안 되지만 조회는 자유롭다. 에러나 패닉은 로그만 남기고
/// 다른 리스너 전달을 막지 않는다.
pub trait ServiceListener: Send + Sync {
    /// 리스너 이름 (디버깅용)
    fn name(&self) -> &str;

    /// 이벤트 처리
    fn on_event(&self, event: &ServiceEvent) -> Result<()>;
}

/// Closure-backed listener
pub struct FnListener<F> {
    name: String,
    handler: F,
}

impl<F> FnListener<F>
where
    F: Fn(&ServiceEvent) -> Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<F> ServiceListener for FnListener<F>
where
    F: Fn(&ServiceEvent) -> Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn on_event(&self, event: &ServiceEvent) -> Result<()> {
        (self.handler)(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name() -> ServiceName {
        ServiceName::new("app").unwrap().with("name", "X").unwrap()
    }

    #[test]
    fn test_running_edges() {
        use ServiceState::*;
        assert!(ServiceEvent::state_changed(name(), Starting, Running).entered_running());
        assert!(ServiceEvent::backfill(name()).entered_running());
        assert!(ServiceEvent::state_changed(name(), Running, Stopping).left_running());
        assert!(ServiceEvent::state_changed(name(), Running, Failed).left_running());
        assert!(!ServiceEvent::registered(name()).entered_running());
        assert!(!ServiceEvent::unregistered(name(), Stopped).left_running());
    }

    #[test]
    fn test_display() {
        let event = ServiceEvent::state_changed(name(), ServiceState::New, ServiceState::Starting)
            .with_sequence(3);
        assert_eq!(event.to_string(), "#3 app:name=X new -> starting");
        let removed = ServiceEvent::unregistered(name(), ServiceState::Stopped).with_sequence(4);
        assert_eq!(removed.to_string(), "#4 app:name=X stopped -> -");
    }
}
