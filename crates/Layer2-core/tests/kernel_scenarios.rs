//! 커널 시나리오 테스트
//!
//! 여러 모듈을 엮어서 서비스 라이프사이클과 라이브 트래킹을 검증

use keel_core::{
    context, export, is_running, running_targets, CapabilityType, ClassLoader, CollectionReference,
    Error, ExecutionContext, FnListener, Kernel, LiveTracker, PatternSet, ServiceEvent,
    ServiceInstance, ServiceName, ServiceState,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

// ============================================================================
// Fixtures
// ============================================================================

trait Greeter: Send + Sync {
    fn greet(&self) -> String;
}

struct Named(String);

impl Greeter for Named {
    fn greet(&self) -> String {
        format!("hello from {}", self.0)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn name(s: &str) -> ServiceName {
    s.parse().unwrap()
}

fn greeter_type() -> CapabilityType<dyn Greeter> {
    CapabilityType::exported("Greeter")
}

fn app_patterns() -> PatternSet {
    PatternSet::parse(["app:name=*"]).unwrap()
}

fn register_greeter(kernel: &Kernel, service: &ServiceName) {
    let label = service.property("name").unwrap_or("?").to_string();
    kernel
        .register(
            service.clone(),
            move |_ctx: &ExecutionContext| -> anyhow::Result<ServiceInstance> {
                let target: Arc<dyn Greeter> = Arc::new(Named(label.clone()));
                Ok(export(target))
            },
        )
        .unwrap();
}

// ============================================================================
// 시나리오
// ============================================================================

#[test]
fn tracker_follows_greeters_across_restarts() {
    init_tracing();
    let kernel = Kernel::new();
    let x = name("app:name=X");
    register_greeter(&kernel, &x);
    kernel.start(&x).unwrap();

    let tracker = LiveTracker::new(&kernel, "greeters", app_patterns(), greeter_type());
    assert_eq!(tracker.len(), 1);

    kernel.stop(&x).unwrap();
    assert_eq!(tracker.len(), 0);

    let y = name("app:name=Y");
    register_greeter(&kernel, &y);
    kernel.start(&y).unwrap();

    assert_eq!(tracker.len(), 1);
    assert!(tracker.contains(&y));
    assert!(!tracker.contains(&x));
    let greetings: Vec<String> = tracker.targets().iter().map(|g| g.greet()).collect();
    assert_eq!(greetings, vec!["hello from Y".to_string()]);
}

#[test]
fn list_services_is_empty_before_registration() {
    let kernel = Kernel::new();
    assert!(kernel.list_services(&app_patterns()).is_empty());
}

#[test]
fn collection_factory_requires_active_context() {
    let reference = CollectionReference::new("greeters", app_patterns(), "Greeter");
    let result = reference.get_object::<dyn Greeter>();
    assert!(matches!(result, Err(Error::NoActiveContext)));
    assert!(LiveTracker::from_context("greeters", app_patterns(), greeter_type()).is_err());
}

#[test]
fn factory_sees_its_own_context() {
    let kernel = Kernel::new();
    let x = name("app:name=X");
    let seen = Arc::new(Mutex::new(None));

    let captured = Arc::clone(&seen);
    kernel
        .register(x.clone(), move |ctx: &ExecutionContext| -> anyhow::Result<ServiceInstance> {
            let current = context::require()?;
            assert_eq!(&current, ctx);
            *captured.lock().unwrap() = current.service().cloned();
            Ok(Arc::new(()))
        })
        .unwrap();

    kernel.start(&x).unwrap();
    assert_eq!(seen.lock().unwrap().clone(), Some(x));
    assert!(context::current().is_none());
}

#[test]
fn factory_wires_a_tracker_from_its_context() {
    let kernel = Kernel::new();
    kernel.class_loader().define(greeter_type());

    let x = name("app:name=X");
    register_greeter(&kernel, &x);
    kernel.start(&x).unwrap();

    // 다른 서비스의 팩토리 안에서 참조 해석
    let holder: Arc<Mutex<Option<LiveTracker<dyn Greeter>>>> = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&holder);
    let consumer = name("app-consumer:name=C");
    kernel
        .register(
            consumer.clone(),
            move |_ctx: &ExecutionContext| -> anyhow::Result<ServiceInstance> {
                let reference = CollectionReference::new("greeters", app_patterns(), "Greeter");
                let tracker = reference.get_object::<dyn Greeter>()?;
                *slot.lock().unwrap() = Some(tracker);
                Ok(Arc::new(()))
            },
        )
        .unwrap();
    kernel.start(&consumer).unwrap();

    let guard = holder.lock().unwrap();
    let tracker = guard.as_ref().unwrap();
    assert_eq!(tracker.names(), vec![x]);
}

#[test]
fn double_dispose_is_harmless() {
    let kernel = Kernel::new();
    let tracker = LiveTracker::new(&kernel, "greeters", app_patterns(), greeter_type());
    tracker.dispose();
    tracker.dispose();
    assert!(tracker.is_empty());
    assert_eq!(kernel.listener_count(), 0);
}

#[test]
fn is_running_never_raises() {
    let kernel = Kernel::new();
    assert!(!is_running(&kernel, &name("app:name=Nobody")));
    assert!(running_targets(&kernel, &app_patterns()).is_empty());
}

#[test]
fn nested_context_scopes_restore() {
    let kernel = Kernel::new();
    let a = kernel.root_context();
    let b = ExecutionContext::new(kernel.clone(), Arc::new(ClassLoader::new("b")));

    context::with_context(a.clone(), || {
        context::with_context(b.clone(), || {
            assert_eq!(context::current(), Some(b.clone()));
        });
        assert_eq!(context::current(), Some(a.clone()));
    });
    assert_eq!(context::current(), None);
}

#[test]
fn invalid_transition_leaves_state_unchanged() {
    let kernel = Kernel::new();
    let x = name("app:name=X");
    register_greeter(&kernel, &x);

    assert!(matches!(
        kernel.stop(&x),
        Err(Error::InvalidStateTransition { .. })
    ));
    assert_eq!(kernel.get_service_state(&x).unwrap(), ServiceState::New);

    kernel.start(&x).unwrap();
    assert_eq!(kernel.get_service_state(&x).unwrap(), ServiceState::Running);
    assert!(kernel.unregister(&name("app:name=Other")).unwrap_err().is_not_found());
}

#[test]
fn broken_listener_does_not_block_trackers() {
    init_tracing();
    let kernel = Kernel::new();
    kernel.subscribe(
        PatternSet::any(),
        Arc::new(FnListener::new("broken", |_event: &ServiceEvent| -> keel_core::Result<()> {
            panic!("listener bug")
        })),
    );

    let tracker = LiveTracker::new(&kernel, "greeters", app_patterns(), greeter_type());
    let x = name("app:name=X");
    register_greeter(&kernel, &x);
    kernel.start(&x).unwrap();

    assert_eq!(tracker.len(), 1);
}

// ============================================================================
// 동시성
// ============================================================================

#[test]
fn per_name_event_order_under_contention() {
    const SERVICES: usize = 8;
    const CYCLES: usize = 20;

    let kernel = Kernel::new();
    let events: Arc<Mutex<Vec<ServiceEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    kernel.subscribe(
        PatternSet::any(),
        Arc::new(FnListener::new("collector", move |event: &ServiceEvent| {
            sink.lock().unwrap().push(event.clone());
            Ok(())
        })),
    );

    let names: Vec<ServiceName> = (0..SERVICES)
        .map(|i| name(&format!("app:name=S{}", i)))
        .collect();
    for n in &names {
        register_greeter(&kernel, n);
    }

    let tracker = LiveTracker::new(&kernel, "greeters", app_patterns(), greeter_type());
    let barrier = Arc::new(Barrier::new(SERVICES * 2));
    let mut handles = Vec::new();

    // 이름마다 전이 스레드 하나 + 같은 이름을 두드리는 경쟁 스레드 하나
    for n in names.clone() {
        let (driver, reader) = (kernel.clone(), kernel.clone());
        let (driver_barrier, reader_barrier) = (Arc::clone(&barrier), Arc::clone(&barrier));
        let reader_name = n.clone();

        handles.push(thread::spawn(move || {
            driver_barrier.wait();
            for _ in 0..CYCLES {
                driver.start(&n).unwrap();
                driver.stop(&n).unwrap();
            }
            driver.start(&n).unwrap();
        }));

        handles.push(thread::spawn(move || {
            reader_barrier.wait();
            for _ in 0..CYCLES {
                // 전이 도중에도 조회는 막히거나 실패하지 않음
                reader.get_service_state(&reader_name).unwrap();
                is_running(&reader, &reader_name);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(tracker.len(), SERVICES);
    assert_eq!(running_targets(&kernel, &app_patterns()).len(), SERVICES);

    // 이름별 이벤트는 연속된 전이 체인이어야 함
    let events = events.lock().unwrap();
    for n in &names {
        let chain: Vec<&ServiceEvent> = events.iter().filter(|e| &e.name == n).collect();
        assert_eq!(chain.len(), 1 + (CYCLES * 4) + 2);
        for pair in chain.windows(2) {
            assert_eq!(pair[0].new_state, pair[1].old_state, "broken chain for {}", n);
            assert!(pair[0].sequence < pair[1].sequence);
        }
    }
}

#[test]
fn concurrent_trackers_see_every_member() {
    let kernel = Kernel::new();
    let names: Vec<ServiceName> = (0..16).map(|i| name(&format!("app:name=T{}", i))).collect();
    for n in &names {
        register_greeter(&kernel, n);
    }

    let barrier = Arc::new(Barrier::new(2));
    let starter = {
        let kernel = kernel.clone();
        let names = names.clone();
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            for n in &names {
                kernel.start(n).unwrap();
            }
        })
    };

    barrier.wait();
    let tracker = LiveTracker::new(&kernel, "late", app_patterns(), greeter_type());
    starter.join().unwrap();

    // 구독 전후 어느 쪽에서 Running 이 됐든 빠짐 없이 한 번씩
    assert_eq!(tracker.names(), {
        let mut sorted = names.clone();
        sorted.sort();
        sorted
    });
}

#[test]
fn listener_may_query_the_kernel() {
    let kernel = Kernel::new();
    let observed = Arc::new(AtomicUsize::new(0));

    let handle = kernel.clone();
    let counter = Arc::clone(&observed);
    kernel.subscribe(
        app_patterns(),
        Arc::new(FnListener::new("querying", move |event: &ServiceEvent| {
            if let Some(state) = event.new_state {
                assert_eq!(handle.get_service_state(&event.name)?, state);
                counter.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        })),
    );

    let x = name("app:name=X");
    register_greeter(&kernel, &x);
    kernel.start(&x).unwrap();
    kernel.stop(&x).unwrap();

    // New, Starting, Running, Stopping, Stopped
    assert_eq!(observed.load(Ordering::SeqCst), 5);
}
