//! Point queries - 일회성 스냅샷 조회
//!
//! 구독 없이 "지금 이 순간" 상태만 확인합니다. 계속 따라가야 한다면
//! [`LiveTracker`](crate::tracker::LiveTracker)를 사용하세요.

use crate::registry::Kernel;
use keel_foundation::{PatternSet, ServiceName, ServiceState};
use std::collections::BTreeSet;
use tracing::trace;

/// Running 여부
///
/// 등록되지 않은 이름도 `false`. 한 번도 없었던 서비스와 정지된 서비스를
/// 구분하지 않는다. 구분이 필요하면 [`Kernel::get_service_state`]를 쓸 것.
pub fn is_running(kernel: &Kernel, name: &ServiceName) -> bool {
    match kernel.get_service_state(name) {
        Ok(state) => state == ServiceState::Running,
        Err(e) if e.is_not_found() => {
            trace!(service = %name, "Not registered, reporting not running");
            false
        }
        Err(_) => false,
    }
}

/// 패턴에 매칭되고 지금 Running 인 이름들
pub fn running_targets(kernel: &Kernel, patterns: &PatternSet) -> BTreeSet<ServiceName> {
    kernel
        .list_services(patterns)
        .into_iter()
        .filter(|name| is_running(kernel, name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::registry::{ServiceFactory, ServiceInstance};
    use std::sync::Arc;

    fn name(s: &str) -> ServiceName {
        s.parse().unwrap()
    }

    fn factory() -> impl ServiceFactory {
        |_ctx: &ExecutionContext| -> anyhow::Result<ServiceInstance> { Ok(Arc::new(())) }
    }

    #[test]
    fn test_is_running_unknown_is_false() {
        let kernel = Kernel::new();
        assert!(!is_running(&kernel, &name("app:name=Ghost")));
    }

    #[test]
    fn test_is_running_states() {
        let kernel = Kernel::new();
        let x = name("app:name=X");
        kernel.register(x.clone(), factory()).unwrap();
        assert!(!is_running(&kernel, &x));

        kernel.start(&x).unwrap();
        assert!(is_running(&kernel, &x));

        kernel.stop(&x).unwrap();
        kernel.unregister(&x).unwrap();
        assert!(!is_running(&kernel, &x));
    }

    #[test]
    fn test_running_targets() {
        let kernel = Kernel::new();
        for n in ["app:name=X", "app:name=Y", "sys:name=Z"] {
            kernel.register(name(n), factory()).unwrap();
        }
        kernel.start(&name("app:name=Y")).unwrap();
        kernel.start(&name("sys:name=Z")).unwrap();

        let patterns = PatternSet::parse(["app:name=*"]).unwrap();
        let running = running_targets(&kernel, &patterns);
        assert_eq!(running.into_iter().collect::<Vec<_>>(), vec![name("app:name=Y")]);
        assert!(running_targets(&kernel, &PatternSet::new()).is_empty());
    }
}
