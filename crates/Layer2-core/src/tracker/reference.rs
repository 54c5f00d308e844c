//! References - 외부 와이어링 레이어가 선언적으로 요청하는 객체
//!
//! 와이어링 설정은 `{ name, patterns, typeName }` 형태로 트래커를 요청합니다.
//! 실제 해석은 팩토리 콜백 안, 즉 활성 실행 컨텍스트 아래에서 일어납니다.

use super::LiveTracker;
use crate::capability::ClassLoader;
use crate::context;
use keel_foundation::{PatternSet, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// 패턴에 매칭되는 Running 서비스 컬렉션 요청
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReference {
    /// 논리 이름 (트래커 이름으로 사용)
    pub name: String,
    pub patterns: PatternSet,
    /// 현재 클래스 로더에서 해석할 capability 타입 이름
    pub type_name: String,
}

impl CollectionReference {
    pub fn new(
        name: impl Into<String>,
        patterns: PatternSet,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            patterns,
            type_name: type_name.into(),
        }
    }

    /// 현재 컨텍스트의 커널에 묶인 트래커 생성
    ///
    /// - 활성 컨텍스트 없음: `NoActiveContext`
    /// - 타입 해석 실패: `TypeResolution`
    pub fn get_object<P>(&self) -> Result<LiveTracker<P>>
    where
        P: ?Sized + Send + Sync + 'static,
    {
        let ctx = context::require()?;
        let capability = ctx.class_loader().load::<P>(&self.type_name)?;

        debug!(
            reference = %self.name,
            type_name = %self.type_name,
            loader = ctx.class_loader().name(),
            "Resolving collection reference"
        );

        Ok(LiveTracker::new(
            ctx.kernel(),
            self.name.clone(),
            self.patterns.clone(),
            capability,
        ))
    }
}

/// 현재 컨텍스트의 클래스 로더 요청
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassLoaderReference;

impl ClassLoaderReference {
    pub fn get_object(&self) -> Result<Arc<ClassLoader>> {
        Ok(Arc::clone(context::require()?.class_loader()))
    }
}
