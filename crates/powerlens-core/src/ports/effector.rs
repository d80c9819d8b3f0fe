//! 액션 실행기(Effector) 포트.
//!
//! 실제 OS 조작(프로세스 종료, 네트워크 정책 제한 등)은 외부 구현체가 담당한다.
//! 코어는 검증된 `Actionable`을 하나씩 전달할 뿐이다.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::actionable::Actionable;

/// 단일 액션 실행기
#[async_trait]
pub trait ActionEffector: Send + Sync {
    /// 액션 하나를 적용한다. 실패는 해당 액션에만 영향을 준다.
    async fn apply(&self, actionable: &Actionable) -> Result<(), CoreError>;

    /// 실행기 이름 (예: "android-effector", "dry-run")
    fn name(&self) -> &str;
}
