//! 액션 실행 정책.
//!
//! 실행기로 넘어가기 직전 마지막 관문. 정규화기를 거치지 않은 액션
//! (역직렬화, 외부 입력)도 여기서 다시 검사한다.

use std::collections::BTreeSet;

use powerlens_core::error::CoreError;
use powerlens_core::models::actionable::{Actionable, ActionableType, ALLOWED_ACTIONABLE_TYPES};

/// 심각도 허용 범위
pub const MIN_SEVERITY: u8 = 1;
pub const MAX_SEVERITY: u8 = 5;

// ============================================================
// ActionPolicy
// ============================================================

/// 액션 실행 정책
///
/// 기본값은 전역 허용 목록 전체. 배포 환경에 따라 일부 종류만 허용하도록 좁힐 수 있다
/// (넓히는 것은 불가).
#[derive(Debug, Clone)]
pub struct ActionPolicy {
    allowed: BTreeSet<ActionableType>,
}

impl Default for ActionPolicy {
    fn default() -> Self {
        Self {
            allowed: ALLOWED_ACTIONABLE_TYPES.into_iter().collect(),
        }
    }
}

impl ActionPolicy {
    /// 허용 종류를 좁힌 정책. 전역 허용 목록 밖의 종류는 무시된다.
    pub fn restricted_to(types: impl IntoIterator<Item = ActionableType>) -> Self {
        Self {
            allowed: types.into_iter().filter(|t| t.is_allowed()).collect(),
        }
    }

    pub fn allows(&self, actionable_type: ActionableType) -> bool {
        self.allowed.contains(&actionable_type)
    }

    /// 액션 검증. 거부 사유는 `CoreError::PolicyDenied`로 반환.
    pub fn validate(&self, actionable: &Actionable) -> Result<(), CoreError> {
        let kind = actionable.actionable_type();
        if !self.allows(kind) {
            return Err(CoreError::PolicyDenied(format!(
                "허용되지 않은 액션 종류: {kind}"
            )));
        }

        if kind.requires_package() && actionable.package_name().trim().is_empty() {
            return Err(CoreError::PolicyDenied(format!(
                "{kind} 액션에 패키지 이름 없음"
            )));
        }

        if kind == ActionableType::SetAlert
            && actionable.parameter("threshold").is_none()
            && actionable.parameter("threshold_mb").is_none()
        {
            return Err(CoreError::PolicyDenied(
                "set_alert 액션에 임계값 파라미터 없음".to_string(),
            ));
        }

        let severity = actionable.severity();
        if !(MIN_SEVERITY..=MAX_SEVERITY).contains(&severity) {
            return Err(CoreError::PolicyDenied(format!(
                "심각도 범위 초과: {severity}"
            )));
        }

        Ok(())
    }
}
