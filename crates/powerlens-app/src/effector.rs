//! 드라이런 실행기.
//!
//! 실제 디바이스를 건드리지 않고 적용될 액션을 로그로만 남긴다.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::info;

use powerlens_core::error::CoreError;
use powerlens_core::models::actionable::Actionable;
use powerlens_core::ports::effector::ActionEffector;

#[derive(Default)]
pub struct DryRunEffector {
    applied: AtomicUsize,
}

impl DryRunEffector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 지금까지 "적용"한 액션 수
    pub fn applied_count(&self) -> usize {
        self.applied.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ActionEffector for DryRunEffector {
    async fn apply(&self, actionable: &Actionable) -> Result<(), CoreError> {
        info!(
            id = %actionable.id(),
            action = %actionable.actionable_type(),
            package = actionable.package_name(),
            new_mode = actionable.new_mode().unwrap_or("-"),
            description = actionable.description(),
            "[dry-run] 액션 적용"
        );
        self.applied.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powerlens_core::models::actionable::ActionableType;

    #[tokio::test]
    async fn counts_applied_actions() {
        let effector = DryRunEffector::new();
        let actionable = Actionable::new(
            ActionableType::SetStandbyBucket,
            "com.zhiliaoapp.musically",
            "Move TikTok to the restricted bucket",
        )
        .with_new_mode("restricted");
        effector.apply(&actionable).await.unwrap();
        assert_eq!(effector.applied_count(), 1);
        assert_eq!(effector.name(), "dry-run");
    }
}
