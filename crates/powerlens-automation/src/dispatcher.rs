//! 액션 디스패처.
//!
//! 정책 검증을 통과한 액션을 `ActionEffector`로 동시에 전달한다.
//! 액션마다 결과가 독립적이며(한 액션의 실패가 다른 액션을 중단시키지 않음),
//! 이미 성공했거나 적용 중인 id는 다시 실행기로 보내지 않는다.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use futures::channel::oneshot;
use futures::future::{join_all, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use powerlens_core::config::AutomationConfig;
use powerlens_core::models::actionable::Actionable;
use powerlens_core::ports::effector::ActionEffector;

use crate::audit::{AuditEntry, AuditLogger, AuditStatus};
use crate::policy::ActionPolicy;

/// 진행 중인 적용의 결과 (실행기 호출이 끝나면 한 번 전달됨)
type PendingOutcome = Shared<oneshot::Receiver<bool>>;

/// 멱등성 상태. 두 집합은 항상 같은 락 아래에서 갱신한다.
#[derive(Default)]
struct DispatchState {
    /// 적용에 성공한 id
    applied: HashSet<Uuid>,
    /// 실행기 호출이 진행 중인 id
    in_flight: HashMap<Uuid, PendingOutcome>,
}

enum Claim {
    AlreadyApplied,
    /// 다른 호출이 적용 중 — 그 결과를 기다린다
    InFlight(PendingOutcome),
    /// 이 호출이 적용 담당
    Owned(oneshot::Sender<bool>),
}

/// 적용 담당 future가 중간에 drop되어도 진행 중 표시를 해제한다
struct InFlightRelease<'a> {
    state: &'a Mutex<DispatchState>,
    id: Uuid,
}

impl Drop for InFlightRelease<'_> {
    fn drop(&mut self) {
        self.state.lock().in_flight.remove(&self.id);
    }
}

/// 액션 디스패처 — 정책 검증 + 멱등 실행 + 감사 로깅
pub struct ActionDispatcher {
    effector: Arc<dyn ActionEffector>,
    policy: ActionPolicy,
    enabled: bool,
    state: Mutex<DispatchState>,
    audit: Mutex<AuditLogger>,
}

impl ActionDispatcher {
    pub fn new(effector: Arc<dyn ActionEffector>, config: &AutomationConfig) -> Self {
        info!(
            effector = effector.name(),
            enabled = config.enabled,
            "액션 디스패처 초기화"
        );
        Self {
            effector,
            policy: ActionPolicy::default(),
            enabled: config.enabled,
            state: Mutex::new(DispatchState::default()),
            audit: Mutex::new(AuditLogger::new(config.audit_buffer_size)),
        }
    }

    /// 정책 교체 (빌더)
    pub fn with_policy(mut self, policy: ActionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 액션 목록 실행. 입력의 모든 id에 대해 성공 여부를 반환한다.
    ///
    /// 같은 id가 동시에 여러 호출로 들어오면 실행기는 한 번만 호출되고,
    /// 나머지 호출은 그 결과를 공유한다.
    pub async fn execute(&self, actionables: &[Actionable]) -> HashMap<Uuid, bool> {
        let mut results = HashMap::with_capacity(actionables.len());

        if !self.enabled {
            warn!(count = actionables.len(), "디스패처 비활성 — 모든 액션 거부");
            let mut audit = self.audit.lock();
            for actionable in actionables {
                audit.record(
                    actionable,
                    AuditStatus::Disabled,
                    Some("automation disabled".to_string()),
                    None,
                );
                results.insert(actionable.id(), false);
            }
            return results;
        }

        let mut owned = Vec::new();
        let mut waiting = Vec::new();
        let mut seen = HashSet::new();
        for actionable in actionables {
            let id = actionable.id();
            if !seen.insert(id) {
                continue;
            }

            if !actionable.enabled() {
                self.audit
                    .lock()
                    .record(actionable, AuditStatus::Disabled, None, None);
                results.insert(id, false);
                continue;
            }

            if let Err(e) = self.policy.validate(actionable) {
                warn!(id = %id, error = %e, "정책 거부");
                self.audit
                    .lock()
                    .record(actionable, AuditStatus::Denied, Some(e.to_string()), None);
                results.insert(id, false);
                continue;
            }

            match self.claim(id) {
                Claim::AlreadyApplied => {
                    debug!(id = %id, "이미 적용된 액션 — 생략");
                    self.audit
                        .lock()
                        .record(actionable, AuditStatus::AlreadyApplied, None, None);
                    results.insert(id, true);
                }
                Claim::InFlight(pending) => waiting.push((actionable, pending)),
                Claim::Owned(done) => owned.push((actionable, done)),
            }
        }

        let (applied, awaited) = futures::join!(
            join_all(
                owned
                    .into_iter()
                    .map(|(actionable, done)| async move {
                        (actionable.id(), self.apply_one(actionable, done).await)
                    })
            ),
            join_all(
                waiting
                    .into_iter()
                    .map(|(actionable, pending)| self.await_in_flight(actionable, pending))
            ),
        );
        results.extend(applied);
        results.extend(awaited);

        let succeeded = results.values().filter(|ok| **ok).count();
        info!(
            total = results.len(),
            succeeded,
            effector = self.effector.name(),
            "액션 디스패치 완료"
        );
        results
    }

    /// 적용 여부 확인과 진행 중 등록을 한 번의 락으로 처리
    fn claim(&self, id: Uuid) -> Claim {
        let mut state = self.state.lock();
        if state.applied.contains(&id) {
            return Claim::AlreadyApplied;
        }
        if let Some(pending) = state.in_flight.get(&id) {
            return Claim::InFlight(pending.clone());
        }
        let (done, pending) = oneshot::channel();
        state.in_flight.insert(id, pending.shared());
        Claim::Owned(done)
    }

    async fn await_in_flight(
        &self,
        actionable: &Actionable,
        pending: PendingOutcome,
    ) -> (Uuid, bool) {
        let id = actionable.id();
        debug!(id = %id, "동일 액션 적용 진행 중 — 결과 대기");
        // 담당 호출이 취소되면 Canceled → 실패로 본다
        let ok = pending.await.unwrap_or(false);
        let (status, details) = if ok {
            (AuditStatus::AlreadyApplied, None)
        } else {
            (
                AuditStatus::Failed,
                Some("concurrent attempt did not apply".to_string()),
            )
        };
        self.audit.lock().record(actionable, status, details, None);
        (id, ok)
    }

    async fn apply_one(&self, actionable: &Actionable, done: oneshot::Sender<bool>) -> bool {
        let id = actionable.id();
        let release = InFlightRelease {
            state: &self.state,
            id,
        };
        let start = Instant::now();
        let outcome = self.effector.apply(actionable).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let ok = match outcome {
            Ok(()) => {
                {
                    let mut state = self.state.lock();
                    state.applied.insert(id);
                    state.in_flight.remove(&id);
                }
                self.audit
                    .lock()
                    .record(actionable, AuditStatus::Applied, None, Some(elapsed_ms));
                true
            }
            Err(e) => {
                warn!(
                    id = %id,
                    action = %actionable.actionable_type(),
                    package = actionable.package_name(),
                    error = %e,
                    "액션 적용 실패"
                );
                self.audit.lock().record(
                    actionable,
                    AuditStatus::Failed,
                    Some(e.to_string()),
                    Some(elapsed_ms),
                );
                false
            }
        };

        // 진행 중 표시를 먼저 해제해야 실패 후 재시도가 새로 담당을 얻는다
        drop(release);
        let _ = done.send(ok);
        ok
    }

    /// 이미 적용에 성공한 id인지
    pub fn was_applied(&self, id: Uuid) -> bool {
        self.state.lock().applied.contains(&id)
    }

    /// 최근 감사 기록 (최신 순)
    pub fn recent_audit(&self, limit: usize) -> Vec<AuditEntry> {
        self.audit.lock().recent_entries(limit)
    }

    /// 감사 기록 전체 꺼내기
    pub fn drain_audit(&self) -> Vec<AuditEntry> {
        self.audit.lock().drain_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use powerlens_core::error::CoreError;
    use powerlens_core::models::actionable::ActionableType;

    /// 적용 호출을 기록하고 지정된 패키지에서 실패하는 실행기
    #[derive(Default)]
    struct RecordingEffector {
        applied: Mutex<Vec<Uuid>>,
        fail_package: Option<String>,
    }

    #[async_trait]
    impl ActionEffector for RecordingEffector {
        async fn apply(&self, actionable: &Actionable) -> Result<(), CoreError> {
            self.applied.lock().push(actionable.id());
            if self.fail_package.as_deref() == Some(actionable.package_name()) {
                return Err(CoreError::Internal("effector refused".into()));
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "recording"
        }
    }

    /// 적용마다 지연되고, 지정 횟수만큼 먼저 실패하는 실행기
    struct SlowEffector {
        calls: Mutex<usize>,
        failures: usize,
    }

    impl SlowEffector {
        fn new(failures: usize) -> Self {
            Self {
                calls: Mutex::new(0),
                failures,
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl ActionEffector for SlowEffector {
        async fn apply(&self, _actionable: &Actionable) -> Result<(), CoreError> {
            let call = {
                let mut calls = self.calls.lock();
                *calls += 1;
                *calls
            };
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            if call <= self.failures {
                return Err(CoreError::Internal("effector busy".into()));
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn dispatcher(effector: Arc<RecordingEffector>) -> ActionDispatcher {
        ActionDispatcher::new(effector, &AutomationConfig::default())
    }

    fn restrict(pkg: &str) -> Actionable {
        Actionable::new(
            ActionableType::RestrictBackgroundData,
            pkg,
            "Restrict background data",
        )
    }

    #[tokio::test]
    async fn partial_failure_is_isolated() {
        let effector = Arc::new(RecordingEffector {
            fail_package: Some("com.bad".into()),
            ..Default::default()
        });
        let d = dispatcher(effector.clone());
        let good = restrict("com.good");
        let bad = restrict("com.bad");
        let other = restrict("com.other");

        let results = d.execute(&[good.clone(), bad.clone(), other.clone()]).await;
        assert_eq!(results.len(), 3);
        assert!(results[&good.id()]);
        assert!(!results[&bad.id()]);
        assert!(results[&other.id()]);
        assert_eq!(effector.applied.lock().len(), 3);
    }

    #[tokio::test]
    async fn succeeded_id_is_not_reapplied() {
        let effector = Arc::new(RecordingEffector::default());
        let d = dispatcher(effector.clone());
        let a = restrict("com.a");

        let first = d.execute(&[a.clone(), a.clone()]).await;
        let second = d.execute(&[a.clone()]).await;
        assert!(first[&a.id()]);
        assert!(second[&a.id()]);
        assert_eq!(effector.applied.lock().len(), 1);
        assert!(d.was_applied(a.id()));
        assert_eq!(d.recent_audit(1)[0].status, AuditStatus::AlreadyApplied);
    }

    #[tokio::test]
    async fn concurrent_executions_apply_once() {
        let effector = Arc::new(SlowEffector::new(0));
        let d = ActionDispatcher::new(effector.clone(), &AutomationConfig::default());
        let a = restrict("com.a");

        let (b1, b2) = ([a.clone()], [a.clone()]);
        let (r1, r2) = tokio::join!(d.execute(&b1), d.execute(&b2));
        assert!(r1[&a.id()]);
        assert!(r2[&a.id()]);
        assert_eq!(effector.calls(), 1);
        assert!(d.was_applied(a.id()));

        let statuses: Vec<AuditStatus> = d.drain_audit().into_iter().map(|e| e.status).collect();
        assert!(statuses.contains(&AuditStatus::Applied));
        assert!(statuses.contains(&AuditStatus::AlreadyApplied));
    }

    #[tokio::test]
    async fn concurrent_failure_is_shared_then_retryable() {
        let effector = Arc::new(SlowEffector::new(1));
        let d = ActionDispatcher::new(effector.clone(), &AutomationConfig::default());
        let a = restrict("com.a");

        let (b1, b2) = ([a.clone()], [a.clone()]);
        let (r1, r2) = tokio::join!(d.execute(&b1), d.execute(&b2));
        assert!(!r1[&a.id()]);
        assert!(!r2[&a.id()]);
        assert_eq!(effector.calls(), 1);

        let retry = d.execute(&[a.clone()]).await;
        assert!(retry[&a.id()]);
        assert_eq!(effector.calls(), 2);
    }

    #[tokio::test]
    async fn failed_id_can_be_retried() {
        let effector = Arc::new(RecordingEffector {
            fail_package: Some("com.bad".into()),
            ..Default::default()
        });
        let d = dispatcher(effector.clone());
        let bad = restrict("com.bad");
        d.execute(&[bad.clone()]).await;
        d.execute(&[bad.clone()]).await;
        assert_eq!(effector.applied.lock().len(), 2);
        assert!(!d.was_applied(bad.id()));
    }

    #[tokio::test]
    async fn denied_and_disabled_never_reach_effector() {
        let effector = Arc::new(RecordingEffector::default());
        let d = dispatcher(effector.clone());
        let no_threshold = Actionable::new(ActionableType::SetAlert, "system", "Alert");
        let disabled = restrict("com.a").with_enabled(false);

        let results = d.execute(&[no_threshold.clone(), disabled.clone()]).await;
        assert!(!results[&no_threshold.id()]);
        assert!(!results[&disabled.id()]);
        assert!(effector.applied.lock().is_empty());

        let audit = d.drain_audit();
        assert_eq!(audit[0].status, AuditStatus::Denied);
        assert_eq!(audit[1].status, AuditStatus::Disabled);
    }

    #[tokio::test]
    async fn disabled_dispatcher_rejects_everything() {
        let effector = Arc::new(RecordingEffector::default());
        let config = AutomationConfig {
            enabled: false,
            ..Default::default()
        };
        let d = ActionDispatcher::new(effector.clone(), &config);
        let a = restrict("com.a");
        let results = d.execute(&[a.clone()]).await;
        assert!(!results[&a.id()]);
        assert!(effector.applied.lock().is_empty());
    }

    #[tokio::test]
    async fn narrowed_policy_denies_type() {
        let effector = Arc::new(RecordingEffector::default());
        let d = dispatcher(effector.clone())
            .with_policy(ActionPolicy::restricted_to([ActionableType::SetAlert]));
        let a = restrict("com.a");
        let results = d.execute(&[a.clone()]).await;
        assert!(!results[&a.id()]);
        assert!(effector.applied.lock().is_empty());
    }
}
