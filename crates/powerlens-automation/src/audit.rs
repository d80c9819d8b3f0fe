//! 감사 로깅.
//!
//! 디스패치된 모든 액션의 처리 결과를 제한된 크기의 메모리 버퍼에 기록한다.
//! 버퍼가 차면 가장 오래된 항목부터 버린다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

use powerlens_core::models::actionable::Actionable;

/// 기본 버퍼 크기
pub const DEFAULT_AUDIT_BUFFER_SIZE: usize = 1000;

/// 감사 로그 상태
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// 실행기 적용 성공
    Applied,
    /// 이미 적용된 id — 재적용 생략
    AlreadyApplied,
    /// 실행기 적용 실패
    Failed,
    /// 정책 거부
    Denied,
    /// 비활성 액션 또는 디스패처 비활성
    Disabled,
}

/// 감사 로그 항목
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// 시각
    pub timestamp: DateTime<Utc>,
    /// 액션 id
    pub actionable_id: Uuid,
    /// 액션 종류 (와이어 이름)
    pub action_type: String,
    /// 대상 패키지
    pub package_name: String,
    /// 상태
    pub status: AuditStatus,
    /// 상세 정보 (거부/실패 사유)
    pub details: Option<String>,
    /// 실행 시간 (밀리초)
    pub execution_time_ms: Option<u64>,
}

/// 감사 로거 — 제한된 로컬 버퍼
pub struct AuditLogger {
    buffer: VecDeque<AuditEntry>,
    max_buffer_size: usize,
}

impl AuditLogger {
    pub fn new(max_buffer_size: usize) -> Self {
        let max_buffer_size = max_buffer_size.max(1);
        Self {
            buffer: VecDeque::with_capacity(max_buffer_size.min(DEFAULT_AUDIT_BUFFER_SIZE)),
            max_buffer_size,
        }
    }

    /// 처리 결과 기록
    pub fn record(
        &mut self,
        actionable: &Actionable,
        status: AuditStatus,
        details: Option<String>,
        execution_time_ms: Option<u64>,
    ) {
        if self.buffer.len() >= self.max_buffer_size {
            self.buffer.pop_front();
            tracing::warn!("감사 로그 버퍼 오버플로 — 가장 오래된 항목 삭제");
        }

        self.buffer.push_back(AuditEntry {
            timestamp: Utc::now(),
            actionable_id: actionable.id(),
            action_type: actionable.actionable_type().as_str().to_string(),
            package_name: actionable.package_name().to_string(),
            status,
            details,
            execution_time_ms,
        });
    }

    pub fn pending_count(&self) -> usize {
        self.buffer.len()
    }

    /// 모든 항목 꺼내기
    pub fn drain_all(&mut self) -> Vec<AuditEntry> {
        self.buffer.drain(..).collect()
    }

    /// 최근 N개 항목 조회 (비파괴, 최신 순)
    pub fn recent_entries(&self, limit: usize) -> Vec<AuditEntry> {
        self.buffer.iter().rev().take(limit).cloned().collect()
    }

    /// 특정 액션의 기록 (오래된 순)
    pub fn entries_for(&self, actionable_id: Uuid) -> Vec<AuditEntry> {
        self.buffer
            .iter()
            .filter(|e| e.actionable_id == actionable_id)
            .cloned()
            .collect()
    }

    /// 상태별 건수
    pub fn count_by_status(&self, status: AuditStatus) -> usize {
        self.buffer.iter().filter(|e| e.status == status).count()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_BUFFER_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use powerlens_core::models::actionable::ActionableType;

    fn kill(pkg: &str) -> Actionable {
        Actionable::new(ActionableType::KillApp, pkg, "Stop app")
    }

    #[test]
    fn record_and_drain() {
        let mut logger = AuditLogger::new(100);
        let a = kill("com.a");
        logger.record(&a, AuditStatus::Applied, None, Some(12));
        logger.record(&a, AuditStatus::AlreadyApplied, None, None);

        assert_eq!(logger.pending_count(), 2);
        let entries = logger.drain_all();
        assert_eq!(entries[0].status, AuditStatus::Applied);
        assert_eq!(entries[0].action_type, "kill_app");
        assert_eq!(entries[0].execution_time_ms, Some(12));
        assert_eq!(entries[1].actionable_id, a.id());
        assert_eq!(logger.pending_count(), 0);
    }

    #[test]
    fn buffer_overflow_evicts_oldest() {
        let mut logger = AuditLogger::new(2);
        logger.record(&kill("com.1"), AuditStatus::Applied, None, None);
        logger.record(&kill("com.2"), AuditStatus::Applied, None, None);
        logger.record(&kill("com.3"), AuditStatus::Failed, Some("boom".into()), None);

        let entries = logger.drain_all();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].package_name, "com.2");
    }

    #[test]
    fn recent_entries_are_newest_first() {
        let mut logger = AuditLogger::default();
        logger.record(&kill("com.1"), AuditStatus::Denied, None, None);
        logger.record(&kill("com.2"), AuditStatus::Disabled, None, None);

        let recent = logger.recent_entries(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].package_name, "com.2");
        assert_eq!(logger.count_by_status(AuditStatus::Denied), 1);
    }

    #[test]
    fn entry_serde_uses_snake_case_status() {
        let mut logger = AuditLogger::default();
        logger.record(&kill("com.1"), AuditStatus::AlreadyApplied, None, None);
        let json = serde_json::to_string(&logger.recent_entries(1)[0]).unwrap();
        assert!(json.contains("\"already_applied\""));
    }
}
