//! # powerlens-automation
//!
//! 액션 디스패치 크레이트.
//! 정규화된 `Actionable`을 정책 검증 후 `ActionEffector` 포트로 전달하고,
//! 모든 시도를 감사 로그에 기록한다. 실제 OS 조작은 외부 실행기 몫이다.

pub mod audit;
pub mod dispatcher;
pub mod policy;

pub use audit::{AuditEntry, AuditLogger, AuditStatus};
pub use dispatcher::ActionDispatcher;
pub use policy::ActionPolicy;
