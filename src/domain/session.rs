// ==========================================
// ERP 数据迁移系统 - 迁移会话领域模型
// ==========================================
// 红线: 状态转换只走显式转换表，副作用仅限计数器/时间戳
// 红线: 计数器为派生值，唯一写入方是台账重算（repository 层）
// ==========================================

use crate::domain::types::{EntityType, SessionStatus, SourceType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 非法状态转换错误
///
/// 转换表见 [`SessionStatus::can_transition_to`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("无效的状态转换: from={from} to={to}")]
pub struct InvalidTransition {
    pub from: SessionStatus,
    pub to: SessionStatus,
}

// ==========================================
// MigrationSession - 迁移会话
// ==========================================
// 一次端到端导入尝试（一个租户，一种或多种实体）
// 业务数据不在会话上，会话只持有计数器与时间戳
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationSession {
    // ===== 主键 =====
    pub id: String,        // 会话 ID（UUID）
    pub tenant_id: String, // 所属租户

    // ===== 来源信息 =====
    pub source_type: SourceType, // 源系统/格式族
    pub source_name: String,     // 展示名（如源文件名）

    // ===== 状态机 =====
    pub status: SessionStatus,

    // ===== 会话包含的实体类型 =====
    pub entities: Vec<EntityType>,

    // ===== 聚合计数器（台账派生，重算写回）=====
    pub total_records: i64,    // 台账总行数
    pub valid_records: i64,    // 当前 VALID 行数
    pub warning_records: i64,  // 当前 WARNING 行数
    pub error_records: i64,    // 当前 ERROR 行数
    pub imported_records: i64, // imported_at 已盖章行数
    pub skipped_records: i64,  // 当前 SKIPPED 行数

    // ===== 失败信息（仅 Failed 状态）=====
    pub error_message: Option<String>,

    // ===== 时间戳 =====
    pub created_at: DateTime<Utc>,                // 创建时间（必填）
    pub validated_at: Option<DateTime<Utc>>,      // 进入 Validated 时间
    pub import_started_at: Option<DateTime<Utc>>, // 首次进入 Importing 时间
    pub completed_at: Option<DateTime<Utc>>,      // 进入 Completed 时间
    pub expires_at: Option<DateTime<Utc>>,        // 过期清理时间（可选）
}

impl MigrationSession {
    /// 创建新会话（状态 Created，计数器清零）
    pub fn new(
        id: String,
        tenant_id: String,
        source_type: SourceType,
        source_name: String,
        entities: Vec<EntityType>,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            tenant_id,
            source_type,
            source_name,
            status: SessionStatus::Created,
            entities,
            total_records: 0,
            valid_records: 0,
            warning_records: 0,
            error_records: 0,
            imported_records: 0,
            skipped_records: 0,
            error_message: None,
            created_at,
            validated_at: None,
            import_started_at: None,
            completed_at: None,
            expires_at,
        }
    }

    /// 按转换表推进状态（私有，具名方法负责时间戳副作用）
    fn apply(&mut self, to: SessionStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(to) {
            return Err(InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    /// Created → Uploaded：台账行已就位
    pub fn mark_uploaded(&mut self) -> Result<(), InvalidTransition> {
        self.apply(SessionStatus::Uploaded)
    }

    /// Uploaded → Validating：规则引擎开始写回
    pub fn begin_validation(&mut self) -> Result<(), InvalidTransition> {
        self.apply(SessionStatus::Validating)
    }

    /// Validating → Validated：无 Pending 行，盖 validated_at
    pub fn complete_validation(&mut self, now: DateTime<Utc>) -> Result<(), InvalidTransition> {
        self.apply(SessionStatus::Validated)?;
        self.validated_at = Some(now);
        Ok(())
    }

    /// Validated/Failed → Importing
    ///
    /// - import_started_at 只在首次进入时盖章（重试保留首次时间，ETA 口径一致）
    /// - 重试时清除上一次的 error_message
    pub fn begin_import(&mut self, now: DateTime<Utc>) -> Result<(), InvalidTransition> {
        self.apply(SessionStatus::Importing)?;
        if self.import_started_at.is_none() {
            self.import_started_at = Some(now);
        }
        self.error_message = None;
        Ok(())
    }

    /// Importing → Completed：全部可导行已盖章，盖 completed_at
    pub fn complete_import(&mut self, now: DateTime<Utc>) -> Result<(), InvalidTransition> {
        self.apply(SessionStatus::Completed)?;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Importing → Failed：记录不可恢复错误
    ///
    /// 已盖章的行不回滚（逐行幂等续导，非整会话事务）
    pub fn fail(&mut self, message: String) -> Result<(), InvalidTransition> {
        self.apply(SessionStatus::Failed)?;
        self.error_message = Some(message);
        Ok(())
    }

    /// 会话数据是否已到期（可被保留策略清理）
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|t| t <= now).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_session() -> MigrationSession {
        MigrationSession::new(
            "s1".to_string(),
            "t1".to_string(),
            SourceType::Netsis,
            "cari_listesi.xlsx".to_string(),
            vec![EntityType::Customer],
            Utc.with_ymd_and_hms(2026, 1, 15, 9, 0, 0).unwrap(),
            None,
        )
    }

    #[test]
    fn test_full_lifecycle() {
        let mut s = make_session();
        let t = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();

        assert_eq!(s.status, SessionStatus::Created);
        s.mark_uploaded().unwrap();
        s.begin_validation().unwrap();
        s.complete_validation(t).unwrap();
        assert_eq!(s.validated_at, Some(t));

        s.begin_import(t).unwrap();
        assert_eq!(s.import_started_at, Some(t));

        let t2 = Utc.with_ymd_and_hms(2026, 1, 15, 10, 30, 0).unwrap();
        s.complete_import(t2).unwrap();
        assert_eq!(s.status, SessionStatus::Completed);
        assert_eq!(s.completed_at, Some(t2));
    }

    #[test]
    fn test_illegal_transition_rejected() {
        let mut s = make_session();
        let t = Utc::now();

        // Created 不能直接开始导入
        let err = s.begin_import(t).unwrap_err();
        assert_eq!(err.from, SessionStatus::Created);
        assert_eq!(err.to, SessionStatus::Importing);

        // 失败不改变状态
        assert_eq!(s.status, SessionStatus::Created);
        assert!(s.import_started_at.is_none());
    }

    #[test]
    fn test_fail_then_retry_keeps_first_start_time() {
        let mut s = make_session();
        let t1 = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 1, 15, 11, 0, 0).unwrap();

        s.mark_uploaded().unwrap();
        s.begin_validation().unwrap();
        s.complete_validation(t1).unwrap();
        s.begin_import(t1).unwrap();
        s.fail("目标库写入失败".to_string()).unwrap();
        assert_eq!(s.status, SessionStatus::Failed);
        assert!(s.error_message.is_some());

        // Failed → Importing 重试：首次开始时间保留，错误信息清除
        s.begin_import(t2).unwrap();
        assert_eq!(s.import_started_at, Some(t1));
        assert!(s.error_message.is_none());
    }

    #[test]
    fn test_expiry() {
        let mut s = make_session();
        let now = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        assert!(!s.is_expired(now));

        s.expires_at = Some(Utc.with_ymd_and_hms(2026, 1, 31, 0, 0, 0).unwrap());
        assert!(s.is_expired(now));
    }
}
