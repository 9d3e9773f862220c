// ==========================================
// ERP 数据迁移系统 - 校验台账 Repository Trait
// ==========================================
// 职责: 定义台账数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 红线: 状态写入必须单语句落库（at-most-once），不得部分写 JSON 载荷
// ==========================================

use crate::domain::types::{EntityType, RecordStatus};
use crate::domain::ValidationRecord;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 整会话六维状态汇总（与分页/过滤无关，永远全会话口径）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub valid: i64,
    pub warning: i64,
    pub error: i64,
    pub fixed: i64,
    pub skipped: i64,
    pub pending: i64,
}

impl LedgerSummary {
    /// 六维之和 == 台账总行数（核心不变量）
    pub fn total(&self) -> i64 {
        self.valid + self.warning + self.error + self.fixed + self.skipped + self.pending
    }
}

/// 台账分页查询结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationPage {
    /// 本页记录（按 global_row_index 升序）
    pub records: Vec<ValidationRecord>,
    /// 当前过滤条件下的总记录数
    pub total_count: i64,
    /// 页号（1 起）
    pub page_number: u32,
    /// 每页记录数
    pub page_size: u32,
    /// 整会话状态汇总（不受过滤/分页影响）
    pub summary: LedgerSummary,
}

// ==========================================
// ValidationLedgerRepository Trait
// ==========================================
// 用途: 校验台账数据访问（每记录状态的唯一事实来源）
// 实现者: ValidationLedgerRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait ValidationLedgerRepository: Send + Sync {
    // ===== 摄取写入 =====

    /// 批量插入待校验行（摄取器入口）
    ///
    /// global_row_index 在会话内从 0 单调递增（跨实体类型连续编号）
    ///
    /// # 参数
    /// - session_id: 所属会话
    /// - entity_type: 实体类型
    /// - rows: 已解析的 列名→值 行数据
    ///
    /// # 返回
    /// - Ok(usize): 插入的行数
    async fn insert_pending_rows(
        &self,
        session_id: &str,
        entity_type: EntityType,
        rows: Vec<serde_json::Map<String, serde_json::Value>>,
    ) -> RepositoryResult<usize>;

    // ===== 状态写回 =====

    /// 写回校验/修复结果（规则引擎或操作员）
    ///
    /// 单条 UPDATE 落库；仅传入 Some 的载荷列才被覆盖。
    /// 不拒绝"回退"状态写入，但调用方必须随后刷新会话计数器。
    async fn upsert_status(
        &self,
        record_id: &str,
        status: RecordStatus,
        errors_json: Option<String>,
        warnings_json: Option<String>,
        fixed_data_json: Option<String>,
        user_action: Option<String>,
        now: DateTime<Utc>,
    ) -> RepositoryResult<()>;

    /// 写入列映射应用后的数据
    async fn set_transformed_data(
        &self,
        record_id: &str,
        transformed_data_json: String,
        now: DateTime<Utc>,
    ) -> RepositoryResult<()>;

    /// 导入盖章（compare-and-set）
    ///
    /// 守卫条件编码了导入资格不变量：
    /// imported_at IS NULL 且 status ∈ {VALID, WARNING, FIXED} 且 user_action != "skip"
    ///
    /// # 返回
    /// - Ok(true): 本次盖章生效
    /// - Ok(false): 守卫未通过（重复盖章/无资格行），不产生写入
    /// - Err(NotFound): 记录不存在
    async fn stamp_imported(
        &self,
        record_id: &str,
        at: DateTime<Utc>,
    ) -> RepositoryResult<bool>;

    // ===== 查询 =====

    /// 按记录 ID 查询
    async fn find_by_id(&self, record_id: &str) -> RepositoryResult<Option<ValidationRecord>>;

    /// 查询会话内某实体类型的首条记录（映射建议的样本行）
    async fn first_record_for_entity(
        &self,
        session_id: &str,
        entity_type: EntityType,
    ) -> RepositoryResult<Option<ValidationRecord>>;

    /// 台账分页读取
    ///
    /// # 参数
    /// - page_number: 页号（1 起）
    /// - page_size: 每页记录数（> 0）
    /// - status_filter / entity_filter: 可选过滤条件
    ///
    /// # 返回
    /// - Ok(ValidationPage): 记录按 global_row_index 升序 + 过滤口径总数 + 全会话汇总
    /// - Err(NotFound): 会话不存在
    async fn list_page(
        &self,
        session_id: &str,
        page_number: u32,
        page_size: u32,
        status_filter: Option<RecordStatus>,
        entity_filter: Option<EntityType>,
    ) -> RepositoryResult<ValidationPage>;

    /// 整会话六维状态汇总
    async fn summary(&self, session_id: &str) -> RepositoryResult<LedgerSummary>;

    // ===== 聚合计数（状态机守卫与进度估算用）=====

    /// 待校验行数（Validating → Validated 守卫）
    async fn count_pending(&self, session_id: &str) -> RepositoryResult<i64>;

    /// 可导行数：status ∈ {VALID, WARNING, FIXED} 且未被操作员排除
    async fn importable_count(&self, session_id: &str) -> RepositoryResult<i64>;

    /// 已盖章行数（imported_at 非空）
    async fn imported_count(&self, session_id: &str) -> RepositoryResult<i64>;

    /// 剩余未盖章的可导行数（Importing → Completed 守卫）
    async fn remaining_eligible_count(&self, session_id: &str) -> RepositoryResult<i64>;
}
