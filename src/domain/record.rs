// ==========================================
// ERP 数据迁移系统 - 校验台账领域模型
// ==========================================
// 红线: original_data_json 入库后不可变；修复写 fixed_data_json
// 红线: imported_at 只盖一次章，由外部导入器回调写入
// ==========================================

use crate::domain::types::{EntityType, RecordStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// user_action 的排除字面量
///
/// 该值使记录无条件失去导入资格（与状态无关）
pub const USER_ACTION_SKIP: &str = "skip";

// ==========================================
// ValidationRecord - 校验台账行
// ==========================================
// 源文件一行对应台账一行，归属一个会话（多对一）
// global_row_index 为全文件稳定序号，分页排序依据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRecord {
    // ===== 主键与归属 =====
    pub id: String,             // 记录 ID（UUID）
    pub session_id: String,     // 所属会话
    pub entity_type: EntityType, // 实体类型
    pub global_row_index: i64,  // 全文件行序号（从 0 单调递增）

    // ===== 状态 =====
    pub status: RecordStatus,

    // ===== 数据载荷（列名→值 的 JSON 对象，内容对本核心不透明）=====
    pub original_data_json: String,          // 摄取原始数据（不可变）
    pub transformed_data_json: Option<String>, // 列映射应用后数据
    pub fixed_data_json: Option<String>,     // 操作员修复后数据

    // ===== 规则引擎写回（结构化，对本核心不透明）=====
    pub errors_json: Option<String>,
    pub warnings_json: Option<String>,

    // ===== 操作员动作 =====
    pub user_action: Option<String>, // 自由标签；字面量 "skip" 有排除语义

    // ===== 导入盖章 =====
    pub imported_at: Option<DateTime<Utc>>, // 目标库落库时间（只写一次）

    // ===== 审计字段 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ValidationRecord {
    /// 创建待校验行（摄取器入口）
    pub fn new_pending(
        id: String,
        session_id: String,
        entity_type: EntityType,
        global_row_index: i64,
        original_data_json: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            session_id,
            entity_type,
            global_row_index,
            status: RecordStatus::Pending,
            original_data_json,
            transformed_data_json: None,
            fixed_data_json: None,
            errors_json: None,
            warnings_json: None,
            user_action: None,
            imported_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 是否被操作员排除（user_action == "skip"）
    pub fn is_user_skipped(&self) -> bool {
        self.user_action.as_deref() == Some(USER_ACTION_SKIP)
    }

    /// 导入资格判定
    ///
    /// 状态 ∈ {Valid, Warning, Fixed} 且未被操作员排除
    pub fn is_import_eligible(&self) -> bool {
        self.status.is_import_eligible() && !self.is_user_skipped()
    }

    /// 取导入用数据：修复数据优先于原始数据
    pub fn effective_data_json(&self) -> &str {
        match self.fixed_data_json.as_deref() {
            Some(fixed) if !fixed.is_empty() => fixed,
            _ => &self.original_data_json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record(status: RecordStatus, user_action: Option<&str>) -> ValidationRecord {
        let mut r = ValidationRecord::new_pending(
            "r1".to_string(),
            "s1".to_string(),
            EntityType::Product,
            0,
            r#"{"STOK_KODU":"P001"}"#.to_string(),
            Utc::now(),
        );
        r.status = status;
        r.user_action = user_action.map(|s| s.to_string());
        r
    }

    #[test]
    fn test_import_eligibility_by_status() {
        assert!(make_record(RecordStatus::Valid, None).is_import_eligible());
        assert!(make_record(RecordStatus::Warning, None).is_import_eligible());
        assert!(make_record(RecordStatus::Fixed, None).is_import_eligible());
        assert!(!make_record(RecordStatus::Pending, None).is_import_eligible());
        assert!(!make_record(RecordStatus::Error, None).is_import_eligible());
        assert!(!make_record(RecordStatus::Skipped, None).is_import_eligible());
    }

    #[test]
    fn test_valid_but_skipped_is_excluded() {
        // 状态合格但 user_action="skip" 仍然无导入资格
        let r = make_record(RecordStatus::Valid, Some(USER_ACTION_SKIP));
        assert!(!r.is_import_eligible());

        // 其他动作标签不影响资格
        let r = make_record(RecordStatus::Valid, Some("reviewed"));
        assert!(r.is_import_eligible());
    }

    #[test]
    fn test_effective_data_prefers_fixed() {
        let mut r = make_record(RecordStatus::Fixed, None);
        assert_eq!(r.effective_data_json(), r#"{"STOK_KODU":"P001"}"#);

        r.fixed_data_json = Some(r#"{"STOK_KODU":"P001-FIX"}"#.to_string());
        assert_eq!(r.effective_data_json(), r#"{"STOK_KODU":"P001-FIX"}"#);

        // 空字符串视为无修复数据
        r.fixed_data_json = Some(String::new());
        assert_eq!(r.effective_data_json(), r#"{"STOK_KODU":"P001"}"#);
    }
}
