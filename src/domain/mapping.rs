// ==========================================
// ERP 数据迁移系统 - 字段映射领域模型
// ==========================================
// 职责: 映射建议引擎的输入/输出结构（按需计算，不落库）
// ==========================================

use crate::domain::types::EntityType;
use serde::{Deserialize, Serialize};

/// 源列（来自样本记录的列名 + 样本值）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceColumn {
    pub name: String,
    pub sample_value: Option<String>,
}

/// 目标字段（目标 schema 字段目录条目）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetField {
    pub name: String,             // 字段名（映射比较用）
    pub display_name: String,     // 操作员界面展示名
    pub data_type: String,        // string/decimal/int/bool/date/datetime
    pub is_required: bool,        // 必填字段参与覆盖率计算
    pub max_length: Option<u32>,  // 字符串最大长度（规则引擎用）
    pub default_value: Option<String>,
}

impl TargetField {
    /// 构造字段目录条目（display_name/类型齐全的走 builder 风格 set）
    pub fn new(name: &str, display_name: &str, data_type: &str, is_required: bool) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            data_type: data_type.to_string(),
            is_required,
            max_length: None,
            default_value: None,
        }
    }

    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

/// 单字段映射建议
///
/// source_field 为 None 表示没有任何源列命中该目标字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub source_field: Option<String>,
    pub target_field: String,
    pub confidence: f64, // 0.0-1.0；未命中为 0，不计入均值
}

/// 整实体自动映射结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoMappingResult {
    pub entity_type: EntityType,
    pub source_columns: Vec<SourceColumn>,
    pub target_fields: Vec<TargetField>,
    pub suggested_mappings: Vec<FieldMapping>,
    pub confidence_score: f64, // 0.6×必填覆盖率 + 0.4×已映射字段均值
}
