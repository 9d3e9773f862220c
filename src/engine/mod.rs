// ==========================================
// ERP 数据迁移系统 - 引擎层
// ==========================================
// 职责: 纯计算业务规则（映射建议、进度估算）
// 红线: 引擎无共享可变状态，可跨会话/实体并行调用
// ==========================================

pub mod alias_dictionary;
pub mod catalog;
pub mod mapper;
pub mod progress;

// 重导出核心类型
pub use alias_dictionary::AliasDictionary;
pub use catalog::{BuiltinCatalog, TargetFieldCatalog};
pub use mapper::MappingEngine;
pub use progress::{ImportProgress, ProgressEstimator};
