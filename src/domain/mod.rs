// ==========================================
// ERP 数据迁移系统 - 领域层
// ==========================================
// 职责: 实体与类型定义,不含数据访问与编排逻辑
// ==========================================

pub mod mapping;
pub mod record;
pub mod session;
pub mod types;

// 重导出核心类型
pub use mapping::{AutoMappingResult, FieldMapping, SourceColumn, TargetField};
pub use record::{ValidationRecord, USER_ACTION_SKIP};
pub use session::{InvalidTransition, MigrationSession};
pub use types::{EntityType, RecordStatus, SessionStatus, SourceType};
