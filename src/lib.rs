// ==========================================
// ERP 数据迁移系统 - 核心库
// ==========================================
// 系统定位: 多租户目录导入的迁移会话管线
// 范围: 会话状态机 + 校验台账 + 映射建议引擎 + 进度估算
// 协作方: 文件解析/规则引擎/目标库写入均在库外
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表 DDL）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{EntityType, RecordStatus, SessionStatus, SourceType};

// 领域实体
pub use domain::{
    AutoMappingResult, FieldMapping, InvalidTransition, MigrationSession, SourceColumn,
    TargetField, ValidationRecord, USER_ACTION_SKIP,
};

// 引擎
pub use engine::{
    AliasDictionary, BuiltinCatalog, ImportProgress, MappingEngine, ProgressEstimator,
    TargetFieldCatalog,
};

// 仓储
pub use repository::{
    LedgerSummary, SessionRepository, ValidationLedgerRepository, ValidationLedgerRepositoryImpl,
    ValidationPage,
};

// API
pub use api::{ApiError, ApiResult, MigrationApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "ERP 数据迁移系统";
