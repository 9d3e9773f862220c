// ==========================================
// ERP 数据迁移系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免"部分模块外键开启/部分不开启"
// - 统一 busy_timeout，减少校验器/导入器并发写入时的偶发 busy 错误
// - 集中迁移会话/校验台账的建表 DDL，测试与生产共用一份
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化迁移核心的表结构（幂等）
///
/// 表：
/// - migration_session: 迁移会话，主键 (tenant_id, id)
/// - migration_validation_result: 校验台账，一行对应源文件一行
/// - config_kv: 全局配置 key-value
///
/// 访问路径：
/// - (session_id, global_row_index): 分页读取的确定性排序
/// - (session_id, status): 按状态过滤/汇总
pub fn init_migration_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS migration_session (
            id                  TEXT NOT NULL,
            tenant_id           TEXT NOT NULL,
            source_type         TEXT NOT NULL,
            source_name         TEXT NOT NULL,
            status              TEXT NOT NULL,
            entities_json       TEXT NOT NULL,
            total_records       INTEGER NOT NULL DEFAULT 0,
            valid_records       INTEGER NOT NULL DEFAULT 0,
            warning_records     INTEGER NOT NULL DEFAULT 0,
            error_records       INTEGER NOT NULL DEFAULT 0,
            imported_records    INTEGER NOT NULL DEFAULT 0,
            skipped_records     INTEGER NOT NULL DEFAULT 0,
            error_message       TEXT,
            created_at          TEXT NOT NULL,
            validated_at        TEXT,
            import_started_at   TEXT,
            completed_at        TEXT,
            expires_at          TEXT,
            PRIMARY KEY (tenant_id, id)
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_migration_session_id
            ON migration_session (id);

        CREATE TABLE IF NOT EXISTS migration_validation_result (
            id                    TEXT NOT NULL PRIMARY KEY,
            session_id            TEXT NOT NULL,
            entity_type           TEXT NOT NULL,
            global_row_index      INTEGER NOT NULL,
            status                TEXT NOT NULL,
            original_data_json    TEXT NOT NULL,
            transformed_data_json TEXT,
            fixed_data_json       TEXT,
            errors_json           TEXT,
            warnings_json         TEXT,
            user_action           TEXT,
            imported_at           TEXT,
            created_at            TEXT NOT NULL,
            updated_at            TEXT NOT NULL,
            UNIQUE (session_id, global_row_index),
            FOREIGN KEY (session_id) REFERENCES migration_session (id)
                ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_validation_result_session_status
            ON migration_validation_result (session_id, status);

        CREATE INDEX IF NOT EXISTS idx_validation_result_session_entity
            ON migration_validation_result (session_id, entity_type);

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key      TEXT NOT NULL,
            value    TEXT NOT NULL,
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )?;
    Ok(())
}
