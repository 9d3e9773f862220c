// ==========================================
// ERP 数据迁移系统 - 迁移会话仓储
// ==========================================
// 红线: Repository 不含业务逻辑，只做数据访问
// 红线: 计数器不做独立自增，唯一写入方是 refresh_counters 的台账重算
// ==========================================

use crate::domain::types::{EntityType, SessionStatus, SourceType};
use crate::domain::MigrationSession;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

/// 台账重算得到的会话计数器快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounters {
    pub total: i64,
    pub valid: i64,
    pub warning: i64,
    pub error: i64,
    pub imported: i64,
    pub skipped: i64,
}

// ==========================================
// SessionRepository - 迁移会话仓储
// ==========================================
pub struct SessionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SessionRepository {
    /// 创建新的 SessionRepository 实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入新会话
    pub fn insert(&self, session: &MigrationSession) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let entities_json = serde_json::to_string(
            &session
                .entities
                .iter()
                .map(|e| e.to_db_str())
                .collect::<Vec<_>>(),
        )
        .map_err(|e| RepositoryError::InternalError(format!("实体列表序列化失败: {}", e)))?;

        conn.execute(
            r#"
            INSERT INTO migration_session (
                id, tenant_id, source_type, source_name, status, entities_json,
                total_records, valid_records, warning_records, error_records,
                imported_records, skipped_records, error_message,
                created_at, validated_at, import_started_at, completed_at, expires_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)
            "#,
            params![
                session.id,
                session.tenant_id,
                session.source_type.to_db_str(),
                session.source_name,
                session.status.to_db_str(),
                entities_json,
                session.total_records,
                session.valid_records,
                session.warning_records,
                session.error_records,
                session.imported_records,
                session.skipped_records,
                session.error_message,
                session.created_at.to_rfc3339(),
                session.validated_at.map(|t| t.to_rfc3339()),
                session.import_started_at.map(|t| t.to_rfc3339()),
                session.completed_at.map(|t| t.to_rfc3339()),
                session.expires_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// 按 (tenant_id, id) 查询会话
    pub fn find_by_id(
        &self,
        tenant_id: &str,
        session_id: &str,
    ) -> RepositoryResult<Option<MigrationSession>> {
        let conn = self.get_conn()?;
        let result = conn
            .query_row(
                &format!(
                    "SELECT {} FROM migration_session WHERE tenant_id = ?1 AND id = ?2",
                    SELECT_COLUMNS
                ),
                params![tenant_id, session_id],
                map_session_row,
            )
            .optional()?;
        Ok(result)
    }

    /// 按会话 ID 查询（导入器回调路径，无租户上下文）
    pub fn find_by_session_id(&self, session_id: &str) -> RepositoryResult<Option<MigrationSession>> {
        let conn = self.get_conn()?;
        let result = conn
            .query_row(
                &format!(
                    "SELECT {} FROM migration_session WHERE id = ?1",
                    SELECT_COLUMNS
                ),
                params![session_id],
                map_session_row,
            )
            .optional()?;
        Ok(result)
    }

    /// 持久化会话全量字段（状态/时间戳/错误信息/计数器）
    pub fn update(&self, session: &MigrationSession) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let updated = conn.execute(
            r#"
            UPDATE migration_session SET
                status = ?1,
                total_records = ?2,
                valid_records = ?3,
                warning_records = ?4,
                error_records = ?5,
                imported_records = ?6,
                skipped_records = ?7,
                error_message = ?8,
                validated_at = ?9,
                import_started_at = ?10,
                completed_at = ?11,
                expires_at = ?12
            WHERE id = ?13
            "#,
            params![
                session.status.to_db_str(),
                session.total_records,
                session.valid_records,
                session.warning_records,
                session.error_records,
                session.imported_records,
                session.skipped_records,
                session.error_message,
                session.validated_at.map(|t| t.to_rfc3339()),
                session.import_started_at.map(|t| t.to_rfc3339()),
                session.completed_at.map(|t| t.to_rfc3339()),
                session.expires_at.map(|t| t.to_rfc3339()),
                session.id,
            ],
        )?;

        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "MigrationSession".to_string(),
                id: session.id.clone(),
            });
        }
        Ok(())
    }

    /// 从台账重算会话计数器并写回（单事务）
    ///
    /// 计数器是派生值：校验器与导入器可能并发更新同会话的不同记录，
    /// 因此从不做增量维护，每次都整表扫描重算。
    pub fn refresh_counters(&self, session_id: &str) -> RepositoryResult<SessionCounters> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let counters = tx.query_row(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'VALID' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'WARNING' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'ERROR' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN imported_at IS NOT NULL THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'SKIPPED' THEN 1 ELSE 0 END), 0)
            FROM migration_validation_result
            WHERE session_id = ?1
            "#,
            params![session_id],
            |row| {
                Ok(SessionCounters {
                    total: row.get(0)?,
                    valid: row.get(1)?,
                    warning: row.get(2)?,
                    error: row.get(3)?,
                    imported: row.get(4)?,
                    skipped: row.get(5)?,
                })
            },
        )?;

        let updated = tx.execute(
            r#"
            UPDATE migration_session SET
                total_records = ?1,
                valid_records = ?2,
                warning_records = ?3,
                error_records = ?4,
                imported_records = ?5,
                skipped_records = ?6
            WHERE id = ?7
            "#,
            params![
                counters.total,
                counters.valid,
                counters.warning,
                counters.error,
                counters.imported,
                counters.skipped,
                session_id,
            ],
        )?;

        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "MigrationSession".to_string(),
                id: session_id.to_string(),
            });
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(counters)
    }

    /// 清理已到期会话（台账行随外键级联删除）
    ///
    /// # 返回
    /// - Ok(usize): 删除的会话数
    pub fn purge_expired(&self, now: DateTime<Utc>) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let deleted = conn.execute(
            "DELETE FROM migration_session WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            params![now.to_rfc3339()],
        )?;
        Ok(deleted)
    }
}

// 查询列顺序（与 map_session_row 对齐）
const SELECT_COLUMNS: &str = "id, tenant_id, source_type, source_name, status, entities_json, \
     total_records, valid_records, warning_records, error_records, \
     imported_records, skipped_records, error_message, \
     created_at, validated_at, import_started_at, completed_at, expires_at";

fn map_session_row(row: &Row<'_>) -> rusqlite::Result<MigrationSession> {
    let source_type: String = row.get(2)?;
    let status_raw: String = row.get(4)?;
    let entities_json: String = row.get(5)?;

    let status = SessionStatus::from_db_str(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("未知会话状态: {}", status_raw).into(),
        )
    })?;

    let entity_tokens: Vec<String> = serde_json::from_str(&entities_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("实体列表解析失败: {}", e).into(),
        )
    })?;
    let entities = entity_tokens
        .iter()
        .filter_map(|t| EntityType::from_db_str(t))
        .collect();

    Ok(MigrationSession {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        source_type: SourceType::from_db_str(&source_type),
        source_name: row.get(3)?,
        status,
        entities,
        total_records: row.get(6)?,
        valid_records: row.get(7)?,
        warning_records: row.get(8)?,
        error_records: row.get(9)?,
        imported_records: row.get(10)?,
        skipped_records: row.get(11)?,
        error_message: row.get(12)?,
        created_at: parse_required_ts(row, 13)?,
        validated_at: parse_optional_ts(row, 14)?,
        import_started_at: parse_optional_ts(row, 15)?,
        completed_at: parse_optional_ts(row, 16)?,
        expires_at: parse_optional_ts(row, 17)?,
    })
}

fn parse_required_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_rfc3339(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("时间戳解析失败: {}", raw).into(),
        )
    })
}

fn parse_optional_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        None => Ok(None),
        Some(raw) => parse_rfc3339(&raw).map(Some).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                format!("时间戳解析失败: {}", raw).into(),
            )
        }),
    }
}

pub(crate) fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
