// ==========================================
// ERP 数据迁移系统 - 校验台账 Repository 实现
// ==========================================
// 职责: 实现台账数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 红线: 状态写入单语句落库；导入盖章走守卫 UPDATE（compare-and-set）
// ==========================================

use crate::domain::types::{EntityType, RecordStatus};
use crate::domain::{ValidationRecord, USER_ACTION_SKIP};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::ledger_repo::{LedgerSummary, ValidationLedgerRepository, ValidationPage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// 查询列顺序（与 map_record_row 对齐）
const RECORD_COLUMNS: &str = "id, session_id, entity_type, global_row_index, status, \
     original_data_json, transformed_data_json, fixed_data_json, \
     errors_json, warnings_json, user_action, imported_at, created_at, updated_at";

// ==========================================
// ValidationLedgerRepositoryImpl
// ==========================================
pub struct ValidationLedgerRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ValidationLedgerRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
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

    /// 会话存在性检查（台账查询的 NotFound 口径）
    fn ensure_session_exists(conn: &Connection, session_id: &str) -> RepositoryResult<()> {
        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM migration_session WHERE id = ?1 LIMIT 1",
                params![session_id],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);

        if !exists {
            return Err(RepositoryError::NotFound {
                entity: "MigrationSession".to_string(),
                id: session_id.to_string(),
            });
        }
        Ok(())
    }

    /// 记录存在性检查（盖章守卫未命中时区分 NotFound 与 CAS 失败）
    fn record_exists(conn: &Connection, record_id: &str) -> RepositoryResult<bool> {
        let exists: bool = conn
            .query_row(
                "SELECT 1 FROM migration_validation_result WHERE id = ?1 LIMIT 1",
                params![record_id],
                |_row| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        Ok(exists)
    }
}

#[async_trait]
impl ValidationLedgerRepository for ValidationLedgerRepositoryImpl {
    /// 批量插入待校验行（事务化，global_row_index 会话内单调递增）
    async fn insert_pending_rows(
        &self,
        session_id: &str,
        entity_type: EntityType,
        rows: Vec<serde_json::Map<String, serde_json::Value>>,
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        Self::ensure_session_exists(&conn, session_id)?;

        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        // 续接既有最大序号（同会话多实体类型连续编号）
        let next_index: i64 = tx.query_row(
            "SELECT COALESCE(MAX(global_row_index) + 1, 0)
             FROM migration_validation_result WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;

        let now = Utc::now().to_rfc3339();
        let mut count = 0usize;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO migration_validation_result (
                    id, session_id, entity_type, global_row_index, status,
                    original_data_json, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )?;

            for (offset, row) in rows.into_iter().enumerate() {
                let original_data_json = serde_json::to_string(&row).map_err(|e| {
                    RepositoryError::ValidationError(format!("行数据序列化失败: {}", e))
                })?;

                stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    session_id,
                    entity_type.to_db_str(),
                    next_index + offset as i64,
                    RecordStatus::Pending.to_db_str(),
                    original_data_json,
                    now,
                    now,
                ])?;
                count += 1;
            }
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(count)
    }

    /// 写回校验/修复结果（单条 UPDATE，COALESCE 保留未传入的载荷列）
    async fn upsert_status(
        &self,
        record_id: &str,
        status: RecordStatus,
        errors_json: Option<String>,
        warnings_json: Option<String>,
        fixed_data_json: Option<String>,
        user_action: Option<String>,
        now: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let updated = conn.execute(
            r#"
            UPDATE migration_validation_result SET
                status = ?2,
                errors_json = COALESCE(?3, errors_json),
                warnings_json = COALESCE(?4, warnings_json),
                fixed_data_json = COALESCE(?5, fixed_data_json),
                user_action = COALESCE(?6, user_action),
                updated_at = ?7
            WHERE id = ?1
            "#,
            params![
                record_id,
                status.to_db_str(),
                errors_json,
                warnings_json,
                fixed_data_json,
                user_action,
                now.to_rfc3339(),
            ],
        )?;

        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ValidationRecord".to_string(),
                id: record_id.to_string(),
            });
        }
        Ok(())
    }

    /// 写入列映射应用后的数据
    async fn set_transformed_data(
        &self,
        record_id: &str,
        transformed_data_json: String,
        now: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        let updated = conn.execute(
            "UPDATE migration_validation_result
             SET transformed_data_json = ?2, updated_at = ?3
             WHERE id = ?1",
            params![record_id, transformed_data_json, now.to_rfc3339()],
        )?;

        if updated == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ValidationRecord".to_string(),
                id: record_id.to_string(),
            });
        }
        Ok(())
    }

    /// 导入盖章（compare-and-set）
    ///
    /// 守卫 UPDATE 把导入资格不变量编码进 WHERE 子句：
    /// 重复盖章、无资格行、已排除行都命中 0 行，静默返回 false。
    async fn stamp_imported(&self, record_id: &str, at: DateTime<Utc>) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let updated = conn.execute(
            r#"
            UPDATE migration_validation_result SET
                imported_at = ?2,
                updated_at = ?2
            WHERE id = ?1
              AND imported_at IS NULL
              AND status IN ('VALID', 'WARNING', 'FIXED')
              AND COALESCE(user_action, '') != ?3
            "#,
            params![record_id, at.to_rfc3339(), USER_ACTION_SKIP],
        )?;

        if updated == 1 {
            return Ok(true);
        }

        // 0 行命中：区分记录不存在与守卫未通过
        if !Self::record_exists(&conn, record_id)? {
            return Err(RepositoryError::NotFound {
                entity: "ValidationRecord".to_string(),
                id: record_id.to_string(),
            });
        }
        Ok(false)
    }

    /// 按记录 ID 查询
    async fn find_by_id(&self, record_id: &str) -> RepositoryResult<Option<ValidationRecord>> {
        let conn = self.get_conn()?;
        let result = conn
            .query_row(
                &format!(
                    "SELECT {} FROM migration_validation_result WHERE id = ?1",
                    RECORD_COLUMNS
                ),
                params![record_id],
                map_record_row,
            )
            .optional()?;
        Ok(result)
    }

    /// 查询会话内某实体类型的首条记录（映射建议的样本行）
    async fn first_record_for_entity(
        &self,
        session_id: &str,
        entity_type: EntityType,
    ) -> RepositoryResult<Option<ValidationRecord>> {
        let conn = self.get_conn()?;
        let result = conn
            .query_row(
                &format!(
                    "SELECT {} FROM migration_validation_result
                     WHERE session_id = ?1 AND entity_type = ?2
                     ORDER BY global_row_index ASC LIMIT 1",
                    RECORD_COLUMNS
                ),
                params![session_id, entity_type.to_db_str()],
                map_record_row,
            )
            .optional()?;
        Ok(result)
    }

    /// 台账分页读取（排序确定性来自 global_row_index）
    async fn list_page(
        &self,
        session_id: &str,
        page_number: u32,
        page_size: u32,
        status_filter: Option<RecordStatus>,
        entity_filter: Option<EntityType>,
    ) -> RepositoryResult<ValidationPage> {
        if page_number < 1 {
            return Err(RepositoryError::FieldValueError {
                field: "page_number".to_string(),
                message: "页号从 1 开始".to_string(),
            });
        }
        if page_size < 1 {
            return Err(RepositoryError::FieldValueError {
                field: "page_size".to_string(),
                message: "每页记录数必须大于 0".to_string(),
            });
        }

        let conn = self.get_conn()?;
        Self::ensure_session_exists(&conn, session_id)?;

        // 过滤条件拼接（参数化，值永不进 SQL 文本）
        let mut where_clause = String::from("session_id = ?1");
        let status_db = status_filter.map(|s| s.to_db_str().to_string());
        let entity_db = entity_filter.map(|e| e.to_db_str().to_string());
        let mut bind: Vec<&dyn rusqlite::ToSql> = vec![&session_id];
        if let Some(ref s) = status_db {
            where_clause.push_str(&format!(" AND status = ?{}", bind.len() + 1));
            bind.push(s);
        }
        if let Some(ref e) = entity_db {
            where_clause.push_str(&format!(" AND entity_type = ?{}", bind.len() + 1));
            bind.push(e);
        }

        let total_count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM migration_validation_result WHERE {}",
                where_clause
            ),
            bind.as_slice(),
            |row| row.get(0),
        )?;

        let offset = (page_number as i64 - 1) * page_size as i64;
        let limit_idx = bind.len() + 1;
        let offset_idx = bind.len() + 2;
        let page_size_i64 = page_size as i64;
        let mut page_bind = bind.clone();
        page_bind.push(&page_size_i64);
        page_bind.push(&offset);

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM migration_validation_result WHERE {}
             ORDER BY global_row_index ASC LIMIT ?{} OFFSET ?{}",
            RECORD_COLUMNS, where_clause, limit_idx, offset_idx
        ))?;

        let records = stmt
            .query_map(page_bind.as_slice(), map_record_row)?
            .collect::<Result<Vec<_>, _>>()?;

        // 汇总永远是全会话口径，与过滤/分页无关
        let summary = query_summary(&conn, session_id)?;

        Ok(ValidationPage {
            records,
            total_count,
            page_number,
            page_size,
            summary,
        })
    }

    /// 整会话六维状态汇总
    async fn summary(&self, session_id: &str) -> RepositoryResult<LedgerSummary> {
        let conn = self.get_conn()?;
        Self::ensure_session_exists(&conn, session_id)?;
        query_summary(&conn, session_id)
    }

    /// 待校验行数
    async fn count_pending(&self, session_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM migration_validation_result
             WHERE session_id = ?1 AND status = 'PENDING'",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 可导行数
    async fn importable_count(&self, session_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM migration_validation_result
            WHERE session_id = ?1
              AND status IN ('VALID', 'WARNING', 'FIXED')
              AND COALESCE(user_action, '') != ?2
            "#,
            params![session_id, USER_ACTION_SKIP],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 已盖章行数
    async fn imported_count(&self, session_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM migration_validation_result
             WHERE session_id = ?1 AND imported_at IS NOT NULL",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// 剩余未盖章的可导行数
    async fn remaining_eligible_count(&self, session_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM migration_validation_result
            WHERE session_id = ?1
              AND status IN ('VALID', 'WARNING', 'FIXED')
              AND COALESCE(user_action, '') != ?2
              AND imported_at IS NULL
            "#,
            params![session_id, USER_ACTION_SKIP],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// 全会话六维汇总（单次 GROUP 扫描）
fn query_summary(conn: &Connection, session_id: &str) -> RepositoryResult<LedgerSummary> {
    let summary = conn.query_row(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN status = 'VALID' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status = 'WARNING' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status = 'ERROR' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status = 'FIXED' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status = 'SKIPPED' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status = 'PENDING' THEN 1 ELSE 0 END), 0)
        FROM migration_validation_result
        WHERE session_id = ?1
        "#,
        params![session_id],
        |row| {
            Ok(LedgerSummary {
                valid: row.get(0)?,
                warning: row.get(1)?,
                error: row.get(2)?,
                fixed: row.get(3)?,
                skipped: row.get(4)?,
                pending: row.get(5)?,
            })
        },
    )?;
    Ok(summary)
}

fn map_record_row(row: &Row<'_>) -> rusqlite::Result<ValidationRecord> {
    let entity_raw: String = row.get(2)?;
    let status_raw: String = row.get(4)?;

    let entity_type = EntityType::from_db_str(&entity_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("未知实体类型: {}", entity_raw).into(),
        )
    })?;
    let status = RecordStatus::from_db_str(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("未知记录状态: {}", status_raw).into(),
        )
    })?;

    let imported_at: Option<String> = row.get(11)?;
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;

    Ok(ValidationRecord {
        id: row.get(0)?,
        session_id: row.get(1)?,
        entity_type,
        global_row_index: row.get(3)?,
        status,
        original_data_json: row.get(5)?,
        transformed_data_json: row.get(6)?,
        fixed_data_json: row.get(7)?,
        errors_json: row.get(8)?,
        warnings_json: row.get(9)?,
        user_action: row.get(10)?,
        imported_at: imported_at.and_then(|s| super::session_repo::parse_rfc3339(&s)),
        created_at: parse_ts_or_conversion_err(&created_at, 12)?,
        updated_at: parse_ts_or_conversion_err(&updated_at, 13)?,
    })
}

fn parse_ts_or_conversion_err(raw: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    super::session_repo::parse_rfc3339(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("时间戳解析失败: {}", raw).into(),
        )
    })
}
