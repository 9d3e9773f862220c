// ==========================================
// ERP 数据迁移系统 - 迁移会话API
// ==========================================
// 职责: 封装迁移会话编排（协作方的唯一入口）
// 协作方: 摄取器（建会话/灌台账）、规则引擎（写回校验结果）、
//         操作员界面（分页/修复/排除/映射建议）、导入器（盖章/完成/失败）
// 红线: 计数器由台账重算写回，本层不做任何增量维护
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::mapping::{AutoMappingResult, SourceColumn};
use crate::domain::types::{EntityType, RecordStatus, SessionStatus, SourceType};
use crate::domain::{MigrationSession, ValidationRecord, USER_ACTION_SKIP};
use crate::engine::{
    BuiltinCatalog, ImportProgress, MappingEngine, ProgressEstimator, TargetFieldCatalog,
};
use crate::repository::{
    SessionRepository, ValidationLedgerRepository, ValidationLedgerRepositoryImpl, ValidationPage,
};
use chrono::{Duration, Utc};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ==========================================
// MigrationApi - 迁移会话API
// ==========================================
pub struct MigrationApi {
    session_repo: SessionRepository,
    ledger: ValidationLedgerRepositoryImpl,
    config: ConfigManager,
    mapping_engine: MappingEngine,
    catalog: Box<dyn TargetFieldCatalog>,
}

impl MigrationApi {
    /// 创建新的 MigrationApi 实例（打开数据库并初始化表结构）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ApiResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        crate::db::init_migration_schema(&conn)
            .map_err(|e| ApiError::DatabaseError(format!("表结构初始化失败: {}", e)))?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建（会话仓储/台账仓储/配置共享同一连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        let config = ConfigManager::from_connection(conn.clone())
            .map_err(|e| ApiError::DatabaseError(format!("创建配置管理器失败: {}", e)))?;

        Ok(Self {
            session_repo: SessionRepository::from_connection(conn.clone()),
            ledger: ValidationLedgerRepositoryImpl::from_connection(conn),
            config,
            mapping_engine: MappingEngine::with_builtin_aliases(),
            catalog: Box::new(BuiltinCatalog),
        })
    }

    /// 替换目标字段目录提供方（默认 BuiltinCatalog）
    pub fn with_catalog(mut self, catalog: Box<dyn TargetFieldCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    // ==========================================
    // 摄取器路径
    // ==========================================

    /// 创建迁移会话（状态 Created）
    ///
    /// expires_at = created_at + session_ttl_days（保留策略清理依据）
    pub async fn create_session(
        &self,
        tenant_id: &str,
        source_type: SourceType,
        source_name: &str,
        entities: Vec<EntityType>,
    ) -> ApiResult<MigrationSession> {
        if tenant_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("租户 ID 不能为空".to_string()));
        }
        if source_name.trim().is_empty() {
            return Err(ApiError::InvalidInput("来源名称不能为空".to_string()));
        }
        if entities.is_empty() {
            return Err(ApiError::InvalidInput("实体类型列表不能为空".to_string()));
        }

        let now = Utc::now();
        let ttl_days = self
            .config
            .session_ttl_days()
            .map_err(|e| ApiError::DatabaseError(format!("读取配置失败: {}", e)))?;

        let session = MigrationSession::new(
            Uuid::new_v4().to_string(),
            tenant_id.to_string(),
            source_type,
            source_name.to_string(),
            entities,
            now,
            Some(now + Duration::days(ttl_days)),
        );

        self.session_repo.insert(&session)?;

        tracing::info!(
            session_id = %session.id,
            tenant_id = %tenant_id,
            source_type = %source_type,
            "迁移会话已创建"
        );
        Ok(session)
    }

    /// 灌入待校验台账行（每源记录一行，global_row_index 会话内单调递增）
    ///
    /// 首批行落库后会话自动 Created → Uploaded。
    /// 可多次调用（多实体类型/多文件分片），但必须在校验开始前完成。
    pub async fn ingest_records(
        &self,
        session_id: &str,
        entity_type_token: &str,
        rows: Vec<serde_json::Map<String, serde_json::Value>>,
    ) -> ApiResult<usize> {
        let entity_type = parse_entity_token(entity_type_token)?;
        let mut session = self.load_session(session_id)?;

        if !matches!(
            session.status,
            SessionStatus::Created | SessionStatus::Uploaded
        ) {
            return Err(ApiError::Conflict(format!(
                "会话状态 {} 不允许继续灌入数据",
                session.status
            )));
        }
        if rows.is_empty() {
            return Ok(0);
        }

        let inserted = self
            .ledger
            .insert_pending_rows(session_id, entity_type, rows)
            .await?;

        if session.status == SessionStatus::Created {
            session.mark_uploaded()?;
        }
        let counters = self.session_repo.refresh_counters(session_id)?;
        apply_counters(&mut session, counters);
        self.session_repo.update(&session)?;

        tracing::info!(
            session_id = %session_id,
            entity_type = %entity_type,
            inserted = inserted,
            total = session.total_records,
            "台账行已灌入"
        );
        Ok(inserted)
    }

    // ==========================================
    // 规则引擎路径
    // ==========================================

    /// 进入校验阶段（Uploaded → Validating）
    pub async fn begin_validation(&self, session_id: &str) -> ApiResult<MigrationSession> {
        let mut session = self.load_session(session_id)?;
        session.begin_validation()?;
        self.session_repo.update(&session)?;

        tracing::info!(session_id = %session_id, "会话进入校验阶段");
        Ok(session)
    }

    /// 写回单条记录的校验结果（规则引擎回调）
    ///
    /// 仅接受校验终态 Valid/Warning/Error。
    /// 计数器在 complete_validation 时统一重算（批量写回不做逐条刷新）。
    pub async fn record_validation_outcome(
        &self,
        record_id: &str,
        status: RecordStatus,
        errors_json: Option<String>,
        warnings_json: Option<String>,
    ) -> ApiResult<()> {
        if !status.is_terminal_validation() {
            return Err(ApiError::InvalidInput(format!(
                "校验写回状态应为 VALID/WARNING/ERROR，实际: {}",
                status
            )));
        }

        self.ledger
            .upsert_status(
                record_id,
                status,
                errors_json,
                warnings_json,
                None,
                None,
                Utc::now(),
            )
            .await?;
        Ok(())
    }

    /// 写入列映射应用后的数据（规则引擎在校验前做列转换）
    pub async fn record_transformed_data(
        &self,
        record_id: &str,
        transformed_data_json: String,
    ) -> ApiResult<()> {
        ensure_json_object(&transformed_data_json)?;
        self.ledger
            .set_transformed_data(record_id, transformed_data_json, Utc::now())
            .await?;
        Ok(())
    }

    /// 完成校验（Validating → Validated）
    ///
    /// 守卫: 台账无 Pending 行。成功后盖 validated_at 并重算计数器。
    pub async fn complete_validation(&self, session_id: &str) -> ApiResult<MigrationSession> {
        let mut session = self.load_session(session_id)?;

        let pending = self.ledger.count_pending(session_id).await?;
        if pending > 0 {
            return Err(ApiError::Conflict(format!(
                "仍有 {} 条记录待校验，无法完成校验",
                pending
            )));
        }

        session.complete_validation(Utc::now())?;
        let counters = self.session_repo.refresh_counters(session_id)?;
        apply_counters(&mut session, counters);
        self.session_repo.update(&session)?;

        tracing::info!(
            session_id = %session_id,
            total = session.total_records,
            valid = session.valid_records,
            warning = session.warning_records,
            error = session.error_records,
            "校验完成"
        );
        Ok(session)
    }

    // ==========================================
    // 操作员路径
    // ==========================================

    /// 修复记录（操作员更正后 → Fixed）
    ///
    /// 仅 Warning/Error/Fixed（重复修复）状态可修复
    pub async fn fix_record(&self, record_id: &str, fixed_data_json: String) -> ApiResult<()> {
        ensure_json_object(&fixed_data_json)?;

        let record = self.load_record(record_id).await?;
        if !matches!(
            record.status,
            RecordStatus::Warning | RecordStatus::Error | RecordStatus::Fixed
        ) {
            return Err(ApiError::Conflict(format!(
                "记录状态 {} 不允许修复",
                record.status
            )));
        }

        self.ledger
            .upsert_status(
                record_id,
                RecordStatus::Fixed,
                None,
                None,
                Some(fixed_data_json),
                None,
                Utc::now(),
            )
            .await?;
        self.refresh_session_counters(&record.session_id)?;

        tracing::info!(record_id = %record_id, "记录已修复");
        Ok(())
    }

    /// 排除记录（user_action="skip"，任意状态可排除）
    pub async fn skip_record(&self, record_id: &str) -> ApiResult<()> {
        let record = self.load_record(record_id).await?;

        self.ledger
            .upsert_status(
                record_id,
                RecordStatus::Skipped,
                None,
                None,
                None,
                Some(USER_ACTION_SKIP.to_string()),
                Utc::now(),
            )
            .await?;
        self.refresh_session_counters(&record.session_id)?;

        tracing::info!(record_id = %record_id, "记录已排除");
        Ok(())
    }

    /// 台账分页读取
    ///
    /// # 参数
    /// - page_number: 页号（1 起）
    /// - page_size: 每页记录数（None 取配置默认值，上限 max_page_size）
    /// - status_filter / entity_filter: 可选过滤 token
    pub async fn list_validation_results(
        &self,
        session_id: &str,
        page_number: u32,
        page_size: Option<u32>,
        status_filter: Option<&str>,
        entity_filter: Option<&str>,
    ) -> ApiResult<ValidationPage> {
        let status = match status_filter {
            Some(token) => Some(RecordStatus::from_db_str(token).ok_or_else(|| {
                ApiError::ValidationError(format!("无效的状态过滤值: {}", token))
            })?),
            None => None,
        };
        let entity = match entity_filter {
            Some(token) => Some(parse_entity_token(token)?),
            None => None,
        };

        let default_size = self
            .config
            .default_page_size()
            .map_err(|e| ApiError::DatabaseError(format!("读取配置失败: {}", e)))?;
        let max_size = self
            .config
            .max_page_size()
            .map_err(|e| ApiError::DatabaseError(format!("读取配置失败: {}", e)))?;
        let page_size = page_size.unwrap_or(default_size).clamp(1, max_size);
        let page_number = page_number.max(1);

        let page = self
            .ledger
            .list_page(session_id, page_number, page_size, status, entity)
            .await?;
        Ok(page)
    }

    /// 生成实体类型的自动映射建议
    ///
    /// 取该实体类型的首条样本记录的列集，与目标字段目录逐字段匹配。
    /// 不修改台账，可并行调用。
    pub async fn get_mapping_suggestions(
        &self,
        tenant_id: &str,
        session_id: &str,
        entity_type_token: &str,
    ) -> ApiResult<AutoMappingResult> {
        // 会话归属校验
        let session = self
            .session_repo
            .find_by_id(tenant_id, session_id)?
            .ok_or_else(|| ApiError::NotFound(format!("迁移会话不存在: {}", session_id)))?;

        let entity_type = parse_entity_token(entity_type_token)?;

        // 样本记录 → 源列集
        let sample = self
            .ledger
            .first_record_for_entity(&session.id, entity_type)
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!("该实体类型没有已上传数据: {}", entity_type))
            })?;

        let sample_data: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&sample.original_data_json)
                .map_err(|_| ApiError::ValidationError("样本记录数据格式无效".to_string()))?;

        let source_columns: Vec<SourceColumn> = sample_data
            .iter()
            .map(|(name, value)| SourceColumn {
                name: name.clone(),
                sample_value: json_value_to_sample(value),
            })
            .collect();

        let target_fields = self.catalog.target_fields(entity_type);
        let result = self
            .mapping_engine
            .suggest(entity_type, &source_columns, &target_fields);

        tracing::debug!(
            session_id = %session_id,
            entity_type = %entity_type,
            confidence = result.confidence_score,
            "映射建议已生成"
        );
        Ok(result)
    }

    // ==========================================
    // 导入器路径
    // ==========================================

    /// 开始导入（Validated/Failed → Importing）
    ///
    /// 非法前置状态（如 Created 上直接开导）返回 StateConflict。
    /// Failed 重入为幂等续导：导入器只处理 imported_at 为空的可导行。
    pub async fn start_import(&self, session_id: &str) -> ApiResult<MigrationSession> {
        let mut session = self.load_session(session_id)?;
        session.begin_import(Utc::now())?;
        self.session_repo.update(&session)?;

        let importable = self.ledger.importable_count(session_id).await?;
        tracing::info!(
            session_id = %session_id,
            importable = importable,
            "会话进入导入阶段"
        );
        Ok(session)
    }

    /// 导入盖章回调（目标库落库成功后由导入器调用）
    ///
    /// # 返回
    /// - Ok(true): 盖章生效
    /// - Ok(false): 守卫未通过（重复盖章/无资格行），无写入
    pub async fn stamp_record_imported(&self, record_id: &str) -> ApiResult<bool> {
        let record = self.load_record(record_id).await?;
        let applied = self.ledger.stamp_imported(record_id, Utc::now()).await?;

        if applied {
            self.refresh_session_counters(&record.session_id)?;
        } else {
            tracing::warn!(
                record_id = %record_id,
                status = %record.status,
                "导入盖章未生效（重复盖章或记录无导入资格）"
            );
        }
        Ok(applied)
    }

    /// 完成导入（Importing → Completed）
    ///
    /// 守卫: 无剩余未盖章的可导行
    pub async fn complete_import(&self, session_id: &str) -> ApiResult<MigrationSession> {
        let mut session = self.load_session(session_id)?;

        let remaining = self.ledger.remaining_eligible_count(session_id).await?;
        if remaining > 0 {
            return Err(ApiError::Conflict(format!(
                "仍有 {} 条可导记录未盖章，无法完成导入",
                remaining
            )));
        }

        session.complete_import(Utc::now())?;
        let counters = self.session_repo.refresh_counters(session_id)?;
        apply_counters(&mut session, counters);
        self.session_repo.update(&session)?;

        tracing::info!(
            session_id = %session_id,
            imported = session.imported_records,
            "导入完成"
        );
        Ok(session)
    }

    /// 导入失败（Importing → Failed，记录错误信息）
    ///
    /// 已盖章的行不回滚；Failed 状态对后续 stamp/progress 调用方可见
    pub async fn fail_import(&self, session_id: &str, message: &str) -> ApiResult<MigrationSession> {
        let mut session = self.load_session(session_id)?;
        session.fail(message.to_string())?;
        let counters = self.session_repo.refresh_counters(session_id)?;
        apply_counters(&mut session, counters);
        self.session_repo.update(&session)?;

        tracing::error!(
            session_id = %session_id,
            error = %message,
            "导入失败"
        );
        Ok(session)
    }

    // ==========================================
    // 读路径
    // ==========================================

    /// 按 (tenant_id, id) 读取会话
    pub async fn get_session(
        &self,
        tenant_id: &str,
        session_id: &str,
    ) -> ApiResult<MigrationSession> {
        self.session_repo
            .find_by_id(tenant_id, session_id)?
            .ok_or_else(|| ApiError::NotFound(format!("迁移会话不存在: {}", session_id)))
    }

    /// 查询导入进度（任意时刻可查，每次重新估算）
    pub async fn get_progress(&self, session_id: &str) -> ApiResult<ImportProgress> {
        let session = self.load_session(session_id)?;
        let importable = self.ledger.importable_count(session_id).await?;
        let imported = self.ledger.imported_count(session_id).await?;

        Ok(ProgressEstimator::estimate(
            &session,
            importable,
            imported,
            Utc::now(),
        ))
    }

    // ==========================================
    // 保留策略
    // ==========================================

    /// 清理已到期会话（台账行级联删除）
    pub async fn purge_expired_sessions(&self) -> ApiResult<usize> {
        let purged = self.session_repo.purge_expired(Utc::now())?;
        if purged > 0 {
            tracing::info!(purged = purged, "已清理到期会话");
        }
        Ok(purged)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn load_session(&self, session_id: &str) -> ApiResult<MigrationSession> {
        self.session_repo
            .find_by_session_id(session_id)?
            .ok_or_else(|| ApiError::NotFound(format!("迁移会话不存在: {}", session_id)))
    }

    async fn load_record(&self, record_id: &str) -> ApiResult<ValidationRecord> {
        self.ledger
            .find_by_id(record_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("台账记录不存在: {}", record_id)))
    }

    fn refresh_session_counters(&self, session_id: &str) -> ApiResult<()> {
        self.session_repo.refresh_counters(session_id)?;
        Ok(())
    }
}

/// 实体类型 token 解析（未知 token → Validation 错误）
fn parse_entity_token(token: &str) -> ApiResult<EntityType> {
    EntityType::parse_token(token)
        .ok_or_else(|| ApiError::ValidationError(format!("无效的实体类型: {}", token)))
}

/// 校验载荷必须是 JSON 对象（列名 → 值）
fn ensure_json_object(raw: &str) -> ApiResult<()> {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(_)) => Ok(()),
        Ok(_) => Err(ApiError::ValidationError(
            "数据载荷必须是 JSON 对象".to_string(),
        )),
        Err(e) => Err(ApiError::ValidationError(format!("数据载荷解析失败: {}", e))),
    }
}

/// 样本值展示转换（字符串去引号，null 归 None）
fn json_value_to_sample(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// 台账重算结果写回会话计数器字段
fn apply_counters(
    session: &mut MigrationSession,
    counters: crate::repository::SessionCounters,
) {
    session.total_records = counters.total;
    session.valid_records = counters.valid;
    session.warning_records = counters.warning;
    session.error_records = counters.error;
    session.imported_records = counters.imported;
    session.skipped_records = counters.skipped;
}
