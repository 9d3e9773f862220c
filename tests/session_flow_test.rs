// ==========================================
// 迁移会话全流程测试
// ==========================================
// 测试目标: 建会话 → 灌台账 → 校验 → 修复/排除 → 导入 → 完成/失败重试
// 不变量: valid+warning+error+fixed+skipped+pending == total 全程成立
// ==========================================

mod test_helpers;

use erp_migration::api::MigrationApi;
use erp_migration::domain::types::{EntityType, RecordStatus, SessionStatus, SourceType};
use erp_migration::logging;
use erp_migration::ApiError;

async fn assert_ledger_invariant(api: &MigrationApi, tenant_id: &str, session_id: &str) {
    let session = api.get_session(tenant_id, session_id).await.unwrap();
    let page = api
        .list_validation_results(session_id, 1, Some(1), None, None)
        .await
        .unwrap();
    // 六维之和 == 台账总数 == 会话 total_records
    assert_eq!(page.summary.total(), session.total_records);
}

#[tokio::test]
async fn test_full_session_lifecycle_with_retry() {
    logging::init_test();
    let (_temp_file, db_path) = test_helpers::create_test_db();
    let api = MigrationApi::new(&db_path).expect("Failed to create api");

    // ===== 建会话 + 灌台账 =====
    let session = api
        .create_session(
            "tenant-1",
            SourceType::Netsis,
            "legacy_export.xlsx",
            vec![EntityType::Product, EntityType::Customer],
        )
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Created);
    assert!(session.expires_at.is_some());

    let inserted = api
        .ingest_records(
            &session.id,
            "Product",
            vec![
                test_helpers::product_row("P001", "Ürün 1", Some("869000001")),
                test_helpers::product_row("P002", "Ürün 2", None),
                test_helpers::product_row("P003", "Ürün 3", None),
            ],
        )
        .await
        .unwrap();
    assert_eq!(inserted, 3);

    let inserted = api
        .ingest_records(
            &session.id,
            "Customer",
            vec![
                test_helpers::customer_row("C001", "Cari 1"),
                test_helpers::customer_row("C002", "Cari 2"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(inserted, 2);

    let s = api.get_session("tenant-1", &session.id).await.unwrap();
    assert_eq!(s.status, SessionStatus::Uploaded);
    assert_eq!(s.total_records, 5);
    assert_ledger_invariant(&api, "tenant-1", &session.id).await;

    // ===== 校验阶段 =====
    api.begin_validation(&session.id).await.unwrap();

    // 校验未完成时不能进入 Validated
    let err = api.complete_validation(&session.id).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    let page = api
        .list_validation_results(&session.id, 1, Some(50), None, None)
        .await
        .unwrap();
    assert_eq!(page.records.len(), 5);
    // global_row_index 升序、跨实体连续编号
    let indexes: Vec<i64> = page.records.iter().map(|r| r.global_row_index).collect();
    assert_eq!(indexes, vec![0, 1, 2, 3, 4]);

    let ids: Vec<String> = page.records.iter().map(|r| r.id.clone()).collect();

    // 规则引擎写回: P001 Valid / P002 Warning / P003 Error / C001 Valid / C002 Valid
    api.record_validation_outcome(&ids[0], RecordStatus::Valid, None, None)
        .await
        .unwrap();
    api.record_validation_outcome(
        &ids[1],
        RecordStatus::Warning,
        None,
        Some(r#"["KDV oranı standart değil"]"#.to_string()),
    )
    .await
    .unwrap();
    api.record_validation_outcome(
        &ids[2],
        RecordStatus::Error,
        Some(r#"["Zorunlu alan eksik: Unit"]"#.to_string()),
        None,
    )
    .await
    .unwrap();
    api.record_validation_outcome(&ids[3], RecordStatus::Valid, None, None)
        .await
        .unwrap();
    api.record_validation_outcome(&ids[4], RecordStatus::Valid, None, None)
        .await
        .unwrap();

    let s = api.complete_validation(&session.id).await.unwrap();
    assert_eq!(s.status, SessionStatus::Validated);
    assert!(s.validated_at.is_some());
    assert_eq!(s.valid_records, 3);
    assert_eq!(s.warning_records, 1);
    assert_eq!(s.error_records, 1);
    assert_ledger_invariant(&api, "tenant-1", &session.id).await;

    // ===== 操作员修复/排除 =====
    // 修复 Error 记录
    api.fix_record(&ids[2], r#"{"STOK_KODU":"P003","STOK_ADI":"Ürün 3","BIRIM":"ADET"}"#.to_string())
        .await
        .unwrap();
    // 排除一条 Valid 记录
    api.skip_record(&ids[0]).await.unwrap();
    assert_ledger_invariant(&api, "tenant-1", &session.id).await;

    // ===== 导入阶段 =====
    let s = api.start_import(&session.id).await.unwrap();
    assert_eq!(s.status, SessionStatus::Importing);
    assert!(s.import_started_at.is_some());

    // 可导 = Warning(P002) + Fixed(P003) + Valid(C001, C002) = 4
    let progress = api.get_progress(&session.id).await.unwrap();
    assert_eq!(progress.importable_count, 4);
    assert_eq!(progress.imported_count, 0);
    assert_eq!(progress.progress_percentage, 0);
    assert_eq!(progress.estimated_seconds_remaining, None);

    // 被排除的 Valid 记录没有导入资格
    assert!(!api.stamp_record_imported(&ids[0]).await.unwrap());

    // 盖章两条（乱序：先 C002 再 P002）
    assert!(api.stamp_record_imported(&ids[4]).await.unwrap());
    assert!(api.stamp_record_imported(&ids[1]).await.unwrap());

    // 重复盖章静默不生效
    assert!(!api.stamp_record_imported(&ids[4]).await.unwrap());

    let progress = api.get_progress(&session.id).await.unwrap();
    assert_eq!(progress.imported_count, 2);
    assert_eq!(progress.progress_percentage, 50);

    // 仍有可导行未盖章，不能完成
    let err = api.complete_import(&session.id).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    // ===== 失败 + 重试（幂等续导）=====
    let s = api
        .fail_import(&session.id, "目标库写入失败: connection reset")
        .await
        .unwrap();
    assert_eq!(s.status, SessionStatus::Failed);
    assert!(s.error_message.is_some());

    let s = api.start_import(&session.id).await.unwrap();
    assert_eq!(s.status, SessionStatus::Importing);
    assert!(s.error_message.is_none());

    // 续导剩余两条
    assert!(api.stamp_record_imported(&ids[2]).await.unwrap());
    assert!(api.stamp_record_imported(&ids[3]).await.unwrap());

    let s = api.complete_import(&session.id).await.unwrap();
    assert_eq!(s.status, SessionStatus::Completed);
    assert!(s.completed_at.is_some());
    assert_eq!(s.imported_records, 4);
    assert_ledger_invariant(&api, "tenant-1", &session.id).await;

    // 最终台账分布: valid=2, warning=1, fixed=1, skipped=1
    let page = api
        .list_validation_results(&session.id, 1, Some(50), None, None)
        .await
        .unwrap();
    assert_eq!(page.summary.valid, 2);
    assert_eq!(page.summary.warning, 1);
    assert_eq!(page.summary.error, 0);
    assert_eq!(page.summary.fixed, 1);
    assert_eq!(page.summary.skipped, 1);
    assert_eq!(page.summary.pending, 0);
}

#[tokio::test]
async fn test_start_import_requires_validated_session() {
    let (_temp_file, db_path) = test_helpers::create_test_db();
    let api = MigrationApi::new(&db_path).expect("Failed to create api");

    let session = api
        .create_session(
            "tenant-1",
            SourceType::ExcelTemplate,
            "products.xlsx",
            vec![EntityType::Product],
        )
        .await
        .unwrap();

    // Created 上直接开导 → 状态冲突
    let err = api.start_import(&session.id).await.unwrap_err();
    match err {
        ApiError::StateConflict { from, to } => {
            assert_eq!(from, "CREATED");
            assert_eq!(to, "IMPORTING");
        }
        other => panic!("Expected StateConflict, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_ingest_after_validation_rejected() {
    let (_temp_file, db_path) = test_helpers::create_test_db();
    let api = MigrationApi::new(&db_path).expect("Failed to create api");

    let session = api
        .create_session(
            "tenant-1",
            SourceType::CsvExport,
            "customers.csv",
            vec![EntityType::Customer],
        )
        .await
        .unwrap();

    api.ingest_records(
        &session.id,
        "Customer",
        vec![test_helpers::customer_row("C001", "Cari 1")],
    )
    .await
    .unwrap();
    api.begin_validation(&session.id).await.unwrap();

    // Validating 之后不允许继续灌入
    let err = api
        .ingest_records(
            &session.id,
            "Customer",
            vec![test_helpers::customer_row("C002", "Cari 2")],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[tokio::test]
async fn test_session_not_found() {
    let (_temp_file, db_path) = test_helpers::create_test_db();
    let api = MigrationApi::new(&db_path).expect("Failed to create api");

    let err = api.get_session("tenant-1", "no-such-session").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let err = api.get_progress("no-such-session").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_purge_expired_sessions() {
    let (_temp_file, db_path) = test_helpers::create_test_db();
    let api = MigrationApi::new(&db_path).expect("Failed to create api");

    // TTL 配置为立即过期不可行（正整数天），这里直接改库里的 expires_at
    let session = api
        .create_session(
            "tenant-1",
            SourceType::Other,
            "old_export.xlsx",
            vec![EntityType::Product],
        )
        .await
        .unwrap();
    api.ingest_records(
        &session.id,
        "Product",
        vec![test_helpers::product_row("P001", "Ürün 1", None)],
    )
    .await
    .unwrap();

    let conn = erp_migration::db::open_sqlite_connection(&db_path).unwrap();
    conn.execute(
        "UPDATE migration_session SET expires_at = '2020-01-01T00:00:00+00:00' WHERE id = ?1",
        rusqlite::params![session.id],
    )
    .unwrap();

    let purged = api.purge_expired_sessions().await.unwrap();
    assert_eq!(purged, 1);

    // 会话与台账行（级联）都已删除
    let err = api.get_session("tenant-1", &session.id).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    let remaining: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM migration_validation_result WHERE session_id = ?1",
            rusqlite::params![session.id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(remaining, 0);
}
