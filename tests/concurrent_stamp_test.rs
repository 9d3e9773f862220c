// ==========================================
// 并发盖章测试
// ==========================================
// 测试目标: 导入器工作池乱序/并发回调盖章时
//   - 每条记录 at-most-once
//   - 计数器与台账保持一致
// ==========================================

mod test_helpers;

use erp_migration::api::MigrationApi;
use erp_migration::domain::types::{EntityType, RecordStatus, SessionStatus, SourceType};
use futures::future::join_all;
use std::sync::Arc;

const RECORD_COUNT: usize = 20;

async fn setup_importing_session(api: &MigrationApi) -> (String, Vec<String>) {
    let session = api
        .create_session(
            "tenant-1",
            SourceType::Logo,
            "stok_full.xlsx",
            vec![EntityType::Product],
        )
        .await
        .unwrap();

    let rows = (1..=RECORD_COUNT)
        .map(|i| test_helpers::product_row(&format!("P{:04}", i), "Ürün", None))
        .collect();
    api.ingest_records(&session.id, "Product", rows).await.unwrap();
    api.begin_validation(&session.id).await.unwrap();

    let page = api
        .list_validation_results(&session.id, 1, Some(100), None, None)
        .await
        .unwrap();
    let ids: Vec<String> = page.records.iter().map(|r| r.id.clone()).collect();

    for id in &ids {
        api.record_validation_outcome(id, RecordStatus::Valid, None, None)
            .await
            .unwrap();
    }
    api.complete_validation(&session.id).await.unwrap();
    api.start_import(&session.id).await.unwrap();

    (session.id, ids)
}

#[tokio::test]
async fn test_out_of_order_concurrent_stamping() {
    let (_temp_file, db_path) = test_helpers::create_test_db();
    let api = Arc::new(MigrationApi::new(&db_path).expect("Failed to create api"));
    let (session_id, ids) = setup_importing_session(&api).await;

    // 工作池乱序处理：倒序发起并发盖章
    let tasks = ids.iter().rev().map(|id| {
        let api = api.clone();
        let id = id.clone();
        async move { api.stamp_record_imported(&id).await.unwrap() }
    });
    let results = join_all(tasks).await;
    assert!(results.iter().all(|applied| *applied));

    let progress = api.get_progress(&session_id).await.unwrap();
    assert_eq!(progress.importable_count, RECORD_COUNT as i64);
    assert_eq!(progress.imported_count, RECORD_COUNT as i64);
    assert_eq!(progress.progress_percentage, 100);

    let s = api.complete_import(&session_id).await.unwrap();
    assert_eq!(s.status, SessionStatus::Completed);
    assert_eq!(s.imported_records, RECORD_COUNT as i64);
}

#[tokio::test]
async fn test_duplicate_concurrent_stamping_is_at_most_once() {
    let (_temp_file, db_path) = test_helpers::create_test_db();
    let api = Arc::new(MigrationApi::new(&db_path).expect("Failed to create api"));
    let (session_id, ids) = setup_importing_session(&api).await;

    // 两个"工作进程"同时处理同一批记录：每条恰好一次盖章生效
    let tasks = ids
        .iter()
        .chain(ids.iter())
        .map(|id| {
            let api = api.clone();
            let id = id.clone();
            async move { api.stamp_record_imported(&id).await.unwrap() }
        });
    let results = join_all(tasks).await;

    let applied = results.iter().filter(|applied| **applied).count();
    assert_eq!(applied, RECORD_COUNT);

    let progress = api.get_progress(&session_id).await.unwrap();
    assert_eq!(progress.imported_count, RECORD_COUNT as i64);
    // imported ≤ importable 恒成立
    assert!(progress.imported_count <= progress.importable_count);
}
