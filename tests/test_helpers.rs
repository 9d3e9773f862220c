// ==========================================
// 测试辅助模块
// ==========================================
// 职责: 创建临时测试数据库 + 常用测试数据构造
// ==========================================

use erp_migration::db;
use serde_json::{json, Map, Value};
use tempfile::NamedTempFile;

/// 创建临时测试数据库（初始化迁移核心表结构）
///
/// # 返回
/// - (NamedTempFile, String): 临时文件句柄（保持存活）+ 数据库路径
pub fn create_test_db() -> (NamedTempFile, String) {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = db::open_sqlite_connection(&db_path).expect("Failed to open db");
    db::init_migration_schema(&conn).expect("Failed to init schema");

    (temp_file, db_path)
}

/// 构造产品行（遗留系统列名）
pub fn product_row(code: &str, name: &str, barcode: Option<&str>) -> Map<String, Value> {
    let mut row = Map::new();
    row.insert("STOK_KODU".to_string(), json!(code));
    row.insert("STOK_ADI".to_string(), json!(name));
    row.insert("BIRIM".to_string(), json!("ADET"));
    if let Some(barcode) = barcode {
        row.insert("BARKOD1".to_string(), json!(barcode));
    }
    row
}

/// 构造客户行（遗留系统列名）
pub fn customer_row(code: &str, name: &str) -> Map<String, Value> {
    let mut row = Map::new();
    row.insert("CARI_KOD".to_string(), json!(code));
    row.insert("CARI_ADI".to_string(), json!(name));
    row.insert("VERGI_NO".to_string(), json!("1234567890"));
    row
}
