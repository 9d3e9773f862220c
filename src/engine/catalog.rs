// ==========================================
// ERP 数据迁移系统 - 目标字段目录
// ==========================================
// 职责: 按实体类型提供有序的目标字段清单（映射引擎的评分对象）
// 说明: 目录内容为静态领域夹具；接口抽成 trait，便于外部替换目录来源
// ==========================================

use crate::domain::mapping::TargetField;
use crate::domain::types::EntityType;

/// 目标字段目录提供方（§ 协作方接口）
pub trait TargetFieldCatalog: Send + Sync {
    /// 返回实体类型的有序目标字段清单
    ///
    /// 空清单表示该实体类型不支持映射建议
    fn target_fields(&self, entity_type: EntityType) -> Vec<TargetField>;
}

// ==========================================
// BuiltinCatalog - 内置目录
// ==========================================
// display_name 为操作员界面的本地化展示名（随目标系统语言）
pub struct BuiltinCatalog;

impl TargetFieldCatalog for BuiltinCatalog {
    fn target_fields(&self, entity_type: EntityType) -> Vec<TargetField> {
        match entity_type {
            EntityType::Product => vec![
                TargetField::new("Code", "Ürün Kodu", "string", true).with_max_length(50),
                TargetField::new("Name", "Ürün Adı", "string", true).with_max_length(200),
                TargetField::new("Description", "Açıklama", "string", false).with_max_length(500),
                TargetField::new("Barcode", "Barkod", "string", false).with_max_length(50),
                TargetField::new("CategoryCode", "Kategori Kodu", "string", false).with_max_length(50),
                TargetField::new("Unit", "Birim", "string", true).with_max_length(20),
                TargetField::new("VatRate", "KDV Oranı", "decimal", false),
                TargetField::new("PurchasePrice", "Alış Fiyatı", "decimal", false),
                TargetField::new("SalePrice", "Satış Fiyatı", "decimal", false),
                TargetField::new("MinStock", "Min. Stok", "decimal", false),
                TargetField::new("MaxStock", "Max. Stok", "decimal", false),
            ],
            EntityType::Customer => vec![
                TargetField::new("Code", "Cari Kodu", "string", true).with_max_length(50),
                TargetField::new("Name", "Cari Adı", "string", true).with_max_length(200),
                TargetField::new("TaxNumber", "Vergi No", "string", false).with_max_length(20),
                TargetField::new("TaxOffice", "Vergi Dairesi", "string", false).with_max_length(100),
                TargetField::new("Phone", "Telefon", "string", false).with_max_length(20),
                TargetField::new("Email", "E-posta", "string", false).with_max_length(100),
                TargetField::new("Address", "Adres", "string", false).with_max_length(500),
                TargetField::new("City", "İl", "string", false).with_max_length(50),
                TargetField::new("District", "İlçe", "string", false).with_max_length(50),
                TargetField::new("CreditLimit", "Kredi Limiti", "decimal", false),
            ],
            EntityType::Supplier => vec![
                TargetField::new("Code", "Tedarikçi Kodu", "string", true).with_max_length(50),
                TargetField::new("Name", "Tedarikçi Adı", "string", true).with_max_length(200),
                TargetField::new("TaxNumber", "Vergi No", "string", false).with_max_length(20),
                TargetField::new("TaxOffice", "Vergi Dairesi", "string", false).with_max_length(100),
                TargetField::new("Phone", "Telefon", "string", false).with_max_length(20),
                TargetField::new("Email", "E-posta", "string", false).with_max_length(100),
                TargetField::new("Address", "Adres", "string", false).with_max_length(500),
            ],
            EntityType::Category => vec![
                TargetField::new("Code", "Kategori Kodu", "string", true).with_max_length(50),
                TargetField::new("Name", "Kategori Adı", "string", true).with_max_length(100),
                TargetField::new("ParentCode", "Üst Kategori Kodu", "string", false).with_max_length(50),
                TargetField::new("Description", "Açıklama", "string", false).with_max_length(500),
            ],
            EntityType::Brand => vec![
                TargetField::new("Code", "Marka Kodu", "string", true).with_max_length(50),
                TargetField::new("Name", "Marka Adı", "string", true).with_max_length(100),
                TargetField::new("Description", "Açıklama", "string", false).with_max_length(500),
            ],
            EntityType::Unit => vec![
                TargetField::new("Code", "Birim Kodu", "string", true).with_max_length(20),
                TargetField::new("Name", "Birim Adı", "string", true).with_max_length(50),
                TargetField::new("Description", "Açıklama", "string", false).with_max_length(200),
            ],
            EntityType::Warehouse => vec![
                TargetField::new("Code", "Depo Kodu", "string", true).with_max_length(50),
                TargetField::new("Name", "Depo Adı", "string", true).with_max_length(100),
                TargetField::new("Address", "Adres", "string", false).with_max_length(500),
                TargetField::new("IsDefault", "Varsayılan", "bool", false),
            ],
            EntityType::StockMovement => vec![
                TargetField::new("ProductCode", "Ürün Kodu", "string", true).with_max_length(50),
                TargetField::new("WarehouseCode", "Depo Kodu", "string", true).with_max_length(50),
                TargetField::new("Quantity", "Miktar", "decimal", true),
                TargetField::new("MovementType", "Hareket Tipi", "string", true).with_max_length(20),
                TargetField::new("Date", "Tarih", "datetime", true),
                TargetField::new("Description", "Açıklama", "string", false).with_max_length(500),
            ],
            EntityType::OpeningBalance => vec![
                TargetField::new("ProductCode", "Ürün Kodu", "string", true).with_max_length(50),
                TargetField::new("WarehouseCode", "Depo Kodu", "string", true).with_max_length(50),
                TargetField::new("Quantity", "Miktar", "decimal", true),
                TargetField::new("UnitCost", "Birim Maliyet", "decimal", false),
                TargetField::new("Date", "Tarih", "datetime", false),
            ],
            EntityType::Stock => vec![
                TargetField::new("ProductCode", "Ürün Kodu", "string", true).with_max_length(50),
                TargetField::new("WarehouseCode", "Depo Kodu", "string", true).with_max_length(50),
                TargetField::new("Quantity", "Miktar", "decimal", true),
                TargetField::new("UnitCost", "Birim Maliyet", "decimal", false),
                TargetField::new("LotNumber", "Lot/Parti No", "string", false).with_max_length(50),
                TargetField::new("ExpiryDate", "Son Kullanma Tarihi", "date", false),
            ],
            EntityType::Invoice => vec![
                TargetField::new("InvoiceNo", "Fatura No", "string", true).with_max_length(50),
                TargetField::new("InvoiceType", "Fatura Tipi", "string", true).with_max_length(20),
                TargetField::new("CustomerCode", "Cari Kodu", "string", true).with_max_length(50),
                TargetField::new("Date", "Fatura Tarihi", "datetime", true),
                TargetField::new("DueDate", "Vade Tarihi", "datetime", false),
                TargetField::new("TotalAmount", "Toplam Tutar", "decimal", true),
                TargetField::new("VatAmount", "KDV Tutarı", "decimal", false),
                TargetField::new("DiscountAmount", "İskonto Tutarı", "decimal", false),
                TargetField::new("Description", "Açıklama", "string", false).with_max_length(500),
            ],
            EntityType::InvoiceItem => vec![
                TargetField::new("InvoiceNo", "Fatura No", "string", true).with_max_length(50),
                TargetField::new("LineNo", "Satır No", "int", false),
                TargetField::new("ProductCode", "Ürün Kodu", "string", true).with_max_length(50),
                TargetField::new("Quantity", "Miktar", "decimal", true),
                TargetField::new("UnitPrice", "Birim Fiyat", "decimal", true),
                TargetField::new("VatRate", "KDV Oranı", "decimal", false),
                TargetField::new("DiscountRate", "İskonto Oranı", "decimal", false),
                TargetField::new("TotalPrice", "Toplam Tutar", "decimal", false),
                TargetField::new("WarehouseCode", "Depo Kodu", "string", false).with_max_length(50),
            ],
            EntityType::AccountingEntry => vec![
                TargetField::new("EntryNo", "Fiş No", "string", true).with_max_length(50),
                TargetField::new("Date", "Fiş Tarihi", "datetime", true),
                TargetField::new("AccountCode", "Hesap Kodu", "string", true).with_max_length(50),
                TargetField::new("Description", "Açıklama", "string", false).with_max_length(500),
                TargetField::new("Debit", "Borç", "decimal", false),
                TargetField::new("Credit", "Alacak", "decimal", false),
                TargetField::new("DocumentNo", "Belge No", "string", false).with_max_length(50),
                TargetField::new("DocumentType", "Belge Tipi", "string", false).with_max_length(20),
            ],
            EntityType::PriceList => vec![
                TargetField::new("ProductCode", "Ürün Kodu", "string", true).with_max_length(50),
                TargetField::new("PriceListCode", "Fiyat Listesi Kodu", "string", true).with_max_length(50),
                TargetField::new("Price", "Fiyat", "decimal", true),
                TargetField::new("Currency", "Para Birimi", "string", false).with_max_length(3),
                TargetField::new("ValidFrom", "Geçerlilik Başlangıcı", "date", false),
                TargetField::new("ValidTo", "Geçerlilik Bitişi", "date", false),
            ],
        }
    }
}
