// ==========================================
// ERP 数据迁移系统 - 领域类型定义
// ==========================================
// 红线: 状态为封闭枚举 + 显式转换表，不做自由字符串比较
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 会话状态 (Session Status)
// ==========================================
// 生命周期: Created → Uploaded → Validating → Validated → Importing → Completed/Failed
// Failed 可重入 Importing（断点续导）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Created,    // 已创建（尚未落台账）
    Uploaded,   // 已上传（台账行已就位）
    Validating, // 校验中
    Validated,  // 校验完成（无 Pending 行）
    Importing,  // 导入中
    Completed,  // 导入完成
    Failed,     // 导入失败（可重试）
}

impl SessionStatus {
    /// 显式状态转换表
    ///
    /// 唯一合法边:
    /// - Created → Uploaded
    /// - Uploaded → Validating
    /// - Validating → Validated
    /// - Validated → Importing
    /// - Importing → Completed / Failed
    /// - Failed → Importing（失败重试，只补 imported_at 为空的可导行）
    ///
    /// Importing → Validated（导入中途回退重校验）不是合法边。
    pub fn can_transition_to(&self, to: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, to),
            (Created, Uploaded)
                | (Uploaded, Validating)
                | (Validating, Validated)
                | (Validated, Importing)
                | (Importing, Completed)
                | (Importing, Failed)
                | (Failed, Importing)
        )
    }

    /// 从数据库字符串解析状态
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CREATED" => Some(SessionStatus::Created),
            "UPLOADED" => Some(SessionStatus::Uploaded),
            "VALIDATING" => Some(SessionStatus::Validating),
            "VALIDATED" => Some(SessionStatus::Validated),
            "IMPORTING" => Some(SessionStatus::Importing),
            "COMPLETED" => Some(SessionStatus::Completed),
            "FAILED" => Some(SessionStatus::Failed),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            SessionStatus::Created => "CREATED",
            SessionStatus::Uploaded => "UPLOADED",
            SessionStatus::Validating => "VALIDATING",
            SessionStatus::Validated => "VALIDATED",
            SessionStatus::Importing => "IMPORTING",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 台账记录状态 (Record Status)
// ==========================================
// Pending → Valid/Warning/Error（规则引擎写回）
// Warning/Error → Fixed（操作员修复）
// 任意 → Skipped（user_action="skip"）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    Pending, // 待校验
    Valid,   // 校验通过
    Warning, // 校验通过（带警告）
    Error,   // 校验失败
    Fixed,   // 操作员已修复
    Skipped, // 操作员已排除
}

impl RecordStatus {
    /// 是否为规则引擎写回的终态（校验完成判定用）
    pub fn is_terminal_validation(&self) -> bool {
        matches!(
            self,
            RecordStatus::Valid | RecordStatus::Warning | RecordStatus::Error
        )
    }

    /// 状态本身是否具备导入资格（还需 user_action != "skip"）
    pub fn is_import_eligible(&self) -> bool {
        matches!(
            self,
            RecordStatus::Valid | RecordStatus::Warning | RecordStatus::Fixed
        )
    }

    /// 从数据库字符串解析状态
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(RecordStatus::Pending),
            "VALID" => Some(RecordStatus::Valid),
            "WARNING" => Some(RecordStatus::Warning),
            "ERROR" => Some(RecordStatus::Error),
            "FIXED" => Some(RecordStatus::Fixed),
            "SKIPPED" => Some(RecordStatus::Skipped),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "PENDING",
            RecordStatus::Valid => "VALID",
            RecordStatus::Warning => "WARNING",
            RecordStatus::Error => "ERROR",
            RecordStatus::Fixed => "FIXED",
            RecordStatus::Skipped => "SKIPPED",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 源系统类型 (Source Type)
// ==========================================
// 会话来源的 ERP/格式族，仅作展示与审计，不参与算法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    Logo,          // Logo 系列
    Netsis,        // Netsis 系列
    Mikro,         // Mikro 系列
    Eta,           // ETA 系列
    ExcelTemplate, // 标准 Excel 模板
    CsvExport,     // 通用 CSV 导出
    Other,         // 其他
}

impl SourceType {
    /// 从数据库字符串解析来源类型（未知值归入 Other）
    pub fn from_db_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "LOGO" => SourceType::Logo,
            "NETSIS" => SourceType::Netsis,
            "MIKRO" => SourceType::Mikro,
            "ETA" => SourceType::Eta,
            "EXCEL_TEMPLATE" => SourceType::ExcelTemplate,
            "CSV_EXPORT" => SourceType::CsvExport,
            _ => SourceType::Other,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            SourceType::Logo => "LOGO",
            SourceType::Netsis => "NETSIS",
            SourceType::Mikro => "MIKRO",
            SourceType::Eta => "ETA",
            SourceType::ExcelTemplate => "EXCEL_TEMPLATE",
            SourceType::CsvExport => "CSV_EXPORT",
            SourceType::Other => "OTHER",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 实体类型 (Entity Type)
// ==========================================
// 一个会话可同时包含多种实体；映射建议按实体类型独立计算
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Product,         // 产品
    Customer,        // 客户
    Supplier,        // 供应商
    Category,        // 分类
    Brand,           // 品牌
    Unit,            // 计量单位
    Warehouse,       // 仓库
    Stock,           // 库存
    StockMovement,   // 库存流水
    OpeningBalance,  // 期初余额
    Invoice,         // 发票
    InvoiceItem,     // 发票明细
    AccountingEntry, // 会计凭证
    PriceList,       // 价格表
}

impl EntityType {
    /// 从外部请求 token 解析实体类型（大小写/下划线不敏感）
    ///
    /// 接受 "Product"、"product"、"STOCK_MOVEMENT"、"StockMovement" 等写法；
    /// 未知 token 返回 None，由调用方转为 Validation 错误。
    pub fn parse_token(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "product" => Some(EntityType::Product),
            "customer" => Some(EntityType::Customer),
            "supplier" => Some(EntityType::Supplier),
            "category" => Some(EntityType::Category),
            "brand" => Some(EntityType::Brand),
            "unit" => Some(EntityType::Unit),
            "warehouse" => Some(EntityType::Warehouse),
            "stock" => Some(EntityType::Stock),
            "stockmovement" => Some(EntityType::StockMovement),
            "openingbalance" => Some(EntityType::OpeningBalance),
            "invoice" => Some(EntityType::Invoice),
            "invoiceitem" => Some(EntityType::InvoiceItem),
            "accountingentry" => Some(EntityType::AccountingEntry),
            "pricelist" => Some(EntityType::PriceList),
            _ => None,
        }
    }

    /// 从数据库字符串解析实体类型
    pub fn from_db_str(s: &str) -> Option<Self> {
        Self::parse_token(s)
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            EntityType::Product => "PRODUCT",
            EntityType::Customer => "CUSTOMER",
            EntityType::Supplier => "SUPPLIER",
            EntityType::Category => "CATEGORY",
            EntityType::Brand => "BRAND",
            EntityType::Unit => "UNIT",
            EntityType::Warehouse => "WAREHOUSE",
            EntityType::Stock => "STOCK",
            EntityType::StockMovement => "STOCK_MOVEMENT",
            EntityType::OpeningBalance => "OPENING_BALANCE",
            EntityType::Invoice => "INVOICE",
            EntityType::InvoiceItem => "INVOICE_ITEM",
            EntityType::AccountingEntry => "ACCOUNTING_ENTRY",
            EntityType::PriceList => "PRICE_LIST",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}
