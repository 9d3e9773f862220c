// ==========================================
// ERP 数据迁移系统 - 别名字典
// ==========================================
// 职责: 目标字段名 → 遗留系统源列名同义词表（只读领域夹具）
// 红线: 不可变、构造注入，不做模块级单例（并行安全 + 可测）
// 红线: 条目与别名均保持插入顺序，映射结果必须确定
// ==========================================

/// 别名字典（目标字段 → 已知源列同义词，有序）
#[derive(Debug, Clone)]
pub struct AliasDictionary {
    entries: Vec<(String, Vec<String>)>,
}

impl AliasDictionary {
    /// 从有序条目构造字典
    pub fn from_entries(entries: Vec<(&str, Vec<&str>)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(target, aliases)| {
                    (
                        target.to_string(),
                        aliases.into_iter().map(|a| a.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }

    /// 查询目标字段的别名列表（大小写不敏感，保持插入顺序）
    pub fn aliases_for(&self, target_field: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(target, _)| target.eq_ignore_ascii_case(target_field))
            .map(|(_, aliases)| aliases.as_slice())
    }

    /// 条目数（测试用）
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 内置别名表
    ///
    /// 内容为各遗留 ERP 导出文件常见列名（历史积累的领域夹具），
    /// 顺序即匹配顺序，调整顺序会改变部分匹配的命中结果。
    pub fn builtin() -> Self {
        Self::from_entries(vec![
            (
                "Code",
                vec![
                    "KOD", "STOK_KODU", "MALZEME_KODU", "CARI_KOD", "URUN_KODU", "STOKKOD",
                    "CARIKOD", "CODE",
                ],
            ),
            (
                "Name",
                vec![
                    "AD", "ACIKLAMA", "STOK_ADI", "MALZEME_ADI", "CARI_ADI", "URUN_ADI",
                    "STOKADI", "CARIAD", "NAME", "ISIM",
                ],
            ),
            ("Description", vec!["ACIKLAMA", "TANIM", "DESCRIPTION", "DETAY"]),
            ("Barcode", vec!["BARKOD", "BARCODE", "EAN", "UPC"]),
            ("Unit", vec!["BIRIM", "OLCU_BIRIMI", "UNIT", "BR"]),
            ("VatRate", vec!["KDV", "KDV_ORANI", "VERGI_ORANI", "VAT", "TAX_RATE"]),
            (
                "PurchasePrice",
                vec!["ALIS_FIYATI", "MALIYET", "ALIS", "COST", "PURCHASE_PRICE"],
            ),
            (
                "SalePrice",
                vec!["SATIS_FIYATI", "FIYAT", "SATIS", "PRICE", "SALE_PRICE"],
            ),
            (
                "TaxNumber",
                vec!["VERGI_NO", "VKN", "TCKN", "TAX_NUMBER", "VERGINO"],
            ),
            (
                "TaxOffice",
                vec!["VERGI_DAIRESI", "VD", "TAX_OFFICE", "VERGIDAIRESI"],
            ),
            ("Phone", vec!["TELEFON", "TEL", "PHONE", "GSM", "MOBIL"]),
            ("Email", vec!["EPOSTA", "EMAIL", "MAIL"]),
            ("Address", vec!["ADRES", "ADDRESS", "ADRES1", "ADRES2"]),
            ("City", vec!["IL", "SEHIR", "CITY"]),
            ("District", vec!["ILCE", "DISTRICT"]),
            ("Quantity", vec!["MIKTAR", "ADET", "QUANTITY", "QTY"]),
            ("Date", vec!["TARIH", "DATE", "ISLEM_TARIHI"]),
            (
                "CategoryCode",
                vec!["KATEGORI_KOD", "GRUP_KOD", "CATEGORY", "CATEGORY_CODE"],
            ),
            (
                "WarehouseCode",
                vec!["DEPO_KOD", "DEPO", "WAREHOUSE", "WAREHOUSE_CODE"],
            ),
            (
                "ProductCode",
                vec!["STOK_KODU", "URUN_KODU", "PRODUCT_CODE", "STOKKOD"],
            ),
            (
                "BrandCode",
                vec!["MARKA_KODU", "MARKA_KOD", "BRAND_CODE", "MARKAKOD"],
            ),
            ("BrandName", vec!["MARKA_ADI", "MARKA", "BRAND_NAME", "BRAND"]),
            (
                "UnitCode",
                vec!["BIRIM_KODU", "BIRIM_KOD", "UNIT_CODE", "BIRIMKOD"],
            ),
            ("UnitName", vec!["BIRIM_ADI", "BIRIM", "UNIT_NAME"]),
            (
                "InvoiceNo",
                vec!["FATURA_NO", "FATURANO", "INVOICE_NO", "BELGE_NO", "BELGENO"],
            ),
            (
                "InvoiceType",
                vec!["FATURA_TIPI", "FATURATIPI", "INVOICE_TYPE", "TIP", "HAREKET_TIPI"],
            ),
            (
                "CustomerCode",
                vec!["CARI_KOD", "CARIKOD", "MUSTERI_KOD", "CUSTOMER_CODE"],
            ),
            ("DueDate", vec!["VADE_TARIHI", "VADE", "DUE_DATE", "VADETARIHI"]),
            (
                "TotalAmount",
                vec!["TOPLAM", "TOPLAM_TUTAR", "TOTAL", "TOTAL_AMOUNT", "GENEL_TOPLAM"],
            ),
            ("VatAmount", vec!["KDV_TUTARI", "KDV", "VAT_AMOUNT", "KDVTUTAR"]),
            (
                "DiscountAmount",
                vec!["ISKONTO_TUTARI", "ISKONTO", "DISCOUNT", "INDIRIM"],
            ),
            (
                "UnitPrice",
                vec!["BIRIM_FIYAT", "BIRIMFIYAT", "UNIT_PRICE", "FIYAT"],
            ),
            (
                "DiscountRate",
                vec!["ISKONTO_ORANI", "ISKONTOORANI", "DISCOUNT_RATE"],
            ),
            (
                "TotalPrice",
                vec!["SATIR_TOPLAMI", "SATIRTOPLAM", "LINE_TOTAL", "TUTAR"],
            ),
            ("EntryNo", vec!["FIS_NO", "FISNO", "YEVMIYE_NO", "ENTRY_NO"]),
            (
                "AccountCode",
                vec!["HESAP_KODU", "HESAPKODU", "ACCOUNT_CODE", "MUHASEBE_KODU"],
            ),
            ("Debit", vec!["BORC", "DEBIT"]),
            ("Credit", vec!["ALACAK", "CREDIT"]),
            (
                "DocumentNo",
                vec!["BELGE_NO", "BELGENO", "DOCUMENT_NO", "EVRAK_NO"],
            ),
            (
                "DocumentType",
                vec!["BELGE_TIPI", "BELGETIPI", "DOCUMENT_TYPE", "EVRAK_TIPI"],
            ),
            (
                "LotNumber",
                vec!["LOT_NO", "PARTI_NO", "LOT_NUMBER", "SERI_NO"],
            ),
            (
                "ExpiryDate",
                vec!["SKT", "SON_KULLANMA", "EXPIRY_DATE", "MIAD"],
            ),
            (
                "PriceListCode",
                vec!["FIYAT_LISTESI", "LISTE_KODU", "PRICE_LIST", "FIYATLISTESI"],
            ),
            (
                "Currency",
                vec!["DOVIZ", "PARA_BIRIMI", "CURRENCY", "DOVIZ_KODU"],
            ),
            (
                "MovementType",
                vec!["HAREKET_TIPI", "HAREKETTIPI", "MOVEMENT_TYPE", "ISLEM_TIPI"],
            ),
            ("UnitCost", vec!["BIRIM_MALIYET", "MALIYET", "UNIT_COST"]),
            ("MinStock", vec!["MIN_STOK", "MINIMUM_STOK", "MIN_STOCK"]),
            ("MaxStock", vec!["MAX_STOK", "MAKSIMUM_STOK", "MAX_STOCK"]),
            (
                "CreditLimit",
                vec!["KREDI_LIMITI", "KREDI_LIMIT", "CREDIT_LIMIT", "LIMIT"],
            ),
            ("ParentCode", vec!["UST_KATEGORI", "UST_KOD", "PARENT_CODE"]),
            ("IsDefault", vec!["VARSAYILAN", "IS_DEFAULT"]),
            ("LineNo", vec!["SATIR_NO", "SATIRNO", "LINE_NO"]),
            ("Price", vec!["FIYAT", "PRICE", "LISTE_FIYATI"]),
            ("ValidFrom", vec!["BASLANGIC_TARIHI", "VALID_FROM", "GECERLILIK_BASLANGICI"]),
            ("ValidTo", vec!["BITIS_TARIHI", "VALID_TO", "GECERLILIK_BITISI"]),
        ])
    }
}

impl Default for AliasDictionary {
    fn default() -> Self {
        Self::builtin()
    }
}
