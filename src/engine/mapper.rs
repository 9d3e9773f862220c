// ==========================================
// ERP 数据迁移系统 - 映射建议引擎
// ==========================================
// 职责: 源列 → 目标字段自动映射 + 置信度评分
// 红线: 纯函数、无共享可变状态，同输入必须产出逐字节相同结果
// 匹配顺序: 精确字段名 1.0 → 别名精确 0.95 → 别名部分 0.70 → 未命中
// ==========================================

use crate::domain::mapping::{AutoMappingResult, FieldMapping, SourceColumn, TargetField};
use crate::domain::types::EntityType;
use crate::engine::alias_dictionary::AliasDictionary;

// 置信度常量
const CONFIDENCE_EXACT: f64 = 1.0;
const CONFIDENCE_ALIAS_EXACT: f64 = 0.95;
const CONFIDENCE_ALIAS_PARTIAL: f64 = 0.70;

// 聚合权重: 必填字段覆盖率 0.6 + 已映射字段均值 0.4
const WEIGHT_REQUIRED_COVERAGE: f64 = 0.6;
const WEIGHT_AVG_CONFIDENCE: f64 = 0.4;

// ==========================================
// MappingEngine - 映射建议引擎
// ==========================================
// 别名字典构造注入（非全局单例），引擎实例可跨会话/实体并行复用
pub struct MappingEngine {
    aliases: AliasDictionary,
}

impl MappingEngine {
    /// 创建引擎实例
    pub fn new(aliases: AliasDictionary) -> Self {
        Self { aliases }
    }

    /// 使用内置别名表创建引擎实例
    pub fn with_builtin_aliases() -> Self {
        Self::new(AliasDictionary::builtin())
    }

    /// 生成整实体的自动映射建议
    ///
    /// # 参数
    /// - entity_type: 实体类型（仅透传到结果）
    /// - source_columns: 样本记录的源列集（按给定顺序扫描）
    /// - target_fields: 目标字段目录（有序）
    ///
    /// # 返回
    /// - AutoMappingResult: 每个目标字段一条建议（可能 source_field=None）+ 聚合置信度
    pub fn suggest(
        &self,
        entity_type: EntityType,
        source_columns: &[SourceColumn],
        target_fields: &[TargetField],
    ) -> AutoMappingResult {
        let column_names: Vec<&str> = source_columns.iter().map(|c| c.name.as_str()).collect();

        let suggested_mappings: Vec<FieldMapping> = target_fields
            .iter()
            .map(|field| {
                let matched = self.find_best_match(&column_names, &field.name);
                let confidence = matched
                    .map(|source| self.match_confidence(source, &field.name))
                    .unwrap_or(0.0);
                FieldMapping {
                    source_field: matched.map(|s| s.to_string()),
                    target_field: field.name.clone(),
                    confidence,
                }
            })
            .collect();

        let confidence_score = aggregate_confidence(&suggested_mappings, target_fields);

        AutoMappingResult {
            entity_type,
            source_columns: source_columns.to_vec(),
            target_fields: target_fields.to_vec(),
            suggested_mappings,
            confidence_score,
        }
    }

    /// 按解析顺序找最佳匹配源列（首个命中即停）
    fn find_best_match<'a>(&self, columns: &[&'a str], target_field: &str) -> Option<&'a str> {
        // 1. 精确字段名匹配
        if let Some(exact) = columns
            .iter()
            .copied()
            .find(|c| c.eq_ignore_ascii_case(target_field))
        {
            return Some(exact);
        }

        // 2/3. 逐别名：先精确再部分（别名顺序固定，结果确定）
        if let Some(aliases) = self.aliases.aliases_for(target_field) {
            for alias in aliases {
                if let Some(exact) = columns
                    .iter()
                    .copied()
                    .find(|c| c.eq_ignore_ascii_case(alias))
                {
                    return Some(exact);
                }
                if let Some(partial) = columns
                    .iter()
                    .copied()
                    .find(|c| contains_ignore_case(c, alias) || contains_ignore_case(alias, c))
                {
                    return Some(partial);
                }
            }
        }

        None
    }

    /// 已命中源列的置信度
    ///
    /// 注意用命中的"列本身"定级：部分匹配扫到的列若恰好全等于
    /// 某个别名，按别名精确 0.95 计，与原始评分口径一致。
    fn match_confidence(&self, source_field: &str, target_field: &str) -> f64 {
        if source_field.eq_ignore_ascii_case(target_field) {
            return CONFIDENCE_EXACT;
        }

        if let Some(aliases) = self.aliases.aliases_for(target_field) {
            if aliases.iter().any(|a| a.eq_ignore_ascii_case(source_field)) {
                return CONFIDENCE_ALIAS_EXACT;
            }
        }

        CONFIDENCE_ALIAS_PARTIAL
    }
}

/// 整实体聚合置信度
///
/// 0.6 × 必填覆盖率 + 0.4 × 已映射字段置信度均值；
/// 未映射字段不计入均值（不按 0 计）；无必填字段时覆盖率为 1.0；
/// 没有任何字段命中时聚合为 0。
fn aggregate_confidence(mappings: &[FieldMapping], target_fields: &[TargetField]) -> f64 {
    let mapped: Vec<&FieldMapping> = mappings
        .iter()
        .filter(|m| m.source_field.is_some())
        .collect();
    if mapped.is_empty() {
        return 0.0;
    }

    let required: Vec<&TargetField> = target_fields.iter().filter(|f| f.is_required).collect();
    let required_coverage = if required.is_empty() {
        1.0
    } else {
        let mapped_required = required
            .iter()
            .filter(|f| {
                mappings
                    .iter()
                    .any(|m| m.target_field == f.name && m.source_field.is_some())
            })
            .count();
        mapped_required as f64 / required.len() as f64
    };

    let avg_confidence =
        mapped.iter().map(|m| m.confidence).sum::<f64>() / mapped.len() as f64;

    WEIGHT_REQUIRED_COVERAGE * required_coverage + WEIGHT_AVG_CONFIDENCE * avg_confidence
}

/// 大小写不敏感的包含判定（ASCII 口径，与遗留列名字符集一致）
fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn columns(names: &[&str]) -> Vec<SourceColumn> {
        names
            .iter()
            .map(|n| SourceColumn {
                name: n.to_string(),
                sample_value: None,
            })
            .collect()
    }

    fn product_fields() -> Vec<TargetField> {
        vec![
            TargetField::new("Code", "Ürün Kodu", "string", true),
            TargetField::new("Name", "Ürün Adı", "string", true),
            TargetField::new("Barcode", "Barkod", "string", false),
        ]
    }

    #[test]
    fn test_legacy_columns_scenario() {
        // STOK_KODU/STOK_ADI 为别名精确命中 0.95，BARKOD1 为别名部分命中 0.70
        let engine = MappingEngine::with_builtin_aliases();
        let cols = columns(&["STOK_KODU", "STOK_ADI", "BARKOD1"]);
        let result = engine.suggest(EntityType::Product, &cols, &product_fields());

        let by_target = |t: &str| {
            result
                .suggested_mappings
                .iter()
                .find(|m| m.target_field == t)
                .unwrap()
        };

        assert_eq!(by_target("Code").source_field.as_deref(), Some("STOK_KODU"));
        assert!((by_target("Code").confidence - 0.95).abs() < EPS);
        assert_eq!(by_target("Name").source_field.as_deref(), Some("STOK_ADI"));
        assert!((by_target("Name").confidence - 0.95).abs() < EPS);
        assert_eq!(by_target("Barcode").source_field.as_deref(), Some("BARKOD1"));
        assert!((by_target("Barcode").confidence - 0.70).abs() < EPS);

        // 聚合 = 0.6×(2/2) + 0.4×((0.95+0.95+0.70)/3) ≈ 0.9467
        let expected = 0.6 + 0.4 * ((0.95 + 0.95 + 0.70) / 3.0);
        assert!((result.confidence_score - expected).abs() < EPS);
    }

    #[test]
    fn test_exact_field_name_match() {
        let engine = MappingEngine::with_builtin_aliases();
        let cols = columns(&["Code"]);
        let result = engine.suggest(
            EntityType::Product,
            &cols,
            &[TargetField::new("Code", "Ürün Kodu", "string", true)],
        );

        let m = &result.suggested_mappings[0];
        assert_eq!(m.source_field.as_deref(), Some("Code"));
        assert!((m.confidence - 1.0).abs() < EPS);
        // 覆盖率 1.0，均值 1.0 → 聚合 1.0
        assert!((result.confidence_score - 1.0).abs() < EPS);
    }

    #[test]
    fn test_no_match_yields_null_mapping_and_zero_score() {
        let engine = MappingEngine::with_builtin_aliases();
        let cols = columns(&["COLUMN_X", "COLUMN_Y"]);
        let result = engine.suggest(EntityType::Product, &cols, &product_fields());

        assert!(result
            .suggested_mappings
            .iter()
            .all(|m| m.source_field.is_none()));
        assert_eq!(result.confidence_score, 0.0);
    }

    #[test]
    fn test_unmapped_fields_excluded_from_average() {
        // Code 命中 0.95，Barcode 未命中：均值只按已映射字段算
        let engine = MappingEngine::with_builtin_aliases();
        let cols = columns(&["STOK_KODU"]);
        let fields = vec![
            TargetField::new("Code", "Ürün Kodu", "string", true),
            TargetField::new("Barcode", "Barkod", "string", false),
        ];
        let result = engine.suggest(EntityType::Product, &cols, &fields);

        // 覆盖率 1/1，均值 0.95（不是 0.475）
        let expected = 0.6 * 1.0 + 0.4 * 0.95;
        assert!((result.confidence_score - expected).abs() < EPS);
    }

    #[test]
    fn test_zero_required_fields_coverage_is_one() {
        let engine = MappingEngine::with_builtin_aliases();
        let cols = columns(&["BARKOD"]);
        let fields = vec![TargetField::new("Barcode", "Barkod", "string", false)];
        let result = engine.suggest(EntityType::Product, &cols, &fields);

        let expected = 0.6 * 1.0 + 0.4 * 0.95;
        assert!((result.confidence_score - expected).abs() < EPS);
    }

    #[test]
    fn test_first_match_wins_is_deterministic() {
        let engine = MappingEngine::with_builtin_aliases();
        // 两列都能命中 Code：扫描顺序决定取 KOD（别名序第一位）
        let cols = columns(&["STOK_KODU", "KOD"]);
        let fields = vec![TargetField::new("Code", "Ürün Kodu", "string", true)];

        let first = engine.suggest(EntityType::Product, &cols, &fields);
        // 别名 KOD 先于 STOK_KODU：精确命中列 "KOD"
        assert_eq!(
            first.suggested_mappings[0].source_field.as_deref(),
            Some("KOD")
        );

        // 同输入重复运行，结果逐字节一致
        for _ in 0..10 {
            let again = engine.suggest(EntityType::Product, &cols, &fields);
            assert_eq!(
                serde_json::to_string(&again.suggested_mappings).unwrap(),
                serde_json::to_string(&first.suggested_mappings).unwrap()
            );
            assert_eq!(again.confidence_score, first.confidence_score);
        }
    }

    #[test]
    fn test_partial_hit_that_equals_alias_scores_alias_exact() {
        // KDV_ORANI 被别名 KDV 的部分匹配扫中，但它本身就是 VatRate 的别名 → 0.95
        let engine = MappingEngine::with_builtin_aliases();
        let cols = columns(&["KDV_ORANI"]);
        let fields = vec![TargetField::new("VatRate", "KDV Oranı", "decimal", false)];
        let result = engine.suggest(EntityType::Product, &cols, &fields);

        let m = &result.suggested_mappings[0];
        assert_eq!(m.source_field.as_deref(), Some("KDV_ORANI"));
        assert!((m.confidence - 0.95).abs() < EPS);
    }
}
