// ==========================================
// ERP 数据迁移系统 - 导入进度估算器
// ==========================================
// 职责: 从会话 + 台账聚合派生进度百分比与剩余时间估算
// 红线: 纯只读计算，每次调用重新估算（无缓存速率），不阻塞导入
// 口径: 线性外推，无平滑/滑动窗口
// ==========================================

use crate::domain::types::SessionStatus;
use crate::domain::MigrationSession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 导入进度视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportProgress {
    /// 可导记录数（status ∈ {VALID, WARNING, FIXED} 且未被排除）
    pub importable_count: i64,
    /// 已盖章记录数（imported_at 非空）
    pub imported_count: i64,
    /// 进度百分比（floor(100 × imported / importable)；无可导行时为 0）
    pub progress_percentage: i64,
    /// 预计剩余秒数（条件不足时为 None）
    pub estimated_seconds_remaining: Option<f64>,
}

// ==========================================
// ProgressEstimator - 进度估算器
// ==========================================
pub struct ProgressEstimator;

impl ProgressEstimator {
    /// 估算导入进度
    ///
    /// # 参数
    /// - session: 会话（读取 status / import_started_at）
    /// - importable_count / imported_count: 台账聚合计数
    /// - now: 估算时刻（显式传入，不读环境时钟）
    ///
    /// # 说明
    /// 剩余时间仅在满足全部条件时给出：
    /// status == Importing、import_started_at 已盖章、imported_count > 0、
    /// 速率为正。任何条件不满足都降级为 None，而不是报错。
    pub fn estimate(
        session: &MigrationSession,
        importable_count: i64,
        imported_count: i64,
        now: DateTime<Utc>,
    ) -> ImportProgress {
        let progress_percentage = if importable_count <= 0 {
            0
        } else {
            100 * imported_count / importable_count
        };

        let estimated_seconds_remaining = Self::estimate_remaining_seconds(
            session,
            importable_count,
            imported_count,
            now,
        );

        ImportProgress {
            importable_count,
            imported_count,
            progress_percentage,
            estimated_seconds_remaining,
        }
    }

    /// 线性外推剩余秒数
    fn estimate_remaining_seconds(
        session: &MigrationSession,
        importable_count: i64,
        imported_count: i64,
        now: DateTime<Utc>,
    ) -> Option<f64> {
        if session.status != SessionStatus::Importing {
            return None;
        }
        if importable_count <= 0 || imported_count <= 0 {
            return None;
        }
        let started_at = session.import_started_at?;

        let elapsed_secs = (now - started_at).num_milliseconds() as f64 / 1000.0;
        if elapsed_secs <= 0.0 {
            return None;
        }

        let rate = imported_count as f64 / elapsed_secs;
        if rate <= 0.0 {
            return None;
        }

        let remaining = (importable_count - imported_count) as f64 / rate;
        Some(remaining)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{EntityType, SourceType};
    use chrono::TimeZone;

    fn importing_session(started_at: DateTime<Utc>) -> MigrationSession {
        let mut s = MigrationSession::new(
            "s1".to_string(),
            "t1".to_string(),
            SourceType::Mikro,
            "stok.xlsx".to_string(),
            vec![EntityType::Product],
            started_at,
            None,
        );
        s.mark_uploaded().unwrap();
        s.begin_validation().unwrap();
        s.complete_validation(started_at).unwrap();
        s.begin_import(started_at).unwrap();
        s
    }

    #[test]
    fn test_linear_extrapolation() {
        // importable=200, imported=50, elapsed=100s → rate=0.5/s, remaining=300s, pct=25
        let start = Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap();
        let now = start + chrono::Duration::seconds(100);
        let session = importing_session(start);

        let progress = ProgressEstimator::estimate(&session, 200, 50, now);
        assert_eq!(progress.progress_percentage, 25);
        let remaining = progress.estimated_seconds_remaining.unwrap();
        assert!((remaining - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_importable_degrades_gracefully() {
        let start = Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap();
        let now = start + chrono::Duration::seconds(100);
        let session = importing_session(start);

        let progress = ProgressEstimator::estimate(&session, 0, 0, now);
        assert_eq!(progress.progress_percentage, 0);
        assert_eq!(progress.estimated_seconds_remaining, None);
    }

    #[test]
    fn test_no_eta_before_first_stamp() {
        let start = Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap();
        let now = start + chrono::Duration::seconds(5);
        let session = importing_session(start);

        let progress = ProgressEstimator::estimate(&session, 100, 0, now);
        assert_eq!(progress.progress_percentage, 0);
        assert_eq!(progress.estimated_seconds_remaining, None);
    }

    #[test]
    fn test_no_eta_outside_importing() {
        let start = Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap();
        let now = start + chrono::Duration::seconds(100);
        let mut session = importing_session(start);
        session.complete_import(now).unwrap();

        // Completed 状态仍给出百分比，但不再估算剩余时间
        let progress = ProgressEstimator::estimate(&session, 200, 200, now);
        assert_eq!(progress.progress_percentage, 100);
        assert_eq!(progress.estimated_seconds_remaining, None);
    }

    #[test]
    fn test_zero_elapsed_returns_none() {
        let start = Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap();
        let session = importing_session(start);

        // now == import_started_at：elapsed=0，速率未定义
        let progress = ProgressEstimator::estimate(&session, 200, 50, start);
        assert_eq!(progress.estimated_seconds_remaining, None);
    }

    #[test]
    fn test_percentage_floor_and_monotonic() {
        let start = Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap();
        let now = start + chrono::Duration::seconds(10);
        let session = importing_session(start);

        // floor(100×1/3) = 33
        let p = ProgressEstimator::estimate(&session, 3, 1, now);
        assert_eq!(p.progress_percentage, 33);

        // importable 固定时，imported 递增 → 百分比非降
        let mut last = -1;
        for imported in 0..=3 {
            let p = ProgressEstimator::estimate(&session, 3, imported, now);
            assert!(p.progress_percentage >= last);
            last = p.progress_percentage;
        }
        assert_eq!(last, 100);
    }
}
