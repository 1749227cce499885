//! 通用工具函数

use chrono::{DateTime, Utc};

/// 生成快照导出文件名 (emr_export_YYYYMMDD_HHMMSS.json)
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("emr_export_{}.json", now.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_export_file_name() {
        let ts = Utc.with_ymd_and_hms(2026, 2, 17, 9, 5, 30).unwrap();
        assert_eq!(export_file_name(ts), "emr_export_20260217_090530.json");
    }
}
