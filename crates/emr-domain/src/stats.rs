//! 生命体征统计
//!
//! 对一组诊疗记录按固定项目汇总平均值、最小值、最大值。
//! 项目列表与界面图表一致（身长不参与汇总）。

use emr_core::models::{Record, Vitals};

/// 单项汇总：无任何观测值时三项均为None
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatSummary {
    pub avg: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// 全项目汇总结果
#[derive(Debug, Clone, Default)]
pub struct VitalStats {
    pub temperature: StatSummary,
    pub systolic: StatSummary,
    pub diastolic: StatSummary,
    pub pulse: StatSummary,
    pub spo2: StatSummary,
    pub respiratory_rate: StatSummary,
    pub weight: StatSummary,
}

/// 逐项汇总诊疗记录中的生命体征
///
/// 平均值舍入到1位小数，最小值与最大值保留原值。
pub fn vital_stats(records: &[Record]) -> VitalStats {
    VitalStats {
        temperature: summarize(records, |v| v.temperature),
        systolic: summarize(records, |v| v.systolic),
        diastolic: summarize(records, |v| v.diastolic),
        pulse: summarize(records, |v| v.pulse),
        spo2: summarize(records, |v| v.spo2),
        respiratory_rate: summarize(records, |v| v.respiratory_rate),
        weight: summarize(records, |v| v.weight),
    }
}

fn summarize(records: &[Record], field: impl Fn(&Vitals) -> Option<f64>) -> StatSummary {
    let values: Vec<f64> = records
        .iter()
        .filter_map(|r| field(&r.vitals))
        .filter(|v| !v.is_nan())
        .collect();
    if values.is_empty() {
        return StatSummary::default();
    }

    let sum: f64 = values.iter().sum();
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    StatSummary {
        avg: Some(round1(sum / values.len() as f64)),
        min: Some(min),
        max: Some(max),
    }
}

/// 舍入到1位小数（四舍五入）
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
