//! 测量值分类
//!
//! 血压、BMI、SpO2的医学分级与检查值判定。阈值与显示标签遵循
//! 日本临床标准（血压为JSH2019家庭血压基准，BMI为日本肥満学会基准），
//! 显示标签为界面语言（日文）。

use chrono::{Datelike, NaiveDate};
use emr_core::models::Judgment;

use crate::stats::round1;

/// 血压分级，按严重程度从低到高排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BloodPressureCategory {
    Normal,
    HighNormal,
    Elevated,
    Grade1,
    Grade2,
    Grade3,
}

impl BloodPressureCategory {
    pub fn label(&self) -> &'static str {
        match self {
            BloodPressureCategory::Normal => "正常血圧",
            BloodPressureCategory::HighNormal => "正常高値血圧",
            BloodPressureCategory::Elevated => "高値血圧",
            BloodPressureCategory::Grade1 => "I度高血圧",
            BloodPressureCategory::Grade2 => "II度高血圧",
            BloodPressureCategory::Grade3 => "III度高血圧",
        }
    }
}

/// 血压分级：收缩压与舒张压任一达到阈值即归入该级，从最重一级起判定
pub fn classify_blood_pressure(systolic: f64, diastolic: f64) -> BloodPressureCategory {
    if systolic >= 160.0 || diastolic >= 100.0 {
        BloodPressureCategory::Grade3
    } else if systolic >= 145.0 || diastolic >= 90.0 {
        BloodPressureCategory::Grade2
    } else if systolic >= 135.0 || diastolic >= 85.0 {
        BloodPressureCategory::Grade1
    } else if systolic >= 125.0 || diastolic >= 75.0 {
        BloodPressureCategory::Elevated
    } else if systolic >= 115.0 {
        BloodPressureCategory::HighNormal
    } else {
        BloodPressureCategory::Normal
    }
}

/// BMI分级（日本肥満学会基准）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Obese1,
    Obese2,
    Obese3,
    Obese4,
}

impl BmiCategory {
    pub fn label(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "低体重（やせ）",
            BmiCategory::Normal => "普通体重",
            BmiCategory::Obese1 => "肥満（1度）",
            BmiCategory::Obese2 => "肥満（2度）",
            BmiCategory::Obese3 => "肥満（3度）",
            BmiCategory::Obese4 => "肥満（4度）",
        }
    }
}

/// BMI计算结果：`bmi`为显示用的1位小数舍入值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BmiAssessment {
    pub bmi: f64,
    pub category: BmiCategory,
}

/// BMI计算与分级，体重(kg)与身高(cm)缺一则返回None
///
/// 分级在未舍入的原值上判定，显示值另行舍入到1位小数。
pub fn classify_bmi(weight: Option<f64>, height: Option<f64>) -> Option<BmiAssessment> {
    let weight = weight?;
    let height = height?;
    let height_m = height / 100.0;
    let bmi = weight / (height_m * height_m);
    let category = if bmi < 18.5 {
        BmiCategory::Underweight
    } else if bmi < 25.0 {
        BmiCategory::Normal
    } else if bmi < 30.0 {
        BmiCategory::Obese1
    } else if bmi < 35.0 {
        BmiCategory::Obese2
    } else if bmi < 40.0 {
        BmiCategory::Obese3
    } else {
        BmiCategory::Obese4
    };
    Some(BmiAssessment {
        bmi: round1(bmi),
        category,
    })
}

/// SpO2分级，按严重程度从低到高排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Spo2Level {
    Normal,
    Mild,
    Moderate,
    Severe,
}

impl Spo2Level {
    pub fn label(&self) -> &'static str {
        match self {
            Spo2Level::Normal => "正常",
            Spo2Level::Mild => "軽度低下",
            Spo2Level::Moderate => "中等度低下",
            Spo2Level::Severe => "重度低下",
        }
    }

    /// 界面显示用的等级标识
    pub fn level(&self) -> &'static str {
        match self {
            Spo2Level::Normal => "normal",
            Spo2Level::Mild => "caution",
            Spo2Level::Moderate => "warning",
            Spo2Level::Severe => "danger",
        }
    }
}

pub fn classify_spo2(spo2: Option<f64>) -> Option<Spo2Level> {
    let spo2 = spo2?;
    let level = if spo2 >= 96.0 {
        Spo2Level::Normal
    } else if spo2 >= 91.0 {
        Spo2Level::Mild
    } else if spo2 >= 86.0 {
        Spo2Level::Moderate
    } else {
        Spo2Level::Severe
    };
    Some(level)
}

/// 按生日计算周岁：当年生日未到则减一岁
pub fn calc_age(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

/// 检查值自动判定
///
/// 值无法解析为数值、或基准值上下限均缺失时不判定（None）。
/// 超出基准范围为异常；落在距基准边界10%幅度以内为要注意；其余为正常。
/// 幅度取基准范围的10%，单边基准时取该边界绝对值的10%。
pub fn judge_lab_value(
    value: &str,
    reference_min: Option<f64>,
    reference_max: Option<f64>,
) -> Option<Judgment> {
    let num: f64 = value.trim().parse().ok()?;
    if reference_min.is_none() && reference_max.is_none() {
        return None;
    }

    if let Some(min) = reference_min {
        if num < min {
            return Some(Judgment::Abnormal);
        }
    }
    if let Some(max) = reference_max {
        if num > max {
            return Some(Judgment::Abnormal);
        }
    }

    if let Some(min) = reference_min {
        let margin = match reference_max {
            Some(max) => (max - min) * 0.1,
            None => min.abs() * 0.1,
        };
        if num < min + margin {
            return Some(Judgment::Caution);
        }
    }
    if let Some(max) = reference_max {
        let margin = match reference_min {
            Some(min) => (max - min) * 0.1,
            None => max.abs() * 0.1,
        };
        if num > max - margin {
            return Some(Judgment::Caution);
        }
    }

    Some(Judgment::Normal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blood_pressure_boundaries() {
        assert_eq!(
            classify_blood_pressure(114.0, 74.0),
            BloodPressureCategory::Normal
        );
        assert_eq!(
            classify_blood_pressure(115.0, 74.0),
            BloodPressureCategory::HighNormal
        );
        assert_eq!(
            classify_blood_pressure(125.0, 74.0),
            BloodPressureCategory::Elevated
        );
        assert_eq!(
            classify_blood_pressure(114.0, 75.0),
            BloodPressureCategory::Elevated
        );
        assert_eq!(
            classify_blood_pressure(135.0, 80.0),
            BloodPressureCategory::Grade1
        );
        assert_eq!(
            classify_blood_pressure(120.0, 85.0),
            BloodPressureCategory::Grade1
        );
        assert_eq!(
            classify_blood_pressure(145.0, 80.0),
            BloodPressureCategory::Grade2
        );
        assert_eq!(
            classify_blood_pressure(120.0, 90.0),
            BloodPressureCategory::Grade2
        );
        assert_eq!(
            classify_blood_pressure(160.0, 80.0),
            BloodPressureCategory::Grade3
        );
        assert_eq!(
            classify_blood_pressure(120.0, 100.0),
            BloodPressureCategory::Grade3
        );
    }

    #[test]
    fn test_blood_pressure_labels() {
        assert_eq!(classify_blood_pressure(110.0, 70.0).label(), "正常血圧");
        assert_eq!(classify_blood_pressure(118.0, 70.0).label(), "正常高値血圧");
        assert_eq!(classify_blood_pressure(128.0, 78.0).label(), "高値血圧");
        assert_eq!(classify_blood_pressure(138.0, 86.0).label(), "I度高血圧");
        assert_eq!(classify_blood_pressure(150.0, 95.0).label(), "II度高血圧");
        assert_eq!(classify_blood_pressure(180.0, 110.0).label(), "III度高血圧");
    }

    #[test]
    fn test_blood_pressure_monotonic_in_systolic() {
        let mut prev = classify_blood_pressure(80.0, 70.0);
        for sys in 80..=220 {
            let current = classify_blood_pressure(sys as f64, 70.0);
            assert!(current >= prev, "category regressed at systolic {}", sys);
            prev = current;
        }
    }

    #[test]
    fn test_bmi_classification() {
        let normal = classify_bmi(Some(65.0), Some(170.0)).unwrap();
        assert_eq!(normal.bmi, 22.5);
        assert_eq!(normal.category, BmiCategory::Normal);
        assert_eq!(normal.category.label(), "普通体重");

        let under = classify_bmi(Some(45.0), Some(170.0)).unwrap();
        assert_eq!(under.bmi, 15.6);
        assert_eq!(under.category, BmiCategory::Underweight);

        let obese1 = classify_bmi(Some(80.0), Some(170.0)).unwrap();
        assert_eq!(obese1.bmi, 27.7);
        assert_eq!(obese1.category, BmiCategory::Obese1);

        let obese2 = classify_bmi(Some(95.0), Some(170.0)).unwrap();
        assert_eq!(obese2.bmi, 32.9);
        assert_eq!(obese2.category, BmiCategory::Obese2);
    }

    #[test]
    fn test_bmi_requires_both_inputs() {
        assert!(classify_bmi(None, Some(170.0)).is_none());
        assert!(classify_bmi(Some(65.0), None).is_none());
        assert!(classify_bmi(None, None).is_none());
    }

    #[test]
    fn test_bmi_classifies_on_unrounded_value() {
        // 未舍入BMI为24.958…：显示值进位到25.0，分级仍为普通体重
        let assessment = classify_bmi(Some(72.13), Some(170.0)).unwrap();
        assert_eq!(assessment.bmi, 25.0);
        assert_eq!(assessment.category, BmiCategory::Normal);
    }

    #[test]
    fn test_spo2_levels() {
        assert_eq!(classify_spo2(Some(98.0)), Some(Spo2Level::Normal));
        assert_eq!(classify_spo2(Some(96.0)), Some(Spo2Level::Normal));
        assert_eq!(classify_spo2(Some(95.0)), Some(Spo2Level::Mild));
        assert_eq!(classify_spo2(Some(91.0)), Some(Spo2Level::Mild));
        assert_eq!(classify_spo2(Some(90.0)), Some(Spo2Level::Moderate));
        assert_eq!(classify_spo2(Some(86.0)), Some(Spo2Level::Moderate));
        assert_eq!(classify_spo2(Some(85.0)), Some(Spo2Level::Severe));
        assert_eq!(classify_spo2(None), None);

        assert_eq!(Spo2Level::Mild.label(), "軽度低下");
        assert_eq!(Spo2Level::Mild.level(), "caution");
        assert_eq!(Spo2Level::Severe.level(), "danger");
    }

    #[test]
    fn test_calc_age_around_birthday() {
        let birth = NaiveDate::from_ymd_opt(1975, 2, 17).unwrap();
        let on_birthday = NaiveDate::from_ymd_opt(2026, 2, 17).unwrap();
        let day_before = NaiveDate::from_ymd_opt(2026, 2, 16).unwrap();
        let later_month = NaiveDate::from_ymd_opt(2026, 4, 15).unwrap();

        assert_eq!(calc_age(birth, on_birthday), 51);
        assert_eq!(calc_age(birth, day_before), 50);
        assert_eq!(calc_age(birth, later_month), 51);

        let spring_birth = NaiveDate::from_ymd_opt(1975, 4, 20).unwrap();
        assert_eq!(calc_age(spring_birth, later_month), 50);
    }

    #[test]
    fn test_judge_lab_value_with_both_bounds() {
        // 白血球数，基准值3300-8600，margin=530
        let min = Some(3300.0);
        let max = Some(8600.0);
        assert_eq!(judge_lab_value("5800", min, max), Some(Judgment::Normal));
        assert_eq!(judge_lab_value("3500", min, max), Some(Judgment::Caution));
        assert_eq!(judge_lab_value("8100", min, max), Some(Judgment::Caution));
        assert_eq!(judge_lab_value("3000", min, max), Some(Judgment::Abnormal));
        assert_eq!(judge_lab_value("9700", min, max), Some(Judgment::Abnormal));
        assert_eq!(judge_lab_value(" 5800 ", min, max), Some(Judgment::Normal));
    }

    #[test]
    fn test_judge_lab_value_single_bound() {
        // 仅有下限：margin = |10| * 0.1 = 1
        assert_eq!(
            judge_lab_value("10.5", Some(10.0), None),
            Some(Judgment::Caution)
        );
        assert_eq!(
            judge_lab_value("12", Some(10.0), None),
            Some(Judgment::Normal)
        );
        assert_eq!(
            judge_lab_value("9", Some(10.0), None),
            Some(Judgment::Abnormal)
        );

        // 仅有上限：margin = |100| * 0.1 = 10
        assert_eq!(
            judge_lab_value("95", None, Some(100.0)),
            Some(Judgment::Caution)
        );
        assert_eq!(
            judge_lab_value("85", None, Some(100.0)),
            Some(Judgment::Normal)
        );
        assert_eq!(
            judge_lab_value("101", None, Some(100.0)),
            Some(Judgment::Abnormal)
        );
    }

    #[test]
    fn test_judge_lab_value_undecidable() {
        assert_eq!(judge_lab_value("陽性", Some(0.0), Some(1.0)), None);
        assert_eq!(judge_lab_value("", Some(0.0), Some(1.0)), None);
        assert_eq!(judge_lab_value("5800", None, None), None);
    }
}
