//! 录入校验
//!
//! 各实体的录入规则校验。错误消息为界面语言（日文），
//! 消息顺序与录入界面的提示顺序一致。

use chrono::NaiveDate;
use emr_core::models::{NewLabResult, NewPatient, NewPrescription, Soap, Vitals};
use emr_core::{EmrError, Result};
use serde_json::Value;

use crate::classify::calc_age;

/// 校验结果：按规则顺序累积错误消息
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub is_valid: bool,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            is_valid: true,
        }
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.is_valid = false;
    }

    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }

    /// 转换为Result，首条错误消息映射为Validation错误
    pub fn into_result(self) -> Result<()> {
        if self.is_valid {
            Ok(())
        } else {
            Err(EmrError::Validation(
                self.errors.into_iter().next().unwrap_or_default(),
            ))
        }
    }

    pub fn summary(&self) -> String {
        if self.is_valid {
            "验证通过".to_string()
        } else {
            format!("验证失败: {} 个错误", self.errors.len())
        }
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// 患者信息校验
///
/// 出生日期与性别的必填及格式由类型保证，此处仅校验取值范围。
pub fn validate_patient(patient: &NewPatient, today: NaiveDate) -> ValidationReport {
    let mut report = ValidationReport::new();

    // 姓名：必填，100字以内
    if patient.name.trim().is_empty() {
        report.add_error("氏名を入力してください");
    } else if patient.name.chars().count() > 100 {
        report.add_error("氏名は100文字以内で入力してください");
    }

    // 出生日期：须为过去日期，0-150岁
    if patient.birth_date > today {
        report.add_error("生年月日は過去の日付を入力してください");
    } else if calc_age(patient.birth_date, today) > 150 {
        report.add_error("生年月日が有効範囲外です（0〜150歳）");
    }

    // 假名读音：可选，仅限平假名、长音符与空白，100字以内
    if let Some(kana) = patient.name_kana.as_deref() {
        if !kana.is_empty() {
            if !kana.chars().all(is_kana_char) {
                report.add_error("ふりがなはひらがなで入力してください");
            } else if kana.chars().count() > 100 {
                report.add_error("ふりがなは100文字以内で入力してください");
            }
        }
    }

    // 电话号码：可选，仅限半角数字与连字符，7-15字符
    if let Some(phone) = patient.phone.as_deref() {
        if !phone.is_empty() {
            if !phone.chars().all(|c| c.is_ascii_digit() || c == '-') {
                report.add_error("電話番号は半角数字とハイフンで入力してください");
            } else if phone.len() < 7 || phone.len() > 15 {
                report.add_error("電話番号は7〜15文字で入力してください");
            }
        }
    }

    report
}

fn is_kana_char(c: char) -> bool {
    ('\u{3040}'..='\u{309F}').contains(&c) || c == 'ー' || c.is_whitespace()
}

/// 生命体征校验
pub fn validate_vitals(vitals: &Vitals) -> ValidationReport {
    let mut report = ValidationReport::new();

    check_range(
        &mut report,
        vitals.temperature,
        34.0,
        42.0,
        "体温は34.0〜42.0の範囲で入力してください",
    );
    check_range(
        &mut report,
        vitals.systolic,
        50.0,
        300.0,
        "収縮期血圧は50〜300の範囲で入力してください",
    );
    check_range(
        &mut report,
        vitals.diastolic,
        30.0,
        200.0,
        "拡張期血圧は30〜200の範囲で入力してください",
    );

    // 收缩压 > 舒张压（仅当两者各自在范围内时判定）
    if let (Some(sys), Some(dia)) = (vitals.systolic, vitals.diastolic) {
        if (50.0..=300.0).contains(&sys) && (30.0..=200.0).contains(&dia) && sys <= dia {
            report.add_error("収縮期血圧は拡張期血圧より大きい値を入力してください");
        }
    }

    check_range(
        &mut report,
        vitals.pulse,
        20.0,
        300.0,
        "脈拍は20〜300の範囲で入力してください",
    );
    check_range(
        &mut report,
        vitals.spo2,
        50.0,
        100.0,
        "SpO2は50〜100の範囲で入力してください",
    );
    check_range(
        &mut report,
        vitals.respiratory_rate,
        1.0,
        60.0,
        "呼吸数は1〜60の範囲で入力してください",
    );
    check_range(
        &mut report,
        vitals.weight,
        1.0,
        300.0,
        "体重は1.0〜300.0の範囲で入力してください",
    );
    check_range(
        &mut report,
        vitals.height,
        30.0,
        250.0,
        "身長は30〜250の範囲で入力してください",
    );

    report
}

fn check_range(report: &mut ValidationReport, value: Option<f64>, min: f64, max: f64, message: &str) {
    if let Some(v) = value {
        if v.is_nan() || v < min || v > max {
            report.add_error(message);
        }
    }
}

/// SOAP记录校验
pub fn validate_soap(soap: &Soap) -> ValidationReport {
    let mut report = ValidationReport::new();
    let fields = [
        (&soap.subjective, "S"),
        (&soap.objective, "O"),
        (&soap.assessment, "A"),
        (&soap.plan, "P"),
    ];

    let has_any = fields
        .iter()
        .any(|(text, _)| text.as_deref().map_or(false, |t| !t.trim().is_empty()));
    if !has_any {
        report.add_error("S/O/A/Pのいずれか1つ以上を入力してください");
    }

    for (text, label) in fields {
        if let Some(t) = text {
            if t.chars().count() > 2000 {
                report.add_error(format!("{}は2000文字以内で入力してください", label));
            }
        }
    }

    report
}

/// 处方校验
pub fn validate_prescription(prescription: &NewPrescription) -> ValidationReport {
    let mut report = ValidationReport::new();

    // 药品名：必填，200字以内
    if prescription.medicine.trim().is_empty() {
        report.add_error("薬剤名を入力してください");
    } else if prescription.medicine.chars().count() > 200 {
        report.add_error("薬剤名は200文字以内で入力してください");
    }

    // 处方日数：可选，1-365
    if let Some(days) = prescription.days {
        if !(1..=365).contains(&days) {
            report.add_error("処方日数は1〜365の整数で入力してください");
        }
    }

    report
}

/// 检查结果校验
///
/// 检查类别的取值由类型保证。
pub fn validate_lab_result(lab: &NewLabResult) -> ValidationReport {
    let mut report = ValidationReport::new();

    // 检查项目名：必填，200字以内
    if lab.item_name.trim().is_empty() {
        report.add_error("検査項目名を入力してください");
    } else if lab.item_name.chars().count() > 200 {
        report.add_error("検査項目名は200文字以内で入力してください");
    }

    // 检查值：必填，100字以内
    if lab.value.trim().is_empty() {
        report.add_error("検査値を入力してください");
    } else if lab.value.chars().count() > 100 {
        report.add_error("検査値は100文字以内で入力してください");
    }

    report
}

/// 导入文件的信封校验，遇到首个违规即返回
pub fn validate_import_data(data: &Value) -> ValidationReport {
    let mut report = ValidationReport::new();

    let obj = match data.as_object() {
        Some(obj) => obj,
        None => {
            report.add_error("JSONオブジェクト形式ではありません");
            return report;
        }
    };

    if obj.get("appName").and_then(Value::as_str) != Some("emr") {
        report.add_error("このファイルはemr形式ではありません");
        return report;
    }

    let arrays = [
        ("patients", "patientsフィールドが不正です"),
        ("records", "recordsフィールドが不正です"),
        ("prescriptions", "prescriptionsフィールドが不正です"),
        ("labResults", "labResultsフィールドが不正です"),
    ];
    for (field, message) in arrays {
        if !obj.get(field).map_or(false, Value::is_array) {
            report.add_error(message);
            return report;
        }
    }

    report
}
