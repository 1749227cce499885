//! # EMR 领域计算模块
//!
//! 纯计算层：测量值分类、生命体征统计、患者编号生成、录入校验。
//! 不依赖存储层，全部函数无副作用。

pub mod classify;
pub mod codes;
pub mod stats;
pub mod validate;

pub use classify::{
    calc_age, classify_blood_pressure, classify_bmi, classify_spo2, judge_lab_value,
    BloodPressureCategory, BmiAssessment, BmiCategory, Spo2Level,
};
pub use codes::generate_patient_code;
pub use stats::{vital_stats, StatSummary, VitalStats};
pub use validate::{
    validate_import_data, validate_lab_result, validate_patient, validate_prescription,
    validate_soap, validate_vitals, ValidationReport,
};
