//! 核心数据模型定义
//!
//! 所有实体以camelCase序列化，与快照文档格式保持一致。

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 患者基本信息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub patient_code: String, // 院内患者编号 ("P"+4位数字)
    pub name: String,
    pub name_kana: Option<String>, // 假名读音
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub insurance_number: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    pub first_visit_date: Option<NaiveDate>,
    pub practitioner: Option<String>, // 担当医
    pub memo: Option<String>,
    #[serde(default)]
    pub allergies: Vec<Allergy>,
    #[serde(default)]
    pub medical_history: Vec<MedicalHistory>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 性别枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// 紧急联系人
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: Option<String>,
    pub phone: Option<String>,
}

/// 过敏信息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allergy {
    pub allergen: String,
    pub severity: Option<AllergySeverity>,
    pub note: Option<String>,
}

/// 过敏严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllergySeverity {
    Mild,
    Moderate,
    Severe,
}

/// 既往病史条目
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalHistory {
    pub disease: String,
    pub diagnosed_at: Option<String>, // 自由格式（"2015-04" / "2015頃" 等）
    pub note: Option<String>,
}

/// 诊疗记录（SOAP格式）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub visited_at: DateTime<Utc>,
    #[serde(default)]
    pub soap: Soap,
    #[serde(default)]
    pub vitals: Vitals,
    pub treatment_memo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// SOAP记录四项
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Soap {
    pub subjective: Option<String>,
    pub objective: Option<String>,
    pub assessment: Option<String>,
    pub plan: Option<String>,
}

/// 生命体征（各项独立可空）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    pub temperature: Option<f64>,      // 体温 (℃)
    pub systolic: Option<f64>,         // 收缩压 (mmHg)
    pub diastolic: Option<f64>,        // 舒张压 (mmHg)
    pub pulse: Option<f64>,            // 脉搏 (/分)
    pub spo2: Option<f64>,             // 血氧饱和度 (%)
    pub respiratory_rate: Option<f64>, // 呼吸数 (/分)
    pub weight: Option<f64>,           // 体重 (kg)
    pub height: Option<f64>,           // 身长 (cm)
}

/// 处方信息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub record_id: Option<Uuid>, // 关联的诊疗记录（可空）
    pub prescribed_at: NaiveDate,
    pub medicine: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub days: Option<i64>, // 处方日数 (1-365)
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 检查结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabResult {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub examined_at: NaiveDate,
    pub category: LabCategory,
    pub item_name: String,
    pub value: String, // 数值或定性结果（"5800" / "陽性" 等）
    pub unit: Option<String>,
    pub reference_min: Option<f64>,
    pub reference_max: Option<f64>,
    pub judgment: Option<Judgment>,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 检查分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabCategory {
    Blood,
    Urine,
    Image,
    Other,
}

/// 检查值判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Judgment {
    Normal,
    Caution,
    Abnormal,
}

/// 附件（照片等）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub parent_type: ParentType,
    pub file_name: String,
    pub mime_type: String,
    pub data_url: String, // 原始数据 (data URL)
    pub thumbnail: Option<String>,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 附件所属实体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParentType {
    Patient,
    Record,
    LabResult,
}

/// AI对话记录（每位患者一条，覆盖更新）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConversation {
    pub id: String, // "ai_conv_" + patientId
    pub patient_id: Uuid,
    #[serde(default)]
    pub conversation: Vec<ChatMessage>,
    pub updated_at: DateTime<Utc>,
}

impl AiConversation {
    /// 由患者ID导出对话主键
    pub fn key_for(patient_id: &Uuid) -> String {
        format!("ai_conv_{}", patient_id)
    }
}

/// AI对话消息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: String, // "user" / "assistant"
    pub content: String,
}

// 插入模型 - 调用方提交的草稿，由仓储层补全id与时间戳

/// 新患者插入模型
#[derive(Debug, Clone)]
pub struct NewPatient {
    pub patient_code: Option<String>, // 缺省时自动编号
    pub name: String,
    pub name_kana: Option<String>,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub insurance_number: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    pub first_visit_date: Option<NaiveDate>,
    pub practitioner: Option<String>,
    pub memo: Option<String>,
    pub allergies: Vec<Allergy>,
    pub medical_history: Vec<MedicalHistory>,
}

/// 新诊疗记录插入模型
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub patient_id: Uuid,
    pub visited_at: Option<DateTime<Utc>>, // 缺省时为当前时刻
    pub soap: Soap,
    pub vitals: Vitals,
    pub treatment_memo: Option<String>,
}

/// 新处方插入模型
#[derive(Debug, Clone)]
pub struct NewPrescription {
    pub patient_id: Uuid,
    pub record_id: Option<Uuid>,
    pub prescribed_at: Option<NaiveDate>, // 缺省时为当日
    pub medicine: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub days: Option<i64>,
    pub memo: Option<String>,
}

/// 新检查结果插入模型
#[derive(Debug, Clone)]
pub struct NewLabResult {
    pub patient_id: Uuid,
    pub examined_at: Option<NaiveDate>, // 缺省时为当日
    pub category: LabCategory,
    pub item_name: String,
    pub value: String,
    pub unit: Option<String>,
    pub reference_min: Option<f64>,
    pub reference_max: Option<f64>,
    pub judgment: Option<Judgment>, // 缺省时自动判定
    pub memo: Option<String>,
}

/// 新附件插入模型
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub parent_id: Uuid,
    pub parent_type: ParentType,
    pub file_name: String,
    pub mime_type: String,
    pub data_url: String,
    pub thumbnail: Option<String>,
    pub memo: Option<String>,
}
