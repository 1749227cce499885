//! 快照导出与导入
//!
//! 单文件JSON交换文档。导出以患者为单位收集其从属数据（孤儿数据不进入
//! 快照），附件与表示设置整体随行；AI对话不参与交换。导入按主键合并：
//! 已存在的ID跳过而不覆盖，父实体既不在库中也不在快照内的子实体跳过。

use chrono::{DateTime, Utc};
use emr_core::models::{LabResult, Media, ParentType, Patient, Prescription, Record};
use emr_core::Result;
use emr_domain::validate_import_data;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::repository::EmrRepository;
use crate::stores;

/// 快照文档（camelCase序列化，与既有导出文件互换）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: String,
    pub app_name: String,
    pub exported_at: DateTime<Utc>,
    pub patients: Vec<Patient>,
    pub records: Vec<Record>,
    pub prescriptions: Vec<Prescription>,
    pub lab_results: Vec<LabResult>,
    pub media: Vec<Media>,
    pub ai_memo: String,
    pub display_settings: Value,
}

/// 导入结果汇总，aiMemo原样带回给调用方
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub patients_added: usize,
    pub patients_skipped: usize,
    pub records_added: usize,
    pub records_skipped: usize,
    pub prescriptions_added: usize,
    pub prescriptions_skipped: usize,
    pub lab_results_added: usize,
    pub lab_results_skipped: usize,
    pub media_added: usize,
    pub media_skipped: usize,
    pub ai_memo: Option<String>,
}

/// 导出全量快照
///
/// 按患者编号顺序走患者表，经patientId索引收集从属数据；
/// 不挂在任何现存患者名下的孤儿数据自然被排除。
pub fn export_snapshot(repo: &EmrRepository, ai_memo: &str) -> Result<Snapshot> {
    let mut patients = repo.get_all_patients()?;
    patients.sort_by(|a, b| a.patient_code.cmp(&b.patient_code));

    let mut records = Vec::new();
    let mut prescriptions = Vec::new();
    let mut lab_results = Vec::new();
    for patient in &patients {
        records.extend(repo.get_records_by_patient(patient.id)?);
        prescriptions.extend(repo.get_prescriptions_by_patient(patient.id)?);
        lab_results.extend(repo.get_lab_results_by_patient(patient.id)?);
    }
    let media: Vec<Media> = repo.store.get_all(stores::MEDIA)?;
    let display_settings = repo.display_settings()?;

    info!(
        "Exported snapshot: {} patients, {} records, {} prescriptions, {} lab results, {} media",
        patients.len(),
        records.len(),
        prescriptions.len(),
        lab_results.len(),
        media.len()
    );
    Ok(Snapshot {
        version: env!("CARGO_PKG_VERSION").to_string(),
        app_name: "emr".to_string(),
        exported_at: Utc::now(),
        patients,
        records,
        prescriptions,
        lab_results,
        media,
        ai_memo: ai_memo.to_string(),
        display_settings,
    })
}

/// 按主键合并导入快照
///
/// 信封校验未通过时整体拒绝，不产生任何写入。行级问题（无法解析、
/// ID重复、父实体缺失）逐行跳过并计数，不中断整体导入。
pub async fn import_snapshot(repo: &mut EmrRepository, data: &Value) -> Result<ImportSummary> {
    validate_import_data(data).into_result()?;

    let mut summary = ImportSummary::default();

    for item in array(data, "patients") {
        let patient: Patient = match serde_json::from_value(item.clone()) {
            Ok(patient) => patient,
            Err(e) => {
                warn!("Skipping malformed patient row: {}", e);
                summary.patients_skipped += 1;
                continue;
            }
        };
        if repo.get_patient(patient.id)?.is_some() {
            summary.patients_skipped += 1;
            continue;
        }
        repo.store.insert(stores::PATIENTS, &patient).await?;
        summary.patients_added += 1;
    }

    for item in array(data, "records") {
        let record: Record = match serde_json::from_value(item.clone()) {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping malformed record row: {}", e);
                summary.records_skipped += 1;
                continue;
            }
        };
        if repo.get_record(record.id)?.is_some() {
            summary.records_skipped += 1;
            continue;
        }
        if repo.get_patient(record.patient_id)?.is_none() {
            warn!(
                "Skipping record {}: patient {} missing",
                record.id, record.patient_id
            );
            summary.records_skipped += 1;
            continue;
        }
        repo.store.insert(stores::RECORDS, &record).await?;
        summary.records_added += 1;
    }

    for item in array(data, "prescriptions") {
        let prescription: Prescription = match serde_json::from_value(item.clone()) {
            Ok(prescription) => prescription,
            Err(e) => {
                warn!("Skipping malformed prescription row: {}", e);
                summary.prescriptions_skipped += 1;
                continue;
            }
        };
        if exists(repo, stores::PRESCRIPTIONS, &prescription.id.to_string())? {
            summary.prescriptions_skipped += 1;
            continue;
        }
        if repo.get_patient(prescription.patient_id)?.is_none() {
            warn!(
                "Skipping prescription {}: patient {} missing",
                prescription.id, prescription.patient_id
            );
            summary.prescriptions_skipped += 1;
            continue;
        }
        if let Some(record_id) = prescription.record_id {
            if repo.get_record(record_id)?.is_none() {
                warn!(
                    "Skipping prescription {}: record {} missing",
                    prescription.id, record_id
                );
                summary.prescriptions_skipped += 1;
                continue;
            }
        }
        repo.store
            .insert(stores::PRESCRIPTIONS, &prescription)
            .await?;
        summary.prescriptions_added += 1;
    }

    for item in array(data, "labResults") {
        let lab: LabResult = match serde_json::from_value(item.clone()) {
            Ok(lab) => lab,
            Err(e) => {
                warn!("Skipping malformed lab result row: {}", e);
                summary.lab_results_skipped += 1;
                continue;
            }
        };
        if exists(repo, stores::LAB_RESULTS, &lab.id.to_string())? {
            summary.lab_results_skipped += 1;
            continue;
        }
        if repo.get_patient(lab.patient_id)?.is_none() {
            warn!(
                "Skipping lab result {}: patient {} missing",
                lab.id, lab.patient_id
            );
            summary.lab_results_skipped += 1;
            continue;
        }
        repo.store.insert(stores::LAB_RESULTS, &lab).await?;
        summary.lab_results_added += 1;
    }

    for item in array(data, "media") {
        let media: Media = match serde_json::from_value(item.clone()) {
            Ok(media) => media,
            Err(e) => {
                warn!("Skipping malformed media row: {}", e);
                summary.media_skipped += 1;
                continue;
            }
        };
        if exists(repo, stores::MEDIA, &media.id.to_string())? {
            summary.media_skipped += 1;
            continue;
        }
        let parent_collection = match media.parent_type {
            ParentType::Patient => stores::PATIENTS,
            ParentType::Record => stores::RECORDS,
            ParentType::LabResult => stores::LAB_RESULTS,
        };
        if !exists(repo, parent_collection, &media.parent_id.to_string())? {
            warn!(
                "Skipping media {}: parent {} missing",
                media.id, media.parent_id
            );
            summary.media_skipped += 1;
            continue;
        }
        repo.store.insert(stores::MEDIA, &media).await?;
        summary.media_added += 1;
    }

    if let Some(settings) = data.get("displaySettings") {
        if !settings.is_null() {
            repo.save_display_settings(settings.clone()).await?;
        }
    }

    summary.ai_memo = data
        .get("aiMemo")
        .and_then(Value::as_str)
        .map(|memo| memo.to_string());

    info!(
        "Imported snapshot: {} patients, {} records, {} prescriptions, {} lab results, {} media added",
        summary.patients_added,
        summary.records_added,
        summary.prescriptions_added,
        summary.lab_results_added,
        summary.media_added
    );
    Ok(summary)
}

fn array<'a>(data: &'a Value, field: &str) -> &'a [Value] {
    data.get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn exists(repo: &EmrRepository, collection: &str, key: &str) -> Result<bool> {
    Ok(repo.store.get::<Value>(collection, key)?.is_some())
}
