//! 领域仓储
//!
//! 将临床实体映射到对象存储集合的唯一入口。所有变更先校验（校验失败
//! 即中止，不产生任何写入），再做父实体存在性检查，最后写入。
//! 级联删除按"先子后父"的固定顺序执行，中途被打断只会留下孤儿子实体，
//! 不会留下指向已删除子实体的存活父实体。

use std::path::Path;

use chrono::Utc;
use emr_core::models::{
    AiConversation, ChatMessage, LabResult, Media, NewLabResult, NewMedia, NewPatient,
    NewPrescription, NewRecord, ParentType, Patient, Prescription, Record,
};
use emr_core::{EmrError, Result};
use emr_domain::{
    generate_patient_code, judge_lab_value, validate_lab_result, validate_patient,
    validate_prescription, validate_soap, validate_vitals,
};
use emr_storage::ObjectStore;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::stores;

/// 每个集合的记录数汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CountSummary {
    pub patients: usize,
    pub records: usize,
    pub prescriptions: usize,
    pub lab_results: usize,
    pub media: usize,
    pub ai_conversations: usize,
}

/// 电子病历仓储
pub struct EmrRepository {
    pub(crate) store: ObjectStore,
}

impl EmrRepository {
    /// 打开（或初始化）数据目录
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let store = ObjectStore::open(root, stores::emr_schema()).await?;
        Ok(Self { store })
    }

    /// 关闭仓储并释放目录锁
    pub async fn close(self) -> Result<()> {
        self.store.close().await
    }

    // ========== 患者相关操作 ==========

    /// 登记新患者，草稿未携带编号时自动分配下一个患者编号
    pub async fn add_patient(&mut self, draft: NewPatient) -> Result<Patient> {
        validate_patient(&draft, Utc::now().date_naive()).into_result()?;

        let patient_code = match draft.patient_code {
            Some(code) => code,
            None => {
                let codes: Vec<String> = self
                    .get_all_patients()?
                    .into_iter()
                    .map(|p| p.patient_code)
                    .collect();
                generate_patient_code(&codes)?
            }
        };

        let now = Utc::now();
        let patient = Patient {
            id: Uuid::new_v4(),
            patient_code,
            name: draft.name,
            name_kana: draft.name_kana,
            birth_date: draft.birth_date,
            gender: draft.gender,
            phone: draft.phone,
            email: draft.email,
            insurance_number: draft.insurance_number,
            address: draft.address,
            emergency_contact: draft.emergency_contact,
            first_visit_date: draft.first_visit_date,
            practitioner: draft.practitioner,
            memo: draft.memo,
            allergies: draft.allergies,
            medical_history: draft.medical_history,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(stores::PATIENTS, &patient).await?;
        info!("Created patient {} ({})", patient.patient_code, patient.id);
        Ok(patient)
    }

    /// 更新患者信息，updatedAt由仓储刷新
    pub async fn update_patient(&mut self, mut patient: Patient) -> Result<Patient> {
        validate_patient(&patient_as_draft(&patient), Utc::now().date_naive()).into_result()?;
        self.require_patient(patient.id)?;

        patient.updated_at = Utc::now();
        self.store.put(stores::PATIENTS, &patient).await?;
        info!("Updated patient {}", patient.id);
        Ok(patient)
    }

    pub fn get_patient(&self, patient_id: Uuid) -> Result<Option<Patient>> {
        self.store.get(stores::PATIENTS, &patient_id.to_string())
    }

    pub fn get_all_patients(&self) -> Result<Vec<Patient>> {
        self.store.get_all(stores::PATIENTS)
    }

    /// 删除患者及其全部从属数据
    ///
    /// 顺序：各诊疗记录（先删其附件）→ 处方 → 各检查结果（先删其附件）
    /// → 患者级附件 → 患者本体。患者不存在时各步骤均为no-op。
    pub async fn delete_patient(&mut self, patient_id: Uuid) -> Result<()> {
        let records = self.get_records_by_patient(patient_id)?;
        for record in &records {
            self.delete_media_by_parent(record.id).await?;
            self.store
                .delete(stores::RECORDS, &record.id.to_string())
                .await?;
        }
        debug!(
            "Cascade removed {} records of patient {}",
            records.len(),
            patient_id
        );

        let prescriptions = self.get_prescriptions_by_patient(patient_id)?;
        for prescription in &prescriptions {
            self.store
                .delete(stores::PRESCRIPTIONS, &prescription.id.to_string())
                .await?;
        }

        let lab_results = self.get_lab_results_by_patient(patient_id)?;
        for lab in &lab_results {
            self.delete_media_by_parent(lab.id).await?;
            self.store
                .delete(stores::LAB_RESULTS, &lab.id.to_string())
                .await?;
        }

        self.delete_media_by_parent(patient_id).await?;
        self.store
            .delete(stores::PATIENTS, &patient_id.to_string())
            .await?;

        info!(
            "Deleted patient {} ({} records, {} prescriptions, {} lab results)",
            patient_id,
            records.len(),
            prescriptions.len(),
            lab_results.len()
        );
        Ok(())
    }

    // ========== 诊疗记录相关操作 ==========

    /// 追加诊疗记录（SOAP与生命体征均校验，患者必须存在）
    pub async fn add_record(&mut self, draft: NewRecord) -> Result<Record> {
        validate_soap(&draft.soap).into_result()?;
        validate_vitals(&draft.vitals).into_result()?;
        self.require_patient(draft.patient_id)?;

        let now = Utc::now();
        let record = Record {
            id: Uuid::new_v4(),
            patient_id: draft.patient_id,
            visited_at: draft.visited_at.unwrap_or(now),
            soap: draft.soap,
            vitals: draft.vitals,
            treatment_memo: draft.treatment_memo,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(stores::RECORDS, &record).await?;
        info!(
            "Created record {} for patient {}",
            record.id, record.patient_id
        );
        Ok(record)
    }

    /// 更新诊疗记录；患者关联与新增时同样检查存在性
    pub async fn update_record(&mut self, mut record: Record) -> Result<Record> {
        validate_soap(&record.soap).into_result()?;
        validate_vitals(&record.vitals).into_result()?;
        self.require_record(record.id)?;
        self.require_patient(record.patient_id)?;

        record.updated_at = Utc::now();
        self.store.put(stores::RECORDS, &record).await?;
        info!("Updated record {}", record.id);
        Ok(record)
    }

    pub fn get_record(&self, record_id: Uuid) -> Result<Option<Record>> {
        self.store.get(stores::RECORDS, &record_id.to_string())
    }

    pub fn get_records_by_patient(&self, patient_id: Uuid) -> Result<Vec<Record>> {
        self.store
            .get_by_index(stores::RECORDS, "patientId", &patient_id.to_string())
    }

    /// 删除诊疗记录及其附件
    pub async fn delete_record(&mut self, record_id: Uuid) -> Result<()> {
        self.delete_media_by_parent(record_id).await?;
        self.store
            .delete(stores::RECORDS, &record_id.to_string())
            .await?;
        info!("Deleted record {}", record_id);
        Ok(())
    }

    // ========== 处方相关操作 ==========

    /// 追加处方，处方日缺省为当日
    pub async fn add_prescription(&mut self, draft: NewPrescription) -> Result<Prescription> {
        validate_prescription(&draft).into_result()?;
        self.require_patient(draft.patient_id)?;
        if let Some(record_id) = draft.record_id {
            self.require_record(record_id)?;
        }

        let now = Utc::now();
        let prescription = Prescription {
            id: Uuid::new_v4(),
            patient_id: draft.patient_id,
            record_id: draft.record_id,
            prescribed_at: draft.prescribed_at.unwrap_or_else(|| now.date_naive()),
            medicine: draft.medicine,
            dosage: draft.dosage,
            frequency: draft.frequency,
            days: draft.days,
            memo: draft.memo,
            created_at: now,
            updated_at: now,
        };
        self.store
            .insert(stores::PRESCRIPTIONS, &prescription)
            .await?;
        info!(
            "Created prescription {} for patient {}",
            prescription.id, prescription.patient_id
        );
        Ok(prescription)
    }

    /// 更新处方；患者与诊疗记录关联与新增时同样检查存在性
    pub async fn update_prescription(&mut self, mut prescription: Prescription) -> Result<Prescription> {
        validate_prescription(&prescription_as_draft(&prescription)).into_result()?;
        if !self.exists(stores::PRESCRIPTIONS, &prescription.id.to_string())? {
            return Err(EmrError::NotFound(format!(
                "处方 {} 不存在",
                prescription.id
            )));
        }
        self.require_patient(prescription.patient_id)?;
        if let Some(record_id) = prescription.record_id {
            self.require_record(record_id)?;
        }

        prescription.updated_at = Utc::now();
        self.store.put(stores::PRESCRIPTIONS, &prescription).await?;
        info!("Updated prescription {}", prescription.id);
        Ok(prescription)
    }

    pub fn get_prescriptions_by_patient(&self, patient_id: Uuid) -> Result<Vec<Prescription>> {
        self.store
            .get_by_index(stores::PRESCRIPTIONS, "patientId", &patient_id.to_string())
    }

    pub async fn delete_prescription(&mut self, prescription_id: Uuid) -> Result<()> {
        self.store
            .delete(stores::PRESCRIPTIONS, &prescription_id.to_string())
            .await?;
        info!("Deleted prescription {}", prescription_id);
        Ok(())
    }

    // ========== 检查结果相关操作 ==========

    /// 追加检查结果，草稿未携带判定时按基准值自动判定
    pub async fn add_lab_result(&mut self, draft: NewLabResult) -> Result<LabResult> {
        validate_lab_result(&draft).into_result()?;
        self.require_patient(draft.patient_id)?;

        let judgment = draft.judgment.or_else(|| {
            judge_lab_value(&draft.value, draft.reference_min, draft.reference_max)
        });

        let now = Utc::now();
        let lab = LabResult {
            id: Uuid::new_v4(),
            patient_id: draft.patient_id,
            examined_at: draft.examined_at.unwrap_or_else(|| now.date_naive()),
            category: draft.category,
            item_name: draft.item_name,
            value: draft.value,
            unit: draft.unit,
            reference_min: draft.reference_min,
            reference_max: draft.reference_max,
            judgment,
            memo: draft.memo,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(stores::LAB_RESULTS, &lab).await?;
        info!(
            "Created lab result {} for patient {}",
            lab.id, lab.patient_id
        );
        Ok(lab)
    }

    /// 更新检查结果；患者关联与新增时同样检查存在性
    pub async fn update_lab_result(&mut self, mut lab: LabResult) -> Result<LabResult> {
        validate_lab_result(&lab_as_draft(&lab)).into_result()?;
        if !self.exists(stores::LAB_RESULTS, &lab.id.to_string())? {
            return Err(EmrError::NotFound(format!("检查结果 {} 不存在", lab.id)));
        }
        self.require_patient(lab.patient_id)?;

        lab.updated_at = Utc::now();
        self.store.put(stores::LAB_RESULTS, &lab).await?;
        info!("Updated lab result {}", lab.id);
        Ok(lab)
    }

    pub fn get_lab_results_by_patient(&self, patient_id: Uuid) -> Result<Vec<LabResult>> {
        self.store
            .get_by_index(stores::LAB_RESULTS, "patientId", &patient_id.to_string())
    }

    /// 删除检查结果及其附件
    pub async fn delete_lab_result(&mut self, lab_result_id: Uuid) -> Result<()> {
        self.delete_media_by_parent(lab_result_id).await?;
        self.store
            .delete(stores::LAB_RESULTS, &lab_result_id.to_string())
            .await?;
        info!("Deleted lab result {}", lab_result_id);
        Ok(())
    }

    // ========== 附件相关操作 ==========

    /// 追加附件，父实体按parentType对应的集合检查存在性
    pub async fn add_media(&mut self, draft: NewMedia) -> Result<Media> {
        let parent_collection = match draft.parent_type {
            ParentType::Patient => stores::PATIENTS,
            ParentType::Record => stores::RECORDS,
            ParentType::LabResult => stores::LAB_RESULTS,
        };
        if !self.exists(parent_collection, &draft.parent_id.to_string())? {
            return Err(EmrError::NotFound(format!(
                "附件的父对象 {} 不存在",
                draft.parent_id
            )));
        }

        let media = Media {
            id: Uuid::new_v4(),
            parent_id: draft.parent_id,
            parent_type: draft.parent_type,
            file_name: draft.file_name,
            mime_type: draft.mime_type,
            data_url: draft.data_url,
            thumbnail: draft.thumbnail,
            memo: draft.memo,
            created_at: Utc::now(),
        };
        self.store.insert(stores::MEDIA, &media).await?;
        info!("Created media {} under parent {}", media.id, media.parent_id);
        Ok(media)
    }

    pub fn get_media_by_parent(&self, parent_id: Uuid) -> Result<Vec<Media>> {
        self.store
            .get_by_index(stores::MEDIA, "parentId", &parent_id.to_string())
    }

    pub async fn delete_media(&mut self, media_id: Uuid) -> Result<()> {
        self.store
            .delete(stores::MEDIA, &media_id.to_string())
            .await?;
        info!("Deleted media {}", media_id);
        Ok(())
    }

    /// 删除某个父实体名下的全部附件
    pub async fn delete_media_by_parent(&mut self, parent_id: Uuid) -> Result<()> {
        let items = self.get_media_by_parent(parent_id)?;
        for media in &items {
            self.store
                .delete(stores::MEDIA, &media.id.to_string())
                .await?;
        }
        if !items.is_empty() {
            debug!("Removed {} media under parent {}", items.len(), parent_id);
        }
        Ok(())
    }

    // ========== AI对话相关操作 ==========

    /// 保存患者的AI对话（每位患者一条，整体覆盖）
    pub async fn save_ai_conversation(
        &mut self,
        patient_id: Uuid,
        conversation: Vec<ChatMessage>,
    ) -> Result<AiConversation> {
        self.require_patient(patient_id)?;

        let row = AiConversation {
            id: AiConversation::key_for(&patient_id),
            patient_id,
            conversation,
            updated_at: Utc::now(),
        };
        self.store.put(stores::AI_CONVERSATIONS, &row).await?;
        debug!("Saved AI conversation for patient {}", patient_id);
        Ok(row)
    }

    pub fn get_ai_conversation(&self, patient_id: Uuid) -> Result<Option<AiConversation>> {
        self.store
            .get(stores::AI_CONVERSATIONS, &AiConversation::key_for(&patient_id))
    }

    // ========== 应用设置相关操作 ==========

    /// 读取表示设置，未保存过时返回默认形状
    pub fn display_settings(&self) -> Result<Value> {
        let stored: Option<Value> = self
            .store
            .get(stores::APP_SETTINGS, stores::DISPLAY_SETTINGS_ID)?;
        Ok(stored.unwrap_or_else(default_display_settings))
    }

    /// 保存表示设置，单例行主键强制固定
    pub async fn save_display_settings(&mut self, mut settings: Value) -> Result<()> {
        match settings.as_object_mut() {
            Some(obj) => {
                obj.insert(
                    "id".to_string(),
                    Value::String(stores::DISPLAY_SETTINGS_ID.to_string()),
                );
            }
            None => {
                return Err(EmrError::Validation(
                    "表示設定はJSONオブジェクト形式で指定してください".to_string(),
                ))
            }
        }
        self.store.put(stores::APP_SETTINGS, &settings).await?;
        debug!("Saved display settings");
        Ok(())
    }

    // ========== 全体操作 ==========

    /// 清空全部集合
    pub async fn delete_all_data(&mut self) -> Result<()> {
        for collection in [
            stores::PATIENTS,
            stores::RECORDS,
            stores::PRESCRIPTIONS,
            stores::LAB_RESULTS,
            stores::AI_CONVERSATIONS,
            stores::MEDIA,
            stores::APP_SETTINGS,
        ] {
            self.store.clear(collection).await?;
        }
        info!("All data deleted");
        Ok(())
    }

    /// 各集合的记录数
    pub fn count_summary(&self) -> Result<CountSummary> {
        Ok(CountSummary {
            patients: self.store.count(stores::PATIENTS)?,
            records: self.store.count(stores::RECORDS)?,
            prescriptions: self.store.count(stores::PRESCRIPTIONS)?,
            lab_results: self.store.count(stores::LAB_RESULTS)?,
            media: self.store.count(stores::MEDIA)?,
            ai_conversations: self.store.count(stores::AI_CONVERSATIONS)?,
        })
    }

    // ========== 内部辅助 ==========

    fn exists(&self, collection: &str, key: &str) -> Result<bool> {
        Ok(self.store.get::<Value>(collection, key)?.is_some())
    }

    fn require_patient(&self, patient_id: Uuid) -> Result<()> {
        if !self.exists(stores::PATIENTS, &patient_id.to_string())? {
            return Err(EmrError::NotFound(format!("患者 {} 不存在", patient_id)));
        }
        Ok(())
    }

    fn require_record(&self, record_id: Uuid) -> Result<()> {
        if !self.exists(stores::RECORDS, &record_id.to_string())? {
            return Err(EmrError::NotFound(format!(
                "诊疗记录 {} 不存在",
                record_id
            )));
        }
        Ok(())
    }
}

/// 表示设置的默认形状（全项目可见）
pub fn default_display_settings() -> Value {
    serde_json::json!({
        "id": stores::DISPLAY_SETTINGS_ID,
        "tabs": { "prescription": true, "lab": true },
        "fields": {
            "patient": {
                "code": true, "kana": true, "phone": true, "email": true,
                "insurance": true, "address": true, "emergency": true,
                "firstVisit": true, "doctor": true, "memo": true,
                "allergies": true, "histories": true, "photo": true
            },
            "karte": {
                "temperature": true, "systolic": true, "diastolic": true,
                "pulse": true, "spo2": true, "respiratoryRate": true,
                "weight": true, "height": true, "treatmentMemo": true,
                "kartePhoto": true
            },
            "prescription": {
                "prescriptionDate": true, "dosage": true, "frequency": true,
                "days": true, "prescriptionMemo": true
            },
            "lab": {
                "examinedAt": true, "unit": true, "refMin": true,
                "refMax": true, "labMemo": true
            }
        }
    })
}

// 更新时复用录入校验规则的草稿视图

fn patient_as_draft(patient: &Patient) -> NewPatient {
    NewPatient {
        patient_code: Some(patient.patient_code.clone()),
        name: patient.name.clone(),
        name_kana: patient.name_kana.clone(),
        birth_date: patient.birth_date,
        gender: patient.gender,
        phone: patient.phone.clone(),
        email: patient.email.clone(),
        insurance_number: patient.insurance_number.clone(),
        address: patient.address.clone(),
        emergency_contact: patient.emergency_contact.clone(),
        first_visit_date: patient.first_visit_date,
        practitioner: patient.practitioner.clone(),
        memo: patient.memo.clone(),
        allergies: patient.allergies.clone(),
        medical_history: patient.medical_history.clone(),
    }
}

fn prescription_as_draft(prescription: &Prescription) -> NewPrescription {
    NewPrescription {
        patient_id: prescription.patient_id,
        record_id: prescription.record_id,
        prescribed_at: Some(prescription.prescribed_at),
        medicine: prescription.medicine.clone(),
        dosage: prescription.dosage.clone(),
        frequency: prescription.frequency.clone(),
        days: prescription.days,
        memo: prescription.memo.clone(),
    }
}

fn lab_as_draft(lab: &LabResult) -> NewLabResult {
    NewLabResult {
        patient_id: lab.patient_id,
        examined_at: Some(lab.examined_at),
        category: lab.category,
        item_name: lab.item_name.clone(),
        value: lab.value.clone(),
        unit: lab.unit.clone(),
        reference_min: lab.reference_min,
        reference_max: lab.reference_max,
        judgment: lab.judgment,
        memo: lab.memo.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use emr_core::models::{Gender, Judgment, LabCategory, Soap, Vitals};

    async fn open_repo() -> (tempfile::TempDir, EmrRepository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = EmrRepository::open(dir.path()).await.unwrap();
        (dir, repo)
    }

    fn patient_draft(name: &str) -> NewPatient {
        NewPatient {
            patient_code: None,
            name: name.to_string(),
            name_kana: Some("たなか たろう".to_string()),
            birth_date: NaiveDate::from_ymd_opt(1975, 4, 20).unwrap(),
            gender: Gender::Male,
            phone: Some("090-1234-5678".to_string()),
            email: None,
            insurance_number: None,
            address: None,
            emergency_contact: None,
            first_visit_date: None,
            practitioner: Some("山田".to_string()),
            memo: None,
            allergies: Vec::new(),
            medical_history: Vec::new(),
        }
    }

    fn record_draft(patient_id: Uuid) -> NewRecord {
        NewRecord {
            patient_id,
            visited_at: None,
            soap: Soap {
                subjective: Some("頭痛を訴える".to_string()),
                objective: Some("血圧 128/82".to_string()),
                assessment: None,
                plan: Some("経過観察".to_string()),
            },
            vitals: Vitals {
                temperature: Some(36.6),
                systolic: Some(128.0),
                diastolic: Some(82.0),
                pulse: Some(72.0),
                ..Default::default()
            },
            treatment_memo: None,
        }
    }

    fn prescription_draft(patient_id: Uuid) -> NewPrescription {
        NewPrescription {
            patient_id,
            record_id: None,
            prescribed_at: None,
            medicine: "ロキソプロフェン錠60mg".to_string(),
            dosage: Some("1回1錠".to_string()),
            frequency: Some("1日3回 毎食後".to_string()),
            days: Some(7),
            memo: None,
        }
    }

    fn lab_draft(patient_id: Uuid) -> NewLabResult {
        NewLabResult {
            patient_id,
            examined_at: None,
            category: LabCategory::Blood,
            item_name: "白血球数".to_string(),
            value: "5800".to_string(),
            unit: Some("/μL".to_string()),
            reference_min: Some(3300.0),
            reference_max: Some(8600.0),
            judgment: None,
            memo: None,
        }
    }

    fn media_draft(parent_id: Uuid, parent_type: ParentType) -> NewMedia {
        NewMedia {
            parent_id,
            parent_type,
            file_name: "photo.png".to_string(),
            mime_type: "image/png".to_string(),
            data_url: "data:image/png;base64,iVBORw0KGgo=".to_string(),
            thumbnail: None,
            memo: None,
        }
    }

    #[tokio::test]
    async fn test_add_patient_assigns_sequential_codes() {
        let (_dir, mut repo) = open_repo().await;

        let first = repo.add_patient(patient_draft("田中 太郎")).await.unwrap();
        let second = repo.add_patient(patient_draft("佐藤 花子")).await.unwrap();
        assert_eq!(first.patient_code, "P0001");
        assert_eq!(second.patient_code, "P0002");

        let loaded = repo.get_patient(first.id).unwrap().unwrap();
        assert_eq!(loaded.name, "田中 太郎");
        assert_eq!(repo.get_all_patients().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_add_patient_keeps_explicit_code() {
        let (_dir, mut repo) = open_repo().await;

        let mut draft = patient_draft("田中 太郎");
        draft.patient_code = Some("P0100".to_string());
        let patient = repo.add_patient(draft).await.unwrap();
        assert_eq!(patient.patient_code, "P0100");

        let next = repo.add_patient(patient_draft("佐藤 花子")).await.unwrap();
        assert_eq!(next.patient_code, "P0101");
    }

    #[tokio::test]
    async fn test_add_patient_validation_aborts_before_write() {
        let (_dir, mut repo) = open_repo().await;

        let mut draft = patient_draft("");
        draft.phone = Some("abc".to_string());
        let err = repo.add_patient(draft).await.unwrap_err();
        match err {
            EmrError::Validation(message) => {
                assert_eq!(message, "氏名を入力してください");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(repo.count_summary().unwrap().patients, 0);
    }

    #[tokio::test]
    async fn test_update_patient() {
        let (_dir, mut repo) = open_repo().await;
        let patient = repo.add_patient(patient_draft("田中 太郎")).await.unwrap();

        let mut changed = patient.clone();
        changed.name = "田中 太朗".to_string();
        let updated = repo.update_patient(changed).await.unwrap();
        assert!(updated.updated_at >= patient.updated_at);

        let loaded = repo.get_patient(patient.id).unwrap().unwrap();
        assert_eq!(loaded.name, "田中 太朗");
        assert_eq!(loaded.created_at, patient.created_at);
    }

    #[tokio::test]
    async fn test_update_missing_patient_is_not_found() {
        let (_dir, mut repo) = open_repo().await;
        let patient = repo.add_patient(patient_draft("田中 太郎")).await.unwrap();
        repo.delete_patient(patient.id).await.unwrap();

        let err = repo.update_patient(patient).await.unwrap_err();
        assert!(matches!(err, EmrError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_child_entities_require_existing_patient() {
        let (_dir, mut repo) = open_repo().await;
        let ghost = Uuid::new_v4();

        let err = repo.add_record(record_draft(ghost)).await.unwrap_err();
        assert!(matches!(err, EmrError::NotFound(_)));
        let err = repo
            .add_prescription(prescription_draft(ghost))
            .await
            .unwrap_err();
        assert!(matches!(err, EmrError::NotFound(_)));
        let err = repo.add_lab_result(lab_draft(ghost)).await.unwrap_err();
        assert!(matches!(err, EmrError::NotFound(_)));

        let patient = repo.add_patient(patient_draft("田中 太郎")).await.unwrap();
        assert!(repo.add_record(record_draft(patient.id)).await.is_ok());
        assert!(repo
            .add_prescription(prescription_draft(patient.id))
            .await
            .is_ok());
        assert!(repo.add_lab_result(lab_draft(patient.id)).await.is_ok());
    }

    #[tokio::test]
    async fn test_record_validation_rejected() {
        let (_dir, mut repo) = open_repo().await;
        let patient = repo.add_patient(patient_draft("田中 太郎")).await.unwrap();

        let mut draft = record_draft(patient.id);
        draft.soap = Soap::default();
        let err = repo.add_record(draft).await.unwrap_err();
        match err {
            EmrError::Validation(message) => {
                assert_eq!(message, "S/O/A/Pのいずれか1つ以上を入力してください");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let mut draft = record_draft(patient.id);
        draft.vitals.systolic = Some(80.0);
        draft.vitals.diastolic = Some(80.0);
        let err = repo.add_record(draft).await.unwrap_err();
        assert!(matches!(err, EmrError::Validation(_)));
        assert_eq!(repo.count_summary().unwrap().records, 0);
    }

    #[tokio::test]
    async fn test_prescription_record_link_checked() {
        let (_dir, mut repo) = open_repo().await;
        let patient = repo.add_patient(patient_draft("田中 太郎")).await.unwrap();

        let mut draft = prescription_draft(patient.id);
        draft.record_id = Some(Uuid::new_v4());
        let err = repo.add_prescription(draft).await.unwrap_err();
        assert!(matches!(err, EmrError::NotFound(_)));

        let record = repo.add_record(record_draft(patient.id)).await.unwrap();
        let mut draft = prescription_draft(patient.id);
        draft.record_id = Some(record.id);
        let prescription = repo.add_prescription(draft).await.unwrap();
        assert_eq!(prescription.record_id, Some(record.id));
    }

    #[tokio::test]
    async fn test_update_rechecks_parent_links() {
        let (_dir, mut repo) = open_repo().await;
        let patient = repo.add_patient(patient_draft("田中 太郎")).await.unwrap();
        let record = repo.add_record(record_draft(patient.id)).await.unwrap();
        let prescription = repo
            .add_prescription(prescription_draft(patient.id))
            .await
            .unwrap();
        let lab = repo.add_lab_result(lab_draft(patient.id)).await.unwrap();

        // 更新时不允许把患者关联改到不存在的患者上
        let mut rewired = record.clone();
        rewired.patient_id = Uuid::new_v4();
        let err = repo.update_record(rewired).await.unwrap_err();
        assert!(matches!(err, EmrError::NotFound(_)));

        let mut rewired = prescription.clone();
        rewired.patient_id = Uuid::new_v4();
        let err = repo.update_prescription(rewired).await.unwrap_err();
        assert!(matches!(err, EmrError::NotFound(_)));

        let mut rewired = prescription.clone();
        rewired.record_id = Some(Uuid::new_v4());
        let err = repo.update_prescription(rewired).await.unwrap_err();
        assert!(matches!(err, EmrError::NotFound(_)));

        let mut rewired = lab.clone();
        rewired.patient_id = Uuid::new_v4();
        let err = repo.update_lab_result(rewired).await.unwrap_err();
        assert!(matches!(err, EmrError::NotFound(_)));

        // 被拒绝的更新不落地，原患者名下数据无变化
        assert_eq!(repo.get_records_by_patient(patient.id).unwrap().len(), 1);
        assert_eq!(
            repo.get_prescriptions_by_patient(patient.id).unwrap().len(),
            1
        );
        assert_eq!(
            repo.get_lab_results_by_patient(patient.id).unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_update_rewires_to_existing_patient() {
        let (_dir, mut repo) = open_repo().await;
        let from = repo.add_patient(patient_draft("田中 太郎")).await.unwrap();
        let to = repo.add_patient(patient_draft("佐藤 花子")).await.unwrap();
        let record = repo.add_record(record_draft(from.id)).await.unwrap();

        let mut moved = record.clone();
        moved.patient_id = to.id;
        repo.update_record(moved).await.unwrap();

        assert!(repo.get_records_by_patient(from.id).unwrap().is_empty());
        assert_eq!(repo.get_records_by_patient(to.id).unwrap().len(), 1);

        // 移动后的记录随新患者一起级联删除
        repo.delete_patient(to.id).await.unwrap();
        assert!(repo.get_record(record.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lab_judgment_autofill() {
        let (_dir, mut repo) = open_repo().await;
        let patient = repo.add_patient(patient_draft("田中 太郎")).await.unwrap();

        let lab = repo.add_lab_result(lab_draft(patient.id)).await.unwrap();
        assert_eq!(lab.judgment, Some(Judgment::Normal));

        let mut draft = lab_draft(patient.id);
        draft.value = "3000".to_string();
        let lab = repo.add_lab_result(draft).await.unwrap();
        assert_eq!(lab.judgment, Some(Judgment::Abnormal));

        // 定性值无法判定
        let mut draft = lab_draft(patient.id);
        draft.item_name = "尿潜血".to_string();
        draft.value = "陰性".to_string();
        let lab = repo.add_lab_result(draft).await.unwrap();
        assert_eq!(lab.judgment, None);

        // 显式判定原样保留
        let mut draft = lab_draft(patient.id);
        draft.value = "5800".to_string();
        draft.judgment = Some(Judgment::Caution);
        let lab = repo.add_lab_result(draft).await.unwrap();
        assert_eq!(lab.judgment, Some(Judgment::Caution));
    }

    #[tokio::test]
    async fn test_media_parent_checked_per_type() {
        let (_dir, mut repo) = open_repo().await;
        let patient = repo.add_patient(patient_draft("田中 太郎")).await.unwrap();
        let lab = repo.add_lab_result(lab_draft(patient.id)).await.unwrap();

        // 把患者ID当作lab_result父级也不会通过
        let err = repo
            .add_media(media_draft(patient.id, ParentType::LabResult))
            .await
            .unwrap_err();
        assert!(matches!(err, EmrError::NotFound(_)));

        let media = repo
            .add_media(media_draft(lab.id, ParentType::LabResult))
            .await
            .unwrap();
        let by_parent = repo.get_media_by_parent(lab.id).unwrap();
        assert_eq!(by_parent.len(), 1);
        assert_eq!(by_parent[0].id, media.id);
    }

    #[tokio::test]
    async fn test_cascade_delete_patient() {
        let (_dir, mut repo) = open_repo().await;
        let patient = repo.add_patient(patient_draft("田中 太郎")).await.unwrap();
        let other = repo.add_patient(patient_draft("佐藤 花子")).await.unwrap();

        let record = repo.add_record(record_draft(patient.id)).await.unwrap();
        repo.add_record(record_draft(patient.id)).await.unwrap();
        repo.add_prescription(prescription_draft(patient.id))
            .await
            .unwrap();
        let lab = repo.add_lab_result(lab_draft(patient.id)).await.unwrap();
        repo.add_media(media_draft(record.id, ParentType::Record))
            .await
            .unwrap();
        repo.add_media(media_draft(lab.id, ParentType::LabResult))
            .await
            .unwrap();
        repo.add_media(media_draft(patient.id, ParentType::Patient))
            .await
            .unwrap();
        repo.save_ai_conversation(
            patient.id,
            vec![ChatMessage {
                role: "user".to_string(),
                content: "既往歴を要約して".to_string(),
            }],
        )
        .await
        .unwrap();
        let other_record = repo.add_record(record_draft(other.id)).await.unwrap();

        repo.delete_patient(patient.id).await.unwrap();

        assert!(repo.get_patient(patient.id).unwrap().is_none());
        assert!(repo.get_records_by_patient(patient.id).unwrap().is_empty());
        assert!(repo
            .get_prescriptions_by_patient(patient.id)
            .unwrap()
            .is_empty());
        assert!(repo
            .get_lab_results_by_patient(patient.id)
            .unwrap()
            .is_empty());
        assert!(repo.get_media_by_parent(patient.id).unwrap().is_empty());
        assert!(repo.get_media_by_parent(record.id).unwrap().is_empty());
        assert!(repo.get_media_by_parent(lab.id).unwrap().is_empty());

        // 其他患者的数据不受影响
        assert!(repo.get_patient(other.id).unwrap().is_some());
        assert_eq!(repo.get_records_by_patient(other.id).unwrap().len(), 1);
        assert!(repo.get_record(other_record.id).unwrap().is_some());

        // AI对话不在级联范围内
        assert_eq!(repo.count_summary().unwrap().ai_conversations, 1);
    }

    #[tokio::test]
    async fn test_delete_record_removes_its_media() {
        let (_dir, mut repo) = open_repo().await;
        let patient = repo.add_patient(patient_draft("田中 太郎")).await.unwrap();
        let record = repo.add_record(record_draft(patient.id)).await.unwrap();
        repo.add_media(media_draft(record.id, ParentType::Record))
            .await
            .unwrap();

        repo.delete_record(record.id).await.unwrap();

        assert!(repo.get_record(record.id).unwrap().is_none());
        assert!(repo.get_media_by_parent(record.id).unwrap().is_empty());
        assert_eq!(repo.count_summary().unwrap().media, 0);
    }

    #[tokio::test]
    async fn test_ai_conversation_upsert() {
        let (_dir, mut repo) = open_repo().await;
        let patient = repo.add_patient(patient_draft("田中 太郎")).await.unwrap();

        repo.save_ai_conversation(
            patient.id,
            vec![ChatMessage {
                role: "user".to_string(),
                content: "最近の血圧は？".to_string(),
            }],
        )
        .await
        .unwrap();
        repo.save_ai_conversation(
            patient.id,
            vec![
                ChatMessage {
                    role: "user".to_string(),
                    content: "最近の血圧は？".to_string(),
                },
                ChatMessage {
                    role: "assistant".to_string(),
                    content: "直近3回の平均は128/82です。".to_string(),
                },
            ],
        )
        .await
        .unwrap();

        assert_eq!(repo.count_summary().unwrap().ai_conversations, 1);
        let row = repo.get_ai_conversation(patient.id).unwrap().unwrap();
        assert_eq!(row.conversation.len(), 2);
        assert_eq!(row.conversation[1].role, "assistant");

        let ghost = Uuid::new_v4();
        assert!(repo.get_ai_conversation(ghost).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_display_settings_default_and_roundtrip() {
        let (_dir, mut repo) = open_repo().await;

        let defaults = repo.display_settings().unwrap();
        assert_eq!(defaults["id"], "display_settings");
        assert_eq!(defaults["tabs"]["prescription"], true);
        assert_eq!(defaults["fields"]["karte"]["spo2"], true);

        let mut settings = defaults.clone();
        settings["tabs"]["lab"] = serde_json::json!(false);
        settings["id"] = serde_json::json!("tampered");
        repo.save_display_settings(settings).await.unwrap();

        let loaded = repo.display_settings().unwrap();
        assert_eq!(loaded["id"], "display_settings"); // 主键被强制固定
        assert_eq!(loaded["tabs"]["lab"], false);
        assert_eq!(loaded["tabs"]["prescription"], true);
    }

    #[tokio::test]
    async fn test_delete_all_data() {
        let (_dir, mut repo) = open_repo().await;
        let patient = repo.add_patient(patient_draft("田中 太郎")).await.unwrap();
        repo.add_record(record_draft(patient.id)).await.unwrap();
        repo.add_lab_result(lab_draft(patient.id)).await.unwrap();
        repo.save_display_settings(default_display_settings())
            .await
            .unwrap();

        repo.delete_all_data().await.unwrap();

        let counts = repo.count_summary().unwrap();
        assert_eq!(counts, CountSummary::default());
        // 设置一并清空，读取回落到默认值
        assert_eq!(
            repo.display_settings().unwrap()["tabs"]["prescription"],
            true
        );
    }

    #[tokio::test]
    async fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let patient_id;
        {
            let mut repo = EmrRepository::open(dir.path()).await.unwrap();
            let patient = repo.add_patient(patient_draft("田中 太郎")).await.unwrap();
            patient_id = patient.id;
            repo.add_record(record_draft(patient_id)).await.unwrap();
            repo.close().await.unwrap();
        }

        let repo = EmrRepository::open(dir.path()).await.unwrap();
        assert!(repo.get_patient(patient_id).unwrap().is_some());
        assert_eq!(repo.get_records_by_patient(patient_id).unwrap().len(), 1);
    }
}
