//! 诊所日常流程演示程序
//!
//! 展示从患者登记、SOAP记录、处方与检查录入，到测量值分类、
//! 生命体征统计、快照导出与级联删除的完整流程

use chrono::{NaiveDate, Utc};
use emr_core::models::{
    Allergy, AllergySeverity, ChatMessage, EmergencyContact, Gender, LabCategory, NewLabResult,
    NewMedia, NewPatient, NewPrescription, NewRecord, ParentType, Soap, Vitals,
};
use emr_core::utils::export_file_name;
use emr_domain::{calc_age, classify_blood_pressure, classify_bmi, classify_spo2, vital_stats};
use emr_repository::{export_snapshot, EmrRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt::init();

    let dir = tempfile::tempdir()?;
    let mut repo = EmrRepository::open(dir.path()).await?;

    println!("🏥 EMR 诊所流程演示\n");

    // 1. 登记患者
    let patient = repo
        .add_patient(NewPatient {
            patient_code: None,
            name: "山田 太郎".to_string(),
            name_kana: Some("やまだ たろう".to_string()),
            birth_date: NaiveDate::from_ymd_opt(1958, 4, 12).unwrap(),
            gender: Gender::Male,
            phone: Some("03-5678-1234".to_string()),
            email: Some("yamada@example.com".to_string()),
            insurance_number: Some("12345678".to_string()),
            address: Some("東京都中央区本町1-2-3".to_string()),
            emergency_contact: Some(EmergencyContact {
                name: "山田 花子".to_string(),
                relationship: Some("配偶者".to_string()),
                phone: Some("03-5678-5678".to_string()),
            }),
            first_visit_date: Some(Utc::now().date_naive()),
            practitioner: Some("佐藤花子".to_string()),
            memo: None,
            allergies: vec![Allergy {
                allergen: "ペニシリン".to_string(),
                severity: Some(AllergySeverity::Severe),
                note: Some("アナフィラキシー歴あり".to_string()),
            }],
            medical_history: vec![],
        })
        .await?;
    let age = calc_age(patient.birth_date, Utc::now().date_naive());
    println!(
        "✅ 患者已登记: {} {} ({}歳)",
        patient.patient_code, patient.name, age
    );

    // 2. 初诊SOAP记录（含生命体征）
    let record = repo
        .add_record(NewRecord {
            patient_id: patient.id,
            visited_at: None,
            soap: Soap {
                subjective: Some("血圧が高いと指摘された。自覚症状は特にない。".to_string()),
                objective: Some("血圧 152/94mmHg。心音整、心雑音なし。".to_string()),
                assessment: Some("本態性高血圧症".to_string()),
                plan: Some("降圧薬開始（ARB）。減塩指導。1ヶ月後再診で効果判定。".to_string()),
            },
            vitals: Vitals {
                temperature: Some(36.8),
                systolic: Some(152.0),
                diastolic: Some(94.0),
                pulse: Some(78.0),
                spo2: Some(97.0),
                respiratory_rate: Some(16.0),
                weight: Some(70.5),
                height: Some(171.5),
            },
            treatment_memo: Some("心電図検査施行".to_string()),
        })
        .await?;
    println!("✅ 初诊记录已保存: {}", record.id);

    // 3. 测量值分类
    println!("\n📊 测量值分类:");
    let bp = classify_blood_pressure(152.0, 94.0);
    println!("   血压 152/94 → {}", bp.label());
    if let Some(assessment) = classify_bmi(Some(70.5), Some(171.5)) {
        println!(
            "   BMI {:.1} → {}",
            assessment.bmi,
            assessment.category.label()
        );
    }
    if let Some(level) = classify_spo2(Some(97.0)) {
        println!("   SpO2 97% → {}", level.label());
    }

    // 4. 开具处方（关联本次诊疗记录）
    let prescription = repo
        .add_prescription(NewPrescription {
            patient_id: patient.id,
            record_id: Some(record.id),
            prescribed_at: None,
            medicine: "アムロジピン錠5mg".to_string(),
            dosage: Some("1回1錠".to_string()),
            frequency: Some("1日1回 朝食後".to_string()),
            days: Some(28),
            memo: Some("自己判断で中止しないよう指導".to_string()),
        })
        .await?;
    println!("\n✅ 处方已开具: {} {}日分", prescription.medicine, 28);

    // 5. 录入检查结果（判定由参考范围自动推导）
    let lab = repo
        .add_lab_result(NewLabResult {
            patient_id: patient.id,
            examined_at: None,
            category: LabCategory::Blood,
            item_name: "LDLコレステロール".to_string(),
            value: "176".to_string(),
            unit: Some("mg/dL".to_string()),
            reference_min: Some(65.0),
            reference_max: Some(163.0),
            judgment: None,
            memo: None,
        })
        .await?;
    println!(
        "✅ 检查结果已录入: {} = {} ({:?})",
        lab.item_name, lab.value, lab.judgment
    );

    // 6. 附加照片
    repo.add_media(NewMedia {
        parent_id: record.id,
        parent_type: ParentType::Record,
        file_name: "fundus.jpg".to_string(),
        mime_type: "image/jpeg".to_string(),
        data_url: "data:image/jpeg;base64,/9j/4AAQSkZJRg==".to_string(),
        thumbnail: None,
        memo: Some("眼底写真".to_string()),
    })
    .await?;
    println!("✅ 附件已保存");

    // 7. 保存AI对话
    repo.save_ai_conversation(
        patient.id,
        vec![
            ChatMessage {
                role: "user".to_string(),
                content: "この患者の降圧目標は？".to_string(),
            },
            ChatMessage {
                role: "assistant".to_string(),
                content: "75歳未満の外来血圧目標は130/80mmHg未満が目安です。".to_string(),
            },
        ],
    )
    .await?;
    println!("✅ AI对话已保存");

    // 8. 复诊记录后统计生命体征
    repo.add_record(NewRecord {
        patient_id: patient.id,
        visited_at: None,
        soap: Soap {
            subjective: Some("特に症状の変化なし。定期受診。".to_string()),
            objective: Some("血圧 138/86mmHg。".to_string()),
            assessment: Some("経過良好".to_string()),
            plan: Some("現行治療継続。次回1ヶ月後再診。".to_string()),
        },
        vitals: Vitals {
            temperature: Some(36.5),
            systolic: Some(138.0),
            diastolic: Some(86.0),
            pulse: Some(72.0),
            spo2: Some(98.0),
            weight: Some(69.8),
            ..Default::default()
        },
        treatment_memo: None,
    })
    .await?;

    let records = repo.get_records_by_patient(patient.id)?;
    let stats = vital_stats(&records);
    println!("\n📈 生命体征统计 ({} 次就诊):", records.len());
    if let (Some(avg), Some(min), Some(max)) =
        (stats.systolic.avg, stats.systolic.min, stats.systolic.max)
    {
        println!("   收缩压: 平均{} 最低{} 最高{}", avg, min, max);
    }
    if let Some(avg) = stats.weight.avg {
        println!("   体重:   平均{}kg", avg);
    }

    // 9. 导出快照
    let snapshot = export_snapshot(&repo, "次回は脂質再検を予定")?;
    let path = dir.path().join(export_file_name(Utc::now()));
    tokio::fs::write(&path, serde_json::to_vec(&snapshot)?).await?;
    println!(
        "\n💾 快照已导出: {} (患者{} 记录{} 处方{} 检查{})",
        path.display(),
        snapshot.patients.len(),
        snapshot.records.len(),
        snapshot.prescriptions.len(),
        snapshot.lab_results.len()
    );

    // 10. 级联删除患者
    let before = repo.count_summary()?;
    repo.delete_patient(patient.id).await?;
    let after = repo.count_summary()?;
    println!(
        "\n🗑️  级联删除完成: 记录 {}→{}, 处方 {}→{}, 检查 {}→{}, 附件 {}→{}",
        before.records,
        after.records,
        before.prescriptions,
        after.prescriptions,
        before.lab_results,
        after.lab_results,
        before.media,
        after.media
    );

    repo.close().await?;
    println!("\n🎉 演示完成!");
    Ok(())
}
