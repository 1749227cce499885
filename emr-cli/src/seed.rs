//! 示例数据生成
//!
//! 以日本诊所的常见就诊场景为蓝本生成样本数据。全部数据经由仓储层的
//! 校验入口写入，与手工录入遵循同样的业务规则。

use chrono::{Datelike, Duration, NaiveDate, Utc};
use emr_core::models::{
    Allergy, AllergySeverity, EmergencyContact, Gender, Judgment, LabCategory, MedicalHistory,
    NewLabResult, NewPatient, NewPrescription, NewRecord, Soap, Vitals,
};
use emr_core::Result;
use emr_repository::EmrRepository;
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info};
use uuid::Uuid;

/// 生成规模参数
#[derive(Debug, Clone, Copy)]
pub struct SeedOptions {
    pub patients: usize,
    pub records_per_patient: usize,
    pub prescriptions_per_patient: usize,
    pub labs_per_patient: usize,
}

// ========== 主数据 ==========

// 假名读音按校验规则以平假名保存
const SURNAMES: &[(&str, &str)] = &[
    ("田中", "たなか"),
    ("山田", "やまだ"),
    ("佐藤", "さとう"),
    ("鈴木", "すずき"),
    ("高橋", "たかはし"),
    ("伊藤", "いとう"),
    ("渡辺", "わたなべ"),
    ("中村", "なかむら"),
    ("小林", "こばやし"),
    ("加藤", "かとう"),
    ("吉田", "よしだ"),
    ("山本", "やまもと"),
    ("松本", "まつもと"),
    ("井上", "いのうえ"),
    ("木村", "きむら"),
    ("林", "はやし"),
    ("清水", "しみず"),
    ("山口", "やまぐち"),
    ("阿部", "あべ"),
    ("池田", "いけだ"),
];

const GIVEN_MALE: &[(&str, &str)] = &[
    ("太郎", "たろう"),
    ("一郎", "いちろう"),
    ("健太", "けんた"),
    ("大輔", "だいすけ"),
    ("翔太", "しょうた"),
    ("拓也", "たくや"),
    ("直樹", "なおき"),
    ("達也", "たつや"),
    ("和也", "かずや"),
    ("雄太", "ゆうた"),
    ("洋平", "ようへい"),
    ("誠", "まこと"),
];

const GIVEN_FEMALE: &[(&str, &str)] = &[
    ("花子", "はなこ"),
    ("美咲", "みさき"),
    ("陽子", "ようこ"),
    ("恵子", "けいこ"),
    ("裕子", "ゆうこ"),
    ("京子", "きょうこ"),
    ("幸子", "さちこ"),
    ("和子", "かずこ"),
    ("明美", "あけみ"),
    ("久美子", "くみこ"),
    ("真理子", "まりこ"),
    ("智子", "ともこ"),
];

const PREFECTURES: &[&str] = &[
    "東京都",
    "神奈川県",
    "大阪府",
    "愛知県",
    "埼玉県",
    "千葉県",
    "兵庫県",
    "福岡県",
];

const STREETS: &[&str] = &[
    "中央区本町1-2-3",
    "港区南青山4-5-6",
    "新宿区西新宿7-8-9",
    "渋谷区恵比寿2-10-5",
    "横浜市中区山下町3-7-2",
    "名古屋市中区栄2-3-4",
    "大阪市北区梅田5-6-7",
    "福岡市博多区博多駅前4-5-6",
];

const AREA_CODES: &[&str] = &["03", "06", "045", "052", "048", "043", "078", "092"];

const PRACTITIONERS: &[&str] = &["山田太郎", "佐藤花子", "鈴木一郎", "田中美咲", "高橋誠"];

const RELATIONSHIPS: &[&str] = &["配偶者", "子", "親", "兄弟", "姉妹"];

const EMERGENCY_GIVEN: &[&str] = &["太郎", "一郎", "花子", "美咲", "恵子"];

const PATIENT_MEMOS: &[&str] = &[
    "要注意患者（転倒リスク高）",
    "難聴あり、大きな声で話す",
    "車椅子使用",
    "ペースメーカー装着",
    "禁煙外来通院中",
];

const ALLERGENS: &[(&str, AllergySeverity, &str)] = &[
    ("ペニシリン", AllergySeverity::Severe, "アナフィラキシー歴あり"),
    ("セフェム系抗菌薬", AllergySeverity::Moderate, "発疹あり"),
    ("アスピリン", AllergySeverity::Moderate, "喘息発作誘発"),
    ("スギ花粉", AllergySeverity::Mild, "季節性鼻炎"),
    ("ダニ", AllergySeverity::Mild, "通年性鼻炎"),
    ("卵", AllergySeverity::Moderate, "蕁麻疹"),
    ("そば", AllergySeverity::Severe, "重篤なアレルギー"),
    ("ハウスダスト", AllergySeverity::Mild, "アレルギー性鼻炎"),
];

const HISTORIES: &[(&str, i32, i32, &str)] = &[
    ("高血圧症", 2010, 2023, "内服加療中"),
    ("2型糖尿病", 2008, 2022, "HbA1c管理中"),
    ("脂質異常症", 2012, 2024, "スタチン服用"),
    ("気管支喘息", 1995, 2020, "吸入ステロイド使用"),
    ("虫垂炎", 2000, 2020, "虫垂切除術施行"),
    ("片頭痛", 2005, 2023, "発作時トリプタン使用"),
    ("逆流性食道炎", 2015, 2024, "PPI服用"),
    ("痛風", 2013, 2024, "尿酸降下薬服用"),
];

// SOAP四项按行对齐，保证主诉、所见、评估与计划互相吻合
const SOAP_SETS: &[(&str, &str, &str, &str)] = &[
    (
        "3日前から咳と痰が続いている。黄色い痰が出る。発熱はない。",
        "体温36.8度。咽頭発赤軽度。胸部聴診で右下肺野にラ音あり。",
        "急性上気道炎",
        "抗菌薬処方。3日後再診。咳が悪化すれば早期受診を指示。",
    ),
    (
        "昨日から38.5度の発熱があり、全身倦怠感を伴う。関節痛もある。",
        "体温38.2度。咽頭発赤(+)、扁桃腫大(+)。頸部リンパ節腫脹あり。",
        "急性気管支炎",
        "解熱鎮痛薬処方。安静指示。水分摂取励行。インフルエンザ迅速検査施行。",
    ),
    (
        "1週間前から左膝の痛みが悪化。階段の昇り降りがつらい。",
        "左膝関節腫脹(+)。可動域制限あり。McMurray test(-)。圧痛(+)。",
        "変形性膝関節症",
        "NSAIDs処方。膝サポーター装着指導。リハビリテーション処方。",
    ),
    (
        "朝起きたときにめまいがする。ふわふわした感じ。吐き気はない。",
        "Romberg test(-)。眼振なし。起立性血圧変動あり。",
        "良性発作性頭位めまい症",
        "メクリジン処方。頭位変換療法施行。1週間後再診。",
    ),
    (
        "2日前から腹痛があり、下痢を繰り返している。血便はない。",
        "腹部圧痛(+) 臍周囲。筋性防御(-)。腸蠕動音亢進。",
        "感染性胃腸炎",
        "整腸剤・制吐薬処方。食事指導（消化の良いもの）。脱水注意。",
    ),
    (
        "頭痛が週に2-3回ある。こめかみがズキズキする。光が眩しい。",
        "神経学的所見異常なし。項部硬直(-)。視力低下なし。",
        "片頭痛",
        "トリプタン処方。頭痛ダイアリー記録を指示。MRI検討。",
    ),
    (
        "血圧が高いと指摘された。自覚症状は特にない。",
        "血圧 158/96mmHg。心音整、心雑音なし。眼底 KW II度。",
        "本態性高血圧症",
        "降圧薬開始（ARB）。減塩指導。1ヶ月後再診で効果判定。",
    ),
    (
        "健診で血糖値が高いと言われた。口渇、多尿の自覚あり。",
        "空腹時血糖 142mg/dL。HbA1c 7.2%。BMI 26.8。",
        "2型糖尿病",
        "メトホルミン開始。食事・運動療法指導。HbA1c 1ヶ月後再検。",
    ),
    (
        "喉が痛くて飲み込みにくい。声が枯れている。咳はない。",
        "咽頭発赤著明。白苔付着。体温37.5度。開口制限なし。",
        "急性扁桃炎",
        "抗菌薬処方。うがい指示。症状改善なければ血液検査。",
    ),
    (
        "特に症状の変化なし。定期受診。",
        "特記所見なし。全身状態良好。",
        "安定",
        "現行治療継続。次回1ヶ月後再診。",
    ),
];

const TREATMENT_MEMOS: &[&str] = &[
    "創部消毒・ガーゼ交換施行",
    "点滴施行（生食500ml + セフトリアキソン1g）",
    "ネブライザー吸入施行",
    "心電図検査施行",
    "インフルエンザ迅速検査施行",
];

const MEDICINES: &[(&str, &str, &str, &[i64])] = &[
    (
        "ロキソプロフェンNa錠60mg",
        "1回1錠",
        "1日3回 毎食後",
        &[5, 7, 14],
    ),
    (
        "アセトアミノフェン錠200mg",
        "1回2錠",
        "1日3回 毎食後",
        &[3, 5, 7],
    ),
    (
        "アモキシシリンカプセル250mg",
        "1回1カプセル",
        "1日3回 毎食後",
        &[5, 7],
    ),
    (
        "クラリスロマイシン錠200mg",
        "1回1錠",
        "1日2回 朝夕食後",
        &[5, 7],
    ),
    (
        "ランソプラゾールOD錠15mg",
        "1回1錠",
        "1日1回 朝食前",
        &[14, 28, 56],
    ),
    (
        "酸化マグネシウム錠330mg",
        "1回1錠",
        "1日3回 毎食後",
        &[14, 28, 56],
    ),
    (
        "アムロジピン錠5mg",
        "1回1錠",
        "1日1回 朝食後",
        &[28, 56, 90],
    ),
    (
        "メトホルミン塩酸塩錠250mg",
        "1回1錠",
        "1日2回 朝夕食後",
        &[28, 56, 90],
    ),
    (
        "フェキソフェナジン塩酸塩錠60mg",
        "1回1錠",
        "1日2回 朝夕食後",
        &[14, 28, 56],
    ),
    (
        "カルボシステイン錠500mg",
        "1回1錠",
        "1日3回 毎食後",
        &[5, 7, 14],
    ),
];

const RX_MEMOS: &[&str] = &[
    "食前服用厳守",
    "眠気注意",
    "運転注意",
    "残薬あり2週間分",
    "自己判断で中止しないよう指導",
];

// 血液检查: (项目, 单位, 参考下限, 参考上限, 生成下限, 生成上限, 是否取整)
const BLOOD_TESTS: &[(&str, &str, f64, f64, f64, f64, bool)] = &[
    ("白血球数 (WBC)", "/μL", 3300.0, 8600.0, 2800.0, 15000.0, true),
    ("ヘモグロビン (Hb)", "g/dL", 11.6, 14.8, 9.5, 18.0, false),
    ("血小板数 (PLT)", "万/μL", 15.8, 34.8, 10.0, 45.0, false),
    ("AST (GOT)", "U/L", 13.0, 30.0, 8.0, 120.0, true),
    ("ALT (GPT)", "U/L", 7.0, 23.0, 5.0, 150.0, true),
    ("クレアチニン (Cr)", "mg/dL", 0.46, 0.79, 0.3, 2.5, false),
    ("CRP", "mg/dL", 0.0, 0.14, 0.0, 8.0, false),
    ("空腹時血糖", "mg/dL", 73.0, 109.0, 60.0, 250.0, true),
    ("HbA1c", "%", 4.9, 6.0, 4.5, 10.0, false),
    ("LDLコレステロール", "mg/dL", 65.0, 163.0, 50.0, 220.0, true),
];

const URINE_TESTS: &[(&str, &[&str])] = &[
    ("尿蛋白", &["(-)", "(±)", "(+)", "(2+)", "(3+)"]),
    ("尿糖", &["(-)", "(±)", "(+)", "(2+)"]),
    ("尿潜血", &["(-)", "(±)", "(+)", "(2+)", "(3+)"]),
];

const IMAGE_TESTS: &[(&str, &[&str])] = &[
    ("胸部X線", &["異常なし", "心陰影拡大", "肺野浸潤影あり", "胸水貯留"]),
    ("心電図", &["正常洞調律", "洞性頻脈", "PVC散発", "心房細動"]),
    ("腹部エコー", &["脂肪肝", "胆嚢結石", "異常所見なし", "腎嚢胞"]),
];

const OTHER_TESTS: &[(&str, &[&str])] = &[
    ("インフルエンザ迅速検査", &["A型(+)", "B型(+)", "陰性", "陰性"]),
    ("溶連菌迅速検査", &["陽性", "陰性", "陰性"]),
    ("便潜血検査", &["陰性", "陰性", "陽性"]),
];

const LAB_MEMOS: &[&str] = &["前回値より改善", "経過観察", "要再検", "空腹時採血"];

// ========== 生成入口 ==========

/// 批量生成示例数据
pub async fn seed_clinic(repo: &mut EmrRepository, options: SeedOptions) -> Result<()> {
    let mut rng = rand::thread_rng();
    let today = Utc::now().date_naive();

    for index in 0..options.patients {
        let patient = repo.add_patient(random_patient(&mut rng, index, today)).await?;
        debug!("Seeded patient {} ({})", patient.patient_code, patient.name);

        let first_visit = patient.first_visit_date.unwrap_or(today);
        seed_records(
            repo,
            &mut rng,
            patient.id,
            first_visit,
            today,
            options.records_per_patient,
        )
        .await?;
        seed_prescriptions(
            repo,
            &mut rng,
            patient.id,
            first_visit,
            today,
            options.prescriptions_per_patient,
        )
        .await?;
        seed_lab_results(
            repo,
            &mut rng,
            patient.id,
            first_visit,
            today,
            options.labs_per_patient,
        )
        .await?;
    }

    info!(
        "Seeded {} patients ({} records, {} prescriptions, {} lab results each)",
        options.patients,
        options.records_per_patient,
        options.prescriptions_per_patient,
        options.labs_per_patient
    );
    Ok(())
}

fn random_patient(rng: &mut ThreadRng, index: usize, today: NaiveDate) -> NewPatient {
    let male = rng.gen_bool(0.5);
    let (surname, surname_kana) = SURNAMES[index % SURNAMES.len()];
    let given = if male { GIVEN_MALE } else { GIVEN_FEMALE };
    let (given_name, given_kana) = *pick(rng, given);

    let age = rng.gen_range(5..=92);
    let birth_date = NaiveDate::from_ymd_opt(
        today.year() - age,
        rng.gen_range(1..=12),
        rng.gen_range(1..=28),
    )
    .unwrap_or(today);
    let first_visit = NaiveDate::from_ymd_opt(
        rng.gen_range(today.year() - 6..today.year()),
        rng.gen_range(1..=12),
        rng.gen_range(1..=28),
    )
    .unwrap_or(today);

    let allergies = if rng.gen_bool(0.35) {
        let n = rng.gen_range(1..=3);
        ALLERGENS
            .choose_multiple(rng, n)
            .map(|&(allergen, severity, note)| Allergy {
                allergen: allergen.to_string(),
                severity: Some(severity),
                note: Some(note.to_string()),
            })
            .collect()
    } else {
        Vec::new()
    };
    let medical_history = if rng.gen_bool(0.5) {
        let n = rng.gen_range(1..=3);
        HISTORIES
            .choose_multiple(rng, n)
            .map(|&(disease, from, to, note)| MedicalHistory {
                disease: disease.to_string(),
                diagnosed_at: Some(format!(
                    "{}-{:02}",
                    rng.gen_range(from..=to),
                    rng.gen_range(1..=12)
                )),
                note: Some(note.to_string()),
            })
            .collect()
    } else {
        Vec::new()
    };
    let emergency_contact = rng.gen_bool(0.6).then(|| EmergencyContact {
        name: format!("{}{}", pick(rng, SURNAMES).0, pick(rng, EMERGENCY_GIVEN)),
        relationship: Some(pick(rng, RELATIONSHIPS).to_string()),
        phone: Some(random_phone(rng)),
    });

    NewPatient {
        patient_code: None, // 由仓储层顺序编号
        name: format!("{} {}", surname, given_name),
        name_kana: Some(format!("{} {}", surname_kana, given_kana)),
        birth_date,
        gender: if male { Gender::Male } else { Gender::Female },
        phone: Some(random_phone(rng)),
        email: rng
            .gen_bool(0.7)
            .then(|| format!("patient{}@example.com", rng.gen_range(1..=9999))),
        insurance_number: rng
            .gen_bool(0.85)
            .then(|| rng.gen_range(10_000_000u32..=99_999_999).to_string()),
        address: rng
            .gen_bool(0.8)
            .then(|| format!("{}{}", pick(rng, PREFECTURES), pick(rng, STREETS))),
        emergency_contact,
        first_visit_date: Some(first_visit),
        practitioner: Some(pick(rng, PRACTITIONERS).to_string()),
        memo: rng.gen_bool(0.2).then(|| pick(rng, PATIENT_MEMOS).to_string()),
        allergies,
        medical_history,
    }
}

async fn seed_records(
    repo: &mut EmrRepository,
    rng: &mut ThreadRng,
    patient_id: Uuid,
    first_visit: NaiveDate,
    today: NaiveDate,
    count: usize,
) -> Result<()> {
    let span_days = (today - first_visit).num_days().max(1);
    let base_temp = rng.gen_range(36.0..36.6);
    let base_sys: f64 = rng.gen_range(110.0..150.0);
    let base_pulse: f64 = rng.gen_range(60.0..85.0);
    let base_weight = rng.gen_range(40.0..90.0);
    let base_height = rng.gen_range(148.0..182.0);

    for i in 0..count {
        let date = first_visit + Duration::days(span_days * i as i64 / count.max(1) as i64);
        let visited = date
            .and_hms_opt(rng.gen_range(9..18), rng.gen_range(0..60), 0)
            .unwrap_or_default()
            .and_utc();
        let (subjective, objective, assessment, plan) = *pick(rng, SOAP_SETS);

        let vitals = if rng.gen_bool(0.85) {
            let fever = rng.gen_bool(0.1);
            let systolic = (base_sys + rng.gen_range(-15.0..20.0)).round();
            Vitals {
                temperature: Some(round1(if fever {
                    rng.gen_range(37.5..39.5)
                } else {
                    rng.gen_range(base_temp - 0.3..base_temp + 0.4)
                })),
                systolic: Some(systolic),
                // 保证低于收缩压，满足交叉校验
                diastolic: Some((systolic - rng.gen_range(30.0..55.0)).round()),
                pulse: Some((base_pulse + rng.gen_range(-10.0..20.0)).round()),
                spo2: Some(if rng.gen_bool(0.9) {
                    rng.gen_range(95.0_f64..=100.0).round()
                } else {
                    rng.gen_range(90.0_f64..95.0).round()
                }),
                respiratory_rate: rng
                    .gen_bool(0.5)
                    .then(|| rng.gen_range(14.0_f64..23.0).round()),
                weight: rng
                    .gen_bool(0.6)
                    .then(|| round1(base_weight + rng.gen_range(-2.0..2.0))),
                height: (i == 0).then(|| round1(base_height)),
            }
        } else {
            Vitals::default()
        };

        repo.add_record(NewRecord {
            patient_id,
            visited_at: Some(visited),
            soap: Soap {
                subjective: Some(subjective.to_string()),
                objective: Some(objective.to_string()),
                assessment: Some(assessment.to_string()),
                plan: Some(plan.to_string()),
            },
            vitals,
            treatment_memo: rng
                .gen_bool(0.25)
                .then(|| pick(rng, TREATMENT_MEMOS).to_string()),
        })
        .await?;
    }
    Ok(())
}

async fn seed_prescriptions(
    repo: &mut EmrRepository,
    rng: &mut ThreadRng,
    patient_id: Uuid,
    first_visit: NaiveDate,
    today: NaiveDate,
    count: usize,
) -> Result<()> {
    let span_days = (today - first_visit).num_days().max(1);
    for i in 0..count {
        let date = first_visit + Duration::days(span_days * i as i64 / count.max(1) as i64);
        let (medicine, dosage, frequency, day_choices) = *pick(rng, MEDICINES);
        repo.add_prescription(NewPrescription {
            patient_id,
            record_id: None,
            prescribed_at: Some(date),
            medicine: medicine.to_string(),
            dosage: Some(dosage.to_string()),
            frequency: Some(frequency.to_string()),
            days: Some(*pick(rng, day_choices)),
            memo: rng.gen_bool(0.3).then(|| pick(rng, RX_MEMOS).to_string()),
        })
        .await?;
    }
    Ok(())
}

async fn seed_lab_results(
    repo: &mut EmrRepository,
    rng: &mut ThreadRng,
    patient_id: Uuid,
    first_visit: NaiveDate,
    today: NaiveDate,
    count: usize,
) -> Result<()> {
    let span_days = (today - first_visit).num_days().max(1);
    for i in 0..count {
        let date = first_visit + Duration::days(span_days * i as i64 / count.max(1) as i64);
        let draft = match rng.gen_range(0..100) {
            0..=59 => random_blood_test(rng, patient_id, date),
            60..=74 => random_qualitative_test(rng, patient_id, date, LabCategory::Urine, URINE_TESTS),
            75..=89 => random_qualitative_test(rng, patient_id, date, LabCategory::Image, IMAGE_TESTS),
            _ => random_qualitative_test(rng, patient_id, date, LabCategory::Other, OTHER_TESTS),
        };
        repo.add_lab_result(draft).await?;
    }
    Ok(())
}

fn random_blood_test(rng: &mut ThreadRng, patient_id: Uuid, date: NaiveDate) -> NewLabResult {
    let (item, unit, ref_min, ref_max, lo, hi, whole) = *pick(rng, BLOOD_TESTS);
    let raw = rng.gen_range(lo..hi);
    let value = if whole {
        format!("{}", raw.round() as i64)
    } else {
        format!("{:.1}", raw)
    };
    NewLabResult {
        patient_id,
        examined_at: Some(date),
        category: LabCategory::Blood,
        item_name: item.to_string(),
        value,
        unit: Some(unit.to_string()),
        reference_min: Some(ref_min),
        reference_max: Some(ref_max),
        judgment: None, // 数值项目由仓储层按参考范围自动判定
        memo: rng.gen_bool(0.3).then(|| pick(rng, LAB_MEMOS).to_string()),
    }
}

fn random_qualitative_test(
    rng: &mut ThreadRng,
    patient_id: Uuid,
    date: NaiveDate,
    category: LabCategory,
    table: &[(&str, &[&str])],
) -> NewLabResult {
    let (item, values) = *pick(rng, table);
    let value = *pick(rng, values);
    NewLabResult {
        patient_id,
        examined_at: Some(date),
        category,
        item_name: item.to_string(),
        value: value.to_string(),
        unit: None,
        reference_min: None,
        reference_max: None,
        judgment: Some(qualitative_judgment(value)),
        memo: rng.gen_bool(0.3).then(|| pick(rng, LAB_MEMOS).to_string()),
    }
}

/// 定性结果的判定（(-)、陰性、正常系为正常；(±)为需注意；其余记号视为异常）
fn qualitative_judgment(value: &str) -> Judgment {
    if value == "(-)" || value == "陰性" || value == "異常なし" || value.contains("正常") {
        Judgment::Normal
    } else if value == "(±)" {
        Judgment::Caution
    } else if value.starts_with('(') {
        Judgment::Abnormal
    } else {
        Judgment::Caution
    }
}

fn random_phone(rng: &mut ThreadRng) -> String {
    format!(
        "{}-{}-{}",
        pick(rng, AREA_CODES),
        rng.gen_range(1000..=9999),
        rng.gen_range(1000..=9999)
    )
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn pick<'a, T>(rng: &mut ThreadRng, items: &'a [T]) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_seed_clinic_passes_validation() {
        let dir = tempfile::tempdir().unwrap();
        let mut repo = EmrRepository::open(dir.path()).await.unwrap();

        // 全部写入都经过校验入口，任何一条非法数据都会让这里报错
        seed_clinic(
            &mut repo,
            SeedOptions {
                patients: 3,
                records_per_patient: 2,
                prescriptions_per_patient: 1,
                labs_per_patient: 2,
            },
        )
        .await
        .unwrap();

        let counts = repo.count_summary().unwrap();
        assert_eq!(counts.patients, 3);
        assert_eq!(counts.records, 6);
        assert_eq!(counts.prescriptions, 3);
        assert_eq!(counts.lab_results, 6);

        let mut codes: Vec<String> = repo
            .get_all_patients()
            .unwrap()
            .into_iter()
            .map(|p| p.patient_code)
            .collect();
        codes.sort();
        assert_eq!(codes, vec!["P0001", "P0002", "P0003"]);

        repo.close().await.unwrap();
    }

    #[test]
    fn test_qualitative_judgment() {
        assert_eq!(qualitative_judgment("(-)"), Judgment::Normal);
        assert_eq!(qualitative_judgment("陰性"), Judgment::Normal);
        assert_eq!(qualitative_judgment("正常洞調律"), Judgment::Normal);
        assert_eq!(qualitative_judgment("(±)"), Judgment::Caution);
        assert_eq!(qualitative_judgment("(2+)"), Judgment::Abnormal);
        assert_eq!(qualitative_judgment("心陰影拡大"), Judgment::Caution);
    }
}
