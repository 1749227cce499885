//! EMR命令行工具主程序

use chrono::Utc;
use clap::{Parser, Subcommand};
use emr_core::utils::export_file_name;
use emr_core::Result;
use emr_repository::{export_snapshot, import_snapshot, EmrRepository, SCHEMA_VERSION};
use std::path::PathBuf;
use tracing::info;

mod seed;

/// EMR命令行参数
#[derive(Parser, Debug)]
#[command(name = "emr-cli")]
#[command(about = "本地优先电子病历 (EMR) 管理工具")]
struct Args {
    /// 数据目录
    #[arg(short, long, default_value = "./data/emr")]
    data_dir: PathBuf,

    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 初始化数据目录
    Init,

    /// 生成示例数据
    Seed {
        /// 患者数
        #[arg(short, long, default_value = "10")]
        patients: usize,

        /// 每位患者的诊疗记录数
        #[arg(long, default_value = "5")]
        records: usize,

        /// 每位患者的处方数
        #[arg(long, default_value = "3")]
        prescriptions: usize,

        /// 每位患者的检查结果数
        #[arg(long, default_value = "5")]
        labs: usize,
    },

    /// 导出全量快照
    Export {
        /// 输出文件（缺省时按时间戳命名）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 导入快照（按主键合并，已存在的ID跳过）
    Import {
        /// 快照文件
        input: PathBuf,
    },

    /// 显示各集合的数据量
    Stats,

    /// 清空全部数据
    Wipe {
        /// 跳过确认
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(&args.log_level)
        .init();

    let mut repo = EmrRepository::open(&args.data_dir).await?;

    match args.command {
        Commands::Init => {
            println!("✅ 数据目录已初始化: {}", args.data_dir.display());
            println!("   架构版本: v{}", SCHEMA_VERSION);
            print_stats(&repo)?;
        }

        Commands::Seed {
            patients,
            records,
            prescriptions,
            labs,
        } => {
            info!("开始生成示例数据...");
            seed::seed_clinic(
                &mut repo,
                seed::SeedOptions {
                    patients,
                    records_per_patient: records,
                    prescriptions_per_patient: prescriptions,
                    labs_per_patient: labs,
                },
            )
            .await?;
            println!("✅ 示例数据生成完成");
            print_stats(&repo)?;
        }

        Commands::Export { output } => {
            let snapshot = export_snapshot(&repo, "")?;
            let path = output.unwrap_or_else(|| PathBuf::from(export_file_name(Utc::now())));
            let bytes = serde_json::to_vec(&snapshot)?;
            tokio::fs::write(&path, &bytes).await?;
            println!("✅ 快照已导出: {}", path.display());
            println!(
                "   患者:{} 记录:{} 处方:{} 检查:{} 附件:{} ({} 字节)",
                snapshot.patients.len(),
                snapshot.records.len(),
                snapshot.prescriptions.len(),
                snapshot.lab_results.len(),
                snapshot.media.len(),
                bytes.len()
            );
        }

        Commands::Import { input } => {
            let text = tokio::fs::read_to_string(&input).await?;
            let data: serde_json::Value = serde_json::from_str(&text)?;
            let summary = import_snapshot(&mut repo, &data).await?;
            println!("✅ 快照导入完成: {}", input.display());
            println!(
                "   患者: 新增{} 跳过{}",
                summary.patients_added, summary.patients_skipped
            );
            println!(
                "   记录: 新增{} 跳过{}",
                summary.records_added, summary.records_skipped
            );
            println!(
                "   处方: 新增{} 跳过{}",
                summary.prescriptions_added, summary.prescriptions_skipped
            );
            println!(
                "   检查: 新增{} 跳过{}",
                summary.lab_results_added, summary.lab_results_skipped
            );
            println!(
                "   附件: 新增{} 跳过{}",
                summary.media_added, summary.media_skipped
            );
            if let Some(memo) = summary.ai_memo {
                if !memo.is_empty() {
                    println!("   随行备忘: {}", memo);
                }
            }
        }

        Commands::Stats => {
            print_stats(&repo)?;
        }

        Commands::Wipe { yes } => {
            if !yes {
                println!("⚠️  此操作将删除所有数据，请加 --yes 确认");
            } else {
                repo.delete_all_data().await?;
                println!("✅ 所有数据已清空");
            }
        }
    }

    repo.close().await?;
    Ok(())
}

/// 打印各集合的数据量
fn print_stats(repo: &EmrRepository) -> Result<()> {
    let counts = repo.count_summary()?;
    println!("📊 数据概况:");
    println!("   患者:     {}", counts.patients);
    println!("   诊疗记录: {}", counts.records);
    println!("   处方:     {}", counts.prescriptions);
    println!("   检查结果: {}", counts.lab_results);
    println!("   附件:     {}", counts.media);
    println!("   AI对话:   {}", counts.ai_conversations);
    Ok(())
}
