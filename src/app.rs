//! 批量导入应用
//!
//! 扫描资料目录，把每份资料交给导入服务生成题目，
//! 以信号量控制并发数量。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::services::{IngestionService, LlmGenerator};
use crate::store::Store;

/// 应用主结构
pub struct App {
    config: Config,
    ingestion: IngestionService,
}

/// 处理统计
#[derive(Debug, Default)]
struct ProcessingStats {
    success: usize,
    failed: usize,
    created: usize,
    skipped: usize,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let store = Store::open(Path::new(&config.db_path))?;
        let generator = Arc::new(LlmGenerator::new(&config));
        let ingestion = IngestionService::new(store, generator);

        Ok(Self { config, ingestion })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let materials = load_materials(&self.config.material_folder)?;

        if materials.is_empty() {
            warn!("⚠️ 没有找到待处理的资料文件，程序结束");
            return Ok(());
        }

        info!("✓ 找到 {} 份待处理的资料", materials.len());
        info!(
            "📋 最多同时处理 {} 份\n",
            self.config.max_concurrent_materials
        );

        let stats = self.process_all(materials).await?;
        print_final_stats(&stats);

        Ok(())
    }

    /// 并发处理全部资料
    async fn process_all(&self, materials: Vec<(PathBuf, String)>) -> Result<ProcessingStats> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_materials));
        let mut handles = Vec::new();

        for (index, (path, material)) in materials.into_iter().enumerate() {
            let material_index = index + 1;
            let permit = semaphore.clone().acquire_owned().await?;
            let ingestion = self.ingestion.clone();
            let question_count = self.config.question_count;
            let operator_id = self.config.operator_id;

            let handle = tokio::spawn(async move {
                let _permit = permit;
                info!(
                    "[资料 {}] 开始处理: {}",
                    material_index,
                    path.file_name().unwrap_or_default().to_string_lossy()
                );
                ingestion
                    .generate_and_store(&material, question_count, operator_id)
                    .await
            });
            handles.push((material_index, handle));
        }

        let mut stats = ProcessingStats::default();
        for (material_index, handle) in handles {
            match handle.await {
                Ok(Ok(report)) => {
                    info!(
                        "[资料 {}] ✓ 生成 {} 道题目，跳过 {} 条",
                        material_index,
                        report.created(),
                        report.skipped
                    );
                    if self.config.verbose_logging {
                        info!("[资料 {}] 新题ID: {:?}", material_index, report.created_ids);
                    }
                    stats.success += 1;
                    stats.created += report.created();
                    stats.skipped += report.skipped;
                }
                Ok(Err(e)) => {
                    error!("[资料 {}] ❌ 处理失败: {}", material_index, e);
                    stats.failed += 1;
                }
                Err(e) => {
                    error!("[资料 {}] 任务执行失败: {}", material_index, e);
                    stats.failed += 1;
                }
            }
        }
        Ok(stats)
    }
}

/// 读取资料目录下的文本文件（.txt / .md）
fn load_materials(folder: &str) -> Result<Vec<(PathBuf, String)>> {
    info!("\n📁 正在扫描待处理的资料: {}", folder);

    let mut materials = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        let is_text = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("txt") | Some("md")
        );
        if !is_text {
            continue;
        }
        let content = fs::read_to_string(&path)?;
        materials.push((path, content));
    }
    materials.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(materials)
}

// ========== 日志辅助函数 ==========

fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 批量资料导入模式");
    info!("📊 最大并发数: {}", config.max_concurrent_materials);
    info!("📚 每份资料生成题目数: {}", config.question_count);
    info!("{}", "=".repeat(60));
}

fn print_final_stats(stats: &ProcessingStats) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", stats.success, stats.success + stats.failed);
    info!("❌ 失败: {}", stats.failed);
    info!("📝 新增题目: {} 道，跳过 {} 条不合格结果", stats.created, stats.skipped);
    info!("{}", "=".repeat(60));
}
