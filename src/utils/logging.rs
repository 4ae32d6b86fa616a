/// 日志工具模块
///
/// 负责初始化 tracing（终端 + 运行日志文件），以及按任务切分日志
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::utils::text::sanitize_filename;

const LOG_EXT: &str = "log";

/// 本次运行的日志文件句柄
#[derive(Debug, Clone)]
pub struct RunLog {
    run_dir: PathBuf,
    log_path: PathBuf,
}

impl RunLog {
    /// 不安装 subscriber，只描述日志文件位置
    pub fn new(run_dir: impl Into<PathBuf>, log_path: impl Into<PathBuf>) -> Self {
        Self {
            run_dir: run_dir.into(),
            log_path: log_path.into(),
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// 从运行日志中筛选行，写入新的日志文件
    ///
    /// # 参数
    /// - `predicate`: 返回 true 的行会被保留
    /// - `new_filename`: 新文件名（会被清洗，自动补 `.log`）
    /// - `output_folder`: 运行目录下的子目录，None 表示运行目录本身
    ///
    /// # 返回
    /// 返回新文件路径
    pub fn filter_log(
        &self,
        predicate: impl Fn(&str) -> bool,
        new_filename: &str,
        output_folder: Option<&str>,
    ) -> Result<PathBuf> {
        let stem = new_filename.split('.').next().unwrap_or(new_filename);
        let filename = format!("{}.{}", sanitize_filename(stem, 80), LOG_EXT);

        let target_dir = match output_folder {
            Some(folder) => self.run_dir.join(sanitize_filename(folder, 80)),
            None => self.run_dir.clone(),
        };
        fs::create_dir_all(&target_dir)
            .with_context(|| format!("无法创建目录: {}", target_dir.display()))?;

        let src = File::open(&self.log_path)
            .with_context(|| format!("无法读取日志文件: {}", self.log_path.display()))?;

        let mut total = 0usize;
        let mut kept = Vec::new();
        for line in BufReader::new(src).lines() {
            let line = line?;
            total += 1;
            if predicate(&line) {
                kept.push(line);
            }
        }

        let new_path = target_dir.join(filename);
        let mut dst = File::create(&new_path)
            .with_context(|| format!("无法写入日志文件: {}", new_path.display()))?;
        for line in &kept {
            writeln!(dst, "{}", line)?;
        }

        let ratio = if total == 0 {
            0.0
        } else {
            kept.len() as f64 / total as f64 * 100.0
        };
        info!("已生成筛选日志: {}", new_path.display());
        info!(
            "原日志 {} 行 → 筛选后 {} 行 (保留 {:.1}%)",
            total,
            kept.len(),
            ratio
        );

        Ok(new_path)
    }
}

/// 在输出根目录下创建本次运行的目录（按时间戳命名）
pub fn create_run_dir(output_root: &Path) -> Result<PathBuf> {
    let name = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let run_dir = output_root.join(name);
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("无法创建运行目录: {}", run_dir.display()))?;
    Ok(run_dir)
}

/// 初始化日志：终端输出 + 运行目录下的日志文件
///
/// 日志级别优先取 `RUST_LOG`，否则为 info（verbose 时为 debug）
pub fn init(run_dir: &Path, verbose: bool) -> Result<RunLog> {
    let run_name = run_dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "run".to_string());
    let log_path = run_dir.join(format!("{}.{}", run_name, LOG_EXT));
    let file = File::create(&log_path)
        .with_context(|| format!("无法创建日志文件: {}", log_path.display()))?;

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("日志初始化失败")?;

    info!("日志已初始化, 日志文件: {}", log_path.display());
    info!("输出目录: {}", run_dir.display());

    Ok(RunLog::new(run_dir, log_path))
}

/// 只输出到终端的日志（用于去重等不需要运行目录的子命令）
pub fn init_console(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init()
        .context("日志初始化失败")?;
    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(workers: usize, tasks: usize) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 多 worker 抓取模式");
    info!("📊 worker 数: {}, 任务数: {}", workers, tasks);
    info!("{}", "=".repeat(60));
}

/// 记录任务开始
pub fn log_task_start(label: &str) {
    info!("\n{}", "─".repeat(60));
    info!("{} 📦 开始处理", label);
}

/// 记录任务完成
pub fn log_task_complete(label: &str, records: usize, errors: usize) {
    if errors == 0 {
        info!("{} ✓ 完成: {} 条记录", label, records);
    } else {
        info!("{} ⚠️ 部分完成: {} 条记录, {} 个错误", label, records, errors);
    }
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(
    clean: usize,
    partial: usize,
    cached: usize,
    total: usize,
    run_dir: &Path,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 完整: {}/{}", clean, total);
    info!("⚠️ 部分完成: {}", partial);
    info!("♻️ 复用检查点: {}", cached);
    info!("{}", "=".repeat(60));
    info!("\n输出已保存至: {}", run_dir.display());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_log_keeps_matching_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("run.log");
        fs::write(
            &log_path,
            "INFO Worker 1 | Batch 1/2 | start\nINFO Worker 2 | Batch 2/2 | start\nINFO Worker 1 | Batch 1/2 | done\n",
        )
        .unwrap();

        let run_log = RunLog::new(dir.path(), &log_path);
        let path = run_log
            .filter_log(
                |line| line.contains("Worker 1 | Batch 1/2"),
                "Worker 1 | Batch 1/2 |_err",
                Some("filtered_logs"),
            )
            .unwrap();

        assert!(path.starts_with(dir.path().join("filtered_logs")));
        assert!(path.to_string_lossy().ends_with("Worker_1_Batch_1_2_err.log"));
        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(!content.contains("Worker 2"));
    }

    #[test]
    fn test_filter_log_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let run_log = RunLog::new(dir.path(), dir.path().join("missing.log"));
        assert!(run_log.filter_log(|_| true, "x", None).is_err());
    }

    #[test]
    fn test_create_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = create_run_dir(dir.path()).unwrap();
        assert!(run_dir.is_dir());
        assert_eq!(run_dir.parent(), Some(dir.path()));
    }
}
