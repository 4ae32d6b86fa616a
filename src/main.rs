use anyhow::{bail, Result};
use std::path::Path;
use tracing::{info, warn};

use bible_corpus_scraper::services::dedup_file;
use bible_corpus_scraper::utils::logging;
use bible_corpus_scraper::{App, BibleComExtractor, Config, KorpusTranslator, TranslationApp};

const DEDUP_USAGE: &str = "用法: scraper dedup <input.json> <source_field> <target_field> [要删除的字段...]";

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("dedup") => return run_dedup(&args[1..]),
        Some("translate") => return run_translate().await,
        _ => {}
    }

    // 加载配置
    let config = Config::load()?;
    config.validate()?;

    // 初始化运行目录与日志
    let run_dir = logging::create_run_dir(&config.output_root)?;
    let run_log = logging::init(&run_dir, config.verbose_logging)?;

    let extractor = BibleComExtractor::new(&run_dir, config.headless, config.page_timeout());
    let app = App::new(config, extractor, &run_dir, Some(run_log));
    let summary = app.run().await?;

    match summary.corpus_path {
        Some(path) => info!("✅ 平行语料: {}", path.display()),
        None => warn!("⚠️ 没有生成平行语料"),
    }

    Ok(())
}

async fn run_translate() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let run_dir = logging::create_run_dir(&config.translation_output_root)?;
    let run_log = logging::init(&run_dir, config.verbose_logging)?;

    let translator = KorpusTranslator::new(&run_dir, config.headless, config.page_timeout());
    let app = TranslationApp::new(config, translator, &run_dir, Some(run_log));
    let summary = app.run().await?;

    match summary.output_path {
        Some(path) => info!("✅ 平行语料: {}", path.display()),
        None => warn!("⚠️ 没有生成平行语料"),
    }
    Ok(())
}

fn run_dedup(args: &[String]) -> Result<()> {
    let [input, source_field, target_field, keys @ ..] = args else {
        bail!(DEDUP_USAGE);
    };
    logging::init_console(false)?;

    let report = dedup_file(Path::new(input), None, source_field, target_field, keys)?;
    info!(
        "原始 {} 条 → 保留 {} 条, 重复 {} 条",
        report.original, report.unique, report.duplicates
    );
    Ok(())
}
