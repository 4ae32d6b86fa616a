use async_trait::async_trait;
use bible_corpus_scraper::config::Config;
use bible_corpus_scraper::error::ExtractError;
use bible_corpus_scraper::infrastructure::{FetchOutcome, Translation, Translator};
use bible_corpus_scraper::models::{SentencePair, TRANSLATION_FAILED_MARK};
use bible_corpus_scraper::orchestrator::TranslationApp;
use bible_corpus_scraper::utils::RunLog;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// 内存中的翻译器：译文就是大写的原文，合并符号原样保留
#[derive(Default)]
struct ScriptedTranslator {
    failing: HashSet<String>,
    /// 前几次请求丢掉合并符号，切分数量对不上
    garbled_calls: usize,
    calls: AtomicUsize,
    sessions: AtomicUsize,
    closed: AtomicUsize,
    artifacts: AtomicUsize,
}

impl ScriptedTranslator {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for ScriptedTranslator {
    type Session = ();

    async fn open_session(&self, _label: &str) -> Result<(), ExtractError> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn translate(&self, _session: &mut (), text: &str, _label: &str) -> FetchOutcome<Translation> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|s| text.contains(s.as_str())) {
            return FetchOutcome::Retryable(ExtractError::Other("连接被重置".into()));
        }
        if call < self.garbled_calls {
            return FetchOutcome::Success(Translation::Merged(text.replace("<|||>", "").to_uppercase()));
        }
        FetchOutcome::Success(Translation::Merged(text.to_uppercase()))
    }

    async fn capture_artifact(&self, _session: &mut (), _label: &str) -> Option<PathBuf> {
        self.artifacts.fetch_add(1, Ordering::SeqCst);
        None
    }

    async fn close_session(&self, _session: ()) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn sentences(n: usize) -> Vec<SentencePair> {
    (1..=n)
        .map(|i| SentencePair {
            source: format!("sentence {}", i),
            original: format!("original {}", i),
        })
        .collect()
}

fn test_config(output_root: &Path, batch_size: u32) -> Config {
    Config {
        max_workers: 3,
        sentence_batch_size: batch_size,
        sentences_per_request_range: (2, 2),
        retry_attempts: 2,
        retry_delay_range: (0.1, 0.2),
        min_batch_interval: 0.5,
        max_batch_interval: 1.0,
        new_batch_delay_range: (1.0, 2.0),
        queue_timeout_secs: 10,
        translation_output_root: output_root.to_path_buf(),
        ..Config::default()
    }
}

fn checkpoint_files(run_dir: &Path) -> BTreeSet<String> {
    match fs::read_dir(run_dir.join("partial_results")) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => BTreeSet::new(),
    }
}

fn read_output(run_dir: &Path) -> Vec<serde_json::Value> {
    let content = fs::read_to_string(run_dir.join("en_kw_original_parallel.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_sentences_translated_in_input_order() {
    let root = tempfile::tempdir().unwrap();
    let run_dir = root.path().join("20240101_000000");
    fs::create_dir_all(&run_dir).unwrap();

    // 7 句按 3 句一批切成 3-2-2
    let app = TranslationApp::new(
        test_config(root.path(), 3),
        ScriptedTranslator::default(),
        &run_dir,
        None,
    );
    let summary = app.run_with(sentences(7)).await.unwrap();

    assert_eq!(summary.total_tasks, 3);
    assert_eq!(summary.clean, 3);
    assert_eq!(summary.records, 7);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.success_rate(), 100.0);
    assert_eq!(checkpoint_files(&run_dir).len(), 3);

    let translator = &app.context().backend;
    assert_eq!(translator.sessions.load(Ordering::SeqCst), 3);
    assert_eq!(translator.closed.load(Ordering::SeqCst), 3);

    let output = read_output(&run_dir);
    assert_eq!(output.len(), 7);
    for (i, record) in output.iter().enumerate() {
        assert_eq!(record["en"], format!("sentence {}", i + 1));
        assert_eq!(record["kw"], format!("SENTENCE {}", i + 1));
        assert_eq!(record["original"], format!("original {}", i + 1));
    }
}

#[tokio::test(start_paused = true)]
async fn test_failed_chunk_is_marked_and_not_checkpointed() {
    let root = tempfile::tempdir().unwrap();
    let run_dir = root.path().join("20240101_000000");
    fs::create_dir_all(&run_dir).unwrap();
    let log_path = run_dir.join("run.log");
    fs::write(&log_path, "").unwrap();

    let translator = ScriptedTranslator {
        failing: ["sentence 4".to_string()].into_iter().collect(),
        ..Default::default()
    };
    let app = TranslationApp::new(
        test_config(root.path(), 3),
        translator,
        &run_dir,
        Some(RunLog::new(&run_dir, &log_path)),
    );
    let summary = app.run_with(sentences(7)).await.unwrap();

    assert_eq!(summary.clean, 2);
    assert_eq!(summary.partial, 1);
    assert_eq!(summary.records, 7);
    assert_eq!(summary.failed, 2);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(app.context().backend.artifacts.load(Ordering::SeqCst), 1);

    let files = checkpoint_files(&run_dir);
    assert_eq!(files.len(), 2);
    assert!(!files.iter().any(|f| f.contains("sentences_4-5")));

    let output = read_output(&run_dir);
    assert_eq!(output[3]["en"], "sentence 4");
    assert_eq!(output[3]["kw"], TRANSLATION_FAILED_MARK);
    assert_eq!(output[4]["kw"], TRANSLATION_FAILED_MARK);
    assert_eq!(output[5]["kw"], "SENTENCE 6");

    let filtered: Vec<String> = fs::read_dir(run_dir.join("filtered_logs"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(filtered.len(), 3);
    assert!(filtered
        .iter()
        .any(|f| f.contains("EN2KW_sentences_4-5") && f.ends_with("_err.log")));
}

#[tokio::test(start_paused = true)]
async fn test_second_run_reuses_sentence_checkpoints() {
    let root = tempfile::tempdir().unwrap();

    let first_dir = root.path().join("20240101_000000");
    fs::create_dir_all(&first_dir).unwrap();
    let first = TranslationApp::new(
        test_config(root.path(), 3),
        ScriptedTranslator {
            failing: ["sentence 4".to_string()].into_iter().collect(),
            ..Default::default()
        },
        &first_dir,
        None,
    );
    assert_eq!(first.run_with(sentences(7)).await.unwrap().partial, 1);

    let second_dir = root.path().join("20240102_000000");
    fs::create_dir_all(&second_dir).unwrap();
    let second = TranslationApp::new(
        test_config(root.path(), 3),
        ScriptedTranslator::default(),
        &second_dir,
        None,
    );
    let summary = second.run_with(sentences(7)).await.unwrap();

    // 只有上次失败的 4-5 重新翻译，一次请求两句
    assert_eq!(summary.cached, 2);
    assert_eq!(summary.clean, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(second.context().backend.calls(), 1);
    assert_eq!(second.context().scheduler.completed_batches(), 3);
    assert_eq!(checkpoint_files(&second_dir).len(), 3);
    assert_eq!(read_output(&second_dir).len(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_split_mismatch_is_retried() {
    let root = tempfile::tempdir().unwrap();
    let run_dir = root.path().join("20240101_000000");
    fs::create_dir_all(&run_dir).unwrap();

    let translator = ScriptedTranslator {
        garbled_calls: 1,
        ..Default::default()
    };
    let app = TranslationApp::new(test_config(root.path(), 2), translator, &run_dir, None);
    let summary = app.run_with(sentences(2)).await.unwrap();

    assert_eq!(summary.clean, 1);
    assert_eq!(summary.successful, 2);
    assert_eq!(app.context().backend.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_run_reads_sentences_file() {
    let root = tempfile::tempdir().unwrap();
    let run_dir = root.path().join("20240101_000000");
    fs::create_dir_all(&run_dir).unwrap();
    let input = root.path().join("sentences.json");
    fs::write(&input, r#"["good morning", {"source": "thank you", "original": "diolch"}]"#).unwrap();

    let missing = TranslationApp::new(
        test_config(root.path(), 5),
        ScriptedTranslator::default(),
        &run_dir,
        None,
    );
    assert!(missing.run().await.is_err());

    let config = Config {
        sentences_file: Some(input),
        ..test_config(root.path(), 5)
    };
    let app = TranslationApp::new(config, ScriptedTranslator::default(), &run_dir, None);
    let summary = app.run().await.unwrap();

    assert_eq!(summary.records, 2);
    let output = read_output(&run_dir);
    assert_eq!(output[1]["kw"], "THANK YOU");
    assert_eq!(output[1]["original"], "diolch");
}
