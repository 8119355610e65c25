use async_trait::async_trait;
use eroll_fetch::clients::{CaptchaSource, DocumentFetcher, LanguageSource};
use eroll_fetch::services::artifact_writer::PDF_DIR;
use eroll_fetch::{
    App, ArtifactWriter, CaptchaBatch, CaptchaToken, Config, FetchError, FetchOutcome,
    FetchResult, PartFlow, RetryCoordinator, Scheduler, WorkItem,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

/// "%PDF-1.4\n"
const PDF_B64: &str = "JVBERi0xLjQK";

// ========== 内存实现 ==========

/// 每次返回固定数量的验证码；`empty_on_calls` 中的调用序号返回空列表
struct FakeSolver {
    size: usize,
    calls: AtomicUsize,
    empty_on_calls: HashSet<usize>,
}

impl FakeSolver {
    fn new(size: usize) -> Self {
        Self {
            size,
            calls: AtomicUsize::new(0),
            empty_on_calls: HashSet::new(),
        }
    }
}

#[async_trait]
impl CaptchaSource for FakeSolver {
    async fn request_batch(&self, _count: usize) -> FetchResult<CaptchaBatch> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.empty_on_calls.contains(&call) {
            return Err(FetchError::SolverUnavailable("返回的验证码列表为空".to_string()));
        }
        Ok(CaptchaBatch::new(
            (0..self.size)
                .map(|i| CaptchaToken::new(format!("{}-{}", call, i), format!("v{}", i)))
                .collect(),
        ))
    }
}

struct FakeLanguages;

#[async_trait]
impl LanguageSource for FakeLanguages {
    async fn available_languages(&self, _item: &WorkItem) -> FetchResult<Vec<String>> {
        Ok(vec!["HIN".to_string(), "ENG".to_string()])
    }
}

/// 按分区号决定第几个验证码成功（None 表示全部失败），并记录调用
#[derive(Default)]
struct FakePortal {
    succeed_on: HashMap<u32, Option<usize>>,
    calls: Mutex<Vec<(u32, String)>>,
    delay: Option<Duration>,
}

impl FakePortal {
    fn calls_for(&self, part: u32) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| *p == part)
            .count()
    }

    fn call_order(&self) -> Vec<u32> {
        self.calls.lock().unwrap().iter().map(|(p, _)| *p).collect()
    }
}

#[async_trait]
impl DocumentFetcher for FakePortal {
    async fn fetch(&self, item: &WorkItem, language: &str, token: &CaptchaToken) -> FetchOutcome {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        assert_eq!(language, "ENG");

        let attempt = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((item.part_number, token.value.clone()));
            calls.iter().filter(|(p, _)| *p == item.part_number).count() - 1
        };

        match self.succeed_on.get(&item.part_number).copied().unwrap_or(Some(0)) {
            Some(n) if n == attempt => FetchOutcome::Success(PDF_B64.as_bytes().to_vec()),
            _ => FetchOutcome::Failure(FetchError::EmptyPayload),
        }
    }
}

/// 记录同时在途的下载请求数峰值
struct InFlightPortal {
    delay: Duration,
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlightPortal {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DocumentFetcher for InFlightPortal {
    async fn fetch(&self, _item: &WorkItem, _language: &str, _token: &CaptchaToken) -> FetchOutcome {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        FetchOutcome::Success(PDF_B64.as_bytes().to_vec())
    }
}

/// 指定分区的下载直接 panic，其余成功
struct PanickingPortal {
    panic_on: u32,
}

#[async_trait]
impl DocumentFetcher for PanickingPortal {
    async fn fetch(&self, item: &WorkItem, _language: &str, _token: &CaptchaToken) -> FetchOutcome {
        if item.part_number == self.panic_on {
            panic!("portal crashed on part {}", item.part_number);
        }
        FetchOutcome::Success(PDF_B64.as_bytes().to_vec())
    }
}

fn items(n: u32) -> Vec<WorkItem> {
    (1..=n).map(|p| WorkItem::new("S07", "S0702", 4, p)).collect()
}

fn flow(root: &Path, solver: Arc<FakeSolver>, portal: Arc<dyn DocumentFetcher>) -> Arc<PartFlow> {
    let coordinator = RetryCoordinator::new(
        solver,
        Arc::new(FakeLanguages),
        portal,
        vec!["ENG".to_string(), "HIN".to_string()],
        10,
    );
    Arc::new(PartFlow::new(coordinator, ArtifactWriter::new(root)))
}

fn pdf_count(root: &Path, state: &str) -> usize {
    std::fs::read_dir(root.join(state).join(PDF_DIR))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

// ========== 调度 ==========

#[tokio::test]
async fn test_three_parts_two_groups_processed_once() {
    let root = tempfile::tempdir().unwrap();
    let solver = Arc::new(FakeSolver::new(3));
    let portal = Arc::new(FakePortal {
        delay: Some(Duration::from_millis(5)),
        ..Default::default()
    });

    let scheduler = Scheduler::new(flow(root.path(), solver.clone(), portal.clone()), 2, 2);
    let report = scheduler.run(items(3)).await;

    assert_eq!(report.total, 3);
    assert_eq!(report.succeeded, 3);
    assert!(report.ledger.is_empty());
    for part in 1..=3 {
        assert_eq!(portal.calls_for(part), 1, "part {}", part);
    }
    assert_eq!(solver.calls.load(Ordering::SeqCst), 3);
    assert_eq!(pdf_count(root.path(), "S07"), 3);
}

#[tokio::test]
async fn test_groups_overlap_but_never_exceed_concurrency() {
    let root = tempfile::tempdir().unwrap();
    let portal = Arc::new(InFlightPortal::new(Duration::from_millis(20)));

    let scheduler = Scheduler::new(flow(root.path(), Arc::new(FakeSolver::new(1)), portal.clone()), 2, 2);
    let report = scheduler.run(items(12)).await;

    assert_eq!(report.succeeded, 12);
    let peak = portal.peak.load(Ordering::SeqCst);
    assert!(peak <= 2, "peak in flight {}", peak);
    assert!(peak > 1, "groups never overlapped");
    assert_eq!(portal.current.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_single_group_runs_sequentially() {
    let root = tempfile::tempdir().unwrap();
    let portal = Arc::new(InFlightPortal::new(Duration::from_millis(5)));

    let scheduler = Scheduler::new(flow(root.path(), Arc::new(FakeSolver::new(1)), portal.clone()), 4, 10);
    let report = scheduler.run(items(6)).await;

    assert_eq!(report.succeeded, 6);
    assert_eq!(portal.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_panicking_part_only_aborts_itself() {
    let root = tempfile::tempdir().unwrap();
    let portal = Arc::new(PanickingPortal { panic_on: 2 });

    let scheduler = Scheduler::new(flow(root.path(), Arc::new(FakeSolver::new(1)), portal), 1, 3);
    let report = scheduler.run(items(3)).await;

    assert_eq!(report.succeeded, 2);
    let failures = report.ledger.records();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, "WorkerAborted");
    assert_eq!(failures[0].item.part_number, 2);
    assert!(failures[0].reason.contains("portal crashed on part 2"));
    assert_eq!(pdf_count(root.path(), "S07"), 2);
}

#[tokio::test]
async fn test_items_within_group_run_in_order() {
    let root = tempfile::tempdir().unwrap();
    let portal = Arc::new(FakePortal::default());

    let scheduler = Scheduler::new(flow(root.path(), Arc::new(FakeSolver::new(2)), portal.clone()), 1, 5);
    scheduler.run(items(5)).await;

    assert_eq!(portal.call_order(), vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_empty_solver_batch_does_not_stop_other_items() {
    let root = tempfile::tempdir().unwrap();
    let solver = Arc::new(FakeSolver {
        empty_on_calls: HashSet::from([2]),
        ..FakeSolver::new(2)
    });
    let portal = Arc::new(FakePortal::default());

    let scheduler = Scheduler::new(flow(root.path(), solver, portal.clone()), 1, 1);
    let report = scheduler.run(items(3)).await;

    assert_eq!(report.succeeded, 2);
    let failures = report.ledger.records();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, "SolverUnavailable");
    assert_eq!(failures[0].item.part_number, 2);
    assert_eq!(portal.calls_for(2), 0);
}

#[tokio::test]
async fn test_exhausted_and_late_success_mix() {
    let root = tempfile::tempdir().unwrap();
    let solver = Arc::new(FakeSolver::new(4));
    let portal = Arc::new(FakePortal {
        succeed_on: HashMap::from([(1, Some(3)), (2, None), (3, Some(1))]),
        ..Default::default()
    });

    let scheduler = Scheduler::new(flow(root.path(), solver.clone(), portal.clone()), 3, 1);
    let report = scheduler.run(items(3)).await;

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(portal.calls_for(1), 4);
    assert_eq!(portal.calls_for(2), 4);
    assert_eq!(portal.calls_for(3), 2);
    // 每个分区只请求一批
    assert_eq!(solver.calls.load(Ordering::SeqCst), 3);

    let failure = &report.ledger.records()[0];
    assert_eq!(failure.kind, "AllCaptchasExhausted");
    assert_eq!(failure.item.part_number, 2);
}

#[tokio::test]
async fn test_traversal_state_code_recorded_as_failure() {
    let root = tempfile::tempdir().unwrap();
    let out = root.path().join("out");
    let portal = Arc::new(FakePortal::default());

    let scheduler = Scheduler::new(flow(&out, Arc::new(FakeSolver::new(1)), portal), 2, 1);
    let mut work = items(1);
    work.push(WorkItem::new("../../etc", "S0702", 4, 2));
    let report = scheduler.run(work).await;

    assert_eq!(report.succeeded, 1);
    let failures = report.ledger.records();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, "InvalidDestinationPath");
    assert!(!root.path().join("etc").exists());
}

// ========== 完整运行 ==========

const STATE_JSON: &str = r#"{
    "stateCd": "S07",
    "stateName": "Haryana",
    "districts": [{
        "districtCd": "S0702",
        "acs": [
            { "asmblyNo": 4, "parts": [
                { "stateCd": "S07", "districtCd": "S0702", "acNumber": 4, "partNumber": 1, "partName": "A" },
                { "stateCd": "S07", "districtCd": "S0702", "acNumber": 4, "partNumber": 2, "partName": "B" }
            ]},
            { "asmblyNo": 5, "parts": [
                { "stateCd": "S07", "districtCd": "S0702", "acNumber": 5, "partNumber": 3, "isSupplement": true }
            ]}
        ]
    }]
}"#;

#[tokio::test]
async fn test_app_download_run_writes_artifacts_and_ledger() {
    let root = tempfile::tempdir().unwrap();
    let states_dir = root.path().join("states");
    std::fs::create_dir_all(states_dir.join("S07")).unwrap();
    std::fs::write(states_dir.join("S07").join("state.json"), STATE_JSON).unwrap();

    let config = Config {
        metadata_dir: states_dir.clone(),
        output_root: states_dir.clone(),
        ledger_file: root.path().join("failed_parts.json"),
        insights_dir: root.path().join("insights"),
        concurrency: 2,
        group_size: 2,
        captcha_batch_size: 3,
        ..Config::default()
    };
    let portal = Arc::new(FakePortal {
        succeed_on: HashMap::from([(2, None)]),
        ..Default::default()
    });
    let app = App::with_sources(
        config,
        Arc::new(FakeSolver::new(3)),
        Arc::new(FakeLanguages),
        portal,
    );

    let report = assert_ok!(app.download_pdfs(&[]).await);

    assert_eq!(report.total, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(pdf_count(&states_dir, "S07"), 2);
    assert!(states_dir.join("S07").join("parts.json").exists());

    let supplement_written = std::fs::read_dir(states_dir.join("S07").join(PDF_DIR))
        .unwrap()
        .filter_map(|e| e.ok())
        .any(|e| e.file_name().to_string_lossy().contains("_part3_supplement_"));
    assert!(supplement_written);

    let ledger: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(root.path().join("failed_parts.json")).unwrap())
            .unwrap();
    assert_eq!(ledger["total"], 1);
    assert_eq!(ledger["failures"][0]["item"]["partNumber"], 2);
    assert_eq!(ledger["failures"][0]["kind"], "AllCaptchasExhausted");

    let insights = assert_ok!(app.show_insights(&[]).await);
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].parts, 3);
    assert_eq!(insights[0].pdfs, 2);

    let metrics = assert_ok!(app.generate_insights(&[]).await);
    assert_eq!(metrics.total_parts, 3);
    let written: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(root.path().join("insights").join("metrics.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(written["partsPerState"]["Haryana"], 3);
    assert_eq!(written["constituenciesPerState"]["Haryana"], 2);
    assert!(root
        .path()
        .join("insights")
        .join("states")
        .join("S07")
        .join("S0702.json")
        .exists());
}

#[tokio::test]
async fn test_app_parts_index_stays_in_state_folder() {
    let root = tempfile::tempdir().unwrap();
    let states_dir = root.path().join("meta").join("states");
    std::fs::create_dir_all(states_dir.join("S07")).unwrap();
    let crafted = STATE_JSON.replacen("\"stateCd\": \"S07\"", "\"stateCd\": \"../../escaped\"", 1);
    std::fs::write(states_dir.join("S07").join("state.json"), crafted).unwrap();

    let config = Config {
        metadata_dir: states_dir.clone(),
        output_root: root.path().join("out"),
        ledger_file: root.path().join("failed_parts.json"),
        ..Config::default()
    };
    let app = App::with_sources(
        config,
        Arc::new(FakeSolver::new(1)),
        Arc::new(FakeLanguages),
        Arc::new(FakePortal::default()),
    );

    let report = assert_ok!(app.download_pdfs(&[]).await);

    assert!(states_dir.join("S07").join("parts.json").exists());
    assert!(!root.path().join("escaped").exists());
    // 分区记录自带的 stateCd 仍为 S07，下载不受影响
    assert_eq!(report.succeeded, 3);
}

#[tokio::test]
async fn test_app_missing_metadata_dir_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    let config = Config {
        metadata_dir: root.path().join("missing"),
        output_root: root.path().to_path_buf(),
        ledger_file: root.path().join("failed_parts.json"),
        ..Config::default()
    };
    let app = App::with_sources(
        config,
        Arc::new(FakeSolver::new(1)),
        Arc::new(FakeLanguages),
        Arc::new(FakePortal::default()),
    );

    assert_err!(app.download_pdfs(&[]).await);
}

/// 需要真实的求解服务和网关：cargo test -- --ignored
#[tokio::test]
#[ignore]
async fn test_download_single_part_live() {
    eroll_fetch::utils::logging::init(true);

    let config = Config::from_env();
    let app = App::initialize(config).expect("初始化失败");

    let report = app
        .download_pdfs(&["S07".to_string()])
        .await
        .expect("运行失败");
    println!("成功 {}/{}", report.succeeded, report.total);
}
