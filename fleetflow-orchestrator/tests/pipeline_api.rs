//! HTTP-level tests of the pipeline, webhook and upload endpoints.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use fleetflow_client::ClientError;
use fleetflow_core::domain::stage::Stage;
use fleetflow_core::dto::webhook::StageRequest;
use fleetflow_orchestrator::api::{AppState, create_router};
use fleetflow_orchestrator::build_state;
use fleetflow_orchestrator::config::Config;
use fleetflow_orchestrator::repository::train::{InMemoryTrainStore, TrainStore};
use fleetflow_orchestrator::service::dispatch::StageWorker;
use fleetflow_orchestrator::service::stage::StageService;
use fleetflow_orchestrator::storage::StorageGateway;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

#[derive(Default)]
struct RecordingStages {
    calls: Mutex<Vec<(Stage, StageRequest)>>,
    failing: Mutex<Vec<Stage>>,
}

impl RecordingStages {
    fn fail_on(&self, stage: Stage) {
        self.failing.lock().unwrap().push(stage);
    }

    fn calls(&self) -> Vec<(Stage, StageRequest)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StageService for RecordingStages {
    async fn start_stage(&self, stage: Stage, req: &StageRequest) -> fleetflow_client::Result<()> {
        self.calls.lock().unwrap().push((stage, req.clone()));
        if self.failing.lock().unwrap().contains(&stage) {
            return Err(ClientError::ApiError {
                status: 502,
                message: format!("{} service unavailable", stage),
            });
        }
        Ok(())
    }
}

struct TestApp {
    router: Router,
    state: AppState,
    worker: StageWorker,
    stages: Arc<RecordingStages>,
    trains: InMemoryTrainStore,
    storage: StorageGateway,
    _dir: TempDir,
}

impl TestApp {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = Config::new(dir.path());
        let storage = StorageGateway::new(dir.path());
        let stages = Arc::new(RecordingStages::default());
        let trains = InMemoryTrainStore::new();

        let (state, worker) = build_state(
            &config,
            storage.clone(),
            Arc::new(trains.clone()),
            stages.clone(),
        );

        Self {
            router: create_router(state.clone()),
            state,
            worker,
            stages,
            trains,
            storage,
            _dir: dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn start_one_train(&self) -> String {
        let (status, body) = self
            .post_json(
                "/pipeline/start",
                json!({"trains": [{"trainId": "T-100", "trainname": "Alpha", "status": "active"}]}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["runId"].as_str().unwrap().to_string()
    }

    async fn webhook(&self, stage: &str, run_id: &str, file_path: &str, success: bool) -> Value {
        let (status, body) = self
            .post_json(
                &format!("/webhook/{}-finished", stage),
                json!({"runId": run_id, "filePath": file_path, "success": success}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body
    }

    async fn drain(&mut self) -> usize {
        self.worker.drain(&self.state.pipeline).await
    }
}

fn multipart_body(boundary: &str, file_name: &str, content_type: &str, data: &str) -> String {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: {t}\r\n\r\n{d}\r\n--{b}--\r\n",
        b = boundary,
        f = file_name,
        t = content_type,
        d = data
    )
}

#[tokio::test]
async fn start_creates_queryable_run() {
    let app = TestApp::new();

    let (status, body) = app
        .post_json(
            "/pipeline/start",
            json!({"trains": [{"trainId": "T-1", "status": "active"}], "days_to_simulate": 5}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["status"], "simulation_running");
    assert_eq!(body["trainsProcessed"], 1);
    assert_eq!(body["metadata"]["days_to_simulate"], 5);

    let run_id = body["runId"].as_str().unwrap();
    assert!(run_id.starts_with("run_"));

    let (status, run) = app.get(&format!("/pipeline/status/{}", run_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["status"], "simulation_running");
    assert_eq!(run["runId"], run_id);

    let calls = app.stages.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1.days_to_simulate, Some(5));
    assert_eq!(calls[0].1.file_path, body["filePath"].as_str().unwrap());
}

#[tokio::test]
async fn start_rejects_invalid_requests() {
    let app = TestApp::new();

    let (status, body) = app.post_json("/pipeline/start", json!({"trains": []})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("at least one train"));

    let (status, _) = app
        .post_json("/pipeline/start", json!({"trains": [{"trainId": "T-1"}]}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/pipeline/start")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, runs) = app.get("/pipeline/runs").await;
    assert_eq!(runs["totalRuns"], 0);
}

#[tokio::test]
async fn unknown_run_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app.get("/pipeline/status/run_missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Pipeline run not found");
}

#[tokio::test]
async fn simulation_failure_webhook_fails_run() {
    let app = TestApp::new();
    let run_id = app.start_one_train().await;

    let (status, body) = app
        .post_json(
            "/webhook/simulation-finished",
            json!({"runId": run_id, "success": false, "error": "simulation crashed"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["run"]["status"], "failed");

    let (_, run) = app.get(&format!("/pipeline/status/{}", run_id)).await;
    assert_eq!(run["status"], "failed");
    assert_eq!(run["details"]["simulation"]["error"], "simulation crashed");
    assert_eq!(run["details"]["error"]["stage"], "simulation");
}

#[tokio::test]
async fn happy_path_completes_and_ingests() {
    let mut app = TestApp::new();
    let run_id = app.start_one_train().await;

    let body = app.webhook("simulation", &run_id, "/out/sim.csv", true).await;
    assert_eq!(body["run"]["status"], "moo_running");
    assert_eq!(app.drain().await, 1);

    let body = app.webhook("moo", &run_id, "/out/moo.csv", true).await;
    assert_eq!(body["run"]["status"], "rl_running");
    assert_eq!(app.drain().await, 1);

    let stages: Vec<Stage> = app.stages.calls().into_iter().map(|(s, _)| s).collect();
    assert_eq!(stages, vec![Stage::Simulation, Stage::Moo, Stage::Rl]);
    assert_eq!(app.stages.calls()[1].1.file_path, "/out/sim.csv");

    let result = app
        .storage
        .write(
            fleetflow_core::domain::storage::StorageArea::Output,
            &format!("rl_final_{}.csv", run_id),
            "Train ID,Train Name,Total Mileage KM\nT-100,Alpha,4200\n",
        )
        .await
        .unwrap();
    let body = app
        .webhook("rl", &run_id, &result.to_string_lossy(), true)
        .await;
    assert_eq!(body["run"]["status"], "completed");

    let (_, run) = app.get(&format!("/pipeline/status/{}", run_id)).await;
    assert_eq!(run["status"], "completed");
    for key in ["simulation", "moo", "rl"] {
        assert_eq!(run["details"][key]["stage"], "completed");
    }
    assert!(run["details"]["rl"]["completedAt"].is_string());

    let profile = app.trains.get_profile("T-100").await.unwrap().unwrap();
    assert_eq!(profile.mileage.unwrap().total_mileage_km, 4200);

    let (status, job) = app.get(&format!("/upload-status/rl_{}", run_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job["status"], "completed");
    assert_eq!(job["results"]["trains"], 1);
}

#[tokio::test]
async fn uploaded_trains_round_trip_through_ingestion() {
    let mut app = TestApp::new();

    let (status, body) = app
        .post_json(
            "/pipeline/start",
            json!({"trains": [{"trainId": "T-100", "trainname": "Alpha", "status": "active"}]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let run_id = body["runId"].as_str().unwrap().to_string();
    let upload_path = body["filePath"].as_str().unwrap().to_string();
    assert!(upload_path.ends_with(".csv"));

    app.webhook("simulation", &run_id, "/out/sim.csv", true).await;
    app.webhook("moo", &run_id, "/out/moo.csv", true).await;
    assert_eq!(app.drain().await, 2);

    let body = app.webhook("rl", &run_id, &upload_path, true).await;
    assert_eq!(body["run"]["status"], "completed");

    let profile = app.trains.get_profile("T-100").await.unwrap().unwrap();
    assert_eq!(profile.train.train_id, "T-100");
    assert_eq!(profile.train.trainname, "Alpha");
}

#[tokio::test]
async fn missing_rl_result_fails_with_rl_completion() {
    let mut app = TestApp::new();
    let run_id = app.start_one_train().await;

    app.webhook("simulation", &run_id, "/out/sim.csv", true).await;
    app.webhook("moo", &run_id, "/out/moo.csv", true).await;
    app.drain().await;
    app.webhook("rl", &run_id, "/does/not/exist.csv", true).await;

    let (_, run) = app.get(&format!("/pipeline/status/{}", run_id)).await;
    assert_eq!(run["status"], "failed");
    assert_eq!(run["details"]["error"]["stage"], "rl_completion");
    assert_eq!(run["details"]["simulation"]["filePath"], "/out/sim.csv");
}

#[tokio::test]
async fn concurrent_webhooks_leave_a_valid_state() {
    let app = TestApp::new();
    let run_id = app.start_one_train().await;

    let (a, b) = tokio::join!(
        app.webhook("simulation", &run_id, "/out/a.csv", true),
        app.webhook("simulation", &run_id, "/out/b.csv", true),
    );
    assert_eq!(a["ok"], true);
    assert_eq!(b["ok"], true);

    let (_, run) = app.get(&format!("/pipeline/status/{}", run_id)).await;
    assert_eq!(run["status"], "moo_running");
    let path = run["details"]["simulation"]["filePath"].as_str().unwrap();
    assert!(path == "/out/a.csv" || path == "/out/b.csv");
}

#[tokio::test]
async fn trigger_failures_are_recorded() {
    let mut app = TestApp::new();
    app.stages.fail_on(Stage::Moo);

    let run_id = app.start_one_train().await;
    let body = app.webhook("simulation", &run_id, "/out/sim.csv", true).await;
    assert_eq!(body["run"]["status"], "moo_running");

    app.drain().await;
    let (_, run) = app.get(&format!("/pipeline/status/{}", run_id)).await;
    assert_eq!(run["status"], "failed");
    assert_eq!(run["details"]["error"]["stage"], "moo_trigger");
}

#[tokio::test]
async fn simulation_trigger_failure_is_reported_on_start() {
    let app = TestApp::new();
    app.stages.fail_on(Stage::Simulation);

    let (status, body) = app
        .post_json(
            "/pipeline/start",
            json!({"trains": [{"trainId": "T-1", "status": "active"}]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], "failed");
}

#[tokio::test]
async fn webhook_requires_run_id() {
    let app = TestApp::new();

    let (status, body) = app
        .post_json("/webhook/moo-finished", json!({"success": true}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "runId required");

    let (status, body) = app
        .post_json(
            "/webhook/moo-finished",
            json!({"runId": "run_unknown", "success": true, "filePath": "/x.csv"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert!(body["run"].is_null());
}

#[tokio::test]
async fn runs_are_listed_newest_first() {
    let app = TestApp::new();
    let first = app.start_one_train().await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = app.start_one_train().await;

    let (status, body) = app.get("/pipeline/runs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["totalRuns"], 2);
    assert_eq!(body["runs"][0]["runId"], second.as_str());
    assert_eq!(body["runs"][1]["runId"], first.as_str());
}

#[tokio::test]
async fn start_csv_stores_upload() {
    let app = TestApp::new();
    let boundary = "fleetflow-boundary";
    let csv = "trainID,trainname\nT1,A\nT2,B\n";

    let request = Request::builder()
        .method("POST")
        .uri("/pipeline/start-csv")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(multipart_body(boundary, "fleet.csv", "text/csv", csv)))
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trainsProcessed"], 2);
    assert_eq!(body["metadata"]["originalFilename"], "fleet.csv");
    let stored = std::fs::read_to_string(body["filePath"].as_str().unwrap()).unwrap();
    assert_eq!(stored, csv);

    let request = Request::builder()
        .method("POST")
        .uri("/pipeline/start-csv")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(multipart_body(boundary, "photo.png", "image/png", "xx")))
        .unwrap();
    let (status, _) = app.send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_job_can_be_polled() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from("Train ID;Train Name;Cleaning Required\nT-9;Nine;yes\n;;no\n"))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let job_id = body["jobId"].as_str().unwrap().to_string();
    assert_eq!(body["statusUrl"], format!("/upload-status/{}", job_id));

    let mut job = Value::Null;
    for _ in 0..50 {
        let (_, polled) = app.get(&format!("/upload-status/{}", job_id)).await;
        if polled["status"] != "processing" {
            job = polled;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(job["status"], "completed");
    assert_eq!(job["progress"], 100);
    assert_eq!(job["results"]["parsedCount"], 2);
    assert_eq!(job["results"]["cleaning"], 1);
    assert_eq!(job["results"]["skippedMissingTrainFields"], 1);
    assert!(app.trains.get_profile("T-9").await.unwrap().is_some());

    let (status, body) = app.get("/upload-status/upload_missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Job not found");
}

#[tokio::test]
async fn health_and_storage_stats() {
    let app = TestApp::new();
    app.start_one_train().await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, stats) = app.get("/storage/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["input"], 1);
    assert_eq!(stats["output"], 0);
}
