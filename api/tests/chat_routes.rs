use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use ai_llm_service::{
    AiLlmError, ChatMessage, ChatModel, LlmModelConfig, LlmProvider,
    error_handler::{ProviderError, ProviderErrorKind},
    health_service::HealthStatus,
};
use api::{AppSettings, AppState, ChatBackends, EnvSource, REQUEST_ID_HEADER, router};
use async_trait::async_trait;
use chat_history::{ChatRecord, HistoryError, HistoryStore, InMemoryHistory, Role};
use contextor::PromptTemplates;
use search_retriever::{Document, Retriever, RetrieverError, SearchConfig};
use serde_json::{Value, json};
use tokio::net::TcpListener;

const YAPE_Q: &str = "puedo usar yape desde argentina?";
const YAPE_A: &str = "Por ahora Yape solo funciona con números de Perú.";
const HISTORY_URL: &str = "redis://history.local:6379/0";

struct StubSearch {
    fail: bool,
}

#[async_trait]
impl Retriever for StubSearch {
    async fn retrieve(&self, _q: &str) -> Result<Vec<Document>, RetrieverError> {
        if self.fail {
            return Err(RetrieverError::HttpStatus {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                url: "https://yape-search.search.windows.net/indexes/faq/docs".into(),
                snippet: "service busy".into(),
            });
        }
        Ok(vec![
            Document::new("Yape está disponible solo en Perú."),
            Document::new("Para recargar saldo usa la opción Recargar."),
        ])
    }
}

struct StubModel {
    answer: String,
    fail: AtomicBool,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

#[async_trait]
impl ChatModel for StubModel {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AiLlmError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        // keep concurrent requests overlapping
        tokio::time::sleep(Duration::from_millis(5)).await;
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::new(LlmProvider::OpenAI, ProviderErrorKind::EmptyChoices).into());
        }
        Ok(self.answer.clone())
    }
}

struct StubBackends {
    model: Arc<StubModel>,
    search_fails: AtomicBool,
    store: Arc<InMemoryHistory>,
    temperatures: Mutex<Vec<Option<f32>>>,
    connection_strings: Mutex<Vec<String>>,
}

impl StubBackends {
    fn new(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            model: Arc::new(StubModel {
                answer: answer.to_string(),
                fail: AtomicBool::new(false),
                seen: Mutex::new(Vec::new()),
            }),
            search_fails: AtomicBool::new(false),
            store: Arc::new(InMemoryHistory::new()),
            temperatures: Mutex::new(Vec::new()),
            connection_strings: Mutex::new(Vec::new()),
        })
    }

    fn failing(&self, fail: bool) {
        self.model.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatBackends for StubBackends {
    fn retriever(&self, _cfg: SearchConfig) -> Result<Arc<dyn Retriever>, RetrieverError> {
        Ok(Arc::new(StubSearch {
            fail: self.search_fails.load(Ordering::SeqCst),
        }))
    }

    fn chat_model(&self, cfg: LlmModelConfig) -> Result<Arc<dyn ChatModel>, AiLlmError> {
        self.temperatures.lock().unwrap().push(cfg.temperature);
        let model: Arc<dyn ChatModel> = self.model.clone();
        Ok(model)
    }

    fn history_store(
        &self,
        connection_string: &str,
    ) -> Result<Arc<dyn HistoryStore>, HistoryError> {
        self.connection_strings
            .lock()
            .unwrap()
            .push(connection_string.to_string());
        let store: Arc<dyn HistoryStore> = self.store.clone();
        Ok(store)
    }

    async fn llm_health(&self, cfg: &LlmModelConfig) -> HealthStatus {
        HealthStatus {
            provider: format!("{:?}", cfg.provider),
            endpoint: cfg.endpoint.clone(),
            model: Some(cfg.model.clone()),
            ok: true,
            latency_ms: 0,
            message: "stub".into(),
        }
    }
}

async fn spawn(backends: Arc<StubBackends>) -> String {
    spawn_with_env(
        backends,
        EnvSource::fixed([("CHAT_HISTORY_CONNECTION_STRING", HISTORY_URL)]),
    )
    .await
}

async fn spawn_with_env(backends: Arc<StubBackends>, env: EnvSource) -> String {
    let state = Arc::new(
        AppState::new(
            AppSettings::default(),
            PromptTemplates::builtin().unwrap(),
            backends,
        )
        .with_env(env),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

async fn post(base: &str, path: &str, body: Value) -> (u16, Value) {
    let res = reqwest::Client::new()
        .post(format!("{base}{path}"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = res.status().as_u16();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn yape_question_returns_one_turn() {
    let base = spawn(StubBackends::new(YAPE_A)).await;
    let (status, body) = post(
        &base,
        "/api/query",
        json!({"question": YAPE_Q, "session_id": "cliente-1"}),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body, json!({"result": [[YAPE_Q, YAPE_A]]}));
}

#[tokio::test]
async fn query_history_grows_one_turn_per_request() {
    let backends = StubBackends::new("ok");
    let base = spawn(backends.clone()).await;

    let mut previous: Vec<Value> = Vec::new();
    for i in 0..3 {
        let (status, body) = post(
            &base,
            "/api/query",
            json!({"question": format!("pregunta {i}"), "session_id": "s"}),
        )
        .await;
        assert_eq!(status, 200);
        let turns = body["result"].as_array().unwrap().clone();
        assert_eq!(turns.len(), previous.len() + 1);
        assert_eq!(turns[..previous.len()], previous[..]);
        assert_eq!(turns.last().unwrap(), &json!([format!("pregunta {i}"), "ok"]));
        previous = turns;
    }

    // prior turns were replayed into the third call, at temperature 0
    let seen = backends.model.seen.lock().unwrap();
    assert_eq!(seen[2].len(), 5);
    assert_eq!(seen[2][0].content, "pregunta 0");
    assert!(
        backends
            .temperatures
            .lock()
            .unwrap()
            .iter()
            .all(|t| *t == Some(0.0))
    );
}

#[tokio::test]
async fn query_sessions_do_not_share_turns() {
    let base = spawn(StubBackends::new("ok")).await;
    post(&base, "/api/query", json!({"question": "a", "session_id": "uno"})).await;
    let (_, body) = post(&base, "/api/query", json!({"question": "b", "session_id": "dos"})).await;
    assert_eq!(body["result"], json!([["b", "ok"]]));
}

#[tokio::test]
async fn concurrent_queries_each_add_exactly_one_turn() {
    const N: usize = 20;
    let base = spawn(StubBackends::new("ok")).await;

    let mut tasks = Vec::new();
    for i in 0..N {
        let base = base.clone();
        tasks.push(tokio::spawn(async move {
            post(
                &base,
                "/api/query",
                json!({"question": format!("q{i}"), "session_id": "compartida"}),
            )
            .await
        }));
    }

    let mut lengths = HashSet::new();
    for t in tasks {
        let (status, body) = t.await.unwrap();
        assert_eq!(status, 200);
        lengths.insert(body["result"].as_array().unwrap().len());
    }
    // each request saw the history right after its own append
    assert_eq!(lengths, (1..=N).collect::<HashSet<_>>());
}

#[tokio::test]
async fn query_failure_is_500_and_records_nothing() {
    let backends = StubBackends::new("ok");
    let base = spawn(backends.clone()).await;

    backends.failing(true);
    let (status, body) = post(&base, "/api/query", json!({"question": "hola", "session_id": "s"})).await;
    assert_eq!(status, 500);
    assert_eq!(body["code"], "UPSTREAM_ERROR");
    assert!(body["detail"].as_str().unwrap().contains("no choices"));

    backends.failing(false);
    let (status, body) = post(&base, "/api/query", json!({"question": "hola", "session_id": "s"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["result"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn messages_appends_user_then_assistant() {
    let backends = StubBackends::new(YAPE_A);
    let base = spawn(backends.clone()).await;

    let (status, body) = post(
        &base,
        "/api/messages",
        json!({
            "question": YAPE_Q,
            "session_id": "cliente-9",
            // only the deployment's store is ever used
            "CHAT_HISTORY_CONNECTION_STRING": "redis://elsewhere.example:6379/0"
        }),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body, json!({"result": YAPE_A}));

    let log = backends.store.load("cliente-9").await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!((log[0].role, log[0].content.as_str()), (Role::User, YAPE_Q));
    assert_eq!(log[1].role, Role::Assistant);
    assert_eq!(log[1].content, body["result"].as_str().unwrap());

    assert_eq!(
        *backends.connection_strings.lock().unwrap(),
        vec![HISTORY_URL.to_string()]
    );
    assert_eq!(*backends.temperatures.lock().unwrap(), vec![Some(0.7)]);
}

#[tokio::test]
async fn messages_replays_stored_history() {
    let backends = StubBackends::new("claro");
    backends
        .store
        .append(&ChatRecord::user("s", "¿qué es Yape?"))
        .await
        .unwrap();
    backends
        .store
        .append(&ChatRecord::assistant("s", "Una billetera digital."))
        .await
        .unwrap();
    let base = spawn(backends.clone()).await;

    let (status, _) = post(
        &base,
        "/api/messages",
        json!({"question": "¿y cuesta algo?", "session_id": "s"}),
    )
    .await;
    assert_eq!(status, 200);

    let seen = backends.model.seen.lock().unwrap();
    let contents: Vec<_> = seen[0].iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents[..2], ["¿qué es Yape?", "Una billetera digital."]);
    assert!(contents[2].contains("¿y cuesta algo?"));
    assert_eq!(backends.store.load("s").await.unwrap().len(), 4);
}

#[tokio::test]
async fn messages_failure_appends_nothing() {
    let backends = StubBackends::new("ok");
    backends.failing(true);
    let base = spawn(backends.clone()).await;

    let (status, body) = post(
        &base,
        "/api/messages",
        json!({"question": "hola", "session_id": "s"}),
    )
    .await;
    assert_eq!(status, 500);
    assert!(!body["detail"].as_str().unwrap().is_empty());
    assert!(backends.store.load("s").await.unwrap().is_empty());
}

#[tokio::test]
async fn messages_retrieval_failure_skips_model_and_appends_nothing() {
    let backends = StubBackends::new("ok");
    backends.search_fails.store(true, Ordering::SeqCst);
    let base = spawn(backends.clone()).await;

    let (status, body) = post(&base, "/api/messages", json!({"question": "hola", "session_id": "s"})).await;
    assert_eq!(status, 500);
    assert_eq!(body["code"], "UPSTREAM_ERROR");
    assert!(body["detail"].as_str().unwrap().contains("503"));
    assert!(backends.model.seen.lock().unwrap().is_empty());
    assert!(backends.store.load("s").await.unwrap().is_empty());
}

#[tokio::test]
async fn query_without_session_is_validation_error() {
    let backends = StubBackends::new("ok");
    let base = spawn_with_env(backends.clone(), EnvSource::fixed::<&str, &str>([])).await;

    let (status, body) = post(&base, "/api/query", json!({"question": "hola"})).await;
    assert_eq!(status, 422);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"][0]["path"], "session_id");
    assert!(backends.model.seen.lock().unwrap().is_empty());

    // the deployment default session applies when the body has none
    let base = spawn_with_env(
        StubBackends::new("ok"),
        EnvSource::fixed([("CHAT_HISTORY_SESSION_ID", "por-defecto")]),
    )
    .await;
    let (status, _) = post(&base, "/api/query", json!({"question": "hola"})).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn messages_without_history_settings_is_missing_credential() {
    let backends = StubBackends::new("ok");
    let base = spawn_with_env(backends.clone(), EnvSource::fixed::<&str, &str>([])).await;

    // a connection string in the body does not count
    let (status, body) = post(
        &base,
        "/api/messages",
        json!({"question": "hola", "session_id": "s", "CHAT_HISTORY_CONNECTION_STRING": HISTORY_URL}),
    )
    .await;
    assert_eq!(status, 500);
    assert_eq!(body["code"], "MISSING_CREDENTIAL");
    assert!(body["detail"].as_str().unwrap().contains("CHAT_HISTORY_CONNECTION_STRING"));

    let base = spawn(backends.clone()).await;
    let (status, body) = post(&base, "/api/messages", json!({"question": "hola"})).await;
    assert_eq!(status, 500);
    assert_eq!(body["code"], "MISSING_CREDENTIAL");
    assert!(body["detail"].as_str().unwrap().contains("CHAT_HISTORY_SESSION_ID"));

    assert!(backends.model.seen.lock().unwrap().is_empty());
    assert!(backends.connection_strings.lock().unwrap().is_empty());
}

#[tokio::test]
async fn request_errors_are_4xx_with_codes() {
    let base = spawn(StubBackends::new("ok")).await;

    let (status, body) = post(&base, "/api/query", json!({"question": "   ", "session_id": "s"})).await;
    assert_eq!(status, 422);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["details"][0]["path"], "question");

    let (status, body) = post(&base, "/api/messages", json!({"session_id": "s"})).await;
    assert_eq!(status, 422);
    assert_eq!(body["code"], "UNPROCESSABLE_ENTITY");
    assert!(body["detail"].as_str().unwrap().contains("question"));

    let res = reqwest::Client::new()
        .post(format!("{base}/api/query"))
        .header("content-type", "application/json")
        .body("{\"question\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn request_id_is_echoed_or_generated() {
    let base = spawn(StubBackends::new("ok")).await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{base}/api/health"))
        .header("X-Request-Id", "trace-abc")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()[REQUEST_ID_HEADER], "trace-abc");

    let res = client.get(format!("{base}/api/health")).send().await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let id = res.headers()[REQUEST_ID_HEADER].to_str().unwrap().to_string();
    assert!(id.starts_with("req-"));

    let body: Value = res.json().await.unwrap();
    assert_eq!(body["result"]["llm"]["ok"], true);
    assert!(body["result"]["search_configured"].is_boolean());
}
