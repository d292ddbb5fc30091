//! End-to-end integration tests for the Newsdesk conversation loop.
//!
//! These tests drive full user turns through routing, the scripted model,
//! the real tool implementations (with network collaborators replaced) and
//! the transcript.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use newsdesk_agent::{AgentLoop, AgentRuntime, KeywordRouter, SessionStore};
use newsdesk_config::{AppConfig, RoutingRule};
use newsdesk_core::error::{ProviderError, ToolError};
use newsdesk_core::event::{DomainEvent, EventBus};
use newsdesk_core::message::{ConversationId, ConversationState, Role, Turn};
use newsdesk_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use newsdesk_core::tool::{Arguments, ToolInvocationRequest, ToolRegistry, ToolStatus};
use newsdesk_retrieval::{
    ContentCleaner, FetchError, FetchPipeline, PageFetcher, PipelineSettings, SearchHit,
    SearchProvider,
};
use newsdesk_tools::{
    Article, MARKET_NEWS, MarketNewsTool, NewsSource, STOCK_NEWS, StockNewsTool, WEB_SEARCH,
    WebSearchTool,
};

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted turns in sequence.
struct ScriptedProvider {
    turns: Mutex<Vec<Turn>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(turns: Vec<Turn>) -> Arc<Self> {
        Arc::new(Self {
            turns: Mutex::new(turns),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len()
        };
        let turns = self.turns.lock().unwrap();
        let turn = turns.get(call - 1).cloned().ok_or_else(|| {
            ProviderError::MalformedResponse(format!("script exhausted at call #{call}"))
        })?;
        Ok(ProviderResponse {
            turn,
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock".into(),
        })
    }
}

fn tool_call(name: &str, args: serde_json::Value) -> Turn {
    let arguments = match args {
        serde_json::Value::Object(map) => map,
        _ => Arguments::new(),
    };
    Turn::tool_request("", vec![ToolInvocationRequest::new(format!("call_{name}"), name, arguments)])
}

// ── Fake collaborators ───────────────────────────────────────────────────

/// Returns a fixed number of articles and records the symbols asked for.
struct FakeNews {
    name: &'static str,
    articles: usize,
    symbols: Mutex<Vec<String>>,
}

impl FakeNews {
    fn new(name: &'static str, articles: usize) -> Arc<Self> {
        Arc::new(Self {
            name,
            articles,
            symbols: Mutex::new(Vec::new()),
        })
    }

    fn symbols(&self) -> Vec<String> {
        self.symbols.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl NewsSource for FakeNews {
    fn name(&self) -> &str {
        self.name
    }

    fn snapshot_name(&self, symbol: &str) -> String {
        format!("{symbol}_{}.json", self.name)
    }

    async fn fetch_articles(&self, symbol: &str) -> Result<Vec<Article>, ToolError> {
        self.symbols.lock().unwrap().push(symbol.to_string());
        Ok((0..self.articles)
            .map(|i| Article {
                title: Some(format!("{symbol} headline {i}")),
                content: vec![format!("{symbol} paragraph {i}.")],
                url: format!("https://news.example.com/{symbol}/{i}"),
                timestamp: (i % 2 == 0).then(|| "2025-01-30T14:00:00Z".to_string()),
            })
            .collect())
    }
}

struct FakeSearch;

#[async_trait::async_trait]
impl SearchProvider for FakeSearch {
    fn name(&self) -> &str {
        "fake"
    }

    async fn search(&self, _query: &str, max_results: usize) -> Vec<SearchHit> {
        (1..=4)
            .map(|i| SearchHit {
                title: format!("Page {i}"),
                href: format!("https://web.example.com/{i}"),
                description: format!("Snippet {i}"),
            })
            .take(max_results)
            .collect()
    }
}

/// Page 2 never answers; the rest serve a small HTML document.
struct FakeWeb;

#[async_trait::async_trait]
impl PageFetcher for FakeWeb {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if url.ends_with("/2") {
            std::future::pending::<()>().await;
        }
        Ok(format!(
            "<html><head><script>var x;</script></head><body><nav>menu</nav>\
             <p>Content of {url}</p></body></html>"
        ))
    }
}

struct Harness {
    provider: Arc<ScriptedProvider>,
    stock: Arc<FakeNews>,
    market: Arc<FakeNews>,
    tools: Arc<ToolRegistry>,
    bus: Arc<EventBus>,
}

fn harness(script: Vec<Turn>) -> Harness {
    let stock = FakeNews::new("yahoo", 10);
    let market = FakeNews::new("marketwatch", 3);
    let bus = Arc::new(EventBus::default());

    let pipeline = FetchPipeline::new(Arc::new(FakeWeb), ContentCleaner::new(500))
        .with_event_bus(bus.clone());
    let settings = PipelineSettings {
        target_count: 2,
        per_request_timeout: Duration::from_millis(200),
        overall_deadline: Duration::from_secs(1),
        max_concurrency: 4,
    };

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(StockNewsTool::new(stock.clone()))).unwrap();
    registry.register(Box::new(MarketNewsTool::new(market.clone()))).unwrap();
    registry
        .register(Box::new(WebSearchTool::new(Arc::new(FakeSearch), pipeline, settings)))
        .unwrap();

    Harness {
        provider: ScriptedProvider::new(script),
        stock,
        market,
        tools: Arc::new(registry),
        bus,
    }
}

impl Harness {
    fn agent(&self) -> AgentLoop {
        self.agent_with_rules(&AppConfig::default().routing.rules)
    }

    fn agent_with_rules(&self, rules: &[RoutingRule]) -> AgentLoop {
        let config = AppConfig::default();
        let router = KeywordRouter::new(rules, &self.tools);
        AgentLoop::new(
            self.provider.clone(),
            "mock",
            self.tools.clone(),
            Arc::new(router),
            self.bus.clone(),
            ConversationState::new(config.agent.system_prompt),
        )
    }
}

fn offered(request: &ProviderRequest) -> Vec<&str> {
    request.tools.iter().map(|t| t.name.as_str()).collect()
}

// ── E2E: stock news ──────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_latest_nvda_news() {
    let h = harness(vec![
        tool_call(STOCK_NEWS, serde_json::json!({"symbol": "NVDA"})),
        Turn::assistant("NVIDIA is in the headlines for its latest chips."),
    ]);
    let mut agent = h.agent();
    let before = agent.conversation().len();

    let reply = agent.process("What's the latest NVDA news?").await;

    // Transcript grows by user, tool request, tool result, final answer.
    assert_eq!(agent.conversation().len(), before + 4);
    assert!(!reply.failed);
    assert_eq!(reply.content, "NVIDIA is in the headlines for its latest chips.");

    let requests = h.provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(offered(&requests[0]), vec![STOCK_NEWS]);
    assert!(requests[1].tools.is_empty());

    assert_eq!(h.stock.symbols(), vec!["NVDA"]);
    assert!(h.market.symbols().is_empty());

    let result = &reply.tool_results[0];
    assert_eq!(result.status, ToolStatus::Ok);
    let data = result.data.as_ref().unwrap();
    assert!(data["count"].as_u64().unwrap() <= 10);
    assert_eq!(data["articles"][0]["title"], "NVDA headline 0");
    assert!(data["articles"][1]["timestamp"].is_null());

    let tool_turn = &agent.conversation().turns()[before + 2];
    assert_eq!(tool_turn.role, Role::Tool);
    assert_eq!(tool_turn.tool_name.as_deref(), Some(STOCK_NEWS));
    assert_eq!(requests[1].turns.last().unwrap().role, Role::Tool);
}

#[tokio::test]
async fn e2e_hello_has_no_tool_turn() {
    let h = harness(vec![Turn::assistant("Hello! How can I help?")]);
    let mut agent = h.agent();
    let before = agent.conversation().len();

    let reply = agent.process("hello").await;

    assert_eq!(reply.content, "Hello! How can I help?");
    assert_eq!(agent.conversation().len(), before + 2);
    assert!(agent.conversation().turns().iter().all(|t| t.role != Role::Tool));

    let requests = h.provider.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].tools.is_empty());
}

#[tokio::test]
async fn e2e_marketwatch_priority_routing() {
    let h = harness(vec![
        tool_call(MARKET_NEWS, serde_json::json!({"symbol": "tsla"})),
        Turn::assistant("MarketWatch says Tesla is volatile."),
    ]);
    let mut agent = h.agent();

    agent.process("What does MarketWatch say about TSLA?").await;

    let requests = h.provider.requests();
    assert_eq!(offered(&requests[0]), vec![MARKET_NEWS]);
    assert_eq!(h.market.symbols(), vec!["TSLA"]);
}

#[tokio::test]
async fn e2e_irrelevant_stock_news_call_is_skipped() {
    // Routed through a company-name keyword, but the text mentions neither
    // markets nor the ticker the model picked.
    let h = harness(vec![
        tool_call(STOCK_NEWS, serde_json::json!({"symbol": "AAPL"})),
        Turn::assistant("Apples are a fruit."),
    ]);
    let rules = vec![RoutingRule::new(STOCK_NEWS, &["apple"], &[])];
    let mut agent = h.agent_with_rules(&rules);

    let reply = agent.process("how do apple trees grow?").await;

    assert_eq!(offered(&h.provider.requests()[0]), vec![STOCK_NEWS]);
    assert!(h.stock.symbols().is_empty());
    assert_eq!(reply.tool_results[0].data.as_ref().unwrap()["skipped"], true);
    assert_eq!(reply.content, "Apples are a fruit.");
}

#[tokio::test]
async fn e2e_priority_keyword_alone_offers_no_tools() {
    let h = harness(vec![Turn::assistant("Once upon a time...")]);
    let mut agent = h.agent();

    agent.process("tell me a bedtime story").await;

    assert!(offered(&h.provider.requests()[0]).is_empty());
    assert_eq!(agent.conversation().len(), 3);
}

#[tokio::test]
async fn e2e_unoffered_tool_is_not_executed() {
    let h = harness(vec![
        tool_call(MARKET_NEWS, serde_json::json!({"symbol": "NVDA"})),
        Turn::assistant("I could not use that tool."),
    ]);
    let mut agent = h.agent();

    let reply = agent.process("NVDA news").await;

    assert_eq!(reply.tool_results[0].status, ToolStatus::NotOffered);
    assert!(h.market.symbols().is_empty());
    assert_eq!(agent.conversation().len(), 5);
}

// ── E2E: web search through the fetch pipeline ───────────────────────────

#[tokio::test]
async fn e2e_web_search_returns_cleaned_snippets() {
    let h = harness(vec![
        tool_call(WEB_SEARCH, serde_json::json!({"query": "rust async runtimes"})),
        Turn::assistant("Tokio is the most common choice."),
    ]);
    let mut events = h.bus.subscribe();
    let mut agent = h.agent();

    let reply = agent.process("search the web for rust async runtimes").await;

    let result = &reply.tool_results[0];
    assert_eq!(result.status, ToolStatus::Ok);
    let snippets = result.data.as_ref().unwrap().as_array().unwrap().clone();
    assert_eq!(snippets.len(), 2);
    for snippet in &snippets {
        let text = snippet["text"].as_str().unwrap();
        assert!(text.starts_with("Content of https://web.example.com/"));
        assert!(!text.contains("menu"));
        assert!(!text.contains("var x"));
        assert_ne!(snippet["url"], "https://web.example.com/2");
    }

    let mut retrieval = None;
    while let Ok(event) = events.try_recv() {
        if let DomainEvent::RetrievalCompleted { accepted, outcome, .. } = &*event {
            retrieval = Some((*accepted, outcome.clone()));
        }
    }
    assert_eq!(retrieval, Some((2, "target_reached".to_string())));
}

// ── E2E: sessions and failures ───────────────────────────────────────────

#[tokio::test]
async fn e2e_model_failure_then_recovery() {
    // Script has a single turn, so the second model call fails.
    let h = harness(vec![tool_call(STOCK_NEWS, serde_json::json!({"symbol": "NVDA"}))]);
    let mut agent = h.agent();

    let reply = agent.process("NVDA stock news").await;

    assert!(reply.failed);
    let last = agent.conversation().last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert!(last.content.contains("script exhausted"));

    agent.clear();
    assert_eq!(agent.conversation().len(), 1);
    assert_eq!(agent.conversation().turns()[0].role, Role::System);
}

#[tokio::test]
async fn e2e_session_store_keeps_conversations_apart() {
    let h = harness(vec![
        Turn::assistant("first"),
        Turn::assistant("second"),
        Turn::assistant("third"),
    ]);
    let runtime = AgentRuntime::from_config(
        &AppConfig::default(),
        h.provider.clone(),
        h.tools.clone(),
        h.bus.clone(),
    );
    let sessions = SessionStore::new(runtime);
    let alice = ConversationId::from("alice");
    let bob = ConversationId::from("bob");

    sessions.get_or_create(&alice).await.lock().await.process("hi").await;
    sessions.get_or_create(&bob).await.lock().await.process("hey").await;
    sessions.get_or_create(&alice).await.lock().await.process("again").await;

    let alice_len = sessions.get(&alice).await.unwrap().lock().await.conversation().len();
    let bob_len = sessions.get(&bob).await.unwrap().lock().await.conversation().len();
    assert_eq!(alice_len, 5);
    assert_eq!(bob_len, 3);

    let requests = h.provider.requests();
    assert_eq!(requests[2].turns.len(), 4);
    assert_eq!(requests[2].options.context_window, Some(8192));
}
