use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::agent_engine::action::ActionDescriptor;
use crate::config::ModelConfig;
use crate::errors::{TapClawError, TapClawResult};
use crate::llm::types::{ChatMessage, ContentPart, DecodedAction, ImageUrl, ModelTurn};
use crate::perception::screenshot::Screenshot;

/// Base wait before the first retry; doubles after every failed attempt.
pub const RETRY_WAITING_SECONDS: u64 = 20;

const DEFAULT_MAX_RETRY: u32 = 3;
const MAX_RETRY_CEILING: u32 = 5;

const PROMPT_PREAMBLE: &str = "\
# Role
You are an agent operating an Android touchscreen GUI. Given the user's goal
and the current screenshot, analyse the visible elements and layout and decide
the next action.

# Task
For the user's question, output exactly one next-step action for the current
screen.

# Rule
- Output compact JSON only
- The output must satisfy the schema below

# Schema
";

/// System prompt: fixed preamble plus the compact JSON Schema the model's
/// output must satisfy. Built once per process.
pub fn system_prompt() -> &'static str {
    static PROMPT: OnceLock<String> = OnceLock::new();
    PROMPT.get_or_init(|| {
        let schema = schemars::schema_for!(ActionDescriptor);
        let compact = serde_json::to_string(&schema).unwrap_or_default();
        format!("{PROMPT_PREAMBLE}{compact}")
    })
}

/// Pure backoff policy: wait before retrying after failed attempt `attempt`
/// (0-based). 20s, 40s, 80s, ...
pub fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(RETRY_WAITING_SECONDS << attempt)
}

/// Clamp the configured attempt budget into [1, 5]; non-positive values are
/// corrected to the default with a warning, never an error.
pub fn clamp_max_retry(configured: i32) -> u32 {
    if configured <= 0 {
        tracing::warn!(configured, "max_retry must be positive; reset to {DEFAULT_MAX_RETRY}");
        return DEFAULT_MAX_RETRY;
    }
    (configured as u32).min(MAX_RETRY_CEILING)
}

/// Explicit retry combinator around one fallible call. Waits
/// `backoff_delay(attempt)` after every failed attempt, the last one
/// included, then surfaces the final error.
pub(crate) async fn retry_with_backoff<T, Fut>(
    max_retry: u32,
    mut op: impl FnMut() -> Fut,
) -> TapClawResult<T>
where
    Fut: std::future::Future<Output = TapClawResult<T>>,
{
    let mut last_error = String::new();
    for attempt in 0..max_retry {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                last_error = e.to_string();
                tracing::warn!(attempt, error = %last_error, "model call failed");
                tokio::time::sleep(backoff_delay(attempt)).await;
            }
        }
    }
    Err(TapClawError::ModelCall(format!(
        "exhausted {max_retry} attempts; last error: {last_error}"
    )))
}

/// Parse assistant text into a validated action, or hand the raw text back.
pub fn extract_action(text: &str) -> DecodedAction {
    match serde_json::from_str::<ActionDescriptor>(text) {
        Ok(action) => DecodedAction::Action(action),
        Err(e) => {
            tracing::warn!(error = %e, "model output is not a valid action; keeping raw text");
            DecodedAction::Unparsed(text.to_string())
        }
    }
}

/// Capability-set interface for the model endpoint: one predict operation,
/// parameterized by the image list (text-only callers pass none).
#[async_trait]
pub trait ModelClient: Send {
    async fn predict(&mut self, prompt: &str, images: &[Screenshot]) -> TapClawResult<ModelTurn>;

    fn clear_history(&mut self);
}

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiCompatClient {
    endpoint: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    max_retry: u32,
    api_key: Option<String>,
    use_history: bool,
    history_size: usize,
    history: Vec<ChatMessage>,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(cfg: &ModelConfig) -> Self {
        let api_key = cfg
            .api_key
            .clone()
            .or_else(|| std::env::var("TAPCLAW_API_KEY").ok());
        Self {
            endpoint: cfg.endpoint.clone(),
            model: cfg.name.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            max_retry: clamp_max_retry(cfg.max_retry),
            api_key,
            use_history: cfg.use_history,
            history_size: cfg.history_size.max(1),
            history: Vec::new(),
            // A hung endpoint must not stall the loop past the retry horizon.
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    fn build_messages(&self, prompt: &str, image: &Screenshot) -> (Vec<ChatMessage>, ChatMessage) {
        let mut messages = vec![ChatMessage::text("system", system_prompt())];
        if self.use_history {
            messages.extend(self.history.iter().cloned());
        }

        let user = ChatMessage::parts(
            "user",
            vec![
                ContentPart::Text {
                    text: format!(
                        "<Question>{prompt}</Question>\nCurrent screenshot: (<image>./</image>)"
                    ),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: format!("data:image/png;base64,{}", image.base64),
                    },
                },
            ],
        );
        messages.push(user.clone());
        (messages, user)
    }

    fn push_turn(&mut self, user: ChatMessage, assistant_text: &str) {
        if !self.use_history {
            return;
        }
        self.history.push(user);
        self.history.push(ChatMessage::text("assistant", assistant_text));
        let max_msgs = self.history_size * 2;
        if self.history.len() > max_msgs {
            let excess = self.history.len() - max_msgs;
            self.history.drain(..excess);
        }
    }

    #[cfg(test)]
    fn history_len(&self) -> usize {
        self.history.len()
    }

    async fn send_once(&self, body: &serde_json::Value) -> TapClawResult<serde_json::Value> {
        let mut request = self.client.post(&self.endpoint).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(TapClawError::ModelCall(format!("{status}: {err_body}")));
        }
        let json: serde_json::Value = response.json().await?;
        if json.get("choices").is_none() {
            return Err(TapClawError::ModelCall(
                "response body has no choices".into(),
            ));
        }
        Ok(json)
    }
}

#[async_trait]
impl ModelClient for OpenAiCompatClient {
    async fn predict(&mut self, prompt: &str, images: &[Screenshot]) -> TapClawResult<ModelTurn> {
        let image = match images {
            [single] => single,
            _ => {
                return Err(TapClawError::Precondition(format!(
                    "predict expects exactly one image, got {}",
                    images.len()
                )))
            }
        };

        let (messages, user) = self.build_messages(prompt, image);
        tracing::debug!(
            model = %self.model,
            messages = messages.len(),
            history = self.history.len(),
            "sending model request"
        );
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": messages,
            "max_tokens": self.max_tokens,
        });

        let json = retry_with_backoff(self.max_retry, || self.send_once(&body)).await?;

        let text = json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();
        let decoded = extract_action(&text);
        self.push_turn(user, &text);
        Ok(ModelTurn {
            text,
            raw: json,
            decoded,
        })
    }

    fn clear_history(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;

    fn test_config() -> ModelConfig {
        ModelConfig {
            endpoint: "http://localhost:8000/v1/chat/completions".into(),
            name: "AgentCPM-GUI".into(),
            temperature: 1.0,
            max_tokens: 2048,
            max_retry: 3,
            use_history: true,
            history_size: 2,
            api_key: None,
        }
    }

    #[test]
    fn backoff_doubles_from_twenty_seconds() {
        let waits: Vec<u64> = (0..3).map(|a| backoff_delay(a).as_secs()).collect();
        assert_eq!(waits, vec![20, 40, 80]);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_loop_waits_after_every_failed_attempt() {
        let start = tokio::time::Instant::now();
        let result: TapClawResult<()> = retry_with_backoff(3, || async {
            Err(TapClawError::ModelCall("connection refused".into()))
        })
        .await;
        assert!(matches!(result, Err(TapClawError::ModelCall(_))));
        // 20 + 40 + 80: the wait after the last failure counts too
        assert_eq!(start.elapsed(), Duration::from_secs(140));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_loop_stops_waiting_on_success() {
        let start = tokio::time::Instant::now();
        let mut calls = 0u32;
        let result = retry_with_backoff(3, || {
            calls += 1;
            let call = calls;
            async move {
                if call < 3 {
                    Err(TapClawError::ModelCall("boom".into()))
                } else {
                    Ok(call)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[test]
    fn max_retry_is_clamped_into_one_to_five() {
        assert_eq!(clamp_max_retry(0), 3);
        assert_eq!(clamp_max_retry(-4), 3);
        assert_eq!(clamp_max_retry(1), 1);
        assert_eq!(clamp_max_retry(5), 5);
        assert_eq!(clamp_max_retry(9), 5);
    }

    #[test]
    fn extraction_is_tagged_not_ambiguous() {
        match extract_action(r#"{"POINT":[500,500],"STATUS":"continue"}"#) {
            DecodedAction::Action(a) => assert_eq!(a.point, Some([500, 500])),
            other => panic!("expected action, got {other:?}"),
        }
        match extract_action("sorry, I cannot parse the screen") {
            DecodedAction::Unparsed(text) => {
                assert_eq!(text, "sorry, I cannot parse the screen")
            }
            other => panic!("expected unparsed, got {other:?}"),
        }
    }

    #[test]
    fn history_keeps_the_two_most_recent_turns() {
        let mut client = OpenAiCompatClient::new(&test_config());
        for turn in 0..5 {
            let user = ChatMessage::text("user", format!("turn {turn}"));
            client.push_turn(user, &format!("reply {turn}"));
        }
        // history_size = 2 -> 2 user + 2 assistant messages survive
        assert_eq!(client.history_len(), 4);
        match &client.history[0].content {
            crate::llm::types::MessageContent::Text(t) => assert_eq!(t, "turn 3"),
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[test]
    fn history_disabled_retains_nothing() {
        let mut cfg = test_config();
        cfg.use_history = false;
        let mut client = OpenAiCompatClient::new(&cfg);
        client.push_turn(ChatMessage::text("user", "hi"), "hello");
        assert_eq!(client.history_len(), 0);
    }

    #[test]
    fn system_prompt_embeds_the_action_schema() {
        let prompt = system_prompt();
        assert!(prompt.contains("POINT"));
        assert!(prompt.contains("STATUS"));
        assert!(prompt.contains("# Schema"));
    }
}
