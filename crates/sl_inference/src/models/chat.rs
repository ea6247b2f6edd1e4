use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use sl_core::{CompletionClient, CompletionRequest, Error, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
pub struct ChatCompletionClient {
    client: Arc<Client>,
    api_key: String,
    base_url: String,
}

impl ChatCompletionClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::Config("API key is required".to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client: Arc::new(client),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(api_error(status.as_u16(), &body))
    }
}

/// Turn an error body into `Error::Completion`, keeping whatever structure the provider sent.
pub(crate) fn api_error(status: u16, body: &str) -> Error {
    let raw: Option<Value> = serde_json::from_str(body).ok();
    let message = raw
        .as_ref()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error").and_then(|e| e.get("message")))
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());
    let code = raw.as_ref().and_then(|v| match v.get("code") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    });
    Error::Completion {
        status,
        message,
        code,
        raw: raw.or_else(|| (!body.is_empty()).then(|| Value::String(body.to_string()))),
    }
}

impl fmt::Debug for ChatCompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatCompletionClient")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait]
impl CompletionClient for ChatCompletionClient {
    fn name(&self) -> &str {
        "chat-completions"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        debug!("Sending completion request to {} (model {})", self.base_url, request.model);
        let response = self.client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let response = Self::check(response).await?.json::<ChatResponse>().await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| Error::MalformedResponse("completion returned no choices".to_string()))
    }

    async fn list_models(&self) -> Result<Value> {
        let response = self.client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Ok(Self::check(response).await?.json::<Value>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;
    use sl_core::ChatMessage;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Seen {
        authorization: Option<String>,
        body: Option<Value>,
    }

    type Recorder = Arc<Mutex<Seen>>;

    /// Serve `router` on an ephemeral port and return its `/v1` base URL.
    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    fn provider(reply: Value, status: StatusCode, seen: Recorder) -> Router {
        let chat = move |State(seen): State<Recorder>, headers: HeaderMap, Json(body): Json<Value>| {
            let reply = reply.clone();
            async move {
                let mut seen = seen.lock().unwrap();
                seen.authorization = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                seen.body = Some(body);
                (status, Json(reply))
            }
        };
        let models = |State(seen): State<Recorder>, headers: HeaderMap| async move {
            seen.lock().unwrap().authorization = headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            Json(json!({"object": "list", "data": [{"id": "Qwen/Qwen2.5-7B-Instruct"}]}))
        };
        Router::new()
            .route("/v1/chat/completions", post(chat))
            .route("/v1/models", get(models))
            .with_state(seen)
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "Qwen/Qwen2.5-7B-Instruct".to_string(),
            messages: vec![ChatMessage::system("Collect fables"), ChatMessage::user("Three please")],
            max_tokens: 8192,
            temperature: 0.7,
            top_p: 0.5,
        }
    }

    fn client(base_url: &str) -> ChatCompletionClient {
        ChatCompletionClient::new("sk-test", base_url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_complete_over_http() {
        let seen = Recorder::default();
        let reply = json!({"choices": [{"message": {"role": "assistant", "content": "[{\"title\": \"A\"}]"}}]});
        let base_url = spawn_server(provider(reply, StatusCode::OK, seen.clone())).await;

        let content = client(&base_url).complete(&request()).await.unwrap();
        assert_eq!(content, r#"[{"title": "A"}]"#);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.authorization.as_deref(), Some("Bearer sk-test"));
        let body = seen.body.as_ref().unwrap();
        assert_eq!(body["model"], "Qwen/Qwen2.5-7B-Instruct");
        assert_eq!(body["max_tokens"], 8192);
        assert_eq!(body["messages"][0], json!({"role": "system", "content": "Collect fables"}));
        assert_eq!(body["messages"][1]["role"], "user");
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!((body["top_p"].as_f64().unwrap() - 0.5).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_null_content_reads_as_empty() {
        let reply = json!({"choices": [{"message": {"role": "assistant", "content": null}}]});
        let base_url = spawn_server(provider(reply, StatusCode::OK, Recorder::default())).await;
        assert_eq!(client(&base_url).complete(&request()).await.unwrap(), "");

        let no_choices = json!({"choices": []});
        let base_url = spawn_server(provider(no_choices, StatusCode::OK, Recorder::default())).await;
        let err = client(&base_url).complete(&request()).await.unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_error_status_becomes_completion_error() {
        let reply = json!({"code": 20015, "message": "Invalid token"});
        let base_url = spawn_server(provider(reply, StatusCode::UNAUTHORIZED, Recorder::default())).await;

        match client(&base_url).complete(&request()).await.unwrap_err() {
            Error::Completion { status, message, code, .. } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid token");
                assert_eq!(code.as_deref(), Some("20015"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_models_over_http() {
        let seen = Recorder::default();
        let base_url = spawn_server(provider(json!({}), StatusCode::OK, seen.clone())).await;

        let models = client(&format!("{}/", base_url)).list_models().await.unwrap();
        assert_eq!(models["data"][0]["id"], "Qwen/Qwen2.5-7B-Instruct");
        assert_eq!(seen.lock().unwrap().authorization.as_deref(), Some("Bearer sk-test"));
    }

    #[test]
    fn test_client_requires_api_key() {
        let result = ChatCompletionClient::new("  ", "https://example.com/v1", Duration::from_secs(5));
        assert!(matches!(result, Err(Error::Config(_))));

        let client = ChatCompletionClient::new("test-key", "https://example.com/v1/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url, "https://example.com/v1");
        assert!(!format!("{:?}", client).contains("test-key"));
    }

    #[test]
    fn test_structured_api_error() {
        let err = api_error(401, r#"{"code": 20015, "message": "Invalid token"}"#);
        match err {
            Error::Completion { status, message, code, raw } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid token");
                assert_eq!(code.as_deref(), Some("20015"));
                assert_eq!(raw, Some(json!({"code": 20015, "message": "Invalid token"})));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_nested_and_plain_api_errors() {
        let nested = api_error(429, r#"{"error": {"message": "Rate limited"}}"#);
        assert!(matches!(nested, Error::Completion { ref message, .. } if message == "Rate limited"));

        let plain = api_error(502, "Bad Gateway");
        match plain {
            Error::Completion { message, code, raw, .. } => {
                assert_eq!(message, "Bad Gateway");
                assert!(code.is_none());
                assert_eq!(raw, Some(Value::String("Bad Gateway".to_string())));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
