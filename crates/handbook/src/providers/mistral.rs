use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{EventStream, Provider, ToolChoice};
use super::configs::MistralProviderConfig;
use super::utils::tools_to_spec;
use crate::errors::ProviderError;
use crate::models::chat::{ChatResponse, CompletionEvent};
use crate::models::message::Message;
use crate::models::tool::Tool;

pub struct MistralProvider {
    client: Client,
    config: MistralProviderConfig,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl MistralProvider {
    pub fn new(config: MistralProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn chat_payload(
        &self,
        messages: &[Message],
        tools: &[Tool],
        tool_choice: Option<ToolChoice>,
        stream: bool,
    ) -> Result<Value, ProviderError> {
        let mut payload = json!({
            "model": self.config.model,
            "messages": messages,
        });

        let map = payload.as_object_mut().expect("payload is an object");
        if !tools.is_empty() {
            map.insert("tools".to_string(), json!(tools_to_spec(tools)?));
        }
        if let Some(choice) = tool_choice {
            map.insert("tool_choice".to_string(), json!(choice));
        }
        if let Some(temp) = self.config.temperature {
            map.insert("temperature".to_string(), json!(temp));
        }
        if let Some(tokens) = self.config.max_tokens {
            map.insert("max_tokens".to_string(), json!(tokens));
        }
        if stream {
            map.insert("stream".to_string(), json!(true));
        }

        Ok(payload)
    }

    async fn post(&self, path: &str, payload: &Value) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}{}", self.config.host.trim_end_matches('/'), path);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Provider for MistralProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
        tool_choice: Option<ToolChoice>,
    ) -> Result<ChatResponse, ProviderError> {
        let payload = self.chat_payload(messages, tools, tool_choice, false)?;
        let response = self.post("/v1/chat/completions", &payload).await?;
        Ok(response.json().await?)
    }

    async fn complete_stream(&self, messages: &[Message]) -> Result<EventStream, ProviderError> {
        let payload = self.chat_payload(messages, &[], None, true)?;
        let response = self.post("/v1/chat/completions", &payload).await?;
        let mut body = response.bytes_stream();

        // The SSE body is parsed incrementally: buffer bytes, cut complete
        // lines, strip the "data: " prefix, stop at the [DONE] marker.
        // Dropping the returned stream drops `body`, which releases the
        // connection without consuming the rest of the response.
        let stream = async_stream::try_stream! {
            let mut buffer: Vec<u8> = Vec::new();
            'outer: loop {
                let chunk = match body.next().await {
                    Some(chunk) => chunk?,
                    None => break,
                };
                buffer.extend_from_slice(&chunk);

                while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=pos).collect();
                    let line = String::from_utf8_lossy(&line);
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let data = match line.strip_prefix("data:") {
                        Some(data) => data.trim(),
                        None => continue,
                    };
                    if data == "[DONE]" {
                        break 'outer;
                    }
                    let event: CompletionEvent = serde_json::from_str(data)
                        .map_err(|e| ProviderError::Malformed(e.to_string()))?;
                    yield event;
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let payload = json!({
            "model": self.config.embed_model,
            "input": inputs,
        });

        let response = self.post("/v1/embeddings", &payload).await?;
        let parsed: EmbeddingResponse = response.json().await?;

        let mut entries = parsed.data;
        entries.sort_by_key(|entry| entry.index);
        Ok(entries.into_iter().map(|entry| entry.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::FinishReason;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(host: String) -> MistralProviderConfig {
        MistralProviderConfig {
            host,
            api_key: "test_api_key".to_string(),
            model: "mistral-large-latest".to_string(),
            embed_model: "mistral-embed".to_string(),
            temperature: Some(0.7),
            max_tokens: None,
        }
    }

    async fn setup_mock_server(response_body: Value) -> (MockServer, MistralProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let provider = MistralProvider::new(test_config(mock_server.uri())).unwrap();
        (mock_server, provider)
    }

    #[tokio::test]
    async fn test_complete_basic() {
        let response_body = json!({
            "id": "cmpl-123",
            "model": "mistral-large-latest",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Gouda question!"
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 12,
                "completion_tokens": 15,
                "total_tokens": 27
            }
        });

        let (_server, provider) = setup_mock_server(response_body).await;

        let messages = vec![
            Message::system("You are a friendly cheese connoisseur."),
            Message::user("Tell me about gouda"),
        ];
        let response = provider.complete(&messages, &[], None).await.unwrap();

        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].message.content, "Gouda question!");
        assert_eq!(response.choices[0].finish_reason, FinishReason::Stop);
        assert_eq!(response.usage.unwrap().total_tokens, Some(27));
    }

    #[tokio::test]
    async fn test_complete_tool_calls() {
        let response_body = json!({
            "id": "cmpl-tool",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_123",
                        "type": "function",
                        "function": {
                            "name": "getPaymentStatus",
                            "arguments": "{\"transactionId\":\"T1001\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });

        let (_server, provider) = setup_mock_server(response_body).await;

        let tool = Tool::new(
            "getPaymentStatus",
            "Get the payment status of a transaction",
            json!({
                "type": "object",
                "properties": {
                    "transactionId": {"type": "string"}
                },
                "required": ["transactionId"]
            }),
        );
        let messages = vec![Message::user("What's the status of T1001?")];
        let response = provider
            .complete(&messages, &[tool], Some(ToolChoice::Auto))
            .await
            .unwrap();

        let choice = &response.choices[0];
        assert_eq!(choice.finish_reason, FinishReason::ToolCalls);
        assert_eq!(choice.message.tool_calls.len(), 1);
        assert_eq!(choice.message.tool_calls[0].function.name, "getPaymentStatus");
        assert_eq!(
            choice.message.tool_calls[0].function.arguments,
            "{\"transactionId\":\"T1001\"}"
        );
    }

    #[tokio::test]
    async fn test_complete_server_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&mock_server)
            .await;

        let provider = MistralProvider::new(test_config(mock_server.uri())).unwrap();
        let err = provider
            .complete(&[Message::user("hi")], &[], None)
            .await
            .unwrap_err();

        match err {
            ProviderError::Api { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_stream_parses_sse() {
        let sse_body = concat!(
            "data: {\"id\":\"cmpl-1\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"id\":\"cmpl-1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hello\"}}]}\n\n",
            "data: {\"id\":\"cmpl-1\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\" world\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
        );

        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(sse_body)
                    .insert_header("Content-Type", "text/event-stream"),
            )
            .mount(&mock_server)
            .await;

        let provider = MistralProvider::new(test_config(mock_server.uri())).unwrap();
        let mut stream = provider
            .complete_stream(&[Message::user("hi")])
            .await
            .unwrap();

        let mut deltas = Vec::new();
        while let Some(event) = stream.next().await {
            let event = event.unwrap();
            if let Some(content) = event.delta_content() {
                deltas.push(content.to_string());
            }
        }

        assert_eq!(deltas, vec!["Hello", " world"]);
    }

    #[tokio::test]
    async fn test_embed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(body_partial_json(json!({"model": "mistral-embed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"index": 1, "embedding": [0.4, 0.5]},
                    {"index": 0, "embedding": [0.1, 0.2]}
                ]
            })))
            .mount(&mock_server)
            .await;

        let provider = MistralProvider::new(test_config(mock_server.uri())).unwrap();
        let vectors = provider
            .embed(&["first chunk".to_string(), "second chunk".to_string()])
            .await
            .unwrap();

        // Entries come back ordered by input index regardless of wire order
        assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.4, 0.5]]);
    }
}
