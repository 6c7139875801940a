use crate::session::SessionId;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Production chat endpoint. Fixed; there is no config surface for it.
pub const API_URL: &str =
    "https://chatbotviagem-eva3g9gxe7edbxde.eastus2-01.azurewebsites.net/api/chat";

/// Shown when the backend answers without a usable reply field.
pub const FALLBACK_REPLY: &str = "Desculpe, não consegui processar sua mensagem.";

/// The single failure class: connectivity error, non-2xx status, and
/// non-JSON body are not distinguished. The underlying cause goes to the
/// diagnostic channel only — never into the conversation.
#[derive(Debug, Error)]
#[error("request to {endpoint} failed: {source}")]
pub struct SendError {
    pub endpoint: String,
    #[source]
    pub source: reqwest::Error,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatRequest<'a> {
    session_id: &'a str,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    response: Option<String>,
    text: Option<String>,
}

impl ChatReply {
    // First non-empty field wins; otherwise the fixed fallback sentence.
    fn into_text(self) -> String {
        self.response
            .filter(|text| !text.is_empty())
            .or(self.text.filter(|text| !text.is_empty()))
            .unwrap_or_else(|| FALLBACK_REPLY.to_string())
    }
}

pub struct ChatClient {
    http: HttpClient,
    endpoint: String,
}

impl ChatClient {
    pub fn new() -> Self {
        Self::with_endpoint(API_URL)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// One HTTP POST per call: a single best-effort attempt with no retry
    /// and no timeout. A hung request never resolves on its own.
    pub async fn send_message(
        &self,
        session: &SessionId,
        text: &str,
    ) -> Result<String, SendError> {
        let request = ChatRequest {
            session_id: session.as_str(),
            message: text,
        };

        tracing::debug!(endpoint = %self.endpoint, session = %session, "sending message");

        let response = self
            .http
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|source| self.failed(source))?;

        let response = response
            .error_for_status()
            .map_err(|source| self.failed(source))?;

        let reply: ChatReply = response
            .json()
            .await
            .map_err(|source| self.failed(source))?;

        Ok(reply.into_text())
    }

    fn failed(&self, source: reqwest::Error) -> SendError {
        SendError {
            endpoint: self.endpoint.clone(),
            source,
        }
    }
}

impl Default for ChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn posts_session_and_message_as_json() {
        let server = MockServer::start().await;
        let session = SessionId::new();

        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "sessionId": session.as_str(),
                "message": "quero um voo",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "claro" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatClient::with_endpoint(format!("{}/api/chat", server.uri()));
        let reply = client
            .send_message(&session, "quero um voo")
            .await
            .expect("backend replied");
        assert_eq!(reply, "claro");
    }

    #[tokio::test]
    async fn empty_primary_field_falls_back_to_text_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "response": "", "text": "alternativa" })),
            )
            .mount(&server)
            .await;

        let client = ChatClient::with_endpoint(server.uri());
        let reply = client
            .send_message(&SessionId::new(), "oi")
            .await
            .expect("backend replied");
        assert_eq!(reply, "alternativa");
    }

    #[tokio::test]
    async fn missing_reply_fields_yield_the_fixed_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = ChatClient::with_endpoint(server.uri());
        let reply = client
            .send_message(&SessionId::new(), "oi")
            .await
            .expect("backend replied");
        assert_eq!(reply, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn server_error_is_a_send_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = ChatClient::with_endpoint(server.uri());
        let err = client
            .send_message(&SessionId::new(), "oi")
            .await
            .unwrap_err();
        assert_eq!(err.endpoint, server.uri());
    }

    #[tokio::test]
    async fn non_json_body_is_a_send_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = ChatClient::with_endpoint(server.uri());
        assert!(client.send_message(&SessionId::new(), "oi").await.is_err());
    }

    #[tokio::test]
    async fn connection_failure_is_a_send_error() {
        let client = ChatClient::with_endpoint("http://127.0.0.1:9/api/chat");
        let err = client
            .send_message(&SessionId::new(), "oi")
            .await
            .unwrap_err();
        assert!(err.endpoint.contains("127.0.0.1:9"));
    }
}
