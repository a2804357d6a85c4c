use async_trait::async_trait;
use log::{ debug, info, warn };
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use serde_json::{ json, Value as JsonValue };

use super::{ InferenceClient, InferenceOutcome, LlmConfig };
use crate::config::prompt::{ analysis_prompt, CHAT_SYSTEM_INSTRUCTION };
use crate::error::{ GhostError, Result };
use crate::models::analysis::AnalysisResponse;
use crate::models::chat::{ Message, Role };
use crate::models::frame::CapturedFrame;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl GeminiPart {
    fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), inline_data: None }
    }

    fn image(frame: &CapturedFrame) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: frame.mime_type(),
                data: frame.to_base64(),
            }),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: JsonValue,
}

#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
}

#[derive(Deserialize, Debug)]
struct GoogleCandidate {
    content: Option<GoogleContent>,
}

#[derive(Deserialize, Debug)]
struct GoogleContent {
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Deserialize, Debug)]
struct GooglePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if it has any.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

fn analysis_schema() -> JsonValue {
    json!({
        "type": "OBJECT",
        "properties": {
            "learning": { "type": "STRING" },
            "action": { "type": "STRING" },
            "coaching_tip": { "type": "STRING" }
        },
        "required": ["learning", "action", "coaching_tip"]
    })
}

fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

/// Maps a transcript onto Gemini `contents`. Leading assistant turns are
/// dropped and consecutive same-role turns are merged, since the API expects a
/// conversation that opens with the user and alternates. The frame, if any, is
/// attached to the final user turn.
fn build_chat_contents(transcript: &[Message], frame: Option<&CapturedFrame>) -> Vec<GeminiContent> {
    let mut contents: Vec<GeminiContent> = Vec::new();

    for message in transcript.iter().skip_while(|m| m.role() != Role::User) {
        let role = gemini_role(message.role());
        match contents.last_mut() {
            Some(last) if last.role == Some(role) => {
                last.parts.push(GeminiPart::text(message.content()));
            }
            _ => {
                contents.push(GeminiContent {
                    role: Some(role),
                    parts: vec![GeminiPart::text(message.content())],
                });
            }
        }
    }

    if let Some(frame) = frame {
        if let Some(last_user) = contents.iter_mut().rev().find(|c| c.role == Some("user")) {
            last_user.parts.insert(0, GeminiPart::image(frame));
        }
    }

    contents
}

pub struct GeminiClient {
    http: HttpClient,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String, base_url: &url::Url) -> Result<Self> {
        let http = HttpClient::builder().build()?;
        let endpoint = format!(
            "{}/models/{}:generateContent",
            base_url.as_str().trim_end_matches('/'),
            model
        );
        Ok(Self { http, api_key, model, endpoint })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(GhostError::MissingCredential);
        }
        let client = Self::new(config.api_key.clone(), config.model.clone(), &config.base_url)?;
        info!("GeminiClient configured → model={} endpoint={}", client.model, client.endpoint);
        Ok(client)
    }

    async fn generate(&self, request: &GenerateContentRequest) -> Result<Option<String>> {
        let resp = self.http
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send().await?
            .error_for_status()?;
        let body: GenerateContentResponse = resp.json().await?;
        Ok(body.text())
    }
}

#[async_trait]
impl InferenceClient for GeminiClient {
    async fn analyze_frame(
        &self,
        frame: &CapturedFrame,
        game_context: &str
    ) -> InferenceOutcome<AnalysisResponse> {
        let request = GenerateContentRequest {
            contents: vec![GeminiContent {
                role: Some("user"),
                parts: vec![GeminiPart::image(frame), GeminiPart::text(analysis_prompt(game_context))],
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: "application/json",
                response_schema: analysis_schema(),
            }),
        };

        debug!(
            "GeminiClient::analyze_frame() → model={} frame={}x{} ({} bytes)",
            self.model,
            frame.width,
            frame.height,
            frame.jpeg.len()
        );

        let text = match self.generate(&request).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                warn!("Frame analysis returned no text");
                return InferenceOutcome::NoOp;
            }
            Err(e) => {
                warn!("Error analyzing frame: {}", e);
                return InferenceOutcome::NoOp;
            }
        };

        match serde_json::from_str::<AnalysisResponse>(&text) {
            Ok(analysis) => InferenceOutcome::Success(analysis),
            Err(e) => {
                warn!("Frame analysis response did not match schema: {}", e);
                InferenceOutcome::NoOp
            }
        }
    }

    async fn chat_with_ai(
        &self,
        transcript: &[Message],
        frame: Option<&CapturedFrame>
    ) -> InferenceOutcome<String> {
        let contents = build_chat_contents(transcript, frame);
        if contents.is_empty() {
            warn!("Chat requested without any user message");
            return InferenceOutcome::NoOp;
        }

        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart::text(CHAT_SYSTEM_INSTRUCTION)],
            }),
            generation_config: None,
        };

        debug!(
            "GeminiClient::chat_with_ai() → model={} turns={} with_frame={}",
            self.model,
            request.contents.len(),
            frame.is_some()
        );

        match self.generate(&request).await {
            Ok(text) => text.into(),
            Err(e) => {
                warn!("Error in chat: {}", e);
                InferenceOutcome::NoOp
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::Transcript;
    use chrono::Utc;
    use mockito::Matcher;
    use pretty_assertions::assert_eq;

    const MODEL: &str = "gemini-test";

    fn frame() -> CapturedFrame {
        CapturedFrame {
            jpeg: vec![0xff, 0xd8, 0xff, 0xd9],
            width: 640,
            height: 360,
            captured_at: Utc::now(),
        }
    }

    async fn setup() -> (GeminiClient, mockito::ServerGuard) {
        let server = mockito::Server::new_async().await;
        let base = url::Url::parse(&server.url()).unwrap();
        let client = GeminiClient::new("test-key".to_string(), MODEL.to_string(), &base).unwrap();
        (client, server)
    }

    fn candidate_body(text: &str) -> String {
        json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        }).to_string()
    }

    #[tokio::test]
    async fn analyze_frame_parses_structured_reply() {
        let (client, mut server) = setup().await;
        let reply =
            r#"{"learning":"Sans attacks in waves","action":"Press Z","coaching_tip":"stay calm"}"#;
        let mock = server
            .mock("POST", "/models/gemini-test:generateContent")
            .match_header(API_KEY_HEADER, "test-key")
            .match_body(
                Matcher::PartialJson(
                    json!({
                    "generationConfig": { "responseMimeType": "application/json" }
                })
                )
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(candidate_body(reply))
            .create_async().await;

        let outcome = client.analyze_frame(&frame(), "Undertale").await;

        mock.assert_async().await;
        assert_eq!(
            outcome,
            InferenceOutcome::Success(AnalysisResponse {
                learning: "Sans attacks in waves".to_string(),
                action: "Press Z".to_string(),
                coaching_tip: "stay calm".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn analyze_frame_collapses_failures_to_noop() {
        let (client, mut server) = setup().await;

        let _err = server
            .mock("POST", "/models/gemini-test:generateContent")
            .with_status(500)
            .create_async().await;
        assert!(client.analyze_frame(&frame(), "ctx").await.is_noop());
    }

    #[tokio::test]
    async fn analyze_frame_rejects_schema_mismatch() {
        let (client, mut server) = setup().await;
        let _mock = server
            .mock("POST", "/models/gemini-test:generateContent")
            .with_status(200)
            .with_body(candidate_body(r#"{"learning":"only one field"}"#))
            .create_async().await;

        assert!(client.analyze_frame(&frame(), "ctx").await.is_noop());
    }

    #[tokio::test]
    async fn analyze_frame_rejects_non_json_body() {
        let (client, mut server) = setup().await;
        let _mock = server
            .mock("POST", "/models/gemini-test:generateContent")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async().await;

        assert!(client.analyze_frame(&frame(), "ctx").await.is_noop());
    }

    #[tokio::test]
    async fn chat_returns_reply_text() {
        let (client, mut server) = setup().await;
        let mock = server
            .mock("POST", "/models/gemini-test:generateContent")
            .match_body(
                Matcher::PartialJson(
                    json!({
                    "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }]
                })
                )
            )
            .with_status(200)
            .with_body(candidate_body("hi there"))
            .create_async().await;

        let mut transcript = Transcript::new();
        transcript.push(Role::User, "hello");
        let outcome = client.chat_with_ai(transcript.messages(), None).await;

        mock.assert_async().await;
        assert_eq!(outcome, InferenceOutcome::Success("hi there".to_string()));
    }

    #[tokio::test]
    async fn chat_with_empty_candidates_is_noop() {
        let (client, mut server) = setup().await;
        let _mock = server
            .mock("POST", "/models/gemini-test:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates":[]}"#)
            .create_async().await;

        let mut transcript = Transcript::new();
        transcript.push(Role::User, "hello");
        assert!(client.chat_with_ai(transcript.messages(), None).await.is_noop());
    }

    #[test]
    fn chat_contents_skip_leading_assistant_and_attach_frame() {
        let mut transcript = Transcript::new();
        transcript.push(Role::Assistant, "I'm connected!");
        transcript.push(Role::User, "where do I go");
        transcript.push(Role::Assistant, "left");
        transcript.push(Role::User, "and now?");
        transcript.push(Role::User, "hurry");

        let frame = frame();
        let contents = build_chat_contents(transcript.messages(), Some(&frame));

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0].role, Some("user"));
        assert_eq!(contents[1].role, Some("model"));
        assert_eq!(
            contents[2],
            GeminiContent {
                role: Some("user"),
                parts: vec![
                    GeminiPart::image(&frame),
                    GeminiPart::text("and now?"),
                    GeminiPart::text("hurry")
                ],
            }
        );
    }

    #[test]
    fn response_text_concatenates_parts() {
        let body: GenerateContentResponse = serde_json::from_value(
            json!({
            "candidates": [{ "content": { "parts": [{ "text": "a" }, { "inlineData": {} }, { "text": "b" }] } }]
        })
        ).unwrap();
        assert_eq!(body.text(), Some("ab".to_string()));
    }
}
