//! 语音适配：音频字节 <-> 文本
//!
//! 纯函数式适配器，供外层 UI 在编排前后调用；编排核心不感知音频。
//! 走 OpenAI 语音端点：转写用 multipart 上传，合成直接取响应字节。

use std::time::Duration;

use reqwest::multipart;
use thiserror::Error;

use crate::config::SpeechSection;

const DEFAULT_BASE: &str = "https://api.openai.com/v1";

#[derive(Error, Debug)]
pub enum SpeechError {
    #[error("Speech request failed: {0}")]
    Http(String),

    #[error("Speech API error {status}: {body}")]
    Api { status: u16, body: String },
}

/// 语音客户端：speech_to_text / text_to_speech
pub struct SpeechClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    stt_model: String,
    tts_model: String,
    tts_voice: String,
}

impl SpeechClient {
    pub fn new(api_key: impl Into<String>, speech: &SpeechSection) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE.to_string(),
            stt_model: speech.stt_model.clone(),
            tts_model: speech.tts_model.clone(),
            tts_voice: speech.tts_voice.clone(),
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into();
        self
    }

    /// 录音字节 -> 转写文本
    pub async fn speech_to_text(
        &self,
        audio: Vec<u8>,
        filename: &str,
    ) -> Result<String, SpeechError> {
        let part = multipart::Part::bytes(audio).file_name(filename.to_string());
        let form = multipart::Form::new()
            .text("model", self.stt_model.clone())
            .part("file", part);

        let response = self
            .http
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SpeechError::Http(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SpeechError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(SpeechError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let parsed: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| SpeechError::Http(e.to_string()))?;
        Ok(parsed["text"].as_str().unwrap_or_default().to_string())
    }

    /// 回复文本 -> 合成音频字节
    pub async fn text_to_speech(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        let response = self
            .http
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.tts_model,
                "voice": self.tts_voice,
                "input": text,
            }))
            .send()
            .await
            .map_err(|e| SpeechError::Http(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpeechError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Http(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> SpeechClient {
        SpeechClient::new("key", &SpeechSection::default()).with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_speech_to_text_extracts_transcription() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "what time is it"
            })))
            .mount(&server)
            .await;

        let text = client_for(&server)
            .speech_to_text(vec![0u8; 16], "utterance.mp3")
            .await
            .unwrap();
        assert_eq!(text, "what time is it");
    }

    #[tokio::test]
    async fn test_text_to_speech_returns_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/speech"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let bytes = client_for(&server).text_to_speech("hello").await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_api_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/speech"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = client_for(&server).text_to_speech("hello").await.unwrap_err();
        assert!(matches!(err, SpeechError::Api { status: 401, .. }));
    }
}
