//! Collaborators backed by an OpenAI-compatible chat completions endpoint.

use std::time::Duration;

use {
    async_trait::async_trait,
    cadence_config::LlmConfig,
    secrecy::{ExposeSecret, Secret},
    serde_json::{Value, json},
    tracing::debug,
};

use crate::{
    collaborators::{DayEventGenerator, DayEventRequest, PlanResearcher, SummaryGenerator},
    dates::weekday_name,
    error::{Context, Error, Result},
};

pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Secret<String>,
}

impl LlmClient {
    /// Build a client from config. Fails when no API key is configured.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .context("llm.api_key is not configured")?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    async fn complete(&self, purpose: &str, prompt: String) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });
        debug!(purpose, model = %self.model, "requesting completion");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::collaborator(purpose, format!("HTTP {status}: {text}")));
        }
        let payload: Value = resp.json().await?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::collaborator(purpose, "empty completion"))?;
        Ok(content.to_string())
    }
}

#[async_trait]
impl SummaryGenerator for LlmClient {
    async fn summarize(&self, user_input: &str, parent_summary: &str) -> Result<String> {
        let parent = if parent_summary.is_empty() {
            "None. Answer from the user request alone."
        } else {
            parent_summary
        };
        let prompt = format!(
            "Write a short topic line that will drive research for a preparation plan.\n\
             Capture what the user wants to prepare for in one sentence.\n\n\
             User request: {user_input}\n\
             Target event: {parent}\n"
        );
        self.complete("summary", prompt).await
    }
}

/// The plan comes from the model alone; no web search backs it.
#[async_trait]
impl PlanResearcher for LlmClient {
    async fn research_plan(
        &self,
        topic: &str,
        profile: &str,
        extra_requirements: Option<&str>,
    ) -> Result<String> {
        let extra = extra_requirements
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("none");
        let prompt = format!(
            "Outline a one-week preparation plan for: {topic}\n\
             User profile and availability: {profile}\n\
             Requirements to prioritise: {extra}\n\
             Only include preparation sessions, not the target event itself.\n\
             Answer with one line per day, from sunday to saturday, like\n\
             sunday: ...\nmonday: ...\n"
        );
        self.complete("research", prompt).await
    }
}

#[async_trait]
impl DayEventGenerator for LlmClient {
    async fn generate_day_event(&self, request: &DayEventRequest) -> Result<String> {
        let day = weekday_name(request.weekday);
        let date = request.date.format("%Y-%m-%d");
        let until = &request.until_date;
        let tz = &request.timezone;
        let prompt = format!(
            "Produce one calendar event as JSON for {day}, {date}.\n\
             Availability (24-hour ranges, e.g. 6-8 means 6 AM to 8 AM): {availability}\n\
             Weekly plan:\n{plan}\n\n\
             Reply with JSON only, exactly this shape:\n\
             {{\"summary\": \"...\", \"description\": \"...\",\n \
             \"start\": {{\"dateTime\": \"{date}Thh:mm:00\", \"timeZone\": \"{tz}\"}},\n \
             \"end\": {{\"dateTime\": \"{date}Thh:mm:00\", \"timeZone\": \"{tz}\"}},\n \
             \"recurrence\": [\"RRULE:FREQ=WEEKLY;UNTIL={until}T050000Z\"]}}\n",
            availability = request.availability,
            plan = request.plan,
        );
        self.complete("day_event", prompt).await
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, chrono::NaiveDate, mockito::Matcher};

    fn client(server: &mockito::ServerGuard) -> LlmClient {
        LlmClient::from_config(&LlmConfig {
            base_url: server.url(),
            api_key: Some(Secret::new("sk-test".into())),
            ..Default::default()
        })
        .unwrap()
    }

    fn completion(content: &str) -> String {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
    }

    #[test]
    fn requires_api_key() {
        let err = LlmClient::from_config(&LlmConfig::default()).err().unwrap();
        assert_eq!(err.to_string(), "llm.api_key is not configured");
    }

    #[tokio::test]
    async fn summary_returns_trimmed_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({"model": "gpt-4.1"})))
            .with_status(200)
            .with_body(completion("  Training for a 5K race \n"))
            .create_async()
            .await;

        let topic = client(&server)
            .summarize("help me train", "5K Run")
            .await
            .unwrap();
        assert_eq!(topic, "Training for a 5K race");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn day_event_prompt_carries_until_date() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::Regex("UNTIL=20250713T050000Z".into()))
            .with_status(200)
            .with_body(completion("{}"))
            .create_async()
            .await;

        let request = DayEventRequest {
            weekday: chrono::Weekday::Wed,
            date: NaiveDate::from_ymd_opt(2025, 6, 18).unwrap(),
            availability: "6-8".into(),
            plan: "wednesday: intervals".into(),
            until_date: "20250713".into(),
            timezone: "America/Mexico_City".into(),
        };
        assert_eq!(
            client(&server).generate_day_event(&request).await.unwrap(),
            "{}"
        );
    }

    #[tokio::test]
    async fn http_failure_is_collaborator_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body("overloaded")
            .create_async()
            .await;

        let err = client(&server)
            .research_plan("5K", "mornings", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Collaborator { ref context, .. } if context == "research"));
    }

    #[tokio::test]
    async fn empty_completion_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(completion("   "))
            .create_async()
            .await;

        assert!(client(&server).summarize("x", "").await.is_err());
    }
}
