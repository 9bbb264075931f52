//! Google Calendar v3 REST client.

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    reqwest::{Method, RequestBuilder, Response, StatusCode},
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::{debug, warn},
};

use crate::{
    error::{Error, Result},
    gateway::{CalendarConnector, CalendarGateway, SharedCalendarGateway},
    types::{CalendarEvent, EventBody, TimeRange},
};

#[derive(Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<CalendarEvent>,
}

#[derive(Deserialize)]
struct Setting {
    value: String,
}

/// Calendar client bound to a single bearer token.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    base_url: String,
    calendar_id: String,
    token: Secret<String>,
}

impl GoogleCalendarClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        calendar_id: impl Into<String>,
        token: Secret<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            calendar_id: calendar_id.into(),
            token,
        }
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            encode(&self.calendar_id)
        )
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), encode(event_id))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(self.token.expose_secret())
    }
}

/// Percent-encode one path segment. Form encoding writes spaces as `+`,
/// which a path reads back as a literal plus.
fn encode(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Map a non-success response onto the error taxonomy.
async fn check(resp: Response, event_id: Option<&str>) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => {
            Error::not_found(event_id.unwrap_or("<unknown>"))
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Unauthorized { message: body },
        s if s == StatusCode::TOO_MANY_REQUESTS || s.is_server_error() => Error::Transient {
            status: s.as_u16(),
            message: body,
        },
        s => Error::Api {
            status: s.as_u16(),
            message: body,
        },
    })
}

#[async_trait]
impl CalendarGateway for GoogleCalendarClient {
    async fn get(&self, event_id: &str) -> Result<CalendarEvent> {
        let resp = self
            .request(Method::GET, &self.event_url(event_id))
            .send()
            .await?;
        Ok(check(resp, Some(event_id)).await?.json().await?)
    }

    async fn insert(&self, body: &EventBody) -> Result<CalendarEvent> {
        let resp = self
            .request(Method::POST, &self.events_url())
            .json(body)
            .send()
            .await?;
        let created: CalendarEvent = check(resp, None).await?.json().await?;
        debug!(event_id = %created.id, summary = %body.summary, "event inserted");
        Ok(created)
    }

    async fn update(&self, event_id: &str, body: &EventBody) -> Result<CalendarEvent> {
        let resp = self
            .request(Method::PATCH, &self.event_url(event_id))
            .json(body)
            .send()
            .await?;
        Ok(check(resp, Some(event_id)).await?.json().await?)
    }

    async fn delete(&self, event_id: &str) -> Result<()> {
        let resp = self
            .request(Method::DELETE, &self.event_url(event_id))
            .send()
            .await?;
        match check(resp, Some(event_id)).await {
            Ok(_) => Ok(()),
            Err(Error::NotFound { .. }) => {
                debug!(event_id, "event already gone");
                Ok(())
            },
            Err(e) => Err(e),
        }
    }

    async fn list_instances(&self, series_id: &str) -> Result<Vec<CalendarEvent>> {
        let url = format!("{}/instances", self.event_url(series_id));
        let resp = self.request(Method::GET, &url).send().await?;
        let list: EventList = check(resp, Some(series_id)).await?.json().await?;
        Ok(list.items)
    }

    async fn list(&self, range: &TimeRange) -> Result<Vec<CalendarEvent>> {
        let resp = self
            .request(Method::GET, &self.events_url())
            .query(&[
                ("timeMin", range.time_min.to_rfc3339()),
                ("timeMax", range.time_max.to_rfc3339()),
                ("maxResults", range.max_results.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await?;
        let list: EventList = check(resp, None).await?.json().await?;
        Ok(list.items)
    }

    async fn timezone(&self) -> Result<String> {
        let url = format!("{}/users/me/settings/timezone", self.base_url);
        let resp = self.request(Method::GET, &url).send().await?;
        let setting: Setting = check(resp, None).await?.json().await?;
        Ok(setting.value)
    }
}

/// Builds [`GoogleCalendarClient`]s that share one connection pool.
pub struct GoogleConnector {
    http: reqwest::Client,
    base_url: String,
    calendar_id: String,
}

impl GoogleConnector {
    pub fn new(
        base_url: impl Into<String>,
        calendar_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            calendar_id: calendar_id.into(),
        })
    }
}

impl CalendarConnector for GoogleConnector {
    fn connect(&self, access_token: &str) -> Result<SharedCalendarGateway> {
        if access_token.trim().is_empty() {
            warn!("refusing to open calendar without an access token");
            return Err(Error::Unauthorized {
                message: "access token is missing".into(),
            });
        }
        Ok(Arc::new(GoogleCalendarClient::new(
            self.http.clone(),
            self.base_url.clone(),
            self.calendar_id.clone(),
            Secret::new(access_token.to_string()),
        )))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher, serde_json::json};

    fn client(server: &mockito::ServerGuard) -> GoogleCalendarClient {
        GoogleCalendarClient::new(
            reqwest::Client::new(),
            server.url(),
            "primary",
            Secret::new("tok".into()),
        )
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        assert_eq!(encode("a b+c"), "a%20b%2Bc");
        assert_eq!(
            encode("team@group.calendar.google.com"),
            "team%40group.calendar.google.com"
        );
    }

    #[tokio::test]
    async fn get_sends_bearer_and_parses_event() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/calendars/primary/events/p1")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_body(
                json!({
                    "id": "p1",
                    "status": "confirmed",
                    "summary": "5K Run",
                    "start": {"dateTime": "2025-06-15T07:00:00-06:00"},
                    "end": {"dateTime": "2025-06-15T08:00:00-06:00"}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let event = client(&server).get("p1").await.unwrap();
        assert_eq!(event.summary.as_deref(), Some("5K Run"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_event_maps_to_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/calendars/primary/events/nope")
            .with_status(404)
            .create_async()
            .await;

        let err = client(&server).get("nope").await.unwrap_err();
        assert!(matches!(err, Error::NotFound { ref event_id } if event_id == "nope"));
    }

    #[tokio::test]
    async fn rejected_token_maps_to_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/users/me/settings/timezone")
            .with_status(401)
            .with_body("invalid credentials")
            .create_async()
            .await;

        let err = client(&server).timezone().await.unwrap_err();
        assert!(matches!(err, Error::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn server_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/calendars/primary/events")
            .with_status(503)
            .create_async()
            .await;

        let err = client(&server)
            .insert(&EventBody::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transient { status: 503, .. }));
    }

    #[tokio::test]
    async fn delete_of_gone_event_succeeds() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/calendars/primary/events/old")
            .with_status(410)
            .create_async()
            .await;

        client(&server).delete("old").await.unwrap();
    }

    #[tokio::test]
    async fn list_requests_single_events_in_start_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/calendars/primary/events")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("singleEvents".into(), "true".into()),
                Matcher::UrlEncoded("orderBy".into(), "startTime".into()),
                Matcher::UrlEncoded("maxResults".into(), "100".into()),
            ]))
            .with_status(200)
            .with_body(json!({"items": [{"id": "a"}, {"id": "b"}]}).to_string())
            .create_async()
            .await;

        let start = chrono::Utc::now();
        let events = client(&server)
            .list(&TimeRange::days_from(start, 1, 100))
            .await
            .unwrap();
        assert_eq!(events.len(), 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn timezone_reads_calendar_setting() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/users/me/settings/timezone")
            .with_status(200)
            .with_body(r#"{"kind": "calendar#setting", "value": "Europe/Madrid"}"#)
            .create_async()
            .await;

        assert_eq!(client(&server).timezone().await.unwrap(), "Europe/Madrid");
    }

    #[test]
    fn connector_requires_token() {
        let connector =
            GoogleConnector::new("http://localhost", "primary", Duration::from_secs(5)).unwrap();
        assert!(connector.connect("").is_err());
        assert!(connector.connect("tok").is_ok());
    }
}
