//! serveme.tf booking API client. Pure request/response, no state.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::json;

use crate::config::CALL_TIMEOUT;
use crate::error::BotError;

pub const BASE_URL: &str = "https://serveme.tf/api/reservations";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerEntry {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerConfigEntry {
    pub id: u64,
    pub file: String,
}

/// Result of an availability search.
#[derive(Debug, Default, Deserialize)]
pub struct FoundServers {
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
    #[serde(default)]
    pub server_configs: Vec<ServerConfigEntry>,
}

impl FoundServers {
    pub fn config_id_for_file(&self, file: &str) -> Option<u64> {
        self.server_configs.iter().find(|c| c.file == file).map(|c| c.id)
    }
}

#[derive(Debug, Deserialize)]
struct Prefilled {
    actions: PrefilledActions,
}

#[derive(Debug, Deserialize)]
struct PrefilledActions {
    find_servers: String,
}

/// Booking parameters for one reservation.
#[derive(Debug)]
pub struct CreateReservation<'a> {
    pub starts_at: DateTime<Tz>,
    pub ends_at: DateTime<Tz>,
    pub server_id: u64,
    pub password: &'a str,
    pub rcon: &'a str,
    pub first_map: &'a str,
    pub server_config_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmedReservation {
    pub id: u64,
    pub password: String,
    pub server: ReservedServer,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReservedServer {
    pub name: String,
    pub ip_and_port: String,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    reservation: ConfirmedReservation,
}

/// Thin wrapper over the three booking operations. Every call is bounded
/// by the shared 10s client timeout.
#[derive(Debug)]
pub struct ServemeClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ServemeClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, BotError> {
        Self::with_base_url(api_key, BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, BotError> {
        let http = reqwest::Client::builder().timeout(CALL_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into(),
        })
    }

    /// Fetch the prefilled reservation, then follow its `find_servers`
    /// action with the requested window.
    pub async fn find_servers(
        &self,
        starts_at: &DateTime<Tz>,
        ends_at: &DateTime<Tz>,
    ) -> Result<FoundServers, BotError> {
        let url = format!("{}/new?api_key={}", self.base_url, self.api_key);
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(BotError::RemoteService(resp.text().await.unwrap_or_default()));
        }
        let prefilled: Prefilled = resp.json().await?;

        let payload = json!({
            "reservation": {
                "starts_at": starts_at.to_rfc3339(),
                "ends_at": ends_at.to_rfc3339(),
            }
        });
        let url = format!("{}?api_key={}", prefilled.actions.find_servers, self.api_key);
        let resp = self.http.post(&url).json(&payload).send().await?;
        if !resp.status().is_success() {
            return Err(BotError::RemoteService(resp.text().await.unwrap_or_default()));
        }
        Ok(resp.json().await?)
    }

    /// Book a server. Exactly HTTP 200 is success; 429 is the distinct
    /// rate-limited failure and is never retried here.
    pub async fn create_reservation(
        &self,
        req: &CreateReservation<'_>,
    ) -> Result<ConfirmedReservation, BotError> {
        let payload = json!({
            "reservation": {
                "starts_at": req.starts_at.to_rfc3339(),
                "ends_at": req.ends_at.to_rfc3339(),
                "server_id": req.server_id,
                "password": req.password,
                "rcon": req.rcon,
                "first_map": req.first_map,
                "server_config_id": req.server_config_id,
            }
        });
        let url = format!("{}?api_key={}", self.base_url, self.api_key);
        let resp = self.http.post(&url).json(&payload).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(BotError::RateLimited);
        }
        let body = resp.text().await.unwrap_or_default();
        if status != reqwest::StatusCode::OK {
            return Err(BotError::RemoteService(extract_error_message(&body)));
        }
        let parsed: CreateResponse = serde_json::from_str(&body)
            .map_err(|e| BotError::RemoteService(format!("unexpected booking response: {e}")))?;
        Ok(parsed.reservation)
    }

    /// 200 and 204 both mean the reservation is gone.
    pub async fn end_reservation(&self, reservation_id: u64) -> Result<(), BotError> {
        let url = format!(
            "{}/{}?api_key={}",
            self.base_url, reservation_id, self.api_key
        );
        let resp = self.http.delete(&url).send().await?;
        match resp.status().as_u16() {
            200 | 204 => Ok(()),
            _ => Err(BotError::RemoteService(resp.text().await.unwrap_or_default())),
        }
    }
}

/// Booking failures nest their reason under `reservation.errors`; fall back
/// to a top-level `error` field, then to the raw body.
fn extract_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };
    if let Some(errors) = value.pointer("/reservation/errors") {
        if !errors.is_null() {
            return errors.to_string();
        }
    }
    if let Some(msg) = value.get("error").and_then(|e| e.as_str()) {
        return msg.to_string();
    }
    body.to_string()
}

/// One menu entry: all servers sharing a name prefix, represented by the
/// lowest-id member.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerGroup {
    pub name: String,
    pub representative: ServerEntry,
}

/// Group servers by the text before `#` (trimmed), sorted by group name.
/// Truncation to the menu size happens at display time.
pub fn group_servers(servers: &[ServerEntry]) -> Vec<ServerGroup> {
    let mut groups: std::collections::BTreeMap<String, ServerEntry> =
        std::collections::BTreeMap::new();
    for server in servers {
        let name = server
            .name
            .split('#')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        groups
            .entry(name)
            .and_modify(|rep| {
                if server.id < rep.id {
                    *rep = server.clone();
                }
            })
            .or_insert_with(|| server.clone());
    }
    groups
        .into_iter()
        .map(|(name, representative)| ServerGroup {
            name,
            representative,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TIMEZONE;
    use chrono::TimeZone;

    fn window() -> (DateTime<Tz>, DateTime<Tz>) {
        let start = TIMEZONE.with_ymd_and_hms(2025, 5, 5, 20, 0, 0).unwrap();
        (start, start + chrono::Duration::hours(2))
    }

    fn entry(id: u64, name: &str) -> ServerEntry {
        ServerEntry {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn groups_by_prefix_with_lowest_id_representative() {
        let servers = vec![
            entry(7, "FakkelBrigade #2"),
            entry(3, "FakkelBrigade #1"),
            entry(9, "NewBrigade #1"),
        ];
        let groups = group_servers(&servers);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].name, "FakkelBrigade");
        assert_eq!(groups[0].representative.id, 3);
        assert_eq!(groups[1].name, "NewBrigade");
    }

    #[test]
    fn grouping_is_idempotent_over_representatives() {
        let servers = vec![
            entry(7, "FakkelBrigade #2"),
            entry(3, "FakkelBrigade #1"),
            entry(9, "NewBrigade #1"),
            entry(4, "NewBrigade #3"),
        ];
        let first = group_servers(&servers);
        let reps: Vec<ServerEntry> = first.iter().map(|g| g.representative.clone()).collect();
        let second = group_servers(&reps);
        assert_eq!(first, second);
    }

    #[test]
    fn names_without_separator_group_as_themselves() {
        let groups = group_servers(&[entry(1, "SoloServer")]);
        assert_eq!(groups[0].name, "SoloServer");
        assert_eq!(groups[0].representative.id, 1);
    }

    #[test]
    fn error_extraction_prefers_nested_reservation_errors() {
        let body = r#"{"reservation":{"errors":{"starts_at":["too close"]}}}"#;
        assert!(extract_error_message(body).contains("too close"));
        let body = r#"{"error":"API key invalid"}"#;
        assert_eq!(extract_error_message(body), "API key invalid");
        assert_eq!(extract_error_message("plain text"), "plain text");
    }

    #[tokio::test]
    async fn find_servers_follows_the_prefilled_action() {
        let mut server = mockito::Server::new_async().await;
        let prefilled = server
            .mock("GET", "/new")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(format!(
                r#"{{"actions":{{"find_servers":"{}/find_servers"}}}}"#,
                server.url()
            ))
            .create_async()
            .await;
        let found = server
            .mock("POST", "/find_servers")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"servers":[{"id":1,"name":"FakkelBrigade #1"}],
                    "server_configs":[{"id":42,"file":"etf2l_6v6_5cp"}]}"#,
            )
            .create_async()
            .await;

        let client = ServemeClient::with_base_url("test-key", server.url()).unwrap();
        let (start, end) = window();
        let result = client.find_servers(&start, &end).await.unwrap();
        assert_eq!(result.servers.len(), 1);
        assert_eq!(result.config_id_for_file("etf2l_6v6_5cp"), Some(42));
        assert_eq!(result.config_id_for_file("missing"), None);
        prefilled.assert_async().await;
        found.assert_async().await;
    }

    #[tokio::test]
    async fn find_servers_surfaces_upstream_errors_verbatim() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/new")
            .match_query(mockito::Matcher::Any)
            .with_status(500)
            .with_body("upstream exploded")
            .create_async()
            .await;

        let client = ServemeClient::with_base_url("test-key", server.url()).unwrap();
        let (start, end) = window();
        match client.find_servers(&start, &end).await {
            Err(BotError::RemoteService(msg)) => assert_eq!(msg, "upstream exploded"),
            other => panic!("expected RemoteService, got {other:?}"),
        }
    }

    fn create_request<'a>(start: &DateTime<Tz>, end: &DateTime<Tz>) -> CreateReservation<'a> {
        CreateReservation {
            starts_at: *start,
            ends_at: *end,
            server_id: 1,
            password: "fish",
            rcon: "fishrcon",
            first_map: "cp_process_f12",
            server_config_id: Some(42),
        }
    }

    #[tokio::test]
    async fn create_reservation_succeeds_only_on_200() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(
                r#"{"reservation":{"id":12345,"password":"fish",
                    "server":{"name":"FakkelBrigade #1","ip_and_port":"192.0.2.1:27015"}}}"#,
            )
            .create_async()
            .await;

        let client = ServemeClient::with_base_url("test-key", server.url()).unwrap();
        let (start, end) = window();
        let confirmed = client
            .create_reservation(&create_request(&start, &end))
            .await
            .unwrap();
        assert_eq!(confirmed.id, 12345);
        assert_eq!(confirmed.server.ip_and_port, "192.0.2.1:27015");
    }

    #[tokio::test]
    async fn create_reservation_maps_429_to_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .match_query(mockito::Matcher::Any)
            .with_status(429)
            .with_body(r#"{"error":"slow down"}"#)
            .create_async()
            .await;

        let client = ServemeClient::with_base_url("test-key", server.url()).unwrap();
        let (start, end) = window();
        let err = client
            .create_reservation(&create_request(&start, &end))
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::RateLimited));
    }

    #[tokio::test]
    async fn create_reservation_extracts_nested_errors() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .match_query(mockito::Matcher::Any)
            .with_status(422)
            .with_body(r#"{"reservation":{"errors":{"server_id":["is taken"]}}}"#)
            .create_async()
            .await;

        let client = ServemeClient::with_base_url("test-key", server.url()).unwrap();
        let (start, end) = window();
        match client.create_reservation(&create_request(&start, &end)).await {
            Err(BotError::RemoteService(msg)) => assert!(msg.contains("is taken")),
            other => panic!("expected RemoteService, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn end_reservation_accepts_200_and_204() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("DELETE", "/12345")
            .match_query(mockito::Matcher::Any)
            .with_status(204)
            .create_async()
            .await;
        let client = ServemeClient::with_base_url("test-key", server.url()).unwrap();
        client.end_reservation(12345).await.unwrap();
        ok.assert_async().await;

        let _gone = server
            .mock("DELETE", "/99999")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .with_body("not yours")
            .create_async()
            .await;
        match client.end_reservation(99999).await {
            Err(BotError::RemoteService(msg)) => assert_eq!(msg, "not yours"),
            other => panic!("expected RemoteService, got {other:?}"),
        }
    }
}
