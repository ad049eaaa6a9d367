//! Review-status API client and response validation.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::BotError;

/// Query parameter carrying the cursor: `from_date` as the API documents it, not `from_data`.
const CURSOR_PARAM: &str = "from_date";

/// A homework entry as returned by the review API.
///
/// Only `homework_name` and `status` drive notifications; the rest is logged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HomeworkRecord {
    pub homework_name: Option<String>,
    pub status: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub lesson_name: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub reviewer_comment: Option<String>,
    #[serde(default, deserialize_with = "string_or_none")]
    pub date_updated: Option<String>,
}

/// Informational fields never fail validation; a non-string becomes `None`.
fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Value::deserialize(deserializer)?
        .as_str()
        .map(String::from))
}

/// A response that passed shape validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedResponse {
    /// In the order the server returned them.
    pub homeworks: Vec<HomeworkRecord>,
    /// Lower bound for the next request.
    pub current_date: i64,
}

/// Anything that can answer a status poll.
pub trait StatusSource {
    async fn get_api_answer(&self, cursor: i64) -> Result<Value, BotError>;
}

pub struct PracticumClient {
    endpoint: String,
    token: String,
    http: reqwest::Client,
}

impl PracticumClient {
    pub fn new(endpoint: String, token: String, timeout: Duration) -> Result<Self, BotError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { endpoint, token, http })
    }
}

impl StatusSource for PracticumClient {
    async fn get_api_answer(&self, cursor: i64) -> Result<Value, BotError> {
        debug!("Requesting {} ({CURSOR_PARAM}={cursor})", self.endpoint);

        let response = self
            .http
            .get(&self.endpoint)
            .header(AUTHORIZATION, format!("OAuth {}", self.token))
            .query(&[(CURSOR_PARAM, cursor)])
            .send()
            .await
            .map_err(|e| {
                let e = BotError::from(e);
                error!("Review API request failed: {e}");
                e
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            error!("Review API returned {status}");
            return Err(BotError::UnexpectedStatus(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| {
            let e = BotError::from(e);
            error!("Failed to read review API response: {e}");
            e
        })?;
        debug!("Response received ({} bytes)", body.len());

        serde_json::from_str(&body).map_err(|e| {
            error!("Review API returned invalid JSON: {e}");
            BotError::Decode(e.to_string())
        })
    }
}

fn type_mismatch(what: String) -> BotError {
    error!("Unexpected response type: {what}");
    BotError::TypeMismatch(what)
}

/// Validate the shape of a poll response.
pub fn check_response(response: &Value) -> Result<CheckedResponse, BotError> {
    debug!("Checking response shape");

    let Some(object) = response.as_object() else {
        return Err(type_mismatch(format!("expected an object, got {}", kind(response))));
    };

    let mut missing: Vec<String> = ["homeworks", "current_date"]
        .into_iter()
        .filter(|key| !object.contains_key(*key))
        .map(String::from)
        .collect();
    if !missing.is_empty() {
        missing.sort();
        error!("Response is missing keys: {missing:?}");
        return Err(BotError::MissingKeys(missing));
    }

    let Some(items) = object["homeworks"].as_array() else {
        return Err(type_mismatch(format!(
            "'homeworks' should be a list, got {}",
            kind(&object["homeworks"])
        )));
    };
    let Some(current_date) = object["current_date"].as_i64() else {
        return Err(type_mismatch(format!(
            "'current_date' should be an integer, got {}",
            kind(&object["current_date"])
        )));
    };

    let homeworks = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            if !item.is_object() {
                return Err(type_mismatch(format!("homeworks[{i}] should be an object, got {}", kind(item))));
            }
            HomeworkRecord::deserialize(item)
                .map_err(|e| type_mismatch(format!("homeworks[{i}]: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if homeworks.is_empty() {
        debug!("No homeworks in response");
    }

    Ok(CheckedResponse { homeworks, current_date })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    // =========================================================================
    // RESPONSE VALIDATION
    // =========================================================================

    #[test]
    fn test_valid_response() {
        let response = json!({
            "homeworks": [
                {"homework_name": "hw1", "status": "reviewing", "lesson_name": "Intro"},
                {"homework_name": "hw2", "status": "approved", "id": 42}
            ],
            "current_date": 1000
        });
        let checked = check_response(&response).unwrap();
        assert_eq!(checked.current_date, 1000);
        assert_eq!(checked.homeworks.len(), 2);
        assert_eq!(checked.homeworks[0].homework_name.as_deref(), Some("hw1"));
        assert_eq!(checked.homeworks[0].lesson_name.as_deref(), Some("Intro"));
        assert_eq!(checked.homeworks[1].status.as_deref(), Some("approved"));
    }

    #[test]
    fn test_empty_homeworks_is_ok() {
        let checked = check_response(&json!({"homeworks": [], "current_date": 5})).unwrap();
        assert!(checked.homeworks.is_empty());
        assert_eq!(checked.current_date, 5);
    }

    #[test]
    fn test_not_an_object() {
        let err = check_response(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, BotError::TypeMismatch(_)));
    }

    #[test]
    fn test_homeworks_not_a_list() {
        let err = check_response(&json!({"homeworks": {"hw1": "approved"}, "current_date": 1})).unwrap_err();
        assert!(matches!(err, BotError::TypeMismatch(_)));
    }

    #[test]
    fn test_missing_current_date() {
        let err = check_response(&json!({"homeworks": []})).unwrap_err();
        assert_eq!(err, BotError::MissingKeys(vec!["current_date".to_string()]));
    }

    #[test]
    fn test_missing_both_keys() {
        let err = check_response(&json!({})).unwrap_err();
        assert_eq!(
            err,
            BotError::MissingKeys(vec!["current_date".to_string(), "homeworks".to_string()])
        );
    }

    #[test]
    fn test_current_date_not_integer() {
        let err = check_response(&json!({"homeworks": [], "current_date": "yesterday"})).unwrap_err();
        assert!(matches!(err, BotError::TypeMismatch(_)));
    }

    #[test]
    fn test_record_with_wrong_field_type() {
        let err = check_response(&json!({
            "homeworks": [{"homework_name": 17, "status": "approved"}],
            "current_date": 1
        }))
        .unwrap_err();
        assert!(matches!(err, BotError::TypeMismatch(_)));
    }

    #[test]
    fn test_record_not_an_object() {
        let err = check_response(&json!({"homeworks": ["hw1"], "current_date": 1})).unwrap_err();
        assert!(matches!(err, BotError::TypeMismatch(_)));
    }

    #[test]
    fn test_record_missing_fields_passes_validation() {
        // Field presence is the formatter's concern.
        let checked = check_response(&json!({"homeworks": [{}], "current_date": 1})).unwrap();
        assert_eq!(checked.homeworks[0], HomeworkRecord::default());
    }

    #[test]
    fn test_informational_fields_of_any_type_are_tolerated() {
        let checked = check_response(&json!({
            "homeworks": [{
                "homework_name": "hw1",
                "status": "approved",
                "lesson_name": 7,
                "reviewer_comment": {"text": "nice"},
                "date_updated": null
            }],
            "current_date": 1
        }))
        .unwrap();
        let record = &checked.homeworks[0];
        assert_eq!(record.homework_name.as_deref(), Some("hw1"));
        assert_eq!(record.lesson_name, None);
        assert_eq!(record.reviewer_comment, None);
        assert_eq!(record.date_updated, None);
    }

    #[test]
    fn test_null_name_reads_as_absent() {
        let checked = check_response(&json!({
            "homeworks": [{"homework_name": null, "status": "approved"}],
            "current_date": 1
        }))
        .unwrap();
        assert_eq!(checked.homeworks[0].homework_name, None);
    }

    // =========================================================================
    // HTTP CLIENT
    // =========================================================================

    /// Accepts one connection, captures the request head, and answers with
    /// `status` and `body`. Returns the endpoint URL and the captured request.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        (format!("http://{addr}/api/user_api/homework_statuses/"), rx)
    }

    fn client(endpoint: String) -> PracticumClient {
        PracticumClient::new(endpoint, "y0_token".to_string(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_get_api_answer_ok() {
        let (url, request) = serve_once(
            "200 OK",
            r#"{"homeworks": [{"homework_name": "hw1", "status": "reviewing"}], "current_date": 1000}"#,
        )
        .await;

        let answer = client(url).get_api_answer(900).await.unwrap();
        assert_eq!(answer["current_date"], json!(1000));

        let request = request.await.unwrap().to_lowercase();
        assert!(request.starts_with("get /api/user_api/homework_statuses/?from_date=900 "));
        assert!(request.contains("authorization: oauth y0_token"));
    }

    #[tokio::test]
    async fn test_get_api_answer_non_200() {
        let (url, _request) = serve_once("503 Service Unavailable", r#"{"error": "down"}"#).await;
        let err = client(url).get_api_answer(0).await.unwrap_err();
        assert_eq!(err, BotError::UnexpectedStatus(503));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_get_api_answer_invalid_json() {
        let (url, _request) = serve_once("200 OK", "<html>maintenance</html>").await;
        let err = client(url).get_api_answer(0).await.unwrap_err();
        assert!(matches!(err, BotError::Decode(_)));
    }

    #[tokio::test]
    async fn test_get_api_answer_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{addr}/")).get_api_answer(0).await.unwrap_err();
        assert!(matches!(err, BotError::Http(_)));
    }

    #[tokio::test]
    async fn test_get_api_answer_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept and hold the connection without ever answering.
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let client = PracticumClient::new(
            format!("http://{addr}/"),
            "y0_token".to_string(),
            Duration::from_millis(200),
        )
        .unwrap();
        let err = client.get_api_answer(0).await.unwrap_err();
        assert_eq!(err, BotError::Timeout);
    }
}
