//! Upstream draw feed
//!
//! Fetches the latest finished round from the lottery source and validates
//! it before anything downstream sees it. Expected payload:
//!
//! ```json
//! { "state": 1, "data": { "Expect": "100", "OpenCode": "3,4,5" } }
//! ```

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Default upstream endpoint
pub const DEFAULT_UPSTREAM_URL: &str = "https://66.bot/GetNewLottery/LT_TaixiuMD5";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UpstreamError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream returned HTTP {0}")]
    Status(u16),

    #[error("Undecodable upstream body: {0}")]
    Decode(String),

    #[error("Upstream state is {0}, expected 1")]
    InvalidState(String),

    #[error("Upstream payload has no data")]
    MissingData,

    #[error("Invalid OpenCode: {0}")]
    InvalidOpenCode(String),

    #[error("Invalid round identifier: {0}")]
    InvalidRound(String),
}

impl UpstreamError {
    /// True when the source answered but the answer was unusable
    pub fn is_payload_error(&self) -> bool {
        !matches!(self, UpstreamError::Network(_) | UpstreamError::Status(_))
    }
}

/// Round identifier exactly as the source sent it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RoundId {
    Text(String),
    Number(u64),
}

impl RoundId {
    fn from_value(value: &Value) -> Result<Self, UpstreamError> {
        match value {
            Value::String(s) => Ok(RoundId::Text(s.clone())),
            Value::Number(n) => n
                .as_u64()
                .map(RoundId::Number)
                .ok_or_else(|| UpstreamError::InvalidRound(n.to_string())),
            other => Err(UpstreamError::InvalidRound(other.to_string())),
        }
    }

    pub fn as_number(&self) -> Result<u64, UpstreamError> {
        match self {
            RoundId::Number(n) => Ok(*n),
            RoundId::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| UpstreamError::InvalidRound(s.clone())),
        }
    }
}

/// A validated draw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draw {
    pub round: RoundId,
    /// Round the prediction applies to
    pub next_round: u64,
    pub dice: [u8; 3],
}

impl Draw {
    pub fn sum(&self) -> u8 {
        self.dice.iter().sum()
    }
}

/// Parse `"d1,d2,d3"` into three die faces
pub fn parse_open_code(open_code: &str) -> Result<[u8; 3], UpstreamError> {
    let invalid = || UpstreamError::InvalidOpenCode(open_code.to_string());

    let faces = open_code
        .split(',')
        .map(|part| part.trim().parse::<u8>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;

    let dice: [u8; 3] = faces.try_into().map_err(|_| invalid())?;
    if dice.iter().any(|d| !(1..=6).contains(d)) {
        return Err(invalid());
    }
    Ok(dice)
}

/// Validate a decoded upstream body
pub fn decode_payload(body: &Value) -> Result<Draw, UpstreamError> {
    match body.get("state") {
        Some(state) if state.as_f64() == Some(1.0) => {}
        Some(state) => return Err(UpstreamError::InvalidState(state.to_string())),
        None => return Err(UpstreamError::InvalidState("missing".to_string())),
    }

    let data = match body.get("data") {
        Some(data) if !data.is_null() => data,
        _ => return Err(UpstreamError::MissingData),
    };

    let open_code = data
        .get("OpenCode")
        .and_then(Value::as_str)
        .ok_or_else(|| UpstreamError::InvalidOpenCode("missing".to_string()))?;
    let dice = parse_open_code(open_code)?;

    let round = data
        .get("Expect")
        .ok_or_else(|| UpstreamError::InvalidRound("missing".to_string()))
        .and_then(RoundId::from_value)?;
    let next_round = round
        .as_number()?
        .checked_add(1)
        .ok_or_else(|| UpstreamError::InvalidRound("overflow".to_string()))?;

    Ok(Draw {
        round,
        next_round,
        dice,
    })
}

/// Anything that can produce the latest draw
#[async_trait]
pub trait DrawSource: Send + Sync {
    async fn latest_draw(&self) -> Result<Draw, UpstreamError>;
}

/// HTTP client for the lottery source
pub struct UpstreamClient {
    url: String,
    http_client: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        Ok(Self {
            url: url.into(),
            http_client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DrawSource for UpstreamClient {
    async fn latest_draw(&self) -> Result<Draw, UpstreamError> {
        debug!(url = %self.url, "Fetching latest draw");

        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| UpstreamError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status().as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        decode_payload(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_open_code() {
        assert_eq!(parse_open_code("3,4,5").unwrap(), [3, 4, 5]);
        assert_eq!(parse_open_code(" 1, 6 ,2").unwrap(), [1, 6, 2]);
    }

    #[test]
    fn test_parse_open_code_rejects_bad_input() {
        for bad in ["", "3,4", "3,4,5,6", "a,b,c", "0,1,2", "7,1,1", "3,,5", "-1,2,3"] {
            assert!(
                matches!(parse_open_code(bad), Err(UpstreamError::InvalidOpenCode(_))),
                "expected rejection for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_decode_string_round() {
        let body = json!({ "state": 1, "data": { "Expect": "100", "OpenCode": "3,4,5" } });
        let draw = decode_payload(&body).unwrap();

        assert_eq!(draw.round, RoundId::Text("100".to_string()));
        assert_eq!(draw.next_round, 101);
        assert_eq!(draw.dice, [3, 4, 5]);
        assert_eq!(draw.sum(), 12);
    }

    #[test]
    fn test_decode_numeric_round() {
        let body = json!({ "state": 1, "data": { "Expect": 2024, "OpenCode": "1,1,1" } });
        let draw = decode_payload(&body).unwrap();

        assert_eq!(draw.round, RoundId::Number(2024));
        assert_eq!(draw.next_round, 2025);
        assert_eq!(draw.sum(), 3);
    }

    #[test]
    fn test_decode_accepts_float_state() {
        let body = json!({ "state": 1.0, "data": { "Expect": "7", "OpenCode": "2,2,2" } });
        assert_eq!(decode_payload(&body).unwrap().next_round, 8);

        let body = json!({ "state": 1.5, "data": { "Expect": "7", "OpenCode": "2,2,2" } });
        assert!(matches!(decode_payload(&body), Err(UpstreamError::InvalidState(_))));

        let body = json!({ "state": "1", "data": { "Expect": "7", "OpenCode": "2,2,2" } });
        assert!(matches!(decode_payload(&body), Err(UpstreamError::InvalidState(_))));
    }

    #[test]
    fn test_decode_rejects_bad_state() {
        let body = json!({ "state": 0, "data": { "Expect": "1", "OpenCode": "1,2,3" } });
        assert!(matches!(decode_payload(&body), Err(UpstreamError::InvalidState(_))));

        let body = json!({ "data": { "Expect": "1", "OpenCode": "1,2,3" } });
        assert!(matches!(decode_payload(&body), Err(UpstreamError::InvalidState(_))));
    }

    #[test]
    fn test_decode_rejects_missing_data() {
        assert!(matches!(
            decode_payload(&json!({ "state": 1 })),
            Err(UpstreamError::MissingData)
        ));
        assert!(matches!(
            decode_payload(&json!({ "state": 1, "data": null })),
            Err(UpstreamError::MissingData)
        ));
    }

    #[test]
    fn test_decode_rejects_bad_round() {
        let body = json!({ "state": 1, "data": { "Expect": "abc", "OpenCode": "1,2,3" } });
        assert!(matches!(decode_payload(&body), Err(UpstreamError::InvalidRound(_))));

        let body = json!({ "state": 1, "data": { "OpenCode": "1,2,3" } });
        assert!(matches!(decode_payload(&body), Err(UpstreamError::InvalidRound(_))));
    }

    #[test]
    fn test_payload_error_classification() {
        assert!(!UpstreamError::Network("timeout".into()).is_payload_error());
        assert!(!UpstreamError::Status(502).is_payload_error());
        assert!(UpstreamError::MissingData.is_payload_error());
        assert!(UpstreamError::Decode("eof".into()).is_payload_error());
    }
}
