use serde::{Deserialize, Serialize};

/// Request body of `chat.postMessage`.
#[derive(Debug, Serialize)]
pub(crate) struct SlackPostMessageRequest {
    pub channel: String,
    pub text: String,
}

/// Envelope of every Slack Web API response.
#[derive(Debug, Deserialize)]
pub(crate) struct SlackApiResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
}
