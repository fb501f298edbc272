/// Configuration for the Slack escalation transport.
#[derive(Clone)]
pub struct SlackConfig {
    /// Bot OAuth token used to authenticate API requests.
    pub token: String,

    /// Channel escalations are posted to.
    pub channel: String,

    /// Base URL for the Slack Web API. Override this for testing against a
    /// mock server.
    pub api_base_url: String,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("token", &"[REDACTED]")
            .field("channel", &self.channel)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl SlackConfig {
    /// Create a configuration posting to `channel`.
    ///
    /// Uses the default Slack API base URL (`https://slack.com/api`).
    pub fn new(token: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            channel: channel.into(),
            api_base_url: "https://slack.com/api".to_owned(),
        }
    }

    /// Override the API base URL (useful for testing).
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Reject empty token or channel.
    pub fn validate(&self) -> Result<(), String> {
        if self.token.trim().is_empty() {
            return Err("slack token must not be empty".into());
        }
        if self.channel.trim().is_empty() {
            return Err("slack channel must not be empty".into());
        }
        Ok(())
    }
}
