//! Telegram Bot API role lookups (`getChatMember`).

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{PlatformError, PlatformRole, PlatformRoles};

/// `getChatMember` envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    result: Option<ChatMember>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMember {
    status: String,
}

/// Map a Telegram member status onto a platform role.
pub fn role_from_status(status: &str) -> Result<PlatformRole, PlatformError> {
    match status {
        "creator" => Ok(PlatformRole::Owner),
        "administrator" => Ok(PlatformRole::Administrator),
        "member" => Ok(PlatformRole::Member),
        "restricted" => Ok(PlatformRole::Restricted),
        "left" | "kicked" => Ok(PlatformRole::Left),
        other => Err(PlatformError::UnknownStatus(other.to_string())),
    }
}

fn role_from_response(body: ApiResponse) -> Result<PlatformRole, PlatformError> {
    if !body.ok {
        return Err(PlatformError::Rejected(
            body.description
                .unwrap_or_else(|| "no description".to_string()),
        ));
    }
    let member = body
        .result
        .ok_or_else(|| PlatformError::Rejected("missing result".to_string()))?;
    role_from_status(&member.status)
}

/// Role lookups against the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramRoles {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl fmt::Debug for TelegramRoles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramRoles")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl TelegramRoles {
    /// Build a client with a per-request timeout.
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Request URL. Carries the token, so errors built from it are stripped of the URL.
    fn endpoint(&self) -> String {
        format!("{}/bot{}/getChatMember", self.base_url, self.token)
    }
}

#[async_trait]
impl PlatformRoles for TelegramRoles {
    async fn member_role(
        &self,
        community_id: i64,
        identity_id: i64,
    ) -> Result<PlatformRole, PlatformError> {
        let body: ApiResponse = self
            .http
            .get(self.endpoint())
            .query(&[("chat_id", community_id), ("user_id", identity_id)])
            .send()
            .await
            .map_err(reqwest::Error::without_url)?
            .json()
            .await
            .map_err(reqwest::Error::without_url)?;

        let role = role_from_response(body)?;
        debug!(community_id, identity_id, ?role, "Platform role fetched");
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(role_from_status("creator").unwrap(), PlatformRole::Owner);
        assert_eq!(
            role_from_status("administrator").unwrap(),
            PlatformRole::Administrator
        );
        assert_eq!(role_from_status("member").unwrap(), PlatformRole::Member);
        assert_eq!(
            role_from_status("restricted").unwrap(),
            PlatformRole::Restricted
        );
        assert_eq!(role_from_status("left").unwrap(), PlatformRole::Left);
        assert_eq!(role_from_status("kicked").unwrap(), PlatformRole::Left);
        assert!(matches!(
            role_from_status("superuser"),
            Err(PlatformError::UnknownStatus(_))
        ));
    }

    #[test]
    fn test_response_parsing() {
        let ok: ApiResponse = serde_json::from_str(
            r#"{"ok":true,"result":{"status":"creator","user":{"id":1,"is_bot":false,"first_name":"A"}}}"#,
        )
        .unwrap();
        assert_eq!(role_from_response(ok).unwrap(), PlatformRole::Owner);

        let rejected: ApiResponse = serde_json::from_str(
            r#"{"ok":false,"error_code":400,"description":"Bad Request: user not found"}"#,
        )
        .unwrap();
        match role_from_response(rejected) {
            Err(PlatformError::Rejected(msg)) => assert!(msg.contains("user not found")),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = TelegramRoles::new(
            "https://api.telegram.org/",
            "123456:SECRET",
            Duration::from_secs(1),
        )
        .unwrap();
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("SECRET"));
        assert!(client.endpoint().starts_with("https://api.telegram.org/bot123456"));
    }

    #[tokio::test]
    async fn test_failed_lookup_does_not_expose_token() {
        let client = TelegramRoles::new(
            "http://127.0.0.1:1",
            "123456:SECRET",
            Duration::from_secs(1),
        )
        .unwrap();

        let err = client.member_role(-100, 7).await.unwrap_err();
        assert!(matches!(err, PlatformError::Http(_)));
        let shown = format!("{err} {err:?}");
        assert!(!shown.contains("SECRET"), "token leaked: {shown}");
    }
}
