use askama::Template;
use serde_json::json;
use tracing::{info, warn};
use url::Url;

use crate::{config::AppConfig, error::AppError, trips::create::InviteSummary};

const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Template)]
#[template(path = "email/trip_invite.html")]
struct TripInviteEmail<'a> {
    trip_title: &'a str,
    inviter: &'a str,
    invite_id: &'a str,
}

/// Invite email delivery over the mail provider's HTTP API. Delivery runs
/// after the trip-creation transaction has committed and is never allowed
/// to fail that flow; an unconfigured API key disables sending entirely.
#[derive(Clone)]
pub struct Mailer {
    http: reqwest::Client,
    api_url: Url,
    api_key: String,
    from: String,
}

impl Mailer {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            api_url: config.mail_api_url.clone(),
            api_key: config.mail_api_key.clone(),
            from: config.mail_from.clone(),
        })
    }

    fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Send one invite email per created invite, returning the addresses
    /// that were delivered. Per-invite failures are logged and skipped.
    pub async fn send_trip_invites(
        &self,
        trip_title: &str,
        inviter: &str,
        invites: &[InviteSummary],
    ) -> Result<Vec<String>, AppError> {
        if !self.is_enabled() || invites.is_empty() {
            return Ok(Vec::new());
        }

        let mut delivered = Vec::with_capacity(invites.len());
        for invite in invites {
            let body = TripInviteEmail {
                trip_title,
                inviter,
                invite_id: &invite.invite_id,
            }
            .render()
            .map_err(|err| AppError::Other(err.into()))?;

            let response = self
                .http
                .post(self.api_url.clone())
                .bearer_auth(&self.api_key)
                .json(&json!({
                    "from": self.from,
                    "to": [invite.email],
                    "subject": format!("{inviter} invited you to join \"{trip_title}\""),
                    "html": body,
                }))
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => {
                    delivered.push(invite.email.clone());
                }
                Ok(response) => {
                    warn!(
                        email = %invite.email,
                        status = %response.status(),
                        "invite email rejected by mail provider"
                    );
                }
                Err(err) => {
                    warn!(email = %invite.email, "invite email failed: {err}");
                }
            }
        }

        if !delivered.is_empty() {
            info!(count = delivered.len(), "invite emails sent");
        }
        Ok(delivered)
    }
}
