//! Admin magic links.
//!
//! An admin asks for a challenge, receives a single-use link by email and
//! presents the token back from the same account. Only the SHA-256 of the
//! token is stored. A successful verification yields the `adminVerified`
//! cookie that unlocks the elevated routes.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use super::audit;
use super::rate_limit::{RateDecision, RateLimiter};
use super::ServiceFailure;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::mail::{self, EmailMessage, MailError, Mailer};
use crate::models::{AdminChallenge, AttackAlert, User};
use crate::store::{Store, StoreError};

pub const ADMIN_COOKIE: &str = "adminVerified";
const TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("Admin access required")]
    NotAdmin,

    #[error("Too many admin challenges requested ({count}/{limit} in the last hour)")]
    UserRateLimited { count: u64, limit: u64 },

    #[error("Admin challenges are temporarily unavailable ({count}/{limit} in the last hour)")]
    GlobalRateLimited { count: u64, limit: u64 },

    #[error("Invalid or already used token")]
    InvalidToken,

    #[error("Token was issued to a different account")]
    EmailMismatch,

    #[error("Token has expired")]
    Expired,

    #[error("Invalid verify base URL: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceFailure for ChallengeError {
    fn client_error(&self) -> Option<ApiError> {
        match self {
            ChallengeError::NotAdmin | ChallengeError::EmailMismatch => {
                Some(ApiError::forbidden(self.to_string()))
            }
            ChallengeError::UserRateLimited { .. } | ChallengeError::GlobalRateLimited { .. } => {
                Some(ApiError::too_many_requests(self.to_string()))
            }
            ChallengeError::InvalidToken | ChallengeError::Expired => {
                Some(ApiError::unauthorized(self.to_string()))
            }
            ChallengeError::Mail(_) => Some(ApiError::bad_gateway("Failed to send admin link")),
            ChallengeError::BaseUrl(_) | ChallengeError::Store(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeIssued {
    pub sent_to: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeVerified {
    pub verified: bool,
    #[serde(skip)]
    pub cookie: String,
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn verify_link(base_url: &str, token: &str) -> Result<Url, url::ParseError> {
    let mut link = Url::parse(&format!("{}/admin/verify", base_url.trim_end_matches('/')))?;
    link.query_pairs_mut().append_pair("token", token);
    Ok(link)
}

/// `Set-Cookie` value granting elevated access.
pub fn admin_cookie(config: &AppConfig) -> String {
    let mut cookie = format!(
        "{}=true; HttpOnly; SameSite=Strict; Path=/admin; Max-Age={}",
        ADMIN_COOKIE, config.admin.cookie_max_age_secs
    );
    if config.security.require_https {
        cookie.push_str("; Secure");
    }
    cookie
}

fn email_body(link: &Url, ttl_minutes: i64) -> String {
    format!(
        "<p>Someone (hopefully you) asked for admin access to Prix Six.</p>\
         <p><a href=\"{link}\">Verify admin access</a></p>\
         <p>The link works once and expires in {ttl_minutes} minutes.</p>"
    )
}

pub struct ChallengeService<'a> {
    store: &'a dyn Store,
    mailer: &'a dyn Mailer,
    config: &'a AppConfig,
}

impl<'a> ChallengeService<'a> {
    pub fn new(store: &'a dyn Store, mailer: &'a dyn Mailer, config: &'a AppConfig) -> Self {
        Self { store, mailer, config }
    }

    fn limiter(&self) -> RateLimiter<'a> {
        RateLimiter::new(
            self.store,
            self.config.admin.per_user_hourly_limit,
            self.config.admin.global_hourly_limit,
        )
    }

    async fn alert(&self, kind: &str, user_id: &str, details: serde_json::Value, now: DateTime<Utc>) {
        let alert = AttackAlert {
            id: uuid::Uuid::new_v4().to_string(),
            kind: kind.to_string(),
            user_id: Some(user_id.to_string()),
            details,
            timestamp: now,
        };
        warn!(kind, user_id, "Attack alert raised");
        if let Err(e) = self.store.append_attack_alert(&alert).await {
            warn!("Failed to write attack alert '{}': {}", kind, e);
        }
    }

    pub async fn request(&self, admin: &User, now: DateTime<Utc>) -> Result<ChallengeIssued, ChallengeError> {
        if !admin.is_admin {
            warn!("Non-admin {} requested an admin challenge", admin.id);
            return Err(ChallengeError::NotAdmin);
        }

        let limiter = self.limiter();
        match limiter.check(&admin.id, now).await? {
            RateDecision::Allowed => {}
            RateDecision::UserLimited { count, limit } => {
                warn!("Admin challenge rate limit hit by {} ({}/{})", admin.id, count, limit);
                return Err(ChallengeError::UserRateLimited { count, limit });
            }
            RateDecision::GlobalLimited { count, limit } => {
                self.alert(
                    "admin_challenge_flood",
                    &admin.id,
                    json!({ "count": count, "limit": limit }),
                    now,
                )
                .await;
                return Err(ChallengeError::GlobalRateLimited { count, limit });
            }
        }

        let token = generate_token();
        let ttl = Duration::seconds(self.config.admin.challenge_ttl_secs);
        let link = verify_link(&self.config.admin.verify_base_url, &token)?;
        let challenge = AdminChallenge {
            token_hash: hash_token(&token),
            user_id: admin.id.clone(),
            email: admin.email.clone(),
            created_at: now,
            expires_at: now + ttl,
        };
        self.store.put_challenge(&challenge).await?;
        limiter.record(&admin.id, now).await?;

        let message = EmailMessage {
            to: admin.email.clone(),
            subject: "Prix Six admin access link".to_string(),
            html_body: email_body(&link, ttl.num_minutes()),
        };
        mail::send_logged(self.store, self.mailer, &message).await?;

        audit::record(
            self.store,
            &admin.id,
            "admin_challenge_requested",
            json!({ "expiresAt": challenge.expires_at }),
        )
        .await;
        info!("Admin challenge issued for {}", admin.id);

        Ok(ChallengeIssued {
            sent_to: admin.email.clone(),
            expires_at: challenge.expires_at,
        })
    }

    /// Consumes the token whenever it exists, whatever the outcome.
    pub async fn verify(
        &self,
        user: &User,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<ChallengeVerified, ChallengeError> {
        if !user.is_admin {
            return Err(ChallengeError::NotAdmin);
        }

        let token_hash = hash_token(token);
        let Some(challenge) = self.store.get_challenge(&token_hash).await? else {
            warn!("Unknown admin token presented by {}", user.id);
            return Err(ChallengeError::InvalidToken);
        };
        if !self.store.delete_challenge(&token_hash).await? {
            // Lost a race with another verification of the same token.
            return Err(ChallengeError::InvalidToken);
        }

        if !user.email_matches(&challenge.email) {
            self.alert(
                "admin_token_email_mismatch",
                &user.id,
                json!({ "tokenOwner": challenge.user_id }),
                now,
            )
            .await;
            return Err(ChallengeError::EmailMismatch);
        }

        if challenge.is_expired(now) {
            warn!("Expired admin token presented by {}", user.id);
            return Err(ChallengeError::Expired);
        }

        audit::record(self.store, &user.id, "admin_challenge_verified", json!({})).await;
        info!("Admin access verified for {}", user.id);

        Ok(ChallengeVerified {
            verified: true,
            cookie: admin_cookie(self.config),
        })
    }
}
