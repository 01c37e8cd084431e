//! Bearer tokens for users and admins.
//!
//! Each principal holds at most one token; issuing a new one replaces the old.
//! Expired tokens are cleared lazily on lookup and in bulk by the hourly sweep.

use anyhow::Result;
use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::config::SecurityConfig;
use crate::db::{Store, format_timestamp, now_timestamp};
use crate::services::password::generate_token;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub id: i32,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminIdentity {
    pub id: i32,
    pub username: String,
}

/// Who is making a request. User and admin are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Principal {
    #[default]
    Anonymous,
    User(UserIdentity),
    Admin(AdminIdentity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrincipalKind {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub users: u64,
    pub admins: u64,
}

#[derive(Clone)]
pub struct TokenStore {
    store: Store,
    user_ttl: Duration,
    admin_ttl: Duration,
}

impl TokenStore {
    #[must_use]
    pub fn new(store: Store, config: &SecurityConfig) -> Self {
        Self {
            store,
            user_ttl: Duration::hours(i64::from(config.user_token_ttl_hours)),
            admin_ttl: Duration::hours(i64::from(config.admin_token_ttl_hours)),
        }
    }

    #[must_use]
    pub const fn ttl(&self, kind: PrincipalKind) -> Duration {
        match kind {
            PrincipalKind::User => self.user_ttl,
            PrincipalKind::Admin => self.admin_ttl,
        }
    }

    /// Issues a fresh token valid for `ttl`, replacing any previous one.
    pub async fn issue(&self, kind: PrincipalKind, id: i32, ttl: Duration) -> Result<String> {
        let token = generate_token();
        let expires = format_timestamp(Utc::now() + ttl);

        let updated = match kind {
            PrincipalKind::User => self.store.set_user_token(id, &token, &expires).await?,
            PrincipalKind::Admin => self.store.set_admin_token(id, &token, &expires).await?,
        };

        if !updated {
            anyhow::bail!("Cannot issue token: {kind:?} {id} does not exist");
        }

        Ok(token)
    }

    /// Looks the token up in one principal table. An expired token is cleared
    /// and reported as [`Principal::Anonymous`].
    pub async fn validate(&self, kind: PrincipalKind, token: &str) -> Result<Principal> {
        let now = now_timestamp();

        match kind {
            PrincipalKind::User => {
                let Some(holder) = self.store.get_user_by_token(token).await? else {
                    return Ok(Principal::Anonymous);
                };
                if is_expired(holder.token_expires.as_deref(), &now) {
                    debug!(user_id = holder.principal.id, "Clearing expired user token");
                    self.store
                        .clear_user_token_if_current(holder.principal.id, token)
                        .await?;
                    return Ok(Principal::Anonymous);
                }
                Ok(Principal::User(UserIdentity {
                    id: holder.principal.id,
                    username: holder.principal.username,
                    email: holder.principal.email,
                }))
            }
            PrincipalKind::Admin => {
                let Some(holder) = self.store.get_admin_by_token(token).await? else {
                    return Ok(Principal::Anonymous);
                };
                if is_expired(holder.token_expires.as_deref(), &now) {
                    debug!(admin_id = holder.principal.id, "Clearing expired admin token");
                    self.store
                        .clear_admin_token_if_current(holder.principal.id, token)
                        .await?;
                    return Ok(Principal::Anonymous);
                }
                Ok(Principal::Admin(AdminIdentity {
                    id: holder.principal.id,
                    username: holder.principal.username,
                }))
            }
        }
    }

    /// Resolves a token against users first, then admins.
    pub async fn resolve(&self, token: &str) -> Result<Principal> {
        match self.validate(PrincipalKind::User, token).await? {
            Principal::Anonymous => self.validate(PrincipalKind::Admin, token).await,
            principal => Ok(principal),
        }
    }

    pub async fn revoke(&self, kind: PrincipalKind, id: i32) -> Result<()> {
        match kind {
            PrincipalKind::User => self.store.clear_user_token(id).await,
            PrincipalKind::Admin => self.store.clear_admin_token(id).await,
        }
    }

    /// Clears every expired token in both tables. Safe to run repeatedly.
    pub async fn sweep_expired(&self) -> Result<SweepReport> {
        let now = now_timestamp();

        Ok(SweepReport {
            users: self.store.clear_expired_user_tokens(&now).await?,
            admins: self.store.clear_expired_admin_tokens(&now).await?,
        })
    }
}

/// A token without an expiry is treated as expired.
fn is_expired(expires: Option<&str>, now: &str) -> bool {
    expires.is_none_or(|expires| expires < now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_expired() {
        let now = "2025-01-10T00:00:00.000Z";
        assert!(is_expired(None, now));
        assert!(is_expired(Some("2025-01-09T23:59:59.999Z"), now));
        assert!(!is_expired(Some(now), now));
        assert!(!is_expired(Some("2025-01-17T00:00:00.000Z"), now));
    }

    #[test]
    fn test_default_ttls() {
        let config = SecurityConfig::default();
        assert_eq!(i64::from(config.user_token_ttl_hours), Duration::days(7).num_hours());
        assert_eq!(i64::from(config.admin_token_ttl_hours), Duration::days(30).num_hours());
    }
}
