// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Exchange of one-time codes for sessions, and session resolution.

use chrono::Duration;

use crate::auth::credentials::{generate_session_token, RandomError};
use crate::storage::{Session, SessionData, VaultDb};

use super::clock::Clock;
use super::error::{VaultError, VaultResult};

/// Lifetime of a session. Never extended by use.
pub const SESSION_TTL_MINUTES: i64 = 60;

/// A session that resolved successfully at some instant.
///
/// Only [`SessionAuthority::resolve_session`] builds one, so holding it
/// proves the bearer token was live when the request arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession {
    session_id: String,
    token: String,
    user_id: String,
    device_id: String,
}

impl AuthenticatedSession {
    pub(crate) fn from_session(session: Session) -> Self {
        Self {
            session_id: session.id,
            token: session.token,
            user_id: session.data.user_id,
            device_id: session.data.device_id,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }
}

/// Source of fresh bearer tokens.
pub type TokenSource = fn() -> Result<String, RandomError>;

pub struct SessionAuthority<'a> {
    db: &'a VaultDb,
    clock: &'a dyn Clock,
    issue_token: TokenSource,
}

impl<'a> SessionAuthority<'a> {
    pub fn new(db: &'a VaultDb, clock: &'a dyn Clock) -> Self {
        Self {
            db,
            clock,
            issue_token: generate_session_token,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_token_source(mut self, issue_token: TokenSource) -> Self {
        self.issue_token = issue_token;
        self
    }

    /// Consume a live (code, device) pair and issue a fresh session token.
    ///
    /// Session creation and code consumption commit together: either a token
    /// is returned and no code for the pair remains, or nothing changes.
    /// Every outstanding row for the pair is consumed, not just the match.
    pub fn verify_and_issue_session(&self, code: &str, device_id: &str) -> VaultResult<String> {
        let now = self.clock.now();
        let uow = self.db.begin()?;

        let Some(matched) = uow.find_live_code(code, device_id, now)? else {
            tracing::debug!(device_id, "Rejected code verification");
            return Err(VaultError::InvalidOrExpiredCode);
        };

        let token = (self.issue_token)().map_err(|e| VaultError::Internal(e.to_string()))?;
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            token: token.clone(),
            data: SessionData {
                user_id: matched.user_id.clone(),
                device_id: device_id.to_string(),
            },
            created_at: now,
            expires_at: now + Duration::minutes(SESSION_TTL_MINUTES),
        };

        uow.insert_session(&session)?;
        let consumed = uow.delete_codes(code, device_id)?;
        uow.commit()?;

        tracing::info!(
            user_id = %matched.user_id,
            session_id = %session.id,
            device_id,
            consumed,
            "Issued session"
        );
        Ok(token)
    }

    /// Resolve a bearer token to its session, if it exists and has not expired.
    pub fn resolve_session(&self, token: &str) -> VaultResult<AuthenticatedSession> {
        self.db
            .find_live_session(token, self.clock.now())?
            .map(AuthenticatedSession::from_session)
            .ok_or(VaultError::InvalidOrExpiredSession)
    }

    /// Remove the session. Later resolutions of its token fail.
    pub fn revoke_session(&self, session: &AuthenticatedSession) -> VaultResult<()> {
        let uow = self.db.begin()?;
        let removed = uow.delete_session(session.token())?;
        uow.commit()?;

        tracing::info!(
            user_id = %session.user_id,
            session_id = %session.session_id,
            removed,
            "Revoked session"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::clock::ManualClock;
    use crate::vault::identity::IdentityStore;

    struct Fixture {
        db: VaultDb,
        clock: ManualClock,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        Fixture {
            db: VaultDb::open(&dir.path().join("vault.redb")).unwrap(),
            clock: ManualClock::default(),
            _dir: dir,
        }
    }

    fn issue(f: &Fixture, email: &str, device: &str, code: &str) -> String {
        let identity = IdentityStore::new(&f.db);
        let uow = f.db.begin().unwrap();
        let user = identity
            .get_or_create_user(&uow, email, f.clock.now())
            .unwrap();
        identity
            .issue_one_time_code(&uow, &user, device, code, f.clock.now())
            .unwrap();
        uow.commit().unwrap();
        user.id
    }

    #[test]
    fn code_is_single_use() {
        let f = fixture();
        let user_id = issue(&f, "alice@example.com", "phone", "AbCdEf");
        let authority = SessionAuthority::new(&f.db, &f.clock);

        let token = authority.verify_and_issue_session("AbCdEf", "phone").unwrap();
        let session = authority.resolve_session(&token).unwrap();
        assert_eq!(session.user_id(), user_id);
        assert_eq!(session.device_id(), "phone");

        assert!(matches!(
            authority.verify_and_issue_session("AbCdEf", "phone"),
            Err(VaultError::InvalidOrExpiredCode)
        ));
    }

    #[test]
    fn code_is_bound_to_device() {
        let f = fixture();
        issue(&f, "alice@example.com", "phone", "AbCdEf");
        let authority = SessionAuthority::new(&f.db, &f.clock);

        assert!(matches!(
            authority.verify_and_issue_session("AbCdEf", "laptop"),
            Err(VaultError::InvalidOrExpiredCode)
        ));
        // The failed attempt did not consume the code
        assert!(authority.verify_and_issue_session("AbCdEf", "phone").is_ok());
    }

    #[test]
    fn code_expires_after_ten_minutes() {
        let f = fixture();
        issue(&f, "alice@example.com", "phone", "AbCdEf");
        f.clock.advance(Duration::minutes(11));

        let authority = SessionAuthority::new(&f.db, &f.clock);
        assert!(matches!(
            authority.verify_and_issue_session("AbCdEf", "phone"),
            Err(VaultError::InvalidOrExpiredCode)
        ));
    }

    #[test]
    fn session_expires_after_sixty_minutes() {
        let f = fixture();
        issue(&f, "alice@example.com", "phone", "AbCdEf");
        let authority = SessionAuthority::new(&f.db, &f.clock);
        let token = authority.verify_and_issue_session("AbCdEf", "phone").unwrap();

        f.clock.advance(Duration::minutes(59));
        assert!(authority.resolve_session(&token).is_ok());

        f.clock.advance(Duration::minutes(2));
        assert!(matches!(
            authority.resolve_session(&token),
            Err(VaultError::InvalidOrExpiredSession)
        ));
    }

    #[test]
    fn revoked_session_no_longer_resolves() {
        let f = fixture();
        issue(&f, "alice@example.com", "phone", "AbCdEf");
        let authority = SessionAuthority::new(&f.db, &f.clock);
        let token = authority.verify_and_issue_session("AbCdEf", "phone").unwrap();

        let session = authority.resolve_session(&token).unwrap();
        authority.revoke_session(&session).unwrap();

        assert!(matches!(
            authority.resolve_session(&token),
            Err(VaultError::InvalidOrExpiredSession)
        ));
    }

    #[test]
    fn token_collision_leaves_the_code_unconsumed() {
        let f = fixture();
        let user_id = issue(&f, "alice@example.com", "phone", "AbCdEf");

        let now = f.clock.now();
        let existing = Session {
            id: "s-existing".to_string(),
            token: "fixed-token".to_string(),
            data: SessionData {
                user_id: "someone-else".to_string(),
                device_id: "tablet".to_string(),
            },
            created_at: now,
            expires_at: now + Duration::minutes(SESSION_TTL_MINUTES),
        };
        let uow = f.db.begin().unwrap();
        uow.insert_session(&existing).unwrap();
        uow.commit().unwrap();

        let colliding = SessionAuthority::new(&f.db, &f.clock)
            .with_token_source(|| Ok("fixed-token".to_string()));
        assert!(matches!(
            colliding.verify_and_issue_session("AbCdEf", "phone"),
            Err(VaultError::Internal(_))
        ));

        let authority = SessionAuthority::new(&f.db, &f.clock);
        assert_eq!(
            authority.resolve_session("fixed-token").unwrap().user_id(),
            "someone-else"
        );
        let token = authority.verify_and_issue_session("AbCdEf", "phone").unwrap();
        assert_eq!(authority.resolve_session(&token).unwrap().user_id(), user_id);
    }

    #[test]
    fn random_source_failure_leaves_the_code_unconsumed() {
        let f = fixture();
        issue(&f, "alice@example.com", "phone", "AbCdEf");

        let failing =
            SessionAuthority::new(&f.db, &f.clock).with_token_source(|| Err(RandomError));
        assert!(matches!(
            failing.verify_and_issue_session("AbCdEf", "phone"),
            Err(VaultError::Internal(_))
        ));

        let authority = SessionAuthority::new(&f.db, &f.clock);
        assert!(authority.verify_and_issue_session("AbCdEf", "phone").is_ok());
    }

    #[test]
    fn unknown_token_is_rejected() {
        let f = fixture();
        let authority = SessionAuthority::new(&f.db, &f.clock);
        assert!(matches!(
            authority.resolve_session("not-a-token"),
            Err(VaultError::InvalidOrExpiredSession)
        ));
    }
}
