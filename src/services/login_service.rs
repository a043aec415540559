use serde::Serialize;

use crate::{
    auth::{
        jwt::{JwtKeys, encode_token, make_session_claims},
        password::verify_password,
    },
    db::{IdentityStore, entities::user},
    error::AppError,
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Serialize)]
pub struct TokenBundle {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub user: user::Model,
    pub tokens: TokenBundle,
}

#[derive(Clone)]
pub struct LoginService {
    store: IdentityStore,
    jwt: JwtKeys,
    session_ttl_secs: u64,
}

impl LoginService {
    pub fn new(store: IdentityStore, jwt: JwtKeys, session_ttl_secs: u64) -> Self {
        Self {
            store,
            jwt,
            session_ttl_secs,
        }
    }

    /// Checks the credentials, records the login and issues a session token.
    /// Unknown emails, wrong passwords and deactivated users are
    /// indistinguishable to the caller.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ip: Option<String>,
    ) -> Result<LoginOutcome, AppError> {
        let email = email.trim();
        let Some(user) = self.store.get_user(email).await? else {
            tracing::info!(email, "login for unknown email");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        };

        if !verify_password(password, &user.password_hash) {
            tracing::info!(user = %user.id, "login with wrong password");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        if !user.active {
            tracing::info!(user = %user.id, "login for inactive user");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS));
        }

        let user = self.store.record_login(user.id, ip, None).await?;
        let claims = make_session_claims(&user.id, self.session_ttl_secs);
        let access_token = encode_token(&self.jwt, &claims)?;

        tracing::info!(user = %user.id, login_count = user.login_count, "user logged in");
        Ok(LoginOutcome {
            user,
            tokens: TokenBundle {
                access_token,
                token_type: "Bearer",
                expires_in: self.session_ttl_secs,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{jwt::decode_token, password::hash_password},
        db::user_repo::{NewUser, UserChanges},
        test_helpers::test_db,
    };

    async fn service_with_user(active: bool) -> (LoginService, IdentityStore) {
        let store = IdentityStore::new(test_db().await);
        let digest = hash_password("password-one").expect("hash");
        let user = store
            .create_user(NewUser::new("a@example.com", digest))
            .await
            .expect("create user");
        if !active {
            store
                .update_user(
                    user.id,
                    UserChanges {
                        active: Some(false),
                        ..Default::default()
                    },
                )
                .await
                .expect("deactivate");
        }
        let service = LoginService::new(store.clone(), JwtKeys::from_secret(b"test-secret"), 600);
        (service, store)
    }

    #[tokio::test]
    async fn successful_login_records_audit_fields_and_issues_token() {
        let (service, _store) = service_with_user(true).await;

        let first = service
            .login("a@example.com", "password-one", Some("10.0.0.1".to_string()))
            .await
            .expect("login");
        assert_eq!(first.user.login_count, 1);
        assert_eq!(first.tokens.token_type, "Bearer");
        assert_eq!(first.tokens.expires_in, 600);

        let claims = decode_token(&JwtKeys::from_secret(b"test-secret"), &first.tokens.access_token)
            .expect("valid token");
        assert_eq!(claims.user_id(), Some(first.user.id));

        let second = service
            .login(" a@example.com ", "password-one", Some("10.0.0.2".to_string()))
            .await
            .expect("second login");
        assert_eq!(second.user.login_count, 2);
        assert_eq!(second.user.last_login_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(second.user.current_login_ip.as_deref(), Some("10.0.0.2"));
    }

    #[tokio::test]
    async fn bad_credentials_and_inactive_users_are_unauthorized() {
        let (service, store) = service_with_user(true).await;

        for (email, password) in [
            ("a@example.com", "wrong-password"),
            ("nobody@example.com", "password-one"),
        ] {
            let err = service
                .login(email, password, None)
                .await
                .expect_err("login should fail");
            assert!(matches!(err, AppError::Unauthorized(_)));
            assert_eq!(err.message(), INVALID_CREDENTIALS);
        }

        let user = store
            .get_user("a@example.com")
            .await
            .expect("get")
            .expect("user");
        assert_eq!(user.login_count, 0);

        let (inactive, _) = service_with_user(false).await;
        let err = inactive
            .login("a@example.com", "password-one", None)
            .await
            .expect_err("inactive user");
        assert_eq!(err.message(), INVALID_CREDENTIALS);
    }
}
