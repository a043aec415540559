use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Name of the cookie carrying the session token for browser requests.
pub const SESSION_COOKIE: &str = "session";

#[derive(Clone)]
pub struct JwtKeys {
    pub enc: EncodingKey,
    pub dec: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            enc: EncodingKey::from_secret(secret),
            dec: DecodingKey::from_secret(secret),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // user id
    pub iat: usize,
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

pub fn now_unix() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as usize)
        .unwrap_or(0)
}

pub fn make_session_claims(user_id: &Uuid, ttl_secs: u64) -> Claims {
    let iat = now_unix();
    Claims {
        sub: user_id.to_string(),
        iat,
        exp: iat.saturating_add(ttl_secs as usize),
    }
}

pub fn encode_token(keys: &JwtKeys, claims: &Claims) -> Result<String, AppError> {
    let mut header = Header::new(Algorithm::HS256);
    header.typ = Some("JWT".into());

    encode(&header, claims, &keys.enc).map_err(|err| {
        tracing::error!(error = %err, "token encoding failed");
        AppError::internal("Token encoding failed")
    })
}

/// Returns the claims of a valid, unexpired token.
pub fn decode_token(keys: &JwtKeys, token: &str) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    match decode::<Claims>(token, &keys.dec, &validation) {
        Ok(data) => Some(data.claims),
        Err(err) => {
            tracing::debug!(error = %err, "rejected session token");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{Claims, JwtKeys, decode_token, encode_token, make_session_claims, now_unix};

    #[test]
    fn makes_claims_with_expected_subject_and_ttl() {
        let user_id = Uuid::new_v4();
        let claims = make_session_claims(&user_id, 60);

        assert_eq!(claims.user_id(), Some(user_id));
        assert_eq!(claims.exp.saturating_sub(claims.iat), 60);
    }

    #[test]
    fn token_decodes_with_the_same_secret_only() {
        let keys = JwtKeys::from_secret(b"unit-test-secret");
        let claims = make_session_claims(&Uuid::new_v4(), 600);
        let token = encode_token(&keys, &claims).expect("token should encode");

        assert_eq!(decode_token(&keys, &token), Some(claims));

        let other = JwtKeys::from_secret(b"another-secret");
        assert_eq!(decode_token(&other, &token), None);
    }

    #[test]
    fn expired_and_malformed_tokens_are_rejected() {
        let keys = JwtKeys::from_secret(b"unit-test-secret");
        let now = now_unix();
        let expired = Claims {
            sub: Uuid::new_v4().to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode_token(&keys, &expired).expect("token should encode");

        assert_eq!(decode_token(&keys, &token), None);
        assert_eq!(decode_token(&keys, "not-a-token"), None);
    }
}
