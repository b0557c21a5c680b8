use crate::application_port::{AuthError, Claims, TokenMinter};
use crate::domain_model::UserId;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Wire payload. `id` mirrors `sub` for compatibility with clients reading
/// the custom claim.
#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    id: String,
    jti: String,
    sub: String,
    iat: i64,
    exp: i64,
}

pub struct JwtHs256Minter {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtHs256Minter {
    pub fn new(signing_key: &[u8]) -> Self {
        JwtHs256Minter {
            encoding_key: EncodingKey::from_secret(signing_key),
            decoding_key: DecodingKey::from_secret(signing_key),
        }
    }

    fn validation() -> Validation {
        let mut v = Validation::new(Algorithm::HS256);
        v.validate_exp = true;
        v.leeway = 0;
        v
    }
}

#[async_trait::async_trait]
impl TokenMinter for JwtHs256Minter {
    async fn create_token(
        &self,
        subject: UserId,
        ttl: Duration,
    ) -> Result<(String, Claims), AuthError> {
        if ttl.is_zero() {
            return Err(AuthError::InternalError(
                "token ttl must be positive".to_string(),
            ));
        }

        let jti = Uuid::new_v4().to_string();
        // Second granularity, matching the wire format, so a Session built
        // from these claims expires exactly when the token does.
        let iat = Utc::now().timestamp();
        let exp = iat + ttl.as_secs() as i64;

        let wire = JwtClaims {
            id: subject.to_string(),
            jti: jti.clone(),
            sub: subject.to_string(),
            iat,
            exp,
        };
        let token = encode(&Header::new(Algorithm::HS256), &wire, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(e.to_string()))?;

        Ok((
            token,
            Claims {
                subject,
                jti,
                issued_at: timestamp(iat)?,
                expires_at: timestamp(exp)?,
            },
        ))
    }

    async fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<JwtClaims>(token, &self.decoding_key, &Self::validation())
            .map_err(|_| AuthError::TokenInvalid)?;
        let wire = data.claims;

        // jsonwebtoken treats exp == now as still valid; the contract here
        // is that exact expiry is already expired.
        if wire.exp <= Utc::now().timestamp() {
            return Err(AuthError::TokenInvalid);
        }
        if wire.jti.is_empty() {
            return Err(AuthError::TokenInvalid);
        }
        let subject = wire.sub.parse::<UserId>().map_err(|_| AuthError::TokenInvalid)?;

        Ok(Claims {
            subject,
            jti: wire.jti,
            issued_at: timestamp(wire.iat)?,
            expires_at: timestamp(wire.exp)?,
        })
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, AuthError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| AuthError::InternalError(format!("timestamp out of range: {secs}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    const KEY: &[u8] = b"test-signing-key";

    fn minter() -> JwtHs256Minter {
        JwtHs256Minter::new(KEY)
    }

    fn subject() -> UserId {
        UserId(Uuid::new_v4())
    }

    fn encode_raw(claims: &JwtClaims, key: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(key),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn verify_recovers_subject_and_jti() {
        let minter = minter();
        let subject = subject();

        let (token, claims) = minter
            .create_token(subject, Duration::from_secs(3600))
            .await
            .unwrap();
        assert!(!claims.jti.is_empty());

        let verified = minter.verify_token(&token).await.unwrap();
        assert_eq!(verified.subject, subject);
        assert_eq!(verified.jti, claims.jti);
        assert_eq!(verified.expires_at, claims.expires_at);
    }

    #[tokio::test]
    async fn token_past_its_lifetime_is_invalid() {
        // Issued an hour ago with a 1h ttl, checked a minute after expiry.
        let now = Utc::now();
        let subject = subject();
        let wire = JwtClaims {
            id: subject.to_string(),
            jti: Uuid::new_v4().to_string(),
            sub: subject.to_string(),
            iat: (now - ChronoDuration::minutes(61)).timestamp(),
            exp: (now - ChronoDuration::minutes(1)).timestamp(),
        };
        let token = encode_raw(&wire, KEY);

        assert!(matches!(
            minter().verify_token(&token).await,
            Err(AuthError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn expiry_boundary_is_exclusive() {
        // exp exactly equal to now must already count as expired.
        let now = Utc::now();
        let subject = subject();
        let wire = JwtClaims {
            id: subject.to_string(),
            jti: Uuid::new_v4().to_string(),
            sub: subject.to_string(),
            iat: (now - ChronoDuration::hours(1)).timestamp(),
            exp: now.timestamp(),
        };
        let token = encode_raw(&wire, KEY);

        assert!(matches!(
            minter().verify_token(&token).await,
            Err(AuthError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn zero_ttl_is_rejected() {
        let err = minter()
            .create_token(subject(), Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InternalError(_)));
    }

    #[tokio::test]
    async fn wrong_key_is_invalid() {
        let minter = minter();
        let (token, _) = minter
            .create_token(subject(), Duration::from_secs(3600))
            .await
            .unwrap();

        let other = JwtHs256Minter::new(b"some-other-key");
        assert!(matches!(
            other.verify_token(&token).await,
            Err(AuthError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn tampered_payload_is_invalid() {
        let minter = minter();
        let (token, _) = minter
            .create_token(subject(), Duration::from_secs(3600))
            .await
            .unwrap();

        let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
        parts[1] = format!("x{}", parts[1]);
        let tampered = parts.join(".");

        assert!(matches!(
            minter.verify_token(&tampered).await,
            Err(AuthError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn unexpected_algorithm_is_invalid() {
        // Same key, different algorithm: verification pins HS256.
        let now = Utc::now();
        let subject = subject();
        let wire = JwtClaims {
            id: subject.to_string(),
            jti: Uuid::new_v4().to_string(),
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ChronoDuration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &wire,
            &EncodingKey::from_secret(KEY),
        )
        .unwrap();

        assert!(matches!(
            minter().verify_token(&token).await,
            Err(AuthError::TokenInvalid)
        ));
    }

    #[tokio::test]
    async fn garbage_is_invalid() {
        assert!(matches!(
            minter().verify_token("not-a-token").await,
            Err(AuthError::TokenInvalid)
        ));
    }
}
