//! Signed session tokens.
//!
//! Tokens are HS256 JWTs carrying the user ID in `sub`, valid for one day.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use carmart_core::UserId;

use super::AuthError;

/// Token lifetime.
pub const TOKEN_TTL: chrono::TimeDelta = chrono::TimeDelta::days(1);

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies session tokens.
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    /// Create a signer from the configured secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
        }
    }

    /// Issue a token for `user`, valid for [`TOKEN_TTL`].
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn issue(&self, user: UserId) -> Result<String, AuthError> {
        self.issue_at(user, Utc::now())
    }

    fn issue_at(&self, user: UserId, now: DateTime<Utc>) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user.to_string(),
            iat: now.timestamp(),
            exp: (now + TOKEN_TTL).timestamp(),
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Verify a token and return the user it was issued for.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for bad signatures, expired tokens
    /// and malformed subjects.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected token");
                AuthError::InvalidToken
            })?;
        data.claims
            .sub
            .parse::<UserId>()
            .map_err(|_| AuthError::InvalidToken)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn signer(secret: &str) -> TokenSigner {
        TokenSigner::new(&SecretString::from(secret))
    }

    #[test]
    fn test_issue_then_verify() {
        let signer = signer("Zr8#vQ2!mW5@pL9$kT3%nB7^cX1&yH4*");
        let token = signer.issue(UserId::new(12)).unwrap();
        assert_eq!(signer.verify(&token).unwrap(), UserId::new(12));
    }

    #[test]
    fn test_rejects_other_secret() {
        let token = signer("Zr8#vQ2!mW5@pL9$kT3%nB7^cX1&yH4*")
            .issue(UserId::new(1))
            .unwrap();
        let err = signer("a-completely-different-secret-value!!")
            .verify(&token)
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn test_rejects_expired() {
        let signer = signer("Zr8#vQ2!mW5@pL9$kT3%nB7^cX1&yH4*");
        let issued = Utc::now() - TOKEN_TTL - chrono::TimeDelta::minutes(5);
        let token = signer.issue_at(UserId::new(1), issued).unwrap();
        assert!(matches!(signer.verify(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn test_rejects_garbage() {
        let signer = signer("Zr8#vQ2!mW5@pL9$kT3%nB7^cX1&yH4*");
        assert!(signer.verify("not.a.jwt").is_err());
        assert!(signer.verify("").is_err());
    }
}
