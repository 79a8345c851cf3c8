use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

use crate::error::AppError;
use crate::github::models::Claims;

/// Backdating applied to `iat` to tolerate clock drift against GitHub.
pub const CLOCK_SKEW_SECS: i64 = 60;

/// Lifetime of an assertion measured from its `iat`.
pub const ASSERTION_TTL_SECS: i64 = 600;

/// A signed GitHub App JWT, valid for one installation token exchange.
pub struct SignedAssertion {
    pub header: Header,
    pub claims: Claims,
    token: String,
}

impl SignedAssertion {
    pub fn as_str(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for SignedAssertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedAssertion")
            .field("header", &self.header)
            .field("claims", &self.claims)
            .field("token", &"[redacted]")
            .finish()
    }
}

/// Builds and RS256-signs the app assertion for `app_id`.
///
/// The PEM may be PKCS#1 or PKCS#8. Errors describe why the key was rejected
/// but never echo it.
#[tracing::instrument(skip(private_key_pem))]
pub fn create_jwt(
    app_id: &str,
    private_key_pem: &str,
    now: DateTime<Utc>,
) -> Result<SignedAssertion, AppError> {
    let iat = now.timestamp() - CLOCK_SKEW_SECS;
    let claims = Claims {
        iat,
        exp: iat + ASSERTION_TTL_SECS,
        iss: app_id.to_string(),
    };

    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
        .map_err(|e| AppError::KeySigning(format!("invalid RSA private key ({e})")))?;
    let header = Header::new(Algorithm::RS256);
    let token = encode(&header, &claims, &key)
        .map_err(|e| AppError::KeySigning(format!("signing failed ({e})")))?;

    tracing::debug!(iat = claims.iat, exp = claims.exp, "signed app assertion");

    Ok(SignedAssertion {
        header,
        claims,
        token,
    })
}
