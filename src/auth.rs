use crate::domain::user::driven_ports::{IssueToken, PasswordDigest};
use anyhow::{Context, anyhow};
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// How passwords are digested before they're stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordScheme {
    /// Salted argon2 in PHC string form
    Argon2,
    /// Unsalted SHA-256, base64 encoded. Only kept so accounts created by older deployments can
    /// still sign in.
    LegacySha256,
}

impl PasswordScheme {
    pub fn from_env_value(value: &str) -> Result<Self, anyhow::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "argon2" => Ok(Self::Argon2),
            "legacy-sha256" => Ok(Self::LegacySha256),
            other => Err(anyhow!("unknown password scheme \"{other}\"")),
        }
    }
}

impl PasswordDigest for PasswordScheme {
    fn digest(&self, password: &str) -> Result<String, anyhow::Error> {
        match self {
            Self::Argon2 => {
                let salt = SaltString::generate(&mut OsRng);
                let hash = Argon2::default()
                    .hash_password(password.as_bytes(), &salt)
                    .map_err(|err| anyhow!("could not hash password: {err}"))?;

                Ok(hash.to_string())
            }
            Self::LegacySha256 => Ok(STANDARD.encode(Sha256::digest(password.as_bytes()))),
        }
    }

    fn matches(&self, password: &str, digest: &str) -> Result<bool, anyhow::Error> {
        match self {
            Self::Argon2 => {
                // A digest we can't parse can't match anything
                let Ok(parsed_hash) = PasswordHash::new(digest) else {
                    return Ok(false);
                };

                Ok(Argon2::default()
                    .verify_password(password.as_bytes(), &parsed_hash)
                    .is_ok())
            }
            Self::LegacySha256 => Ok(self.digest(password)? == digest),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: i32,
    /// The user's login
    pub sub: String,
    pub jti: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and checks HS256 bearer tokens
pub struct JwtTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    time_to_live: Duration,
}

impl JwtTokenIssuer {
    pub fn new(secret: &str, issuer: &str, audience: &str, ttl_minutes: i64) -> Self {
        JwtTokenIssuer {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_owned(),
            audience: audience.to_owned(),
            time_to_live: Duration::minutes(ttl_minutes),
        }
    }

    /// Verifies signature, expiry, issuer and audience before handing back the claims
    pub fn decode(&self, token: &str) -> Result<TokenClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let token_data =
            jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation)
                .context("validating bearer token")?;

        Ok(token_data.claims)
    }
}

impl IssueToken for JwtTokenIssuer {
    fn issue_token(&self, user_id: i32, login: &str) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let claims = TokenClaims {
            user_id,
            sub: login.to_owned(),
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + self.time_to_live).timestamp(),
        };

        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )
        .context("signing bearer token")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speculoos::prelude::*;

    mod password_scheme {
        use super::*;

        #[test]
        fn legacy_digest_is_deterministic() {
            let scheme = PasswordScheme::LegacySha256;
            let first = scheme.digest("SuaSenhaForte@123").expect("digest should succeed");
            let second = scheme.digest("SuaSenhaForte@123").expect("digest should succeed");

            assert_eq!(first, second);
            assert_that!(scheme.matches("SuaSenhaForte@123", &first)).is_ok_containing(true);
        }

        #[test]
        fn legacy_digest_changes_with_one_character() {
            let scheme = PasswordScheme::LegacySha256;
            let original = scheme.digest("SuaSenhaForte@123").expect("digest should succeed");
            let altered = scheme.digest("SuaSenhaForte@124").expect("digest should succeed");

            assert_ne!(original, altered);
        }

        #[test]
        fn legacy_digest_is_base64_sha256() {
            let digest = PasswordScheme::LegacySha256
                .digest("abc")
                .expect("digest should succeed");
            assert_eq!("ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0=", digest);
        }

        #[test]
        fn argon2_salts_each_digest() {
            let scheme = PasswordScheme::Argon2;
            let first = scheme.digest("SuaSenhaForte@123").expect("digest should succeed");
            let second = scheme.digest("SuaSenhaForte@123").expect("digest should succeed");

            assert_ne!(first, second);
            assert_that!(scheme.matches("SuaSenhaForte@123", &first)).is_ok_containing(true);
            assert_that!(scheme.matches("SuaSenhaForte@123", &second)).is_ok_containing(true);
            assert_that!(scheme.matches("OutraSenha", &first)).is_ok_containing(false);
        }

        #[test]
        fn argon2_does_not_match_garbage_digest() {
            assert_that!(PasswordScheme::Argon2.matches("pw", "not a phc string"))
                .is_ok_containing(false);
        }

        #[test]
        fn parses_env_values() {
            assert_that!(PasswordScheme::from_env_value("argon2"))
                .is_ok_containing(PasswordScheme::Argon2);
            assert_that!(PasswordScheme::from_env_value(""))
                .is_ok_containing(PasswordScheme::Argon2);
            assert_that!(PasswordScheme::from_env_value("Legacy-SHA256"))
                .is_ok_containing(PasswordScheme::LegacySha256);
            assert_that!(PasswordScheme::from_env_value("md5")).is_err();
        }
    }

    mod jwt_token_issuer {
        use super::*;

        fn issuer() -> JwtTokenIssuer {
            JwtTokenIssuer::new("test-secret", "orgatask-api", "orgatask-clients", 60)
        }

        #[test]
        fn issued_token_decodes_to_caller_identity() {
            let issuer = issuer();
            let token = issuer.issue_token(7, "joao").expect("token should be issued");

            let claims = issuer.decode(&token).expect("token should be valid");
            assert_eq!(7, claims.user_id);
            assert_eq!("joao", claims.sub);
            assert_eq!("orgatask-api", claims.iss);
            assert_eq!("orgatask-clients", claims.aud);
            assert_eq!(60 * 60, claims.exp - claims.iat);
        }

        #[test]
        fn each_token_gets_its_own_id() {
            let issuer = issuer();
            let first = issuer.issue_token(7, "joao").expect("token should be issued");
            let second = issuer.issue_token(7, "joao").expect("token should be issued");

            let first_claims = issuer.decode(&first).expect("token should be valid");
            let second_claims = issuer.decode(&second).expect("token should be valid");
            assert_ne!(first_claims.jti, second_claims.jti);
        }

        #[test]
        fn rejects_other_audience() {
            let token = JwtTokenIssuer::new("test-secret", "orgatask-api", "someone-else", 60)
                .issue_token(7, "joao")
                .expect("token should be issued");

            assert_that!(issuer().decode(&token)).is_err();
        }

        #[test]
        fn rejects_other_secret() {
            let token = JwtTokenIssuer::new("other-secret", "orgatask-api", "orgatask-clients", 60)
                .issue_token(7, "joao")
                .expect("token should be issued");

            assert_that!(issuer().decode(&token)).is_err();
        }

        #[test]
        fn rejects_expired_token() {
            let token = JwtTokenIssuer::new("test-secret", "orgatask-api", "orgatask-clients", -10)
                .issue_token(7, "joao")
                .expect("token should be issued");

            assert_that!(issuer().decode(&token)).is_err();
        }

        #[test]
        fn rejects_garbage() {
            assert_that!(issuer().decode("definitely.not.ajwt")).is_err();
        }
    }
}
