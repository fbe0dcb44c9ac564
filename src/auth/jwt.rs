//! JWT token generation and validation
//! Implements access token + refresh token pattern

use crate::{
    config::AppConfig,
    error::{AppError, AuthRejection},
    models::auth::TokenResponse,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// Token type tag carried in the `type` claim
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    fn rejection(&self) -> AuthRejection {
        match self {
            TokenType::Access => AuthRejection::InvalidToken,
            TokenType::Refresh => AuthRejection::InvalidRefreshToken,
        }
    }
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,

    /// Expiration
    pub exp: i64,

    /// Issued at (optional on the wire; 0 when absent)
    #[serde(default)]
    pub iat: i64,

    /// Token type (access or refresh)
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

impl Claims {
    /// Subject parsed as a user ID
    pub fn subject(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// JWT service
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    access_token_ttl: Duration,
    refresh_token_ttl: Duration,
}

impl JwtService {
    /// Create JWT service from config
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let secret = config.security.jwt_secret.expose_secret();

        // Ensure secret is at least 32 bytes for HMAC
        if secret.len() < 32 {
            return Err(AppError::Config("JWT secret too short (min 32 chars)".to_string()));
        }

        let algorithm = config.security.algorithm()?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            access_token_ttl: Duration::seconds(config.security.access_token_exp_secs as i64),
            refresh_token_ttl: Duration::seconds(config.security.refresh_token_exp_secs as i64),
        })
    }

    /// Seconds an access token issued with the default TTL stays valid
    pub fn access_token_expires_in(&self) -> u64 {
        self.access_token_ttl.num_seconds().max(0) as u64
    }

    fn encode_claims(&self, subject: i64, ttl: Duration, token_type: TokenType) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
            token_type,
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode {:?} token: {:?}", token_type, e);
            AppError::Internal(format!("Failed to encode token: {}", e))
        })
    }

    /// Generate access token; `ttl` overrides the configured lifetime
    pub fn issue_access(&self, subject: i64, ttl: Option<Duration>) -> Result<String, AppError> {
        self.encode_claims(subject, ttl.unwrap_or(self.access_token_ttl), TokenType::Access)
    }

    /// Generate refresh token
    pub fn issue_refresh(&self, subject: i64) -> Result<String, AppError> {
        self.encode_claims(subject, self.refresh_token_ttl, TokenType::Refresh)
    }

    /// Generate the login/refresh response body
    pub fn issue_pair(&self, subject: i64) -> Result<TokenResponse, AppError> {
        Ok(TokenResponse {
            access_token: self.issue_access(subject, None)?,
            refresh_token: self.issue_refresh(subject)?,
            token_type: "bearer".to_string(),
            expires_in: self.access_token_expires_in(),
        })
    }

    /// Validate signature, expiry and type; return the claims
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims, AppError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!("Token validation failed: {:?}", e);
                AppError::Unauthorized(expected.rejection())
            })?
            .claims;

        if claims.token_type != expected {
            tracing::debug!(
                "Token type mismatch: expected {:?}, got {:?}",
                expected,
                claims.token_type
            );
            return Err(AppError::Unauthorized(expected.rejection()));
        }

        Ok(claims)
    }

    /// Validate a token and return its subject
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<i64, AppError> {
        self.decode(token, expected)?
            .subject()
            .ok_or(AppError::Unauthorized(expected.rejection()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(algorithm: &str) -> AppConfig {
        let mut config = crate::config::test_config();
        config.security.jwt_algorithm = algorithm.to_string();
        config
    }

    #[test]
    fn test_issue_and_verify_access_token() {
        let service = JwtService::from_config(&test_config("HS256")).unwrap();

        let token = service.issue_access(7, None).unwrap();
        assert_eq!(service.verify(&token, TokenType::Access).unwrap(), 7);

        let claims = service.decode(&token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.exp - claims.iat, 1800);
    }

    #[test]
    fn test_token_type_validation() {
        let service = JwtService::from_config(&test_config("HS256")).unwrap();

        let access_token = service.issue_access(7, None).unwrap();
        assert!(matches!(
            service.verify(&access_token, TokenType::Refresh),
            Err(AppError::Unauthorized(AuthRejection::InvalidRefreshToken))
        ));

        let refresh_token = service.issue_refresh(7).unwrap();
        assert!(matches!(
            service.verify(&refresh_token, TokenType::Access),
            Err(AppError::Unauthorized(AuthRejection::InvalidToken))
        ));
        assert_eq!(service.verify(&refresh_token, TokenType::Refresh).unwrap(), 7);
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = JwtService::from_config(&test_config("HS256")).unwrap();
        let token = service.issue_access(7, Some(Duration::seconds(-5))).unwrap();

        assert!(service.verify(&token, TokenType::Access).is_err());
    }

    #[test]
    fn test_wire_format_uses_type_claim() {
        let service = JwtService::from_config(&test_config("HS384")).unwrap();
        let token = service.issue_refresh(11).unwrap();

        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.alg, Algorithm::HS384);

        let mut validation = Validation::new(Algorithm::HS384);
        validation.validate_exp = false;
        let raw = decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(b"test_secret_key_32_characters_long!"),
            &validation,
        )
        .unwrap()
        .claims;
        assert_eq!(raw["type"], "refresh");
        assert_eq!(raw["sub"], "11");
    }

    #[test]
    fn test_token_without_iat_accepted() {
        let service = JwtService::from_config(&test_config("HS256")).unwrap();
        let claims = serde_json::json!({
            "sub": "5",
            "exp": (Utc::now() + Duration::minutes(10)).timestamp(),
            "type": "access",
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test_secret_key_32_characters_long!"),
        )
        .unwrap();

        assert_eq!(service.verify(&token, TokenType::Access).unwrap(), 5);
    }

    #[test]
    fn test_algorithm_mismatch_rejected() {
        let hs256 = JwtService::from_config(&test_config("HS256")).unwrap();
        let hs512 = JwtService::from_config(&test_config("HS512")).unwrap();

        let token = hs512.issue_access(7, None).unwrap();
        assert!(hs256.verify(&token, TokenType::Access).is_err());
    }

    #[test]
    fn test_token_pair_shape() {
        let service = JwtService::from_config(&test_config("HS256")).unwrap();
        let pair = service.issue_pair(3).unwrap();

        assert_eq!(pair.token_type, "bearer");
        assert_eq!(pair.expires_in, 1800);
        assert_eq!(service.verify(&pair.access_token, TokenType::Access).unwrap(), 3);
        assert_eq!(service.verify(&pair.refresh_token, TokenType::Refresh).unwrap(), 3);
    }

    #[test]
    fn test_invalid_token_fails() {
        let service = JwtService::from_config(&test_config("HS256")).unwrap();
        assert!(service.verify("invalid_token", TokenType::Access).is_err());
        assert!(service.verify("invalid_token", TokenType::Refresh).is_err());
    }
}
