use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Actor, ActorRole};
use crate::utils::errors::{AppError, AppResult};

/// Claims del token de sesión
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String, // user_id
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Servicio JWT: emite y verifica la identidad del actor (HS256)
pub struct JwtService {
    algorithm: Algorithm,
    token_duration: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            algorithm: Algorithm::HS256,
            token_duration: Duration::seconds(expiration_secs as i64),
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Genera un token para el actor
    pub fn issue(&self, actor: &Actor) -> AppResult<String> {
        let now = Utc::now();
        let claims = JwtClaims {
            sub: actor.user_id.to_string(),
            role: actor.role.as_str().to_string(),
            exp: (now + self.token_duration).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Error generating token: {}", e)))
    }

    /// Valida el token y devuelve el actor que representa
    pub fn verify(&self, token: &str) -> AppResult<Actor> {
        let validation = Validation::new(self.algorithm);
        let claims = decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthenticated(format!("Invalid token: {}", e)))?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthenticated("Invalid subject in token".to_string()))?;
        let role = ActorRole::from_str(&claims.role)
            .ok_or_else(|| AppError::Unauthenticated("Invalid role in token".to_string()))?;

        Ok(Actor::new(user_id, role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_and_verify() {
        let jwt = JwtService::new("test-secret", 3600);
        let actor = Actor::driver(Uuid::new_v4());

        let token = jwt.issue(&actor).unwrap();
        assert!(!token.is_empty());
        assert_eq!(jwt.verify(&token).unwrap(), actor);
    }

    #[test]
    fn test_rejects_foreign_and_expired_tokens() {
        let jwt = JwtService::new("test-secret", 3600);
        let other = JwtService::new("other-secret", 3600);
        let token = other.issue(&Actor::customer(Uuid::new_v4())).unwrap();
        assert!(matches!(jwt.verify(&token), Err(AppError::Unauthenticated(_))));

        // exp muy en el pasado, fuera del margen de la validación
        let claims = JwtClaims {
            sub: Uuid::new_v4().to_string(),
            role: "customer".to_string(),
            exp: Utc::now().timestamp() - 3600,
            iat: Utc::now().timestamp() - 7200,
        };
        let expired = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(matches!(jwt.verify(&expired), Err(AppError::Unauthenticated(_))));
        assert!(matches!(jwt.verify("not-a-token"), Err(AppError::Unauthenticated(_))));
    }
}
