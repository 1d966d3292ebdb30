// Author: 金书记
//
//! Signed Token Codec | 签名令牌编解码器
//!
//! Self-contained tokens: the descriptor travels inside the token as JWT
//! claims, signed with a process-wide shared secret (HS256). No store record
//! exists for these tokens; decoding validates the signature and expiry.
//! 自包含令牌：描述符作为 JWT 声明随令牌传输，用进程级共享密钥（HS256）
//! 签名。这类令牌没有存储记录；解码时验证签名和过期时间。
//!
//! Because nothing is stored, nothing can be revoked here. A host that needs
//! revocation layers a denylist on top of verification.
//! 因为没有任何存储，这里也无法撤销。需要撤销能力的宿主在验证之上叠加
//! 拒绝名单。

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{GrantError, GrantResult};
use crate::token::{TokenDescriptor, TokenKind};

/// Claim set carried by every signed token | 每个签名令牌携带的声明集
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedClaims {
    /// Issued-at (Unix timestamp) | 签发时间（Unix 时间戳）
    pub iat: i64,

    /// Expiration; omitted for refresh tokens | 过期时间；刷新令牌省略
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Audience: the redirect URI for auth codes | 受众：授权码的回调 URI
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,

    /// 32-octet random unique id | 32 字节随机唯一标识
    pub jti: String,

    /// Token kind tag, always checked at verification
    /// 令牌种类标签，验证时必查
    #[serde(rename = "type")]
    pub kind: TokenKind,

    /// Client the token was issued to | 令牌签发给的客户端
    pub client: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Granted scope names | 授予的范围名称
    pub scopes: Vec<String>,
}

/// HS256 codec over a shared secret | 基于共享密钥的 HS256 编解码器
///
/// The secret is set once at engine construction and read-only afterwards;
/// it must never be logged.
/// 密钥在引擎构造时设置一次，此后只读；绝不能写入日志。
#[derive(Clone)]
pub struct SignedTokenCodec {
    secret: String,
}

impl SignedTokenCodec {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Encode a descriptor into a compact signed token
    /// 将描述符编码为紧凑的签名令牌
    pub fn encode(&self, descriptor: &TokenDescriptor) -> GrantResult<String> {
        let now = Utc::now().timestamp();
        let claims = SignedClaims {
            iat: now,
            exp: descriptor.ttl.map(|ttl| now + ttl),
            aud: descriptor.audience.clone(),
            jti: new_jti(),
            kind: descriptor.kind,
            client: descriptor.client_id.clone(),
            user_id: descriptor.user_id.clone(),
            scopes: descriptor.scopes.clone(),
        };

        let header = Header::new(Algorithm::HS256);
        let key = EncodingKey::from_secret(self.secret.as_bytes());
        encode(&header, &claims, &key)
            .map_err(|e| GrantError::Internal(format!("failed to sign token: {e}")))
    }

    /// Validate signature and expiry, return the claims. Every failure is
    /// `InvalidGrant`; the reason is logged, not returned.
    /// 验证签名和过期时间并返回声明。所有失败都是 `InvalidGrant`；
    /// 具体原因只记日志，不返回。
    pub fn decode(&self, token: &str) -> GrantResult<SignedClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        // aud 与 redirect_uri 的比对由引擎完成；exp 对刷新令牌是可选的
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let key = DecodingKey::from_secret(self.secret.as_bytes());
        match decode::<SignedClaims>(token, &key, &validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => {
                tracing::debug!("signed token rejected: {}", e);
                Err(GrantError::InvalidGrant)
            }
        }
    }
}

/// 32 字节加密随机数，十六进制编码
fn new_jti() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(kind: TokenKind, ttl: Option<i64>) -> TokenDescriptor {
        TokenDescriptor {
            kind,
            client_id: "app_001".to_string(),
            user_id: Some("user_123".to_string()),
            scopes: vec!["read".to_string()],
            audience: Some("http://localhost:3000/callback".to_string()),
            ttl,
        }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let codec = SignedTokenCodec::new("shared-secret");
        let token = codec.encode(&descriptor(TokenKind::Auth, Some(600))).unwrap();

        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.kind, TokenKind::Auth);
        assert_eq!(claims.client, "app_001");
        assert_eq!(claims.user_id.as_deref(), Some("user_123"));
        assert_eq!(claims.aud.as_deref(), Some("http://localhost:3000/callback"));
        assert_eq!(claims.exp, Some(claims.iat + 600));
        assert_eq!(claims.jti.len(), 64);
    }

    #[test]
    fn test_refresh_token_has_no_exp() {
        let codec = SignedTokenCodec::new("shared-secret");
        let token = codec
            .encode(&descriptor(TokenKind::Refresh, None))
            .unwrap();

        let claims = codec.decode(&token).unwrap();
        assert_eq!(claims.exp, None);
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let codec = SignedTokenCodec::new("shared-secret");
        let token = codec
            .encode(&descriptor(TokenKind::Access, Some(3600)))
            .unwrap();

        let other = SignedTokenCodec::new("another-secret");
        assert!(matches!(other.decode(&token), Err(GrantError::InvalidGrant)));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let codec = SignedTokenCodec::new("shared-secret");
        let token = codec
            .encode(&descriptor(TokenKind::Access, Some(3600)))
            .unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        assert!(matches!(
            codec.decode(&tampered),
            Err(GrantError::InvalidGrant)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let codec = SignedTokenCodec::new("shared-secret");
        // ttl 为负，签出的令牌已经过期
        let token = codec
            .encode(&descriptor(TokenKind::Access, Some(-10)))
            .unwrap();

        assert!(matches!(codec.decode(&token), Err(GrantError::InvalidGrant)));
    }

    #[test]
    fn test_jti_is_unique() {
        let codec = SignedTokenCodec::new("shared-secret");
        let d = descriptor(TokenKind::Access, Some(3600));
        let a = codec.decode(&codec.encode(&d).unwrap()).unwrap();
        let b = codec.decode(&codec.encode(&d).unwrap()).unwrap();
        assert_ne!(a.jti, b.jti);
    }
}
