// Author: 金书记
//
//! Token 编解码模块
//!
//! 同一个描述符有两种可互换的编码：不透明令牌（随机字符串，内容保存在存储
//! 中）和签名令牌（声明携带在令牌本身，自包含）。选择哪种由引擎配置中是否
//! 设置共享密钥静态决定。

use serde::{Deserialize, Serialize};

pub mod opaque;
pub mod signed;

pub use opaque::OpaqueTokenCodec;
pub use signed::{SignedClaims, SignedTokenCodec};

/// Token kind tag | 令牌种类标签
///
/// Verification always checks the tag; an authorization code can never pass
/// as an access token.
/// 验证始终检查标签；授权码不可能被当作访问令牌通过。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Auth,
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Auth => write!(f, "auth"),
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// What a token is about, independent of its encoding
/// 令牌所承载的内容，与编码方式无关
#[derive(Debug, Clone)]
pub struct TokenDescriptor {
    pub kind: TokenKind,

    pub client_id: String,

    pub user_id: Option<String>,

    /// Granted scope names | 授予的范围名称
    pub scopes: Vec<String>,

    /// The redirect URI for auth codes | 授权码的回调 URI
    pub audience: Option<String>,

    /// Lifetime in seconds; absent for refresh tokens, they never
    /// self-expire | 有效期（秒）；刷新令牌没有，它们不会自行过期
    pub ttl: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serde_tag() {
        assert_eq!(serde_json::to_string(&TokenKind::Auth).unwrap(), "\"auth\"");
        assert_eq!(
            serde_json::from_str::<TokenKind>("\"refresh\"").unwrap(),
            TokenKind::Refresh
        );
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(TokenKind::Access.to_string(), "access");
    }
}
