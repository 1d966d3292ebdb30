// Author: 金书记
//
//! Client Registry | 客户端注册表
//!
//! Lookup of registered OAuth2 clients by client_id. The registry is
//! immutable for the lifetime of a grant engine instance; hosts that manage
//! clients in a database implement [`ClientRegistry`] themselves.
//! 按 client_id 查找已注册的 OAuth2 客户端。注册表在授权引擎实例的生命周期内
//! 不可变；将客户端保存在数据库中的宿主自行实现 `ClientRegistry`。

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::store::ScopeMap;

/// Client secret in plaintext or pre-hashed form | 明文或预哈希形式的客户端密钥
///
/// Comparison is constant-time in both arms. Hosts that refuse to hold
/// plaintext secrets register the lowercase hex SHA-256 digest instead.
/// 两种形式的比较都是常数时间。不愿保存明文密钥的宿主可以注册小写十六进制的
/// SHA-256 摘要。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientSecret {
    Plain(String),
    Sha256(String),
}

impl ClientSecret {
    /// Constant-time match against a presented secret | 与提交的密钥进行常数时间比较
    pub fn matches(&self, presented: &str) -> bool {
        match self {
            ClientSecret::Plain(expected) => {
                expected.as_bytes().ct_eq(presented.as_bytes()).into()
            }
            ClientSecret::Sha256(digest) => {
                let computed = hex::encode(Sha256::digest(presented.as_bytes()));
                computed.as_bytes().ct_eq(digest.as_bytes()).into()
            }
        }
    }
}

/// Registered client | 已注册的客户端
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRecord {
    pub client_id: String,

    pub secret: ClientSecret,

    /// Scope name to granted flag; `false` marks a scope the client knows
    /// about but may not use.
    /// 权限范围名称到授予标记；`false` 表示客户端已知但不可使用的范围。
    pub scopes: ScopeMap,
}

impl ClientRecord {
    pub fn new(client_id: impl Into<String>, secret: ClientSecret, scopes: ScopeMap) -> Self {
        Self {
            client_id: client_id.into(),
            secret,
            scopes,
        }
    }
}

#[async_trait]
pub trait ClientRegistry: Send + Sync {
    async fn lookup(&self, client_id: &str) -> Option<ClientRecord>;
}

/// 内存客户端注册表（默认实现）
///
/// 由构造时传入的客户端列表建立的只读映射。
#[derive(Debug, Clone, Default)]
pub struct MemoryClientRegistry {
    clients: HashMap<String, ClientRecord>,
}

impl MemoryClientRegistry {
    pub fn new(clients: impl IntoIterator<Item = ClientRecord>) -> Self {
        Self {
            clients: clients
                .into_iter()
                .map(|c| (c.client_id.clone(), c))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[async_trait]
impl ClientRegistry for MemoryClientRegistry {
    async fn lookup(&self, client_id: &str) -> Option<ClientRecord> {
        self.clients.get(client_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_secret_matches() {
        let secret = ClientSecret::Plain("boo".to_string());
        assert!(secret.matches("boo"));
        assert!(!secret.matches("bo"));
        assert!(!secret.matches("boO"));
    }

    #[test]
    fn test_sha256_secret_matches() {
        // sha256("boo")
        let digest = hex::encode(Sha256::digest(b"boo"));
        let secret = ClientSecret::Sha256(digest);
        assert!(secret.matches("boo"));
        assert!(!secret.matches("wrong"));
    }

    #[tokio::test]
    async fn test_memory_registry_lookup() {
        let registry = MemoryClientRegistry::new(vec![ClientRecord::new(
            "app_001",
            ClientSecret::Plain("secret".to_string()),
            ScopeMap::from([("read".to_string(), true)]),
        )]);

        assert!(registry.lookup("app_001").await.is_some());
        assert!(registry.lookup("app_002").await.is_none());
    }
}
