// Author: 金书记
//
//! 配置模块

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use authgrant_adapter::bridge::{PermissiveBridge, ResourceOwnerBridge};
use authgrant_adapter::registry::{ClientRecord, ClientRegistry, MemoryClientRegistry};
use authgrant_adapter::store::GrantStore;

use crate::error::{GrantError, GrantResult};

/// authgrant 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantConfig {
    /// 授权码有效期（秒），默认 600（10 分钟）
    pub auth_code_ttl: i64,

    /// 访问令牌有效期（秒），默认 3600（1 小时）
    ///
    /// 刷新令牌没有有效期，只会被轮换或撤销。
    pub access_token_ttl: i64,

    /// 签名令牌的共享密钥；设置后引擎进入自包含（签名）模式，
    /// 不再读写存储。不设置则为不透明令牌模式。
    pub jwt_secret: Option<String>,

    /// 验证授权码时是否强制比对回调 URI
    ///
    /// 默认 false：验证时未提交 redirect_uri 则跳过比对（与原始行为一致）。
    /// 设为 true 时，签发时绑定过 redirect_uri 的授权码必须在验证时提交
    /// 相同的 URI（RFC 6749 §4.1.3）。
    pub strict_redirect_check: bool,
}

impl Default for GrantConfig {
    fn default() -> Self {
        Self {
            auth_code_ttl: 600,      // 10分钟
            access_token_ttl: 3600,  // 1小时
            jwt_secret: None,
            strict_redirect_check: false,
        }
    }
}

impl GrantConfig {
    pub fn builder() -> GrantConfigBuilder {
        GrantConfigBuilder::default()
    }

    /// 是否为签名（自包含）令牌模式
    pub fn is_signed_mode(&self) -> bool {
        self.jwt_secret.is_some()
    }
}

/// 配置构建器
///
/// 除配置项外还负责装配引擎的协作者：客户端来源（列表或注册表）、
/// 存储和资源所有者桥接。
pub struct GrantConfigBuilder {
    config: GrantConfig,
    clients: Vec<ClientRecord>,
    registry: Option<Arc<dyn ClientRegistry>>,
    store: Option<Arc<dyn GrantStore>>,
    bridge: Option<Arc<dyn ResourceOwnerBridge>>,
}

impl Default for GrantConfigBuilder {
    fn default() -> Self {
        Self {
            config: GrantConfig::default(),
            clients: Vec::new(),
            registry: None,
            store: None,
            bridge: None,
        }
    }
}

impl GrantConfigBuilder {
    pub fn auth_code_ttl(mut self, seconds: i64) -> Self {
        self.config.auth_code_ttl = seconds;
        self
    }

    pub fn access_token_ttl(mut self, seconds: i64) -> Self {
        self.config.access_token_ttl = seconds;
        self
    }

    /// 设置共享密钥并进入签名令牌模式
    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.jwt_secret = Some(secret.into());
        self
    }

    pub fn strict_redirect_check(mut self, strict: bool) -> Self {
        self.config.strict_redirect_check = strict;
        self
    }

    /// 添加一个客户端（使用默认的内存注册表）
    pub fn client(mut self, client: ClientRecord) -> Self {
        self.clients.push(client);
        self
    }

    /// 设置客户端列表（使用默认的内存注册表）
    pub fn clients(mut self, clients: impl IntoIterator<Item = ClientRecord>) -> Self {
        self.clients.extend(clients);
        self
    }

    /// 设置宿主自己的客户端注册表（数据库等）
    pub fn registry(mut self, registry: Arc<dyn ClientRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 设置存储后端（不透明令牌模式必需）
    pub fn store(mut self, store: Arc<dyn GrantStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 设置资源所有者桥接（默认全部放行）
    pub fn bridge(mut self, bridge: Arc<dyn ResourceOwnerBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// 构建 [`GrantManager`](crate::GrantManager)
    ///
    /// 构造期失败是唯一的致命路径：
    /// - 既没有客户端列表也没有注册表
    /// - 不透明令牌模式下没有存储
    /// - 共享密钥为空字符串或有效期不为正数
    pub fn build(self) -> GrantResult<crate::GrantManager> {
        if self.config.auth_code_ttl <= 0 || self.config.access_token_ttl <= 0 {
            return Err(GrantError::Config(
                "auth_code_ttl and access_token_ttl must be positive".to_string(),
            ));
        }

        if let Some(secret) = &self.config.jwt_secret {
            if secret.is_empty() {
                return Err(GrantError::Config(
                    "jwt_secret must not be empty".to_string(),
                ));
            }
        }

        let registry: Arc<dyn ClientRegistry> = match self.registry {
            Some(registry) => registry,
            None if !self.clients.is_empty() => {
                Arc::new(MemoryClientRegistry::new(self.clients))
            }
            None => {
                return Err(GrantError::Config(
                    "a client list or a client registry is required".to_string(),
                ));
            }
        };

        if !self.config.is_signed_mode() && self.store.is_none() {
            return Err(GrantError::Config(
                "opaque token mode requires a grant store".to_string(),
            ));
        }

        let bridge = self
            .bridge
            .unwrap_or_else(|| Arc::new(PermissiveBridge));

        Ok(crate::GrantManager::from_parts(
            self.config,
            registry,
            self.store,
            bridge,
        ))
    }

    /// 仅构建配置（不装配引擎）
    pub fn build_config(self) -> GrantConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GrantConfig::default();
        assert_eq!(config.auth_code_ttl, 600);
        assert_eq!(config.access_token_ttl, 3600);
        assert!(!config.is_signed_mode());
        assert!(!config.strict_redirect_check);
    }

    #[test]
    fn test_builder_sets_signed_mode() {
        let config = GrantConfig::builder()
            .jwt_secret("shared-secret")
            .access_token_ttl(60)
            .build_config();
        assert!(config.is_signed_mode());
        assert_eq!(config.access_token_ttl, 60);
    }
}
