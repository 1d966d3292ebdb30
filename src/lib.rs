// Author: 金书记
//
//! # authgrant-rust
//!
//! 可嵌入的 OAuth2 授权码模式（RFC 6749 §4.1）引擎。
//!
//! 这个 crate 是门面，重新导出各成员 crate 的公开接口：
//! - `authgrant-core`：授权引擎、令牌编解码、配置与错误
//! - `authgrant-adapter`：宿主接口（存储、客户端注册表、资源所有者桥接）
//! - `authgrant-storage-memory`：默认的内存存储
//!
//! ## 快速开始
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use authgrant_rust::{ClientRecord, ClientSecret, GrantManager, MemoryGrantStore, ScopeMap};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = GrantManager::builder()
//!         .client(ClientRecord::new(
//!             "app_001",
//!             ClientSecret::Plain("secret".to_string()),
//!             ScopeMap::from([("read".to_string(), true)]),
//!         ))
//!         .store(Arc::new(MemoryGrantStore::new()))
//!         .build()?;
//!
//!     let approved = manager.verify_client("app_001", &["read".to_string()]).await?;
//!     let code = manager
//!         .issue_auth_code("app_001", Some("user_123"), None, &approved)
//!         .await?;
//!     // ... verify_auth_code / issue_access_token / verify_token_and_scope
//!     Ok(())
//! }
//! ```

pub use authgrant_core::{
    AccessTokenRecord, AuthCodeRecord, ClientRecord, ClientRegistry, ClientSecret, GrantConfig,
    GrantConfigBuilder, GrantError, GrantManager, GrantResult, GrantStore, IssuedTokenPair,
    MemoryClientRegistry, PermissiveBridge, RefreshTokenRecord, ResourceOwnerBridge, ScopeMap,
    StoreError, StoreResult, VerifiedAuthCode, VerifiedToken,
};

pub use authgrant_core::{config, scope, token};

pub use authgrant_storage_memory::MemoryGrantStore;
