// Author: 金书记
//
//! # authgrant-core
//!
//! OAuth2 授权码模式（RFC 6749 §4.1）的核心库：授权状态机与令牌生命周期。
//!
//! ## 主要功能
//!
//! - 客户端验证：范围优先级检查，常数时间密钥比较
//! - 授权码：签发、单次兑换、重放检测与级联撤销
//! - 访问/刷新令牌：签发、验证、轮换、撤销
//! - 双模式：不透明令牌（存储支撑）或签名令牌（自包含，无服务器端状态）
//!
//! HTTP 路由、登录页、授权确认页和持久化都由宿主提供，核心通过
//! `authgrant-adapter` 中的接口与宿主协作。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use authgrant_core::{ClientRecord, ClientSecret, GrantManager};
//! use authgrant_storage_memory::MemoryGrantStore;
//!
//! let manager = GrantManager::builder()
//!     .client(ClientRecord::new("app_001", ClientSecret::Plain("secret".into()), scopes))
//!     .store(Arc::new(MemoryGrantStore::new()))
//!     .build()?;
//! let approved = manager.verify_client("app_001", &requested).await?;
//! let code = manager.issue_auth_code("app_001", Some("user_123"), None, &approved).await?;
//! ```

pub mod config;
pub mod scope;
pub mod token;

mod engine;
mod error;

pub use config::{GrantConfig, GrantConfigBuilder};
pub use engine::{GrantManager, IssuedTokenPair, VerifiedAuthCode, VerifiedToken};
pub use error::{GrantError, GrantResult};

// 重新导出宿主接口，单独使用核心crate时无需直接依赖 adapter
pub use authgrant_adapter::bridge::{PermissiveBridge, ResourceOwnerBridge};
pub use authgrant_adapter::registry::{
    ClientRecord, ClientRegistry, ClientSecret, MemoryClientRegistry,
};
pub use authgrant_adapter::store::{
    AccessTokenRecord, AuthCodeRecord, GrantStore, RefreshTokenRecord, ScopeMap, StoreError,
    StoreResult,
};
