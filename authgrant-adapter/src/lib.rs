// Author: 金书记
//
//! # authgrant-adapter
//!
//! 宿主集成trait定义，用于实现与框架无关的抽象层
//!
//! 这个crate定义了授权服务器核心需要宿主提供的所有接口，包括：
//! - 授权码/令牌存储（`GrantStore`）
//! - 客户端注册表（`ClientRegistry`）
//! - 资源所有者桥接（登录与授权确认，`ResourceOwnerBridge`）
//!
//! 存储后端只依赖这个crate，不依赖核心crate。

pub mod store;
pub mod registry;
pub mod bridge;

pub use store::{
    AccessTokenRecord, AuthCodeRecord, GrantStore, RefreshTokenRecord, ScopeMap, StoreError,
    StoreResult,
};
pub use registry::{ClientRecord, ClientRegistry, ClientSecret, MemoryClientRegistry};
pub use bridge::{PermissiveBridge, ResourceOwnerBridge};
