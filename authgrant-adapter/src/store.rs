// Author: 金书记
//
//! Grant Store Abstraction | 授权存储抽象
//!
//! The store owns every authorization code, access token, and refresh token
//! record. The grant engine borrows records through these operations and
//! never caches them.
//! 存储独占持有所有授权码、访问令牌和刷新令牌记录。授权引擎只通过这些操作
//! 借用记录，从不缓存。
//!
//! ## Atomicity Contract | 原子性约定
//!
//! Every mutating operation must be atomic with respect to all other store
//! operations on the same key. Two calls matter most:
//! 所有变更操作相对于同一键上的其他存储操作必须是原子的。其中两个调用最为关键：
//!
//! - `mark_auth_code_redeemed` is a check-and-set: it fails with
//!   [`StoreError::AlreadyRedeemed`] if the code already carries a redeemed
//!   access token. This is the single-redemption linearization point.
//!   `mark_auth_code_redeemed` 是一个检查并设置操作：如果授权码已经带有兑换
//!   的访问令牌，则以 `AlreadyRedeemed` 失败。这是单次兑换的线性化点。
//! - `put_token_pair` inserts an access/refresh pair and, in the same
//!   critical section, evicts any prior refresh token held by the same
//!   (client_id, user_id) pair together with that token's access token.
//!   `put_token_pair` 插入访问/刷新令牌对，并在同一临界区内驱逐同一
//!   (client_id, user_id) 之前持有的刷新令牌及其访问令牌。
//!
//! Hook-backed stores (database, Redis, ...) must provide equivalent
//! atomicity, typically via a transaction, and must document their
//! refresh-eviction choice.
//! 宿主提供的存储（数据库、Redis 等）必须通过事务等手段提供等价的原子性，
//! 并记录其刷新令牌驱逐策略。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scope name to granted flag | 权限范围名称到授予标记的映射
///
/// `true` means granted, `false` means known but disabled for the client.
/// `true` 表示已授予，`false` 表示该范围已知但对此客户端禁用。
pub type ScopeMap = HashMap<String, bool>;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Insert hit an existing key. Unreachable in practice: token strings
    /// carry over 256 bits of entropy.
    #[error("record already exists: {0}")]
    DuplicateRecord(String),

    #[error("record not found")]
    NotFound,

    #[error("authorization code already redeemed")]
    AlreadyRedeemed,

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Authorization code record | 授权码记录
///
/// Created at issuance, redeemed exactly once, deleted on replay or expiry.
/// 在签发时创建，只能兑换一次，重放或过期时删除。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCodeRecord {
    /// The code string handed to the client | 交给客户端的授权码字符串
    pub code: String,

    /// Client the code was issued to | 授权码签发给的客户端
    pub client_id: String,

    /// Resource owner who approved the grant | 批准授权的资源所有者
    pub user_id: Option<String>,

    /// Redirect URI bound at issuance | 签发时绑定的回调 URI
    pub redirect_uri: Option<String>,

    /// Scopes approved for this code | 此授权码批准的权限范围
    pub scopes: ScopeMap,

    /// Expiration instant | 过期时间
    pub expires_at: DateTime<Utc>,

    /// Access token minted from this code, set at redemption. A second
    /// redemption attempt observing this field triggers cascaded revocation.
    /// 由此授权码铸造的访问令牌，在兑换时写入。第二次兑换尝试观察到该字段时
    /// 触发级联撤销。
    pub redeemed_access_token: Option<String>,
}

impl AuthCodeRecord {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Access token record | 访问令牌记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenRecord {
    pub token: String,
    pub client_id: String,
    pub user_id: Option<String>,
    pub scopes: ScopeMap,
    pub expires_at: DateTime<Utc>,

    /// Back-pointer to the refresh token issued alongside
    /// 指向同时签发的刷新令牌
    pub refresh_token: String,
}

impl AccessTokenRecord {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Refresh token record | 刷新令牌记录
///
/// Refresh tokens never self-expire; they die by rotation or revocation.
/// 刷新令牌不会自行过期，只会因轮换或撤销而失效。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub client_id: String,
    pub user_id: Option<String>,
    pub scopes: ScopeMap,

    /// Currently paired access token | 当前配对的访问令牌
    pub access_token: String,

    /// Originating authorization code, carried through rotations
    /// 最初的授权码，在轮换中沿袭
    pub auth_code: Option<String>,
}

/// Storage operations for grant state | 授权状态的存储操作
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Insert a new authorization code. Fails with
    /// [`StoreError::DuplicateRecord`] on key collision.
    /// 插入新的授权码。键冲突时以 `DuplicateRecord` 失败。
    async fn put_auth_code(&self, record: AuthCodeRecord) -> StoreResult<()>;

    /// Atomic read used by verification | 验证使用的原子读取
    async fn get_auth_code(&self, code: &str) -> StoreResult<Option<AuthCodeRecord>>;

    /// Record the access token produced from this code. Check-and-set: fails
    /// with [`StoreError::AlreadyRedeemed`] if a token was already recorded,
    /// [`StoreError::NotFound`] if the code is absent.
    /// 记录由此授权码产生的访问令牌。检查并设置：已记录过令牌时以
    /// `AlreadyRedeemed` 失败，授权码不存在时以 `NotFound` 失败。
    async fn mark_auth_code_redeemed(&self, code: &str, access_token: &str) -> StoreResult<()>;

    /// Delete an authorization code. Idempotent. | 删除授权码，幂等。
    async fn delete_auth_code(&self, code: &str) -> StoreResult<()>;

    /// Insert an access/refresh pair, evicting any prior refresh token for
    /// the same (client_id, user_id) in the same critical section.
    /// 插入访问/刷新令牌对，并在同一临界区驱逐同一 (client_id, user_id)
    /// 之前的刷新令牌。
    async fn put_token_pair(
        &self,
        access: AccessTokenRecord,
        refresh: RefreshTokenRecord,
    ) -> StoreResult<()>;

    async fn get_access_token(&self, token: &str) -> StoreResult<Option<AccessTokenRecord>>;

    async fn get_refresh_token(&self, token: &str) -> StoreResult<Option<RefreshTokenRecord>>;

    /// Idempotent | 幂等
    async fn delete_access_token(&self, token: &str) -> StoreResult<()>;

    /// Idempotent | 幂等
    async fn delete_refresh_token(&self, token: &str) -> StoreResult<()>;
}
