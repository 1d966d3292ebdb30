// Author: 金书记
//
//! Authorization Code Grant Engine | 授权码模式引擎
//!
//! ## Flow | 流程
//!
//! ```text
//! Host                     GrantManager              GrantStore
//! 宿主                     授权引擎                  存储
//!   │                         │                         │
//!   │  verify_client()        │                         │
//!   │────────────────────────▶│  registry lookup        │
//!   │                         │  scope precedence walk  │
//!   │                         │                         │
//!   │  issue_auth_code()      │                         │
//!   │────────────────────────▶│  encode code            │
//!   │                         │  put_auth_code (TTL)    │
//!   │                         │────────────────────────▶│
//!   │                         │                         │
//!   │  verify_auth_code()     │                         │
//!   │────────────────────────▶│  get_auth_code          │
//!   │                         │────────────────────────▶│
//!   │                         │  composite check        │
//!   │                         │  (replay → cascade)     │
//!   │                         │                         │
//!   │  issue_access_token()   │                         │
//!   │────────────────────────▶│  mark_auth_code_redeemed│
//!   │                         │────────────────────────▶│
//!   │                         │  put_token_pair         │
//!   │                         │────────────────────────▶│
//!   │                         │                         │
//!   │  verify_access_token()  │                         │
//!   │────────────────────────▶│  get / expiry / scopes  │
//!   │                         │────────────────────────▶│
//! ```
//!
//! With a shared secret configured the engine runs in signed (self-contained)
//! mode: every token carries its descriptor as signed claims and the store is
//! bypassed entirely.
//! 配置了共享密钥后，引擎运行在签名（自包含）模式：每个令牌把描述符作为
//! 签名声明随身携带，存储被完全绕过。
//!
//! ## Security Invariants | 安全不变量
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │ 1. 授权码单次使用；重放触发级联撤销                     │
//! │    Codes are single-use; replay cascades revocation    │
//! ├────────────────────────────────────────────────────────┤
//! │ 2. 刷新令牌轮换；旧令牌对整体失效                       │
//! │    Refresh rotation invalidates the previous pair      │
//! ├────────────────────────────────────────────────────────┤
//! │ 3. 范围只收窄：令牌 ⊆ 授权码 ⊆ 客户端                   │
//! │    Scopes only narrow: token ⊆ code ⊆ client           │
//! ├────────────────────────────────────────────────────────┤
//! │ 4. 密钥比较为常数时间；验证失败统一为 invalid_grant     │
//! │    Constant-time secrets; one failure kind, no oracle  │
//! └────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use authgrant_adapter::bridge::ResourceOwnerBridge;
use authgrant_adapter::registry::ClientRegistry;
use authgrant_adapter::store::{
    AccessTokenRecord, AuthCodeRecord, GrantStore, RefreshTokenRecord, ScopeMap, StoreError,
};

use crate::config::{GrantConfig, GrantConfigBuilder};
use crate::error::{GrantError, GrantResult};
use crate::scope;
use crate::token::{OpaqueTokenCodec, SignedTokenCodec, TokenDescriptor, TokenKind};

/// Successful auth code verification | 授权码验证成功的结果
#[derive(Debug, Clone)]
pub struct VerifiedAuthCode {
    pub client_id: String,
    pub user_id: Option<String>,
    pub scopes: ScopeMap,
}

/// Successful token verification | 令牌验证成功的结果
///
/// Opaque mode fills this from the store record, signed mode from the claims.
/// 不透明模式由存储记录填充，签名模式由声明填充。
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub client_id: String,
    pub user_id: Option<String>,
    pub scopes: ScopeMap,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Token response returned to the client | 返回给客户端的令牌响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedTokenPair {
    pub access_token: String,

    pub refresh_token: String,

    /// Always "Bearer" | 固定为 "Bearer"
    pub token_type: String,

    /// Access token lifetime in seconds | 访问令牌有效期（秒）
    pub expires_in: i64,

    pub scopes: ScopeMap,
}

/// Authorization Code Grant engine | 授权码模式引擎
///
/// Reentrant: concurrent grant flows share one instance. The engine borrows
/// records through the store and never caches them; the client registry is
/// immutable for the engine's lifetime.
/// 可重入：并发的授权流程共享同一实例。引擎只通过存储借用记录，从不缓存；
/// 客户端注册表在引擎生命周期内不可变。
#[derive(Clone)]
pub struct GrantManager {
    registry: Arc<dyn ClientRegistry>,
    store: Option<Arc<dyn GrantStore>>,
    bridge: Arc<dyn ResourceOwnerBridge>,
    config: GrantConfig,
    signed: Option<SignedTokenCodec>,
}

impl GrantManager {
    pub(crate) fn from_parts(
        config: GrantConfig,
        registry: Arc<dyn ClientRegistry>,
        store: Option<Arc<dyn GrantStore>>,
        bridge: Arc<dyn ResourceOwnerBridge>,
    ) -> Self {
        let signed = config.jwt_secret.as_ref().map(SignedTokenCodec::new);
        Self {
            registry,
            store,
            bridge,
            config,
            signed,
        }
    }

    /// 构建引擎的入口，等价于 `GrantConfig::builder()`
    pub fn builder() -> GrantConfigBuilder {
        GrantConfig::builder()
    }

    pub fn config(&self) -> &GrantConfig {
        &self.config
    }

    /// 宿主侧钩子：登录与授权确认
    pub fn bridge(&self) -> &Arc<dyn ResourceOwnerBridge> {
        &self.bridge
    }

    /// Convenience: consult both resource-owner hooks. The engine does not
    /// enforce the outcome; the host decides whether to proceed to issuance.
    /// 便捷方法：依次查询两个资源所有者钩子。引擎不强制结果，由宿主决定是否
    /// 继续签发。
    pub async fn resource_owner_approves(&self, client_id: &str, scopes: &[String]) -> bool {
        self.bridge.login_resource_owner().await
            && self.bridge.confirm_by_resource_owner(client_id, scopes).await
    }

    fn opaque_store(&self) -> GrantResult<&Arc<dyn GrantStore>> {
        self.store
            .as_ref()
            .ok_or_else(|| GrantError::Config("no grant store configured".to_string()))
    }

    /// Verify a client may request the given scopes | 验证客户端可以请求给定范围
    ///
    /// Precedence is strict: unknown client → `unauthorized_client`; then the
    /// first failing scope in input order decides `invalid_scope` (name not
    /// registered) vs `access_denied` (registered but disabled).
    /// 优先级严格：未知客户端为 `unauthorized_client`；之后按输入顺序第一个
    /// 失败的范围决定 `invalid_scope`（未注册）还是 `access_denied`（已注册
    /// 但禁用）。
    pub async fn verify_client(
        &self,
        client_id: &str,
        scopes: &[String],
    ) -> GrantResult<ScopeMap> {
        let client = self
            .registry
            .lookup(client_id)
            .await
            .ok_or(GrantError::UnauthorizedClient)?;

        scope::approve_request(&client.scopes, scopes)
    }

    /// Issue an authorization code | 签发授权码
    ///
    /// The caller has already consulted [`resource_owner_approves`]
    /// (or its own login/consent flow) and verified the client.
    /// 调用方应已查询过资源所有者钩子（或自己的登录/确认流程）并验证过客户端。
    ///
    /// [`resource_owner_approves`]: GrantManager::resource_owner_approves
    pub async fn issue_auth_code(
        &self,
        client_id: &str,
        user_id: Option<&str>,
        redirect_uri: Option<&str>,
        scopes: &ScopeMap,
    ) -> GrantResult<String> {
        if let Some(codec) = &self.signed {
            let descriptor = TokenDescriptor {
                kind: TokenKind::Auth,
                client_id: client_id.to_string(),
                user_id: user_id.map(str::to_string),
                scopes: scope::granted_names(scopes),
                audience: redirect_uri.map(str::to_string),
                ttl: Some(self.config.auth_code_ttl),
            };
            return codec.encode(&descriptor);
        }

        let store = self.opaque_store()?;
        let code = OpaqueTokenCodec::encode();
        let record = AuthCodeRecord {
            code: code.clone(),
            client_id: client_id.to_string(),
            user_id: user_id.map(str::to_string),
            redirect_uri: redirect_uri.map(str::to_string),
            scopes: scopes.clone(),
            expires_at: Utc::now() + Duration::seconds(self.config.auth_code_ttl),
            redeemed_access_token: None,
        };
        store.put_auth_code(record).await?;

        tracing::debug!("issued auth code for client {}", client_id);
        Ok(code)
    }

    /// Verify an authorization code | 验证授权码
    ///
    /// Opaque mode folds every failure — absent record, wrong client, bad
    /// secret, redirect mismatch, expiry, replay — into a single
    /// `invalid_grant`, and a replayed code additionally revokes the access
    /// token it once produced (cascaded revocation).
    /// 不透明模式把所有失败（记录缺失、客户端不符、密钥错误、回调不匹配、
    /// 过期、重放）折叠为同一个 `invalid_grant`；被重放的授权码还会连带撤销
    /// 它曾产生的访问令牌（级联撤销）。
    ///
    /// Signed mode performs no replay detection; revocation there is the
    /// host's denylist.
    /// 签名模式不做重放检测；那里的撤销由宿主的拒绝名单承担。
    pub async fn verify_auth_code(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> GrantResult<VerifiedAuthCode> {
        if let Some(codec) = &self.signed {
            return self
                .verify_auth_code_signed(codec, client_id, client_secret, code, redirect_uri)
                .await;
        }
        self.verify_auth_code_opaque(client_id, client_secret, code, redirect_uri)
            .await
    }

    async fn verify_auth_code_opaque(
        &self,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> GrantResult<VerifiedAuthCode> {
        let store = self.opaque_store()?;

        let Some(record) = store.get_auth_code(code).await? else {
            tracing::debug!("auth code not found for client {}", client_id);
            return Err(GrantError::InvalidGrant);
        };

        // 组合检查：任何一项失败都走同一条失败路径
        let client = self.registry.lookup(client_id).await;
        let secret_ok = client
            .as_ref()
            .map(|c| c.secret.matches(client_secret))
            .unwrap_or(false);
        let redirect_ok = redirect_uri_matches(
            record.redirect_uri.as_deref(),
            redirect_uri,
            self.config.strict_redirect_check,
        );
        let expired = record.is_expired();
        let replayed = record.redeemed_access_token.is_some();

        if secret_ok && redirect_ok && !expired && !replayed && record.client_id == client_id {
            return Ok(VerifiedAuthCode {
                client_id: record.client_id,
                user_id: record.user_id,
                scopes: record.scopes,
            });
        }

        // 失败路径：重放触发级联撤销；过期清理记录
        if let Some(access_token) = &record.redeemed_access_token {
            tracing::warn!(
                "auth code replay detected for client {}, revoking issued access token",
                client_id
            );
            store.delete_access_token(access_token).await?;
            store.delete_auth_code(code).await?;
        } else if expired {
            store.delete_auth_code(code).await?;
        }

        Err(GrantError::InvalidGrant)
    }

    async fn verify_auth_code_signed(
        &self,
        codec: &SignedTokenCodec,
        client_id: &str,
        client_secret: &str,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> GrantResult<VerifiedAuthCode> {
        let claims = codec.decode(code)?;

        let client = self
            .registry
            .lookup(client_id)
            .await
            .ok_or(GrantError::UnauthorizedClient)?;

        if claims.kind != TokenKind::Auth || claims.client != client_id {
            return Err(GrantError::InvalidGrant);
        }

        match redirect_uri {
            Some(presented) if claims.aud.as_deref() != Some(presented) => {
                return Err(GrantError::InvalidGrant);
            }
            None if self.config.strict_redirect_check && claims.aud.is_some() => {
                return Err(GrantError::InvalidGrant);
            }
            _ => {}
        }

        if !client.secret.matches(client_secret) {
            return Err(GrantError::InvalidGrant);
        }

        Ok(VerifiedAuthCode {
            client_id: claims.client,
            user_id: claims.user_id,
            scopes: scope::names_to_map(&claims.scopes),
        })
    }

    /// Issue an access/refresh pair | 签发访问/刷新令牌对
    ///
    /// When `auth_code` is given (redemption), the code is marked redeemed
    /// first; losing that race means another redemption already went through,
    /// so the replay cascade runs and the call fails. The store then evicts
    /// any prior refresh token for the same (client, user) while inserting
    /// the pair.
    /// 提供 `auth_code`（兑换）时先标记授权码已兑换；标记失败说明另一次兑换
    /// 已经完成，于是执行重放级联撤销并返回失败。随后存储在插入令牌对的同时
    /// 驱逐同一 (client, user) 之前的刷新令牌。
    pub async fn issue_access_token(
        &self,
        client_id: &str,
        user_id: Option<&str>,
        scopes: &ScopeMap,
        auth_code: Option<&str>,
    ) -> GrantResult<IssuedTokenPair> {
        if let Some(codec) = &self.signed {
            // 签名模式：令牌即记录，不接触存储
            return self.encode_signed_pair(codec, client_id, user_id, scopes);
        }

        let store = self.opaque_store()?;
        let access_token = OpaqueTokenCodec::encode();
        let refresh_token = OpaqueTokenCodec::encode();

        if let Some(code) = auth_code {
            match store.mark_auth_code_redeemed(code, &access_token).await {
                Ok(()) => {}
                Err(StoreError::AlreadyRedeemed) => {
                    tracing::warn!(
                        "redemption raced on auth code for client {}, revoking",
                        client_id
                    );
                    if let Some(record) = store.get_auth_code(code).await? {
                        if let Some(prior) = &record.redeemed_access_token {
                            store.delete_access_token(prior).await?;
                        }
                    }
                    store.delete_auth_code(code).await?;
                    return Err(GrantError::InvalidGrant);
                }
                Err(StoreError::NotFound) => return Err(GrantError::InvalidGrant),
                Err(err) => return Err(err.into()),
            }
        }

        let expires_at = Utc::now() + Duration::seconds(self.config.access_token_ttl);
        let access = AccessTokenRecord {
            token: access_token.clone(),
            client_id: client_id.to_string(),
            user_id: user_id.map(str::to_string),
            scopes: scopes.clone(),
            expires_at,
            refresh_token: refresh_token.clone(),
        };
        let refresh = RefreshTokenRecord {
            token: refresh_token.clone(),
            client_id: client_id.to_string(),
            user_id: user_id.map(str::to_string),
            scopes: scopes.clone(),
            access_token: access_token.clone(),
            auth_code: auth_code.map(str::to_string),
        };
        store.put_token_pair(access, refresh).await?;

        tracing::debug!("issued token pair for client {}", client_id);
        Ok(IssuedTokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_ttl,
            scopes: scopes.clone(),
        })
    }

    /// Redeem a refresh token for a new pair (rotation) | 用刷新令牌换取新令牌对（轮换）
    ///
    /// The caller verifies the client first (this call only checks that the
    /// token belongs to `client_id`). Scopes, user and auth-code lineage are
    /// copied forward unless the caller narrows the scopes; the old access
    /// token is revoked and the old refresh token deleted before the new pair
    /// is persisted.
    /// 调用方应先验证客户端（这里只检查令牌属于 `client_id`）。范围、用户和
    /// 授权码沿袭会被带到新令牌对，除非调用方主动收窄范围；在持久化新令牌对
    /// 之前撤销旧访问令牌并删除旧刷新令牌。
    pub async fn refresh_access_token(
        &self,
        client_id: &str,
        old_refresh_token: &str,
        scopes: Option<&ScopeMap>,
    ) -> GrantResult<IssuedTokenPair> {
        if let Some(codec) = &self.signed {
            let claims = codec.decode(old_refresh_token)?;
            if claims.kind != TokenKind::Refresh || claims.client != client_id {
                return Err(GrantError::InvalidGrant);
            }
            let scope_map = match scopes {
                Some(map) => map.clone(),
                None => scope::names_to_map(&claims.scopes),
            };
            return self.encode_signed_pair(
                codec,
                client_id,
                claims.user_id.as_deref(),
                &scope_map,
            );
        }

        let store = self.opaque_store()?;
        let Some(old) = store.get_refresh_token(old_refresh_token).await? else {
            tracing::debug!("refresh token not found for client {}", client_id);
            return Err(GrantError::InvalidGrant);
        };
        if old.client_id != client_id {
            return Err(GrantError::InvalidGrant);
        }

        // 旧令牌对整体失效
        store.delete_access_token(&old.access_token).await?;
        store.delete_refresh_token(old_refresh_token).await?;

        let scope_map = match scopes {
            Some(map) => map.clone(),
            None => old.scopes.clone(),
        };
        let access_token = OpaqueTokenCodec::encode();
        let refresh_token = OpaqueTokenCodec::encode();
        let expires_at = Utc::now() + Duration::seconds(self.config.access_token_ttl);

        let access = AccessTokenRecord {
            token: access_token.clone(),
            client_id: client_id.to_string(),
            user_id: old.user_id.clone(),
            scopes: scope_map.clone(),
            expires_at,
            refresh_token: refresh_token.clone(),
        };
        let refresh = RefreshTokenRecord {
            token: refresh_token.clone(),
            client_id: client_id.to_string(),
            user_id: old.user_id,
            scopes: scope_map.clone(),
            access_token: access_token.clone(),
            auth_code: old.auth_code,
        };
        store.put_token_pair(access, refresh).await?;

        tracing::debug!("rotated refresh token for client {}", client_id);
        Ok(IssuedTokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_ttl,
            scopes: scope_map,
        })
    }

    fn encode_signed_pair(
        &self,
        codec: &SignedTokenCodec,
        client_id: &str,
        user_id: Option<&str>,
        scopes: &ScopeMap,
    ) -> GrantResult<IssuedTokenPair> {
        let names = scope::granted_names(scopes);
        let access_token = codec.encode(&TokenDescriptor {
            kind: TokenKind::Access,
            client_id: client_id.to_string(),
            user_id: user_id.map(str::to_string),
            scopes: names.clone(),
            audience: None,
            ttl: Some(self.config.access_token_ttl),
        })?;
        let refresh_token = codec.encode(&TokenDescriptor {
            kind: TokenKind::Refresh,
            client_id: client_id.to_string(),
            user_id: user_id.map(str::to_string),
            scopes: names,
            audience: None,
            ttl: None,
        })?;
        Ok(IssuedTokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.access_token_ttl,
            scopes: scopes.clone(),
        })
    }

    /// Verify an access (or refresh) token and its scopes
    /// 验证访问（或刷新）令牌及其范围
    ///
    /// Opaque mode: lookup, expiry check (an expired access token is deleted
    /// on sight), then every requested scope must be granted on the record.
    /// Signed mode: decode, tag check, then the requested scopes must appear
    /// in the claim list. All failures are `invalid_grant`.
    /// 不透明模式：查询、过期检查（过期的访问令牌当场删除）、再检查请求的
    /// 范围都已授予。签名模式：解码、标签检查、再检查请求的范围出现在声明
    /// 列表中。所有失败都是 `invalid_grant`。
    pub async fn verify_access_token(
        &self,
        token: &str,
        scopes: &[String],
        is_refresh_token: bool,
    ) -> GrantResult<VerifiedToken> {
        if let Some(codec) = &self.signed {
            let claims = codec.decode(token)?;
            let kind_ok = claims.kind == TokenKind::Access
                || (is_refresh_token && claims.kind == TokenKind::Refresh);
            if !kind_ok {
                return Err(GrantError::InvalidGrant);
            }
            if !scopes.iter().all(|name| claims.scopes.contains(name)) {
                return Err(GrantError::InvalidGrant);
            }
            return Ok(VerifiedToken {
                client_id: claims.client,
                user_id: claims.user_id,
                scopes: scope::names_to_map(&claims.scopes),
                expires_at: claims.exp.and_then(|exp| DateTime::from_timestamp(exp, 0)),
            });
        }

        let store = self.opaque_store()?;
        if is_refresh_token {
            let Some(record) = store.get_refresh_token(token).await? else {
                return Err(GrantError::InvalidGrant);
            };
            if !scope::covers(&record.scopes, scopes) {
                return Err(GrantError::InvalidGrant);
            }
            Ok(VerifiedToken {
                client_id: record.client_id,
                user_id: record.user_id,
                scopes: record.scopes,
                expires_at: None,
            })
        } else {
            let Some(record) = store.get_access_token(token).await? else {
                return Err(GrantError::InvalidGrant);
            };
            if record.is_expired() {
                // 过期即删除
                store.delete_access_token(token).await?;
                tracing::debug!("expired access token purged");
                return Err(GrantError::InvalidGrant);
            }
            if !scope::covers(&record.scopes, scopes) {
                return Err(GrantError::InvalidGrant);
            }
            Ok(VerifiedToken {
                client_id: record.client_id,
                user_id: record.user_id,
                scopes: record.scopes,
                expires_at: Some(record.expires_at),
            })
        }
    }

    /// Verify a bearer Authorization header (or an explicit refresh token)
    /// 验证 Bearer Authorization 头（或显式的刷新令牌）
    ///
    /// A malformed header is the only `invalid_request` in the core.
    /// 格式错误的头是核心中唯一的 `invalid_request`。
    pub async fn verify_token_and_scope(
        &self,
        auth_header: Option<&str>,
        scopes: &[String],
        refresh_token: Option<&str>,
    ) -> GrantResult<VerifiedToken> {
        if let Some(token) = refresh_token {
            return self.verify_access_token(token, scopes, true).await;
        }

        let header = auth_header.ok_or(GrantError::InvalidRequest)?;
        let token = parse_bearer(header)?;
        self.verify_access_token(token, scopes, false).await
    }

    /// Revoke an access token (opaque mode) | 撤销访问令牌（不透明模式）
    pub async fn revoke_access_token(&self, token: &str) -> GrantResult<()> {
        if self.signed.is_some() {
            return Err(GrantError::Config(
                "signed tokens carry no server-side record; revoke via a host denylist"
                    .to_string(),
            ));
        }
        self.opaque_store()?.delete_access_token(token).await?;
        Ok(())
    }

    /// Revoke a refresh token and its paired access token (opaque mode)
    /// 撤销刷新令牌及其配对的访问令牌（不透明模式）
    pub async fn revoke_refresh_token(&self, token: &str) -> GrantResult<()> {
        if self.signed.is_some() {
            return Err(GrantError::Config(
                "signed tokens carry no server-side record; revoke via a host denylist"
                    .to_string(),
            ));
        }
        let store = self.opaque_store()?;
        if let Some(record) = store.get_refresh_token(token).await? {
            store.delete_access_token(&record.access_token).await?;
        }
        store.delete_refresh_token(token).await?;
        Ok(())
    }
}

/// 授权码验证时的回调 URI 比对
///
/// 默认（宽松）模式下，验证时未提交 redirect_uri 则跳过比对；严格模式要求
/// 签发时绑定过的 URI 必须重新提交并一致。
fn redirect_uri_matches(stored: Option<&str>, presented: Option<&str>, strict: bool) -> bool {
    match presented {
        Some(uri) => stored == Some(uri),
        None => !strict || stored.is_none(),
    }
}

/// 解析 Bearer 头：单个空格分隔，方案名区分大小写
fn parse_bearer(header: &str) -> GrantResult<&str> {
    let mut parts = header.splitn(2, ' ');
    match (parts.next(), parts.next()) {
        (Some("Bearer"), Some(token)) if !token.is_empty() => Ok(token),
        _ => Err(GrantError::InvalidRequest),
    }
}
