// Author: 金书记
//
//! # authgrant-storage-memory
//!
//! 内存存储实现
//!
//! 适用于：
//! - 开发测试环境
//! - 单机部署
//! - 不需要持久化的场景
//!
//! 三张映射表（授权码 / 访问令牌 / 刷新令牌）由同一把互斥锁保护，因此
//! 兑换标记和刷新令牌驱逐都是单个临界区，满足存储层的原子性约定。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use authgrant_adapter::store::{
    AccessTokenRecord, AuthCodeRecord, GrantStore, RefreshTokenRecord, StoreError, StoreResult,
};

#[derive(Debug, Default)]
struct Tables {
    codes: HashMap<String, AuthCodeRecord>,
    access: HashMap<String, AccessTokenRecord>,
    refresh: HashMap<String, RefreshTokenRecord>,
}

/// 内存授权存储
#[derive(Debug, Default)]
pub struct MemoryGrantStore {
    tables: Mutex<Tables>,
}

impl MemoryGrantStore {
    /// 创建新的内存存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 清理已过期的授权码和访问令牌
    ///
    /// 刷新令牌没有过期时间，只会被轮换或撤销删除。
    pub async fn purge_expired(&self) {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        tables.codes.retain(|_, record| record.expires_at > now);
        tables.access.retain(|_, record| record.expires_at > now);
    }

    /// 当前保存的记录数（授权码，访问令牌，刷新令牌）
    pub async fn counts(&self) -> (usize, usize, usize) {
        let tables = self.tables.lock().await;
        (
            tables.codes.len(),
            tables.access.len(),
            tables.refresh.len(),
        )
    }
}

#[async_trait]
impl GrantStore for MemoryGrantStore {
    async fn put_auth_code(&self, record: AuthCodeRecord) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.codes.contains_key(&record.code) {
            return Err(StoreError::DuplicateRecord(record.code));
        }
        tables.codes.insert(record.code.clone(), record);
        Ok(())
    }

    async fn get_auth_code(&self, code: &str) -> StoreResult<Option<AuthCodeRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.codes.get(code).cloned())
    }

    async fn mark_auth_code_redeemed(&self, code: &str, access_token: &str) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let record = tables.codes.get_mut(code).ok_or(StoreError::NotFound)?;
        if record.redeemed_access_token.is_some() {
            return Err(StoreError::AlreadyRedeemed);
        }
        record.redeemed_access_token = Some(access_token.to_string());
        Ok(())
    }

    async fn delete_auth_code(&self, code: &str) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables.codes.remove(code);
        Ok(())
    }

    async fn put_token_pair(
        &self,
        access: AccessTokenRecord,
        refresh: RefreshTokenRecord,
    ) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;

        // 驱逐同一 (client_id, user_id) 之前的刷新令牌及其访问令牌
        let evicted: Vec<String> = tables
            .refresh
            .values()
            .filter(|r| r.client_id == refresh.client_id && r.user_id == refresh.user_id)
            .map(|r| r.token.clone())
            .collect();
        for token in evicted {
            if let Some(old) = tables.refresh.remove(&token) {
                tables.access.remove(&old.access_token);
            }
        }

        tables.access.insert(access.token.clone(), access);
        tables.refresh.insert(refresh.token.clone(), refresh);
        Ok(())
    }

    async fn get_access_token(&self, token: &str) -> StoreResult<Option<AccessTokenRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.access.get(token).cloned())
    }

    async fn get_refresh_token(&self, token: &str) -> StoreResult<Option<RefreshTokenRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables.refresh.get(token).cloned())
    }

    async fn delete_access_token(&self, token: &str) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables.access.remove(token);
        Ok(())
    }

    async fn delete_refresh_token(&self, token: &str) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        tables.refresh.remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authgrant_adapter::store::ScopeMap;
    use chrono::Duration;

    fn code_record(code: &str) -> AuthCodeRecord {
        AuthCodeRecord {
            code: code.to_string(),
            client_id: "app_001".to_string(),
            user_id: Some("user_123".to_string()),
            redirect_uri: Some("http://localhost:3000/callback".to_string()),
            scopes: ScopeMap::from([("read".to_string(), true)]),
            expires_at: Utc::now() + Duration::seconds(600),
            redeemed_access_token: None,
        }
    }

    fn pair(access: &str, refresh: &str, user: &str) -> (AccessTokenRecord, RefreshTokenRecord) {
        let scopes = ScopeMap::from([("read".to_string(), true)]);
        (
            AccessTokenRecord {
                token: access.to_string(),
                client_id: "app_001".to_string(),
                user_id: Some(user.to_string()),
                scopes: scopes.clone(),
                expires_at: Utc::now() + Duration::seconds(3600),
                refresh_token: refresh.to_string(),
            },
            RefreshTokenRecord {
                token: refresh.to_string(),
                client_id: "app_001".to_string(),
                user_id: Some(user.to_string()),
                scopes,
                access_token: access.to_string(),
                auth_code: None,
            },
        )
    }

    #[tokio::test]
    async fn test_auth_code_roundtrip() {
        let store = MemoryGrantStore::new();
        store.put_auth_code(code_record("code_a")).await.unwrap();

        let record = store.get_auth_code("code_a").await.unwrap().unwrap();
        assert_eq!(record.client_id, "app_001");
        assert!(record.redeemed_access_token.is_none());

        store.delete_auth_code("code_a").await.unwrap();
        assert!(store.get_auth_code("code_a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_auth_code_rejected() {
        let store = MemoryGrantStore::new();
        store.put_auth_code(code_record("code_a")).await.unwrap();
        let result = store.put_auth_code(code_record("code_a")).await;
        assert!(matches!(result, Err(StoreError::DuplicateRecord(_))));
    }

    #[tokio::test]
    async fn test_mark_redeemed_is_single_shot() {
        let store = MemoryGrantStore::new();
        store.put_auth_code(code_record("code_a")).await.unwrap();

        store
            .mark_auth_code_redeemed("code_a", "token_x")
            .await
            .unwrap();

        let second = store.mark_auth_code_redeemed("code_a", "token_y").await;
        assert!(matches!(second, Err(StoreError::AlreadyRedeemed)));

        // 第一次写入的令牌保持不变
        let record = store.get_auth_code("code_a").await.unwrap().unwrap();
        assert_eq!(record.redeemed_access_token.as_deref(), Some("token_x"));

        let absent = store.mark_auth_code_redeemed("code_b", "token_z").await;
        assert!(matches!(absent, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_token_pair_eviction_per_client_user() {
        let store = MemoryGrantStore::new();

        let (a1, r1) = pair("access_1", "refresh_1", "user_123");
        store.put_token_pair(a1, r1).await.unwrap();

        // 另一个用户不受影响
        let (a2, r2) = pair("access_2", "refresh_2", "user_456");
        store.put_token_pair(a2, r2).await.unwrap();

        // 同一 (client, user) 的新令牌对驱逐旧对
        let (a3, r3) = pair("access_3", "refresh_3", "user_123");
        store.put_token_pair(a3, r3).await.unwrap();

        assert!(store.get_refresh_token("refresh_1").await.unwrap().is_none());
        assert!(store.get_access_token("access_1").await.unwrap().is_none());
        assert!(store.get_refresh_token("refresh_2").await.unwrap().is_some());
        assert!(store.get_refresh_token("refresh_3").await.unwrap().is_some());
        assert!(store.get_access_token("access_3").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemoryGrantStore::new();

        let mut expired = code_record("code_old");
        expired.expires_at = Utc::now() - Duration::seconds(1);
        store.put_auth_code(expired).await.unwrap();
        store.put_auth_code(code_record("code_new")).await.unwrap();

        let (mut a1, r1) = pair("access_old", "refresh_old", "user_123");
        a1.expires_at = Utc::now() - Duration::seconds(1);
        store.put_token_pair(a1, r1).await.unwrap();

        store.purge_expired().await;

        assert!(store.get_auth_code("code_old").await.unwrap().is_none());
        assert!(store.get_auth_code("code_new").await.unwrap().is_some());
        assert!(store.get_access_token("access_old").await.unwrap().is_none());
        // 刷新令牌不随访问令牌过期
        assert!(store.get_refresh_token("refresh_old").await.unwrap().is_some());
    }
}
