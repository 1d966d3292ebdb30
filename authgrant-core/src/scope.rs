// Author: 金书记
//
//! 权限范围检查
//!
//! 范围以 `ScopeMap`（名称 → 授予标记）表示；请求方提交的是有序的名称列表。

use authgrant_adapter::store::ScopeMap;

use crate::error::{GrantError, GrantResult};

/// Walk the requested scopes in input order against the client's scope map.
/// The first failing scope decides the error kind: an unregistered name is
/// `InvalidScope`, a registered-but-disabled name is `AccessDenied`.
/// Returns the granted subset as a map.
/// 按输入顺序将请求的范围与客户端的范围映射逐一比对。第一个失败的范围决定
/// 错误种类：未注册的名称为 `InvalidScope`，已注册但禁用的名称为
/// `AccessDenied`。成功时返回授予子集。
pub fn approve_request(client_scopes: &ScopeMap, requested: &[String]) -> GrantResult<ScopeMap> {
    let mut approved = ScopeMap::new();
    for name in requested {
        match client_scopes.get(name) {
            None => return Err(GrantError::InvalidScope),
            Some(false) => return Err(GrantError::AccessDenied),
            Some(true) => {
                approved.insert(name.clone(), true);
            }
        }
    }
    Ok(approved)
}

/// 记录中的范围是否覆盖所有请求的范围（存在且为 true）
pub fn covers(record_scopes: &ScopeMap, requested: &[String]) -> bool {
    requested
        .iter()
        .all(|name| record_scopes.get(name).copied().unwrap_or(false))
}

/// 授予范围的名称列表（排序后用于签名令牌声明）
pub fn granted_names(scopes: &ScopeMap) -> Vec<String> {
    let mut names: Vec<String> = scopes
        .iter()
        .filter(|(_, granted)| **granted)
        .map(|(name, _)| name.clone())
        .collect();
    names.sort();
    names
}

/// 声明中的名称列表还原为授予映射
pub fn names_to_map(names: &[String]) -> ScopeMap {
    names.iter().map(|name| (name.clone(), true)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_scopes() -> ScopeMap {
        ScopeMap::from([
            ("post_images".to_string(), true),
            ("annoy_friends".to_string(), true),
            ("sleep".to_string(), false),
        ])
    }

    #[test]
    fn test_approve_request_returns_granted_subset() {
        let approved =
            approve_request(&client_scopes(), &["post_images".to_string()]).unwrap();
        assert_eq!(approved, ScopeMap::from([("post_images".to_string(), true)]));
    }

    #[test]
    fn test_unknown_scope_is_invalid_scope() {
        let result = approve_request(&client_scopes(), &["yawn".to_string()]);
        assert!(matches!(result, Err(GrantError::InvalidScope)));
    }

    #[test]
    fn test_disabled_scope_is_access_denied() {
        let result = approve_request(&client_scopes(), &["sleep".to_string()]);
        assert!(matches!(result, Err(GrantError::AccessDenied)));
    }

    #[test]
    fn test_first_failing_scope_decides() {
        // sleep（禁用）在 yawn（未注册）之前：access_denied
        let result = approve_request(
            &client_scopes(),
            &["sleep".to_string(), "yawn".to_string()],
        );
        assert!(matches!(result, Err(GrantError::AccessDenied)));

        // 顺序反过来：invalid_scope
        let result = approve_request(
            &client_scopes(),
            &["yawn".to_string(), "sleep".to_string()],
        );
        assert!(matches!(result, Err(GrantError::InvalidScope)));
    }

    #[test]
    fn test_covers() {
        let scopes = ScopeMap::from([
            ("post_images".to_string(), true),
            ("sleep".to_string(), false),
        ]);
        assert!(covers(&scopes, &["post_images".to_string()]));
        assert!(!covers(&scopes, &["sleep".to_string()]));
        assert!(!covers(&scopes, &["annoy_friends".to_string()]));
        assert!(covers(&scopes, &[]));
    }

    #[test]
    fn test_names_roundtrip() {
        let names = granted_names(&client_scopes());
        assert_eq!(names, vec!["annoy_friends".to_string(), "post_images".to_string()]);
        let map = names_to_map(&names);
        assert!(covers(&map, &names));
    }
}
