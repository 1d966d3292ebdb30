// Author: 金书记
//
//! Error type definitions | 错误类型定义
//!
//! Protocol failures map onto the RFC 6749 error codes; the engine never
//! emits any wire string other than the five below. Construction and backend
//! failures are separate variants with no wire representation.
//! 协议失败映射到 RFC 6749 错误码；引擎在线上只会产生下面五个字符串。
//! 构造失败和后端失败是没有线上表示的单独变体。

use authgrant_adapter::store::StoreError;
use thiserror::Error;

pub type GrantResult<T> = Result<T, GrantError>;

#[derive(Debug, Error)]
pub enum GrantError {
    // ============ Wire Errors | 线上错误 ============
    /// Malformed bearer header | 格式错误的 Bearer 头
    #[error("malformed authorization request")]
    InvalidRequest,

    /// Requested scope unknown to the client | 客户端未注册的权限范围
    #[error("requested scope is not registered for this client")]
    InvalidScope,

    /// Requested scope registered but disabled | 已注册但被禁用的权限范围
    #[error("requested scope is disabled for this client")]
    AccessDenied,

    /// Unknown client id | 未知的客户端
    #[error("client is not authorized")]
    UnauthorizedClient,

    /// Any code/token verification failure: absence, expiry, bad secret, bad
    /// redirect, replay, scope mismatch, malformed signed token. One kind by
    /// design, so callers cannot be used as an oracle.
    /// 所有授权码/令牌验证失败：不存在、过期、密钥错误、回调不匹配、重放、
    /// 范围不符、签名令牌损坏。刻意只用一个错误种类，避免被当作试探口。
    #[error("invalid grant")]
    InvalidGrant,

    // ============ Non-wire Errors | 非线上错误 ============
    /// Construction-time failure; fatal for the engine instance
    /// 构造期失败，对引擎实例是致命的
    #[error("configuration error: {0}")]
    Config(String),

    /// Backend store failure surfaced to the host | 交给宿主处理的存储后端失败
    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GrantError {
    /// RFC 6749 §5.2 / §4.1.2.1 error string, if this kind appears on the
    /// wire | 若此错误会出现在线上，返回 RFC 6749 错误字符串
    pub fn wire_code(&self) -> Option<&'static str> {
        match self {
            GrantError::InvalidRequest => Some("invalid_request"),
            GrantError::InvalidScope => Some("invalid_scope"),
            GrantError::AccessDenied => Some("access_denied"),
            GrantError::UnauthorizedClient => Some("unauthorized_client"),
            GrantError::InvalidGrant => Some("invalid_grant"),
            GrantError::Config(_) | GrantError::Storage(_) | GrantError::Internal(_) => None,
        }
    }
}

impl From<StoreError> for GrantError {
    fn from(err: StoreError) -> Self {
        match err {
            // 记录缺失和重复兑换在协议层都是 invalid_grant
            StoreError::NotFound | StoreError::AlreadyRedeemed => GrantError::InvalidGrant,
            StoreError::DuplicateRecord(key) => {
                GrantError::Storage(format!("duplicate record: {key}"))
            }
            StoreError::Backend(message) => GrantError::Storage(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_codes_are_the_rfc_five() {
        assert_eq!(GrantError::InvalidRequest.wire_code(), Some("invalid_request"));
        assert_eq!(GrantError::InvalidScope.wire_code(), Some("invalid_scope"));
        assert_eq!(GrantError::AccessDenied.wire_code(), Some("access_denied"));
        assert_eq!(
            GrantError::UnauthorizedClient.wire_code(),
            Some("unauthorized_client")
        );
        assert_eq!(GrantError::InvalidGrant.wire_code(), Some("invalid_grant"));
        assert_eq!(GrantError::Config("x".into()).wire_code(), None);
        assert_eq!(GrantError::Storage("x".into()).wire_code(), None);
    }

    #[test]
    fn test_store_error_mapping() {
        assert!(matches!(
            GrantError::from(StoreError::NotFound),
            GrantError::InvalidGrant
        ));
        assert!(matches!(
            GrantError::from(StoreError::AlreadyRedeemed),
            GrantError::InvalidGrant
        ));
        assert!(matches!(
            GrantError::from(StoreError::Backend("down".into())),
            GrantError::Storage(_)
        ));
    }
}
