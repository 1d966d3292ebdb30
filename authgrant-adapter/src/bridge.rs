// Author: 金书记
//
//! Resource-Owner Bridge | 资源所有者桥接
//!
//! The core never renders a login page or a consent screen. These two hooks
//! are how the host reports login state and consent outcome; the engine
//! consults them, the host acts on them.
//! 核心不渲染登录页或授权确认页。宿主通过这两个钩子报告登录状态和确认结果；
//! 引擎只负责查询，由宿主执行动作。

use async_trait::async_trait;

/// Host hooks for resource-owner interaction | 资源所有者交互的宿主钩子
///
/// Both hooks default to `true`, which enables the trivial single-process
/// development mode where every grant is approved.
/// 两个钩子默认返回 `true`，即所有授权都被批准的单进程开发模式。
#[async_trait]
pub trait ResourceOwnerBridge: Send + Sync {
    /// `true` means a resource owner is authenticated; `false` means the
    /// host has initiated its login flow instead.
    /// `true` 表示资源所有者已认证；`false` 表示宿主已转入其登录流程。
    async fn login_resource_owner(&self) -> bool {
        true
    }

    /// `true` = allow, `false` = deny; a host that needs a consent page
    /// returns `false` after redirecting.
    /// `true` 表示允许，`false` 表示拒绝；需要确认页的宿主在重定向后返回 `false`。
    async fn confirm_by_resource_owner(&self, _client_id: &str, _scopes: &[String]) -> bool {
        true
    }
}

/// 全部放行的默认桥接，用于开发和测试
pub struct PermissiveBridge;

#[async_trait]
impl ResourceOwnerBridge for PermissiveBridge {}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permissive_bridge_defaults() {
        let bridge = PermissiveBridge;
        assert!(bridge.login_resource_owner().await);
        assert!(
            bridge
                .confirm_by_resource_owner("app_001", &["read".to_string()])
                .await
        );
    }
}
