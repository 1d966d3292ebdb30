// Author: 金书记
//
//! 授权码模式完整流程示例（不透明令牌）

use std::sync::Arc;

use authgrant_rust::{ClientRecord, ClientSecret, GrantManager, MemoryGrantStore, ScopeMap};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=debug 可以看到引擎的授权步骤日志
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("========================================");
    println!("OAuth2 授权码模式示例（不透明令牌）");
    println!("========================================\n");

    println!(">>> 步骤 1: 装配授权引擎\n");

    let store = Arc::new(MemoryGrantStore::new());
    let manager = GrantManager::builder()
        .client(ClientRecord::new(
            "web_app_001",
            ClientSecret::Plain("secret_abc123xyz".to_string()),
            ScopeMap::from([
                ("read".to_string(), true),
                ("write".to_string(), true),
                ("admin".to_string(), false),
            ]),
        ))
        .store(store.clone())
        .build()?;

    println!("客户端信息:");
    println!("  Client ID: web_app_001");
    println!("  Scopes: read=true, write=true, admin=false\n");

    println!(">>> 步骤 2: 客户端验证与范围检查\n");

    let redirect_uri = "http://localhost:3000/callback";
    let requested = vec!["read".to_string(), "write".to_string()];
    let approved = manager.verify_client("web_app_001", &requested).await?;
    println!("批准的范围: {:?}\n", approved);

    // admin 被禁用，请求它会得到 access_denied
    let denied = manager
        .verify_client("web_app_001", &["admin".to_string()])
        .await;
    println!("请求 admin 范围: {:?}\n", denied.err().map(|e| e.wire_code()));

    println!(">>> 步骤 3: 用户授权 - 签发授权码\n");

    if !manager.resource_owner_approves("web_app_001", &requested).await {
        return Err("resource owner did not approve".into());
    }

    let code = manager
        .issue_auth_code("web_app_001", Some("user_10086"), Some(redirect_uri), &approved)
        .await?;
    println!("授权码: {}...\n", &code[..24]);

    println!(">>> 步骤 4: 兑换授权码\n");

    let verified = manager
        .verify_auth_code("web_app_001", "secret_abc123xyz", &code, Some(redirect_uri))
        .await?;
    let pair = manager
        .issue_access_token(
            "web_app_001",
            verified.user_id.as_deref(),
            &verified.scopes,
            Some(&code),
        )
        .await?;
    println!("访问令牌: {}...", &pair.access_token[..24]);
    println!("刷新令牌: {}...", &pair.refresh_token[..24]);
    println!("有效期: {} 秒\n", pair.expires_in);

    println!(">>> 步骤 5: 携带 Bearer 头访问受保护资源\n");

    let header = format!("Bearer {}", pair.access_token);
    let token = manager
        .verify_token_and_scope(Some(&header), &["read".to_string()], None)
        .await?;
    println!("验证通过，client_id: {}\n", token.client_id);

    println!(">>> 步骤 6: 授权码重放 - 级联撤销\n");

    let replay = manager
        .verify_auth_code("web_app_001", "secret_abc123xyz", &code, Some(redirect_uri))
        .await;
    println!("第二次兑换: {:?}", replay.err().map(|e| e.wire_code()));

    let revoked = manager
        .verify_token_and_scope(Some(&header), &["read".to_string()], None)
        .await;
    println!("被级联撤销的访问令牌: {:?}\n", revoked.err().map(|e| e.wire_code()));

    println!(">>> 步骤 7: 刷新令牌轮换\n");

    // 重放已经撤销了第一对令牌，重新走一遍授权
    let code = manager
        .issue_auth_code("web_app_001", Some("user_10086"), Some(redirect_uri), &approved)
        .await?;
    let verified = manager
        .verify_auth_code("web_app_001", "secret_abc123xyz", &code, Some(redirect_uri))
        .await?;
    let pair = manager
        .issue_access_token(
            "web_app_001",
            verified.user_id.as_deref(),
            &verified.scopes,
            Some(&code),
        )
        .await?;

    let rotated = manager
        .refresh_access_token("web_app_001", &pair.refresh_token, None)
        .await?;
    println!("新的访问令牌: {}...", &rotated.access_token[..24]);

    let old = manager
        .refresh_access_token("web_app_001", &pair.refresh_token, None)
        .await;
    println!("旧刷新令牌再次兑换: {:?}", old.err().map(|e| e.wire_code()));

    println!("\n========================================");
    println!("示例结束");
    println!("========================================");
    Ok(())
}
