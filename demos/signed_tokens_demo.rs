// Author: 金书记
//
//! 签名（自包含）令牌模式示例：无服务器端状态

use authgrant_rust::{ClientRecord, ClientSecret, GrantManager, ScopeMap};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("========================================");
    println!("OAuth2 授权码模式示例（签名令牌）");
    println!("========================================\n");

    // 设置共享密钥即进入签名模式：不需要存储
    let manager = GrantManager::builder()
        .client(ClientRecord::new(
            "cli_tool_001",
            ClientSecret::Plain("shhh".to_string()),
            ScopeMap::from([("read".to_string(), true)]),
        ))
        .jwt_secret("process-wide-shared-secret")
        .build()?;

    let redirect_uri = "http://localhost:8000/cb";
    let approved = manager
        .verify_client("cli_tool_001", &["read".to_string()])
        .await?;

    let code = manager
        .issue_auth_code("cli_tool_001", Some("user_42"), Some(redirect_uri), &approved)
        .await?;
    println!("授权码（JWT）: {}...\n", &code[..32]);

    let verified = manager
        .verify_auth_code("cli_tool_001", "shhh", &code, Some(redirect_uri))
        .await?;
    println!("声明中的用户: {:?}", verified.user_id);

    let pair = manager
        .issue_access_token(
            "cli_tool_001",
            verified.user_id.as_deref(),
            &verified.scopes,
            Some(&code),
        )
        .await?;
    println!("访问令牌（JWT）: {}...\n", &pair.access_token[..32]);

    let token = manager
        .verify_access_token(&pair.access_token, &["read".to_string()], false)
        .await?;
    println!("验证通过，过期时间: {:?}", token.expires_at);

    // 注意：签名模式没有重放检测，撤销需要宿主在验证之上叠加拒绝名单
    let again = manager
        .verify_auth_code("cli_tool_001", "shhh", &code, Some(redirect_uri))
        .await;
    println!("同一授权码再次验证（签名模式特性）: ok={}", again.is_ok());

    Ok(())
}
