// Author: 金书记
//
//! 不透明令牌生成器
//!
//! 令牌字符串不携带任何可恢复的信息，验证完全依赖存储查询。

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use rand::{Rng, RngCore};

/// 不透明令牌生成器 | Opaque Token Generator
///
/// 拼接当前秒数、微秒数、一个均匀随机的 64 位值和 30 字节加密随机串，
/// 再做 URL 安全的 base64 编码。随机部分超过 256 位熵，碰撞概率可以忽略。
pub struct OpaqueTokenCodec;

impl OpaqueTokenCodec {
    /// 生成一个新的不透明令牌字符串
    pub fn encode() -> String {
        let now = Utc::now();
        let mut rng = rand::rng();

        let salt: u64 = rng.random();
        let mut tail = [0u8; 30];
        rng.fill_bytes(&mut tail);

        let raw = format!(
            "{}-{}-{}-{}",
            now.timestamp(),
            now.timestamp_subsec_micros(),
            salt,
            URL_SAFE_NO_PAD.encode(tail),
        );
        URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let a = OpaqueTokenCodec::encode();
        let b = OpaqueTokenCodec::encode();
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_is_transport_safe() {
        let token = OpaqueTokenCodec::encode();
        assert!(!token.is_empty());
        // URL 安全字母表，无填充
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_token_carries_no_padding_and_decodes() {
        let token = OpaqueTokenCodec::encode();
        let decoded = URL_SAFE_NO_PAD.decode(token.as_bytes()).unwrap();
        let raw = String::from_utf8(decoded).unwrap();
        // 前两段是秒和微秒
        let mut parts = raw.splitn(4, '-');
        assert!(parts.next().unwrap().parse::<i64>().is_ok());
        assert!(parts.next().unwrap().parse::<u32>().is_ok());
        assert!(parts.next().unwrap().parse::<u64>().is_ok());
        assert!(!parts.next().unwrap().is_empty());
    }
}
