//! API 模块常量定义

/// API 路由前缀
pub const API_PREFIX: &str = "/api";

/// SSE 端点路径后缀
pub const STREAM_PATH_SUFFIX: &str = "/stream";

/// SSE 端点可用的 token 查询参数（EventSource 无法设置 Authorization）
pub const STREAM_TOKEN_PARAM: &str = "access_token";

/// 网关 webhook 签名头
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// SSE 心跳间隔（秒）
pub const SSE_KEEPALIVE_SECS: u64 = 15;
