//! API 模块常量定义

/// 会话 Cookie 的作用路径
pub const SESSION_COOKIE_PATH: &str = "/";

/// 请求体大小上限
pub const PAYLOAD_LIMIT: usize = 1024 * 1024;

pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Owner-scoped routes, guarded by the auth-only middleware.
pub const USER_SCOPE: &str = "/api/user";
