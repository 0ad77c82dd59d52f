//! 绝对 URI 解析器

use crate::http::{ProxyError, Result};

const SCHEME: &str = "http://";
const DEFAULT_PORT: &str = "80";

/// 主机名结束的分隔符
const HOST_DELIMITERS: &[char] = &[' ', ':', '/', '\r', '\n', '\0'];
/// 端口结束的分隔符
const PORT_DELIMITERS: &[char] = &[' ', '/', '\r', '\n', '\0'];

/// 从请求 URI 中解析出的目标
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUri {
    pub host: String,
    /// 原样保留的端口字符串，不做数字校验
    pub port: String,
    /// 不含前导 `/` 的路径
    pub path: String,
}

/// 把 `http://host[:port][/path]` 分解为主机、端口和路径
///
/// # 示例
/// ```
/// use getproxy::http::parse_uri;
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
///
/// let uri = parse_uri("http://example.com:8080/a/b")?;
/// assert_eq!(uri.host, "example.com");
/// assert_eq!(uri.port, "8080");
/// assert_eq!(uri.path, "a/b");
/// # Ok(()) }
/// ```
pub fn parse_uri(uri: &str) -> Result<ParsedUri> {
    let rest = match uri.get(..SCHEME.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(SCHEME) => &uri[SCHEME.len()..],
        _ => return Err(ProxyError::MalformedUri(uri.to_string())),
    };

    let host_end = rest.find(HOST_DELIMITERS).unwrap_or(rest.len());
    let host = &rest[..host_end];
    if host.is_empty() {
        return Err(ProxyError::MalformedUri(uri.to_string()));
    }

    let port = match rest[host_end..].strip_prefix(':') {
        Some(after) => {
            let end = after.find(PORT_DELIMITERS).unwrap_or(after.len());
            &after[..end]
        }
        None => DEFAULT_PORT,
    };

    let path = match rest.find('/') {
        Some(idx) => &rest[idx + 1..],
        None => "",
    };

    Ok(ParsedUri {
        host: host.to_string(),
        port: port.to_string(),
        path: path.to_string(),
    })
}
