//! 请求行拆分与发往源站的请求重写

/// 代理固定使用的 User-Agent
pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:10.0.3) Gecko/20120305 Firefox/10.0.3";

/// 客户端请求行的三个字段，缺失的字段为空字符串
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub uri: String,
    pub version: String,
}

impl RequestLine {
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_ascii_whitespace();
        let mut next = || parts.next().unwrap_or_default().to_string();
        RequestLine {
            method: next(),
            uri: next(),
            version: next(),
        }
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// 构造发往源站的 HTTP/1.0 请求头
///
/// 不做任何校验，调用方保证 `method` 已经被检查过。
pub fn rewrite(method: &str, path: &str, host: &str, user_agent: &str) -> String {
    format!(
        "{method} /{path} HTTP/1.0\r\n\
         Host: {host}\r\n\
         User-Agent: {user_agent}\r\n\
         Connection: close\r\n\
         Proxy-Connection: close\r\n\
         \r\n"
    )
}
