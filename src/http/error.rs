//! HTTP 代理错误类型

use thiserror::Error;

/// 处理单个连接时可能出现的错误
///
/// 所有错误都只影响出错的那个连接，不会传播到监听循环。
#[derive(Error, Debug)]
pub enum ProxyError {
    /// URI 缺少 `http://` 前缀或无法解析
    #[error("Malformed URI: {0}")]
    MalformedUri(String),

    /// 只支持 GET
    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    /// 无法连接到源站
    #[error("Failed to connect to origin {host}:{port}: {source}")]
    OriginConnect {
        host: String,
        port: String,
        #[source]
        source: std::io::Error,
    },

    /// 客户端未发送请求行就关闭了连接
    #[error("Client closed connection before sending a request line")]
    EmptyRequest,

    /// 任一侧 socket 的读写错误
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    /// 需要向客户端返回错误页时对应的状态码和短消息
    pub fn status(&self) -> Option<(u16, &'static str)> {
        match self {
            ProxyError::UnsupportedMethod(_) => Some((501, "Not Implemented")),
            ProxyError::MalformedUri(_) => Some((505, "Malformed URI")),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
