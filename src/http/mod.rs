//! HTTP/1.0 协议处理
//!
//! 请求行拆分、URI 解析、请求重写、响应转发和错误页。

pub mod error;
pub mod error_page;
pub mod reader;
pub mod request;
pub mod response;
pub mod uri;

pub use error::{ProxyError, Result};
pub use reader::LineReader;
pub use request::{rewrite, RequestLine, USER_AGENT};
pub use response::{relay, HeaderScanner, RelayError, RelayOutcome, ResponseFraming};
pub use uri::{parse_uri, ParsedUri};
