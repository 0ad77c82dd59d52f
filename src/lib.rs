//! getproxy 库
//!
//! 转发式 HTTP 代理：只接受 GET，重写为 HTTP/1.0 请求发往源站，
//! 把响应原样转发回客户端，并为每个连接记录一行访问日志。

pub mod access_log;
pub mod config;
pub mod http;
pub mod proxy;

// 重新导出常用类型
pub use access_log::AccessLog;
pub use config::Config;
