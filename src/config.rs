use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use anyhow::{Result, Context, bail};

use crate::http::reader::DEFAULT_MAX_LINE;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听 IP，端口由命令行指定 (例如: "0.0.0.0")
    #[serde(default = "default_bind_addr")]
    pub bind_addr: IpAddr,
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 日志格式: json, pretty
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// 访问日志路径，以追加模式写入
    #[serde(default = "default_access_log")]
    pub access_log: PathBuf,
    /// 单行/单块读取上限(字节)
    #[serde(default = "default_max_line")]
    pub max_line: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            access_log: default_access_log(),
            max_line: default_max_line(),
        }
    }
}

/// 太小的缓冲区连状态行都放不下
const MIN_MAX_LINE: usize = 16;

// 默认值函数
fn default_bind_addr() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_access_log() -> PathBuf {
    PathBuf::from("proxy.log")
}

fn default_max_line() -> usize {
    DEFAULT_MAX_LINE
}

impl Config {
    /// 从文件加载配置
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))
    }

    /// 从 TOML 文本解析并校验配置
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.proxy.max_line < MIN_MAX_LINE {
            bail!(
                "proxy.max_line must be at least {} bytes, got {}",
                MIN_MAX_LINE,
                self.proxy.max_line
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parsing() {
        let toml_str = r#"
[server]
bind_addr = "127.0.0.1"
log_level = "debug"
log_format = "json"

[proxy]
access_log = "/var/log/getproxy.log"
max_line = 4096
"#;

        let config = Config::parse(toml_str).unwrap();
        assert_eq!(config.server.bind_addr, IpAddr::from([127, 0, 0, 1]));
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.server.log_format, "json");
        assert_eq!(config.proxy.access_log, PathBuf::from("/var/log/getproxy.log"));
        assert_eq!(config.proxy.max_line, 4096);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.bind_addr, IpAddr::from([0, 0, 0, 0]));
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.server.log_format, "pretty");
        assert_eq!(config.proxy.access_log, PathBuf::from("proxy.log"));
        assert_eq!(config.proxy.max_line, DEFAULT_MAX_LINE);
    }

    #[test]
    fn test_partial_section_defaults() {
        let toml_str = r#"
[proxy]
max_line = 1024
"#;

        let config = Config::parse(toml_str).unwrap();
        assert_eq!(config.proxy.max_line, 1024);
        assert_eq!(config.proxy.access_log, PathBuf::from("proxy.log"));
        assert_eq!(config.server.log_level, "info");
    }

    #[test]
    fn test_rejects_tiny_max_line() {
        let toml_str = r#"
[proxy]
max_line = 4
"#;

        assert!(Config::parse(toml_str).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(Config::load("/nonexistent/getproxy.toml").is_err());
    }
}
