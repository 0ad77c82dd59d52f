use anyhow::Result;
use clap::Parser;
use tracing::{info, error};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use getproxy::{proxy, Config};

/// 转发式 HTTP GET 代理
#[derive(Parser, Debug)]
#[command(name = "getproxy", version, about, long_about = None)]
struct Cli {
    /// 监听端口
    port: u16,

    /// 可选的 TOML 配置文件
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    // 初始化日志系统，guard 需要活到进程结束
    let _guard = init_logging(&config);

    info!("Starting getproxy...");
    if let Some(path) = &cli.config {
        info!("Configuration loaded from {}", path);
    }

    let proxy_handle = tokio::spawn(proxy::run(config, cli.port));

    tokio::select! {
        result = proxy_handle => {
            match result {
                Ok(Err(e)) => {
                    error!("Proxy failed: {:#}", e);
                    return Err(e);
                }
                Err(e) => error!("Proxy task failed: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl-C, shutting down");
        }
    }

    Ok(())
}

/// 初始化日志系统
fn init_logging(config: &Config) -> WorkerGuard {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.server.log_format == "json" {
        registry
            .with(fmt::layer().json().with_writer(writer).with_thread_ids(true))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(writer).with_target(false).with_thread_ids(true))
            .init();
    }

    guard
}
