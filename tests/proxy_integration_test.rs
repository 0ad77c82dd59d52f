//! 代理端到端测试
//!
//! 在本地启动一个测试源站和代理，通过真实 TCP 连接验证转发和访问日志。

use getproxy::proxy::{serve, ProxyContext, TcpConnector};
use getproxy::AccessLog;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::net::{TcpListener, TcpStream};

/// 测试源站：偶数路径返回 HTML，奇数路径返回带长度的二进制内容
async fn spawn_origin() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::spawn(async move {
                let mut reader = BufReader::new(stream);
                let mut request_line = String::new();
                reader.read_line(&mut request_line).await.unwrap();
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).await.unwrap() == 0 || line == "\r\n" {
                        break;
                    }
                }

                let path = request_line.split(' ').nth(1).unwrap_or("/").to_string();
                let response = origin_response(&path);
                let mut stream = reader.into_inner();
                stream.write_all(&response).await.unwrap();
                stream.shutdown().await.unwrap();
            });
        }
    });

    addr
}

fn origin_response(path: &str) -> Vec<u8> {
    let index: usize = path.trim_start_matches("/item").parse().unwrap_or(0);
    if index % 2 == 0 {
        let body = format!("<html>\n<p>{path}</p>\n</html>\n");
        format!("HTTP/1.0 200 OK\r\nContent-Type: text/html\r\n\r\n{body}").into_bytes()
    } else {
        let body: Vec<u8> = (0..index * 300).map(|b| (b % 251) as u8).collect();
        let mut response = format!(
            "HTTP/1.0 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\n\r\n",
            body.len()
        )
        .into_bytes();
        response.extend_from_slice(&body);
        response
    }
}

async fn spawn_proxy() -> (SocketAddr, DuplexStream) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (writer, reader) = tokio::io::duplex(1 << 20);

    let ctx = Arc::new(ProxyContext {
        connector: TcpConnector,
        access_log: AccessLog::from_writer(writer),
        max_line: 1024,
    });
    tokio::spawn(serve(listener, ctx));

    (addr, reader)
}

async fn fetch(proxy: SocketAddr, request: String) -> Vec<u8> {
    let mut stream = TcpStream::connect(proxy).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_single_html_request() {
    let origin = spawn_origin().await;
    let (proxy, log) = spawn_proxy().await;

    let response = fetch(
        proxy,
        format!("GET http://127.0.0.1:{}/item0 HTTP/1.1\r\nHost: x\r\n\r\n", origin.port()),
    )
    .await;
    assert_eq!(response, origin_response("/item0"));

    let mut lines = BufReader::new(log).lines();
    let line = lines.next_line().await.unwrap().unwrap();
    assert!(line.ends_with(&format!(" 127.0.0.1 127.0.0.1 {}", response.len())));
}

#[tokio::test]
async fn test_unsupported_method_over_tcp() {
    let (proxy, log) = spawn_proxy().await;

    // 不发送任何内容就断开的连接不产生日志
    drop(TcpStream::connect(proxy).await.unwrap());

    let response = fetch(proxy, "DELETE http://127.0.0.1:1/ HTTP/1.0\r\n\r\n".to_string()).await;
    assert!(response.starts_with(b"HTTP/1.0 501 Not Implemented\r\n"));

    let mut lines = BufReader::new(log).lines();
    let line = lines.next_line().await.unwrap().unwrap();
    assert!(line.ends_with(" 127.0.0.1 http://127.0.0.1:1/ 0"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clients_get_their_own_responses() {
    const CLIENTS: usize = 50;

    let origin = spawn_origin().await;
    let (proxy, log) = spawn_proxy().await;

    let mut handles = Vec::new();
    for i in 0..CLIENTS {
        let request = format!(
            "GET http://127.0.0.1:{}/item{} HTTP/1.0\r\n\r\n",
            origin.port(),
            i
        );
        handles.push(tokio::spawn(async move { (i, fetch(proxy, request).await) }));
    }

    let mut total = 0u64;
    for handle in handles {
        let (i, response) = handle.await.unwrap();
        assert_eq!(response, origin_response(&format!("/item{i}")), "client {i}");
        total += response.len() as u64;
    }

    let mut lines = BufReader::new(log).lines();
    let mut logged = 0u64;
    for _ in 0..CLIENTS {
        let line = lines.next_line().await.unwrap().unwrap();
        let fields: Vec<&str> = line.split(' ').collect();
        assert!(fields.len() >= 4, "malformed log line: {line:?}");
        assert_eq!(fields[fields.len() - 3], "127.0.0.1");
        assert_eq!(fields[fields.len() - 2], "127.0.0.1");
        logged += fields[fields.len() - 1].parse::<u64>().unwrap();
    }
    assert_eq!(logged, total);
}
