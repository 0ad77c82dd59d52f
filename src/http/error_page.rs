//! 返回给客户端的 HTML 错误页

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// 生成完整的错误响应（状态行、头部和 HTML 正文）
pub fn render(code: u16, short_msg: &str, long_msg: &str, cause: &str) -> String {
    let body = format!(
        "<html><title>Proxy Error</title>\
         <body bgcolor=\"ffffff\">\r\n\
         {code}: {short_msg}\r\n\
         <p>{long_msg}: {cause}\r\n\
         <hr><em>getproxy</em>\r\n"
    );

    format!(
        "HTTP/1.0 {code} {short_msg}\r\n\
         Content-type: text/html\r\n\
         Content-length: {}\r\n\
         \r\n\
         {body}",
        body.len()
    )
}

/// 把错误响应写入客户端，返回写入的字节数
pub async fn send<W>(
    client: &mut W,
    code: u16,
    short_msg: &str,
    long_msg: &str,
    cause: &str,
) -> std::io::Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let response = render(code, short_msg, long_msg, cause);
    client.write_all(response.as_bytes()).await?;
    client.flush().await?;
    Ok(response.len())
}
