use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// A minimal mock HTTP server that answers exactly one request.
pub(crate) struct MockVendorServer {
    listener: TcpListener,
    pub base_url: String,
}

impl MockVendorServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock server");
        let port = listener.local_addr().unwrap().port();
        Self {
            listener,
            base_url: format!("http://127.0.0.1:{port}"),
        }
    }

    /// Accept one connection, reply with `status_code` and `body`, and
    /// return the raw request text.
    pub async fn respond_once(self, status_code: u16, body: &str) -> String {
        let (mut stream, _) = self.listener.accept().await.unwrap();

        let request = read_request(&mut stream).await;

        let response = format!(
            "HTTP/1.1 {status_code} OK\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.unwrap();
        request
    }
}

/// Read the request head and as much body as `Content-Length` announces.
async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = stream.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&data);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if data.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).into_owned()
}
