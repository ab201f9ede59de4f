//! Mock HAProxy stats page for integration tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use haproxy_ctl::haproxy::{Credentials, HaproxyClient, StatsEndpoint};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A request as seen by the mock.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub target: String,
    /// Host header without the port.
    pub host: String,
    pub authorization: Option<String>,
    pub body: String,
}

pub type Responder = dyn Fn(&SeenRequest) -> (u16, String) + Send + Sync;

pub struct MockHaproxy {
    pub addr: SocketAddr,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl MockHaproxy {
    /// Serve every connection on a random local port with `respond`.
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(&SeenRequest) -> (u16, String) + Send + Sync + 'static,
    {
        Self::listen(respond, false).await
    }

    /// Like `start`, but each response announces more body than it sends and
    /// then closes the connection.
    pub async fn start_truncated<F>(respond: F) -> Self
    where
        F: Fn(&SeenRequest) -> (u16, String) + Send + Sync + 'static,
    {
        Self::listen(respond, true).await
    }

    async fn listen<F>(respond: F, truncate: bool) -> Self
    where
        F: Fn(&SeenRequest) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let respond: Arc<Responder> = Arc::new(respond);

        let log = seen.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let respond = respond.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    let _ = serve(socket, respond, log, truncate).await;
                });
            }
        });

        Self { addr, seen }
    }

    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn client(&self, credentials: Option<Credentials>) -> HaproxyClient {
        let endpoint = StatsEndpoint {
            port: self.addr.port(),
            base_path: "/haproxy?stats".to_string(),
            credentials,
        };
        HaproxyClient::new(endpoint, Duration::from_secs(5)).unwrap()
    }
}

async fn serve(
    mut socket: TcpStream,
    respond: Arc<Responder>,
    log: Arc<Mutex<Vec<SeenRequest>>>,
    truncate: bool,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let target = request_line.next().unwrap_or_default().to_string();

    let headers: HashMap<String, String> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < header_end + length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let host = headers
        .get("host")
        .map(|h| h.rsplit_once(':').map(|(name, _)| name).unwrap_or(h.as_str()).to_string())
        .unwrap_or_default();
    let request = SeenRequest {
        method,
        target,
        host,
        authorization: headers.get("authorization").cloned(),
        body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
    };

    let (status, body) = respond(&request);
    log.lock().unwrap().push(request);

    let reason = match status {
        200 => "OK",
        401 => "Unauthorized",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        if truncate { body.len() + 64 } else { body.len() },
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

pub fn stats_csv(rows: &[&str]) -> String {
    let mut csv = String::from("# pxname,svname,qcur,qmax,scur,smax,slim,stot,status,weight,\n");
    for row in rows {
        csv.push_str(row);
        csv.push('\n');
    }
    csv
}

pub const NOTICE_PAGE: &str = r#"<html><body><div class=active><a class=lfsb href="/haproxy?stats" title="Remove this message">[X]</a> Action processed successfully.</div></body></html>"#;
