use anyhow::{Context, Result};
use serde::Deserialize;
use std::ops::Range;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

pub const PORT_USED_TIMEOUT: Duration = Duration::from_secs(2);
pub const PORT_UP_TIMEOUT: Duration = Duration::from_secs(5);
pub const PUBLIC_IP_URL: &str = "https://api.ipify.org?format=json";

/// Candidate ports for a local HTTP service.
pub const SERVICE_PORT_RANGE: Range<u16> = 9000..10000;

/// True when something accepts TCP connections on `host:port` within the timeout.
pub async fn can_connect(host: &str, port: u16, limit: Duration) -> bool {
    matches!(
        timeout(limit, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    )
}

pub async fn is_port_used(host: &str, port: u16) -> bool {
    can_connect(host, port, PORT_USED_TIMEOUT).await
}

pub async fn is_port_up(port: u16) -> bool {
    can_connect("localhost", port, PORT_UP_TIMEOUT).await
}

/// First port in `range` that nothing listens on locally.
pub async fn find_available_port(range: Range<u16>) -> Option<u16> {
    for port in range {
        if !can_connect("127.0.0.1", port, PORT_USED_TIMEOUT).await {
            return Some(port);
        }
    }
    None
}

#[derive(Debug, Deserialize)]
struct PublicIp {
    ip: String,
}

/// Public address of this machine as seen by ipify.
pub async fn public_ip(url: &str) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(PORT_UP_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;

    let body: PublicIp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", url))?
        .error_for_status()
        .context("Public IP lookup returned an error status")?
        .json()
        .await
        .context("Failed to decode public IP response")?;

    Ok(body.ip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn detects_listening_and_closed_ports() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        assert!(is_port_used("127.0.0.1", port).await);

        drop(listener);
        assert!(!is_port_used("127.0.0.1", port).await);
    }

    #[tokio::test]
    async fn finds_first_free_port_in_range() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let busy = listener.local_addr().unwrap().port();

        let found = find_available_port(busy..busy.saturating_add(50)).await;
        assert!(matches!(found, Some(port) if port != busy));
    }

    #[tokio::test]
    async fn reads_ip_from_json_body() {
        let app = Router::new().route(
            "/",
            get(|| async { Json(serde_json::json!({ "ip": "203.0.113.7" })) }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let ip = public_ip(&format!("http://{}/", addr)).await.unwrap();
        assert_eq!(ip, "203.0.113.7");
    }
}
