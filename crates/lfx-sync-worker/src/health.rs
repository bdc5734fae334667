//! Lightweight HTTP sidecar for liveness and readiness probes.
//!
//! Runs on a separate port alongside the consumer loop and speaks just
//! enough HTTP/1.1 for orchestrator probes:
//! - `GET /health` (alias `/livez`) — liveness, 200 once the process
//!   serves
//! - `GET /ready` (alias `/readyz`) — readiness, 503 until the consumer
//!   is bound or whenever the broker connection drops
//!
//! Every response body is the same tiny JSON shape; nothing else is
//! served here.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lfx_sync_broker::BrokerClient;

/// Readiness flag flipped by bootstrap once the consumer is bound.
pub type ReadyFlag = Arc<AtomicBool>;

/// The two probes the sidecar answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    Liveness,
    Readiness,
}

/// HTTP sidecar serving the observability endpoints.
pub struct HealthSidecar {
    listener: TcpListener,
    broker: BrokerClient,
    ready: ReadyFlag,
}

impl HealthSidecar {
    /// Binds the sidecar listener.
    pub async fn bind(
        addr: SocketAddr,
        broker: BrokerClient,
        ready: ReadyFlag,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("health sidecar listening on {addr}");
        Ok(Self {
            listener,
            broker,
            ready,
        })
    }

    /// Serves connections until cancellation. Connections are not kept
    /// alive; these are single-shot probe requests.
    pub async fn serve(self, cancel: CancellationToken) {
        loop {
            let accepted = tokio::select! {
                () = cancel.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };
            let (mut stream, addr) = match accepted {
                Ok(pair) => pair,
                Err(error) => {
                    warn!(%error, "health accept error");
                    continue;
                }
            };
            debug!("health connection from {addr}");

            // Small buffer — probe requests carry no body worth reading
            let mut buf = [0u8; 1024];
            let n = match stream.read(&mut buf).await {
                Ok(0) => continue,
                Ok(n) => n,
                Err(error) => {
                    warn!(%error, "health read error from {addr}");
                    continue;
                }
            };

            let request = String::from_utf8_lossy(&buf[..n]);
            let response = match parse_probe(&request) {
                Ok(probe) => self.answer(probe),
                Err(status) => probe_response(status, "error"),
            };

            if let Err(error) = stream.write_all(response.as_bytes()).await {
                debug!(%error, "health write error to {addr}");
            }
        }
    }

    fn answer(&self, probe: Probe) -> String {
        match probe {
            Probe::Liveness => probe_response(200, "ok"),
            Probe::Readiness => {
                if readiness_status(self.ready.load(Ordering::SeqCst), self.broker.is_connected())
                {
                    probe_response(200, "ready")
                } else {
                    probe_response(503, "not ready")
                }
            }
        }
    }
}

/// Decodes which probe a raw request head is asking for. Only bare GETs
/// on the known probe paths qualify; query strings are tolerated because
/// some probe frameworks append cache busters. The error side carries
/// the HTTP status to answer with.
fn parse_probe(request: &str) -> Result<Probe, u16> {
    let mut head = request.split_whitespace();
    let (Some(method), Some(target)) = (head.next(), head.next()) else {
        return Err(400);
    };
    if method != "GET" {
        return Err(405);
    }
    match target.split('?').next().unwrap_or(target) {
        "/health" | "/livez" => Ok(Probe::Liveness),
        "/ready" | "/readyz" => Ok(Probe::Readiness),
        _ => Err(404),
    }
}

/// Ready iff the consumer is bound and the broker connection is up.
fn readiness_status(consumer_bound: bool, broker_connected: bool) -> bool {
    consumer_bound && broker_connected
}

/// Renders a complete one-shot probe response. The sidecar speaks only
/// JSON, so the body is always `{"status": ...}` and the content type is
/// fixed.
fn probe_response(status: u16, state: &str) -> String {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        503 => "Service Unavailable",
        _ => "Unknown",
    };
    let body = format!("{{\"status\":\"{state}\"}}");

    let mut response = String::with_capacity(96 + body.len());
    response.push_str(&format!("HTTP/1.1 {status} {reason}\r\n"));
    response.push_str("Content-Type: application/json\r\n");
    response.push_str(&format!("Content-Length: {}\r\n", body.len()));
    response.push_str("Connection: close\r\n\r\n");
    response.push_str(&body);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_probe_known_paths() {
        assert_eq!(
            parse_probe("GET /ready HTTP/1.1\r\nHost: localhost\r\n"),
            Ok(Probe::Readiness)
        );
        assert_eq!(parse_probe("GET /health HTTP/1.1\r\n"), Ok(Probe::Liveness));
        assert_eq!(parse_probe("GET /livez HTTP/1.1\r\n"), Ok(Probe::Liveness));
        assert_eq!(parse_probe("GET /readyz HTTP/1.1\r\n"), Ok(Probe::Readiness));
    }

    #[test]
    fn parse_probe_tolerates_query_strings() {
        assert_eq!(
            parse_probe("GET /ready?ts=123 HTTP/1.1\r\n"),
            Ok(Probe::Readiness)
        );
    }

    #[test]
    fn parse_probe_rejects_by_status() {
        assert_eq!(parse_probe("POST /health HTTP/1.1\r\n"), Err(405));
        assert_eq!(parse_probe("GET /metrics HTTP/1.1\r\n"), Err(404));
        assert_eq!(parse_probe(""), Err(400));
    }

    #[test]
    fn readiness_requires_both() {
        assert!(readiness_status(true, true));
        assert!(!readiness_status(false, true));
        assert!(!readiness_status(true, false));
    }

    #[test]
    fn probe_response_is_json() {
        let resp = probe_response(503, "not ready");
        assert!(resp.starts_with("HTTP/1.1 503 Service Unavailable\r\n"));
        assert!(resp.contains("Content-Type: application/json\r\n"));
        assert!(resp.contains("Content-Length: 22\r\n"));
        assert!(resp.ends_with("{\"status\":\"not ready\"}"));
    }
}
