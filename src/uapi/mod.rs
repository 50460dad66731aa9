//! Translation of a parsed [`WgConfig`] into the engine's control protocol.
//!
//! The control document is an ordered sequence of `key=value` lines. The
//! engine's protocol is stateful: interface-level lines come first, then each
//! peer opens with its `public_key` line and every following line amends that
//! peer until the next `public_key`. Keys are emitted as lowercase hex
//! regardless of the file's base64 encoding, and the `Address` field is never
//! emitted -- it belongs to host addressing, not to the engine.

use std::fmt::Write as _;
use std::time::Duration;

use tokio::net::lookup_host;
use tracing::{debug, warn};

use crate::config::WgConfig;

/// Bound on endpoint DNS resolution so a Start cannot hang on a slow
/// resolver.
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Render the control document for a parsed configuration.
///
/// Endpoint resolution failures are not errors: the literal `host:port` is
/// passed through verbatim and the engine decides whether to reject it.
/// Retry and re-resolution timing are the engine's concern.
pub async fn render(config: &WgConfig) -> String {
    let mut doc = String::new();

    if let Some(key) = &config.private_key {
        let _ = writeln!(doc, "private_key={}", key.to_hex());
    }
    if let Some(port) = config.listen_port {
        let _ = writeln!(doc, "listen_port={}", port);
    }

    for peer in &config.peers {
        // Without a public_key line there is no peer to amend; emitting the
        // rest would bleed into the previous peer's state.
        let Some(public_key) = &peer.public_key else {
            warn!("skipping [Peer] section without a PublicKey");
            continue;
        };
        let _ = writeln!(doc, "public_key={}", public_key.to_hex());

        for net in &peer.allowed_ips {
            let _ = writeln!(doc, "allowed_ip={}", net);
        }

        if let Some(endpoint) = &peer.endpoint {
            let _ = writeln!(doc, "endpoint={}", resolve_endpoint(endpoint).await);
        }
    }

    doc
}

/// Resolve `host:port` to a concrete socket address, falling back to the
/// literal text when resolution fails or times out.
async fn resolve_endpoint(raw: &str) -> String {
    match tokio::time::timeout(RESOLVE_TIMEOUT, lookup_host(raw)).await {
        Ok(Ok(mut addrs)) => match addrs.next() {
            Some(addr) => addr.to_string(),
            None => raw.to_string(),
        },
        Ok(Err(e)) => {
            debug!(endpoint = raw, error = %e, "endpoint resolution failed, passing literal through");
            raw.to_string()
        }
        Err(_) => {
            warn!(endpoint = raw, "endpoint resolution timed out, passing literal through");
            raw.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> WgConfig {
        WgConfig::parse(text).unwrap()
    }

    #[tokio::test]
    async fn interface_lines_precede_peer_lines() {
        let config = parse(
            "[Interface]\n\
             PrivateKey = QUJDREVGR0hJSktMTU5PUFFSU1RVVldYWVowMTIzNDU=\n\
             ListenPort = 51820\n\
             Address = 10.0.0.2/24\n\
             [Peer]\n\
             PublicKey = QUJDREVGR0hJSktMTU5PUFFSU1RVVldYWVowMTIzNDU=\n\
             AllowedIPs = 0.0.0.0/0\n",
        );
        let doc = render(&config).await;
        let lines: Vec<&str> = doc.lines().collect();
        assert_eq!(lines[0], format!("private_key={}", hex::encode(b"ABCDEFGHIJKLMNOPQRSTUVWXYZ012345")));
        assert_eq!(lines[1], "listen_port=51820");
        assert_eq!(lines[2], format!("public_key={}", hex::encode(b"ABCDEFGHIJKLMNOPQRSTUVWXYZ012345")));
        assert_eq!(lines[3], "allowed_ip=0.0.0.0/0");
    }

    #[tokio::test]
    async fn address_is_never_emitted() {
        let config = parse("[Interface]\nAddress = 10.0.0.2/24\nListenPort = 51820\n");
        let doc = render(&config).await;
        assert!(!doc.contains("10.0.0.2"));
        assert!(!doc.contains("address"));
    }

    #[tokio::test]
    async fn allowed_ips_expand_one_line_each_in_order() {
        let config = parse(
            "[Peer]\n\
             PublicKey = QUJDREVGR0hJSktMTU5PUFFSU1RVVldYWVowMTIzNDU=\n\
             AllowedIPs = 10.0.0.0/24, 10.0.1.0/24\n",
        );
        let doc = render(&config).await;
        let allowed: Vec<&str> = doc.lines().filter(|l| l.starts_with("allowed_ip=")).collect();
        assert_eq!(allowed, vec!["allowed_ip=10.0.0.0/24", "allowed_ip=10.0.1.0/24"]);
    }

    #[tokio::test]
    async fn unresolvable_endpoint_passes_through_verbatim() {
        let config = parse(
            "[Peer]\n\
             PublicKey = QUJDREVGR0hJSktMTU5PUFFSU1RVVldYWVowMTIzNDU=\n\
             Endpoint = no-such-host.invalid:51820\n",
        );
        let doc = render(&config).await;
        assert!(doc.contains("endpoint=no-such-host.invalid:51820"));
    }

    #[tokio::test]
    async fn numeric_endpoint_resolves_to_itself() {
        let config = parse(
            "[Peer]\n\
             PublicKey = QUJDREVGR0hJSktMTU5PUFFSU1RVVldYWVowMTIzNDU=\n\
             Endpoint = 203.0.113.5:51820\n",
        );
        let doc = render(&config).await;
        assert!(doc.contains("endpoint=203.0.113.5:51820"));
    }

    #[tokio::test]
    async fn key_encoding_round_trips_for_arbitrary_keys() {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine as _;

        for seed in 0..16u8 {
            let raw: [u8; 32] = core::array::from_fn(|i| seed.wrapping_mul(37).wrapping_add(i as u8));
            let text = format!("[Interface]\nPrivateKey = {}\n", STANDARD.encode(raw));
            let doc = render(&parse(&text)).await;
            assert_eq!(doc.trim_end(), format!("private_key={}", hex::encode(raw)));
        }
    }

    #[tokio::test]
    async fn peer_without_public_key_is_skipped() {
        let config = parse("[Peer]\nAllowedIPs = 10.0.0.0/24\n");
        let doc = render(&config).await;
        assert!(doc.is_empty());
    }
}
