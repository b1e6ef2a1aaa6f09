//! Request signing for the Binance futures API

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::common::errors::{Result, StrategyError};

type HmacSha256 = Hmac<Sha256>;

/// Compute the HMAC-SHA256 signature over a query string, hex-encoded,
/// as required for Binance signed endpoints.
pub fn sign_query(secret: &str, query: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| StrategyError::Authentication(format!("Failed to create HMAC: {}", e)))?;
    mac.update(query.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Append `timestamp`, `recvWindow` and `signature` parameters to a query
/// string, producing the final signed query.
pub fn signed_query(secret: &str, query: &str, recv_window_ms: u64) -> Result<String> {
    let timestamp = chrono::Utc::now().timestamp_millis();
    let base = if query.is_empty() {
        format!("timestamp={}&recvWindow={}", timestamp, recv_window_ms)
    } else {
        format!("{}&timestamp={}&recvWindow={}", query, timestamp, recv_window_ms)
    };
    let signature = sign_query(secret, &base)?;
    Ok(format!("{}&signature={}", base, signature))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_query_known_vector() {
        // Example vector from the Binance API documentation
        let secret = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        let sig = sign_query(secret, query).unwrap();
        assert_eq!(
            sig,
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn test_signed_query_shape() {
        let signed = signed_query("secret", "symbol=BTCUSDT", 5000).unwrap();
        assert!(signed.starts_with("symbol=BTCUSDT&timestamp="));
        assert!(signed.contains("&recvWindow=5000&"));
        let sig = signed.rsplit("signature=").next().unwrap();
        // hex-encoded SHA-256 HMAC is 64 chars
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
