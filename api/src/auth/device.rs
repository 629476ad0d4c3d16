use axum::http::HeaderMap;
use axum::http::header::{ACCEPT_ENCODING, ACCEPT_LANGUAGE, USER_AGENT};
use sha2::{Digest, Sha256};

/// Derives an opaque device identifier from stable request headers.
///
/// SHA-256 over `User-Agent | Accept-Language | Accept-Encoding`. This is a
/// weak identity: identical browser configurations on different machines
/// collide, and a client can change its own headers. It is good enough to
/// stop casual buddy-marking from one phone, which is all the device lock
/// promises.
pub fn fingerprint(headers: &HeaderMap) -> String {
    let part = |name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    };

    let mut hasher = Sha256::new();
    hasher.update(part(&USER_AGENT));
    hasher.update(b"|");
    hasher.update(part(&ACCEPT_LANGUAGE));
    hasher.update(b"|");
    hasher.update(part(&ACCEPT_ENCODING));
    hex::encode(hasher.finalize())
}

/// Best-effort client address for the session audit column.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
