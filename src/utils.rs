use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Computes the `X-Hub-Signature-256` value for `body`.
pub fn sign_payload(body: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// Checks `signature` against the HMAC-SHA256 of the raw, unparsed `body`.
///
/// Accepts only the exact form GitHub sends, `sha256=` followed by 64
/// lowercase hex digits. Anything else is a mismatch.
pub fn verify_signature(signature: &str, body: &[u8], secret: &str) -> bool {
    let Some(hex_digest) = signature.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    if !hex_digest
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return false;
    }
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
