use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Only the authentication service signs sessions in production; we need
/// this to mint cookies in tests.
#[cfg(test)]
pub fn get_digest(secret: &[u8], val: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length, so this cannot fail
    let mut mac = HmacSha256::new_from_slice(secret)
        .expect("hmac can init with any key length");
    mac.update(val);

    mac.finalize().into_bytes().to_vec()
}

pub fn is_valid(secret: &[u8], val: &[u8], digest: &[u8]) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(val);

    mac.verify_slice(digest).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_round_trip() {
        let digest = get_digest(b"foo", b"hello");
        assert!(is_valid(b"foo", b"hello", &digest));
        assert!(!is_valid(b"bar", b"hello", &digest));
        assert!(!is_valid(b"foo", b"hellO", &digest));
    }
}
