// ABOUTME: Seals OAuth bearer tokens into opaque hex ciphertexts for cookie storage
// ABOUTME: AES-256-CBC with a fixed zero IV for wire compatibility with existing cookies

use crate::error::{ApiError, Result};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use axum::http::{header, HeaderMap};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Cookie holding the sealed OAuth access token
pub const ACCESS_COOKIE: &str = "accessToken";

/// Cookie holding the sealed OAuth refresh token
pub const REFRESH_COOKIE: &str = "refreshToken";

/// AES block size in bytes
const BLOCK_SIZE: usize = 16;

// Existing cookies were written with a fixed zero IV; changing it breaks
// every stored credential. Sealing is deterministic as a result.
const ZERO_IV: [u8; BLOCK_SIZE] = [0u8; BLOCK_SIZE];

/// Decrypted credential pair read from the request cookies
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
}

/// Encrypt a bearer token for cookie storage. Deterministic; never fails.
pub fn seal(plaintext: &str, key: &[u8; 32]) -> String {
    let ciphertext = Aes256CbcEnc::new(key.into(), (&ZERO_IV).into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
    hex::encode(ciphertext)
}

/// Decrypt a sealed token. Any malformed input (bad hex, bad length, bad
/// padding, non-UTF-8 plaintext) means the cookie was tampered with or the
/// server key changed.
pub fn unseal(token: &str, key: &[u8; 32]) -> Result<String> {
    let ciphertext =
        hex::decode(token).map_err(|e| ApiError::Decrypt(format!("invalid hex: {}", e)))?;

    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(ApiError::Decrypt(format!(
            "ciphertext length {} is not a positive multiple of the block size",
            ciphertext.len()
        )));
    }

    let plaintext = Aes256CbcDec::new(key.into(), (&ZERO_IV).into())
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|_| ApiError::Decrypt("padding validation failed".into()))?;

    String::from_utf8(plaintext).map_err(|_| ApiError::Decrypt("plaintext is not UTF-8".into()))
}

/// Extract a named cookie value from the Cookie header
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    for cookie in cookies.split(';') {
        let cookie = cookie.trim();
        if let Some(value) = cookie.strip_prefix(name) {
            if let Some(value) = value.strip_prefix('=') {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Read and decrypt the credential cookies. A missing cookie is the normal
/// unauthenticated state and returns `None`; a cookie that fails to decrypt
/// is an error.
pub fn read_credentials(headers: &HeaderMap, key: &[u8; 32]) -> Result<Option<Credentials>> {
    let (access, refresh) = match (
        cookie_value(headers, ACCESS_COOKIE),
        cookie_value(headers, REFRESH_COOKIE),
    ) {
        (Some(a), Some(r)) => (a, r),
        _ => return Ok(None),
    };

    Ok(Some(Credentials {
        access_token: unseal(&access, key)?,
        refresh_token: unseal(&refresh, key)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const KEY: [u8; 32] = [7u8; 32];

    #[test]
    fn test_seal_round_trip() {
        for token in ["ya29.a0AfH6SMC_example", "", "short", "日本語トークン"] {
            let sealed = seal(token, &KEY);
            assert_eq!(unseal(&sealed, &KEY).unwrap(), token);
        }
    }

    #[test]
    fn test_seal_is_deterministic_hex() {
        let sealed = seal("token-value", &KEY);
        assert_eq!(sealed, seal("token-value", &KEY));

        let raw = hex::decode(&sealed).unwrap();
        assert_eq!(raw.len() % BLOCK_SIZE, 0);
    }

    #[test]
    fn test_wire_compatibility_known_vector() {
        // Externally generated with AES-256-CBC, zero IV, PKCS#7:
        //   printf '%s' 'access-token-secret' | openssl enc -aes-256-cbc \
        //     -K 0707...07 -iv 0000...00 | xxd -p
        // Existing cookies were sealed with this exact scheme; any change to
        // the cipher, padding, or IV must fail here.
        let vector = "0990cbbb350510e08297ffa7d28d589bd21c7b419ce16e2a9c4a5c93d5fb6018";
        assert_eq!(seal("access-token-secret", &KEY), vector);
        assert_eq!(unseal(vector, &KEY).unwrap(), "access-token-secret");
    }

    #[test]
    fn test_unseal_rejects_bad_hex() {
        assert!(matches!(
            unseal("not hex at all!", &KEY),
            Err(ApiError::Decrypt(_))
        ));
    }

    #[test]
    fn test_unseal_rejects_bad_length() {
        // Valid hex but not a multiple of the block size
        assert!(matches!(unseal("aabbcc", &KEY), Err(ApiError::Decrypt(_))));
        assert!(matches!(unseal("", &KEY), Err(ApiError::Decrypt(_))));
    }

    #[test]
    fn test_unseal_rejects_tampered_ciphertext() {
        let mut sealed = seal("a perfectly ordinary bearer token value", &KEY);
        // Flip the last hex digit, which corrupts the padding block
        let last = sealed.pop().unwrap();
        sealed.push(if last == '0' { '1' } else { '0' });
        assert!(unseal(&sealed, &KEY).is_err());
    }

    #[test]
    fn test_unseal_rejects_foreign_key() {
        let other_key = [42u8; 32];
        let sealed = seal("a perfectly ordinary bearer token value", &other_key);
        let result = unseal(&sealed, &KEY);
        // Never silently returns the wrong plaintext
        assert!(result.is_err());
    }

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_read_credentials_missing_is_none() {
        assert!(read_credentials(&HeaderMap::new(), &KEY).unwrap().is_none());

        // Only one of the two cookies present
        let headers = headers_with_cookie(&format!("accessToken={}", seal("a", &KEY)));
        assert!(read_credentials(&headers, &KEY).unwrap().is_none());
    }

    #[test]
    fn test_read_credentials_round_trip() {
        let headers = headers_with_cookie(&format!(
            "accessToken={}; refreshToken={}; theme=dark",
            seal("access-123", &KEY),
            seal("refresh-456", &KEY)
        ));

        let creds = read_credentials(&headers, &KEY).unwrap().unwrap();
        assert_eq!(creds.access_token, "access-123");
        assert_eq!(creds.refresh_token, "refresh-456");
    }

    #[test]
    fn test_read_credentials_tampered_is_error() {
        let headers = headers_with_cookie(&format!(
            "accessToken=zzzz; refreshToken={}",
            seal("refresh-456", &KEY)
        ));
        assert!(read_credentials(&headers, &KEY).is_err());
    }
}
