//! Client certificate inspection.
//!
//! WebID-TLS only needs two things from a certificate: the WebIDs it
//! claims (subjectAltName URIs) and its RSA public key, normalised so it
//! can be compared with the literals of a profile document.

use super::IdentityError;
use percent_encoding::percent_decode_str;
use rsa::BigUint;
use x509_parser::extensions::GeneralName;
use x509_parser::pem::parse_x509_pem;
use x509_parser::public_key::PublicKey;

/// Key type name used in profiles (`cert:RSAPublicKey`).
pub const RSA_KEY_TYPE: &str = "RSAPublicKey";

/// Comparable fingerprint of a public key.
///
/// `modulus` is lowercase hex without leading zeros, `exponent` is decimal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublicKeyId {
    pub key_type: String,
    pub modulus: String,
    pub exponent: String,
}

impl PublicKeyId {
    /// Build from big-endian modulus and exponent bytes.
    pub fn rsa(modulus: &[u8], exponent: &[u8]) -> Self {
        Self {
            key_type: RSA_KEY_TYPE.to_string(),
            modulus: normalize_hex(&hex::encode(modulus)),
            exponent: BigUint::from_bytes_be(exponent).to_string(),
        }
    }

    /// Does this key match the literals found in a profile?
    pub fn matches_literals(&self, modulus: &str, exponent: &str) -> bool {
        normalize_hex(modulus) == self.modulus && exponent.trim() == self.exponent
    }
}

/// What a client certificate claims.
#[derive(Debug, Clone)]
pub struct ClientCertificate {
    /// subjectAltName URIs, in certificate order.
    pub webids: Vec<String>,
    pub key: PublicKeyId,
}

impl ClientCertificate {
    /// The claimed WebID: the first subjectAltName URI.
    pub fn claimed_webid(&self) -> Option<&str> {
        self.webids.first().map(String::as_str)
    }

    pub fn from_der(der: &[u8]) -> Result<Self, IdentityError> {
        let (_, cert) = x509_parser::parse_x509_certificate(der)
            .map_err(|e| IdentityError::Certificate(e.to_string()))?;

        let webids = cert
            .subject_alternative_name()
            .map_err(|e| IdentityError::Certificate(e.to_string()))?
            .map(|san| {
                san.value
                    .general_names
                    .iter()
                    .filter_map(|name| match name {
                        GeneralName::URI(uri) => Some((*uri).to_string()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let key = match cert.public_key().parsed() {
            Ok(PublicKey::RSA(rsa)) => PublicKeyId::rsa(rsa.modulus, rsa.exponent),
            Ok(_) => return Err(IdentityError::UnsupportedKey),
            Err(e) => return Err(IdentityError::Certificate(e.to_string())),
        };

        Ok(Self { webids, key })
    }

    /// Parse a PEM certificate, as forwarded by a TLS-terminating proxy.
    ///
    /// Proxies usually URL-escape the PEM to fit it in one header line.
    #[cfg(test)]
    pub fn from_pem(pem: &str) -> Result<Self, IdentityError> {
        Self::from_der(&pem_to_der(pem)?)
    }
}

/// Decode a (possibly URL-escaped) PEM certificate to DER.
pub fn pem_to_der(pem: &str) -> Result<Vec<u8>, IdentityError> {
    let decoded = percent_decode_str(pem).decode_utf8_lossy();
    let (_, pem) = parse_x509_pem(decoded.as_bytes())
        .map_err(|e| IdentityError::Certificate(e.to_string()))?;
    Ok(pem.contents)
}

/// Lowercase, drop whitespace and leading zeros.
fn normalize_hex(hex: &str) -> String {
    let cleaned: String = hex
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    cleaned.trim_start_matches('0').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE_PEM: &str = include_str!("testdata/alice.pem");

    #[test]
    fn test_pem_certificate_claims() {
        let cert = ClientCertificate::from_pem(ALICE_PEM).unwrap();
        assert_eq!(
            cert.claimed_webid(),
            Some("https://alice.example.org/profile#me")
        );
        assert_eq!(cert.key.key_type, "RSAPublicKey");
        assert_eq!(cert.key.exponent, "65537");
        assert!(cert.key.modulus.starts_with("aa04c4dd"));
        assert_eq!(cert.key.modulus.len(), 512);
    }

    #[test]
    fn test_url_escaped_pem() {
        let escaped: String = ALICE_PEM
            .replace('\n', "%0A")
            .replace(' ', "%20")
            .replace('+', "%2B");
        let cert = ClientCertificate::from_pem(&escaped).unwrap();
        assert_eq!(cert.webids.len(), 1);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            ClientCertificate::from_der(b"not a certificate"),
            Err(IdentityError::Certificate(_))
        ));
        assert!(ClientCertificate::from_pem("-----BEGIN NOTHING").is_err());
    }

    #[test]
    fn test_key_literal_matching() {
        let key = PublicKeyId::rsa(&[0x00, 0xAB, 0xCD], &[0x01, 0x00, 0x01]);
        assert_eq!(key.modulus, "abcd");
        assert_eq!(key.exponent, "65537");
        assert!(key.matches_literals("00ABCD", "65537"));
        assert!(key.matches_literals("ab cd\n", " 65537 "));
        assert!(!key.matches_literals("abce", "65537"));
        assert!(!key.matches_literals("abcd", "3"));
    }
}
