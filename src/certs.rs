//! Certificate classification and client-certificate enumeration.
//!
//! Classification answers one question: is this certificate signed with one
//! of the recognized national algorithms? Enumeration filters the platform's
//! personal store down to certificates actually usable for client
//! authentication. Malformed input is never an error here, only a non-match.

use bytes::Bytes;
use x509_parser::prelude::*;

use crate::error::{Error, Result};

/// GOST R 34.11/34.10-2001 signature algorithm.
pub const OID_GOST_2001_SIGN: &str = "1.2.643.2.2.3";
/// GOST R 34.11-2012 256-bit signature algorithm.
pub const OID_GOST_2012_256_SIGN: &str = "1.2.643.7.1.1.3.2";
/// GOST R 34.11-2012 512-bit signature algorithm.
pub const OID_GOST_2012_512_SIGN: &str = "1.2.643.7.1.1.3.3";

/// Check whether a dotted OID names a recognized GOST signature algorithm.
pub fn is_gost_signature_oid(oid: &str) -> bool {
    matches!(
        oid,
        OID_GOST_2001_SIGN | OID_GOST_2012_256_SIGN | OID_GOST_2012_512_SIGN
    )
}

/// Classify a DER-encoded certificate by its signature algorithm.
///
/// Pure function of the signatureAlgorithm field; malformed DER is `false`.
pub fn is_gost_certificate(der: &[u8]) -> bool {
    let Ok((_, cert)) = parse_x509_certificate(der) else {
        return false;
    };
    is_gost_signature_oid(&cert.signature_algorithm.algorithm.to_id_string())
}

/// One candidate from the platform's personal certificate store.
#[derive(Debug, Clone)]
pub struct StoreCandidate {
    /// DER-encoded certificate
    pub der: Bytes,
    /// Whether the store links this certificate to a private-key provider
    pub has_private_key: bool,
}

/// Platform personal certificate store, external to the core.
pub trait CertStore: Send + Sync {
    /// Enumerate the personal store. Implementations report a failure to
    /// open the store as an error; filtering is the bridge's job.
    fn personal_certs(&self) -> Result<Vec<StoreCandidate>>;
}

/// Enumerate client certificates usable for an alternate-suite handshake.
///
/// Keeps candidates with a digital-signature key-usage bit, validity covering
/// `now_unix`, and a linked private-key provider. An unopenable store yields
/// an empty set, not an error.
pub fn eligible_client_certs(store: &dyn CertStore, now_unix: i64) -> Vec<Bytes> {
    let candidates = match store.personal_certs() {
        Ok(candidates) => candidates,
        Err(err) => {
            tracing::warn!(%err, "personal certificate store unavailable");
            return Vec::new();
        }
    };

    candidates
        .into_iter()
        .filter(|c| c.has_private_key && is_signing_cert_at(&c.der, now_unix))
        .map(|c| c.der)
        .collect()
}

fn is_signing_cert_at(der: &[u8], now_unix: i64) -> bool {
    let Ok((_, cert)) = parse_x509_certificate(der) else {
        return false;
    };

    let signs = match cert.tbs_certificate.key_usage() {
        Ok(Some(usage)) => usage.value.digital_signature(),
        _ => false,
    };
    if !signs {
        return false;
    }

    ASN1Time::from_timestamp(now_unix)
        .map(|now| cert.tbs_certificate.validity.is_valid_at(now))
        .unwrap_or(false)
}

/// Fetch the peer-issuer-name list from an engine handle's enumeration.
///
/// Thin validation shim: the engine reporting "no list" is an error at the
/// certificate-selection step (the host must not proceed with an incomplete
/// identity list), while an empty list is a legal answer.
pub(crate) fn issuer_names_checked(names: Option<Vec<Bytes>>) -> Result<Vec<Bytes>> {
    names.ok_or(Error::IssuerList)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::der;

    #[test]
    fn test_oid_recognition() {
        assert!(is_gost_signature_oid(OID_GOST_2001_SIGN));
        assert!(is_gost_signature_oid(OID_GOST_2012_256_SIGN));
        assert!(is_gost_signature_oid(OID_GOST_2012_512_SIGN));

        assert!(!is_gost_signature_oid("1.2.840.113549.1.1.11")); // sha256WithRSA
        assert!(!is_gost_signature_oid("1.2.643.7.1.1.3")); // prefix only
        assert!(!is_gost_signature_oid(""));
    }

    #[test]
    fn test_classification_of_generated_certs() {
        assert!(is_gost_certificate(&der::certificate(
            der::OID_GOST_2012_256,
            None
        )));
        assert!(is_gost_certificate(&der::certificate(der::OID_GOST_2001, None)));
        assert!(!is_gost_certificate(&der::certificate(
            der::OID_SHA256_RSA,
            None
        )));
    }

    #[test]
    fn test_malformed_input_is_not_a_match() {
        assert!(!is_gost_certificate(b""));
        assert!(!is_gost_certificate(b"\x30\x03\x02\x01\x01"));
        assert!(!is_gost_certificate(&[0xFF; 64]));
    }

    struct FixedStore(Result<Vec<StoreCandidate>>);

    impl CertStore for FixedStore {
        fn personal_certs(&self) -> Result<Vec<StoreCandidate>> {
            match &self.0 {
                Ok(c) => Ok(c.clone()),
                Err(_) => Err(Error::cert_store("cannot open")),
            }
        }
    }

    #[test]
    fn test_enumeration_filters() {
        let eligible = der::certificate(der::OID_GOST_2012_256, Some(der::DIGITAL_SIGNATURE));
        let no_usage = der::certificate(der::OID_GOST_2012_256, None);
        let wrong_usage = der::certificate(der::OID_GOST_2012_256, Some(der::KEY_ENCIPHERMENT));
        let expired = der::certificate_expired(der::OID_GOST_2012_256);

        let store = FixedStore(Ok(vec![
            StoreCandidate {
                der: Bytes::from(eligible.clone()),
                has_private_key: true,
            },
            StoreCandidate {
                der: Bytes::from(eligible.clone()),
                has_private_key: false, // no provider: out
            },
            StoreCandidate {
                der: Bytes::from(no_usage),
                has_private_key: true,
            },
            StoreCandidate {
                der: Bytes::from(wrong_usage),
                has_private_key: true,
            },
            StoreCandidate {
                der: Bytes::from(expired),
                has_private_key: true,
            },
        ]));

        let certs = eligible_client_certs(&store, der::VALID_AT);
        assert_eq!(certs, vec![Bytes::from(eligible)]);
    }

    #[test]
    fn test_unopenable_store_is_empty_not_error() {
        let store = FixedStore(Err(Error::cert_store("unavailable")));
        assert!(eligible_client_certs(&store, der::VALID_AT).is_empty());
    }

    #[test]
    fn test_issuer_list_check() {
        assert!(issuer_names_checked(None).is_err());
        assert_eq!(issuer_names_checked(Some(Vec::new())).unwrap(), Vec::<Bytes>::new());
    }
}
