//! # Credential Store
//!
//! Loads the three PEM artifacts each side holds and turns them into ready
//! TLS configurations.
//!
//! ## Material Per Side
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Credential Files                                 │
//! │                                                                         │
//! │            SERVER                          CLIENT                       │
//! │   certs/server-cert.pem  (own)     certs/client-cert.pem  (own)        │
//! │   certs/server-key.pem   (own)     certs/client-key.pem   (own)        │
//! │   certs/ca-cert.pem      (trust)   certs/ca-cert.pem      (trust)      │
//! │                                                                         │
//! │   Both sides trust the SAME authority and nothing else.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both TLS configurations are built at load time, so any problem with the
//! material shows up as a [`CredentialError`] before the process serves or
//! submits anything.

use std::path::Path;
use std::sync::Arc;

use rustls::client::ClientConfig;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::{ServerConfig, WebPkiClientVerifier};
use rustls::RootCertStore;
use tracing::debug;

use crate::config::CredentialPaths;
use crate::error::{CredentialError, CredentialResult};

/// ALPN identifier for the HTTP/1.1 framing used on the channel.
const ALPN_HTTP1: &[u8] = b"http/1.1";

/// Immutable certificate material for one process, with both TLS roles
/// prepared.
///
/// Share it behind an `Arc`; nothing in here changes after [`load`](Self::load).
#[derive(Clone)]
pub struct CredentialSet {
    authority_count: usize,
    chain_len: usize,
    client: Arc<ClientConfig>,
    server: Arc<ServerConfig>,
}

impl std::fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSet")
            .field("authority_count", &self.authority_count)
            .field("chain_len", &self.chain_len)
            .finish_non_exhaustive()
    }
}

impl CredentialSet {
    /// Reads the authority, certificate and key files.
    pub fn load(paths: &CredentialPaths) -> CredentialResult<Self> {
        let authority = read_file(&paths.ca_cert)?;
        let certificate = read_file(&paths.cert)?;
        let key = read_file(&paths.key)?;

        debug!(
            ca_cert = %paths.ca_cert.display(),
            cert = %paths.cert.display(),
            key = %paths.key.display(),
            "Loading credentials"
        );

        let names = [
            paths.ca_cert.display().to_string(),
            paths.cert.display().to_string(),
            paths.key.display().to_string(),
        ];
        Self::from_pem_named(
            (authority.as_slice(), names[0].as_str()),
            (certificate.as_slice(), names[1].as_str()),
            (key.as_slice(), names[2].as_str()),
        )
    }

    /// Builds a credential set from in-memory PEM text.
    pub fn from_pem(authority: &[u8], certificate: &[u8], key: &[u8]) -> CredentialResult<Self> {
        Self::from_pem_named(
            (authority, "authority certificate"),
            (certificate, "certificate"),
            (key, "private key"),
        )
    }

    fn from_pem_named(
        (authority, authority_name): (&[u8], &str),
        (certificate, certificate_name): (&[u8], &str),
        (key, key_name): (&[u8], &str),
    ) -> CredentialResult<Self> {
        let authorities = parse_certificates(authority, authority_name)?;
        let chain = parse_certificates(certificate, certificate_name)?;
        let key = parse_private_key(key, key_name)?;

        let mut roots = RootCertStore::empty();
        for cert in authorities.iter().cloned() {
            roots
                .add(cert)
                .map_err(|e| CredentialError::Rejected(format!("{}: {}", authority_name, e)))?;
        }
        let roots = Arc::new(roots);
        let provider = Arc::new(rustls::crypto::ring::default_provider());

        let client = build_client_config(&provider, roots.clone(), chain.clone(), key.clone_key())?;
        let server = build_server_config(&provider, roots, chain.clone(), key)?;

        Ok(CredentialSet {
            authority_count: authorities.len(),
            chain_len: chain.len(),
            client,
            server,
        })
    }

    /// TLS settings for dialing a server: present our chain, trust only the
    /// authority.
    pub fn client_config(&self) -> Arc<ClientConfig> {
        self.client.clone()
    }

    /// TLS settings for accepting clients: present our chain, require and
    /// verify a client certificate against the authority.
    pub fn server_config(&self) -> Arc<ServerConfig> {
        self.server.clone()
    }

    /// Number of trusted authority certificates.
    pub fn authority_count(&self) -> usize {
        self.authority_count
    }
}

// =============================================================================
// TLS Config Builders
// =============================================================================

// Pinned to TLS 1.2: the server's verdict on the client certificate must
// reach the client before its handshake completes.
static PROTOCOL_VERSIONS: &[&rustls::SupportedProtocolVersion] = &[&rustls::version::TLS12];

fn build_client_config(
    provider: &Arc<CryptoProvider>,
    roots: Arc<RootCertStore>,
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
) -> CredentialResult<Arc<ClientConfig>> {
    let mut config = ClientConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(PROTOCOL_VERSIONS)
        .map_err(rejected)?
        .with_root_certificates(roots)
        .with_client_auth_cert(chain, key)
        .map_err(rejected)?;
    config.alpn_protocols = vec![ALPN_HTTP1.to_vec()];
    Ok(Arc::new(config))
}

fn build_server_config(
    provider: &Arc<CryptoProvider>,
    roots: Arc<RootCertStore>,
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
) -> CredentialResult<Arc<ServerConfig>> {
    let verifier = WebPkiClientVerifier::builder_with_provider(roots, provider.clone())
        .build()
        .map_err(rejected)?;

    let mut config = ServerConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(PROTOCOL_VERSIONS)
        .map_err(rejected)?
        .with_client_cert_verifier(verifier)
        .with_single_cert(chain, key)
        .map_err(rejected)?;
    config.alpn_protocols = vec![ALPN_HTTP1.to_vec()];
    Ok(Arc::new(config))
}

fn rejected(err: impl std::fmt::Display) -> CredentialError {
    CredentialError::Rejected(err.to_string())
}

// =============================================================================
// PEM Parsing
// =============================================================================

fn read_file(path: &Path) -> CredentialResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| CredentialError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn parse_certificates(pem: &[u8], source_name: &str) -> CredentialResult<Vec<CertificateDer<'static>>> {
    let certs = CertificateDer::pem_slice_iter(pem)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CredentialError::Malformed {
            source_name: source_name.to_string(),
            reason: e.to_string(),
        })?;

    if certs.is_empty() {
        return Err(CredentialError::NoCertificates {
            source_name: source_name.to_string(),
        });
    }

    Ok(certs)
}

fn parse_private_key(pem: &[u8], source_name: &str) -> CredentialResult<PrivateKeyDer<'static>> {
    use rustls::pki_types::pem::Error as PemError;

    PrivateKeyDer::from_pem_slice(pem).map_err(|e| match e {
        PemError::NoItemsFound => CredentialError::NoPrivateKey {
            source_name: source_name.to_string(),
        },
        other => CredentialError::Malformed {
            source_name: source_name.to_string(),
            reason: other.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcgen::{BasicConstraints, CertificateParams, IsCa, KeyPair};

    struct Material {
        ca: String,
        cert: String,
        key: String,
    }

    fn material() -> Material {
        let ca_key = KeyPair::generate().unwrap();
        let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let ca = ca_params.self_signed(&ca_key).unwrap();

        let key = KeyPair::generate().unwrap();
        let cert = CertificateParams::new(vec!["localhost".to_string()])
            .unwrap()
            .signed_by(&key, &ca, &ca_key)
            .unwrap();

        Material {
            ca: ca.pem(),
            cert: cert.pem(),
            key: key.serialize_pem(),
        }
    }

    #[test]
    fn test_from_pem_builds_both_roles() {
        let m = material();
        let creds =
            CredentialSet::from_pem(m.ca.as_bytes(), m.cert.as_bytes(), m.key.as_bytes()).unwrap();
        assert_eq!(creds.authority_count(), 1);
        assert_eq!(
            creds.server_config().alpn_protocols,
            vec![b"http/1.1".to_vec()]
        );
        assert_eq!(
            creds.client_config().alpn_protocols,
            vec![b"http/1.1".to_vec()]
        );
    }

    #[test]
    fn test_missing_certificate_is_reported() {
        let m = material();
        let err = CredentialSet::from_pem(b"", m.cert.as_bytes(), m.key.as_bytes()).unwrap_err();
        assert!(matches!(err, CredentialError::NoCertificates { .. }));
    }

    #[test]
    fn test_missing_key_is_reported() {
        let m = material();
        // A certificate is not a key
        let err = CredentialSet::from_pem(m.ca.as_bytes(), m.cert.as_bytes(), m.cert.as_bytes())
            .unwrap_err();
        assert!(matches!(err, CredentialError::NoPrivateKey { .. }));
    }

    #[test]
    fn test_load_reports_unreadable_path() {
        let paths = CredentialPaths {
            ca_cert: "/nonexistent/ca-cert.pem".into(),
            cert: "/nonexistent/cert.pem".into(),
            key: "/nonexistent/key.pem".into(),
        };
        let err = CredentialSet::load(&paths).unwrap_err();
        assert!(matches!(err, CredentialError::Unreadable { .. }));
        assert!(err.to_string().contains("/nonexistent/ca-cert.pem"));
    }

    #[test]
    fn test_load_from_files() {
        let m = material();
        let dir = tempfile::tempdir().unwrap();
        let paths = CredentialPaths {
            ca_cert: dir.path().join("ca-cert.pem"),
            cert: dir.path().join("cert.pem"),
            key: dir.path().join("key.pem"),
        };
        std::fs::write(&paths.ca_cert, &m.ca).unwrap();
        std::fs::write(&paths.cert, &m.cert).unwrap();
        std::fs::write(&paths.key, &m.key).unwrap();

        assert!(CredentialSet::load(&paths).is_ok());
    }
}
