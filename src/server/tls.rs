//! TLS for the probe server
//!
//! Certificates come from PEM files mounted by the deployment, or are
//! generated self-signed on startup for environments that only need an
//! encrypted channel (e.g. probes over HTTPS with verification disabled).

use rcgen::{CertificateParams, DnType, ExtendedKeyUsagePurpose, KeyPair, KeyUsagePurpose};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Default validity period for self-signed certificates (1 year)
pub const SELF_SIGNED_VALIDITY_DAYS: u32 = 365;

/// Errors that can occur during TLS setup
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("Failed to generate certificate: {0}")]
    KeyGeneration(#[from] rcgen::Error),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse certificate: {0}")]
    Parse(String),

    #[error("Invalid PEM data")]
    InvalidPem,
}

/// PEM-encoded server certificate chain and private key
#[derive(Clone)]
pub struct CertificateBundle {
    pub server_cert_pem: String,
    pub server_key_pem: String,
}

impl CertificateBundle {
    /// Load a certificate chain and key from PEM files
    pub fn from_files(cert_path: &Path, key_path: &Path) -> Result<Self, TlsError> {
        let read = |path: &Path| {
            std::fs::read_to_string(path).map_err(|source| TlsError::Read {
                path: path.display().to_string(),
                source,
            })
        };

        Ok(Self {
            server_cert_pem: read(cert_path)?,
            server_key_pem: read(key_path)?,
        })
    }
}

/// Generate a self-signed server certificate for `hostnames`
pub fn generate_self_signed(hostnames: &[&str]) -> Result<CertificateBundle, TlsError> {
    let names: Vec<String> = hostnames.iter().map(|h| h.to_string()).collect();
    let mut params = CertificateParams::new(names)?;

    params
        .distinguished_name
        .push(DnType::CommonName, hostnames.first().copied().unwrap_or("localhost"));
    params
        .distinguished_name
        .push(DnType::OrganizationName, "vigil");

    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];

    // Set validity
    let now = time::OffsetDateTime::now_utc();
    params.not_before = now;
    params.not_after = now + time::Duration::days(SELF_SIGNED_VALIDITY_DAYS as i64);

    let key_pair = KeyPair::generate()?;
    let cert = params.self_signed(&key_pair)?;

    Ok(CertificateBundle {
        server_cert_pem: cert.pem(),
        server_key_pem: key_pair.serialize_pem(),
    })
}

/// Build a rustls ServerConfig from the certificate bundle
pub fn build_rustls_config(
    bundle: &CertificateBundle,
) -> Result<Arc<rustls::ServerConfig>, TlsError> {
    use rustls::pki_types::CertificateDer;
    use rustls_pemfile::{certs, private_key};
    use std::io::BufReader;

    // Parse server certificate chain
    let cert_chain: Vec<CertificateDer<'static>> =
        certs(&mut BufReader::new(bundle.server_cert_pem.as_bytes()))
            .filter_map(|r| r.ok())
            .collect();

    if cert_chain.is_empty() {
        return Err(TlsError::InvalidPem);
    }

    // Parse private key
    let key = private_key(&mut BufReader::new(bundle.server_key_pem.as_bytes()))
        .map_err(|e| TlsError::Parse(format!("Failed to parse private key: {}", e)))?
        .ok_or(TlsError::InvalidPem)?;

    // Build rustls config with ring crypto provider
    let config = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| TlsError::Parse(format!("Failed to set protocol versions: {}", e)))?
    .with_no_client_auth()
    .with_single_cert(cert_chain, key)
    .map_err(|e| TlsError::Parse(format!("Failed to build TLS config: {}", e)))?;

    Ok(Arc::new(config))
}
