//! TLS support for connections to ledgerd nodes.
//!
//! Peer certificate verification is the default: operators provide the CA
//! bundle their nodes' certificates chain to (typically a private CA).
//! Verification can only be disabled through the explicitly named
//! `danger_accept_invalid_certs` switch.

use std::fmt;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};

use crate::error::{ClientError, Result};

/// TLS options for the client side of every endpoint connection.
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// PEM-encoded CA bundle used to verify node certificates.
    pub ca_cert_pem: Vec<u8>,
    /// Disables peer certificate verification. Only for test rigs and
    /// closed networks; anyone on the path can impersonate a node.
    pub danger_accept_invalid_certs: bool,
}

impl TlsOptions {
    /// Rejects configurations that would silently skip verification.
    pub fn validate(&self) -> Result<()> {
        if self.ca_cert_pem.is_empty() && !self.danger_accept_invalid_certs {
            return Err(ClientError::Config {
                reason: "no CA certificates configured; provide ca_cert_pem or set \
                         danger_accept_invalid_certs to disable verification explicitly"
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// Client-side TLS connector for dialing ledgerd nodes.
pub struct TlsClient {
    inner: tokio_rustls::TlsConnector,
}

impl fmt::Debug for TlsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsClient").finish()
    }
}

impl TlsClient {
    /// Creates a connector from the given options.
    pub fn new(options: &TlsOptions) -> Result<Self> {
        let _ = rustls::crypto::ring::default_provider().install_default();
        options.validate()?;

        let client_config = if options.danger_accept_invalid_certs {
            rustls::ClientConfig::builder()
                .dangerous()
                .with_custom_certificate_verifier(SkipServerVerification::new())
                .with_no_client_auth()
        } else {
            let ca_certs = load_certs_from_pem(&options.ca_cert_pem)?;
            let mut root_store = rustls::RootCertStore::empty();
            for cert in ca_certs {
                root_store.add(cert).map_err(|e| ClientError::Tls {
                    reason: format!("failed to add CA cert: {}", e),
                })?;
            }
            rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth()
        };

        let inner = tokio_rustls::TlsConnector::from(Arc::new(client_config));
        Ok(Self { inner })
    }

    /// Performs the TLS handshake over an established stream.
    pub async fn connect<IO>(
        &self,
        domain: &str,
        stream: IO,
    ) -> Result<tokio_rustls::client::TlsStream<IO>>
    where
        IO: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        let domain = if let Ok(ip) = domain.parse::<std::net::IpAddr>() {
            ServerName::IpAddress(ip.into())
        } else {
            ServerName::try_from(domain.to_string()).map_err(|e| ClientError::Tls {
                reason: format!("invalid domain: {}", e),
            })?
        };
        self.inner
            .connect(domain, stream)
            .await
            .map_err(|e| ClientError::Tls {
                reason: format!("TLS handshake failed: {}", e),
            })
    }
}

/// Server-side TLS acceptor.
///
/// The client never listens; this exists for the in-process mock nodes the
/// test crates stand up.
pub struct TlsAcceptor {
    inner: tokio_rustls::TlsAcceptor,
}

impl fmt::Debug for TlsAcceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsAcceptor").finish()
    }
}

impl TlsAcceptor {
    /// Creates an acceptor from a PEM certificate chain and private key.
    pub fn from_pem(cert_chain_pem: &[u8], private_key_pem: &[u8]) -> Result<Self> {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let certs = load_certs_from_pem(cert_chain_pem)?;
        let key = load_private_key_from_pem(private_key_pem)?;

        let server_config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| ClientError::Tls {
                reason: format!("failed to set server cert: {}", e),
            })?;

        let inner = tokio_rustls::TlsAcceptor::from(Arc::new(server_config));
        Ok(Self { inner })
    }

    /// Accepts a TLS connection over an established stream.
    pub async fn accept<IO>(&self, stream: IO) -> Result<tokio_rustls::server::TlsStream<IO>>
    where
        IO: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        self.inner.accept(stream).await.map_err(|e| ClientError::Tls {
            reason: format!("TLS handshake failed: {}", e),
        })
    }
}

/// Verifier that accepts any server certificate.
#[derive(Debug)]
struct SkipServerVerification(rustls::crypto::CryptoProvider);

impl SkipServerVerification {
    fn new() -> Arc<Self> {
        Arc::new(Self(rustls::crypto::ring::default_provider()))
    }
}

impl ServerCertVerifier for SkipServerVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

/// Loads certificates from PEM-encoded data.
pub fn load_certs_from_pem(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>> {
    let mut certs = Vec::new();
    let mut cursor = std::io::Cursor::new(pem);
    while let Ok(Some(rustls_pemfile::Item::X509Certificate(cert))) =
        rustls_pemfile::read_one(&mut cursor)
    {
        certs.push(cert);
    }

    if certs.is_empty() {
        return Err(ClientError::Tls {
            reason: "no certificates found in PEM".to_string(),
        });
    }

    Ok(certs)
}

/// Loads a private key from PEM-encoded data.
pub fn load_private_key_from_pem(pem: &[u8]) -> Result<PrivateKeyDer<'static>> {
    let mut cursor = std::io::Cursor::new(pem);
    if let Ok(Some(rustls_pemfile::Item::Pkcs8Key(key))) = rustls_pemfile::read_one(&mut cursor) {
        return Ok(PrivateKeyDer::Pkcs8(key));
    }

    Err(ClientError::Tls {
        reason: "no private key found in PEM".to_string(),
    })
}

/// Generates a self-signed CA certificate and key pair.
///
/// Returns (CA certificate PEM, CA key PEM). Intended for test rigs and
/// for bootstrapping a private CA.
pub fn generate_self_signed_ca() -> Result<(Vec<u8>, Vec<u8>)> {
    let key_pair = rcgen::KeyPair::generate().map_err(|e| ClientError::Tls {
        reason: format!("failed to generate CA key: {}", e),
    })?;

    let mut params = rcgen::CertificateParams::default();
    params.is_ca = rcgen::IsCa::Ca(rcgen::BasicConstraints::Unconstrained);

    let cert = params.self_signed(&key_pair).map_err(|e| ClientError::Tls {
        reason: format!("failed to create CA certificate: {}", e),
    })?;

    Ok((cert.pem().into_bytes(), key_pair.serialize_pem().into_bytes()))
}

/// Generates a server certificate for `host` signed by the given CA.
///
/// Returns (server certificate PEM, server key PEM).
pub fn generate_server_cert(
    ca_cert_pem: &[u8],
    ca_key_pem: &[u8],
    host: &str,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let ca_key = rcgen::KeyPair::from_pem(std::str::from_utf8(ca_key_pem).map_err(|e| {
        ClientError::Tls {
            reason: format!("invalid CA key PEM: {}", e),
        }
    })?)
    .map_err(|e| ClientError::Tls {
        reason: format!("failed to parse CA key: {}", e),
    })?;

    let ca_cert_pem_str = std::str::from_utf8(ca_cert_pem).map_err(|e| ClientError::Tls {
        reason: format!("invalid CA cert PEM: {}", e),
    })?;

    let ca_cert_params =
        rcgen::CertificateParams::from_ca_cert_pem(ca_cert_pem_str).map_err(|e| {
            ClientError::Tls {
                reason: format!("failed to parse CA certificate: {}", e),
            }
        })?;

    let ca_cert = ca_cert_params
        .self_signed(&ca_key)
        .map_err(|e| ClientError::Tls {
            reason: format!("failed to reconstruct CA certificate: {}", e),
        })?;

    let server_key = rcgen::KeyPair::generate().map_err(|e| ClientError::Tls {
        reason: format!("failed to generate server key: {}", e),
    })?;

    let server_params =
        rcgen::CertificateParams::new(vec![host.to_string()]).map_err(|e| ClientError::Tls {
            reason: format!("failed to create server certificate params: {}", e),
        })?;

    let server_cert = server_params
        .signed_by(&server_key, &ca_cert, &ca_key)
        .map_err(|e| ClientError::Tls {
            reason: format!("failed to sign server certificate: {}", e),
        })?;

    Ok((
        server_cert.pem().into_bytes(),
        server_key.serialize_pem().into_bytes(),
    ))
}
