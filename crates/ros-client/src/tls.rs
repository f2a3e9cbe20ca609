//! TLS configuration and client-side handshake.
//!
//! Appliances usually serve the TLS API with a self-signed certificate, so
//! alongside normal CA verification there is an accept-any mode that only
//! checks handshake signatures.

use std::fs::File;
use std::io::{self, BufReader};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{
    ClientConfig, ClientConnection, DigitallySignedStruct, RootCertStore, SignatureScheme,
    StreamOwned,
};
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// A TLS stream over a TCP socket.
pub type TlsStream = StreamOwned<ClientConnection, TcpStream>;

/// How the appliance's certificate is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateVerification {
    /// Accept any certificate. Handshake signatures are still verified.
    AcceptAny,
    /// Require a chain to one of the CA certificates in this PEM file.
    CaFile(PathBuf),
}

/// TLS settings for the API connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    /// Certificate check.
    pub verification: CertificateVerification,
    /// Name to present via SNI and verify against. Defaults to the host.
    pub server_name: Option<String>,
}

impl TlsConfig {
    /// TLS without certificate verification.
    pub fn accept_any() -> Self {
        Self {
            verification: CertificateVerification::AcceptAny,
            server_name: None,
        }
    }

    /// TLS verified against the CA certificates in a PEM file.
    pub fn with_ca_file(path: impl AsRef<Path>) -> Self {
        Self {
            verification: CertificateVerification::CaFile(path.as_ref().to_path_buf()),
            server_name: None,
        }
    }

    /// Overrides the server name.
    #[must_use]
    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    /// Builds a rustls `ClientConfig` from this configuration.
    pub fn build_client_config(&self) -> ClientResult<Arc<ClientConfig>> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| ClientError::Tls(e.to_string()))?;

        let config = match &self.verification {
            CertificateVerification::AcceptAny => builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate(provider)))
                .with_no_client_auth(),
            CertificateVerification::CaFile(path) => {
                let mut roots = RootCertStore::empty();
                for cert in load_certs(path)? {
                    roots.add(cert).map_err(|e| {
                        ClientError::Tls(format!(
                            "invalid CA certificate in {}: {e}",
                            path.display()
                        ))
                    })?;
                }
                builder.with_root_certificates(roots).with_no_client_auth()
            }
        };

        Ok(Arc::new(config))
    }

    /// Resolves the name used for SNI and verification.
    pub fn server_name(&self, host: &str) -> ClientResult<ServerName<'static>> {
        let name = self.server_name.as_deref().unwrap_or(host);
        ServerName::try_from(name.to_owned())
            .map_err(|e| ClientError::Tls(format!("invalid server name {name:?}: {e}")))
    }

    /// Wraps a connected socket and completes the TLS handshake.
    ///
    /// Certificate and protocol failures become [`ClientError::Tls`]; socket
    /// failures stay [`ClientError::Connection`] so they can be retried.
    pub fn wrap(&self, mut socket: TcpStream, host: &str) -> ClientResult<TlsStream> {
        let config = self.build_client_config()?;
        let server_name = self.server_name(host)?;
        let mut conn = ClientConnection::new(config, server_name)
            .map_err(|e| ClientError::Tls(format!("failed to create TLS connection: {e}")))?;

        while conn.is_handshaking() {
            conn.complete_io(&mut socket).map_err(|e| {
                if e.kind() == io::ErrorKind::InvalidData {
                    ClientError::Tls(format!("TLS handshake failed: {e}"))
                } else {
                    ClientError::Connection(e)
                }
            })?;
        }

        debug!(
            host,
            version = ?conn.protocol_version(),
            "TLS handshake complete"
        );
        Ok(StreamOwned::new(conn, socket))
    }
}

/// Loads certificates from a PEM file.
fn load_certs(path: &Path) -> ClientResult<Vec<CertificateDer<'static>>> {
    let file = File::open(path).map_err(|e| {
        ClientError::Tls(format!(
            "failed to open certificate file {}: {}",
            path.display(),
            e
        ))
    })?;
    let mut reader = BufReader::new(file);

    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<CertificateDer<'static>>, _>>()
        .map_err(|e| {
            ClientError::Tls(format!(
                "invalid PEM data in {}: {e}",
                path.display()
            ))
        })?;

    if certs.is_empty() {
        return Err(ClientError::Tls(format!(
            "no certificates found in {}",
            path.display()
        )));
    }

    Ok(certs)
}

/// Verifier that trusts any certificate but still checks signatures.
#[derive(Debug)]
struct AcceptAnyCertificate(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}
