//! TLS transport and certificate trust policy.
//!
//! Every request is made over a fresh TLS session. How the server's
//! certificate is judged is an explicit choice, made per client with a
//! [`TlsPolicy`]:
//!
//! - [`TlsPolicy::Strict`] validates the chain and host name against the
//!   platform roots (or roots supplied by the caller).
//! - [`TlsPolicy::AcceptAny`] accepts any certificate. Capsules usually
//!   present self-signed certificates and expect clients to pin them on
//!   first use instead of consulting a CA hierarchy.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{
    verify_tls12_signature, verify_tls13_signature, CryptoProvider, WebPkiSupportedAlgorithms,
};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use thiserror::Error;
use tracing::{trace, warn, Instrument};

use super::Transport;
use crate::request::Target;
use crate::stream::tls::MaybeTlsStream;
use crate::BoxError;

#[cfg(not(any(feature = "tls-ring", feature = "tls-aws-lc")))]
compile_error!("one of the `tls-ring` or `tls-aws-lc` features must be enabled");

/// How server certificates are validated.
#[derive(Debug, Clone)]
pub enum TlsPolicy {
    /// Validate the certificate chain and host name.
    ///
    /// With `None`, the platform's native roots are used, falling back to
    /// the Mozilla roots if the platform has none.
    Strict(Option<Arc<RootCertStore>>),

    /// Accept any certificate without chain or host name validation.
    ///
    /// The handshake signature is still verified, so the server must hold
    /// the key for whatever certificate it presents.
    AcceptAny,
}

impl TlsPolicy {
    /// Strict validation against the platform's roots.
    pub fn strict() -> Self {
        TlsPolicy::Strict(None)
    }

    /// Strict validation against the given roots.
    pub fn strict_with_roots(roots: RootCertStore) -> Self {
        TlsPolicy::Strict(Some(Arc::new(roots)))
    }

    /// Build the rustls configuration for this policy.
    pub fn client_config(&self) -> Result<ClientConfig, rustls::Error> {
        let provider = crypto_provider();
        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()?;

        let config = match self {
            TlsPolicy::Strict(Some(roots)) => builder
                .with_root_certificates(roots.clone())
                .with_no_client_auth(),
            TlsPolicy::Strict(None) => builder
                .with_root_certificates(platform_roots())
                .with_no_client_auth(),
            TlsPolicy::AcceptAny => builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate(
                    provider.signature_verification_algorithms,
                )))
                .with_no_client_auth(),
        };

        Ok(config)
    }
}

pub(crate) fn crypto_provider() -> Arc<CryptoProvider> {
    if let Some(provider) = CryptoProvider::get_default() {
        return provider.clone();
    }

    #[cfg(feature = "tls-ring")]
    return Arc::new(rustls::crypto::ring::default_provider());

    #[cfg(all(feature = "tls-aws-lc", not(feature = "tls-ring")))]
    return Arc::new(rustls::crypto::aws_lc_rs::default_provider());
}

/// Load the platform's native certificates, or the Mozilla roots if there are none.
fn platform_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();

    let native = rustls_native_certs::load_native_certs();
    for error in native.errors {
        warn!("error loading platform certificates: {}", error);
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    trace!(added, ignored, "loaded platform certificates");

    if roots.is_empty() {
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }
    roots
}

/// Certificate verifier which trusts whatever the server presents.
#[derive(Debug)]
struct AcceptAnyCertificate(WebPkiSupportedAlgorithms);

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
        verify_tls12_signature(message, cert, dss, &self.0)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.supported_schemes()
    }
}

/// Error returned when a TLS connection cannot be established.
#[derive(Debug, Error)]
pub enum TlsConnectionError {
    /// The underlying transport failed to connect.
    #[error("connection: {0}")]
    Connection(#[source] BoxError),

    /// The TLS handshake failed, including certificate rejection.
    #[error("handshake: {0}")]
    Handshake(#[source] std::io::Error),

    /// The host cannot be used as a TLS server name.
    #[error("invalid server name {0:?}")]
    InvalidServerName(String),
}

/// Transport which performs a TLS handshake over another transport.
///
/// Without a configuration, the inner stream is passed through unencrypted.
#[derive(Clone)]
pub struct TlsTransport<T> {
    transport: T,
    config: Option<Arc<ClientConfig>>,
}

impl<T: fmt::Debug> fmt::Debug for TlsTransport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsTransport")
            .field("transport", &self.transport)
            .field("tls", &self.config.is_some())
            .finish()
    }
}

impl<T> TlsTransport<T> {
    /// Wrap a transport with TLS using the given configuration.
    pub fn new(transport: T, config: Arc<ClientConfig>) -> Self {
        Self {
            transport,
            config: Some(config),
        }
    }

    /// Wrap a transport without TLS.
    pub fn plain(transport: T) -> Self {
        Self {
            transport,
            config: None,
        }
    }

    /// Returns a reference to the inner transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns a reference to the TLS configuration, if TLS is enabled.
    pub fn config(&self) -> Option<&Arc<ClientConfig>> {
        self.config.as_ref()
    }

    /// Returns the inner transport and the TLS configuration.
    pub fn into_parts(self) -> (T, Option<Arc<ClientConfig>>) {
        (self.transport, self.config)
    }
}

type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

impl<T> tower::Service<Target> for TlsTransport<T>
where
    T: Transport,
{
    type Response = MaybeTlsStream<T::IO>;
    type Error = TlsConnectionError;
    type Future = BoxFuture<'static, Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Transport::poll_ready(&mut self.transport, cx)
            .map_err(|error| TlsConnectionError::Connection(error.into()))
    }

    fn call(&mut self, target: Target) -> Self::Future {
        let config = self.config.clone();
        let connect = Transport::connect(&mut self.transport, target.clone());
        let span = tracing::trace_span!("tls", host = %target.host());

        Box::pin(
            async move {
                let stream = connect
                    .await
                    .map_err(|error| TlsConnectionError::Connection(error.into()))?;

                let Some(config) = config else {
                    trace!("connecting without TLS");
                    return Ok(MaybeTlsStream::Plain(stream));
                };

                let domain = ServerName::try_from(target.host().to_owned())
                    .map_err(|_| TlsConnectionError::InvalidServerName(target.host().into()))?;

                let stream = tokio_rustls::TlsConnector::from(config)
                    .connect(domain, stream)
                    .await
                    .map_err(TlsConnectionError::Handshake)?;
                trace!("tls handshake complete");

                Ok(MaybeTlsStream::from(stream))
            }
            .instrument(span),
        )
    }
}
