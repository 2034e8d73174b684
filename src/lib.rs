//! Gemdrive
//!
//! An async client for the Gemini protocol, built on tokio and rustls.
//!
//! A request is a single absolute URL sent over a fresh TLS connection. The
//! server answers with a two digit status, a meta line, and (for successful
//! requests) a body, then closes the connection. This crate provides:
//!
//! - [`Client`], which follows redirects up to a hop limit, applies an
//!   overall deadline, and can be cancelled at any point through a
//!   [`CancellationToken`][tokio_util::sync::CancellationToken].
//! - [`client::conn`], the single-request connection layer, with pluggable
//!   [transports][client::conn::Transport].
//! - [`response`], the response model and wire parser.
//! - [`request`], URL validation and request line framing.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod client;
pub mod request;
pub mod response;
pub mod stream;

pub use self::client::{Client, Error, TlsPolicy};
pub use self::request::Request;
pub use self::response::{Response, Status};

/// A boxed error, used by transports and as the source of transport errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[cfg(test)]
pub(crate) mod fixtures {

    use rustls::ServerConfig;

    pub(crate) fn tls_server_config() -> rustls::ServerConfig {
        let (_, cert) = pem_rfc7468::decode_vec(include_bytes!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/minica/example.com/cert.pem"
        )))
        .unwrap();
        let (label, key) = pem_rfc7468::decode_vec(include_bytes!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/minica/example.com/key.pem"
        )))
        .unwrap();

        let cert = rustls::pki_types::CertificateDer::from(cert);
        let key = match label {
            "PRIVATE KEY" => rustls::pki_types::PrivateKeyDer::Pkcs8(key.into()),
            "RSA PRIVATE KEY" => rustls::pki_types::PrivateKeyDer::Pkcs1(key.into()),
            "EC PRIVATE KEY" => rustls::pki_types::PrivateKeyDer::Sec1(key.into()),
            _ => panic!("unknown key type"),
        };

        let provider = crate::client::conn::transport::tls::crypto_provider();
        ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(vec![cert], key)
            .unwrap()
    }

    pub(crate) fn tls_root_store() -> rustls::RootCertStore {
        let mut root_store = rustls::RootCertStore::empty();
        let (_, cert) = pem_rfc7468::decode_vec(include_bytes!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/minica/minica.pem"
        )))
        .unwrap();
        root_store
            .add(rustls::pki_types::CertificateDer::from(cert))
            .unwrap();
        root_store
    }
}
