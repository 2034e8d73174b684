use std::sync::Arc;
use std::time::Duration;

use super::conn::{TcpTransport, TcpTransportConfig, TlsPolicy, TlsTransport, Transport};
use super::{Client, Config, Error};

/// A builder for a client.
///
/// The certificate policy is chosen up front, in [`Builder::new`] or
/// [`Client::builder`]; there is no default policy.
#[derive(Debug)]
pub struct Builder<T> {
    transport: T,
    tls: Option<TlsPolicy>,
    config: Config,
}

impl Builder<TcpTransport> {
    /// Create a new builder for TCP connections secured by TLS.
    pub fn new(policy: TlsPolicy) -> Self {
        Self {
            transport: TcpTransport::default(),
            tls: Some(policy),
            config: Config::default(),
        }
    }
}

impl<T> Builder<T> {
    /// Use the provided TCP configuration.
    pub fn with_tcp(self, config: TcpTransportConfig) -> Builder<TcpTransport> {
        Builder {
            transport: TcpTransport::new(config),
            tls: self.tls,
            config: self.config,
        }
    }

    /// Provide a custom transport
    pub fn with_transport<T2>(self, transport: T2) -> Builder<T2> {
        Builder {
            transport,
            tls: self.tls,
            config: self.config,
        }
    }

    /// Get a mutable reference to the transport
    pub fn transport(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T> Builder<T> {
    /// Disable TLS
    ///
    /// Requests are sent in the clear over the transport. Only useful when
    /// the transport already provides its own security, or for testing.
    pub fn without_tls(mut self) -> Self {
        self.tls = None;
        self
    }

    /// Use the provided certificate policy.
    pub fn with_tls_policy(mut self, policy: TlsPolicy) -> Self {
        self.tls = Some(policy);
        self
    }

    /// TLS certificate policy.
    pub fn tls(&mut self) -> &mut Option<TlsPolicy> {
        &mut self.tls
    }
}

impl<T> Builder<T> {
    /// Use the provided client configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Client configuration.
    pub fn config(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Follow at most this many redirects.
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.config.max_redirects = max_redirects;
        self
    }

    /// Never follow redirects.
    pub fn without_redirects(mut self) -> Self {
        self.config.max_redirects = 0;
        self
    }

    /// Set the deadline for a whole request, across every redirect hop.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Remove the deadline for requests.
    pub fn without_timeout(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    /// Set the request deadline, or remove it with `None`.
    pub fn with_optional_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// The request deadline.
    pub fn timeout(&self) -> Option<Duration> {
        self.config.timeout
    }

    /// Fail a connection if no data arrives for this long.
    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.config.read_timeout = read_timeout;
        self
    }

    /// Fail a connection once its response grows past this many bytes.
    pub fn with_max_response_size(mut self, max_response_size: Option<usize>) -> Self {
        self.config.max_response_size = max_response_size;
        self
    }
}

impl<T> Builder<T>
where
    T: Transport,
{
    /// Build a client.
    ///
    /// Fails only if the TLS configuration cannot be assembled from the
    /// selected crypto provider.
    pub fn build(self) -> Result<Client<TlsTransport<T>>, Error> {
        let transport = match self.tls {
            Some(policy) => {
                let config = policy.client_config().map_err(Error::transport)?;
                TlsTransport::new(self.transport, Arc::new(config))
            }
            None => TlsTransport::plain(self.transport),
        };

        Ok(Client::new(transport, self.config))
    }
}
