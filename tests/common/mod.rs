#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use gemdrive::client::conn::{DuplexTransport, TlsTransport};
use gemdrive::client::Config;
use gemdrive::stream::duplex::{self, DuplexIncoming, DuplexStream};
use gemdrive::{Client, TlsPolicy};
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
use tokio::task::JoinHandle;

/// A client which talks, without TLS, to an in-memory server.
pub fn client(config: Config) -> (Client<TlsTransport<DuplexTransport>>, DuplexIncoming) {
    let (transport, incoming) = duplex::pair();
    let client = Client::builder(TlsPolicy::AcceptAny)
        .with_transport(DuplexTransport::new(8 * 1024, transport))
        .without_tls()
        .with_config(config)
        .build()
        .unwrap();
    (client, incoming)
}

/// Read a request line, returning it without the CRLF.
pub async fn read_request<S>(stream: &mut S) -> String
where
    S: tokio::io::AsyncRead + Unpin,
{
    let mut line = Vec::new();
    while !line.ends_with(b"\r\n") {
        let mut byte = [0u8; 1];
        if stream.read(&mut byte).await.unwrap() == 0 {
            break;
        }
        line.push(byte[0]);
    }
    line.truncate(line.len().saturating_sub(2));
    String::from_utf8(line).unwrap()
}

/// A scripted server: every connection receives the reply chosen for its request line.
pub struct Server {
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl Server {
    pub fn serve<F>(mut incoming: DuplexIncoming, reply: F) -> Self
    where
        F: Fn(&str) -> Vec<u8> + Send + 'static,
    {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = requests.clone();
        let handle = tokio::spawn(async move {
            while let Some(Ok(mut stream)) = incoming.accept().await {
                let request = read_request(&mut stream).await;
                let response = reply(&request);
                seen.lock().unwrap().push(request);
                let _ = stream.write_all(&response).await;
            }
        });

        Self { requests, handle }
    }

    /// The request lines received so far.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Wait for every client to go away, then return all request lines.
    pub async fn finish(self) -> Vec<String> {
        let Self { requests, handle } = self;
        handle.await.unwrap();
        let requests = requests.lock().unwrap().clone();
        requests
    }
}

/// Accept one connection, read the request, and hold the stream open
/// until the client closes it. Returns the request line and anything
/// written after it.
pub async fn hold_open(stream: &mut DuplexStream) -> (String, Vec<u8>) {
    let request = read_request(stream).await;
    let mut rest = Vec::new();
    stream.read_to_end(&mut rest).await.unwrap();
    (request, rest)
}
