//! A command line Gemini client.
//!
//! Fetches a URL, following redirects, and writes the body to stdout. The
//! response header goes to stderr. When the server asks for input, a line
//! is read from stdin and the request is repeated with it. Press Ctrl-C to
//! cancel a request in flight.
//!
//! ```text
//! cargo run --example fetch -- --insecure gemini://geminiprotocol.net/
//! ```

use std::io::{BufRead as _, Write as _};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{bail, eyre, WrapErr as _};
use gemdrive::client::{Resolved, DEFAULT_MAX_REDIRECTS};
use gemdrive::response::Category;
use gemdrive::{Client, TlsPolicy};
use tokio::io::AsyncWriteExt as _;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about = "Fetch a Gemini URL")]
struct Args {
    /// The URL to request
    url: String,

    /// Accept any server certificate
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Trust certificates issued by this PEM encoded root
    #[arg(long, conflicts_with = "insecure")]
    tls_root: Option<PathBuf>,

    /// Follow at most this many redirects
    #[arg(long, default_value_t = DEFAULT_MAX_REDIRECTS)]
    max_redirects: usize,

    /// Give up after this many seconds (0 waits forever)
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

fn policy(args: &Args) -> color_eyre::Result<TlsPolicy> {
    if args.insecure {
        return Ok(TlsPolicy::AcceptAny);
    }

    let Some(path) = &args.tls_root else {
        return Ok(TlsPolicy::strict());
    };

    let pem = std::fs::read(path).wrap_err_with(|| format!("reading {}", path.display()))?;
    let (_, cert) = pem_rfc7468::decode_vec(&pem).map_err(|error| eyre!("{error}"))?;
    let mut roots = rustls::RootCertStore::empty();
    roots.add(rustls::pki_types::CertificateDer::from(cert))?;
    Ok(TlsPolicy::strict_with_roots(roots))
}

fn prompt(message: &str, sensitive: bool) -> color_eyre::Result<String> {
    let mut stderr = std::io::stderr();
    if sensitive {
        write!(stderr, "{message} (input will be visible): ")?;
    } else {
        write!(stderr, "{message}: ")?;
    }
    stderr.flush()?;

    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("no input given");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let timeout = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));
    let client = Client::builder(policy(&args)?)
        .with_max_redirects(args.max_redirects)
        .with_optional_timeout(timeout)
        .build()?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let mut resolved: Resolved = client.resolve(&args.url, &cancel).await?;
    while resolved.response().category() == Category::Input {
        let response = resolved.response();
        let input = prompt(response.meta(), response.is_sensitive_input())?;
        resolved = client
            .submit_input(resolved.url().as_str(), &input, &cancel)
            .await?;
    }

    let response = resolved.response();
    eprintln!("{} {}", response.status(), response.meta());
    if resolved.redirects() > 0 {
        eprintln!("=> {} ({} redirects)", resolved.url(), resolved.redirects());
    }

    match response.category() {
        Category::Success => {
            if let Some(body) = response.body() {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(body).await?;
                stdout.flush().await?;
            }
            Ok(())
        }
        Category::Redirect => bail!("too many redirects"),
        category => bail!(
            "{category}: {}",
            response.status().canonical_reason().unwrap_or("unknown status")
        ),
    }
}
