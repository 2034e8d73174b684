use std::time::Duration;

use gemdrive::client::Config;
use gemdrive::response::Status;
use tokio::io::AsyncWriteExt as _;
use tokio_util::sync::CancellationToken;

mod common;
use common::Server;

#[tokio::test]
async fn relative_redirects() {
    let _ = tracing_subscriber::fmt::try_init();

    let (client, incoming) = common::client(Config::default());
    let server = Server::serve(incoming, |request| match request {
        "gemini://example.com/dir/start" => b"30 next\r\n".to_vec(),
        "gemini://example.com/dir/next" => b"31 /final\r\n".to_vec(),
        "gemini://example.com/final" => b"20 text/gemini\r\narrived".to_vec(),
        _ => b"51 Not found\r\n".to_vec(),
    });

    let resolved = client.get("gemini://example.com/dir/start").await.unwrap();

    assert_eq!(resolved.response().status(), Status::SUCCESS);
    assert_eq!(resolved.response().text().as_deref(), Some("arrived"));
    assert_eq!(resolved.url().as_str(), "gemini://example.com/final");
    assert_eq!(resolved.redirects(), 2);
    assert!(!resolved.is_unresolved_redirect());

    drop(client);
    assert_eq!(
        server.finish().await,
        vec![
            "gemini://example.com/dir/start",
            "gemini://example.com/dir/next",
            "gemini://example.com/final",
        ]
    );
}

#[tokio::test]
async fn absolute_redirect_is_followed_verbatim() {
    let (client, incoming) = common::client(Config::default());
    let server = Server::serve(incoming, |request| {
        if request.starts_with("gemini://other.example/") {
            b"20 text/plain\r\nmoved".to_vec()
        } else {
            b"31 gemini://other.example/new/home\r\n".to_vec()
        }
    });

    let resolved = client.get("gemini://example.com/old").await.unwrap();

    assert_eq!(resolved.url().as_str(), "gemini://other.example/new/home");
    assert_eq!(resolved.redirects(), 1);

    drop(client);
    assert_eq!(
        server.finish().await,
        vec![
            "gemini://example.com/old",
            "gemini://other.example/new/home"
        ]
    );
}

#[tokio::test]
async fn absolute_redirect_is_sent_normalized() {
    let (client, incoming) = common::client(Config::default());
    let server = Server::serve(incoming, |request| {
        if request.starts_with("gemini://other.example/") {
            b"20 text/plain\r\nmoved".to_vec()
        } else {
            b"31 gemini://other.example/x/../y\r\n".to_vec()
        }
    });

    let resolved = client.get("gemini://example.com/old").await.unwrap();
    assert_eq!(resolved.url().as_str(), "gemini://other.example/y");

    drop(client);
    assert_eq!(
        server.finish().await,
        vec!["gemini://example.com/old", "gemini://other.example/y"]
    );
}

#[tokio::test]
async fn hop_limit_returns_last_redirect() {
    let _ = tracing_subscriber::fmt::try_init();

    let (client, incoming) = common::client(Config::default());
    let server = Server::serve(incoming, |_| b"30 /loop\r\n".to_vec());

    let resolved = client.get("gemini://example.com/").await.unwrap();

    assert_eq!(resolved.response().status(), Status::REDIRECT_TEMPORARY);
    assert_eq!(resolved.response().redirect_target(), Some("/loop"));
    assert!(resolved.is_unresolved_redirect());
    assert_eq!(resolved.redirects(), 5);
    assert_eq!(resolved.url().as_str(), "gemini://example.com/loop");

    drop(client);
    let requests = server.finish().await;
    assert_eq!(requests.len(), 6);
    assert_eq!(requests[0], "gemini://example.com/");
    assert!(requests[1..]
        .iter()
        .all(|request| request == "gemini://example.com/loop"));
}

#[tokio::test]
async fn without_redirects() {
    let (client, incoming) = common::client(Config {
        max_redirects: 0,
        ..Default::default()
    });
    let server = Server::serve(incoming, |_| b"30 /elsewhere\r\n".to_vec());

    let resolved = client.get("gemini://example.com/").await.unwrap();
    assert!(resolved.is_unresolved_redirect());
    assert_eq!(resolved.redirects(), 0);
    assert_eq!(resolved.url().as_str(), "gemini://example.com/");

    drop(client);
    assert_eq!(server.finish().await.len(), 1);
}

#[tokio::test]
async fn redirect_to_invalid_url() {
    let (client, incoming) = common::client(Config::default());
    let server = Server::serve(incoming, |_| b"30 gemini://\r\n".to_vec());

    let err = client.get("gemini://example.com/").await.unwrap_err();
    assert!(err.is_invalid_url(), "{err:?}");

    drop(client);
    assert_eq!(server.finish().await.len(), 1);
}

#[tokio::test]
async fn cancel_mid_chain() {
    let _ = tracing_subscriber::fmt::try_init();

    let (client, mut incoming) = common::client(Config::default());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    let server = tokio::spawn(async move {
        let mut first = incoming.accept().await.unwrap().unwrap();
        let request = common::read_request(&mut first).await;
        assert_eq!(request, "gemini://example.com/a");
        first.write_all(b"30 /b\r\n").await.unwrap();
        drop(first);

        let mut second = incoming.accept().await.unwrap().unwrap();
        let request = common::read_request(&mut second).await;
        assert_eq!(request, "gemini://example.com/b");
        trigger.cancel();

        let (_, rest) = common::hold_open(&mut second).await;
        assert!(rest.is_empty());

        // No further hop is attempted.
        assert!(incoming.accept().await.is_none());
    });

    let err = client
        .resolve("gemini://example.com/a", &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled(), "{err:?}");

    drop(client);
    server.await.unwrap();
}

#[tokio::test]
async fn deadline_spans_every_hop() {
    let (client, mut incoming) = common::client(Config {
        timeout: Some(Duration::from_millis(100)),
        read_timeout: None,
        ..Default::default()
    });

    let server = tokio::spawn(async move {
        let mut first = incoming.accept().await.unwrap().unwrap();
        common::read_request(&mut first).await;
        first.write_all(b"30 /slow\r\n").await.unwrap();
        drop(first);

        let mut second = incoming.accept().await.unwrap().unwrap();
        let (request, _) = common::hold_open(&mut second).await;
        request
    });

    let err = client.get("gemini://example.com/").await.unwrap_err();
    assert!(err.is_timeout(), "{err:?}");
    assert_eq!(server.await.unwrap(), "gemini://example.com/slow");
}
