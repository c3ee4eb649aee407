//! Token transports.
//!
//! Every transport reads newline-delimited tokens and pushes them into the
//! bounded queue the coordinator drains. A full queue makes the transport
//! wait, so bursts are queued and never dropped.

use crate::error::{PipelineError, Result};
use std::path::PathBuf;
use sweep_core::{TokenSourceConfig, TokenSourceKind};
use sweep_lookup::AccessToken;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Create the bounded queue between a transport and the coordinator.
#[must_use]
pub fn token_queue(capacity: usize) -> (mpsc::Sender<AccessToken>, mpsc::Receiver<AccessToken>) {
    mpsc::channel(capacity.max(1))
}

/// A configured, ready-to-run token transport.
#[derive(Debug)]
pub enum TokenSource {
    /// Lines from standard input
    Stdin,
    /// Lines from a file or named pipe
    File(PathBuf),
    /// Lines from every connection accepted on a bound listener
    Tcp(TcpListener),
}

impl TokenSource {
    /// Prepare the transport described by `config`.
    ///
    /// The TCP listener is bound here so an unusable address is reported
    /// before the pipeline starts.
    pub async fn open(config: &TokenSourceConfig) -> Result<Self> {
        match config.source {
            TokenSourceKind::Stdin => Ok(Self::Stdin),
            TokenSourceKind::File => {
                let path = config.path.clone().ok_or_else(|| {
                    PipelineError::TokenSource("file token source requires tokens.path".to_string())
                })?;
                Ok(Self::File(path))
            }
            TokenSourceKind::Tcp => {
                let listener = TcpListener::bind(&config.listen_addr).await.map_err(|e| {
                    PipelineError::TokenSource(format!("bind {}: {e}", config.listen_addr))
                })?;
                match listener.local_addr() {
                    Ok(addr) => tracing::info!(%addr, "Listening for tokens"),
                    Err(_) => tracing::info!(addr = %config.listen_addr, "Listening for tokens"),
                }
                Ok(Self::Tcp(listener))
            }
        }
    }

    /// Forward tokens until the input ends, the queue closes, or `cancel` fires.
    ///
    /// Returns the number of tokens forwarded. Dropping `tx` on return closes
    /// the queue, which the coordinator treats as end of input.
    pub async fn run(self, tx: mpsc::Sender<AccessToken>, cancel: CancellationToken) -> Result<u64> {
        match self {
            Self::Stdin => {
                tracing::info!("Reading tokens from stdin");
                forward_lines(BufReader::new(tokio::io::stdin()), &tx, &cancel).await
            }
            Self::File(path) => {
                tracing::info!(path = %path.display(), "Reading tokens from file");
                let file = tokio::fs::File::open(&path).await.map_err(|e| {
                    PipelineError::TokenSource(format!("open {}: {e}", path.display()))
                })?;
                forward_lines(BufReader::new(file), &tx, &cancel).await
            }
            Self::Tcp(listener) => accept_loop(listener, tx, cancel).await,
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    tx: mpsc::Sender<AccessToken>,
    cancel: CancellationToken,
) -> Result<u64> {
    loop {
        let accepted = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(0),
            () = tx.closed() => return Ok(0),
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((socket, peer)) => {
                tracing::debug!(%peer, "Token producer connected");
                let tx = tx.clone();
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    match forward_lines(BufReader::new(socket), &tx, &cancel).await {
                        Ok(count) => tracing::debug!(%peer, count, "Token producer disconnected"),
                        Err(e) => tracing::warn!(%peer, error = %e, "Token producer failed"),
                    }
                });
            }
            Err(e) => tracing::warn!(error = %e, "Failed to accept token producer"),
        }
    }
}

/// Push each non-blank, trimmed line of `reader` into `tx`.
///
/// Stops at end of input, when the receiver is gone, or on cancellation.
pub async fn forward_lines<R>(
    reader: R,
    tx: &mpsc::Sender<AccessToken>,
    cancel: &CancellationToken,
) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut forwarded = 0;

    loop {
        let line = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            line = lines.next_line() => {
                line.map_err(|e| PipelineError::TokenSource(e.to_string()))?
            }
        };
        let Some(line) = line else {
            break;
        };

        let token = line.trim();
        if token.is_empty() {
            continue;
        }

        let sent = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            sent = tx.send(AccessToken::new(token)) => sent,
        };
        if sent.is_err() {
            break;
        }
        forwarded += 1;
    }

    Ok(forwarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn test_forward_lines_trims_and_skips_blanks() {
        let (tx, mut rx) = token_queue(8);
        let input: &[u8] = b"  first \n\n\t\nsecond\r\nthird";

        let count = forward_lines(input, &tx, &CancellationToken::new())
            .await
            .expect("forward");
        drop(tx);

        assert_eq!(count, 3);
        let mut tokens = Vec::new();
        while let Some(token) = rx.recv().await {
            tokens.push(token.expose().to_string());
        }
        assert_eq!(tokens, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_backpressure_waits_for_consumer() {
        let (tx, mut rx) = token_queue(1);
        let input: &[u8] = b"a\nb\nc\n";

        let producer = tokio::spawn(async move {
            forward_lines(input, &tx, &CancellationToken::new()).await
        });

        let mut tokens = Vec::new();
        while let Some(token) = rx.recv().await {
            tokens.push(token.expose().to_string());
        }

        assert_eq!(tokens, vec!["a", "b", "c"]);
        assert_eq!(producer.await.expect("join").expect("forward"), 3);
    }

    #[tokio::test]
    async fn test_cancel_stops_forwarding() {
        let (tx, _rx) = token_queue(1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let count = forward_lines(&b"a\nb\n"[..], &tx, &cancel)
            .await
            .expect("forward");
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_file_source() {
        let tmp = tempfile::NamedTempFile::new().expect("create temp file");
        std::fs::write(tmp.path(), "t1\nt2\n").expect("write tokens");

        let config = TokenSourceConfig {
            source: TokenSourceKind::File,
            path: Some(tmp.path().to_path_buf()),
            ..TokenSourceConfig::default()
        };
        let source = TokenSource::open(&config).await.expect("open source");
        let (tx, mut rx) = token_queue(4);

        let count = source
            .run(tx, CancellationToken::new())
            .await
            .expect("run source");

        assert_eq!(count, 2);
        assert_eq!(rx.recv().await.map(|t| t.expose().to_string()), Some("t1".to_string()));
        assert_eq!(rx.recv().await.map(|t| t.expose().to_string()), Some("t2".to_string()));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_file_source_requires_path() {
        let config = TokenSourceConfig {
            source: TokenSourceKind::File,
            path: None,
            ..TokenSourceConfig::default()
        };
        let result = TokenSource::open(&config).await;
        assert!(matches!(result, Err(PipelineError::TokenSource(_))));
    }

    #[tokio::test]
    async fn test_tcp_source() {
        let config = TokenSourceConfig {
            source: TokenSourceKind::Tcp,
            listen_addr: "127.0.0.1:0".to_string(),
            ..TokenSourceConfig::default()
        };
        let source = TokenSource::open(&config).await.expect("bind source");
        let TokenSource::Tcp(listener) = &source else {
            panic!("expected tcp source");
        };
        let addr = listener.local_addr().expect("local addr");

        let (tx, mut rx) = token_queue(4);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(source.run(tx, cancel.clone()));

        let mut producer = TcpStream::connect(addr).await.expect("connect");
        producer.write_all(b"tcp-1\n\ntcp-2\n").await.expect("write");
        producer.shutdown().await.expect("shutdown");

        assert_eq!(rx.recv().await.map(|t| t.expose().to_string()), Some("tcp-1".to_string()));
        assert_eq!(rx.recv().await.map(|t| t.expose().to_string()), Some("tcp-2".to_string()));

        cancel.cancel();
        task.await.expect("join").expect("accept loop");
    }
}
