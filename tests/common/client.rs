//! Line-oriented test client for the chat protocol.
//!
//! Drives the AUTH_REQUIRED / ACTION:username:password exchange and
//! reads post-auth traffic line by line.

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// A test chat client.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl TestClient {
    /// Connect to a test server.
    pub async fn connect(address: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;

        let (read_half, write_half) = stream.into_split();
        let reader = BufReader::new(read_half);
        let writer = BufWriter::new(write_half);

        Ok(Self { reader, writer })
    }

    /// Send one protocol line.
    pub async fn send_line(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive a single line from the server.
    pub async fn recv_line(&mut self) -> anyhow::Result<String> {
        self.recv_line_timeout(Duration::from_secs(5)).await
    }

    /// Receive a line with a timeout. Fails on timeout or closed socket.
    pub async fn recv_line_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("connection closed");
        }
        Ok(line.trim_end().to_string())
    }

    /// Receive lines until the predicate matches, returning everything read.
    #[allow(dead_code)]
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Vec<String>>
    where
        F: FnMut(&str) -> bool,
    {
        let mut lines = Vec::new();
        loop {
            let line = self.recv_line().await?;
            let done = predicate(&line);
            lines.push(line);
            if done {
                break;
            }
        }
        Ok(lines)
    }

    /// One authentication attempt: wait for the prompt, send the
    /// credentials line, return the server's reply.
    pub async fn authenticate(
        &mut self,
        action: &str,
        username: &str,
        password: &str,
    ) -> anyhow::Result<String> {
        let prompt = self.recv_line().await?;
        anyhow::ensure!(prompt == "AUTH_REQUIRED", "expected AUTH_REQUIRED, got: {prompt}");

        self.send_line(&format!("{action}:{username}:{password}"))
            .await?;
        self.recv_line().await
    }

    /// Send a raw pre-auth line (for malformed-input tests) and return
    /// the reply, after consuming the prompt.
    #[allow(dead_code)]
    pub async fn authenticate_raw(&mut self, line: &str) -> anyhow::Result<String> {
        let prompt = self.recv_line().await?;
        anyhow::ensure!(prompt == "AUTH_REQUIRED", "expected AUTH_REQUIRED, got: {prompt}");

        self.send_line(line).await?;
        self.recv_line().await
    }

    /// Register a new account and consume the welcome banner.
    pub async fn register(&mut self, username: &str, password: &str) -> anyhow::Result<()> {
        let reply = self.authenticate("REGISTER", username, password).await?;
        anyhow::ensure!(
            reply.starts_with("AUTH_SUCCESS:"),
            "registration rejected: {reply}"
        );
        self.expect_welcome().await
    }

    /// Log into an existing account and consume the welcome banner.
    #[allow(dead_code)]
    pub async fn login(&mut self, username: &str, password: &str) -> anyhow::Result<()> {
        let reply = self.authenticate("LOGIN", username, password).await?;
        anyhow::ensure!(reply.starts_with("AUTH_SUCCESS:"), "login rejected: {reply}");
        self.expect_welcome().await
    }

    async fn expect_welcome(&mut self) -> anyhow::Result<()> {
        let banner = self.recv_line().await?;
        anyhow::ensure!(
            banner.contains("Welcome"),
            "expected welcome banner, got: {banner}"
        );
        Ok(())
    }

    /// Discard anything already queued (history replay, join notices).
    #[allow(dead_code)]
    pub async fn drain(&mut self) {
        while self
            .recv_line_timeout(Duration::from_millis(100))
            .await
            .is_ok()
        {}
    }

    /// Assert that nothing arrives within the window.
    #[allow(dead_code)]
    pub async fn assert_silent(&mut self, dur: Duration) -> anyhow::Result<()> {
        match self.recv_line_timeout(dur).await {
            Ok(line) => anyhow::bail!("expected silence, got: {line}"),
            Err(_) => Ok(()),
        }
    }
}
