//! Test server management.
//!
//! Spawns and manages chamberd instances for integration testing.

use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::Duration;
use tokio::time::sleep;

/// A test server instance.
pub struct TestServer {
    child: Child,
    port: u16,
    data_dir: PathBuf,
}

impl TestServer {
    /// Spawn a new test server on the given port.
    ///
    /// Every test uses its own port so the suites can run in parallel.
    pub async fn spawn(port: u16) -> anyhow::Result<Self> {
        // Temporary directory for the config file and database
        let data_dir = std::env::temp_dir().join(format!("chamberd-test-{port}"));
        std::fs::create_dir_all(&data_dir)?;

        let config_path = data_dir.join("chamberd.toml");
        let config_content = format!(
            r#"
[server]
name = "chamber.test"

[listen]
address = "127.0.0.1:{port}"

[database]
path = "{}/test.db"

[history]
replay_limit = 50
"#,
            data_dir.display()
        );
        std::fs::write(&config_path, config_content)?;

        // Path to the chamberd binary in the target dir
        let binary_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("target/debug/chamberd");

        let child = Command::new(&binary_path)
            .arg(config_path.to_str().unwrap())
            .spawn()?;

        let server = Self {
            child,
            port,
            data_dir,
        };

        server.wait_until_ready().await?;

        Ok(server)
    }

    /// Wait until the server is accepting connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..30 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server failed to start within 3 seconds")
    }

    /// Get the server address.
    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Connect a fresh client to this server.
    pub async fn connect(&self) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(&self.address()).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Kill the server process
        let _ = self.child.kill();
        let _ = self.child.wait();

        // Clean up test data directory
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}
