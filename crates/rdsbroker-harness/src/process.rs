use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;

use crate::error::HarnessError;

/// Printed on stderr by the broker once its credentials check has ended.
pub const CREDENTIALS_CHECK_MARKER: &str = "credentials check has ended";

/// Printed by the broker once it is listening on `port`.
pub fn started_marker(port: u16) -> String {
    format!("RDS Service Broker started on port {port}")
}

/// A broker binary running as a child process.
///
/// Output from both streams is logged line by line and kept so callers can
/// wait for markers. The child is killed when this handle drops.
pub struct BrokerProcess {
    child: Child,
    port: u16,
    output: Arc<Mutex<Vec<String>>>,
    lines: watch::Receiver<usize>,
}

impl BrokerProcess {
    /// Start `binary` with `-port=<port> -config=<config>`, picking a free
    /// local port when `port` is `None`.
    pub async fn spawn(
        binary: &Path,
        config: &Path,
        port: Option<u16>,
    ) -> Result<Self, HarnessError> {
        let port = match port {
            Some(p) => p,
            None => free_port()?,
        };

        let mut child = Command::new(binary)
            .arg(format!("-port={port}"))
            .arg(format!("-config={}", config.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                binary: PathBuf::from(binary),
                source,
            })?;
        tracing::info!(binary = %binary.display(), port, pid = ?child.id(), "started broker");

        let output = Arc::new(Mutex::new(Vec::new()));
        let (tx, lines) = watch::channel(0usize);
        let tx = Arc::new(tx);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward(stdout, "stdout", Arc::clone(&output), Arc::clone(&tx)));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward(stderr, "stderr", Arc::clone(&output), Arc::clone(&tx)));
        }

        Ok(Self {
            child,
            port,
            output,
            lines,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Everything the broker has printed so far, both streams interleaved.
    pub fn output(&self) -> Vec<String> {
        lock(&self.output).clone()
    }

    pub fn has_printed(&self, marker: &str) -> bool {
        lock(&self.output).iter().any(|line| line.contains(marker))
    }

    /// Wait until some output line contains `marker`.
    ///
    /// Fails with [`HarnessError::BrokerExited`] if both output streams
    /// close first, and [`HarnessError::MarkerTimeout`] after `timeout`.
    pub async fn wait_for_output(&self, marker: &str, timeout: Duration) -> Result<(), HarnessError> {
        let mut lines = self.lines.clone();
        let wait = async {
            loop {
                if self.has_printed(marker) {
                    return Ok(());
                }
                if lines.changed().await.is_err() {
                    return if self.has_printed(marker) {
                        Ok(())
                    } else {
                        Err(HarnessError::BrokerExited {
                            marker: marker.to_string(),
                        })
                    };
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(HarnessError::MarkerTimeout {
                marker: marker.to_string(),
                timeout,
            }),
        }
    }

    /// Wait for the listening marker for this process's port.
    pub async fn wait_until_started(&self, timeout: Duration) -> Result<(), HarnessError> {
        self.wait_for_output(&started_marker(self.port), timeout).await
    }

    pub async fn kill(&mut self) -> Result<(), HarnessError> {
        tracing::info!(port = self.port, "stopping broker");
        self.child.kill().await.map_err(HarnessError::Stop)
    }
}

async fn forward(
    stream: impl AsyncRead + Unpin,
    name: &'static str,
    output: Arc<Mutex<Vec<String>>>,
    tx: Arc<watch::Sender<usize>>,
) {
    let mut reader = BufReader::new(stream).lines();
    loop {
        match reader.next_line().await {
            Ok(Some(line)) => {
                tracing::debug!(stream = name, "broker: {line}");
                lock(&output).push(line);
                tx.send_modify(|n| *n += 1);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(stream = name, error = %e, "failed to read broker output");
                break;
            }
        }
    }
}

fn lock(output: &Mutex<Vec<String>>) -> std::sync::MutexGuard<'_, Vec<String>> {
    output.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn free_port() -> Result<u16, HarnessError> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).map_err(HarnessError::Port)?;
    let port = listener.local_addr().map_err(HarnessError::Port)?.port();
    Ok(port)
}
