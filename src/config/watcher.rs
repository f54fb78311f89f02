//! Configuration file watcher for hot reload.
//!
//! # Responsibilities
//! - Notice edits to the config file, including editors that save by renaming a temp file
//! - Collapse a burst of file events into one reload
//! - Hand only new, valid configurations to the server
//!
//! # Design Decisions
//! - The parent directory is watched, not the file, so a replaced inode keeps being observed
//! - Unchanged file content never triggers a table rebuild

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::ProxyConfig;

/// Quiet period after the last file event before the file is read.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Watches one configuration file and emits each new valid [`ProxyConfig`].
pub struct ConfigWatcher {
    path: PathBuf,
    debounce: Duration,
    update_tx: mpsc::UnboundedSender<ProxyConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ProxyConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                debounce: DEFAULT_DEBOUNCE,
                update_tx,
            },
            update_rx,
        )
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start watching. Must be called inside a Tokio runtime; the returned watcher must be
    /// kept alive for as long as updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name: OsString = self
            .path
            .file_name()
            .map(OsString::from)
            .ok_or_else(|| notify::Error::generic("config path has no file name"))?;

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = (event.kind.is_modify() || event.kind.is_create())
                        && event
                            .paths
                            .iter()
                            .any(|p| p.file_name() == Some(file_name.as_os_str()));
                    if relevant {
                        let _ = event_tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let initial = std::fs::read_to_string(&self.path).ok();
        tokio::spawn(reload_loop(
            self.path.clone(),
            self.debounce,
            initial,
            event_rx,
            self.update_tx,
        ));

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

async fn reload_loop(
    path: PathBuf,
    debounce: Duration,
    mut last: Option<String>,
    mut events: mpsc::UnboundedReceiver<()>,
    updates: mpsc::UnboundedSender<ProxyConfig>,
) {
    while events.recv().await.is_some() {
        // Wait for the burst to settle.
        loop {
            match tokio::time::timeout(debounce, events.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::error!(path = ?path, error = %e, "Failed to read config, keeping current vhost table");
                continue;
            }
        };
        if last.as_deref() == Some(content.as_str()) {
            tracing::debug!(path = ?path, "Config file unchanged, skipping reload");
            continue;
        }

        match parse_config(&content) {
            Ok(config) => {
                tracing::info!(path = ?path, vhosts = config.vhosts.len(), "Config file changed, reloading");
                last = Some(content);
                if updates.send(config).is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::error!(path = ?path, error = %e, "Failed to reload config, keeping current vhost table");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(test: &str, content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("vhost-proxy-{test}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("proxy.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    async fn next_update(updates: &mut mpsc::UnboundedReceiver<ProxyConfig>) -> ProxyConfig {
        tokio::time::timeout(Duration::from_secs(10), updates.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_reload_on_change() {
        let (dir, path) = temp_config("watch-change", "[vhosts.\"a.example.com\"]\n");
        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _guard = watcher.with_debounce(Duration::from_millis(100)).run().unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;
        std::fs::write(&path, "[vhosts.\"b.example.com\"]\nport = 81\n").unwrap();

        let config = next_update(&mut updates).await;
        assert_eq!(config.vhosts["b.example.com"].port, Some(81));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_reload_after_rename_over_file() {
        let (dir, path) = temp_config("watch-rename", "[vhosts.\"a.example.com\"]\n");
        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _guard = watcher.with_debounce(Duration::from_millis(100)).run().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        for (round, host) in ["b.example.com", "c.example.com"].into_iter().enumerate() {
            let tmp = dir.join(format!(".proxy.toml.{round}"));
            std::fs::write(&tmp, format!("[vhosts.\"{host}\"]\n")).unwrap();
            std::fs::rename(&tmp, &path).unwrap();

            let config = next_update(&mut updates).await;
            assert!(config.vhosts.contains_key(host), "round {round}");
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_burst_of_writes_reloads_once() {
        let (dir, path) = temp_config("watch-burst", "[vhosts.\"a.example.com\"]\n");
        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _guard = watcher.with_debounce(Duration::from_millis(300)).run().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        for port in [81, 82, 83] {
            std::fs::write(&path, format!("[vhosts.\"a.example.com\"]\nport = {port}\n")).unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let config = next_update(&mut updates).await;
        assert_eq!(config.vhosts["a.example.com"].port, Some(83));
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(updates.try_recv().is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_unchanged_or_invalid_content_is_not_sent() {
        let initial = "[vhosts.\"a.example.com\"]\n";
        let (dir, path) = temp_config("watch-same", initial);
        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _guard = watcher.with_debounce(Duration::from_millis(100)).run().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        std::fs::write(&path, initial).unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        std::fs::write(&path, "[vhosts.\"a.example.com:80\"]\n").unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(updates.try_recv().is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
