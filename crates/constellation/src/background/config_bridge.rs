//! Hand the latest particle config to the frame loop without it ever seeing a half-updated
//! config. The writer always replaces the whole config, and readers take one snapshot per frame.

use std::sync::Arc;

use super::config::Config;

/// The writing side, owned by the shared state.
#[derive(Debug)]
pub(crate) struct ConfigBridge {
    /// The latest config
    sender: tokio::sync::watch::Sender<Arc<Config>>,
}

/// The reading side, owned by a frame loop.
#[derive(Debug, Clone)]
pub(crate) struct ConfigReader {
    /// Receives replacement configs
    receiver: tokio::sync::watch::Receiver<Arc<Config>>,
}

impl Default for ConfigBridge {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl ConfigBridge {
    /// Instantiate with an initial config.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let (sender, _) = tokio::sync::watch::channel(Arc::new(config));
        Self { sender }
    }

    /// Replace the whole config. It doesn't matter if nobody is reading yet.
    pub fn publish(&self, config: Config) {
        tracing::debug!("Publishing new particle config: {config:?}");
        self.sender.send_replace(Arc::new(config));
    }

    /// The current config.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Config> {
        Arc::clone(&self.sender.borrow())
    }

    /// Get a reader for a frame loop.
    #[must_use]
    pub fn subscribe(&self) -> ConfigReader {
        ConfigReader {
            receiver: self.sender.subscribe(),
        }
    }
}

impl ConfigReader {
    /// The current config.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Config> {
        Arc::clone(&self.receiver.borrow())
    }
}
