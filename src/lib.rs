//! Nebulabot: a Discord bot that relays commands to generative and search
//! backends and renders the results back into chat.

pub mod backends;
pub mod config;
pub mod discord;
pub mod error;
pub mod modes;
pub mod paginate;
pub mod pool;
pub mod rewrite;

pub use error::{Error, Result};

use modes::{ChannelModes, Language};
use paginate::ViewRegistry;
use rewrite::RewriteFilter;
use std::sync::Arc;

/// Process-scoped shared state, handed by reference into the event handlers.
/// Everything here is in-memory and dies with the process.
pub struct BotState {
    pub config: config::Config,
    pub backends: backends::Backends,
    /// Channels with an active "become" language.
    pub become_modes: Arc<ChannelModes<&'static Language>>,
    /// Channels with japanese mode toggled on.
    pub japanese_modes: Arc<ChannelModes<()>>,
    /// The two rewrite filters, applied in order to the bot's own messages.
    pub filters: Vec<RewriteFilter>,
    /// Live paginated views, keyed by host message ID.
    pub views: ViewRegistry,
}

impl BotState {
    pub fn new(config: config::Config) -> Result<Self> {
        let backends = backends::Backends::new(&config)?;
        let become_modes = Arc::new(ChannelModes::new());
        let japanese_modes = Arc::new(ChannelModes::new());
        let filters = vec![
            rewrite::become_filter(become_modes.clone()),
            rewrite::japanese_filter(japanese_modes.clone()),
        ];

        Ok(Self {
            config,
            backends,
            become_modes,
            japanese_modes,
            filters,
            views: ViewRegistry::new(),
        })
    }

    /// Drop all registries. Called once on shutdown.
    pub fn teardown(&self) {
        self.become_modes.clear_all();
        self.japanese_modes.clear_all();
        self.views.clear();
    }
}
