use pico_core::constants::DEFAULT_PORT;

/// Configuration for the gossip transport.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Address to bind the listener to.
    pub listen_addr: String,
    /// Gossip port, announced to peers alongside the local address.
    pub port: u16,
    /// Self-address override for hosts where UDP-based discovery fails.
    pub self_addr: Option<String>,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            listen_addr: "::".into(),
            port: DEFAULT_PORT,
            self_addr: None,
        }
    }
}
