//! On-disk state: pretty-printed JSON, written atomically.
//!
//! Three files make up a node's persisted state: `user.json`,
//! `blockchain.json`, `peers.json`. Every save goes through a temp file and
//! a rename so a crash mid-write never leaves a torn state file behind.

use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn load<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
}

pub fn save<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pico_p2p::{Net, Peer};

    #[test]
    fn save_load_round_trip() {
        let dir = std::env::temp_dir().join(format!("pico_storage_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("peers.json");

        let net = Net::with_peers(vec![Peer::new("2001:db8::1", 10_000)]);
        save(&path, &net).unwrap();

        // Pretty-printed, and no stray temp file left behind.
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains('\n'));
        assert!(!dir.join("peers.json.tmp").exists());

        let back: Net = load(&path).unwrap();
        assert_eq!(back.peers, net.peers);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_missing_file_fails_with_context() {
        let missing = std::env::temp_dir().join("pico_storage_missing.json");
        let err = load::<Net>(&missing).unwrap_err();
        assert!(err.to_string().contains("reading"));
    }
}
