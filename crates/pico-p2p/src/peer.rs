use serde::{Deserialize, Serialize};

use pico_core::constants::MAX_PEERS;

// ── Peer ─────────────────────────────────────────────────────────────────────

/// A gossip endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Peer {
    pub ipv6: String,
    pub port: u16,
}

impl Peer {
    pub fn new(ipv6: impl Into<String>, port: u16) -> Self {
        Self {
            ipv6: ipv6.into(),
            port,
        }
    }
}

impl std::fmt::Display for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]:{}", self.ipv6, self.port)
    }
}

// ── Net ──────────────────────────────────────────────────────────────────────

/// The known peer set. Gossip is monotonic: peers are only ever unioned in,
/// never evicted by protocol. The only removals happen at the size cap,
/// oldest entry first.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Net {
    pub peers: Vec<Peer>,

    /// Local endpoint; never persisted, used to skip self on broadcast.
    #[serde(skip)]
    local: Option<Peer>,
}

impl Net {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_peers(peers: Vec<Peer>) -> Self {
        Self { peers, local: None }
    }

    pub fn set_local(&mut self, ipv6: impl Into<String>, port: u16) {
        self.local = Some(Peer::new(ipv6, port));
    }

    pub fn local(&self) -> Option<&Peer> {
        self.local.as_ref()
    }

    /// Add a peer unless it is already known. Returns true when the set
    /// grew. At the cap the oldest entry makes room.
    pub fn update_peer(&mut self, peer: Peer) -> bool {
        if self.peers.contains(&peer) {
            return false;
        }
        if self.peers.len() >= MAX_PEERS {
            self.peers.remove(0);
        }
        self.peers.push(peer);
        true
    }

    /// Union a gossiped peer list in. Returns true when *any* entry was
    /// new, the caller's signal to rebroadcast and persist.
    pub fn update_peers(&mut self, peers: impl IntoIterator<Item = Peer>) -> bool {
        let mut grew = false;
        for peer in peers {
            grew |= self.update_peer(peer);
        }
        grew
    }
}

/// Learn the local IPv6 by opening a UDP socket toward a public resolver
/// and reading the bound address. Never sends a packet. Fails behind
/// v6-less or restrictive networks; callers fall back to an explicit
/// address.
pub fn discover_ipv6() -> std::io::Result<String> {
    let sock = std::net::UdpSocket::bind(("::", 0))?;
    sock.connect(("2001:4860:4860::8888", 80))?;
    Ok(sock.local_addr()?.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(tag: u16) -> Peer {
        Peer::new("fe80::1", tag)
    }

    #[test]
    fn union_is_monotonic_and_deduplicating() {
        let mut net = Net::new();
        assert!(net.update_peer(peer(1)));
        assert!(net.update_peer(peer(2)));
        assert!(!net.update_peer(peer(1)));
        assert_eq!(net.peers.len(), 2);
    }

    #[test]
    fn update_peers_reports_growth_only() {
        let mut net = Net::with_peers(vec![peer(1)]);
        assert!(net.update_peers(vec![peer(1), peer(2)]));
        assert!(!net.update_peers(vec![peer(1), peer(2)]));
    }

    #[test]
    fn gossip_reaches_a_fixed_point() {
        // A knows B, B knows A; A learns C. After two exchange rounds all
        // three sets are equal and nothing reports growth any more.
        let a_addr = Peer::new("2001:db8::a", 10_000);
        let b_addr = Peer::new("2001:db8::b", 10_000);
        let c_addr = Peer::new("2001:db8::c", 10_000);

        let mut a = Net::with_peers(vec![b_addr.clone(), a_addr.clone()]);
        let mut b = Net::with_peers(vec![a_addr.clone(), b_addr.clone()]);
        let mut c = Net::with_peers(vec![c_addr.clone()]);

        assert!(a.update_peer(c_addr.clone()));

        // A broadcasts; B and C union.
        assert!(b.update_peers(a.peers.clone()));
        assert!(c.update_peers(a.peers.clone()));
        // B broadcasts; A and C see nothing new but C's own echo back.
        assert!(!a.update_peers(b.peers.clone()));
        assert!(!c.update_peers(b.peers.clone()));
        // Fixed point: identical sets, no further growth anywhere.
        let sorted = |n: &Net| {
            let mut p = n.peers.clone();
            p.sort_by(|x, y| (&x.ipv6, x.port).cmp(&(&y.ipv6, y.port)));
            p
        };
        assert_eq!(sorted(&a), sorted(&b));
        assert_eq!(sorted(&b), sorted(&c));
        assert!(!a.update_peers(c.peers.clone()));
    }

    #[test]
    fn cap_evicts_the_oldest_entry() {
        let mut net = Net::new();
        for i in 0..MAX_PEERS {
            net.update_peer(Peer::new(format!("2001:db8::{i:x}"), 10_000));
        }
        assert_eq!(net.peers.len(), MAX_PEERS);
        let oldest = net.peers[0].clone();

        assert!(net.update_peer(Peer::new("2001:db8:ffff::1", 10_000)));
        assert_eq!(net.peers.len(), MAX_PEERS);
        assert!(!net.peers.contains(&oldest));
    }

    #[test]
    fn local_endpoint_is_not_serialized() {
        let mut net = Net::with_peers(vec![peer(1)]);
        net.set_local("::1", 10_000);
        let json = serde_json::to_string(&net).unwrap();
        assert!(!json.contains("local"));
        let back: Net = serde_json::from_str(&json).unwrap();
        assert_eq!(back.peers, net.peers);
        assert!(back.local().is_none());
    }
}
