//! pico-node — the PicoCoin node binary.
//!
//! Startup sequence:
//!   1. Load (or register) the identity, unlock it with the password
//!   2. Load (or create) the blockchain and the peer list
//!   3. Join the gossip: announce the local endpoint to every known peer
//!   4. Optionally broadcast a user-issued transaction
//!   5. Serve: dispatch inbound frames, and mine on a dedicated thread

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{info, warn};

use pico_chain::{Blockchain, ChainParams};
use pico_core::act::Act;
use pico_core::constants::{CHAIN_VERSION, DEFAULT_PORT, H_DIFF_INIT, V_DIFF_EXP_BASE};
use pico_core::transaction::Transaction;
use pico_core::types::PubKey;
use pico_crypto::User;
use pico_p2p::{discover_ipv6, network, Envelope, Net, NetConfig, Peer};

mod server;
mod storage;

use server::{Node, StatePaths};

/// Bootstrap peers baked into a fresh install.
const SEED_PEERS: [(&str, u16); 2] = [
    ("2002:c257:6f39::1", 10_000),
    ("2002:c257:65d4::1", 10_000),
];

#[derive(Parser, Debug)]
#[command(
    name = "pico-node",
    version,
    about = "PicoCoin node — prime-factorization proof-of-work cryptocurrency"
)]
struct Args {
    /// Path to the user keys.
    #[arg(long, default_value = "user.json")]
    usr: PathBuf,

    /// Path to the blockchain.
    #[arg(long, default_value = "blockchain.json")]
    chain: PathBuf,

    /// Path to the peer list.
    #[arg(long, default_value = "peers.json")]
    peers: PathBuf,

    /// Work as a mining node.
    #[arg(long)]
    mining: bool,

    /// Build, sign and broadcast a transaction: <to> <act> <args>
    /// where <act> is ivc, pay or msg.
    #[arg(long, num_args = 3, value_names = ["TO", "ACT", "ARGS"])]
    trans: Option<Vec<String>>,

    /// Print the balance and exit (unless mining).
    #[arg(long)]
    bal: bool,

    /// Listen / self address override (skips IPv6 discovery).
    #[arg(long)]
    adr: Option<String>,

    /// Gossip port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Horizontal difficulty override.
    #[arg(long, default_value_t = H_DIFF_INIT)]
    h_diff: u32,

    /// Vertical-difficulty exponent base override.
    #[arg(long, default_value_t = V_DIFF_EXP_BASE)]
    v_diff_base: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("PicoCoin node starting");

    // ── Identity ──────────────────────────────────────────────────────────────
    let (user, password) = if args.usr.exists() {
        let user: User = storage::load(&args.usr)?;
        if !user.verify_hash() {
            bail!("user file corrupted: hash mismatch");
        }
        let password = login(&user)?;
        (user, password)
    } else {
        let (user, password) = register()?;
        storage::save(&args.usr, &user)?;
        info!(key = user.public.short(), "registered new identity");
        (user, password)
    };

    // ── Blockchain ────────────────────────────────────────────────────────────
    let params = ChainParams {
        h_diff_init: args.h_diff,
        v_diff_exp_base: args.v_diff_base,
        ..ChainParams::default()
    };
    let chain = if args.chain.exists() {
        let mut chain: Blockchain = storage::load(&args.chain)?;
        chain.set_params(params);
        chain
    } else {
        let chain = Blockchain::with_params(CHAIN_VERSION, params);
        storage::save(&args.chain, &chain)?;
        chain
    };

    if args.bal {
        println!("Balance: {} picocoins.", chain.balance(&user.public));
        if !args.mining {
            return Ok(());
        }
    }

    // ── Peers ─────────────────────────────────────────────────────────────────
    let mut net = if args.peers.exists() {
        storage::load::<Net>(&args.peers)?
    } else {
        let mut net = Net::new();
        for (ipv6, port) in SEED_PEERS {
            net.update_peer(Peer::new(ipv6, port));
        }
        net
    };

    let net_config = NetConfig {
        listen_addr: args.adr.clone().unwrap_or_else(|| "::".into()),
        port: args.port,
        self_addr: args.adr.clone(),
    };
    let listener = network::Listener::bind(&net_config)
        .await
        .context("binding gossip listener")?;
    let local_port = listener.port().context("reading listener port")?;

    let self_ip = match net_config.self_addr {
        Some(adr) => adr,
        None => discover_ipv6().unwrap_or_else(|e| {
            warn!(error = %e, "IPv6 discovery failed; announcing loopback");
            "::1".into()
        }),
    };
    net.set_local(self_ip, local_port);

    // ── Node ──────────────────────────────────────────────────────────────────
    let paths = StatePaths {
        chain: args.chain.clone(),
        peers: args.peers.clone(),
    };
    let (node, outbound_rx) = Node::new(user, chain, net, paths, args.mining);

    // ── User-issued transaction ───────────────────────────────────────────────
    let user_tx = match &args.trans {
        Some(parts) => Some(build_trans(&node.user, &password, parts)?),
        None => None,
    };

    if let (Some(tx), false) = (&user_tx, args.mining) {
        // One-shot: broadcast straight to the current peers and exit.
        let (peers, local) = {
            let shared = node.shared.lock().expect("state mutex poisoned");
            (shared.net.peers.clone(), shared.net.local().cloned())
        };
        info!(trans = %tx.hash.short(), "broadcasting transaction");
        network::broadcast(&peers, local.as_ref(), &Envelope::trans(tx.clone())).await;
        return Ok(());
    }

    // ── Serve ─────────────────────────────────────────────────────────────────
    tokio::spawn(server::outbound_loop(node.clone(), outbound_rx));
    node.announce_self();

    if let Some(tx) = user_tx {
        node.submit_trans(tx);
    }
    if args.mining {
        node.spawn_mining();
    }

    let (inbound_tx, mut inbound_rx) = tokio::sync::mpsc::channel(256);
    tokio::spawn(listener.run(inbound_tx));

    info!("node ready");
    while let Some(envelope) = inbound_rx.recv().await {
        node.dispatch(envelope);
    }

    Ok(())
}

// ── Transaction building ─────────────────────────────────────────────────────

fn build_trans(user: &User, password: &str, parts: &[String]) -> anyhow::Result<Transaction> {
    let to = PubKey::new(parts[0].clone());
    let act = match parts[1].as_str() {
        "ivc" => Act::Invoice {
            ivc: parts[2].parse().context("parsing invoice amount")?,
        },
        "pay" => Act::Payment {
            pay: parts[2].parse().context("parsing payment amount")?,
        },
        "msg" => Act::Message {
            msg: parts[2].clone(),
        },
        other => bail!("unknown act kind {other:?} (expected ivc, pay or msg)"),
    };

    let mut tx = Transaction::new(Some(user.public.clone()), to, act);
    user.sign_transaction(&mut tx, password)
        .map_err(|e| anyhow::anyhow!("signing transaction: {e}"))?;
    Ok(tx)
}

// ── Password handling ────────────────────────────────────────────────────────

fn password_from_env() -> Option<String> {
    std::env::var("PICO_PASSWORD").ok()
}

fn login(user: &User) -> anyhow::Result<String> {
    if let Some(password) = password_from_env() {
        user.check_password(&password)
            .map_err(|_| anyhow::anyhow!("invalid password in PICO_PASSWORD"))?;
        return Ok(password);
    }
    loop {
        let password = rpassword::prompt_password("Password: ").context("reading password")?;
        match user.check_password(&password) {
            Ok(()) => return Ok(password),
            Err(_) => eprintln!("Invalid password!"),
        }
    }
}

fn register() -> anyhow::Result<(User, String)> {
    if let Some(password) = password_from_env() {
        return Ok((User::create(&password), password));
    }
    println!("No user presented, register a new one.");
    loop {
        let first = rpassword::prompt_password("Password: ").context("reading password")?;
        let second =
            rpassword::prompt_password("Repeat password: ").context("reading password")?;
        if first == second {
            return Ok((User::create(&first), first));
        }
        println!("Passwords mismatch, please try again.");
    }
}
