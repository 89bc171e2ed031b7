//! AKE Party CLI
//!
//! Command-line interface for one side of the key exchange:
//! - Credential generation
//! - Safety analysis report
//! - Initiating or responding to a session over the relay
//! - Local simulation of both parties

use ake_core::analysis::{analyze, Predicate, SafetyReport};
use ake_core::keygen::{self, KeyGenConfig, DEFAULT_MAX_DRAWS, DEFAULT_MODULUS_BITS};
use ake_core::random::{RngSource, SharedRandom};
use ake_core::session::{self, SessionReport, SimulationConfig};
use ake_core::{KeyPair, Role, SessionConfig, SessionId};
use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use msg_relay_client::RelayTransport;
use num_bigint::BigUint;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, Level};

const CREDENTIAL_FILE: &str = "credential.json";

/// AKE Party - key-exchange party node
#[derive(Parser)]
#[command(name = "ake-party")]
#[command(about = "Toy authenticated key-exchange party node")]
#[command(version)]
struct Cli {
    /// Relay service URL
    #[arg(short, long, env = "RELAY_URL", default_value = "http://127.0.0.1:8080")]
    relay: String,

    /// Party ID
    #[arg(short, long, env = "PARTY_ID", default_value = "0")]
    party_id: usize,

    /// Data directory for the credential
    #[arg(short, long, env = "DEST", default_value = "./data")]
    dest: PathBuf,

    /// Seconds to wait for each peer frame
    #[arg(short, long, env = "RECV_TIMEOUT_SECS", default_value = "30")]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

/// Where the modulus comes from
#[derive(Args, Debug, Clone)]
struct ModulusArgs {
    /// Bit length of a random modulus
    #[arg(long, default_value_t = DEFAULT_MODULUS_BITS)]
    bits: u64,

    /// Fixed modulus (decimal); overrides --bits
    #[arg(long)]
    modulus: Option<BigUint>,

    /// Candidate draws before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_DRAWS)]
    max_draws: usize,
}

impl ModulusArgs {
    fn keygen_config(&self) -> KeyGenConfig {
        let config = match &self.modulus {
            Some(n) => KeyGenConfig::with_modulus(n.clone()),
            None => KeyGenConfig::with_random_modulus(self.bits),
        };
        config.max_draws(self.max_draws)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a credential and a session ID to share with the peer
    Keygen {
        #[command(flatten)]
        modulus: ModulusArgs,
    },

    /// Print the safety analysis of a fresh or stored key pair
    Analyze {
        #[command(flatten)]
        modulus: ModulusArgs,

        /// Analyze the stored credential instead of generating one
        #[arg(long)]
        stored: bool,
    },

    /// Start a session as the initiator
    Initiate {
        /// Responder's party ID
        #[arg(long)]
        peer: usize,

        /// Message to encrypt (decimal, below N); random when absent
        #[arg(short, long)]
        message: Option<BigUint>,
    },

    /// Answer a session as the responder
    Respond {
        /// Initiator's party ID
        #[arg(long)]
        peer: usize,
    },

    /// Run both parties in-process
    Simulate {
        #[command(flatten)]
        modulus: ModulusArgs,

        /// Seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Credential shared out of band by both parties
#[derive(Debug, Serialize, Deserialize)]
struct Credential {
    /// Hex-encoded session ID
    session_id: String,
    keys: KeyPair,
}

impl Credential {
    fn session_id(&self) -> Result<SessionId> {
        hex::decode(&self.session_id)?
            .try_into()
            .map_err(|_| anyhow!("Session ID must be 32 bytes"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Keygen { modulus } => {
            run_keygen(&cli, modulus)?;
        }
        Commands::Analyze { modulus, stored } => {
            run_analyze(&cli, modulus, *stored)?;
        }
        Commands::Initiate { peer, message } => {
            run_party(&cli, Role::Initiator, *peer, message.clone()).await?;
        }
        Commands::Respond { peer } => {
            run_party(&cli, Role::Responder, *peer, None).await?;
        }
        Commands::Simulate { modulus, seed } => {
            run_simulate(&cli, modulus, *seed).await?;
        }
    }

    Ok(())
}

fn entropy_source() -> RngSource<StdRng> {
    RngSource::new(StdRng::from_entropy())
}

fn run_keygen(cli: &Cli, modulus: &ModulusArgs) -> Result<()> {
    info!(party_id = cli.party_id, "Generating credential");

    let keys = keygen::generate_keys(&modulus.keygen_config(), &mut entropy_source())?;
    let session_id: SessionId = rand::random();
    let credential = Credential {
        session_id: hex::encode(session_id),
        keys,
    };

    let path = save_credential(&cli.dest, &credential)?;

    info!(
        modulus = %credential.keys.modulus(),
        path = ?path,
        "Credential saved"
    );

    println!("Session ID: {}", credential.session_id);
    println!("Modulus: {}", credential.keys.modulus());

    Ok(())
}

fn run_analyze(cli: &Cli, modulus: &ModulusArgs, stored: bool) -> Result<()> {
    if stored {
        let credential = load_credential(&cli.dest)?;
        let keys = &credential.keys;
        print_safety(&analyze(&keys.public_key, &keys.private_key));
        return Ok(());
    }

    let started = Instant::now();
    let keys = keygen::generate_keys(&modulus.keygen_config(), &mut entropy_source())?;
    let elapsed = started.elapsed();

    println!("Modulus: {}", keys.modulus());
    print_safety(&analyze(&keys.public_key, &keys.private_key));
    println!("Key Generation Time: {:.6} seconds", elapsed.as_secs_f64());

    Ok(())
}

async fn run_party(
    cli: &Cli,
    role: Role,
    peer: usize,
    message: Option<BigUint>,
) -> Result<()> {
    let credential = load_credential(&cli.dest)?;

    let mut config = SessionConfig::new(role, cli.party_id, peer)
        .with_session_id(credential.session_id()?)
        .with_timeout(Duration::from_secs(cli.timeout));
    if let Some(message) = message {
        config = config.with_plaintext(message);
    }

    info!(
        party_id = cli.party_id,
        peer,
        role = %role,
        relay = %cli.relay,
        "Starting session"
    );

    let transport = RelayTransport::new(&cli.relay, cli.party_id);
    let report = session::run_session(&config, &credential.keys, &mut entropy_source(), &transport).await;

    print_report(&report);

    match report.error() {
        None => Ok(()),
        Some(e) => Err(anyhow::Error::new(e.clone())),
    }
}

async fn run_simulate(cli: &Cli, modulus: &ModulusArgs, seed: Option<u64>) -> Result<()> {
    let rng = match seed {
        Some(seed) => SharedRandom::new(RngSource::new(ChaCha20Rng::seed_from_u64(seed))),
        None => SharedRandom::new(entropy_source()),
    };

    let config = SimulationConfig {
        keygen: modulus.keygen_config(),
        receive_timeout: Duration::from_secs(cli.timeout),
        plaintext: None,
    };

    let report = session::simulate(&config, rng).await?;

    println!("Modulus: {}", report.modulus);
    print_safety(&report.safety);
    print_report(&report.initiator);
    print_report(&report.responder);

    if report.is_success() {
        println!("Simulation succeeded");
        Ok(())
    } else {
        Err(anyhow!("Simulation failed"))
    }
}

/// One line per analysis tool
fn safety_lines(report: &SafetyReport) -> Vec<String> {
    Predicate::ALL
        .iter()
        .filter_map(|predicate| report.outcome(*predicate))
        .map(|outcome| {
            if outcome.ok {
                format!("{} Condition: Safe", outcome.predicate.tool())
            } else {
                format!(
                    "{} Condition: Unsafe. Potential Attack: {}",
                    outcome.predicate.tool(),
                    outcome.attack_label
                )
            }
        })
        .collect()
}

fn print_safety(report: &SafetyReport) {
    for line in safety_lines(report) {
        println!("{line}");
    }
}

fn print_report(report: &SessionReport) {
    let path = report
        .history
        .iter()
        .map(|state| format!("{state:?}"))
        .collect::<Vec<_>>()
        .join(" -> ");

    println!("{} (party {}): {}", report.role, report.party_id, path);
    match (report.summary(), report.error()) {
        (Some(summary), _) => {
            println!("  Session Key: {}", summary.session_key.0);
            println!("  Message: {}", summary.plaintext);
        }
        (None, Some(e)) => {
            println!("  Failed: {} ({})", e, e.kind());
        }
        (None, None) => {}
    }
}

fn save_credential(dest: &Path, credential: &Credential) -> Result<PathBuf> {
    std::fs::create_dir_all(dest)?;
    let path = dest.join(CREDENTIAL_FILE);
    let json = serde_json::to_string_pretty(credential)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

fn load_credential(dest: &Path) -> Result<Credential> {
    let path = dest.join(CREDENTIAL_FILE);
    let json = std::fs::read_to_string(&path)
        .map_err(|e| anyhow!("Cannot read {}: {}", path.display(), e))?;
    let credential: Credential = serde_json::from_str(&json)?;
    Ok(credential)
}
