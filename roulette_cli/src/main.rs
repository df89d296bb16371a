use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use roulette_core::{
    commit, verify, verify_commitment, verify_spin, ClientSeedPolicy, OsEntropy, RngConfig, RouletteRng, WHEEL_SIZE,
};

#[derive(Parser)]
#[command(name = "roulette-cli", about = "Audit and exercise the provably fair roulette RNG")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a revealed spin
    Verify {
        #[arg(long)]
        server_seed: String,
        #[arg(long)]
        client_seed: String,
        #[arg(long, default_value_t = 0)]
        nonce: u64,
        #[arg(long)]
        outcome: u8,
        /// Commitment published before the spin
        #[arg(long)]
        hash: Option<String>,
    },
    /// Print the commitment of a revealed server seed
    Commit { seed: String },
    /// Spin locally N times and report the pocket distribution
    Simulate {
        #[arg(long, default_value_t = 37_000)]
        spins: u64,
        #[arg(long)]
        client_seed: Option<String>,
        #[arg(long, env = "CLIENT_SEED_POLICY", default_value = "keep")]
        policy: ClientSeedPolicy,
    },
}

fn chi_square(tally: &[u64], total: u64) -> f64 {
    let expected = total as f64 / tally.len() as f64;
    tally
        .iter()
        .map(|&observed| (observed as f64 - expected).powi(2) / expected)
        .sum()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Verify {
            server_seed,
            client_seed,
            nonce,
            outcome,
            hash,
        } => {
            let outcome_ok = verify(&server_seed, &client_seed, nonce, outcome);
            let hash_ok = hash.as_deref().map(|h| verify_commitment(&server_seed, h));
            println!("outcome: {}", if outcome_ok { "VALID" } else { "INVALID" });
            if let Some(ok) = hash_ok {
                println!("commitment: {}", if ok { "VALID" } else { "INVALID" });
            }
            if !outcome_ok || hash_ok == Some(false) {
                anyhow::bail!("verification failed");
            }
        }
        Commands::Commit { seed } => {
            println!("{}", commit(&seed));
        }
        Commands::Simulate {
            spins,
            client_seed,
            policy,
        } => {
            let config = RngConfig {
                client_seed_policy: policy,
                ..RngConfig::default()
            };
            let rng = RouletteRng::with_config(config, OsEntropy)?;
            let mut tally = vec![0u64; WHEEL_SIZE as usize];
            for i in 0..spins {
                let res = rng.spin(client_seed.as_deref())?;
                if !verify_spin(&res) {
                    anyhow::bail!("spin {} failed its own verification", i);
                }
                debug!(spin = i, number = res.winning_number, "simulated");
                tally[res.winning_number as usize] += 1;
            }
            for (number, count) in tally.iter().enumerate() {
                println!("{:>2} {:>8}", number, count);
            }
            let chi = chi_square(&tally, spins);
            info!(spins, chi, "simulation finished");
            println!("chi-square (df={}): {:.3}", WHEEL_SIZE - 1, chi);
        }
    }

    Ok(())
}
