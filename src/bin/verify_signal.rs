use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anon_greeter::circuit::CircuitArtifacts;
use anon_greeter::config::Config;
use anon_greeter::field::decode_hex_32;
use anon_greeter::merkle::MembershipTree;
use anon_greeter::submit::{CommitmentFile, CommitmentSource};
use anon_greeter::types::ProofBundle;
use anon_greeter::verifier::{NullifierStore, ProofVerifier, Verdict};

#[derive(Parser, Debug)]
#[command(author, version, about = "Verify an anonymous greeting proof bundle", long_about = None)]
struct Args {
    /// Proof bundle JSON produced by the `greet` binary.
    #[arg(short, long)]
    bundle: PathBuf,

    /// File with the published identity commitments.
    #[arg(short, long)]
    group_file: PathBuf,

    /// The greeting payload the sender claims to have signed.
    #[arg(short, long)]
    signal: String,

    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn run(args: &Args, config: &Config) -> Result<Verdict> {
    info!("loading bundle from {}", args.bundle.display());
    let metadata = fs::metadata(&args.bundle).context("Failed to read bundle metadata")?;
    if metadata.len() > config.verifier.max_bundle_file_size {
        anyhow::bail!(
            "bundle file is {} bytes (limit {})",
            metadata.len(),
            config.verifier.max_bundle_file_size
        );
    }

    let content = fs::read_to_string(&args.bundle).context("Failed to read bundle file")?;
    let bundle: ProofBundle =
        serde_json::from_str(&content).context("Failed to parse bundle JSON")?;

    println!("Bundle details:");
    println!("  Root:           {}", bundle.public_signals.root);
    println!("  Nullifier hash: {}", bundle.public_signals.nullifier_hash);
    println!("  Version:        {}", bundle.version);
    println!("  Proof size:     {} bytes", bundle.proof.len());

    info!("rebuilding membership tree from {}", args.group_file.display());
    let source = CommitmentFile::new(&args.group_file, config.group.max_file_size);
    let commitments = source
        .fetch_commitments()
        .context("Failed to load group commitments")?;
    let tree = MembershipTree::build(commitments, config.circuit.depth)
        .context("Failed to build membership tree")?;

    info!(
        "generating verification artifacts (k={}, depth={})",
        config.circuit.k, config.circuit.depth
    );
    let artifacts = CircuitArtifacts::generate(config.circuit.k, config.circuit.depth)
        .context("Failed to generate circuit artifacts")?;

    let store = NullifierStore::new(&config.verifier.nullifier_store);
    let spent = store
        .load()
        .context("Failed to load spent nullifier store")?;
    debug!("loaded {} spent nullifiers", spent.len());

    let verifier = ProofVerifier::with_spent(artifacts, tree.root(), spent);
    let verdict = verifier
        .verify(&bundle, args.signal.as_bytes())
        .context("Verification errored before reaching a verdict")?;

    if verdict.is_accepted() {
        let nullifier = decode_hex_32(&bundle.public_signals.nullifier_hash, "nullifier")?;
        let recorded = store
            .record(&nullifier)
            .with_context(|| format!("Failed to record nullifier to {}", store.path().display()))?;
        if recorded {
            info!("nullifier recorded to {}", store.path().display());
        } else {
            // Another verifier run recorded it between our load and now.
            anyhow::bail!("nullifier was already recorded by a concurrent run; rejecting");
        }
    }

    Ok(verdict)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load_from_file_or_default(args.config.as_ref());

    match run(&args, &config) {
        Ok(Verdict::Accepted) => {
            println!("\n✓ Greeting ACCEPTED");
            println!("The sender proved group membership without revealing their identity,");
            println!("and this epoch's nullifier has now been spent.");
            ExitCode::SUCCESS
        }
        Ok(verdict) => {
            println!("\n✗ Greeting {verdict}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
