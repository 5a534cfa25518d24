use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;

use anon_greeter::circuit::{CircuitArtifacts, ProofEngine};
use anon_greeter::config::Config;
use anon_greeter::identity::{Identity, IdentitySigner, WalletSigner, IDENTITY_MESSAGE};
use anon_greeter::merkle::MembershipTree;
use anon_greeter::submit::{CommitmentFile, CommitmentSource};
use anon_greeter::witness::{ExternalNullifier, Witness};

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate an anonymous greeting proof", long_about = None)]
struct Args {
    /// File with the published identity commitments, one hex value per line.
    #[arg(short, long)]
    group_file: PathBuf,

    /// Wallet private key (hex) that signs the identity message.
    #[arg(short, long, env = "GREETER_PRIVATE_KEY")]
    private_key: String,

    /// The greeting payload to sign anonymously.
    #[arg(short, long, default_value = "hello")]
    signal: String,

    /// Epoch scope; one greeting per identity per epoch.
    #[arg(short, long)]
    epoch: Option<String>,

    #[arg(short, long, default_value = "greeting.proof.json")]
    output: PathBuf,

    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = Config::load_from_file_or_default(args.config.as_ref());
    let epoch = args.epoch.unwrap_or_else(|| config.submit.epoch.clone());

    println!("Signing identity message with wallet key...");
    let signer = WalletSigner::from_private_key(&args.private_key)
        .context("Failed to load wallet from private key")?;
    println!("Wallet address: {}", signer.address());

    let signed = signer
        .sign(IDENTITY_MESSAGE)
        .context("Failed to sign the identity message")?;
    let identity = Identity::derive(&signed).context("Failed to derive identity")?;
    println!(
        "Identity commitment: {}",
        anon_greeter::field::field_to_hex(identity.commitment())
    );

    println!("Loading group from: {}", args.group_file.display());
    let source = CommitmentFile::new(&args.group_file, config.group.max_file_size);
    let commitments = source
        .fetch_commitments()
        .context("Failed to load group commitments")?;
    println!("Loaded {} commitments", commitments.len());

    let tree = MembershipTree::build(commitments, config.circuit.depth)
        .context("Failed to build membership tree")?;
    println!(
        "Merkle root: {}",
        anon_greeter::field::field_to_hex(tree.root())
    );

    let membership = tree
        .prove_membership(identity.commitment())
        .context("This wallet's commitment is not in the group")?;

    let scope = ExternalNullifier::new(&epoch);
    let witness = Witness::build(&identity, &membership, &scope, args.signal.as_bytes())
        .context("Failed to assemble witness")?;

    println!(
        "Generating circuit artifacts (k={}, depth={})...",
        config.circuit.k, config.circuit.depth
    );
    let artifacts = CircuitArtifacts::generate(config.circuit.k, config.circuit.depth)
        .context("Failed to generate circuit artifacts")?;
    let engine = ProofEngine::new(artifacts);

    println!("Generating ZK proof (this may take a while)...");
    let bundle = engine
        .generate_on_worker(witness)
        .wait()
        .context("Proof generation failed")?;
    println!("Proof generated: {} bytes", bundle.proof.len());

    let json = serde_json::to_string_pretty(&bundle).context("Failed to serialize bundle")?;
    fs::write(&args.output, json)
        .with_context(|| format!("Failed to write bundle to {}", args.output.display()))?;

    println!("Proof bundle written to: {}", args.output.display());
    println!("  Root:              {}", bundle.public_signals.root);
    println!("  Nullifier hash:    {}", bundle.public_signals.nullifier_hash);
    println!("  Signal hash:       {}", bundle.public_signals.signal_hash);
    println!("  Epoch scope:       {epoch}");

    Ok(())
}
