use std::collections::HashSet;
use std::fs::File;
use std::io::Write;

use anon_greeter::field::field_to_hex;
use anon_greeter::identity::{Identity, IdentitySigner, WalletSigner, IDENTITY_MESSAGE};

fn generate_commitments(count: usize) -> Vec<String> {
    let mut commitments = Vec::with_capacity(count);
    for _ in 0..count {
        let signer = WalletSigner::random();
        let signed = signer.sign(IDENTITY_MESSAGE).expect("signing cannot fail");
        let identity = Identity::derive(&signed).expect("signature is long enough");
        commitments.push(field_to_hex(identity.commitment()));
    }
    commitments
}

fn check_duplicates(commitments: &[String]) -> bool {
    let unique: HashSet<_> = commitments.iter().collect();
    unique.len() == commitments.len()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let count = 64;
    let output_file = "group_commitments.txt";

    println!("Generating {count} random member identities...");
    let commitments = generate_commitments(count);

    if !check_duplicates(&commitments) {
        return Err("Generated duplicate commitments".into());
    }

    println!("Writing commitments to {output_file}...");
    let mut file = File::create(output_file)?;
    for commitment in &commitments {
        writeln!(file, "{commitment}")?;
    }

    println!("Successfully generated {count} commitments");
    println!("First 5:");
    for (i, commitment) in commitments.iter().take(5).enumerate() {
        println!("  {}: {}", i + 1, commitment);
    }

    Ok(())
}
