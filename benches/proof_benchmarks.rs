use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pasta_curves::pallas;

use anon_greeter::circuit::{CircuitArtifacts, ProofEngine};
use anon_greeter::field::poseidon_hash;
use anon_greeter::identity::Identity;
use anon_greeter::merkle::MembershipTree;
use anon_greeter::verifier::ProofVerifier;
use anon_greeter::witness::{ExternalNullifier, Witness};

// In-circuit Poseidon needs ~40 rows per hash; depth 8 means ten hashes
// plus a swap row per level, so k = 10 leaves headroom.
const BENCH_K: u32 = 10;
const BENCH_DEPTH: usize = 8;

fn member_group(size: u64) -> (Identity, MembershipTree) {
    let member = Identity::derive(&[1u8; 65]).unwrap();
    let mut commitments = vec![member.commitment()];
    commitments.extend((1..size).map(pallas::Base::from));
    let tree = MembershipTree::build(commitments, BENCH_DEPTH).unwrap();
    (member, tree)
}

fn member_witness(member: &Identity, tree: &MembershipTree) -> Witness {
    let membership = tree.prove_membership(member.commitment()).unwrap();
    Witness::build(
        member,
        &membership,
        &ExternalNullifier::new("epoch-1"),
        b"hello",
    )
    .unwrap()
}

fn bench_proof_generation(c: &mut Criterion) {
    let artifacts = CircuitArtifacts::generate(BENCH_K, BENCH_DEPTH).unwrap();
    let engine = ProofEngine::new(artifacts);

    let mut group = c.benchmark_group("proof_generation");

    for group_size in [4u64, 16, 64, 256].iter() {
        let (member, tree) = member_group(*group_size);
        let witness = member_witness(&member, &tree);

        group.bench_with_input(
            BenchmarkId::from_parameter(group_size),
            group_size,
            |b, _| {
                b.iter(|| black_box(engine.generate(&witness).unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_proof_verification(c: &mut Criterion) {
    let artifacts = CircuitArtifacts::generate(BENCH_K, BENCH_DEPTH).unwrap();
    let engine = ProofEngine::new(artifacts.clone());

    let (member, tree) = member_group(32);
    let bundle = engine.generate(&member_witness(&member, &tree)).unwrap();

    c.bench_function("proof_verification", |b| {
        b.iter(|| {
            // Fresh verifier each iteration: an already-spent nullifier
            // would short-circuit before the cryptographic check.
            let verifier = ProofVerifier::new(artifacts.clone(), tree.root());
            black_box(verifier.verify(&bundle, b"hello").unwrap())
        })
    });
}

fn bench_tree_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_construction");

    for leaf_count in [16u64, 64, 256, 1024].iter() {
        let commitments: Vec<pallas::Base> = (1..=*leaf_count).map(pallas::Base::from).collect();

        group.bench_with_input(
            BenchmarkId::from_parameter(leaf_count),
            leaf_count,
            |b, _| {
                b.iter(|| {
                    black_box(MembershipTree::build(black_box(commitments.clone()), 10).unwrap())
                })
            },
        );
    }

    group.finish();
}

fn bench_membership_proof(c: &mut Criterion) {
    let commitments: Vec<pallas::Base> = (1..=256u64).map(pallas::Base::from).collect();
    let tree = MembershipTree::build(commitments, 10).unwrap();

    c.bench_function("membership_proof", |b| {
        b.iter(|| black_box(tree.prove_membership(black_box(pallas::Base::from(128))).unwrap()))
    });
}

fn bench_poseidon_hash(c: &mut Criterion) {
    c.bench_function("poseidon_hash", |b| {
        b.iter(|| {
            black_box(poseidon_hash(
                black_box(pallas::Base::from(42)),
                black_box(pallas::Base::from(99)),
            ))
        })
    });
}

criterion_group!(
    benches,
    bench_proof_generation,
    bench_proof_verification,
    bench_tree_construction,
    bench_membership_proof,
    bench_poseidon_hash
);
criterion_main!(benches);
