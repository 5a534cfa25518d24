//! Halo2 circuit and proof engine for anonymous greetings.
//!
//! The circuit witnesses the identity secrets and the Merkle path and
//! enforces the protocol relations in-circuit with the Poseidon
//! `Pow5Chip`:
//!
//! - `commitment = Poseidon(trapdoor, nullifier_secret)`
//! - the Merkle fold from the commitment up to the root, with a
//!   boolean-constrained direction bit selecting child order per level
//! - `nullifier_hash = Poseidon(external_nullifier, nullifier_secret)`
//!
//! Exactly four public inputs are exposed through the instance column,
//! [root, nullifier_hash, signal_hash, external_nullifier], each
//! copy-constrained to the corresponding computed (or witnessed) advice
//! cell. A proof therefore carries membership and nullifier correctness
//! itself; a handcrafted witness cannot satisfy the gates for a root it
//! is not a member of.

use halo2_gadgets::poseidon::{
    primitives::{ConstantLength, P128Pow5T3 as PoseidonSpec},
    Hash as PoseidonHash, Pow5Chip, Pow5Config,
};
use halo2_proofs::{
    circuit::{AssignedCell, Layouter, SimpleFloorPlanner, Value},
    plonk::{
        create_proof, keygen_pk, keygen_vk, Advice, Circuit, Column, ConstraintSystem, Error,
        Expression, Instance, ProvingKey, Selector, VerifyingKey,
    },
    poly::{commitment::Params, Rotation},
    transcript::Blake2bWrite,
};
use log::{debug, info};
use pasta_curves::{pallas, vesta};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::ProtocolError;
use crate::types::{ProofBundle, PublicSignals};
use crate::witness::Witness;

/// Version tag baked into every artifact set and proof bundle. Bump when
/// the circuit layout changes; prover and verifier must agree on exactly
/// one version.
pub const CIRCUIT_VERSION: &str = "greeter-v1";

#[derive(Debug, Clone)]
pub struct GreeterConfig {
    /// Shared advice columns; Poseidon state lives on the first three,
    /// its partial s-box on the fourth, swap rows use all five.
    pub advice: [Column<Advice>; 5],
    pub instance: Column<Instance>,
    /// Selector for the per-level child-order swap gate.
    pub s_swap: Selector,
    pub poseidon: Pow5Config<pallas::Base, 3, 2>,
}

/// Circuit witness for one greeting.
#[derive(Debug, Default, Clone)]
pub struct GreeterCircuit {
    pub trapdoor: pallas::Base,
    pub nullifier_secret: pallas::Base,
    pub path_elements: Vec<pallas::Base>,
    pub path_indices: Vec<bool>,
    pub signal_hash: pallas::Base,
    pub external_nullifier: pallas::Base,
}

impl GreeterCircuit {
    /// Zero-valued circuit of the given tree depth, used for key
    /// generation. The path length is part of the circuit shape, so
    /// keygen and proving must use the same depth.
    #[must_use]
    pub fn keygen_shape(depth: usize) -> Self {
        Self {
            path_elements: vec![pallas::Base::zero(); depth],
            path_indices: vec![false; depth],
            ..Self::default()
        }
    }

    /// One Poseidon invocation over two assigned cells.
    fn hash_pair(
        config: &GreeterConfig,
        mut layouter: impl Layouter<pallas::Base>,
        left: AssignedCell<pallas::Base, pallas::Base>,
        right: AssignedCell<pallas::Base, pallas::Base>,
    ) -> Result<AssignedCell<pallas::Base, pallas::Base>, Error> {
        let chip = Pow5Chip::construct(config.poseidon.clone());
        let hasher = PoseidonHash::<
            pallas::Base,
            Pow5Chip<pallas::Base, 3, 2>,
            PoseidonSpec,
            ConstantLength<2>,
            3,
            2,
        >::init(chip, layouter.namespace(|| "hasher"))?;
        hasher.hash(layouter.namespace(|| "hash"), [left, right])
    }
}

impl Circuit<pallas::Base> for GreeterCircuit {
    type Config = GreeterConfig;
    type FloorPlanner = SimpleFloorPlanner;

    fn without_witnesses(&self) -> Self {
        Self::keygen_shape(self.path_elements.len())
    }

    fn configure(meta: &mut ConstraintSystem<pallas::Base>) -> Self::Config {
        let advice = [
            meta.advice_column(),
            meta.advice_column(),
            meta.advice_column(),
            meta.advice_column(),
            meta.advice_column(),
        ];
        for column in &advice {
            meta.enable_equality(*column);
        }

        let instance = meta.instance_column();
        meta.enable_equality(instance);

        let rc_a = [
            meta.fixed_column(),
            meta.fixed_column(),
            meta.fixed_column(),
        ];
        let rc_b = [
            meta.fixed_column(),
            meta.fixed_column(),
            meta.fixed_column(),
        ];
        meta.enable_constant(rc_b[0]);
        let poseidon = Pow5Chip::configure::<PoseidonSpec>(
            meta,
            [advice[0], advice[1], advice[2]],
            advice[3],
            rc_a,
            rc_b,
        );

        // Per level: bit must be boolean, and (left, right) must be the
        // (node, sibling) pair in child order. bit = 1 means the node is
        // the right child.
        let s_swap = meta.selector();
        meta.create_gate("merkle child order", |meta| {
            let s = meta.query_selector(s_swap);
            let node = meta.query_advice(advice[0], Rotation::cur());
            let sibling = meta.query_advice(advice[1], Rotation::cur());
            let bit = meta.query_advice(advice[2], Rotation::cur());
            let left = meta.query_advice(advice[3], Rotation::cur());
            let right = meta.query_advice(advice[4], Rotation::cur());
            let one = Expression::Constant(pallas::Base::one());

            vec![
                s.clone() * bit.clone() * (one.clone() - bit.clone()),
                s.clone()
                    * (left
                        - ((one.clone() - bit.clone()) * node.clone()
                            + bit.clone() * sibling.clone())),
                s * (right - (bit.clone() * node + (one - bit) * sibling)),
            ]
        });

        GreeterConfig {
            advice,
            instance,
            s_swap,
            poseidon,
        }
    }

    fn synthesize(
        &self,
        config: Self::Config,
        mut layouter: impl Layouter<pallas::Base>,
    ) -> Result<(), Error> {
        let (trapdoor, nullifier_secret, external_nullifier, signal_hash) = layouter
            .assign_region(
                || "load inputs",
                |mut region| {
                    let trapdoor = region.assign_advice(
                        || "trapdoor",
                        config.advice[0],
                        0,
                        || Value::known(self.trapdoor),
                    )?;
                    let nullifier_secret = region.assign_advice(
                        || "nullifier secret",
                        config.advice[1],
                        0,
                        || Value::known(self.nullifier_secret),
                    )?;
                    let external_nullifier = region.assign_advice(
                        || "external nullifier",
                        config.advice[2],
                        0,
                        || Value::known(self.external_nullifier),
                    )?;
                    let signal_hash = region.assign_advice(
                        || "signal hash",
                        config.advice[3],
                        0,
                        || Value::known(self.signal_hash),
                    )?;
                    Ok((trapdoor, nullifier_secret, external_nullifier, signal_hash))
                },
            )?;

        let mut node = Self::hash_pair(
            &config,
            layouter.namespace(|| "commitment"),
            trapdoor,
            nullifier_secret.clone(),
        )?;

        for (i, (sibling, is_right)) in self
            .path_elements
            .iter()
            .zip(&self.path_indices)
            .enumerate()
        {
            let (left, right) = layouter.assign_region(
                || format!("swap {i}"),
                |mut region| {
                    config.s_swap.enable(&mut region, 0)?;
                    let cur =
                        node.copy_advice(|| "node", &mut region, config.advice[0], 0)?;
                    region.assign_advice(
                        || "sibling",
                        config.advice[1],
                        0,
                        || Value::known(*sibling),
                    )?;
                    region.assign_advice(
                        || "direction",
                        config.advice[2],
                        0,
                        || Value::known(pallas::Base::from(*is_right as u64)),
                    )?;

                    let node_val = cur.value().copied();
                    let sib_val = Value::known(*sibling);
                    let (l, r) = if *is_right {
                        (sib_val, node_val)
                    } else {
                        (node_val, sib_val)
                    };
                    let left = region.assign_advice(|| "left", config.advice[3], 0, || l)?;
                    let right = region.assign_advice(|| "right", config.advice[4], 0, || r)?;
                    Ok((left, right))
                },
            )?;

            node = Self::hash_pair(
                &config,
                layouter.namespace(|| format!("level {i}")),
                left,
                right,
            )?;
        }

        let nullifier_hash = Self::hash_pair(
            &config,
            layouter.namespace(|| "nullifier"),
            external_nullifier.clone(),
            nullifier_secret,
        )?;

        layouter.constrain_instance(node.cell(), config.instance, 0)?;
        layouter.constrain_instance(nullifier_hash.cell(), config.instance, 1)?;
        layouter.constrain_instance(signal_hash.cell(), config.instance, 2)?;
        layouter.constrain_instance(external_nullifier.cell(), config.instance, 3)?;

        Ok(())
    }
}

/// Immutable, versioned proving material shared by engine and verifier.
///
/// Generated once (seconds-scale at realistic `k`), then shared via
/// `Arc` across concurrent proof requests. Never regenerated at runtime.
pub struct CircuitArtifacts {
    pub params: Params<vesta::Affine>,
    pub pk: ProvingKey<vesta::Affine>,
    pub vk: VerifyingKey<vesta::Affine>,
    pub k: u32,
    pub depth: usize,
    pub version: String,
}

impl CircuitArtifacts {
    /// Generates params and keys for the given circuit size and tree
    /// depth.
    pub fn generate(k: u32, depth: usize) -> Result<Arc<Self>, ProtocolError> {
        info!("generating circuit artifacts (k={k}, depth={depth})");
        let params: Params<vesta::Affine> = Params::new(k);
        let shape = GreeterCircuit::keygen_shape(depth);

        let vk = keygen_vk(&params, &shape).map_err(to_proving_error)?;
        let pk = keygen_pk(&params, vk.clone(), &shape).map_err(to_proving_error)?;

        Ok(Arc::new(Self {
            params,
            pk,
            vk,
            k,
            depth,
            version: format!("{CIRCUIT_VERSION}/k={k}/d={depth}"),
        }))
    }
}

fn to_proving_error(e: Error) -> ProtocolError {
    ProtocolError::Proving(format!("{e:?}"))
}

/// Generates proof bundles against a fixed artifact set.
#[derive(Clone)]
pub struct ProofEngine {
    artifacts: Arc<CircuitArtifacts>,
}

impl ProofEngine {
    #[must_use]
    pub fn new(artifacts: Arc<CircuitArtifacts>) -> Self {
        Self { artifacts }
    }

    #[must_use]
    pub fn artifacts(&self) -> &Arc<CircuitArtifacts> {
        &self.artifacts
    }

    /// Checks that the witness satisfies the circuit relations without
    /// running the prover. Proving is seconds-scale; an unsatisfiable
    /// witness (stale root, truncated path) is caught here instead of
    /// surfacing as an opaque constraint failure.
    fn check_satisfiable(&self, witness: &Witness) -> Result<(), ProtocolError> {
        if witness.path_elements.len() != self.artifacts.depth
            || witness.path_indices.len() != self.artifacts.depth
        {
            return Err(ProtocolError::WitnessUnsatisfiable(
                "merkle path length does not match the circuit depth",
            ));
        }

        let mut node = witness.commitment();
        for (sibling, is_right) in witness.path_elements.iter().zip(&witness.path_indices) {
            node = if *is_right {
                crate::field::poseidon_hash(*sibling, node)
            } else {
                crate::field::poseidon_hash(node, *sibling)
            };
        }
        if node != witness.root {
            return Err(ProtocolError::WitnessUnsatisfiable(
                "merkle path does not reach the public root",
            ));
        }

        Ok(())
    }

    /// Compiles the witness into a proof bundle.
    ///
    /// Runs to completion or fails atomically; there is no partial proof.
    /// This call is CPU-bound for seconds — prefer
    /// [`ProofEngine::generate_on_worker`] from an interactive context.
    pub fn generate(&self, witness: &Witness) -> Result<ProofBundle, ProtocolError> {
        self.check_satisfiable(witness)?;

        let nullifier_hash = witness.nullifier_hash();
        let circuit = GreeterCircuit {
            trapdoor: witness.trapdoor,
            nullifier_secret: witness.nullifier_secret,
            path_elements: witness.path_elements.clone(),
            path_indices: witness.path_indices.clone(),
            signal_hash: witness.signal_hash,
            external_nullifier: witness.external_nullifier,
        };

        let instance = vec![
            witness.root,
            nullifier_hash,
            witness.signal_hash,
            witness.external_nullifier,
        ];

        debug!("starting proof generation (k={})", self.artifacts.k);
        let mut transcript = Blake2bWrite::init(vec![]);
        let mut rng = rand::thread_rng();

        let instance_slice: &[&[&[pallas::Base]]] = &[&[&instance]];
        create_proof(
            &self.artifacts.params,
            &self.artifacts.pk,
            &[circuit],
            instance_slice,
            &mut rng,
            &mut transcript,
        )
        .map_err(to_proving_error)?;

        let proof = transcript.finalize();
        info!("proof generated: {} bytes", proof.len());

        let public_signals = PublicSignals::from_fields(
            witness.root,
            nullifier_hash,
            witness.signal_hash,
            witness.external_nullifier,
        );

        ProofBundle::new(proof, public_signals, self.artifacts.version.clone())
    }

    /// Dispatches proof generation to a dedicated worker thread so the
    /// calling thread stays responsive. Dropping the returned task
    /// detaches the computation; there is no partial result to salvage
    /// from a cancelled attempt.
    #[must_use]
    pub fn generate_on_worker(&self, witness: Witness) -> ProofTask {
        let engine = self.clone();
        ProofTask {
            handle: thread::spawn(move || engine.generate(&witness)),
        }
    }
}

/// Handle to an in-flight proof generation.
pub struct ProofTask {
    handle: JoinHandle<Result<ProofBundle, ProtocolError>>,
}

impl ProofTask {
    /// Blocks until the worker finishes and returns its result.
    pub fn wait(self) -> Result<ProofBundle, ProtocolError> {
        self.handle
            .join()
            .map_err(|_| ProtocolError::Proving("proving worker panicked".into()))?
    }

    /// True once the worker has finished (successfully or not).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
