//! # Sensor Proof Pipeline Benchmarks
//!
//! Hot paths of the pipeline on a single device:
//!
//! | Stage | Operation | Target |
//! |-------|-----------|--------|
//! | ps-01 Canonical Encoding | encode + digest one reading | < 50µs |
//! | ps-03 Proof Builder | sign + verify one proof | < 200µs |
//! | ps-04 Merkle Aggregation | root over 1,000 proofs | < 5ms |
//! | ps-04 Merkle Aggregation | inclusion path + check | < 20µs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ps_01_canonical_encoding::{digest_of, CanonicalEncoder, CanonicalFormat};
use ps_03_proof_builder::verify_proof;
use ps_04_merkle_aggregation::{leaf_hash, verify_inclusion, MerkleBatch};
use rand::Rng;
use shared_crypto::Ed25519KeyPair;
use shared_types::{
    DevicePublicKey, GpsFix, MotionSample, Reading, ReadingPayload, SignatureBytes, SignedProof,
};
use std::time::Duration;

const NOW: u64 = 1_700_000_000_000;

fn random_gps(rng: &mut impl Rng, device: DevicePublicKey, ts: u64) -> Reading {
    Reading::new(
        ReadingPayload::Gps(GpsFix {
            latitude: rng.gen_range(-90.0..90.0),
            longitude: rng.gen_range(-180.0..180.0),
            altitude_m: Some(rng.gen_range(0.0..500.0)),
            accuracy_m: Some(rng.gen_range(1.0..30.0)),
            speed_mps: None,
        }),
        ts,
        device,
    )
}

fn random_motion(rng: &mut impl Rng, device: DevicePublicKey, ts: u64) -> Reading {
    Reading::new(
        ReadingPayload::Motion(MotionSample {
            accel_x: rng.gen_range(-2.0..2.0),
            accel_y: rng.gen_range(-2.0..2.0),
            accel_z: rng.gen_range(8.0..11.0),
            gyro_x: rng.gen_range(-0.5..0.5),
            gyro_y: rng.gen_range(-0.5..0.5),
            gyro_z: rng.gen_range(-0.5..0.5),
        }),
        ts,
        device,
    )
}

fn sign(keypair: &Ed25519KeyPair, encoder: &CanonicalEncoder, reading: Reading) -> SignedProof {
    let bytes = encoder.encode(&reading).expect("benchmark readings encode");
    let digest = digest_of(&bytes);
    let signature = SignatureBytes::from_bytes(*keypair.sign(&bytes).as_bytes());
    let signer = DevicePublicKey::from_bytes(*keypair.public_key().as_bytes());
    SignedProof::from_parts(reading, signature, signer, digest)
}

fn proofs(count: usize) -> Vec<SignedProof> {
    let mut rng = rand::thread_rng();
    let keypair = Ed25519KeyPair::from_seed([42u8; 32]);
    let device = DevicePublicKey::from_bytes(*keypair.public_key().as_bytes());
    let encoder = CanonicalEncoder::new(CanonicalFormat::default());
    (0..count)
        .map(|i| sign(&keypair, &encoder, random_gps(&mut rng, device, NOW + i as u64)))
        .collect()
}

// ============================================================================
// PS-01: Canonical Encoding
// ============================================================================

fn bench_canonical_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("ps-01-canonical-encoding");
    let mut rng = rand::thread_rng();
    let device = DevicePublicKey::from_bytes([7u8; 32]);
    let gps = random_gps(&mut rng, device, NOW);
    let motion = random_motion(&mut rng, device, NOW);

    for format in [CanonicalFormat::LengthPrefixed, CanonicalFormat::Delimited] {
        let encoder = CanonicalEncoder::new(format);
        group.bench_function(BenchmarkId::new("gps_digest", format!("{:?}", format)), |b| {
            b.iter(|| black_box(encoder.digest(black_box(&gps))))
        });
        group.bench_function(BenchmarkId::new("motion_digest", format!("{:?}", format)), |b| {
            b.iter(|| black_box(encoder.digest(black_box(&motion))))
        });
    }

    group.finish();
}

// ============================================================================
// PS-03: Proof Signing
// ============================================================================

fn bench_proof_signing(c: &mut Criterion) {
    let mut group = c.benchmark_group("ps-03-proof-builder");
    group.measurement_time(Duration::from_secs(10));

    let keypair = Ed25519KeyPair::from_seed([42u8; 32]);
    let device = DevicePublicKey::from_bytes(*keypair.public_key().as_bytes());
    let encoder = CanonicalEncoder::new(CanonicalFormat::default());
    let reading = random_gps(&mut rand::thread_rng(), device, NOW);

    group.bench_function("sign_single", |b| {
        b.iter(|| black_box(sign(&keypair, &encoder, reading.clone())))
    });

    let proof = sign(&keypair, &encoder, reading);
    group.bench_function("verify_single", |b| {
        b.iter(|| black_box(verify_proof(black_box(&proof), CanonicalFormat::default())))
    });

    group.finish();
}

// ============================================================================
// PS-04: Merkle Aggregation
// ============================================================================

fn bench_merkle_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("ps-04-merkle-aggregation");

    for size in [2usize, 16, 128, 1_000] {
        let batch_proofs = proofs(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("compute_root", size), &batch_proofs, |b, ps| {
            b.iter(|| black_box(MerkleBatch::compute(ps)))
        });
    }

    let batch_proofs = proofs(1_000);
    let batch = MerkleBatch::compute(&batch_proofs).expect("non-empty batch");
    let root = batch.root();
    let leaf = leaf_hash(&batch_proofs[517]);
    let path = batch.proof_path(517).expect("index in range");

    group.bench_function("proof_path_1000", |b| {
        b.iter(|| black_box(batch.proof_path(black_box(517))))
    });
    group.bench_function("verify_inclusion_1000", |b| {
        b.iter(|| black_box(verify_inclusion(&leaf, &path, 517, &root)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_canonical_encoding,
    bench_proof_signing,
    bench_merkle_aggregation,
);
criterion_main!(benches);
