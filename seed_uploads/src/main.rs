//! Operator tool: encrypts random samples with the public half of a local
//! private key and uploads them to the relay's source bucket(s), so a deployed
//! relay can be exercised end to end.

use std::path::PathBuf;

use anyhow::{Context, Result};
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use clap::Parser;
use decrypt_relay::aws::S3ObjectStore;
use decrypt_relay::crypto::encrypt;
use decrypt_relay::key_provider::parse_private_key_pem;
use decrypt_relay::storage::ObjectStore;
use tracing::info;
use zeroize::Zeroizing;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct CliArgs {
    /// Num of samples to generate
    num_samples: usize,
    /// Path to the PEM encoded PKCS#8 private key
    private_key: PathBuf,
    /// Target bucket(s), at least one is required
    #[arg(required = true)]
    target_buckets: Vec<String>,
    /// Length of the first sample; every following sample doubles in size
    #[arg(long, default_value_t = 10)]
    initial_length: usize,
}

/// Doubling sample lengths, capped at what one OAEP block can carry.
fn sample_lengths(initial: usize, count: usize, max: usize) -> Vec<usize> {
    std::iter::successors(Some(initial.min(max)), |len| Some((len * 2).min(max)))
        .take(count)
        .collect()
}

fn gen_sample(length: usize) -> Result<Vec<u8>> {
    let mut sample = vec![0u8; length];
    aws_lc_rs::rand::fill(&mut sample).map_err(|e| anyhow::anyhow!("rng failure: {e}"))?;
    Ok(sample)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let pem = Zeroizing::new(
        tokio::fs::read_to_string(&args.private_key)
            .await
            .with_context(|| format!("could not read {}", args.private_key.display()))?,
    );
    let key = parse_private_key_pem(&pem)?;

    let region_provider = RegionProviderChain::default_provider().or_else("us-east-1");
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(region_provider)
        .load()
        .await;
    let store = S3ObjectStore::new(aws_sdk_s3::Client::new(&sdk_config));

    let lengths = sample_lengths(args.initial_length, args.num_samples, key.max_plaintext_size());
    for (sample_num, length) in lengths.into_iter().enumerate() {
        info!(sample_num, length, "generating sample");
        let sample = gen_sample(length)?;
        let encrypted = encrypt(&sample, &key)?;

        let identifier = format!("sample_{sample_num}");
        for bucket in &args.target_buckets {
            info!(bucket = bucket.as_str(), identifier = identifier.as_str(), "uploading sample");
            store
                .write(bucket, &identifier, encrypted.clone())
                .await
                .with_context(|| format!("could not upload {identifier} to {bucket}"))?;
        }
    }

    Ok(())
}
