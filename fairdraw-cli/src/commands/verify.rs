use anyhow::{anyhow, bail, Context};
use clap::Args;
use fairdraw_core::{RandomWord, RandomnessProof, RequestId};

#[derive(Args)]
pub struct VerifyArgs {
    /// Revealed seed (hex)
    #[arg(long)]
    seed: String,
    /// Commitment published when the request was accepted (hex)
    #[arg(long)]
    commitment: String,
    /// Request id
    #[arg(long)]
    request_id: u64,
    /// Delivered random word (hex, 32 bytes)
    #[arg(long)]
    word: String,
}

pub fn verify_proof(args: VerifyArgs) -> anyhow::Result<()> {
    let proof = RandomnessProof {
        commitment: decode_32(&args.commitment).context("Invalid commitment")?,
        seed: decode_32(&args.seed).context("Invalid seed")?,
    };
    let word: RandomWord = args.word.parse()?;
    let request_id = RequestId::new(args.request_id);

    if !proof.verify(request_id, &[word]) {
        bail!("Proof does not verify for request {}", request_id);
    }

    println!("Proof verified for request {}", request_id);
    println!("  Word: {}", word);
    Ok(())
}

fn decode_32(value: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = hex::decode(value.trim_start_matches("0x"))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow!("expected 32 bytes, got {}", b.len()))
}
