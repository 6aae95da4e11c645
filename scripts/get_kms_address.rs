use anyhow::Result;
use kms_provisioner::{derive_address, AwsKms, KmsCapability};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <KMS_KEY_ID> <AWS_REGION>", args[0]);
        std::process::exit(1);
    }

    let key_id = &args[1];
    let region = &args[2];
    println!("🔐 Deriving Ethereum address from KMS key: {}", key_id);
    println!("🌍 Using AWS region: {}", region);

    let kms = AwsKms::from_region(region).await;
    let public_key = kms.get_public_key(key_id).await?;
    let address = derive_address(&public_key)?;

    println!("✅ KMS Ethereum Address: {}", address);

    Ok(())
}
