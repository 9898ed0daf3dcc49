//! BaseProof API entry point.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    baseproof_reader::server::run().await
}
