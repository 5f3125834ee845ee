use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    nudgebot::cli::run().await
}
