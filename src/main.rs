#[tokio::main]
async fn main() -> anyhow::Result<()> {
    clipliaison_lib::run().await
}
