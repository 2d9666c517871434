#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dexroute_lib::run().await
}
