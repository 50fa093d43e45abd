use kraken_http::KrakenClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let kraken = KrakenClient::from_env()?;

    let time = kraken.server_time().await?;
    println!("server time: {} ({})", time.unixtime, time.rfc1123);

    let balance = kraken.balance().await?;
    if let Some(assets) = balance.as_object() {
        for (asset, amount) in assets {
            println!("{asset}: {amount}");
        }
    }

    Ok(())
}
