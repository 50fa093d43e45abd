use kraken_http::{ClientOptions, KrakenClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let kraken = KrakenClient::public()?.with_options(ClientOptions {
        queries_per_second: 1,
        retry_timeout_ms: 20_000,
        ..ClientOptions::default()
    })?;

    // Clones share one rate window, so these requests go out one per second.
    let pairs = ["XXBTZUSD", "XETHZUSD", "SOLUSD", "XXRPZUSD"];
    let tasks: Vec<_> = pairs
        .into_iter()
        .map(|pair| {
            let kraken = kraken.clone();
            tokio::spawn(async move { (pair, kraken.ticker(&[pair]).await) })
        })
        .collect();

    for task in tasks {
        let (pair, ticker) = task.await?;
        let ticker = ticker?;
        let last = ticker
            .as_object()
            .and_then(|pairs| pairs.values().next())
            .and_then(|info| info["c"][0].as_str())
            .unwrap_or("?");
        println!("{pair}: last trade {last}");
    }

    Ok(())
}
