use std::{
    fs,
    time::{SystemTime, UNIX_EPOCH},
};

use kraken_http::{Credentials, KrakenClient, KrakenError, OrderRequest, OrderSide, OrderType};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SecretsFile {
    #[serde(rename = "KRAKEN_API_KEY")]
    kraken_api_key: Option<String>,
    #[serde(rename = "KRAKEN_API_SECRET")]
    kraken_api_secret: Option<String>,
}

fn load_live_credentials() -> Result<Credentials, String> {
    if let Ok(credentials) = Credentials::from_env() {
        return Ok(credentials);
    }

    let content = fs::read_to_string("secrets.json")
        .map_err(|_| "KRAKEN_API_KEY/KRAKEN_API_SECRET env or secrets.json is required".to_owned())?;
    let parsed: SecretsFile = serde_json::from_str(&content)
        .map_err(|err| format!("secrets.json could not be parsed: {err}"))?;

    let key = parsed
        .kraken_api_key
        .ok_or_else(|| "missing KRAKEN_API_KEY in secrets.json".to_owned())?;
    let secret = parsed
        .kraken_api_secret
        .ok_or_else(|| "missing KRAKEN_API_SECRET in secrets.json".to_owned())?;

    Credentials::new(key, secret).map_err(|err| err.to_string())
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock must be after epoch")
        .as_secs() as i64
}

#[tokio::test]
async fn live_read_only_roundtrip() {
    let credentials = match load_live_credentials() {
        Ok(credentials) => credentials,
        Err(_) => {
            eprintln!("skipping live test: credentials not found in env or secrets.json");
            return;
        }
    };

    let kraken = KrakenClient::with_credentials(credentials).expect("client must build");

    let time = kraken.server_time().await.expect("server time must succeed");
    assert!((time.unixtime - unix_now()).abs() <= 10);

    let balance = kraken.balance().await.expect("balance must succeed");
    assert!(balance.is_object());

    let volume = kraken
        .trade_volume(&["XXBTZUSD"], true)
        .await
        .expect("trade volume must succeed");
    assert!(volume.get("currency").is_some());

    // validate=true asks the exchange to check the order without placing it.
    let order = OrderRequest::new("XXBTZUSD", OrderSide::Buy, OrderType::Limit, "0.0001")
        .price("1")
        .validate_only();
    match kraken.add_order(&order).await {
        Ok(result) => assert!(result.get("descr").is_some()),
        Err(KrakenError::Api { messages, .. }) => {
            eprintln!("order validation rejected by account permissions: {messages:?}")
        }
        Err(other) => panic!("unexpected error validating order: {other}"),
    }
}
