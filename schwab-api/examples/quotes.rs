use schwab_api::{Client, Request, SchwabApiError};

#[tokio::main]
pub async fn main() -> Result<(), SchwabApiError> {
    let client = Client::new("access_token");

    let req = Request::market_data().quotes("AAPL");

    let _res = client.send(req).await?;
    Ok(())
}
