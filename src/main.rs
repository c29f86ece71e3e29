use azurerm_provider::{init_logging, serve, AzureRmProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    serve(AzureRmProvider::new()).await
}
