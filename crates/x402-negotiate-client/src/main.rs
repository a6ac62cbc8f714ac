use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use x402::{Challenge, NegotiationController, PaymentTerms, WalletSigner, X402Error};
use x402_client::{ClientConfig, HttpResourceServer};
use x402_wallet::EvmWallet;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), X402Error> {
    let config = ClientConfig::from_env()?;
    tracing::debug!(?config, "client configuration");

    let wallet = EvmWallet::from_config(&config.wallet)?;
    let server = HttpResourceServer::new(config.resource_url.clone())?;
    let controller = NegotiationController::new(server, wallet);

    println!("Requesting: {}", config.resource_url);
    match controller.wallet().get_current_address().await {
        Some(address) => println!("Wallet: {address}"),
        None => match controller.connect_wallet().await {
            Ok(address) => println!("Wallet: {address}"),
            Err(e) => println!("Wallet: not connected ({e})"),
        },
    }

    let terms = match controller.negotiate_access().await? {
        Challenge::Unlocked(resource) => {
            print_resource(&resource);
            return Ok(());
        }
        Challenge::PaymentRequired(terms) => terms,
    };

    print_terms(controller.wallet(), &terms)?;

    if !config.auto_approve && !ask_approval().await {
        controller.cancel()?;
        println!("Payment declined.");
        return Ok(());
    }

    println!("Paying...");
    let resource = controller.confirm().await?;
    print_resource(&resource);
    Ok(())
}

fn print_terms(wallet: &impl WalletSigner, terms: &PaymentTerms) -> Result<(), X402Error> {
    println!("\nPayment required");
    if let Some(reason) = terms.reason() {
        println!("  Reason:    {reason}");
    }
    println!(
        "  Amount:    {} {}",
        wallet.format_eth(terms.amount())?,
        terms.currency()
    );
    println!("  Recipient: {}", terms.recipient());
    println!("  Chain:     {}", terms.chain_id());
    Ok(())
}

async fn ask_approval() -> bool {
    println!("\nPay? [y/N] ");
    let mut line = String::new();
    let mut stdin = BufReader::new(tokio::io::stdin());
    match stdin.read_line(&mut line).await {
        Ok(_) => matches!(line.trim(), "y" | "Y" | "yes"),
        Err(_) => false,
    }
}

fn print_resource(resource: &x402::ProtectedResource) {
    println!("\n{}", resource.title);
    println!("{}", resource.body);
    println!("({})", resource.image_url);
}
