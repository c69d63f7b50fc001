use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use bazaar_agent::{AcceptanceOutcome, NegotiationRuntime, NegotiationService};
use bazaar_core::audit::NoopAuditSink;
use bazaar_core::config::AppConfig;
use bazaar_core::domain::product::ProductId;
use bazaar_core::domain::session::SessionKey;
use bazaar_core::errors::ApplicationError;
use bazaar_core::negotiation::money::format_price;
use bazaar_db::{seed_catalog, InMemoryProductCatalog, InMemorySessionStore, ProductCatalog};
use clap::Args;
use tracing::info;

use crate::commands::{block_on_runtime, CommandResult};

#[derive(Debug, Clone, Args)]
pub struct ChatArgs {
    #[arg(long, help = "Demo listing to haggle over (see `bazaar catalog`)")]
    pub product: String,
    #[arg(long, default_value = "guest", help = "Buyer identifier for the session")]
    pub buyer: String,
}

enum ChatEnd {
    Accepted(String),
    Left,
}

pub fn run(config: &AppConfig, args: &ChatArgs) -> CommandResult {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    run_with_io(config, args, stdin.lock(), &mut stdout)
}

/// Runs a chat session reading buyer lines from `input` and writing the
/// conversation to `output`.
pub fn run_with_io(
    config: &AppConfig,
    args: &ChatArgs,
    input: impl BufRead,
    output: &mut impl Write,
) -> CommandResult {
    let runtime = match block_on_runtime("chat") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    match runtime.block_on(converse(config, args, input, output)) {
        Ok(ChatEnd::Accepted(price)) => {
            CommandResult::success("chat", format!("purchase agreed at {price}"))
        }
        Ok(ChatEnd::Left) => CommandResult::success("chat", "session ended without agreement"),
        Err(error) => match error.downcast::<ApplicationError>() {
            Ok(error) => CommandResult::from_application("chat", error),
            Err(error) => CommandResult::failure("chat", "chat_session", format!("{error:#}"), 5),
        },
    }
}

async fn converse(
    config: &AppConfig,
    args: &ChatArgs,
    input: impl BufRead,
    output: &mut impl Write,
) -> Result<ChatEnd> {
    let catalog = InMemoryProductCatalog::default();
    seed_catalog(&catalog).await.context("failed to seed the demo catalog")?;

    let service = NegotiationService::new(
        catalog,
        InMemorySessionStore::default(),
        NoopAuditSink,
        NegotiationRuntime::from_config(config),
    );

    let product_id = ProductId(args.product.clone());
    let product = service
        .catalog()
        .find_by_id(&product_id)
        .await
        .map_err(ApplicationError::from)?
        .ok_or_else(|| ApplicationError::ProductNotFound(product_id.clone()))?;
    let session_key = SessionKey::new(args.buyer.as_str(), product_id.clone());

    writeln!(
        output,
        "seller> Karibu! {} is listed at {}. What would you like to pay?",
        product.name,
        format_price(product.reference_price, &product.currency_code)
    )?;
    info!(event_name = "chat.session.started", product_id = %product_id, buyer = %args.buyer);

    for line in input.lines() {
        let line = line.context("failed to read buyer input")?;
        let message = line.trim();

        match message {
            "" => continue,
            "/quit" => break,
            "/accept" => match service.accept_current_offer(&product_id, &session_key).await? {
                AcceptanceOutcome::Accepted { price, currency_code } => {
                    let price = format_price(price, &currency_code);
                    writeln!(output, "seller> Sold for {price}. Asante!")?;
                    return Ok(ChatEnd::Accepted(price));
                }
                AcceptanceOutcome::Rejected { reason } => {
                    writeln!(output, "seller> There is no offer to accept yet ({}).", reason.code())?;
                }
            },
            _ => {
                let reply = service.negotiate(&product_id, &session_key, message).await?;
                writeln!(output, "seller> {reply}")?;
            }
        }
    }

    Ok(ChatEnd::Left)
}
