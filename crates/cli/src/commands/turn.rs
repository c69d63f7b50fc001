use bazaar_agent::NegotiationRuntime;
use bazaar_core::config::AppConfig;
use bazaar_core::domain::product::NegotiableProduct;
use bazaar_core::domain::session::{Language, NegotiationSession, SessionKey};
use bazaar_core::errors::ApplicationError;
use clap::Args;
use rust_decimal::Decimal;

use crate::commands::CommandResult;

const TURN_PRODUCT_ID: &str = "cli-item";

#[derive(Debug, Clone, Args)]
pub struct TurnArgs {
    #[arg(long, help = "Listed reference price")]
    pub price: Decimal,
    #[arg(long, default_value = "TZS", help = "ISO currency code used in the reply")]
    pub currency: String,
    #[arg(long, help = "Standing negotiated price from earlier turns")]
    pub negotiated: Option<Decimal>,
    #[arg(long, help = "Session language lock (english|swahili); detected when omitted")]
    pub language: Option<Language>,
    #[arg(long, help = "Treat the listing as fixed-price")]
    pub fixed_price: bool,
    #[arg(long, help = "Buyer message to evaluate")]
    pub message: String,
}

pub fn run(config: &AppConfig, args: &TurnArgs) -> CommandResult {
    let mut product =
        NegotiableProduct::new(TURN_PRODUCT_ID, "Listing", args.price, args.currency.as_str());
    if let Some(negotiated) = args.negotiated {
        product = product.with_negotiated_price(negotiated);
    }
    if args.fixed_price {
        product = product.non_negotiable();
    }

    let mut session = NegotiationSession::new(SessionKey::new("cli", product.id.clone()));
    session.language = args.language;

    let runtime = NegotiationRuntime::from_config(config);
    match runtime.respond(&product, &mut session, &args.message) {
        Ok(outcome) => match serde_json::to_value(&outcome) {
            Ok(data) => CommandResult::success_with_data("turn", outcome.reply.clone(), Some(data)),
            Err(error) => CommandResult::failure("turn", "serialization", error.to_string(), 5),
        },
        Err(error) => CommandResult::from_application("turn", ApplicationError::from(error)),
    }
}
