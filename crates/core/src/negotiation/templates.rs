use rust_decimal::Decimal;

use crate::domain::session::Language;
use crate::negotiation::money::format_price;
use crate::negotiation::Stage;

/// Values interpolated into a reply template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyContext<'a> {
    pub price: Decimal,
    pub currency_code: &'a str,
    pub offer_echo: Option<&'a str>,
}

pub fn render(stage: Stage, context: &ReplyContext<'_>, language: Language) -> String {
    match language {
        Language::English => english(stage, context),
        Language::Swahili => swahili(stage, context),
    }
}

fn english(stage: Stage, context: &ReplyContext<'_>) -> String {
    let price = format_price(context.price, context.currency_code);
    let offer = context.offer_echo.unwrap_or("your offer");

    match stage {
        Stage::Accept => {
            format!("Deal! You can have it for {price}. Press accept to lock it in.")
        }
        Stage::FinalFloorRejection => {
            format!("Sorry, {price} is as low as I can go. I can't move any further.")
        }
        Stage::InitialAskCounter => {
            format!("{offer} is a bit low for this one. I can let it go for {price}.")
        }
        Stage::MidAskCounter => {
            format!("We're getting closer. I can come down to {price}.")
        }
        Stage::FinalAskCounter => {
            format!("Alright, my last counter is {price}. I can't go below that.")
        }
        Stage::TooLowInitialCounter => format!(
            "{offer} is too low for this item. To get us started, I can do {price}."
        ),
        Stage::DefaultQuery => {
            "Sorry, I didn't catch that. Please tell me the price you'd like to pay, for example 150,000."
                .to_string()
        }
        Stage::AlreadyAgreed => {
            format!("We already agreed on {price}. Press accept to complete your purchase.")
        }
        Stage::TooHighOffer => {
            format!("That's generous of you! Let's settle at the full price of {price}.")
        }
        Stage::StageOneOffer => format!("For you, I can bring it down to {price}."),
        Stage::StageTwoOffer => format!("Okay, I'll lower it a bit more to {price}."),
        Stage::FinalOffer => format!("My final price is {price}. That's the best I can do."),
        Stage::NotNegotiable => {
            "Sorry, the price of this item is fixed and can't be negotiated.".to_string()
        }
    }
}

fn swahili(stage: Stage, context: &ReplyContext<'_>) -> String {
    let price = format_price(context.price, context.currency_code);
    let offer = context.offer_echo.unwrap_or("ofa yako");

    match stage {
        Stage::Accept => {
            format!("Sawa kabisa! Tumekubaliana kwa {price}. Bonyeza kubali kukamilisha.")
        }
        Stage::FinalFloorRejection => {
            format!("Samahani, {price} ndiyo bei yangu ya chini kabisa. Siwezi kushuka zaidi.")
        }
        Stage::InitialAskCounter => {
            format!("{offer} iko chini kidogo kwa bidhaa hii. Naweza kukupa kwa {price}.")
        }
        Stage::MidAskCounter => format!("Tunakaribiana. Naweza kushuka hadi {price}."),
        Stage::FinalAskCounter => {
            format!("Sawa, ofa yangu ya mwisho ni {price}. Siwezi kushuka chini ya hapo.")
        }
        Stage::TooLowInitialCounter => format!(
            "{offer} ni chini sana kwa bidhaa hii. Ili tuanze, naweza kushusha hadi {price}."
        ),
        Stage::DefaultQuery => {
            "Samahani, sijaelewa. Tafadhali taja bei unayotaka kulipa, kwa mfano 150,000."
                .to_string()
        }
        Stage::AlreadyAgreed => {
            format!("Tayari tumekubaliana kwa {price}. Bonyeza kubali kukamilisha ununuzi.")
        }
        Stage::TooHighOffer => {
            format!("Asante kwa ukarimu wako! Tukubaliane kwa bei kamili ya {price}.")
        }
        Stage::StageOneOffer => format!("Kwa ajili yako, naweza kushusha hadi {price}."),
        Stage::StageTwoOffer => format!("Sawa, nashusha zaidi hadi {price}."),
        Stage::FinalOffer => {
            format!("Bei yangu ya mwisho kabisa ni {price}. Hiyo ndiyo bora zaidi.")
        }
        Stage::NotNegotiable => "Samahani, bei ya bidhaa hii haipunguzwi.".to_string(),
    }
}
