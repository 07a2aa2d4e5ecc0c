//! Built-in step scripts — the scripted copy, option lists, and
//! comparable fixtures for the six wizard steps.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde_json::json;

use crate::api::types::ComparableListing;
use crate::timeline::WidgetKind;

use super::model::{StepScript, WizardFlow};

/// Pacing used between chained turns, tuned to read as natural typing.
const BEAT_MS: u64 = 1500;
const LONG_BEAT_MS: u64 = 2000;

/// The full six-step wizard.
pub fn builtin_flow() -> WizardFlow {
    WizardFlow::new(vec![
        verify_property(),
        comparable_listings(),
        market_analytics(),
        property_condition(),
        personalize_offer(),
        review_offer(),
    ])
}

/// Step 1 — find and confirm the property.
pub fn verify_property() -> StepScript {
    StepScript::new("verify_property", "Verify your home")
        .agent(
            BEAT_MS,
            "Hi! I'm your offer assistant. I'll walk you through getting an \
             offer on your home — it usually takes about five minutes.",
        )
        .agent(
            BEAT_MS,
            "First, let's find your home. What's the property address?",
        )
        .widget(
            LONG_BEAT_MS,
            WidgetKind::AddressInput,
            json!({
                "placeholder": "Street address, city, state",
                "submit_label": "Find my home"
            }),
        )
        .agent(BEAT_MS, "Got it — here's what we found for that address.")
        .widget(
            BEAT_MS,
            WidgetKind::OptionChoice,
            json!({
                "prompt": "Does this look like your home?",
                "options": [
                    {"id": "confirm", "label": "Yes, that's my home"},
                    {"id": "retry", "label": "Not quite — let me re-enter it"}
                ]
            }),
        )
        .agent(
            BEAT_MS,
            "Great, your property is verified. Next we'll look at what similar \
             homes nearby have sold for.",
        )
        .widget(
            LONG_BEAT_MS,
            WidgetKind::Confirmation,
            json!({
                "prompt": "Continue to comparable sales",
                "label": "Sounds good"
            }),
        )
}

/// Step 2 — review comparable listings.
pub fn comparable_listings() -> StepScript {
    let comps = serde_json::to_value(comparable_fixtures()).unwrap_or_default();

    StepScript::new("comparable_listings", "Comparable sales")
        .agent(
            BEAT_MS,
            "These are recent sales near you that look a lot like your home.",
        )
        .agent(
            BEAT_MS,
            "Remove any that don't feel like a fair comparison — fewer \
             bedrooms, a busy street, that kind of thing.",
        )
        .widget(
            LONG_BEAT_MS,
            WidgetKind::FilterList,
            json!({
                "prompt": "Keep the homes most like yours",
                "comparables": comps,
                "skippable": true
            }),
        )
        .agent(
            BEAT_MS,
            "Thanks — we'll weigh the remaining sales when we build your offer.",
        )
        .widget(
            BEAT_MS,
            WidgetKind::Confirmation,
            json!({
                "prompt": "Continue to market trends",
                "label": "Continue"
            }),
        )
}

/// Step 3 — market analytics.
pub fn market_analytics() -> StepScript {
    StepScript::new("market_analytics", "Your market")
        .agent(
            BEAT_MS,
            "Here's how your market is moving right now — median sale price, \
             days on market, and where prices are headed.",
        )
        .widget(
            LONG_BEAT_MS,
            WidgetKind::OptionChoice,
            json!({
                "prompt": "How does this look to you?",
                "options": [
                    {"id": "as_expected", "label": "About what I expected"},
                    {"id": "surprised", "label": "Higher or lower than I thought"}
                ]
            }),
        )
        .agent(
            BEAT_MS,
            "Good to know. We bake these trends into the offer so it reflects \
             today's market, not last year's.",
        )
        .widget(
            BEAT_MS,
            WidgetKind::Confirmation,
            json!({
                "prompt": "Continue to home condition",
                "label": "Continue"
            }),
        )
}

/// Step 4 — property condition and photo upload.
pub fn property_condition() -> StepScript {
    StepScript::new("property_condition", "Home condition")
        .agent(
            BEAT_MS,
            "Let's talk about your home's condition — it's the biggest factor \
             we can't see from public records.",
        )
        .widget(
            LONG_BEAT_MS,
            WidgetKind::OptionChoice,
            json!({
                "prompt": "Overall, how would you rate it?",
                "options": [
                    {"id": "move_in_ready", "label": "Move-in ready"},
                    {"id": "some_work", "label": "Needs a little work"},
                    {"id": "major_work", "label": "Has some bigger projects"}
                ]
            }),
        )
        .agent(
            BEAT_MS,
            "Photos help us tighten the offer range. Add a few of the kitchen, \
             bathrooms, and anything that needs attention.",
        )
        .widget(
            BEAT_MS,
            WidgetKind::UploadForm,
            json!({
                "prompt": "Add photos of your home",
                "accept": ["image/jpeg", "image/png"],
                "max_files": 8,
                "skippable": true
            }),
        )
        .agent(BEAT_MS, "Thanks — that gives us a clear picture.")
        .widget(
            LONG_BEAT_MS,
            WidgetKind::Confirmation,
            json!({
                "prompt": "Continue to personalize your offer",
                "label": "Continue"
            }),
        )
}

/// Step 5 — personalize the offer.
pub fn personalize_offer() -> StepScript {
    StepScript::new("personalize_offer", "Personalize your offer")
        .agent(
            BEAT_MS,
            "Almost there. A couple of questions so the offer fits your plans.",
        )
        .widget(
            LONG_BEAT_MS,
            WidgetKind::Slider,
            json!({
                "prompt": "When would you like to close?",
                "min": 14,
                "max": 90,
                "step": 7,
                "unit": "days",
                "default": 30
            }),
        )
        .agent(BEAT_MS, "And what matters most to you in this sale?")
        .widget(
            BEAT_MS,
            WidgetKind::OptionChoice,
            json!({
                "prompt": "Pick the one that fits best",
                "options": [
                    {"id": "highest_price", "label": "Getting the highest price"},
                    {"id": "fast_close", "label": "Closing quickly"},
                    {"id": "certainty", "label": "Certainty it won't fall through"}
                ],
                "skippable": true
            }),
        )
        .agent(
            BEAT_MS,
            "Perfect. We'll shape the recommendation around that.",
        )
        .widget(
            LONG_BEAT_MS,
            WidgetKind::Confirmation,
            json!({
                "prompt": "See your offer",
                "label": "Show me the offer"
            }),
        )
}

/// Step 6 — review the recommended offer.
pub fn review_offer() -> StepScript {
    StepScript::new("review_offer", "Your offer")
        .agent(
            BEAT_MS,
            "Here it is — your recommended offer, built from your home's \
             details, nearby sales, and your preferences.",
        )
        .agent(
            BEAT_MS,
            "Take your time reviewing it. Accepting doesn't commit you to \
             anything yet — a local advisor will follow up within a day.",
        )
        .widget(
            LONG_BEAT_MS,
            WidgetKind::Confirmation,
            json!({
                "prompt": "Accept recommended offer",
                "label": "Accept offer",
                "fields": ["offer_amount", "closing_window", "fees"]
            }),
        )
}

/// Comparable-sale fixtures shown in step 2, loaded once as static data.
fn comparable_fixtures() -> Vec<ComparableListing> {
    vec![
        ComparableListing {
            id: "comp_01".to_string(),
            address: "1431 Sycamore Ln".to_string(),
            price: dec!(405000),
            beds: 3,
            baths: 2.0,
            sqft: 1790,
            distance_miles: 0.1,
            sold_on: NaiveDate::from_ymd_opt(2026, 5, 14),
        },
        ComparableListing {
            id: "comp_02".to_string(),
            address: "212 Bluebonnet Dr".to_string(),
            price: dec!(419900),
            beds: 3,
            baths: 2.5,
            sqft: 1910,
            distance_miles: 0.4,
            sold_on: NaiveDate::from_ymd_opt(2026, 6, 2),
        },
        ComparableListing {
            id: "comp_03".to_string(),
            address: "87 Caldera Ct".to_string(),
            price: dec!(389500),
            beds: 3,
            baths: 2.0,
            sqft: 1705,
            distance_miles: 0.6,
            sold_on: NaiveDate::from_ymd_opt(2026, 4, 27),
        },
        ComparableListing {
            id: "comp_04".to_string(),
            address: "1502 Sycamore Ln".to_string(),
            price: dec!(431000),
            beds: 4,
            baths: 2.5,
            sqft: 2040,
            distance_miles: 0.2,
            sold_on: NaiveDate::from_ymd_opt(2026, 6, 19),
        },
    ]
}
