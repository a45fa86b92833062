use scraper::{ElementRef, Html, Selector};

use crate::models::game::SubscriptionGame;

use super::{MalformedResponse, ParseResult};

const PRODUCT_GRID: &str = r#"[data-qa*="productGrid"]"#;
const PRODUCT_TILE: &str = r#"a[href*="/product/"], a[href*="/concept/"]"#;
const PRODUCT_NAME: &str = r#"[data-qa$="product-name"]"#;

fn selector(s: &str) -> ParseResult<Selector> {
    Selector::parse(s).map_err(|e| MalformedResponse::new(format!("bad selector {}: {:?}", s, e)))
}

// Product and concept links both end in the id, e.g. /en-gb/concept/10000003?smcid=...
fn tile_id(tile: &ElementRef) -> Option<String> {
    tile.value()
        .attr("href")?
        .split(['?', '#'])
        .next()?
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn tile_title(tile: &ElementRef, name: &Selector) -> Option<String> {
    let title = tile.select(name).next()?.text().collect::<String>();
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");

    if title.is_empty() { None } else { Some(title) }
}

/// Read the games currently offered with PS Plus from the store's subscriptions page.
pub fn parse_subscription_games(html: &str) -> ParseResult<Vec<SubscriptionGame>> {
    let document = Html::parse_document(html);
    let tile = selector(PRODUCT_TILE)?;
    let name = selector(PRODUCT_NAME)?;

    let grid = document
        .select(&selector(PRODUCT_GRID)?)
        .next()
        .ok_or_else(|| MalformedResponse::new("no product grid on subscriptions page"))?;

    grid.select(&tile)
        .map(|t| {
            let game_id = tile_id(&t)
                .ok_or_else(|| MalformedResponse::new("product tile without an id"))?;
            let game_title = tile_title(&t, &name)
                .ok_or_else(|| MalformedResponse::new(format!("product tile {} without a name", game_id)))?;

            Ok(SubscriptionGame { game_title, game_id, start_time: None, end_time: None })
        })
        .collect()
}
