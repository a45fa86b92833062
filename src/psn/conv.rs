
use serde::Deserialize;
use serde_json::Value;

use crate::models::game::{GameRecord, PlayedGame, UserInfo};
use crate::models::psn::*;

use super::ParseResult;

fn extract<'a, T: Deserialize<'a>>(response: &'a Value) -> ParseResult<T> {
    Ok(Envelope::<T>::deserialize(response)?.data)
}

pub fn parse_user_info(response: &Value) -> ParseResult<UserInfo> {
    let profile = extract::<ProfileData>(response)?.oracle_user_profile_retrieve;

    Ok(UserInfo { account_id: profile.account_id, online_id: profile.online_id })
}

pub fn parse_subscription_status(response: &Value) -> ParseResult<bool> {
    let MembershipFlag(member) = extract::<MembershipData>(response)?
        .oracle_user_profile_retrieve
        .is_ps_plus_member;

    Ok(member)
}

pub fn parse_purchased_games(response: &Value) -> ParseResult<Vec<GameRecord>> {
    Ok(
        extract::<PurchasedTitlesData>(response)?
            .purchased_titles_retrieve
            .games
            .unwrap_or_default()
            .into_iter()
            .map(|title| GameRecord { title_id: title.title_id, name: title.name })
            .collect()
    )
}

pub fn parse_played_games(response: &Value) -> ParseResult<Vec<PlayedGame>> {
    Ok(
        extract::<PlayedTitlesData>(response)?
            .game_library_titles_retrieve
            .games
            .unwrap_or_default()
            .into_iter()
            .map(|title| PlayedGame {
                title_id: title.title_id,
                name: title.name,
                last_played_date_time: title.last_played_date_time,
            })
            .collect()
    )
}
