use serde::{Deserialize, Serialize};

/// Seconds since the unix epoch, UTC.
pub type UnixTimestamp = i64;

/// A title as known to the backend. `title_id` is the identity key.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct GameRecord {
    pub title_id: String,
    pub name: String,
}

/// A title from the play history; carries the raw last played time as reported by the backend.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PlayedGame {
    pub title_id: String,
    pub name: String,
    pub last_played_date_time: String,
}

impl From<PlayedGame> for GameRecord {
    fn from(g: PlayedGame) -> Self {
        GameRecord { title_id: g.title_id, name: g.name }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum LicenseType {
    SinglePurchase,
    FreeToPlay,
    OtherUserLicense,
    Unknown,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct LicenseInfo {
    pub license_type: LicenseType,
    pub owner: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Dlc {
    pub dlc_id: String,
    pub dlc_title: String,
    pub license_info: LicenseInfo,
}

/// An owned game as reported to the host.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Game {
    pub game_id: String,
    pub game_title: String,
    pub dlcs: Vec<Dlc>,
    pub license_info: LicenseInfo,
}

impl From<GameRecord> for Game {
    fn from(record: GameRecord) -> Self {
        Game {
            game_id: record.title_id,
            game_title: record.name,
            dlcs: vec![],
            license_info: LicenseInfo { license_type: LicenseType::SinglePurchase, owner: None },
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct GameTime {
    pub game_id: String,
    /// Minutes played; the backend no longer reports it
    pub time_played: Option<u64>,
    pub last_played_time: Option<UnixTimestamp>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Subscription {
    pub subscription_name: String,
    pub end_time: Option<UnixTimestamp>,
    pub owned: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SubscriptionGame {
    pub game_title: String,
    pub game_id: String,
    pub start_time: Option<UnixTimestamp>,
    pub end_time: Option<UnixTimestamp>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct UserInfo {
    pub account_id: String,
    pub online_id: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Authentication {
    pub user_id: String,
    pub user_name: String,
}
