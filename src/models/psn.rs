
use std::fmt;

use serde::Deserialize;

// Shapes of the graphql payloads returned by web.np.playstation.com. Only the fields we consume
// are modelled; everything else in the payload is ignored.

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Envelope<T> {
    pub data: T,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileData {
    pub oracle_user_profile_retrieve: OracleProfile,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OracleProfile {
    pub account_id: String,
    pub online_id: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MembershipData {
    pub oracle_user_profile_retrieve: Membership,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub is_ps_plus_member: MembershipFlag,
}

/// PS Plus membership as reported by the profile query. The backend has been seen sending both
/// booleans and 0/1 integers here.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(try_from = "RawFlag")]
pub struct MembershipFlag(pub bool);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFlag {
    Bool(bool),
    Int(i64),
}

#[derive(Debug)]
pub struct BadFlag(i64);

impl fmt::Display for BadFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected a boolean or 0/1, got {}", self.0)
    }
}

impl TryFrom<RawFlag> for MembershipFlag {
    type Error = BadFlag;

    fn try_from(raw: RawFlag) -> Result<Self, Self::Error> {
        match raw {
            RawFlag::Bool(b) => Ok(MembershipFlag(b)),
            RawFlag::Int(0) => Ok(MembershipFlag(false)),
            RawFlag::Int(1) => Ok(MembershipFlag(true)),
            RawFlag::Int(other) => Err(BadFlag(other)),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchasedTitlesData {
    pub purchased_titles_retrieve: TitleList<PurchasedTitle>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayedTitlesData {
    pub game_library_titles_retrieve: TitleList<PlayedTitle>,
}

/// `games` is null for accounts with an empty library
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TitleList<T> {
    pub games: Option<Vec<T>>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PurchasedTitle {
    pub title_id: String,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayedTitle {
    pub title_id: String,
    pub name: String,
    pub last_played_date_time: String,
}
