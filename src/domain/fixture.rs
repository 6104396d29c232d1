use serde::{Deserialize, Serialize};

/// A team as it appears in the bundled calendar document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTeam {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo_url: String,
}

/// A calendar record before annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMatch {
    pub id: String,
    pub date: String,
    pub time: String,
    pub home_team: RawTeam,
    pub away_team: RawTeam,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub competition: String,
    #[serde(default)]
    pub round: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    pub logo_url: String,
    pub is_tracked_club: bool,
}

impl Team {
    pub fn from_raw(raw: &RawTeam, tracked_club_name: &str) -> Self {
        Self {
            id: raw.id.clone(),
            name: raw.name.clone(),
            logo_url: raw.logo_url.clone(),
            is_tracked_club: is_tracked_name(&raw.name, tracked_club_name),
        }
    }
}

/// An annotated match ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub date: String,
    pub time: String,
    pub home_team: Team,
    pub away_team: Team,
    pub venue: String,
    pub competition: String,
    pub round: String,
    pub formatted_date: String,
    pub formatted_time: String,
    pub day_of_week: String,
    pub is_future: bool,
}

impl Match {
    pub fn involves_tracked_club(&self) -> bool {
        self.home_team.is_tracked_club || self.away_team.is_tracked_club
    }

    /// "Home vs Away"
    pub fn fixture_label(&self) -> String {
        format!("{} vs {}", self.home_team.name, self.away_team.name)
    }
}

/// Case-insensitive substring match; an empty tracked name matches nothing.
pub fn is_tracked_name(team_name: &str, tracked_club_name: &str) -> bool {
    let tracked = tracked_club_name.trim().to_lowercase();
    if tracked.is_empty() {
        return false;
    }
    team_name.to_lowercase().contains(&tracked)
}
