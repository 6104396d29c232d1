use std::fs;
use std::path::Path;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, warn};

use crate::domain::{Match, RawMatch, Team};
use crate::errors::{ClubFeedError, ClubFeedResult};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

/// Read the bundled calendar document, a JSON array of matches.
pub fn load_calendar(path: impl AsRef<Path>) -> ClubFeedResult<Vec<RawMatch>> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    serde_json::from_str(&contents)
        .map_err(|e| ClubFeedError::Calendar(format!("{}: {}", path.display(), e)))
}

/// Upcoming matches relative to the local clock.
pub fn get_upcoming_matches(raw: &[RawMatch], tracked_club_name: &str) -> Vec<Match> {
    get_upcoming_matches_at(raw, tracked_club_name, Local::now().naive_local())
}

/// Matches kicking off from the start of `now`'s day onwards, earliest first.
pub fn get_upcoming_matches_at(
    raw: &[RawMatch],
    tracked_club_name: &str,
    now: NaiveDateTime,
) -> Vec<Match> {
    let start_of_today = now.date().and_time(NaiveTime::MIN);

    let mut upcoming: Vec<(NaiveDateTime, Match)> = raw
        .iter()
        .filter_map(|m| {
            let Some(kickoff) = kickoff(m) else {
                warn!(
                    match_id = %m.id,
                    date = %m.date,
                    time = %m.time,
                    "skipping match with unreadable kickoff"
                );
                return None;
            };
            (kickoff >= start_of_today).then(|| (kickoff, annotate(m, kickoff, tracked_club_name)))
        })
        .collect();

    // sort_by_key is stable, so same-kickoff entries keep input order
    upcoming.sort_by_key(|(kickoff, _)| *kickoff);
    debug!(total = raw.len(), upcoming = upcoming.len(), "filtered calendar");

    upcoming.into_iter().map(|(_, m)| m).collect()
}

/// First match in the list that involves the tracked club.
pub fn next_tracked_match(matches: &[Match]) -> Option<&Match> {
    matches.iter().find(|m| m.involves_tracked_club())
}

fn kickoff(raw: &RawMatch) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(raw.date.trim(), DATE_FORMAT).ok()?;
    let time = TIME_FORMATS
        .iter()
        .find_map(|f| NaiveTime::parse_from_str(raw.time.trim(), f).ok())?;
    Some(date.and_time(time))
}

fn annotate(raw: &RawMatch, kickoff: NaiveDateTime, tracked_club_name: &str) -> Match {
    Match {
        id: raw.id.clone(),
        date: raw.date.clone(),
        time: raw.time.clone(),
        home_team: Team::from_raw(&raw.home_team, tracked_club_name),
        away_team: Team::from_raw(&raw.away_team, tracked_club_name),
        venue: raw.venue.clone(),
        competition: raw.competition.clone(),
        round: raw.round.clone(),
        formatted_date: kickoff.format("%-d %b %Y").to_string(),
        formatted_time: kickoff.format("%H:%M").to_string(),
        day_of_week: kickoff.format("%A").to_string(),
        is_future: true,
    }
}
