use anyhow::{anyhow, Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::{fmt, str::FromStr, sync::Arc};

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub session_secret: Arc<[u8]>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
}

/// Notes are filed under one of a fixed set of in-game roles. The slug is
/// what lands in the database and in query strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Tanks,
    Healers,
    DamageDealers,
    Merchants,
    GuildMasters,
    QuestGivers,
    Blacksmiths,
    Leatherworkers,
    PotionMakers,
    SpellMasters,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::Tanks,
        Category::Healers,
        Category::DamageDealers,
        Category::Merchants,
        Category::GuildMasters,
        Category::QuestGivers,
        Category::Blacksmiths,
        Category::Leatherworkers,
        Category::PotionMakers,
        Category::SpellMasters,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Self::Tanks => "tanks",
            Self::Healers => "healers",
            Self::DamageDealers => "damage_dealers",
            Self::Merchants => "merchants",
            Self::GuildMasters => "guild_masters",
            Self::QuestGivers => "quest_givers",
            Self::Blacksmiths => "blacksmiths",
            Self::Leatherworkers => "leatherworkers",
            Self::PotionMakers => "potion_makers",
            Self::SpellMasters => "spell_masters",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Tanks => "Tanks",
                Self::Healers => "Healers",
                Self::DamageDealers => "Damage Dealers",
                Self::Merchants => "Merchants",
                Self::GuildMasters => "Guild Masters",
                Self::QuestGivers => "Quest Givers",
                Self::Blacksmiths => "Blacksmiths",
                Self::Leatherworkers => "Leatherworkers",
                Self::PotionMakers => "Potion Makers",
                Self::SpellMasters => "Spell Masters",
            }
        )
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.slug() == s)
            .ok_or_else(|| anyhow!("{s:?} is not a category"))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    pub id: i32,
    pub user_id: i32,
    /// Username of the owner; only populated on reads.
    pub author: String,
    pub category: Category,
    pub title: String,
    pub text: String,
    pub datetime: DateTime<Utc>,
}

impl Note {
    pub fn is_owned_by(&self, user: &User) -> bool {
        self.user_id == user.id
    }
}

/// The decision a note's owner has made about a response. In the database
/// this is spread across the `status_add` and `status_del` flags; this enum
/// is the only way we construct those flags, so both can never be set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Pending,
    Accepted,
    Rejected,
}

impl Decision {
    /// `(status_add, status_del)`
    pub fn flags(&self) -> (bool, bool) {
        match self {
            Self::Pending => (false, false),
            Self::Accepted => (true, false),
            Self::Rejected => (false, true),
        }
    }

    /// A row with both flags set violates the table's check constraint, so
    /// it can only show up if someone has been poking at the database by
    /// hand. We read it as rejected; the next decision overwrites both.
    pub fn from_flags(status_add: bool, status_del: bool) -> Self {
        match (status_add, status_del) {
            (false, false) => Self::Pending,
            (true, false) => Self::Accepted,
            (_, true) => Self::Rejected,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    pub id: i32,
    pub note_id: i32,
    /// Title of the note this responds to; only populated on reads.
    pub note_title: String,
    pub user_response: i32,
    /// Username of the responder; only populated on reads.
    pub responder: String,
    pub text: String,
    pub status_add: bool,
    pub status_del: bool,
    pub datetime: DateTime<Utc>,
}

impl Response {
    pub fn decision(&self) -> Decision {
        Decision::from_flags(self.status_add, self.status_del)
    }

    /// Overwrite the decision. Accepting and rejecting are both plain
    /// assignments, so applying either one twice is a no-op.
    pub fn decide(&mut self, decision: Decision) {
        (self.status_add, self.status_del) = decision.flags();
    }
}

pub const TITLE_MAX_LEN: usize = 255;

#[derive(Debug, Deserialize)]
pub struct NoteForm {
    pub title: String,
    pub category: String,
    pub text: String,
}

/// What is left of a `NoteForm` after validation. Note the absence of an
/// owner: that always comes from the session.
#[derive(Debug, PartialEq)]
pub struct NoteDraft {
    pub category: Category,
    pub title: String,
    pub text: String,
}

impl NoteForm {
    pub fn validate(&self) -> Result<NoteDraft, &'static str> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err("Title is required");
        }
        if title.chars().count() > TITLE_MAX_LEN {
            return Err("Title is too long");
        }
        let Ok(category) = self.category.parse() else {
            return Err("Pick a category");
        };
        if self.text.trim().is_empty() {
            return Err("Text is required");
        }

        Ok(NoteDraft {
            category,
            title: title.to_string(),
            text: self.text.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ResponseForm {
    pub text: String,
}

impl ResponseForm {
    pub fn validate(&self) -> Result<&str, &'static str> {
        let text = self.text.trim();
        if text.is_empty() {
            Err("Your response cannot be empty")
        } else {
            Ok(text)
        }
    }
}

#[cfg(test)]
pub mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn user(id: i32) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
        }
    }

    /// A note posted at `minute` past midnight, 2023-10-01.
    pub fn note(id: i32, owner: i32, category: Category, minute: u32) -> Note {
        Note {
            id,
            user_id: owner,
            author: format!("user{owner}"),
            category,
            title: format!("note {id}"),
            text: "LF group".into(),
            datetime: Utc.with_ymd_and_hms(2023, 10, 1, 0, minute, 0).unwrap(),
        }
    }

    pub fn response(
        id: i32,
        note_id: i32,
        responder: i32,
        decision: Decision,
    ) -> Response {
        let (status_add, status_del) = decision.flags();
        Response {
            id,
            note_id,
            note_title: format!("note {note_id}"),
            user_response: responder,
            responder: format!("user{responder}"),
            text: "me!".into(),
            status_add,
            status_del,
            datetime: Utc::now(),
        }
    }
}
