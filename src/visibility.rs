//! Who gets to see what on a note's detail page, plus bucketing of the
//! responses an owner has received.

use super::models::{Decision, Note, Response, User};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// The viewer posted the note. They can edit or delete it, and there is
    /// no point responding to yourself.
    Owner,
    /// The viewer already responded; one response per note per user.
    AlreadyResponded,
    /// The viewer may respond.
    Open,
    /// Nobody is logged in.
    Anonymous,
}

/// The three switches the detail page template cares about.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DetailFlags {
    /// Show the response form.
    pub pole_response: bool,
    /// Show the "you already responded" message.
    pub message_response: bool,
    /// Show edit and delete controls.
    pub edit_delete: bool,
}

/// `existing` is the viewer's own response to `note`, if any. Callers are
/// expected to have looked it up for this exact (note, viewer) pair.
pub fn visibility(
    viewer: Option<&User>,
    note: &Note,
    existing: Option<&Response>,
) -> Visibility {
    match viewer {
        None => Visibility::Anonymous,
        Some(user) if note.is_owned_by(user) => Visibility::Owner,
        Some(user) => match existing {
            Some(r) if r.note_id == note.id && r.user_response == user.id => {
                Visibility::AlreadyResponded
            }
            _ => Visibility::Open,
        },
    }
}

impl Visibility {
    pub fn flags(&self) -> DetailFlags {
        match self {
            Self::Owner => DetailFlags {
                pole_response: false,
                message_response: false,
                edit_delete: true,
            },
            Self::AlreadyResponded => DetailFlags {
                pole_response: false,
                message_response: true,
                edit_delete: false,
            },
            Self::Open => DetailFlags {
                pole_response: true,
                message_response: false,
                edit_delete: false,
            },
            Self::Anonymous => DetailFlags::default(),
        }
    }

    pub fn can_respond(&self) -> bool {
        self.flags().pole_response
    }
}

#[derive(Debug, Default)]
pub struct ResponseBuckets {
    pub pending: Vec<Response>,
    pub accepted: Vec<Response>,
    pub rejected: Vec<Response>,
}

impl ResponseBuckets {
    pub fn total(&self) -> usize {
        self.pending.len() + self.accepted.len() + self.rejected.len()
    }
}

/// Every response lands in exactly one bucket, keyed off its decision.
pub fn partition(responses: Vec<Response>) -> ResponseBuckets {
    responses
        .into_iter()
        .fold(ResponseBuckets::default(), |mut acc, r| {
            match r.decision() {
                Decision::Pending => acc.pending.push(r),
                Decision::Accepted => acc.accepted.push(r),
                Decision::Rejected => acc.rejected.push(r),
            };
            acc
        })
}
