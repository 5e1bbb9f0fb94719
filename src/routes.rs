//! Every path in the app is spelled out exactly once, here. Components
//! render links with `Route::X(Some(id))`; the router registers
//! `Route::X(None)`, which displays as the axum path pattern.

use super::{controllers, middleware, models};
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, Router},
};
use std::fmt;

#[derive(Clone, Copy, Debug)]
pub enum Route {
    Home,
    Ping,
    Search,
    NewNote,
    Notes,
    NoteDetail(Option<i32>),
    NoteRespond(Option<i32>),
    NoteEdit(Option<i32>),
    NoteDelete(Option<i32>),
    Responses,
    ResponseAccept(Option<i32>),
    ResponseReject(Option<i32>),
}

fn id_or_pattern(id: &Option<i32>) -> String {
    match id {
        Some(id) => id.to_string(),
        None => ":id".to_string(),
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => write!(f, "/"),
            Self::Ping => write!(f, "/ping"),
            Self::Search => write!(f, "/search"),
            Self::NewNote => write!(f, "/notes/new"),
            Self::Notes => write!(f, "/notes"),
            Self::NoteDetail(id) => write!(f, "/notes/{}", id_or_pattern(id)),
            Self::NoteRespond(id) => {
                write!(f, "/notes/{}/respond", id_or_pattern(id))
            }
            Self::NoteEdit(id) => {
                write!(f, "/notes/{}/edit", id_or_pattern(id))
            }
            Self::NoteDelete(id) => {
                write!(f, "/notes/{}/delete", id_or_pattern(id))
            }
            Self::Responses => write!(f, "/responses"),
            Self::ResponseAccept(id) => {
                write!(f, "/responses/{}/accept", id_or_pattern(id))
            }
            Self::ResponseReject(id) => {
                write!(f, "/responses/{}/reject", id_or_pattern(id))
            }
        }
    }
}

fn public_routes() -> Router<models::AppState> {
    Router::new()
        .route(&Route::Home.to_string(), get(controllers::list_notes))
        .route(&Route::Ping.to_string(), get(controllers::pong))
        .route(&Route::Search.to_string(), get(controllers::search_notes))
        .route(
            &Route::NoteDetail(None).to_string(),
            get(controllers::note_detail),
        )
}

/// Everything here sits behind `require_login`, so handlers can pull the
/// `User` out of the request extensions.
#[rustfmt::skip]
fn protected_routes(state: &models::AppState) -> Router<models::AppState> {
    Router::new()
        .route(&Route::NewNote.to_string(), get(controllers::new_note_form))
        .route(&Route::Notes.to_string(), post(controllers::create_note))
        .route(&Route::NoteRespond(None).to_string(), post(controllers::submit_response))
        .route(&Route::NoteEdit(None).to_string(), get(controllers::edit_note_form).post(controllers::update_note))
        .route(&Route::NoteDelete(None).to_string(), get(controllers::delete_note_confirm).delete(controllers::delete_note))
        .route(&Route::Responses.to_string(), get(controllers::list_responses))
        .route(&Route::ResponseAccept(None).to_string(), post(controllers::accept_response))
        .route(&Route::ResponseReject(None).to_string(), post(controllers::reject_response))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_login))
}

pub fn get_routes(state: &models::AppState) -> Router<models::AppState> {
    public_routes().merge(protected_routes(state))
}
