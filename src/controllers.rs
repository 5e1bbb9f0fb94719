use super::{
    components,
    components::Component,
    db_ops,
    db_ops::{DbModel, GetNoteQuery, GetResponseQuery, ListResponseQuery},
    errors::{NotOwner, ServerError},
    extractors::Viewer,
    filter::{NoteFilter, Params, ResponseFilter},
    htmx,
    models::{AppState, Decision, Note, NoteForm, Response, ResponseForm, User},
    routes::Route,
    visibility::{partition, visibility},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    Extension, Form,
};
use futures::try_join;

fn require_owner(note: &Note, user: &User) -> Result<(), NotOwner> {
    if note.is_owned_by(user) {
        Ok(())
    } else {
        Err(NotOwner {
            user_id: user.id,
            note_id: note.id,
        })
    }
}

pub async fn pong() -> impl IntoResponse {
    "pong"
}

pub async fn list_notes(
    State(AppState { db, .. }): State<AppState>,
    Viewer(viewer): Viewer,
    Query(params): Query<Params>,
) -> Result<impl IntoResponse, ServerError> {
    let page = params
        .get("page")
        .and_then(|p| p.parse::<i64>().ok())
        .unwrap_or(0)
        .max(0);
    let (notes, next_page) = db_ops::list_notes(&db, Some(page)).await?;

    let html = components::Page {
        title: "Board",
        viewer: viewer.as_ref(),
        children: Box::new(components::NoteList {
            notes: &notes,
            page,
            next_page,
        }),
    }
    .render();

    Ok(html)
}

/// Load a note alongside the viewer's own response to it, if any.
async fn note_with_existing_response(
    db: &sqlx::PgPool,
    id: i32,
    viewer: Option<&User>,
) -> anyhow::Result<(Note, Option<Response>)> {
    let existing = async {
        match viewer {
            Some(user) => db_ops::get_response_for(db, id, user.id).await,
            None => Ok(None),
        }
    };
    let query = GetNoteQuery { id };
    try_join!(Note::get(db, &query), existing)
}

fn render_detail(
    note: &Note,
    viewer: Option<&User>,
    existing: Option<&Response>,
    form_error: Option<&str>,
) -> String {
    let flags = visibility(viewer, note, existing).flags();
    let page = components::Page {
        title: &note.title,
        viewer,
        children: Box::new(components::NoteDetail {
            note,
            flags,
            form_error,
        }),
    }
    .render();

    page
}

pub async fn note_detail(
    State(AppState { db, .. }): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServerError> {
    let (note, existing) =
        note_with_existing_response(&db, id, viewer.as_ref()).await?;

    let page = render_detail(&note, viewer.as_ref(), existing.as_ref(), None);

    Ok(page)
}

pub async fn submit_response(
    State(AppState { db, .. }): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<i32>,
    Form(form): Form<ResponseForm>,
) -> Result<axum::response::Response, ServerError> {
    let (note, existing) =
        note_with_existing_response(&db, id, Some(&user)).await?;
    let detail = Route::NoteDetail(Some(id)).to_string();

    if !visibility(Some(&user), &note, existing.as_ref()).can_respond() {
        // Owners and repeat responders never see the form; if they post
        // anyway, just send them back to the note.
        return Ok(Redirect::to(&detail).into_response());
    }
    let text = match form.validate() {
        Ok(text) => text,
        Err(e) => {
            return Ok((
                StatusCode::BAD_REQUEST,
                render_detail(&note, Some(&user), None, Some(e)),
            )
                .into_response());
        }
    };
    if db_ops::create_response(&db, id, user.id, text).await? {
        tracing::info!(note_id = id, user_id = user.id, "response submitted");
    } else {
        tracing::info!(
            note_id = id,
            user_id = user.id,
            "duplicate response ignored"
        );
    }

    Ok(Redirect::to(&detail).into_response())
}

fn render_note_form(user: &User, form: components::NoteForm) -> String {
    let title = form.heading.to_string();
    let page = components::Page {
        title: &title,
        viewer: Some(user),
        children: Box::new(form),
    }
    .render();

    page
}

pub async fn new_note_form(
    Extension(user): Extension<User>,
) -> impl IntoResponse {
    render_note_form(
        &user,
        components::NoteForm {
            action: Route::Notes,
            heading: "New note",
            title: "",
            category: None,
            text: "",
            error: None,
        },
    )
}

pub async fn create_note(
    State(AppState { db, .. }): State<AppState>,
    Extension(user): Extension<User>,
    Form(form): Form<NoteForm>,
) -> Result<axum::response::Response, ServerError> {
    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(e) => {
            let page = render_note_form(
                &user,
                components::NoteForm {
                    action: Route::Notes,
                    heading: "New note",
                    title: &form.title,
                    category: form.category.parse().ok(),
                    text: &form.text,
                    error: Some(e),
                },
            );
            return Ok((StatusCode::BAD_REQUEST, page).into_response());
        }
    };
    // the owner is whoever is logged in, never something from the form
    let id = db_ops::create_note(&db, user.id, &draft).await?;
    tracing::info!(note_id = id, user_id = user.id, "note created");

    Ok(Redirect::to(&Route::NoteDetail(Some(id)).to_string()).into_response())
}

pub async fn edit_note_form(
    State(AppState { db, .. }): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServerError> {
    let note = Note::get(&db, &GetNoteQuery { id }).await?;
    require_owner(&note, &user)?;

    let page = render_note_form(
        &user,
        components::NoteForm {
            action: Route::NoteEdit(Some(id)),
            heading: "Edit note",
            title: &note.title,
            category: Some(note.category),
            text: &note.text,
            error: None,
        },
    );

    Ok(page)
}

pub async fn update_note(
    State(AppState { db, .. }): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<i32>,
    Form(form): Form<NoteForm>,
) -> Result<axum::response::Response, ServerError> {
    let mut note = Note::get(&db, &GetNoteQuery { id }).await?;
    require_owner(&note, &user)?;
    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(e) => {
            let page = render_note_form(
                &user,
                components::NoteForm {
                    action: Route::NoteEdit(Some(id)),
                    heading: "Edit note",
                    title: &form.title,
                    category: form.category.parse().ok(),
                    text: &form.text,
                    error: Some(e),
                },
            );
            return Ok((StatusCode::BAD_REQUEST, page).into_response());
        }
    };
    note.category = draft.category;
    note.title = draft.title;
    note.text = draft.text;
    note.save(&db).await?;

    Ok(Redirect::to(&Route::NoteDetail(Some(id)).to_string()).into_response())
}

pub async fn delete_note_confirm(
    State(AppState { db, .. }): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServerError> {
    let note = Note::get(&db, &GetNoteQuery { id }).await?;
    require_owner(&note, &user)?;

    let page = components::Page {
        title: "Delete note",
        viewer: Some(&user),
        children: Box::new(components::DeleteConfirm { note: &note }),
    }
    .render();

    Ok(page)
}

pub async fn delete_note(
    State(AppState { db, .. }): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServerError> {
    let note = Note::get(&db, &GetNoteQuery { id }).await?;
    require_owner(&note, &user)?;
    db_ops::delete_note(&db, id).await?;
    tracing::info!(note_id = id, user_id = user.id, "note deleted");

    Ok((htmx::redirect(&Route::Home.to_string()), ""))
}

pub async fn search_notes(
    State(AppState { db, .. }): State<AppState>,
    Viewer(viewer): Viewer,
    Query(params): Query<Params>,
) -> Result<impl IntoResponse, ServerError> {
    let filter = NoteFilter::from_params(&params);
    let notes = Note::list(&db, &filter).await?;

    let page = components::Page {
        title: "Search",
        viewer: viewer.as_ref(),
        children: Box::new(components::SearchResults {
            filter: &filter,
            notes: &notes,
        }),
    }
    .render();

    Ok(page)
}

/// Responses other people sent to *my* notes, in three buckets.
pub async fn list_responses(
    State(AppState { db, .. }): State<AppState>,
    Extension(user): Extension<User>,
    Query(params): Query<Params>,
) -> Result<impl IntoResponse, ServerError> {
    let query = ListResponseQuery {
        owner_id: user.id,
        filter: ResponseFilter::from_params(&params),
    };
    let (responses, my_notes) = try_join!(
        Response::list(&db, &query),
        db_ops::list_notes_owned_by(&db, user.id)
    )?;
    let buckets = partition(responses);

    let page = components::Page {
        title: "Responses",
        viewer: Some(&user),
        children: Box::new(components::ResponseList {
            filter: &query.filter,
            my_notes: &my_notes,
            buckets: &buckets,
        }),
    }
    .render();

    Ok(page)
}

async fn decide(
    db: &sqlx::PgPool,
    user: &User,
    id: i32,
    decision: Decision,
) -> Result<impl IntoResponse, ServerError> {
    let mut response = Response::get(db, &GetResponseQuery { id }).await?;
    let note =
        Note::get(db, &GetNoteQuery { id: response.note_id }).await?;
    require_owner(&note, user)?;

    response.decide(decision);
    response.save(db).await?;
    tracing::info!(response_id = id, ?decision, "response decided");

    Ok((htmx::redirect(&Route::Responses.to_string()), ""))
}

pub async fn accept_response(
    State(AppState { db, .. }): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServerError> {
    decide(&db, &user, id, Decision::Accepted).await
}

pub async fn reject_response(
    State(AppState { db, .. }): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, ServerError> {
    decide(&db, &user, id, Decision::Rejected).await
}
