// In many cases, we need to do a let binding to satisfy the borrow checker
// and for some reason, clippy identifies those as unnecessary. Maybe there
// are and clippy knows more than me, maybe not.
#![allow(clippy::let_and_return)]

use super::{
    config::LOGIN_URL,
    filter::{
        components::{NoteFilterForm, ResponseFilterForm},
        NoteFilter, ResponseFilter,
    },
    models::{Category, Decision, Note, Response, User},
    routes::Route,
    visibility::{DetailFlags, ResponseBuckets},
};
use ammonia::clean;

pub trait Component {
    /// Render the component to a HTML string. By convention, the
    /// implementation should sanitize all string properties at render-time
    fn render(&self) -> String;
}

pub struct Page<'a> {
    pub title: &'a str,
    pub viewer: Option<&'a User>,
    pub children: Box<dyn Component + 'a>,
}

impl Component for Page<'_> {
    fn render(&self) -> String {
        let nav = Nav {
            viewer: self.viewer,
        }
        .render();
        format!(
            r#"
            <html>
                <head>
                    <meta name="viewport" content="width=device-width, initial-scale=1.0"></meta>
                    <title>{title}</title>
                    <script src="https://unpkg.com/htmx.org@1.9.6"></script>
                </head>
                <body hx-boost="true" class="mt-2 ml-2 sm:mt-8 sm:ml-8">
                    {nav}
                    <main class="max-w-2xl">
                        {body_html}
                    </main>
                </body>
            </html>
            "#,
            title = clean(self.title),
            body_html = self.children.render()
        )
    }
}

struct Nav<'a> {
    viewer: Option<&'a User>,
}
impl Component for Nav<'_> {
    fn render(&self) -> String {
        let home = Route::Home;
        let search = Route::Search;
        let personal = match self.viewer {
            Some(user) => {
                let new_note = Route::NewNote;
                let responses = Route::Responses;
                let username = clean(&user.username);
                format!(
                    r#"
                    <a class="link" href="{new_note}">New note</a>
                    <a class="link" href="{responses}">Responses to my notes</a>
                    <span class="italic">{username}</span>
                    "#
                )
            }
            None => format!(r#"<a class="link" href="{LOGIN_URL}">Log in</a>"#),
        };
        format!(
            r#"
            <nav class="flex flex-row gap-4 mb-6">
                <a class="link font-bold" href="{home}">Board</a>
                <a class="link" href="{search}">Search</a>
                {personal}
            </nav>
            "#
        )
    }
}

pub struct NoteCard<'a> {
    pub note: &'a Note,
}
impl Component for NoteCard<'_> {
    fn render(&self) -> String {
        let detail = Route::NoteDetail(Some(self.note.id));
        let title = clean(&self.note.title);
        let author = clean(&self.note.author);
        let category = self.note.category;
        let posted = self.note.datetime.format("%Y-%m-%d %H:%M");
        format!(
            r#"
            <div class="rounded shadow p-2 my-2">
                <a class="link text-lg" href="{detail}">{title}</a>
                <p class="text-sm">{category} &middot; {author} &middot; {posted}</p>
            </div>
            "#
        )
    }
}

fn render_cards(notes: &[Note]) -> String {
    notes
        .iter()
        .map(|note| NoteCard { note }.render())
        .collect::<Vec<String>>()
        .join("")
}

pub struct NoteList<'a> {
    pub notes: &'a [Note],
    pub page: i64,
    pub next_page: Option<i64>,
}
impl Component for NoteList<'_> {
    fn render(&self) -> String {
        if self.notes.is_empty() {
            return "<p>Nothing posted yet.</p>".into();
        }
        let home = Route::Home;
        let cards = render_cards(self.notes);
        let prev = if self.page > 0 {
            let prev = self.page - 1;
            format!(r#"<a class="link" href="{home}?page={prev}">Newer</a>"#)
        } else {
            "".into()
        };
        let next = if let Some(next) = self.next_page {
            format!(r#"<a class="link" href="{home}?page={next}">Older</a>"#)
        } else {
            "".into()
        };
        format!(
            r#"
            <h1 class="text-xl mb-4">Latest notes</h1>
            {cards}
            <div class="flex flex-row gap-4">{prev}{next}</div>
            "#
        )
    }
}

pub struct NoteDetail<'a> {
    pub note: &'a Note,
    pub flags: DetailFlags,
    /// Set when a response submission bounced off validation.
    pub form_error: Option<&'a str>,
}
impl Component for NoteDetail<'_> {
    fn render(&self) -> String {
        let note = self.note;
        let title = clean(&note.title);
        let author = clean(&note.author);
        let category = note.category;
        let posted = note.datetime.format("%Y-%m-%d %H:%M");
        let body = clean(&markdown::to_html(&note.text));
        let edit_delete = if self.flags.edit_delete {
            let edit = Route::NoteEdit(Some(note.id));
            let delete = Route::NoteDelete(Some(note.id));
            format!(
                r#"
                <div class="flex flex-row gap-4 my-2">
                    <a class="link" href="{edit}">Edit</a>
                    <a class="link" href="{delete}">Delete</a>
                </div>
                "#
            )
        } else {
            "".into()
        };
        let message = if self.flags.message_response {
            r#"<p class="italic my-2">You have already responded to this note.</p>"#
        } else {
            ""
        };
        let form = if self.flags.pole_response {
            ResponseFormComponent {
                note_id: note.id,
                error: self.form_error,
            }
            .render()
        } else {
            "".into()
        };
        format!(
            r#"
            <article>
                <h1 class="text-xl">{title}</h1>
                <p class="text-sm mb-4">{category} &middot; {author} &middot; {posted}</p>
                <div class="prose">{body}</div>
            </article>
            {edit_delete}
            {message}
            {form}
            "#
        )
    }
}

fn error_banner(error: Option<&str>) -> String {
    match error {
        Some(e) => format!(
            r#"<p class="bg-red-100 rounded p-2 my-2">{}</p>"#,
            clean(e)
        ),
        None => "".into(),
    }
}

struct ResponseFormComponent<'a> {
    note_id: i32,
    error: Option<&'a str>,
}
impl Component for ResponseFormComponent<'_> {
    fn render(&self) -> String {
        let action = Route::NoteRespond(Some(self.note_id));
        let error = error_banner(self.error);
        format!(
            r#"
            <form method="post" action="{action}" class="flex flex-col gap-2 my-4">
                <h2 class="text-lg">Respond</h2>
                {error}
                <textarea name="text" class="rounded h-24"></textarea>
                <button class="bg-blue-200 rounded shadow p-2 hover:shadow-none">Send response</button>
            </form>
            "#
        )
    }
}

/// Shared by the create and edit pages.
pub struct NoteForm<'a> {
    pub action: Route,
    pub heading: &'a str,
    pub title: &'a str,
    pub category: Option<Category>,
    pub text: &'a str,
    pub error: Option<&'a str>,
}
impl Component for NoteForm<'_> {
    fn render(&self) -> String {
        let action = self.action;
        let heading = clean(self.heading);
        let title = clean(self.title);
        let text = clean(self.text);
        let error = error_banner(self.error);
        let options = Category::ALL.iter().fold(String::new(), |mut acc, c| {
            let slug = c.slug();
            let selected = if self.category == Some(*c) {
                "selected"
            } else {
                ""
            };
            acc.push_str(&format!(
                r#"<option {selected} value="{slug}">{c}</option>"#
            ));
            acc
        });
        format!(
            r#"
            <form method="post" action="{action}" class="flex flex-col gap-2">
                <h1 class="text-xl">{heading}</h1>
                {error}
                <label for="title">Title</label>
                <input class="rounded" type="text" name="title" id="title" value="{title}" />
                <label for="category">Category</label>
                <select class="rounded" name="category" id="category">{options}</select>
                <label for="text">Text</label>
                <textarea class="rounded h-48" name="text" id="text">{text}</textarea>
                <button class="bg-blue-200 rounded shadow p-2 hover:shadow-none">Save</button>
            </form>
            "#
        )
    }
}

pub struct DeleteConfirm<'a> {
    pub note: &'a Note,
}
impl Component for DeleteConfirm<'_> {
    fn render(&self) -> String {
        let title = clean(&self.note.title);
        let delete = Route::NoteDelete(Some(self.note.id));
        let back = Route::NoteDetail(Some(self.note.id));
        format!(
            r#"
            <div class="flex flex-col gap-2">
                <p>Delete <span class="font-bold">{title}</span> and every response to it?</p>
                <div class="flex flex-row gap-4">
                    <button
                        hx-delete="{delete}"
                        class="bg-red-200 rounded shadow p-2 hover:shadow-none"
                    >Delete</button>
                    <a class="link" href="{back}">Cancel</a>
                </div>
            </div>
            "#
        )
    }
}

pub struct SearchResults<'a> {
    pub filter: &'a NoteFilter,
    pub notes: &'a [Note],
}
impl Component for SearchResults<'_> {
    fn render(&self) -> String {
        let form = NoteFilterForm {
            filter: self.filter,
        }
        .render();
        let heading = if self.filter.is_empty() {
            "All notes"
        } else {
            "Matching notes"
        };
        let results = if self.notes.is_empty() {
            "<p>No notes match.</p>".to_string()
        } else {
            render_cards(self.notes)
        };
        format!(
            r#"
            <h1 class="text-xl">Search</h1>
            {form}
            <h2 class="text-lg">{heading}</h2>
            {results}
            "#
        )
    }
}

struct ResponseRow<'a> {
    response: &'a Response,
}
impl Component for ResponseRow<'_> {
    fn render(&self) -> String {
        let r = self.response;
        let note = Route::NoteDetail(Some(r.note_id));
        let note_title = clean(&r.note_title);
        let responder = clean(&r.responder);
        let text = clean(&r.text);
        // Decisions can be revisited, so offer whatever would change it
        let decision = r.decision();
        let accept = if decision != Decision::Accepted {
            let accept = Route::ResponseAccept(Some(r.id));
            format!(r#"<button hx-post="{accept}" class="bg-green-100 rounded shadow px-2 hover:shadow-none">Accept</button>"#)
        } else {
            "".into()
        };
        let reject = if decision != Decision::Rejected {
            let reject = Route::ResponseReject(Some(r.id));
            format!(r#"<button hx-post="{reject}" class="bg-red-100 rounded shadow px-2 hover:shadow-none">Reject</button>"#)
        } else {
            "".into()
        };
        format!(
            r#"
            <div class="rounded shadow p-2 my-2">
                <p class="text-sm"><span class="font-bold">{responder}</span> on <a class="link" href="{note}">{note_title}</a></p>
                <p>{text}</p>
                <div class="flex flex-row gap-2">{accept}{reject}</div>
            </div>
            "#
        )
    }
}

fn render_section(heading: &str, responses: &[Response]) -> String {
    let rows = if responses.is_empty() {
        "<p>None.</p>".to_string()
    } else {
        responses
            .iter()
            .map(|response| ResponseRow { response }.render())
            .collect::<Vec<String>>()
            .join("")
    };
    format!(
        r#"
        <section class="my-4">
            <h2 class="text-lg">{heading}</h2>
            {rows}
        </section>
        "#
    )
}

pub struct ResponseList<'a> {
    pub filter: &'a ResponseFilter,
    pub my_notes: &'a [Note],
    pub buckets: &'a ResponseBuckets,
}
impl Component for ResponseList<'_> {
    fn render(&self) -> String {
        let form = ResponseFilterForm {
            filter: self.filter,
            my_notes: self.my_notes,
        }
        .render();
        let pending = render_section("New", &self.buckets.pending);
        let accepted = render_section("Accepted", &self.buckets.accepted);
        let rejected = render_section("Rejected", &self.buckets.rejected);
        let total = match self.buckets.total() {
            1 => "1 response".to_string(),
            n => format!("{n} responses"),
        };
        format!(
            r#"
            <h1 class="text-xl">Responses to my notes</h1>
            {form}
            <p class="text-sm">{total}</p>
            {pending}
            {accepted}
            {rejected}
            "#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::fixtures::{note, response, user},
        visibility::{partition, Visibility},
    };

    fn detail(flags: DetailFlags) -> String {
        let n = note(7, 1, Category::Healers, 0);
        NoteDetail {
            note: &n,
            flags,
            form_error: None,
        }
        .render()
    }

    #[test]
    fn test_owner_detail_has_controls_but_no_form() {
        let html = detail(Visibility::Owner.flags());
        assert!(html.contains("/notes/7/edit"));
        assert!(html.contains("/notes/7/delete"));
        assert!(!html.contains("/notes/7/respond"));
    }

    #[test]
    fn test_open_detail_has_form_only() {
        let html = detail(Visibility::Open.flags());
        assert!(html.contains(r#"action="/notes/7/respond""#));
        assert!(!html.contains("/notes/7/edit"));
        assert!(!html.contains("already responded"));
    }

    #[test]
    fn test_responded_detail_has_message_only() {
        let html = detail(Visibility::AlreadyResponded.flags());
        assert!(html.contains("already responded"));
        assert!(!html.contains("/notes/7/respond"));
    }

    #[test]
    fn test_note_text_is_markdown_and_sanitized() {
        let mut n = note(7, 1, Category::Healers, 0);
        n.text = "**raid** <script>alert(1)</script>".into();
        let html = NoteDetail {
            note: &n,
            flags: DetailFlags::default(),
            form_error: None,
        }
        .render();
        assert!(html.contains("<strong>raid</strong>"));
        assert!(!html.contains("<script>alert"));
    }

    #[test]
    fn test_response_list_sections() {
        let buckets = partition(vec![
            response(1, 7, 2, Decision::Pending),
            response(2, 7, 3, Decision::Accepted),
        ]);
        let html = ResponseList {
            filter: &ResponseFilter::default(),
            my_notes: &[],
            buckets: &buckets,
        }
        .render();
        assert!(html.contains("/responses/1/accept"));
        assert!(html.contains("/responses/1/reject"));
        assert!(html.contains("/responses/2/reject"));
        assert!(!html.contains("/responses/2/accept"));
        // nothing rejected yet
        assert!(html.contains("None."));
        assert!(html.contains("2 responses"));
    }

    #[test]
    fn test_search_heading_follows_filter() {
        let notes = vec![note(1, 1, Category::Tanks, 0)];
        let everything = SearchResults {
            filter: &NoteFilter::default(),
            notes: &notes,
        }
        .render();
        assert!(everything.contains("All notes"));

        let tanks = NoteFilter {
            user: None,
            category: Some(Category::Tanks),
        };
        let narrowed = SearchResults {
            filter: &tanks,
            notes: &notes,
        }
        .render();
        assert!(narrowed.contains("Matching notes"));
    }

    #[test]
    fn test_nav_depends_on_viewer() {
        let anon = Nav { viewer: None }.render();
        assert!(anon.contains(LOGIN_URL));
        let me = user(1);
        let logged_in = Nav { viewer: Some(&me) }.render();
        assert!(logged_in.contains("/responses"));
        assert!(logged_in.contains("user1"));
    }

    #[test]
    fn test_note_list_paging_links() {
        let notes = vec![note(1, 1, Category::Tanks, 0)];
        let html = NoteList {
            notes: &notes,
            page: 1,
            next_page: Some(2),
        }
        .render();
        assert!(html.contains("?page=0"));
        assert!(html.contains("?page=2"));
    }
}
