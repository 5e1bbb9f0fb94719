use super::models::{NoteFilter, ResponseFilter};
use crate::{
    components::Component,
    models::{Category, Note},
    routes::Route,
};
use ammonia::clean;

fn selected(is: bool) -> &'static str {
    if is {
        "selected"
    } else {
        ""
    }
}

/// The form at the top of the search page. Submitting it with nothing
/// selected gives you the whole board back.
pub struct NoteFilterForm<'a> {
    pub filter: &'a NoteFilter,
}
impl Component for NoteFilterForm<'_> {
    fn render(&self) -> String {
        let search = Route::Search;
        let any_selected = selected(self.filter.category.is_none());
        let options = Category::ALL.iter().fold(String::new(), |mut acc, c| {
            let slug = c.slug();
            let is_selected = selected(self.filter.category == Some(*c));
            acc.push_str(&format!(
                r#"<option {is_selected} value="{slug}">{c}</option>"#
            ));
            acc
        });
        let user = self
            .filter
            .user
            .map(|u| u.to_string())
            .unwrap_or_default();
        format!(
            r#"
            <form method="get" action="{search}" class="flex flex-row gap-2 items-end my-4">
                <div class="flex flex-col">
                    <label for="category">Category</label>
                    <select id="category" name="category" class="rounded">
                        <option {any_selected} value="">Any</option>
                        {options}
                    </select>
                </div>
                <div class="flex flex-col">
                    <label for="user">Author id</label>
                    <input id="user" name="user" type="number" value="{user}" class="rounded w-24" />
                </div>
                <button class="bg-blue-200 rounded shadow p-2 hover:shadow-none">Search</button>
            </form>
            "#
        )
    }
}

/// Narrow the responses page down to one of your notes.
pub struct ResponseFilterForm<'a> {
    pub filter: &'a ResponseFilter,
    pub my_notes: &'a [Note],
}
impl Component for ResponseFilterForm<'_> {
    fn render(&self) -> String {
        let responses = Route::Responses;
        let any_selected = selected(self.filter.note_id.is_none());
        let options = self.my_notes.iter().fold(String::new(), |mut acc, n| {
            let id = n.id;
            let is_selected = selected(self.filter.note_id == Some(id));
            let title = clean(&n.title);
            acc.push_str(&format!(
                r#"<option {is_selected} value="{id}">{title}</option>"#
            ));
            acc
        });
        format!(
            r#"
            <form method="get" action="{responses}" class="flex flex-row gap-2 items-end my-4">
                <div class="flex flex-col">
                    <label for="note_id">Note</label>
                    <select id="note_id" name="note_id" class="rounded">
                        <option {any_selected} value="">All my notes</option>
                        {options}
                    </select>
                </div>
                <button class="bg-blue-200 rounded shadow p-2 hover:shadow-none">Filter</button>
            </form>
            "#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::note;

    #[test]
    fn test_selected_category_is_marked() {
        let html = NoteFilterForm {
            filter: &NoteFilter {
                user: Some(7),
                category: Some(Category::Blacksmiths),
            },
        }
        .render();
        assert!(html.contains(r#"<option selected value="blacksmiths">"#));
        assert!(html.contains(r#"<option  value="">Any</option>"#));
        assert!(html.contains(r#"value="7""#));
    }

    #[test]
    fn test_note_titles_are_sanitized() {
        let mut n = note(3, 1, Category::Tanks, 0);
        n.title = "<script>alert(1)</script>LF".into();
        let notes = [n];
        let html = ResponseFilterForm {
            filter: &ResponseFilter { note_id: Some(3) },
            my_notes: &notes,
        }
        .render();
        assert!(!html.contains("<script>"));
        assert!(html.contains(r#"<option selected value="3">"#));
    }
}
