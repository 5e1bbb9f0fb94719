//! Translating filters into `where` clauses. Each condition is tacked on
//! with `and`, so something must already have opened the `where`:
//! `NoteFilter` does it itself with `where true`, while `ResponseFilter`
//! relies on the caller's owner restriction.

use super::models::{NoteFilter, ResponseFilter};
use sqlx::{Postgres, QueryBuilder};

impl NoteFilter {
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" where true");
        if let Some(user) = self.user {
            qb.push(" and n.user_id = ").push_bind(user);
        }
        if let Some(category) = self.category {
            qb.push(" and n.category = ").push_bind(category.slug());
        }
    }
}

impl ResponseFilter {
    /// The caller is responsible for restricting to an owner; this only
    /// narrows down to a single note.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(note_id) = self.note_id {
            qb.push(" and r.note_id = ").push_bind(note_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    #[test]
    fn test_empty_note_filter_adds_nothing() {
        let mut qb = QueryBuilder::<Postgres>::new("select 1 from note n");
        NoteFilter::default().push_where(&mut qb);
        assert_eq!(qb.sql(), "select 1 from note n where true");
    }

    #[test]
    fn test_note_filter_binds_both_fields() {
        let mut qb = QueryBuilder::<Postgres>::new("select 1 from note n");
        NoteFilter {
            user: Some(3),
            category: Some(Category::Healers),
        }
        .push_where(&mut qb);
        assert_eq!(
            qb.sql(),
            "select 1 from note n where true and n.user_id = $1 and n.category = $2"
        );
    }

    #[test]
    fn test_response_filter_binds_note() {
        let mut qb =
            QueryBuilder::<Postgres>::new("select 1 from response r where true");
        ResponseFilter { note_id: Some(4) }.push_where(&mut qb);
        assert_eq!(
            qb.sql(),
            "select 1 from response r where true and r.note_id = $1"
        );
    }
}
