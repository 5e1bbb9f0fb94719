use crate::models::Category;
use std::collections::HashMap;

/// Raw query-string parameters, as axum's `Query<HashMap<..>>` hands them
/// over.
pub type Params = HashMap<String, String>;

/// Pull `key` out of the params and coerce it. Missing, blank and
/// unparseable values all mean "don't filter on this".
fn coerce<T: std::str::FromStr>(params: &Params, key: &str) -> Option<T> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoteFilter {
    /// Owner's user id.
    pub user: Option<i32>,
    pub category: Option<Category>,
}

impl NoteFilter {
    pub fn from_params(params: &Params) -> Self {
        Self {
            user: coerce(params, "user"),
            category: coerce(params, "category"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.category.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResponseFilter {
    pub note_id: Option<i32>,
}

impl ResponseFilter {
    pub fn from_params(params: &Params) -> Self {
        Self {
            note_id: coerce(params, "note_id"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_category_param() {
        let filter = NoteFilter::from_params(&params(&[("category", "tanks")]));
        assert_eq!(filter.category, Some(Category::Tanks));
        assert_eq!(filter.user, None);
        assert!(!filter.is_empty());
    }

    #[test]
    fn test_no_params_is_no_filter() {
        assert!(NoteFilter::from_params(&Params::new()).is_empty());
    }

    #[test]
    fn test_user_and_category_combine() {
        let filter = NoteFilter::from_params(&params(&[
            ("user", "1"),
            ("category", "healers"),
        ]));
        assert_eq!(
            filter,
            NoteFilter {
                user: Some(1),
                category: Some(Category::Healers),
            }
        );
    }

    #[test]
    fn test_bad_values_degrade_to_no_filter() {
        let filter = NoteFilter::from_params(&params(&[
            ("user", "jack"),
            ("category", "bards"),
            ("colour", "red"),
        ]));
        assert!(filter.is_empty());

        let blank =
            NoteFilter::from_params(&params(&[("user", ""), ("category", " ")]));
        assert!(blank.is_empty());

        let overflow = NoteFilter::from_params(&params(&[(
            "user",
            "99999999999999999999",
        )]));
        assert!(overflow.is_empty());
    }

    #[test]
    fn test_response_filter() {
        let filter = ResponseFilter::from_params(&params(&[("note_id", " 10 ")]));
        assert_eq!(filter.note_id, Some(10));

        let garbage =
            ResponseFilter::from_params(&params(&[("note_id", "ten")]));
        assert_eq!(garbage, ResponseFilter::default());
    }
}
