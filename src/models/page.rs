//! One page of a paginated upstream collection.

use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::Record;

/// A fetched collection page. Never cached; consumed by the crawler or the
/// staleness policy right after it arrives.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Records on this page, in upstream order
    pub results: Vec<Record>,
    /// Pointer to the following page, if any
    pub next: Option<String>,
    /// Total size of the collection as declared by upstream
    pub count: usize,
}

impl Page {
    /// Parse a page body of the shape `{ "count", "next", "results" }`.
    ///
    /// A missing `count` is treated as the size of this page; an empty or
    /// null `next` ends the chain.
    pub fn from_value(body: Value) -> Result<Self> {
        let Value::Object(mut body) = body else {
            return Err(AppError::InvalidRecord(
                "page body is not a JSON object".to_string(),
            ));
        };

        let results = match body.remove("results") {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(Record::from_value)
                .collect::<Result<Vec<_>>>()?,
            _ => {
                return Err(AppError::InvalidRecord(
                    "page has no `results` array".to_string(),
                ));
            }
        };

        let next = body
            .get("next")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|next| !next.is_empty())
            .map(String::from);

        let count = body
            .get("count")
            .and_then(Value::as_u64)
            .map(|count| count as usize)
            .unwrap_or(results.len());

        Ok(Self {
            results,
            next,
            count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_page() {
        let page = Page::from_value(json!({
            "count": 82,
            "next": "https://swapi.dev/api/people/?page=2",
            "previous": null,
            "results": [
                { "name": "Luke Skywalker", "url": "https://swapi.dev/api/people/1/" },
                { "name": "C-3PO", "url": "https://swapi.dev/api/people/2/" }
            ]
        }))
        .unwrap();

        assert_eq!(page.count, 82);
        assert_eq!(page.results.len(), 2);
        assert_eq!(page.results[1].name(), Some("C-3PO"));
        assert_eq!(page.next.as_deref(), Some("https://swapi.dev/api/people/?page=2"));
    }

    #[test]
    fn test_empty_next_ends_chain() {
        let page = Page::from_value(json!({ "count": 1, "next": "", "results": [] })).unwrap();
        assert_eq!(page.next, None);

        let page = Page::from_value(json!({ "count": 1, "next": null, "results": [] })).unwrap();
        assert_eq!(page.next, None);
    }

    #[test]
    fn test_missing_results_is_rejected() {
        assert!(Page::from_value(json!({ "count": 3 })).is_err());
        assert!(Page::from_value(json!("nope")).is_err());
    }

    #[test]
    fn test_missing_count_defaults_to_page_size() {
        let page = Page::from_value(json!({
            "results": [{ "name": "Yoda", "url": "/people/20/" }]
        }))
        .unwrap();
        assert_eq!(page.count, 1);
    }
}
