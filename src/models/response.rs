use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// List endpoints answer either with a bare array or with a paginated `{"results": [...]}` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged, bound(deserialize = "T: Deserialize<'de>"))]
pub enum ListResponse<T> {
    Bare(Vec<T>),
    Paginated {
        #[serde(default)]
        results: Vec<T>,
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
    },
}

impl<T> ListResponse<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListResponse::Bare(items) => items,
            ListResponse::Paginated { results, .. } => results,
        }
    }
}

/// Normalizes either list shape into a plain vector. Every list endpoint goes through here.
pub fn unwrap_list<T>(response: ListResponse<T>) -> Vec<T> {
    response.into_vec()
}

/// Parses a list body of either shape.
pub fn parse_list<T: DeserializeOwned>(body: &str) -> serde_json::Result<Vec<T>> {
    serde_json::from_str::<ListResponse<T>>(body).map(unwrap_list)
}

/// Unread counters: `{"unread_count": n}` for post notifications, `{"count": n}` for friend ones.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CountResponse {
    #[serde(default, alias = "unread_count")]
    pub count: u32,
}
