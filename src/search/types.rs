use serde::{Deserialize, Serialize};

/// One organic search hit, in provider relevance order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

#[derive(Debug, Serialize)]
pub(super) struct SerperRequest<'a> {
    pub q: &'a str,
    pub num: usize,
}

#[derive(Debug, Deserialize)]
pub(super) struct SerperResponse {
    pub organic: Option<Vec<OrganicResult>>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OrganicResult {
    pub title: Option<String>,
    pub link: Option<String>,
    pub snippet: Option<String>,
}

impl SerperResponse {
    /// Drops entries without a usable link; missing titles/snippets become empty.
    pub fn into_results(self, max_results: usize) -> Vec<SearchResult> {
        self.organic
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| {
                let link = item.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty())?;
                Some(SearchResult {
                    title: item.title.unwrap_or_default(),
                    link,
                    snippet: item.snippet.unwrap_or_default(),
                })
            })
            .take(max_results)
            .collect()
    }
}
