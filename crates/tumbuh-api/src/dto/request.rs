use serde::Deserialize;
use tumbuh_core::models::PageRequest;

/// Pagination for the tile listing
#[derive(Debug, Default, Deserialize)]
pub struct TilesQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl TilesQuery {
    pub fn page_request(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest::new(
            self.page.unwrap_or(defaults.page),
            self.per_page.unwrap_or(defaults.per_page),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HyperlocalQuery {
    #[serde(default)]
    pub refresh: bool,
}
