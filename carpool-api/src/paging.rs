use serde::Deserialize;

use carpool_shared::PageRequest;
use carpool_store::app_config::PagingConfig;

/// `?page=0&size=10` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl PageParams {
    pub fn resolve(&self, paging: &PagingConfig) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(0),
            self.size.unwrap_or(paging.default_size),
        )
        .clamp(paging.max_size)
    }
}
