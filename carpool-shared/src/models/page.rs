use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

fn default_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Zero-based page request, as parsed from `?page=&size=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }.clamp(u32::MAX)
    }

    /// Keeps `size` within `1..=max_size`.
    pub fn clamp(self, max_size: u32) -> Self {
        Self {
            page: self.page,
            size: self.size.clamp(1, max_size.max(1)),
        }
    }

    pub fn offset(&self) -> u64 {
        self.page as u64 * self.size as u64
    }

    pub fn limit(&self) -> u64 {
        self.size as u64
    }
}

/// One page of results plus enough totals to drive pagination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: PageRequest, total_elements: u64) -> Self {
        let size = request.size.max(1) as u64;
        let total_pages = total_elements.div_ceil(size) as u32;
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages,
        }
    }

    /// Slices an already filtered and ordered result set.
    pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let content = all
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit() as usize)
            .collect();
        Self::new(content, request, total)
    }

    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_bounds_size() {
        assert_eq!(PageRequest { page: 2, size: 0 }.clamp(50).size, 1);
        assert_eq!(PageRequest { page: 2, size: 500 }.clamp(50).size, 50);
    }

    #[test]
    fn test_from_sorted_slices_and_counts() {
        let page = Page::from_sorted((0..25).collect::<Vec<_>>(), PageRequest::new(2, 10));
        assert_eq!(page.content, vec![20, 21, 22, 23, 24]);
        assert_eq!(page.total_elements, 25);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn test_page_past_the_end_is_empty() {
        let page = Page::from_sorted(vec![1, 2, 3], PageRequest::new(5, 10));
        assert!(page.content.is_empty());
        assert_eq!(page.total_pages, 1);
    }
}
