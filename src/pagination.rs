use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::categories::CategoryResponse;
use crate::events::{EventResponse, ParticipatedEventResponse};
use crate::users::UserResponse;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;
const FALLBACK_PAGE_SIZE: u32 = 10;

/// Pagination query parameters extracted from the HTTP request
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
pub struct PaginationParams {
    /// Page number (1-indexed, defaults to 1)
    pub page: Option<u32>,
    /// Items per page (defaults to 50, capped at 100)
    pub page_size: Option<u32>,
}

/// Normalized pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.number - 1) * i64::from(self.size)
    }
}

impl Default for Page {
    fn default() -> Self {
        PaginationParams::default().normalize()
    }
}

impl PaginationParams {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    /// Applies defaults and bounds: page >= 1, 0 < size <= 100
    pub fn normalize(self) -> Page {
        let number = self.page.unwrap_or(1).max(1);
        let size = match self.page_size {
            None => DEFAULT_PAGE_SIZE,
            Some(0) => FALLBACK_PAGE_SIZE,
            Some(size) if size > MAX_PAGE_SIZE => MAX_PAGE_SIZE,
            Some(size) => size,
        };
        Page { number, size }
    }
}

/// One page of results plus the totals needed to navigate
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[aliases(
    PagedCategories = PagedList<CategoryResponse>,
    PagedEvents = PagedList<EventResponse>,
    PagedUsers = PagedList<UserResponse>,
    PagedParticipations = PagedList<ParticipatedEventResponse>
)]
pub struct PagedList<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> PagedList<T> {
    pub fn new(items: Vec<T>, page: Page, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(u64::from(page.size)) as u32;
        Self {
            items,
            page: page.number,
            page_size: page.size,
            total_items,
            total_pages,
            has_previous: page.number > 1,
            has_next: page.number < total_pages,
        }
    }

    /// Slices an already ordered, fully materialized collection
    pub fn from_vec(all: Vec<T>, page: Page) -> Self {
        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        Self::new(items, page, total)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedList<U> {
        PagedList {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
            has_previous: self.has_previous,
            has_next: self.has_next,
        }
    }
}
