//! Bounded pagination extraction.

use serde::{Deserialize, Serialize};

use crate::api::bind::bind;
use crate::request_context::RequestContext;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination descriptor bound from `page` / `pageSize` parameters.
///
/// Always pass through [`secure`](Self::secure) before use; extraction via
/// [`extract_pager`] does this for you.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Pager {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pager {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pager {
    /// Clamps the pager into its valid range: `page >= 1`,
    /// `1 <= page_size <= MAX_PAGE_SIZE`.
    pub fn secure(mut self) -> Self {
        if self.page < 1 {
            self.page = 1;
        }
        if self.page_size == 0 {
            self.page_size = DEFAULT_PAGE_SIZE;
        }
        if self.page_size > MAX_PAGE_SIZE {
            self.page_size = MAX_PAGE_SIZE;
        }
        self
    }

    /// Offset of the first row on this page. A hand-built pager that skipped
    /// [`secure`](Self::secure) may still carry `page == 0`; treat it as the
    /// first page instead of underflowing.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.page_size)
    }
}

/// Best-effort pager extraction: decode failures fall back to the default
/// pager instead of erroring. Never fails, always returns a clamped value.
pub fn extract_pager(ctx: &RequestContext) -> Pager {
    bind::<Pager>(ctx).unwrap_or_default().secure()
}
