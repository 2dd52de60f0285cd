pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    Id,
    #[default]
    CreatedAt,
}

impl SortBy {
    /// Unknown columns fall back to `created_at`.
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(|raw| raw.trim().to_ascii_lowercase()).as_deref() {
            Some("id") => SortBy::Id,
            _ => SortBy::CreatedAt,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            SortBy::Id => "id",
            SortBy::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Unknown directions fall back to ascending.
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(|raw| raw.trim().to_ascii_lowercase()).as_deref() {
            Some("desc") => SortOrder::Desc,
            _ => SortOrder::Asc,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// A normalized request for one page of top-level trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
}

impl PageRequest {
    /// Clamps `page` to at least 1; a `limit` outside `1..=100` becomes the default.
    pub fn new(page: i64, limit: i64, sort_by: SortBy, sort_order: SortOrder) -> Self {
        let page = page.max(1);
        let limit = if (1..=MAX_PAGE_LIMIT).contains(&limit) {
            limit
        } else {
            DEFAULT_PAGE_LIMIT
        };
        PageRequest {
            page,
            limit,
            sort_by,
            sort_order,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(1, DEFAULT_PAGE_LIMIT, SortBy::default(), SortOrder::default())
    }
}
