use sea_orm::{ConnectionTrait, EntityTrait, QuerySelect, Select};
use serde::Serialize;

use super::store::{StoreError, StoreResult};

pub const MAX_PAGE_SIZE: u64 = 100;
pub const DEFAULT_PAGE_SIZE: u64 = 25;

#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub has_next: bool,
}

impl<T> PaginatedResponse<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResponse<U> {
        PaginatedResponse {
            data: self.data.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            has_next: self.has_next,
        }
    }
}

pub fn check_page(page: u64, page_size: u64) -> StoreResult<()> {
    if page == 0 || page_size == 0 || page_size > MAX_PAGE_SIZE {
        return Err(StoreError::InvalidPagination { page, page_size });
    }
    Ok(())
}

/// Fetches one page of an already ordered select. One extra row is read to
/// learn whether another page follows.
pub async fn fetch_page<E, C>(
    db: &C,
    select: Select<E>,
    page: u64,
    page_size: u64,
) -> StoreResult<PaginatedResponse<E::Model>>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    check_page(page, page_size)?;

    let offset = page.saturating_sub(1).saturating_mul(page_size);
    let mut data = select
        .limit(page_size.saturating_add(1))
        .offset(offset)
        .all(db)
        .await?;

    let has_next = data.len() > page_size as usize;
    if has_next {
        data.truncate(page_size as usize);
    }

    Ok(PaginatedResponse {
        data,
        page,
        page_size,
        has_next,
    })
}
