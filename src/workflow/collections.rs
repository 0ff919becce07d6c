use rand::Rng;

use crate::{
    error::WorkflowError,
    navigator,
    transport::{Session, Transport},
};

/// Uniform page index in `[0, total)` for a listing fetched one element per page.
/// An empty listing has no valid page.
pub fn draw_page<R: Rng + ?Sized>(rng: &mut R, total: u64) -> Result<u64, WorkflowError> {
    if total == 0 {
        return Err(WorkflowError::EmptyChoice("collection pages"));
    }
    Ok(rng.gen_range(0..total))
}

pub(super) async fn browse<T, R>(session: &Session<T>, rng: &mut R) -> Result<(), WorkflowError>
where
    T: Transport,
    R: Rng + Send,
{
    let listing = session
        .get_json(
            &session.url("/server/api/core/collections"),
            "Get Collection Data from API",
        )
        .await?;
    let total = navigator::u64_at(&listing, "page.totalElements")?;
    let page = draw_page(rng, total)?;

    let url = session.url(&format!("/server/api/core/collections?page={page}&size=1"));
    let current = session
        .get_json(&url, "Get Random List of Collections from API")
        .await?;
    for collection in navigator::array_at(&current, "_embedded.collections")? {
        let uuid = navigator::str_at(collection, "uuid")?;
        session
            .get(&session.url(&format!("/collections/{uuid}")), "Get Collection by UUID")
            .await?;
    }
    Ok(())
}
