use rand::Rng;
use serde_json::Value;

use super::choose;
use crate::{
    error::{NavigationError, WorkflowError},
    navigator,
    transport::{Session, Transport},
};

/// Highest author facet page drawn. Fixed rather than derived from the facet
/// total, so draws past the last page come back empty and end the iteration.
pub const AUTHOR_PAGE_LIMIT: u64 = 300;

const SEARCH_RESULTS: &str = "_embedded.searchResult._embedded.objects";

/// Random author facet page, random author on it, then that author's search results.
pub(super) async fn author_search<T, R>(session: &Session<T>, rng: &mut R) -> Result<Value, WorkflowError>
where
    T: Transport,
    R: Rng + Send,
{
    let page = rng.gen_range(0..=AUTHOR_PAGE_LIMIT);
    let facet = session
        .get_json(
            &session.url(&format!("/server/api/discover/facets/author?page={page}")),
            "Get Authors Data from API",
        )
        .await?;

    let authors = navigator::optional_array_at(&facet, "_embedded.values")?;
    let author = choose(rng, authors, "authors")?;
    let search = navigator::str_at(author, "_links.search.href")?;
    session
        .get_json(search, "Get Random Author Articles from API")
        .await
}

pub(super) fn search_results(search: &Value) -> Result<&[Value], NavigationError> {
    navigator::array_at(search, SEARCH_RESULTS)
}

pub(super) async fn lookup<T, R>(session: &Session<T>, rng: &mut R) -> Result<(), WorkflowError>
where
    T: Transport,
    R: Rng + Send,
{
    let search = author_search(session, rng).await?;
    for result in search_results(&search)? {
        let uuid = navigator::str_at(result, "_embedded.indexableObject.uuid")?;
        session
            .get(&session.url(&format!("/items/{uuid}")), "Get Article by UUID")
            .await?;
    }
    Ok(())
}
