use rand::Rng;

use super::{
    authors::{author_search, search_results},
    choose,
};
use crate::{
    error::WorkflowError,
    navigator,
    transport::{Session, Transport},
};

pub(super) async fn download<T, R>(session: &Session<T>, rng: &mut R) -> Result<(), WorkflowError>
where
    T: Transport,
    R: Rng + Send,
{
    let search = author_search(session, rng).await?;
    let articles = search_results(&search)?
        .iter()
        .map(|result| navigator::str_at(result, "_links.indexableObject.href"))
        .collect::<Result<Vec<_>, _>>()?;
    let article_href = *choose(rng, &articles, "articles")?;
    let article = session
        .get_json(article_href, "Get Article API Response by UUID")
        .await?;

    let bundles_href = navigator::str_at(&article, "_links.bundles.href")?;
    let bundles = session
        .get_json(bundles_href, "Get Bundle API Response")
        .await?;
    let bundle = choose(rng, navigator::array_at(&bundles, "_embedded.bundles")?, "bundles")?;
    let bundle_uuid = navigator::str_at(bundle, "uuid")?;

    let bitstreams = session
        .get_json(
            &session.url(&format!("/server/api/core/bundles/{bundle_uuid}/bitstreams")),
            "Get Random Bundle's Bitstreams",
        )
        .await?;
    let bitstream = choose(
        rng,
        navigator::array_at(&bitstreams, "_embedded.bitstreams")?,
        "bitstreams",
    )?;
    let uuid = navigator::str_at(bitstream, "uuid")?;

    session
        .get(
            &session.url(&format!("/bitstreams/{uuid}/download")),
            "Download Random Bitstream",
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};
    use serde_json::{Value, json};

    use super::*;
    use crate::{
        testing::{CannedTransport, recording_session},
        workflow::AUTHOR_PAGE_LIMIT,
    };

    const BASE: &str = "https://repo.test";
    const SEARCH: &str = "https://repo.test/server/api/discover/search/objects?f.author=Doe,equals";
    const ITEM: &str = "https://repo.test/server/api/core/items/i-1";
    const BUNDLES: &str = "https://repo.test/server/api/core/items/i-1/bundles";

    fn repository(bitstreams: Value) -> CannedTransport {
        let facet = json!({
            "_embedded": { "values": [{ "_links": { "search": { "href": SEARCH } } }] }
        });
        (0..=AUTHOR_PAGE_LIMIT)
            .fold(CannedTransport::new(), |t, page| {
                t.with_json(
                    &format!("{BASE}/server/api/discover/facets/author?page={page}"),
                    facet.clone(),
                )
            })
            .with_json(
                SEARCH,
                json!({ "_embedded": { "searchResult": { "_embedded": { "objects": [{
                    "_embedded": { "indexableObject": { "uuid": "i-1" } },
                    "_links": { "indexableObject": { "href": ITEM } }
                }] } } } }),
            )
            .with_json(
                ITEM,
                json!({ "uuid": "i-1", "_links": { "bundles": { "href": BUNDLES } } }),
            )
            .with_json(
                BUNDLES,
                json!({ "_embedded": { "bundles": [{ "uuid": "bn-1", "name": "ORIGINAL" }] } }),
            )
            .with_json(
                &format!("{BASE}/server/api/core/bundles/bn-1/bitstreams"),
                bitstreams,
            )
            .with_body(&format!("{BASE}/bitstreams/bs-1/download"), b"%PDF-1.7")
    }

    #[tokio::test]
    async fn follows_links_down_to_the_download() {
        let transport = repository(json!({ "_embedded": { "bitstreams": [{ "uuid": "bs-1" }] } }));
        let (session, log) = recording_session(transport.clone(), BASE);

        let mut rng = StdRng::seed_from_u64(9);
        download(&session, &mut rng).await.unwrap();

        let calls = transport.calls();
        assert_eq!(
            calls[1..],
            [
                SEARCH.to_string(),
                ITEM.to_string(),
                BUNDLES.to_string(),
                format!("{BASE}/server/api/core/bundles/bn-1/bitstreams"),
                format!("{BASE}/bitstreams/bs-1/download"),
            ]
        );
        let lines = log.lines();
        assert_eq!(lines.len(), 6);
        assert!(lines[5].contains("Request: GET Download Random Bitstream "));
    }

    #[tokio::test]
    async fn bundle_without_bitstreams_stops_before_download() {
        let transport = repository(json!({ "_embedded": { "bitstreams": [] } }));
        let (session, _) = recording_session(transport.clone(), BASE);

        let mut rng = StdRng::seed_from_u64(9);
        let err = download(&session, &mut rng).await.unwrap_err();
        assert!(matches!(err, WorkflowError::EmptyChoice("bitstreams")));
        assert_eq!(transport.calls().len(), 5);
    }
}
