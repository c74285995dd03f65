//! End-to-end pipeline tests: store writes flow through the mutation channel
//! into the maintainer and become visible in every projection.

use featurevault::indexing::{IndexMaintainer, ProjectionBuilder};
use featurevault::models::{FeatureUpload, ReportSubmission, Scenario, PRODUCT_METADATA_KEY};
use featurevault::projections::{BranchListingProjection, ProductVersionProjection};
use featurevault::query::QueryService;
use featurevault::search::{SearchConfig, SearchRequest, SearchService};
use featurevault::store::{FeatureStore, InMemoryStore, MutationEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;

struct Pipeline {
    store: InMemoryStore,
    maintainer: Arc<IndexMaintainer>,
    query: QueryService,
    _index_dir: TempDir,
}

async fn pipeline() -> Pipeline {
    let index_dir = TempDir::new().unwrap();
    let (tx, rx) = mpsc::channel::<MutationEvent>(64);

    let store = InMemoryStore::new(tx);

    let search = Arc::new(
        SearchService::new(SearchConfig {
            index_path: index_dir.path().to_path_buf(),
            ..Default::default()
        })
        .await
        .unwrap(),
    );
    let product_version = Arc::new(ProductVersionProjection::new());
    let branches = Arc::new(BranchListingProjection::new());

    let projections: Vec<Arc<dyn ProjectionBuilder>> = vec![
        search.clone(),
        product_version.clone(),
        branches.clone(),
    ];
    let maintainer = Arc::new(IndexMaintainer::new(projections));

    let worker = maintainer.clone();
    tokio::spawn(async move { worker.run(rx).await });

    let query = QueryService::new(search, product_version, branches);

    Pipeline {
        store,
        maintainer,
        query,
        _index_dir: index_dir,
    }
}

fn upload(branch: &str, group: &str, title: &str, description: &str) -> FeatureUpload {
    FeatureUpload {
        branch: branch.to_string(),
        group: group.to_string(),
        title: title.to_string(),
        product: Some("Webshop".to_string()),
        version: Some("1.0".to_string()),
        tags: vec!["smoke".to_string()],
        description: description.to_string(),
        background: None,
        scenarios: vec![Scenario {
            name: "happy path".to_string(),
            steps: vec!["Given an empty cart".to_string()],
        }],
    }
}

#[tokio::test]
async fn test_reupload_overwrites_everywhere() {
    let p = pipeline().await;

    let first = p
        .store
        .put(upload("main", "Cart", "Add Item", "the original wording"))
        .await
        .unwrap();
    let second = p
        .store
        .put(upload("MAIN", "cart", "ADD ITEM", "the replacement wording"))
        .await
        .unwrap();
    assert_eq!(first.id, second.id);

    p.maintainer.wait_for_processed(2).await;

    // Canonical read sees only the replacement.
    let stored = p.store.get(&first.id).await.unwrap().unwrap();
    assert_eq!(stored.description, "the replacement wording");

    // Search sees exactly one hit for the shared coordinates.
    let response = p
        .query
        .search_by_text(&SearchRequest::new("replacement"))
        .await
        .unwrap();
    assert_eq!(response.hits.len(), 1);
    assert_eq!(response.hits[0].id, first.id);

    let stale = p
        .query
        .search_by_text(&SearchRequest::new("original"))
        .await
        .unwrap();
    assert!(stale.hits.is_empty());

    // Branch listing holds one entry, not two.
    assert_eq!(p.query.list_by_branch("main").len(), 1);
}

#[tokio::test]
async fn test_same_feature_on_two_branches_is_two_documents() {
    let p = pipeline().await;

    let main = p
        .store
        .put(upload("main", "Cart", "Add Item", "d"))
        .await
        .unwrap();
    let release = p
        .store
        .put(upload("release-1", "Cart", "Add Item", "d"))
        .await
        .unwrap();

    assert_ne!(main.id, release.id);
    assert!(main.id.starts_with("main/"));
    assert!(release.id.starts_with("release-1/"));

    p.maintainer.wait_for_processed(2).await;

    assert_eq!(p.query.list_branches(), vec!["main", "release-1"]);
    assert_eq!(p.query.list_by_branch("main").len(), 1);
    assert_eq!(p.query.list_by_branch("release-1").len(), 1);
}

#[tokio::test]
async fn test_delete_converges_out_of_all_projections() {
    let p = pipeline().await;

    let doc = p
        .store
        .put(upload("main", "Cart", "Add Item", "cart wording"))
        .await
        .unwrap();
    p.maintainer.wait_for_processed(1).await;

    p.store.delete(&doc.id).await.unwrap();
    p.maintainer.wait_for_processed(2).await;

    assert!(p.store.get(&doc.id).await.unwrap().is_none());
    assert!(p.query.list_branches().is_empty());

    let response = p
        .query
        .search_by_text(&SearchRequest::new("cart"))
        .await
        .unwrap();
    assert!(response.hits.is_empty());
}

#[tokio::test]
async fn test_search_filters_compose_with_text() {
    let p = pipeline().await;

    p.store
        .put(upload("main", "Cart", "Add Item", "shopper adds an item"))
        .await
        .unwrap();
    let mut other = upload("main", "Checkout", "Pay", "shopper pays for the cart");
    other.product = Some("Payments".to_string());
    p.store.put(other).await.unwrap();

    p.maintainer.wait_for_processed(2).await;

    let all = p
        .query
        .search_by_text(&SearchRequest::new("shopper"))
        .await
        .unwrap();
    assert_eq!(all.hits.len(), 2);

    let filtered = p
        .query
        .search_by_text(&SearchRequest::new("shopper").with_product("Payments"))
        .await
        .unwrap();
    assert_eq!(filtered.hits.len(), 1);
    assert_eq!(filtered.hits[0].title, "Pay");

    let by_group = p
        .query
        .search_by_text(&SearchRequest::new("shopper").with_group("Cart"))
        .await
        .unwrap();
    assert_eq!(by_group.hits.len(), 1);
    assert_eq!(by_group.hits[0].title, "Add Item");
}

#[tokio::test]
async fn test_reports_group_by_product_and_version() {
    let p = pipeline().await;

    let submission = |product: &str, version: &str| ReportSubmission {
        version: version.to_string(),
        metadata: HashMap::from([(PRODUCT_METADATA_KEY.to_string(), product.to_string())]),
        payload: serde_json::json!({ "passed": 12, "failed": 0 }),
    };

    p.store.put_report(submission("Checkout", "2.1")).await.unwrap();
    p.store.put_report(submission("Checkout", "2.1")).await.unwrap();
    p.store.put_report(submission("Checkout", "2.2")).await.unwrap();

    p.maintainer.wait_for_processed(3).await;

    let groups = p.query.group_by_product_and_version();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].product, "Checkout");
    assert_eq!(groups[0].version, "2.1");
    assert_eq!(groups[0].count, 2);
    assert_eq!(groups[1].version, "2.2");
    assert_eq!(groups[1].count, 1);
}

#[tokio::test]
async fn test_racing_puts_converge_to_the_store_winner() {
    let p = pipeline().await;
    let mut processed = 0u64;

    // Repeatedly race two puts for the same coordinates. Whichever insert
    // lands second must also be the write every projection settles on.
    for _ in 0..25 {
        let mut one = upload("main", "Cart", "Add Item", "d");
        one.tags = vec!["one".to_string()];
        let mut two = upload("main", "Cart", "Add Item", "d");
        two.tags = vec!["two".to_string()];

        let store_one = p.store.clone();
        let store_two = p.store.clone();
        let first = tokio::spawn(async move { store_one.put(one).await.unwrap() });
        let second = tokio::spawn(async move { store_two.put(two).await.unwrap() });
        let id = first.await.unwrap().id;
        second.await.unwrap();

        processed += 2;
        p.maintainer.wait_for_processed(processed).await;

        let stored = p.store.get(&id).await.unwrap().unwrap();
        let listed = p.query.list_by_branch("main");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].tags, stored.tags);
    }
}

#[tokio::test]
async fn test_rebuild_restores_projections_from_store() {
    let p = pipeline().await;

    p.store
        .put(upload("main", "Cart", "Add Item", "cart wording"))
        .await
        .unwrap();
    p.store
        .put_report(ReportSubmission {
            version: "2.1".to_string(),
            metadata: HashMap::from([(
                PRODUCT_METADATA_KEY.to_string(),
                "Checkout".to_string(),
            )]),
            payload: serde_json::Value::Null,
        })
        .await
        .unwrap();
    p.maintainer.wait_for_processed(2).await;

    // Wipe and replay from canonical state.
    let replayed = p.maintainer.rebuild(&p.store).await.unwrap();
    assert_eq!(replayed, 2);

    assert_eq!(p.query.list_branches(), vec!["main"]);
    assert_eq!(p.query.group_by_product_and_version().len(), 1);

    let response = p
        .query
        .search_by_text(&SearchRequest::new("cart"))
        .await
        .unwrap();
    assert_eq!(response.hits.len(), 1);
}
