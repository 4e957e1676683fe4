use super::*;
use tempfile::TempDir;

fn record(id: &str, values: Vec<f32>) -> VectorRecord {
    VectorRecord {
        id: id.to_string(),
        values,
        metadata: VectorMetadata {
            text: format!("SOURCE LINK: https://x/{id} CONTENT: document {id}"),
            link: format!("https://x/{id}"),
        },
    }
}

async fn create_index(dir: &TempDir, dimension: usize) -> LanceIndex {
    let index = LanceIndex::connect(&dir.path().join("vectors"), "test-index")
        .await
        .expect("should connect");
    assert!(!index.exists().await.expect("should list tables"));
    index.create(dimension).await.expect("should create index");
    assert!(index.exists().await.expect("should list tables"));
    index
}

#[test]
fn record_batch_rejects_wrong_dimension() {
    let records = vec![record("0", vec![1.0, 0.0]), record("1", vec![1.0])];
    assert!(matches!(
        LanceIndex::create_record_batch(&records, 2),
        Err(RagError::Index(_))
    ));
}

#[tokio::test]
async fn upsert_replaces_by_id() {
    let dir = TempDir::new().expect("should create temp dir");
    let index = create_index(&dir, 3).await;

    index
        .upsert(&[record("0", vec![1.0, 0.0, 0.0]), record("1", vec![0.0, 1.0, 0.0])])
        .await
        .expect("should upsert");
    assert_eq!(index.count().await.expect("should count"), 2);

    let mut replacement = record("1", vec![0.0, 0.0, 1.0]);
    replacement.metadata.text = "replaced".to_string();
    index
        .upsert(&[replacement, record("it's", vec![1.0, 1.0, 0.0])])
        .await
        .expect("should upsert again");
    assert_eq!(index.count().await.expect("should count"), 3);

    let matches = index
        .query(&[0.0, 0.0, 1.0], 1)
        .await
        .expect("should query");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, "1");
    assert_eq!(matches[0].metadata.text, "replaced");
}

#[tokio::test]
async fn rejected_upsert_keeps_stored_rows() {
    let dir = TempDir::new().expect("should create temp dir");
    let index = create_index(&dir, 3).await;
    index
        .upsert(&[record("0", vec![1.0, 0.0, 0.0])])
        .await
        .expect("should upsert");

    let result = index.upsert(&[record("0", vec![0.0, 1.0])]).await;
    assert!(matches!(result, Err(RagError::Index(_))));

    let matches = index
        .query(&[1.0, 0.0, 0.0], 1)
        .await
        .expect("should query");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].id, "0");
    assert!(matches[0].score > 0.99);
}

#[tokio::test]
async fn query_returns_nearest_with_metadata() {
    let dir = TempDir::new().expect("should create temp dir");
    let index = create_index(&dir, 2).await;

    index
        .upsert(&[
            record("0", vec![1.0, 0.0]),
            record("1", vec![0.0, 1.0]),
            record("2", vec![0.7, 0.7]),
        ])
        .await
        .expect("should upsert");

    let matches = index.query(&[1.0, 0.1], 2).await.expect("should query");
    let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["0", "2"]);
    assert!(matches[0].score >= matches[1].score);
    assert!(matches[0].score > 0.9);
    assert_eq!(matches[0].metadata.link, "https://x/0");
    assert_eq!(
        matches[0].metadata.text,
        "SOURCE LINK: https://x/0 CONTENT: document 0"
    );
}

#[tokio::test]
async fn existing_index_is_reused() {
    let dir = TempDir::new().expect("should create temp dir");
    {
        let index = create_index(&dir, 2).await;
        index
            .upsert(&[record("0", vec![1.0, 0.0])])
            .await
            .expect("should upsert");
    }

    let reopened = LanceIndex::connect(&dir.path().join("vectors"), "test-index")
        .await
        .expect("should reconnect");
    assert!(reopened.exists().await.expect("should list tables"));
    assert_eq!(reopened.count().await.expect("should count"), 1);
    assert!(
        reopened
            .upsert(&[record("1", vec![1.0, 0.0, 0.0])])
            .await
            .is_err()
    );
}
