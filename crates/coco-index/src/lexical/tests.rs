use super::*;
use std::fs;
use tempfile::TempDir;

fn sample_repo() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(
        root.join("src/parser.py"),
        "def parse_args(argv):\n    \"\"\"Parse command line arguments.\"\"\"\n    return argv[1:]\n",
    )
    .unwrap();
    fs::write(
        root.join("src/render.py"),
        "def render_html(page):\n    return '<html>' + page + '</html>'\n",
    )
    .unwrap();
    fs::write(root.join("README.md"), "# Demo\nA tiny project.\n").unwrap();
    dir
}

#[tokio::test]
async fn test_query_before_build_is_unavailable() {
    let dir = sample_repo();
    let index = LexicalIndex::open(IndexConfig::new(dir.path())).await.unwrap();

    assert!(!index.is_built().await);
    assert!(matches!(
        index.query("parse", 5).await,
        Err(Error::Unavailable(_))
    ));
    assert!(matches!(index.stats().await, Err(Error::Unavailable(_))));
    assert!(matches!(
        index.update(&[PathBuf::from("src/parser.py")]).await,
        Err(Error::Unavailable(_))
    ));
}

#[tokio::test]
async fn test_rebuild_and_query_ranks_relevant_file_first() {
    let dir = sample_repo();
    let index = LexicalIndex::open(IndexConfig::new(dir.path())).await.unwrap();

    let report = index.rebuild().await.unwrap();
    assert_eq!(report.files_processed, 3);
    assert_eq!(report.chunks_created, 3);

    let hits = index.query("where are arguments parsed", 5).await.unwrap();
    assert!(!hits.is_empty());
    assert_eq!(hits[0].chunk.path, "src/parser.py");
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }

    let stats = index.stats().await.unwrap();
    assert_eq!(stats.files, 3);
    assert_eq!(stats.chunks, 3);
    assert_eq!(stats.backend, "lexical");
}

#[tokio::test]
async fn test_query_is_deterministic_and_bounded() {
    let dir = sample_repo();
    let index = LexicalIndex::open(IndexConfig::new(dir.path())).await.unwrap();
    index.rebuild().await.unwrap();

    let first = index.query("def return", 1).await.unwrap();
    let second = index.query("def return", 1).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first, second);

    assert!(index.query("zzzunmatched", 5).await.unwrap().is_empty());
    assert!(index.query("the", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_index_persists_across_open() {
    let dir = sample_repo();
    {
        let index = LexicalIndex::open(IndexConfig::new(dir.path())).await.unwrap();
        index.rebuild().await.unwrap();
    }
    assert!(dir.path().join(".coco_index").join(INDEX_FILE).exists());

    let reopened = LexicalIndex::open(IndexConfig::new(dir.path())).await.unwrap();
    assert!(reopened.is_built().await);
    let hits = reopened.query("render html", 3).await.unwrap();
    assert_eq!(hits[0].chunk.path, "src/render.py");
}

#[tokio::test]
async fn test_corrupt_index_is_treated_as_missing() {
    let dir = sample_repo();
    let persist = dir.path().join(".coco_index");
    fs::create_dir_all(&persist).unwrap();
    fs::write(persist.join(INDEX_FILE), "{not json").unwrap();

    let index = LexicalIndex::open(IndexConfig::new(dir.path())).await.unwrap();
    assert!(!index.is_built().await);
}

#[tokio::test]
async fn test_update_reindexes_changed_and_removes_deleted_files() {
    let dir = sample_repo();
    let index = LexicalIndex::open(IndexConfig::new(dir.path())).await.unwrap();
    index.rebuild().await.unwrap();

    fs::write(
        dir.path().join("src/parser.py"),
        "def tokenize_stream(source):\n    return source.split()\n",
    )
    .unwrap();
    fs::remove_file(dir.path().join("src/render.py")).unwrap();

    let report = index
        .update(&[
            PathBuf::from("src/parser.py"),
            dir.path().join("src/render.py"),
        ])
        .await
        .unwrap();
    assert_eq!(report.files_processed, 1);

    let hits = index.query("tokenize stream", 5).await.unwrap();
    assert_eq!(hits[0].chunk.path, "src/parser.py");
    assert!(index.query("render_html", 5).await.unwrap().is_empty());
    assert_eq!(index.stats().await.unwrap().files, 2);
}

#[tokio::test]
async fn test_update_outside_root_is_rejected() {
    let dir = sample_repo();
    let index = LexicalIndex::open(IndexConfig::new(dir.path())).await.unwrap();
    index.rebuild().await.unwrap();

    let result = index.update(&[PathBuf::from("/definitely/elsewhere.py")]).await;
    assert!(matches!(result, Err(Error::OutsideRoot(_))));
}
