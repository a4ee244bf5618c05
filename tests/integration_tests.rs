use httpmock::prelude::*;
use nest_etl::core::Pipeline;
use nest_etl::{CliConfig, EtlEngine, JoinPipeline, LocalStorage};
use tempfile::TempDir;

const BOOKS: &str = r#"[{"id": 101, "title": "A"}, {"id": 102, "title": "B"}]"#;
const REVIEWS: &str = r#"[
    {"parentId": 101, "author": "John", "content": "Great book!"},
    {"parentId": 101, "author": "Alice", "content": "Worth reading."},
    {"parentId": 999, "author": "Bob", "content": "Invalid reference"}
]"#;

fn cli_config(parents: &str, children: &str, output_path: &str, formats: &[&str]) -> CliConfig {
    let formats = formats.join(",");
    let args = vec![
        "nest-etl",
        "--parents",
        parents,
        "--children",
        children,
        "--output-path",
        output_path,
        "--formats",
        formats.as_str(),
    ];
    <CliConfig as clap::Parser>::parse_from(args).finalize()
}

#[tokio::test]
async fn test_end_to_end_local_json() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();
    std::fs::write(base.join("books.json"), BOOKS).unwrap();
    std::fs::write(base.join("reviews.json"), REVIEWS).unwrap();

    let output_path = base.join("out").to_str().unwrap().to_string();
    let config = cli_config(
        base.join("books.json").to_str().unwrap(),
        base.join("reviews.json").to_str().unwrap(),
        &output_path,
        &["html", "json"],
    );

    let engine = EtlEngine::new(JoinPipeline::new(LocalStorage::default(), config));
    let result = engine.run().await;

    assert!(result.is_ok());
    let html_path = result.unwrap();
    assert!(html_path.ends_with("nested.html"));

    let html = std::fs::read_to_string(&html_path).unwrap();
    assert!(html.contains(
        "<ol><li><span>A</span><ul><li>Great book! by John</li><li>Worth reading. by Alice</li></ul></li><li><span>B</span></li></ol>"
    ));
    assert!(!html.contains("Bob"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(base.join("out/nested.json")).unwrap())
            .unwrap();
    assert_eq!(json["entities"].as_array().unwrap().len(), 2);
    assert_eq!(json["stats"]["orphans"], 1);
    assert!(json["generated_at"].is_string());
}

#[tokio::test]
async fn test_end_to_end_csv_with_foreign_key() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();
    std::fs::write(base.join("books.csv"), "id,title\n1,Dune\n2,Emma\n").unwrap();
    std::fs::write(
        base.join("reviews.csv"),
        "book_id,author,content\n1,Ann,\"Sand, spice\"\n3,Zed,Nobody home\n",
    )
    .unwrap();

    let output_path = base.join("out").to_str().unwrap().to_string();
    let args = vec![
        "nest-etl".to_string(),
        "--parents".to_string(),
        base.join("books.csv").to_str().unwrap().to_string(),
        "--children".to_string(),
        base.join("reviews.csv").to_str().unwrap().to_string(),
        "--output-path".to_string(),
        output_path.clone(),
        "--formats".to_string(),
        "tree".to_string(),
        "--foreign-key".to_string(),
        "book_id".to_string(),
    ];
    let config = <CliConfig as clap::Parser>::parse_from(args).finalize();

    let engine = EtlEngine::new(JoinPipeline::new(LocalStorage::default(), config));
    let tree_path = engine.run().await.unwrap();

    let tree = std::fs::read_to_string(tree_path).unwrap();
    assert!(tree.contains("Sand, spice by Ann"));
    assert!(tree.contains("span \"Emma\""));
    assert!(!tree.contains("Nobody home"));
}

#[tokio::test]
async fn test_end_to_end_remote_sources_bundled() {
    let temp_dir = TempDir::new().unwrap();
    let output_path = temp_dir.path().to_str().unwrap().to_string();

    let server = MockServer::start();
    let books_mock = server.mock(|when, then| {
        when.method(GET).path("/books");
        then.status(200)
            .header("Content-Type", "application/json")
            .body(BOOKS);
    });
    let reviews_mock = server.mock(|when, then| {
        when.method(GET).path("/reviews");
        then.status(200)
            .header("Content-Type", "application/json")
            .body(REVIEWS);
    });

    let args = vec![
        "nest-etl".to_string(),
        "--parents".to_string(),
        server.url("/books"),
        "--children".to_string(),
        server.url("/reviews"),
        "--output-path".to_string(),
        output_path.clone(),
        "--formats".to_string(),
        "html,json,tree".to_string(),
        "--bundle".to_string(),
    ];
    let config = <CliConfig as clap::Parser>::parse_from(args).finalize();

    let engine = EtlEngine::new(JoinPipeline::new(LocalStorage::default(), config));
    let bundle_path = engine.run().await.unwrap();

    books_mock.assert();
    reviews_mock.assert();
    assert!(bundle_path.ends_with("nested.zip"));

    let zip_data = std::fs::read(&bundle_path).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_data)).unwrap();
    assert_eq!(archive.len(), 3);

    let mut html = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("nested.html").unwrap(), &mut html)
        .unwrap();
    assert!(html.contains("Worth reading. by Alice"));
}

#[tokio::test]
async fn test_end_to_end_no_parents_renders_empty_page() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();
    std::fs::write(base.join("books.json"), "[]").unwrap();
    std::fs::write(base.join("reviews.json"), REVIEWS).unwrap();

    let config = cli_config(
        base.join("books.json").to_str().unwrap(),
        base.join("reviews.json").to_str().unwrap(),
        base.to_str().unwrap(),
        &["html"],
    );

    let pipeline = JoinPipeline::new(LocalStorage::default(), config);
    let dataset = pipeline.extract().await.unwrap();
    let result = pipeline.transform(dataset).await.unwrap();

    assert!(result.entities.is_empty());
    assert_eq!(result.stats.orphans, 3);
    assert_eq!(result.html_output, "");

    let html_path = pipeline.load(result).await.unwrap();
    let html = std::fs::read_to_string(html_path).unwrap();
    assert!(html.contains("<div id=\"root\"></div>"));
    assert!(!html.contains("<ol>"));
}

#[tokio::test]
async fn test_end_to_end_missing_source_fails() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path();

    let config = cli_config(
        base.join("absent.json").to_str().unwrap(),
        base.join("reviews.json").to_str().unwrap(),
        base.to_str().unwrap(),
        &["html"],
    );

    let engine = EtlEngine::new(JoinPipeline::new(LocalStorage::default(), config));
    let err = engine.run().await.unwrap_err();

    assert_eq!(err.exit_code(), 3);
    assert!(!base.join("nested.html").exists());
}
