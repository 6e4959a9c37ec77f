use async_trait::async_trait;
use docsearch::{
    Chunker, DocSearchConfig, Document, DocumentLoader, EmbeddingGateway, Error, HeaderCleaner,
    HeaderTemplate, IndexBuilder, IndexStore, QueryService, Result, VectorIndex,
};
use std::sync::Arc;
use std::time::Duration;

/// Counts letter frequencies, so texts sharing words land close together.
struct LetterGateway;

#[async_trait]
impl EmbeddingGateway for LetterGateway {
    fn dimension(&self) -> usize {
        26
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let mut vector = vec![0.0; 26];
                let letters: Vec<char> = text
                    .chars()
                    .filter(char::is_ascii_alphabetic)
                    .map(|c| c.to_ascii_lowercase())
                    .collect();
                for c in &letters {
                    vector[(*c as u8 - b'a') as usize] += 1.0;
                }
                let total = letters.len().max(1) as f32;
                vector.iter_mut().for_each(|v| *v /= total);
                vector
            })
            .collect())
    }
}

fn corpus() -> Vec<Document> {
    vec![
        Document::new(
            "invoice.pdf",
            vec![
                "Invoice #: 42\nzzzz zzzz zzzz\n".into(),
                "Invoice #: 42\nDate: today\nCustomer: acme\n\n\n\n\nzzzz zzzz zzzz\n".into(),
            ],
        ),
        Document::new("notes.pdf", vec!["aaaa aaaa aaaa aaaa\n".into()]),
    ]
}

fn builder() -> IndexBuilder {
    let cleaner = HeaderCleaner::new(HeaderTemplate {
        name: "invoice".into(),
        header_labels: vec!["Invoice #:".into(), "Customer:".into()],
    });
    IndexBuilder::new(Arc::new(LetterGateway), cleaner, Chunker::new(16, 4).unwrap())
        .with_batching(2, 2)
}

#[tokio::test]
async fn build_save_load_retrieve() {
    let temp = tempfile::tempdir().expect("tempdir");
    let store = IndexStore::new(temp.path().join("index"));
    let timeout = Duration::from_secs(10);

    let builder_service = QueryService::new(Arc::new(LetterGateway), timeout);
    let stats = builder_service
        .rebuild(&builder(), &corpus(), &store, timeout)
        .await
        .expect("rebuild");
    assert_eq!(stats.documents, 2);
    assert_eq!(stats.dimension, 26);

    // A fresh service, as after a restart.
    let service = QueryService::new(Arc::new(LetterGateway), timeout);
    let loaded = service.reload(&store, timeout).await.expect("reload");
    assert_eq!(loaded.chunks().len(), loaded.index().len());
    assert_eq!(loaded.len(), stats.chunks);
    assert_eq!(
        loaded.build_id(),
        builder_service.current().expect("installed").build_id()
    );

    let chunks = service.retrieve("aaaa", 1).await.expect("retrieve");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].filename, "notes.pdf");

    let chunks = service.retrieve("zzzz", 2).await.expect("retrieve");
    assert!(chunks.iter().all(|c| c.filename == "invoice.pdf"));

    let everything = service.retrieve("zzzz", 1000).await.expect("retrieve");
    assert_eq!(everything.len(), stats.chunks);
    let again = service.retrieve("zzzz", 1000).await.expect("retrieve");
    assert_eq!(everything, again);

    assert!(
        everything
            .iter()
            .all(|c| !c.text.contains("Customer") && !c.text.contains("Date:"))
    );
}

#[tokio::test]
async fn query_before_load_is_unavailable() {
    let service = QueryService::new(Arc::new(LetterGateway), Duration::from_secs(1));
    assert!(matches!(
        service.retrieve("anything", 3).await,
        Err(Error::IndexUnavailable)
    ));
}

#[tokio::test]
async fn builder_from_config_reads_header_templates() {
    let temp = tempfile::tempdir().expect("tempdir");
    let templates = temp.path().join("header_templates.json");
    std::fs::write(
        &templates,
        r#"{"templates": [{"name": "invoice", "header_labels": ["Invoice #:"]}]}"#,
    )
    .unwrap();

    let docs_dir = temp.path().join("pdfs");
    std::fs::create_dir(&docs_dir).unwrap();
    std::fs::write(
        docs_dir.join("invoice.txt"),
        "Invoice #: 1\nfirst page body\n\x0cInvoice #: 1\nDate\nCustomer\n\n\nsecond page body\n",
    )
    .unwrap();

    let mut config = DocSearchConfig::default();
    config.ingest.header_templates = templates;
    config.ingest.documents_dir = docs_dir.clone();
    config.ingest.chunk_size = 1000;
    config.ingest.chunk_overlap = 200;

    let documents = DocumentLoader::new(docs_dir).load_documents().unwrap();
    let builder = IndexBuilder::from_config(Arc::new(LetterGateway), &config).unwrap();
    let chunks = builder.chunk_documents(&documents);

    assert_eq!(chunks.len(), 1);
    assert_eq!(
        chunks[0].text,
        "Invoice #: 1\nfirst page body\nsecond page body\n"
    );
}

#[test]
fn invalid_chunk_geometry_fails_builder_config() {
    let mut config = DocSearchConfig::default();
    config.ingest.chunk_overlap = 1000;
    assert!(matches!(
        IndexBuilder::from_config(Arc::new(LetterGateway), &config),
        Err(Error::InvalidConfiguration(_))
    ));
}
