//! Shared fixtures for the integration tests: lopdf-built PDFs, a scripted
//! model and a tiny file server on an ephemeral port.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{http::header, routing::get, Router};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};
use pdfdeck::{ModelReply, PdfDeckError, SummaryConfig, SummaryModel};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── PDF fixtures ─────────────────────────────────────────────────────────────

/// Build a PDF with one page per entry in `pages` and an optional Info title.
pub fn build_pdf(pages: &[&str], title: Option<&str>) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(title) = title {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
            "Producer" => Object::string_literal("pdfdeck tests"),
        });
        doc.trailer.set("Info", info_id);
    }

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("save pdf");
    buf
}

/// Two pages of plain prose.
pub fn sample_pdf() -> Vec<u8> {
    build_pdf(
        &[
            "Revenue grew twelve percent in the third quarter.",
            "Operating costs fell while headcount stayed flat.",
        ],
        Some("Quarterly Report"),
    )
}

// ── File server ──────────────────────────────────────────────────────────────

/// Serve `pdf` at `/doc.pdf` and a non-PDF at `/notes.pdf`; everything else
/// is 404. Returns the base URL.
pub async fn serve_files(pdf: Vec<u8>) -> String {
    let pdf = Arc::new(pdf);
    let app = Router::new()
        .route(
            "/doc.pdf",
            get(move || {
                let pdf = Arc::clone(&pdf);
                async move { ([(header::CONTENT_TYPE, "application/pdf")], pdf.to_vec()) }
            }),
        )
        .route("/notes.pdf", get(|| async { "just some text, not a pdf" }));

    spawn_router(app).await
}

/// Run `app` on an ephemeral port and return `http://127.0.0.1:{port}`.
pub async fn spawn_router(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}", addr)
}

// ── Scripted model ───────────────────────────────────────────────────────────

/// Returns canned replies in order, then errors.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, PdfDeckError>>>,
    pub calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, PdfDeckError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        })
    }

    /// A model that always answers with `reply`.
    pub fn replying(reply: &str, times: usize) -> Arc<Self> {
        Self::new((0..times).map(|_| Ok(reply.to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SummaryModel for ScriptedModel {
    async fn generate(&self, _system: &str, _prompt: &str) -> Result<ModelReply, PdfDeckError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(content)) => Ok(ModelReply {
                content,
                ..Default::default()
            }),
            Some(Err(e)) => Err(e),
            None => Err(PdfDeckError::Summarization {
                message: "script exhausted".into(),
            }),
        }
    }
}

/// A well-formed deck reply.
pub const DECK_REPLY: &str = r##"```json
{
  "title": "Q3 Results",
  "slides": [
    "# Growth\n\nRevenue grew **12%**.",
    {"slide_title": "Costs", "content": "Operating costs fell."},
    "# Outlook\n\nHeadcount flat."
  ]
}
```"##;

/// Config with fast retries for tests.
pub fn test_config() -> SummaryConfig {
    SummaryConfig::builder()
        .max_retries(1)
        .retry_backoff_ms(1)
        .download_timeout_secs(5)
        .build()
        .expect("valid config")
}
