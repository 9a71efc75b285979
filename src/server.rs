//! REST API for nyaya-rag.
//!
//! Serves semantic search over a corpus loaded once at startup. The
//! [`RagContext`] (embedding model, index and documents) is immutable and
//! shared by every worker.
//!
//! ## Endpoints
//!
//! - `POST /rag` - Embed `{"query": "..."}` and return the closest clauses
//!
//! ## Usage
//!
//! ```rust,no_run
//! use nyaya_rag::server::{self, RagContext};
//!
//! #[actix_web::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = RagContext::load(
//!         "all-MiniLM-L6-v2",
//!         "nyaya_embeddings.npy",
//!         "nyaya_docs.bin",
//!         5,
//!     )?;
//!     server::bind(ctx, ("127.0.0.1", 5000))?.await?;
//!     Ok(())
//! }
//! ```

use crate::artifacts::{self, Corpus};
use crate::document::SearchHit;
use crate::embedding::{Embed, SentenceEmbedder};
use crate::error::{Error, Result};
use actix_cors::Cors;
use actix_web::{
    dev::Server,
    error::{InternalError, JsonPayloadError},
    web, App, HttpRequest, HttpResponse, HttpServer, Responder,
};
use serde::{Deserialize, Serialize};
use std::net::ToSocketAddrs;
use std::path::Path;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_TOP_K: usize = 5;

/// Everything a request needs, built once before the server starts.
pub struct RagContext {
    embedder: Box<dyn Embed>,
    corpus: Corpus,
    top_k: usize,
}

impl RagContext {
    /// Pairs an embedder with a loaded corpus.
    ///
    /// # Errors
    ///
    /// [`Error::Startup`] if the embedder's vectors are not the same length
    /// as the corpus vectors, e.g. artifacts generated with another model.
    pub fn new(embedder: Box<dyn Embed>, corpus: Corpus, top_k: usize) -> Result<RagContext> {
        if embedder.dimension() != corpus.dimension() {
            return Err(Error::startup(format!(
                "Embedding model produces {}-dimensional vectors but the artifacts hold {}-dimensional vectors",
                embedder.dimension(),
                corpus.dimension()
            )));
        }

        Ok(RagContext { embedder, corpus, top_k })
    }

    /// Loads the model and the artifact pair from disk.
    pub fn load(
        model: &str,
        vectors_path: impl AsRef<Path>,
        documents_path: impl AsRef<Path>,
        top_k: usize,
    ) -> Result<RagContext> {
        let corpus = artifacts::load(vectors_path.as_ref(), documents_path.as_ref())?;
        tracing::info!(
            "Loaded {} documents ({}d) from {}",
            corpus.len(),
            corpus.dimension(),
            vectors_path.as_ref().display()
        );

        let embedder = SentenceEmbedder::load(model)?;
        RagContext::new(Box::new(embedder), corpus, top_k)
    }

    /// Embeds `query` and returns the closest clauses, closest first.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] if `query` is empty.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        if query.is_empty() {
            return Err(Error::validation("Query required"));
        }

        let vector = self.embedder.embed(query)?;
        self.corpus.search(&vector, self.top_k)
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

// --- Request / response structs ---

#[derive(Deserialize)]
struct RagRequest {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Serialize)]
struct RagResponse {
    results: Vec<SearchHit>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        ErrorResponse { error: error.into() }
    }
}

// --- Handlers ---

async fn rag_handler(ctx: web::Data<RagContext>, body: web::Json<RagRequest>) -> impl Responder {
    let query = body.into_inner().query.unwrap_or_default();

    let outcome = web::block(move || {
        let results = ctx.search(&query);
        (query, results)
    })
    .await;

    match outcome {
        Ok((query, Ok(results))) => {
            tracing::debug!("Query {:?} matched {} clauses", query, results.len());
            HttpResponse::Ok().json(RagResponse { results })
        }
        Ok((_, Err(Error::Validation(msg)))) => HttpResponse::BadRequest().json(ErrorResponse::new(msg)),
        Ok((query, Err(e))) => {
            tracing::error!("Search for {:?} failed: {}", query, e);
            HttpResponse::InternalServerError().json(ErrorResponse::new(e.to_string()))
        }
        Err(e) => {
            tracing::error!("Search task failed: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse::new(e.to_string()))
        }
    }
}

/// Turns malformed JSON bodies into `400 {"error": ...}` instead of a plain-text reply.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = HttpResponse::BadRequest().json(ErrorResponse::new(err.to_string()));
    InternalError::from_response(err, response).into()
}

/// Query bodies are not size-limited.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(usize::MAX)
            .error_handler(json_error_handler),
    )
       .service(web::resource("/rag").route(web::post().to(rag_handler)));
}

/// Binds the server to `addr` without starting it.
///
/// The returned [`Server`] runs when awaited (or spawned); cross-origin
/// requests are accepted from any origin.
pub fn bind(ctx: RagContext, addr: impl ToSocketAddrs) -> std::io::Result<Server> {
    let data = web::Data::new(ctx);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(Cors::permissive())
            .configure(config)
    })
    .bind(addr)?
    .run();

    Ok(server)
}
