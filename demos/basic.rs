//! Minimal vico example: greeting, form handling, and an upload endpoint.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl 'http://localhost:3000/hello/Alice?name=Bob'   # capture wins: Alice
//!   curl http://localhost:3000/search?q=sinatra
//!   curl -X POST http://localhost:3000/signup \
//!        -d 'user[name]=Bob&user[email]=b@x.com&colors[]=red&colors[]=blue'
//!   curl -X POST http://localhost:3000/upload -F 'avatar=@photo.png'
//!   curl http://localhost:3000/healthz

use vico::{health, Params, Request, Response, Router, Server, StatusCode};

#[tokio::main]
async fn main() -> Result<(), vico::Error> {
    tracing_subscriber::fmt::init();

    let app = Router::new()
        .get("/hello/:name", hello)?
        .get("/search", search)?
        .post("/signup", signup)?
        .post("/upload", upload)?
        .get("/healthz", health::liveness)?
        .get("/readyz", health::readiness)?;

    Server::bind("0.0.0.0:3000")
        .body_limit(8 * 1024 * 1024)
        .serve(app)
        .await
}

// GET /hello/:name
//
// The route capture beats any same-named query param.
async fn hello(_req: Request, params: Params) -> Response {
    let name = params.text("name").unwrap_or("world");
    Response::text(format!("hello, {name}"))
}

// GET /search?q=…
async fn search(_req: Request, params: Params) -> Response {
    match params.text("q") {
        Some(q) => Response::text(format!("searching for {q}")),
        None => Response::status(StatusCode::UNPROCESSABLE_ENTITY),
    }
}

// POST /signup
//
// Nested and array form fields arrive pre-structured.
async fn signup(_req: Request, params: Params) -> Response {
    let Some(user) = params.map("user") else {
        return Response::status(StatusCode::UNPROCESSABLE_ENTITY);
    };
    let name = user.text("name").unwrap_or("stranger");
    let colors = params.list("colors").map_or(0, <[_]>::len);
    Response::text(format!("welcome, {name} ({colors} colors picked)"))
}

// POST /upload
//
// A multipart file field binds as an UploadedFile, not text.
async fn upload(_req: Request, params: Params) -> Response {
    let Some(file) = params.file("avatar") else {
        return Response::status(StatusCode::UNPROCESSABLE_ENTITY);
    };
    // A real app would persist file.data() somewhere durable here; the
    // bytes are gone once the request completes.
    Response::text(format!(
        "received {} ({}, {} bytes)",
        file.filename(),
        file.content_type(),
        file.data().len()
    ))
}
