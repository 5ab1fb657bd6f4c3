//! Embedded web client
//!
//! A small single-page dashboard served under `/app`. Unknown paths get
//! `index.html` so client-side routes survive a reload.

use axum::extract::Path;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use rust_embed::RustEmbed;

/// Client files embedded from the assets/app directory
#[derive(RustEmbed)]
#[folder = "assets/app"]
struct AppAssets;

const INDEX: &str = "index.html";

pub async fn index() -> Response {
    serve(INDEX)
}

pub async fn asset(Path(path): Path<String>) -> Response {
    serve(&path)
}

fn serve(path: &str) -> Response {
    let path = path.trim_start_matches('/');
    let (name, file) = match AppAssets::get(path) {
        Some(file) => (path, file),
        None => match AppAssets::get(INDEX) {
            Some(file) => (INDEX, file),
            None => return (StatusCode::NOT_FOUND, "Not found").into_response(),
        },
    };

    ([(header::CONTENT_TYPE, content_type(name))], file.data).into_response()
}

fn content_type(path: &str) -> &'static str {
    match path.rsplit_once('.').map(|(_, ext)| ext) {
        Some("html") => "text/html; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("json") => "application/json",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_type_of(response: &Response) -> &str {
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
    }

    #[tokio::test]
    async fn test_index() {
        let response = index().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type_of(&response), "text/html; charset=utf-8");
    }

    #[tokio::test]
    async fn test_script_and_stylesheet() {
        let js = asset(Path("app.js".to_string())).await;
        assert_eq!(content_type_of(&js), "text/javascript; charset=utf-8");

        let css = asset(Path("app.css".to_string())).await;
        assert_eq!(content_type_of(&css), "text/css; charset=utf-8");
    }

    #[tokio::test]
    async fn test_unknown_path_falls_back_to_index() {
        let response = asset(Path("dashboard/senders".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type_of(&response), "text/html; charset=utf-8");
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("logo.svg"), "image/svg+xml");
        assert_eq!(content_type("README"), "application/octet-stream");
    }
}
