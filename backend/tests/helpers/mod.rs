//! Shared fixtures: an in-process fake DeepStack server and multipart bodies.

#![allow(dead_code)]

use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{App, HttpResponse, HttpServer, web};
use futures::{StreamExt, TryStreamExt};
use image::{ImageBuffer, ImageFormat, Rgb};
use std::io::Cursor;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

pub const BOUNDARY: &str = "----fruits-test-boundary";

/// One multipart part as seen by the fake server.
#[derive(Debug, Clone, Default)]
pub struct ReceivedPart {
    pub name: Option<String>,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
}

pub struct FakeDeepstack {
    pub base_url: String,
    pub received: Arc<Mutex<Vec<ReceivedPart>>>,
}

/// Starts a server that answers every custom-model POST with `status` and `body`.
pub fn spawn_deepstack(status: u16, body: &str) -> FakeDeepstack {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let received: Arc<Mutex<Vec<ReceivedPart>>> = Arc::new(Mutex::new(Vec::new()));

    let body = body.to_string();
    let sink = Arc::clone(&received);
    let server = HttpServer::new(move || {
        let body = body.clone();
        let sink = Arc::clone(&sink);
        App::new().route(
            "/v1/vision/custom/{model}",
            web::post().to(move |mut payload: Multipart| {
                let body = body.clone();
                let sink = Arc::clone(&sink);
                async move {
                    while let Ok(Some(mut field)) = payload.try_next().await {
                        let mut part = ReceivedPart::default();
                        if let Some(cd) = field.content_disposition() {
                            part.name = cd.get_name().map(str::to_string);
                            part.filename = cd.get_filename().map(str::to_string);
                        }
                        part.content_type = field.content_type().map(|m| m.to_string());
                        while let Some(Ok(chunk)) = field.next().await {
                            part.size += chunk.len();
                        }
                        sink.lock().unwrap().push(part);
                    }
                    HttpResponse::build(StatusCode::from_u16(status).unwrap())
                        .content_type("application/json")
                        .body(body)
                }
            }),
        )
    })
    .workers(1)
    .disable_signals()
    .listen(listener)
    .unwrap()
    .run();
    actix_web::rt::spawn(server);

    FakeDeepstack {
        base_url: format!("http://127.0.0.1:{}", port),
        received,
    }
}

/// A base URL nothing is listening on.
pub fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

pub fn png_bytes(color: [u8; 3]) -> Vec<u8> {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(16, 16, Rgb(color));
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

/// Builds a `multipart/form-data` body with a single file part.
pub fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

/// Builds a body with a single plain form value (no `filename`).
pub fn multipart_value_body(field: &str, value: &str) -> Vec<u8> {
    format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n--{b}--\r\n",
        b = BOUNDARY,
    )
    .into_bytes()
}
