//! Shared fixtures for unit tests.

use std::collections::VecDeque;
use std::io::{Cursor, Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use parking_lot::Mutex;
use url::Url;

use crate::fetcher::{Transport, TransportError, TransportResponse};
use crate::text::{RenderError, RenderedText, TextRenderer, TextStyle};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn ok(status: u32, body: &'static str) -> Result<TransportResponse, TransportError> {
    Ok(TransportResponse {
        status,
        body: Bytes::from_static(body.as_bytes()),
    })
}

pub fn retryable(reason: &str) -> Result<TransportResponse, TransportError> {
    Err(TransportError::Retryable(reason.to_owned()))
}

/// Transport replaying canned replies in order
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    fallback: Option<Result<TransportResponse, TransportError>>,
    attempts: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    /// Replies from `script`, then fatal errors once it runs dry
    pub fn new(script: Vec<Result<TransportResponse, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            attempts: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
        }
    }

    /// Always reply with `reply`
    pub fn repeating(reply: Result<TransportResponse, TransportError>) -> Self {
        Self {
            fallback: Some(reply),
            ..Self::new(Vec::new())
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

impl Transport for ScriptedTransport {
    fn get(&self, url: &Url) -> Result<TransportResponse, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(url.to_string());
        if let Some(reply) = self.script.lock().pop_front() {
            return reply;
        }
        self.fallback
            .clone()
            .unwrap_or_else(|| Err(TransportError::Fatal("script exhausted".into())))
    }
}

/// Renders a solid block of `len * point_size / 2` by `point_size` pixels
#[derive(Default)]
pub struct CountingRenderer {
    calls: AtomicUsize,
}

impl CountingRenderer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRenderer for CountingRenderer {
    fn render(&self, style: &TextStyle, text: &str) -> Result<RenderedText, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.is_empty() {
            return Err(RenderError::EmptyText);
        }
        let height = style.font.point_size();
        let width = text.chars().count() as u32 * height / 2;
        let color = style.color;
        let pixels = [color.r, color.g, color.b, color.a].repeat((width * height) as usize);
        Ok(RenderedText {
            width,
            height,
            pixels: Bytes::from(pixels),
        })
    }
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = ::image::RgbaImage::from_pixel(width, height, ::image::Rgba([200, 30, 30, 255]));
    let mut encoded = Cursor::new(Vec::new());
    image
        .write_to(&mut encoded, ::image::ImageFormat::Png)
        .unwrap();
    encoded.into_inner()
}

/// Raw HTTP/1.1 reply with a body and `Connection: close`
pub fn http_reply(status_line: &str, body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 {status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
    .into_bytes()
}

/// Loopback server answering one connection per entry of `replies`, in order.
///
/// Returns the `http://127.0.0.1:port` base URL and the server thread.
pub fn serve(replies: Vec<Vec<u8>>) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        for reply in replies {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&chunk[..n]),
                }
            }
            let _ = stream.write_all(&reply);
        }
    });
    (base, handle)
}

/// A loopback URL nothing listens on
pub fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/feed.json")
}
