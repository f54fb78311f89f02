//! Responses synthesized by the proxy itself.
//!
//! # Responsibilities
//! - Render the HTML status page used for every locally generated failure
//! - Build redirect responses
//!
//! # Design Decisions
//! - Origin responses are never touched; only proxy-generated responses go through here
//! - Unknown status codes still render, with a generic description

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use std::fmt::Write;

pub const PRODUCT_NAME: &str = env!("CARGO_PKG_NAME");
pub const PRODUCT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Optional body content of a status page.
pub enum StatusMessage<'a> {
    None,
    /// Literal text, escaped and wrapped in a paragraph.
    Text(&'a str),
    /// Raw HTML written by the caller.
    Render(Box<dyn FnOnce(&mut String) + 'a>),
}

/// Human readable description of a status code.
pub fn status_description(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unrecognised HTTP status")
}

/// Render the HTML document for `status`.
pub fn render_status_page(status: StatusCode, message: StatusMessage<'_>) -> String {
    let description = status_description(status);
    let mut html = String::with_capacity(512);

    let _ = write!(
        html,
        "<html><head><title>{PRODUCT_NAME}: {description}</title></head><body>"
    );
    html.push_str(
        "<div style=\"background-color:#3399FF; color:#FFFFFF; text-align:right; padding:5px 10px;\">",
    );
    let _ = write!(html, "{PRODUCT_NAME} v{PRODUCT_VERSION}</div>");
    let _ = write!(html, "<h1>{} - {description}</h1>", status.as_u16());

    match message {
        StatusMessage::None => {}
        StatusMessage::Text(text) => {
            let _ = write!(html, "<p>{}</p>", escape_html(text));
        }
        StatusMessage::Render(render) => render(&mut html),
    }

    html.push_str("</body></html>");
    html
}

/// Build a complete status page response.
pub fn status_page(status: StatusCode, message: StatusMessage<'_>) -> Response {
    let body = render_status_page(status, message);
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

/// `302 Found` pointing at `location`.
pub fn redirect(location: &str) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::FOUND;
    match HeaderValue::from_str(location) {
        Ok(value) => {
            response.headers_mut().insert(header::LOCATION, value);
        }
        Err(_) => {
            tracing::error!(location = %location, "Redirect location is not a valid header value");
            return status_page(StatusCode::INTERNAL_SERVER_ERROR, StatusMessage::None);
        }
    }
    response
}

/// Minimal escaping for text placed inside HTML elements and attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
