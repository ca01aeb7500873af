//! Synthesized responses for when neither network nor store can answer.

use swcache_core::{Destination, Response};

/// A 503 whose content type fits the destination, so stylesheets and
/// scripts degrade to empty resources rather than parse errors.
pub fn offline_response(destination: Destination) -> Response {
    let (content_type, body) = match destination {
        Destination::Style => ("text/css", "/* offline */"),
        Destination::Script => ("application/javascript", "// offline"),
        _ => ("text/plain; charset=utf-8", "Offline"),
    };

    Response::new(503, body).with_status_text("Service Unavailable").with_header("Content-Type", content_type)
}
