//! HTTP server for interactive mode
//!
//! `brakescope serve ./logs` → ingests once, starts server, opens browser
//!
//! One session, one thread: requests are handled to completion in arrival
//! order, so the selection is never mutated concurrently.

use serde::{Deserialize, Serialize};
use tiny_http::{Header, Method, Request, Response, Server};
use tracing::{debug, warn};

use crate::error::{AnalyticsError, Result};
use crate::report::html;
use crate::session::{AnalyticsSession, Event};

// Embed the UI directly in the binary
const UI_HTML: &str = include_str!("ui.html");

#[derive(Serialize)]
struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }
}

impl ApiResponse<()> {
    fn failure(message: impl Into<String>) -> Self {
        Self { ok: false, data: None, error: Some(message.into()) }
    }
}

#[derive(Deserialize, Debug, Default)]
struct DetailsParams {
    description: Option<String>,
}

/// A routed response, independent of the transport.
#[derive(Debug)]
struct Reply {
    status: u16,
    content_type: &'static str,
    body: String,
}

impl Reply {
    fn json<T: Serialize>(status: u16, payload: &T) -> Self {
        match serde_json::to_string(payload) {
            Ok(body) => Self { status, content_type: "application/json", body },
            Err(e) => Self {
                status: 500,
                content_type: "text/plain",
                body: format!("failed to serialize response: {}", e),
            },
        }
    }
}

/// Start server, open browser, serve UI
pub fn start(port: u16, mut session: AnalyticsSession, source: &str, open_browser: bool) -> Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr)
        .map_err(|e| AnalyticsError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string())))?;

    let url = format!("http://localhost:{}", port);

    eprintln!("\n\x1b[1;32mBrakescope\x1b[0m");
    eprintln!("   {}", url);
    eprintln!("   Source: {}\n", source);

    if open_browser {
        if let Err(e) = open::that(&url) {
            warn!("could not open browser: {}", e);
        }
    }

    let page = ui_page(source);

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &mut session, &page) {
            warn!("request failed: {}", e);
        }
    }

    Ok(())
}

fn ui_page(source: &str) -> String {
    UI_HTML
        .replace("{{STYLE}}", html::STYLE)
        .replace("{{CHART_SCRIPT}}", html::CHART_SCRIPT)
        .replace("{{SOURCE}}", &html::html_escape(source))
}

fn handle_request(mut request: Request, session: &mut AnalyticsSession, page: &str) -> std::io::Result<()> {
    let url = request.url().to_string();
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path.to_string(), Some(query.to_string())),
        None => (url.clone(), None),
    };
    let method = request.method().clone();

    let mut body = String::new();
    if method == Method::Post {
        request.as_reader().read_to_string(&mut body)?;
    }

    debug!(%method, %path, "request");
    let reply = route(&method, &path, query.as_deref(), &body, session, page);

    let mut response = Response::from_string(reply.body).with_status_code(reply.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        response = response.with_header(header);
    }
    request.respond(response)
}

fn route(
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: &str,
    session: &mut AnalyticsSession,
    page: &str,
) -> Reply {
    match (method, path) {
        // Serve embedded UI
        (&Method::Get, "/") => Reply { status: 200, content_type: "text/html", body: page.to_string() },

        // API: current bundle
        (&Method::Get, "/api/state") => Reply::json(200, &ApiResponse::success(session.render())),

        // API: apply one user action
        (&Method::Post, "/api/event") => match serde_json::from_str::<Event>(body) {
            Ok(event) => Reply::json(200, &ApiResponse::success(session.handle(event))),
            Err(e) => Reply::json(400, &ApiResponse::failure(format!("invalid event: {}", e))),
        },

        // API: detail rows for one selected error
        (&Method::Get, "/api/details") => {
            let params: DetailsParams = query
                .and_then(|q| serde_urlencoded::from_str(q).ok())
                .unwrap_or_default();
            match session.details(params.description.as_deref()) {
                Some(view) => Reply::json(200, &ApiResponse::success(view)),
                None => Reply::json(404, &ApiResponse::failure("no selected error to inspect")),
            }
        }

        // 404
        _ => Reply { status: 404, content_type: "text/plain", body: "Not found".to_string() },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ErrorFrequencyRecord, SourceTables};
    use serde_json::Value;

    fn session() -> AnalyticsSession {
        let mut session = AnalyticsSession::new();
        session
            .load(SourceTables::from_frequencies(vec![
                ErrorFrequencyRecord::new("BrakeFail", 10),
                ErrorFrequencyRecord::new("SensorErr", 5),
            ]))
            .unwrap();
        session
    }

    fn call(session: &mut AnalyticsSession, method: Method, path: &str, query: Option<&str>, body: &str) -> (u16, Value) {
        let reply = route(&method, path, query, body, session, "");
        let json = serde_json::from_str(&reply.body).unwrap_or(Value::Null);
        (reply.status, json)
    }

    // ==========================================================================
    // ROUTING TESTS
    // ==========================================================================

    #[test]
    fn test_ui_page_is_filled_in() {
        let page = ui_page("/data/<logs>");
        assert!(page.contains("function drawChart("));
        assert!(page.contains("/data/&lt;logs&gt;"));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn test_state_endpoint() {
        let mut s = session();
        let (status, json) = call(&mut s, Method::Get, "/api/state", None, "");

        assert_eq!(status, 200);
        assert_eq!(json["ok"], true);
        assert_eq!(json["data"]["state"], "loaded_no_selection");
        assert_eq!(json["data"]["no_data_reason"], "empty_selection");
    }

    #[test]
    fn test_event_endpoint_applies_event() {
        let mut s = session();
        let (status, json) = call(
            &mut s,
            Method::Post,
            "/api/event",
            None,
            r#"{"type": "select_error", "description": "SensorErr"}"#,
        );

        assert_eq!(status, 200);
        assert_eq!(json["data"]["metrics"]["total_count"], 5);
        assert_eq!(json["data"]["chart"]["bars"][0]["annotation"], "100.0%");
        assert_eq!(s.selection().selected_errors.len(), 1);
    }

    #[test]
    fn test_bad_event_is_rejected() {
        let mut s = session();
        let (status, json) = call(&mut s, Method::Post, "/api/event", None, r#"{"type": "explode"}"#);

        assert_eq!(status, 400);
        assert_eq!(json["ok"], false);
        assert!(json["error"].as_str().unwrap().starts_with("invalid event"));
    }

    #[test]
    fn test_details_endpoint() {
        let mut s = session();
        let (status, _) = call(&mut s, Method::Get, "/api/details", None, "");
        assert_eq!(status, 404, "nothing selected yet");

        s.handle(Event::SelectAllMatching);
        let (status, json) = call(&mut s, Method::Get, "/api/details", Some("description=SensorErr"), "");
        assert_eq!(status, 200);
        assert_eq!(json["data"]["description"], "SensorErr");
        assert_eq!(json["data"]["status"], "no_details");
    }

    #[test]
    fn test_unknown_path() {
        let mut s = session();
        let reply = route(&Method::Get, "/nope", None, "", &mut s, "");
        assert_eq!(reply.status, 404);
    }
}
