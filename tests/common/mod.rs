#![allow(dead_code)]

use serde_json::Value;
use zpt::RenderError;

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub const NAMESPACES: &str = r#"xmlns:tal="http://xml.zope.org/namespaces/tal" xmlns:metal="http://xml.zope.org/namespaces/metal""#;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Renders `body` inside a `<div>` declaring the TAL and METAL namespaces.
pub fn render_body(body: &str, model: Value) -> Result<String, RenderError> {
    init_logging();
    zpt::render_str(&format!("<div {}>{}</div>", NAMESPACES, body), &model)
}

/// Like [`render_body`], with the wrapping `<div>` tags removed.
pub fn render_inner(body: &str, model: Value) -> Result<String, RenderError> {
    let out = render_body(body, model)?;
    Ok(out
        .strip_prefix("<div>")
        .and_then(|rest| rest.strip_suffix("</div>"))
        .unwrap_or(if out == "<div/>" { "" } else { &out })
        .to_string())
}
