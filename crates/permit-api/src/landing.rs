//! Informational page for every unmatched path.

use axum::response::Html;

const LANDING_PAGE: &str = r#"<html><body style="text-align: center; margin: 50px;"><h1>Permit server</h1></body></html>"#;

pub async fn landing() -> Html<&'static str> {
    Html(LANDING_PAGE)
}
