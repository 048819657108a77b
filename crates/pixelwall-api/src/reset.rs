use axum::extract::{Form, Path, State};
use axum::response::Html;
use serde::Deserialize;

use crate::AppState;

const RESET_FORM_TEMPLATE: &str = include_str!("../templates/reset_form.html");
const RESET_RESULT_TEMPLATE: &str = include_str!("../templates/reset_result.html");

#[derive(Debug, Deserialize)]
pub struct ResetForm {
    pub new_password: String,
    pub confirm_password: String,
}

/// GET /reset/{token} — the form behind the emailed link. The token is only
/// checked on submit, so a dead link still renders the form and fails there.
pub async fn reset_form(Path(_token): Path<String>) -> Html<&'static str> {
    Html(RESET_FORM_TEMPLATE)
}

/// POST /reset/{token} — complete the reset and render the outcome page.
/// Failed attempts leave the link usable; only success burns it.
pub async fn reset_submit(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Form(form): Form<ResetForm>,
) -> Html<String> {
    let page = match state
        .engine
        .confirm_password_reset(&token, &form.new_password, &form.confirm_password)
        .await
    {
        Ok(username) => render_result(
            "Password updated",
            &format!(
                "You can log in as {} with your new password now.",
                escape_html(&username)
            ),
        ),
        Err(e) => render_result("Reset failed", &e.to_string()),
    };

    Html(page)
}

fn render_result(heading: &str, message: &str) -> String {
    RESET_RESULT_TEMPLATE
        .replace("{{HEADING}}", heading)
        .replace("{{MESSAGE}}", message)
}

/// Display names are free text; anything templated into a page gets the
/// five-character escape.
fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
