//! Handlebars page templates, compiled into the binary.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use handlebars::{Handlebars, TemplateError};
use log::error;
use serde::{Deserialize, Serialize};

const TEMPLATES: [(&str, &str); 6] = [
    ("calculator", include_str!("./static/calculator.hbs")),
    ("history", include_str!("./static/history.hbs")),
    ("login", include_str!("./static/login.hbs")),
    ("signup", include_str!("./static/signup.hbs")),
    ("password", include_str!("./static/password.hbs")),
    ("profile", include_str!("./static/profile.hbs")),
];

/// One-line message shown at the top of a page, usually from `?error=` or
/// `?success=` after a redirect.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub success: Option<String>,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            error: Some(message.into()),
            success: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            error: None,
            success: Some(message.into()),
        }
    }
}

/// Builds the registry with every page and the shared `layout_head` and
/// `nav` partials.
pub fn registry() -> Result<Handlebars<'static>, TemplateError> {
    let mut handlebars = Handlebars::new();
    handlebars.register_partial("layout_head", include_str!("./static/layout_head.hbs"))?;
    handlebars.register_partial("nav", include_str!("./static/nav.hbs"))?;

    for (name, source) in TEMPLATES {
        handlebars.register_template_string(name, source)?;
    }

    Ok(handlebars)
}

/// Renders a page, or a bare 500 if the template fails.
pub fn render<T: Serialize>(templates: &Handlebars<'_>, name: &str, data: &T) -> Response {
    match templates.render(name, data) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("failed to render template {}: {}", name, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_templates_register() {
        let handlebars = registry().unwrap();
        for (name, _) in TEMPLATES {
            assert!(handlebars.has_template(name), "missing {}", name);
        }
    }

    #[test]
    fn test_calculator_renders_echoed_input() {
        let handlebars = registry().unwrap();
        let html = handlebars
            .render(
                "calculator",
                &json!({
                    "outcome": {
                        "error": "Invalid input: Please enter valid numbers",
                        "number_one": "abc",
                        "number_two": "<b>",
                        "operation": "add",
                    },
                    "operations": [],
                }),
            )
            .unwrap();

        assert!(html.contains("Invalid input: Please enter valid numbers"));
        assert!(html.contains("value=\"abc\""));
        // Echoed input is escaped
        assert!(html.contains("&lt;b&gt;"));
    }

    #[test]
    fn test_notice_renders() {
        let handlebars = registry().unwrap();
        let html = handlebars
            .render("login", &json!({ "notice": Notice::success("Password reset successful") }))
            .unwrap();
        assert!(html.contains("Password reset successful"));
    }
}
