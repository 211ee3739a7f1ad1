use axum::http::header;
use axum::response::{IntoResponse, Response};
use handlebars::Handlebars;
use once_cell::sync::Lazy;
use serde::Serialize;

use super::data::{Service, CONTENT_TYPE_HTML};
use crate::runtime::threads::THREADS;
use crate::runtime::ProfileCatalog;

const INDEX: &str = "index";

const INDEX_TEMPLATE: &str = r#"<html>
<head>
<title>{{prefix}}</title>
</head>
<body>
{{prefix}}<br>
<br>
profiles:<br>
<table>
{{#each profiles}}
<tr><td align=right>{{count}}<td><a href="{{name}}?debug=1">{{name}}</a>
{{/each}}
</table>
<br>
<a href="{{full_dump}}?debug=2">full thread dump</a><br>
</body>
</html>
"#;

static TEMPLATES: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry
        .register_template_string(INDEX, INDEX_TEMPLATE)
        .unwrap();
    registry
});

#[derive(Debug, Serialize, PartialEq)]
pub struct IndexEntry {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
struct IndexView<'a> {
    prefix: &'a str,
    profiles: Vec<IndexEntry>,
    full_dump: &'a str,
}

pub fn entries(catalog: &ProfileCatalog) -> Vec<IndexEntry> {
    catalog
        .profiles()
        .iter()
        .map(|p| IndexEntry {
            name: p.name().to_string(),
            count: p.count(),
        })
        .collect()
}

pub fn render(prefix: &str, catalog: &ProfileCatalog) -> String {
    let view = IndexView {
        prefix,
        profiles: entries(catalog),
        full_dump: THREADS,
    };
    TEMPLATES.render(INDEX, &view).unwrap_or_else(|err| {
        tracing::error!(error = %err, "render index");
        String::new()
    })
}

pub async fn handler(srv: &Service) -> Response {
    let page = render(&srv.prefix, &srv.runtime.catalog);
    ([(header::CONTENT_TYPE, CONTENT_TYPE_HTML)], page).into_response()
}
