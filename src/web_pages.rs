//! Browser-facing routes: rendered pages and file downloads.

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;

use crate::api::download_url;
use crate::catalog;
use crate::image_processing::detect_mime_type;
use crate::state::AppState;
use crate::storage::{LocalFileStorage, get_mime_type_from_extension};
use crate::store::{ImagePage, ImageRecord};

const INDEX_HTML: &str = include_str!("../templates/index.html");
const GALLERY_HTML: &str = include_str!("../templates/gallery.html");

pub const GALLERY_PER_PAGE: i64 = 12;
pub const GENERATED_URL_PREFIX: &str = "/static/generated";

#[derive(Debug, Deserialize)]
pub struct GalleryQuery {
    pub page: Option<String>,
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn format_file_size(bytes: i64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

fn render_index(error: Option<&str>) -> String {
    let options: String = catalog::available_models()
        .iter()
        .map(|model| {
            let selected = if model.id == catalog::DEFAULT_MODEL {
                " selected"
            } else {
                ""
            };
            format!(
                "<option value=\"{}\" title=\"{}\"{selected}>{}</option>\n",
                escape_html(model.id),
                escape_html(model.description),
                escape_html(model.name)
            )
        })
        .collect();
    let error = error
        .map(|message| format!("<div class=\"alert\">{}</div>", escape_html(message)))
        .unwrap_or_default();
    INDEX_HTML
        .replace("{{error}}", &error)
        .replace("{{model_options}}", &options)
}

fn render_card(record: &ImageRecord) -> String {
    let model_label = catalog::find_model(&record.model_name)
        .map(|model| model.name)
        .unwrap_or(record.model_name.as_str());
    let filename = escape_html(&record.filename);
    let prompt = escape_html(&record.prompt);
    format!(
        r#"<article class="card" data-image-id="{id}">
  <img src="{prefix}/{filename}" alt="{prompt}" loading="lazy">
  <div class="card-body">
    <p class="prompt">{prompt}</p>
    <p class="meta">{model} &middot; {created} &middot; {size}</p>
    <a class="button" href="{download}">Download</a>
    <button class="delete-btn" data-image-id="{id}">Delete</button>
  </div>
</article>
"#,
        id = record.id,
        prefix = GENERATED_URL_PREFIX,
        model = escape_html(model_label),
        created = record.created_at.format("%Y-%m-%d %H:%M UTC"),
        size = format_file_size(record.file_size),
        download = escape_html(&download_url(&record.filename)),
    )
}

fn render_pagination(page: &ImagePage) -> String {
    if page.pages <= 1 {
        return String::new();
    }
    let prev = if page.has_prev() {
        format!("<a href=\"/gallery?page={}\">&laquo; Previous</a>", page.page - 1)
    } else {
        String::new()
    };
    let next = if page.has_next() {
        format!("<a href=\"/gallery?page={}\">Next &raquo;</a>", page.page + 1)
    } else {
        String::new()
    };
    format!(
        "<nav class=\"pagination\">{prev}<span>Page {} of {}</span>{next}</nav>",
        page.page, page.pages
    )
}

fn render_gallery(page: &ImagePage) -> String {
    let cards: String = if page.items.is_empty() {
        "<p class=\"empty\">No images yet. <a href=\"/\">Generate one</a>.</p>".to_string()
    } else {
        page.items.iter().map(render_card).collect()
    };
    GALLERY_HTML
        .replace("{{total}}", &page.total.to_string())
        .replace("{{cards}}", &cards)
        .replace("{{pagination}}", &render_pagination(page))
}

/// GET /
pub async fn index() -> Html<String> {
    Html(render_index(None))
}

/// GET /gallery?page=N
pub async fn gallery(State(state): State<AppState>, Query(query): Query<GalleryQuery>) -> Response {
    let page = query
        .page
        .as_deref()
        .and_then(|value| value.trim().parse::<i64>().ok())
        .unwrap_or(1);
    match state.store.list(page, GALLERY_PER_PAGE).await {
        Ok(page) => Html(render_gallery(&page)).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to list images");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render_index(Some("Internal server error"))),
            )
                .into_response()
        }
    }
}

/// GET /download/{filename}
pub async fn download_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    if !LocalFileStorage::is_safe_filename(&filename) {
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    }
    match state.storage.get(&filename).await {
        Ok(Some(bytes)) => {
            let content_type = detect_mime_type(&bytes)
                .unwrap_or_else(|| get_mime_type_from_extension(&filename));
            (
                [
                    (header::CONTENT_TYPE, content_type.to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{filename}\""),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Ok(None) => (StatusCode::NOT_FOUND, "File not found").into_response(),
        Err(err) => {
            tracing::error!(filename = %filename, error = %err, "error downloading file");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error downloading file").into_response()
        }
    }
}

/// Fallback for unknown routes.
pub async fn not_found() -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, Html(render_index(Some("Page not found"))))
}
