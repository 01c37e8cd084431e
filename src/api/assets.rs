use axum::{
    Json,
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::path::Path;

const ALLOWED_EXTENSIONS: &[&str] = &[
    "html", "htm", "css", "js", "json", "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "woff",
    "woff2", "ttf", "eot", "txt", "md",
];

const BLOCKED_DIRS: &[&str] = &["data", "node_modules"];

const BLOCKED_EXTENSIONS: &[&str] = &["db", "sqlite", "sqlite3", "log"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetDenial {
    Traversal,
    Forbidden,
    FileType,
}

impl AssetDenial {
    const fn message(self) -> &'static str {
        match self {
            Self::Traversal => "路径穿越攻击被阻止",
            Self::Forbidden => "访问被拒绝",
            Self::FileType => "不允许的文件类型",
        }
    }
}

/// Decides whether a front-end path may be served from the static directory.
pub fn check_asset_path(path: &str) -> Result<(), AssetDenial> {
    let lowered = path.to_ascii_lowercase();
    if lowered.contains("%2e%2e") || lowered.contains("%2f") || lowered.contains("%5c") {
        return Err(AssetDenial::Traversal);
    }

    let relative = path.trim_start_matches('/');
    if relative.contains('\\') || relative.split('/').any(|seg| seg == "..") {
        return Err(AssetDenial::Traversal);
    }

    if let Some(first) = relative.split('/').next()
        && BLOCKED_DIRS.contains(&first)
    {
        return Err(AssetDenial::Forbidden);
    }

    let file_name = relative.rsplit('/').next().unwrap_or_default();
    if file_name.to_ascii_lowercase().starts_with(".env") {
        return Err(AssetDenial::Forbidden);
    }

    let Some(ext) = Path::new(file_name).extension().and_then(|e| e.to_str()) else {
        return Ok(());
    };
    let ext = ext.to_ascii_lowercase();

    if BLOCKED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AssetDenial::Forbidden);
    }

    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AssetDenial::FileType);
    }

    Ok(())
}

/// Rejects requests for anything outside the public front-end before they
/// reach the file server.
pub async fn asset_guard(req: Request, next: Next) -> Response {
    let path = req.uri().path();

    if !path.starts_with("/api/")
        && let Err(denial) = check_asset_path(path)
    {
        tracing::warn!(path = %path, reason = ?denial, "Blocked static file request");
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": denial.message() })),
        )
            .into_response();
    }

    next.run(req).await
}
