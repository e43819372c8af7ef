use std::path::{Component, Path, PathBuf};

use esmpack_format::aio::unix_millis;
use indicatif::{ProgressBar, ProgressStyle};

const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Guess a media type from an entry name's extension.
pub fn guess_media_type(name: &str) -> &'static str {
    let ext = match name.rsplit_once('.') {
        Some((_, ext)) if !ext.contains('/') => ext.to_ascii_lowercase(),
        _ => return DEFAULT_MEDIA_TYPE,
    };

    match ext.as_str() {
        "js" | "mjs" | "cjs" => "text/javascript",
        "css" => "text/css",
        "html" | "htm" => "text/html",
        "json" | "map" => "application/json",
        "wasm" => "application/wasm",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => DEFAULT_MEDIA_TYPE,
    }
}

/// Entry name for a filesystem path: normal components joined with `/`.
///
/// Leading `./` and root components are dropped. Paths containing `..`, or with
/// nothing left after dropping, have no name.
pub fn entry_name(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => return None,
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Where an entry lands under `out_dir`, or `None` if its name would escape it.
pub fn output_path(out_dir: &Path, name: &str) -> Option<PathBuf> {
    if name.starts_with('/') || name.contains('\\') {
        return None;
    }

    let mut path = out_dir.to_path_buf();
    let mut pushed = false;
    for part in name.split('/') {
        match part {
            "" | "." => continue,
            ".." => return None,
            // Drive letters and other prefixes on Windows
            _ if part.contains(':') => return None,
            _ => {
                path.push(part);
                pushed = true;
            }
        }
    }

    pushed.then_some(path)
}

/// Whether any component of `path` below `root` starts with a dot.
pub fn is_hidden(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| match c {
            Component::Normal(part) => part.to_string_lossy().starts_with('.'),
            _ => false,
        })
}

/// Modification time in milliseconds since the Unix epoch, or 0 if unavailable.
pub fn modified_millis(meta: &std::fs::Metadata) -> i64 {
    meta.modified().map(unix_millis).unwrap_or(0)
}

/// Create a progress bar for file operations
pub fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})") {
        pb.set_style(style.progress_chars("=> "));
    }
    pb.set_message(message.to_string());
    pb
}

/// Create a spinner for indeterminate operations
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Format a timestamp given in milliseconds since the Unix epoch
pub fn format_time(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_else(|| "-".into())
}

/// Format file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    use humansize::{FormatSize, BINARY};
    bytes.format_size(BINARY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_types() {
        assert_eq!(guess_media_type("index.js"), "text/javascript");
        assert_eq!(guess_media_type("a/b/STYLE.CSS"), "text/css");
        assert_eq!(guess_media_type("app.wasm"), "application/wasm");
        assert_eq!(guess_media_type("README"), DEFAULT_MEDIA_TYPE);
        assert_eq!(guess_media_type("dir.d/file"), DEFAULT_MEDIA_TYPE);
    }

    #[test]
    fn entry_names() {
        assert_eq!(entry_name(Path::new("./src/a.js")).as_deref(), Some("src/a.js"));
        assert_eq!(entry_name(Path::new("a.js")).as_deref(), Some("a.js"));
        assert_eq!(entry_name(Path::new("../a.js")), None);
        assert_eq!(entry_name(Path::new(".")), None);
    }

    #[test]
    fn output_paths() {
        let out = Path::new("out");
        assert_eq!(output_path(out, "a/b.js"), Some(out.join("a").join("b.js")));
        assert_eq!(output_path(out, "./a.js"), Some(out.join("a.js")));
        assert_eq!(output_path(out, "../a.js"), None);
        assert_eq!(output_path(out, "a/../../b"), None);
        assert_eq!(output_path(out, "/etc/passwd"), None);
        assert_eq!(output_path(out, "C:/x"), None);
        assert_eq!(output_path(out, "a\\b"), None);
        assert_eq!(output_path(out, "./"), None);
    }

    #[test]
    fn hidden() {
        let root = Path::new("dist");
        assert!(is_hidden(root, Path::new("dist/.cache/a.js")));
        assert!(!is_hidden(root, Path::new("dist/a.js")));
        assert!(!is_hidden(Path::new("."), Path::new("./a.js")));
    }

    #[test]
    fn times() {
        assert_eq!(format_time(0), "1970-01-01T00:00:00Z");
        assert_eq!(format_time(1_700_000_000_999), "2023-11-14T22:13:20Z");
    }
}
