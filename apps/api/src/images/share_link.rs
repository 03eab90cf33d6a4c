//! Share-link resolution for remote image URLs.
//!
//! Inspectors paste whatever their storage provider's "share" button gives
//! them. Google Drive share links point at an HTML viewer page, not the
//! image bytes, so they are rewritten to the direct-download query form
//! before fetching. Anything unrecognized passes through unchanged.

/// Rewrites a Google Drive share link to its direct-download form.
///
/// Handled forms:
/// - `https://drive.google.com/file/d/<id>/view?...` (path-style share)
/// - `https://drive.google.com/open?id=<id>`
///
/// Both become `https://drive.google.com/uc?export=download&id=<id>`.
pub fn resolve_share_link(url: &str) -> String {
    if !url.contains("drive.google.com") {
        return url.to_string();
    }

    if let Some(id) = extract_path_file_id(url).or_else(|| extract_query_id(url)) {
        return format!("https://drive.google.com/uc?export=download&id={id}");
    }

    url.to_string()
}

/// Extracts `<id>` from a `/file/d/<id>/...` path segment.
fn extract_path_file_id(url: &str) -> Option<&str> {
    let rest = url.split("/file/d/").nth(1)?;
    let id = rest.split(['/', '?', '#']).next()?;
    (!id.is_empty()).then_some(id)
}

/// Extracts `<id>` from an `id=<id>` query parameter.
fn extract_query_id(url: &str) -> Option<&str> {
    let query = url.split(['?', '#']).nth(1)?;
    let id = query
        .split('&')
        .find_map(|pair| pair.strip_prefix("id="))?;
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_style_share_link_is_rewritten() {
        let url = "https://drive.google.com/file/d/1AbC-xyz_9/view?usp=sharing";
        assert_eq!(
            resolve_share_link(url),
            "https://drive.google.com/uc?export=download&id=1AbC-xyz_9"
        );
    }

    #[test]
    fn test_path_style_without_trailing_segment() {
        let url = "https://drive.google.com/file/d/1AbC";
        assert_eq!(
            resolve_share_link(url),
            "https://drive.google.com/uc?export=download&id=1AbC"
        );
    }

    #[test]
    fn test_open_query_form_is_rewritten() {
        let url = "https://drive.google.com/open?id=1AbC&authuser=0";
        assert_eq!(
            resolve_share_link(url),
            "https://drive.google.com/uc?export=download&id=1AbC"
        );
    }

    #[test]
    fn test_non_drive_url_passes_through() {
        let url = "https://example.com/photos/site.jpg";
        assert_eq!(resolve_share_link(url), url);
    }

    #[test]
    fn test_direct_download_form_is_stable() {
        let url = "https://drive.google.com/uc?export=download&id=1AbC";
        assert_eq!(resolve_share_link(url), url);
    }

    #[test]
    fn test_malformed_drive_url_passes_through() {
        let url = "https://drive.google.com/file/d/";
        assert_eq!(resolve_share_link(url), url);
    }
}
