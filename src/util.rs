pub(crate) fn guess_filename_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().and_then(safe_file_name)
}

/// Reduces a label to a bare file name so it cannot escape the output directory.
pub(crate) fn safe_file_name(label: &str) -> Option<String> {
    let name = label.trim().rsplit(['/', '\\']).next().unwrap_or("").trim();
    match name {
        "" | "." | ".." => None,
        _ => Some(name.to_string()),
    }
}

/// Drops the query string, which for data URLs often carries the whole subset request.
pub(crate) fn short_url(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_from_url_ignores_query() {
        assert_eq!(
            guess_filename_from_url("https://host/data/MERRA2_100.tavg1.nc4?FORMAT=bmM0Lw&BBOX=24,70,39,90"),
            Some("MERRA2_100.tavg1.nc4".to_string())
        );
        assert_eq!(guess_filename_from_url("https://host/data/"), None);
    }

    #[test]
    fn labels_are_reduced_to_the_last_component() {
        assert_eq!(safe_file_name("file1.nc"), Some("file1.nc".into()));
        assert_eq!(safe_file_name("../../etc/passwd"), Some("passwd".into()));
        assert_eq!(safe_file_name("dir\\file.nc"), Some("file.nc".into()));
        assert_eq!(safe_file_name(".."), None);
        assert_eq!(safe_file_name("   "), None);
    }

    #[test]
    fn short_url_strips_query() {
        assert_eq!(short_url("https://h/a.nc?x=1"), "https://h/a.nc");
        assert_eq!(short_url("https://h/a.nc"), "https://h/a.nc");
    }
}
