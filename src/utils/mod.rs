//! Utility functions and helpers.

pub mod http;
pub mod log;
pub mod text;

use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Substitute `{query}` and `{location}` in a search path template.
pub fn fill_template(template: &str, query: &str, location: &str) -> String {
    let encode = |s: &str| url::form_urlencoded::byte_serialize(s.as_bytes()).collect::<String>();
    template
        .replace("{query}", &encode(query))
        .replace("{location}", &encode(location))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://example.com/path/").unwrap();
        assert_eq!(
            resolve_url(&base, "page.html"),
            "https://example.com/path/page.html"
        );
        assert_eq!(
            resolve_url(&base, "/root.html"),
            "https://example.com/root.html"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_fill_template() {
        assert_eq!(
            fill_template("/jobs?q={query}&l={location}", "Data Analyst", "Nairobi, Kenya"),
            "/jobs?q=Data+Analyst&l=Nairobi%2C+Kenya"
        );
        assert_eq!(fill_template("/jobs?q={query}", "rust", ""), "/jobs?q=rust");
    }
}
