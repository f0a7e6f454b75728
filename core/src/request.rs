use serde::{Deserialize, Serialize};

/// What kind of resource a request is for, as declared by the client.
///
/// Mirrors the `Sec-Fetch-Dest` request header values we care about. Only
/// `Document` changes routing behavior (offline navigation falls back to the
/// cached shell); everything else is grouped loosely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
    Document,
    Script,
    Style,
    Image,
    Font,
    Other,
}

impl Destination {
    /// Parse a `Sec-Fetch-Dest` header value.
    pub fn from_header(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "document" => Destination::Document,
            "script" => Destination::Script,
            "style" => Destination::Style,
            "image" => Destination::Image,
            "font" => Destination::Font,
            _ => Destination::Other,
        }
    }

    /// Derive the destination from request headers.
    ///
    /// Prefers `Sec-Fetch-Dest`; older clients don't send it, so fall back to
    /// sniffing `Accept: text/html` as a navigation.
    pub fn from_request(sec_fetch_dest: Option<&str>, accept: Option<&str>) -> Self {
        if let Some(dest) = sec_fetch_dest {
            return Destination::from_header(dest);
        }
        if let Some(accept) = accept {
            if accept.contains("text/html") {
                return Destination::Document;
            }
        }
        Destination::Other
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Destination::Document)
    }
}

/// How a response relates to the app origin.
///
/// `Basic` responses come from the configured upstream origin itself and are
/// the only kind eligible for caching. Responses fetched from any other
/// origin are `Opaque` to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKind {
    Basic,
    Opaque,
}

impl ResponseKind {
    pub fn classify(same_origin: bool) -> Self {
        if same_origin {
            ResponseKind::Basic
        } else {
            ResponseKind::Opaque
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_from_header() {
        assert_eq!(Destination::from_header("document"), Destination::Document);
        assert_eq!(Destination::from_header("Document"), Destination::Document);
        assert_eq!(Destination::from_header("script"), Destination::Script);
        assert_eq!(Destination::from_header("worker"), Destination::Other);
        assert_eq!(Destination::from_header(""), Destination::Other);
    }

    #[test]
    fn test_destination_prefers_sec_fetch_dest() {
        let dest = Destination::from_request(Some("image"), Some("text/html"));
        assert_eq!(dest, Destination::Image);
    }

    #[test]
    fn test_destination_accept_fallback() {
        let dest = Destination::from_request(None, Some("text/html,application/xhtml+xml"));
        assert!(dest.is_document());

        let dest = Destination::from_request(None, Some("image/avif,image/webp"));
        assert_eq!(dest, Destination::Other);

        assert_eq!(Destination::from_request(None, None), Destination::Other);
    }

    #[test]
    fn test_response_kind_classify() {
        assert_eq!(ResponseKind::classify(true), ResponseKind::Basic);
        assert_eq!(ResponseKind::classify(false), ResponseKind::Opaque);
    }
}
