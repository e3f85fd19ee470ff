use core::fmt;

/// Folds a header field name into the form used to look it up: surrounding
/// whitespace trimmed, ASCII uppercased, punctuation removed.
///
/// `Content-Length`, `content_length` and `CONTENTLENGTH` all fold to
/// `CONTENTLENGTH`.
pub fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

macro_rules! header_fields {
    ($($variant:ident => $name:literal, $key:literal;)+) => {
        /// Request header fields this server recognizes. Any other field is
        /// parsed and dropped.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum HeaderField {
            $($variant,)+
        }

        impl HeaderField {
            pub const ALL: &'static [HeaderField] = &[$(HeaderField::$variant,)+];

            /// Canonical wire spelling.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(HeaderField::$variant => $name,)+
                }
            }

            fn from_normalized(key: &str) -> Option<Self> {
                match key {
                    $($key => Some(HeaderField::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

header_fields! {
    AIm => "A-IM", "AIM";
    Accept => "Accept", "ACCEPT";
    AcceptCharset => "Accept-Charset", "ACCEPTCHARSET";
    AcceptDatetime => "Accept-Datetime", "ACCEPTDATETIME";
    AcceptEncoding => "Accept-Encoding", "ACCEPTENCODING";
    AcceptLanguage => "Accept-Language", "ACCEPTLANGUAGE";
    AccessControlRequestMethod => "Access-Control-Request-Method", "ACCESSCONTROLREQUESTMETHOD";
    Authorization => "Authorization", "AUTHORIZATION";
    CacheControl => "Cache-Control", "CACHECONTROL";
    Connection => "Connection", "CONNECTION";
    ContentEncoding => "Content-Encoding", "CONTENTENCODING";
    ContentLength => "Content-Length", "CONTENTLENGTH";
    ContentMd5 => "Content-MD5", "CONTENTMD5";
    ContentType => "Content-Type", "CONTENTTYPE";
    Cookie => "Cookie", "COOKIE";
    Date => "Date", "DATE";
    Expect => "Expect", "EXPECT";
    Forwarded => "Forwarded", "FORWARDED";
    From => "From", "FROM";
    Host => "Host", "HOST";
    Http2Settings => "HTTP2-Settings", "HTTP2SETTINGS";
    IfMatch => "If-Match", "IFMATCH";
    IfModifiedSince => "If-Modified-Since", "IFMODIFIEDSINCE";
    IfNoneMatch => "If-None-Match", "IFNONEMATCH";
    IfRange => "If-Range", "IFRANGE";
    IfUnmodifiedSince => "If-Unmodified-Since", "IFUNMODIFIEDSINCE";
    MaxForwards => "Max-Forwards", "MAXFORWARDS";
    Origin => "Origin", "ORIGIN";
    Pragma => "Pragma", "PRAGMA";
    Prefer => "Prefer", "PREFER";
    ProxyAuthorization => "Proxy-Authorization", "PROXYAUTHORIZATION";
    Range => "Range", "RANGE";
    Referer => "Referer", "REFERER";
    Te => "TE", "TE";
    Trailer => "Trailer", "TRAILER";
    TransferEncoding => "Transfer-Encoding", "TRANSFERENCODING";
    UserAgent => "User-Agent", "USERAGENT";
    Upgrade => "Upgrade", "UPGRADE";
    Via => "Via", "VIA";
    Warning => "Warning", "WARNING";
}

impl HeaderField {
    /// Looks up a raw field name as it appeared on the wire.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_normalized(&normalize(name))
    }

    /// Name of the CGI meta-variable carrying this header, e.g.
    /// `HTTP_USER_AGENT`.
    pub fn cgi_variable(&self) -> String {
        let mut var = String::from("HTTP_");
        var.extend(self.as_str().chars().map(|c| match c {
            '-' => '_',
            c => c.to_ascii_uppercase(),
        }));
        var
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" Content-Length "), "CONTENTLENGTH");
        assert_eq!(normalize("if_modified_since"), "IFMODIFIEDSINCE");
        assert_eq!(normalize("X-Foo.Bar"), "XFOOBAR");
    }

    #[test]
    fn test_from_name() {
        assert_eq!(
            HeaderField::from_name("content-length"),
            Some(HeaderField::ContentLength)
        );
        assert_eq!(
            HeaderField::from_name("IF-MODIFIED-SINCE"),
            Some(HeaderField::IfModifiedSince)
        );
        assert_eq!(HeaderField::from_name("X-Request-Id"), None);
        assert_eq!(HeaderField::from_name(""), None);
    }

    #[test]
    fn test_every_field_round_trips_its_own_name() {
        for field in HeaderField::ALL {
            assert_eq!(HeaderField::from_name(field.as_str()), Some(*field));
        }
    }

    #[test]
    fn test_cgi_variable() {
        assert_eq!(HeaderField::UserAgent.cgi_variable(), "HTTP_USER_AGENT");
        assert_eq!(HeaderField::Host.cgi_variable(), "HTTP_HOST");
        assert_eq!(HeaderField::Http2Settings.cgi_variable(), "HTTP_HTTP2_SETTINGS");
    }
}
