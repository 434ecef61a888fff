// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Cookie adapters for axum.
//!
//! `HeaderMap` reads the request's `Cookie` headers; [`CookieWriter`] collects
//! the cookies the session layer wants set and turns into `Set-Cookie`
//! headers when returned from a handler:
//!
//! ```no_run
//! use axum::http::HeaderMap;
//! use quicksession::{global, http::CookieWriter};
//!
//! async fn handler(headers: HeaderMap) -> (CookieWriter, String) {
//!     let mut cookies = CookieWriter::new();
//!     let id = global().start(&headers, &mut cookies);
//!     (cookies, format!("hello, session {}", id.masked()))
//! }
//! ```

use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponseParts, ResponseParts};
use cookie::{Cookie, SameSite};
use std::convert::Infallible;

use crate::registry::{RequestCookies, ResponseCookies, SessionCookie};

impl RequestCookies for HeaderMap {
    /// Find `name` across all `Cookie` headers. Pairs that fail to parse are
    /// skipped, so a malformed header reads as "no such cookie".
    fn cookie(&self, name: &str) -> Option<String> {
        self.get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| Cookie::split_parse(value))
            .filter_map(Result::ok)
            .find(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string())
    }
}

/// Collects session cookies for a response.
#[derive(Debug, Default, Clone)]
pub struct CookieWriter {
    cookies: Vec<SessionCookie>,
}

impl CookieWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cookies(&self) -> &[SessionCookie] {
        &self.cookies
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Rendered `Set-Cookie` values, in the order the cookies were queued.
    pub fn header_values(&self) -> Vec<HeaderValue> {
        self.cookies
            .iter()
            .filter_map(|c| {
                let rendered = render(c);
                match HeaderValue::from_str(&rendered) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!(
                            cookie = %c.name,
                            "Dropping unrepresentable Set-Cookie: {}",
                            e
                        );
                        None
                    }
                }
            })
            .collect()
    }
}

impl ResponseCookies for CookieWriter {
    fn set_cookie(&mut self, cookie: SessionCookie) {
        self.cookies.push(cookie);
    }
}

impl IntoResponseParts for CookieWriter {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        for value in self.header_values() {
            res.headers_mut().append(header::SET_COOKIE, value);
        }
        Ok(res)
    }
}

fn render(session_cookie: &SessionCookie) -> String {
    let mut builder = Cookie::build((session_cookie.name.clone(), session_cookie.value.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    if let Some(secs) = session_cookie.max_age {
        builder = builder.max_age(cookie::time::Duration::seconds(secs));
    }
    builder.build().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::SessionId;

    fn headers(cookie_lines: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for line in cookie_lines {
            map.append(header::COOKIE, HeaderValue::from_str(line).unwrap());
        }
        map
    }

    #[test]
    fn test_reads_named_cookie() {
        let map = headers(&["theme=dark; SessionId=abc123; lang=en"]);
        assert_eq!(map.cookie("SessionId"), Some("abc123".to_string()));
        assert_eq!(map.cookie("theme"), Some("dark".to_string()));
        assert_eq!(map.cookie("missing"), None);
    }

    #[test]
    fn test_reads_across_multiple_headers() {
        let map = headers(&["theme=dark", "SessionId=xyz"]);
        assert_eq!(map.cookie("SessionId"), Some("xyz".to_string()));
    }

    #[test]
    fn test_malformed_pairs_are_skipped() {
        let map = headers(&["garbage; =novalue; SessionId=ok"]);
        assert_eq!(map.cookie("SessionId"), Some("ok".to_string()));

        let map = headers(&[";;;"]);
        assert_eq!(map.cookie("SessionId"), None);
    }

    #[test]
    fn test_no_cookie_header() {
        assert_eq!(HeaderMap::new().cookie("SessionId"), None);
    }

    #[test]
    fn test_issue_cookie_rendering() {
        let id = SessionId::from_cookie_value("abc").unwrap();
        let mut writer = CookieWriter::new();
        writer.set_cookie(SessionCookie::issue("SessionId", &id));

        let values = writer.header_values();
        assert_eq!(values.len(), 1);
        let parsed = Cookie::parse(values[0].to_str().unwrap().to_string()).unwrap();
        assert_eq!(parsed.name(), "SessionId");
        assert_eq!(parsed.value(), "abc");
        assert_eq!(parsed.path(), Some("/"));
        assert_eq!(parsed.http_only(), Some(true));
        assert!(parsed.max_age().is_none());
    }

    #[test]
    fn test_expire_cookie_rendering() {
        let mut writer = CookieWriter::new();
        writer.set_cookie(SessionCookie::expire("SessionId"));

        let rendered = writer.header_values()[0].to_str().unwrap().to_string();
        let parsed = Cookie::parse(rendered).unwrap();
        assert_eq!(parsed.value(), "");
        let max_age = parsed.max_age().expect("removal cookie carries Max-Age");
        assert!(max_age <= cookie::time::Duration::ZERO);
    }

    #[test]
    fn test_into_response_parts_appends_set_cookie() {
        use axum::response::IntoResponse;

        let id = SessionId::from_cookie_value("abc").unwrap();
        let mut writer = CookieWriter::new();
        writer.set_cookie(SessionCookie::expire("SessionId"));
        writer.set_cookie(SessionCookie::issue("SessionId", &id));

        let response = (writer, "ok").into_response();
        let set_cookies: Vec<_> = response.headers().get_all(header::SET_COOKIE).iter().collect();
        assert_eq!(set_cookies.len(), 2);
        assert!(set_cookies[1].to_str().unwrap().starts_with("SessionId=abc"));
    }
}
