// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Screen routes, deep-link parsing and auth gating.
//!
//! Deep links look like `qrush://add-record?url=example.com` or
//! `https://qrush.app/add-record`. Routes that need a session fall back to
//! `login` while signed out; the auth screens fall through to `home`
//! while signed in.

use crate::models::AuthState;
use serde::Serialize;
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    Login,
    Register,
    Home,
    AddRecord,
    ForgotPassword,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::Login,
        Route::Register,
        Route::Home,
        Route::AddRecord,
        Route::ForgotPassword,
    ];

    /// Path segment used in deep links.
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "login",
            Route::Register => "register",
            Route::Home => "home",
            Route::AddRecord => "add-record",
            Route::ForgotPassword => "forgot-password",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.path() == path)
    }

    pub fn requires_auth(self) -> bool {
        matches!(self, Route::Home | Route::AddRecord)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A parsed deep link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLink {
    pub route: Route,
    /// Decoded query parameters in order of appearance
    pub params: Vec<(String, String)>,
}

impl DeepLink {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Parse `url` if it starts with one of `prefixes`.
///
/// An empty path maps to `home`. Unknown paths and foreign URLs give `None`.
pub fn parse_deep_link(url: &str, prefixes: &[String]) -> Option<DeepLink> {
    let rest = prefixes
        .iter()
        .find_map(|prefix| url.strip_prefix(prefix.as_str()))?;
    let rest = rest.split('#').next().unwrap_or_default();

    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let path = path.trim_matches('/');
    let route = if path.is_empty() {
        Route::Home
    } else {
        Route::from_path(&decode(path))?
    };

    let params = query
        .map(|q| {
            q.split('&')
                .filter(|pair| !pair.is_empty())
                .map(|pair| match pair.split_once('=') {
                    Some((k, v)) => (decode(k), decode(v)),
                    None => (decode(pair), String::new()),
                })
                .collect()
        })
        .unwrap_or_default();

    Some(DeepLink { route, params })
}

fn decode(s: &str) -> String {
    let s = s.replace('+', " ");
    match urlencoding::decode(&s) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => s,
    }
}

/// Screen to show first. `None` while the auth state is still loading.
pub fn initial_route(state: &AuthState) -> Option<Route> {
    match state {
        AuthState::Loading => None,
        AuthState::Authenticated(_) => Some(Route::Home),
        AuthState::Unauthenticated => Some(Route::Login),
    }
}

/// Where a request for `requested` actually lands given `state`.
pub fn resolve_route(requested: Route, state: &AuthState) -> Route {
    match state {
        AuthState::Authenticated(_) if !requested.requires_auth() => Route::Home,
        AuthState::Authenticated(_) => requested,
        _ if requested.requires_auth() => Route::Login,
        _ => requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Session;

    fn prefixes() -> Vec<String> {
        vec!["qrush://".to_string(), "https://qrush.app".to_string()]
    }

    #[test]
    fn test_paths_round_trip() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::AddRecord.to_string(), "add-record");
    }

    #[test]
    fn test_parse_deep_links() {
        let link = parse_deep_link(
            "qrush://add-record?url=example.com%2Fa&title=My+Site",
            &prefixes(),
        )
        .unwrap();
        assert_eq!(link.route, Route::AddRecord);
        assert_eq!(link.param("url"), Some("example.com/a"));
        assert_eq!(link.param("title"), Some("My Site"));

        let link = parse_deep_link("https://qrush.app/", &prefixes()).unwrap();
        assert_eq!(link.route, Route::Home);

        let link = parse_deep_link("https://qrush.app/forgot-password#top", &prefixes()).unwrap();
        assert_eq!(link.route, Route::ForgotPassword);

        assert!(parse_deep_link("qrush://settings", &prefixes()).is_none());
        assert!(parse_deep_link("https://evil.example/login", &prefixes()).is_none());
    }

    #[test]
    fn test_auth_gating() {
        let signed_in = AuthState::Authenticated(Session::default());

        assert_eq!(initial_route(&AuthState::Loading), None);
        assert_eq!(initial_route(&AuthState::Unauthenticated), Some(Route::Login));
        assert_eq!(initial_route(&signed_in), Some(Route::Home));

        assert_eq!(resolve_route(Route::AddRecord, &AuthState::Unauthenticated), Route::Login);
        assert_eq!(resolve_route(Route::Register, &AuthState::Unauthenticated), Route::Register);
        assert_eq!(resolve_route(Route::Login, &signed_in), Route::Home);
        assert_eq!(resolve_route(Route::AddRecord, &signed_in), Route::AddRecord);
    }
}
