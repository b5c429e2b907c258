//! Client-side routes and the session gate.

use std::fmt;

/// A navigable page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Gallery,
    Notes,
    Proposal,
}

impl Route {
    pub const ALL: [Self; 5] = [
        Self::Home,
        Self::Login,
        Self::Gallery,
        Self::Notes,
        Self::Proposal,
    ];

    /// Where a successful sign-in lands.
    pub const AFTER_LOGIN: Self = Self::Home;

    pub const fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/login",
            Self::Gallery => "/gallery",
            Self::Notes => "/notes",
            Self::Proposal => "/proposal",
        }
    }

    /// Navigation label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Login => "Login",
            Self::Gallery => "Gallery",
            Self::Notes => "Notes",
            Self::Proposal => "Special Letter",
        }
    }

    pub const fn requires_session(self) -> bool {
        matches!(self, Self::Gallery | Self::Notes | Self::Proposal)
    }

    /// Parse a path or hash fragment (`#/notes`). Query strings and trailing
    /// slashes are ignored; unknown paths fall back to [`Route::Home`].
    pub fn from_path(path: &str) -> Self {
        let path = path.trim();
        let path = path.strip_prefix('#').unwrap_or(path);
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = path.trim_end_matches('/');
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        Self::ALL
            .into_iter()
            .find(|route| route.path() == path)
            .unwrap_or(Self::Home)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Outcome of navigating to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Show(Route),
    /// The page needs a session; show the login page instead
    RedirectToLogin { requested: Route },
}

impl Resolution {
    /// The page actually displayed.
    pub const fn page(self) -> Route {
        match self {
            Self::Show(route) => route,
            Self::RedirectToLogin { .. } => Route::Login,
        }
    }
}

/// Resolve `path` for a visitor with or without a session.
pub fn resolve(path: &str, signed_in: bool) -> Resolution {
    let route = Route::from_path(path);
    if route.requires_session() && !signed_in {
        tracing::debug!(%route, "Redirecting to login");
        Resolution::RedirectToLogin { requested: route }
    } else {
        Resolution::Show(route)
    }
}

/// Links shown in the navigation bar.
pub fn nav_links(signed_in: bool) -> Vec<Route> {
    if signed_in {
        vec![Route::Home, Route::Gallery, Route::Notes, Route::Proposal]
    } else {
        vec![Route::Home, Route::Login]
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_paths_and_fragments() {
        assert_eq!(Route::from_path("/gallery"), Route::Gallery);
        assert_eq!(Route::from_path("#/notes"), Route::Notes);
        assert_eq!(Route::from_path("proposal/"), Route::Proposal);
        assert_eq!(Route::from_path("/login?next=%2Fnotes"), Route::Login);
        assert_eq!(Route::from_path(""), Route::Home);
        assert_eq!(Route::from_path("/nowhere"), Route::Home);
    }

    #[test]
    fn gated_pages_redirect_without_a_session() {
        for route in [Route::Gallery, Route::Notes, Route::Proposal] {
            assert_eq!(
                resolve(route.path(), false),
                Resolution::RedirectToLogin { requested: route }
            );
            assert_eq!(resolve(route.path(), false).page(), Route::Login);
            assert_eq!(resolve(route.path(), true), Resolution::Show(route));
        }
        assert_eq!(resolve("/", false), Resolution::Show(Route::Home));
        assert_eq!(resolve("/login", true), Resolution::Show(Route::Login));
    }

    #[test]
    fn nav_links_follow_the_session() {
        assert_eq!(nav_links(false), vec![Route::Home, Route::Login]);
        assert!(nav_links(true).iter().all(|route| *route != Route::Login));
    }
}
