//! Hash routes, public chrome and the admin session gate

use std::fmt;
use std::sync::Arc;
use tracing::debug;

use church_auth::LocalStorage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminSection {
    /// `/admin`, `/admin/dashboard`
    Overview,
    /// `/admin/prayers`
    Prayers,
    /// Sections listed in the admin sidebar that have no view yet
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    About,
    Sermons,
    Events,
    Live,
    Gallery,
    Contact,
    Prayer,
    Giving,
    Shop,
    AdminLogin,
    Admin(AdminSection),
}

impl Route {
    /// Resolve a location such as `#/giving` or `/admin/prayers`.
    ///
    /// Query strings and trailing slashes are ignored. Unknown paths give `None`.
    pub fn parse(location: &str) -> Option<Route> {
        let path = location.trim().trim_start_matches('#');
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = path.trim_end_matches('/');
        let path = if path.is_empty() { "/" } else { path };

        let route = match path {
            "/" => Route::Home,
            "/about" => Route::About,
            "/sermons" => Route::Sermons,
            "/events" => Route::Events,
            "/live" => Route::Live,
            "/gallery" => Route::Gallery,
            "/contact" => Route::Contact,
            "/prayer" => Route::Prayer,
            "/giving" => Route::Giving,
            "/shop" => Route::Shop,
            "/admin/login" => Route::AdminLogin,
            "/admin" | "/admin/dashboard" => Route::Admin(AdminSection::Overview),
            "/admin/prayers" => Route::Admin(AdminSection::Prayers),
            other => {
                let rest = other.strip_prefix("/admin/")?;
                Route::Admin(AdminSection::Other(rest.to_string()))
            }
        };
        Some(route)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::About => "/about".to_string(),
            Route::Sermons => "/sermons".to_string(),
            Route::Events => "/events".to_string(),
            Route::Live => "/live".to_string(),
            Route::Gallery => "/gallery".to_string(),
            Route::Contact => "/contact".to_string(),
            Route::Prayer => "/prayer".to_string(),
            Route::Giving => "/giving".to_string(),
            Route::Shop => "/shop".to_string(),
            Route::AdminLogin => "/admin/login".to_string(),
            Route::Admin(AdminSection::Overview) => "/admin/dashboard".to_string(),
            Route::Admin(AdminSection::Prayers) => "/admin/prayers".to_string(),
            Route::Admin(AdminSection::Other(section)) => format!("/admin/{}", section),
        }
    }

    /// Any `/admin` path, login included
    pub fn is_admin_path(&self) -> bool {
        matches!(self, Route::AdminLogin | Route::Admin(_))
    }

    /// Navbar, footer and WhatsApp button are shown outside `/admin`
    pub fn shows_chrome(&self) -> bool {
        !self.is_admin_path()
    }

    pub fn requires_session(&self) -> bool {
        matches!(self, Route::Admin(_))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.path())
    }
}

/// Navbar entry: target and translation key of its label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub route: Route,
    pub label_key: &'static str,
}

/// Navbar links in display order. The portal button is separate.
pub fn nav_links() -> Vec<NavLink> {
    [
        (Route::Home, "nav.home"),
        (Route::About, "nav.about"),
        (Route::Sermons, "nav.sermons"),
        (Route::Events, "nav.events"),
        (Route::Live, "nav.live"),
        (Route::Shop, "nav.shop"),
        (Route::Prayer, "nav.prayer"),
        (Route::Giving, "nav.giving"),
    ]
    .into_iter()
    .map(|(route, label_key)| NavLink { route, label_key })
    .collect()
}

/// The admin portal button
pub fn portal_link() -> NavLink {
    NavLink {
        route: Route::AdminLogin,
        label_key: "nav.portal",
    }
}

/// Admin sidebar entries: label and target
pub fn admin_nav_items() -> Vec<(&'static str, Route)> {
    let other = |s: &str| Route::Admin(AdminSection::Other(s.to_string()));
    vec![
        ("Overview", Route::Admin(AdminSection::Overview)),
        ("Sermons", other("sermons")),
        ("Events", other("events")),
        ("Ebooks", other("shop")),
        ("Prayers", Route::Admin(AdminSection::Prayers)),
        ("Donations", other("donations")),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Render(Route),
    Redirect(Route),
}

/// Decides whether an admin route may render
///
/// Presence of the cached session blob is all that is checked: an expired
/// or tampered blob still opens the dashboard. Row-level security on the
/// server is what actually protects the data.
#[derive(Clone)]
pub struct SessionGate {
    storage: Arc<dyn LocalStorage>,
    storage_key: String,
}

impl fmt::Debug for SessionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionGate")
            .field("storage_key", &self.storage_key)
            .finish()
    }
}

impl SessionGate {
    pub fn new(storage: Arc<dyn LocalStorage>, storage_key: &str) -> Self {
        Self {
            storage,
            storage_key: storage_key.to_string(),
        }
    }

    /// A non-empty value under the session key; its content is not checked
    pub fn has_session(&self) -> bool {
        self.storage
            .get_item(&self.storage_key)
            .map_or(false, |value| !value.is_empty())
    }

    pub fn resolve(&self, route: Route) -> GateDecision {
        if route.requires_session() && !self.has_session() {
            debug!(path = %route.path(), "no session, redirecting to login");
            return GateDecision::Redirect(Route::AdminLogin);
        }
        GateDecision::Render(route)
    }

    /// Parse and gate a location in one step
    pub fn navigate(&self, location: &str) -> Option<GateDecision> {
        Route::parse(location).map(|route| self.resolve(route))
    }
}
