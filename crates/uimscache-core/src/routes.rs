//! Routes and tab navigation for the dashboard.
//!
//! The dashboard has two tabs addressed by index (`0` Attendance,
//! `1` Timetable). Every view the app can show is a `Route` with a path:
//!
//! | Route | Path |
//! |---|---|
//! | `Root` | `/` |
//! | `Dashboard(Attendance)` | `/dashboard/attendance` |
//! | `Dashboard(Timetable)` | `/dashboard/timetable` |
//!
//! Components never navigate themselves; they return a `Navigation`
//! request and the caller applies it to a `History`.

use std::fmt;

/// Dashboard tabs, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tab {
    #[default]
    Attendance,
    Timetable,
}

impl Tab {
    pub const ALL: [Tab; 2] = [Tab::Attendance, Tab::Timetable];

    /// Map a tab index to its tab. Only `0` and `1` are valid.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Tab::Attendance),
            1 => Some(Tab::Timetable),
            _ => None,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Tab::Attendance => 0,
            Tab::Timetable => 1,
        }
    }

    /// Route segment name for this tab.
    pub fn name(&self) -> &'static str {
        match self {
            Tab::Attendance => "attendance",
            Tab::Timetable => "timetable",
        }
    }

    /// Get the display title for this tab.
    pub fn title(&self) -> &'static str {
        match self {
            Tab::Attendance => "Attendance",
            Tab::Timetable => "Timetable",
        }
    }

    /// Get the next tab (wrapping around)
    pub fn next(&self) -> Self {
        match self {
            Tab::Attendance => Tab::Timetable,
            Tab::Timetable => Tab::Attendance,
        }
    }

    /// Get the previous tab (wrapping around)
    pub fn prev(&self) -> Self {
        // Two tabs: prev and next coincide
        self.next()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Sign-in screen; where unauthenticated users are sent.
    Root,
    Dashboard(Tab),
}

impl Route {
    /// Default sub-route after a cache hit.
    pub const DEFAULT_DASHBOARD: Route = Route::Dashboard(Tab::Attendance);

    pub fn path(&self) -> String {
        match self {
            Route::Root => "/".to_string(),
            Route::Dashboard(tab) => format!("/dashboard/{}", tab.name()),
        }
    }

    pub fn tab(&self) -> Option<Tab> {
        match self {
            Route::Root => None,
            Route::Dashboard(tab) => Some(*tab),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// A navigation request. `replace` swaps the current history entry
/// instead of pushing, so going back never returns to the replaced view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigation {
    pub route: Route,
    pub replace: bool,
}

impl Navigation {
    pub fn push(route: Route) -> Self {
        Self {
            route,
            replace: false,
        }
    }

    pub fn replace(route: Route) -> Self {
        Self {
            route,
            replace: true,
        }
    }
}

/// Tab selection state for the dashboard view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabNav {
    selected: Tab,
}

impl TabNav {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Tab {
        self.selected
    }

    /// Select a tab by index. The selection changes before the navigation
    /// is handed back. Unknown indices leave the selection alone.
    pub fn select(&mut self, index: usize) -> Option<Navigation> {
        let tab = Tab::from_index(index)?;
        self.selected = tab;
        Some(Navigation::push(Route::Dashboard(tab)))
    }

    /// Keep the selection in sync with a route applied elsewhere.
    pub fn sync(&mut self, route: Route) {
        if let Some(tab) = route.tab() {
            self.selected = tab;
        }
    }
}

/// Minimal navigation stack.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Route>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(Route::Root)
    }
}

impl History {
    pub fn new(initial: Route) -> Self {
        Self {
            entries: vec![initial],
        }
    }

    pub fn current(&self) -> Route {
        // Never empty: constructed with one entry and `back` keeps the first
        self.entries.last().copied().unwrap_or(Route::Root)
    }

    pub fn apply(&mut self, nav: Navigation) {
        if nav.replace {
            self.entries.pop();
        }
        self.entries.push(nav.route);
    }

    /// Go back one entry. Returns the new current route, or `None` at the
    /// start of history.
    pub fn back(&mut self) -> Option<Route> {
        if self.entries.len() <= 1 {
            return None;
        }
        self.entries.pop();
        Some(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_index_mapping() {
        assert_eq!(Tab::from_index(0), Some(Tab::Attendance));
        assert_eq!(Tab::from_index(1), Some(Tab::Timetable));
        assert_eq!(Tab::from_index(2), None);
        assert_eq!(Tab::Attendance.name(), "attendance");
        assert_eq!(Tab::Timetable.name(), "timetable");
        for tab in Tab::ALL {
            assert_eq!(Tab::from_index(tab.index()), Some(tab));
        }
    }

    #[test]
    fn test_tab_next_prev_wrap() {
        assert_eq!(Tab::Attendance.next(), Tab::Timetable);
        assert_eq!(Tab::Timetable.next(), Tab::Attendance);
        assert_eq!(Tab::Attendance.prev(), Tab::Timetable);
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Root.path(), "/");
        assert_eq!(Route::Dashboard(Tab::Attendance).path(), "/dashboard/attendance");
        assert_eq!(Route::Dashboard(Tab::Timetable).path(), "/dashboard/timetable");
        assert_eq!(Route::DEFAULT_DASHBOARD.to_string(), "/dashboard/attendance");
    }

    #[test]
    fn test_tab_select_updates_state_and_navigates() {
        let mut nav = TabNav::new();
        assert_eq!(nav.selected(), Tab::Attendance);

        let to_timetable = nav.select(1).unwrap();
        assert_eq!(nav.selected(), Tab::Timetable);
        assert_eq!(to_timetable.route.path(), "/dashboard/timetable");
        assert!(!to_timetable.replace);

        let to_attendance = nav.select(0).unwrap();
        assert_eq!(nav.selected(), Tab::Attendance);
        assert_eq!(to_attendance.route.path(), "/dashboard/attendance");
    }

    #[test]
    fn test_tab_select_out_of_range_is_ignored() {
        let mut nav = TabNav::new();
        nav.select(1);
        assert!(nav.select(7).is_none());
        assert_eq!(nav.selected(), Tab::Timetable);
    }

    #[test]
    fn test_history_replace_drops_gated_entry() {
        let mut history = History::new(Route::Root);
        history.apply(Navigation::push(Route::Dashboard(Tab::Attendance)));

        // Redirect out of the dashboard replaces it
        history.apply(Navigation::replace(Route::Root));
        assert_eq!(history.current(), Route::Root);
        assert_eq!(history.back(), Some(Route::Root));
        assert_eq!(history.back(), None);
    }

    #[test]
    fn test_tab_nav_sync() {
        let mut nav = TabNav::new();
        nav.sync(Route::Dashboard(Tab::Timetable));
        assert_eq!(nav.selected(), Tab::Timetable);
        nav.sync(Route::Root);
        assert_eq!(nav.selected(), Tab::Timetable);
    }
}
