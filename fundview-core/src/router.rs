//! View router: which screen is active and how to move between screens.
//!
//! Exactly one screen is active. `navigate` follows an explicit edge table and
//! records the screen being left as a single-level "previous" pointer; there is
//! no history stack. `close` goes back to that pointer once, then falls back to
//! the screen's fixed parent. Closing the login screen asks the host to exit.
//! Anything not in the table is a no-op.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Login,
    DepartmentSelect,
    ResearchLogin,
    Dashboard,
    AssetReport,
    BetaCalculation,
    SvmAnalysis,
    SvmDataAnalysis,
    DataImport,
    ResearchDataImport,
    NotificationCenter,
    TrainingModel,
    MarketIndexView,
}

/// Screens that reach each other through a shared menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenGroup {
    Entry,
    Fund,
    Research,
}

impl Screen {
    pub const ALL: [Screen; 13] = [
        Screen::Login,
        Screen::DepartmentSelect,
        Screen::ResearchLogin,
        Screen::Dashboard,
        Screen::AssetReport,
        Screen::BetaCalculation,
        Screen::SvmAnalysis,
        Screen::SvmDataAnalysis,
        Screen::DataImport,
        Screen::ResearchDataImport,
        Screen::NotificationCenter,
        Screen::TrainingModel,
        Screen::MarketIndexView,
    ];

    /// Fund menu order.
    pub const FUND_MENU: [Screen; 7] = [
        Screen::Dashboard,
        Screen::AssetReport,
        Screen::BetaCalculation,
        Screen::SvmAnalysis,
        Screen::MarketIndexView,
        Screen::DataImport,
        Screen::NotificationCenter,
    ];

    /// Research menu order.
    pub const RESEARCH_MENU: [Screen; 3] = [
        Screen::ResearchDataImport,
        Screen::SvmDataAnalysis,
        Screen::TrainingModel,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Screen::Login => "Login",
            Screen::DepartmentSelect => "Department",
            Screen::ResearchLogin => "Research Login",
            Screen::Dashboard => "Dashboard",
            Screen::AssetReport => "Asset Report",
            Screen::BetaCalculation => "Beta Calculation",
            Screen::SvmAnalysis => "SVM Analysis",
            Screen::SvmDataAnalysis => "SVM Data Analysis",
            Screen::DataImport => "Data Import",
            Screen::ResearchDataImport => "Research Data Import",
            Screen::NotificationCenter => "Notifications",
            Screen::TrainingModel => "Training Model",
            Screen::MarketIndexView => "Market Index",
        }
    }

    pub fn group(self) -> ScreenGroup {
        match self {
            Screen::Login | Screen::DepartmentSelect | Screen::ResearchLogin => ScreenGroup::Entry,
            Screen::ResearchDataImport | Screen::SvmDataAnalysis | Screen::TrainingModel => {
                ScreenGroup::Research
            }
            _ => ScreenGroup::Fund,
        }
    }

    /// Where `close` lands when there is no previous pointer.
    pub fn parent(self) -> Option<Screen> {
        match self {
            Screen::Login => None,
            Screen::DepartmentSelect => Some(Screen::Login),
            Screen::Dashboard | Screen::ResearchLogin => Some(Screen::DepartmentSelect),
            Screen::ResearchDataImport => Some(Screen::ResearchLogin),
            Screen::SvmDataAnalysis | Screen::TrainingModel => Some(Screen::ResearchDataImport),
            Screen::AssetReport
            | Screen::BetaCalculation
            | Screen::SvmAnalysis
            | Screen::DataImport
            | Screen::NotificationCenter
            | Screen::MarketIndexView => Some(Screen::Dashboard),
        }
    }

    /// Whether the edge table allows `self -> to`.
    pub fn has_edge(self, to: Screen) -> bool {
        if self == to {
            return true;
        }
        match (self, to) {
            (Screen::Login, Screen::DepartmentSelect) => true,
            (Screen::DepartmentSelect, Screen::Dashboard | Screen::ResearchLogin) => true,
            (Screen::ResearchLogin, Screen::ResearchDataImport) => true,
            (a, b) => a.group() == b.group() && a.group() != ScreenGroup::Entry,
        }
    }
}

/// Result of a router action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Moved { from: Screen, to: Screen },
    Ignored,
    /// Close on the login screen: the host should exit.
    Exit,
}

/// Which screens a deployment offers. Login is always on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    pub enabled: BTreeSet<Screen>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            enabled: Screen::ALL.into_iter().collect(),
        }
    }
}

impl RouterConfig {
    pub fn with_screens(screens: impl IntoIterator<Item = Screen>) -> Self {
        let mut enabled: BTreeSet<Screen> = screens.into_iter().collect();
        enabled.insert(Screen::Login);
        Self { enabled }
    }

    pub fn is_enabled(&self, screen: Screen) -> bool {
        screen == Screen::Login || self.enabled.contains(&screen)
    }
}

#[derive(Debug, Clone)]
pub struct Router {
    current: Screen,
    previous: Option<Screen>,
    config: RouterConfig,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            current: Screen::Login,
            previous: None,
            config,
        }
    }

    pub fn current(&self) -> Screen {
        self.current
    }

    pub fn previous(&self) -> Option<Screen> {
        self.previous
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn can_navigate(&self, to: Screen) -> bool {
        self.config.is_enabled(to) && self.current.has_edge(to)
    }

    pub fn navigate(&mut self, to: Screen) -> Transition {
        if !self.can_navigate(to) {
            debug!(from = self.current.label(), to = to.label(), "navigation ignored");
            return Transition::Ignored;
        }
        let from = self.current;
        self.previous = Some(from);
        self.current = to;
        info!(from = from.label(), to = to.label(), "navigated");
        Transition::Moved { from, to }
    }

    pub fn close(&mut self) -> Transition {
        let from = self.current;
        let target = match self.previous.take() {
            Some(prev) => Some(prev),
            None => self.enabled_parent(from),
        };
        match target {
            Some(to) => {
                self.current = to;
                info!(from = from.label(), to = to.label(), "closed");
                Transition::Moved { from, to }
            }
            None if from == Screen::Login => Transition::Exit,
            None => Transition::Ignored,
        }
    }

    /// Back to the login screen with no previous pointer.
    pub fn reset(&mut self) -> Transition {
        let from = self.current;
        self.current = Screen::Login;
        self.previous = None;
        Transition::Moved {
            from,
            to: Screen::Login,
        }
    }

    /// Nearest enabled ancestor.
    fn enabled_parent(&self, screen: Screen) -> Option<Screen> {
        let mut next = screen.parent();
        while let Some(p) = next {
            if self.config.is_enabled(p) {
                return Some(p);
            }
            next = p.parent();
        }
        None
    }
}
