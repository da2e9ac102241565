use mastery_shared::SkillProgress;

/// Active pane in the TUI layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Skills,
    Events,
}

impl Pane {
    pub fn next(self) -> Self {
        match self {
            Pane::Skills => Pane::Events,
            Pane::Events => Pane::Skills,
        }
    }
}

/// Actions that can be dispatched into the App state.
pub enum AppAction {
    HealthUpdated(bool),
    SkillsUpdated(Vec<SkillProgress>),
    NewEvent(serde_json::Value),
    #[allow(dead_code)]
    Tick,
}

/// TUI application state.
pub struct App {
    pub learner_id: Option<String>,
    pub skills: Vec<SkillProgress>,
    pub events: Vec<serde_json::Value>,
    pub active_pane: Pane,
    pub skill_scroll: usize,
    pub event_scroll: usize,
    pub show_help: bool,
    pub should_quit: bool,
    pub endpoint: String,
    pub connected: bool,
    pub last_refresh: std::time::Instant,
}

impl App {
    pub fn new(endpoint: String, learner_id: Option<String>) -> Self {
        Self {
            learner_id,
            skills: Vec::new(),
            events: Vec::new(),
            active_pane: Pane::Skills,
            skill_scroll: 0,
            event_scroll: 0,
            show_help: false,
            should_quit: false,
            endpoint,
            connected: false,
            last_refresh: std::time::Instant::now(),
        }
    }

    pub fn apply(&mut self, action: AppAction) {
        match action {
            AppAction::HealthUpdated(ok) => {
                self.connected = ok;
                self.last_refresh = std::time::Instant::now();
            }
            AppAction::SkillsUpdated(skills) => {
                self.skills = skills;
            }
            AppAction::NewEvent(event) => {
                self.events.push(event);
                // Keep a rolling window
                if self.events.len() > 200 {
                    self.events.drain(..self.events.len() - 200);
                }
            }
            AppAction::Tick => {}
        }
    }

    pub fn scroll_up(&mut self) {
        match self.active_pane {
            Pane::Skills => {
                self.skill_scroll = self.skill_scroll.saturating_sub(1);
            }
            Pane::Events => {
                self.event_scroll = self.event_scroll.saturating_sub(1);
            }
        }
    }

    pub fn scroll_down(&mut self) {
        match self.active_pane {
            Pane::Skills => {
                if !self.skills.is_empty() {
                    self.skill_scroll = (self.skill_scroll + 1).min(self.skills.len() - 1);
                }
            }
            Pane::Events => {
                if !self.events.is_empty() {
                    self.event_scroll = (self.event_scroll + 1).min(self.events.len() - 1);
                }
            }
        }
    }
}
