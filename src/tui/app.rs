use crate::config::Config;
use crate::data::{Issue, PendingAction, Template};
use crate::engine::{Engine, EngineEvent};
use crate::github::{load_templates, GithubClient, TemplateCache};
use crate::store::{FileStore, KvStore, KEY_THEME, KEY_TOKEN};
use crate::tui::toast::{self, Toast};
use crate::util::send_or_log;
use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Braille spinner frames for loading animation
pub const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Delay before the post-create refresh; issue creation happens in the
/// browser, so give the user a moment to submit the form.
const POST_CREATE_REFRESH_DELAY: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Templates,
    Demos,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeKind {
    Light,
    Dark,
}

impl ThemeKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Result from background tasks, polled on each tick.
pub enum AppEvent {
    Engine(EngineEvent),
    /// Authenticated login resolved (or not).
    Identity(std::result::Result<String, String>),
    /// Template catalog loaded (or not).
    Templates(std::result::Result<Vec<Template>, String>),
    /// A scheduled refresh (post-create delay) is due.
    RefreshDue,
}

pub struct App {
    pub config: Arc<Config>,
    pub store: FileStore,

    /// Present while authenticated; dropped on logout.
    pub engine: Option<Arc<Engine<GithubClient, FileStore>>>,
    pub current_user: Option<String>,
    pub token_input: String,

    pub template_cache: Arc<TemplateCache>,
    pub templates: Vec<Template>,
    pub demos: Vec<Issue>,
    /// Issue ids with a mutation in flight; controls disabled while set.
    pub pending_ids: HashSet<u64>,

    pub panel: Panel,
    pub selected_template: usize,
    pub selected_demo: usize,
    pub loading_templates: bool,
    pub loading_demos: bool,
    pub error_message: Option<String>,
    pub toasts: Vec<Toast>,
    pub theme: ThemeKind,
    pub show_help: bool,
    pub spinner_frame: usize,

    events_tx: mpsc::Sender<AppEvent>,
    events_rx: mpsc::Receiver<AppEvent>,
    last_refresh: Option<Instant>,
}

impl App {
    pub fn new(config: Config, store: FileStore) -> Self {
        let (events_tx, events_rx) = mpsc::channel(100);

        let theme = store
            .get(KEY_THEME)
            .as_deref()
            .and_then(ThemeKind::from_name)
            .or_else(|| ThemeKind::from_name(&config.ui.theme))
            .unwrap_or(ThemeKind::Dark);

        let mut app = Self {
            config: Arc::new(config),
            store,
            engine: None,
            current_user: None,
            token_input: String::new(),
            template_cache: Arc::new(TemplateCache::new()),
            templates: Vec::new(),
            demos: Vec::new(),
            pending_ids: HashSet::new(),
            panel: Panel::Templates,
            selected_template: 0,
            selected_demo: 0,
            loading_templates: false,
            loading_demos: false,
            error_message: None,
            toasts: Vec::new(),
            theme,
            show_help: false,
            spinner_frame: 0,
            events_tx,
            events_rx,
            last_refresh: None,
        };

        if let Some(token) = app.store.get(KEY_TOKEN) {
            app.login(token);
        }
        app
    }

    pub fn authenticated(&self) -> bool {
        self.engine.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.loading_templates || self.loading_demos
    }

    /// Process a message and update app state (Elm Architecture update
    /// function). Returns `Ok(true)` if the app should quit.
    pub fn update(&mut self, msg: super::Message) -> Result<bool> {
        use super::Message;
        match msg {
            Message::Quit => return Ok(true),
            Message::Refresh => self.start_refresh(),
            Message::Logout => self.logout(),

            Message::MoveUp => self.move_selection(-1),
            Message::MoveDown => self.move_selection(1),
            Message::GotoTop => self.set_selection(0),
            Message::GotoBottom => self.set_selection(isize::MAX),
            Message::SwitchPanel => {
                self.panel = match self.panel {
                    Panel::Templates => Panel::Demos,
                    Panel::Demos => Panel::Templates,
                };
            }

            Message::OpenSelected => self.open_selected(),
            Message::CloseSelected => self.dispatch_mutation(PendingAction::Close),
            Message::ToggleHoldSelected => self.toggle_hold_selected(),

            Message::ToggleTheme => {
                self.theme = self.theme.toggled();
                if let Err(e) = self.store.set(KEY_THEME, self.theme.name()) {
                    tracing::warn!("Failed to persist theme: {}", e);
                }
            }
            Message::ToggleHelp => self.show_help = !self.show_help,
            Message::CloseModal => self.show_help = false,

            Message::TokenInput(c) => self.token_input.push(c),
            Message::TokenBackspace => {
                self.token_input.pop();
            }
            Message::TokenSubmit => self.submit_token(),

            Message::None => {}
        }
        Ok(false)
    }

    fn submit_token(&mut self) {
        let token = self.token_input.trim().to_string();
        if token.is_empty() {
            return;
        }
        self.token_input.clear();
        if let Err(e) = self.store.set(KEY_TOKEN, &token) {
            // Keep going with a session-only token.
            tracing::warn!("Failed to persist token: {}", e);
            self.toasts.push(Toast::error("Token not persisted (see logs)"));
        }
        self.login(token);
    }

    /// Build the client/engine and kick off identity + template loads.
    /// The demo list waits for the identity so it can filter to creator.
    fn login(&mut self, token: String) {
        let client = GithubClient::new(token);
        let engine = Arc::new(Engine::new(client, self.store.clone()));
        self.engine = Some(Arc::clone(&engine));

        let tx = self.events_tx.clone();
        let identity_engine = Arc::clone(&engine);
        tokio::spawn(async move {
            let result = identity_engine
                .client()
                .get_authenticated_user()
                .await
                .map_err(|e| e.to_string());
            send_or_log(&tx, AppEvent::Identity(result), "identity result").await;
        });

        self.loading_templates = true;
        let tx = self.events_tx.clone();
        let cache = Arc::clone(&self.template_cache);
        tokio::spawn(async move {
            let client = engine.client();
            let result = cache
                .get_or_load(&client.coordinate(), || load_templates(client))
                .await
                .map_err(|e| e.to_string());
            send_or_log(&tx, AppEvent::Templates(result), "template result").await;
        });
    }

    fn logout(&mut self) {
        if !self.authenticated() {
            return;
        }
        if let Err(e) = self.store.remove(KEY_TOKEN) {
            tracing::warn!("Failed to remove stored token: {}", e);
        }
        self.engine = None;
        self.current_user = None;
        self.templates.clear();
        self.demos.clear();
        self.pending_ids.clear();
        self.error_message = None;
        self.loading_templates = false;
        self.loading_demos = false;
        self.last_refresh = None;
        self.toasts.push(Toast::info("Logged out"));
    }

    /// Refresh the demo list through a reconciliation pass. Requires the
    /// identity so the list stays filtered to the user's own issues.
    fn start_refresh(&mut self) {
        let (Some(engine), Some(user)) = (self.engine.clone(), self.current_user.clone()) else {
            return;
        };
        self.loading_demos = true;
        self.last_refresh = Some(Instant::now());

        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = match engine.refresh(Some(&user)).await {
                Ok(issues) => EngineEvent::ListRefreshed(issues),
                Err(e) => EngineEvent::RefreshFailed(e.to_string()),
            };
            send_or_log(&tx, AppEvent::Engine(event), "refresh result").await;
        });
    }

    fn open_selected(&mut self) {
        match self.panel {
            Panel::Templates => {
                let Some(engine) = &self.engine else { return };
                let Some(template) = self.templates.get(self.selected_template) else {
                    return;
                };
                let url = engine.client().new_issue_url(&template.filename);
                if let Err(e) = open_url(&url) {
                    self.toasts.push(Toast::error(format!("Failed to open browser: {}", e)));
                    return;
                }
                self.toasts
                    .push(Toast::info(format!("Opening \"{}\" in GitHub", template.name)));
                // The new issue shows up only after the user submits the form.
                self.schedule_refresh(POST_CREATE_REFRESH_DELAY);
            }
            Panel::Demos => {
                let Some(issue) = self.demos.get(self.selected_demo) else {
                    return;
                };
                let url = issue.demo_repo_url.as_deref().unwrap_or(&issue.html_url);
                if let Err(e) = open_url(url) {
                    self.toasts.push(Toast::error(format!("Failed to open browser: {}", e)));
                }
            }
        }
    }

    fn toggle_hold_selected(&mut self) {
        let Some(issue) = self.demos.get(self.selected_demo) else {
            return;
        };
        let action = if issue.is_on_hold() {
            PendingAction::Unhold
        } else {
            PendingAction::Hold
        };
        self.dispatch_mutation(action);
    }

    /// Shared dispatch for close / hold / unhold on the selected demo.
    fn dispatch_mutation(&mut self, action: PendingAction) {
        if self.panel != Panel::Demos {
            return;
        }
        let Some(engine) = self.engine.clone() else { return };
        let Some(issue) = self.demos.get(self.selected_demo).cloned() else {
            return;
        };
        if self.pending_ids.contains(&issue.id) {
            self.toasts
                .push(Toast::info(format!("Issue #{} already has an action pending", issue.number)));
            return;
        }

        // operation-started is applied synchronously so the row locks
        // before the network round-trip begins.
        self.apply_engine_event(EngineEvent::OperationStarted { issue_id: issue.id });

        let user = self.current_user.clone();
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let events = engine.run_mutation(&issue, action, user.as_deref()).await;
            for event in events {
                send_or_log(&tx, AppEvent::Engine(event), "mutation event").await;
            }
        });
    }

    /// Poll background task results (non-blocking, call from event loop tick)
    pub fn poll_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                AppEvent::Engine(ev) => self.apply_engine_event(ev),
                AppEvent::Identity(Ok(login)) => {
                    self.current_user = Some(login);
                    self.start_refresh();
                }
                AppEvent::Identity(Err(e)) => {
                    self.toasts
                        .push(Toast::error(format!("Authentication failed: {}", e)));
                }
                AppEvent::Templates(Ok(templates)) => {
                    self.templates = templates;
                    self.loading_templates = false;
                    self.clamp_selection();
                }
                AppEvent::Templates(Err(e)) => {
                    // Degrades to an empty catalog.
                    tracing::warn!("Failed to load issue templates: {}", e);
                    self.templates.clear();
                    self.loading_templates = false;
                }
                AppEvent::RefreshDue => self.start_refresh(),
            }
        }
    }

    pub fn apply_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::OperationStarted { issue_id } => {
                self.pending_ids.insert(issue_id);
            }
            EngineEvent::OperationSucceeded { issue_id, action } => {
                self.pending_ids.remove(&issue_id);
                let subject = self.describe_issue(issue_id);
                let message = match action {
                    PendingAction::Close => format!("Close requested for {}", subject),
                    PendingAction::Hold => format!("Hold placed on {}", subject),
                    PendingAction::Unhold => format!("Hold removed from {}", subject),
                };
                self.toasts.push(Toast::success(message));
            }
            EngineEvent::OperationFailed {
                issue_id,
                action,
                error,
            } => {
                self.pending_ids.remove(&issue_id);
                let subject = self.describe_issue(issue_id);
                self.toasts.push(Toast::error(format!(
                    "Failed to {} {}: {}",
                    action.label(),
                    subject,
                    error
                )));
            }
            EngineEvent::ListRefreshed(issues) => {
                self.demos = issues;
                self.loading_demos = false;
                self.error_message = None;
                self.clamp_selection();
            }
            EngineEvent::RefreshFailed(e) => {
                // Keep the previous list on screen.
                self.loading_demos = false;
                self.error_message = Some(format!("Failed to load demos: {}", e));
            }
        }
    }

    fn describe_issue(&self, issue_id: u64) -> String {
        self.demos
            .iter()
            .find(|i| i.id == issue_id)
            .map(|i| format!("issue #{}", i.number))
            .unwrap_or_else(|| "issue".to_string())
    }

    fn schedule_refresh(&self, delay: Duration) {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            send_or_log(&tx, AppEvent::RefreshDue, "scheduled refresh").await;
        });
    }

    /// Called every tick: spinner, toast pruning, and the periodic poll
    /// (only while authenticated with a known identity; logout drops the
    /// engine and thereby cancels the timer).
    pub fn on_tick(&mut self) {
        if self.is_loading() {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
        }
        toast::prune(&mut self.toasts);

        if self.authenticated() && self.current_user.is_some() && !self.loading_demos {
            let interval = Duration::from_secs(self.config.polling.refresh_interval_secs);
            let due = self
                .last_refresh
                .map(|t| t.elapsed() >= interval)
                .unwrap_or(true);
            if due {
                self.start_refresh();
            }
        }
    }

    pub fn spinner_char(&self) -> char {
        SPINNER_FRAMES[self.spinner_frame]
    }

    fn move_selection(&mut self, delta: isize) {
        let (selected, len) = match self.panel {
            Panel::Templates => (&mut self.selected_template, self.templates.len()),
            Panel::Demos => (&mut self.selected_demo, self.demos.len()),
        };
        if len == 0 {
            *selected = 0;
            return;
        }
        let next = (*selected as isize + delta).clamp(0, len as isize - 1);
        *selected = next as usize;
    }

    fn set_selection(&mut self, position: isize) {
        let (selected, len) = match self.panel {
            Panel::Templates => (&mut self.selected_template, self.templates.len()),
            Panel::Demos => (&mut self.selected_demo, self.demos.len()),
        };
        if len == 0 {
            *selected = 0;
            return;
        }
        *selected = position.clamp(0, len as isize - 1) as usize;
    }

    fn clamp_selection(&mut self) {
        self.selected_template = self
            .selected_template
            .min(self.templates.len().saturating_sub(1));
        self.selected_demo = self.selected_demo.min(self.demos.len().saturating_sub(1));
    }
}

fn open_url(url: &str) -> Result<()> {
    // Use xdg-open on Linux, which works in WSL
    std::process::Command::new("xdg-open")
        .arg(url)
        .spawn()
        .or_else(|_| {
            // Fallback to wslview for WSL
            std::process::Command::new("wslview").arg(url).spawn()
        })?;
    Ok(())
}
