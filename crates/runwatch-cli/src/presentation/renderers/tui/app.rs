use std::sync::Arc;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use runwatch_runtime::{
    DashboardSession, Direction, InstanceSession, InstanceTarget, Provider, SelectorSession,
};

/// One screen of the TUI. Lower screens stay on the stack while a detail
/// screen is open and keep being pumped.
pub enum Screen {
    Dashboard(DashboardSession),
    Selector {
        session: SelectorSession,
        /// Replace the selector with the chosen instance screen instead of
        /// returning the choice to the caller
        open_on_confirm: bool,
    },
    Instance(InstanceSession),
}

pub(crate) struct App {
    provider: Arc<dyn Provider>,
    bridge_capacity: usize,
    screens: Vec<Screen>,
    /// One-line message shown in the footer until the next key press
    message: Option<String>,
    outcome: Option<Result<Option<InstanceTarget>>>,
}

impl App {
    pub fn new(provider: Arc<dyn Provider>, bridge_capacity: usize, initial: Screen) -> Self {
        Self {
            provider,
            bridge_capacity,
            screens: vec![initial],
            message: None,
            outcome: None,
        }
    }

    pub fn top(&self) -> Option<&Screen> {
        self.screens.last()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_done(&self) -> bool {
        self.outcome.is_some()
    }

    #[cfg(test)]
    pub fn depth(&self) -> usize {
        self.screens.len()
    }

    /// Result of the session: the selector's choice, if any.
    pub fn finish(mut self) -> Result<Option<InstanceTarget>> {
        self.shutdown();
        self.outcome.take().unwrap_or(Ok(None))
    }

    /// Drain every screen's bridge. Returns whether the visible screen changed.
    pub fn pump(&mut self) -> bool {
        let top = self.screens.len().saturating_sub(1);
        let mut changed = false;
        for (index, screen) in self.screens.iter_mut().enumerate() {
            let updated = match screen {
                Screen::Dashboard(session) => session.pump(),
                Screen::Selector { session, .. } => session.pump(),
                Screen::Instance(session) => session.pump(),
            };
            if index == top {
                changed |= updated;
            }
        }
        changed
    }

    /// Elapsed-time tick. Returns whether a redraw is needed.
    pub fn tick(&mut self) -> bool {
        match self.screens.last_mut() {
            Some(Screen::Instance(session)) => session.tick(),
            Some(Screen::Dashboard(session)) => session.is_ticking(),
            Some(Screen::Selector { session, .. }) => session.is_ticking(),
            None => false,
        }
    }

    /// Returns whether a redraw is needed.
    pub fn on_key(&mut self, key: KeyEvent) -> bool {
        self.message = None;

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.exit(Ok(None));
            return true;
        }

        match self.screens.last_mut() {
            Some(Screen::Dashboard(_)) => self.on_dashboard_key(key.code),
            Some(Screen::Selector { .. }) => self.on_selector_key(key.code),
            Some(Screen::Instance(_)) => self.on_instance_key(key.code),
            None => {
                self.exit(Ok(None));
            }
        }
        true
    }

    fn on_dashboard_key(&mut self, code: KeyCode) {
        let Some(Screen::Dashboard(session)) = self.screens.last_mut() else {
            return;
        };
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.exit(Ok(None)),
            KeyCode::Down | KeyCode::Char('j') => session.move_cursor(Direction::Next),
            KeyCode::Up | KeyCode::Char('k') => session.move_cursor(Direction::Prev),
            KeyCode::Enter => {
                if let Some(target) = session.open_selected() {
                    self.push_instance(target);
                }
            }
            _ => {}
        }
    }

    fn on_selector_key(&mut self, code: KeyCode) {
        let Some(Screen::Selector {
            session,
            open_on_confirm,
        }) = self.screens.last_mut()
        else {
            return;
        };
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                session.cancel();
                self.exit(Ok(None));
            }
            KeyCode::Down | KeyCode::Char('j') => session.move_cursor(Direction::Next),
            KeyCode::Up | KeyCode::Char('k') => session.move_cursor(Direction::Prev),
            KeyCode::Enter => {
                if session.tables().selected().is_none() {
                    return;
                }
                let open_on_confirm = *open_on_confirm;
                let target = session.confirm();
                match (target, open_on_confirm) {
                    (Some(target), true) => {
                        self.screens.pop();
                        self.push_instance(target);
                        if self.screens.is_empty() {
                            let reason = self.message.take().unwrap_or_default();
                            self.exit(Err(anyhow::anyhow!(reason)));
                        }
                    }
                    (target, _) => self.exit(Ok(target)),
                }
            }
            _ => {}
        }
    }

    fn on_instance_key(&mut self, code: KeyCode) {
        let Some(Screen::Instance(session)) = self.screens.last_mut() else {
            return;
        };
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.close_instance(),
            KeyCode::Down | KeyCode::Char('j') => session.select_next(),
            KeyCode::Up | KeyCode::Char('k') => session.select_prev(),
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right => {
                session.toggle_expanded()
            }
            KeyCode::Char('s') => session.stop(),
            KeyCode::Char('r') => {
                session.retry();
            }
            _ => {}
        }
    }

    fn push_instance(&mut self, target: InstanceTarget) {
        let instance_id = target.instance_id().clone();
        match InstanceSession::open(Arc::clone(&self.provider), target, self.bridge_capacity) {
            Ok(session) => self.screens.push(Screen::Instance(session)),
            Err(e) => {
                tracing::warn!(instance = %instance_id, error = %e, "cannot open instance screen");
                self.message = Some(format!("Cannot open {}: {}", instance_id, e));
                if let Some(Screen::Dashboard(dashboard)) = self.screens.last_mut() {
                    dashboard.on_detail_closed();
                }
            }
        }
    }

    fn close_instance(&mut self) {
        if let Some(Screen::Instance(mut session)) = self.screens.pop() {
            session.detach();
        }
        match self.screens.last_mut() {
            Some(Screen::Dashboard(dashboard)) => dashboard.on_detail_closed(),
            Some(_) => {}
            None => self.exit(Ok(None)),
        }
    }

    fn exit(&mut self, outcome: Result<Option<InstanceTarget>>) {
        if self.outcome.is_none() {
            self.outcome = Some(outcome);
        }
    }

    /// Release every subscription still held by the stack.
    pub fn shutdown(&mut self) {
        while let Some(screen) = self.screens.pop() {
            match screen {
                Screen::Dashboard(mut session) => session.detach(),
                Screen::Selector { mut session, .. } => {
                    session.cancel();
                }
                Screen::Instance(mut session) => session.detach(),
            }
        }
    }
}
