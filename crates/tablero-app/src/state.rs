// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{FormKind, ScreenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmKind {
    DeleteOne,
    DeleteSelected,
    DeleteFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Nav,
    FilterEdit,
    Form(FormKind),
    Confirm(ConfirmKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub active_screen: ScreenKind,
    pub include_disabled: bool,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Nav,
            active_screen: ScreenKind::Users,
            include_disabled: false,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextScreen,
    PrevScreen,
    EnterFilterEdit,
    ExitToNav,
    OpenForm(FormKind),
    OpenConfirm(ConfirmKind),
    ToggleDisabled,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    ScreenChanged(ScreenKind),
    DisabledFilterChanged(bool),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextScreen => self.rotate_screen(1),
            AppCommand::PrevScreen => self.rotate_screen(-1),
            AppCommand::EnterFilterEdit => {
                self.mode = AppMode::FilterEdit;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ExitToNav => {
                self.mode = AppMode::Nav;
                vec![AppEvent::ModeChanged(self.mode), self.set_status("nav")]
            }
            AppCommand::OpenForm(kind) => {
                self.mode = AppMode::Form(kind);
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::OpenConfirm(kind) => {
                self.mode = AppMode::Confirm(kind);
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ToggleDisabled => {
                self.include_disabled = !self.include_disabled;
                let label = if self.include_disabled {
                    "disabled shown"
                } else {
                    "disabled hidden"
                };
                vec![
                    AppEvent::DisabledFilterChanged(self.include_disabled),
                    self.set_status(label),
                ]
            }
            AppCommand::SetStatus(message) => {
                vec![self.set_status(&message)]
            }
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn rotate_screen(&mut self, delta: isize) -> Vec<AppEvent> {
        let screens = ScreenKind::ALL;
        let current = screens
            .iter()
            .position(|screen| *screen == self.active_screen)
            .unwrap_or(0) as isize;
        let len = screens.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.active_screen = screens[next];
        vec![AppEvent::ScreenChanged(self.active_screen)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, AppMode, AppState, ConfirmKind};
    use crate::{FormKind, ScreenKind};

    #[test]
    fn screen_rotation_wraps() {
        let mut state = AppState {
            active_screen: ScreenKind::Settings,
            ..AppState::default()
        };

        let events = state.dispatch(AppCommand::NextScreen);
        assert_eq!(state.active_screen, ScreenKind::Users);
        assert_eq!(events, vec![AppEvent::ScreenChanged(ScreenKind::Users)]);

        state.dispatch(AppCommand::PrevScreen);
        assert_eq!(state.active_screen, ScreenKind::Settings);
    }

    #[test]
    fn toggle_disabled_updates_status() {
        let mut state = AppState::default();

        let events = state.dispatch(AppCommand::ToggleDisabled);
        assert!(state.include_disabled);
        assert_eq!(
            events,
            vec![
                AppEvent::DisabledFilterChanged(true),
                AppEvent::StatusUpdated("disabled shown".to_owned()),
            ],
        );
    }

    #[test]
    fn mode_transitions() {
        let mut state = AppState::default();

        state.dispatch(AppCommand::EnterFilterEdit);
        assert_eq!(state.mode, AppMode::FilterEdit);

        state.dispatch(AppCommand::OpenForm(FormKind::Post));
        assert_eq!(state.mode, AppMode::Form(FormKind::Post));

        state.dispatch(AppCommand::OpenConfirm(ConfirmKind::DeleteSelected));
        assert_eq!(state.mode, AppMode::Confirm(ConfirmKind::DeleteSelected));

        state.dispatch(AppCommand::ExitToNav);
        assert_eq!(state.mode, AppMode::Nav);
    }
}
