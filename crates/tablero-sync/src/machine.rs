// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

// Fetch lifecycle of one list screen:
// idle -> loading(initial) -> ready <-> loading(next page).
// A failed load always lands back in Ready with whatever rows were
// already materialized; pagination simply stops until retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListPhase {
    #[default]
    Idle,
    LoadingInitial,
    Ready,
    LoadingNextPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    Started(ListPhase),
    Loaded,
    Failed,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListMachine {
    phase: ListPhase,
}

impl ListMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ListPhase {
        self.phase
    }

    pub fn is_fetching(&self) -> bool {
        matches!(
            self.phase,
            ListPhase::LoadingInitial | ListPhase::LoadingNextPage
        )
    }

    pub fn begin_initial(&mut self) -> PhaseEvent {
        match self.phase {
            ListPhase::LoadingInitial => PhaseEvent::Ignored,
            _ => {
                self.phase = ListPhase::LoadingInitial;
                PhaseEvent::Started(self.phase)
            }
        }
    }

    pub fn begin_next_page(&mut self) -> PhaseEvent {
        match self.phase {
            ListPhase::Ready => {
                self.phase = ListPhase::LoadingNextPage;
                PhaseEvent::Started(self.phase)
            }
            _ => PhaseEvent::Ignored,
        }
    }

    pub fn loaded(&mut self) -> PhaseEvent {
        match self.phase {
            ListPhase::LoadingInitial | ListPhase::LoadingNextPage => {
                self.phase = ListPhase::Ready;
                PhaseEvent::Loaded
            }
            _ => PhaseEvent::Ignored,
        }
    }

    pub fn failed(&mut self) -> PhaseEvent {
        match self.phase {
            ListPhase::LoadingInitial | ListPhase::LoadingNextPage => {
                self.phase = ListPhase::Ready;
                PhaseEvent::Failed
            }
            _ => PhaseEvent::Ignored,
        }
    }

    pub fn reset(&mut self) {
        self.phase = ListPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::{ListMachine, ListPhase, PhaseEvent};

    #[test]
    fn happy_path_walks_idle_loading_ready() {
        let mut machine = ListMachine::new();
        assert_eq!(machine.phase(), ListPhase::Idle);

        machine.begin_initial();
        assert_eq!(machine.phase(), ListPhase::LoadingInitial);
        assert!(machine.is_fetching());

        machine.loaded();
        assert_eq!(machine.phase(), ListPhase::Ready);

        machine.begin_next_page();
        assert_eq!(machine.phase(), ListPhase::LoadingNextPage);

        machine.loaded();
        assert_eq!(machine.phase(), ListPhase::Ready);
    }

    #[test]
    fn next_page_requires_ready() {
        let mut machine = ListMachine::new();
        assert_eq!(machine.begin_next_page(), PhaseEvent::Ignored);

        machine.begin_initial();
        assert_eq!(machine.begin_next_page(), PhaseEvent::Ignored);
    }

    #[test]
    fn failure_returns_to_ready() {
        let mut machine = ListMachine::new();
        machine.begin_initial();
        assert_eq!(machine.failed(), PhaseEvent::Failed);
        assert_eq!(machine.phase(), ListPhase::Ready);

        machine.begin_next_page();
        assert_eq!(machine.failed(), PhaseEvent::Failed);
        assert_eq!(machine.phase(), ListPhase::Ready);
    }

    #[test]
    fn loaded_outside_a_fetch_is_ignored() {
        let mut machine = ListMachine::new();
        assert_eq!(machine.loaded(), PhaseEvent::Ignored);
        assert_eq!(machine.phase(), ListPhase::Idle);
    }
}
