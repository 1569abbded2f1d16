// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing::{info, warn};

use crate::grid::{self, CommitOutcome, EditSlot, GridState};
use crate::{
    CITY_OPTIONS, CardId, ClockIds, FeeField, FeeScope, GridRef, IdSource, RecordId, ScopeError,
    TabForm, TabFormKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Browse,
    Edit,
    Form(TabFormKind),
    Confirm,
}

/// A destructive action waiting for a yes/no answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingRemoval {
    Tab { name: String },
    Card { tab: String, card: CardId },
    Row { grid: GridRef, record: RecordId },
}

impl PendingRemoval {
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Tab { .. } => "Remove this tab?",
            Self::Card { .. } => {
                "Remove this card? All service fees in this card will be deleted."
            }
            Self::Row { .. } => "Delete this row?",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    NextTab,
    PrevTab,
    SelectTab(String),
    OpenTabForm(TabFormKind),
    CloseForm,
    SubmitTab(TabForm),
    RequestRemoval(PendingRemoval),
    Confirm,
    Cancel,
    AddCard {
        tab: String,
    },
    AddRow(GridRef),
    EnterEdit {
        grid: GridRef,
        record: RecordId,
        field: FeeField,
    },
    CommitEdit {
        grid: GridRef,
        record: RecordId,
        field: FeeField,
        raw: String,
    },
    CancelEdit,
    SetCurrency {
        grid: GridRef,
        currency: String,
    },
    ToggleCity {
        tab: String,
        card: CardId,
        city: String,
    },
    MarkSaved,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    ActiveTabChanged(Option<String>),
    TabAdded(String),
    TabRemoved(String),
    CardAdded { tab: String, card: CardId },
    CardRemoved { tab: String, card: CardId },
    RowAdded { grid: GridRef, record: RecordId },
    RowRemoved { grid: GridRef, record: RecordId },
    RecordsChanged(GridRef),
    EditStarted { record: RecordId, field: FeeField },
    EditDiscarded { record: RecordId, field: FeeField },
    EditClosed,
    ConfirmRequested(PendingRemoval),
    CurrencyChanged(GridRef),
    CitiesChanged { tab: String, card: CardId },
    StatusUpdated(String),
    StatusCleared,
}

/// Owner of the whole scope. `dispatch` is the only writer: each command
/// swaps in a new root and reports what changed.
#[derive(Debug, Clone)]
pub struct AppState<I = ClockIds> {
    scope: FeeScope,
    grid: GridState,
    pending: Option<PendingRemoval>,
    ids: I,
    pub mode: AppMode,
    pub status_line: Option<String>,
}

impl AppState<ClockIds> {
    pub fn new(scope: FeeScope) -> Self {
        Self::with_ids(scope, ClockIds::new())
    }
}

impl<I> AppState<I> {
    pub fn scope(&self) -> &FeeScope {
        &self.scope
    }

    pub fn edit_slot(&self) -> &EditSlot {
        self.grid.slot()
    }

    pub fn pending(&self) -> Option<&PendingRemoval> {
        self.pending.as_ref()
    }
}

impl<I: IdSource> AppState<I> {
    pub fn with_ids(scope: FeeScope, ids: I) -> Self {
        Self {
            scope,
            grid: GridState::default(),
            pending: None,
            ids,
            mode: AppMode::Browse,
            status_line: None,
        }
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextTab => self.rotate_tab(1),
            AppCommand::PrevTab => self.rotate_tab(-1),
            AppCommand::SelectTab(name) => match self.scope.set_active(&name) {
                Ok(next) => {
                    self.scope = next;
                    vec![AppEvent::ActiveTabChanged(Some(name))]
                }
                Err(error) => vec![self.reject(error)],
            },
            AppCommand::OpenTabForm(kind) => self.set_mode(AppMode::Form(kind)),
            AppCommand::CloseForm => self.set_mode(AppMode::Browse),
            AppCommand::SubmitTab(form) => self.submit_tab(form),
            AppCommand::RequestRemoval(removal) => {
                self.pending = Some(removal.clone());
                let mut events = self.set_mode(AppMode::Confirm);
                events.push(AppEvent::ConfirmRequested(removal));
                events
            }
            AppCommand::Confirm => self.confirm_removal(),
            AppCommand::Cancel => {
                self.pending = None;
                self.set_mode(AppMode::Browse)
            }
            AppCommand::AddCard { tab } => match self.scope.add_card(&tab, &mut self.ids) {
                Ok((next, card)) => {
                    self.scope = next;
                    vec![
                        AppEvent::CardAdded { tab, card },
                        self.set_status("card added"),
                    ]
                }
                Err(error) => vec![self.reject(error)],
            },
            AppCommand::AddRow(grid) => self.add_row(grid),
            AppCommand::EnterEdit {
                grid,
                record,
                field,
            } => {
                if let Err(error) = self.scope.records(&grid) {
                    return vec![self.reject(error)];
                }
                let mut events = Vec::new();
                if let EditSlot::Editing {
                    record: previous,
                    field: previous_field,
                } = self.grid.enter_edit(record.clone(), field)
                {
                    events.push(AppEvent::EditDiscarded {
                        record: previous,
                        field: previous_field,
                    });
                }
                events.push(AppEvent::EditStarted { record, field });
                events.extend(self.set_mode(AppMode::Edit));
                events
            }
            AppCommand::CommitEdit {
                grid,
                record,
                field,
                raw,
            } => self.commit_edit(grid, &record, field, &raw),
            AppCommand::CancelEdit => {
                let mut events = Vec::new();
                if self.grid.cancel() {
                    events.push(AppEvent::EditClosed);
                }
                if self.mode == AppMode::Edit {
                    events.extend(self.set_mode(AppMode::Browse));
                }
                events
            }
            AppCommand::SetCurrency { grid, currency } => {
                match self.scope.set_currency(&grid, currency.trim()) {
                    Ok(next) => {
                        self.scope = next;
                        vec![AppEvent::CurrencyChanged(grid)]
                    }
                    Err(error) => vec![self.reject(error)],
                }
            }
            AppCommand::ToggleCity { tab, card, city } => {
                if !CITY_OPTIONS.iter().any(|(code, _)| *code == city) {
                    return vec![self.set_status(&format!("unknown city {city:?}"))];
                }
                match self.scope.toggle_city(&tab, &card, &city) {
                    Ok(next) => {
                        self.scope = next;
                        vec![AppEvent::CitiesChanged { tab, card }]
                    }
                    Err(error) => vec![self.reject(error)],
                }
            }
            AppCommand::MarkSaved => vec![self.set_status("data saved")],
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn rotate_tab(&mut self, delta: isize) -> Vec<AppEvent> {
        let tabs = self.scope.tabs();
        if tabs.is_empty() {
            return Vec::new();
        }
        let current = self
            .scope
            .active_name()
            .and_then(|name| tabs.iter().position(|tab| tab.name == name))
            .unwrap_or(0) as isize;
        let len = tabs.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        let name = tabs[next].name.clone();
        match self.scope.set_active(&name) {
            Ok(scope) => {
                self.scope = scope;
                vec![AppEvent::ActiveTabChanged(Some(name))]
            }
            Err(error) => vec![self.reject(error)],
        }
    }

    fn submit_tab(&mut self, form: TabForm) -> Vec<AppEvent> {
        let kind = form.kind();
        let tab = match form.into_tab() {
            Ok(tab) => tab,
            Err(error) => return vec![self.set_status(&error.to_string())],
        };
        let name = tab.name.clone();
        match self.scope.add_tab(tab) {
            Ok(next) => {
                self.scope = next;
                info!(tab = %name, "tab added");
                let mut events = vec![
                    AppEvent::TabAdded(name.clone()),
                    AppEvent::ActiveTabChanged(Some(name)),
                ];
                events.extend(self.set_mode(AppMode::Browse));
                events.push(self.set_status("tab added"));
                events
            }
            Err(ScopeError::DuplicateTab(_)) => {
                let message = match kind {
                    TabFormKind::Named => "tab with this name already exists",
                    TabFormKind::Route => "tab with this country combination already exists",
                };
                warn!(tab = %name, "duplicate tab rejected");
                vec![self.set_status(message)]
            }
            Err(error) => vec![self.reject(error)],
        }
    }

    fn confirm_removal(&mut self) -> Vec<AppEvent> {
        let Some(removal) = self.pending.take() else {
            return Vec::new();
        };
        let mut events = self.set_mode(AppMode::Browse);
        match removal {
            PendingRemoval::Tab { name } => {
                let was_active = self.scope.active_name() == Some(name.as_str());
                match self.scope.remove_tab(&name) {
                    Ok(next) => {
                        self.scope = next;
                        events.push(AppEvent::TabRemoved(name));
                        if was_active {
                            events.push(AppEvent::ActiveTabChanged(
                                self.scope.active_name().map(str::to_owned),
                            ));
                        }
                        events.push(self.set_status("tab removed"));
                    }
                    Err(error) => events.push(self.reject(error)),
                }
            }
            PendingRemoval::Card { tab, card } => match self.scope.remove_card(&tab, &card) {
                Ok(next) => {
                    self.scope = next;
                    events.push(AppEvent::CardRemoved { tab, card });
                    events.push(self.set_status("card removed"));
                }
                Err(error) => events.push(self.reject(error)),
            },
            PendingRemoval::Row { grid, record } => {
                let remaining = self
                    .scope
                    .records(&grid)
                    .ok()
                    .and_then(|records| grid::remove_row(records, &record));
                // Unknown rows drop silently, the same as a stale commit.
                if let Some(records) = remaining
                    && let Ok(next) = self.scope.replace_records(&grid, records)
                {
                    self.scope = next;
                    events.push(AppEvent::RowRemoved { grid, record });
                }
            }
        }
        events
    }

    fn add_row(&mut self, grid: GridRef) -> Vec<AppEvent> {
        let records = match self.scope.records(&grid) {
            Ok(records) => grid::add_row(records, &mut self.ids),
            Err(error) => return vec![self.reject(error)],
        };
        let Some(record) = records.last().map(|record| record.id.clone()) else {
            return Vec::new();
        };
        match self.scope.replace_records(&grid, records) {
            Ok(next) => {
                self.scope = next;
                vec![AppEvent::RowAdded { grid, record }]
            }
            Err(error) => vec![self.reject(error)],
        }
    }

    fn commit_edit(
        &mut self,
        grid: GridRef,
        record: &RecordId,
        field: FeeField,
        raw: &str,
    ) -> Vec<AppEvent> {
        let outcome = match self.scope.records(&grid) {
            Ok(records) => self.grid.commit(records, record, field, raw),
            Err(error) => {
                self.grid.cancel();
                let mut events = self.leave_edit_mode();
                events.push(self.reject(error));
                return events;
            }
        };

        match outcome {
            CommitOutcome::Ignored => Vec::new(),
            CommitOutcome::Dropped => {
                let mut events = vec![AppEvent::EditClosed];
                events.extend(self.leave_edit_mode());
                events
            }
            CommitOutcome::Applied { records, coerced } => {
                let mut events = match self.scope.replace_records(&grid, records) {
                    Ok(next) => {
                        self.scope = next;
                        vec![AppEvent::RecordsChanged(grid), AppEvent::EditClosed]
                    }
                    Err(error) => vec![self.reject(error), AppEvent::EditClosed],
                };
                events.extend(self.leave_edit_mode());
                if coerced {
                    events.push(self.set_status(&format!(
                        "{} is not a number; stored 0",
                        field.label().to_ascii_lowercase()
                    )));
                }
                events
            }
        }
    }

    fn leave_edit_mode(&mut self) -> Vec<AppEvent> {
        if self.mode == AppMode::Edit {
            self.set_mode(AppMode::Browse)
        } else {
            Vec::new()
        }
    }

    fn set_mode(&mut self, mode: AppMode) -> Vec<AppEvent> {
        if self.mode == mode {
            return Vec::new();
        }
        self.mode = mode;
        vec![AppEvent::ModeChanged(mode)]
    }

    fn reject(&mut self, error: ScopeError) -> AppEvent {
        warn!(%error, "command rejected");
        self.set_status(&error.to_string())
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
