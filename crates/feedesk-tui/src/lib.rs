// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use feedesk_app::{
    AppCommand, AppEvent, AppMode, AppState, CITY_OPTIONS, COUNTRY_OPTIONS, CardId, FeeField,
    FeeRecord, FeeScope, FieldKind, GridRef, IdSource, PendingRemoval, RecordId, Tab, TabBody,
    TabForm, TabFormField, TabFormKind, TabLayout, country_label,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_PAGE_SIZE: usize = 10;
const SURCHARGE_COLUMN: usize = FeeField::ALL.len();
const COLUMN_COUNT: usize = FeeField::ALL.len() + 1;
const DRAFT_CARET: &str = "▏";

pub trait AppRuntime {
    fn save(&mut self, scope: &FeeScope) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiOptions {
    pub page_size: usize,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct Cursor {
    row: usize,
    col: usize,
    card: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EditorInput {
    Draft(String),
    Choice {
        options: &'static [&'static str],
        index: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CellEditor {
    grid: GridRef,
    record: RecordId,
    field: FeeField,
    input: EditorInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FormUiState {
    form: TabForm,
    field_index: usize,
    show_missing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CurrencyDraft {
    grid: GridRef,
    buffer: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CityPicker {
    tab: String,
    card: CardId,
    cursor: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ViewData {
    cursor: Cursor,
    page_size: usize,
    editor: Option<CellEditor>,
    form: Option<FormUiState>,
    currency: Option<CurrencyDraft>,
    city_picker: Option<CityPicker>,
    help_visible: bool,
    status_token: u64,
}

impl ViewData {
    fn new(options: UiOptions) -> Self {
        Self {
            cursor: Cursor::default(),
            page_size: options.page_size.max(1),
            editor: None,
            form: None,
            currency: None,
            city_picker: None,
            help_visible: false,
            status_token: 0,
        }
    }
}

enum KeyOutcome {
    Idle,
    Commit,
    Cancel,
    Submit,
}

pub fn run_app<I: IdSource, R: AppRuntime>(
    state: &mut AppState<I>,
    runtime: &mut R,
    options: UiOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(options);
    let (internal_tx, internal_rx) = mpsc::channel();
    info!(page_size = view_data.page_size, "terminal ui started");

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if !has_event {
            continue;
        }
        match event::read().context("read event") {
            Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                    break;
                }
            }
            Ok(_) => {}
            Err(error) => {
                result = Err(error);
                break;
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    info!("terminal ui stopped");
    result
}

fn process_internal_events<I: IdSource>(
    state: &mut AppState<I>,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status<I: IdSource>(
    state: &mut AppState<I>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    dispatch_and_sync(
        state,
        view_data,
        internal_tx,
        AppCommand::SetStatus(message.into()),
    );
}

/// Runs one command and moves the cursor and open editors to match the new
/// root.
fn dispatch_and_sync<I: IdSource>(
    state: &mut AppState<I>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    command: AppCommand,
) -> Vec<AppEvent> {
    let events = state.dispatch(command);
    for event in &events {
        match event {
            AppEvent::StatusUpdated(_) => {
                view_data.status_token = view_data.status_token.saturating_add(1);
                schedule_status_clear(internal_tx, view_data.status_token);
            }
            AppEvent::ActiveTabChanged(_) => {
                view_data.cursor.row = 0;
                view_data.cursor.card = 0;
            }
            AppEvent::RowAdded { grid, record } => {
                if let Ok(records) = state.scope().records(grid)
                    && let Some(index) = records.iter().position(|row| &row.id == record)
                {
                    view_data.cursor.row = index;
                }
            }
            AppEvent::CardAdded { tab, card } => {
                if let Some(tab) = state.scope().tab(tab)
                    && let Some(index) = tab.cards().iter().position(|c| &c.id == card)
                {
                    view_data.cursor.card = index;
                    view_data.cursor.row = 0;
                }
            }
            AppEvent::CardRemoved { .. } => view_data.cursor.row = 0,
            _ => {}
        }
    }

    if state.mode != AppMode::Edit {
        view_data.editor = None;
    }
    if !matches!(state.mode, AppMode::Form(_)) {
        view_data.form = None;
    }
    clamp_cursor(state, view_data);
    events
}

fn clamp_cursor<I>(state: &AppState<I>, view_data: &mut ViewData) {
    let cards = state
        .scope()
        .active_tab()
        .map_or(0, |tab| tab.cards().len());
    view_data.cursor.card = view_data.cursor.card.min(cards.saturating_sub(1));
    let rows = current_records(state, view_data).len();
    view_data.cursor.row = view_data.cursor.row.min(rows.saturating_sub(1));
    view_data.cursor.col = view_data.cursor.col.min(COLUMN_COUNT - 1);
}

fn current_grid<I>(state: &AppState<I>, view_data: &ViewData) -> Option<GridRef> {
    let tab = state.scope().active_tab()?;
    match &tab.body {
        TabBody::Fees(_) => Some(GridRef::tab(tab.name.clone())),
        TabBody::Cards(cards) => cards
            .get(view_data.cursor.card)
            .map(|card| GridRef::card(tab.name.clone(), card.id.clone())),
    }
}

fn current_records<'a, I>(state: &'a AppState<I>, view_data: &ViewData) -> &'a [FeeRecord] {
    current_grid(state, view_data)
        .and_then(|grid| state.scope().records(&grid).ok())
        .unwrap_or(&[])
}

fn handle_key_event<I: IdSource, R: AppRuntime>(
    state: &mut AppState<I>,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c'));
    }

    if view_data.help_visible {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?')) {
            view_data.help_visible = false;
        }
        return false;
    }

    match state.mode {
        AppMode::Confirm => handle_confirm_key(state, view_data, internal_tx, key),
        AppMode::Form(_) => handle_form_key(state, view_data, internal_tx, key),
        AppMode::Edit => handle_editor_key(state, view_data, internal_tx, key),
        AppMode::Browse if view_data.currency.is_some() => {
            handle_currency_key(state, view_data, internal_tx, key);
        }
        AppMode::Browse if view_data.city_picker.is_some() => {
            handle_city_picker_key(state, view_data, internal_tx, key);
        }
        AppMode::Browse => handle_browse_key(state, runtime, view_data, internal_tx, key),
    }
    false
}

fn handle_browse_key<I: IdSource, R: AppRuntime>(
    state: &mut AppState<I>,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let page = view_data.page_size;
    match key.code {
        KeyCode::Char('?') => view_data.help_visible = true,
        KeyCode::Char('f') => {
            dispatch_and_sync(state, view_data, internal_tx, AppCommand::NextTab);
        }
        KeyCode::Char('b') => {
            dispatch_and_sync(state, view_data, internal_tx, AppCommand::PrevTab);
        }
        KeyCode::Char(']') => move_card(state, view_data, 1),
        KeyCode::Char('[') => move_card(state, view_data, -1),
        KeyCode::Char('j') | KeyCode::Down => move_row(state, view_data, 1),
        KeyCode::Char('k') | KeyCode::Up => move_row(state, view_data, -1),
        KeyCode::PageDown => move_row(state, view_data, page as isize),
        KeyCode::PageUp => move_row(state, view_data, -(page as isize)),
        KeyCode::Char('g') => view_data.cursor.row = 0,
        KeyCode::Char('G') => {
            view_data.cursor.row = current_records(state, view_data).len().saturating_sub(1);
        }
        KeyCode::Char('h') | KeyCode::Left => {
            view_data.cursor.col = view_data.cursor.col.saturating_sub(1);
        }
        KeyCode::Char('l') | KeyCode::Right => {
            view_data.cursor.col = (view_data.cursor.col + 1).min(COLUMN_COUNT - 1);
        }
        KeyCode::Enter | KeyCode::Char('i') => open_cell_editor(state, view_data, internal_tx),
        KeyCode::Char('a') => {
            if let Some(grid) = require_grid(state, view_data, internal_tx) {
                dispatch_and_sync(state, view_data, internal_tx, AppCommand::AddRow(grid));
            }
        }
        KeyCode::Char('d') => {
            let Some(grid) = require_grid(state, view_data, internal_tx) else {
                return;
            };
            let Some(record) = current_records(state, view_data)
                .get(view_data.cursor.row)
                .map(|record| record.id.clone())
            else {
                emit_status(state, view_data, internal_tx, "no row to delete");
                return;
            };
            dispatch_and_sync(
                state,
                view_data,
                internal_tx,
                AppCommand::RequestRemoval(PendingRemoval::Row { grid, record }),
            );
        }
        KeyCode::Char('T') => open_tab_form(state, view_data, internal_tx, TabFormKind::Named),
        KeyCode::Char('R') => open_tab_form(state, view_data, internal_tx, TabFormKind::Route),
        KeyCode::Char('X') => {
            let Some(name) = state.scope().active_name().map(str::to_owned) else {
                emit_status(state, view_data, internal_tx, "no tab to remove");
                return;
            };
            dispatch_and_sync(
                state,
                view_data,
                internal_tx,
                AppCommand::RequestRemoval(PendingRemoval::Tab { name }),
            );
        }
        KeyCode::Char('C') => {
            let Some(tab) = active_card_tab(state) else {
                emit_status(state, view_data, internal_tx, "cards live on route tabs (R)");
                return;
            };
            dispatch_and_sync(state, view_data, internal_tx, AppCommand::AddCard { tab });
        }
        KeyCode::Char('D') => {
            let Some(GridRef {
                tab,
                card: Some(card),
            }) = current_grid(state, view_data)
            else {
                emit_status(state, view_data, internal_tx, "no card to remove");
                return;
            };
            dispatch_and_sync(
                state,
                view_data,
                internal_tx,
                AppCommand::RequestRemoval(PendingRemoval::Card { tab, card }),
            );
        }
        KeyCode::Char('c') => {
            let Some(grid) = require_grid(state, view_data, internal_tx) else {
                return;
            };
            let buffer = state.scope().currency(&grid).unwrap_or_default().to_owned();
            view_data.currency = Some(CurrencyDraft { grid, buffer });
        }
        KeyCode::Char('m') => {
            let Some(GridRef {
                tab,
                card: Some(card),
            }) = current_grid(state, view_data)
            else {
                emit_status(state, view_data, internal_tx, "cities belong to cards");
                return;
            };
            view_data.city_picker = Some(CityPicker {
                tab,
                card,
                cursor: 0,
            });
        }
        KeyCode::Char('s') => save_scope(state, runtime, view_data, internal_tx),
        _ => {}
    }
}

fn active_card_tab<I>(state: &AppState<I>) -> Option<String> {
    state
        .scope()
        .active_tab()
        .filter(|tab| tab.body.layout() == TabLayout::Cards)
        .map(|tab| tab.name.clone())
}

fn require_grid<I: IdSource>(
    state: &mut AppState<I>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) -> Option<GridRef> {
    if let Some(grid) = current_grid(state, view_data) {
        return Some(grid);
    }
    let message = if active_card_tab(state).is_some() {
        "add a card first (C)"
    } else {
        "add a tab first (T named, R route)"
    };
    emit_status(state, view_data, internal_tx, message);
    None
}

fn move_row<I>(state: &AppState<I>, view_data: &mut ViewData, delta: isize) {
    let rows = current_records(state, view_data).len();
    if rows == 0 {
        view_data.cursor.row = 0;
        return;
    }
    let next = view_data.cursor.row as isize + delta;
    view_data.cursor.row = next.clamp(0, rows as isize - 1) as usize;
}

fn move_card<I>(state: &AppState<I>, view_data: &mut ViewData, delta: isize) {
    let cards = state
        .scope()
        .active_tab()
        .map_or(0, |tab| tab.cards().len());
    if cards == 0 {
        return;
    }
    let next = (view_data.cursor.card as isize + delta).rem_euclid(cards as isize) as usize;
    if next != view_data.cursor.card {
        view_data.cursor.card = next;
        view_data.cursor.row = 0;
    }
}

fn open_cell_editor<I: IdSource>(
    state: &mut AppState<I>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(grid) = require_grid(state, view_data, internal_tx) else {
        return;
    };
    let Some(field) = FeeField::ALL.get(view_data.cursor.col).copied() else {
        emit_status(state, view_data, internal_tx, "surcharges are read-only");
        return;
    };
    let Some(record) = current_records(state, view_data).get(view_data.cursor.row) else {
        emit_status(state, view_data, internal_tx, "no row to edit -- press a to add one");
        return;
    };

    let current = record.raw_value(field);
    let input = match field.kind() {
        FieldKind::Select(options) => EditorInput::Choice {
            options,
            index: options
                .iter()
                .position(|option| *option == current)
                .unwrap_or(0),
        },
        FieldKind::Number | FieldKind::Text => EditorInput::Draft(current),
    };
    let editor = CellEditor {
        grid: grid.clone(),
        record: record.id.clone(),
        field,
        input,
    };

    dispatch_and_sync(
        state,
        view_data,
        internal_tx,
        AppCommand::EnterEdit {
            grid,
            record: editor.record.clone(),
            field,
        },
    );
    if state.mode == AppMode::Edit {
        view_data.editor = Some(editor);
    }
}

fn handle_editor_key<I: IdSource>(
    state: &mut AppState<I>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let outcome = match view_data.editor.as_mut().map(|editor| &mut editor.input) {
        None => KeyOutcome::Cancel,
        Some(EditorInput::Draft(buffer)) => match key.code {
            KeyCode::Enter | KeyCode::Tab | KeyCode::BackTab | KeyCode::Esc => KeyOutcome::Commit,
            KeyCode::Backspace => {
                buffer.pop();
                KeyOutcome::Idle
            }
            KeyCode::Char(ch) => {
                buffer.push(ch);
                KeyOutcome::Idle
            }
            _ => KeyOutcome::Idle,
        },
        Some(EditorInput::Choice { options, index }) => {
            let len = options.len().max(1);
            match key.code {
                KeyCode::Left | KeyCode::Char('h') => {
                    *index = (*index + len - 1) % len;
                    KeyOutcome::Idle
                }
                KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => {
                    *index = (*index + 1) % len;
                    KeyOutcome::Idle
                }
                KeyCode::Enter => KeyOutcome::Commit,
                KeyCode::Esc | KeyCode::Tab | KeyCode::BackTab => KeyOutcome::Cancel,
                _ => KeyOutcome::Idle,
            }
        }
    };

    match outcome {
        KeyOutcome::Commit => commit_editor(state, view_data, internal_tx),
        KeyOutcome::Cancel => {
            view_data.editor = None;
            dispatch_and_sync(state, view_data, internal_tx, AppCommand::CancelEdit);
        }
        KeyOutcome::Idle | KeyOutcome::Submit => {}
    }
}

fn commit_editor<I: IdSource>(
    state: &mut AppState<I>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(editor) = view_data.editor.take() else {
        return;
    };
    let raw = match editor.input {
        EditorInput::Draft(buffer) => buffer,
        EditorInput::Choice { options, index } => options
            .get(index)
            .map(|option| (*option).to_owned())
            .unwrap_or_default(),
    };
    debug!(field = editor.field.key(), "committing cell edit");
    dispatch_and_sync(
        state,
        view_data,
        internal_tx,
        AppCommand::CommitEdit {
            grid: editor.grid,
            record: editor.record,
            field: editor.field,
            raw,
        },
    );
}

fn open_tab_form<I: IdSource>(
    state: &mut AppState<I>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    kind: TabFormKind,
) {
    dispatch_and_sync(
        state,
        view_data,
        internal_tx,
        AppCommand::OpenTabForm(kind),
    );
    view_data.form = Some(FormUiState {
        form: TabForm::blank_for(kind),
        field_index: 0,
        show_missing: false,
    });
}

fn handle_form_key<I: IdSource>(
    state: &mut AppState<I>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let outcome = match view_data.form.as_mut() {
        None => KeyOutcome::Cancel,
        Some(form_ui) => {
            let fields = form_ui.form.fields();
            let index = form_ui.field_index.min(fields.len() - 1);
            let field = fields[index];
            match key.code {
                KeyCode::Esc => KeyOutcome::Cancel,
                KeyCode::Enter => KeyOutcome::Submit,
                KeyCode::Tab | KeyCode::Down => {
                    form_ui.field_index = (index + 1) % fields.len();
                    KeyOutcome::Idle
                }
                KeyCode::BackTab | KeyCode::Up => {
                    form_ui.field_index = (index + fields.len() - 1) % fields.len();
                    KeyOutcome::Idle
                }
                KeyCode::Left | KeyCode::Right if field.is_choice() => {
                    let delta = if key.code == KeyCode::Left { -1 } else { 1 };
                    cycle_country(&mut form_ui.form, field, delta);
                    KeyOutcome::Idle
                }
                KeyCode::Backspace if !field.is_choice() => {
                    if let Some(value) = form_ui.form.value_mut(field) {
                        value.pop();
                    }
                    KeyOutcome::Idle
                }
                KeyCode::Char(ch) if !field.is_choice() => {
                    if let Some(value) = form_ui.form.value_mut(field) {
                        value.push(ch);
                    }
                    KeyOutcome::Idle
                }
                _ => KeyOutcome::Idle,
            }
        }
    };

    match outcome {
        KeyOutcome::Cancel => {
            view_data.form = None;
            dispatch_and_sync(state, view_data, internal_tx, AppCommand::CloseForm);
        }
        KeyOutcome::Submit => submit_form(state, view_data, internal_tx),
        KeyOutcome::Idle | KeyOutcome::Commit => {}
    }
}

fn cycle_country(form: &mut TabForm, field: TabFormField, delta: isize) {
    let Some(value) = form.value_mut(field) else {
        return;
    };
    let len = COUNTRY_OPTIONS.len() as isize;
    let next = match COUNTRY_OPTIONS
        .iter()
        .position(|(code, _)| *code == value.as_str())
    {
        Some(current) => (current as isize + delta).rem_euclid(len),
        None if delta < 0 => len - 1,
        None => 0,
    };
    *value = COUNTRY_OPTIONS[next as usize].0.to_owned();
}

fn submit_form<I: IdSource>(
    state: &mut AppState<I>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(form_ui) = view_data.form.as_mut() else {
        return;
    };
    form_ui.show_missing = true;
    let form = form_ui.form.clone();
    let missing = form.missing_field();

    dispatch_and_sync(state, view_data, internal_tx, AppCommand::SubmitTab(form));

    if let Some(form_ui) = view_data.form.as_mut()
        && let Some(missing) = missing
        && let Some(index) = form_ui.form.fields().iter().position(|f| *f == missing)
    {
        form_ui.field_index = index;
    }
}

fn handle_confirm_key<I: IdSource>(
    state: &mut AppState<I>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let command = match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => AppCommand::Confirm,
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => AppCommand::Cancel,
        _ => return,
    };
    dispatch_and_sync(state, view_data, internal_tx, command);
}

fn handle_currency_key<I: IdSource>(
    state: &mut AppState<I>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(draft) = view_data.currency.as_mut() else {
        return;
    };
    match key.code {
        KeyCode::Esc => view_data.currency = None,
        KeyCode::Backspace => {
            draft.buffer.pop();
        }
        KeyCode::Char(ch) => draft.buffer.push(ch.to_ascii_uppercase()),
        KeyCode::Enter => {
            if draft.buffer.trim().is_empty() {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    "currency is required -- type a code like VND",
                );
                return;
            }
            let Some(draft) = view_data.currency.take() else {
                return;
            };
            dispatch_and_sync(
                state,
                view_data,
                internal_tx,
                AppCommand::SetCurrency {
                    grid: draft.grid,
                    currency: draft.buffer,
                },
            );
        }
        _ => {}
    }
}

fn handle_city_picker_key<I: IdSource>(
    state: &mut AppState<I>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(picker) = view_data.city_picker.as_mut() else {
        return;
    };
    let last = CITY_OPTIONS.len() - 1;
    match key.code {
        KeyCode::Esc | KeyCode::Char('m') => view_data.city_picker = None,
        KeyCode::Char('j') | KeyCode::Down => picker.cursor = (picker.cursor + 1).min(last),
        KeyCode::Char('k') | KeyCode::Up => picker.cursor = picker.cursor.saturating_sub(1),
        KeyCode::Char(' ') | KeyCode::Enter => {
            let command = AppCommand::ToggleCity {
                tab: picker.tab.clone(),
                card: picker.card.clone(),
                city: CITY_OPTIONS[picker.cursor.min(last)].0.to_owned(),
            };
            dispatch_and_sync(state, view_data, internal_tx, command);
        }
        _ => {}
    }
}

fn save_scope<I: IdSource, R: AppRuntime>(
    state: &mut AppState<I>,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    match runtime.save(state.scope()) {
        Ok(()) => {
            dispatch_and_sync(state, view_data, internal_tx, AppCommand::MarkSaved);
        }
        Err(error) => {
            warn!(error = %format!("{error:#}"), "save failed");
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("save failed: {error:#}"),
            );
        }
    }
}

fn tab_title(tab: &Tab) -> String {
    match &tab.body {
        TabBody::Fees(fees) => format!(" {} ({}) ", tab.name, fees.len()),
        TabBody::Cards(cards) => format!(" {} [{} cards] ", tab.name, cards.len()),
    }
}

fn render<I>(frame: &mut ratatui::Frame<'_>, state: &AppState<I>, view_data: &ViewData) {
    let active = state.scope().active_tab();
    let card_strip_height = match active.map(|tab| tab.body.layout()) {
        Some(TabLayout::Cards) => 3,
        _ => 0,
    };
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(card_strip_height),
            Constraint::Min(1),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let tabs = state.scope().tabs();
    if tabs.is_empty() {
        let empty = Paragraph::new(" no tabs ")
            .block(Block::default().title("feedesk").borders(Borders::ALL));
        frame.render_widget(empty, layout[0]);
    } else {
        let selected = state
            .scope()
            .active_name()
            .and_then(|name| tabs.iter().position(|tab| tab.name == name))
            .unwrap_or(0);
        let titles = tabs.iter().map(tab_title).collect::<Vec<String>>();
        let tab_bar = Tabs::new(titles)
            .block(Block::default().title("feedesk").borders(Borders::ALL))
            .style(Style::default().fg(Color::White))
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .select(selected);
        frame.render_widget(tab_bar, layout[0]);
    }

    if let Some(tab) = active.filter(|tab| tab.body.layout() == TabLayout::Cards) {
        let strip = Paragraph::new(card_strip_line(tab, view_data.cursor.card))
            .block(Block::default().title(route_title(tab)).borders(Borders::ALL));
        frame.render_widget(strip, layout[1]);
    }

    render_table(frame, layout[2], state, view_data);

    let status = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, layout[3]);

    if let Some(form_ui) = &view_data.form {
        let area = centered_rect(56, 40, frame.area());
        frame.render_widget(Clear, area);
        let title = match form_ui.form.kind() {
            TabFormKind::Named => "add tab",
            TabFormKind::Route => "add route tab",
        };
        let form = Paragraph::new(render_form_text(form_ui))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(form, area);
    }

    if let Some(pending) = state.pending() {
        let area = centered_rect(50, 20, frame.area());
        frame.render_widget(Clear, area);
        let prompt = Paragraph::new(format!("{}\n\ny confirm | n cancel", pending.prompt()))
            .block(
                Block::default()
                    .title("confirm")
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Red)),
            );
        frame.render_widget(prompt, area);
    }

    if let Some(draft) = &view_data.currency {
        let area = centered_rect(40, 20, frame.area());
        frame.render_widget(Clear, area);
        let editor = Paragraph::new(format!(
            "currency: {}{DRAFT_CARET}\n\nenter apply | esc cancel",
            draft.buffer
        ))
        .block(Block::default().title("currency").borders(Borders::ALL));
        frame.render_widget(editor, area);
    }

    if let Some(picker) = &view_data.city_picker {
        let area = centered_rect(40, 60, frame.area());
        frame.render_widget(Clear, area);
        let cities = state
            .scope()
            .tab(&picker.tab)
            .and_then(|tab| tab.card(&picker.card))
            .map(|card| &card.cities);
        let text = render_city_picker_text(picker.cursor, |code| {
            cities.is_some_and(|cities| cities.contains(code))
        });
        let list = Paragraph::new(text)
            .block(Block::default().title("cities").borders(Borders::ALL));
        frame.render_widget(list, area);
    }

    if view_data.help_visible {
        let area = centered_rect(76, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn route_title(tab: &Tab) -> String {
    let describe = |code: &Option<String>| {
        code.as_deref()
            .map(|code| country_label(code).unwrap_or(code))
            .unwrap_or("?")
            .to_owned()
    };
    format!(
        "cards | {} -> {}",
        describe(&tab.from_country),
        describe(&tab.to_country)
    )
}

fn card_strip_line(tab: &Tab, selected: usize) -> Line<'static> {
    let cards = tab.cards();
    if cards.is_empty() {
        return Line::from(" no cards -- press C to add one ");
    }
    let spans = cards
        .iter()
        .enumerate()
        .map(|(index, card)| {
            let label = format!(" #{} {} [{}] ", index + 1, card.cities_label(), card.currency);
            let style = if index == selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Span::styled(label, style)
        })
        .collect::<Vec<_>>();
    Line::from(spans)
}

fn render_table<I>(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState<I>,
    view_data: &ViewData,
) {
    let Some(grid) = current_grid(state, view_data) else {
        let message = match state.scope().active_tab() {
            None => "no tabs -- press T for a named tab or R for a route tab",
            Some(_) => "no cards -- press C to add one",
        };
        let empty = Paragraph::new(message).block(Block::default().borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    };

    let records = state.scope().records(&grid).unwrap_or(&[]);
    let currency = state.scope().currency(&grid).unwrap_or_default();
    let title = table_title(&grid, state, records.len(), view_data);
    if records.is_empty() {
        let empty = Paragraph::new("no service fees -- press a to add a row")
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(empty, area);
        return;
    }

    let header = Row::new((0..COLUMN_COUNT).map(|column| {
        Cell::from(column_label(column, currency)).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let (start, end) = page_bounds(records.len(), view_data.cursor.row, view_data.page_size);
    let rows = records[start..end]
        .iter()
        .enumerate()
        .map(|(offset, record)| {
            let selected_row = start + offset == view_data.cursor.row;
            let cells = (0..COLUMN_COUNT)
                .map(|column| {
                    let mut style = Style::default();
                    if selected_row {
                        style = style.bg(Color::DarkGray);
                    }
                    if selected_row && column == view_data.cursor.col {
                        style = Style::default()
                            .fg(Color::Black)
                            .bg(Color::Cyan)
                            .add_modifier(Modifier::BOLD);
                    }
                    Cell::from(cell_text(record, column, view_data.editor.as_ref())).style(style)
                })
                .collect::<Vec<_>>();
            Row::new(cells)
        })
        .collect::<Vec<_>>();

    let widths = (0..COLUMN_COUNT)
        .map(|column| {
            let label_width = column_label(column, currency).chars().count();
            Constraint::Min(label_width.max(8) as u16)
        })
        .collect::<Vec<_>>();
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn table_title<I>(
    grid: &GridRef,
    state: &AppState<I>,
    rows: usize,
    view_data: &ViewData,
) -> String {
    let page_size = view_data.page_size.max(1);
    let pages = rows.div_ceil(page_size).max(1);
    let page = view_data.cursor.row / page_size + 1;
    let location = match &grid.card {
        None => grid.tab.clone(),
        Some(card) => {
            let cities = state
                .scope()
                .tab(&grid.tab)
                .and_then(|tab| tab.card(card))
                .map(|card| card.cities_label())
                .unwrap_or_default();
            format!("{} > {cities}", grid.tab)
        }
    };
    format!("{location} | {rows} rows | page {page}/{pages}")
}

fn column_label(column: usize, currency: &str) -> String {
    match FeeField::ALL.get(column) {
        Some(FeeField::Fee) if !currency.is_empty() => format!("Fee ({currency})"),
        Some(field) => field.label().to_owned(),
        None => "Surcharges".to_owned(),
    }
}

fn cell_text(record: &FeeRecord, column: usize, editor: Option<&CellEditor>) -> String {
    let Some(field) = FeeField::ALL.get(column).copied() else {
        debug_assert_eq!(column, SURCHARGE_COLUMN);
        return surcharges_text(record);
    };
    let editing = editor.filter(|editor| editor.record == record.id && editor.field == field);
    if let Some(editor) = editing {
        return match &editor.input {
            EditorInput::Draft(buffer) => format!("{buffer}{DRAFT_CARET}"),
            EditorInput::Choice { options, index } => {
                format!("< {} >", options.get(*index).copied().unwrap_or_default())
            }
        };
    }
    match record.number(field) {
        Some(value) => format_number(value),
        None => record.text(field).unwrap_or_default().to_owned(),
    }
}

fn surcharges_text(record: &FeeRecord) -> String {
    record
        .fees
        .iter()
        .map(|(label, amount)| format!("{label}={}", format_number(*amount)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Grouped thousands with at most two decimals: `1234567.5` is `1,234,567.5`.
fn format_number(value: f64) -> String {
    let cents = (value * 100.0).round();
    let sign = if cents < 0.0 { "-" } else { "" };
    let cents = cents.abs() as u64;
    let whole = group_thousands(cents / 100);
    match cents % 100 {
        0 => format!("{sign}{whole}"),
        fraction if fraction % 10 == 0 => format!("{sign}{whole}.{}", fraction / 10),
        fraction => format!("{sign}{whole}.{fraction:02}"),
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Row range of the page holding `cursor`.
fn page_bounds(rows: usize, cursor: usize, page_size: usize) -> (usize, usize) {
    if rows == 0 {
        return (0, 0);
    }
    let page_size = page_size.max(1);
    let start = (cursor.min(rows - 1) / page_size) * page_size;
    (start, (start + page_size).min(rows))
}

fn render_form_text(form_ui: &FormUiState) -> String {
    let fields = form_ui.form.fields();
    let mut lines = Vec::with_capacity(fields.len() + 3);
    for (index, field) in fields.iter().enumerate() {
        let marker = if index == form_ui.field_index { ">" } else { " " };
        let value = form_ui.form.value(*field);
        let shown = if field.is_choice() {
            match country_label(value) {
                Some(label) => format!("< {value} ({label}) >"),
                None => "< choose >".to_owned(),
            }
        } else if index == form_ui.field_index {
            format!("{value}{DRAFT_CARET}")
        } else {
            value.to_owned()
        };
        let required = if form_ui.show_missing && value.trim().is_empty() {
            "  (required)"
        } else {
            ""
        };
        lines.push(format!("{marker} {}: {shown}{required}", field.label()));
    }
    if form_ui.form.kind() == TabFormKind::Route {
        lines.push(String::new());
        lines.push(format!("tab name: {}", preview_route_name(&form_ui.form)));
    }
    lines.push(String::new());
    lines.push("tab/shift+tab field | left/right choose | enter add | esc cancel".to_owned());
    lines.join("\n")
}

fn preview_route_name(form: &TabForm) -> String {
    let from = form.value(TabFormField::FromCountry);
    let to = form.value(TabFormField::ToCountry);
    if from.is_empty() || to.is_empty() {
        return "-".to_owned();
    }
    form.tab_name()
}

fn render_city_picker_text(cursor: usize, is_selected: impl Fn(&str) -> bool) -> String {
    let mut lines = CITY_OPTIONS
        .iter()
        .enumerate()
        .map(|(index, (code, label))| {
            let marker = if index == cursor { ">" } else { " " };
            let check = if is_selected(code) { "x" } else { " " };
            format!("{marker} [{check}] {code:<4} {label}")
        })
        .collect::<Vec<_>>();
    lines.push(String::new());
    lines.push("j/k move | space toggle | esc close".to_owned());
    lines.join("\n")
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | ? help\n\
tabs: f/b next/prev | T add named tab | R add route tab | X remove tab\n\
cards: ]/[ next/prev | C add card | D remove card | m cities\n\
grid: j/k/h/l move | g/G first/last | pgup/pgdn page | a add row | d delete row\n\
grid: enter or i edit cell | c currency | s save\n\
edit: type to change | enter commit | tab/esc leave and commit\n\
select: left/right choose | enter commit | esc cancel\n\
form: tab/shift+tab field | left/right country | enter add | esc cancel\n\
confirm: y yes | n no"
}

fn mode_label(mode: AppMode) -> &'static str {
    match mode {
        AppMode::Browse => "BROWSE",
        AppMode::Edit => "EDIT",
        AppMode::Form(_) => "FORM",
        AppMode::Confirm => "CONFIRM",
    }
}

fn status_text<I>(state: &AppState<I>, view_data: &ViewData) -> String {
    let hints = match state.mode {
        AppMode::Browse if view_data.currency.is_some() => "enter apply | esc cancel",
        AppMode::Browse if view_data.city_picker.is_some() => "space toggle | esc close",
        AppMode::Browse => "hjkl move | enter edit | a add | d del | f/b tab | s save | ? help",
        AppMode::Edit => match view_data.editor.as_ref().map(|editor| &editor.input) {
            Some(EditorInput::Choice { .. }) => "left/right choose | enter commit | esc cancel",
            _ => "enter commit | tab/esc leave",
        },
        AppMode::Form(_) => "tab field | enter add | esc cancel",
        AppMode::Confirm => "y confirm | n cancel",
    };
    let mode = mode_label(state.mode);
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {hints}"),
        None => format!("{mode} | {hints}"),
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, Cursor, EditorInput, InternalEvent, UiOptions, ViewData, cell_text,
        column_label, format_number, handle_key_event, help_overlay_text, page_bounds, render,
        render_city_picker_text, status_text,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use feedesk_app::{
        AppMode, AppState, EditSlot, FeeField, FeeScope, GridRef, Tab, TabBody, TabFormKind,
    };
    use feedesk_testkit::{FeeFaker, SequentialIds, domestic_delivery_tab};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::sync::mpsc::{self, Sender};

    #[derive(Debug, Default)]
    struct TestRuntime {
        saved: Vec<FeeScope>,
        fail_save: bool,
    }

    impl AppRuntime for TestRuntime {
        fn save(&mut self, scope: &FeeScope) -> anyhow::Result<()> {
            if self.fail_save {
                anyhow::bail!("disk on fire");
            }
            self.saved.push(scope.clone());
            Ok(())
        }
    }

    struct Harness {
        state: AppState<SequentialIds>,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: Sender<InternalEvent>,
    }

    impl Harness {
        fn new(tabs: Vec<Tab>, ids: SequentialIds) -> Self {
            let (tx, _rx) = mpsc::channel();
            Self {
                state: AppState::with_ids(FeeScope::new(tabs), ids),
                runtime: TestRuntime::default(),
                view_data: ViewData::new(UiOptions::default()),
                tx,
            }
        }

        fn domestic() -> Self {
            let mut ids = SequentialIds::new();
            let tab = domestic_delivery_tab(&mut ids);
            Self::new(vec![tab], ids)
        }

        fn press(&mut self, code: KeyCode) -> bool {
            self.press_with(code, KeyModifiers::NONE)
        }

        fn press_with(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
            handle_key_event(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                KeyEvent::new(code, modifiers),
            )
        }

        fn type_text(&mut self, text: &str) {
            for ch in text.chars() {
                self.press(KeyCode::Char(ch));
            }
        }

        fn records(&self) -> Vec<feedesk_app::FeeRecord> {
            let grid = GridRef::tab("Domestic Delivery");
            self.state
                .scope()
                .records(&grid)
                .expect("domestic grid")
                .to_vec()
        }

        fn select_column(&mut self, field: FeeField) {
            self.view_data.cursor.col = FeeField::ALL
                .iter()
                .position(|candidate| *candidate == field)
                .expect("field is a column");
        }
    }

    #[test]
    fn ctrl_q_quits() {
        let mut harness = Harness::domestic();
        assert!(!harness.press(KeyCode::Char('q')));
        assert!(harness.press_with(KeyCode::Char('q'), KeyModifiers::CONTROL));
    }

    #[test]
    fn tab_keys_cycle_and_reset_cursor() {
        let mut ids = SequentialIds::new();
        let domestic = domestic_delivery_tab(&mut ids);
        let mut harness = Harness::new(vec![domestic, Tab::flat("Other", "USD")], ids);
        harness.view_data.cursor.row = 1;

        harness.press(KeyCode::Char('f'));
        assert_eq!(harness.state.scope().active_name(), Some("Other"));
        assert_eq!(harness.view_data.cursor.row, 0);

        harness.press(KeyCode::Char('b'));
        assert_eq!(harness.state.scope().active_name(), Some("Domestic Delivery"));
    }

    #[test]
    fn number_edit_commits_on_enter() {
        let mut harness = Harness::domestic();
        harness.select_column(FeeField::Fee);

        harness.press(KeyCode::Enter);
        assert_eq!(harness.state.mode, AppMode::Edit);
        for _ in 0..5 {
            harness.press(KeyCode::Backspace);
        }
        harness.type_text("72500");
        harness.press(KeyCode::Enter);

        assert_eq!(harness.state.mode, AppMode::Browse);
        assert_eq!(harness.records()[0].fee, 72_500.0);
        assert!(harness.view_data.editor.is_none());
    }

    #[test]
    fn leaving_text_editor_commits_the_draft() {
        let mut harness = Harness::domestic();
        harness.select_column(FeeField::ZoneToCode);
        harness.view_data.cursor.row = 1;

        harness.press(KeyCode::Char('i'));
        harness.press(KeyCode::Backspace);
        harness.press(KeyCode::Backspace);
        harness.type_text("CT");
        harness.press(KeyCode::Esc);

        assert_eq!(harness.records()[1].zone_to_code, "CT");
        assert_eq!(harness.state.edit_slot(), &EditSlot::Idle);
    }

    #[test]
    fn non_numeric_draft_stores_zero_with_notice() {
        let mut harness = Harness::domestic();
        harness.select_column(FeeField::WeightTo);
        harness.press(KeyCode::Enter);
        harness.press(KeyCode::Backspace);
        harness.type_text("heavy");
        harness.press(KeyCode::Tab);

        assert_eq!(harness.records()[0].weight_to, 0.0);
        assert!(
            harness
                .state
                .status_line
                .as_deref()
                .is_some_and(|status| status.contains("not a number"))
        );
    }

    #[test]
    fn select_editor_cycles_and_escape_cancels() {
        let mut harness = Harness::domestic();
        harness.select_column(FeeField::ServiceType);

        harness.press(KeyCode::Enter);
        assert!(matches!(
            harness.view_data.editor.as_ref().map(|editor| &editor.input),
            Some(EditorInput::Choice { index: 1, .. })
        ));
        harness.press(KeyCode::Right);
        harness.press(KeyCode::Esc);
        assert_eq!(harness.records()[0].service_type, "EXPRESS");
        assert_eq!(harness.state.mode, AppMode::Browse);

        harness.press(KeyCode::Enter);
        harness.press(KeyCode::Right);
        harness.press(KeyCode::Enter);
        assert_eq!(harness.records()[0].service_type, "STANDARD");
    }

    #[test]
    fn add_row_moves_cursor_to_new_row() {
        let mut harness = Harness::domestic();
        harness.press(KeyCode::Char('a'));

        let records = harness.records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].id.as_str(), "fee-3");
        assert_eq!(harness.view_data.cursor.row, 2);
    }

    #[test]
    fn row_delete_waits_for_confirmation() {
        let mut harness = Harness::domestic();
        harness.view_data.cursor.row = 1;

        harness.press(KeyCode::Char('d'));
        assert_eq!(harness.state.mode, AppMode::Confirm);
        harness.press(KeyCode::Char('n'));
        assert_eq!(harness.records().len(), 2);

        harness.press(KeyCode::Char('d'));
        harness.press(KeyCode::Char('y'));
        let records = harness.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].service_type, "EXPRESS");
        assert_eq!(harness.view_data.cursor.row, 0);
    }

    #[test]
    fn blank_form_stays_open_and_flags_missing_fields() {
        let mut harness = Harness::domestic();
        harness.press(KeyCode::Char('T'));
        assert_eq!(harness.state.mode, AppMode::Form(TabFormKind::Named));

        harness.type_text("Same Day");
        harness.press(KeyCode::Enter);
        let form_ui = harness.view_data.form.as_ref().expect("form still open");
        assert!(form_ui.show_missing);
        assert_eq!(form_ui.field_index, 1);

        harness.type_text("VND");
        harness.press(KeyCode::Enter);
        assert_eq!(harness.state.mode, AppMode::Browse);
        assert!(harness.view_data.form.is_none());
        assert_eq!(harness.state.scope().active_name(), Some("Same Day"));
    }

    #[test]
    fn route_form_picks_countries_with_arrows() {
        let mut harness = Harness::domestic();
        harness.press(KeyCode::Char('R'));
        harness.press(KeyCode::Right);
        harness.press(KeyCode::Tab);
        harness.press(KeyCode::Right);
        harness.press(KeyCode::Right);
        harness.press(KeyCode::Tab);
        harness.type_text("USD");
        harness.press(KeyCode::Enter);

        let tab = harness
            .state
            .scope()
            .active_tab()
            .expect("route tab is active");
        assert_eq!(tab.name, "International (VN - US)");
        assert!(matches!(tab.body, TabBody::Cards(_)));
    }

    #[test]
    fn card_keys_add_card_and_toggle_cities() {
        let mut harness = Harness::domestic();
        harness.press(KeyCode::Char('R'));
        harness.press(KeyCode::Right);
        harness.press(KeyCode::Tab);
        harness.press(KeyCode::Right);
        harness.press(KeyCode::Tab);
        harness.type_text("VND");
        harness.press(KeyCode::Enter);

        harness.press(KeyCode::Char('C'));
        harness.press(KeyCode::Char('m'));
        harness.press(KeyCode::Char(' '));
        harness.press(KeyCode::Down);
        harness.press(KeyCode::Char(' '));
        harness.press(KeyCode::Esc);

        let tab = harness
            .state
            .scope()
            .tab("Domestic (VN - VN)")
            .expect("route tab");
        let card = &tab.cards()[0];
        assert_eq!(card.currency, "VND");
        assert_eq!(
            card.cities.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["HCM", "HN"]
        );
    }

    #[test]
    fn currency_editor_updates_flat_tab() {
        let mut harness = Harness::domestic();
        harness.press(KeyCode::Char('c'));
        for _ in 0..3 {
            harness.press(KeyCode::Backspace);
        }
        harness.press(KeyCode::Enter);
        assert!(harness.view_data.currency.is_some(), "empty currency is refused");

        harness.type_text("usd");
        harness.press(KeyCode::Enter);
        assert!(harness.view_data.currency.is_none());
        assert_eq!(
            harness
                .state
                .scope()
                .currency(&GridRef::tab("Domestic Delivery")),
            Ok("USD")
        );
    }

    #[test]
    fn save_reports_success_and_failure() {
        let mut harness = Harness::domestic();
        harness.press(KeyCode::Char('s'));
        assert_eq!(harness.runtime.saved.len(), 1);
        assert_eq!(harness.state.status_line.as_deref(), Some("data saved"));

        harness.runtime.fail_save = true;
        harness.press(KeyCode::Char('s'));
        assert_eq!(
            harness.state.status_line.as_deref(),
            Some("save failed: disk on fire")
        );
    }

    #[test]
    fn actions_without_tabs_explain_themselves() {
        let mut harness = Harness::new(Vec::new(), SequentialIds::new());
        harness.press(KeyCode::Char('a'));
        assert_eq!(
            harness.state.status_line.as_deref(),
            Some("add a tab first (T named, R route)")
        );
    }

    #[test]
    fn help_toggles_and_swallows_keys() {
        let mut harness = Harness::domestic();
        harness.press(KeyCode::Char('?'));
        assert!(harness.view_data.help_visible);
        harness.press(KeyCode::Char('a'));
        assert_eq!(harness.records().len(), 2);
        harness.press(KeyCode::Esc);
        assert!(!harness.view_data.help_visible);
        assert!(help_overlay_text().contains("ctrl+q quit"));
    }

    #[test]
    fn paging_follows_cursor() {
        let mut ids = SequentialIds::new();
        let tab = FeeFaker::new(4).flat_tab(&mut ids, "Bulk", "USD", 23);
        let mut harness = Harness::new(vec![tab], ids);
        harness.press(KeyCode::PageDown);
        assert_eq!(harness.view_data.cursor, Cursor { row: 10, col: 0, card: 0 });
        harness.press(KeyCode::Char('G'));
        assert_eq!(harness.view_data.cursor.row, 22);
        assert_eq!(page_bounds(23, 22, 10), (20, 23));
        assert_eq!(page_bounds(23, 9, 10), (0, 10));
        assert_eq!(page_bounds(0, 0, 10), (0, 0));
    }

    #[test]
    fn numbers_use_thousands_separators() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(50_000.0), "50,000");
        assert_eq!(format_number(1_234_567.5), "1,234,567.5");
        assert_eq!(format_number(-1200.25), "-1,200.25");
        assert_eq!(format_number(999.999), "1,000");
    }

    #[test]
    fn cells_show_values_drafts_and_surcharges() {
        let harness = Harness::domestic();
        let records = harness.records();
        let record = &records[0];
        assert_eq!(cell_text(record, 2, None), "50,000");
        assert_eq!(cell_text(record, 0, None), "EXPRESS");
        assert_eq!(
            cell_text(record, FeeField::ALL.len(), None),
            "additional=20,000 base=30,000"
        );
        assert_eq!(column_label(2, "VND"), "Fee (VND)");
        assert_eq!(column_label(FeeField::ALL.len(), "VND"), "Surcharges");
    }

    #[test]
    fn city_picker_marks_selected_codes() {
        let text = render_city_picker_text(1, |code| code == "HN");
        let lines = text.lines().collect::<Vec<_>>();
        assert!(lines[0].starts_with("  [x] HN"));
        assert!(lines[1].starts_with("> [ ] HCM"));
    }

    #[test]
    fn status_text_shows_mode_and_notice() {
        let mut harness = Harness::domestic();
        assert!(status_text(&harness.state, &harness.view_data).starts_with("BROWSE | "));
        harness.press(KeyCode::Char('s'));
        assert!(status_text(&harness.state, &harness.view_data).contains("data saved"));
    }

    #[test]
    fn render_draws_tabs_and_currency_header() -> anyhow::Result<()> {
        let harness = Harness::domestic();
        let mut terminal = Terminal::new(TestBackend::new(220, 30))?;
        terminal.draw(|frame| render(frame, &harness.state, &harness.view_data))?;
        let screen = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<String>();
        assert!(screen.contains("Domestic Delivery"));
        assert!(screen.contains("Fee (VND)"));
        assert!(screen.contains("50,000"));
        Ok(())
    }
}
