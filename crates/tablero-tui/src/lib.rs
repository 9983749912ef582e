// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::{execute, terminal};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use std::collections::HashMap;
use std::io;
use std::time::Duration;
use tablero_app::input::{
    format_cents, format_date, date_to_timestamp, parse_optional_date, parse_required_cents,
    parse_required_int,
};
use tablero_app::{
    ActionError, Address, AddressFormInput, AddressUid, AppCommand, AppMode, AppSetting, AppState,
    Attachment, AttachmentUid, AttachmentUpload, BoardKind, Comment, CommentFormInput, CommentUid,
    Company, CompanyFormInput, CompanyUid, ConfirmKind, FieldErrors, FormKind, FormPayload,
    InlinePatch, ItemOptionFormInput, ItemOptionUid, Payment, PointEntry, PointEntryFormInput,
    PointEntryUid, PointKind, Post, PostFormInput, PostUid, ScreenKind, Session, SettingValue,
    ShopItem, ShopItemFormInput, ShopItemUid, SortMove, User, UserFormInput, UserGrade, UserUid,
};
use tablero_sync::{ListPhase, ListQuery, ListRow, ListScreen, PageData, PageRequest};
use time::OffsetDateTime;

// Rows within this distance of the bottom make the scroll sentinel
// "visible".
const SENTINEL_MARGIN: usize = 3;

// One rendered list row: the stable uid plus display cells aligned with
// `screen_columns`, and the visibility flag where the entity has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub uid: String,
    pub cells: Vec<String>,
    pub visible: Option<bool>,
}

impl ListRow for RowView {
    fn row_uid(&self) -> &str {
        &self.uid
    }
}

// Everything a front end needs from the server-action surface. The CLI
// wires this to the SQLite store or the HTTP client.
pub trait BackofficeRuntime {
    fn fetch_page(
        &mut self,
        screen: ScreenKind,
        query: &ListQuery,
    ) -> Result<PageData<RowView>, ActionError>;
    fn fetch_row(&mut self, screen: ScreenKind, uid: &str) -> Result<RowView, ActionError>;
    fn load_form(&mut self, screen: ScreenKind, uid: &str) -> Result<FormPayload, ActionError>;
    fn submit_create(&mut self, payload: &FormPayload) -> Result<(), ActionError>;
    fn submit_update(&mut self, uid: &str, payload: &FormPayload) -> Result<(), ActionError>;
    fn delete_rows(&mut self, screen: ScreenKind, uids: &[String]) -> Result<usize, ActionError>;
    fn restore_rows(&mut self, screen: ScreenKind, uids: &[String])
    -> Result<usize, ActionError>;
    fn inline_patch(
        &mut self,
        screen: ScreenKind,
        uid: &str,
        patch: &InlinePatch,
    ) -> Result<(), ActionError>;
    fn move_item(&mut self, uid: &str, direction: SortMove) -> Result<bool, ActionError>;
    fn list_settings(&mut self) -> Result<Vec<AppSetting>, ActionError>;
    fn put_setting(&mut self, setting: &AppSetting) -> Result<(), ActionError>;
    fn list_attachments(&mut self, owner_uid: &str) -> Result<Vec<Attachment>, ActionError>;
    fn upload_attachment(&mut self, upload: &AttachmentUpload)
    -> Result<Attachment, ActionError>;
    fn delete_attachment(&mut self, uid: &str) -> Result<(), ActionError>;
}

// Label lookup handed in by the caller. Missing keys fall back to the
// key itself, so a partial lexicon degrades to readable English.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    entries: HashMap<String, String>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, label: &str) -> Self {
        self.entries.insert(key.to_owned(), label.to_owned());
        self
    }

    pub fn label<'a>(&'a self, key: &'a str) -> &'a str {
        self.entries.get(key).map_or(key, String::as_str)
    }
}

// Explicit launch context: session identity and labels arrive as
// arguments, never from ambient globals.
#[derive(Debug, Clone)]
pub struct Launch {
    pub session: Session,
    pub lexicon: Lexicon,
    // Saved query strings to restore per screen, the moral equivalent of
    // opening a shared URL.
    pub addresses: Vec<(ScreenKind, String)>,
    // Static asset base for rendering an attachment's public URL from
    // its stored relative path.
    pub asset_base: Option<String>,
}

pub fn screen_columns(screen: ScreenKind) -> &'static [&'static str] {
    match screen {
        ScreenKind::Users => &["idx", "login", "name", "email", "grade", "joined"],
        ScreenKind::Companies => &["idx", "name", "business no", "ceo", "city", "joined"],
        ScreenKind::Posts => &["idx", "board", "title", "writer", "views", "visible", "created"],
        ScreenKind::Comments => &["idx", "post", "writer", "body", "visible", "created"],
        ScreenKind::Payments => &["idx", "order", "amount", "card", "status", "paid"],
        ScreenKind::Points => &["idx", "user", "kind", "amount", "reason", "created"],
        ScreenKind::ShopItems => &["#", "name", "price", "stock", "created"],
        ScreenKind::Addresses => &["idx", "recipient", "postal", "address", "default", "created"],
        ScreenKind::Settings => &["setting", "value"],
    }
}

fn visible_cell_index(screen: ScreenKind) -> Option<usize> {
    match screen {
        ScreenKind::Posts => Some(5),
        ScreenKind::Comments => Some(4),
        _ => None,
    }
}

pub fn user_row(user: &User) -> RowView {
    RowView {
        uid: user.uid.as_str().to_owned(),
        cells: vec![
            user.idx.to_string(),
            user.login_id.clone(),
            user.name.clone(),
            user.email.clone(),
            user.grade.as_str().to_owned(),
            fmt_day(user.created_at),
        ],
        visible: None,
    }
}

pub fn company_row(company: &Company) -> RowView {
    RowView {
        uid: company.uid.as_str().to_owned(),
        cells: vec![
            company.idx.to_string(),
            company.name.clone(),
            company.business_no.clone(),
            company.ceo_name.clone(),
            company.city.clone(),
            fmt_day(company.created_at),
        ],
        visible: None,
    }
}

pub fn post_row(post: &Post) -> RowView {
    RowView {
        uid: post.uid.as_str().to_owned(),
        cells: vec![
            post.idx.to_string(),
            post.board.as_str().to_owned(),
            post.title.clone(),
            short_uid(post.user_uid.as_str()),
            post.view_count.to_string(),
            fmt_flag(post.is_visible),
            fmt_day(post.created_at),
        ],
        visible: Some(post.is_visible),
    }
}

pub fn comment_row(comment: &Comment) -> RowView {
    RowView {
        uid: comment.uid.as_str().to_owned(),
        cells: vec![
            comment.idx.to_string(),
            short_uid(comment.post_uid.as_str()),
            short_uid(comment.user_uid.as_str()),
            clip(&comment.body, 40),
            fmt_flag(comment.is_visible),
            fmt_day(comment.created_at),
        ],
        visible: Some(comment.is_visible),
    }
}

pub fn payment_row(payment: &Payment) -> RowView {
    RowView {
        uid: payment.uid.as_str().to_owned(),
        cells: vec![
            payment.idx.to_string(),
            payment.order_no.clone(),
            format_cents(payment.amount_cents),
            format!("{} *{}", payment.card_name, payment.card_last4),
            payment.status.as_str().to_owned(),
            fmt_day(payment.paid_at),
        ],
        visible: None,
    }
}

pub fn point_row(entry: &PointEntry) -> RowView {
    RowView {
        uid: entry.uid.as_str().to_owned(),
        cells: vec![
            entry.idx.to_string(),
            short_uid(entry.user_uid.as_str()),
            entry.kind.as_str().to_owned(),
            entry.amount.to_string(),
            entry.reason.clone(),
            fmt_day(entry.created_at),
        ],
        visible: None,
    }
}

pub fn shop_item_row(item: &ShopItem) -> RowView {
    RowView {
        uid: item.uid.as_str().to_owned(),
        cells: vec![
            item.sort_order.to_string(),
            item.name.clone(),
            format_cents(item.price_cents),
            item.stock.to_string(),
            fmt_day(item.created_at),
        ],
        visible: None,
    }
}

pub fn address_row(address: &Address) -> RowView {
    RowView {
        uid: address.uid.as_str().to_owned(),
        cells: vec![
            address.idx.to_string(),
            address.recipient.clone(),
            address.postal_code.clone(),
            clip(&format!("{} {}", address.line1, address.line2), 40),
            fmt_flag(address.is_default),
            fmt_day(address.created_at),
        ],
        visible: None,
    }
}

fn fmt_day(value: OffsetDateTime) -> String {
    format_date(Some(value.date()))
}

fn fmt_flag(value: bool) -> String {
    if value { "on" } else { "off" }.to_owned()
}

fn short_uid(uid: &str) -> String {
    uid.chars().take(8).collect()
}

fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_owned()
    } else {
        let mut clipped: String = text.chars().take(max.saturating_sub(1)).collect();
        clipped.push('~');
        clipped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Text,
    Money,
    Int,
    Date,
    Flag,
    Choice(&'static [&'static str]),
    Path,
}

#[derive(Debug, Clone)]
struct FormField {
    name: String,
    label: String,
    kind: FieldKind,
    value: String,
}

impl FormField {
    fn new(name: &str, label: &str, kind: FieldKind, value: impl Into<String>) -> Self {
        Self {
            name: name.to_owned(),
            label: label.to_owned(),
            kind,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct FormUiState {
    screen: ScreenKind,
    editing_uid: Option<String>,
    record_uid: String,
    fields: Vec<FormField>,
    focus: usize,
    errors: FieldErrors,
    option_count: usize,
    attachments: Vec<Attachment>,
}

#[derive(Debug, Clone)]
struct ConfirmUiState {
    kind: ConfirmKind,
    uids: Vec<String>,
    message: String,
}

struct ViewData {
    lists: HashMap<ScreenKind, ListScreen<RowView>>,
    cursors: HashMap<ScreenKind, usize>,
    addresses: HashMap<ScreenKind, String>,
    filter_form: Vec<FormField>,
    filter_focus: usize,
    form: Option<FormUiState>,
    confirm: Option<ConfirmUiState>,
    settings: Vec<AppSetting>,
    settings_cursor: usize,
    settings_edit: Option<String>,
}

impl ViewData {
    fn new() -> Self {
        let mut lists = HashMap::new();
        for screen in ScreenKind::ALL {
            if screen != ScreenKind::Settings {
                lists.insert(screen, ListScreen::new(screen));
            }
        }
        Self {
            lists,
            cursors: HashMap::new(),
            addresses: HashMap::new(),
            filter_form: Vec::new(),
            filter_focus: 0,
            form: None,
            confirm: None,
            settings: Vec::new(),
            settings_cursor: 0,
            settings_edit: None,
        }
    }

    fn list_mut(&mut self, screen: ScreenKind) -> &mut ListScreen<RowView> {
        self.lists
            .entry(screen)
            .or_insert_with(|| ListScreen::new(screen))
    }

    fn cursor(&self, screen: ScreenKind) -> usize {
        self.cursors.get(&screen).copied().unwrap_or(0)
    }

    fn set_cursor(&mut self, screen: ScreenKind, cursor: usize) {
        self.cursors.insert(screen, cursor);
    }

    fn current_uid(&self, screen: ScreenKind) -> Option<String> {
        let list = self.lists.get(&screen)?;
        list.rows().get(self.cursor(screen)).map(|row| row.uid.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub fn run_app<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    launch: &Launch,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new();
    bootstrap_screens(state, runtime, &mut view_data, launch);

    let mut result = Ok(());
    loop {
        if let Err(error) =
            terminal.draw(|frame| render(frame, state, &view_data, launch))
        {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if !has_event {
            continue;
        }
        let Event::Key(key) = event::read().context("read event")? else {
            continue;
        };
        if key.kind != event::KeyEventKind::Press {
            continue;
        }

        match handle_key(state, runtime, &mut view_data, key) {
            Ok(Flow::Quit) => break,
            Ok(Flow::Continue) => {}
            Err(error) => {
                // Unexpected failures surface as a toast, never a crash.
                state.dispatch(AppCommand::SetStatus(format!("error: {error:#}")));
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        terminal::LeaveAlternateScreen
    )
    .context("leave alternate screen")?;
    result
}

fn bootstrap_screens<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    launch: &Launch,
) {
    // Server-provided baseline: restore saved query strings where the
    // caller handed them in, defaults otherwise.
    let saved: HashMap<ScreenKind, String> = launch.addresses.iter().cloned().collect();
    let active = state.active_screen;
    let baseline = match saved.get(&active) {
        Some(query) => tablero_sync::FilterState::from_query_string(active, query),
        None => tablero_sync::FilterState::default_for(active),
    };
    mount_screen(state, runtime, view_data, active, baseline);
    for (screen, query) in saved {
        if screen != active && screen != ScreenKind::Settings {
            view_data
                .addresses
                .insert(screen, query);
        }
    }
}

fn mount_screen<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    screen: ScreenKind,
    baseline: tablero_sync::FilterState,
) {
    if screen == ScreenKind::Settings {
        match runtime.list_settings() {
            Ok(settings) => view_data.settings = settings,
            Err(error) => {
                state.dispatch(AppCommand::SetStatus(error.toast_text()));
            }
        }
        return;
    }
    let outcome = view_data.list_mut(screen).mount(baseline);
    let signature = view_data.list_mut(screen).active_filter().signature();
    view_data.addresses.insert(screen, signature);
    if let Some(request) = outcome.fetch {
        execute_fetch(state, runtime, view_data, screen, request);
    }
    view_data.set_cursor(screen, 0);
}

fn ensure_mounted<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    screen: ScreenKind,
) {
    if screen == ScreenKind::Settings {
        if view_data.settings.is_empty() {
            mount_screen(
                state,
                runtime,
                view_data,
                screen,
                tablero_sync::FilterState::default_for(screen),
            );
        }
        return;
    }
    if view_data.list_mut(screen).phase() == ListPhase::Idle {
        let baseline = match view_data.addresses.get(&screen) {
            Some(query) => tablero_sync::FilterState::from_query_string(screen, query),
            None => tablero_sync::FilterState::default_for(screen),
        };
        mount_screen(state, runtime, view_data, screen, baseline);
    }
}

// Runs one fetch the screen asked for and feeds the result back in.
// Errors leave the materialized rows alone and surface as a toast.
fn execute_fetch<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    screen: ScreenKind,
    request: PageRequest,
) {
    let filter = tablero_sync::FilterState::from_query_string(screen, &request.signature);
    let query = ListQuery {
        filter,
        offset: request.offset,
    };
    match runtime.fetch_page(screen, &query) {
        Ok(page) => {
            view_data.list_mut(screen).page_loaded(&request, page);
        }
        Err(error) => {
            let list = view_data.list_mut(screen);
            list.page_failed(&request, error.toast_text());
            if let Some(message) = list.take_error() {
                state.dispatch(AppCommand::SetStatus(format!("load failed: {message}")));
            }
        }
    }
    let rows = view_data.list_mut(screen).rows().len();
    let cursor = view_data.cursor(screen);
    if rows > 0 && cursor >= rows {
        view_data.set_cursor(screen, rows - 1);
    }
}

fn run_refresh<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    screen: ScreenKind,
    request: Option<PageRequest>,
) {
    if let Some(request) = request {
        execute_fetch(state, runtime, view_data, screen, request);
    }
}

fn handle_key<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> Result<Flow> {
    match state.mode {
        AppMode::Nav => handle_nav_key(state, runtime, view_data, key),
        AppMode::FilterEdit => handle_filter_key(state, runtime, view_data, key),
        AppMode::Form(_) => handle_form_key(state, runtime, view_data, key),
        AppMode::Confirm(_) => handle_confirm_key(state, runtime, view_data, key),
    }
}

fn handle_nav_key<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> Result<Flow> {
    let screen = state.active_screen;

    if view_data.settings_edit.is_some() && screen == ScreenKind::Settings {
        return handle_setting_edit_key(state, runtime, view_data, key);
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) => return Ok(Flow::Quit),
        (KeyCode::Tab, _) | (KeyCode::Right, _) => {
            state.dispatch(AppCommand::NextScreen);
            ensure_mounted(state, runtime, view_data, state.active_screen);
        }
        (KeyCode::BackTab, _) | (KeyCode::Left, _) => {
            state.dispatch(AppCommand::PrevScreen);
            ensure_mounted(state, runtime, view_data, state.active_screen);
        }
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => move_cursor(state, runtime, view_data, 1),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => move_cursor(state, runtime, view_data, -1),
        (KeyCode::Char(' '), _) => {
            if screen == ScreenKind::Settings {
                return Ok(Flow::Continue);
            }
            if let Some(uid) = view_data.current_uid(screen) {
                let selected = view_data.list_mut(screen).toggle_selected(&uid);
                let label = if selected { "selected" } else { "unselected" };
                state.dispatch(AppCommand::SetStatus(format!("{label} {}", short_uid(&uid))));
            }
        }
        (KeyCode::Char('a'), _) => {
            if screen != ScreenKind::Settings {
                view_data.list_mut(screen).select_all_visible();
                let count = view_data.list_mut(screen).selection().len();
                state.dispatch(AppCommand::SetStatus(format!("{count} rows selected")));
            }
        }
        (KeyCode::Char('A'), _) => {
            if screen != ScreenKind::Settings {
                view_data.list_mut(screen).clear_selection();
                state.dispatch(AppCommand::SetStatus("selection cleared".to_owned()));
            }
        }
        (KeyCode::Char('d'), KeyModifiers::NONE) => {
            if let Some(uid) = view_data.current_uid(screen) {
                view_data.confirm = Some(ConfirmUiState {
                    kind: ConfirmKind::DeleteOne,
                    uids: vec![uid.clone()],
                    message: format!("Delete row {}?", short_uid(&uid)),
                });
                state.dispatch(AppCommand::OpenConfirm(ConfirmKind::DeleteOne));
            }
        }
        (KeyCode::Char('D'), _) => {
            if screen == ScreenKind::Settings {
                return Ok(Flow::Continue);
            }
            let selected = view_data.list_mut(screen).selection().uids();
            if selected.is_empty() {
                state.dispatch(AppCommand::SetStatus("nothing selected".to_owned()));
            } else {
                view_data.confirm = Some(ConfirmUiState {
                    kind: ConfirmKind::DeleteSelected,
                    message: format!("Delete {} selected rows?", selected.len()),
                    uids: selected,
                });
                state.dispatch(AppCommand::OpenConfirm(ConfirmKind::DeleteSelected));
            }
        }
        (KeyCode::Char('n'), _) => {
            if let Some(form) = blank_form(screen) {
                state.dispatch(AppCommand::OpenForm(form_kind_for(screen).expect("form kind")));
                view_data.form = Some(form);
            } else {
                state.dispatch(AppCommand::SetStatus(format!(
                    "{} has no create form",
                    screen.label()
                )));
            }
        }
        (KeyCode::Char('e'), _) => {
            if screen == ScreenKind::Settings {
                return handle_setting_open_edit(state, view_data);
            }
            open_edit_form(state, runtime, view_data, screen)?;
        }
        (KeyCode::Enter, _) => {
            if screen == ScreenKind::Settings {
                return handle_setting_open_edit(state, view_data);
            }
        }
        (KeyCode::Char('v'), _) => {
            toggle_visibility(state, runtime, view_data, screen);
        }
        (KeyCode::Char('u'), KeyModifiers::NONE) => {
            restore_rows(state, runtime, view_data, screen);
        }
        (KeyCode::Char('J'), _) => reorder_item(state, runtime, view_data, SortMove::Down),
        (KeyCode::Char('K'), _) => reorder_item(state, runtime, view_data, SortMove::Up),
        (KeyCode::Char('/'), _) => {
            if screen != ScreenKind::Settings {
                view_data.filter_form = filter_fields(screen, view_data.list_mut(screen).draft());
                view_data.filter_focus = 0;
                state.dispatch(AppCommand::EnterFilterEdit);
            }
        }
        (KeyCode::Char('r'), _) => {
            if screen != ScreenKind::Settings {
                let outcome = view_data.list_mut(screen).reset();
                if let Some(query) = outcome.navigation.clone() {
                    view_data.addresses.insert(screen, query);
                }
                run_refresh(state, runtime, view_data, screen, outcome.fetch);
                state.dispatch(AppCommand::SetStatus("filters reset".to_owned()));
            }
        }
        (KeyCode::Char('x'), _) => {
            if screen != ScreenKind::Settings {
                state.dispatch(AppCommand::ToggleDisabled);
                let include = state.include_disabled;
                let list = view_data.list_mut(screen);
                if include {
                    list.draft_mut().extra.insert("use".to_owned(), "all".to_owned());
                } else {
                    list.draft_mut().extra.remove("use");
                }
                let outcome = list.apply_draft();
                if let Some(query) = outcome.navigation.clone() {
                    view_data.addresses.insert(screen, query);
                }
                run_refresh(state, runtime, view_data, screen, outcome.fetch);
            }
        }
        (KeyCode::Char('g'), _) => {
            if screen == ScreenKind::Settings {
                mount_screen(
                    state,
                    runtime,
                    view_data,
                    screen,
                    tablero_sync::FilterState::default_for(screen),
                );
            }
        }
        _ => {}
    }
    Ok(Flow::Continue)
}

fn move_cursor<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    delta: isize,
) {
    let screen = state.active_screen;
    if screen == ScreenKind::Settings {
        let len = view_data.settings.len();
        if len == 0 {
            return;
        }
        let next = (view_data.settings_cursor as isize + delta).clamp(0, len as isize - 1);
        view_data.settings_cursor = next as usize;
        return;
    }

    let rows = view_data.list_mut(screen).rows().len();
    if rows == 0 {
        return;
    }
    let next = (view_data.cursor(screen) as isize + delta).clamp(0, rows as isize - 1);
    view_data.set_cursor(screen, next as usize);

    // The sentinel condition is re-evaluated on every cursor move, in
    // either direction.
    let near_bottom = view_data.cursor(screen) + SENTINEL_MARGIN >= rows;
    let request = view_data.list_mut(screen).sentinel_visible(near_bottom);
    if let Some(request) = request {
        execute_fetch(state, runtime, view_data, screen, request);
    }
}

fn open_edit_form<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    screen: ScreenKind,
) -> Result<Flow> {
    let Some(kind) = form_kind_for(screen) else {
        state.dispatch(AppCommand::SetStatus(format!(
            "{} rows cannot be edited here",
            screen.label()
        )));
        return Ok(Flow::Continue);
    };
    let Some(uid) = view_data.current_uid(screen) else {
        return Ok(Flow::Continue);
    };
    match runtime.load_form(screen, &uid) {
        Ok(payload) => {
            // The fetched detail record lands in the cache under its own
            // key, so list and detail views never show each other stale
            // data.
            if let Ok(row) = runtime.fetch_row(screen, &uid) {
                view_data.list_mut(screen).detail_loaded(row);
            }
            let attachments = if supports_attachments(screen) {
                runtime.list_attachments(&uid).unwrap_or_default()
            } else {
                Vec::new()
            };
            let mut form = form_from_payload(screen, &payload);
            form.editing_uid = Some(uid);
            form.attachments = attachments;
            view_data.form = Some(form);
            state.dispatch(AppCommand::OpenForm(kind));
        }
        Err(error) => {
            state.dispatch(AppCommand::SetStatus(error.toast_text()));
        }
    }
    Ok(Flow::Continue)
}

fn toggle_visibility<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    screen: ScreenKind,
) {
    let Some(cell) = visible_cell_index(screen) else {
        return;
    };
    let cursor = view_data.cursor(screen);
    let Some(row) = view_data.list_mut(screen).rows().get(cursor).cloned() else {
        return;
    };
    let Some(currently) = row.visible else {
        return;
    };
    let patch = match screen {
        ScreenKind::Posts => InlinePatch::PostVisible(!currently),
        ScreenKind::Comments => InlinePatch::CommentVisible(!currently),
        _ => return,
    };
    match runtime.inline_patch(screen, &row.uid, &patch) {
        Ok(()) => {
            let mut updated = row;
            updated.visible = Some(!currently);
            updated.cells[cell] = fmt_flag(!currently);
            let refresh = view_data.list_mut(screen).apply_update(updated);
            run_refresh(state, runtime, view_data, screen, refresh);
            state.dispatch(AppCommand::SetStatus(format!(
                "visibility {}",
                fmt_flag(!currently)
            )));
        }
        Err(error) => {
            state.dispatch(AppCommand::SetStatus(error.toast_text()));
        }
    }
}

// Bring soft-deleted rows back. Acts on the selection when one exists,
// the cursor row otherwise; mostly useful with disabled rows shown.
fn restore_rows<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    screen: ScreenKind,
) {
    if screen == ScreenKind::Settings {
        return;
    }
    let selected = view_data.list_mut(screen).selection().uids();
    let uids = if selected.is_empty() {
        match view_data.current_uid(screen) {
            Some(uid) => vec![uid],
            None => return,
        }
    } else {
        selected
    };
    match runtime.restore_rows(screen, &uids) {
        Ok(restored) => {
            view_data.list_mut(screen).clear_selection();
            let refresh = view_data.list_mut(screen).invalidate_and_refresh();
            run_refresh(state, runtime, view_data, screen, refresh);
            state.dispatch(AppCommand::SetStatus(format!("{restored} rows restored")));
        }
        Err(error) => {
            state.dispatch(AppCommand::SetStatus(error.toast_text()));
        }
    }
}

fn reorder_item<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    direction: SortMove,
) {
    let screen = state.active_screen;
    if screen != ScreenKind::ShopItems {
        return;
    }
    let Some(uid) = view_data.current_uid(screen) else {
        return;
    };
    match runtime.move_item(&uid, direction) {
        Ok(true) => {
            let refresh = view_data.list_mut(screen).invalidate_and_refresh();
            run_refresh(state, runtime, view_data, screen, refresh);
            state.dispatch(AppCommand::SetStatus("order updated".to_owned()));
        }
        Ok(false) => {
            state.dispatch(AppCommand::SetStatus("already at the edge".to_owned()));
        }
        Err(error) => {
            state.dispatch(AppCommand::SetStatus(error.toast_text()));
        }
    }
}

fn handle_setting_open_edit(state: &mut AppState, view_data: &mut ViewData) -> Result<Flow> {
    if let Some(setting) = view_data.settings.get(view_data.settings_cursor) {
        view_data.settings_edit = Some(setting.value.display());
    }
    state.dispatch(AppCommand::SetStatus("editing setting".to_owned()));
    Ok(Flow::Continue)
}

fn handle_setting_edit_key<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> Result<Flow> {
    let Some(buffer) = view_data.settings_edit.as_mut() else {
        return Ok(Flow::Continue);
    };
    match key.code {
        KeyCode::Esc => {
            view_data.settings_edit = None;
            state.dispatch(AppCommand::SetStatus("edit canceled".to_owned()));
        }
        KeyCode::Backspace => {
            buffer.pop();
        }
        KeyCode::Char(ch) => buffer.push(ch),
        KeyCode::Enter => {
            let raw = buffer.clone();
            view_data.settings_edit = None;
            let Some(setting) = view_data.settings.get(view_data.settings_cursor) else {
                return Ok(Flow::Continue);
            };
            let key_kind = setting.key;
            match SettingValue::parse_for_key(key_kind, &raw) {
                Some(value) => {
                    let updated = AppSetting {
                        key: key_kind,
                        value,
                    };
                    match runtime.put_setting(&updated) {
                        Ok(()) => {
                            view_data.settings[view_data.settings_cursor] = updated;
                            state.dispatch(AppCommand::SetStatus("setting saved".to_owned()));
                        }
                        Err(error) => {
                            state.dispatch(AppCommand::SetStatus(error.toast_text()));
                        }
                    }
                }
                None => {
                    state.dispatch(AppCommand::SetStatus(format!(
                        "invalid value for {}",
                        key_kind.label()
                    )));
                }
            }
        }
        _ => {}
    }
    Ok(Flow::Continue)
}

fn handle_filter_key<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> Result<Flow> {
    let screen = state.active_screen;
    match key.code {
        KeyCode::Esc => {
            // Keystroke edits are discarded; the active set stays as-is.
            let active = view_data.list_mut(screen).active_filter().clone();
            *view_data.list_mut(screen).draft_mut() = active;
            view_data.filter_form.clear();
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Tab | KeyCode::Down => {
            if !view_data.filter_form.is_empty() {
                view_data.filter_focus = (view_data.filter_focus + 1) % view_data.filter_form.len();
            }
        }
        KeyCode::BackTab | KeyCode::Up => {
            if !view_data.filter_form.is_empty() {
                view_data.filter_focus = (view_data.filter_focus + view_data.filter_form.len() - 1)
                    % view_data.filter_form.len();
            }
        }
        KeyCode::Left | KeyCode::Right => {
            let focus = view_data.filter_focus;
            if let Some(field) = view_data.filter_form.get_mut(focus) {
                cycle_choice(field, key.code == KeyCode::Right);
            }
        }
        KeyCode::Backspace => {
            let focus = view_data.filter_focus;
            if let Some(field) = view_data.filter_form.get_mut(focus) {
                field.value.pop();
            }
        }
        KeyCode::Char(ch) => {
            let focus = view_data.filter_focus;
            if let Some(field) = view_data.filter_form.get_mut(focus) {
                if !matches!(field.kind, FieldKind::Choice(_) | FieldKind::Flag) {
                    field.value.push(ch);
                }
            }
        }
        KeyCode::Enter => {
            // Explicit confirmation: only now does the draft reach the
            // active filter set and the query string.
            let fields = view_data.filter_form.clone();
            match apply_filter_form(screen, &fields, view_data.list_mut(screen)) {
                Ok(()) => {
                    let outcome = view_data.list_mut(screen).apply_draft();
                    view_data.filter_form.clear();
                    state.dispatch(AppCommand::ExitToNav);
                    if outcome.is_noop() {
                        state.dispatch(AppCommand::SetStatus("filters unchanged".to_owned()));
                    } else {
                        if let Some(query) = outcome.navigation.clone() {
                            view_data.addresses.insert(screen, query);
                        }
                        run_refresh(state, runtime, view_data, screen, outcome.fetch);
                        view_data.set_cursor(screen, 0);
                        state.dispatch(AppCommand::SetStatus("filters applied".to_owned()));
                    }
                }
                Err(message) => {
                    state.dispatch(AppCommand::SetStatus(message));
                }
            }
        }
        _ => {}
    }
    Ok(Flow::Continue)
}

fn handle_form_key<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> Result<Flow> {
    let Some(mut form) = view_data.form.take() else {
        state.dispatch(AppCommand::ExitToNav);
        return Ok(Flow::Continue);
    };

    match (key.code, key.modifiers) {
        (KeyCode::Esc, _) => {
            // Form state is simply dropped; nothing was sent.
            state.dispatch(AppCommand::ExitToNav);
            return Ok(Flow::Continue);
        }
        (KeyCode::Tab, _) | (KeyCode::Down, _) => {
            form.focus = (form.focus + 1) % form.fields.len().max(1);
        }
        (KeyCode::BackTab, _) | (KeyCode::Up, _) => {
            let len = form.fields.len().max(1);
            form.focus = (form.focus + len - 1) % len;
        }
        (KeyCode::Left, _) | (KeyCode::Right, _) => {
            let focus = form.focus;
            if let Some(field) = form.fields.get_mut(focus) {
                cycle_choice(field, key.code == KeyCode::Right);
            }
        }
        (KeyCode::Char(' '), _) => {
            let focus = form.focus;
            if let Some(field) = form.fields.get_mut(focus) {
                if field.kind == FieldKind::Flag {
                    field.value = if field.value == "on" { "off" } else { "on" }.to_owned();
                } else if !matches!(field.kind, FieldKind::Choice(_)) {
                    field.value.push(' ');
                }
            }
        }
        (KeyCode::Char('o'), KeyModifiers::CONTROL) => {
            if form.screen == ScreenKind::ShopItems {
                add_option_fields(&mut form);
            }
        }
        (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
            upload_from_form(state, runtime, &mut form);
        }
        (KeyCode::Char('d'), KeyModifiers::CONTROL) => {
            if let Some(last) = form.attachments.last() {
                view_data.confirm = Some(ConfirmUiState {
                    kind: ConfirmKind::DeleteFile,
                    uids: vec![last.uid.as_str().to_owned()],
                    message: format!("Delete file {}?", last.file_name),
                });
                state.dispatch(AppCommand::OpenConfirm(ConfirmKind::DeleteFile));
                view_data.form = Some(form);
                return Ok(Flow::Continue);
            }
        }
        (KeyCode::Backspace, _) => {
            let focus = form.focus;
            if let Some(field) = form.fields.get_mut(focus) {
                field.value.pop();
            }
        }
        (KeyCode::Char(ch), _) => {
            let focus = form.focus;
            if let Some(field) = form.fields.get_mut(focus) {
                if !matches!(field.kind, FieldKind::Choice(_) | FieldKind::Flag) {
                    field.value.push(ch);
                }
            }
        }
        (KeyCode::Enter, _) => {
            return submit_form(state, runtime, view_data, form);
        }
        _ => {}
    }

    view_data.form = Some(form);
    Ok(Flow::Continue)
}

fn submit_form<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    mut form: FormUiState,
) -> Result<Flow> {
    let payload = match payload_from_form(&form) {
        Ok(payload) => payload,
        Err(errors) => {
            // Field-level errors pin to their controls; the form stays
            // open with everything the admin typed.
            form.errors = errors;
            view_data.form = Some(form);
            return Ok(Flow::Continue);
        }
    };

    let screen = form.screen;
    let result = match &form.editing_uid {
        Some(uid) => runtime.submit_update(uid, &payload),
        None => runtime.submit_create(&payload),
    };
    match result {
        Ok(()) => {
            let editing = form.editing_uid.clone();
            state.dispatch(AppCommand::ExitToNav);
            match editing {
                Some(uid) => {
                    // Optimistic merge of the edited row, then background
                    // reconcile.
                    match runtime.fetch_row(screen, &uid) {
                        Ok(row) => {
                            let refresh = view_data.list_mut(screen).apply_update(row);
                            run_refresh(state, runtime, view_data, screen, refresh);
                        }
                        Err(_) => {
                            let refresh = view_data.list_mut(screen).invalidate_and_refresh();
                            run_refresh(state, runtime, view_data, screen, refresh);
                        }
                    }
                    state.dispatch(AppCommand::SetStatus("saved".to_owned()));
                }
                None => {
                    let refresh = view_data.list_mut(screen).invalidate_and_refresh();
                    run_refresh(state, runtime, view_data, screen, refresh);
                    state.dispatch(AppCommand::SetStatus("created".to_owned()));
                }
            }
        }
        Err(ActionError::Validation(errors)) => {
            form.errors = errors;
            view_data.form = Some(form);
        }
        Err(error) => {
            // Action failure: toast, keep the form for retry.
            state.dispatch(AppCommand::SetStatus(error.toast_text()));
            view_data.form = Some(form);
        }
    }
    Ok(Flow::Continue)
}

fn upload_from_form<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    form: &mut FormUiState,
) {
    let Some(path_field) = form
        .fields
        .iter_mut()
        .find(|field| field.kind == FieldKind::Path)
    else {
        return;
    };
    let path = path_field.value.trim().to_owned();
    if path.is_empty() {
        state.dispatch(AppCommand::SetStatus("type a file path first".to_owned()));
        return;
    }
    let data = match std::fs::read(&path) {
        Ok(data) => data,
        Err(error) => {
            state.dispatch(AppCommand::SetStatus(format!("read {path}: {error}")));
            return;
        }
    };
    let file_name = std::path::Path::new(&path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.clone());
    let upload = AttachmentUpload {
        uid: AttachmentUid::generate(),
        // The record uid exists client-side even before the record does.
        owner_uid: form.record_uid.clone(),
        mime_type: mime_for(&file_name),
        file_name,
        data,
    };
    match runtime.upload_attachment(&upload) {
        Ok(stored) => {
            form.attachments.push(stored);
            path_field.value.clear();
            state.dispatch(AppCommand::SetStatus("file uploaded".to_owned()));
        }
        Err(error) => {
            state.dispatch(AppCommand::SetStatus(error.toast_text()));
        }
    }
}

fn handle_confirm_key<R: BackofficeRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    key: KeyEvent,
) -> Result<Flow> {
    let Some(confirm) = view_data.confirm.take() else {
        state.dispatch(AppCommand::ExitToNav);
        return Ok(Flow::Continue);
    };

    let approved = matches!(key.code, KeyCode::Char('y') | KeyCode::Enter);
    if !approved {
        if view_data.form.is_some() {
            // Back into the form the confirm was opened from.
            let kind = form_kind_for(state.active_screen).expect("form kind");
            state.dispatch(AppCommand::OpenForm(kind));
        } else {
            state.dispatch(AppCommand::ExitToNav);
        }
        state.dispatch(AppCommand::SetStatus("canceled".to_owned()));
        return Ok(Flow::Continue);
    }

    match confirm.kind {
        ConfirmKind::DeleteOne | ConfirmKind::DeleteSelected => {
            let screen = state.active_screen;
            match runtime.delete_rows(screen, &confirm.uids) {
                Ok(removed) => {
                    state.dispatch(AppCommand::ExitToNav);
                    // Optimistic local removal plus background
                    // invalidation, in that order.
                    let refresh = view_data.list_mut(screen).apply_deletion(&confirm.uids);
                    run_refresh(state, runtime, view_data, screen, refresh);
                    let rows = view_data.list_mut(screen).rows().len();
                    if rows > 0 && view_data.cursor(screen) >= rows {
                        view_data.set_cursor(screen, rows - 1);
                    }
                    state.dispatch(AppCommand::SetStatus(format!("{removed} rows deleted")));
                }
                Err(error) => {
                    state.dispatch(AppCommand::ExitToNav);
                    state.dispatch(AppCommand::SetStatus(error.toast_text()));
                }
            }
        }
        ConfirmKind::DeleteFile => {
            let uid = confirm.uids.first().cloned().unwrap_or_default();
            if view_data.form.is_some() {
                let kind = form_kind_for(state.active_screen).expect("form kind");
                state.dispatch(AppCommand::OpenForm(kind));
            } else {
                state.dispatch(AppCommand::ExitToNav);
            }
            match runtime.delete_attachment(&uid) {
                Ok(()) => {
                    if let Some(form) = view_data.form.as_mut() {
                        form.attachments.retain(|file| file.uid.as_str() != uid);
                    }
                    state.dispatch(AppCommand::SetStatus("file deleted".to_owned()));
                }
                Err(error) => {
                    state.dispatch(AppCommand::SetStatus(error.toast_text()));
                }
            }
        }
    }
    Ok(Flow::Continue)
}

fn cycle_choice(field: &mut FormField, forward: bool) {
    let FieldKind::Choice(choices) = field.kind else {
        return;
    };
    if choices.is_empty() {
        return;
    }
    let current = choices
        .iter()
        .position(|choice| *choice == field.value)
        .unwrap_or(0);
    let len = choices.len();
    let next = if forward {
        (current + 1) % len
    } else {
        (current + len - 1) % len
    };
    field.value = choices[next].to_owned();
}

// --- filter form plumbing ---

fn filter_fields(screen: ScreenKind, draft: &tablero_sync::FilterState) -> Vec<FormField> {
    let mut fields = vec![
        FormField::new("q", "search", FieldKind::Text, draft.q.clone()),
        FormField::new(
            "start_date",
            "from (YYYY-MM-DD)",
            FieldKind::Date,
            draft.start_date.map(|d| format_date(Some(d))).unwrap_or_default(),
        ),
        FormField::new(
            "end_date",
            "to (YYYY-MM-DD)",
            FieldKind::Date,
            draft.end_date.map(|d| format_date(Some(d))).unwrap_or_default(),
        ),
        FormField::new(
            "order",
            "order",
            FieldKind::Choice(&["desc", "asc"]),
            draft.order.as_str(),
        ),
        FormField::new("limit", "page size", FieldKind::Int, draft.limit.to_string()),
    ];
    match screen {
        ScreenKind::Posts => fields.push(FormField::new(
            "board",
            "board",
            FieldKind::Choice(&["", "notice", "faq", "event", "free"]),
            draft.extra.get("board").cloned().unwrap_or_default(),
        )),
        ScreenKind::Payments => fields.push(FormField::new(
            "status",
            "status",
            FieldKind::Choice(&["", "paid", "canceled", "refunded"]),
            draft.extra.get("status").cloned().unwrap_or_default(),
        )),
        ScreenKind::Users => fields.push(FormField::new(
            "grade",
            "grade",
            FieldKind::Choice(&["", "normal", "vip", "admin"]),
            draft.extra.get("grade").cloned().unwrap_or_default(),
        )),
        ScreenKind::Points => fields.push(FormField::new(
            "kind",
            "kind",
            FieldKind::Choice(&["", "earn", "spend"]),
            draft.extra.get("kind").cloned().unwrap_or_default(),
        )),
        _ => {}
    }
    fields
}

fn apply_filter_form(
    _screen: ScreenKind,
    fields: &[FormField],
    list: &mut ListScreen<RowView>,
) -> std::result::Result<(), String> {
    let mut q = String::new();
    let mut start_date = None;
    let mut end_date = None;
    let mut order = list.draft().order;
    let mut limit = list.draft().limit;
    let mut extra = list.draft().extra.clone();

    for field in fields {
        match field.name.as_str() {
            "q" => q = field.value.trim().to_owned(),
            "start_date" => {
                start_date = parse_optional_date(&field.value)
                    .map_err(|_| format!("invalid from date {:?}; use YYYY-MM-DD", field.value))?;
            }
            "end_date" => {
                end_date = parse_optional_date(&field.value)
                    .map_err(|_| format!("invalid to date {:?}; use YYYY-MM-DD", field.value))?;
            }
            "order" => {
                if let Some(parsed) = tablero_app::SortDirection::parse(&field.value) {
                    order = parsed;
                }
            }
            "limit" => {
                limit = parse_required_int(&field.value)
                    .ok()
                    .and_then(|value| usize::try_from(value).ok())
                    .filter(|value| *value > 0)
                    .ok_or_else(|| format!("invalid page size {:?}", field.value))?;
            }
            extra_key => {
                if field.value.is_empty() {
                    extra.remove(extra_key);
                } else {
                    extra.insert(extra_key.to_owned(), field.value.clone());
                }
            }
        }
    }

    let draft = list.draft_mut();
    draft.q = q;
    draft.start_date = start_date;
    draft.end_date = end_date;
    draft.order = order;
    draft.limit = limit;
    draft.extra = extra;
    Ok(())
}

// --- entity form plumbing ---

fn form_kind_for(screen: ScreenKind) -> Option<FormKind> {
    match screen {
        ScreenKind::Users => Some(FormKind::User),
        ScreenKind::Companies => Some(FormKind::Company),
        ScreenKind::Posts => Some(FormKind::Post),
        ScreenKind::Comments => Some(FormKind::Comment),
        ScreenKind::Points => Some(FormKind::PointEntry),
        ScreenKind::ShopItems => Some(FormKind::ShopItem),
        ScreenKind::Addresses => Some(FormKind::Address),
        ScreenKind::Payments | ScreenKind::Settings => None,
    }
}

fn supports_attachments(screen: ScreenKind) -> bool {
    matches!(screen, ScreenKind::Posts | ScreenKind::ShopItems)
}

fn blank_form(screen: ScreenKind) -> Option<FormUiState> {
    let kind = form_kind_for(screen)?;
    let payload = FormPayload::blank_for(kind);
    Some(form_from_payload(screen, &payload))
}

fn form_from_payload(screen: ScreenKind, payload: &FormPayload) -> FormUiState {
    let mut fields = Vec::new();
    let mut option_count = 0;
    match payload {
        FormPayload::User(form) => {
            fields.push(FormField::new("login_id", "login id", FieldKind::Text, form.login_id.clone()));
            fields.push(FormField::new("name", "name", FieldKind::Text, form.name.clone()));
            fields.push(FormField::new("email", "email", FieldKind::Text, form.email.clone()));
            fields.push(FormField::new("phone", "phone", FieldKind::Text, form.phone.clone()));
            fields.push(FormField::new(
                "grade",
                "grade",
                FieldKind::Choice(&["normal", "vip", "admin"]),
                form.grade.as_str(),
            ));
        }
        FormPayload::Company(form) => {
            fields.push(FormField::new("name", "name", FieldKind::Text, form.name.clone()));
            fields.push(FormField::new("business_no", "business no", FieldKind::Text, form.business_no.clone()));
            fields.push(FormField::new("ceo_name", "ceo", FieldKind::Text, form.ceo_name.clone()));
            fields.push(FormField::new("phone", "phone", FieldKind::Text, form.phone.clone()));
            fields.push(FormField::new("city", "city", FieldKind::Text, form.city.clone()));
        }
        FormPayload::Post(form) => {
            fields.push(FormField::new(
                "board",
                "board",
                FieldKind::Choice(&["notice", "faq", "event", "free"]),
                form.board.as_str(),
            ));
            fields.push(FormField::new("title", "title", FieldKind::Text, form.title.clone()));
            fields.push(FormField::new("body", "body", FieldKind::Text, form.body.clone()));
            fields.push(FormField::new("user_uid", "writer uid", FieldKind::Text, form.user_uid.as_str()));
            fields.push(FormField::new(
                "is_visible",
                "visible",
                FieldKind::Flag,
                fmt_flag(form.is_visible),
            ));
            fields.push(FormField::new(
                "expired_at",
                "ends (YYYY-MM-DD)",
                FieldKind::Date,
                form.expired_at
                    .map(|ts| format_date(Some(ts.date())))
                    .unwrap_or_default(),
            ));
            fields.push(FormField::new("upload", "attach file path", FieldKind::Path, ""));
        }
        FormPayload::Comment(form) => {
            fields.push(FormField::new("post_uid", "post uid", FieldKind::Text, form.post_uid.as_str()));
            fields.push(FormField::new("user_uid", "writer uid", FieldKind::Text, form.user_uid.as_str()));
            fields.push(FormField::new("body", "body", FieldKind::Text, form.body.clone()));
            fields.push(FormField::new(
                "is_visible",
                "visible",
                FieldKind::Flag,
                fmt_flag(form.is_visible),
            ));
        }
        FormPayload::PointEntry(form) => {
            fields.push(FormField::new("user_uid", "user uid", FieldKind::Text, form.user_uid.as_str()));
            fields.push(FormField::new(
                "kind",
                "kind",
                FieldKind::Choice(&["earn", "spend"]),
                form.kind.as_str(),
            ));
            fields.push(FormField::new("amount", "amount", FieldKind::Int, form.amount.to_string()));
            fields.push(FormField::new("reason", "reason", FieldKind::Text, form.reason.clone()));
            fields.push(FormField::new(
                "expired_at",
                "expires (YYYY-MM-DD)",
                FieldKind::Date,
                form.expired_at
                    .map(|ts| format_date(Some(ts.date())))
                    .unwrap_or_default(),
            ));
        }
        FormPayload::ShopItem(form) => {
            fields.push(FormField::new("name", "name", FieldKind::Text, form.name.clone()));
            fields.push(FormField::new(
                "price_cents",
                "price",
                FieldKind::Money,
                format_cents(form.price_cents),
            ));
            fields.push(FormField::new("stock", "stock", FieldKind::Int, form.stock.to_string()));
            for option in &form.options {
                fields.push(FormField::new(
                    &format!("option_name_{option_count}"),
                    &format!("option {} name", option_count + 1),
                    FieldKind::Text,
                    option.name.clone(),
                ));
                fields.push(FormField::new(
                    &format!("option_extra_{option_count}"),
                    &format!("option {} surcharge", option_count + 1),
                    FieldKind::Money,
                    format_cents(option.extra_cents),
                ));
                option_count += 1;
            }
            fields.push(FormField::new("upload", "attach file path", FieldKind::Path, ""));
        }
        FormPayload::Address(form) => {
            fields.push(FormField::new("user_uid", "user uid", FieldKind::Text, form.user_uid.as_str()));
            fields.push(FormField::new("label", "label", FieldKind::Text, form.label.clone()));
            fields.push(FormField::new("recipient", "recipient", FieldKind::Text, form.recipient.clone()));
            fields.push(FormField::new("postal_code", "postal code", FieldKind::Text, form.postal_code.clone()));
            fields.push(FormField::new("line1", "address line 1", FieldKind::Text, form.line1.clone()));
            fields.push(FormField::new("line2", "address line 2", FieldKind::Text, form.line2.clone()));
            fields.push(FormField::new(
                "is_default",
                "default address",
                FieldKind::Flag,
                fmt_flag(form.is_default),
            ));
        }
    }

    FormUiState {
        screen,
        editing_uid: None,
        record_uid: payload.uid().to_owned(),
        fields,
        focus: 0,
        errors: FieldErrors::new(),
        option_count,
        attachments: Vec::new(),
    }
}

fn add_option_fields(form: &mut FormUiState) {
    let index = form.option_count;
    // Keep the upload field last.
    let insert_at = form
        .fields
        .iter()
        .position(|field| field.kind == FieldKind::Path)
        .unwrap_or(form.fields.len());
    form.fields.insert(
        insert_at,
        FormField::new(
            &format!("option_extra_{index}"),
            &format!("option {} surcharge", index + 1),
            FieldKind::Money,
            "$0.00",
        ),
    );
    form.fields.insert(
        insert_at,
        FormField::new(
            &format!("option_name_{index}"),
            &format!("option {} name", index + 1),
            FieldKind::Text,
            "",
        ),
    );
    form.option_count += 1;
}

fn field_value<'a>(form: &'a FormUiState, name: &str) -> &'a str {
    form.fields
        .iter()
        .find(|field| field.name == name)
        .map_or("", |field| field.value.as_str())
}

fn parse_money_field(
    form: &FormUiState,
    name: &'static str,
    errors: &mut FieldErrors,
) -> i64 {
    match parse_required_cents(field_value(form, name)) {
        Ok(cents) => cents,
        Err(error) => {
            errors.push(name, error.to_string());
            0
        }
    }
}

fn parse_int_field(form: &FormUiState, name: &'static str, errors: &mut FieldErrors) -> i64 {
    match parse_required_int(field_value(form, name)) {
        Ok(value) => value,
        Err(error) => {
            errors.push(name, error.to_string());
            0
        }
    }
}

fn parse_date_field(
    form: &FormUiState,
    name: &'static str,
    errors: &mut FieldErrors,
) -> Option<OffsetDateTime> {
    match parse_optional_date(field_value(form, name)) {
        Ok(date) => date.map(date_to_timestamp),
        Err(error) => {
            errors.push(name, error.to_string());
            None
        }
    }
}

// Rebuilds the typed payload from the field buffers. Parse failures and
// domain validation failures land in the same field-keyed error set.
fn payload_from_form(form: &FormUiState) -> std::result::Result<FormPayload, FieldErrors> {
    let mut errors = FieldErrors::new();
    let payload = match form.screen {
        ScreenKind::Users => FormPayload::User(UserFormInput {
            uid: UserUid::new(form.record_uid.clone()),
            login_id: field_value(form, "login_id").to_owned(),
            name: field_value(form, "name").to_owned(),
            email: field_value(form, "email").to_owned(),
            phone: field_value(form, "phone").to_owned(),
            grade: UserGrade::parse(field_value(form, "grade")).unwrap_or(UserGrade::Normal),
        }),
        ScreenKind::Companies => FormPayload::Company(CompanyFormInput {
            uid: CompanyUid::new(form.record_uid.clone()),
            name: field_value(form, "name").to_owned(),
            business_no: field_value(form, "business_no").to_owned(),
            ceo_name: field_value(form, "ceo_name").to_owned(),
            phone: field_value(form, "phone").to_owned(),
            city: field_value(form, "city").to_owned(),
        }),
        ScreenKind::Posts => FormPayload::Post(PostFormInput {
            uid: PostUid::new(form.record_uid.clone()),
            board: BoardKind::parse(field_value(form, "board")).unwrap_or(BoardKind::Notice),
            user_uid: UserUid::new(field_value(form, "user_uid")),
            title: field_value(form, "title").to_owned(),
            body: field_value(form, "body").to_owned(),
            is_visible: field_value(form, "is_visible") == "on",
            expired_at: parse_date_field(form, "expired_at", &mut errors),
        }),
        ScreenKind::Comments => FormPayload::Comment(CommentFormInput {
            uid: CommentUid::new(form.record_uid.clone()),
            post_uid: PostUid::new(field_value(form, "post_uid")),
            user_uid: UserUid::new(field_value(form, "user_uid")),
            body: field_value(form, "body").to_owned(),
            is_visible: field_value(form, "is_visible") == "on",
        }),
        ScreenKind::Points => FormPayload::PointEntry(PointEntryFormInput {
            uid: PointEntryUid::new(form.record_uid.clone()),
            user_uid: UserUid::new(field_value(form, "user_uid")),
            kind: PointKind::parse(field_value(form, "kind")).unwrap_or(PointKind::Earn),
            amount: parse_int_field(form, "amount", &mut errors),
            reason: field_value(form, "reason").to_owned(),
            expired_at: parse_date_field(form, "expired_at", &mut errors),
        }),
        ScreenKind::ShopItems => {
            let mut options = Vec::with_capacity(form.option_count);
            for index in 0..form.option_count {
                let name_key = format!("option_name_{index}");
                let extra_key = format!("option_extra_{index}");
                let extra = match parse_required_cents(field_value(form, &extra_key)) {
                    Ok(cents) => cents,
                    Err(error) => {
                        errors.push("options", error.to_string());
                        0
                    }
                };
                options.push(ItemOptionFormInput {
                    uid: ItemOptionUid::generate(),
                    name: field_value(form, &name_key).to_owned(),
                    extra_cents: extra,
                });
            }
            FormPayload::ShopItem(ShopItemFormInput {
                uid: ShopItemUid::new(form.record_uid.clone()),
                name: field_value(form, "name").to_owned(),
                price_cents: parse_money_field(form, "price_cents", &mut errors),
                stock: parse_int_field(form, "stock", &mut errors),
                options,
            })
        }
        ScreenKind::Addresses => FormPayload::Address(AddressFormInput {
            uid: AddressUid::new(form.record_uid.clone()),
            user_uid: UserUid::new(field_value(form, "user_uid")),
            label: field_value(form, "label").to_owned(),
            recipient: field_value(form, "recipient").to_owned(),
            postal_code: field_value(form, "postal_code").to_owned(),
            line1: field_value(form, "line1").to_owned(),
            line2: field_value(form, "line2").to_owned(),
            is_default: field_value(form, "is_default") == "on",
        }),
        ScreenKind::Payments | ScreenKind::Settings => {
            errors.push("form", "this screen has no form");
            return Err(errors);
        }
    };

    if let Err(domain_errors) = payload.validate() {
        for error in domain_errors.iter() {
            errors.push(error.field, error.message.clone());
        }
    }
    if errors.is_empty() { Ok(payload) } else { Err(errors) }
}

fn mime_for(file_name: &str) -> String {
    let extension = file_name.rsplit('.').next().unwrap_or("");
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        _ => "application/octet-stream",
    }
    .to_owned()
}

// --- rendering ---

fn render(
    frame: &mut ratatui::Frame<'_>,
    state: &AppState,
    view_data: &ViewData,
    launch: &Launch,
) {
    let chunks = Layout::vertical([
        Constraint::Length(2),
        Constraint::Length(2),
        Constraint::Min(3),
        Constraint::Length(2),
    ])
    .split(frame.area());

    render_tabs(frame, chunks[0], state, launch);
    render_address(frame, chunks[1], state, view_data);
    if state.active_screen == ScreenKind::Settings {
        render_settings(frame, chunks[2], view_data);
    } else {
        render_table(frame, chunks[2], state, view_data, launch);
    }
    render_footer(frame, chunks[3], state, view_data, launch);

    match state.mode {
        AppMode::FilterEdit => render_field_box(
            frame,
            "filters (enter apply, esc cancel)",
            &view_data.filter_form,
            view_data.filter_focus,
            None,
        ),
        AppMode::Form(_) => {
            if let Some(form) = &view_data.form {
                let title = match &form.editing_uid {
                    Some(uid) => format!("edit {} (enter save)", short_uid(uid)),
                    None => "create (enter save)".to_owned(),
                };
                render_form_box(frame, &title, form, launch.asset_base.as_deref());
            }
        }
        AppMode::Confirm(_) => {
            if let Some(confirm) = &view_data.confirm {
                render_confirm(frame, confirm);
            }
        }
        AppMode::Nav => {}
    }
}

fn render_tabs(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState, launch: &Launch) {
    let titles: Vec<Line<'_>> = ScreenKind::ALL
        .iter()
        .map(|screen| Line::from(launch.lexicon.label(screen.label()).to_owned()))
        .collect();
    let selected = ScreenKind::ALL
        .iter()
        .position(|screen| *screen == state.active_screen)
        .unwrap_or(0);
    let tabs = Tabs::new(titles)
        .select(selected)
        .highlight_style(Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED));
    frame.render_widget(tabs, area);
}

fn render_address(frame: &mut ratatui::Frame<'_>, area: Rect, state: &AppState, view_data: &ViewData) {
    let query = view_data
        .addresses
        .get(&state.active_screen)
        .cloned()
        .unwrap_or_default();
    let line = Line::from(vec![
        Span::styled("? ", Style::default().fg(Color::DarkGray)),
        Span::styled(query, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    view_data: &ViewData,
    launch: &Launch,
) {
    let screen = state.active_screen;
    let Some(list) = view_data.lists.get(&screen) else {
        return;
    };
    let columns = screen_columns(screen);
    let cursor = view_data.cursor(screen);

    let header = Row::new(
        std::iter::once(Cell::from(" "))
            .chain(columns.iter().map(|column| {
                Cell::from(launch.lexicon.label(column).to_owned())
            }))
            .collect::<Vec<_>>(),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row<'_>> = list
        .rows()
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let mark = if list.selection().contains(&row.uid) {
                "x"
            } else {
                " "
            };
            let mut style = Style::default();
            if row.visible == Some(false) {
                style = style.fg(Color::DarkGray);
            }
            if index == cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Row::new(
                std::iter::once(Cell::from(mark))
                    .chain(row.cells.iter().map(|cell| Cell::from(cell.clone())))
                    .collect::<Vec<_>>(),
            )
            .style(style)
        })
        .collect();

    let mut widths = vec![Constraint::Length(1)];
    widths.extend(columns.iter().map(|_| Constraint::Fill(1)));
    let loading = match list.phase() {
        ListPhase::LoadingInitial => " loading...",
        ListPhase::LoadingNextPage => " loading more...",
        _ => "",
    };
    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::TOP)
            .title(format!("{}{loading}", launch.lexicon.label(screen.label()))),
    );
    frame.render_widget(table, area);
}

fn render_settings(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let rows: Vec<Row<'_>> = view_data
        .settings
        .iter()
        .enumerate()
        .map(|(index, setting)| {
            let value = if index == view_data.settings_cursor {
                match &view_data.settings_edit {
                    Some(buffer) => format!("{buffer}_"),
                    None => setting.value.display(),
                }
            } else {
                setting.value.display()
            };
            let mut style = Style::default();
            if index == view_data.settings_cursor {
                style = style.add_modifier(Modifier::REVERSED);
            }
            Row::new(vec![
                Cell::from(setting.key.label().to_owned()),
                Cell::from(value),
            ])
            .style(style)
        })
        .collect();
    let table = Table::new(rows, [Constraint::Fill(1), Constraint::Fill(2)]).block(
        Block::default()
            .borders(Borders::TOP)
            .title("settings (enter edit)"),
    );
    frame.render_widget(table, area);
}

fn render_footer(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    view_data: &ViewData,
    launch: &Launch,
) {
    let screen = state.active_screen;
    let counts = view_data
        .lists
        .get(&screen)
        .map(|list| {
            format!(
                "{} of {} shown ({} all) | {} selected",
                list.rows().len(),
                list.total_filtered(),
                list.total_all(),
                list.selection().len(),
            )
        })
        .unwrap_or_default();
    let admin = format!(
        "{} [{}]",
        launch.session.admin_name,
        launch.session.grade.as_str()
    );
    let status = state.status_line.clone().unwrap_or_default();

    let first = Line::from(vec![
        Span::styled(counts, Style::default().fg(Color::DarkGray)),
        Span::raw("  "),
        Span::styled(status, Style::default().fg(Color::Yellow)),
    ]);
    let second = Line::from(Span::styled(
        format!(
            "{admin} | tab screens | / filter | r reset | x disabled | space select | a all | D delete | u restore | n new | e edit | v visibility | K/J reorder | q quit"
        ),
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(Paragraph::new(vec![first, second]), area);
}

fn render_field_box(
    frame: &mut ratatui::Frame<'_>,
    title: &str,
    fields: &[FormField],
    focus: usize,
    errors: Option<&FieldErrors>,
) {
    let area = centered_rect(frame.area(), 60, (fields.len() as u16 + 4).max(8));
    frame.render_widget(Clear, area);

    let mut lines = Vec::with_capacity(fields.len());
    for (index, field) in fields.iter().enumerate() {
        let marker = if index == focus { "> " } else { "  " };
        let mut spans = vec![
            Span::raw(marker.to_owned()),
            Span::styled(
                format!("{:<22}", field.label),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw(field.value.clone()),
        ];
        if index == focus {
            spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        }
        if let Some(errors) = errors
            && let Some(message) = errors.message_for(&field.name)
        {
            spans.push(Span::styled(
                format!("  ! {message}"),
                Style::default().fg(Color::Red),
            ));
        }
        lines.push(Line::from(spans));
    }

    let block = Block::default().borders(Borders::ALL).title(title.to_owned());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_form_box(
    frame: &mut ratatui::Frame<'_>,
    title: &str,
    form: &FormUiState,
    asset_base: Option<&str>,
) {
    let extra = form.attachments.len() as u16 + 2;
    let area = centered_rect(
        frame.area(),
        64,
        (form.fields.len() as u16 + extra + 4).max(10),
    );
    frame.render_widget(Clear, area);

    let mut lines = Vec::new();
    for (index, field) in form.fields.iter().enumerate() {
        let marker = if index == form.focus { "> " } else { "  " };
        let mut spans = vec![
            Span::raw(marker.to_owned()),
            Span::styled(
                format!("{:<22}", field.label),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw(field.value.clone()),
        ];
        if index == form.focus {
            spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        }
        if let Some(message) = form.errors.message_for(&field.name) {
            spans.push(Span::styled(
                format!("  ! {message}"),
                Style::default().fg(Color::Red),
            ));
        }
        lines.push(Line::from(spans));
    }
    if let Some(message) = form.errors.message_for("options") {
        lines.push(Line::from(Span::styled(
            format!("  ! options: {message}"),
            Style::default().fg(Color::Red),
        )));
    }
    if supports_attachments(form.screen) {
        lines.push(Line::from(Span::styled(
            format!(
                "files ({}): ctrl+u upload, ctrl+d delete last, ctrl+o add option",
                form.attachments.len()
            ),
            Style::default().fg(Color::DarkGray),
        )));
        for file in &form.attachments {
            let location = match asset_base {
                Some(base) => format!(
                    "{}/{}",
                    base.trim_end_matches('/'),
                    file.stored_path.trim_start_matches('/')
                ),
                None => file.stored_path.clone(),
            };
            lines.push(Line::from(Span::raw(format!(
                "  {} ({} bytes) -> {location}",
                file.file_name, file.size_bytes
            ))));
        }
    }

    let block = Block::default().borders(Borders::ALL).title(title.to_owned());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_confirm(frame: &mut ratatui::Frame<'_>, confirm: &ConfirmUiState) {
    let area = centered_rect(frame.area(), 44, 5);
    frame.render_widget(Clear, area);
    let block = Block::default().borders(Borders::ALL).title("confirm");
    let body = Paragraph::new(vec![
        Line::from(confirm.message.clone()),
        Line::from(Span::styled(
            "y confirm | any other key cancels",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .block(block);
    frame.render_widget(body, area);
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BackofficeRuntime, FormPayload, RowView, ViewData, blank_form, form_from_payload,
        handle_key, mime_for, mount_screen, payload_from_form,
    };
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use tablero_app::{
        ActionError, AppMode, AppSetting, AppState, Attachment, AttachmentUpload, ConfirmKind,
        FormKind, InlinePatch, ScreenKind, SortMove, UserGrade,
    };
    use tablero_sync::{FilterState, ListQuery, PageData};

    struct ScriptedRuntime {
        rows: Vec<RowView>,
        total_all: u64,
        total_filtered: u64,
        fetch_calls: Vec<ListQuery>,
        delete_calls: Vec<Vec<String>>,
        patch_calls: Vec<(String, InlinePatch)>,
    }

    impl ScriptedRuntime {
        fn with_rows(count: usize) -> Self {
            let rows = (0..count)
                .map(|index| RowView {
                    uid: format!("u{index}"),
                    cells: vec![
                        index.to_string(),
                        format!("login{index}"),
                        format!("User {index}"),
                        String::new(),
                        "normal".to_owned(),
                        "2026-01-09".to_owned(),
                    ],
                    visible: None,
                })
                .collect::<Vec<_>>();
            Self {
                total_all: count as u64,
                total_filtered: count as u64,
                rows,
                fetch_calls: Vec::new(),
                delete_calls: Vec::new(),
                patch_calls: Vec::new(),
            }
        }
    }

    impl BackofficeRuntime for ScriptedRuntime {
        fn fetch_page(
            &mut self,
            _screen: ScreenKind,
            query: &ListQuery,
        ) -> Result<PageData<RowView>, ActionError> {
            self.fetch_calls.push(query.clone());
            let start = query.offset.min(self.rows.len());
            let end = (query.offset + query.filter.limit).min(self.rows.len());
            Ok(PageData {
                rows: self.rows[start..end].to_vec(),
                total_all: self.total_all,
                total_filtered: self.total_filtered,
            })
        }

        fn fetch_row(&mut self, _screen: ScreenKind, uid: &str) -> Result<RowView, ActionError> {
            self.rows
                .iter()
                .find(|row| row.uid == uid)
                .cloned()
                .ok_or_else(|| ActionError::failed("row not found"))
        }

        fn load_form(
            &mut self,
            _screen: ScreenKind,
            _uid: &str,
        ) -> Result<FormPayload, ActionError> {
            Err(ActionError::failed("not scripted"))
        }

        fn submit_create(&mut self, _payload: &FormPayload) -> Result<(), ActionError> {
            Ok(())
        }

        fn submit_update(
            &mut self,
            _uid: &str,
            _payload: &FormPayload,
        ) -> Result<(), ActionError> {
            Ok(())
        }

        fn delete_rows(
            &mut self,
            _screen: ScreenKind,
            uids: &[String],
        ) -> Result<usize, ActionError> {
            self.delete_calls.push(uids.to_vec());
            self.rows.retain(|row| !uids.contains(&row.uid));
            let removed = uids.len();
            self.total_all = self.total_all.saturating_sub(removed as u64);
            self.total_filtered = self.total_filtered.saturating_sub(removed as u64);
            Ok(removed)
        }

        fn restore_rows(
            &mut self,
            _screen: ScreenKind,
            uids: &[String],
        ) -> Result<usize, ActionError> {
            Ok(uids.len())
        }

        fn inline_patch(
            &mut self,
            _screen: ScreenKind,
            uid: &str,
            patch: &InlinePatch,
        ) -> Result<(), ActionError> {
            self.patch_calls.push((uid.to_owned(), patch.clone()));
            if let InlinePatch::PostVisible(value) = patch
                && let Some(row) = self.rows.iter_mut().find(|row| row.uid == uid)
            {
                row.visible = Some(*value);
                if let Some(cell) = row.cells.get_mut(5) {
                    *cell = if *value { "on" } else { "off" }.to_owned();
                }
            }
            Ok(())
        }

        fn move_item(&mut self, _uid: &str, _direction: SortMove) -> Result<bool, ActionError> {
            Ok(true)
        }

        fn list_settings(&mut self) -> Result<Vec<AppSetting>, ActionError> {
            Ok(Vec::new())
        }

        fn put_setting(&mut self, _setting: &AppSetting) -> Result<(), ActionError> {
            Ok(())
        }

        fn list_attachments(&mut self, _owner_uid: &str) -> Result<Vec<Attachment>, ActionError> {
            Ok(Vec::new())
        }

        fn upload_attachment(
            &mut self,
            _upload: &AttachmentUpload,
        ) -> Result<Attachment, ActionError> {
            Err(ActionError::failed("not scripted"))
        }

        fn delete_attachment(&mut self, _uid: &str) -> Result<(), ActionError> {
            Ok(())
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn mounted(
        runtime: &mut ScriptedRuntime,
        limit: usize,
    ) -> (AppState, ViewData) {
        let mut state = AppState::default();
        let mut view_data = ViewData::new();
        let mut baseline = FilterState::default_for(ScreenKind::Users);
        baseline.limit = limit;
        mount_screen(&mut state, runtime, &mut view_data, ScreenKind::Users, baseline);
        (state, view_data)
    }

    #[test]
    fn scrolling_to_the_bottom_pages_in_the_rest_without_duplicates() {
        let mut runtime = ScriptedRuntime::with_rows(12);
        let (mut state, mut view_data) = mounted(&mut runtime, 5);
        assert_eq!(runtime.fetch_calls.len(), 1);

        for _ in 0..30 {
            handle_key(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('j')))
                .expect("cursor move");
        }

        let list = view_data.lists.get(&ScreenKind::Users).expect("list");
        assert_eq!(list.rows().len(), 12);
        // Initial page plus exactly two sentinel-driven fetches; further
        // cursor movement past the last page fetches nothing.
        assert_eq!(runtime.fetch_calls.len(), 3);

        let mut uids: Vec<_> = list.rows().iter().map(|row| row.uid.clone()).collect();
        let total = uids.len();
        uids.sort();
        uids.dedup();
        assert_eq!(uids.len(), total);
    }

    #[test]
    fn bulk_delete_flow_confirms_deletes_and_reconciles() {
        let mut runtime = ScriptedRuntime::with_rows(5);
        runtime.total_all = 50;
        runtime.total_filtered = 20;
        let (mut state, mut view_data) = mounted(&mut runtime, 20);

        // Select rows u0 and u1.
        handle_key(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char(' ')))
            .expect("select");
        handle_key(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('j')))
            .expect("move");
        handle_key(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char(' ')))
            .expect("select");

        handle_key(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('D')))
            .expect("open confirm");
        assert_eq!(state.mode, AppMode::Confirm(ConfirmKind::DeleteSelected));

        handle_key(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('y')))
            .expect("confirm");

        assert_eq!(runtime.delete_calls.len(), 1);
        assert_eq!(runtime.delete_calls[0], vec!["u0".to_owned(), "u1".to_owned()]);

        let list = view_data.lists.get(&ScreenKind::Users).expect("list");
        assert_eq!(list.rows().len(), 3);
        // The background reconcile fetched the server's counts.
        assert_eq!(list.total_all(), 48);
        assert_eq!(list.total_filtered(), 18);
        assert!(list.selection().is_empty());
        assert_eq!(state.mode, AppMode::Nav);
    }

    #[test]
    fn canceling_the_confirm_touches_nothing() {
        let mut runtime = ScriptedRuntime::with_rows(3);
        let (mut state, mut view_data) = mounted(&mut runtime, 20);

        handle_key(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('d')))
            .expect("open confirm");
        handle_key(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('n')))
            .expect("cancel");

        assert!(runtime.delete_calls.is_empty());
        let list = view_data.lists.get(&ScreenKind::Users).expect("list");
        assert_eq!(list.rows().len(), 3);
        assert_eq!(state.mode, AppMode::Nav);
    }

    #[test]
    fn filter_flow_applies_once_and_is_idempotent() {
        let mut runtime = ScriptedRuntime::with_rows(4);
        let (mut state, mut view_data) = mounted(&mut runtime, 20);
        let fetches_after_mount = runtime.fetch_calls.len();

        handle_key(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('/')))
            .expect("enter filter edit");
        assert_eq!(state.mode, AppMode::FilterEdit);

        for ch in "kim".chars() {
            handle_key(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char(ch)))
                .expect("type");
        }
        handle_key(&mut state, &mut runtime, &mut view_data, key(KeyCode::Enter))
            .expect("apply");

        assert_eq!(state.mode, AppMode::Nav);
        assert_eq!(runtime.fetch_calls.len(), fetches_after_mount + 1);
        let applied = runtime.fetch_calls.last().expect("applied fetch");
        assert_eq!(applied.filter.q, "kim");
        assert_eq!(applied.offset, 0);
        let address = view_data
            .addresses
            .get(&ScreenKind::Users)
            .expect("address");
        assert!(address.contains("q=kim"));

        // Re-applying the identical filter set fetches nothing.
        handle_key(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('/')))
            .expect("enter filter edit");
        handle_key(&mut state, &mut runtime, &mut view_data, key(KeyCode::Enter))
            .expect("apply unchanged");
        assert_eq!(runtime.fetch_calls.len(), fetches_after_mount + 1);
        assert_eq!(state.status_line.as_deref(), Some("filters unchanged"));
    }

    #[test]
    fn form_round_trips_between_payload_and_fields() {
        let payload = FormPayload::blank_for(FormKind::User);
        let mut form = form_from_payload(ScreenKind::Users, &payload);
        for field in &mut form.fields {
            match field.name.as_str() {
                "login_id" => field.value = "sora.kim".to_owned(),
                "name" => field.value = "Sora Kim".to_owned(),
                "email" => field.value = "sora@example.com".to_owned(),
                "grade" => field.value = "vip".to_owned(),
                _ => {}
            }
        }

        let rebuilt = payload_from_form(&form).expect("valid form");
        let FormPayload::User(user) = rebuilt else {
            panic!("unexpected payload kind");
        };
        assert_eq!(user.login_id, "sora.kim");
        assert_eq!(user.grade, UserGrade::Vip);
        assert_eq!(user.uid.as_str(), payload.uid());
    }

    #[test]
    fn invalid_form_input_lands_on_its_field() {
        let mut form = blank_form(ScreenKind::Points).expect("points form");
        for field in &mut form.fields {
            match field.name.as_str() {
                "user_uid" => field.value = "u-1".to_owned(),
                "amount" => field.value = "lots".to_owned(),
                "reason" => field.value = "bonus".to_owned(),
                "expired_at" => field.value = "tomorrow".to_owned(),
                _ => {}
            }
        }

        let errors = payload_from_form(&form).expect_err("parse errors expected");
        assert!(errors.message_for("amount").is_some());
        assert!(errors.message_for("expired_at").is_some());
    }

    #[test]
    fn visibility_toggle_patches_and_merges() {
        let mut runtime = ScriptedRuntime::with_rows(3);
        let mut state = AppState::default();
        state.active_screen = ScreenKind::Posts;
        let mut view_data = ViewData::new();
        // Hand-build a posts page whose rows carry visibility flags.
        for row in &mut runtime.rows {
            row.visible = Some(true);
            row.cells = vec![
                "1".to_owned(),
                "notice".to_owned(),
                "Title".to_owned(),
                "writer".to_owned(),
                "0".to_owned(),
                "on".to_owned(),
                "2026-01-09".to_owned(),
            ];
        }
        mount_screen(
            &mut state,
            &mut runtime,
            &mut view_data,
            ScreenKind::Posts,
            FilterState::default_for(ScreenKind::Posts),
        );

        handle_key(&mut state, &mut runtime, &mut view_data, key(KeyCode::Char('v')))
            .expect("toggle visibility");

        assert_eq!(runtime.patch_calls.len(), 1);
        assert_eq!(runtime.patch_calls[0].0, "u0");
        assert_eq!(
            runtime.patch_calls[0].1,
            InlinePatch::PostVisible(false)
        );
        let list = view_data.lists.get(&ScreenKind::Posts).expect("list");
        assert_eq!(list.rows()[0].cells[5], "off");
    }

    #[test]
    fn mime_lookup_covers_common_extensions() {
        assert_eq!(mime_for("banner.PNG"), "image/png");
        assert_eq!(mime_for("doc.pdf"), "application/pdf");
        assert_eq!(mime_for("mystery"), "application/octet-stream");
    }
}
