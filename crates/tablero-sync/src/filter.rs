// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use tablero_app::{DateField, ScreenKind, SortDirection};
use time::Date;
use time::macros::format_description;
use url::form_urlencoded;

pub const DEFAULT_PAGE_LIMIT: usize = 20;
pub const MAX_PAGE_LIMIT: usize = 100;

// The filter set behind one list screen. The visible filter form edits a
// draft copy; only an explicit apply/reset promotes it to the active set
// and to the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub q: String,
    pub date_field: DateField,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub sort_by: String,
    pub order: SortDirection,
    pub limit: usize,
    pub extra: BTreeMap<String, String>,
}

impl FilterState {
    pub fn default_for(screen: ScreenKind) -> Self {
        Self {
            q: String::new(),
            date_field: DateField::Created,
            start_date: None,
            end_date: None,
            sort_by: default_sort_key(screen).to_owned(),
            order: SortDirection::Desc,
            limit: DEFAULT_PAGE_LIMIT,
            extra: BTreeMap::new(),
        }
    }

    // A reversed period range is swapped rather than rejected.
    pub fn normalized(&self) -> Self {
        let mut normalized = self.clone();
        if let (Some(start), Some(end)) = (normalized.start_date, normalized.end_date)
            && end < start
        {
            normalized.start_date = Some(end);
            normalized.end_date = Some(start);
        }
        normalized.limit = normalized.limit.clamp(1, MAX_PAGE_LIMIT);
        normalized
    }

    // Canonical query-string form; also the cache signature. Fixed key
    // order so equal filter sets always produce byte-equal strings.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if !self.q.is_empty() {
            serializer.append_pair("q", &self.q);
        }
        serializer.append_pair("date_type", self.date_field.as_str());
        if let Some(start) = self.start_date {
            serializer.append_pair("start_date", &format_date(start));
        }
        if let Some(end) = self.end_date {
            serializer.append_pair("end_date", &format_date(end));
        }
        serializer.append_pair("sort_by", &self.sort_by);
        serializer.append_pair("order", self.order.as_str());
        serializer.append_pair("limit", &self.limit.to_string());
        for (key, value) in &self.extra {
            if !value.is_empty() {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }

    // Inverse of `to_query_string`: reloading or sharing a URL reproduces
    // the same filter set. Unknown keys land in `extra`; unparsable
    // values fall back to the screen defaults.
    pub fn from_query_string(screen: ScreenKind, query: &str) -> Self {
        let mut filter = Self::default_for(screen);
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "q" => filter.q = value.into_owned(),
                "date_type" => {
                    if let Some(field) = DateField::parse(&value) {
                        filter.date_field = field;
                    }
                }
                "start_date" => filter.start_date = parse_date(&value),
                "end_date" => filter.end_date = parse_date(&value),
                "sort_by" => {
                    if allowed_sort_keys(screen).contains(&value.as_ref()) {
                        filter.sort_by = value.into_owned();
                    }
                }
                "order" => {
                    if let Some(order) = SortDirection::parse(&value) {
                        filter.order = order;
                    }
                }
                "limit" => {
                    if let Ok(limit) = value.parse::<usize>() {
                        filter.limit = limit.clamp(1, MAX_PAGE_LIMIT);
                    }
                }
                _ => {
                    if !value.is_empty() {
                        filter.extra.insert(key.into_owned(), value.into_owned());
                    }
                }
            }
        }
        filter
    }

    pub fn signature(&self) -> String {
        self.to_query_string()
    }
}

pub fn default_sort_key(screen: ScreenKind) -> &'static str {
    match screen {
        ScreenKind::ShopItems => "sort_order",
        ScreenKind::Payments => "paid_at",
        _ => "created_at",
    }
}

pub fn allowed_sort_keys(screen: ScreenKind) -> &'static [&'static str] {
    match screen {
        ScreenKind::Users => &["created_at", "name", "login_id"],
        ScreenKind::Companies => &["created_at", "name"],
        ScreenKind::Posts => &["created_at", "title", "view_count"],
        ScreenKind::Comments => &["created_at"],
        ScreenKind::Payments => &["paid_at", "created_at", "amount_cents"],
        ScreenKind::Points => &["created_at", "amount"],
        ScreenKind::ShopItems => &["sort_order", "created_at", "name", "price_cents"],
        ScreenKind::Addresses => &["created_at", "recipient"],
        ScreenKind::Settings => &["created_at"],
    }
}

pub fn format_date(date: Date) -> String {
    date.format(&format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

pub fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw, &format_description!("[year]-[month]-[day]")).ok()
}
