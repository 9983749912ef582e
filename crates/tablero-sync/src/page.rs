// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::FilterState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Initial,
    NextPage,
    Refresh,
}

// A fetch the runtime should execute. The signature pins the filter set
// the request was issued under; a response whose signature no longer
// matches the active set is dropped on arrival instead of aborted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub kind: FetchKind,
    pub offset: usize,
    pub limit: usize,
    pub signature: String,
}

// What the data source receives for a `list` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub filter: FilterState,
    pub offset: usize,
}

impl ListQuery {
    pub fn first_page(filter: FilterState) -> Self {
        Self { filter, offset: 0 }
    }
}

// One fetched page: rows plus both aggregate counts, computed by the
// data source against the same filter set. Also the wire shape of a
// `list` action's data payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageData<T> {
    pub rows: Vec<T>,
    pub total_all: u64,
    pub total_filtered: u64,
}

impl<T> PageData<T> {
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            total_all: 0,
            total_filtered: 0,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageData<U> {
        PageData {
            rows: self.rows.into_iter().map(f).collect(),
            total_all: self.total_all,
            total_filtered: self.total_filtered,
        }
    }
}
