use crate::gateway::{GatewayError, LookupGateway, LookupResponse, LOOKUP_FAILED_MESSAGE};
use crate::validation::{is_valid_ip, IpValidation};

use std::fmt;
use std::future::Future;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(u64);

impl RowId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for RowId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowStatus {
    Idle,
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowState {
    Idle,
    Loading,
    /// `query` is the trimmed text that was sent to the gateway
    Success {
        query: String,
        result: LookupResponse,
    },
    Error(String),
}

impl RowState {
    pub fn status(&self) -> RowStatus {
        match self {
            Self::Idle => RowStatus::Idle,
            Self::Loading => RowStatus::Loading,
            Self::Success { .. } => RowStatus::Success,
            Self::Error(_) => RowStatus::Error,
        }
    }
}

/// One user-entered IP address and the state of its lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    id: RowId,
    ip: String,
    state: RowState,
}

impl Row {
    fn new(id: RowId) -> Self {
        Self {
            id,
            ip: String::new(),
            state: RowState::Idle,
        }
    }

    pub fn id(&self) -> RowId {
        self.id
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn state(&self) -> &RowState {
        &self.state
    }

    pub fn status(&self) -> RowStatus {
        self.state.status()
    }

    pub fn result(&self) -> Option<&LookupResponse> {
        match &self.state {
            RowState::Success { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            RowState::Error(message) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn validation(&self) -> IpValidation<'_> {
        IpValidation::of(&self.ip)
    }
}

struct Rows {
    next_id: u64,
    rows: Vec<Row>,
}

impl Rows {
    fn get_mut(&mut self, id: RowId) -> Option<&mut Row> {
        self.rows.iter_mut().find(|row| row.id == id)
    }
}

/// Ordered rows, each with its own validation and lookup state.
///
/// Ids are never reused by a collection. Lookups settle into the row they were started for, or
/// are dropped when that row is gone by then. Two lookups of the same row may overlap, the one
/// settling last wins.
pub struct RowCollection<G> {
    gateway: G,
    rows: Mutex<Rows>,
}

impl<G> RowCollection<G>
where
    G: LookupGateway,
{
    /// Collection with a single idle row
    pub fn new(gateway: G) -> Self {
        let collection = Self::empty(gateway);
        collection.add_row();
        collection
    }

    pub fn empty(gateway: G) -> Self {
        Self {
            gateway,
            rows: Mutex::new(Rows {
                next_id: 1,
                rows: Vec::new(),
            }),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn add_row(&self) -> RowId {
        let mut rows = self.rows.lock().unwrap();
        let id = RowId(rows.next_id);
        rows.next_id += 1;
        rows.rows.push(Row::new(id));
        log::debug!("Row {id} added");
        id
    }

    /// Replaces the row's text. A shown result or error is discarded.
    pub fn update_row_ip(&self, id: RowId, text: impl Into<String>) {
        let mut rows = self.rows.lock().unwrap();
        let row = match rows.get_mut(id) {
            Some(row) => row,
            None => return,
        };
        row.ip = text.into();
        if matches!(row.status(), RowStatus::Success | RowStatus::Error) {
            row.state = RowState::Idle;
        }
    }

    /// Looks up the row's trimmed text.
    ///
    /// The row is checked and switched to loading before this returns, the returned future
    /// performs the gateway call and applies its outcome. Empty or invalid text, an unknown id,
    /// or a result already held for the same text make it a no-op.
    pub fn lookup_row(&self, id: RowId) -> impl Future<Output = ()> + Send + '_ {
        let query = self.begin_lookup(id);
        async move {
            if let Some(query) = query {
                let outcome = self.gateway.lookup(&query).await;
                self.settle(id, query, outcome);
            }
        }
    }

    fn begin_lookup(&self, id: RowId) -> Option<String> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows.get_mut(id)?;
        let ip = row.ip.trim();
        if ip.is_empty() || !is_valid_ip(ip) {
            return None;
        }
        if let RowState::Success { query, .. } = &row.state {
            if query == ip {
                log::debug!(r#"Row {id} already holds the result for "{ip}""#);
                return None;
            }
        }
        let query = ip.to_owned();
        row.state = RowState::Loading;
        log::debug!(r#"Row {id} is looking up "{query}""#);
        Some(query)
    }

    fn settle(&self, id: RowId, query: String, outcome: Result<LookupResponse, GatewayError>) {
        let mut rows = self.rows.lock().unwrap();
        let row = match rows.get_mut(id) {
            Some(row) => row,
            None => {
                log::debug!(r#"Row {id} was removed before lookup of "{query}" settled"#);
                return;
            }
        };
        row.state = match outcome {
            Ok(result) => {
                log::info!(
                    r#"Row {id}: "{query}" is in {} ({})"#,
                    result.country,
                    result.timezone
                );
                RowState::Success { query, result }
            }
            Err(error) => {
                log::warn!(r#"Row {id}: lookup of "{query}" failed: {error}"#);
                RowState::Error(
                    error
                        .description()
                        .unwrap_or_else(|| LOOKUP_FAILED_MESSAGE.to_owned()),
                )
            }
        };
    }

    pub fn remove_row(&self, id: RowId) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(index) = rows.rows.iter().position(|row| row.id == id) {
            rows.rows.remove(index);
            log::debug!("Row {id} removed");
        }
    }

    /// Snapshot in display order
    pub fn rows(&self) -> Vec<Row> {
        self.rows.lock().unwrap().rows.clone()
    }

    pub fn row(&self, id: RowId) -> Option<Row> {
        self.rows
            .lock()
            .unwrap()
            .rows
            .iter()
            .find(|row| row.id == id)
            .cloned()
    }

    pub fn row_ids(&self) -> Vec<RowId> {
        self.rows.lock().unwrap().rows.iter().map(Row::id).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
