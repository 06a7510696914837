use std::time::{Duration, Instant};

use crate::service::{TaskPage, TaskRecord, TaskStatus};

#[derive(Clone, Debug, PartialEq)]
pub struct TaskEntry {
    pub fingerprint: String,
    pub record: TaskRecord,
}

/// The last task page fetched from the service and when to fetch it again.
pub struct TaskBoard {
    entries: Vec<TaskEntry>,
    selected: Option<usize>,
    total: u64,
    page: u32,
    total_pages: u32,
    poll_interval: Duration,
    last_refresh: Option<Instant>,
    refresh_in_flight: bool,
    credentials_required: bool,
}

impl TaskBoard {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            entries: Vec::new(),
            selected: None,
            total: 0,
            page: 1,
            total_pages: 1,
            poll_interval,
            last_refresh: None,
            refresh_in_flight: false,
            credentials_required: false,
        }
    }

    /// Newest first.
    pub fn entries(&self) -> &[TaskEntry] {
        &self.entries
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// The entry task actions apply to.
    pub fn selected(&self) -> Option<&TaskEntry> {
        self.selected.and_then(|i| self.entries.get(i))
    }

    /// Moves the selection one entry down, starting at the newest.
    pub fn select_next(&mut self) -> Option<&TaskEntry> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;
        self.selected = Some(self.selected.map_or(0, |i| (i + 1).min(last)));
        self.selected()
    }

    pub fn select_prev(&mut self) -> Option<&TaskEntry> {
        if self.entries.is_empty() {
            return None;
        }
        self.selected = Some(self.selected.map_or(0, |i| i.saturating_sub(1)));
        self.selected()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn set_page(&mut self, page: u32) -> bool {
        if page < 1 || page > self.total_pages.max(1) {
            return false;
        }
        self.page = page;
        true
    }

    pub fn credentials_required(&self) -> bool {
        self.credentials_required
    }

    /// (pending, processing)
    pub fn active_counts(&self) -> (usize, usize) {
        self.entries
            .iter()
            .fold((0, 0), |(pending, processing), e| match e.record.status {
                TaskStatus::Pending => (pending + 1, processing),
                TaskStatus::Processing => (pending, processing + 1),
                _ => (pending, processing),
            })
    }

    pub fn has_active(&self) -> bool {
        self.entries.iter().any(|e| e.record.status.is_active())
    }

    pub fn can_refresh(&self) -> bool {
        !self.credentials_required && !self.refresh_in_flight
    }

    /// A background refresh is due while any listed task is still pending or processing.
    pub fn poll_due(&self, now: Instant) -> bool {
        self.can_refresh()
            && self.has_active()
            && self
                .last_refresh
                .is_none_or(|t| now.duration_since(t) >= self.poll_interval)
    }

    pub fn begin_refresh(&mut self, now: Instant) {
        self.refresh_in_flight = true;
        self.last_refresh = Some(now);
    }

    pub fn apply_page(&mut self, page: TaskPage) {
        self.refresh_in_flight = false;
        let mut entries: Vec<TaskEntry> = page
            .tasks
            .into_iter()
            .map(|(fingerprint, record)| TaskEntry {
                fingerprint,
                record,
            })
            .collect();
        entries.sort_by(|a, b| b.record.create_time.total_cmp(&a.record.create_time));
        // The selection follows its task across refreshes.
        let selected = self.selected().map(|e| e.fingerprint.clone());
        self.selected = selected.and_then(|fp| entries.iter().position(|e| e.fingerprint == fp));
        self.entries = entries;
        self.total = page.total;
        self.page = page.page.max(1);
        self.total_pages = page.total_pages.max(1);
        let (pending, processing) = self.active_counts();
        log::info!(
            "{} tasks ({} pending / {} processing), page {}/{}",
            self.total,
            pending,
            processing,
            self.page,
            self.total_pages
        );
    }

    pub fn refresh_failed(&mut self) {
        self.refresh_in_flight = false;
    }

    /// Stops all polling until `credentials_renewed` is called.
    pub fn require_credentials(&mut self) {
        self.refresh_in_flight = false;
        if !self.credentials_required {
            log::warn!("Service rejected the credentials, polling suspended");
        }
        self.credentials_required = true;
    }

    pub fn credentials_renewed(&mut self) {
        self.credentials_required = false;
        self.last_refresh = None;
    }
}
