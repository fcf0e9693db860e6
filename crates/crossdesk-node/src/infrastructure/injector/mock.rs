//! Recording injection backend for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crossdesk_core::OsEvent;

use super::{InjectionError, InputInjector};

/// Records every call and can be switched into a failing mode. Calls are
/// recorded even when failing, so tests can observe that the worker
/// attempted them.
pub struct MockInjector {
    warps: Mutex<Vec<(i32, i32)>>,
    hidden_toggles: Mutex<Vec<bool>>,
    events: Mutex<Vec<OsEvent>>,
    should_fail: AtomicBool,
    warps_progressed: Condvar,
    events_progressed: Condvar,
}

impl Default for MockInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInjector {
    pub fn new() -> Self {
        Self {
            warps: Mutex::new(Vec::new()),
            hidden_toggles: Mutex::new(Vec::new()),
            events: Mutex::new(Vec::new()),
            should_fail: AtomicBool::new(false),
            warps_progressed: Condvar::new(),
            events_progressed: Condvar::new(),
        }
    }

    /// When set, every call records itself and then fails.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    pub fn warps(&self) -> Vec<(i32, i32)> {
        self.warps.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn hidden_toggles(&self) -> Vec<bool> {
        self.hidden_toggles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn events(&self) -> Vec<OsEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Blocks until at least `n` warps were recorded or `timeout` elapsed.
    /// Returns whether the count was reached.
    pub fn wait_for_warps(&self, n: usize, timeout: Duration) -> bool {
        let guard = self.warps.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _) = self
            .warps_progressed
            .wait_timeout_while(guard, timeout, |warps| warps.len() < n)
            .unwrap_or_else(|e| e.into_inner());
        guard.len() >= n
    }

    /// Blocks until at least `n` events were recorded or `timeout` elapsed.
    pub fn wait_for_events(&self, n: usize, timeout: Duration) -> bool {
        let guard = self.events.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _) = self
            .events_progressed
            .wait_timeout_while(guard, timeout, |events| events.len() < n)
            .unwrap_or_else(|e| e.into_inner());
        guard.len() >= n
    }

    fn outcome(&self) -> Result<(), InjectionError> {
        if self.should_fail.load(Ordering::SeqCst) {
            Err(InjectionError::Backend("mock failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl InputInjector for MockInjector {
    fn set_cursor_position(&self, x: i32, y: i32) -> Result<(), InjectionError> {
        self.warps
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((x, y));
        self.warps_progressed.notify_all();
        self.outcome()
    }

    fn set_cursor_hidden(&self, hidden: bool) -> Result<(), InjectionError> {
        self.hidden_toggles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(hidden);
        self.outcome()
    }

    fn inject_event(&self, event: &OsEvent) -> Result<(), InjectionError> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(*event);
        self.events_progressed.notify_all();
        self.outcome()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
