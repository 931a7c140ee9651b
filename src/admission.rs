use std::sync::{Condvar, Mutex};

use log::debug;

/// Counting gate that bounds how many requests run at once
pub struct AdmissionGate {
  limit: usize,
  active: Mutex<usize>,
  released: Condvar,
}

/// Held while a request runs; dropping it lets the next caller in
pub struct Permit<'a> {
  gate: &'a AdmissionGate,
}

impl AdmissionGate {
  /// A zero limit is raised to one
  pub fn new(limit: usize) -> Self {
    AdmissionGate {
      limit: limit.max(1),
      active: Mutex::new(0),
      released: Condvar::new(),
    }
  }

  pub fn limit(&self) -> usize {
    self.limit
  }

  pub fn active(&self) -> usize {
    *self.active.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Block until a slot is free
  pub fn acquire(&self) -> Permit<'_> {
    let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
    if *active >= self.limit {
      debug!("Admission gate full ({}), waiting", self.limit);
    }
    while *active >= self.limit {
      active = self
        .released
        .wait(active)
        .unwrap_or_else(|e| e.into_inner());
    }
    *active += 1;
    Permit { gate: self }
  }
}

impl Drop for Permit<'_> {
  fn drop(&mut self) {
    let mut active = self.gate.active.lock().unwrap_or_else(|e| e.into_inner());
    *active -= 1;
    self.gate.released.notify_one();
  }
}
