use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::RunError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
}

/// Admits one run at a time. A second caller gets `RunError::Busy`
/// instead of racing the first.
#[derive(Clone, Debug, Default)]
pub struct RunGate {
    running: Arc<AtomicBool>,
}

impl RunGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RunState {
        if self.running.load(Ordering::Acquire) {
            RunState::Running
        } else {
            RunState::Idle
        }
    }

    pub fn try_begin(&self) -> Result<RunPermit, RunError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| RunError::Busy)?;
        Ok(RunPermit {
            running: Arc::clone(&self.running),
        })
    }
}

/// Held for the duration of a run; dropping it returns the gate to idle.
#[derive(Debug)]
pub struct RunPermit {
    running: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_busy_until_permit_drops() {
        let gate = RunGate::new();
        assert_eq!(gate.state(), RunState::Idle);

        let permit = gate.try_begin().unwrap();
        assert_eq!(gate.state(), RunState::Running);
        assert!(matches!(gate.try_begin(), Err(RunError::Busy)));

        drop(permit);
        assert_eq!(gate.state(), RunState::Idle);
        assert!(gate.try_begin().is_ok());
    }

    #[test]
    fn clones_share_state() {
        let gate = RunGate::new();
        let other = gate.clone();
        let _permit = gate.try_begin().unwrap();
        assert_eq!(other.state(), RunState::Running);
    }
}
