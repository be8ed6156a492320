use common::RunState;

use crate::error::{ConsoleError, Operation};

use log::{debug, warn};

// What a sample's run state meant relative to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    First(RunState),  // Nothing known before
    Started,          // Halted (either way) -> Running
    Stopped,          // Running -> HaltedResumable
    HaltInstruction,  // Running -> HaltedNeedsReset
    Reset,            // HaltedNeedsReset -> HaltedResumable
    Unexpected { from: RunState, to: RunState },
}

#[derive(Debug, Default)]
pub struct RunStateMachine {
    state: Option<RunState>,
}

impl RunStateMachine {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn state(&self) -> Option<RunState> {
        self.state
    }

    // Adopts the observed state. The hardware is the authority, so even a
    // transition that shouldn't happen is taken.
    pub fn observe(&mut self, next: RunState) -> Transition {
        let Some(prev) = self.state.replace(next) else {
            debug!("run state: initially {next}");
            return Transition::First(next);
        };
        if prev == next {
            return Transition::Unchanged;
        }

        use RunState::*;
        let trans = match (prev, next) {
            (HaltedResumable | HaltedNeedsReset, Running) if prev.can_become(next) => Transition::Started,
            (Running, HaltedResumable) => Transition::Stopped,
            (Running, HaltedNeedsReset) => Transition::HaltInstruction,
            (HaltedNeedsReset, HaltedResumable) => Transition::Reset,
            (from, to) => {
                warn!("run state: unexpected transition {from} -> {to}");
                Transition::Unexpected { from, to }
            }
        };
        debug!("run state: {prev} -> {next}");
        trans
    }

    pub fn permits(&self, op: Operation) -> bool {
        use Operation::*;
        match op {
            Reset => true,
            Step | Cont => self.state == Some(RunState::HaltedResumable),
            Halt => self.state == Some(RunState::Running),
            Start | LoadAddress | Examine | Deposit => self.state.is_some_and(RunState::is_halted),
        }
    }

    pub fn check(&self, op: Operation) -> Result<(), ConsoleError> {
        if self.permits(op) {
            Ok(())
        } else {
            warn!("run state: {op} rejected while {:?}", self.state);
            Err(ConsoleError::NotPermitted { op, state: self.state })
        }
    }
}
