use access_lib::AccessError;
use common::RunState;

use derive_more::Display;
use thiserror::Error;

// Console operations subject to run state gating.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    #[display(fmt = "step")]
    Step,
    #[display(fmt = "halt")]
    Halt,
    #[display(fmt = "cont")]
    Cont,
    #[display(fmt = "reset")]
    Reset,
    #[display(fmt = "start")]
    Start,
    #[display(fmt = "load address")]
    LoadAddress,
    #[display(fmt = "examine")]
    Examine,
    #[display(fmt = "deposit")]
    Deposit,
}

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("{op} not permitted while processor is {}", state_name(.state))]
    NotPermitted { op: Operation, state: Option<RunState> },

    #[error(transparent)]
    Access(#[from] AccessError),
}

fn state_name(state: &Option<RunState>) -> String {
    match state {
        Some(state) => state.to_string(),
        None => "in an unknown state".to_string(),
    }
}
