pub mod console;
pub mod drive_status;
pub mod error;
pub mod exam_dep;
pub mod mmu;
pub mod monitor;
pub mod run_state;
pub mod script;

pub use console::{AddrLabel, Console, POLL_INTERVAL};
pub use drive_status::DriveTracker;
pub use error::{ConsoleError, Operation};
pub use exam_dep::{ExDepKind, ExDepOutcome, ExamDep, LoadedAddress};
pub use mmu::{translate, MmuError, TranslationError};
pub use run_state::{RunStateMachine, Transition};
