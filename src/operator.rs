//! Manual intervention when automatic recovery runs out
//!
//! Connection retries and export writes fall back to asking someone to fix
//! the environment (network, file locks) before carrying on. How that
//! question is asked is up to the caller.

use std::io::{self, BufRead, Write};
use tracing::warn;

/// What to do after automatic recovery has given up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intervention {
    /// The problem has been dealt with; try again
    Retry,
    /// Give up and surface the error
    Abort,
}

pub trait OperatorIntervention: Send + Sync {
    fn intervene(&self, problem: &str) -> Intervention;
}

/// Blocks on stdin until Enter is pressed. End of input aborts.
#[derive(Debug, Default)]
pub struct ConsoleOperator;

impl OperatorIntervention for ConsoleOperator {
    fn intervene(&self, problem: &str) -> Intervention {
        print!("{} Press Enter to retry. ", problem);
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => {
                warn!("No operator input available, giving up");
                Intervention::Abort
            }
            Ok(_) => Intervention::Retry,
        }
    }
}

/// Never waits for anyone; for unattended runs
#[derive(Debug, Default)]
pub struct AbortingOperator;

impl OperatorIntervention for AbortingOperator {
    fn intervene(&self, problem: &str) -> Intervention {
        warn!("{} Running unattended, giving up.", problem);
        Intervention::Abort
    }
}
