//! # Stop strategies.

/// How the arbitration loop stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopStrategy {
    /// Force-terminate every sequence without running its remaining backlog.
    ///
    /// In-progress actions are not interrupted, but nothing new starts.
    /// The loop exits as soon as termination has been requested.
    Immediate,

    /// Let every sequence run its backlog to completion, then exit.
    ///
    /// Submissions keep being accepted meanwhile; if they never stop, neither does the loop.
    Drain,
}
