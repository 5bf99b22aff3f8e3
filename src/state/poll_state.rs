use std::fmt;

/// Phase of the poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PollState {
    /// Waiting to start the next cycle
    Idle,

    /// Fetches of the current snapshot are in flight
    Fetching,

    /// Outcomes are being folded back into the registry
    Reconciling,

    /// Continuous mode: sleeping out the interval before the next cycle
    Continuing,

    /// Run-once mode: another cycle is needed before the run can end
    Draining,

    /// Nothing left to poll
    Done,
}

impl PollState {
    /// Returns true if the loop should stop
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Reconciling => "reconciling",
            Self::Continuing => "continuing",
            Self::Draining => "draining",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
