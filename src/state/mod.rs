// State module
//
// RoundSession is the synchronous per-play-through state machine.
// SessionDriver runs one on a tokio task with its countdown and advance timers
// and broadcasts a SessionEvent after every transition.

pub mod driver;
pub mod session;

pub use driver::{SessionDriver, SessionEvent};
pub use session::{
    FailureCause, HARD_TIME_LIMIT_SECS, RoundPhase, RoundSession, SessionOutcome,
    SessionSnapshot, Transition,
};
