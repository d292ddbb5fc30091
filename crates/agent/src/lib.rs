//! The tool-augmented conversation loop — the heart of Newsdesk.
//!
//! Each user turn follows a **Route → Ask → Act → Ask again** cycle:
//!
//! 1. **Route** the raw user text to at most a few candidate tools
//! 2. **Ask** the model with the transcript and those tools
//! 3. **Act**: if the model requested tools, run them in call order and
//!    fold each result back in as a tool turn
//! 4. **Ask again** with no tools offered and append the final answer
//!
//! Failures are contained at the turn boundary as an assistant error turn.

pub mod loop_runner;
pub mod router;
pub mod runtime;
pub mod session;

pub use loop_runner::{AgentLoop, LoopState, Reply};
pub use router::KeywordRouter;
pub use runtime::AgentRuntime;
pub use session::{SessionStore, SharedLoop};
