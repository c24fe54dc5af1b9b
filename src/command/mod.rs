//! Chat command parsing and dispatch.

pub mod dispatcher;
pub mod grammar;

pub use dispatcher::{notice_for, Dispatch, Dispatcher, IncomingLine, Stage, Transport};
pub use grammar::{Command, Grammar, MilestoneSpec, RepoRef, RepoSpec, StatusWord};
