//! # makerctl-core
//!
//! Engine layer for the makerctl CLI: everything except the terminal.
//!
//! The flow for one invocation is: the front end parses flags into an
//! [`OpRequest`], the [`DispatchTable`] resolves the (provider, kind, verb)
//! triple to a handler, the handler obtains a provider client through the
//! [`clients::ClientFactory`], issues the create/describe/delete calls —
//! driving asynchronous ones through the [`poll`] module — and returns an
//! [`OpOutput`] for the presenter. Failures are typed [`CoreError`]s all the
//! way up; the binary owns printing and exit codes.

pub mod clients;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod kubeconfig;
pub mod lookup;
pub mod op;
pub mod poll;

pub use config::{AwsSettings, Config, ConfigError, DoSettings, GcpSettings};
pub use dispatch::{DispatchTable, Handler, HandlerFuture, OpContext};
pub use error::{CoreError, Result};
pub use lookup::find_by_name;
pub use op::{OpOutput, OpParams, OpRequest, Provider, ResourceKind, ResourceRef, Verb};
pub use poll::{
    CancelHandle, CancelToken, PollSettings, ProgressCallback, ProgressEvent, cancel_pair,
    wait_for, wait_for_status,
};
