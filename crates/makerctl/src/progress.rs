//! Spinner wiring for long waits
//!
//! Bridges the core's progress events onto an indicatif spinner. The
//! spinner only starts drawing once a wait actually begins, so fast
//! operations stay silent.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use makerctl_core::{ProgressCallback, ProgressEvent};

pub fn spinner() -> (ProgressBar, ProgressCallback) {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap(),
    );

    let sink = bar.clone();
    let callback: ProgressCallback = Box::new(move |event| match event {
        ProgressEvent::Started { subject } => {
            sink.enable_steady_tick(Duration::from_millis(120));
            sink.set_message(format!("Waiting for {subject}"));
        }
        ProgressEvent::Polling {
            subject, status, ..
        } => {
            sink.set_message(format!("{subject}: {status}"));
        }
        ProgressEvent::Completed { subject, status } => {
            sink.finish_with_message(format!("{subject}: {status}"));
        }
        ProgressEvent::Failed { subject, error } => {
            sink.finish_with_message(format!("{subject}: {error}"));
        }
    });

    (bar, callback)
}
