//
// Copyright (c) 2025 Contributors to the Eclipse Foundation
//
// See the NOTICE file(s) distributed with this work for additional
// information regarding copyright ownership.
//
// This program and the accompanying materials are made available under the
// terms of the Apache License Version 2.0 which is available at
// <https://www.apache.org/licenses/LICENSE-2.0>
//
// SPDX-License-Identifier: Apache-2.0
//

use std::{env, path::PathBuf};
use tracing::level_filters::LevelFilter;
use tracing::{span, Level, Span};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::format;
use tracing_subscriber::prelude::*;
use tracing_subscriber::Layer;

const LOG_OUTDIR_ENV_VAR: &str = "NNLOOP_LOG_OUTDIR";

#[derive(Debug)]
pub enum InitError {
    /// A global subscriber was installed before.
    AlreadyInitialized,
}

impl ::core::fmt::Display for InitError {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        match self {
            InitError::AlreadyInitialized => f.write_str("global tracing subscriber already set"),
        }
    }
}

impl std::error::Error for InitError {}

pub struct TracingLibrary {
    log_level: Level,
    enable_logging: bool,
    log_to_file: bool,
    thread_ids: bool,

    file_writer_guard: Option<WorkerGuard>,
}

pub struct TracingLibraryBuilder {
    log_level: Level,
    enable_logging: bool,
    log_to_file: bool,
    thread_ids: bool,
}

impl Default for TracingLibraryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TracingLibraryBuilder {
    pub fn new() -> Self {
        Self {
            log_level: Level::INFO,
            enable_logging: false,
            log_to_file: false,
            thread_ids: true,
        }
    }

    pub fn global_log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    ///
    /// Enables logging to stdout
    ///
    pub fn enable_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }

    ///
    /// Additionally writes all events to a file in the directory named by `NNLOOP_LOG_OUTDIR` (temp dir otherwise).
    /// Writes happen on a background thread.
    ///
    pub fn log_to_file(mut self, enable: bool) -> Self {
        self.log_to_file = enable;
        self
    }

    pub fn thread_ids(mut self, enable: bool) -> Self {
        self.thread_ids = enable;
        self
    }

    pub fn build(self) -> TracingLibrary {
        TracingLibrary {
            log_level: self.log_level,
            enable_logging: self.enable_logging,
            log_to_file: self.log_to_file,
            thread_ids: self.thread_ids,
            file_writer_guard: None,
        }
    }
}

impl TracingLibrary {
    pub fn init_log_trace(&mut self) -> Result<(), InitError> {
        let registry = tracing_subscriber::Registry::default();
        let filter = LevelFilter::from_level(self.log_level);

        let mut layers = None;

        if self.enable_logging {
            let stdout_layer = fmt::layer()
                .with_writer(std::io::stdout)
                .event_format(format::Format::default().with_thread_ids(self.thread_ids))
                .with_span_events(format::FmtSpan::NEW | format::FmtSpan::CLOSE)
                .with_filter(filter);
            layers = Some(stdout_layer.boxed());
        }

        if self.log_to_file {
            let appender = tracing_appender::rolling::never(Self::log_directory(), Self::log_file_name());
            let (nb, guard) = tracing_appender::non_blocking(appender);
            self.file_writer_guard = Some(guard);

            let file_layer = fmt::layer()
                .with_writer(nb)
                .with_ansi(false)
                .event_format(format::Format::default().with_thread_ids(self.thread_ids))
                .with_filter(filter);

            layers = Some(match layers {
                Some(l) => l.and_then(file_layer).boxed(),
                None => file_layer.boxed(),
            });
        }

        if let Some(layer) = layers {
            tracing::subscriber::set_global_default(registry.with(layer)).map_err(|_| InitError::AlreadyInitialized)?;
        }

        Ok(())
    }

    fn log_directory() -> PathBuf {
        match env::var(LOG_OUTDIR_ENV_VAR) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => env::temp_dir(),
        }
    }

    fn log_file_name() -> String {
        let process_name = env::current_exe()
            .ok()
            .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "unknown_process".to_string());

        format!("nnloop_{}_{}.log", process_name, std::process::id())
    }

    ///
    /// Creates the root span of the application. Keep the returned span alive for as long as it shall be reported.
    ///
    pub fn create_span(&self) -> Span {
        span!(Level::TRACE, "nnloop")
    }

    pub fn is_file_logging_active(&self) -> bool {
        self.file_writer_guard.is_some()
    }
}
