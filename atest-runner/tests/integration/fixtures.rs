// Copyright (c) The atest-validate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use atest_runner::config::{ConfigOverrides, HarnessConfig};
use camino::Utf8PathBuf;
use camino_tempfile::Utf8TempDir;
use std::{
    fmt, fs,
    os::unix::fs::PermissionsExt,
    sync::{Arc, Mutex},
};
use swrite::{SWrite, swrite};
use tracing::{
    Event, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{
    Layer,
    layer::{Context, SubscriberExt},
};

/// A fake `atest` that logs one line per invocation and exits with a configurable code.
///
/// Each log line is `<device> <role> <duration or "unbounded">[ assert]`. Bounded invocations exit
/// shortly after starting; unbounded ones run until SIGINT.
pub(crate) struct FakeAtest {
    dir: Utf8TempDir,
    failures: Vec<(String, i32)>,
}

impl FakeAtest {
    pub(crate) fn new() -> Self {
        Self {
            dir: camino_tempfile::tempdir().expect("created temp dir"),
            failures: Vec::new(),
        }
    }

    /// Makes invocations of `role` on `device` exit with `code`.
    pub(crate) fn fail(mut self, device: &str, role: &str, code: i32) -> Self {
        self.failures.push((format!("{device} {role}"), code));
        self
    }

    /// Writes the script and a harness config pointing at it.
    pub(crate) fn install(self) -> InstalledFakeAtest {
        let program = self.dir.path().join("atest");
        let log = self.dir.path().join("atest.log");

        let mut cases = String::new();
        for (pattern, code) in &self.failures {
            swrite!(cases, "    \"{pattern}\") code={code} ;;\n");
        }

        let script = format!(
            r#"#!/bin/sh
device=""
duration=""
asserting=""
role=""
while [ $# -gt 0 ]; do
    case "$1" in
        -D) device="$2"; shift 2 ;;
        -r|-c|-P|-C) shift 2 ;;
        -d) duration="$2"; shift 2 ;;
        --assert) asserting=" assert"; shift ;;
        *) role="$role$1"; shift ;;
    esac
done
echo "$device $role ${{duration:-unbounded}}$asserting" >> "{log}"
code=0
case "$device $role" in
{cases}esac
if [ -n "$duration" ]; then
    sleep 0.2
    exit $code
fi
trap 'exit $code' INT
while :; do
    sleep 0.05
done
"#
        );
        fs::write(&program, script).expect("wrote fake atest");
        fs::set_permissions(&program, fs::Permissions::from_mode(0o755))
            .expect("made fake atest executable");

        let config_file = self.dir.path().join("harness.toml");
        let contents =
            format!("[atest]\nprogram = \"{program}\"\n\n[timing]\nburst-interval = \"10ms\"\n");
        fs::write(&config_file, contents).expect("wrote harness config");
        let config =
            HarnessConfig::from_sources(Some(config_file.as_path()), &ConfigOverrides::default())
                .expect("harness config is valid");

        InstalledFakeAtest {
            _dir: self.dir,
            log,
            config,
        }
    }
}

pub(crate) struct InstalledFakeAtest {
    _dir: Utf8TempDir,
    log: Utf8PathBuf,
    config: HarnessConfig,
}

impl InstalledFakeAtest {
    pub(crate) fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Returns the argument lines the fake was invoked with, sorted.
    ///
    /// Processes started back to back race to append to the log, so the file order says nothing
    /// about start order. Use [`record_process_events`] for that.
    pub(crate) fn invocations(&self) -> Vec<String> {
        let mut lines: Vec<String> = match fs::read_to_string(&self.log) {
            Ok(contents) => contents.lines().map(str::to_owned).collect(),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(error) => panic!("failed to read {}: {error}", self.log),
        };
        lines.sort();
        lines
    }
}

/// Runs `f` and returns the process starts and interrupts it performed, in order.
///
/// Each entry is `start <device> <role>` or `interrupt <device> <role>`. The entries come from
/// the events `ProcessHandle` emits on the calling thread, so they follow the order of the
/// `start` and `stop` calls exactly.
pub(crate) fn record_process_events<R>(f: impl FnOnce() -> R) -> (R, Vec<String>) {
    let recorder = ProcessEvents::default();
    let subscriber = tracing_subscriber::registry().with(recorder.clone());
    let ret = tracing::subscriber::with_default(subscriber, f);
    let events = recorder.0.lock().expect("recorder lock is not poisoned").clone();
    (ret, events)
}

#[derive(Clone, Default)]
struct ProcessEvents(Arc<Mutex<Vec<String>>>);

impl<S: Subscriber> Layer<S> for ProcessEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != "atest_runner::process" {
            return;
        }

        let mut fields = ProcessEventFields::default();
        event.record(&mut fields);
        let action = if fields.message.starts_with("started") {
            "start"
        } else if fields.message.starts_with("interrupting") {
            "interrupt"
        } else {
            return;
        };

        self.0
            .lock()
            .expect("recorder lock is not poisoned")
            .push(format!("{action} {} {}", fields.device, fields.role));
    }
}

#[derive(Default)]
struct ProcessEventFields {
    message: String,
    device: String,
    role: String,
}

impl Visit for ProcessEventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "device" {
            self.device = value.to_owned();
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            "role" => self.role = format!("{value:?}"),
            _ => {}
        }
    }
}
