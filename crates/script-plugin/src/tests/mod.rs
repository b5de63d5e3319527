//! Crate-level integration and BDD tests.
//!
//! These drive [`ScriptPlugin`] against real `/bin/sh` payloads.

#![cfg(unix)]

use std::collections::HashMap;
use std::thread;

use tempfile::TempDir;

use crate::outcome::Verdict;
use crate::plugin::{Plugin, ScriptPlugin};
use crate::runner::{ScriptPayload, ScriptRunner};


const HELLO_SCRIPT: &str = "#!/bin/sh\nprintf 'Hello, World!'\n";
const ARGUMENT_SCRIPT: &str = "#!/bin/sh\nprintf '%s' \"$*\"\n";

fn plugin_config(arguments: &str) -> HashMap<String, String> {
    HashMap::from([
        (String::from("Name"), String::from("TestPlugin")),
        (String::from("Version"), String::from("1.0.0")),
        (String::from("Arguments"), arguments.to_owned()),
        (String::from("ExpectedOutput"), String::from("Hello")),
    ])
}

#[test]
fn end_to_end_with_embedded_script() {
    let scratch = TempDir::new().expect("scratch dir");
    let runner = ScriptRunner::new(ScriptPayload::from_static(HELLO_SCRIPT.as_bytes()))
        .with_temp_dir(scratch.path());
    let mut plugin = ScriptPlugin::new(runner);

    plugin.init(&plugin_config("")).expect("init");
    assert_eq!(plugin.name().expect("name"), "TestPlugin");
    assert_eq!(plugin.version().expect("version"), "1.0.0");
    plugin.run().expect("run");
    assert_eq!(plugin.output(), "Hello, World!");
    assert_eq!(plugin.parse_output().expect("classify"), Verdict::Success);
    assert_eq!(
        std::fs::read_dir(scratch.path()).expect("read dir").count(),
        0
    );
}

#[test]
fn identical_instances_run_concurrently_without_sharing_output() {
    let handles: Vec<_> = (0..4)
        .map(|_| {
            thread::spawn(|| {
                let mut plugin =
                    ScriptPlugin::from_payload(ScriptPayload::from_static(HELLO_SCRIPT.as_bytes()));
                plugin.init(&plugin_config("")).expect("init");
                plugin.run().expect("run");
                plugin.output().to_owned()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().expect("thread"), "Hello, World!");
    }
}

#[test]
fn distinct_instances_keep_their_own_arguments() {
    let handles: Vec<_> = (0..4)
        .map(|index| {
            thread::spawn(move || {
                let mut plugin = ScriptPlugin::from_payload(ScriptPayload::from_static(
                    ARGUMENT_SCRIPT.as_bytes(),
                ));
                plugin
                    .init(&plugin_config(&format!("worker, {index}")))
                    .expect("init");
                plugin.run().expect("run");
                (index, plugin.output().to_owned())
            })
        })
        .collect();

    for handle in handles {
        let (index, output) = handle.join().expect("thread");
        assert_eq!(output, format!("worker {index}"));
    }
}
