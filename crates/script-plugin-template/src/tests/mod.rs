//! Tests for the plugin binary's stdio loop and configuration.

use std::io::Cursor;
use std::time::Duration;

use rstest::rstest;
use script_plugin::{ErrorKind, PluginError, PluginReply, ScriptExecutor, ScriptPlugin};

use crate::config::{LogFormat, ServeConfig};
use crate::serve::serve;
use crate::telemetry::{TelemetryError, build_filter};

struct CannedExecutor(&'static str);

impl ScriptExecutor for CannedExecutor {
    fn execute(
        &self,
        _arguments: &[String],
        _timeout: Option<Duration>,
    ) -> Result<String, PluginError> {
        Ok(self.0.to_owned())
    }
}

fn serve_lines<E: ScriptExecutor>(plugin: &mut ScriptPlugin<E>, input: &str) -> Vec<PluginReply> {
    let mut reader = Cursor::new(input.as_bytes().to_vec());
    let mut writer = Vec::new();
    let count = serve(&mut reader, &mut writer, plugin).expect("serve session");

    let text = String::from_utf8(writer).expect("utf-8 replies");
    let replies: Vec<PluginReply> = text
        .lines()
        .map(|line| serde_json::from_str(line).expect("decode reply"))
        .collect();
    assert_eq!(replies.len(), count);
    replies
}

const SESSION: &str = concat!(
    r#"{"method":"init","config":{"Name":"greeter","Version":"1.2.0","ExpectedOutput":"Hello"}}"#,
    "\n",
    r#"{"method":"name"}"#,
    "\n",
    r#"{"method":"version"}"#,
    "\n",
    r#"{"method":"run"}"#,
    "\n",
    r#"{"method":"parse_output"}"#,
    "\n",
);

#[test]
fn serves_a_full_session() {
    let mut plugin = ScriptPlugin::new(CannedExecutor("Hello, World!\n"));
    let replies = serve_lines(&mut plugin, SESSION);

    assert_eq!(
        replies,
        vec![
            PluginReply::empty(),
            PluginReply::value("greeter"),
            PluginReply::value("1.2.0"),
            PluginReply::empty(),
            PluginReply::value("success"),
        ]
    );
    assert_eq!(plugin.output(), "Hello, World!\n");
}

#[test]
fn malformed_line_gets_protocol_error_and_loop_continues() {
    let mut plugin = ScriptPlugin::new(CannedExecutor("ignored"));
    let input = "not json\n{\"method\":\"shutdown\"}\n{\"method\":\"parse_output\"}\n";
    let replies = serve_lines(&mut plugin, input);

    assert_eq!(replies.len(), 3);
    for reply in &replies[..2] {
        let error = reply.error().expect("protocol error");
        assert_eq!(error.kind(), ErrorKind::Protocol);
        assert!(error.message().starts_with("invalid plugin call"));
    }
    assert_eq!(replies[2], PluginReply::value("success"));
}

#[test]
fn blank_lines_produce_no_reply() {
    let mut plugin = ScriptPlugin::new(CannedExecutor("ignored"));
    let replies = serve_lines(&mut plugin, "\n   \n{\"method\":\"name\"}\n\n");

    assert_eq!(replies.len(), 1);
    let error = replies[0].error().expect("empty name");
    assert_eq!(error.kind(), ErrorKind::EmptyField);
    assert_eq!(error.message(), "script name is empty");
}

#[test]
fn run_before_init_is_reported_as_lifecycle_error() {
    let mut plugin = ScriptPlugin::new(CannedExecutor("Hello"));
    let replies = serve_lines(&mut plugin, "{\"method\":\"run\"}");

    let error = replies[0].error().expect("lifecycle error");
    assert_eq!(error.kind(), ErrorKind::Lifecycle);
}

#[test]
fn final_line_without_newline_is_answered() {
    let mut plugin = ScriptPlugin::new(CannedExecutor("ignored"));
    let replies = serve_lines(&mut plugin, "{\"method\":\"version\"}");

    assert_eq!(replies.len(), 1);
    assert!(!replies[0].is_ok());
}

#[cfg(unix)]
#[test]
fn embedded_script_greets_configured_arguments() {
    let scratch = tempfile::tempdir().expect("scratch dir");
    let runner = script_plugin::ScriptRunner::new(crate::embedded_payload())
        .with_temp_dir(scratch.path());
    let mut plugin = ScriptPlugin::new(runner);

    let input = concat!(
        r#"{"method":"init","config":{"Name":"greeter","Version":"1.0.0","Arguments":"Ada, Grace","ExpectedOutput":"Hello, Ada Grace!"}}"#,
        "\n",
        r#"{"method":"run"}"#,
        "\n",
        r#"{"method":"parse_output"}"#,
        "\n",
    );
    let replies = serve_lines(&mut plugin, input);

    assert!(replies.iter().all(PluginReply::is_ok), "{replies:?}");
    assert_eq!(plugin.output(), "Hello, Ada Grace!\n");
    assert_eq!(replies[2], PluginReply::value("success"));
    let leftovers = std::fs::read_dir(scratch.path())
        .expect("read scratch dir")
        .count();
    assert_eq!(leftovers, 0);
}

#[cfg(unix)]
#[test]
fn embedded_script_defaults_to_world() {
    let scratch = tempfile::tempdir().expect("scratch dir");
    let runner = script_plugin::ScriptRunner::new(crate::embedded_payload())
        .with_temp_dir(scratch.path());
    let mut plugin = ScriptPlugin::new(runner);

    let input = concat!(
        r#"{"method":"init","config":{"Name":"greeter","Version":"1.0.0","Arguments":""}}"#,
        "\n",
        r#"{"method":"run"}"#,
        "\n",
    );
    let replies = serve_lines(&mut plugin, input);

    assert!(replies.iter().all(PluginReply::is_ok), "{replies:?}");
    assert_eq!(plugin.output(), "Hello, World!\n");
}

#[test]
fn config_defaults() {
    let config = ServeConfig::default();
    assert_eq!(config.log_filter(), "info");
    assert_eq!(config.log_format(), LogFormat::Json);
    assert_eq!(config.timeout(), None);
}

#[test]
fn config_reads_flags() {
    let config = ServeConfig::load_from_iter([
        "script-plugin-template",
        "--log-filter",
        "debug",
        "--log-format",
        "compact",
        "--timeout-secs",
        "30",
    ])
    .expect("parse flags");

    assert_eq!(config.log_filter(), "debug");
    assert_eq!(config.log_format(), LogFormat::Compact);
    assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
}

#[rstest]
#[case::zero_timeout(&["script-plugin-template", "--timeout-secs", "0"])]
#[case::bad_format(&["script-plugin-template", "--log-format", "yaml"])]
#[case::unknown_flag(&["script-plugin-template", "--sandbox"])]
fn config_rejects_invalid_flags(#[case] args: &[&str]) {
    assert!(ServeConfig::load_from_iter(args.iter().copied()).is_err());
}

#[rstest]
#[case("json", LogFormat::Json)]
#[case("COMPACT", LogFormat::Compact)]
fn log_format_parses_case_insensitively(#[case] text: &str, #[case] expected: LogFormat) {
    assert_eq!(text.parse::<LogFormat>().expect("parse format"), expected);
    assert_eq!(expected.to_string(), text.to_ascii_lowercase());
}

#[rstest]
#[case("info")]
#[case("script_plugin=debug,warn")]
fn accepts_valid_filters(#[case] directive: &str) {
    assert!(build_filter(directive).is_ok());
}

#[test]
fn rejects_invalid_filter() {
    let error = build_filter("script_plugin=loud").expect_err("invalid filter");
    assert!(matches!(error, TelemetryError::Filter(_)));
}
