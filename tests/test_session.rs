mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use batch_extract::core::EngineConfig;
use batch_extract::extract::{Classifier, ExtractionSession, SessionControl, SessionState};
use batch_extract::relay::DecisionRelay;
use batch_extract::test_utils::{emit, RecordingSink, ScriptedArchiver, Step};
use batch_extract::ExtractError;
use crate::common::*;

fn run_session(
    archiver: &ScriptedArchiver,
    config: &EngineConfig,
    sink: &RecordingSink,
    relay: &DecisionRelay,
    password: Option<&str>,
) -> batch_extract::extract::SessionOutcome {
    setup();
    let classifier = Classifier::new(config).unwrap();
    let request = batch_extract::ExtractionRequest::new(0, "a.7z", "out", password.map(String::from));
    let session = ExtractionSession::new(
        request,
        config,
        &classifier,
        archiver,
        relay,
        sink,
        Arc::new(SessionControl::new(0)),
    );
    assert_eq!(session.state(), SessionState::Starting);
    session.run()
}

#[test]
fn test_enqueued_password_only_answers_first_prompt() {
    let archiver = ScriptedArchiver::new().script(
        "a.7z",
        vec![
            emit(PASSWORD_PROMPT),
            Step::Expect,
            emit("\nsome volumes use another key\n"),
            emit(PASSWORD_PROMPT),
            Step::Expect,
            emit(SUCCESS),
        ],
    );
    let relay = Arc::new(DecisionRelay::new());
    let sink = RecordingSink::new().answering_passwords(Arc::clone(&relay), "second");

    let outcome = run_session(&archiver, &EngineConfig::default(), &sink, &relay, Some("first"));

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts, 1);
    assert_eq!(
        archiver.inputs(Path::new("a.7z")),
        vec!["first".to_string(), "second".to_string()]
    );
}

#[test]
fn test_wrong_password_without_retry() {
    let archiver = ScriptedArchiver::new()
        .script("a.7z", wrong_password_run())
        .script("a.7z", clean_run());
    let config = EngineConfig::builder().retry_wrong_password(false).build();
    let relay = DecisionRelay::new();
    let sink = RecordingSink::new();

    let outcome = run_session(&archiver, &config, &sink, &relay, Some("bad"));

    assert_eq!(outcome.result, Err(ExtractError::PasswordFailure));
    assert_eq!(outcome.to_string(), "failure: password");
    assert_eq!(archiver.spawn_count(Path::new("a.7z")), 1);
}

#[test]
fn test_retry_succeeds_with_relayed_password() {
    let archiver = ScriptedArchiver::new()
        .script("a.7z", {
            let mut steps = vec![emit(" 40%")];
            steps.extend(wrong_password_run());
            steps
        })
        .script(
            "a.7z",
            vec![emit(PASSWORD_PROMPT), Step::Expect, emit(" 20%"), emit(" 70%"), emit(SUCCESS)],
        );
    let relay = Arc::new(DecisionRelay::new());
    let sink = RecordingSink::new().answering_passwords(Arc::clone(&relay), "right");

    let outcome = run_session(&archiver, &EngineConfig::default(), &sink, &relay, Some("wrong"));

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts, 2);
    assert_eq!(sink.progress_of(0), vec![40, 70, 100]);
}

#[test]
fn test_prompt_split_across_chunks() {
    let archiver = ScriptedArchiver::new().script(
        "a.7z",
        vec![
            emit("\nEnter pass"),
            Step::Pause(Duration::from_millis(20)),
            emit("word (will not be echoed):"),
            Step::Expect,
            emit("\nEverything is "),
            emit("Ok\n"),
        ],
    );
    let relay = DecisionRelay::new();
    let sink = RecordingSink::new();

    let outcome = run_session(&archiver, &EngineConfig::default(), &sink, &relay, Some("pw"));

    assert!(outcome.is_success());
    assert_eq!(archiver.inputs(Path::new("a.7z")), vec!["pw".to_string()]);
}

#[test]
fn test_cancelled_before_start_never_spawns() {
    setup();
    let archiver = ScriptedArchiver::new().script("a.7z", clean_run());
    let config = EngineConfig::default();
    let classifier = Classifier::new(&config).unwrap();
    let relay = DecisionRelay::new();
    let sink = RecordingSink::new();
    let control = Arc::new(SessionControl::new(0));
    control.cancel(&relay);

    let outcome = ExtractionSession::new(
        batch_extract::ExtractionRequest::new(0, "a.7z", "out", None),
        &config,
        &classifier,
        &archiver,
        &relay,
        &sink,
        control,
    )
    .run();

    assert_eq!(outcome.result, Err(ExtractError::Canceled));
    assert_eq!(archiver.spawn_count(Path::new("a.7z")), 0);
}
