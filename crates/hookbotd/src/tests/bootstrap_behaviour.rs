//! Behavioural tests for the bot bootstrap sequence.

use std::cell::RefCell;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;

use super::support::{self, HealthEvent, TestWorld};

#[fixture]
fn world() -> RefCell<TestWorld> {
    support::world()
}

#[given("a healthy configuration loader")]
fn given_healthy_loader(world: &RefCell<TestWorld>) {
    world.borrow_mut().use_successful_loader();
}

#[given("a failing configuration loader")]
fn given_failing_loader(world: &RefCell<TestWorld>) {
    world.borrow_mut().use_failing_loader();
}

#[given("a configuration with a zero response timeout")]
fn given_invalid_loader(world: &RefCell<TestWorld>) {
    world.borrow_mut().use_invalid_loader();
}

#[given("a configuration that autostarts the worker")]
fn given_autostart_loader(world: &RefCell<TestWorld>) {
    world.borrow_mut().use_autostart_loader();
}

#[given("an embedder handler for \"{kind}\"")]
fn given_embedder_handler(world: &RefCell<TestWorld>, kind: String) {
    world.borrow_mut().add_echo_handler(&kind);
}

#[when("the bot bootstrap runs")]
fn when_bootstrap_runs(world: &RefCell<TestWorld>) {
    world.borrow_mut().bootstrap();
}

#[when("an \"{kind}\" event carrying \"{text}\" is dispatched")]
fn when_event_with_text(world: &RefCell<TestWorld>, kind: String, text: String) {
    world.borrow_mut().dispatch(&kind, Value::String(text));
}

#[when("a \"{kind}\" event is dispatched")]
fn when_event_dispatched(world: &RefCell<TestWorld>, kind: String) {
    world.borrow_mut().dispatch_kind(&kind);
}

#[then("bootstrap succeeds")]
fn then_bootstrap_succeeds(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    assert!(
        world.bootstrap_error().is_none(),
        "bootstrap error: {:?}",
        world.bootstrap_error()
    );
    assert!(world.bot().is_some(), "bot should have been initialised");
}

#[then("bootstrap fails")]
fn then_bootstrap_fails(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    assert!(world.bootstrap_error().is_some(), "bootstrap should fail");
    assert!(world.bot().is_none(), "no bot should be returned");
}

#[then("the bootstrap error mentions \"{text}\"")]
fn then_error_mentions(world: &RefCell<TestWorld>, text: String) {
    let world = world.borrow();
    let error = world.bootstrap_error().expect("bootstrap error missing");
    let rendered = error.to_string();
    assert!(rendered.contains(&text), "'{rendered}' should mention '{text}'");
}

#[then("the reporter recorded bootstrap start")]
fn then_reporter_start(world: &RefCell<TestWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&HealthEvent::BootstrapStarting),
        "bootstrap start event missing"
    );
}

#[then("the reporter recorded bootstrap success")]
fn then_reporter_success(world: &RefCell<TestWorld>) {
    assert!(
        world
            .borrow()
            .reporter
            .events()
            .contains(&HealthEvent::BootstrapSucceeded),
        "bootstrap success event missing"
    );
}

#[then("the reporter recorded bootstrap failure")]
fn then_reporter_failure(world: &RefCell<TestWorld>) {
    let events = world.borrow().reporter.events();
    let failed = events
        .iter()
        .any(|event| matches!(event, HealthEvent::BootstrapFailed(_)));
    assert!(failed, "bootstrap failure event missing: {events:?}");
}

#[then("the frozen registry contains \"{kind}\"")]
fn then_registry_contains(world: &RefCell<TestWorld>, kind: String) {
    let world = world.borrow();
    let kinds = world
        .reporter
        .frozen_kinds()
        .expect("registry frozen event missing");
    assert!(kinds.contains(&kind), "{kind} missing from {kinds:?}");
    let bot = world.bot().expect("bot should be bootstrapped");
    assert!(bot.registry().resolve(&kind).is_some());
}

#[then("the response code is {code}")]
fn then_response_code(world: &RefCell<TestWorld>, code: u16) {
    let world = world.borrow();
    let response = world.last_response().expect("no response recorded");
    assert_eq!(response.status().http_code(), code, "response: {response:?}");
}

#[then("the response body is \"{text}\"")]
fn then_response_body(world: &RefCell<TestWorld>, text: String) {
    let world = world.borrow();
    let response = world.last_response().expect("no response recorded");
    assert_eq!(response.body(), Value::String(text));
}

#[then("the worker is running")]
fn then_worker_running(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let bot = world.bot().expect("bot should be bootstrapped");
    assert!(bot.status().worker_running, "worker should be running");
}

#[then("the worker is stopped")]
fn then_worker_stopped(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    let bot = world.bot().expect("bot should be bootstrapped");
    let status = bot.status();
    assert!(!status.worker_running, "worker should be stopped");
    assert_eq!(status.status, "stopped");
}

#[scenario(path = "tests/features/bot_bootstrap.feature")]
fn bot_bootstrap(#[from(world)] world: RefCell<TestWorld>) {
    drop(world);
}
