//! Behavioural tests for event dispatch through the registry.

use std::cell::RefCell;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};

use crate::dispatch::{CancellationToken, Dispatcher, Response};
use crate::event::Event;
use crate::registry::{HandlerError, RegistryBuilder, handler_fn};

use super::support::{HealthEvent, RecordingHealthReporter};

type StepResult = Result<(), String>;

struct DispatchWorld {
    dispatcher: Option<Dispatcher>,
    reporter: Arc<RecordingHealthReporter>,
    seen: Arc<Mutex<Vec<i64>>>,
    responses: Vec<Response>,
}

impl DispatchWorld {
    fn new() -> Self {
        Self {
            dispatcher: None,
            reporter: Arc::new(RecordingHealthReporter::default()),
            seen: Arc::new(Mutex::new(Vec::new())),
            responses: Vec::new(),
        }
    }

    fn install(&mut self) -> StepResult {
        let seen = Arc::clone(&self.seen);
        let mut builder = RegistryBuilder::new();
        builder
            .register(
                "record",
                handler_fn(move |event, _| {
                    let value = event.payload().as_i64().unwrap_or_default();
                    // Earlier events sleep longer so misordering would show.
                    let delay = 10_u64.saturating_sub(u64::try_from(value).unwrap_or(0));
                    thread::sleep(Duration::from_millis(delay));
                    seen.lock().expect("seen mutex poisoned").push(value);
                    Ok(json!({ "recorded": value }))
                }),
            )
            .and_then(|builder| {
                builder.register(
                    "explode",
                    handler_fn(|_, _| -> Result<Value, HandlerError> { panic!("kaboom") }),
                )
            })
            .and_then(|builder| {
                builder.register_guarded(
                    "admin",
                    |event: &Event| event.source() == "operator",
                    handler_fn(|_, _| Ok(json!("granted"))),
                )
            })
            .map_err(|error| error.to_string())?;
        self.dispatcher = Some(Dispatcher::new(
            Arc::new(builder.build()),
            Duration::from_secs(1),
            self.reporter.clone(),
        ));
        Ok(())
    }

    fn dispatcher(&self) -> &Dispatcher {
        self.dispatcher.as_ref().expect("dispatcher should be installed")
    }

    fn submit_session(&mut self, kind: &str, count: i64, session: &str) {
        let pending: Vec<_> = (0..count)
            .map(|value| {
                let event = Event::new(kind, json!(value)).with_session(session);
                self.dispatcher().submit(event, CancellationToken::new())
            })
            .collect();
        self.responses = pending.into_iter().map(|pending| pending.wait()).collect();
    }

    fn dispatch_from(&mut self, kind: &str, source: &str) {
        let event = Event::new(kind, json!(0)).with_source(source);
        self.responses = vec![self.dispatcher().dispatch(event)];
    }

    fn seen(&self) -> Vec<i64> {
        self.seen.lock().expect("seen mutex poisoned").clone()
    }
}

#[fixture]
fn world() -> RefCell<DispatchWorld> {
    RefCell::new(DispatchWorld::new())
}

#[given("a dispatcher with recording handlers")]
fn given_dispatcher(world: &RefCell<DispatchWorld>) -> StepResult {
    world.borrow_mut().install()
}

#[when("{count} \"{kind}\" events are submitted for session \"{session}\"")]
fn when_session_events(world: &RefCell<DispatchWorld>, count: i64, kind: String, session: String) {
    world.borrow_mut().submit_session(&kind, count, &session);
}

#[when("the dispatcher receives \"{kind}\" from \"{source}\"")]
fn when_dispatcher_receives(world: &RefCell<DispatchWorld>, kind: String, source: String) {
    world.borrow_mut().dispatch_from(&kind, &source);
}

#[then("every dispatcher reply has code {code}")]
fn then_every_code(world: &RefCell<DispatchWorld>, code: u16) {
    let world = world.borrow();
    assert!(!world.responses.is_empty(), "no responses recorded");
    for response in &world.responses {
        assert_eq!(response.status().http_code(), code, "response: {response:?}");
    }
}

#[then("the dispatcher replies with code {code}")]
fn then_code(world: &RefCell<DispatchWorld>, code: u16) {
    let world = world.borrow();
    let response = world.responses.last().expect("no response recorded");
    assert_eq!(response.status().http_code(), code, "response: {response:?}");
}

#[then("the handler saw the payloads in submission order")]
fn then_in_order(world: &RefCell<DispatchWorld>) {
    let world = world.borrow();
    let expected: Vec<i64> = (0..i64::try_from(world.responses.len()).unwrap_or(0)).collect();
    assert_eq!(world.seen(), expected);
}

#[then("the handler saw no payloads")]
fn then_nothing_seen(world: &RefCell<DispatchWorld>) {
    assert!(world.borrow().seen().is_empty());
}

#[then("the reporter recorded a handler failure")]
fn then_handler_failure(world: &RefCell<DispatchWorld>) {
    let events = world.borrow().reporter.events();
    let failed = events.iter().any(
        |event| matches!(event, HealthEvent::HandlerFailed(message) if message.contains("kaboom")),
    );
    assert!(failed, "handler failure event missing: {events:?}");
}

#[scenario(path = "tests/features/bot_dispatch.feature")]
fn bot_dispatch(#[from(world)] world: RefCell<DispatchWorld>) {
    drop(world);
}
