//! Behaviour-driven tests for session dispatch and discovery dialogs.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::json;

use crate::protocol::{LogLevel, Message};
use crate::session::Session;
use crate::test_support::{ScriptedHost, replies};

use super::StationPlugin;

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TestWorld {
    host: ScriptedHost,
    replies: Vec<Message>,
}

impl TestWorld {
    fn script(&mut self, extend: impl FnOnce(ScriptedHost) -> ScriptedHost) {
        self.host = extend(std::mem::take(&mut self.host));
    }
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::default()
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("a host that sends the request {method}")]
fn given_request(world: &mut TestWorld, method: String) {
    world.script(|host| host.request(method.trim_matches('"')));
}

#[given("a host that requests the series {series_id}")]
fn given_series_request(world: &mut TestWorld, series_id: String) {
    world.script(|host| host.series_request(series_id.trim_matches('"')));
}

#[given("the host searches for {query}")]
fn given_search(world: &mut TestWorld, query: String) {
    world.script(|host| host.submit(json!({ "query": query.trim_matches('"') })));
}

#[given("the host selects the station {station}")]
fn given_selection(world: &mut TestWorld, station: String) {
    world.script(|host| host.submit(json!({ "station": station.trim_matches('"') })));
}

#[given("the host cancels the dialog")]
fn given_cancel(world: &mut TestWorld) {
    world.script(ScriptedHost::cancel);
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("the session runs until the host disconnects")]
fn when_session_runs(world: &mut TestWorld) {
    let host = std::mem::take(&mut world.host);
    let mut session = Session::new(host.transport(), StationPlugin::default());
    session.run().expect("session should end cleanly");
    let (transport, _) = session.into_parts();
    world.replies = replies(transport);
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the host receives the error {text}")]
fn then_error(world: &mut TestWorld, text: String) {
    let expected = Message::Error(text.trim_matches('"').to_owned());
    assert!(
        world.replies.contains(&expected),
        "expected {expected:?} in {:?}",
        world.replies
    );
}

#[then("the host receives the result {value}")]
fn then_result(world: &mut TestWorld, value: String) {
    let expected = Message::Result(json!(value.trim_matches('"')));
    assert!(
        world.replies.contains(&expected),
        "expected {expected:?} in {:?}",
        world.replies
    );
}

#[then("the host receives no binary data")]
fn then_no_binary(world: &mut TestWorld) {
    assert!(
        !world
            .replies
            .iter()
            .any(|message| matches!(message, Message::Binary(_)))
    );
}

#[then("the host receives binary data")]
fn then_binary(world: &mut TestWorld) {
    assert!(
        world
            .replies
            .iter()
            .any(|message| matches!(message, Message::Binary(_)))
    );
}

#[then("the host receives a warning log")]
fn then_warning(world: &mut TestWorld) {
    assert!(world.replies.iter().any(|message| matches!(
        message,
        Message::Log(record) if record.level() == LogLevel::Warn
    )));
}

#[then("the number of forms shown is {count}")]
fn then_form_count(world: &mut TestWorld, count: usize) {
    let shown = world
        .replies
        .iter()
        .filter(|message| matches!(message, Message::ShowForm(_)))
        .count();
    assert_eq!(shown, count);
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[scenario(
    path = "tests/features/session.feature",
    name = "Unknown methods are reported by name"
)]
fn unknown_method(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/session.feature",
    name = "Series data is refused before initialisation"
)]
fn series_before_initialise(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/session.feature",
    name = "Cancelling the discovery dialog"
)]
fn cancelling_discovery(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/session.feature",
    name = "A search without candidates re-shows the first step"
)]
fn search_without_candidates(world: TestWorld) {
    let _ = world;
}

#[scenario(
    path = "tests/features/session.feature",
    name = "Completing discovery enables series data"
)]
fn completing_discovery(world: TestWorld) {
    let _ = world;
}
