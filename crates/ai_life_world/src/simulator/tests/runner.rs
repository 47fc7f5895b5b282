use super::*;
use std::time::Duration;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime")
}

fn runner_with(
    world: ChatWorld,
    client: &ScriptedClient,
    credential: Option<&str>,
    runtime: &tokio::runtime::Runtime,
) -> WorldRunner<ScriptedClient> {
    WorldRunner::new(
        world,
        DecisionClient::new(LlmClientConfig::default(), client.clone()),
        credential.map(str::to_string),
        runtime.handle().clone(),
    )
}

fn settle<C: LlmCompletionClient + 'static>(
    runtime: &tokio::runtime::Runtime,
    runner: &mut WorldRunner<C>,
) {
    assert!(
        runtime.block_on(runner.wait_for_completion(Duration::from_secs(5))),
        "remote call did not complete"
    );
}

#[test]
fn decision_round_trip_applies_move() {
    let runtime = runtime();
    let client = ScriptedClient::new(r#"{"action":"move","direction":"right"}"#, "");
    let mut runner = runner_with(world_with(&[]), &client, Some("sk-test"), &runtime);

    let events = runner.tick(1_000);
    assert!(matches!(
        events.as_slice(),
        [RunnerLogEntry {
            kind: RunnerLogKind::DecisionIssued { .. },
            ..
        }]
    ));

    settle(&runtime, &mut runner);
    let events = runner.tick(0);
    assert!(events.iter().any(|entry| matches!(
        &entry.kind,
        RunnerLogKind::DecisionApplied {
            action: AppliedAction::Moved {
                direction: Direction::Right
            },
            ..
        }
    )));
    assert_eq!(
        runner.world().player().expect("player").velocity.vx,
        DEFAULT_MOVE_SPEED
    );

    let metrics = runner.metrics();
    assert_eq!(metrics.decisions_issued, 1);
    assert_eq!(metrics.decisions_applied, 1);
    assert_eq!(metrics.fallbacks, 0);
    assert_eq!(client.calls(), 1);
    let trace = runner.last_trace(PLAYER).expect("trace");
    assert_eq!(trace.ticket, Some(1));
    assert!(!trace.is_fallback());
}

#[test]
fn missing_credential_stops_without_calling_out() {
    let runtime = runtime();
    let client = ScriptedClient::new(r#"{"action":"move","direction":"up"}"#, "");
    let mut runner = runner_with(world_with(&[]), &client, None, &runtime);
    runner
        .world_mut()
        .apply_decision(PLAYER, DecisionResponse::Move { direction: Direction::Left })
        .expect("move");

    runner.tick(1_000);
    settle(&runtime, &mut runner);
    runner.tick(0);

    assert_eq!(client.calls(), 0);
    assert_eq!(runner.metrics().fallbacks, 1);
    assert!(runner.world().player().expect("player").velocity.is_zero());
    assert!(runner.last_trace(PLAYER).expect("trace").is_fallback());
}

#[test]
fn malformed_output_falls_back_to_stop() {
    let runtime = runtime();
    let client = ScriptedClient::new(r#"{"action":"dance"}"#, "");
    let mut runner = runner_with(world_with(&[]), &client, Some("sk-test"), &runtime);

    runner.tick(1_000);
    settle(&runtime, &mut runner);
    runner.tick(0);

    assert_eq!(client.calls(), 1);
    assert_eq!(runner.metrics().fallbacks, 1);
    assert_eq!(runner.metrics().decisions_applied, 1);
    let trace = runner.last_trace(PLAYER).expect("trace");
    assert_eq!(trace.response, DecisionResponse::Stop);
    assert_eq!(trace.llm_output.as_deref(), Some(r#"{"action":"dance"}"#));
}

#[test]
fn collision_conversation_shows_reply_then_dismisses() {
    let runtime = runtime();
    let client = ScriptedClient::new(r#"{"action":"stop"}"#, "  今天天气真好  ");
    let world = world_with(&[("Bob", Personality::Enfp, spawn_pos().offset(5.0, 0.0))]);
    let mut runner = runner_with(world, &client, Some("sk-test"), &runtime);

    let events = runner.tick(16);
    assert!(events.iter().any(|entry| matches!(
        &entry.kind,
        RunnerLogKind::DialogueShown { text, .. } if text == COMPOSING_PLACEHOLDER
    )));
    assert_eq!(runner.metrics().conversations_opened, 1);

    settle(&runtime, &mut runner);
    let events = runner.tick(16);
    assert!(events.iter().any(|entry| matches!(
        &entry.kind,
        RunnerLogKind::DialogueShown { text, .. }
            if text == "Bob (ENFP):\n\n\"今天天气真好\"\n\n(Click to close)"
    )));
    assert_eq!(client.calls(), 1);

    let player = runner.world().player().expect("player").pos;
    let bob = runner.world().agent("Bob").expect("bob").pos;
    assert_eq!(bob.x - player.x, 5.0 + 2.0 * DEFAULT_REPULSION_DISTANCE);

    let dismissed = runner.pointer_down().expect("dismissed");
    assert!(matches!(
        dismissed.kind,
        RunnerLogKind::DialogueDismissed { .. }
    ));
    assert!(!runner.world().is_talking());
    assert!(runner.pointer_down().is_none());
}

#[test]
fn collision_prompt_voices_the_player_and_labels_the_partner() {
    let runtime = runtime();
    let client = ScriptedClient::new(r#"{"action":"stop"}"#, "走开");
    let world = world_with(&[("Bob", Personality::Grumpy, spawn_pos().offset(5.0, 0.0))]);
    let mut runner = runner_with(world, &client, Some("sk-test"), &runtime);

    runner.tick(16);
    settle(&runtime, &mut runner);
    runner.tick(16);

    let prompts = client.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with("You are a Friendly NPC"));
    assert!(prompts[0].contains("You met a Grumpy person"));
    assert_eq!(
        runner.world().viewport().text(),
        "Bob (Grumpy):\n\n\"走开\"\n\n(Click to close)"
    );
}

#[test]
fn simultaneous_contacts_open_a_single_conversation() {
    let runtime = runtime();
    let client = ScriptedClient::new(r#"{"action":"stop"}"#, "嗨");
    let world = world_with(&[
        ("Bob", Personality::Enfp, spawn_pos().offset(5.0, 0.0)),
        ("Cara", Personality::Lazy, spawn_pos().offset(-5.0, 0.0)),
    ]);
    let mut runner = runner_with(world, &client, Some("sk-test"), &runtime);

    let events = runner.tick(16);
    let shown = events
        .iter()
        .filter(|entry| matches!(entry.kind, RunnerLogKind::DialogueShown { .. }))
        .count();
    let ignored = events
        .iter()
        .filter(|entry| matches!(entry.kind, RunnerLogKind::CollisionIgnored { .. }))
        .count();
    assert_eq!(shown, 1);
    assert_eq!(ignored, 1);
    assert_eq!(runner.metrics().conversations_opened, 1);
    assert_eq!(runner.metrics().collisions_ignored, 1);
    assert!(runner.world().is_talking());

    settle(&runtime, &mut runner);
    runner.tick(16);
    assert_eq!(client.calls(), 1);
}

#[test]
fn slow_decision_times_out_to_stop() {
    let runtime = runtime();
    let client = ScriptedClient::new(r#"{"action":"move","direction":"up"}"#, "")
        .with_delay(Duration::from_millis(400));
    let config = WorldConfig {
        decision_timeout_ms: 50,
        ..WorldConfig::default()
    };
    let player = Agent::new(PLAYER, Personality::Friendly, spawn_pos());
    let mut runner = runner_with(
        ChatWorld::with_player(config, player),
        &client,
        Some("sk-test"),
        &runtime,
    );
    runner
        .world_mut()
        .apply_decision(PLAYER, DecisionResponse::Move { direction: Direction::Left })
        .expect("move");

    runner.tick(1_000);
    settle(&runtime, &mut runner);
    runner.tick(0);

    let trace = runner.last_trace(PLAYER).expect("trace");
    assert_eq!(trace.response, DecisionResponse::Stop);
    assert_eq!(trace.error.as_deref(), Some("decision timed out after 50ms"));
    assert_eq!(runner.metrics().fallbacks, 1);
    assert_eq!(runner.metrics().decisions_applied, 1);
    assert!(runner.world().player().expect("player").velocity.is_zero());
}

/// Panics inside the blocking worker.
struct PanickingClient;

impl LlmCompletionClient for PanickingClient {
    fn complete(
        &self,
        _credential: &str,
        _request: &LlmCompletionRequest,
    ) -> Result<LlmCompletionResult, LlmClientError> {
        panic!("worker blew up");
    }
}

#[test]
fn panicking_decision_task_falls_back_to_stop() {
    let runtime = runtime();
    let mut runner = WorldRunner::new(
        world_with(&[]),
        DecisionClient::new(LlmClientConfig::default(), PanickingClient),
        Some("sk-test".to_string()),
        runtime.handle().clone(),
    );
    runner
        .world_mut()
        .apply_decision(PLAYER, DecisionResponse::Move { direction: Direction::Down })
        .expect("move");

    runner.tick(1_000);
    settle(&runtime, &mut runner);
    runner.tick(0);

    let trace = runner.last_trace(PLAYER).expect("trace");
    assert_eq!(trace.response, DecisionResponse::Stop);
    assert!(trace
        .error
        .as_deref()
        .is_some_and(|error| error.starts_with("decision task aborted")));
    assert_eq!(runner.metrics().fallbacks, 1);
    assert!(runner.world().player().expect("player").velocity.is_zero());
}

#[test]
fn collision_while_talking_is_ignored_without_call() {
    let runtime = runtime();
    let client = ScriptedClient::new(r#"{"action":"stop"}"#, "hi");
    let world = world_with(&[("Bob", Personality::Enfp, spawn_pos().offset(5.0, 0.0))]);
    let mut runner = runner_with(world, &client, Some("sk-test"), &runtime);
    runner
        .world_mut()
        .apply_decision("Bob", talk("先说", None))
        .expect("talk");
    let shown = runner.world().viewport().text().to_string();

    let events = runner.tick(16);
    assert!(events.iter().any(|entry| matches!(
        entry.kind,
        RunnerLogKind::CollisionIgnored { .. }
    )));
    assert_eq!(runner.metrics().collisions_ignored, 1);
    assert_eq!(runner.world().viewport().text(), shown);
    assert_eq!(client.calls(), 0);
}

#[test]
fn decision_arriving_after_collision_is_discarded() {
    let runtime = runtime();
    let client = ScriptedClient::new(r#"{"action":"talk","content":"嗨","target":"Bob"}"#, "哼");
    let world = world_with(&[("Bob", Personality::Grumpy, spawn_pos().offset(40.0, 0.0))]);
    let mut runner = runner_with(world, &client, Some("sk-test"), &runtime);

    // Issue decisions for Alice and Bob, then bump into Bob before they come back.
    runner.tick(1_000);
    assert_eq!(runner.metrics().decisions_issued, 2);
    let bob = runner.world().agent("Bob").expect("bob").pos;
    runner.world_mut().agent_mut(PLAYER).expect("player").pos = bob;

    let mut settled = 0;
    while settled < 3 {
        let events = runner.tick(0);
        settled += events
            .iter()
            .filter(|entry| {
                matches!(
                    entry.kind,
                    RunnerLogKind::DecisionDiscarded { .. }
                        | RunnerLogKind::DecisionApplied { .. }
                ) || matches!(&entry.kind, RunnerLogKind::DialogueShown { text, .. } if text != COMPOSING_PLACEHOLDER)
            })
            .count();
        if settled < 3 {
            settle(&runtime, &mut runner);
        }
    }

    let metrics = runner.metrics();
    assert_eq!(metrics.decisions_discarded, 2);
    assert_eq!(metrics.decisions_applied, 0);
    assert!(runner.world().agent("Bob").expect("bob").mailbox.is_empty());
    assert!(runner.world().player().expect("player").mailbox.is_empty());
    assert!(runner.world().viewport().text().starts_with("Bob (Grumpy):"));
}

#[test]
fn log_is_bounded() {
    let runtime = runtime();
    let client = ScriptedClient::new(r#"{"action":"stop"}"#, "");
    let mut runner = runner_with(world_with(&[]), &client, None, &runtime).with_log_capacity(2);

    for _ in 0..3 {
        runner.tick(1_000);
        settle(&runtime, &mut runner);
    }
    runner.tick(0);
    assert_eq!(runner.log().count(), 2);
}
