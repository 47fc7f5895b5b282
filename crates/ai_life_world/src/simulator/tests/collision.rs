use super::*;

fn contact_with(partner: &str) -> ContactEvent {
    ContactEvent {
        initiator: PLAYER.to_string(),
        partner: partner.to_string(),
    }
}

fn bumped_world() -> ChatWorld {
    let mut world = world_with(&[("Bob", Personality::Grumpy, spawn_pos().offset(6.0, 0.0))]);
    world
        .apply_decision(PLAYER, DecisionResponse::Move { direction: Direction::Right })
        .expect("move");
    world
        .apply_decision("Bob", DecisionResponse::Move { direction: Direction::Left })
        .expect("move");
    world
}

#[test]
fn contact_opens_conversation_with_placeholder() {
    let mut world = bumped_world();
    let handler = CollisionConversationHandler::default();

    let conversation = handler
        .on_contact(&mut world, &contact_with("Bob"))
        .expect("opened");
    assert_eq!(conversation.initiator_personality, Personality::Friendly);
    assert_eq!(conversation.partner_personality, Personality::Grumpy);
    assert_eq!(conversation.context, COLLISION_CONTEXT);
    assert!(world.lock().is_held_by(conversation.id));
    assert_eq!(world.viewport().text(), COMPOSING_PLACEHOLDER);

    for name in [PLAYER, "Bob"] {
        let agent = world.agent(name).expect("agent");
        assert!(agent.velocity.is_zero());
        assert!(!agent.animation.walking);
    }
}

#[test]
fn contact_is_ignored_while_locked() {
    let mut world = bumped_world();
    world.apply_decision(PLAYER, talk("busy", None)).expect("talk");
    let before = world.clone();

    let handler = CollisionConversationHandler::default();
    assert!(handler.on_contact(&mut world, &contact_with("Bob")).is_none());
    assert_eq!(world.lock(), before.lock());
    assert_eq!(world.viewport(), before.viewport());
    assert_eq!(world.agent("Bob"), before.agent("Bob"));
}

#[test]
fn contact_between_npcs_does_not_qualify() {
    let mut world = world_with(&[
        ("Bob", Personality::Grumpy, spawn_pos().offset(40.0, 0.0)),
        ("Cara", Personality::Lazy, spawn_pos().offset(44.0, 0.0)),
    ]);
    let handler = CollisionConversationHandler::default();
    let contact = ContactEvent {
        initiator: "Bob".to_string(),
        partner: "Cara".to_string(),
    };
    assert!(handler.on_contact(&mut world, &contact).is_none());
    assert!(!world.is_talking());
}

#[test]
fn completion_renders_reply_and_repels_both() {
    let mut world = bumped_world();
    let handler = CollisionConversationHandler::default();
    let conversation = handler
        .on_contact(&mut world, &contact_with("Bob"))
        .expect("opened");

    let outcome = handler.complete(&mut world, &conversation, "走开");
    assert_eq!(outcome, CollisionOutcome::Shown);
    assert_eq!(
        world.viewport().text(),
        "Bob (Grumpy):\n\n\"走开\"\n\n(Click to close)"
    );
    assert!(world.lock().is_held_by(conversation.id));

    let player = world.player().expect("player").pos;
    let bob = world.agent("Bob").expect("bob").pos;
    assert_eq!(player.x, spawn_pos().x - DEFAULT_REPULSION_DISTANCE);
    assert_eq!(bob.x, spawn_pos().x + 6.0 + DEFAULT_REPULSION_DISTANCE);
    assert_eq!(player.y, bob.y);
}

#[test]
fn reply_after_dismiss_is_dropped_but_still_repels() {
    let mut world = bumped_world();
    let handler = CollisionConversationHandler::default();
    let conversation = handler
        .on_contact(&mut world, &contact_with("Bob"))
        .expect("opened");
    world.pointer_down().expect("dismiss placeholder");

    let outcome = handler.complete(&mut world, &conversation, "late");
    assert_eq!(outcome, CollisionOutcome::ReplyDiscarded);
    assert!(!world.viewport().is_visible());
    assert!(!world.is_talking());
    assert_eq!(
        world.player().expect("player").pos.x,
        spawn_pos().x - DEFAULT_REPULSION_DISTANCE
    );
}

#[test]
fn coincident_agents_are_pushed_apart_horizontally() {
    let mut world = world_with(&[("Bob", Personality::Grumpy, spawn_pos())]);
    let handler = CollisionConversationHandler::default();
    let conversation = handler
        .on_contact(&mut world, &contact_with("Bob"))
        .expect("opened");
    handler.complete(&mut world, &conversation, "...");

    let player = world.player().expect("player").pos;
    let bob = world.agent("Bob").expect("bob").pos;
    assert_eq!(bob.x - player.x, 2.0 * DEFAULT_REPULSION_DISTANCE);
}
