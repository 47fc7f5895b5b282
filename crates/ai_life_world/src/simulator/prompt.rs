use super::decision::DecisionRequest;
use crate::models::Personality;

pub const COLLISION_CONTEXT: &str = "We bumped into each other in town.";

pub fn decision_prompt(request: &DecisionRequest) -> String {
    let nearby = if request.nearby.is_empty() {
        "None".to_string()
    } else {
        request.nearby.join(", ")
    };
    let incoming = match &request.incoming {
        Some(message) => format!("{} says: \"{}\"", message.sender, message.content),
        None => "None".to_string(),
    };

    format!(
        "You are a character in a pixel RPG.\n\
Name: {name}\n\
Personality: {profile}\n\
Health: {health}/100\n\
Hunger: {hunger}/100 (0=Full, 100=Starving)\n\
Location: ({x}, {y})\n\
Nearby Entities: {nearby}\n\
\n\
Incoming Message: {incoming}\n\
\n\
Decide your next immediate action (next 1-2 seconds).\n\
Available Actions:\n\
1. MOVE: Walk in a direction (up, down, left, right).\n\
2. STOP: Stand still.\n\
3. TALK: Say something to someone nearby or to yourself.\n\
\n\
Instructions:\n\
- If you have an Incoming Message, you MUST decide to REPLY or IGNORE based on your Personality.\n\
  - If replying, set action 'talk' and target=[sender].\n\
  - If ignoring, set action 'stop' or 'move' away.\n\
- If no message, you can explore (MOVE) or chat with nearby people (TALK).\n\
- Speak in Chinese.\n\
\n\
Output strictly in JSON format:\n\
{{\n\
  \"action\": \"move\" | \"stop\" | \"talk\",\n\
  \"direction\": \"up\" | \"down\" | \"left\" | \"right\" (required if move),\n\
  \"content\": \"message in Chinese\" (required if talk),\n\
  \"target\": \"name\" (optional if talk)\n\
}}",
        name = request.agent,
        profile = request.personality.profile(),
        health = request.vitals.health,
        hunger = request.vitals.hunger,
        x = request.tile.x,
        y = request.tile.y,
    )
}

/// Prompt for the one-shot line voiced as `own` on meeting someone `other`.
pub fn conversation_prompt(own: Personality, other: Personality, context: &str) -> String {
    format!(
        "You are a {own} NPC ({profile}). You met a {other} person. Context: {context}. \
Say something short in Chinese (max 20 chars).",
        own = own.tag(),
        profile = own.profile(),
        other = other.tag(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::TilePos;
    use crate::models::Vitals;
    use crate::simulator::IncomingMessage;

    fn request() -> DecisionRequest {
        DecisionRequest {
            agent: "Alice".to_string(),
            personality: Personality::Enfp,
            vitals: Vitals::new(90, 35),
            tile: TilePos::new(6, 6),
            nearby: vec!["Bob".to_string(), "Carol".to_string()],
            incoming: Some(IncomingMessage::new("Bob", "吃了吗")),
        }
    }

    #[test]
    fn decision_prompt_embeds_snapshot() {
        let prompt = decision_prompt(&request());
        assert!(prompt.contains("Name: Alice"));
        assert!(prompt.contains(Personality::Enfp.profile()));
        assert!(prompt.contains("Health: 90/100"));
        assert!(prompt.contains("Hunger: 35/100"));
        assert!(prompt.contains("Location: (6, 6)"));
        assert!(prompt.contains("Nearby Entities: Bob, Carol"));
        assert!(prompt.contains("Bob says: \"吃了吗\""));
        assert!(prompt.contains("\"action\": \"move\" | \"stop\" | \"talk\""));
    }

    #[test]
    fn decision_prompt_marks_empty_context() {
        let mut request = request();
        request.nearby.clear();
        request.incoming = None;
        let prompt = decision_prompt(&request);
        assert!(prompt.contains("Nearby Entities: None"));
        assert!(prompt.contains("Incoming Message: None"));
    }

    #[test]
    fn conversation_prompt_names_both_personalities() {
        let prompt = conversation_prompt(Personality::Grumpy, Personality::Intj, COLLISION_CONTEXT);
        assert!(prompt.starts_with("You are a Grumpy NPC"));
        assert!(prompt.contains("You met a INTJ person"));
        assert!(prompt.contains(COLLISION_CONTEXT));
    }
}
