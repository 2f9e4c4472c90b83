use crate::{graph::ContextBlob, session::Turn};

const ROLE: &str = "You are a kind, logical, biomedical doctor chatbot.";

const TASK: &str = "TASK:
- Ask relevant medical follow-up questions.
- If enough info, provide the most likely diagnosis and advice.
- Be concise, empathetic, and medically accurate.
- End the chat when confident in your diagnosis.";

/// Renders the conversation and the graph context into the instruction
/// block sent to the language model.
pub fn compose(turns: &[Turn], context: &ContextBlob) -> String {
    let history = turns
        .iter()
        .map(|turn| match &turn.doctor {
            Some(doctor) => format!("Patient: {}\nDoctor: {doctor}", turn.patient),
            None => format!("Patient: {}", turn.patient),
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{ROLE}\n\n\
         PATIENT CONVERSATION HISTORY:\n{history}\n\n\
         KNOWLEDGE GRAPH CONTEXT:\n{context}\n\n\
         {TASK}\n\n\
         YOUR RESPONSE:\n"
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::compose;
    use crate::{
        graph::{tests::entity, ContextBlob},
        session::Turn,
    };

    fn conversation() -> Vec<Turn> {
        vec![
            Turn {
                patient: "I have a sore throat".to_string(),
                doctor: Some("Do you have a fever?".to_string()),
            },
            Turn::new("Yes, since yesterday"),
        ]
    }

    #[test]
    fn layout() {
        let context = ContextBlob::from_entities(&[entity(json!({"disease": "Strep throat"}))]);
        let prompt = compose(&conversation(), &context);

        assert_eq!(
            prompt,
            "You are a kind, logical, biomedical doctor chatbot.\n\n\
             PATIENT CONVERSATION HISTORY:\n\
             Patient: I have a sore throat\n\
             Doctor: Do you have a fever?\n\
             Patient: Yes, since yesterday\n\n\
             KNOWLEDGE GRAPH CONTEXT:\n\
             {\n  \"disease\": \"Strep throat\"\n}\n\n\
             TASK:\n\
             - Ask relevant medical follow-up questions.\n\
             - If enough info, provide the most likely diagnosis and advice.\n\
             - Be concise, empathetic, and medically accurate.\n\
             - End the chat when confident in your diagnosis.\n\n\
             YOUR RESPONSE:\n"
        );
    }

    #[test]
    fn deterministic() {
        let context = ContextBlob::empty();
        let turns = conversation();
        assert_eq!(compose(&turns, &context), compose(&turns, &context));
    }

    #[test]
    fn empty_context_uses_sentinel() {
        let prompt = compose(&[Turn::new("hello")], &ContextBlob::empty());
        assert!(prompt.contains("KNOWLEDGE GRAPH CONTEXT:\nNo relevant entities found.\n"));
        assert!(prompt.contains("Patient: hello\n"));
        assert!(!prompt.contains("Doctor:"));
    }
}
