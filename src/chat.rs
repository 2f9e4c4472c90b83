use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    error::Error,
    graph::{ContextBlob, ContextFetcher, EntityQuery, GraphStore, Neo4jStore},
    llm::{select_model, CohereClient, LanguageModel},
    prompt,
    session::{Session, Turn},
    settings::{ChatSettings, Settings},
};

/// Outcome of one chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Set only on the turn whose reply first suggested a diagnosis.
    pub diagnosis_newly_suggested: bool,
}

/// Runs the retrieval-augmented chat pipeline.
///
/// One instance serves every conversation of the process; all per-
/// conversation state lives in the [`Session`] passed to each call.
pub struct ChatOrchestrator {
    context: ContextFetcher,
    llm: Arc<dyn LanguageModel>,
    model: String,
    settings: ChatSettings,
}

impl ChatOrchestrator {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        llm: Arc<dyn LanguageModel>,
        model: impl Into<String>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            context: ContextFetcher::new(graph),
            llm,
            model: model.into(),
            settings,
        }
    }

    /// Connects to the knowledge graph and the language model described by
    /// `settings`, and settles on a model.
    pub async fn connect(settings: &Settings) -> Result<Self, Error> {
        let graph = Neo4jStore::connect(&settings.graph).await?;
        let llm = CohereClient::new(&settings.llm)?;
        let model = select_model(&llm, &settings.llm.model, &settings.llm.fallback_model).await;
        Ok(Self::new(
            Arc::new(graph),
            Arc::new(llm),
            model,
            settings.chat.clone(),
        ))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answers `message` as the next turn of `session`.
    ///
    /// Language model failures are turned into the reply text. The only
    /// error returned is [`Error::GraphUnavailable`], and only when
    /// `strict_graph` is set; the session is left unchanged in that case.
    pub async fn turn(&self, session: &mut Session, message: &str) -> Result<Reply, Error> {
        session.begin_turn(message);

        let query = EntityQuery::build(message);
        let context = match self.context.fetch(&query).await {
            Ok(context) => context,
            Err(e) if self.settings.strict_graph => {
                session.abandon_turn();
                return Err(e);
            }
            Err(e) => {
                warn!("Answering without graph context: {e}");
                ContextBlob::empty()
            }
        };

        let prompt = prompt::compose(session.recent_turns(self.settings.history_turns), &context);
        debug!(
            "Prompt of {} bytes for {} turns",
            prompt.len(),
            session.turns().len()
        );

        let text = match self
            .llm
            .generate(&self.model, &prompt, Some(self.settings.temperature))
            .await
        {
            Ok(reply) => reply.trim().to_string(),
            Err(e) => {
                warn!("Language model call failed: {e}");
                format!("Error querying language model: {e}")
            }
        };

        let diagnosis_newly_suggested = session.attach_reply(&text);
        if diagnosis_newly_suggested {
            info!("Diagnosis suggested after {} turns", session.turns().len());
        }
        Ok(Reply {
            text,
            diagnosis_newly_suggested,
        })
    }

    /// Answers `message` following the caller-supplied `history`.
    pub async fn respond(
        &self,
        history: Vec<Turn>,
        message: &str,
    ) -> Result<(Reply, Session), Error> {
        let mut session = Session::from_history(history);
        let reply = self.turn(&mut session, message).await?;
        Ok((reply, session))
    }
}
