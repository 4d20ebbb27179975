use docqa_core::config::PromptSettings;
use docqa_core::text::{char_len, truncate_at_sentence};
use docqa_core::types::{ConversationTurn, RetrievalResult, Role};

/// Chunks this short, or ones that echo an earlier model response, are not
/// worth spending prompt budget on.
const MIN_PROMPT_DOC_CHARS: usize = 30;

const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Renders grounded prompts that restrict the model to the supplied chunks.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    settings: PromptSettings,
}

impl PromptBuilder {
    pub fn new(settings: PromptSettings) -> Self {
        Self { settings }
    }

    pub fn build(&self, question: &str, documents: &[RetrievalResult], history: &[ConversationTurn]) -> String {
        let usable: Vec<&str> = documents
            .iter()
            .map(|d| d.content.trim())
            .filter(|c| char_len(c) > MIN_PROMPT_DOC_CHARS && !c.to_lowercase().starts_with("response:"))
            .take(self.settings.max_context_docs)
            .collect();

        if usable.is_empty() {
            return format!(
                "Based on the available documents, I cannot find information to answer this question.\n\n\
                 QUESTION: {question}\n\n\
                 ANSWER: The information requested is not available in the provided documents."
            );
        }

        let context = usable
            .iter()
            .enumerate()
            .map(|(i, c)| format!("[Document Section {}]\n{c}", i + 1))
            .collect::<Vec<_>>()
            .join(SECTION_SEPARATOR);
        let context = truncate_at_sentence(&context, self.settings.context_budget);

        format!(
            "You are a helpful assistant that answers questions based ONLY on the provided documents.\n\
             If the answer is not in the documents, say so clearly.\n\n\
             DOCUMENTS:\n{context}\n\n\
             {history}QUESTION: {question}\n\n\
             INSTRUCTIONS:\n\
             - Answer using ONLY information from the documents above\n\
             - If the answer is not in the documents, respond: \"The information is not available in the provided documents.\"\n\
             - Do not repeat information multiple times\n\
             - Be concise and accurate\n\
             - Base your answer strictly on what is written in the documents\n\n\
             ANSWER:",
            history = self.render_history(history),
        )
    }

    /// The most recent `max_history_turns` turns, oldest first. Empty when
    /// there is no history.
    fn render_history(&self, history: &[ConversationTurn]) -> String {
        let skip = history.len().saturating_sub(self.settings.max_history_turns);
        let lines: Vec<String> = history[skip..]
            .iter()
            .filter(|t| !t.content.trim().is_empty())
            .map(|t| {
                let who = match t.role {
                    Role::User => "User",
                    Role::Assistant => "Assistant",
                };
                format!("{who}: {}", t.content.trim())
            })
            .collect();
        if lines.is_empty() {
            return String::new();
        }
        format!("CONVERSATION HISTORY:\n{}\n\n", lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::types::ChunkMetadata;

    fn doc(content: &str) -> RetrievalResult {
        let metadata = ChunkMetadata {
            source: "notes.md".into(),
            source_path: "/notes.md".into(),
            document_type: ".md".into(),
            chunk_index: 0,
            chunk_size: content.len(),
        };
        RetrievalResult::new(content.to_string(), metadata, 0.5)
    }

    #[test]
    fn numbers_sections_and_keeps_top_three() {
        let docs: Vec<_> = (1..=5).map(|i| doc(&format!("Passage {i} describes how to store potatoes in a cellar."))).collect();
        let prompt = PromptBuilder::default().build("How to store potatoes?", &docs, &[]);

        assert!(prompt.contains("[Document Section 1]\nPassage 1"));
        assert!(prompt.contains("[Document Section 3]\nPassage 3"));
        assert!(!prompt.contains("Passage 4"));
        assert!(prompt.contains("QUESTION: How to store potatoes?"));
        assert!(prompt.ends_with("ANSWER:"));
        assert!(!prompt.contains("CONVERSATION HISTORY"));
    }

    #[test]
    fn skips_short_and_echoed_chunks() {
        let docs = vec![
            doc("short one"),
            doc("Response: the model said something earlier here."),
            doc("Goats need a dry shelter and fresh water every day."),
        ];
        let prompt = PromptBuilder::default().build("Goats?", &docs, &[]);
        assert!(prompt.contains("[Document Section 1]\nGoats need"));
        assert!(!prompt.contains("model said"));
    }

    #[test]
    fn no_usable_documents_yields_not_available_prompt() {
        let prompt = PromptBuilder::default().build("Anything?", &[doc("tiny")], &[]);
        assert!(prompt.starts_with("Based on the available documents"));
        assert!(prompt.contains("QUESTION: Anything?"));
    }

    #[test]
    fn context_is_held_to_budget() {
        let long = "Seed saving keeps heirloom varieties alive. ".repeat(30);
        let settings = PromptSettings { context_budget: 300, ..PromptSettings::default() };
        let prompt = PromptBuilder::new(settings).build("Seeds?", &[doc(&long)], &[]);

        let start = prompt.find("DOCUMENTS:\n").unwrap() + "DOCUMENTS:\n".len();
        let end = prompt.find("\n\nQUESTION:").unwrap();
        let context = &prompt[start..end];
        assert!(context.chars().count() <= 300);
        assert!(context.ends_with("alive."));
    }

    #[test]
    fn renders_recent_history_only() {
        let settings = PromptSettings { max_history_turns: 2, ..PromptSettings::default() };
        let history = vec![
            ConversationTurn::user("first question"),
            ConversationTurn::assistant("first answer"),
            ConversationTurn::user("What about ducks?"),
            ConversationTurn::assistant("Ducks like ponds."),
        ];
        let docs = [doc("Ducks need water deep enough to dunk their heads.")];
        let prompt = PromptBuilder::new(settings).build("And geese?", &docs, &history);

        assert!(prompt.contains("CONVERSATION HISTORY:\nUser: What about ducks?\nAssistant: Ducks like ponds.\n\nQUESTION: And geese?"));
        assert!(!prompt.contains("first question"));
    }
}
