//! Prompt template and fixed user-facing strings.
//!
//! Everything a user or the remote model reads verbatim lives here, so the
//! wording can be changed in one place and inspected by tests without a live
//! service.

/// Instruction template for the answering agent.
///
/// `{question}` and `{context}` are substituted verbatim by [`answer_prompt`].
/// The language rules make the model answer in the question's language
/// whatever language the documents are written in.
pub const ANSWER_PROMPT_TEMPLATE: &str = r#"You are a product expert tasked with answering a question based on **Markdown content extracted from PDF files**.

CRITICAL LANGUAGE RULES:
1. FIRST, detect the language of the user's question
2. You MUST answer EXCLUSIVELY in that detected language, regardless of the PDF content's language
3. If the PDF content is in a different language than the question:
   - Translate ALL relevant information to the question's language
   - Maintain the original meaning and context
   - Make the translation sound natural in the target language
4. NEVER mix languages in your response
5. NEVER let the PDF content's language influence your response language
6. Your response must be 100% in the question's language

---

**User Question:** "{question}"

---

**PDF Content (Markdown):**

{context}"#;

/// Message stored on an entry whose conversion failed.
pub const CONVERSION_FAILED_MESSAGE: &str =
    "Conversion failed: the document could not be processed.";

/// Message that replaces the answer when streaming fails.
pub const ANSWER_FAILED_MESSAGE: &str =
    "An error occurred while generating the answer. Please try again.";

/// Build the system message sent with a question.
///
/// Substitution is single-pass, so braces inside the question are never
/// mistaken for the `{context}` placeholder.
pub fn answer_prompt(context: &str, question: &str) -> String {
    let (head, tail) = ANSWER_PROMPT_TEMPLATE
        .split_once("{question}")
        .unwrap_or((ANSWER_PROMPT_TEMPLATE, ""));
    let tail = tail.replacen("{context}", context, 1);
    let mut prompt = String::with_capacity(head.len() + question.len() + tail.len());
    prompt.push_str(head);
    prompt.push_str(question);
    prompt.push_str(&tail);
    prompt
}

/// Header placed before each OCR page (1-indexed).
pub fn page_header(page_num: usize) -> String {
    format!("=== Page n°{page_num} ===")
}

/// Header placed before each document in the aggregated context.
pub fn document_header(name: &str) -> String {
    format!("=== Document: {name} ===")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_question_and_context_verbatim() {
        let prompt = answer_prompt("# Manual\nPress the red button.", "Comment l'allumer ?");
        assert!(prompt.contains("**User Question:** \"Comment l'allumer ?\""));
        assert!(prompt.ends_with("# Manual\nPress the red button."));
        assert!(prompt.contains("detect the language of the user's question"));
    }

    #[test]
    fn placeholder_in_question_is_not_expanded() {
        let prompt = answer_prompt("CTX", "what is {context}?");
        assert!(prompt.contains("\"what is {context}?\""));
        assert_eq!(prompt.matches("CTX").count(), 1);
    }

    #[test]
    fn headers_are_one_indexed_labels() {
        assert_eq!(page_header(1), "=== Page n°1 ===");
        assert_eq!(document_header("a.pdf"), "=== Document: a.pdf ===");
    }
}
