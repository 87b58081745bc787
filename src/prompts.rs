//! Prompts for turning extracted document text into a slide deck.
//!
//! Every prompt lives here so a wording change touches one file and unit
//! tests can inspect prompts without calling a model.
//!
//! Callers can override the system prompt via
//! [`crate::config::SummaryConfig::system_prompt`]; the user prompt is always
//! built by [`build_summary_prompt`] because the response parser depends on
//! the JSON shape it requests.

/// Default system prompt for the summarization call.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert analyst who turns long documents into clear, well-structured presentation slides.

Follow these rules precisely:

1. CONTENT
   - Capture the key insights, findings and conclusions of the document
   - Stay faithful to the source; never invent facts, numbers or quotes
   - Each slide covers one coherent topic

2. FORMATTING
   - Write every slide in Markdown
   - Start each slide with a # heading naming its topic
   - Use bullet points, **bold** key terms and short paragraphs

3. OUTPUT FORMAT
   - Respond with a single JSON object and nothing else
   - Do NOT wrap the JSON in code fences
   - Do NOT add commentary before or after the JSON"#;

/// Build the user prompt for one document.
///
/// The model is asked for `{"title": string, "slides": [string, ...]}` with
/// between `min_slides` and `max_slides` slides of 150-200 words each.
pub fn build_summary_prompt(
    text: &str,
    file_name: &str,
    min_slides: usize,
    max_slides: usize,
) -> String {
    format!(
        r##"Analyze the following document and create a comprehensive summary presentation.

Document: "{file_name}"

Requirements:
1. Generate a clear, descriptive title for the document.
2. Create {min_slides}-{max_slides} slides that cover the main topics.
3. Each slide should contain 150-200 words of content.
4. Use markdown formatting: headings, bullet points and bold text.
5. Focus on the key insights, findings and conclusions.

Respond with JSON in exactly this format:
{{
  "title": "Document title here",
  "slides": [
    "# Slide 1 heading\n\nSlide 1 content in markdown...",
    "# Slide 2 heading\n\nSlide 2 content in markdown..."
  ]
}}

Document content:
{text}"##
    )
}
