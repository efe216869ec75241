use crate::traits::TextCompletion;
use crate::types::{PosterError, Result, SynthesizedContent, MAX_CAPTION_CHARS};
use html2text::render::text_renderer::TrivialDecorator;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, warn};

const SYSTEM_PROMPT: &str = "You are a helpful assistant that writes social media content. \
Always answer with a single JSON object and nothing else.";

/// Article bodies beyond this many characters are cut before prompting.
const MAX_BODY_CHARS: usize = 8000;

/// Wide enough that rendering never wraps mid-sentence.
const HTML_RENDER_WIDTH: usize = 10_000;

/// Shape the model is asked to return. Anything else is rejected.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSynthesis {
    caption: String,
    script: String,
}

/// Turns an article into a caption and a narration script.
pub struct ContentSynthesizer {
    completion: Arc<dyn TextCompletion>,
}

impl ContentSynthesizer {
    pub fn new(completion: Arc<dyn TextCompletion>) -> Self {
        Self { completion }
    }

    pub async fn synthesize(&self, title: &str, body: &str) -> Option<SynthesizedContent> {
        let prompt = build_prompt(title, body);

        let response = match self.completion.complete(SYSTEM_PROMPT, &prompt).await {
            Ok(response) => response,
            Err(e) => {
                error!("Error generating caption for {:?}: {}", title, e);
                return None;
            }
        };

        match parse_synthesis(&response) {
            Ok(content) => {
                debug!("Generated caption of {} characters", content.caption.chars().count());
                Some(content)
            }
            Err(e) => {
                error!("Rejected model output for {:?}: {}", title, e);
                None
            }
        }
    }
}

fn build_prompt(title: &str, body: &str) -> String {
    let text = truncate_chars(&extract_text_from_html(body), MAX_BODY_CHARS);

    format!(
        r#"Summarize the news article below into a catchy Instagram caption of at most {max} characters.
Also write a script containing only spoken text that a text-to-speech voice would take about 60-90 seconds to read.

Title:

{title}

Content:

{text}

Answer with exactly this JSON object and no other keys:
{{"caption": "<caption here>", "script": "<script here>"}}"#,
        max = MAX_CAPTION_CHARS,
        title = title,
        text = text,
    )
}

/// Parse model output as a JSON object holding exactly `caption` and `script`.
///
/// A Markdown code fence or prose around the object is tolerated. The text is
/// only ever deserialized as data.
pub fn parse_synthesis(output: &str) -> Result<SynthesizedContent> {
    let start = output
        .find('{')
        .ok_or_else(|| PosterError::Parse("no JSON object in model output".to_string()))?;
    let end = output
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| PosterError::Parse("unterminated JSON object in model output".to_string()))?;

    let raw: RawSynthesis = serde_json::from_str(&output[start..=end])
        .map_err(|e| PosterError::Parse(format!("unexpected model output: {}", e)))?;

    let caption = raw.caption.trim();
    let script = raw.script.trim();
    if caption.is_empty() || script.is_empty() {
        return Err(PosterError::Parse("empty caption or script".to_string()));
    }

    let caption = if caption.chars().count() > MAX_CAPTION_CHARS {
        warn!("Caption exceeds {} characters, truncating", MAX_CAPTION_CHARS);
        truncate_chars(caption, MAX_CAPTION_CHARS)
    } else {
        caption.to_string()
    };

    Ok(SynthesizedContent {
        caption,
        script: script.to_string(),
    })
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Render a feed description as plain text: markup dropped, entities
/// decoded, whitespace collapsed.
fn extract_text_from_html(html: &str) -> String {
    html2text::from_read_with_decorator(html.as_bytes(), HTML_RENDER_WIDTH, TrivialDecorator::new())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
