use anyhow::{anyhow, bail, Context, Result};
use schemars::JsonSchema;
use serde::Deserialize;

use ai_client::{extract_json_object, truncate_chars, Message};
use trendwire_common::SafetyLevel;

use super::signals::MetadataSignals;

/// Body text beyond this many characters is not shown to the model.
pub const BODY_PROMPT_CHARS: usize = 300;

const SYSTEM_PROMPT: &str = "You are a brand-safety analyst for a PR agency. \
You judge whether trending online content is safe for brands to associate with. \
Be conservative with anything political, violent, sexual, or likely to spark backlash. \
Respond only with a single JSON object and no surrounding prose.";

/// Reply expected from the classification prompt.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct ClassificationReply {
    /// One of safe, caution, political, violent, controversial, nsfw, blocked.
    pub safety_level: SafetyLevel,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub primary_category: String,
    #[serde(default)]
    pub secondary_categories: Vec<String>,
    pub reasoning: String,
}

pub fn build_messages(title: &str, body: &str, signals: &MetadataSignals) -> Vec<Message> {
    let schema = serde_json::to_string_pretty(&schemars::schema_for!(ClassificationReply))
        .unwrap_or_default();
    let signals_json = serde_json::to_string(signals).unwrap_or_else(|_| "{}".to_string());
    let channel = signals.channel.as_deref().unwrap_or("unknown");

    let user = format!(
        "Classify this trending content for brand safety.\n\n\
         Title: {title}\n\
         Content: {body}\n\
         Channel: {channel}\n\
         Metadata signals: {signals_json}\n\n\
         Levels:\n\
         - safe: suitable for any brand\n\
         - caution: generally fine but needs a human look\n\
         - political: partisan or election content\n\
         - violent: violence, death, disasters\n\
         - controversial: divisive topics likely to cause backlash\n\
         - nsfw: sexual or explicit content\n\
         - blocked: never touch\n\n\
         Answer with JSON matching this schema:\n{schema}",
        body = truncate_chars(body, BODY_PROMPT_CHARS),
    );

    vec![Message::system(SYSTEM_PROMPT), Message::user(user)]
}

/// Decode a model reply. Code fences and surrounding prose are tolerated;
/// anything that does not match the schema is an error.
pub fn parse_reply(raw: &str) -> Result<ClassificationReply> {
    let json = extract_json_object(raw).ok_or_else(|| anyhow!("no JSON object in reply"))?;
    let mut reply: ClassificationReply =
        serde_json::from_str(json).context("reply does not match classification schema")?;
    if !reply.confidence.is_finite() {
        bail!("confidence is not a finite number");
    }
    reply.confidence = reply.confidence.clamp(0.0, 1.0);
    Ok(reply)
}
