//! Campaign ideas for selected trends.
//!
//! The AI is asked for three ideas (reactive, data-driven, creative). Each
//! returned entry is validated on its own and dropped if incomplete. When
//! the AI is unavailable or nothing valid comes back, three template ideas
//! are used instead.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ai_client::{extract_json_object, truncate_chars, GenerationRequest, Message, ProviderGateway};
use trendwire_common::{CampaignIdea, CanonicalTrend};

pub const IDEA_MAX_TOKENS: u32 = 2000;
pub const IDEA_TEMPERATURE: f32 = 0.8;

pub const AI_GENERATED: &str = "ai-generated";
pub const TEMPLATE_BASED: &str = "template-based";

const SYSTEM_PROMPT: &str = "You are an expert PR strategist and campaign ideation specialist. \
Generate creative, actionable PR campaign ideas based on trending topics. \
Focus on campaigns that can be executed within 1-7 days and have strong media potential. \
Respond only with a single JSON object and no surrounding prose.";

fn default_score() -> f64 {
    0.5
}

fn default_brand_safety() -> f64 {
    0.8
}

/// One campaign entry as the model returns it.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct IdeaDraft {
    pub title: String,
    /// Media-ready headline.
    pub headline: String,
    pub description: String,
    /// Detailed execution brief.
    pub brief: String,
    /// reactive, data-driven or creative.
    #[serde(rename = "type")]
    pub idea_type: String,
    pub target_audience: String,
    /// e.g. "1-2 days".
    pub timeline: String,
    /// easy, medium or hard.
    pub difficulty: String,
    /// 0.0 to 1.0
    #[serde(default = "default_score")]
    pub potential_score: f64,
    /// 0.0 to 1.0
    #[serde(default = "default_score")]
    pub virality_score: f64,
    /// 0.0 to 1.0
    #[serde(default = "default_brand_safety")]
    pub brand_safety_score: f64,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub key_messages: Vec<String>,
    #[serde(default)]
    pub media_hooks: Vec<String>,
    #[serde(default)]
    pub execution_steps: Vec<String>,
}

/// Shape of the whole reply; only used to render the schema in the prompt.
#[allow(dead_code)]
#[derive(JsonSchema)]
struct IdeaReply {
    campaigns: Vec<IdeaDraft>,
}

impl IdeaDraft {
    fn is_complete(&self) -> bool {
        [
            &self.title,
            &self.headline,
            &self.description,
            &self.brief,
            &self.idea_type,
            &self.target_audience,
            &self.timeline,
            &self.difficulty,
        ]
        .iter()
        .all(|s| !s.trim().is_empty())
    }

    fn into_idea(self, trend_id: Uuid, model: &str, now: DateTime<Utc>) -> CampaignIdea {
        CampaignIdea {
            id: Uuid::new_v4(),
            trend_id,
            title: self.title,
            headline: self.headline,
            description: self.description,
            brief: self.brief,
            idea_type: self.idea_type,
            target_audience: self.target_audience,
            timeline: self.timeline,
            difficulty: self.difficulty,
            potential_score: unit(self.potential_score, default_score()),
            virality_score: unit(self.virality_score, default_score()),
            brand_safety_score: unit(self.brand_safety_score, default_brand_safety()),
            channels: self.channels,
            key_messages: self.key_messages,
            media_hooks: self.media_hooks,
            execution_steps: self.execution_steps,
            generation_model: model.to_string(),
            created_at: now,
        }
    }
}

fn unit(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

pub struct CampaignIdeaGenerator<'a> {
    gateway: &'a ProviderGateway,
    max_ideas: usize,
}

impl<'a> CampaignIdeaGenerator<'a> {
    pub fn new(gateway: &'a ProviderGateway, max_ideas: usize) -> Self {
        Self { gateway, max_ideas }
    }

    /// Ideas for one trend. Never fails: AI trouble means template ideas.
    pub async fn generate(&self, trend: &CanonicalTrend, now: DateTime<Utc>) -> Vec<CampaignIdea> {
        let (drafts, model) = match self.ai_drafts(trend).await {
            Ok(drafts) if !drafts.is_empty() => (drafts, AI_GENERATED),
            Ok(_) => {
                warn!(trend_id = %trend.id, "AI returned no usable campaign ideas, using templates");
                (template_drafts(&trend.title), TEMPLATE_BASED)
            }
            Err(e) => {
                warn!(trend_id = %trend.id, error = %e, "AI campaign generation failed, using templates");
                (template_drafts(&trend.title), TEMPLATE_BASED)
            }
        };

        let ideas: Vec<CampaignIdea> = drafts
            .into_iter()
            .take(self.max_ideas)
            .map(|d| d.into_idea(trend.id, model, now))
            .collect();
        info!(
            trend_id = %trend.id,
            title = truncate_chars(&trend.title, 50),
            count = ideas.len(),
            model,
            "Campaign ideas generated"
        );
        ideas
    }

    async fn ai_drafts(&self, trend: &CanonicalTrend) -> Result<Vec<IdeaDraft>> {
        let request = GenerationRequest::new(build_messages(trend))
            .max_tokens(IDEA_MAX_TOKENS)
            .temperature(IDEA_TEMPERATURE);
        let raw = self.gateway.generate_with_fallback(&request).await?;
        parse_drafts(&raw)
    }
}

pub fn build_messages(trend: &CanonicalTrend) -> Vec<Message> {
    let schema = serde_json::to_string_pretty(&schemars::schema_for!(IdeaReply)).unwrap_or_default();
    let join = |set: &std::collections::BTreeSet<String>| {
        if set.is_empty() {
            "None".to_string()
        } else {
            set.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    };
    let description = if trend.description.trim().is_empty() {
        "No description available"
    } else {
        trend.description.as_str()
    };

    let user = format!(
        "Generate 3 diverse PR campaign ideas for this trending topic.\n\n\
         Title: {title}\n\
         Description: {description}\n\
         Category: {category}\n\
         Platforms: {platforms}\n\
         Current score: {score:.2}\n\
         Keywords: {keywords}\n\n\
         Provide exactly one of each:\n\
         1. A reactive/newsjacking campaign (quick response, 1-2 days)\n\
         2. A data-driven thought leadership campaign (2-3 days)\n\
         3. A creative/viral angle campaign (3-5 days)\n\n\
         Answer with JSON matching this schema:\n{schema}",
        title = trend.title,
        category = trend.category.as_deref().unwrap_or("general"),
        platforms = join(&trend.platforms),
        score = trend.score,
        keywords = join(&trend.keywords),
    );

    vec![Message::system(SYSTEM_PROMPT), Message::user(user)]
}

/// Decode `{"campaigns": [...]}`, keeping each entry that is complete.
pub fn parse_drafts(raw: &str) -> Result<Vec<IdeaDraft>> {
    let json = extract_json_object(raw).ok_or_else(|| anyhow!("no JSON object in reply"))?;
    let value: Value = serde_json::from_str(json).context("campaign reply is not valid JSON")?;
    let entries = value
        .get("campaigns")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("campaign reply has no campaigns array"))?;

    let drafts = entries
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| match IdeaDraft::deserialize(entry) {
            Ok(draft) if draft.is_complete() => Some(draft),
            Ok(_) => {
                debug!(index = i, "Dropping campaign idea with empty required fields");
                None
            }
            Err(e) => {
                debug!(index = i, error = %e, "Dropping malformed campaign idea");
                None
            }
        })
        .collect();
    Ok(drafts)
}

/// The three fixed ideas used when the AI cannot help.
pub fn template_drafts(title: &str) -> Vec<IdeaDraft> {
    let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    vec![
        IdeaDraft {
            title: format!("Breaking: {title} - Industry Response"),
            headline: format!("How {title} is Reshaping the Conversation"),
            description: format!(
                "Immediate response to trending topic '{title}' with industry perspective"
            ),
            brief: format!(
                "Quick-turnaround reactive campaign positioning your brand as a thought leader \
                 responding to {title}. Focus on timely, relevant commentary that adds value to \
                 the trending conversation."
            ),
            idea_type: "reactive".to_string(),
            target_audience: "Industry professionals and media".to_string(),
            timeline: "1-2 days".to_string(),
            difficulty: "easy".to_string(),
            potential_score: 0.7,
            virality_score: 0.8,
            brand_safety_score: 0.8,
            channels: strings(&["social-media", "press-release", "blog"]),
            key_messages: vec![
                format!("Expert perspective on {title}"),
                "Timely industry insight".to_string(),
                "Thought leadership positioning".to_string(),
            ],
            media_hooks: vec![
                format!("Industry expert responds to {title}"),
                "Real-time analysis and commentary".to_string(),
                "Expert predictions and implications".to_string(),
            ],
            execution_steps: strings(&[
                "Monitor trend development",
                "Craft expert commentary",
                "Distribute across channels",
            ]),
        },
        IdeaDraft {
            title: format!("Data Deep-Dive: {title} Impact Analysis"),
            headline: format!("The Numbers Behind {title}: What the Data Reveals"),
            description: format!("Data-driven analysis of {title} trends and implications"),
            brief: format!(
                "Create compelling data story around {title} using research, surveys, or \
                 analysis. Aim for thought leadership and media interest through exclusive \
                 insights."
            ),
            idea_type: "data-driven".to_string(),
            target_audience: "Business leaders and media".to_string(),
            timeline: "2-3 days".to_string(),
            difficulty: "medium".to_string(),
            potential_score: 0.8,
            virality_score: 0.6,
            brand_safety_score: 0.9,
            channels: strings(&["press-release", "reports", "social-media"]),
            key_messages: vec![
                format!("Exclusive data on {title}"),
                "Research-backed insights".to_string(),
                "Industry implications".to_string(),
            ],
            media_hooks: vec![
                format!("First comprehensive analysis of {title}"),
                "Exclusive survey results".to_string(),
                "Data-driven predictions".to_string(),
            ],
            execution_steps: strings(&[
                "Gather relevant data or conduct research",
                "Create compelling visualizations",
                "Package for media distribution",
            ]),
        },
        IdeaDraft {
            title: format!("Creative Spin: {title} Reimagined"),
            headline: format!("What {title} Teaches Us About [Your Industry]"),
            description: format!(
                "Creative angle connecting {title} to broader industry themes"
            ),
            brief: format!(
                "Develop a unique, creative angle that connects {title} to your industry or \
                 expertise in an unexpected way. Focus on viral potential and memorable messaging."
            ),
            idea_type: "creative".to_string(),
            target_audience: "Broad audience and social media".to_string(),
            timeline: "3-5 days".to_string(),
            difficulty: "hard".to_string(),
            potential_score: 0.6,
            virality_score: 0.9,
            brand_safety_score: 0.7,
            channels: strings(&["social-media", "video", "interactive-content"]),
            key_messages: vec![
                format!("Unique perspective on {title}"),
                "Creative industry connection".to_string(),
                "Memorable brand moment".to_string(),
            ],
            media_hooks: vec![
                format!("Unexpected angle on {title}"),
                "Creative campaign launch".to_string(),
                "Viral content potential".to_string(),
            ],
            execution_steps: strings(&[
                "Develop creative concept",
                "Create engaging content",
                "Launch viral campaign",
            ]),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::trend_titled;
    use ai_client::testing::ScriptedProvider;
    use ai_client::ModelNaming;
    use serde_json::json;

    fn gateway(provider: ScriptedProvider) -> ProviderGateway {
        ProviderGateway::new("openrouter", "anthropic/claude-3.5-sonnet", "openai/gpt-4")
            .register(provider)
    }

    fn entry(title: &str) -> Value {
        json!({
            "title": title,
            "headline": "A headline",
            "description": "A description",
            "brief": "A brief",
            "type": "reactive",
            "target_audience": "Parents",
            "timeline": "1-2 days",
            "difficulty": "easy",
            "potential_score": 0.9,
            "channels": ["social-media"],
        })
    }

    #[test]
    fn invalid_entries_are_dropped_individually() {
        let mut missing_brief = entry("No brief");
        missing_brief.as_object_mut().unwrap().remove("brief");
        let blank_title = entry("  ");
        let raw = json!({"campaigns": [entry("Good one"), missing_brief, blank_title, "nope"]}).to_string();

        let drafts = parse_drafts(&format!("Here you go:\n```json\n{raw}\n```")).unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].title, "Good one");
        assert_eq!(drafts[0].virality_score, 0.5);
        assert_eq!(drafts[0].brand_safety_score, 0.8);
    }

    #[test]
    fn missing_campaigns_array_is_an_error() {
        assert!(parse_drafts(r#"{"ideas": []}"#).is_err());
        assert!(parse_drafts("no json here").is_err());
    }

    #[tokio::test]
    async fn ai_ideas_are_tagged_and_capped() {
        let reply = json!({"campaigns": [entry("One"), entry("Two"), entry("Three")]}).to_string();
        let provider = ScriptedProvider::replying("openrouter", ModelNaming::VendorPrefixed, &reply);
        let gw = gateway(provider.clone());
        let trend = trend_titled("City announces new park", 0.8);

        let ideas = CampaignIdeaGenerator::new(&gw, 2).generate(&trend, Utc::now()).await;
        assert_eq!(ideas.len(), 2);
        assert!(ideas.iter().all(|i| i.generation_model == AI_GENERATED));
        assert!(ideas.iter().all(|i| i.trend_id == trend.id));
        assert_eq!(ideas[0].potential_score, 0.9);
        assert_eq!(provider.calls(), 1);

        let prompt = &provider.prompts()[0];
        assert!(prompt[1].content.contains("City announces new park"));
        assert!(prompt[1].content.contains("campaigns"));
    }

    #[tokio::test]
    async fn provider_failure_uses_templates() {
        let gw = gateway(ScriptedProvider::failing("openrouter", ModelNaming::VendorPrefixed));
        let trend = trend_titled("Harvest moon", 0.5);

        let ideas = CampaignIdeaGenerator::new(&gw, 5).generate(&trend, Utc::now()).await;
        assert_eq!(ideas.len(), 3);
        assert!(ideas.iter().all(|i| i.generation_model == TEMPLATE_BASED));
        assert_eq!(ideas[0].title, "Breaking: Harvest moon - Industry Response");
        assert_eq!(ideas[1].idea_type, "data-driven");
        assert_eq!(ideas[2].virality_score, 0.9);
    }

    #[tokio::test]
    async fn empty_campaign_list_uses_templates() {
        let gw = gateway(ScriptedProvider::replying(
            "openrouter",
            ModelNaming::VendorPrefixed,
            r#"{"campaigns": []}"#,
        ));
        let ideas = CampaignIdeaGenerator::new(&gw, 5)
            .generate(&trend_titled("Harvest moon", 0.5), Utc::now())
            .await;
        assert_eq!(ideas.len(), 3);
        assert_eq!(ideas[0].generation_model, TEMPLATE_BASED);
    }

    #[tokio::test]
    async fn no_providers_uses_templates() {
        let gw = ProviderGateway::new("openrouter", "m", "b");
        let ideas = CampaignIdeaGenerator::new(&gw, 5)
            .generate(&trend_titled("Harvest moon", 0.5), Utc::now())
            .await;
        assert_eq!(ideas.len(), 3);
    }

    #[test]
    fn templates_are_complete() {
        assert!(template_drafts("X").iter().all(IdeaDraft::is_complete));
    }
}
