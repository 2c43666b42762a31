use std::future::Future;
use std::sync::Arc;

use tracing::instrument;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        helpers::image_url::extract_image_url,
        ports::ai_provider::{AiProviderPort, CompletionRequest},
        use_cases::{
            billing::SubscriptionRepoTrait,
            quota::{QuotaGate, QuotaIdentity},
        },
    },
    domain::entities::mind_map::{AspectRatio, Language, Style},
};

pub const MAX_INPUT_CHARS: usize = 10_000;

const STRUCTURE_TEMPERATURE: f32 = 0.7;
const STRUCTURE_MAX_TOKENS: u32 = 2000;

#[derive(Debug, Clone)]
pub struct GenerationModels {
    pub structure_model: String,
    pub image_model: String,
}

#[derive(Debug, Clone)]
pub struct StructureOutput {
    pub structure: String,
    pub usage: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct ImageOutput {
    pub image_url: String,
}

/// Whether a guarded operation counts as a consumed mind map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Metering {
    CheckOnly,
    CheckAndRecord,
}

#[derive(Clone)]
pub struct GenerationUseCases {
    ai: Arc<dyn AiProviderPort>,
    quota: Arc<QuotaGate>,
    subscriptions: Arc<dyn SubscriptionRepoTrait>,
    models: GenerationModels,
}

impl GenerationUseCases {
    pub fn new(
        ai: Arc<dyn AiProviderPort>,
        quota: Arc<QuotaGate>,
        subscriptions: Arc<dyn SubscriptionRepoTrait>,
        models: GenerationModels,
    ) -> Self {
        Self {
            ai,
            quota,
            subscriptions,
            models,
        }
    }

    /// Turn free text into a Markdown mind-map outline.
    ///
    /// Checked against the daily quota but not counted: a mind map is counted
    /// once its image has been rendered.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn generate_structure(
        &self,
        identity: &QuotaIdentity,
        text: &str,
        language: Language,
    ) -> AppResult<StructureOutput> {
        let text = validate_input("text", text)?;

        let request = CompletionRequest {
            model: self.models.structure_model.clone(),
            prompt: structure_prompt(text, language),
            temperature: Some(STRUCTURE_TEMPERATURE),
            max_tokens: Some(STRUCTURE_MAX_TOKENS),
            ratio: None,
        };

        self.guarded(identity, Metering::CheckOnly, || async {
            let completion = self.ai.complete(request).await?;
            Ok(StructureOutput {
                structure: completion.content,
                usage: completion.usage,
            })
        })
        .await
    }

    /// Render a mind-map outline as an illustrated image.
    #[instrument(skip(self, structure), fields(structure_len = structure.len()))]
    pub async fn generate_image(
        &self,
        identity: &QuotaIdentity,
        structure: &str,
        style: Style,
        ratio: AspectRatio,
        language: Language,
    ) -> AppResult<ImageOutput> {
        let structure = validate_input("structure", structure)?;

        let request = CompletionRequest {
            model: self.models.image_model.clone(),
            prompt: image_prompt(structure, style, ratio, language),
            temperature: None,
            max_tokens: None,
            ratio: Some(ratio.as_str().to_string()),
        };

        self.guarded(identity, Metering::CheckAndRecord, || async {
            let completion = self.ai.complete(request).await?;
            let image_url = extract_image_url(&completion.content).ok_or_else(|| {
                tracing::error!(content = %completion.content, "No image URL in model reply");
                AppError::Provider("Generated image URL not found".into())
            })?;
            Ok(ImageOutput { image_url })
        })
        .await
    }

    /// check -> operation -> record (on success only).
    async fn guarded<T, F, Fut>(
        &self,
        identity: &QuotaIdentity,
        metering: Metering,
        operation: F,
    ) -> AppResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let metered = !self.has_pro(identity).await;

        if metered && !self.quota.may_proceed(identity).await {
            return Err(AppError::DailyLimitReached);
        }

        let output = operation().await?;

        if metered && metering == Metering::CheckAndRecord {
            self.quota.record_usage(identity).await;
        }
        Ok(output)
    }

    async fn has_pro(&self, identity: &QuotaIdentity) -> bool {
        let Some(user_id) = identity.user_id else {
            return false;
        };
        match self.subscriptions.get_effective_for_user(user_id).await {
            Ok(sub) => sub.is_some_and(|s| s.grants_pro()),
            Err(e) => {
                tracing::warn!(error = %e, %user_id, "Subscription lookup failed, metering as free");
                false
            }
        }
    }
}

fn validate_input<'a>(field: &str, value: &'a str) -> AppResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(format!("{field} is required")));
    }
    if trimmed.chars().count() > MAX_INPUT_CHARS {
        return Err(AppError::InvalidInput(format!(
            "{field} must be at most {MAX_INPUT_CHARS} characters"
        )));
    }
    Ok(trimmed)
}

fn structure_prompt(text: &str, language: Language) -> String {
    format!(
        "Based on the following text, create a structured mind map outline in Markdown format. \
The mind map should be hierarchical, well-organized, and capture the key concepts and relationships.

Text to analyze: \"{text}\"

Requirements:
- Use Markdown format with # for main topic, ## for primary branches, ### for sub-branches
- Create 3-6 main branches maximum
- Each branch should have 2-4 sub-branches
- Keep text concise and clear
- Focus on key concepts, relationships, and actionable items
- Language: {language}
- Structure should be logical and easy to understand

Please generate the mind map structure:",
        language = language.as_str()
    )
}

fn image_prompt(structure: &str, style: Style, ratio: AspectRatio, language: Language) -> String {
    format!(
        "Create a {description} based on this mind map structure:

{structure}

Style requirements:
- {description}
- Clear hierarchy and visual connections between concepts
- Easy to read text labels
- Engaging visual elements appropriate to the {style} style
- Aspect ratio: {ratio}
- Language: {language}
- Include appropriate icons or illustrations for each concept
- Make sure the mind map layout fits well within the {ratio} aspect ratio
- Central topic should be prominently displayed
- Use connecting lines or branches to show relationships
- Color-coded sections for better organization
",
        description = style.description(),
        style = style.as_str(),
        ratio = ratio.as_str(),
        language = language.as_str()
    )
}
