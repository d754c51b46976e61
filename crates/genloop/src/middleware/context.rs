use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::{ModelMiddleware, Next, RunContext};
use crate::errors::{GenerateError, GenerateResult};
use crate::models::document::Document;
use crate::models::part::Part;
use crate::models::request::ModelRequest;
use crate::models::response::ModelResponse;
use crate::models::role::Role;
use crate::prompt_template::load_prompt_file;

#[derive(Serialize)]
struct ContextItem {
    key: String,
    text: String,
}

/// Renders the request's documents into the last user message, for models that do not
/// take documents natively
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextAugmenter;

pub fn augment_with_context() -> Arc<dyn ModelMiddleware> {
    Arc::new(ContextAugmenter)
}

fn render_context(docs: &[Document]) -> GenerateResult<String> {
    let items: Vec<ContextItem> = docs
        .iter()
        .enumerate()
        .map(|(i, doc)| ContextItem {
            key: doc.citation_key().unwrap_or_else(|| i.to_string()),
            text: doc.text(),
        })
        .collect();
    load_prompt_file("context.md", &json!({ "docs": items }))
        .map_err(|e| GenerateError::Configuration(format!("failed to render context: {e}")))
}

#[async_trait]
impl ModelMiddleware for ContextAugmenter {
    async fn handle(
        &self,
        mut request: ModelRequest,
        ctx: RunContext,
        next: Next<'_>,
    ) -> GenerateResult<ModelResponse> {
        if request.docs.is_empty() {
            return next.run(request, ctx).await;
        }
        let Some(target) = request.messages.iter().rposition(|m| m.role == Role::User) else {
            return next.run(request, ctx).await;
        };

        let existing = request.messages[target]
            .content
            .iter()
            .position(|p| p.purpose() == Some("context"));
        if let Some(i) = existing {
            if !request.messages[target].content[i].is_pending() {
                return next.run(request, ctx).await;
            }
        }

        let part =
            Part::text(render_context(&request.docs)?).with_metadata("purpose", json!("context"));
        debug!(docs = request.docs.len(), "injecting context into user message");

        let content = &mut request.messages[target].content;
        match existing {
            Some(i) => content[i] = part,
            None => content.push(part),
        }
        next.run(request, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Message;
    use crate::providers::mock::MockProvider;
    use anyhow::Result;

    fn middleware() -> Vec<Arc<dyn ModelMiddleware>> {
        vec![augment_with_context()]
    }

    async fn run(request: ModelRequest) -> Result<ModelRequest> {
        let model = MockProvider::new(vec![Message::model().with_text("ok")]);
        Next::new(&middleware(), &model)
            .run(request, RunContext::default())
            .await?;
        Ok(model.requests().remove(0))
    }

    #[tokio::test]
    async fn test_appends_context_to_last_user_message() -> Result<()> {
        let request = ModelRequest {
            messages: vec![
                Message::user().with_text("first"),
                Message::model().with_text("reply"),
                Message::user().with_text("What is the capital?"),
            ],
            docs: vec![
                Document::from_text("Paris is the capital of France."),
                Document::from_text("Berlin is in Germany.").with_metadata("ref", json!("geo-2")),
            ],
            ..Default::default()
        };

        let seen = run(request).await?;
        assert_eq!(seen.messages[0].content.len(), 1);
        let last = &seen.messages[2];
        assert_eq!(last.content.len(), 2);
        assert_eq!(last.content[1].purpose(), Some("context"));
        assert_eq!(
            last.content[1].as_text().unwrap(),
            "\n\nUse the following information to complete your task:\n\n\
             - [0]: Paris is the capital of France.\n\
             - [geo-2]: Berlin is in Germany.\n\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_keeps_existing_context_part() -> Result<()> {
        let existing = Part::text("already here").with_metadata("purpose", json!("context"));
        let request = ModelRequest {
            messages: vec![Message::user().with_text("question").with_content(existing.clone())],
            docs: vec![Document::from_text("ignored")],
            ..Default::default()
        };

        let seen = run(request).await?;
        assert_eq!(seen.messages[0].content, vec![Part::text("question"), existing]);
        Ok(())
    }

    #[tokio::test]
    async fn test_replaces_pending_context_part() -> Result<()> {
        let pending = Part::text("placeholder")
            .with_metadata("purpose", json!("context"))
            .with_metadata("pending", json!(true));
        let request = ModelRequest {
            messages: vec![Message::user().with_content(pending).with_text("question")],
            docs: vec![Document::from_text("fact")],
            ..Default::default()
        };

        let seen = run(request).await?;
        let content = &seen.messages[0].content;
        assert_eq!(content.len(), 2);
        assert!(content[0].as_text().unwrap().contains("- [0]: fact"));
        assert!(!content[0].is_pending());
        Ok(())
    }

    #[tokio::test]
    async fn test_without_user_message_passes_through() -> Result<()> {
        let request = ModelRequest {
            messages: vec![Message::system().with_text("be terse")],
            docs: vec![Document::from_text("fact")],
            ..Default::default()
        };
        let seen = run(request.clone()).await?;
        assert_eq!(seen, request);
        Ok(())
    }
}
