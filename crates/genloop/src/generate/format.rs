use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use crate::errors::{GenerateError, GenerateResult};
use crate::formats::{FormatDef, Formatter};
use crate::models::message::Message;
use crate::models::part::Part;
use crate::models::request::{GenerateRequest, Instructions, OutputOptions};
use crate::models::role::Role;

/// Apply an output format to a copy of the request
///
/// Without a format the request comes back unchanged and no formatter is created.
pub fn apply_format(
    request: &GenerateRequest,
    format: Option<&Arc<dyn FormatDef>>,
) -> GenerateResult<(GenerateRequest, Option<Arc<dyn Formatter>>)> {
    let Some(format) = format else {
        return Ok((request.clone(), None));
    };

    let mut formatted = request.clone();
    let options = formatted.output.get_or_insert_with(OutputOptions::default);
    let formatter = format
        .create(options.json_schema.as_ref())
        .map_err(|e| GenerateError::Configuration(e.to_string()))?;
    let config = format.config();

    let inject = config.default_instructions != Some(false) || options.requests_instructions();
    if inject {
        if let Some(instructions) = resolve_instructions(formatter.as_ref(), options) {
            formatted.messages = inject_instructions(&formatted.messages, &instructions);
        }
    }

    if options.constrained.is_none() {
        options.constrained = config.constrained;
    }
    if options.content_type.is_none() {
        options.content_type = config.content_type.clone();
    }
    if let Some(hint) = &config.format {
        options.format = Some(hint.clone());
    }

    debug!(
        format = format.name(),
        constrained = ?options.constrained,
        inject,
        "applied output format"
    );
    Ok((formatted, Some(formatter)))
}

/// The instruction text for a request: the caller's own text, nothing when the caller turned
/// instructions off, otherwise whatever the formatter renders
pub fn resolve_instructions(formatter: &dyn Formatter, options: &OutputOptions) -> Option<String> {
    match &options.instructions {
        Some(Instructions::Custom(text)) => Some(text.clone()),
        Some(Instructions::Toggle(false)) => None,
        _ => formatter.instructions(),
    }
}

/// Add output instructions to the system message, or the last user message when there is none
pub fn inject_instructions(messages: &[Message], instructions: &str) -> Vec<Message> {
    if instructions.is_empty() {
        return messages.to_vec();
    }
    let already_present = messages.iter().any(|message| {
        message
            .content
            .iter()
            .any(|part| part.purpose() == Some("output") && !part.is_pending())
    });
    if already_present {
        return messages.to_vec();
    }

    let target = messages
        .iter()
        .position(|m| m.role == Role::System)
        .or_else(|| messages.iter().rposition(|m| m.role == Role::User));
    let Some(target) = target else {
        return messages.to_vec();
    };

    let part = Part::text(instructions).with_metadata("purpose", json!("output"));
    let mut messages = messages.to_vec();
    let content = &mut messages[target].content;
    match content
        .iter()
        .position(|p| p.purpose() == Some("output") && p.is_pending())
    {
        Some(i) => content[i] = part,
        None => content.push(part),
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::json::JsonFormat;
    use crate::formats::text::TextFormat;
    use crate::formats::FormatConfig;
    use crate::formats::FormatError;
    use serde_json::{json, Value};

    fn json_format() -> Arc<dyn FormatDef> {
        Arc::new(JsonFormat::default())
    }

    fn schema() -> Value {
        json!({"type": "object", "properties": {"tempC": {"type": "number"}}})
    }

    fn request(output: OutputOptions) -> GenerateRequest {
        GenerateRequest::new(vec![
            Message::user().with_text("What's the weather?"),
        ])
        .with_output(output)
    }

    #[test]
    fn test_without_format_is_unchanged_and_idempotent() {
        let original = request(OutputOptions::default());
        let (once, formatter) = apply_format(&original, None).unwrap();
        assert!(formatter.is_none());
        assert_eq!(once, original);

        let (twice, formatter) = apply_format(&once, None).unwrap();
        assert!(formatter.is_none());
        assert_eq!(twice, original);
    }

    #[test]
    fn test_explicit_constrained_wins() {
        let original = request(OutputOptions {
            format: Some("json".to_string()),
            constrained: Some(false),
            ..Default::default()
        });
        let (formatted, _) = apply_format(&original, Some(&json_format())).unwrap();
        let output = formatted.output.unwrap();
        assert_eq!(output.constrained, Some(false));
        assert_eq!(output.content_type.as_deref(), Some("application/json"));
    }

    #[test]
    fn test_format_directives_fill_unset_options() {
        let original = request(OutputOptions {
            format: Some("json".to_string()),
            content_type: Some("application/vnd.custom+json".to_string()),
            ..Default::default()
        });
        let (formatted, formatter) = apply_format(&original, Some(&json_format())).unwrap();
        assert!(formatter.is_some());
        let output = formatted.output.unwrap();
        assert_eq!(output.constrained, Some(true));
        assert_eq!(
            output.content_type.as_deref(),
            Some("application/vnd.custom+json")
        );
        assert_eq!(output.format.as_deref(), Some("json"));
        // The caller's request is never modified
        assert_eq!(original.output.unwrap().constrained, None);
    }

    #[test]
    fn test_json_instructions_only_when_requested() {
        let original = request(OutputOptions {
            format: Some("json".to_string()),
            json_schema: Some(schema()),
            ..Default::default()
        });
        let (formatted, _) = apply_format(&original, Some(&json_format())).unwrap();
        assert_eq!(formatted.messages, original.messages);

        let original = request(OutputOptions {
            format: Some("json".to_string()),
            json_schema: Some(schema()),
            instructions: Some(Instructions::Toggle(true)),
            ..Default::default()
        });
        let (formatted, _) = apply_format(&original, Some(&json_format())).unwrap();
        let content = &formatted.messages[0].content;
        assert_eq!(content.len(), 2);
        assert_eq!(content[1].purpose(), Some("output"));
        assert!(content[1].as_text().unwrap().contains("tempC"));
    }

    #[test]
    fn test_custom_instructions_replace_rendered_ones() {
        let original = request(OutputOptions {
            format: Some("json".to_string()),
            json_schema: Some(schema()),
            instructions: Some(Instructions::Custom("Reply with a JSON object.".to_string())),
            ..Default::default()
        });
        let (formatted, _) = apply_format(&original, Some(&json_format())).unwrap();
        assert_eq!(
            formatted.messages[0].content[1].as_text(),
            Some("Reply with a JSON object.")
        );
    }

    #[test]
    fn test_disabled_instructions_inject_nothing() {
        struct Chatty(FormatConfig);

        impl FormatDef for Chatty {
            fn name(&self) -> &str {
                "chatty"
            }

            fn config(&self) -> &FormatConfig {
                &self.0
            }

            fn create(&self, schema: Option<&Value>) -> Result<Arc<dyn Formatter>, FormatError> {
                JsonFormat::default().create(schema)
            }
        }

        let format: Arc<dyn FormatDef> = Arc::new(Chatty(FormatConfig::default()));
        let options = OutputOptions {
            format: Some("chatty".to_string()),
            json_schema: Some(schema()),
            ..Default::default()
        };

        let (formatted, _) = apply_format(&request(options.clone()), Some(&format)).unwrap();
        assert_eq!(formatted.messages[0].content.len(), 2);
        assert_eq!(formatted.output.unwrap().format.as_deref(), Some("chatty"));

        let disabled = OutputOptions {
            instructions: Some(Instructions::Toggle(false)),
            ..options
        };
        let (formatted, _) = apply_format(&request(disabled), Some(&format)).unwrap();
        assert_eq!(formatted.messages[0].content.len(), 1);
    }

    #[test]
    fn test_invalid_schema_is_configuration_error() {
        let format: Arc<dyn FormatDef> = Arc::new(crate::formats::array::ArrayFormat::default());
        let original = request(OutputOptions {
            format: Some("array".to_string()),
            json_schema: Some(json!({"type": "object"})),
            ..Default::default()
        });
        let result = apply_format(&original, Some(&format));
        assert!(matches!(result, Err(GenerateError::Configuration(_))));
    }

    #[test]
    fn test_text_format_sets_content_type() {
        let format: Arc<dyn FormatDef> = Arc::new(TextFormat::default());
        let (formatted, _) = apply_format(
            &request(OutputOptions {
                format: Some("text".to_string()),
                ..Default::default()
            }),
            Some(&format),
        )
        .unwrap();
        let output = formatted.output.unwrap();
        assert_eq!(output.content_type.as_deref(), Some("text/plain"));
        assert_eq!(output.constrained, None);
    }

    #[test]
    fn test_inject_prefers_system_message() {
        let messages = vec![
            Message::system().with_text("You are terse."),
            Message::user().with_text("question"),
        ];
        let injected = inject_instructions(&messages, "Output JSON.");
        assert_eq!(injected[0].content.len(), 2);
        assert_eq!(injected[1], messages[1]);
    }

    #[test]
    fn test_inject_skips_when_output_part_present() {
        let messages = vec![Message::user()
            .with_text("question")
            .with_content(Part::text("Output JSON.").with_metadata("purpose", json!("output")))];
        assert_eq!(inject_instructions(&messages, "Something else."), messages);
        assert_eq!(inject_instructions(&messages, ""), messages);
    }

    #[test]
    fn test_inject_replaces_pending_output_part() {
        let pending = Part::text("")
            .with_metadata("purpose", json!("output"))
            .with_metadata("pending", json!(true));
        let messages = vec![Message::user().with_content(pending).with_text("question")];
        let injected = inject_instructions(&messages, "Output JSON.");
        let content = &injected[0].content;
        assert_eq!(content.len(), 2);
        assert_eq!(content[0].as_text(), Some("Output JSON."));
        assert!(!content[0].is_pending());
    }

    #[test]
    fn test_inject_without_target_is_noop() {
        let messages = vec![Message::model().with_text("hello")];
        assert_eq!(inject_instructions(&messages, "Output JSON."), messages);
    }
}
