// src/exec/prompt.rs

/// Placeholder in the prompt template replaced by the source name.
pub const FILENAME_PLACEHOLDER: &str = "{filename}";

/// The prompt a worker sends: the task's own override if it has a non-blank
/// one, otherwise the template with every `{filename}` replaced by
/// `source_stem`.
pub fn resolve_prompt(prompt_override: Option<&str>, template: &str, source_stem: &str) -> String {
    match prompt_override {
        Some(p) if !p.trim().is_empty() => p.to_string(),
        _ => template.replace(FILENAME_PLACEHOLDER, source_stem),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_substitutes_every_placeholder() {
        let prompt = resolve_prompt(None, "turn {filename} into a poster titled {filename}", "beach");
        assert_eq!(prompt, "turn beach into a poster titled beach");
    }

    #[test]
    fn override_wins_over_template() {
        let prompt = resolve_prompt(Some("pixel art"), "turn {filename} blue", "beach");
        assert_eq!(prompt, "pixel art");
    }

    #[test]
    fn blank_override_falls_back_to_template() {
        let prompt = resolve_prompt(Some("  "), "turn {filename} blue", "beach");
        assert_eq!(prompt, "turn beach blue");
    }

    #[test]
    fn template_without_placeholder_is_used_verbatim() {
        assert_eq!(resolve_prompt(None, "make it brighter", "x"), "make it brighter");
    }
}
