//! System prompt assembly for sovereign mode.

const PREAMBLE: &str = "You are GodLocal — a sovereign AI assistant running directly on this machine, with no server dependency.\nYou are fast, direct, and assist with coding, research, crypto, and strategy.";

/// Build the system prompt; non-empty soul memory is appended as its own
/// section so the model treats it as persistent context.
#[must_use]
pub fn system_prompt(soul: &str) -> String {
    if soul.is_empty() {
        PREAMBLE.to_string()
    } else {
        format!("{PREAMBLE}\n\n## SOUL Memory (your persistent context)\n{soul}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_prompt_without_soul() {
        let prompt = system_prompt("");
        assert!(prompt.starts_with("You are GodLocal"));
        assert!(!prompt.contains("SOUL Memory"));
    }

    #[test]
    fn soul_memory_gets_its_own_section() {
        let prompt = system_prompt("Owner prefers terse answers.");
        assert!(prompt.ends_with(
            "## SOUL Memory (your persistent context)\nOwner prefers terse answers."
        ));
        // The section is separated from the preamble by a blank line.
        assert!(prompt.contains("strategy.\n\n## SOUL Memory"));
    }
}
