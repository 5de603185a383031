//! The selectable sub-agent roster.

/// One selectable persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    /// Wire id, lowercase; goes into the ask envelope's `agent` field.
    pub id: &'static str,
    pub name: &'static str,
    pub tagline: &'static str,
    pub icon: &'static str,
    /// Accent color as RGB, rendered by whatever front end is attached.
    pub color: (u8, u8, u8),
}

/// Roster order matches the backend's; the first entry is the primary agent.
pub const PERSONAS: &[Persona] = &[
    Persona {
        id: "godlocal",
        name: "GodLocal",
        tagline: "Проводник",
        icon: "⚡",
        color: (0x00, 0xFF, 0x9D),
    },
    Persona {
        id: "architect",
        name: "Architect",
        tagline: "Стратег",
        icon: "🏛",
        color: (0x6C, 0x5C, 0xE7),
    },
    Persona {
        id: "builder",
        name: "Builder",
        tagline: "Создатель",
        icon: "🔨",
        color: (0x00, 0xB4, 0xD8),
    },
    Persona {
        id: "grok",
        name: "Grok",
        tagline: "Аналитик",
        icon: "🧠",
        color: (0xFD, 0x79, 0xA8),
    },
    Persona {
        id: "lucas",
        name: "Lucas",
        tagline: "Философ",
        icon: "💡",
        color: (0xFD, 0xCB, 0x6E),
    },
    Persona {
        id: "harper",
        name: "Harper",
        tagline: "Исследователь",
        icon: "🔬",
        color: (0xE1, 0x70, 0x55),
    },
    Persona {
        id: "benjamin",
        name: "Benjamin",
        tagline: "Хранитель",
        icon: "📚",
        color: (0x55, 0xEF, 0xC4),
    },
];

/// The primary agent.
pub fn default_persona() -> &'static Persona {
    &PERSONAS[0]
}

/// Look a persona up by wire id, case-insensitively.
pub fn find_persona(id: &str) -> Option<&'static Persona> {
    let id = id.trim().to_lowercase();
    PERSONAS.iter().find(|persona| persona.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_leads_with_primary_agent() {
        assert_eq!(default_persona().id, "godlocal");
        assert_eq!(PERSONAS.len(), 7);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(find_persona("Architect").map(|persona| persona.id), Some("architect"));
        assert_eq!(find_persona(" BENJAMIN ").map(|persona| persona.id), Some("benjamin"));
        assert!(find_persona("nobody").is_none());
    }
}
