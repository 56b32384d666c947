use std::fmt;
use std::str::FromStr;

/// Answer language. Known languages accept either their English name or ISO
/// 639-1 code; anything else is kept verbatim and handed to the translator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Urdu,
    Hindi,
    Spanish,
    French,
    German,
    Other(String),
}

const KNOWN: &[(Language, &str, &str)] = &[
    (Language::English, "English", "en"),
    (Language::Urdu, "Urdu", "ur"),
    (Language::Hindi, "Hindi", "hi"),
    (Language::Spanish, "Spanish", "es"),
    (Language::French, "French", "fr"),
    (Language::German, "German", "de"),
];

impl Language {
    /// Name used in prompts and shown to users.
    pub fn name(&self) -> &str {
        match self {
            Language::Other(name) => name,
            known => KNOWN
                .iter()
                .find(|(lang, _, _)| lang == known)
                .map(|(_, name, _)| *name)
                .unwrap_or("English"),
        }
    }

    /// The language answers are synthesised in; translation is skipped for it.
    pub fn is_base(&self) -> bool {
        matches!(self, Language::English)
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("language must not be empty".to_string());
        }
        let known = KNOWN.iter().find(|(_, name, code)| {
            name.eq_ignore_ascii_case(trimmed) || code.eq_ignore_ascii_case(trimmed)
        });
        Ok(match known {
            Some((lang, _, _)) => lang.clone(),
            None => Language::Other(trimmed.to_string()),
        })
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
