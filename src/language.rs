//! Output-language handling for restructured transcripts.
//!
//! Templates are written in English. When the caller asks for a different
//! output language, the system prompt is prefixed with a `"Respond in <X>."`
//! instruction built from the language's display name. The absence of a
//! [`Language`] (`None` at the API surface) means "use the template's native
//! language".

use std::fmt;
use std::str::FromStr;

use crate::error::RestructureError;

/// Languages the restructurer can be asked to respond in, keyed by
/// ISO 639-1 base code.
const LANGUAGES: &[(&str, &str)] = &[
    ("ar", "Arabic"),
    ("cs", "Czech"),
    ("da", "Danish"),
    ("de", "German"),
    ("en", "English"),
    ("es", "Spanish"),
    ("fi", "Finnish"),
    ("fr", "French"),
    ("hi", "Hindi"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("nl", "Dutch"),
    ("no", "Norwegian"),
    ("pl", "Polish"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("sv", "Swedish"),
    ("tr", "Turkish"),
    ("uk", "Ukrainian"),
    ("zh", "Chinese"),
];

/// A validated output language.
///
/// Parses bare ISO codes (`"fr"`) and region-tagged forms (`"fr-FR"`,
/// `"pt_BR"`) case-insensitively; only the base code is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Language {
    code: &'static str,
    name: &'static str,
}

impl Language {
    /// Look up a language by code. Returns `None` for unknown codes.
    pub fn parse(code: &str) -> Option<Language> {
        let base = code
            .split(|c| c == '-' || c == '_')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        LANGUAGES
            .iter()
            .find(|(known, _)| *known == base)
            .map(|&(code, name)| Language { code, name })
    }

    /// The 2-letter base code (e.g. `"fr"`).
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// The English display name used in prompt instructions (e.g. `"French"`).
    pub fn display_name(&self) -> &'static str {
        self.name
    }

    /// Whether this is English, the templates' native language.
    pub fn is_english(&self) -> bool {
        self.code == "en"
    }

    /// The `"Respond in <X>.\n\n"` prompt prefix, or `None` when the
    /// template's native English already applies.
    pub fn instruction(&self) -> Option<String> {
        if self.is_english() {
            None
        } else {
            Some(format!("Respond in {}.\n\n", self.name))
        }
    }
}

impl FromStr for Language {
    type Err = RestructureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
            .ok_or_else(|| RestructureError::InvalidConfig(format!("unknown language code: {s}")))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code)
    }
}
