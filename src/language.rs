use serde::{Deserialize, Serialize};

/// Languages the inference gateway and narrator support.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Hi,
    Ta,
    Bn,
    Mr,
    Kn,
}

impl Default for Language {
    fn default() -> Self {
        Language::En
    }
}

impl Language {
    /// Short tag used in cache fingerprints and request payloads.
    pub fn tag(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Ta => "ta",
            Language::Bn => "bn",
            Language::Mr => "mr",
            Language::Kn => "kn",
        }
    }

    /// BCP-47 code handed to the narrator for speech synthesis.
    pub fn speech_code(&self) -> &'static str {
        match self {
            Language::En => "en-US",
            Language::Hi => "hi-IN",
            Language::Ta => "ta-IN",
            Language::Bn => "bn-IN",
            Language::Mr => "mr-IN",
            Language::Kn => "kn-IN",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "en" => Some(Language::En),
            "hi" => Some(Language::Hi),
            "ta" => Some(Language::Ta),
            "bn" => Some(Language::Bn),
            "mr" => Some(Language::Mr),
            "kn" => Some(Language::Kn),
            _ => None,
        }
    }
}
