//! Cache keys for inference responses.
//!
//! Keys are deliberately weak: the analysis fingerprint hashes nothing,
//! it concatenates the surface request parameters. Two submissions that
//! agree on language, leading narrative and file name/size list are
//! treated as the same question, which is exactly the offline-retry case
//! the cache exists for.

use crate::language::Language;
use crate::media::MediaAsset;

const NARRATIVE_PREFIX_CHARS: usize = 20;

pub fn analysis_fingerprint(language: Language, narrative: &str, media: &[MediaAsset]) -> String {
    let prefix: String = narrative.chars().take(NARRATIVE_PREFIX_CHARS).collect();
    let files = media
        .iter()
        .map(|asset| format!("{}_{}", asset.name, asset.bytes.len()))
        .collect::<Vec<_>>()
        .join("|");
    format!("analyze_{}_{}_{}", language.tag(), prefix, files)
}

pub fn diagram_fingerprint(prompt: &str) -> String {
    format!("diagram_{prompt}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str, len: usize) -> MediaAsset {
        MediaAsset::new(name.to_string(), "image/webp".to_string(), vec![0u8; len])
    }

    #[test]
    fn fingerprint_combines_language_prefix_and_files() {
        let media = vec![asset("a.webp", 10), asset("b.webp", 20)];
        let key = analysis_fingerprint(Language::Hi, "fever and headache since yesterday", &media);
        assert_eq!(key, "analyze_hi_fever and headache s_a.webp_10|b.webp_20");
    }

    #[test]
    fn same_surface_parameters_collide() {
        let media = vec![asset("a.webp", 10)];
        let first = analysis_fingerprint(Language::En, "rash on the left arm, itchy", &media);
        let second = analysis_fingerprint(Language::En, "rash on the left arm, spreading", &media);
        // Only the first 20 characters of the narrative participate.
        assert_eq!(first, second);
    }

    #[test]
    fn language_changes_the_key() {
        let first = analysis_fingerprint(Language::En, "fever", &[]);
        let second = analysis_fingerprint(Language::Ta, "fever", &[]);
        assert_ne!(first, second);
    }

    #[test]
    fn diagram_key_embeds_prompt() {
        assert_eq!(
            diagram_fingerprint("anatomy of the inner ear"),
            "diagram_anatomy of the inner ear"
        );
    }
}
