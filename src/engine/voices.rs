//! Bundled voice catalog and voice formula parsing
//!
//! Catalog voice names encode their language in the first character and
//! their presenting gender in the second (`af_heart` is an American English
//! female voice). Voices can be blended with a weighted formula such as
//! `"af_heart*0.7 + af_bella*0.3"`.

use crate::engine::VoiceEmbedding;

/// Every voice shipped with the catalog engine, in catalog order.
pub const VOICES: &[&str] = &[
    // American English
    "af_alloy",
    "af_aoede",
    "af_bella",
    "af_heart",
    "af_jessica",
    "af_kore",
    "af_nicole",
    "af_nova",
    "af_river",
    "af_sarah",
    "af_sky",
    "am_adam",
    "am_echo",
    "am_eric",
    "am_fenrir",
    "am_liam",
    "am_michael",
    "am_onyx",
    "am_puck",
    "am_santa",
    // British English
    "bf_alice",
    "bf_emma",
    "bf_isabella",
    "bf_lily",
    "bm_daniel",
    "bm_fable",
    "bm_george",
    "bm_lewis",
    // Spanish
    "ef_dora",
    "em_alex",
    "em_santa",
    // French
    "ff_siwis",
    // Hindi
    "hf_alpha",
    "hf_beta",
    "hm_omega",
    "hm_psi",
    // Italian
    "if_sara",
    "im_nicola",
    // Japanese
    "jf_alpha",
    "jf_gongitsune",
    "jf_nezumi",
    "jf_tebukuro",
    "jm_kumo",
    // Brazilian Portuguese
    "pf_dora",
    "pm_alex",
    "pm_santa",
    // Mandarin Chinese
    "zf_xiaobei",
    "zf_xiaoni",
    "zf_xiaoxiao",
    "zf_xiaoyi",
    "zm_yunjian",
    "zm_yunxi",
    "zm_yunxia",
    "zm_yunyang",
];

/// Whether `name` is a catalog voice.
pub fn is_catalog_voice(name: &str) -> bool {
    VOICES.contains(&name)
}

/// Human-readable language for a catalog language prefix.
pub fn language_description(prefix: char) -> Option<&'static str> {
    match prefix {
        'a' => Some("American English"),
        'b' => Some("British English"),
        'e' => Some("Spanish"),
        'f' => Some("French"),
        'h' => Some("Hindi"),
        'i' => Some("Italian"),
        'j' => Some("Japanese"),
        'p' => Some("Brazilian Portuguese"),
        'z' => Some("Mandarin Chinese"),
        _ => None,
    }
}

/// One `voice*weight` term of a voice formula.
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaTerm {
    pub voice: String,
    pub weight: f32,
}

/// Parsed weighted-sum voice formula.
///
/// Grammar: terms joined by `+`, each term a voice name with an optional
/// `*weight` suffix (weight defaults to 1.0). Whitespace around tokens is
/// ignored. Weights must be positive finite numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceFormula {
    terms: Vec<FormulaTerm>,
}

impl VoiceFormula {
    /// Parse a formula or a plain voice name.
    ///
    /// A plain name parses as a single term with weight 1.0. Returns `None`
    /// for empty input, malformed terms, or non-positive weights.
    pub fn parse(input: &str) -> Option<Self> {
        let mut terms = Vec::new();
        for raw_term in input.split('+') {
            let raw_term = raw_term.trim();
            if raw_term.is_empty() {
                return None;
            }
            let mut parts = raw_term.split('*');
            let voice = parts.next()?.trim();
            if voice.is_empty() {
                return None;
            }
            let weight = match parts.next() {
                Some(raw_weight) => raw_weight.trim().parse::<f32>().ok()?,
                None => 1.0,
            };
            // A third `*` segment means the term is malformed.
            if parts.next().is_some() {
                return None;
            }
            if !weight.is_finite() || weight <= 0.0 {
                return None;
            }
            terms.push(FormulaTerm {
                voice: voice.to_string(),
                weight,
            });
        }
        if terms.is_empty() {
            return None;
        }
        Some(VoiceFormula { terms })
    }

    /// Parsed terms with their raw (unnormalized) weights.
    pub fn terms(&self) -> &[FormulaTerm] {
        &self.terms
    }

    /// Whether the formula is a single plain voice.
    pub fn is_single(&self) -> bool {
        self.terms.len() == 1
    }

    /// First term's voice name not present in the catalog, if any.
    pub fn unknown_voice(&self) -> Option<&str> {
        self.terms
            .iter()
            .map(|t| t.voice.as_str())
            .find(|v| !is_catalog_voice(v))
    }

    /// Resolve the formula to an embedding with weights normalized by the
    /// total weight.
    pub fn to_embedding(&self) -> VoiceEmbedding {
        if let [term] = self.terms.as_slice() {
            return VoiceEmbedding::single(term.voice.clone());
        }
        VoiceEmbedding::blend(
            self.terms
                .iter()
                .map(|t| (t.voice.clone(), t.weight))
                .collect(),
        )
    }
}
