//! Model variant resolution.

use serde::{Deserialize, Serialize};

/// Hosted try-on models reachable through Replicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelVariant {
    /// `cuuupid/idm-vton`: one garment, strong garment preservation.
    IdmVton,
    /// `google/nano-banana-pro`: prompt-driven, any number of garments.
    NanoBananaPro,
}

/// Pinned IDM-VTON version on Replicate.
pub const IDM_VTON_VERSION: &str =
    "c871bb9b046607b680449ecbae55fd8c6d945e0a1948644bf2361b3d021d3ff4";

/// Replicate model path for nano-banana-pro.
pub const NANO_BANANA_PRO_MODEL: &str = "google/nano-banana-pro";

/// Short name aliases for the supported variants.
const ALIASES: &[(&str, ModelVariant)] = &[
    ("nano-banana", ModelVariant::NanoBananaPro),
    ("nano-banana-pro", ModelVariant::NanoBananaPro),
    ("idm-vton", ModelVariant::IdmVton),
    ("accurate", ModelVariant::IdmVton),
];

impl ModelVariant {
    /// Largest number of garments the model accepts in one job.
    #[must_use]
    pub fn max_garments(self) -> Option<usize> {
        match self {
            Self::IdmVton => Some(1),
            Self::NanoBananaPro => None,
        }
    }
}

/// Resolve a model alias to its variant.
///
/// # Errors
///
/// Returns an error if the name is not a known alias.
pub fn resolve_variant(name: &str) -> Result<ModelVariant, String> {
    ALIASES
        .iter()
        .find(|&&(alias, _)| alias.eq_ignore_ascii_case(name))
        .map(|&(_, variant)| variant)
        .ok_or_else(|| {
            let known: Vec<&str> = ALIASES.iter().map(|&(alias, _)| alias).collect();
            format!("Unknown model '{name}'. Expected one of: {}", known.join(", "))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_nano_banana_aliases() {
        assert_eq!(resolve_variant("nano-banana").unwrap(), ModelVariant::NanoBananaPro);
        assert_eq!(resolve_variant("nano-banana-pro").unwrap(), ModelVariant::NanoBananaPro);
    }

    #[test]
    fn resolve_idm_vton_aliases() {
        assert_eq!(resolve_variant("idm-vton").unwrap(), ModelVariant::IdmVton);
        assert_eq!(resolve_variant("ACCURATE").unwrap(), ModelVariant::IdmVton);
    }

    #[test]
    fn unknown_model_lists_aliases() {
        let err = resolve_variant("dall-e-3").unwrap_err();
        assert!(err.contains("Unknown model 'dall-e-3'"));
        assert!(err.contains("idm-vton"));
    }

    #[test]
    fn garment_limits() {
        assert_eq!(ModelVariant::IdmVton.max_garments(), Some(1));
        assert_eq!(ModelVariant::NanoBananaPro.max_garments(), None);
    }
}
