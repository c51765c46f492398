//! Clothing category to model garment class mapping.

/// Garment class understood by the try-on models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GarmentClass {
    /// Shirts, jackets and anything else worn on the torso.
    UpperBody,
    /// Trousers and skirts.
    LowerBody,
    /// Full-length garments.
    Dresses,
}

impl GarmentClass {
    /// Class name as the model expects it.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UpperBody => "upper_body",
            Self::LowerBody => "lower_body",
            Self::Dresses => "dresses",
        }
    }
}

/// Map a UI category to a garment class. Unknown categories fall back to
/// [`GarmentClass::UpperBody`].
#[must_use]
pub fn garment_class(category: &str) -> GarmentClass {
    match category.to_ascii_lowercase().as_str() {
        "shirts" | "jackets" => GarmentClass::UpperBody,
        "pants" => GarmentClass::LowerBody,
        "dresses" => GarmentClass::Dresses,
        other => {
            log::warn!("unknown category '{other}', treating it as upper_body");
            GarmentClass::UpperBody
        }
    }
}

/// Short garment description passed to the model alongside the image.
#[must_use]
pub fn garment_description(category: &str) -> &'static str {
    match category.to_ascii_lowercase().as_str() {
        "jackets" => "jacket",
        "pants" => "pants",
        "dresses" => "dress",
        _ => "t-shirt",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_categories() {
        assert_eq!(garment_class("shirts"), GarmentClass::UpperBody);
        assert_eq!(garment_class("jackets"), GarmentClass::UpperBody);
        assert_eq!(garment_class("pants"), GarmentClass::LowerBody);
        assert_eq!(garment_class("Dresses"), GarmentClass::Dresses);
    }

    #[test]
    fn unknown_category_defaults_to_upper_body() {
        assert_eq!(garment_class("hats"), GarmentClass::UpperBody);
        assert_eq!(garment_class("hats").as_str(), "upper_body");
    }

    #[test]
    fn descriptions() {
        assert_eq!(garment_description("shirts"), "t-shirt");
        assert_eq!(garment_description("jackets"), "jacket");
        assert_eq!(garment_description("dresses"), "dress");
        assert_eq!(garment_description("socks"), "t-shirt");
    }
}
