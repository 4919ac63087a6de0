use std::borrow::Cow;

/// Class identifiers in model output order.
///
/// This is the order the trainer prints as its class-to-index mapping
/// (directory names sorted alphabetically). Retraining on a different
/// dataset layout means updating this list by hand.
pub const CLASS_NAMES: [&str; 15] = [
    "Pepper__bell__Bacterial_spot",
    "Pepper__bell__healthy",
    "Potato_Early_blight",
    "Potato_Late_blight",
    "Potato_healthy",
    "Tomato_Bacterial_spot",
    "Tomato_Early_blight",
    "Tomato_Late_blight",
    "Tomato_Leaf_Mold",
    "Tomato_Septoria_leaf_spot",
    "Tomato_Spider_mites_Two_spotted_spider_mite",
    "Tomato_Target_Spot",
    "Tomato_Tomato_YellowLeaf_Curl_Virus",
    "Tomato_Tomato_mosaic_virus",
    "Tomato_healthy",
];

const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("Pepper__bell__Bacterial_spot", "Bacterial Spot"),
    ("Pepper__bell__healthy", "Healthy"),
    ("Potato_Early_blight", "Early Blight"),
    ("Potato_Late_blight", "Late Blight"),
    ("Potato_healthy", "Healthy"),
    ("Tomato_Bacterial_spot", "Bacterial Spot"),
    ("Tomato_Early_blight", "Early Blight"),
    ("Tomato_Late_blight", "Late Blight"),
    ("Tomato_Leaf_Mold", "Leaf Mold"),
    ("Tomato_Septoria_leaf_spot", "Septoria Leaf Spot"),
    ("Tomato_Spider_mites_Two_spotted_spider_mite", "Spider Mites"),
    ("Tomato_Target_Spot", "Target Spot"),
    ("Tomato_Tomato_YellowLeaf_Curl_Virus", "Yellow Leaf Curl Virus"),
    ("Tomato_Tomato_mosaic_virus", "Mosaic Virus"),
    ("Tomato_healthy", "Healthy"),
];

/// Human-readable disease name; unknown ids fall back to the id with
/// underscores replaced by spaces.
pub fn display_name(class_id: &str) -> Cow<'static, str> {
    DISPLAY_NAMES
        .iter()
        .find(|(id, _)| *id == class_id)
        .map(|(_, name)| Cow::Borrowed(*name))
        .unwrap_or_else(|| Cow::Owned(class_id.replace('_', " ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_class_has_a_display_name() {
        for id in CLASS_NAMES {
            assert!(DISPLAY_NAMES.iter().any(|(k, _)| *k == id), "{} missing", id);
        }
    }

    #[test]
    fn known_and_fallback_names() {
        assert_eq!(display_name("Tomato_healthy"), "Healthy");
        assert_eq!(display_name("Corn_Common_rust"), "Corn Common rust");
    }
}
