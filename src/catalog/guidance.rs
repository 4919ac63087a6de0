use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

/// Treatment advice for one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guidance {
    pub severity: Severity,
    pub treatment: &'static str,
    pub steps: &'static [&'static str],
}

const DEFAULT_TREATMENT: &str = "Follow integrated pest and disease management practices.";

const DEFAULT_STEPS: &[&str] = &[
    "Inspect affected plants closely.",
    "Apply locally recommended control method.",
    "Repeat field check after 3 days.",
];

const GUIDANCE: &[(&str, Guidance)] = &[
    (
        "Pepper__bell__Bacterial_spot",
        Guidance {
            severity: Severity::High,
            treatment: "Use copper-based bactericide; avoid overhead irrigation.",
            steps: &[
                "Remove heavily infected leaves.",
                "Spray copper-based bactericide every 7 to 10 days.",
                "Water at soil level to keep foliage dry.",
            ],
        },
    ),
    (
        "Pepper__bell__healthy",
        Guidance {
            severity: Severity::Low,
            treatment: "No treatment needed. Continue routine monitoring.",
            steps: &[
                "Inspect leaves every 3 to 4 days.",
                "Maintain balanced nutrition and irrigation.",
                "Keep weeds and debris away from crop rows.",
            ],
        },
    ),
    (
        "Potato_Early_blight",
        Guidance {
            severity: Severity::Medium,
            treatment: "Apply chlorothalonil or mancozeb; remove infected leaves.",
            steps: &[
                "Prune infected lower foliage.",
                "Apply protective fungicide as per label dose.",
                "Rotate with non-solanaceous crops next season.",
            ],
        },
    ),
    (
        "Potato_Late_blight",
        Guidance {
            severity: Severity::High,
            treatment: "Apply systemic fungicide immediately and isolate infected plants.",
            steps: &[
                "Isolate affected plants immediately.",
                "Apply recommended late blight fungicide.",
                "Destroy severely infected plants to reduce spread.",
            ],
        },
    ),
    (
        "Potato_healthy",
        Guidance {
            severity: Severity::Low,
            treatment: "No treatment needed. Maintain preventive field hygiene.",
            steps: &[
                "Continue weekly scouting.",
                "Avoid prolonged leaf wetness.",
                "Use clean tools and disease-free seed tubers.",
            ],
        },
    ),
    (
        "Tomato_Bacterial_spot",
        Guidance {
            severity: Severity::High,
            treatment: "Use copper sprays and remove infected foliage.",
            steps: &[
                "Remove symptomatic leaves.",
                "Spray copper-based bactericide on schedule.",
                "Avoid handling plants when wet.",
            ],
        },
    ),
    (
        "Tomato_Early_blight",
        Guidance {
            severity: Severity::Medium,
            treatment: "Apply fungicide and improve air circulation around plants.",
            steps: &[
                "Prune lower canopy for airflow.",
                "Apply fungicide at recommended interval.",
                "Mulch soil to reduce spore splash.",
            ],
        },
    ),
    (
        "Tomato_Late_blight",
        Guidance {
            severity: Severity::High,
            treatment: "Use late blight fungicide and remove severely infected plants.",
            steps: &[
                "Separate affected plants quickly.",
                "Apply curative + protective fungicide program.",
                "Dispose infected plants away from field.",
            ],
        },
    ),
    (
        "Tomato_Leaf_Mold",
        Guidance {
            severity: Severity::Medium,
            treatment: "Reduce humidity and apply recommended fungicide.",
            steps: &[
                "Ventilate crop area or widen plant spacing.",
                "Irrigate in morning only.",
                "Apply fungicide where symptoms are active.",
            ],
        },
    ),
    (
        "Tomato_Septoria_leaf_spot",
        Guidance {
            severity: Severity::Medium,
            treatment: "Remove lower infected leaves and apply fungicide.",
            steps: &[
                "Remove infected basal foliage.",
                "Use preventive fungicide spray cycle.",
                "Keep leaves dry during irrigation.",
            ],
        },
    ),
    (
        "Tomato_Spider_mites_Two_spotted_spider_mite",
        Guidance {
            severity: Severity::Medium,
            treatment: "Use miticide or neem-based control and increase humidity.",
            steps: &[
                "Spray leaf undersides thoroughly.",
                "Rotate miticide modes of action.",
                "Increase humidity and reduce dust stress.",
            ],
        },
    ),
    (
        "Tomato_Target_Spot",
        Guidance {
            severity: Severity::Medium,
            treatment: "Spray broad-spectrum fungicide and avoid leaf wetness.",
            steps: &[
                "Remove infected foliage early.",
                "Apply broad-spectrum fungicide.",
                "Use drip irrigation instead of overhead watering.",
            ],
        },
    ),
    (
        "Tomato_Tomato_YellowLeaf_Curl_Virus",
        Guidance {
            severity: Severity::High,
            treatment: "Control whiteflies and remove infected plants.",
            steps: &[
                "Rogue symptomatic plants immediately.",
                "Deploy yellow sticky traps for whiteflies.",
                "Use vector control spray as recommended.",
            ],
        },
    ),
    (
        "Tomato_Tomato_mosaic_virus",
        Guidance {
            severity: Severity::High,
            treatment: "Remove infected plants and sanitize tools regularly.",
            steps: &[
                "Discard infected plants safely.",
                "Disinfect hands and tools after handling plants.",
                "Avoid tobacco contamination in field operations.",
            ],
        },
    ),
    (
        "Tomato_healthy",
        Guidance {
            severity: Severity::Low,
            treatment: "No treatment needed. Continue regular monitoring.",
            steps: &[
                "Monitor leaves every few days.",
                "Follow balanced irrigation and nutrition schedule.",
                "Keep field sanitation consistent.",
            ],
        },
    ),
];

/// Guidance for `class_id`, or a generic record when the class has none.
/// The generic record is rated `High` for viral classes and `Medium` otherwise.
pub fn guidance_for(class_id: &str) -> Guidance {
    GUIDANCE
        .iter()
        .find(|(id, _)| *id == class_id)
        .map(|(_, g)| *g)
        .unwrap_or_else(|| default_guidance(class_id))
}

pub fn default_guidance(class_id: &str) -> Guidance {
    let severity = if class_id.to_lowercase().contains("virus") {
        Severity::High
    } else {
        Severity::Medium
    };
    Guidance {
        severity,
        treatment: DEFAULT_TREATMENT,
        steps: DEFAULT_STEPS,
    }
}
