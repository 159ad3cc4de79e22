//! Bundled model cards the user can pick from.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Descriptor of a selectable on-device model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCard {
    pub id: String,
    pub display_name: String,
    pub quantization: String,
    pub size_gb: f64,
    pub context_length: u32,
    pub description: String,
}

impl ModelCard {
    /// Directory name used for this model inside the model cache
    pub fn cache_dir_name(&self) -> String {
        self.id.replace('/', "_")
    }
}

static FEATURED_MODELS: Lazy<Vec<ModelCard>> = Lazy::new(|| {
    vec![
        ModelCard {
            id: "litert-community/gemma-2b-it-int4".to_string(),
            display_name: "Gemma 2B (int4)".to_string(),
            quantization: "int4".to_string(),
            size_gb: 1.6,
            context_length: 4096,
            description: "Fast multilingual chat tuned for low-power devices.".to_string(),
        },
        ModelCard {
            id: "litert-community/phi-3-mini-4k-instruct-int4".to_string(),
            display_name: "Phi-3 Mini (4K)".to_string(),
            quantization: "int4".to_string(),
            size_gb: 2.4,
            context_length: 4096,
            description: "Great for reasoning and tool-use style prompts.".to_string(),
        },
        ModelCard {
            id: "litert-community/llama-3-8b-instruct-int4".to_string(),
            display_name: "Llama 3 8B (int4)".to_string(),
            quantization: "int4".to_string(),
            size_gb: 5.4,
            context_length: 8192,
            description: "Highest quality response option for the Pixel 10 Pro XL.".to_string(),
        },
    ]
});

/// All bundled models, in display order
pub fn featured_models() -> &'static [ModelCard] {
    &FEATURED_MODELS
}

/// The model selected when nothing else is known
pub fn default_model() -> &'static ModelCard {
    &FEATURED_MODELS[0]
}

pub fn find_model(id: &str) -> Option<&'static ModelCard> {
    FEATURED_MODELS.iter().find(|card| card.id == id)
}
