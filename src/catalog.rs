//! Static catalog of text-to-image models known to work with the inference API.

use serde::Serialize;

pub const DEFAULT_MODEL: &str = "stabilityai/stable-diffusion-2-1";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

const fn model(id: &'static str, name: &'static str, description: &'static str) -> ModelInfo {
    ModelInfo {
        id,
        name,
        description,
    }
}

pub const MODELS: &[ModelInfo] = &[
    model(
        "stabilityai/stable-diffusion-2-1",
        "Stable Diffusion 2.1",
        "High-quality general purpose model",
    ),
    model(
        "runwayml/stable-diffusion-v1-5",
        "Stable Diffusion 1.5",
        "Classic stable diffusion model",
    ),
    model(
        "CompVis/stable-diffusion-v1-4",
        "Stable Diffusion 1.4",
        "Original stable diffusion model",
    ),
    model(
        "prompthero/openjourney",
        "OpenJourney",
        "Midjourney-style artistic model",
    ),
    model(
        "wavymulder/Analog-Diffusion",
        "Analog Diffusion",
        "Analog photography style",
    ),
    model(
        "hakurei/waifu-diffusion",
        "Waifu Diffusion",
        "Anime and manga style images",
    ),
    model(
        "nitrosocke/Arcane-Diffusion",
        "Arcane Diffusion",
        "Arcane TV series art style",
    ),
    model(
        "dreamlike-art/dreamlike-diffusion-1.0",
        "Dreamlike Diffusion",
        "Dreamy, artistic style",
    ),
    model(
        "prompthero/midjourney-v4-diffusion",
        "Midjourney v4",
        "High-quality artistic generation",
    ),
    model(
        "nitrosocke/redshift-diffusion",
        "Redshift Diffusion",
        "3D rendered style images",
    ),
    model(
        "wavymulder/portraitplus",
        "Portrait Plus",
        "Professional portrait photography",
    ),
    model(
        "dallinmackay/Van-Gogh-diffusion",
        "Van Gogh Diffusion",
        "Van Gogh painting style",
    ),
    model(
        "nitrosocke/spider-verse-diffusion",
        "Spider-Verse",
        "Spider-Man animated movie style",
    ),
    model(
        "wavymulder/collage-diffusion",
        "Collage Diffusion",
        "Collage art style",
    ),
    model(
        "stabilityai/stable-diffusion-xl-base-1.0",
        "Stable Diffusion XL",
        "Latest high-resolution model",
    ),
];

pub fn available_models() -> &'static [ModelInfo] {
    MODELS
}

pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|model| model.id == id)
}
