//! Clients for the external services pepperpot orchestrates. Each concern sits
//! behind an `async_trait` so handlers can be driven by in-process fakes.

pub mod error;
pub mod recipes;
pub mod rooms;
pub mod speech;
pub mod text;

pub use error::ProviderError;
pub use recipes::{RecipeSearch, SpoonacularClient};
pub use rooms::{
    AccessClaims, LiveKitClient, RoomCredentials, RoomGrant, RoomHandle, RoomService,
    generate_room_name,
};
pub use speech::{OpenAiSpeechClient, SpeechSynthesizer, audio_data_url, step_narration};
pub use text::{
    ChatMessage, ContentPrompt, GeneratedContent, OpenRouterClient, TextGenerator, generate_content,
};
