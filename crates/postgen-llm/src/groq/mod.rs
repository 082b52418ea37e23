mod client;

pub use client::{GroqClient, GroqConfig, DEFAULT_MODEL, GROQ_API_BASE};
