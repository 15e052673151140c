//! Provider infrastructure for external cloud services.
//!
//! This module contains the shared infrastructure for talking to the Gemini
//! generative API. Both remote boundaries of the reader (persona
//! classification and speech synthesis) go through the same client, so wire
//! types, authentication, and the error taxonomy live in one place.

pub mod gemini;

// Re-export Gemini types for convenience
pub use gemini::{
    GeminiClient, GeminiError, GenerateContentRequest, GenerateContentResponse, GEMINI_BASE_URL,
};
