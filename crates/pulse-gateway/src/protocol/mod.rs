//! Gateway protocol definitions
//!
//! Op codes, the envelope every frame travels in, payloads and close codes.

mod close_codes;
mod envelope;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use envelope::Envelope;
pub use opcodes::OpCode;
pub use payloads::{
    ConnectionProperties, HelloPayload, IdentifyPayload, Intents, ReadyPayload, ResumePayload,
};
