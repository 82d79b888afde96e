//! Core Module - 핵심 인터페이스 및 타입
//!
//! ## 타입 계층
//!
//! - `types.rs`: 데이터 타입 (ChatId, MessageHandle, Markup)
//! - `traits.rs`: 인터페이스 (Messenger, MarkupRenderer)

mod traits;
mod types;

pub use traits::{MarkupRenderer, Messenger, PlainRenderer};
pub use types::{ChatId, Markup, MessageHandle};
