//! Terminal UI for the appointment console.
//!
//! `render` draws the whole frame from app state; `input` translates key
//! events into either local UI state changes or `Action`s dispatched to the
//! controller. The UI never talks to the network itself.

pub mod input;
pub mod render;
pub mod styles;
