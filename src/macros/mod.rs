//! Macro engine — parse macro text and play it into terminal sessions.
//!
//! This module provides:
//! - `MacroStep` and the line parser (`step`)
//! - The `MacroSink` capability implemented by sessions (`sink`)
//! - The cancellable playback scheduler `MacroPlayer` (`player`)
//! - Saved macros in `macros.json` (`library`)

pub mod library;
pub mod player;
pub mod sink;
pub mod step;

pub use library::{Macro, MacroLibrary};
pub use player::{MacroPlayer, PlaybackConfig, PlaybackState, STATUS_COMPLETED, STATUS_STOPPED};
pub use sink::{MacroSink, RecordingSink};
pub use step::{parse_macro, parse_step, MacroStep};
