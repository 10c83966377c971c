//! Configuration management for Ordrett.

mod settings;

pub use settings::{
    FetchSettings, GeneralSettings, PostProcessSettings, PrepareSettings, Settings,
    TranscriptionSettings,
};
