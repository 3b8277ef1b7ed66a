pub mod entry;
pub mod settings;

pub use entry::{Entry, EntryType, Source};
pub use settings::{InterstitialSettings, Mode, Presentation};
