#![doc = include_str!("../.crate-docs.md")]
#![warn(clippy::pedantic, missing_docs)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]

pub mod diagnostics;
mod error;
pub mod fonts;
pub mod split;
pub mod styles;
pub mod surface;
pub mod text;

pub use figures;
pub use kurbo;

pub use self::diagnostics::Diagnostic;
pub use self::error::{Error, Result};
pub use self::fonts::{FaceRef, FontCollection, FontService, FontSession};
pub use self::split::{Orientation, Region, SplitConfig, SplitDrag};
pub use self::styles::{Color, Decorations, FontStyle, TextStyle};
pub use self::surface::{ImageSurface, Surface};
pub use self::text::{Link, RuneRecord, Span, TextBlock};

/// Installs a `tracing` subscriber that prints the crate's diagnostics.
///
/// The default level is `INFO` for debug builds and `ERROR` for release
/// builds, and can be overridden with `RUST_LOG`. Calling this more than once,
/// or after another subscriber has been installed, has no effect.
pub fn initialize_tracing() {
    #[cfg(feature = "tracing-output")]
    {
        use tracing::Level;
        use tracing_subscriber::filter::LevelFilter;
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;
        use tracing_subscriber::EnvFilter;

        #[cfg(debug_assertions)]
        const MAX_LEVEL: Level = Level::INFO;
        #[cfg(not(debug_assertions))]
        const MAX_LEVEL: Level = Level::ERROR;

        let _result = tracing_subscriber::fmt::fmt()
            .with_max_level(MAX_LEVEL)
            .finish()
            .with(
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::from_level(MAX_LEVEL).into())
                    .from_env_lossy(),
            )
            .try_init();
    }
}
