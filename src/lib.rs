#![forbid(unsafe_code)]

pub mod assets;
pub mod auth;
pub mod calendar;
pub mod core;
pub mod error;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod render;
pub mod scene;
pub mod store;
pub mod style;
pub mod text;

pub use assets::PosterAssets;
pub use auth::{AuthSnapshot, AuthState, AuthSubscription, CurrentUser};
pub use core::{Canvas, Rgba8, Rgba8Premul};
pub use error::{MarqueeError, MarqueeResult};
pub use layout::{compose_poster, title_font_size};
pub use model::{Artist, Festival, FestivalDoc, Slot, Theme};
pub use pipeline::{FileSink, PosterSink, encode_png, poster_file_name, render_poster_png};
pub use render::{CpuRasterizer, FrameRGBA};
pub use scene::{ContentBlock, DayBlock, PosterScene};
pub use store::{DocumentStore, ExploreFeed, FestivalStore, MemoryStore, Query};
pub use style::{FontRole, PosterStyle};
