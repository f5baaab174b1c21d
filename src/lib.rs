pub mod api;
pub mod cli;
pub mod drafts;
pub mod logging;
pub mod projection;
pub mod selection;
pub mod settings;
pub mod store;
pub mod summary;
pub mod theme;
pub mod types;
