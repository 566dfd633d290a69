use crate::AppCore;
use std::sync::Arc;

/// Shared application state handed to every handler.
pub type AppState = Arc<AppCore>;
