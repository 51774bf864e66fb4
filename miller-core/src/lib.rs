pub mod error;
pub use error::{AppError, AppResult};

pub mod config;
pub use config::{BrowserSettings, Config, KeyTiming};

pub mod logging;

pub mod cache {
    pub mod thumbnail_cache;
    pub use thumbnail_cache::{Thumbnail, ThumbnailCache, ThumbnailKey};

    pub mod thumbnail_provider;
    pub use thumbnail_provider::{ThumbnailProvider, ThumbnailRenderer};
}

pub mod controller {
    pub mod actions;
    pub use actions::{Action, Actions};

    pub mod keyboard;
    pub use keyboard::KeyboardState;

    pub mod pane;
    pub use pane::{Pane, PaneSignal};
}

pub mod model {
    pub mod column;
    pub use column::{Column, LoadState, PendingSelect};

    pub mod column_stack;
    pub use column_stack::{ColumnStack, StatusCounts};

    pub mod history;
    pub use history::NavigationHistory;
}

pub mod fs {
    pub mod entry;
    pub use entry::Entry;

    pub mod lister;
    pub use lister::{
        DirectoryLister, Generation, ListOptions, ListingDispatcher, ListingEvent, ListingRequest,
        TokioDirectoryLister,
    };
}

pub mod operators {
    pub mod file_ops;
    pub use file_ops::TokioFileOperations;

    pub mod launcher;
    pub use launcher::{Launcher, SystemLauncher};
}

pub mod util {
    pub mod click_timer;
    pub mod elapsed;
    pub mod type_select;
}

pub use controller::{Pane, PaneSignal};
pub use model::ColumnStack;
