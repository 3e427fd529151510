//! # tinyorm-testing - Test support for tinyorm
//!
//! An in-memory [`TestDatabase`] seeded with the torrent fixture data, the
//! fixture models themselves and a few generators for test values.
//!
//! ## Quick Start
//!
//! ```rust
//! use tinyorm_testing::prelude::*;
//!
//! #[test]
//! fn test_torrent_files() {
//!     let database = TestDatabase::seeded();
//!     let torrent = database
//!         .query::<Torrent>()
//!         .with(["torrentFiles"])
//!         .unwrap()
//!         .find(2u64)
//!         .unwrap()
//!         .unwrap();
//!
//!     assert_eq!(torrent.get_relation::<TorrentPreviewableFile>("torrentFiles").unwrap().len(), 2);
//! }
//! ```

pub mod database;
pub mod factories;
#[cfg(feature = "fixtures")]
pub mod fixtures;

// Re-export commonly used types
pub use database::TestDatabase;
pub use factories::FactoryBuilder;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{database::TestDatabase, factories::FactoryBuilder, utils, TestError, TestResult};

    #[cfg(feature = "fixtures")]
    pub use crate::fixtures::{
        Phone, Tag, Torrent, TorrentPeer, TorrentPreviewableFile, TorrentPreviewableFileProperty,
        User,
    };

    pub use tinyorm::prelude::*;
    pub use tinyorm::{InjectedFailure, MemoryConnection, StatementKind};

    // Re-export commonly used external types
    pub use chrono::{NaiveDate, NaiveDateTime};
}

// Error handling
#[derive(thiserror::Error, Debug)]
pub enum TestError {
    #[error("ORM error: {0}")]
    Orm(#[from] tinyorm::ModelError),

    #[error("Factory error: {message}")]
    Factory { message: String },

    #[error("Test setup error: {0}")]
    Setup(String),
}

pub type TestResult<T> = Result<T, TestError>;

/// Test utilities and helper functions
pub mod utils {
    use chrono::NaiveDateTime;
    use tinyorm_core::DEFAULT_DATE_FORMAT;

    /// Generate a random test string with optional prefix
    pub fn random_string(prefix: Option<&str>) -> String {
        use rand::Rng;
        let suffix: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(8)
            .map(char::from)
            .collect();

        match prefix {
            Some(p) => format!("{}_{}", p, suffix),
            None => suffix,
        }
    }

    /// Random 40 character hex string shaped like a torrent info hash
    pub fn random_hash() -> String {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        (0..40)
            .map(|_| char::from_digit(rng.gen_range(0..16), 16).unwrap_or('0'))
            .collect()
    }

    /// Create a test UUID
    pub fn test_uuid() -> uuid::Uuid {
        uuid::Uuid::new_v4()
    }

    /// Parse a fixture timestamp written in the default storage format
    pub fn timestamp(text: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(text, DEFAULT_DATE_FORMAT).unwrap_or_default()
    }

    /// Install the test logging preset, ignoring an already installed
    /// subscriber
    pub fn init_test_logging() {
        let _ = tinyorm_core::init_logging(tinyorm_core::LoggingConfig::test());
    }
}
