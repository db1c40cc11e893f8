pub mod config;
pub mod core_community;
pub mod logging;
pub mod metrics;
pub mod test_utils;

pub use config::EngineConfig;
pub use core_community::{Community, CommunityChanges, CommunityConfig, CommunityError, Description};
pub use logging::{init_logging, LogLevel};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Ensure the main exports are accessible
        let _ = LogLevel::Info;
        let _ = CommunityChanges::empty();
        assert!(EngineConfig::default().validate().is_ok());
    }
}
