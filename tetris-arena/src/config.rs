//! Configuration for the arena server and its rooms

use std::time::Duration;

use tetris_core::board::{DEFAULT_HEIGHT, DEFAULT_WIDTH, MIN_SIZE};
use tetris_core::BoardError;

use crate::error::Result;

/// Main configuration for a Server and the rooms it creates
#[derive(Debug, Clone)]
pub struct ArenaConfig {
    /// UDP address the server listens on
    pub bind_addr: String,

    /// Board width in cells
    pub width: usize,

    /// Board height in cells
    pub height: usize,

    /// State broadcast rate, frames per second
    pub fps: u32,

    /// Gravity tick period (in milliseconds)
    pub tick_interval_ms: u64,

    /// Grace delay between match start message and the first tick (in milliseconds)
    pub start_delay_ms: u64,

    /// Receive buffer size, upper bound for one datagram
    pub max_datagram_size: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8123".to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fps: 24,
            tick_interval_ms: 750,
            start_delay_ms: 3000,
            max_datagram_size: 64 * 1024,
        }
    }
}

impl ArenaConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the listening address
    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Set the board dimensions
    pub fn with_board_size(mut self, width: usize, height: usize) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the broadcast rate (at least 1 fps)
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps.max(1);
        self
    }

    /// Set the gravity tick period in milliseconds
    pub fn with_tick_interval_ms(mut self, interval_ms: u64) -> Self {
        self.tick_interval_ms = interval_ms;
        self
    }

    /// Set the grace delay before the loops start, in milliseconds
    pub fn with_start_delay_ms(mut self, delay_ms: u64) -> Self {
        self.start_delay_ms = delay_ms;
        self
    }

    /// Set the receive buffer size
    pub fn with_max_datagram_size(mut self, size: usize) -> Self {
        self.max_datagram_size = size;
        self
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn broadcast_interval(&self) -> Duration {
        Duration::from_millis((1000 / u64::from(self.fps.max(1))).max(1))
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    /// Check that every room created with this configuration can build its boards
    pub fn validate(&self) -> Result<()> {
        if self.width < MIN_SIZE || self.height < MIN_SIZE {
            return Err(BoardError::InvalidSize {
                width: self.width,
                height: self.height,
                min: MIN_SIZE,
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ArenaConfig::default();
        assert_eq!((config.width, config.height), (10, 24));
        assert_eq!(config.fps, 24);
        assert_eq!(config.tick_interval(), Duration::from_millis(750));
        assert_eq!(config.broadcast_interval(), Duration::from_millis(41));
        assert_eq!(config.start_delay(), Duration::from_secs(3));
    }

    #[test]
    fn test_fps_never_zero() {
        let config = ArenaConfig::new().with_fps(0);
        assert_eq!(config.fps, 1);
        assert_eq!(config.broadcast_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_validate_board_size() {
        assert!(ArenaConfig::default().validate().is_ok());
        assert!(ArenaConfig::default().with_board_size(10, 10).validate().is_ok());
        assert!(matches!(
            ArenaConfig::default().with_board_size(5, 24).validate(),
            Err(crate::ArenaError::Board(BoardError::InvalidSize { .. }))
        ));
        assert!(ArenaConfig::default().with_board_size(10, 9).validate().is_err());
    }
}
