//! Error types for the game simulation.
//!
//! Two layers:
//! - [`GameError`] covers loading, validation and serialization failures.
//! - [`ActionError`] is the rejection reason for a player action. Actions
//!   never panic; callers decide whether to surface the message.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for catalog, config and snapshot handling.
#[derive(Debug, Error)]
pub enum GameError {
    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParseError {
        /// Name of the data source that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },

    /// Catalog or configuration failed validation.
    #[error("Validation failed: {errors:?}")]
    ValidationError {
        /// All validation problems found.
        errors: Vec<String>,
    },

    /// Failed to serialize game state.
    #[error("Failed to serialize state: {0}")]
    SerializeError(String),

    /// Failed to deserialize game state.
    #[error("Failed to deserialize state: {0}")]
    DeserializeError(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// A recorded or scripted action was rejected.
    #[error("Action rejected: {0}")]
    ActionRejected(#[from] ActionError),

    /// Replay playback diverged from the recorded result.
    #[error("Replay diverged at tick {tick}: expected hash {expected}, got {actual}")]
    ReplayDiverged {
        /// Tick where the divergence was detected.
        tick: u64,
        /// Recorded hash.
        expected: u64,
        /// Hash produced by playback.
        actual: u64,
    },
}

/// Reason a player action was rejected.
///
/// A rejected action leaves the game state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// No unassigned builders are left in the pool.
    #[error("No builders available")]
    NoBuildersAvailable,

    /// The building id is not part of this game.
    #[error("Unknown building: {0}")]
    UnknownBuilding(String),

    /// The building has not been unlocked yet.
    #[error("Building is locked: {0}")]
    BuildingLocked(String),

    /// The building only provides a static effect and takes no workers.
    #[error("Building does not accept workers: {0}")]
    NoWorkersAllowed(String),

    /// The building already holds its maximum number of builders.
    #[error("Building is at builder capacity ({max}): {building}")]
    BuildingAtCapacity {
        /// The building id.
        building: String,
        /// Per-type builder cap.
        max: u32,
    },

    /// The building has nobody to unassign.
    #[error("No builders assigned to {0}")]
    NoBuildersAssigned(String),

    /// An upgrade is already running on this building.
    #[error("Building is already upgrading: {0}")]
    UpgradeInProgress(String),

    /// Not enough scrap.
    #[error("Insufficient scrap: need {required}, have {available}")]
    InsufficientScrap {
        /// Amount required.
        required: u64,
        /// Amount available.
        available: u64,
    },

    /// Not enough blueprints.
    #[error("Insufficient blueprints: need {required}, have {available}")]
    InsufficientBlueprints {
        /// Amount required.
        required: u64,
        /// Amount available.
        available: u64,
    },

    /// The prestige upgrade id is not in the catalog.
    #[error("Unknown upgrade: {0}")]
    UnknownUpgrade(String),

    /// The prestige upgrade is already at its maximum level.
    #[error("Upgrade is at max level ({max_level}): {upgrade}")]
    UpgradeMaxed {
        /// The upgrade id.
        upgrade: String,
        /// Maximum level.
        max_level: u32,
    },

    /// The current wave is below the prestige threshold.
    #[error("Prestige requires wave {required}, current wave is {current}")]
    PrestigeLocked {
        /// Minimum wave.
        required: u32,
        /// Current wave.
        current: u32,
    },

    /// The builder pool is already at its maximum size.
    #[error("Builder limit reached ({0})")]
    BuilderLimitReached(u32),

    /// There is no enemy to attack.
    #[error("Combat is not active")]
    CombatInactive,

    /// The simulation is paused.
    #[error("Game is paused")]
    Paused,

    /// A grant carried an unusable value.
    #[error("Invalid grant: {0}")]
    InvalidGrant(String),
}
