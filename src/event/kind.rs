//! Closed vocabulary of event kinds.

use serde::{Deserialize, Serialize};

/// Every kind of event a recognizer can emit.
///
/// Serialized in `SCREAMING_SNAKE_CASE`, matching the wire names consumers
/// already key on (`"LOCATION"`, `"MISSION_ACCEPTED"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    // Navigation
    Location,
    LocationRaw,
    LocationHint,
    NewLocation,
    System,
    ServerConnected,
    Jurisdiction,
    Zone,
    Quantum,
    Interdiction,

    // Vehicle / hangar
    ShipEnter,
    ShipExit,
    HangarState,
    HangarAssigned,
    HangarRequest,
    Docking,
    SpawnSet,

    // Combat / hazards
    Death,
    VehicleDestruction,
    VehicleDeath,
    Status,
    HazardFire,
    CrimeUpdate,
    MedicalBed,

    // Missions
    MissionAccepted,
    MissionObjective,
    MissionStatus,
    MissionChanged,
    ContractAvailable,

    // Professions
    Economy,
    Mining,
    Salvage,
    Engineering,

    // Inventory
    AttachmentReceived,
    Inventory,

    // Session
    SessionStart,
    BuildInfo,
    ServerEnv,
    SessionId,
    PlayerName,
    Username,
    CharacterName,
    AccountLogin,
    ServerRegion,

    // Connection
    Connection,
    GameJoin,
    GameLeave,
    Loading,
    GameMode,

    // Client hardware and version
    SystemGpu,
    SystemVram,
    SystemCpu,
    SystemRam,
    GameVersion,
    BuildId,
    Resolution,
    Joystick,

    // Social
    SocialProximity,
    SocialInvite,
    PartyInvite,

    // User-defined
    Custom,

    // Emitted by the watcher itself when the log file is rotated.
    GameRestart,
}

impl EventKind {
    /// Wire name of this kind, identical to its serialized form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Location => "LOCATION",
            Self::LocationRaw => "LOCATION_RAW",
            Self::LocationHint => "LOCATION_HINT",
            Self::NewLocation => "NEW_LOCATION",
            Self::System => "SYSTEM",
            Self::ServerConnected => "SERVER_CONNECTED",
            Self::Jurisdiction => "JURISDICTION",
            Self::Zone => "ZONE",
            Self::Quantum => "QUANTUM",
            Self::Interdiction => "INTERDICTION",
            Self::ShipEnter => "SHIP_ENTER",
            Self::ShipExit => "SHIP_EXIT",
            Self::HangarState => "HANGAR_STATE",
            Self::HangarAssigned => "HANGAR_ASSIGNED",
            Self::HangarRequest => "HANGAR_REQUEST",
            Self::Docking => "DOCKING",
            Self::SpawnSet => "SPAWN_SET",
            Self::Death => "DEATH",
            Self::VehicleDestruction => "VEHICLE_DESTRUCTION",
            Self::VehicleDeath => "VEHICLE_DEATH",
            Self::Status => "STATUS",
            Self::HazardFire => "HAZARD_FIRE",
            Self::CrimeUpdate => "CRIME_UPDATE",
            Self::MedicalBed => "MEDICAL_BED",
            Self::MissionAccepted => "MISSION_ACCEPTED",
            Self::MissionObjective => "MISSION_OBJECTIVE",
            Self::MissionStatus => "MISSION_STATUS",
            Self::MissionChanged => "MISSION_CHANGED",
            Self::ContractAvailable => "CONTRACT_AVAILABLE",
            Self::Economy => "ECONOMY",
            Self::Mining => "MINING",
            Self::Salvage => "SALVAGE",
            Self::Engineering => "ENGINEERING",
            Self::AttachmentReceived => "ATTACHMENT_RECEIVED",
            Self::Inventory => "INVENTORY",
            Self::SessionStart => "SESSION_START",
            Self::BuildInfo => "BUILD_INFO",
            Self::ServerEnv => "SERVER_ENV",
            Self::SessionId => "SESSION_ID",
            Self::PlayerName => "PLAYER_NAME",
            Self::Username => "USERNAME",
            Self::CharacterName => "CHARACTER_NAME",
            Self::AccountLogin => "ACCOUNT_LOGIN",
            Self::ServerRegion => "SERVER_REGION",
            Self::Connection => "CONNECTION",
            Self::GameJoin => "GAME_JOIN",
            Self::GameLeave => "GAME_LEAVE",
            Self::Loading => "LOADING",
            Self::GameMode => "GAME_MODE",
            Self::SystemGpu => "SYSTEM_GPU",
            Self::SystemVram => "SYSTEM_VRAM",
            Self::SystemCpu => "SYSTEM_CPU",
            Self::SystemRam => "SYSTEM_RAM",
            Self::GameVersion => "GAME_VERSION",
            Self::BuildId => "BUILD_ID",
            Self::Resolution => "RESOLUTION",
            Self::Joystick => "JOYSTICK",
            Self::SocialProximity => "SOCIAL_PROXIMITY",
            Self::SocialInvite => "SOCIAL_INVITE",
            Self::PartyInvite => "PARTY_INVITE",
            Self::Custom => "CUSTOM",
            Self::GameRestart => "GAME_RESTART",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
