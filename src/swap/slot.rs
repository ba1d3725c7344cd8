//! Equipment slot model
//!
//! A [`LogicalSlot`] is the unit of temporary-swap tracking (a weapon hand,
//! an armor location, a ring position). A [`PhysicalSlot`] is the storage
//! position an identifier is actually read from and written to; for weapons
//! this adds the primary/secondary sub-slot.

use serde::{Deserialize, Serialize};

use super::trigger::EquipCategory;

/// Maximum number of simultaneously tracked players.
pub const MAX_PLAYERS: usize = 4;

/// Index of a tracked player (`0..MAX_PLAYERS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct PlayerIndex(usize);

impl PlayerIndex {
    /// Creates a player index, or `None` when `index >= MAX_PLAYERS`.
    #[must_use]
    pub const fn new(index: usize) -> Option<Self> {
        if index < MAX_PLAYERS {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Iterates every valid player index in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..MAX_PLAYERS).map(Self)
    }
}

impl TryFrom<usize> for PlayerIndex {
    type Error = String;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("player index {value} out of range 0..{MAX_PLAYERS}"))
    }
}

impl From<PlayerIndex> for usize {
    fn from(value: PlayerIndex) -> Self {
        value.0
    }
}

impl std::fmt::Display for PlayerIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Weapon hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    /// Left hand
    Left,
    /// Right hand
    Right,
}

impl Hand {
    /// Both hands, left first.
    pub const ALL: [Self; 2] = [Self::Left, Self::Right];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Physical weapon sub-slot within a hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubSlot {
    /// Primary loadout position
    Primary,
    /// Secondary loadout position
    Secondary,
}

impl SubSlot {
    /// Both sub-slots, primary first.
    pub const ALL: [Self; 2] = [Self::Primary, Self::Secondary];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

/// Armor location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmorLocation {
    /// Head piece
    Head,
    /// Body piece
    Body,
    /// Arms piece
    Arms,
    /// Legs piece
    Legs,
}

impl ArmorLocation {
    /// Every armor location in display order.
    pub const ALL: [Self; 4] = [Self::Head, Self::Body, Self::Arms, Self::Legs];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Head => "head",
            Self::Body => "body",
            Self::Arms => "arms",
            Self::Legs => "legs",
        }
    }
}

/// Ring position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingSlot {
    /// Ring position 0
    First,
    /// Ring position 1
    Second,
}

impl RingSlot {
    /// Both ring positions in index order.
    pub const ALL: [Self; 2] = [Self::First, Self::Second];

    /// Zero-based ring position.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

/// Unit of temporary-swap tracking.
///
/// At most one temporary swap exists per logical slot per player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "at", rename_all = "snake_case")]
pub enum LogicalSlot {
    /// A weapon hand (covers both of its sub-slots)
    Weapon(Hand),
    /// An armor location
    Armor(ArmorLocation),
    /// A ring position
    Ring(RingSlot),
}

impl LogicalSlot {
    /// Number of logical slots per player.
    pub const COUNT: usize = 8;

    /// Every logical slot, weapons first.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Weapon(Hand::Left),
        Self::Weapon(Hand::Right),
        Self::Armor(ArmorLocation::Head),
        Self::Armor(ArmorLocation::Body),
        Self::Armor(ArmorLocation::Arms),
        Self::Armor(ArmorLocation::Legs),
        Self::Ring(RingSlot::First),
        Self::Ring(RingSlot::Second),
    ];

    /// Dense index into per-player slot tables.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Weapon(Hand::Left) => 0,
            Self::Weapon(Hand::Right) => 1,
            Self::Armor(ArmorLocation::Head) => 2,
            Self::Armor(ArmorLocation::Body) => 3,
            Self::Armor(ArmorLocation::Arms) => 4,
            Self::Armor(ArmorLocation::Legs) => 5,
            Self::Ring(RingSlot::First) => 6,
            Self::Ring(RingSlot::Second) => 7,
        }
    }
}

impl std::fmt::Display for LogicalSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weapon(hand) => write!(f, "{} weapon", hand.as_str()),
            Self::Armor(location) => write!(f, "{} armor", location.as_str()),
            Self::Ring(ring) => write!(f, "ring {}", ring.index()),
        }
    }
}

/// Storage position of a single equipment identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "at", rename_all = "snake_case")]
pub enum PhysicalSlot {
    /// A weapon sub-slot in a hand
    Weapon(Hand, SubSlot),
    /// An armor location
    Armor(ArmorLocation),
    /// A ring position
    Ring(RingSlot),
}

impl PhysicalSlot {
    /// The logical slot this storage position belongs to.
    #[must_use]
    pub const fn logical(self) -> LogicalSlot {
        match self {
            Self::Weapon(hand, _) => LogicalSlot::Weapon(hand),
            Self::Armor(location) => LogicalSlot::Armor(location),
            Self::Ring(ring) => LogicalSlot::Ring(ring),
        }
    }

    #[must_use]
    pub const fn category(self) -> EquipCategory {
        match self {
            Self::Weapon(..) => EquipCategory::Weapon,
            Self::Armor(_) => EquipCategory::Armor,
            Self::Ring(_) => EquipCategory::Ring,
        }
    }

    /// The weapon sub-slot, for weapon positions only.
    #[must_use]
    pub const fn sub_slot(self) -> Option<SubSlot> {
        match self {
            Self::Weapon(_, sub) => Some(sub),
            Self::Armor(_) | Self::Ring(_) => None,
        }
    }
}

impl std::fmt::Display for PhysicalSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Weapon(hand, sub) => write!(f, "{}-hand {} weapon", hand.as_str(), sub.as_str()),
            Self::Armor(location) => write!(f, "{} armor", location.as_str()),
            Self::Ring(ring) => write!(f, "ring slot {}", ring.index()),
        }
    }
}
