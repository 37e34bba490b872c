use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a stored or submitted enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Generates `as_str`, `Display` and `FromStr` for a fieldless enum whose
/// database representation matches its serde representation.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

// -- Users --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    User,
    Admin,
}

text_enum!(UserRole, "user role", { User => "USER", Admin => "ADMIN" });

// -- Groups --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupType {
    Public,
    Private,
}

text_enum!(GroupType, "group type", { Public => "PUBLIC", Private => "PRIVATE" });

/// Role held inside a single group. Ordering follows seniority so that member
/// listings can sort admins first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MembershipRole {
    Admin,
    Moderator,
    Member,
}

text_enum!(MembershipRole, "membership role", {
    Admin => "ADMIN",
    Moderator => "MODERATOR",
    Member => "MEMBER",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MembershipStatus {
    Active,
    Pending,
    Banned,
}

text_enum!(MembershipStatus, "membership status", {
    Active => "ACTIVE",
    Pending => "PENDING",
    Banned => "BANNED",
});

// -- Live sessions --

/// Two-state lifecycle of a live stream. `Live` moves to `Ended` exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiveStatus {
    Live,
    Ended,
}

text_enum!(LiveStatus, "live status", { Live => "live", Ended => "ended" });

/// Participant role inside a hosted room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomRole {
    Host,
    Cohost,
    Viewer,
}

impl RoomRole {
    pub fn can_publish(&self) -> bool {
        matches!(self, Self::Host | Self::Cohost)
    }
}

text_enum!(RoomRole, "room role", { Host => "host", Cohost => "cohost", Viewer => "viewer" });

// -- Generated content --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    KitchenTip,
    CookingHack,
    FoodTrend,
}

text_enum!(ContentKind, "content type", {
    KitchenTip => "kitchen-tip",
    CookingHack => "cooking-hack",
    FoodTrend => "food-trend",
});

// -- Payments --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Completed,
    Failed,
}

text_enum!(PurchaseStatus, "purchase status", { Completed => "completed", Failed => "failed" });
