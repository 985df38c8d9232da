//! Gemeinsame Identifikationstypen fuer crewmute
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen. Die Plattform
//! vergibt IDs als Snowflake-Strings, daher wird der Rohwert als `String`
//! gehalten und nie interpretiert.

use serde::{Deserialize, Serialize};

macro_rules! id_typ {
    ($(#[$meta:meta])* $name:ident, $praefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Erstellt eine ID aus dem Rohwert der Plattform
            pub fn neu(roh: impl Into<String>) -> Self {
                Self(roh.into())
            }

            /// Gibt den Rohwert zurueck
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(roh: &str) -> Self {
                Self(roh.to_string())
            }
        }

        impl From<String> for $name {
            fn from(roh: String) -> Self {
                Self(roh)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($praefix, ":{}"), self.0)
            }
        }
    };
}

id_typ!(
    /// Externe Benutzer-ID (stabiler Schluessel eines Teilnehmers)
    UserId,
    "user"
);

id_typ!(
    /// Voice-Kanal-ID
    ChannelId,
    "channel"
);

id_typ!(
    /// ID des Voice-Raums (Gilde), in dem synchronisiert wird
    GuildId,
    "guild"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_vergleich() {
        let a = UserId::neu("1234");
        let b = UserId::from("1234");
        let c = UserId::from("5678".to_string());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn display_mit_praefix() {
        assert_eq!(UserId::neu("42").to_string(), "user:42");
        assert_eq!(ChannelId::neu("7").to_string(), "channel:7");
        assert_eq!(GuildId::neu("1").to_string(), "guild:1");
    }

    #[test]
    fn ids_sind_serde_transparent() {
        let kanal = ChannelId::neu("998877");
        let json = serde_json::to_string(&kanal).unwrap();
        assert_eq!(json, "\"998877\"");
        let zurueck: ChannelId = serde_json::from_str(&json).unwrap();
        assert_eq!(zurueck, kanal);
    }

    #[test]
    fn as_str_gibt_rohwert() {
        assert_eq!(UserId::neu("abc").as_str(), "abc");
    }
}
