use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A provider the admin can run an authorization flow against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// Page-based Graph platform. The connected credential is a page token.
    Meta,
    /// Channel platform using authorization code + refresh token.
    GoogleVideo,
    /// OIDC platform issuing long-lived opaque access tokens.
    ProfessionalNetwork,
}

impl Platform {
    pub const ALL: [Platform; 3] = [
        Platform::Meta,
        Platform::GoogleVideo,
        Platform::ProfessionalNetwork,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Meta => "meta",
            Platform::GoogleVideo => "google_video",
            Platform::ProfessionalNetwork => "professional_network",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Meta => "Meta",
            Platform::GoogleVideo => "YouTube",
            Platform::ProfessionalNetwork => "LinkedIn",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "meta" | "facebook" => Ok(Platform::Meta),
            "google_video" | "youtube" => Ok(Platform::GoogleVideo),
            "professional_network" | "linkedin" => Ok(Platform::ProfessionalNetwork),
            other => Err(other.to_string()),
        }
    }
}

/// Key of a stored connection record. Every platform owns one key; the
/// page-based platform additionally owns the derived photo-sharing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKey {
    Meta,
    /// Photo-sharing business account linked to the connected page.
    MetaPhoto,
    GoogleVideo,
    ProfessionalNetwork,
}

impl ConnectionKey {
    pub const ALL: [ConnectionKey; 4] = [
        ConnectionKey::Meta,
        ConnectionKey::MetaPhoto,
        ConnectionKey::GoogleVideo,
        ConnectionKey::ProfessionalNetwork,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionKey::Meta => "meta",
            ConnectionKey::MetaPhoto => "meta_photo",
            ConnectionKey::GoogleVideo => "google_video",
            ConnectionKey::ProfessionalNetwork => "professional_network",
        }
    }

    /// The platform whose authorization flow produces this record.
    pub fn platform(&self) -> Platform {
        match self {
            ConnectionKey::Meta | ConnectionKey::MetaPhoto => Platform::Meta,
            ConnectionKey::GoogleVideo => Platform::GoogleVideo,
            ConnectionKey::ProfessionalNetwork => Platform::ProfessionalNetwork,
        }
    }

    /// Records that must disappear together with this one.
    pub fn dependents(&self) -> &'static [ConnectionKey] {
        match self {
            ConnectionKey::Meta => &[ConnectionKey::MetaPhoto],
            _ => &[],
        }
    }
}

impl From<Platform> for ConnectionKey {
    fn from(platform: Platform) -> Self {
        match platform {
            Platform::Meta => ConnectionKey::Meta,
            Platform::GoogleVideo => ConnectionKey::GoogleVideo,
            Platform::ProfessionalNetwork => ConnectionKey::ProfessionalNetwork,
        }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "meta_photo" | "instagram" => Ok(ConnectionKey::MetaPhoto),
            other => other.parse::<Platform>().map(ConnectionKey::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parse_accepts_canonical_and_brand_names() {
        assert_eq!("meta".parse::<Platform>(), Ok(Platform::Meta));
        assert_eq!("YouTube".parse::<Platform>(), Ok(Platform::GoogleVideo));
        assert_eq!(
            " linkedin ".parse::<Platform>(),
            Ok(Platform::ProfessionalNetwork)
        );
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn test_platform_serde_uses_snake_case() {
        let json = serde_json::to_string(&Platform::ProfessionalNetwork).unwrap();
        assert_eq!(json, "\"professional_network\"");
        let back: Platform = serde_json::from_str("\"google_video\"").unwrap();
        assert_eq!(back, Platform::GoogleVideo);
    }

    #[test]
    fn test_derived_key_belongs_to_meta() {
        assert_eq!(ConnectionKey::MetaPhoto.platform(), Platform::Meta);
        assert_eq!(ConnectionKey::Meta.dependents(), &[ConnectionKey::MetaPhoto]);
        assert!(ConnectionKey::GoogleVideo.dependents().is_empty());
        assert_eq!("instagram".parse::<ConnectionKey>(), Ok(ConnectionKey::MetaPhoto));
        assert_eq!("linkedin".parse::<ConnectionKey>(), Ok(ConnectionKey::ProfessionalNetwork));
    }
}
